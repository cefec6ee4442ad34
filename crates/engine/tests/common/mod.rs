#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use anyhow::anyhow;
use fieldplan_engine::{
    ExecutionContext, Field, FieldName, FieldProvider, FieldRef, FieldSelection, IndexField, IndexProvider, Payload,
};
use tokio_util::sync::CancellationToken;

pub type Doc = BTreeMap<String, String>;
pub type Context<'a> = ExecutionContext<'a, FieldSelection, Doc>;
pub type SharedProvider = Arc<dyn FieldProvider<FieldSelection, Doc>>;
pub type SharedIndex = Arc<dyn IndexProvider<FieldSelection, Doc>>;

/// Ordered record of every callback the engine invoked.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().expect("journal lock").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries().iter().any(|recorded| recorded == entry)
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|recorded| recorded.starts_with(prefix)).count()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("index offline")]
pub struct IndexOffline;

/// Index that writes `<field><position>` for every requested field.
pub struct TestIndex {
    pub fields: Vec<&'static str>,
    pub without_clear: Vec<&'static str>,
    pub documents: usize,
    pub offline: bool,
    pub journal: Journal,
}

impl TestIndex {
    pub fn new(fields: &[&'static str], journal: &Journal) -> Self {
        Self {
            fields: fields.to_vec(),
            without_clear: Vec::new(),
            documents: 1,
            offline: false,
            journal: journal.clone(),
        }
    }

    pub fn documents(mut self, documents: usize) -> Self {
        self.documents = documents;
        self
    }

    pub fn without_clear(mut self, field: &'static str) -> Self {
        self.without_clear.push(field);
        self
    }

    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn shared(self) -> SharedIndex {
        Arc::new(self)
    }
}

impl IndexProvider<FieldSelection, Doc> for TestIndex {
    fn name(&self) -> &str {
        "test-index"
    }

    fn provides(&self) -> Vec<IndexField<Doc>> {
        self.fields
            .iter()
            .map(|field| {
                if self.without_clear.contains(field) {
                    IndexField::named(*field)
                } else {
                    clearing_index_field(field, &self.journal)
                }
            })
            .collect()
    }

    fn execute(&self, _: &FieldSelection, fields: &[FieldName], _: &CancellationToken) -> anyhow::Result<Payload<Doc>> {
        let requested: Vec<&str> = fields.iter().map(FieldName::as_str).collect();
        self.journal.record(format!("fetch:{}", requested.join(",")));
        if self.offline {
            return Err(IndexOffline.into());
        }

        let documents = (0..self.documents)
            .map(|position| {
                requested
                    .iter()
                    .map(|field| (field.to_string(), format!("{field}{position}")))
                    .collect::<Doc>()
            })
            .collect();
        Ok(Payload::new(documents))
    }
}

fn clearing_index_field(field: &str, journal: &Journal) -> IndexField<Doc> {
    let name = field.to_string();
    let journal = journal.clone();
    IndexField::new(field, move |doc: &mut Doc| {
        journal.record(format!("clear:{name}"));
        doc.remove(&name);
    })
}

/// Provider that writes `<provider>:<field>` into every document.
pub struct TestProvider {
    pub name: &'static str,
    pub fields: Vec<&'static str>,
    pub dependencies: Vec<&'static str>,
    pub journal: Journal,
}

impl TestProvider {
    pub fn new(name: &'static str, fields: &[&'static str], dependencies: &[&'static str], journal: &Journal) -> Self {
        Self {
            name,
            fields: fields.to_vec(),
            dependencies: dependencies.to_vec(),
            journal: journal.clone(),
        }
    }

    pub fn shared(self) -> SharedProvider {
        Arc::new(self)
    }
}

impl FieldProvider<FieldSelection, Doc> for TestProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn provides(&self) -> Vec<Field<FieldSelection, Doc>> {
        self.fields
            .iter()
            .map(|field| value_field(self.name, field, &self.journal))
            .collect()
    }

    fn depends_on(&self) -> Vec<FieldRef> {
        self.dependencies.iter().map(|dependency| FieldRef::parse(dependency)).collect()
    }
}

pub fn value_field(provider: &str, field: &str, journal: &Journal) -> Field<FieldSelection, Doc> {
    let provider = provider.to_string();
    let name = field.to_string();
    let key = name.clone();
    let fill_journal = journal.clone();
    let clear_journal = journal.clone();
    Field::new(
        field,
        move |index: usize, ctx: &mut Context<'_>| {
            fill_journal.record(format!("fill:{provider}:{name}:{index}"));
            let doc = ctx.document_mut(index).ok_or_else(|| anyhow!("document {index} missing"))?;
            doc.insert(name.clone(), format!("{provider}:{name}"));
            Ok(())
        },
        move |doc: &mut Doc| {
            clear_journal.record(format!("clear:{key}"));
            doc.remove(&key);
        },
    )
}

pub fn keys(doc: &Doc) -> Vec<&str> {
    doc.keys().map(String::as_str).collect()
}
