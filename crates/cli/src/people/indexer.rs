use anyhow::{Result, bail};
use fieldplan_engine::{FieldName, IndexField, IndexProvider, Payload};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CPF, PeopleRequest, Person};

/// Counts reported by the index through the payload side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    pub indexed: usize,
    pub returned: usize,
}

/// Lists the CPFs to enrich; the first step of every plan.
pub struct CpfIndexer {
    cpfs: Vec<String>,
}

impl CpfIndexer {
    pub fn new(cpfs: Vec<String>) -> Self {
        Self { cpfs }
    }
}

impl IndexProvider<PeopleRequest, Person> for CpfIndexer {
    fn name(&self) -> &str {
        "cpf-indexer"
    }

    fn provides(&self) -> Vec<IndexField<Person>> {
        vec![IndexField::new(CPF, |person: &mut Person| person.cpf = None)]
    }

    fn execute(&self, request: &PeopleRequest, fields: &[FieldName], cancellation: &CancellationToken) -> Result<Payload<Person>> {
        if cancellation.is_cancelled() {
            bail!("index lookup cancelled");
        }

        let limit = request.limit.unwrap_or(self.cpfs.len());
        let people: Vec<Person> = self
            .cpfs
            .iter()
            .take(limit)
            .map(|cpf| Person {
                cpf: Some(cpf.clone()),
                ..Person::default()
            })
            .collect();
        debug!(?fields, indexed = self.cpfs.len(), returned = people.len(), "cpf index listed people");

        let summary = IndexSummary {
            indexed: self.cpfs.len(),
            returned: people.len(),
        };
        Ok(Payload::new(people).with_custom_data(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpfs() -> Vec<String> {
        vec!["1".into(), "2".into(), "3".into()]
    }

    #[test]
    fn limit_caps_the_batch() {
        let request = PeopleRequest::new([CPF], Some(2));
        let payload = CpfIndexer::new(cpfs())
            .execute(&request, &[FieldName::new(CPF)], &CancellationToken::new())
            .expect("index");

        assert_eq!(payload.documents.len(), 2);
        assert_eq!(
            payload.custom_data_ref::<IndexSummary>(),
            Some(&IndexSummary { indexed: 3, returned: 2 })
        );
    }

    #[test]
    fn cancelled_token_stops_the_lookup() {
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let error = CpfIndexer::new(cpfs())
            .execute(&PeopleRequest::default(), &[], &cancellation)
            .expect_err("cancelled");
        assert_eq!(error.to_string(), "index lookup cancelled");
    }
}
