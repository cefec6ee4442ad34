use std::{collections::BTreeMap, sync::Arc};

use fieldplan_engine::{Field, FieldProvider, FieldRef};

use super::{CPF, HAD_COVID, PeopleRequest, Person, PersonContext, person_cpf};

/// Health registry answering whether a person had covid.
pub struct CovidDatabaseProvider {
    records: Arc<BTreeMap<String, bool>>,
}

impl CovidDatabaseProvider {
    pub fn new(records: BTreeMap<String, bool>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }
}

impl FieldProvider<PeopleRequest, Person> for CovidDatabaseProvider {
    fn name(&self) -> &str {
        "covid-database"
    }

    fn provides(&self) -> Vec<Field<PeopleRequest, Person>> {
        let records = Arc::clone(&self.records);
        vec![Field::new(
            HAD_COVID,
            move |index: usize, ctx: &mut PersonContext<'_>| {
                let cpf = person_cpf(ctx, index)?;
                let had_covid = records.get(&cpf).copied();
                if let Some(person) = ctx.document_mut(index) {
                    person.had_covid = had_covid;
                }
                Ok(())
            },
            |person: &mut Person| person.had_covid = None,
        )]
    }

    fn depends_on(&self) -> Vec<FieldRef> {
        vec![FieldRef::bare(CPF)]
    }
}
