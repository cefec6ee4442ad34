use std::{collections::BTreeMap, sync::Arc};

use anyhow::{anyhow, bail};
use fieldplan_engine::{Field, FieldProvider, FieldRef};
use tracing::debug;

use super::{CPF, NAME, PeopleRequest, Person, PersonContext, PersonalInfo, SEX, person_cpf};

/// Cache key for government registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GovKey(String);

/// Government registry: `Name` and `Sex`, both served by one lookup per CPF.
///
/// People missing from the registry keep both fields empty.
pub struct GovDatabaseProvider {
    records: Arc<BTreeMap<String, PersonalInfo>>,
}

impl GovDatabaseProvider {
    pub fn new(records: BTreeMap<String, PersonalInfo>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }
}

impl FieldProvider<PeopleRequest, Person> for GovDatabaseProvider {
    fn name(&self) -> &str {
        "gov-database"
    }

    fn provides(&self) -> Vec<Field<PeopleRequest, Person>> {
        let name_records = Arc::clone(&self.records);
        let sex_records = Arc::clone(&self.records);
        vec![
            Field::new(
                NAME,
                move |index: usize, ctx: &mut PersonContext<'_>| {
                    let Some(info) = personal_info(&name_records, index, ctx)? else {
                        return Ok(());
                    };
                    if let Some(person) = ctx.document_mut(index) {
                        person.name = Some(info.name);
                    }
                    Ok(())
                },
                |person: &mut Person| person.name = None,
            ),
            Field::new(
                SEX,
                move |index: usize, ctx: &mut PersonContext<'_>| {
                    let Some(info) = personal_info(&sex_records, index, ctx)? else {
                        return Ok(());
                    };
                    if let Some(person) = ctx.document_mut(index) {
                        person.sex = sex_code(&info.sex).map(str::to_string);
                    }
                    Ok(())
                },
                |person: &mut Person| person.sex = None,
            ),
        ]
    }

    fn depends_on(&self) -> Vec<FieldRef> {
        vec![FieldRef::bare(CPF)]
    }
}

fn personal_info(
    records: &BTreeMap<String, PersonalInfo>,
    index: usize,
    ctx: &mut PersonContext<'_>,
) -> anyhow::Result<Option<PersonalInfo>> {
    if ctx.cancellation().is_cancelled() {
        bail!("gov lookup cancelled");
    }
    let cpf = person_cpf(ctx, index)?;
    let lookup = ctx.cache().get_or_load(GovKey(cpf.clone()), || {
        debug!(%cpf, "gov database hit");
        records
            .get(&cpf)
            .cloned()
            .ok_or_else(|| anyhow!("no gov record for {cpf}"))
    });

    match lookup {
        Ok(info) => Ok(Some(info)),
        Err(error) => {
            debug!(%cpf, %error, "gov record unavailable");
            Ok(None)
        }
    }
}

fn sex_code(sex: &str) -> Option<&'static str> {
    match sex {
        "Male" => Some("M"),
        "Female" => Some("F"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sex_code_maps_known_values_only() {
        assert_eq!(sex_code("Male"), Some("M"));
        assert_eq!(sex_code("Female"), Some("F"));
        assert_eq!(sex_code("unknown"), None);
    }
}
