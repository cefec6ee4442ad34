//! People lookup domain: a CPF index enriched by government and health
//! registries.
//!
//! - `indexer`: lists the people to enrich, honoring the request limit
//! - `gov`: `Name` and `Sex` from the government registry, one cached lookup per CPF
//! - `covid`: `HadCovid` from the health registry
//! - `formatter`: rewrites the index `CPF` as `XXXXXXXXX-XX`

mod covid;
mod formatter;
mod gov;
mod indexer;

use std::{collections::BTreeMap, sync::Arc};

use fieldplan_engine::{
    ExecutionContext, FieldProvider, FieldRef, Planner, PlannerError, PlannerOptions, Request,
};
use serde::{Deserialize, Serialize};

pub use covid::CovidDatabaseProvider;
pub use formatter::CpfFormatter;
pub use gov::GovDatabaseProvider;
pub use indexer::{CpfIndexer, IndexSummary};

pub const CPF: &str = "CPF";
pub const NAME: &str = "Name";
pub const SEX: &str = "Sex";
pub const HAD_COVID: &str = "HadCovid";

/// Fields returned when the command line names none.
pub const DEFAULT_FIELDS: [&str; 4] = [CPF, NAME, HAD_COVID, SEX];

pub(crate) type PersonContext<'a> = ExecutionContext<'a, PeopleRequest, Person>;

/// Enriched document. Fields that were not requested are cleared and
/// omitted from the JSON output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Person {
    #[serde(rename = "CPF", skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Sex", skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(rename = "HadCovid", skip_serializing_if = "Option::is_none")]
    pub had_covid: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PeopleRequest {
    pub fields: Vec<String>,
    /// Maximum number of people returned by the index; `None` returns all.
    pub limit: Option<usize>,
}

impl PeopleRequest {
    pub fn new<I, S>(fields: I, limit: Option<usize>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            limit,
        }
    }
}

impl Request for PeopleRequest {
    fn requested_fields(&self) -> Vec<FieldRef> {
        self.fields.iter().map(|field| FieldRef::parse(field.trim())).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    pub sex: String,
}

/// Backing data for the index and both registries.
///
/// Fields missing from a config file are empty, not the built-in people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeopleDataset {
    /// CPFs listed by the index, in output order.
    #[serde(default)]
    pub index: Vec<String>,
    #[serde(default)]
    pub gov: BTreeMap<String, PersonalInfo>,
    #[serde(default)]
    pub covid: BTreeMap<String, bool>,
}

impl Default for PeopleDataset {
    fn default() -> Self {
        let person = |name: &str, sex: &str| PersonalInfo {
            name: name.to_string(),
            sex: sex.to_string(),
        };
        Self {
            index: vec!["85022625806".into(), "20662340442".into(), "44452427138".into()],
            gov: BTreeMap::from([
                ("44452427138".to_string(), person("João", "Male")),
                ("85022625806".to_string(), person("Maria", "Female")),
                ("20662340442".to_string(), person("José", "Male")),
            ]),
            covid: BTreeMap::from([
                ("44452427138".to_string(), true),
                ("85022625806".to_string(), false),
                ("20662340442".to_string(), true),
            ]),
        }
    }
}

/// Wire the index and every provider over `dataset` into a planner.
pub fn build_planner(dataset: PeopleDataset, options: PlannerOptions) -> Result<Planner<PeopleRequest, Person>, PlannerError> {
    let providers: [Arc<dyn FieldProvider<PeopleRequest, Person>>; 3] = [
        Arc::new(GovDatabaseProvider::new(dataset.gov)),
        Arc::new(CovidDatabaseProvider::new(dataset.covid)),
        Arc::new(CpfFormatter),
    ];
    Planner::<PeopleRequest, Person>::builder()
        .index_provider(Arc::new(CpfIndexer::new(dataset.index)))
        .providers(providers)
        .options(options)
        .build()
}

/// Digits of a CPF in either raw or formatted form.
pub(crate) fn cpf_digits(cpf: &str) -> String {
    cpf.chars().filter(char::is_ascii_digit).collect()
}

/// CPF of the person at `index`, as registries key it.
pub(crate) fn person_cpf(ctx: &PersonContext<'_>, index: usize) -> anyhow::Result<String> {
    let person = ctx
        .document(index)
        .ok_or_else(|| anyhow::anyhow!("no person at position {index}"))?;
    let cpf = person
        .cpf
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("person at position {index} has no CPF"))?;
    Ok(cpf_digits(cpf))
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use fieldplan_engine::IndexOverwritePolicy;

    fn run(fields: &[&str], limit: Option<usize>, options: PlannerOptions) -> Vec<Person> {
        let planner = build_planner(PeopleDataset::default(), options).expect("demo planner");
        planner
            .new_plan(PeopleRequest::new(fields.iter().copied(), limit))
            .execute(&CancellationToken::new())
            .expect("demo plan")
            .into_documents()
    }

    #[test]
    fn full_request_enriches_limited_batch() {
        let people = run(&DEFAULT_FIELDS, Some(2), PlannerOptions::default());

        assert_eq!(
            people,
            vec![
                Person {
                    cpf: Some("850226258-06".into()),
                    name: Some("Maria".into()),
                    sex: Some("F".into()),
                    had_covid: Some(false),
                },
                Person {
                    cpf: Some("206623404-42".into()),
                    name: Some("José".into()),
                    sex: Some("M".into()),
                    had_covid: Some(true),
                },
            ]
        );
    }

    #[test]
    fn name_only_request_clears_everything_else() {
        let people = run(&[NAME], None, PlannerOptions::default());

        assert_eq!(people.len(), 3);
        assert!(people.iter().all(|person| person.cpf.is_none() && person.sex.is_none() && person.had_covid.is_none()));
        assert_eq!(people[2].name.as_deref(), Some("João"));
    }

    #[test]
    fn preserve_index_policy_keeps_raw_cpf() {
        let options = PlannerOptions {
            index_overwrite: IndexOverwritePolicy::PreserveIndex,
        };
        let people = run(&[CPF], Some(1), options);

        assert_eq!(people[0].cpf.as_deref(), Some("85022625806"));
    }

    #[test]
    fn plan_orders_formatter_before_registries_when_cpf_comes_first() {
        let planner = build_planner(PeopleDataset::default(), PlannerOptions::default()).expect("demo planner");
        let plan = planner.new_plan(PeopleRequest::new(DEFAULT_FIELDS, None));

        assert_eq!(plan.provider_names(), vec!["cpf-formatter", "gov-database", "covid-database"]);
        assert_eq!(plan.index_fields().iter().map(|field| field.as_str()).collect::<Vec<_>>(), vec![CPF]);
    }

    #[test]
    fn unknown_person_keeps_registry_fields_empty() {
        let mut dataset = PeopleDataset::default();
        dataset.index.push("00000000000".into());
        let planner = build_planner(dataset, PlannerOptions::default()).expect("demo planner");

        let people = planner
            .new_plan(PeopleRequest::new([NAME, HAD_COVID], None))
            .execute(&CancellationToken::new())
            .expect("plan")
            .into_documents();

        assert_eq!(people[3], Person::default());
    }
}
