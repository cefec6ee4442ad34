use anyhow::{anyhow, ensure};
use fieldplan_engine::{Field, FieldProvider, FieldRef};

use super::{CPF, PeopleRequest, Person, PersonContext, cpf_digits};

const CPF_DIGITS: usize = 11;

/// Rewrites the index `CPF` into its display form.
///
/// Depends on the raw index value of `CPF`, so it may overwrite the field it
/// reads from.
pub struct CpfFormatter;

impl FieldProvider<PeopleRequest, Person> for CpfFormatter {
    fn name(&self) -> &str {
        "cpf-formatter"
    }

    fn provides(&self) -> Vec<Field<PeopleRequest, Person>> {
        vec![Field::new(
            CPF,
            |index: usize, ctx: &mut PersonContext<'_>| {
                let person = ctx
                    .document_mut(index)
                    .ok_or_else(|| anyhow!("no person at position {index}"))?;
                if let Some(cpf) = person.cpf.as_deref() {
                    person.cpf = Some(format_cpf(cpf)?);
                }
                Ok(())
            },
            |person: &mut Person| person.cpf = None,
        )]
    }

    fn depends_on(&self) -> Vec<FieldRef> {
        vec![FieldRef::index_raw(CPF)]
    }
}

fn format_cpf(cpf: &str) -> anyhow::Result<String> {
    let digits = cpf_digits(cpf);
    ensure!(digits.len() == CPF_DIGITS, "CPF '{cpf}' must have {CPF_DIGITS} digits");
    let (body, check) = digits.split_at(CPF_DIGITS - 2);
    Ok(format!("{body}-{check}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_raw_and_formatted_input_alike() {
        assert_eq!(format_cpf("44452427138").expect("raw"), "444524271-38");
        assert_eq!(format_cpf("444524271-38").expect("formatted"), "444524271-38");
    }

    #[test]
    fn rejects_short_cpf() {
        let error = format_cpf("1234").expect_err("too short");
        assert_eq!(error.to_string(), "CPF '1234' must have 11 digits");
    }
}
