//! Error types for planner construction and plan execution.

use std::fmt;

use thiserror::Error;

use crate::model::FieldName;

/// Errors that prevent a [`Planner`](crate::Planner) from being built.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("an index provider is required to build a planner")]
    MissingIndexProvider,

    #[error("invalid provider declarations: {0}")]
    InvalidProviders(ValidationReport),

    #[error("two providers for the same field '{field}': '{existing}' and '{incoming}'")]
    DuplicateFieldProvider {
        field: FieldName,
        existing: String,
        incoming: String,
    },

    #[error("cycle found in field dependency: {path}")]
    CyclicDependency { path: CyclePath },
}

impl PlannerError {
    pub fn duplicate_field_provider(field: FieldName, existing: impl Into<String>, incoming: impl Into<String>) -> Self {
        Self::DuplicateFieldProvider {
            field,
            existing: existing.into(),
            incoming: incoming.into(),
        }
    }

    /// Validation issues carried by this error, empty for other variants.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::InvalidProviders(report) => report.issues(),
            _ => &[],
        }
    }
}

/// A single problem found while validating provider declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("provider slot {position} is empty")]
    EmptyProviderSlot { position: usize },

    #[error("provider '{provider}' declares field '{field}' without a fill callback")]
    MissingFill { provider: String, field: FieldName },

    #[error("provider '{provider}' declares field '{field}' without a clear callback")]
    MissingClear { provider: String, field: FieldName },

    #[error("index provider '{provider}' declares field '{field}' without a clear callback")]
    MissingIndexClear { provider: String, field: FieldName },

    #[error("provider '{provider}' declares field '{field}' whose name is reserved for raw index references")]
    ReservedFieldName { provider: String, field: FieldName },
}

/// Every validation issue found across the index provider and all field providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, issue) in self.issues.iter().enumerate() {
            if position > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Dependency path of a detected cycle, listed dependent-first and closed:
/// the first and last entries are the same field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath(Vec<FieldName>);

impl CyclePath {
    pub(crate) fn new(fields: Vec<FieldName>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[FieldName] {
        &self.0
    }
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<&str> = self.0.iter().map(FieldName::as_str).collect();
        f.write_str(&rendered.join(" -> "))
    }
}

/// Errors that abort a single plan execution.
///
/// Provider errors are kept as the `source`, so callers can downcast them to
/// recover the original error value.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unsupported fields by index '{provider}': {}", join_field_names(.fields))]
    UnsupportedIndexFields { provider: String, fields: Vec<FieldName> },

    #[error("index provider '{provider}' failed to create the document batch")]
    IndexExecutionFailed {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("provider '{provider}' failed to fill field '{field}' for document {document_index}")]
    FieldFillFailed {
        provider: String,
        field: FieldName,
        document_index: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl ExecutionError {
    /// The provider-supplied error behind this failure, if any.
    pub fn provider_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::IndexExecutionFailed { source, .. } | Self::FieldFillFailed { source, .. } => Some(source),
            Self::UnsupportedIndexFields { .. } => None,
        }
    }
}

fn join_field_names(fields: &[FieldName]) -> String {
    fields.iter().map(FieldName::as_str).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_path_renders_dependent_first() {
        let path = CyclePath::new(vec!["a".into(), "b".into(), "c".into(), "a".into()]);
        assert_eq!(path.to_string(), "a -> b -> c -> a");

        let error = PlannerError::CyclicDependency { path };
        assert_eq!(error.to_string(), "cycle found in field dependency: a -> b -> c -> a");
    }

    #[test]
    fn unsupported_fields_are_joined_with_commas() {
        let error = ExecutionError::UnsupportedIndexFields {
            provider: "people-index".into(),
            fields: vec!["b".into(), "i".into()],
        };
        assert_eq!(error.to_string(), "unsupported fields by index 'people-index': b,i");
    }

    #[test]
    fn report_lists_every_issue() {
        let mut report = ValidationReport::default();
        report.push(ValidationIssue::EmptyProviderSlot { position: 1 });
        report.push(ValidationIssue::MissingFill {
            provider: "a-provider".into(),
            field: "a".into(),
        });

        assert_eq!(
            report.to_string(),
            "provider slot 1 is empty; provider 'a-provider' declares field 'a' without a fill callback"
        );
    }
}
