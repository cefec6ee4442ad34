//! Field registry: maps every provider-declared field to the provider that owns it.
//!
//! Providers are snapshotted once at planner construction (their fields and
//! dependencies are read a single time) and stored in an arena. The registry
//! refers to them by [`ProviderId`], which is also the identity used to
//! schedule a provider at most once per plan.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    error::{PlannerError, ValidationIssue, ValidationReport},
    model::{Field, FieldName, FieldRef, IndexField},
};

use super::{FieldProvider, IndexProvider};

/// Stable handle of a registered provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(usize);

impl ProviderId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Snapshot of a field provider taken at construction.
pub(crate) struct ProviderEntry<R, D> {
    pub name: String,
    pub fields: Vec<Field<R, D>>,
    pub dependencies: Vec<FieldRef>,
}

impl<R, D> ProviderEntry<R, D> {
    pub(crate) fn snapshot(provider: &dyn FieldProvider<R, D>) -> Self {
        Self {
            name: provider.name().to_string(),
            fields: provider.provides(),
            dependencies: provider.depends_on(),
        }
    }

    /// Whether this provider asked for the raw index value of `field`, which
    /// marks its own `field` as an intended overwrite of the index value.
    pub(crate) fn overwrites_index_field(&self, field: &FieldName) -> bool {
        self.dependencies
            .iter()
            .any(|dependency| matches!(dependency, FieldRef::IndexRaw(name) if name == field))
    }
}

/// Snapshot of the index provider taken at construction.
pub(crate) struct IndexEntry<R, D> {
    pub provider: Arc<dyn IndexProvider<R, D>>,
    pub name: String,
    pub fields: Vec<IndexField<D>>,
}

impl<R, D> IndexEntry<R, D> {
    pub(crate) fn snapshot(provider: Arc<dyn IndexProvider<R, D>>) -> Self {
        Self {
            name: provider.name().to_string(),
            fields: provider.provides(),
            provider,
        }
    }

    pub(crate) fn declares(&self, field: &FieldName) -> bool {
        self.fields.iter().any(|index_field| &index_field.name == field)
    }
}

/// Immutable mapping from field name to owning provider.
pub struct FieldRegistry<R, D> {
    providers: Vec<ProviderEntry<R, D>>,
    owners: IndexMap<FieldName, ProviderId>,
}

impl<R, D> FieldRegistry<R, D> {
    pub(crate) fn new() -> Self {
        Self {
            providers: Vec::new(),
            owners: IndexMap::new(),
        }
    }

    /// Add a provider and claim its fields.
    ///
    /// Fails on the first field already owned by another provider. A provider
    /// that lists the same field twice keeps a single claim.
    pub(crate) fn register(&mut self, entry: ProviderEntry<R, D>) -> Result<ProviderId, PlannerError> {
        let id = ProviderId(self.providers.len());
        for field in &entry.fields {
            match self.owners.get(&field.name) {
                Some(owner) if *owner != id => {
                    return Err(PlannerError::duplicate_field_provider(
                        field.name.clone(),
                        self.providers[owner.0].name.clone(),
                        entry.name.clone(),
                    ));
                }
                Some(_) => continue,
                None => {
                    self.owners.insert(field.name.clone(), id);
                }
            }
        }
        debug!(
            provider = %entry.name,
            field_count = entry.fields.len(),
            dependency_count = entry.dependencies.len(),
            "provider registered"
        );
        self.providers.push(entry);
        Ok(id)
    }

    /// Provider owning `field`, or `None` when the field comes from the index.
    pub fn provider_for(&self, field: &str) -> Option<ProviderId> {
        self.owners.get(field).copied()
    }

    /// Name of the provider behind `id`; `None` for an id this registry never issued.
    pub fn provider_name(&self, id: ProviderId) -> Option<&str> {
        self.providers.get(id.0).map(|entry| entry.name.as_str())
    }

    /// Registered field names in registration order.
    pub fn field_names(&self) -> impl Iterator<Item = &FieldName> {
        self.owners.keys()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub(crate) fn entry(&self, id: ProviderId) -> &ProviderEntry<R, D> {
        &self.providers[id.0]
    }
}

impl<R, D> fmt::Debug for FieldRegistry<R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("provider_count", &self.providers.len())
            .field("fields", &self.owners.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Record an issue for every index field without a clear callback.
pub(crate) fn validate_index_fields<D>(provider: &str, fields: &[IndexField<D>], report: &mut ValidationReport) {
    for field in fields {
        if field.clear.is_none() {
            report.push(ValidationIssue::MissingIndexClear {
                provider: provider.to_string(),
                field: field.name.clone(),
            });
        }
    }
}

/// Record an issue for every incomplete or reserved field declaration.
pub(crate) fn validate_provider_fields<R, D>(provider: &str, fields: &[Field<R, D>], report: &mut ValidationReport) {
    for field in fields {
        if field.name.is_reserved() {
            report.push(ValidationIssue::ReservedFieldName {
                provider: provider.to_string(),
                field: field.name.clone(),
            });
        }
        if field.fill.is_none() {
            report.push(ValidationIssue::MissingFill {
                provider: provider.to_string(),
                field: field.name.clone(),
            });
        }
        if field.clear.is_none() {
            report.push(ValidationIssue::MissingClear {
                provider: provider.to_string(),
                field: field.name.clone(),
            });
        }
    }
}
