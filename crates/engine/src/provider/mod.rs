//! Provider capability contracts and the field registry.
//!
//! Modules:
//! - `registry`: Field-to-provider registry, provider snapshots, and declaration validation
//! - `cache`: Provider-scoped memoization used while a provider executes

mod cache;
mod registry;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

pub use cache::{Cache, CacheError};
pub use registry::{FieldRegistry, ProviderId};
pub(crate) use registry::{IndexEntry, ProviderEntry, validate_index_fields, validate_provider_fields};

use crate::model::{Field, FieldName, FieldRef, IndexField, Payload};

/// Request handed to a plan. Only the requested field names are visible to
/// the planner; everything else is for the providers.
pub trait Request {
    /// Requested fields in request order. The order drives provider ordering.
    fn requested_fields(&self) -> Vec<FieldRef>;
}

/// Component that produces one or more fields, optionally from other fields.
pub trait FieldProvider<R, D>: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn provides(&self) -> Vec<Field<R, D>>;

    /// Fields that must be filled before this provider runs.
    ///
    /// Use [`FieldRef::IndexRaw`] (textually `_name`) to read the index value
    /// of a field this provider overwrites.
    fn depends_on(&self) -> Vec<FieldRef> {
        Vec::new()
    }
}

/// Root of the field graph: creates the document batch that providers enrich.
///
/// Index providers have no dependencies.
pub trait IndexProvider<R, D>: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn provides(&self) -> Vec<IndexField<D>>;

    /// Create the initial documents, populating at least `fields` (sorted).
    ///
    /// The cancellation token belongs to the caller; implementations that
    /// observe it should return an error.
    fn execute(&self, request: &R, fields: &[FieldName], cancellation: &CancellationToken) -> Result<Payload<D>>;
}

/// Request carrying nothing but the requested field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldSelection {
    pub fields: Vec<String>,
}

impl FieldSelection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Request for FieldSelection {
    fn requested_fields(&self) -> Vec<FieldRef> {
        self.fields.iter().map(|field| FieldRef::parse(field)).collect()
    }
}
