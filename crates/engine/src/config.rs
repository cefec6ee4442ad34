//! Planner options.

use serde::{Deserialize, Serialize};

/// How a provider's fill is treated when the index already produced the same field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOverwritePolicy {
    /// A provider that depends on the raw index form (`_name`) of a field it
    /// produces is run for that field, replacing the index value. Providers
    /// without that declaration are still skipped. Providers that read the
    /// raw value are scheduled before the one that replaces it.
    #[default]
    AllowDeclared,
    /// The index value always wins; providers are never run for a field the
    /// index already filled.
    PreserveIndex,
}

/// Tunable planner behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerOptions {
    pub index_overwrite: IndexOverwritePolicy,
}
