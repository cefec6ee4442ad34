//! Execution engine: cycle proof, plan building, and plan execution.
//!
//! - `cycle`: construction-time acyclicity check over the registry
//! - `planning`: per-request field activation into an ordered provider list
//! - `execute_plan`: index fetch, provider fills, and the clearing pass
//! - `context`: the per-provider [`ExecutionContext`] handed to fill callbacks

mod context;
mod cycle;
mod execute_plan;
mod planning;

use std::{collections::BTreeSet, fmt};

use tokio_util::sync::CancellationToken;

pub use context::ExecutionContext;
pub(crate) use cycle::check_for_cycles;
pub(crate) use planning::Activation;

use crate::{
    Planner,
    error::ExecutionError,
    model::{FieldName, Payload},
    provider::{ProviderId, Request},
};

/// Resolved work for one request: providers in execution order and the
/// fields the index must supply.
///
/// Building a plan never fails; unsupported index fields are reported when
/// the plan is executed.
pub struct Plan<'p, R, D> {
    pub(crate) planner: &'p Planner<R, D>,
    pub(crate) request: R,
    pub(crate) providers: Vec<ProviderId>,
    pub(crate) index_fields: BTreeSet<FieldName>,
}

impl<'p, R: Request, D> Plan<'p, R, D> {
    pub fn request(&self) -> &R {
        &self.request
    }

    /// Providers in execution order.
    pub fn providers(&self) -> &[ProviderId] {
        &self.providers
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter_map(|provider| self.planner.registry().provider_name(*provider))
            .collect()
    }

    /// Fields to fetch from the index, sorted.
    pub fn index_fields(&self) -> &BTreeSet<FieldName> {
        &self.index_fields
    }

    /// Run the plan and return the enriched payload.
    ///
    /// Stops at the first error; fills already applied are not rolled back
    /// and no payload is returned.
    pub fn execute(&self, cancellation: &CancellationToken) -> Result<Payload<D>, ExecutionError> {
        execute_plan::execute_plan(self, cancellation)
    }
}

impl<R, D> fmt::Debug for Plan<'_, R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("providers", &self.providers)
            .field("index_fields", &self.index_fields)
            .finish()
    }
}
