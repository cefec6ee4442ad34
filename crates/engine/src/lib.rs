//! # Fieldplan Engine
//!
//! Resolves and executes a graph of *field providers* that enrich a batch of
//! documents. Callers name the fields they want; the planner works out which
//! providers to run and in what order, runs them, and clears every field
//! that was computed along the way but not requested.
//!
//! ## Lifecycle
//!
//! 1. [`Planner::builder`] validates every provider declaration, registers
//!    each field with its owning provider, and proves the dependency graph
//!    acyclic. This happens once.
//! 2. [`Planner::new_plan`] expands a [`Request`] into an ordered provider
//!    list plus the fields the index must supply. This never fails.
//! 3. [`Plan::execute`] asks the [`IndexProvider`] for the documents, runs
//!    each [`FieldProvider`] over every document with a fresh provider-scoped
//!    [`Cache`], and clears unrequested fields.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use fieldplan_engine::{
//!     ExecutionContext, Field, FieldName, FieldProvider, FieldRef, FieldSelection, IndexField, IndexProvider, Payload, Planner,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     id: Option<String>,
//!     greeting: Option<String>,
//! }
//!
//! struct PeopleIndex;
//!
//! impl IndexProvider<FieldSelection, Person> for PeopleIndex {
//!     fn provides(&self) -> Vec<IndexField<Person>> {
//!         vec![IndexField::new("id", |person: &mut Person| person.id = None)]
//!     }
//!
//!     fn execute(&self, _: &FieldSelection, _: &[FieldName], _: &CancellationToken) -> anyhow::Result<Payload<Person>> {
//!         Ok(Payload::new(vec![Person { id: Some("ana".into()), ..Default::default() }]))
//!     }
//! }
//!
//! struct Greeter;
//!
//! impl FieldProvider<FieldSelection, Person> for Greeter {
//!     fn provides(&self) -> Vec<Field<FieldSelection, Person>> {
//!         vec![Field::new(
//!             "greeting",
//!             |index, ctx: &mut ExecutionContext<'_, FieldSelection, Person>| {
//!                 let person = ctx.document_mut(index).ok_or_else(|| anyhow::anyhow!("missing document"))?;
//!                 person.greeting = person.id.as_ref().map(|id| format!("hello {id}"));
//!                 Ok(())
//!             },
//!             |person: &mut Person| person.greeting = None,
//!         )]
//!     }
//!
//!     fn depends_on(&self) -> Vec<FieldRef> {
//!         vec![FieldRef::bare("id")]
//!     }
//! }
//!
//! let greeter: Arc<dyn FieldProvider<FieldSelection, Person>> = Arc::new(Greeter);
//! let planner: Planner<FieldSelection, Person> = Planner::new(Arc::new(PeopleIndex), [greeter])?;
//! let payload = planner.new_plan(FieldSelection::new(["greeting"])).execute(&CancellationToken::new())?;
//!
//! assert_eq!(payload.documents[0].greeting.as_deref(), Some("hello ana"));
//! assert_eq!(payload.documents[0].id, None);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`model`**: field names, raw-index references, field declarations, payload
//! - **`provider`**: provider capability traits, the field registry, the provider cache
//! - **`executor`**: cycle detection, plan building, and plan execution
//! - **`planner`**: construction and validation entry point
//! - **`config`**: planner options
//! - **`error`**: construction and execution error types

pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod planner;
pub mod provider;

pub use config::{IndexOverwritePolicy, PlannerOptions};
pub use error::{CyclePath, ExecutionError, PlannerError, ValidationIssue, ValidationReport};
pub use executor::{ExecutionContext, Plan};
pub use model::{ClearFn, Field, FieldName, FieldRef, FillFn, INDEX_RAW_PREFIX, IndexField, Payload};
pub use planner::{Planner, PlannerBuilder};
pub use provider::{Cache, CacheError, FieldProvider, FieldRegistry, FieldSelection, IndexProvider, ProviderId, Request};
