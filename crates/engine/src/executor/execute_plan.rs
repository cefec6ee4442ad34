//! Plan execution: index fetch, provider fills, and the clearing pass.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};

use crate::{
    config::IndexOverwritePolicy,
    error::ExecutionError,
    model::{ClearFn, FieldName, FieldRef, Payload},
    provider::{IndexEntry, ProviderEntry, Request},
};

use super::{ExecutionContext, Plan};

pub(super) fn execute_plan<R: Request, D>(plan: &Plan<'_, R, D>, cancellation: &CancellationToken) -> Result<Payload<D>, ExecutionError> {
    let span = info_span!(
        "plan_execution",
        provider_count = plan.providers.len(),
        index_field_count = plan.index_fields.len()
    );
    let _entered = span.enter();

    let index = &plan.planner.index;
    ensure_index_supports_fields(plan, index)?;

    let index_fields: Vec<FieldName> = plan.index_fields.iter().cloned().collect();
    debug!(index = %index.name, fields = ?index_fields, "index fetch started");
    let mut payload = index
        .provider
        .execute(&plan.request, &index_fields, cancellation)
        .map_err(|source| {
            warn!(index = %index.name, error = %source, "index fetch failed");
            ExecutionError::IndexExecutionFailed {
                provider: index.name.clone(),
                source,
            }
        })?;
    info!(index = %index.name, document_count = payload.documents.len(), "index fetch completed");

    let mut filled_fields = fields_filled_by_index(plan, index);
    let overwrite_policy = plan.planner.options.index_overwrite;
    for provider in &plan.providers {
        let entry = plan.planner.registry.entry(*provider);
        execute_provider(entry, &plan.request, &mut payload, &mut filled_fields, overwrite_policy, cancellation)?;
    }

    clear_unrequested_fields(plan, &mut payload);
    info!(
        provider_count = plan.providers.len(),
        document_count = payload.documents.len(),
        "plan execution finished"
    );
    Ok(payload)
}

fn ensure_index_supports_fields<R, D>(plan: &Plan<'_, R, D>, index: &IndexEntry<R, D>) -> Result<(), ExecutionError> {
    let unsupported: Vec<FieldName> = plan
        .index_fields
        .iter()
        .filter(|field| !index.declares(field))
        .cloned()
        .collect();
    if unsupported.is_empty() {
        return Ok(());
    }

    warn!(index = %index.name, fields = ?unsupported, "plan requests fields the index does not provide");
    Err(ExecutionError::UnsupportedIndexFields {
        provider: index.name.clone(),
        fields: unsupported,
    })
}

/// Index-declared fields that this plan fetches from the index.
fn fields_filled_by_index<R, D>(plan: &Plan<'_, R, D>, index: &IndexEntry<R, D>) -> HashSet<FieldName> {
    index
        .fields
        .iter()
        .filter(|field| plan.index_fields.contains(&field.name))
        .map(|field| field.name.clone())
        .collect()
}

fn execute_provider<R, D>(
    entry: &ProviderEntry<R, D>,
    request: &R,
    payload: &mut Payload<D>,
    filled_fields: &mut HashSet<FieldName>,
    overwrite_policy: IndexOverwritePolicy,
    cancellation: &CancellationToken,
) -> Result<(), ExecutionError> {
    debug!(provider = %entry.name, "provider execution started");
    let mut context = ExecutionContext::new(request, payload, cancellation);

    for field in &entry.fields {
        if filled_fields.contains(&field.name) && !may_overwrite(entry, &field.name, overwrite_policy) {
            debug!(provider = %entry.name, field = %field.name, "field already filled; skipping");
            continue;
        }
        // Declarations were validated at construction.
        let Some(fill) = field.fill.as_ref() else {
            continue;
        };

        let document_count = context.documents().len();
        for document_index in 0..document_count {
            fill(document_index, &mut context).map_err(|source| {
                warn!(
                    provider = %entry.name,
                    field = %field.name,
                    document_index,
                    error = %source,
                    "field fill failed"
                );
                ExecutionError::FieldFillFailed {
                    provider: entry.name.clone(),
                    field: field.name.clone(),
                    document_index,
                    source,
                }
            })?;
        }
        filled_fields.insert(field.name.clone());
    }

    debug!(provider = %entry.name, "provider execution finished");
    Ok(())
}

fn may_overwrite<R, D>(entry: &ProviderEntry<R, D>, field: &FieldName, policy: IndexOverwritePolicy) -> bool {
    match policy {
        IndexOverwritePolicy::AllowDeclared => entry.overwrites_index_field(field),
        IndexOverwritePolicy::PreserveIndex => false,
    }
}

/// Clear every index or planned-provider field that the request did not ask for.
fn clear_unrequested_fields<R: Request, D>(plan: &Plan<'_, R, D>, payload: &mut Payload<D>) {
    let requested: HashSet<FieldName> = plan
        .request
        .requested_fields()
        .into_iter()
        .filter_map(|field| match field {
            FieldRef::Bare(name) => Some(name),
            FieldRef::IndexRaw(_) => None,
        })
        .collect();

    let index_clears = plan
        .planner
        .index
        .fields
        .iter()
        .filter(|field| !requested.contains(&field.name))
        .filter_map(|field| field.clear.as_ref());
    let provider_clears = plan
        .providers
        .iter()
        .flat_map(|provider| plan.planner.registry.entry(*provider).fields.iter())
        .filter(|field| !requested.contains(&field.name))
        .filter_map(|field| field.clear.as_ref());
    let clears: Vec<&ClearFn<D>> = index_clears.chain(provider_clears).collect();

    for document in payload.documents.iter_mut() {
        for clear in &clears {
            clear(document);
        }
    }
    debug!(
        cleared_field_count = clears.len(),
        document_count = payload.documents.len(),
        "unrequested fields cleared"
    );
}
