//! Field activation: expands requested fields into an ordered provider list.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::warn;

use crate::{
    model::{FieldName, FieldRef},
    provider::{FieldRegistry, ProviderId},
};

/// Working state of one plan build.
///
/// Providers are appended post-order (dependencies first), so every provider
/// follows all providers it transitively depends on. Termination relies on
/// the registry having been proven acyclic. [`Activation::finish`] then moves
/// readers of a raw index value ahead of the provider that overwrites it.
pub(crate) struct Activation<'r, R, D> {
    registry: &'r FieldRegistry<R, D>,
    processed_fields: HashSet<FieldRef>,
    processed_providers: HashSet<ProviderId>,
    providers: Vec<ProviderId>,
    index_fields: BTreeSet<FieldName>,
}

impl<'r, R, D> Activation<'r, R, D> {
    pub(crate) fn new(registry: &'r FieldRegistry<R, D>) -> Self {
        Self {
            registry,
            processed_fields: HashSet::new(),
            processed_providers: HashSet::new(),
            providers: Vec::new(),
            index_fields: BTreeSet::new(),
        }
    }

    pub(crate) fn activate_field(&mut self, field: &FieldRef) {
        if !self.processed_fields.insert(field.clone()) {
            return;
        }

        match field {
            FieldRef::Bare(name) => match self.registry.provider_for(name.as_str()) {
                Some(provider) => self.activate_provider(provider),
                None => {
                    self.index_fields.insert(name.clone());
                }
            },
            FieldRef::IndexRaw(name) => {
                self.index_fields.insert(name.clone());
            }
        }
    }

    fn activate_provider(&mut self, provider: ProviderId) {
        if self.processed_providers.contains(&provider) {
            return;
        }

        let registry = self.registry;
        for dependency in &registry.entry(provider).dependencies {
            self.activate_field(dependency);
        }

        self.providers.push(provider);
        self.processed_providers.insert(provider);
    }

    /// Execution order and the fields to fetch from the index.
    pub(crate) fn finish(self) -> (Vec<ProviderId>, BTreeSet<FieldName>) {
        let providers = schedule_raw_readers_first(self.registry, self.providers);
        (providers, self.index_fields)
    }
}

/// Reorders `providers` so that a provider depending on `_x` runs before the
/// provider that overwrites `x`, while every provider still follows the
/// owners of its bare dependencies. Ties keep activation order.
///
/// When both constraints cannot hold, the activation order is kept as is.
fn schedule_raw_readers_first<R, D>(registry: &FieldRegistry<R, D>, providers: Vec<ProviderId>) -> Vec<ProviderId> {
    let slots: HashMap<ProviderId, usize> = providers.iter().enumerate().map(|(slot, id)| (*id, slot)).collect();
    let mut run_after: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); providers.len()];
    let mut reorder = false;

    for (slot, id) in providers.iter().enumerate() {
        for dependency in &registry.entry(*id).dependencies {
            let Some(owner) = registry.provider_for(dependency.name().as_str()) else {
                continue;
            };
            let Some(&owner_slot) = slots.get(&owner) else {
                continue;
            };
            if owner_slot == slot {
                continue;
            }
            match dependency {
                FieldRef::Bare(_) => {
                    run_after[slot].insert(owner_slot);
                }
                FieldRef::IndexRaw(name) if registry.entry(owner).overwrites_index_field(name) => {
                    run_after[owner_slot].insert(slot);
                    reorder |= owner_slot < slot;
                }
                FieldRef::IndexRaw(_) => {}
            }
        }
    }

    if !reorder {
        return providers;
    }

    let mut placed = vec![false; providers.len()];
    let mut ordered = Vec::with_capacity(providers.len());
    while ordered.len() < providers.len() {
        let ready = (0..providers.len()).find(|&slot| !placed[slot] && run_after[slot].iter().all(|before| placed[*before]));
        let Some(slot) = ready else {
            warn!("raw index reader also depends on the overwritten field; keeping activation order");
            return providers;
        };
        placed[slot] = true;
        ordered.push(providers[slot]);
    }
    ordered
}
