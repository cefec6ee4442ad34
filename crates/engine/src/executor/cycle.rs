//! Construction-time proof that the field dependency graph is acyclic.

use std::collections::HashMap;

use tracing::warn;

use crate::{
    error::{CyclePath, PlannerError},
    model::{FieldName, FieldRef},
    provider::FieldRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InStack,
    Done,
}

/// Depth-first search over every registered field, in sorted order so the
/// reported cycle is reproducible.
///
/// Dependencies without a provider are index fields and never part of a
/// cycle; raw index references (`_name`) are always such leaves.
pub(crate) fn check_for_cycles<R, D>(registry: &FieldRegistry<R, D>) -> Result<(), PlannerError> {
    let mut states: HashMap<FieldName, VisitState> = HashMap::new();

    let mut start_nodes: Vec<&FieldName> = registry.field_names().collect();
    start_nodes.sort();

    for node in start_nodes {
        if states.get(node) == Some(&VisitState::Done) {
            continue;
        }
        if let Some(mut cycle) = cycle_from_node(node, registry, &mut states) {
            cycle.reverse();
            let path = CyclePath::new(cycle);
            warn!(cycle = %path, "cycle found in field dependency");
            return Err(PlannerError::CyclicDependency { path });
        }
    }
    Ok(())
}

/// Returns the cycle reachable from `node`, innermost field first.
fn cycle_from_node<R, D>(
    node: &FieldName,
    registry: &FieldRegistry<R, D>,
    states: &mut HashMap<FieldName, VisitState>,
) -> Option<Vec<FieldName>> {
    match states.get(node) {
        Some(VisitState::InStack) => return Some(vec![node.clone()]),
        Some(VisitState::Done) => return None,
        None => {}
    }

    let provider = registry.provider_for(node.as_str())?;

    states.insert(node.clone(), VisitState::InStack);
    let cycle = registry.entry(provider).dependencies.iter().find_map(|dependency| match dependency {
        FieldRef::Bare(child) => cycle_from_node(child, registry, states),
        FieldRef::IndexRaw(_) => None,
    });
    states.insert(node.clone(), VisitState::Done);

    cycle.map(|mut cycle| {
        // Fields above the cycle's entry point are not part of it.
        let closed = cycle.len() > 1 && cycle.first() == cycle.last();
        if !closed {
            cycle.push(node.clone());
        }
        cycle
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Field, provider::ProviderEntry};

    fn registry(providers: Vec<(&str, Vec<&str>, Vec<&str>)>) -> FieldRegistry<(), ()> {
        let mut registry = FieldRegistry::new();
        for (name, fields, dependencies) in providers {
            registry
                .register(ProviderEntry {
                    name: name.to_string(),
                    fields: fields
                        .into_iter()
                        .map(|field| Field::new(field, |_, _| Ok(()), |_: &mut ()| {}))
                        .collect(),
                    dependencies: dependencies.into_iter().map(FieldRef::parse).collect(),
                })
                .expect("register provider");
        }
        registry
    }

    fn cycle_of(registry: &FieldRegistry<(), ()>) -> Option<String> {
        match check_for_cycles(registry) {
            Ok(()) => None,
            Err(PlannerError::CyclicDependency { path }) => Some(path.to_string()),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn acyclic_chain_passes() {
        let registry = registry(vec![
            ("a-provider", vec!["a"], vec!["b"]),
            ("b-provider", vec!["b"], vec!["c"]),
            ("c-provider", vec!["c"], vec!["d"]),
        ]);
        assert_eq!(cycle_of(&registry), None);
    }

    #[test]
    fn three_node_cycle_is_reported_dependent_first() {
        let registry = registry(vec![
            ("c-provider", vec!["c"], vec!["a"]),
            ("a-provider", vec!["a"], vec!["b"]),
            ("b-provider", vec!["b"], vec!["c"]),
        ]);
        assert_eq!(cycle_of(&registry).as_deref(), Some("a -> b -> c -> a"));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let registry = registry(vec![("a-provider", vec!["a"], vec!["a"])]);
        assert_eq!(cycle_of(&registry).as_deref(), Some("a -> a"));
    }

    #[test]
    fn raw_index_self_reference_is_not_a_cycle() {
        let registry = registry(vec![("a-provider", vec!["a"], vec!["_a"])]);
        assert_eq!(cycle_of(&registry), None);
    }

    #[test]
    fn path_excludes_fields_leading_into_the_cycle() {
        let registry = registry(vec![
            ("entry", vec!["a"], vec!["b"]),
            ("loop-b", vec!["b"], vec!["c"]),
            ("loop-c", vec!["c"], vec!["b"]),
        ]);
        assert_eq!(cycle_of(&registry).as_deref(), Some("b -> c -> b"));
    }

    #[test]
    fn shared_dependencies_are_visited_once() {
        let registry = registry(vec![
            ("top", vec!["top"], vec!["left", "right"]),
            ("left", vec!["left"], vec!["base"]),
            ("right", vec!["right"], vec!["base"]),
            ("base", vec!["base"], vec!["index-only"]),
        ]);
        assert_eq!(cycle_of(&registry), None);
    }
}
