//! Stack outputs resolved from recorded state

use crate::state::ProviderState;
use serde_json::Value;
use stackplan_core::{OutputRef, Resolution, ResourceGraph, select_attribute};
use std::collections::BTreeMap;

/// Recorded value of an output reference
pub fn recorded_value(state: &ProviderState, r: &OutputRef) -> Option<Value> {
    let resource = state.get(&r.key)?;
    select_attribute(resource.attributes.get(&r.attribute), r.index)
}

/// Resolve the graph's named outputs against `state`
///
/// Outputs of resources that have not been applied yet are incomplete.
pub fn resolve_outputs(
    graph: &ResourceGraph,
    state: &ProviderState,
) -> BTreeMap<String, Resolution> {
    let lookup = |r: &OutputRef| recorded_value(state, r);
    graph
        .outputs()
        .iter()
        .map(|(name, input)| (name.clone(), input.resolve(&lookup)))
        .collect()
}
