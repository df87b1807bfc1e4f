//! Diff a desired resource graph against recorded state
//!
//! Resources are visited in dependency order. Each resource's inputs are
//! resolved against the values planned earlier in the same run and, for
//! unchanged resources, against the attributes recorded in state.

use crate::action::{Action, ActionType, AttributeChange, Plan};
use crate::error::Result;
use crate::outputs::recorded_value;
use crate::state::ProviderState;
use serde_json::{Map, Value};
use stackplan_core::{OutputRef, ResourceDecl, ResourceGraph, ResourceKey, select_attribute};
use std::collections::{BTreeSet, HashMap};

/// Resolved inputs of one resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInputs {
    /// Input fields as a JSON object
    pub value: Value,

    /// Input fields that still contain unknown values
    pub unknown: BTreeSet<String>,
}

impl ResolvedInputs {
    pub fn is_complete(&self) -> bool {
        self.unknown.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.get(name)
    }
}

/// Resolve every input of `decl` with `lookup`
pub fn resolve_inputs<F>(decl: &ResourceDecl, lookup: &F) -> ResolvedInputs
where
    F: Fn(&OutputRef) -> Option<Value>,
{
    let mut fields = Map::new();
    let mut unknown = BTreeSet::new();
    for (name, input) in &decl.inputs {
        let resolution = input.resolve(lookup);
        if !resolution.complete {
            unknown.insert(name.clone());
        }
        fields.insert(name.clone(), resolution.value);
    }
    ResolvedInputs {
        value: Value::Object(fields),
        unknown,
    }
}

struct Planned {
    action_type: ActionType,
    inputs: ResolvedInputs,
}

/// Build a plan that moves `current` to the desired `graph`
pub fn plan(provider: &str, graph: &ResourceGraph, current: &ProviderState) -> Result<Plan> {
    graph.validate()?;

    let mut planned: HashMap<ResourceKey, Planned> = HashMap::new();
    let mut actions = Vec::new();

    for decl in graph.topological_order()? {
        let lookup = |r: &OutputRef| lookup_planned(&planned, current, r);
        let inputs = resolve_inputs(decl, &lookup);

        let action = match current.get(&decl.key) {
            None => {
                tracing::debug!(resource = %decl.key, "not in state");
                Action::new(
                    ActionType::Create,
                    decl.key.clone(),
                    format!("Create {} {}", decl.key.kind, decl.key.name),
                )
                .with_detail("inputs", inputs.value.clone())
            }
            Some(recorded) if inputs.is_complete() && recorded.inputs == inputs.value => {
                Action::new(
                    ActionType::NoOp,
                    decl.key.clone(),
                    format!("{} {} is up to date", decl.key.kind, decl.key.name),
                )
            }
            Some(recorded) => {
                let changes = diff_fields(&recorded.inputs, &inputs.value);
                let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
                tracing::debug!(resource = %decl.key, changed = ?fields, "inputs changed");
                Action::new(
                    ActionType::Update,
                    decl.key.clone(),
                    format!(
                        "Update {} {} ({})",
                        decl.key.kind,
                        decl.key.name,
                        fields.join(", ")
                    ),
                )
                .with_detail("id", Value::String(recorded.id.clone()))
                .with_detail("inputs", inputs.value.clone())
                .with_changes(changes)
            }
        };

        planned.insert(
            decl.key.clone(),
            Planned {
                action_type: action.action_type,
                inputs,
            },
        );
        actions.push(action.with_detail("provider", Value::String(provider.to_string())));
    }

    for key in deletion_order(graph, current) {
        let id = current.get(&key).map(|r| r.id.clone()).unwrap_or_default();
        actions.push(
            Action::new(
                ActionType::Delete,
                key.clone(),
                format!("Delete {} {}", key.kind, key.name),
            )
            .with_detail("id", Value::String(id))
            .with_detail("provider", Value::String(provider.to_string())),
        );
    }

    let plan = Plan::new(actions);
    tracing::debug!("Plan: {}", plan.summary());
    Ok(plan)
}

/// Value of `r` as it will be once the resources planned so far are applied
fn lookup_planned(
    planned: &HashMap<ResourceKey, Planned>,
    current: &ProviderState,
    r: &OutputRef,
) -> Option<Value> {
    if let Some(p) = planned.get(&r.key) {
        if p.action_type != ActionType::NoOp && p.inputs.field(&r.attribute).is_some() {
            if p.inputs.unknown.contains(&r.attribute) {
                return None;
            }
            return select_attribute(p.inputs.field(&r.attribute), r.index);
        }
        if p.action_type == ActionType::Create {
            // computed on creation
            return None;
        }
    }
    recorded_value(current, r)
}

fn diff_fields(before: &Value, after: &Value) -> Vec<AttributeChange> {
    let empty = Map::new();
    let before = before.as_object().unwrap_or(&empty);
    let after = after.as_object().unwrap_or(&empty);

    let fields: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    fields
        .into_iter()
        .filter(|f| before.get(*f) != after.get(*f))
        .map(|f| AttributeChange {
            field: f.clone(),
            before: before.get(f).cloned(),
            after: after.get(f).cloned(),
        })
        .collect()
}

/// Recorded resources missing from the graph, dependents first
fn deletion_order(graph: &ResourceGraph, current: &ProviderState) -> Vec<ResourceKey> {
    let mut remaining: BTreeSet<ResourceKey> = current
        .keys()
        .into_iter()
        .filter(|k| !graph.contains(k))
        .collect();

    let mut order = Vec::new();
    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .find(|k| {
                !current
                    .dependents(k)
                    .iter()
                    .any(|d| remaining.contains(d))
            })
            .or_else(|| remaining.iter().next())
            .cloned();
        match next {
            Some(key) => {
                remaining.remove(&key);
                order.push(key);
            }
            None => break,
        }
    }
    order
}
