//! Local provider implementation

use crate::error::{LocalError, Result};
use crate::resources::{COMPUTED_ATTRIBUTES, computed_outputs, new_id, readdress_mount_targets};
use async_trait::async_trait;
use stackplan_cloud::{
    ActionType, ApplyResult, AuthStatus, CloudError, CloudProvider, Plan, ProviderState,
    ResourceState, ResourceStatus, StateManager, recorded_value, resolve_inputs,
};
use stackplan_core::{OutputRef, ResourceDecl, ResourceGraph, ResourceKey, ResourceKind};
use std::collections::HashSet;
use std::path::Path;

/// Provider that records resources in the project state file
///
/// Identifiers and computed attributes are generated locally, so a stack can
/// be planned, applied and torn down without cloud credentials.
pub struct LocalProvider {
    state: StateManager,
    region: String,
}

impl LocalProvider {
    pub fn new(project_root: impl AsRef<Path>, region: impl Into<String>) -> Self {
        Self {
            state: StateManager::new(project_root),
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Create or update one resource in `current`
    fn apply_resource(
        &self,
        decl: &ResourceDecl,
        action_type: ActionType,
        current: &mut ProviderState,
    ) -> Result<String> {
        let lookup = |r: &OutputRef| recorded_value(current, r);
        let inputs = resolve_inputs(decl, &lookup);
        if let Some(input) = inputs.unknown.iter().next() {
            return Err(CloudError::UnresolvedReference {
                resource: decl.key.to_string(),
                reference: input.clone(),
            }
            .into());
        }

        let mut resource = match (action_type, current.get(&decl.key)) {
            (ActionType::Create, None) => {
                let id = new_id(decl.key.kind);
                let outputs =
                    computed_outputs(&decl.key, &self.region, &id, &inputs.value, current)?;
                let mut resource = ResourceState::new(id, decl.key.kind.as_str());
                resource.attributes.extend(outputs);
                resource
            }
            (ActionType::Create, Some(_)) => {
                return Err(LocalError::AlreadyExists(decl.key.to_string()));
            }
            (_, Some(existing)) => {
                let mut resource = existing.clone();
                resource
                    .attributes
                    .retain(|k, _| COMPUTED_ATTRIBUTES.contains(&k.as_str()));
                resource.updated_at = chrono::Utc::now();
                resource
            }
            (_, None) => {
                return Err(CloudError::ResourceNotFound(decl.key.to_string()).into());
            }
        };

        if let Some(fields) = inputs.value.as_object() {
            for (name, value) in fields {
                if !COMPUTED_ATTRIBUTES.contains(&name.as_str()) {
                    resource.attributes.insert(name.clone(), value.clone());
                }
            }
        }
        resource.status = ResourceStatus::Running;
        resource.inputs = inputs.value;
        resource.dependencies = decl.dependencies();

        let block_changed = decl.key.kind == ResourceKind::Subnet
            && current.get(&decl.key).is_some_and(|old| {
                old.attributes.get("cidr_block") != resource.attributes.get("cidr_block")
            });
        let subnet_id = resource.id.clone();
        let message = format!("{} {} ({})", action_type, decl.key, resource.id);
        current.add(&decl.key, resource);

        if block_changed {
            for target in readdress_mount_targets(&subnet_id, current)? {
                tracing::info!("readdress {} in {}", target, decl.key);
            }
        }
        Ok(message)
    }
}

#[async_trait]
impl CloudProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn display_name(&self) -> &str {
        "Local (simulated)"
    }

    async fn check_auth(&self) -> stackplan_cloud::Result<AuthStatus> {
        let path = self.state.state_path();
        // state is written under the project directory
        if let Some(dir) = path.parent().filter(|d| d.exists() && !d.is_dir()) {
            return Ok(AuthStatus::failed(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        Ok(AuthStatus::ok(format!(
            "account {} ({})",
            crate::resources::ACCOUNT_ID,
            path.display()
        )))
    }

    async fn get_state(&self) -> stackplan_cloud::Result<ProviderState> {
        let global = self.state.load().await?;
        Ok(global.provider_state(self.name()))
    }

    async fn plan(&self, desired: &ResourceGraph) -> stackplan_cloud::Result<Plan> {
        let current = self.get_state().await?;
        stackplan_cloud::plan(self.name(), desired, &current)
    }

    async fn apply(
        &self,
        desired: &ResourceGraph,
        plan: &Plan,
    ) -> stackplan_cloud::Result<ApplyResult> {
        let lock = self.state.acquire_lock().await?;
        let mut global = self.state.load().await?;
        let mut current = global.provider_state(self.name());

        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();
        let mut failed: HashSet<ResourceKey> = HashSet::new();

        for action in &plan.actions {
            match action.action_type {
                ActionType::NoOp => {}
                ActionType::Create | ActionType::Update => {
                    let Some(decl) = desired.get(&action.key) else {
                        failed.insert(action.key.clone());
                        result.add_failure(
                            action.id.clone(),
                            format!("{} is not declared", action.key),
                        );
                        continue;
                    };

                    if let Some(dep) = decl.dependencies().iter().find(|d| failed.contains(*d)) {
                        tracing::warn!("Skipping {}: dependency {} failed", action.key, dep);
                        failed.insert(action.key.clone());
                        result.add_skipped(action.id.clone());
                        continue;
                    }

                    tracing::info!("{} {}", action.action_type, action.key);
                    match self.apply_resource(decl, action.action_type, &mut current) {
                        Ok(message) => result.add_success(action.id.clone(), message),
                        Err(e) => {
                            tracing::error!(
                                "Failed to {} {}: {}",
                                action.action_type,
                                action.key,
                                e
                            );
                            failed.insert(action.key.clone());
                            result.add_failure(action.id.clone(), e.to_string());
                        }
                    }
                }
                ActionType::Delete => {
                    let dependents: Vec<String> = current
                        .dependents(&action.key)
                        .iter()
                        .map(ToString::to_string)
                        .collect();
                    if !dependents.is_empty() {
                        let error = CloudError::DependencyViolation {
                            resource: action.key.to_string(),
                            dependents: dependents.join(", "),
                        };
                        result.add_failure(action.id.clone(), error.to_string());
                        continue;
                    }

                    tracing::info!("delete {}", action.key);
                    match current.remove(&action.key) {
                        Some(removed) => result.add_success(
                            action.id.clone(),
                            format!("delete {} ({})", action.key, removed.id),
                        ),
                        None => result.add_failure(
                            action.id.clone(),
                            CloudError::ResourceNotFound(action.key.to_string()).to_string(),
                        ),
                    }
                }
            }
        }

        global.replace_provider_state(self.name(), &current);
        self.state.save(&global).await?;
        lock.release().await?;

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn destroy(&self, key: &ResourceKey) -> stackplan_cloud::Result<()> {
        let lock = self.state.acquire_lock().await?;
        let mut global = self.state.load().await?;
        let mut current = global.provider_state(self.name());

        if !current.contains(key) {
            return Err(CloudError::ResourceNotFound(key.to_string()));
        }

        let dependents = current.dependents(key);
        if !dependents.is_empty() {
            return Err(CloudError::DependencyViolation {
                resource: key.to_string(),
                dependents: dependents
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        current.remove(key);
        tracing::info!("delete {}", key);

        global.replace_provider_state(self.name(), &current);
        self.state.save(&global).await?;
        lock.release().await?;
        Ok(())
    }

    async fn destroy_all(&self) -> stackplan_cloud::Result<ApplyResult> {
        let empty = ResourceGraph::new();
        let plan = self.plan(&empty).await?;
        self.apply(&empty, &plan).await
    }
}
