//! Cloud provider trait definition

use crate::action::{ApplyResult, Plan};
use crate::error::Result;
use crate::state::ProviderState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stackplan_core::{ResourceGraph, ResourceKey};

/// Cloud provider abstraction trait
///
/// Providers receive the whole resource graph so that output references
/// between resources can be resolved in dependency order.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "local")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Get the current state of all resources managed by this provider
    async fn get_state(&self) -> Result<ProviderState>;

    /// Calculate the diff between desired and current state
    async fn plan(&self, desired: &ResourceGraph) -> Result<Plan>;

    /// Apply the planned actions
    async fn apply(&self, desired: &ResourceGraph, plan: &Plan) -> Result<ApplyResult>;

    /// Destroy a specific resource
    async fn destroy(&self, key: &ResourceKey) -> Result<()>;

    /// Destroy all resources managed by this provider
    async fn destroy_all(&self) -> Result<ApplyResult>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}
