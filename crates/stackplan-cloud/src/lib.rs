//! stackplan cloud layer
//!
//! This crate turns a declared resource graph into an ordered plan of
//! actions and tracks what has been applied.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   stack CLI                      │
//! │            (stack plan / up / destroy)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               stackplan-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Provider Abstraction             │   │
//! │  │  trait CloudProvider { ... }              │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │   Planner    │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │     local     │
//! │   provider    │
//! └───────────────┘
//! ```

pub mod action;
pub mod error;
pub mod outputs;
pub mod planner;
pub mod provider;
pub mod state;

// Re-exports
pub use action::{
    Action, ActionResult, ActionType, ApplyResult, AttributeChange, Plan, PlanSummary,
};
pub use error::{CloudError, Result};
pub use outputs::{recorded_value, resolve_outputs};
pub use planner::{ResolvedInputs, plan, resolve_inputs};
pub use provider::{AuthStatus, CloudProvider};
pub use state::{
    GlobalState, ProviderState, ResourceState, ResourceStatus, StateLock, StateManager,
};
