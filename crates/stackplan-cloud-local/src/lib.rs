//! Local provider for stackplan
//!
//! This crate implements the CloudProvider trait on top of the project
//! state file. Every resource kind is supported; identifiers, ARNs, DNS
//! names and mount target addresses are generated locally.
//!
//! # Example
//!
//! ```ignore
//! use stackplan_cloud::CloudProvider;
//! use stackplan_cloud_local::LocalProvider;
//! use stackplan_core::{StackParams, declare_stack};
//!
//! let provider = LocalProvider::new(".", "us-east-1");
//! let graph = declare_stack(&StackParams::default())?;
//!
//! let plan = provider.plan(&graph).await?;
//! let result = provider.apply(&graph, &plan).await?;
//! assert!(result.is_success());
//! ```

pub mod error;
pub mod provider;
pub mod resources;

pub use error::{LocalError, Result};
pub use provider::LocalProvider;
pub use resources::{ACCOUNT_ID, computed_outputs, new_id};
