//! Deployment backends for Stacksmith.
//!
//! Provides:
//! - A dry-run deployer that records what would be provisioned
//! - The deployment driver, which walks a topology in dependency order

pub mod driver;
pub mod dry_run;

pub use driver::{DeploymentDriver, DeploymentReport, StackOutcome, teardown_order};
pub use dry_run::DryRunDeployer;
pub use stacksmith_core::deployer::{
    Deployer, DeploymentEvent, DeploymentEventKind, DeploymentHandle, DeploymentState,
    DeploymentStatus, ValidationWarning,
};
