//! Deployer trait and deployment types.
//!
//! Deployers hand registered stacks to a cloud provider. Everything that
//! happens on the provider side is opaque; a deployer only reports whether a
//! stack ended up provisioned or failed, and the concrete values of the
//! deploy-time attributes it created.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::id::{LogicalId, RunId};
use crate::stack::Stack;
use crate::Result;

/// Handle to a deployed stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentHandle {
    pub id: RunId,
    pub stack: LogicalId,
    pub deployer_name: String,
}

/// Status of a stack deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentStatus {
    /// Deployment has not started.
    Pending,
    /// Deployment is in progress.
    InProgress,
    /// All resources were created or updated.
    Provisioned,
    /// The provider rejected the stack.
    Failed { message: String },
    /// Resources were removed.
    Destroyed,
}

impl DeploymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeploymentStatus::Provisioned
                | DeploymentStatus::Failed { .. }
                | DeploymentStatus::Destroyed
        )
    }
}

/// Current state of a stack deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    pub status: DeploymentStatus,
    /// Concrete output values, keyed by output name.
    pub outputs: BTreeMap<String, String>,
    pub last_updated: DateTime<Utc>,
}

/// Deployment event for progress reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentEvent {
    pub timestamp: DateTime<Utc>,
    pub stack: LogicalId,
    pub kind: DeploymentEventKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentEventKind {
    Started,
    ResourceCreated,
    ResourceFailed,
    Completed,
    Failed,
    DestroyStarted,
    Destroyed,
}

/// Warning from deployment validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub resource: Option<LogicalId>,
    pub message: String,
}

/// Trait for deployers.
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Name of this deployer.
    fn name(&self) -> &'static str;

    /// Validate a stack before deploying.
    async fn validate(&self, stack: &Stack) -> Result<Vec<ValidationWarning>>;

    /// Create or update the resources of a stack.
    async fn deploy(&self, stack: &Stack) -> Result<DeploymentHandle>;

    /// Get current deployment state.
    async fn state(&self, handle: &DeploymentHandle) -> Result<DeploymentState>;

    /// Stream deployment events.
    async fn events(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<BoxStream<'static, DeploymentEvent>>;

    /// Remove the resources of a deployed stack.
    async fn destroy(&self, handle: &DeploymentHandle) -> Result<()>;
}
