//! Dry-run deployer.
//!
//! Records what a provider would be asked to create and fabricates the
//! deploy-time attributes (endpoints, ARNs, URLs) a real deployment would
//! report. Nothing leaves the process.

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use futures::stream::BoxStream;
use stacksmith_core::deployer::*;
use stacksmith_core::resource::{FunctionUrlAuthType, RemovalPolicy, ResourceProps, SubnetType};
use stacksmith_core::{Error, LogicalId, Result, RunId, Stack, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tracing::{debug, info, warn};

struct Record {
    stack: LogicalId,
    state: DeploymentState,
    events: Vec<DeploymentEvent>,
}

impl Record {
    fn push(&mut self, kind: DeploymentEventKind, message: impl Into<String>) {
        self.events.push(DeploymentEvent {
            timestamp: Utc::now(),
            stack: self.stack.clone(),
            kind,
            message: message.into(),
        });
        self.state.last_updated = Utc::now();
    }
}

/// In-memory deployer.
#[derive(Default)]
pub struct DryRunDeployer {
    deployments: Mutex<HashMap<RunId, Record>>,
    /// Stacks the simulated provider rejects.
    failing: HashSet<String>,
}

impl DryRunDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every deployment of `stack`.
    pub fn with_failure(mut self, stack: impl Into<String>) -> Self {
        self.failing.insert(stack.into());
        self
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, HashMap<RunId, Record>>> {
        self.deployments
            .lock()
            .map_err(|_| Error::DeploymentFailed("deployment state lock poisoned".to_string()))
    }

    fn handle(&self, id: RunId, stack: &Stack) -> DeploymentHandle {
        DeploymentHandle {
            id,
            stack: stack.id().clone(),
            deployer_name: self.name().to_string(),
        }
    }
}

/// Value a provider would report for `attribute` of `resource`.
pub fn fabricate_attribute(stack: &str, resource: &str, attribute: &str) -> String {
    let name = format!("{}-{}", stack, resource).to_lowercase();
    match attribute {
        "Endpoint.Address" => format!("{}.dry-run.rds.local", name),
        "Endpoint.Port" => "3306".to_string(),
        "FunctionUrl" => format!("https://{}.lambda-url.dry-run.local/", name),
        "FunctionName" => name,
        "Arn" => format!("arn:dry-run:{}:{}", stack, resource),
        "VpcId" => format!("vpc-{}", name),
        _ => format!("{}/{}", name, attribute),
    }
}

fn concrete(value: &Value) -> Result<String> {
    match value {
        Value::Literal { value } => Ok(value.clone()),
        Value::Attribute {
            stack,
            resource,
            attribute,
        } => Ok(fabricate_attribute(
            stack.as_str(),
            resource.as_str(),
            attribute,
        )),
        Value::Output { reference } => Err(Error::UnresolvedReference(reference.to_string())),
    }
}

#[async_trait]
impl Deployer for DryRunDeployer {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn validate(&self, stack: &Stack) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();
        let mut warn_on = |resource: &LogicalId, message: String| {
            warnings.push(ValidationWarning {
                resource: Some(resource.clone()),
                message,
            });
        };

        for resource in stack.resources() {
            match resource.props() {
                ResourceProps::Function(f) => {
                    if let Some(url) = &f.url {
                        if url.auth_type == FunctionUrlAuthType::None && url.cors.is_none() {
                            warn_on(
                                resource.id(),
                                "unauthenticated function URL without a CORS policy".to_string(),
                            );
                        }
                    }
                }
                ResourceProps::Database(db) => {
                    if db.subnet_type == SubnetType::Public {
                        warn_on(
                            resource.id(),
                            "database is placed in public subnets".to_string(),
                        );
                    }
                    if db.removal_policy == RemovalPolicy::Destroy && !db.deletion_protection {
                        warn_on(
                            resource.id(),
                            format!(
                                "database '{}' is deleted with its stack",
                                db.database_name
                            ),
                        );
                    }
                }
                ResourceProps::Rule(rule) if !rule.enabled => {
                    warn_on(resource.id(), "rule is disabled".to_string());
                }
                _ => {}
            }
        }

        for output in stack.outputs() {
            concrete(&output.value)?;
        }
        Ok(warnings)
    }

    async fn deploy(&self, stack: &Stack) -> Result<DeploymentHandle> {
        let id = RunId::new();
        let mut record = Record {
            stack: stack.id().clone(),
            state: DeploymentState {
                status: DeploymentStatus::InProgress,
                outputs: BTreeMap::new(),
                last_updated: Utc::now(),
            },
            events: Vec::new(),
        };
        record.push(
            DeploymentEventKind::Started,
            format!("deploying {} resources", stack.resources().len()),
        );

        if self.failing.contains(stack.id().as_str()) {
            let message = format!("provider rejected stack '{}'", stack.id());
            if let Some(first) = stack.resources().first() {
                record.push(
                    DeploymentEventKind::ResourceFailed,
                    format!("{} '{}' could not be created", first.kind(), first.id()),
                );
            }
            record.push(DeploymentEventKind::Failed, message.clone());
            record.state.status = DeploymentStatus::Failed { message };
            warn!(stack = %stack.id(), "Dry-run deployment rejected");
        } else {
            for resource in stack.resources() {
                debug!(stack = %stack.id(), resource = %resource.id(), kind = %resource.kind(), "Would create resource");
                record.push(
                    DeploymentEventKind::ResourceCreated,
                    format!("{} '{}'", resource.kind(), resource.id()),
                );
            }
            for output in stack.outputs() {
                record
                    .state
                    .outputs
                    .insert(output.name.to_string(), concrete(&output.value)?);
            }
            record.push(DeploymentEventKind::Completed, "stack provisioned");
            record.state.status = DeploymentStatus::Provisioned;
            info!(stack = %stack.id(), run = %id, "Dry-run deployment provisioned");
        }

        self.records()?.insert(id, record);
        Ok(self.handle(id, stack))
    }

    async fn state(&self, handle: &DeploymentHandle) -> Result<DeploymentState> {
        self.records()?
            .get(&handle.id)
            .map(|r| r.state.clone())
            .ok_or_else(|| Error::NotFound(format!("deployment {}", handle.id)))
    }

    async fn events(
        &self,
        handle: &DeploymentHandle,
    ) -> Result<BoxStream<'static, DeploymentEvent>> {
        let events = self
            .records()?
            .get(&handle.id)
            .map(|r| r.events.clone())
            .ok_or_else(|| Error::NotFound(format!("deployment {}", handle.id)))?;
        Ok(futures::stream::iter(events).boxed())
    }

    async fn destroy(&self, handle: &DeploymentHandle) -> Result<()> {
        let mut records = self.records()?;
        let record = records
            .get_mut(&handle.id)
            .ok_or_else(|| Error::NotFound(format!("deployment {}", handle.id)))?;
        if record.state.status == DeploymentStatus::Destroyed {
            return Ok(());
        }
        record.push(DeploymentEventKind::DestroyStarted, "removing resources");
        record.state.status = DeploymentStatus::Destroyed;
        record.state.outputs.clear();
        record.push(DeploymentEventKind::Destroyed, "stack removed");
        info!(stack = %record.stack, run = %handle.id, "Dry-run stack destroyed");
        Ok(())
    }
}
