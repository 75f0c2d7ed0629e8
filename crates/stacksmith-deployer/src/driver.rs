//! Deployment driver - deploys a topology stack by stack in dependency order.

use futures::StreamExt;
use serde::Serialize;
use stacksmith_core::deployer::{Deployer, DeploymentHandle, DeploymentStatus, ValidationWarning};
use stacksmith_core::{Error, LogicalId, Result, Stack, StackStatus, Topology};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to one stack.
#[derive(Debug, Clone, Serialize)]
pub struct StackOutcome {
    pub stack: LogicalId,
    pub status: StackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<DeploymentHandle>,
    pub outputs: BTreeMap<String, String>,
    pub warnings: Vec<ValidationWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StackOutcome {
    fn new(stack: &Stack, status: StackStatus) -> Self {
        Self {
            stack: stack.id().clone(),
            status,
            handle: None,
            outputs: BTreeMap::new(),
            warnings: Vec::new(),
            message: None,
        }
    }
}

/// Result of a deployment.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentReport {
    pub success: bool,
    /// Outcomes in deployment order.
    pub stacks: Vec<StackOutcome>,
}

impl DeploymentReport {
    pub fn outcome(&self, stack: &str) -> Option<&StackOutcome> {
        self.stacks.iter().find(|o| o.stack == stack)
    }
}

/// Drives a [`Deployer`] over a topology.
pub struct DeploymentDriver {
    deployer: Arc<dyn Deployer>,
}

impl DeploymentDriver {
    pub fn new(deployer: Arc<dyn Deployer>) -> Self {
        Self { deployer }
    }

    /// Deploy the selected stacks and everything they depend on.
    ///
    /// An empty selection deploys the whole topology. A stack whose producer
    /// did not end up provisioned is skipped. Every stack touched gets its
    /// final status recorded in `topology`.
    pub async fn deploy(
        &self,
        topology: &mut Topology,
        selection: &[String],
    ) -> Result<DeploymentReport> {
        let included = select(topology, selection)?;
        let order: Vec<Stack> = topology
            .deployment_order()?
            .into_iter()
            .filter(|s| included.contains(s.id()))
            .cloned()
            .collect();

        info!(
            deployer = self.deployer.name(),
            stacks = order.len(),
            "Starting deployment"
        );

        let mut statuses: HashMap<LogicalId, StackStatus> = HashMap::new();
        let mut outcomes = Vec::with_capacity(order.len());

        for stack in &order {
            let failed_deps: Vec<&LogicalId> = stack
                .dependencies()
                .iter()
                .filter(|dep| statuses.get(*dep) != Some(&StackStatus::Provisioned))
                .collect();

            let outcome = if !failed_deps.is_empty() {
                info!(stack = %stack.id(), ?failed_deps, "Skipping stack due to failed dependencies");
                let mut outcome = StackOutcome::new(stack, StackStatus::Skipped);
                outcome.message = Some(format!(
                    "dependencies not provisioned: {}",
                    failed_deps
                        .iter()
                        .map(|d| d.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
                outcome
            } else {
                match self.deploy_stack(stack).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(stack = %stack.id(), error = %e, "Stack deployment failed");
                        let mut outcome = StackOutcome::new(stack, StackStatus::Failed);
                        outcome.message = Some(e.to_string());
                        outcome
                    }
                }
            };

            topology.set_status(stack.id().as_str(), outcome.status)?;
            statuses.insert(stack.id().clone(), outcome.status);
            outcomes.push(outcome);
        }

        let success = outcomes
            .iter()
            .all(|o| o.status == StackStatus::Provisioned);
        info!(success, "Deployment finished");
        Ok(DeploymentReport {
            success,
            stacks: outcomes,
        })
    }

    async fn deploy_stack(&self, stack: &Stack) -> Result<StackOutcome> {
        let warnings = self.deployer.validate(stack).await?;
        for warning in &warnings {
            warn!(stack = %stack.id(), resource = ?warning.resource.as_ref().map(|r| r.as_str()), "{}", warning.message);
        }

        let handle = self.deployer.deploy(stack).await?;
        let (status, outputs, message) = match self.observe(stack, &handle).await {
            Ok(observed) => observed,
            Err(e) => {
                error!(stack = %stack.id(), run = %handle.id, error = %e, "Lost track of deployment");
                (StackStatus::Failed, BTreeMap::new(), Some(e.to_string()))
            }
        };

        Ok(StackOutcome {
            stack: stack.id().clone(),
            status,
            handle: Some(handle),
            outputs,
            warnings,
            message,
        })
    }

    /// Drain the events of a started deployment and read its final state.
    async fn observe(
        &self,
        stack: &Stack,
        handle: &DeploymentHandle,
    ) -> Result<(StackStatus, BTreeMap<String, String>, Option<String>)> {
        let mut events = self.deployer.events(handle).await?;
        while let Some(event) = events.next().await {
            debug!(stack = %event.stack, kind = ?event.kind, "{}", event.message);
        }

        let state = self.deployer.state(handle).await?;
        match state.status {
            DeploymentStatus::Provisioned => {
                info!(stack = %stack.id(), "Stack provisioned");
                Ok((StackStatus::Provisioned, state.outputs, None))
            }
            DeploymentStatus::Failed { message } => {
                error!(stack = %stack.id(), %message, "Stack rejected by provider");
                Ok((StackStatus::Failed, BTreeMap::new(), Some(message)))
            }
            other => Err(Error::DeploymentFailed(format!(
                "deployer '{}' left stack '{}' in state {:?}",
                self.deployer.name(),
                stack.id(),
                other
            ))),
        }
    }

    /// Remove the stacks of a report, consumers first.
    ///
    /// Returns the ids of the stacks that were destroyed.
    pub async fn destroy(&self, report: &DeploymentReport) -> Result<Vec<LogicalId>> {
        let mut destroyed = Vec::new();
        for outcome in report.stacks.iter().rev() {
            let Some(handle) = &outcome.handle else {
                continue;
            };
            info!(stack = %outcome.stack, "Destroying stack");
            self.deployer.destroy(handle).await?;
            destroyed.push(outcome.stack.clone());
        }
        Ok(destroyed)
    }
}

/// Stacks in the order they have to be torn down.
pub fn teardown_order(topology: &Topology) -> Result<Vec<&Stack>> {
    let mut order = topology.deployment_order()?;
    order.reverse();
    Ok(order)
}

/// The selected stacks plus everything they depend on.
fn select(topology: &Topology, selection: &[String]) -> Result<BTreeSet<LogicalId>> {
    if selection.is_empty() {
        return Ok(topology.stacks().iter().map(|s| s.id().clone()).collect());
    }

    let mut included = BTreeSet::new();
    let mut pending: Vec<&str> = selection.iter().map(|s| s.as_str()).collect();
    while let Some(id) = pending.pop() {
        let stack = topology
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("stack '{}'", id)))?;
        if included.insert(stack.id().clone()) {
            pending.extend(stack.dependencies().iter().map(|d| d.as_str()));
        }
    }
    Ok(included)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DryRunDeployer;
    use futures::stream::BoxStream;
    use stacksmith_core::deployer::{DeploymentEvent, DeploymentState};
    use stacksmith_core::resource::{Function, ImageCode};
    use stacksmith_core::{App, StackScope, stack_fn};

    /// Db <- Api, Db <- Reporting, plus an unrelated Autocomplete stack.
    fn app() -> App {
        let mut app = App::new("serverless-ml");
        let db = stack_fn(|scope: &mut StackScope<'_>| {
            scope.add_output("DBName", "serverlessml")?;
            Ok(())
        });
        app.add_stack(&db, "DbStack", &()).unwrap();

        for id in ["ApiStack", "ReportingStack"] {
            let consumer = stack_fn(|scope: &mut StackScope<'_>| {
                let name = scope.import("DbStack", "DBName")?;
                scope.add(
                    "Fn",
                    Function::new(ImageCode::from_asset("./image")).with_env("DB_NAME", name),
                )?;
                Ok(())
            });
            app.add_stack(&consumer, id, &()).unwrap();
        }

        let standalone = stack_fn(|scope: &mut StackScope<'_>| {
            scope.add("DockerPredict", Function::new(ImageCode::from_asset("./image")))?;
            Ok(())
        });
        app.add_stack(&standalone, "AutocompleteStack", &()).unwrap();
        app
    }

    #[tokio::test]
    async fn test_deploy_all_stacks() {
        let mut app = app();
        let driver = DeploymentDriver::new(Arc::new(DryRunDeployer::new()));

        let report = driver.deploy(app.topology_mut(), &[]).await.unwrap();
        assert!(report.success);
        assert_eq!(report.stacks.len(), 4);
        assert_eq!(report.stacks[0].stack.as_str(), "DbStack");
        assert_eq!(report.outcome("DbStack").unwrap().outputs["DBName"], "serverlessml");
        for stack in app.topology().stacks() {
            assert_eq!(stack.status(), StackStatus::Provisioned);
        }
    }

    #[tokio::test]
    async fn test_failed_producer_skips_consumers() {
        let mut app = app();
        let deployer = DryRunDeployer::new().with_failure("DbStack");
        let driver = DeploymentDriver::new(Arc::new(deployer));

        let report = driver.deploy(app.topology_mut(), &[]).await.unwrap();
        assert!(!report.success);
        assert_eq!(report.outcome("DbStack").unwrap().status, StackStatus::Failed);
        assert_eq!(report.outcome("ApiStack").unwrap().status, StackStatus::Skipped);
        assert_eq!(
            report.outcome("ReportingStack").unwrap().status,
            StackStatus::Skipped
        );
        assert!(report.outcome("ApiStack").unwrap().handle.is_none());
        assert_eq!(
            report.outcome("AutocompleteStack").unwrap().status,
            StackStatus::Provisioned
        );
        assert_eq!(
            app.stack("ApiStack").unwrap().status(),
            StackStatus::Skipped
        );
    }

    #[tokio::test]
    async fn test_selection_pulls_in_dependencies() {
        let mut app = app();
        let driver = DeploymentDriver::new(Arc::new(DryRunDeployer::new()));

        let report = driver
            .deploy(app.topology_mut(), &["ApiStack".to_string()])
            .await
            .unwrap();
        let ids: Vec<&str> = report.stacks.iter().map(|o| o.stack.as_str()).collect();
        assert_eq!(ids, vec!["DbStack", "ApiStack"]);
        assert_eq!(
            app.stack("ReportingStack").unwrap().status(),
            StackStatus::Registered
        );

        assert!(matches!(
            driver.deploy(app.topology_mut(), &["Missing".to_string()]).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_destroy_in_reverse_order() {
        let mut app = app();
        let driver = DeploymentDriver::new(Arc::new(DryRunDeployer::new()));

        let report = driver.deploy(app.topology_mut(), &[]).await.unwrap();
        let destroyed = driver.destroy(&report).await.unwrap();
        let ids: Vec<&str> = destroyed.iter().map(|id| id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["AutocompleteStack", "ReportingStack", "ApiStack", "DbStack"]
        );

        let teardown: Vec<&str> = teardown_order(app.topology())
            .unwrap()
            .iter()
            .map(|s| s.id().as_str())
            .collect();
        assert_eq!(teardown, ids);
    }

    /// Deploys through a dry-run deployer but cannot read state back.
    struct StatelessDeployer {
        inner: DryRunDeployer,
    }

    #[async_trait::async_trait]
    impl Deployer for StatelessDeployer {
        fn name(&self) -> &'static str {
            "stateless"
        }

        async fn validate(&self, stack: &Stack) -> Result<Vec<ValidationWarning>> {
            self.inner.validate(stack).await
        }

        async fn deploy(&self, stack: &Stack) -> Result<DeploymentHandle> {
            self.inner.deploy(stack).await
        }

        async fn state(&self, handle: &DeploymentHandle) -> Result<DeploymentState> {
            Err(Error::NotFound(format!("state of {}", handle.id)))
        }

        async fn events(
            &self,
            handle: &DeploymentHandle,
        ) -> Result<BoxStream<'static, DeploymentEvent>> {
            self.inner.events(handle).await
        }

        async fn destroy(&self, handle: &DeploymentHandle) -> Result<()> {
            self.inner.destroy(handle).await
        }
    }

    #[tokio::test]
    async fn test_unreadable_state_keeps_handle_for_destroy() {
        let mut app = app();
        let driver = DeploymentDriver::new(Arc::new(StatelessDeployer {
            inner: DryRunDeployer::new(),
        }));

        let report = driver
            .deploy(app.topology_mut(), &["DbStack".to_string()])
            .await
            .unwrap();
        assert!(!report.success);
        let outcome = report.outcome("DbStack").unwrap();
        assert_eq!(outcome.status, StackStatus::Failed);
        assert!(outcome.handle.is_some());
        assert!(outcome.message.as_deref().unwrap().contains("state of"));

        let destroyed = driver.destroy(&report).await.unwrap();
        assert_eq!(destroyed.len(), 1);
        assert_eq!(destroyed[0].as_str(), "DbStack");
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let mut app = app();
        let driver = DeploymentDriver::new(Arc::new(DryRunDeployer::new()));
        let report = driver.deploy(app.topology_mut(), &[]).await.unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["stacks"][0]["status"], "provisioned");
    }
}
