//! Dry-run deployment commands.

use anyhow::{Context, Result};
use stacksmith_core::StackStatus;
use stacksmith_core::resource::{RemovalPolicy, ResourceProps};
use stacksmith_deployer::{DeploymentDriver, DryRunDeployer, teardown_order};
use std::sync::Arc;

use super::Source;

/// Deploy the selected stacks and print a summary.
pub async fn deploy(source: &Source, stacks: &[String], reject: &[String], json: bool) -> Result<()> {
    let mut app = source.load()?;

    let deployer = reject
        .iter()
        .fold(DryRunDeployer::new(), |d, stack| d.with_failure(stack.as_str()));
    let driver = DeploymentDriver::new(Arc::new(deployer));

    let report = driver
        .deploy(app.topology_mut(), stacks)
        .await
        .context("Deployment could not start")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("--- Stack Summary ---");
        for outcome in &report.stacks {
            let status = match outcome.status {
                StackStatus::Provisioned => "✓ provisioned".to_string(),
                StackStatus::Failed => format!(
                    "✗ failed: {}",
                    outcome.message.as_deref().unwrap_or("unknown error")
                ),
                StackStatus::Skipped => format!(
                    "⊘ skipped: {}",
                    outcome.message.as_deref().unwrap_or("dependencies failed")
                ),
                other => other.to_string(),
            };
            println!("  {} - {}", outcome.stack, status);
            for warning in &outcome.warnings {
                match &warning.resource {
                    Some(resource) => println!("      ! {}: {}", resource, warning.message),
                    None => println!("      ! {}", warning.message),
                }
            }
            for (name, value) in &outcome.outputs {
                println!("      {} = {}", name, value);
            }
        }
    }

    if report.success {
        Ok(())
    } else {
        anyhow::bail!("Deployment failed");
    }
}

/// Print the teardown plan, consumers first.
pub fn destroy(source: &Source) -> Result<()> {
    let app = source.load()?;
    println!("Teardown order for '{}':", app.name());
    for stack in teardown_order(app.topology())? {
        println!("  {}", stack.id());
        for resource in stack.resources().iter().rev() {
            let fate = match resource.props() {
                ResourceProps::Database(db) => match db.removal_policy {
                    RemovalPolicy::Destroy => "deleted",
                    RemovalPolicy::Retain => "retained",
                    RemovalPolicy::Snapshot => "deleted after a final snapshot",
                },
                _ => "deleted",
            };
            println!("    - {} ({}): {}", resource.id(), resource.kind(), fate);
        }
    }
    Ok(())
}
