//! CLI command implementations.

pub mod deploy;
pub mod synth;

use anyhow::{Context, Result};
use clap::ValueEnum;
use stacksmith_config::{VariableContext, load_topology, parse_topology};
use stacksmith_core::{App, Value};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuiltinApp {
    /// Database stack and prediction/drift API stack
    ServerlessMl,
    /// Autocomplete prediction and training API
    Autocomplete,
}

/// Where the application comes from.
pub struct Source {
    pub config: Option<PathBuf>,
    pub app: BuiltinApp,
    pub vars: Vec<(String, String)>,
}

impl Source {
    pub fn load(&self) -> Result<App> {
        match &self.config {
            Some(path) => {
                info!(path = %path.display(), "Loading topology file");
                load_topology(path, &variables(&self.vars))
                    .with_context(|| format!("Failed to load topology: {}", path.display()))
            }
            None => {
                let app = match self.app {
                    BuiltinApp::ServerlessMl => stacksmith_stacks::serverless_ml_app(),
                    BuiltinApp::Autocomplete => stacksmith_stacks::autocomplete_app(),
                };
                app.context("Failed to build built-in application")
            }
        }
    }
}

/// Parse a `NAME=VALUE` pair.
pub fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    if name.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

fn variables(vars: &[(String, String)]) -> VariableContext {
    let mut ctx = VariableContext::from_env();
    for (name, value) in vars {
        ctx.set(name, value.as_str());
    }
    ctx
}

pub fn validate(path: &Path, vars: &[(String, String)]) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read topology file: {}", path.display()))?;
    match parse_topology(&content, &variables(vars)).and_then(|config| config.build()) {
        Ok(app) => {
            println!(
                "Topology '{}' is valid ({} stacks)",
                app.name(),
                app.topology().len()
            );
            Ok(())
        }
        Err(e) => {
            println!("Topology error: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn list(source: &Source) -> Result<()> {
    let app = source.load()?;
    println!("Application: {}", app.name());

    for stack in app.topology().deployment_order()? {
        println!("\n{} [{}]", stack.id(), stack.status());
        if let Some(description) = stack.description() {
            println!("  {}", description);
        }
        if !stack.dependencies().is_empty() {
            let deps: Vec<&str> = stack.dependencies().iter().map(|d| d.as_str()).collect();
            println!("  depends on: {}", deps.join(", "));
        }
        for resource in stack.resources() {
            println!("  - {} ({})", resource.id(), resource.kind());
        }
        for output in stack.outputs() {
            println!("  > {} = {}", output.name, describe(&output.value));
        }
    }

    let public = app.public_endpoints();
    if !public.is_empty() {
        println!("\nPublic endpoints:");
        for (stack, function) in public {
            println!("  {}/{}", stack, function);
        }
    }
    Ok(())
}

fn describe(value: &Value) -> String {
    match value {
        Value::Literal { value } => format!("{:?}", value),
        Value::Attribute {
            stack,
            resource,
            attribute,
        } => format!("{}.{}.{} (at deploy time)", stack, resource, attribute),
        Value::Output { reference } => format!("${{{}}}", reference),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("feature_table=mental_health_features").unwrap(),
            ("feature_table".to_string(), "mental_health_features".to_string())
        );
        assert_eq!(
            parse_var("url=https://x?a=b").unwrap().1,
            "https://x?a=b"
        );
        assert!(parse_var("missing").is_err());
        assert!(parse_var("=value").is_err());
    }

    #[test]
    fn test_builtin_apps_load() {
        for app in [BuiltinApp::ServerlessMl, BuiltinApp::Autocomplete] {
            let source = Source {
                config: None,
                app,
                vars: Vec::new(),
            };
            assert!(!source.load().unwrap().topology().is_empty());
        }
    }
}
