//! Topology file parsing.
//!
//! A topology file declares an application and its stacks:
//!
//! ```kdl
//! app "serverless-ml"
//! var "feature_table" "mental_health_features"
//!
//! stack "ApiStack" {
//!     function "PredictFn" {
//!         image "../../lambda/predict"
//!         architecture "arm64"
//!         memory 512
//!         timeout 30
//!         env {
//!             FEATURE_TABLE "${feature_table}"
//!             DB_HOST "${DbStack.DBHost}"
//!         }
//!         url auth="none"
//!     }
//! }
//!
//! stack "DbStack" {
//!     output "DBHost" resource="ServerlessMLRdsInstance" attribute="Endpoint.Address"
//! }
//! ```
//!
//! Stacks may appear in any order; they are added to the application in
//! dependency order.

use crate::{ConfigError, ConfigResult, VariableContext};
use kdl::{KdlDocument, KdlNode};
use regex::Regex;
use stacksmith_core::graph::topological_sort;
use stacksmith_core::resource::{
    CorsPolicy, DatabaseEngine, DatabaseInstance, Function, FunctionUrl, ImageCode,
    InstanceType, RemovalPolicy, ResourceProps, Rule, Schedule, Secret, SubnetType, Vpc,
};
use stacksmith_core::{App, Error as CoreError, LogicalId, StackFactory, StackScope, Value};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info};

static REF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{([A-Za-z][A-Za-z0-9_-]*)\.([A-Za-z][A-Za-z0-9_-]*)\}$").unwrap()
});

/// Namespaces handled by interpolation rather than stack references.
const VARIABLE_NAMESPACES: &[&str] = &["env", "app"];

/// A value as written in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueDefinition {
    Literal(String),
    /// Deploy-time attribute of a resource in the same stack.
    Attribute { resource: String, attribute: String },
    /// `${Stack.Output}`
    Reference { stack: String, output: String },
}

impl ValueDefinition {
    fn parse(raw: &str, ctx: &VariableContext, field: &str) -> ConfigResult<Self> {
        let value = ctx.interpolate(raw);
        if let Some(caps) = REF_REGEX.captures(&value) {
            if !VARIABLE_NAMESPACES.contains(&&caps[1]) {
                return Ok(Self::Reference {
                    stack: caps[1].to_string(),
                    output: caps[2].to_string(),
                });
            }
        }
        let embedded = ctx.unresolved(&value).into_iter().find(|name| {
            name.split_once('.')
                .is_some_and(|(ns, _)| !VARIABLE_NAMESPACES.contains(&ns))
        });
        if let Some(name) = embedded {
            return Err(ConfigError::InvalidReference(format!(
                "{}: reference '${{{}}}' must be the whole value",
                field, name
            )));
        }
        Ok(Self::Literal(value))
    }

    fn stack(&self) -> Option<&str> {
        match self {
            ValueDefinition::Reference { stack, .. } => Some(stack),
            _ => None,
        }
    }

    fn to_value(&self, scope: &mut StackScope<'_>) -> stacksmith_core::Result<Value> {
        match self {
            ValueDefinition::Literal(value) => Ok(Value::literal(value.as_str())),
            ValueDefinition::Attribute {
                resource,
                attribute,
            } => Ok(Value::attribute(
                scope.id().clone(),
                LogicalId::new(resource.as_str())?,
                attribute.as_str(),
            )),
            ValueDefinition::Reference { stack, output } => scope.import(stack, output),
        }
    }
}

/// A resource as written in the file.
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    pub id: String,
    pub props: ResourceProps,
    /// Function environment, bound when the stack is declared.
    pub environment: Vec<(String, ValueDefinition)>,
}

#[derive(Debug, Clone)]
pub struct OutputDefinition {
    pub name: String,
    pub value: ValueDefinition,
    pub description: Option<String>,
}

/// A stack as written in the file.
#[derive(Debug, Clone)]
pub struct StackDefinition {
    pub id: String,
    pub description: Option<String>,
    pub resources: Vec<ResourceDefinition>,
    pub outputs: Vec<OutputDefinition>,
}

impl StackDefinition {
    /// Stacks whose outputs this stack reads.
    pub fn references(&self) -> BTreeSet<&str> {
        let env = self
            .resources
            .iter()
            .flat_map(|r| r.environment.iter().map(|(_, v)| v));
        env.chain(self.outputs.iter().map(|o| &o.value))
            .filter_map(|v| v.stack())
            .collect()
    }
}

impl StackFactory for StackDefinition {
    type Config = ();

    fn declare(&self, scope: &mut StackScope<'_>, _config: &()) -> stacksmith_core::Result<()> {
        if let Some(description) = &self.description {
            scope.set_description(description.clone());
        }
        for resource in &self.resources {
            let mut props = resource.props.clone();
            if let ResourceProps::Function(function) = &mut props {
                for (key, value) in &resource.environment {
                    function
                        .environment
                        .insert(key.clone(), value.to_value(scope)?);
                }
            }
            scope.add(&resource.id, props)?;
        }
        for output in &self.outputs {
            let value = output.value.to_value(scope)?;
            match &output.description {
                Some(description) => {
                    scope.add_described_output(&output.name, value, description.clone())?
                }
                None => scope.add_output(&output.name, value)?,
            };
        }
        Ok(())
    }
}

/// A parsed topology file.
#[derive(Debug, Clone)]
pub struct TopologyConfig {
    pub app: String,
    pub stacks: Vec<StackDefinition>,
}

impl TopologyConfig {
    /// Stacks ordered so that producers come before their consumers.
    pub fn load_order(&self) -> ConfigResult<Vec<&StackDefinition>> {
        let mut nodes = Vec::with_capacity(self.stacks.len());
        for stack in &self.stacks {
            let needs = stack
                .references()
                .into_iter()
                .map(LogicalId::new)
                .collect::<stacksmith_core::Result<BTreeSet<_>>>()?;
            nodes.push((LogicalId::new(stack.id.as_str())?, needs));
        }

        let order = topological_sort(nodes.iter().map(|(id, needs)| (id, needs))).map_err(
            |e| match e {
                CoreError::UnresolvedReference(message) => ConfigError::InvalidReference(message),
                CoreError::DependencyOrder { consumer, producer } => {
                    ConfigError::CycleDetected(format!("{} -> {}", consumer, producer))
                }
                other => other.into(),
            },
        )?;

        Ok(order
            .iter()
            .filter_map(|id| self.stacks.iter().find(|s| s.id == id.as_str()))
            .collect())
    }

    /// Add every stack to a new application, in dependency order.
    pub fn build(&self) -> ConfigResult<App> {
        let mut app = App::new(self.app.as_str());
        for stack in self.load_order()? {
            debug!(stack = %stack.id, "Adding stack from topology file");
            app.add_stack(stack, &stack.id, &())?;
        }
        info!(app = %self.app, stacks = self.stacks.len(), "Loaded topology");
        Ok(app)
    }
}

/// Read a topology file and build its application.
pub fn load_topology(path: &Path, vars: &VariableContext) -> ConfigResult<App> {
    let content = std::fs::read_to_string(path)?;
    parse_topology(&content, vars)?.build()
}

/// Parse a topology configuration from KDL text.
pub fn parse_topology(kdl: &str, vars: &VariableContext) -> ConfigResult<TopologyConfig> {
    let doc: KdlDocument = kdl.parse()?;

    // `app` and `var` nodes apply to the whole file regardless of position.
    let mut ctx = vars.clone();
    let mut app = None;
    for node in doc.nodes() {
        match node.name().value() {
            "app" => {
                let name = get_first_string_arg(node)
                    .ok_or_else(|| ConfigError::MissingField("app name".to_string()))?;
                ctx.app.name = name.clone();
                app = Some(name);
            }
            "var" => {
                let args = get_all_string_args(node);
                let [name, value] = args.as_slice() else {
                    return Err(ConfigError::invalid(
                        "var",
                        "expected a name and a value",
                    ));
                };
                // File variables are defaults; caller-supplied values win.
                if vars.custom.contains_key(name.as_str()) {
                    continue;
                }
                let value = ctx.interpolate(value);
                ctx.set(name, value);
            }
            _ => {}
        }
    }
    let app = app.ok_or_else(|| ConfigError::MissingField("app name".to_string()))?;

    let mut stacks: Vec<StackDefinition> = Vec::new();
    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                let stack = parse_stack(node, &ctx)?;
                if stacks.iter().any(|s| s.id == stack.id) {
                    return Err(ConfigError::Duplicate(format!("stack '{}'", stack.id)));
                }
                stacks.push(stack);
            }
            "app" | "var" => {}
            other => debug!(node = other, "Ignoring unknown node"),
        }
    }

    if stacks.is_empty() {
        return Err(ConfigError::MissingField("at least one stack".to_string()));
    }

    Ok(TopologyConfig { app, stacks })
}

fn parse_stack(node: &KdlNode, ctx: &VariableContext) -> ConfigResult<StackDefinition> {
    let id = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("stack name".to_string()))?;
    let description = get_string_prop(node, "description").map(|d| ctx.interpolate(&d));

    let mut resources: Vec<ResourceDefinition> = Vec::new();
    let mut outputs = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let kind = child.name().value();
            if kind == "output" {
                outputs.push(parse_output(child, ctx)?);
                continue;
            }
            let name = get_first_string_arg(child)
                .ok_or_else(|| ConfigError::MissingField(format!("{} name in stack '{}'", kind, id)));
            let resource = match kind {
                "function" => parse_function(name?, child, ctx)?,
                "database" => parse_database(name?, child, ctx)?,
                "rule" => parse_rule(name?, child)?,
                "secret" => parse_secret(name?, child)?,
                "vpc" => parse_vpc(name?, child)?,
                other => {
                    return Err(ConfigError::invalid(
                        format!("stack '{}'", id),
                        format!("unknown resource kind '{}'", other),
                    ));
                }
            };
            if resources.iter().any(|r| r.id == resource.id) {
                return Err(ConfigError::Duplicate(format!(
                    "resource '{}' in stack '{}'",
                    resource.id, id
                )));
            }
            resources.push(resource);
        }
    }

    Ok(StackDefinition {
        id,
        description,
        resources,
        outputs,
    })
}

fn parse_function(
    id: String,
    node: &KdlNode,
    ctx: &VariableContext,
) -> ConfigResult<ResourceDefinition> {
    let mut directory = None;
    let mut cmd = Vec::new();
    let mut function_env = Vec::new();
    let mut architecture = None;
    let mut memory_mb = None;
    let mut timeout_secs = None;
    let mut url = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "image" => {
                    directory = get_first_string_arg(child).map(|d| ctx.interpolate(&d));
                    cmd.extend(get_string_list_prop(child, "cmd"));
                }
                "cmd" => cmd.extend(get_all_string_args(child)),
                "architecture" => {
                    let arch = get_first_string_arg(child).unwrap_or_default();
                    architecture = Some(
                        arch.parse()
                            .map_err(|e| ConfigError::invalid(format!("{}.architecture", id), e))?,
                    );
                }
                "memory" => memory_mb = get_first_u32_arg(child, &format!("{}.memory", id))?,
                "timeout" => timeout_secs = get_first_u32_arg(child, &format!("{}.timeout", id))?,
                "env" => {
                    if let Some(vars) = child.children() {
                        for var in vars.nodes() {
                            let key = var.name().value().to_string();
                            let field = format!("{}.env.{}", id, key);
                            function_env.push((key, parse_value(var, ctx, &field)?));
                        }
                    }
                }
                "url" => url = Some(parse_function_url(&id, child)?),
                _ => {}
            }
        }
    }

    let directory =
        directory.ok_or_else(|| ConfigError::MissingField(format!("image for function '{}'", id)))?;
    let mut code = ImageCode::from_asset(directory);
    if !cmd.is_empty() {
        code = code.with_cmd(ctx.interpolate_vec(&cmd));
    }

    let mut function = Function::new(code);
    if let Some(architecture) = architecture {
        function = function.with_architecture(architecture);
    }
    if let Some(memory_mb) = memory_mb {
        function = function.with_memory_mb(memory_mb);
    }
    if let Some(timeout_secs) = timeout_secs {
        function = function.with_timeout(Duration::from_secs(timeout_secs.into()));
    }
    if let Some(url) = url {
        function = function.with_url(url);
    }

    Ok(ResourceDefinition {
        id,
        props: function.into(),
        environment: function_env,
    })
}

fn parse_function_url(id: &str, node: &KdlNode) -> ConfigResult<FunctionUrl> {
    let mut url = FunctionUrl::public();
    if let Some(auth) = get_string_prop(node, "auth") {
        url.auth_type = auth
            .parse()
            .map_err(|e| ConfigError::invalid(format!("{}.url.auth", id), e))?;
    }

    let cors_node = node
        .children()
        .and_then(|children| children.nodes().iter().find(|c| c.name().value() == "cors"));
    if let Some(cors) = cors_node {
        let allowed_methods = get_string_list_prop(cors, "methods")
            .iter()
            .map(|m| m.parse())
            .collect::<stacksmith_core::Result<Vec<_>>>()
            .map_err(|e| ConfigError::invalid(format!("{}.url.cors.methods", id), e))?;
        url = url.with_cors(CorsPolicy {
            allowed_methods,
            allowed_headers: get_string_list_prop(cors, "headers"),
            allowed_origins: get_string_list_prop(cors, "origins"),
        });
    }
    Ok(url)
}

fn parse_database(
    id: String,
    node: &KdlNode,
    ctx: &VariableContext,
) -> ConfigResult<ResourceDefinition> {
    let field = |name: &str| format!("{}.{}", id, name);
    let missing = |name: &str| ConfigError::MissingField(format!("{} for database '{}'", name, id));

    let mut engine = None;
    let mut vpc = None;
    let mut subnet_type = SubnetType::Private;
    let mut instance_type = None;
    let mut storage = None;
    let mut credentials = None;
    let mut database_name = None;
    let mut deletion_protection = false;
    let mut removal_policy = RemovalPolicy::Snapshot;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "engine" => {
                    let kind = get_first_string_arg(child).ok_or_else(|| missing("engine"))?;
                    let version = get_string_prop(child, "version")
                        .ok_or_else(|| missing("engine version"))?;
                    engine = Some(DatabaseEngine {
                        kind: kind.parse().map_err(|e| ConfigError::invalid(field("engine"), e))?,
                        version,
                    });
                }
                "vpc" => {
                    vpc = get_first_string_arg(child);
                    if let Some(subnet) = get_string_prop(child, "subnet") {
                        subnet_type = subnet
                            .parse()
                            .map_err(|e| ConfigError::invalid(field("subnet"), e))?;
                    }
                }
                "instance-type" => {
                    let raw = get_first_string_arg(child).unwrap_or_default();
                    let (class, size) = raw.split_once('.').ok_or_else(|| {
                        ConfigError::invalid(field("instance-type"), "expected CLASS.SIZE")
                    })?;
                    instance_type = Some(InstanceType::of(class, size));
                }
                "storage" => {
                    let allocated = get_first_u32_arg(child, &field("storage"))?
                        .ok_or_else(|| missing("allocated storage"))?;
                    let max = get_u32_prop(child, "max", &field("storage.max"))?;
                    storage = Some((allocated, max));
                }
                "credentials" => credentials = get_first_string_arg(child),
                "name" => database_name = get_first_string_arg(child).map(|n| ctx.interpolate(&n)),
                "deletion-protection" => {
                    deletion_protection = get_first_bool_arg(child).ok_or_else(|| {
                        ConfigError::invalid(field("deletion-protection"), "expected #true or #false")
                    })?;
                }
                "removal-policy" => {
                    let policy = get_first_string_arg(child).unwrap_or_default();
                    removal_policy = policy
                        .parse()
                        .map_err(|e| ConfigError::invalid(field("removal-policy"), e))?;
                }
                _ => {}
            }
        }
    }

    let (allocated_storage_gb, max_allocated_storage_gb) =
        storage.ok_or_else(|| missing("storage"))?;
    let database = DatabaseInstance {
        engine: engine.ok_or_else(|| missing("engine"))?,
        vpc: LogicalId::new(vpc.ok_or_else(|| missing("vpc"))?)?,
        subnet_type,
        instance_type: instance_type.ok_or_else(|| missing("instance-type"))?,
        allocated_storage_gb,
        max_allocated_storage_gb,
        credentials: LogicalId::new(credentials.ok_or_else(|| missing("credentials"))?)?,
        database_name: database_name.ok_or_else(|| missing("name"))?,
        deletion_protection,
        removal_policy,
    };

    Ok(ResourceDefinition {
        id,
        props: database.into(),
        environment: Vec::new(),
    })
}

fn parse_rule(id: String, node: &KdlNode) -> ConfigResult<ResourceDefinition> {
    let schedule = match (get_string_prop(node, "rate"), get_string_prop(node, "cron")) {
        (Some(rate), None) => Schedule::rate(parse_rate(&rate).ok_or_else(|| {
            ConfigError::invalid(format!("{}.rate", id), format!("cannot parse '{}'", rate))
        })?),
        (None, Some(cron)) => Schedule::cron(cron),
        _ => {
            return Err(ConfigError::invalid(
                format!("rule '{}'", id),
                "exactly one of rate or cron is required",
            ));
        }
    }
    .map_err(|e| ConfigError::invalid(format!("{}.schedule", id), e))?;

    let mut rule = Rule::new(schedule);
    rule.enabled = get_bool_prop(node, "enabled").unwrap_or(true);
    for target in get_string_list_prop(node, "target") {
        rule = rule.with_target(LogicalId::new(target)?);
    }

    Ok(ResourceDefinition {
        id,
        props: rule.into(),
        environment: Vec::new(),
    })
}

fn parse_secret(id: String, node: &KdlNode) -> ConfigResult<ResourceDefinition> {
    let username = get_string_prop(node, "username")
        .ok_or_else(|| ConfigError::MissingField(format!("username for secret '{}'", id)))?;
    let mut secret = Secret::generated_credentials(username);
    if let Some(key) = get_string_prop(node, "generate-key") {
        secret.generate_key = key;
    }
    if let Some(exclude) = get_bool_prop(node, "exclude-punctuation") {
        secret.exclude_punctuation = exclude;
    }
    if let Some(include) = get_bool_prop(node, "include-space") {
        secret.include_space = include;
    }
    secret.exclude_characters = get_string_prop(node, "exclude-characters");

    Ok(ResourceDefinition {
        id,
        props: secret.into(),
        environment: Vec::new(),
    })
}

fn parse_vpc(id: String, node: &KdlNode) -> ConfigResult<ResourceDefinition> {
    let max_azs = get_u32_prop(node, "max-azs", &format!("{}.max-azs", id))?.unwrap_or(3);
    Ok(ResourceDefinition {
        id,
        props: Vpc { max_azs }.into(),
        environment: Vec::new(),
    })
}

fn parse_output(node: &KdlNode, ctx: &VariableContext) -> ConfigResult<OutputDefinition> {
    let args = get_all_string_args(node);
    let name = args
        .first()
        .cloned()
        .ok_or_else(|| ConfigError::MissingField("output name".to_string()))?;
    let value = match (args.get(1), get_string_prop(node, "resource")) {
        (Some(raw), None) => ValueDefinition::parse(raw, ctx, &format!("output {}", name))?,
        (None, Some(resource)) => ValueDefinition::Attribute {
            resource,
            attribute: get_string_prop(node, "attribute").ok_or_else(|| {
                ConfigError::MissingField(format!("attribute for output '{}'", name))
            })?,
        },
        _ => {
            return Err(ConfigError::invalid(
                format!("output {}", name),
                "expected either a value or resource= and attribute=",
            ));
        }
    };

    Ok(OutputDefinition {
        name,
        value,
        description: get_string_prop(node, "description"),
    })
}

/// An environment entry: `KEY "value"` or `KEY resource="Id" attribute="Arn"`.
fn parse_value(node: &KdlNode, ctx: &VariableContext, field: &str) -> ConfigResult<ValueDefinition> {
    if let Some(resource) = get_string_prop(node, "resource") {
        let attribute = get_string_prop(node, "attribute")
            .ok_or_else(|| ConfigError::MissingField(format!("attribute for {}", field)))?;
        return Ok(ValueDefinition::Attribute {
            resource,
            attribute,
        });
    }
    let raw = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField(format!("value for {}", field)))?;
    ValueDefinition::parse(&raw, ctx, field)
}

/// Parse a rate like `7 days` or `30 minutes`.
fn parse_rate(rate: &str) -> Option<Duration> {
    let (count, unit) = rate.trim().split_once(' ')?;
    let count: u64 = count.parse().ok()?;
    let minutes = match unit.trim() {
        "minute" | "minutes" => 1,
        "hour" | "hours" => 60,
        "day" | "days" => 24 * 60,
        _ => return None,
    };
    Some(Duration::from_secs(count.checked_mul(minutes * 60)?))
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_bool_prop(node: &KdlNode, name: &str) -> Option<bool> {
    node.get(name).and_then(|v| v.as_bool())
}

fn get_first_bool_arg(node: &KdlNode) -> Option<bool> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_bool())
}

fn get_u32_prop(node: &KdlNode, name: &str, field: &str) -> ConfigResult<Option<u32>> {
    node.get(name).map(|v| to_u32(v, field)).transpose()
}

fn get_first_u32_arg(node: &KdlNode, field: &str) -> ConfigResult<Option<u32>> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| to_u32(e.value(), field))
        .transpose()
}

fn to_u32(value: &kdl::KdlValue, field: &str) -> ConfigResult<u32> {
    let n = value
        .as_integer()
        .ok_or_else(|| ConfigError::invalid(field, "expected an integer"))?;
    u32::try_from(n).map_err(|_| ConfigError::invalid(field, format!("{} is out of range", n)))
}

fn get_string_list_prop(node: &KdlNode, name: &str) -> Vec<String> {
    let mut result = Vec::new();

    // Repeated properties: target="a" target="b"
    for entry in node.entries() {
        if let Some(entry_name) = entry.name() {
            if entry_name.value() == name {
                if let Some(s) = entry.value().as_string() {
                    result.push(s.to_string());
                }
            }
        }
    }

    if !result.is_empty() {
        return result;
    }

    // Block syntax: { target "a" "b" }
    let mut seen = HashSet::new();
    if let Some(children) = node.children() {
        for child in children.nodes() {
            if child.name().value() == name {
                for arg in get_all_string_args(child) {
                    if seen.insert(arg.clone()) {
                        result.push(arg);
                    }
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VariableContextBuilder;
    use stacksmith_core::resource::{Architecture, HttpMethod};

    const SERVERLESS_ML: &str = r#"
        app "serverless-ml"
        var "feature_table" "mental_health_features"

        stack "ApiStack" description="Prediction and drift functions" {
            function "PredictFn" {
                image "../../lambda/predict"
                architecture "arm64"
                memory 512
                timeout 30
                env {
                    MODEL_BUCKET "${env.MODEL_BUCKET}"
                    CHAMPION_SSM_PARAM "/${app.name}/champion-model"
                    FEATURE_TABLE "${feature_table}"
                    DB_HOST "${DbStack.DBHost}"
                }
                url auth="none"
            }
            function "DriftFn" {
                image "../../lambda/drift"
                architecture "arm64"
                memory 512
                timeout 30
                env {
                    FEATURE_TABLE "${feature_table}"
                    KS_RESULTS_TABLE "ks_test_results"
                }
            }
            rule "DriftDetectionRule" rate="7 days" {
                target "DriftFn"
            }
        }

        stack "DbStack" {
            vpc "ServerlessMLVpc" max-azs=2
            secret "DBSecret" username="mluser" exclude-punctuation=#true include-space=#false
            database "ServerlessMLRdsInstance" {
                engine "mysql" version="8.0.32"
                vpc "ServerlessMLVpc" subnet="public"
                instance-type "t3.micro"
                storage 20 max=100
                credentials "DBSecret"
                name "serverlessml"
                deletion-protection #false
                removal-policy "destroy"
            }
            output "DBHost" resource="ServerlessMLRdsInstance" attribute="Endpoint.Address"
            output "DBSecretArn" resource="DBSecret" attribute="Arn"
            output "DBName" "serverlessml" description="Database name"
        }
    "#;

    fn vars() -> VariableContext {
        VariableContextBuilder::new()
            .with_env("MODEL_BUCKET", "ml-demo-models")
            .build()
    }

    #[test]
    fn test_parse_topology() {
        let config = parse_topology(SERVERLESS_ML, &vars()).unwrap();
        assert_eq!(config.app, "serverless-ml");
        assert_eq!(config.stacks.len(), 2);

        let api = &config.stacks[0];
        assert_eq!(api.id, "ApiStack");
        assert_eq!(api.resources.len(), 3);
        assert_eq!(api.references(), BTreeSet::from(["DbStack"]));

        let predict = &api.resources[0];
        assert!(predict.environment.contains(&(
            "CHAMPION_SSM_PARAM".to_string(),
            ValueDefinition::Literal("/serverless-ml/champion-model".to_string())
        )));
        assert!(predict.environment.contains(&(
            "MODEL_BUCKET".to_string(),
            ValueDefinition::Literal("ml-demo-models".to_string())
        )));
    }

    #[test]
    fn test_consumer_first_file_loads_in_producer_order() {
        let app = parse_topology(SERVERLESS_ML, &vars())
            .unwrap()
            .build()
            .unwrap();

        let order: Vec<&str> = app.topology().stacks().iter().map(|s| s.id().as_str()).collect();
        assert_eq!(order, vec!["DbStack", "ApiStack"]);

        let api = app.stack("ApiStack").unwrap();
        let predict = api.resource("PredictFn").unwrap().as_function().unwrap();
        assert_eq!(predict.architecture, Architecture::Arm64);
        assert_eq!(predict.memory_mb, 512);
        assert_eq!(predict.timeout_secs, 30);
        assert!(predict.is_public());
        assert!(matches!(
            &predict.environment["DB_HOST"],
            Value::Attribute { resource, attribute, .. }
                if resource == "ServerlessMLRdsInstance" && attribute == "Endpoint.Address"
        ));
        assert_eq!(
            predict.environment["FEATURE_TABLE"],
            Value::literal("mental_health_features")
        );

        let rule = api.resource("DriftDetectionRule").unwrap().as_rule().unwrap();
        assert_eq!(rule.schedule.expression(), "rate(7 days)");
        assert_eq!(rule.targets[0].as_str(), "DriftFn");

        let db = app.stack("DbStack").unwrap();
        let instance = db.resource("ServerlessMLRdsInstance").unwrap().as_database().unwrap();
        assert_eq!(instance.subnet_type, SubnetType::Public);
        assert_eq!(instance.max_allocated_storage_gb, Some(100));
        assert_eq!(instance.removal_policy, RemovalPolicy::Destroy);
        assert_eq!(
            db.output_value("DBName").unwrap(),
            &Value::literal("serverlessml")
        );
    }

    #[test]
    fn test_detect_cycle() {
        let kdl = r#"
            app "cyclic"
            stack "A" {
                output "Out" "${B.Out}"
            }
            stack "B" {
                output "Out" "${A.Out}"
            }
        "#;
        let result = parse_topology(kdl, &VariableContext::new()).unwrap().build();
        assert!(matches!(result, Err(ConfigError::CycleDetected(_))));
    }

    #[test]
    fn test_reference_to_unknown_stack() {
        let kdl = r#"
            app "dangling"
            stack "ApiStack" {
                output "Host" "${DbStack.DBHost}"
            }
        "#;
        let result = parse_topology(kdl, &VariableContext::new()).unwrap().build();
        assert!(matches!(result, Err(ConfigError::InvalidReference(_))));
    }

    #[test]
    fn test_reference_to_unknown_output() {
        let kdl = r#"
            app "serverless-ml"
            stack "DbStack" {
                output "DBName" "serverlessml"
            }
            stack "ApiStack" {
                output "Port" "${DbStack.DBPort}"
            }
        "#;
        let result = parse_topology(kdl, &VariableContext::new()).unwrap().build();
        assert!(matches!(
            result,
            Err(ConfigError::Topology(CoreError::UnknownOutput { .. }))
        ));
    }

    #[test]
    fn test_embedded_reference_rejected() {
        let kdl = r#"
            app "serverless-ml"
            stack "ApiStack" {
                output "Url" "mysql://${DbStack.DBHost}:3306"
            }
        "#;
        assert!(matches!(
            parse_topology(kdl, &VariableContext::new()),
            Err(ConfigError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_unset_env_variable_stays_literal() {
        let kdl = r#"
            app "serverless-ml"
            stack "ApiStack" {
                output "Bucket" "${env.MODEL_BUCKET}"
            }
        "#;
        let config = parse_topology(kdl, &VariableContext::new()).unwrap();
        assert_eq!(
            config.stacks[0].outputs[0].value,
            ValueDefinition::Literal("${env.MODEL_BUCKET}".to_string())
        );
    }

    #[test]
    fn test_function_url_with_cors() {
        let kdl = r#"
            app "ml-autocomplete"
            stack "AutocompleteApiStack" {
                function "DockerPredict" {
                    image "./image" cmd="predict.handler"
                    architecture "x86_64"
                    memory 1024
                    timeout 30
                    url auth="none" {
                        cors methods="POST" headers="*" origins="*"
                    }
                }
            }
        "#;
        let app = parse_topology(kdl, &VariableContext::new())
            .unwrap()
            .build()
            .unwrap();
        let stack = app.stack("AutocompleteApiStack").unwrap();
        let f = stack.resource("DockerPredict").unwrap().as_function().unwrap();
        assert_eq!(f.code.cmd, Some(vec!["predict.handler".to_string()]));
        let cors = f.url.as_ref().unwrap().cors.as_ref().unwrap();
        assert_eq!(cors.allowed_methods, vec![HttpMethod::Post]);
        assert_eq!(cors.allowed_origins, vec!["*"]);
    }

    #[test]
    fn test_function_url_output_needs_url() {
        let kdl = r#"
            app "serverless-ml"
            stack "ApiStack" {
                function "DriftFn" {
                    image "../../lambda/drift"
                }
                output "DriftUrl" resource="DriftFn" attribute="FunctionUrl"
            }
        "#;
        let result = parse_topology(kdl, &VariableContext::new()).unwrap().build();
        assert!(matches!(
            result,
            Err(ConfigError::Topology(CoreError::UnresolvedReference(_)))
        ));
    }

    #[test]
    fn test_invalid_memory_is_rejected() {
        let kdl = r#"
            app "serverless-ml"
            stack "ApiStack" {
                function "PredictFn" {
                    image "../../lambda/predict"
                    memory 0
                }
            }
        "#;
        let result = parse_topology(kdl, &VariableContext::new()).unwrap().build();
        assert!(matches!(
            result,
            Err(ConfigError::Topology(CoreError::Configuration(_)))
        ));

        let kdl = kdl.replace("memory 0", "memory -5");
        assert!(matches!(
            parse_topology(&kdl, &VariableContext::new()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_app_name() {
        let kdl = r#"
            stack "ApiStack" {
                output "Name" "x"
            }
        "#;
        assert!(matches!(
            parse_topology(kdl, &VariableContext::new()),
            Err(ConfigError::MissingField(_))
        ));
    }

    #[test]
    fn test_duplicate_stack() {
        let kdl = r#"
            app "serverless-ml"
            stack "DbStack" {
                output "A" "a"
            }
            stack "DbStack" {
                output "B" "b"
            }
        "#;
        assert!(matches!(
            parse_topology(kdl, &VariableContext::new()),
            Err(ConfigError::Duplicate(_))
        ));
    }

    #[test]
    fn test_repository_topology_file() {
        let kdl = include_str!("../../../stacksmith.kdl");
        let app = parse_topology(kdl, &VariableContext::new())
            .unwrap()
            .build()
            .unwrap();
        let manifest = app.synth().unwrap();
        assert_eq!(manifest.stacks[0].id().as_str(), "ServerlessMlDbStack");

        let api = manifest.stack("ServerlessMlApiStack").unwrap();
        let env = &api.resource("PredictFn").unwrap().as_function().unwrap().environment;
        assert_eq!(env["DB_NAME"], Value::literal("serverlessml"));
        assert_eq!(env["MODEL_BUCKET"], Value::literal("ml-demo-models"));
        assert!(env.values().all(|v| v.is_resolved()));
    }

    #[test]
    fn test_caller_variables_override_file_defaults() {
        let kdl = include_str!("../../../stacksmith.kdl");
        let vars = VariableContextBuilder::new()
            .with_custom("feature_table", "staging_features")
            .build();
        let app = parse_topology(kdl, &vars).unwrap().build().unwrap();

        let api = app.stack("ServerlessMlApiStack").unwrap();
        let env = &api.resource("PredictFn").unwrap().as_function().unwrap().environment;
        assert_eq!(env["FEATURE_TABLE"], Value::literal("staging_features"));
        assert_eq!(env["MODEL_BUCKET"], Value::literal("ml-demo-models"));
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("7 days"), Some(Duration::from_secs(7 * 86_400)));
        assert_eq!(parse_rate("1 hour"), Some(Duration::from_secs(3_600)));
        assert_eq!(parse_rate("30 minutes"), Some(Duration::from_secs(1_800)));
        assert_eq!(parse_rate("weekly"), None);
        assert_eq!(parse_rate("3 fortnights"), None);
    }
}
