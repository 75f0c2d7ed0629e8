//! Stacks: named, deployable bundles of resource declarations.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::app::Topology;
use crate::id::LogicalId;
use crate::resource::{ResourceProps, ResourceSpec};
use crate::value::{OutputRef, Value};
use crate::{Error, Result};

/// Stack lifecycle status.
///
/// `Declared`, `Validated` and `Registered` are set while the topology is
/// built; `Provisioned`, `Failed` and `Skipped` are reported by a deployer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackStatus {
    #[default]
    Declared,
    Validated,
    Registered,
    Provisioned,
    Failed,
    Skipped,
}

impl StackStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StackStatus::Provisioned | StackStatus::Failed | StackStatus::Skipped
        )
    }
}

impl std::fmt::Display for StackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackStatus::Declared => write!(f, "declared"),
            StackStatus::Validated => write!(f, "validated"),
            StackStatus::Registered => write!(f, "registered"),
            StackStatus::Provisioned => write!(f, "provisioned"),
            StackStatus::Failed => write!(f, "failed"),
            StackStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// A named value a stack exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub name: LogicalId,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A stack of resources with its outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    id: LogicalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    resources: Vec<ResourceSpec>,
    outputs: Vec<Output>,
    /// Stacks whose outputs this stack reads.
    dependencies: BTreeSet<LogicalId>,
    #[serde(default)]
    status: StackStatus,
}

impl Stack {
    pub fn id(&self) -> &LogicalId {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn resources(&self) -> &[ResourceSpec] {
        &self.resources
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceSpec> {
        self.resources.iter().find(|r| r.id() == id)
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn dependencies(&self) -> &BTreeSet<LogicalId> {
        &self.dependencies
    }

    pub fn status(&self) -> StackStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: StackStatus) {
        self.status = status;
    }

    /// Reference to a declared output.
    pub fn get_output(&self, name: &str) -> Result<OutputRef> {
        let output = self.find_output(name)?;
        Ok(OutputRef::new(self.id.clone(), output.name.clone()))
    }

    /// Value of a declared output.
    pub fn output_value(&self, name: &str) -> Result<&Value> {
        Ok(&self.find_output(name)?.value)
    }

    fn find_output(&self, name: &str) -> Result<&Output> {
        self.outputs
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| Error::UnknownOutput {
                stack: self.id.to_string(),
                output: name.to_string(),
            })
    }

    /// Check that everything this stack points at exists.
    ///
    /// Local references must name a resource of the expected kind in this
    /// stack, attributes must be exposed by that resource, and output
    /// references must point at an earlier stack of `topology`.
    pub(crate) fn validate(&self, topology: &Topology) -> Result<()> {
        let mut seen = BTreeSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.id()) {
                return Err(Error::Duplicate(format!(
                    "resource '{}' in stack '{}'",
                    resource.id(),
                    self.id
                )));
            }
            resource.validate()?;
        }
        let mut seen = BTreeSet::new();
        for output in &self.outputs {
            if !seen.insert(&output.name) {
                return Err(Error::Duplicate(format!(
                    "output '{}' in stack '{}'",
                    output.name, self.id
                )));
            }
        }

        for resource in &self.resources {
            for (target, kind) in resource.local_references() {
                match self.resource(target.as_str()) {
                    Some(found) if found.kind() == kind => {}
                    Some(found) => {
                        return Err(Error::UnresolvedReference(format!(
                            "{} '{}' in stack '{}' points at '{}' which is a {}, expected a {}",
                            resource.kind(),
                            resource.id(),
                            self.id,
                            target,
                            found.kind(),
                            kind
                        )));
                    }
                    None => {
                        return Err(Error::UnresolvedReference(format!(
                            "{} '{}' in stack '{}' points at unknown {} '{}'",
                            resource.kind(),
                            resource.id(),
                            self.id,
                            kind,
                            target
                        )));
                    }
                }
            }
        }

        for value in self.values() {
            self.check_value(value, topology)?;
        }
        Ok(())
    }

    fn values(&self) -> impl Iterator<Item = &Value> {
        let env = self
            .resources
            .iter()
            .filter_map(|r| r.as_function())
            .flat_map(|f| f.environment.values());
        env.chain(self.outputs.iter().map(|o| &o.value))
    }

    fn check_value(&self, value: &Value, topology: &Topology) -> Result<()> {
        match value {
            Value::Literal { .. } => Ok(()),
            Value::Attribute {
                stack,
                resource,
                attribute,
            } => {
                // Attributes of other stacks only arrive through resolved outputs.
                let owner = if *stack == self.id {
                    Some(self)
                } else if topology.depends_on(&self.dependencies, stack) {
                    topology.get(stack.as_str())
                } else {
                    None
                };
                let Some(owner) = owner else {
                    return Err(Error::UnresolvedReference(format!(
                        "stack '{}' reads attribute '{}' of stack '{}' without importing it",
                        self.id, attribute, stack
                    )));
                };
                let spec = owner.resource(resource.as_str()).ok_or_else(|| {
                    Error::UnresolvedReference(format!(
                        "attribute '{}' of unknown resource '{}' in stack '{}'",
                        attribute, resource, stack
                    ))
                })?;
                if !spec.exposes(attribute.as_str()) {
                    return Err(Error::UnresolvedReference(format!(
                        "{} '{}' has no attribute '{}'",
                        spec.kind(),
                        resource,
                        attribute
                    )));
                }
                Ok(())
            }
            Value::Output { reference } => {
                if reference.stack == self.id {
                    return Err(Error::UnresolvedReference(format!(
                        "stack '{}' references its own output '{}'",
                        self.id, reference.output
                    )));
                }
                let producer = topology.get(reference.stack.as_str()).ok_or_else(|| {
                    Error::DependencyOrder {
                        consumer: self.id.to_string(),
                        producer: reference.stack.to_string(),
                    }
                })?;
                producer.find_output(reference.output.as_str()).map_err(|_| {
                    Error::UnresolvedReference(format!(
                        "stack '{}' references undeclared output '{}'",
                        self.id, reference
                    ))
                })?;
                Ok(())
            }
        }
    }

    /// Replace every output reference with the producer's value.
    ///
    /// Producers are registered before consumers and are themselves
    /// resolved, so a single substitution step is enough.
    pub(crate) fn resolve(&self, topology: &Topology) -> Result<Stack> {
        let lookup = |value: &Value| -> Result<Value> {
            match value {
                Value::Output { reference } => {
                    let producer = topology.get(reference.stack.as_str()).ok_or_else(|| {
                        Error::UnresolvedReference(reference.to_string())
                    })?;
                    let resolved = producer
                        .output_value(reference.output.as_str())
                        .map_err(|_| Error::UnresolvedReference(reference.to_string()))?;
                    if !resolved.is_resolved() {
                        return Err(Error::UnresolvedReference(reference.to_string()));
                    }
                    Ok(resolved.clone())
                }
                other => Ok(other.clone()),
            }
        };

        let mut resources = Vec::with_capacity(self.resources.len());
        for resource in &self.resources {
            match resource.props() {
                ResourceProps::Function(f) => {
                    let mut environment = BTreeMap::new();
                    for (key, value) in &f.environment {
                        environment.insert(key.clone(), lookup(value)?);
                    }
                    resources.push(resource.with_environment(environment));
                }
                _ => resources.push(resource.clone()),
            }
        }

        let mut outputs = Vec::with_capacity(self.outputs.len());
        for output in &self.outputs {
            outputs.push(Output {
                value: lookup(&output.value)?,
                ..output.clone()
            });
        }

        Ok(Stack {
            id: self.id.clone(),
            description: self.description.clone(),
            resources,
            outputs,
            dependencies: self.dependencies.clone(),
            status: self.status,
        })
    }
}

/// Construction scope handed to a [`StackFactory`].
///
/// Collects the declarations of one stack and gives read access to the
/// stacks registered before it.
pub struct StackScope<'a> {
    topology: &'a Topology,
    stack: Stack,
}

impl<'a> StackScope<'a> {
    pub(crate) fn new(topology: &'a Topology, id: LogicalId) -> Self {
        Self {
            topology,
            stack: Stack {
                id,
                description: None,
                resources: Vec::new(),
                outputs: Vec::new(),
                dependencies: BTreeSet::new(),
                status: StackStatus::Declared,
            },
        }
    }

    /// Id of the stack being declared.
    pub fn id(&self) -> &LogicalId {
        &self.stack.id
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.stack.description = Some(description.into());
    }

    /// Declare a resource. Fails on invalid options or a duplicate id.
    pub fn add(&mut self, id: &str, props: impl Into<ResourceProps>) -> Result<LogicalId> {
        let id = LogicalId::new(id)?;
        if self.stack.resource(id.as_str()).is_some() {
            return Err(Error::Duplicate(format!(
                "resource '{}' in stack '{}'",
                id, self.stack.id
            )));
        }
        let spec = ResourceSpec::new(id.clone(), props)?;
        self.stack.resources.push(spec);
        Ok(id)
    }

    /// Deploy-time attribute of a resource declared in this stack.
    pub fn attribute(&self, resource: &LogicalId, attribute: &str) -> Result<Value> {
        let spec = self.stack.resource(resource.as_str()).ok_or_else(|| {
            Error::UnresolvedReference(format!(
                "unknown resource '{}' in stack '{}'",
                resource, self.stack.id
            ))
        })?;
        if !spec.exposes(attribute) {
            return Err(Error::UnresolvedReference(format!(
                "{} '{}' has no attribute '{}'",
                spec.kind(),
                resource,
                attribute
            )));
        }
        Ok(Value::attribute(
            self.stack.id.clone(),
            resource.clone(),
            attribute,
        ))
    }

    /// Read an output of a stack registered earlier.
    ///
    /// Fails with `DependencyOrder` if the producer has not been added yet and
    /// with `UnknownOutput` if it does not declare `output`.
    pub fn import(&mut self, stack: &str, output: &str) -> Result<Value> {
        let producer = self
            .topology
            .get(stack)
            .ok_or_else(|| Error::DependencyOrder {
                consumer: self.stack.id.to_string(),
                producer: stack.to_string(),
            })?;
        let reference = producer.get_output(output)?;
        self.stack.dependencies.insert(reference.stack.clone());
        Ok(reference.into())
    }

    /// Same as [`StackScope::import`] for an already built reference.
    pub fn reference(&mut self, reference: &OutputRef) -> Result<Value> {
        self.import(reference.stack.as_str(), reference.output.as_str())
    }

    /// Declare an output.
    pub fn add_output(&mut self, name: &str, value: impl Into<Value>) -> Result<OutputRef> {
        self.push_output(name, value.into(), None)
    }

    /// Declare an output with a description shown to operators.
    pub fn add_described_output(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        description: impl Into<String>,
    ) -> Result<OutputRef> {
        self.push_output(name, value.into(), Some(description.into()))
    }

    fn push_output(
        &mut self,
        name: &str,
        value: Value,
        description: Option<String>,
    ) -> Result<OutputRef> {
        let name = LogicalId::new(name)?;
        if self.stack.outputs.iter().any(|o| o.name == name) {
            return Err(Error::Duplicate(format!(
                "output '{}' in stack '{}'",
                name, self.stack.id
            )));
        }
        if let Value::Output { reference } = &value {
            self.stack.dependencies.insert(reference.stack.clone());
        }
        self.stack.outputs.push(Output {
            name: name.clone(),
            value,
            description,
        });
        Ok(OutputRef::new(self.stack.id.clone(), name))
    }

    /// Validate and resolve the declarations, producing a registered stack.
    pub(crate) fn finish(mut self) -> Result<Stack> {
        // Output references built by hand bypass `import`; record them too.
        let referenced: Vec<LogicalId> = self
            .stack
            .values()
            .filter_map(|v| v.as_output_ref())
            .map(|r| r.stack.clone())
            .collect();
        self.stack.dependencies.extend(referenced);

        self.stack.validate(self.topology)?;
        self.stack.status = StackStatus::Validated;

        let mut stack = self.stack.resolve(self.topology)?;
        stack.status = StackStatus::Registered;
        Ok(stack)
    }
}

/// Something that declares the contents of a stack.
pub trait StackFactory {
    /// Typed construction parameters.
    type Config;

    /// Declare resources and outputs into `scope`.
    fn declare(&self, scope: &mut StackScope<'_>, config: &Self::Config) -> Result<()>;
}

/// A [`StackFactory`] backed by a closure.
pub struct FnStack<F>(F);

/// Build a stack factory from a closure taking no configuration.
pub fn stack_fn<F>(f: F) -> FnStack<F>
where
    F: Fn(&mut StackScope<'_>) -> Result<()>,
{
    FnStack(f)
}

impl<F> StackFactory for FnStack<F>
where
    F: Fn(&mut StackScope<'_>) -> Result<()>,
{
    type Config = ();

    fn declare(&self, scope: &mut StackScope<'_>, _config: &()) -> Result<()> {
        (self.0)(scope)
    }
}

/// Handle to a registered stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackHandle {
    id: LogicalId,
    outputs: Vec<LogicalId>,
}

impl StackHandle {
    pub(crate) fn new(stack: &Stack) -> Self {
        Self {
            id: stack.id.clone(),
            outputs: stack.outputs.iter().map(|o| o.name.clone()).collect(),
        }
    }

    pub fn id(&self) -> &LogicalId {
        &self.id
    }

    /// Reference to an output of the stack, for use by later stacks.
    pub fn get_output(&self, name: &str) -> Result<OutputRef> {
        self.outputs
            .iter()
            .find(|o| *o == name)
            .map(|o| OutputRef::new(self.id.clone(), o.clone()))
            .ok_or_else(|| Error::UnknownOutput {
                stack: self.id.to_string(),
                output: name.to_string(),
            })
    }
}
