//! Application root: owns the topology and adds stacks to it.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::graph::topological_sort;
use crate::id::LogicalId;
use crate::manifest::Manifest;
use crate::stack::{Stack, StackFactory, StackHandle, StackScope, StackStatus};
use crate::value::OutputRef;
use crate::{Error, Result};

/// The set of stacks of one deployment, in construction order.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    stacks: Vec<Stack>,
    index: HashMap<LogicalId, usize>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Stack> {
        self.index.get(id).map(|&i| &self.stacks[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Stacks in the order they were added.
    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// True when `target` is reachable from `direct` through dependencies.
    pub fn depends_on(&self, direct: &BTreeSet<LogicalId>, target: &LogicalId) -> bool {
        let mut pending: Vec<&LogicalId> = direct.iter().collect();
        let mut seen = BTreeSet::new();
        while let Some(id) = pending.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(&i) = self.index.get(id) {
                pending.extend(self.stacks[i].dependencies().iter());
            }
        }
        false
    }

    /// Stacks sorted so that every producer precedes its consumers.
    pub fn deployment_order(&self) -> Result<Vec<&Stack>> {
        let order = topological_sort(self.stacks.iter().map(|s| (s.id(), s.dependencies())))?;
        Ok(order
            .iter()
            .filter_map(|id| self.index.get(id).map(|&i| &self.stacks[i]))
            .collect())
    }

    /// Record a status reported by a deployer.
    pub fn set_status(&mut self, id: &str, status: StackStatus) -> Result<()> {
        if !status.is_terminal() {
            return Err(Error::Configuration(format!(
                "status '{}' cannot be reported by a deployer",
                status
            )));
        }
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("stack '{}'", id)))?;
        self.stacks[i].set_status(status);
        Ok(())
    }

    /// Build a topology from already registered stacks, re-checking them in
    /// dependency order.
    pub(crate) fn from_stacks(stacks: Vec<Stack>) -> Result<Self> {
        let mut ids = BTreeSet::new();
        for stack in &stacks {
            if !ids.insert(stack.id().clone()) {
                return Err(Error::Duplicate(format!("stack '{}'", stack.id())));
            }
        }
        let order = topological_sort(stacks.iter().map(|s| (s.id(), s.dependencies())))?;

        let mut by_id: HashMap<LogicalId, Stack> =
            stacks.into_iter().map(|s| (s.id().clone(), s)).collect();
        let mut topology = Topology::new();
        for id in order {
            let Some(stack) = by_id.remove(&id) else {
                continue;
            };
            stack.validate(&topology)?;
            topology.insert(stack);
        }
        Ok(topology)
    }

    fn insert(&mut self, stack: Stack) {
        self.index.insert(stack.id().clone(), self.stacks.len());
        self.stacks.push(stack);
    }
}

/// Application root.
///
/// Stacks are added one at a time; a stack may only read outputs of stacks
/// added before it.
#[derive(Debug, Clone)]
pub struct App {
    name: String,
    topology: Topology,
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topology: Topology::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Construct a stack with `factory` and register it.
    ///
    /// On error the topology is left unchanged.
    pub fn add_stack<F: StackFactory>(
        &mut self,
        factory: &F,
        id: &str,
        config: &F::Config,
    ) -> Result<StackHandle> {
        let id = LogicalId::new(id)?;
        if self.topology.contains(id.as_str()) {
            return Err(Error::Duplicate(format!("stack '{}'", id)));
        }

        let mut scope = StackScope::new(&self.topology, id.clone());
        factory.declare(&mut scope, config)?;
        let stack = scope.finish()?;

        info!(
            stack = %stack.id(),
            resources = stack.resources().len(),
            outputs = stack.outputs().len(),
            "Registered stack"
        );
        for dep in stack.dependencies() {
            debug!(stack = %stack.id(), depends_on = %dep, "Stack dependency");
        }

        let handle = StackHandle::new(&stack);
        self.topology.insert(stack);
        Ok(handle)
    }

    pub fn stack(&self, id: &str) -> Result<&Stack> {
        self.topology
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("stack '{}'", id)))
    }

    /// Reference to an output of a registered stack.
    pub fn output(&self, stack: &str, name: &str) -> Result<OutputRef> {
        self.stack(stack)?.get_output(name)
    }

    /// Functions reachable through an unauthenticated URL, as
    /// `(stack, function)` pairs.
    pub fn public_endpoints(&self) -> Vec<(&LogicalId, &LogicalId)> {
        self.topology
            .stacks()
            .iter()
            .flat_map(|s| {
                s.resources()
                    .iter()
                    .filter(|r| r.as_function().is_some_and(|f| f.is_public()))
                    .map(move |r| (s.id(), r.id()))
            })
            .collect()
    }

    /// Stacks sorted so that every producer precedes its consumers.
    pub fn deployment_order(&self) -> Result<Vec<&Stack>> {
        self.topology.deployment_order()
    }

    /// Finalize the topology into a deployable manifest.
    pub fn synth(&self) -> Result<Manifest> {
        let order = self.deployment_order()?;
        let manifest = Manifest::new(&self.name, order.into_iter().cloned().collect());
        info!(
            app = %self.name,
            id = %manifest.id,
            stacks = manifest.stacks.len(),
            "Synthesized topology"
        );
        Ok(manifest)
    }
}
