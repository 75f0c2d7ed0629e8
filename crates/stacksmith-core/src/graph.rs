//! Dependency ordering between stacks.

use std::collections::{BTreeSet, HashMap};

use crate::id::LogicalId;
use crate::{Error, Result};

/// Order `nodes` so every node comes after the nodes it depends on.
///
/// Nodes without a mutual dependency keep their input order. A dependency on
/// a node that is not in the set fails with `UnresolvedReference`; a cycle
/// fails with `DependencyOrder` naming the edge that closes it.
pub fn topological_sort<'a, I>(nodes: I) -> Result<Vec<LogicalId>>
where
    I: IntoIterator<Item = (&'a LogicalId, &'a BTreeSet<LogicalId>)>,
{
    let nodes: Vec<(&LogicalId, &BTreeSet<LogicalId>)> = nodes.into_iter().collect();
    let deps: HashMap<&LogicalId, &BTreeSet<LogicalId>> = nodes.iter().copied().collect();

    for (node, needs) in &nodes {
        for dep in needs.iter() {
            if !deps.contains_key(dep) {
                return Err(Error::UnresolvedReference(format!(
                    "stack '{}' depends on unknown stack '{}'",
                    node, dep
                )));
            }
        }
    }

    let mut marks: HashMap<&LogicalId, Mark> = HashMap::new();
    let mut order = Vec::with_capacity(nodes.len());
    for &(node, _) in &nodes {
        visit(node, &deps, &mut marks, &mut order)?;
    }
    Ok(order)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

fn visit<'a>(
    node: &'a LogicalId,
    deps: &HashMap<&'a LogicalId, &'a BTreeSet<LogicalId>>,
    marks: &mut HashMap<&'a LogicalId, Mark>,
    order: &mut Vec<LogicalId>,
) -> Result<()> {
    if marks.contains_key(node) {
        return Ok(());
    }
    marks.insert(node, Mark::InProgress);

    if let Some(&needs) = deps.get(node) {
        for dep in needs.iter() {
            if marks.get(dep) == Some(&Mark::InProgress) {
                return Err(Error::DependencyOrder {
                    consumer: node.to_string(),
                    producer: dep.to_string(),
                });
            }
            visit(dep, deps, marks, order)?;
        }
    }

    marks.insert(node, Mark::Done);
    order.push(node.clone());
    Ok(())
}
