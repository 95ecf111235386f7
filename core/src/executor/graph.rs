use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{CycleError, GraphError};
use crate::executor::types::{UnitLike, UnitStatus};

/// Arena node. Edges are indices into [`DependencyGraph::nodes`].
#[derive(Debug, Clone)]
pub struct UnitNode {
    pub id: String,
    /// Declared dependencies, deduplicated, in declaration order.
    pub dependencies: Vec<usize>,
    /// Derived reverse edges.
    pub dependents: Vec<usize>,
    pub layer: usize,
    pub status: UnitStatus,
}

/// Layered unit DAG.
///
/// Every node sits in exactly one layer, and a node's layer is strictly
/// greater than the layer of each of its dependencies. Nodes are never
/// removed; [`extend`](Self::extend) only appends.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<UnitNode>,
    index: HashMap<String, usize>,
    layers: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build and layer a graph from a flat unit list.
    ///
    /// # Algorithm
    ///
    /// Iterative Kahn layering over the arena:
    ///
    /// 1. Layer 0 = units with no dependencies, in input order
    /// 2. Each unit of the current layer decrements its dependents' remaining
    ///    counts; units reaching zero form the next layer (input order)
    /// 3. Repeat until a layer comes out empty
    ///
    /// Units still unassigned at that point sit on or behind a cycle and are
    /// reported as [`CycleError::unresolved`] in declaration order.
    ///
    /// # Time Complexity
    ///
    /// O(V + E), no recursion.
    pub fn build<T: UnitLike>(units: &[T]) -> Result<Self, GraphError> {
        let mut graph = Self::default();
        graph.append(units)?;
        Ok(graph)
    }

    /// Append previously unknown units. Ids already in the graph are skipped.
    ///
    /// New units may depend on existing units or on each other. The graph is
    /// left untouched when the batch is invalid. Returns the ids added, in
    /// input order.
    pub fn extend<T: UnitLike>(&mut self, units: &[T]) -> Result<Vec<String>, GraphError> {
        let fresh: Vec<T> = {
            let mut seen = HashSet::new();
            units
                .iter()
                .filter(|u| !self.index.contains_key(u.id()) && seen.insert(u.id().to_string()))
                .cloned()
                .collect()
        };
        if fresh.is_empty() {
            return Ok(Vec::new());
        }

        let mut staged = self.clone();
        staged.append(&fresh)?;
        *self = staged;
        Ok(fresh.iter().map(|u| u.id().to_string()).collect())
    }

    fn append<T: UnitLike>(&mut self, units: &[T]) -> Result<(), GraphError> {
        let first = self.nodes.len();

        for unit in units {
            if self.index.contains_key(unit.id()) {
                return Err(GraphError::DuplicateUnit(unit.id().to_string()));
            }
            self.index.insert(unit.id().to_string(), self.nodes.len());
            self.nodes.push(UnitNode {
                id: unit.id().to_string(),
                dependencies: Vec::new(),
                dependents: Vec::new(),
                layer: 0,
                status: UnitStatus::Pending,
            });
        }

        for (offset, unit) in units.iter().enumerate() {
            let idx = first + offset;
            let mut deps = Vec::with_capacity(unit.dependencies().len());
            for dep in unit.dependencies() {
                let Some(&dep_idx) = self.index.get(dep) else {
                    return Err(GraphError::UnknownDependency {
                        unit: unit.id().to_string(),
                        missing: dep.clone(),
                    });
                };
                if !deps.contains(&dep_idx) {
                    deps.push(dep_idx);
                }
            }
            for &dep_idx in &deps {
                self.nodes[dep_idx].dependents.push(idx);
            }
            self.nodes[idx].dependencies = deps;
        }

        self.layer_from(first)
    }

    /// Kahn layering of nodes `first..`. Earlier nodes are already layered.
    fn layer_from(&mut self, first: usize) -> Result<(), GraphError> {
        let total = self.nodes.len();
        let mut remaining: Vec<usize> = vec![0; total];
        let mut layer_of: Vec<Option<usize>> = vec![None; total];
        for idx in 0..first {
            layer_of[idx] = Some(self.nodes[idx].layer);
        }

        let mut frontier = Vec::new();
        for idx in first..total {
            let mut base = 0;
            let mut open = 0;
            for &dep in &self.nodes[idx].dependencies {
                match layer_of[dep] {
                    Some(layer) if dep < first => base = base.max(layer + 1),
                    _ => open += 1,
                }
            }
            remaining[idx] = open;
            if open == 0 {
                layer_of[idx] = Some(base);
                frontier.push(idx);
            }
        }

        let mut assigned = frontier.len();
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for &idx in &frontier {
                for &dependent in &self.nodes[idx].dependents {
                    if dependent < first {
                        continue;
                    }
                    remaining[dependent] -= 1;
                    if remaining[dependent] == 0 {
                        let layer = self.nodes[dependent]
                            .dependencies
                            .iter()
                            .filter_map(|&d| layer_of[d])
                            .map(|l| l + 1)
                            .max()
                            .unwrap_or(0);
                        layer_of[dependent] = Some(layer);
                        next.push(dependent);
                    }
                }
            }
            next.sort_unstable();
            assigned += next.len();
            frontier = next;
        }

        if assigned < total - first {
            let unresolved = (first..total)
                .filter(|&idx| layer_of[idx].is_none())
                .map(|idx| self.nodes[idx].id.clone())
                .collect();
            return Err(CycleError { unresolved }.into());
        }

        for idx in first..total {
            let layer = layer_of[idx].unwrap_or_default();
            self.nodes[idx].layer = layer;
            if self.layers.len() <= layer {
                self.layers.resize_with(layer + 1, Vec::new);
            }
            self.layers[layer].push(idx);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&UnitNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn nodes(&self) -> &[UnitNode] {
        &self.nodes
    }

    /// Unit ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.id.as_str())
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layers as unit ids. Within a layer, declaration order.
    pub fn layer_ids(&self) -> Vec<Vec<String>> {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(|&idx| self.nodes[idx].id.clone()).collect())
            .collect()
    }

    pub fn layer_of(&self, id: &str) -> Option<usize> {
        self.node(id).map(|n| n.layer)
    }

    pub fn status(&self, id: &str) -> Option<UnitStatus> {
        self.node(id).map(|n| n.status)
    }

    pub fn set_status(&mut self, id: &str, status: UnitStatus) -> bool {
        match self.index.get(id) {
            Some(&idx) => {
                self.nodes[idx].status = status;
                true
            }
            None => false,
        }
    }

    pub fn dependency_ids(&self, id: &str) -> Vec<String> {
        self.node(id)
            .map(|n| {
                n.dependencies
                    .iter()
                    .map(|&d| self.nodes[d].id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn dependent_ids(&self, id: &str) -> Vec<String> {
        self.node(id)
            .map(|n| {
                n.dependents
                    .iter()
                    .map(|&d| self.nodes[d].id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True iff every declared dependency is `Done` right now.
    pub fn dependencies_done(&self, id: &str) -> bool {
        match self.node(id) {
            Some(node) => node
                .dependencies
                .iter()
                .all(|&d| self.nodes[d].status == UnitStatus::Done),
            None => false,
        }
    }

    /// Failed or cancelled units among the transitive dependencies of `id`,
    /// in declaration order. Empty when nothing upstream has failed.
    pub fn failed_ancestors(&self, id: &str) -> Vec<String> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };
        let mut seen = vec![false; self.nodes.len()];
        let mut queue: VecDeque<usize> = self.nodes[start].dependencies.iter().copied().collect();
        let mut found = Vec::new();
        while let Some(idx) = queue.pop_front() {
            if std::mem::replace(&mut seen[idx], true) {
                continue;
            }
            let node = &self.nodes[idx];
            if matches!(node.status, UnitStatus::Failed | UnitStatus::Cancelled) {
                found.push(idx);
            }
            queue.extend(node.dependencies.iter().copied());
        }
        found.sort_unstable();
        found
            .into_iter()
            .map(|idx| self.nodes[idx].id.clone())
            .collect()
    }
}
