//! Ordering graph built from `run_before` constraints

use crate::error::{CoreError, CoreResult};
use crate::migration::Migration;
use crate::migration_id::MigrationId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// A directed acyclic graph of migration ordering constraints.
///
/// An edge `a -> b` means `a` lists `b` in its `run_before`, so `a` is
/// applied first.
#[derive(Debug)]
pub struct MigrationDag {
    /// The underlying graph
    graph: DiGraph<MigrationId, ()>,

    /// Map from migration id to node index
    node_map: HashMap<MigrationId, NodeIndex>,

    /// Apply order, computed once the graph is known to be acyclic
    order: Vec<MigrationId>,
}

impl MigrationDag {
    /// Build and validate the DAG for a batch of migrations.
    ///
    /// Fails with [`CoreError::UnknownRunBefore`] when a target id is not in
    /// the batch, and with [`CoreError::CircularDependency`] on any cycle.
    pub fn build<'a, I>(migrations: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = &'a dyn Migration>,
    {
        let migrations: Vec<&dyn Migration> = migrations.into_iter().collect();
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        for m in &migrations {
            let id = m.id().clone();
            if node_map.contains_key(&id) {
                return Err(CoreError::DuplicateMigration { id: id.into_inner() });
            }
            let idx = graph.add_node(id.clone());
            node_map.insert(id, idx);
        }

        for m in &migrations {
            let from = node_map[m.id()];
            for target in m.run_before() {
                let Some(&to) = node_map.get(target) else {
                    return Err(CoreError::UnknownRunBefore {
                        id: m.id().to_string(),
                        target: target.to_string(),
                    });
                };
                // Repeated entries in run_before collapse into one edge
                graph.update_edge(from, to, ());
            }
        }

        let mut dag = Self {
            graph,
            node_map,
            order: Vec::new(),
        };
        dag.validate()?;
        dag.order = dag.stable_topological_order();
        Ok(dag)
    }

    /// Validate the DAG has no cycles
    fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Find a path from `start` back to itself for error reporting
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        let mut closing = None;

        'search: while let Some(current) = stack.pop() {
            for edge in self.graph.edges(current) {
                let target = edge.target();
                if target == start {
                    closing = Some(current);
                    break 'search;
                }
                if visited.insert(target) {
                    parent.insert(target, current);
                    stack.push(target);
                }
            }
        }

        let mut path = vec![self.graph[start].to_string()];
        if let Some(mut node) = closing {
            let mut back = Vec::new();
            while node != start {
                back.push(self.graph[node].to_string());
                node = parent[&node];
            }
            back.reverse();
            path.extend(back);
        }
        path.push(self.graph[start].to_string());
        path.join(" -> ")
    }

    /// Kahn's algorithm with lexical id order as the tie-break.
    fn stable_topological_order(&self) -> Vec<MigrationId> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|idx| {
                (
                    idx,
                    self.graph.edges_directed(idx, Direction::Incoming).count(),
                )
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<(MigrationId, NodeIndex)>> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&idx, _)| Reverse((self.graph[idx].clone(), idx)))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((id, idx))) = ready.pop() {
            order.push(id);
            for edge in self.graph.edges(idx) {
                let target = edge.target();
                if let Some(deg) = in_degree.get_mut(&target) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(Reverse((self.graph[target].clone(), target)));
                    }
                }
            }
        }
        order
    }

    /// Migrations in apply order (every `run_before` honoured, ties by id)
    pub fn apply_order(&self) -> &[MigrationId] {
        &self.order
    }

    /// Apply order up to and including `target`, keeping only `target` and
    /// the migrations that must run before it.
    pub fn apply_order_until(&self, target: &str) -> CoreResult<Vec<MigrationId>> {
        let Some(&idx) = self.node_map.get(target) else {
            return Err(CoreError::MigrationNotFound {
                id: target.to_string(),
            });
        };
        let mut needed: HashSet<MigrationId> = self.collect_reachable(idx, Direction::Incoming);
        needed.insert(self.graph[idx].clone());
        Ok(self
            .order
            .iter()
            .filter(|id| needed.contains(*id))
            .cloned()
            .collect())
    }

    /// Direct successors: the `run_before` targets of `id`
    pub fn successors(&self, id: &str) -> Vec<MigrationId> {
        let Some(&idx) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<MigrationId> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out
    }

    /// Collect all nodes reachable from `start` by following edges in `direction`.
    fn collect_reachable(&self, start: NodeIndex, direction: Direction) -> HashSet<MigrationId> {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for neighbor in self.graph.neighbors_directed(current, direction) {
                if seen.insert(self.graph[neighbor].clone()) {
                    stack.push(neighbor);
                }
            }
        }
        seen
    }

    /// Check if a migration is part of the DAG
    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    /// Number of migrations
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the DAG is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
