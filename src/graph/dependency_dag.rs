use crate::error::{PlanError, PlanResult, ValidationError};
use crate::task::Task;
use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

/// Task dependency graph. Nodes carry task ids in input order, so a node's
/// index equals the task's position in the slice it was built from. Edges
/// run from a dependency to the task that depends on it.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    pub graph: DiGraph<String, ()>,
    pub id_to_index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Builds the graph and rejects cycles. Dependencies on unknown ids are
    /// reported as validation errors.
    pub fn build(tasks: &[Task]) -> PlanResult<Self> {
        let mut graph: DiGraph<String, ()> = DiGraph::with_capacity(tasks.len(), tasks.len());
        let mut id_to_index: HashMap<String, NodeIndex> = HashMap::with_capacity(tasks.len());

        for task in tasks {
            let node_ix = graph.add_node(task.id.clone());
            id_to_index.insert(task.id.clone(), node_ix);
        }

        for task in tasks {
            let v = id_to_index[&task.id];
            for dep in &task.dependencies {
                let u = id_to_index.get(dep).copied().ok_or_else(|| {
                    ValidationError::UnknownDependency {
                        task_id: task.id.clone(),
                        dependency: dep.clone(),
                    }
                })?;
                graph.update_edge(u, v, ());
            }
        }

        let dag = Self { graph, id_to_index };
        if let Some(cycle) = dag.find_cycle() {
            return Err(PlanError::CyclicDependency { cycle });
        }
        Ok(dag)
    }

    /// One cycle as an ordered list of ids whose first and last entries are
    /// the same task, or `None` when the graph is acyclic.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        if toposort(&self.graph, None).is_ok() {
            return None;
        }
        let mut components: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .collect();
        for scc in &mut components {
            scc.sort();
        }
        components.sort();
        let scc = components.into_iter().next()?;
        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let origin = scc[0];

        // Shortest walk origin -> ... -> origin inside the component.
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([origin]);
        while let Some(node) = queue.pop_front() {
            let mut next: Vec<NodeIndex> = self
                .graph
                .neighbors_directed(node, Direction::Outgoing)
                .filter(|n| members.contains(n))
                .collect();
            next.sort();
            for succ in next {
                if succ == origin {
                    let mut path = vec![origin, node];
                    let mut cursor = node;
                    while cursor != origin {
                        cursor = parent[&cursor];
                        path.push(cursor);
                    }
                    path.reverse();
                    return Some(path.into_iter().map(|ix| self.graph[ix].clone()).collect());
                }
                if !parent.contains_key(&succ) {
                    parent.insert(succ, node);
                    queue.push_back(succ);
                }
            }
        }
        None
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Task positions in a dependency-respecting order.
    pub fn topological_order(&self) -> Vec<usize> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|ix| ix.index()).collect())
            .unwrap_or_default()
    }

    /// `(dependency, dependent)` pairs as task positions.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
    }

    /// Ids of the tasks that directly depend on `task_id`.
    pub fn dependents_of(&self, task_id: &str) -> Vec<&str> {
        self.neighbors(task_id, Direction::Outgoing)
    }

    pub fn dependencies_of(&self, task_id: &str) -> Vec<&str> {
        self.neighbors(task_id, Direction::Incoming)
    }

    fn neighbors(&self, task_id: &str, direction: Direction) -> Vec<&str> {
        let Some(&ix) = self.id_to_index.get(task_id) else {
            return Vec::new();
        };
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(ix, direction).collect();
        out.sort();
        out.into_iter().map(|n| self.graph[n].as_str()).collect()
    }
}
