// ABOUTME: Dependency graph construction and validation for a set of services.
// ABOUTME: Detects cycles and dangling ids, enforces stage ordering, and yields teardown order.

use std::collections::{BTreeSet, HashMap};

use crate::config::{ActivationOrder, ServiceConfig};
use crate::plan::ServiceSpec;
use crate::types::ServiceId;

/// Anything that declares an id and the ids it depends on.
pub trait Dependent {
    fn id(&self) -> &ServiceId;
    fn dependencies(&self) -> &BTreeSet<ServiceId>;
}

impl Dependent for ServiceSpec {
    fn id(&self) -> &ServiceId {
        &self.id
    }

    fn dependencies(&self) -> &BTreeSet<ServiceId> {
        &self.dependencies
    }
}

impl Dependent for ServiceConfig {
    fn id(&self) -> &ServiceId {
        &self.id
    }

    fn dependencies(&self) -> &BTreeSet<ServiceId> {
        &self.dependencies
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// `service_b` depends (possibly transitively) on `service_a`, which depends on `service_b`.
    #[error("cyclic dependency between {service_a} and {service_b}")]
    CyclicDependency {
        service_a: ServiceId,
        service_b: ServiceId,
    },

    #[error("service {service} depends on undeclared service {missing_id}")]
    DanglingDependency {
        service: ServiceId,
        missing_id: ServiceId,
    },

    #[error("service {0} is declared more than once")]
    DuplicateService(ServiceId),

    #[error("service {service} depends on {dependency}, which is not activated before it")]
    StageOrderViolation {
        service: ServiceId,
        dependency: ServiceId,
    },

    #[error("service {0} does not belong to any stage")]
    UnstagedService(ServiceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Acyclic "depends on" graph over a flat, indexed list of services.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<ServiceId>,
    index: HashMap<ServiceId, usize>,
    /// `edges[i]` holds the indices `nodes[i]` depends on.
    edges: Vec<BTreeSet<usize>>,
    /// Dependencies before dependents.
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Build and validate the graph for `services`.
    ///
    /// Every dependency must name a declared service and the graph must be
    /// acyclic. Nothing else is inspected; see [`DependencyGraph::with_stages`]
    /// for the stage ordering rules.
    pub fn build<T: Dependent>(services: &[T]) -> Result<Self, GraphError> {
        let mut index = HashMap::with_capacity(services.len());
        let mut nodes = Vec::with_capacity(services.len());
        for service in services {
            if index.insert(service.id().clone(), nodes.len()).is_some() {
                return Err(GraphError::DuplicateService(service.id().clone()));
            }
            nodes.push(service.id().clone());
        }

        let mut edges = Vec::with_capacity(services.len());
        for service in services {
            let mut dependencies = BTreeSet::new();
            for dependency in service.dependencies() {
                let position = index.get(dependency).copied().ok_or_else(|| {
                    GraphError::DanglingDependency {
                        service: service.id().clone(),
                        missing_id: dependency.clone(),
                    }
                })?;
                dependencies.insert(position);
            }
            edges.push(dependencies);
        }

        let order = depth_first_order(&nodes, &edges)?;

        Ok(DependencyGraph {
            nodes,
            index,
            edges,
            order,
        })
    }

    /// Check the graph against the stage layout and order nodes stage by stage.
    ///
    /// A dependency must live in the same or an earlier stage. Inside a
    /// sequential stage it must also be declared before its dependent, since
    /// members start one at a time in declared order.
    pub fn with_stages(mut self, activation: &ActivationOrder) -> Result<Self, GraphError> {
        let mut stage_of = Vec::with_capacity(self.nodes.len());
        for id in &self.nodes {
            let stage = activation
                .stage_of(id)
                .ok_or_else(|| GraphError::UnstagedService(id.clone()))?;
            stage_of.push(stage);
        }

        for (node, dependencies) in self.edges.iter().enumerate() {
            for &dependency in dependencies {
                let violation = GraphError::StageOrderViolation {
                    service: self.nodes[node].clone(),
                    dependency: self.nodes[dependency].clone(),
                };

                if stage_of[dependency] > stage_of[node] {
                    return Err(violation);
                }

                let stage = &activation.stages[stage_of[node]];
                if stage_of[dependency] == stage_of[node] && !stage.parallel {
                    let dependent_at = stage.position(&self.nodes[node]);
                    let dependency_at = stage.position(&self.nodes[dependency]);
                    if dependency_at > dependent_at {
                        return Err(violation);
                    }
                }
            }
        }

        // Stable sort keeps the dependency order within each stage.
        self.order.sort_by_key(|&node| stage_of[node]);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &ServiceId) -> bool {
        self.index.contains_key(id)
    }

    pub fn dependencies_of(&self, id: &ServiceId) -> Vec<&ServiceId> {
        self.index
            .get(id)
            .map(|&node| self.edges[node].iter().map(|&d| &self.nodes[d]).collect())
            .unwrap_or_default()
    }

    /// Every service, dependencies before dependents.
    pub fn activation_order(&self) -> Vec<ServiceId> {
        self.order.iter().map(|&node| self.nodes[node].clone()).collect()
    }

    /// `targets` ordered so each service is torn down before anything it depends on.
    ///
    /// Targets unknown to the graph go last, sorted by id.
    pub fn teardown_order(&self, targets: &BTreeSet<ServiceId>) -> Vec<ServiceId> {
        let mut ordered: Vec<ServiceId> = self
            .order
            .iter()
            .rev()
            .map(|&node| &self.nodes[node])
            .filter(|id| targets.contains(*id))
            .cloned()
            .collect();

        ordered.extend(targets.iter().filter(|id| !self.contains(id)).cloned());
        ordered
    }
}

/// Post-order depth-first traversal with three-color marking.
///
/// A dependency found gray is a back edge, i.e. a cycle.
fn depth_first_order(
    nodes: &[ServiceId],
    edges: &[BTreeSet<usize>],
) -> Result<Vec<usize>, GraphError> {
    let mut color = vec![Color::White; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());

    for root in 0..nodes.len() {
        if color[root] != Color::White {
            continue;
        }

        // Each frame holds a node and its dependencies still to visit, in
        // reverse so `pop` yields them in declaration order.
        let mut stack: Vec<(usize, Vec<usize>)> = vec![(root, pending(&edges[root]))];
        color[root] = Color::Gray;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            match frame.1.pop() {
                Some(next) => match color[next] {
                    Color::White => {
                        color[next] = Color::Gray;
                        stack.push((next, pending(&edges[next])));
                    }
                    Color::Gray => {
                        return Err(GraphError::CyclicDependency {
                            service_a: nodes[next].clone(),
                            service_b: nodes[node].clone(),
                        });
                    }
                    Color::Black => {}
                },
                None => {
                    color[node] = Color::Black;
                    order.push(node);
                    stack.pop();
                }
            }
        }
    }

    Ok(order)
}

fn pending(dependencies: &BTreeSet<usize>) -> Vec<usize> {
    dependencies.iter().rev().copied().collect()
}
