// ABOUTME: Tests for dependency graph validation and ordering.
// ABOUTME: Error cases plus property tests over randomly generated acyclic graphs.

mod support;

use nonempty::NonEmpty;
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use convoy::config::{
    ActivationOrder, RetryConfig, ServiceConfig, ServiceKind, Stage, SuccessCriteria,
};
use convoy::graph::{DependencyGraph, GraphError};
use convoy::types::ServiceId;
use support::{id, ids};

fn service(name: &str, dependencies: &[&str]) -> ServiceConfig {
    ServiceConfig {
        id: id(name),
        kind: ServiceKind::Generic,
        dependencies: ids(dependencies),
        health_endpoint: format!("http://{name}/health"),
        readiness_probes: Vec::new(),
        performance_baselines: Vec::new(),
        activation_timeout: Duration::from_secs(30),
        retry: RetryConfig::default(),
    }
}

fn stage(name: &str, members: &[&str], parallel: bool) -> Stage {
    Stage {
        name: name.to_string(),
        services: NonEmpty::from_vec(members.iter().map(|m| id(m)).collect()).unwrap(),
        prerequisites: BTreeSet::new(),
        parallel,
        activation_timeout: Duration::from_secs(300),
        validation_timeout: Duration::from_secs(60),
        success_criteria: SuccessCriteria::default(),
        overrides: BTreeMap::new(),
    }
}

fn order(stages: Vec<Stage>) -> ActivationOrder {
    ActivationOrder {
        stages: NonEmpty::from_vec(stages).unwrap(),
        integration_tests: Vec::new(),
    }
}

// =============================================================================
// Construction errors
// =============================================================================

mod build {
    use super::*;

    /// Test: a two-service cycle names both services.
    #[test]
    fn detects_cycle() {
        let services = vec![service("a", &["b"]), service("b", &["a"])];

        let err = DependencyGraph::build(&services).unwrap_err();

        assert_eq!(
            err,
            GraphError::CyclicDependency {
                service_a: id("a"),
                service_b: id("b"),
            }
        );
    }

    /// Test: a longer cycle is detected wherever the traversal starts.
    #[test]
    fn detects_transitive_cycle() {
        let services = vec![
            service("entry", &["a"]),
            service("a", &["b"]),
            service("b", &["c"]),
            service("c", &["a"]),
        ];

        let err = DependencyGraph::build(&services).unwrap_err();

        assert!(matches!(err, GraphError::CyclicDependency { .. }));
    }

    /// Test: a service depending on itself is a cycle.
    #[test]
    fn detects_self_dependency() {
        let services = vec![service("a", &["a"])];

        let err = DependencyGraph::build(&services).unwrap_err();

        assert_eq!(
            err,
            GraphError::CyclicDependency {
                service_a: id("a"),
                service_b: id("a"),
            }
        );
    }

    /// Test: dependencies must name declared services.
    #[test]
    fn rejects_dangling_dependency() {
        let services = vec![service("api", &["db"])];

        let err = DependencyGraph::build(&services).unwrap_err();

        assert_eq!(
            err,
            GraphError::DanglingDependency {
                service: id("api"),
                missing_id: id("db"),
            }
        );
    }

    /// Test: duplicate ids are rejected.
    #[test]
    fn rejects_duplicate_service() {
        let services = vec![service("db", &[]), service("db", &[])];

        let err = DependencyGraph::build(&services).unwrap_err();

        assert_eq!(err, GraphError::DuplicateService(id("db")));
    }

    /// Test: diamond dependencies are fine and ordered.
    #[test]
    fn orders_diamond() {
        let services = vec![
            service("app", &["left", "right"]),
            service("left", &["base"]),
            service("right", &["base"]),
            service("base", &[]),
        ];

        let graph = DependencyGraph::build(&services).unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(
            graph.activation_order(),
            vec![id("base"), id("left"), id("right"), id("app")]
        );
        assert_eq!(
            graph.dependencies_of(&id("app")),
            vec![&id("left"), &id("right")]
        );
    }
}

// =============================================================================
// Stage layout
// =============================================================================

mod stages {
    use super::*;

    /// Test: a dependency in a later stage is rejected.
    #[test]
    fn rejects_dependency_in_later_stage() {
        let services = vec![service("api", &["db"]), service("db", &[])];
        let layout = order(vec![stage("app", &["api"], false), stage("data", &["db"], false)]);

        let err = DependencyGraph::build(&services)
            .unwrap()
            .with_stages(&layout)
            .unwrap_err();

        assert_eq!(
            err,
            GraphError::StageOrderViolation {
                service: id("api"),
                dependency: id("db"),
            }
        );
    }

    /// Test: in a sequential stage a dependency must be declared first.
    #[test]
    fn sequential_stage_respects_declared_order() {
        let services = vec![service("db", &[]), service("api", &["db"])];

        let wrong = order(vec![stage("all", &["api", "db"], false)]);
        let right = order(vec![stage("all", &["db", "api"], false)]);

        assert!(
            DependencyGraph::build(&services)
                .unwrap()
                .with_stages(&wrong)
                .is_err()
        );
        assert!(
            DependencyGraph::build(&services)
                .unwrap()
                .with_stages(&right)
                .is_ok()
        );
    }

    /// Test: every service must belong to a stage.
    #[test]
    fn rejects_unstaged_service() {
        let services = vec![service("db", &[]), service("api", &["db"])];
        let layout = order(vec![stage("data", &["db"], false)]);

        let err = DependencyGraph::build(&services)
            .unwrap()
            .with_stages(&layout)
            .unwrap_err();

        assert_eq!(err, GraphError::UnstagedService(id("api")));
    }

    /// Test: activation order follows stages, then dependencies.
    #[test]
    fn orders_by_stage() {
        let services = vec![
            service("web", &["api"]),
            service("metrics", &[]),
            service("api", &[]),
        ];
        let layout = order(vec![
            stage("backend", &["api"], false),
            stage("edge", &["web", "metrics"], true),
        ]);

        let graph = DependencyGraph::build(&services)
            .unwrap()
            .with_stages(&layout)
            .unwrap();

        let activation = graph.activation_order();
        assert_eq!(activation[0], id("api"));
        assert_eq!(
            graph.teardown_order(&ids(&["web", "metrics", "api"])).last(),
            Some(&id("api"))
        );
    }
}

/// Test: targets the graph does not know are torn down last.
#[test]
fn unknown_targets_go_last() {
    let services = vec![service("db", &[]), service("api", &["db"])];
    let graph = DependencyGraph::build(&services).unwrap();

    let teardown = graph.teardown_order(&ids(&["db", "api", "ghost"]));

    assert_eq!(teardown, vec![id("api"), id("db"), id("ghost")]);
}

// =============================================================================
// Properties
// =============================================================================

/// Random DAG: node `i` depends only on nodes before it. The second vector is
/// the declaration order.
fn dag() -> impl Strategy<Value = (Vec<BTreeSet<usize>>, Vec<usize>)> {
    prop::collection::vec(prop::collection::vec(any::<Index>(), 0..3), 1..12).prop_flat_map(
        |raw| {
            let edges: Vec<BTreeSet<usize>> = raw
                .iter()
                .enumerate()
                .map(|(node, picks)| {
                    if node == 0 {
                        BTreeSet::new()
                    } else {
                        picks.iter().map(|pick| pick.index(node)).collect()
                    }
                })
                .collect();
            let declared: Vec<usize> = (0..edges.len()).collect();
            (Just(edges), Just(declared).prop_shuffle())
        },
    )
}

fn name(node: usize) -> String {
    format!("svc-{node}")
}

fn declare(edges: &[BTreeSet<usize>], declared: &[usize]) -> Vec<ServiceConfig> {
    declared
        .iter()
        .map(|&node| {
            let dependencies: Vec<String> = edges[node].iter().map(|&d| name(d)).collect();
            let dependencies: Vec<&str> = dependencies.iter().map(String::as_str).collect();
            service(&name(node), &dependencies)
        })
        .collect()
}

/// Longest path to a root, so every dependency lands in an earlier stage.
fn layered(edges: &[BTreeSet<usize>]) -> ActivationOrder {
    let mut depth = vec![0usize; edges.len()];
    for node in 0..edges.len() {
        depth[node] = edges[node]
            .iter()
            .map(|&d| depth[d] + 1)
            .max()
            .unwrap_or(0);
    }

    let mut layers: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (node, &level) in depth.iter().enumerate() {
        layers.entry(level).or_default().push(name(node));
    }
    order(
        layers
            .into_iter()
            .map(|(level, members)| {
                let members: Vec<&str> = members.iter().map(String::as_str).collect();
                stage(&format!("layer-{level}"), &members, true)
            })
            .collect(),
    )
}

fn positions(order: &[ServiceId]) -> HashMap<ServiceId, usize> {
    order
        .iter()
        .enumerate()
        .map(|(at, id)| (id.clone(), at))
        .collect()
}

proptest! {
    /// Test: dependencies always come before their dependents.
    #[test]
    fn activation_order_respects_dependencies((edges, declared) in dag()) {
        let graph = DependencyGraph::build(&declare(&edges, &declared)).unwrap();
        let activation = graph.activation_order();
        prop_assert_eq!(activation.len(), edges.len());

        let at = positions(&activation);
        for (node, dependencies) in edges.iter().enumerate() {
            for &dependency in dependencies {
                prop_assert!(at[&id(&name(dependency))] < at[&id(&name(node))]);
            }
        }
    }

    /// Test: full teardown is exactly the reverse of activation.
    #[test]
    fn teardown_reverses_activation((edges, declared) in dag()) {
        let graph = DependencyGraph::build(&declare(&edges, &declared)).unwrap();
        let all: BTreeSet<ServiceId> = graph.activation_order().into_iter().collect();

        let mut teardown = graph.teardown_order(&all);
        teardown.reverse();

        prop_assert_eq!(teardown, graph.activation_order());
    }

    /// Test: a partial teardown keeps exactly the targets, dependents first.
    #[test]
    fn partial_teardown_keeps_dependents_first(
        (edges, declared) in dag(),
        picks in prop::collection::vec(any::<Index>(), 1..6),
    ) {
        let graph = DependencyGraph::build(&declare(&edges, &declared)).unwrap();
        let targets: BTreeSet<ServiceId> = picks
            .iter()
            .map(|pick| id(&name(pick.index(edges.len()))))
            .collect();

        let teardown = graph.teardown_order(&targets);
        prop_assert_eq!(teardown.iter().cloned().collect::<BTreeSet<_>>(), targets);

        let at = positions(&teardown);
        for (node, dependencies) in edges.iter().enumerate() {
            for &dependency in dependencies {
                if let (Some(dependent), Some(dependency)) =
                    (at.get(&id(&name(node))), at.get(&id(&name(dependency))))
                {
                    prop_assert!(dependent < dependency);
                }
            }
        }
    }

    /// Test: a layered stage plan is accepted and activation follows it.
    #[test]
    fn layered_stages_are_consistent((edges, declared) in dag()) {
        let layout = layered(&edges);
        let graph = DependencyGraph::build(&declare(&edges, &declared))
            .unwrap()
            .with_stages(&layout)
            .unwrap();

        let stage_of: Vec<usize> = graph
            .activation_order()
            .iter()
            .map(|service| layout.stage_of(service).unwrap())
            .collect();
        prop_assert!(stage_of.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
