use workplan::graph::DependencyGraph;
use workplan::task::Task;
use workplan::{PlanError, ValidationError};

fn diamond() -> Vec<Task> {
    vec![
        Task::new("A", "Start", 2),
        Task::new("B", "Left", 3).depends_on(["A"]),
        Task::new("C", "Right", 4).depends_on(["A"]),
        Task::new("D", "Join", 1).depends_on(["B", "C"]),
    ]
}

#[test]
fn builds_one_node_per_task() {
    let dag = DependencyGraph::build(&diamond()).unwrap();
    assert_eq!(dag.task_count(), 4);
    assert_eq!(dag.edges().count(), 4);
    assert_eq!(dag.dependents_of("A"), vec!["B", "C"]);
    assert_eq!(dag.dependencies_of("D"), vec!["B", "C"]);
    assert!(dag.dependents_of("D").is_empty());
}

#[test]
fn topological_order_respects_every_edge() {
    let tasks = diamond();
    let dag = DependencyGraph::build(&tasks).unwrap();
    let order = dag.topological_order();
    let position = |id: &str| {
        let index = tasks.iter().position(|t| t.id == id).unwrap();
        order.iter().position(|&i| i == index).unwrap()
    };
    for (dep, dependent) in dag.edges() {
        let dep_id = &tasks[dep].id;
        let dependent_id = &tasks[dependent].id;
        assert!(position(dep_id) < position(dependent_id));
    }
}

#[test]
fn three_node_cycle_is_closed_path() {
    let tasks = vec![
        Task::new("X", "X", 1),
        Task::new("A", "A", 1).depends_on(["C", "X"]),
        Task::new("B", "B", 1).depends_on(["A"]),
        Task::new("C", "C", 1).depends_on(["B"]),
    ];
    let Err(PlanError::CyclicDependency { cycle }) = DependencyGraph::build(&tasks) else {
        panic!("cycle not detected");
    };
    assert_eq!(cycle.len(), 4);
    assert_eq!(cycle.first(), cycle.last());
    assert!(!cycle.contains(&"X".to_string()));
}

#[test]
fn missing_dependency_is_rejected_before_graph_checks() {
    let tasks = vec![Task::new("A", "A", 1).depends_on(["ghost"])];
    assert!(matches!(
        DependencyGraph::build(&tasks),
        Err(PlanError::Validation(ValidationError::UnknownDependency { .. }))
    ));
}
