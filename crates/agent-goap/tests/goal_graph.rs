use agent_goap::{
    Goal, GoalCategory, GoalGraph, GoalGraphError, GoalStatus, StateConstraint, WorldModel,
};

fn badge_goals() -> Vec<Goal> {
    vec![
        Goal::new("defeat_brock", GoalCategory::Battle, 100)
            .with_required_state(vec![StateConstraint::AtLocation("pewter_gym".into())])
            .with_success_when(vec![StateConstraint::HasBadge("boulder".into())]),
        Goal::new("defeat_misty", GoalCategory::Battle, 90).with_prereqs(["defeat_brock"]),
        Goal::new("obtain_cut", GoalCategory::Item, 60).with_prereqs(["defeat_brock"]),
    ]
}

fn pewter_world() -> WorldModel {
    WorldModel {
        location: "pewter_gym".into(),
        party_hp_pct: 100,
        ..Default::default()
    }
}

#[test]
fn frontier_gates_on_prereqs_and_required_state() {
    let graph = GoalGraph::from_goals(badge_goals()).unwrap();
    let world = pewter_world();

    let frontier: Vec<&str> = graph.frontier(&world).iter().map(|g| g.id.as_str()).collect();
    assert_eq!(frontier, ["defeat_brock"]);
}

#[test]
fn completing_a_prereq_opens_dependents() {
    let mut graph = GoalGraph::from_goals(badge_goals()).unwrap();
    let world = pewter_world();

    graph.mark_completed("defeat_brock");
    let frontier: Vec<&str> = graph.frontier(&world).iter().map(|g| g.id.as_str()).collect();
    assert_eq!(frontier, ["defeat_misty", "obtain_cut"]);
    assert!(graph.completion_is_consistent());
}

#[test]
fn cycles_are_rejected_at_construction() {
    let goals = vec![
        Goal::new("a", GoalCategory::Navigation, 1).with_prereqs(["b"]),
        Goal::new("b", GoalCategory::Navigation, 1).with_prereqs(["a"]),
    ];
    let err = GoalGraph::from_goals(goals).unwrap_err();
    assert!(matches!(err, GoalGraphError::Cycle(_)));
}

#[test]
fn unknown_prereq_is_rejected() {
    let goals = vec![Goal::new("a", GoalCategory::Navigation, 1).with_prereqs(["missing"])];
    let err = GoalGraph::from_goals(goals).unwrap_err();
    assert!(matches!(err, GoalGraphError::UnknownPrereq { .. }));
}

#[test]
fn failed_goal_reports_blocked_dependents() {
    let mut graph = GoalGraph::from_goals(badge_goals()).unwrap();
    let blocked = graph.mark_failed("defeat_brock");
    assert_eq!(blocked, vec!["defeat_misty".to_string(), "obtain_cut".to_string()]);
    assert_eq!(graph.get("defeat_brock").unwrap().status, GoalStatus::Failed);

    // Failed goals leave the frontier entirely.
    let frontier = graph.frontier(&pewter_world());
    assert!(frontier.is_empty());
}
