use agent_core::{ActionKind, ActionOutcome};
use agent_goap::{
    Goal, GoalCategory, GoalStatus, GoapPlanner, PlannerConfig, PlannerInputs, PlannerLayer,
    StateConstraint, WorldModel,
};
use agent_memory::MemoryView;

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

fn inputs(tick: u64) -> PlannerInputs {
    PlannerInputs {
        tick,
        ..Default::default()
    }
}

#[test]
fn strategic_frontier_follows_badge_progress() {
    let mut planner = GoapPlanner::new(badge_goals(), PlannerConfig::default()).unwrap();
    let mut world = pewter_world();
    let memory = MemoryView::default();

    // Ten strategic refreshes with no badge: frontier stays at brock.
    for round in 0..10u64 {
        let mut i = inputs(round * 1000);
        i.milestone_changed = true;
        planner.step(&i, &world, &memory);
        assert_eq!(planner.frontier(), ["defeat_brock".to_string()]);
    }

    world.badges.insert("boulder".into());
    let mut i = inputs(10_001);
    i.milestone_changed = true;
    let decision = planner.step(&i, &world, &memory);

    assert_eq!(decision.completed_goals, vec!["defeat_brock".to_string()]);
    assert!(planner
        .frontier()
        .contains(&"defeat_misty".to_string()));
    assert!(planner.frontier().contains(&"obtain_cut".to_string()));
}

#[test]
fn tactical_layer_builds_a_plan_for_the_best_goal() {
    let mut planner = GoapPlanner::new(badge_goals(), PlannerConfig::default()).unwrap();
    let world = pewter_world();
    let memory = MemoryView::default();

    let decision = planner.step(&inputs(0), &world, &memory);
    assert_eq!(decision.goal_id.as_deref(), Some("defeat_brock"));
    let action = decision.action.unwrap();
    assert!(matches!(action.kind, ActionKind::Battle { .. }));
}

#[test]
fn reactive_interrupt_supersedes_the_plan() {
    let mut planner = GoapPlanner::new(badge_goals(), PlannerConfig::default()).unwrap();
    let world = pewter_world();
    let memory = MemoryView::default();

    planner.step(&inputs(0), &world, &memory);

    let mut critical = inputs(1);
    critical.hp_pct = Some(5);
    let decision = planner.step(&critical, &world, &memory);
    assert_eq!(decision.layer, Some(PlannerLayer::Reactive));
    assert!(matches!(decision.action.unwrap().kind, ActionKind::Heal));

    // Next tick without the interrupt, the tactical plan resumes.
    let mut calm = inputs(2);
    calm.hp_pct = Some(80);
    let decision = planner.step(&calm, &world, &memory);
    assert!(matches!(
        decision.action.unwrap().kind,
        ActionKind::Battle { .. }
    ));
}

#[test]
fn repair_budget_exhaustion_fails_the_goal() {
    let config = PlannerConfig::default();
    let mut planner = GoapPlanner::new(badge_goals(), config).unwrap();
    let world = pewter_world();
    let memory = MemoryView::default();

    planner.step(&inputs(0), &world, &memory);
    assert_eq!(planner.current_goal_id(), Some("defeat_brock"));

    // Three repairs are tolerated; the fourth failure fails the goal.
    for attempt in 1..=3u64 {
        let decision = planner.report_outcome(attempt, ActionOutcome::Failure);
        assert!(decision.failed_goal.is_none(), "repair {attempt} should hold");
    }
    let decision = planner.report_outcome(4, ActionOutcome::Failure);
    assert_eq!(decision.failed_goal.as_deref(), Some("defeat_brock"));
    assert_eq!(
        planner.graph().get("defeat_brock").unwrap().status,
        GoalStatus::Failed
    );
    assert!(planner.current_goal_id().is_none());
}

#[test]
fn finishing_a_plan_records_a_successful_attempt() {
    let mut planner = GoapPlanner::new(badge_goals(), PlannerConfig::default()).unwrap();
    let world = pewter_world();
    let memory = MemoryView::default();

    planner.step(&inputs(0), &world, &memory);
    while planner.current_goal_id().is_some() {
        planner.report_outcome(1, ActionOutcome::Success);
    }
    let goal = planner.graph().get("defeat_brock").unwrap();
    assert_eq!(goal.attempts, 1);
    assert_eq!(goal.success.successes, 1);
    assert_eq!(goal.last_attempt_tick, Some(1));
}
