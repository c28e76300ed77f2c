use agent_goap::{Goal, GoalCategory, GoapPlanner, PlannerConfig, PlannerInputs, WorldModel};
use agent_memory::MemoryView;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn chained_goals(count: usize) -> Vec<Goal> {
    let mut goals = Vec::with_capacity(count);
    for i in 0..count {
        let mut goal = Goal::new(format!("goal_{i:03}"), GoalCategory::Navigation, 10 + i as i32);
        if i > 0 {
            goal = goal.with_prereqs([format!("goal_{:03}", i - 1)]);
        }
        goals.push(goal);
    }
    goals
}

fn bench_planner_step(c: &mut Criterion) {
    let mut planner =
        GoapPlanner::new(chained_goals(64), PlannerConfig::default()).expect("acyclic");
    let world = WorldModel::default();
    let memory = MemoryView::default();

    c.bench_function("agent-goap/planner.step(goals=64)", |b| {
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            let inputs = PlannerInputs {
                tick,
                ..Default::default()
            };
            let decision = planner.step(&inputs, &world, &memory);
            black_box(decision.action.is_some());
        })
    });
}

criterion_group!(benches, bench_planner_step);
criterion_main!(benches);
