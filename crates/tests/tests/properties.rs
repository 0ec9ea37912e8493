//! Invariants that hold for every cycle of randomly declared universes.

use strobe_foundation::{Layout, Record, RngStream};
use strobe_scheduler::{
    verify_schedule, ActionId, ArbiterPolicy, Combiner, Condition, Priority, ResourceBody,
    ResourceId, ResourceSpec, ScheduleBuilder, SchedulerConfig, SignalId,
};
use strobe_tests::Testbench;

struct Universe {
    builder: ScheduleBuilder,
    actions: Vec<(ActionId, SignalId)>,
    resources: Vec<(ResourceId, SignalId, bool)>,
    uses: Vec<Vec<ResourceId>>,
    orderings: Vec<(ActionId, ActionId)>,
}

fn random_universe(rng: &mut RngStream) -> Universe {
    let mut builder = ScheduleBuilder::new();
    let resource_count = 2 + rng.index(5);
    let action_count = 2 + rng.index(7);

    let resources: Vec<(ResourceId, SignalId, bool)> = (0..resource_count)
        .map(|i| {
            let ready = builder.flag(format!("r{i}_ready"));
            let nonexclusive = rng.bool_with_prob(0.25);
            let mut spec = ResourceSpec::new(Layout::empty(), Layout::empty());
            if nonexclusive {
                spec = spec.nonexclusive(Combiner::First);
            }
            let id = builder.register_resource("soc", &format!("r{i}"), spec);
            builder
                .finalize_resource(id, ResourceBody::new().ready(ready))
                .unwrap();
            (id, ready, nonexclusive)
        })
        .collect();

    let mut actions = Vec::new();
    let mut uses = Vec::new();
    for i in 0..action_count {
        let request = builder.flag(format!("a{i}_request"));
        let action = builder.register_action("soc", &format!("a{i}"));
        let mut used = Vec::new();
        for &(resource, _, _) in &resources {
            if rng.bool_with_prob(0.3) {
                builder
                    .call(action, resource, Record::unit(), Condition::Always)
                    .unwrap();
                used.push(resource);
            }
        }
        builder.finalize_action(action, request).unwrap();
        actions.push((action, request));
        uses.push(used);
    }

    // relations always point from the earlier action to the later one, so
    // no priority cycle can form
    let mut orderings = Vec::new();
    for _ in 0..rng.index(4) {
        let a = rng.index(action_count);
        let b = rng.index(action_count);
        if a == b {
            continue;
        }
        let (early, late) = (actions[a.min(b)].0, actions[a.max(b)].0);
        match rng.index(3) {
            0 => builder.declare_conflict(early, late, Priority::Left).unwrap(),
            1 => builder.declare_conflict(late, early, Priority::Right).unwrap(),
            _ => builder.declare_schedule_before(early, late).unwrap(),
        }
        orderings.push((early, late));
    }

    Universe {
        builder,
        actions,
        resources,
        uses,
        orderings,
    }
}

fn check_universe(label: &str, policy: ArbiterPolicy) {
    let mut rng = RngStream::from_label(label);
    let Universe {
        builder,
        actions,
        resources,
        uses,
        orderings,
    } = random_universe(&mut rng);

    let mut bench = Testbench::build(builder, &SchedulerConfig::uniform(policy)).with_seed(label);
    verify_schedule(bench.schedule()).unwrap();

    let schedule = bench.schedule();
    for &(early, late) in &orderings {
        assert!(schedule.position(early) < schedule.position(late), "{label}: ordering violated");
    }
    let conflicts: Vec<Vec<bool>> = actions
        .iter()
        .map(|&(a, _)| actions.iter().map(|&(b, _)| schedule.conflicts(a, b)).collect())
        .collect();
    let component_count = schedule.components().len();

    let request_flags: Vec<SignalId> = actions.iter().map(|&(_, flag)| flag).collect();
    let ready_flags: Vec<SignalId> = resources.iter().map(|&(_, flag, _)| flag).collect();
    for _ in 0..300 {
        let wants = bench.randomize(&request_flags, 0.6);
        let ready = bench.randomize(&ready_flags, 0.8);
        let report = bench.step();

        let granted: Vec<bool> = actions.iter().map(|&(a, _)| report.granted(a)).collect();
        let eligible: Vec<bool> = (0..actions.len())
            .map(|i| {
                wants[i]
                    && uses[i]
                        .iter()
                        .all(|r| resources.iter().position(|&(id, _, _)| id == *r).is_some_and(|k| ready[k]))
            })
            .collect();

        for i in 0..actions.len() {
            if granted[i] {
                assert!(eligible[i], "{label}: a{i} granted while not eligible");
            }
            for j in i + 1..actions.len() {
                assert!(
                    !(conflicts[i][j] && granted[i] && granted[j]),
                    "{label}: conflicting a{i} and a{j} both granted"
                );
            }
        }

        for (k, &(resource, _, nonexclusive)) in resources.iter().enumerate() {
            let called = uses
                .iter()
                .enumerate()
                .any(|(i, used)| granted[i] && used.contains(&resource));
            assert_eq!(report.ran(resource), called, "{label}: r{k} activation");
            if !nonexclusive {
                assert!(report.callers(resource).len() <= 1, "{label}: r{k} called twice");
            }
        }

        match policy {
            // maximal: an eligible action is only held back by a granted peer
            ArbiterPolicy::Eager => {
                for i in 0..actions.len() {
                    if eligible[i] && !granted[i] {
                        assert!(
                            (0..actions.len()).any(|j| granted[j] && conflicts[i][j]),
                            "{label}: a{i} deferred without a granted conflict"
                        );
                    }
                }
            }
            ArbiterPolicy::RoundRobin => {
                let count = granted.iter().filter(|&&g| g).count();
                assert!(count <= component_count, "{label}: too many grants");
            }
        }
    }
}

#[test]
fn test_random_universes_eager() {
    for seed in 0..25 {
        check_universe(&format!("eager-{seed}"), ArbiterPolicy::Eager);
    }
}

#[test]
fn test_random_universes_round_robin() {
    for seed in 0..25 {
        check_universe(&format!("round-robin-{seed}"), ArbiterPolicy::RoundRobin);
    }
}
