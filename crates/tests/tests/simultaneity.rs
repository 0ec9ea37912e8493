//! Simultaneity groups fire together or not at all.

use strobe_foundation::{Layout, Record};
use strobe_scheduler::{
    ActionId, Condition, Priority, ResourceBody, ResourceId, ResourceSpec, ScheduleBuilder,
    SchedulerConfig, SignalId,
};
use strobe_tests::Testbench;

struct Pair {
    builder: ScheduleBuilder,
    actions: [ActionId; 2],
    requests: [SignalId; 2],
    ports: [ResourceId; 2],
}

/// Two actions with their own request flag and private port.
fn pair() -> Pair {
    let mut builder = ScheduleBuilder::new();
    let mut make = |name: &str| {
        let request = builder.flag(format!("{name}_request"));
        let port = builder.register_resource("dp", &format!("{name}_port"), ResourceSpec::new(Layout::scalar(4), Layout::empty()));
        builder.finalize_resource(port, ResourceBody::new()).unwrap();
        let action = builder.register_action("dp", name);
        builder
            .call(action, port, Record::scalar(name.len() as u64), Condition::Always)
            .unwrap();
        builder.finalize_action(action, request).unwrap();
        (action, request, port)
    };
    let (c1, r1, p1) = make("c1");
    let (c2, r2, p2) = make("c22");
    Pair {
        builder,
        actions: [c1, c2],
        requests: [r1, r2],
        ports: [p1, p2],
    }
}

#[test]
fn test_group_fires_together_over_random_cycles() {
    let Pair {
        mut builder,
        actions,
        requests,
        ports,
    } = pair();
    builder
        .declare_simultaneous(&[actions[0].into(), actions[1].into()])
        .unwrap();
    let mut bench = Testbench::build(builder, &SchedulerConfig::default()).with_seed("simultaneous");
    assert_eq!(bench.schedule().merged_groups().len(), 1);
    assert_eq!(bench.schedule().merged_groups()[0].constituents, actions.to_vec());

    for _ in 0..200 {
        let wants = bench.randomize(&requests, 0.6);
        let report = bench.step();
        let both = wants[0] && wants[1];
        assert_eq!(report.granted(actions[0]), both);
        assert_eq!(report.granted(actions[1]), both);
        assert_eq!(report.ran(ports[0]), both);
        assert_eq!(report.ran(ports[1]), both);
        if both {
            assert_eq!(report.input(ports[1]), Some(&Record::scalar(3)));
        }
    }
}

#[test]
fn test_group_members_report_merged_position() {
    let Pair {
        mut builder,
        actions,
        ..
    } = pair();
    builder
        .declare_simultaneous(&[actions[1].into(), actions[0].into()])
        .unwrap();
    let bench = Testbench::build(builder, &SchedulerConfig::default());
    let schedule = bench.schedule();
    let merged = schedule.merged_groups()[0].action;

    assert_eq!(schedule.order(), vec![merged]);
    assert_eq!(schedule.representative(actions[0]), Some(merged));
    assert_eq!(schedule.position(actions[1]), Some(0));
    assert_eq!(schedule.name_of(merged), "dp.c1+dp.c22");
    assert_eq!(*schedule.owner_of(merged), "dp");
    assert_eq!(*schedule.owner_of(actions[1]), "dp");
}

#[test]
fn test_group_conflicting_with_outsider() {
    let Pair {
        mut builder,
        actions,
        requests,
        ports,
    } = pair();
    // an outsider sharing c22's port, preferred over it
    let outsider_request = builder.flag("outsider_request");
    let outsider = builder.register_action("dp", "outsider");
    builder
        .call(outsider, ports[1], Record::scalar(9), Condition::Always)
        .unwrap();
    builder.finalize_action(outsider, outsider_request).unwrap();
    builder
        .declare_conflict(outsider, actions[1], Priority::Left)
        .unwrap();
    builder
        .declare_simultaneous(&[actions[0].into(), actions[1].into()])
        .unwrap();

    let mut bench = Testbench::build(builder, &SchedulerConfig::default());
    assert!(bench.schedule().conflicts(outsider, actions[0]));

    bench.set(requests[0], true);
    bench.set(requests[1], true);
    bench.set(outsider_request, true);
    let report = bench.step();
    assert_eq!(report.granted_actions(), vec![outsider]);
    assert_eq!(report.input(ports[1]), Some(&Record::scalar(9)));

    bench.set(outsider_request, false);
    let report = bench.step();
    assert_eq!(report.granted_actions(), actions.to_vec());
    assert_eq!(report.input(ports[1]), Some(&Record::scalar(3)));
}

#[test]
fn test_group_through_resource_takes_each_user_separately() {
    let mut builder = ScheduleBuilder::new();
    let shared = builder.register_resource("dp", "shared", ResourceSpec::new(Layout::empty(), Layout::empty()));
    builder.finalize_resource(shared, ResourceBody::new()).unwrap();
    let leader = builder.register_action("dp", "leader");
    builder.finalize_action(leader, Condition::Always).unwrap();
    let mut users = Vec::new();
    for name in ["u0", "u1"] {
        let request = builder.flag(format!("{name}_request"));
        let user = builder.register_action("dp", name);
        builder
            .call(user, shared, Record::unit(), Condition::Always)
            .unwrap();
        builder.finalize_action(user, request).unwrap();
        users.push((user, request));
    }
    builder
        .declare_simultaneous(&[leader.into(), shared.into()])
        .unwrap();

    let mut bench = Testbench::build(builder, &SchedulerConfig::default());
    assert_eq!(bench.schedule().merged_groups().len(), 2);

    // the leader fires with whichever user gets the shared resource
    bench.set(users[1].1, true);
    let report = bench.step();
    assert_eq!(report.granted_actions(), vec![leader, users[1].0]);

    bench.set(users[0].1, true);
    let report = bench.step();
    assert_eq!(report.granted_actions(), vec![leader, users[0].0]);
}
