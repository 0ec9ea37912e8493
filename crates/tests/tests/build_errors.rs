//! Every declaration mistake is caught before a schedule exists.

use strobe_foundation::{Layout, Record};
use strobe_scheduler::{
    Condition, Entity, Error, Operand, Priority, ResourceBody, ResourceSpec, ScheduleBuilder,
    SchedulerConfig,
};

fn unit_spec() -> ResourceSpec {
    ResourceSpec::new(Layout::empty(), Layout::empty())
}

fn build(builder: ScheduleBuilder) -> Error {
    match builder.build(&SchedulerConfig::default()) {
        Ok(_) => panic!("build unexpectedly succeeded"),
        Err(err) => err,
    }
}

#[test]
fn test_double_use_is_rejected_at_call() {
    let mut b = ScheduleBuilder::new();
    let port = b.register_resource("rf", "port", unit_spec());
    let act = b.register_action("core", "act");
    b.call(act, port, Record::unit(), Condition::Always).unwrap();
    let err = b.call(act, port, Record::unit(), Condition::Always).unwrap_err();
    assert!(matches!(err, Error::DoubleUse { .. }));
    assert_eq!(err.to_string(), "rf.port can't be called twice from core.act");
}

#[test]
fn test_use_after_finalize() {
    let mut b = ScheduleBuilder::new();
    let port = b.register_resource("rf", "port", unit_spec());
    let act = b.register_action("core", "act");
    b.finalize_action(act, Condition::Always).unwrap();
    assert!(matches!(
        b.call(act, port, Record::unit(), Condition::Always),
        Err(Error::UseAfterFinalize { .. })
    ));
}

#[test]
fn test_already_defined() {
    let mut b = ScheduleBuilder::new();
    let port = b.register_resource("rf", "port", unit_spec());
    b.finalize_resource(port, ResourceBody::new()).unwrap();
    match b.finalize_resource(port, ResourceBody::new()) {
        Err(Error::AlreadyDefined(name)) => assert_eq!(name, "rf.port"),
        other => panic!("expected AlreadyDefined, got {other:?}"),
    }
    let act = b.register_action("core", "act");
    b.finalize_action(act, Condition::Always).unwrap();
    assert!(matches!(
        b.finalize_action(act, Condition::Always),
        Err(Error::AlreadyDefined(_))
    ));
}

#[test]
fn test_undefined_resource_use() {
    let mut b = ScheduleBuilder::new();
    let port = b.register_resource("rf", "port", unit_spec());
    let act = b.register_action("core", "act");
    b.call(act, port, Record::unit(), Condition::Always).unwrap();
    b.finalize_action(act, Condition::Always).unwrap();
    assert!(matches!(build(b), Error::UndefinedResourceUse { .. }));
}

#[test]
fn test_unused_undefined_resource_is_harmless() {
    let mut b = ScheduleBuilder::new();
    b.register_resource("rf", "spare", unit_spec());
    let act = b.register_action("core", "act");
    b.finalize_action(act, Condition::Always).unwrap();
    assert!(b.build(&SchedulerConfig::default()).is_ok());
}

#[test]
fn test_proxy_defined_twice() {
    let mut b = ScheduleBuilder::new();
    let target = b.register_resource("m", "t", unit_spec());
    b.finalize_resource(target, ResourceBody::new()).unwrap();

    let finalized = b.register_resource("m", "p", unit_spec());
    b.finalize_resource(finalized, ResourceBody::new()).unwrap();
    match b.define_proxy(finalized, target) {
        Err(Error::AlreadyDefined(name)) => assert_eq!(name, "m.p"),
        other => panic!("expected AlreadyDefined, got {other:?}"),
    }

    let forwarder = b.register_resource("m", "q", unit_spec());
    b.define_proxy(forwarder, target).unwrap();
    match b.define_proxy(forwarder, target) {
        Err(Error::AlreadyDefined(name)) => assert_eq!(name, "m.q"),
        other => panic!("expected AlreadyDefined, got {other:?}"),
    }
}

#[test]
fn test_unused_resources_calling_each_other() {
    let mut b = ScheduleBuilder::new();
    let ping = b.register_resource("m", "ping", unit_spec());
    let pong = b.register_resource("m", "pong", unit_spec());
    b.call(ping, pong, Operand::Output(pong), Condition::Always).unwrap();
    b.call(pong, ping, Operand::Output(ping), Condition::Always).unwrap();
    let act = b.register_action("core", "act");
    b.finalize_action(act, Condition::Always).unwrap();
    assert!(b.build(&SchedulerConfig::default()).is_ok());
}

#[test]
fn test_undefined_action() {
    let mut b = ScheduleBuilder::new();
    b.register_action("core", "dangling");
    match build(b) {
        Error::UndefinedAction(name) => assert_eq!(name, "core.dangling"),
        other => panic!("expected UndefinedAction, got {other:?}"),
    }
}

#[test]
fn test_schedule_order_error() {
    let mut b = ScheduleBuilder::new();
    let first = b.register_action("core", "first");
    b.finalize_action(first, Condition::Always).unwrap();
    let second = b.register_action("core", "second");
    b.finalize_action(second, Condition::Always).unwrap();
    b.declare_schedule_before(second, first).unwrap();
    assert_eq!(
        build(b).to_string(),
        "core.second scheduled before core.first, but defined afterwards"
    );
}

#[test]
fn test_priority_cycle_produces_no_schedule() {
    let mut b = ScheduleBuilder::new();
    let ids: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| {
            let id = b.register_action("core", name);
            b.finalize_action(id, Condition::Always).unwrap();
            id
        })
        .collect();
    b.declare_conflict(ids[0], ids[1], Priority::Left).unwrap();
    b.declare_conflict(ids[1], ids[2], Priority::Left).unwrap();
    b.declare_conflict(ids[2], ids[0], Priority::Left).unwrap();
    match build(b) {
        Error::PriorityCycle { actions } => assert_eq!(actions, vec!["core.a", "core.b", "core.c"]),
        other => panic!("expected PriorityCycle, got {other:?}"),
    }
}

#[test]
fn test_layout_mismatch() {
    let mut b = ScheduleBuilder::new();
    let wide = b.signal("wide", Layout::scalar(16));
    let port = b.register_resource("rf", "port", ResourceSpec::new(Layout::scalar(8), Layout::empty()));
    let act = b.register_action("core", "act");
    assert!(matches!(
        b.call(act, port, wide, Condition::Always),
        Err(Error::LayoutMismatch { .. })
    ));
    // a data signal cannot gate a call
    assert!(matches!(
        b.call(act, port, Record::scalar(1), wide),
        Err(Error::LayoutMismatch { .. })
    ));
    assert!(matches!(
        b.call(act, port, Record::scalar(256), Condition::Always),
        Err(Error::ConstantMismatch { .. })
    ));
}

#[test]
fn test_unknown_handle() {
    let mut other = ScheduleBuilder::new();
    other.register_resource("x", "a", unit_spec());
    let foreign = other.register_resource("x", "b", unit_spec());

    let mut b = ScheduleBuilder::new();
    let act = b.register_action("core", "act");
    assert!(matches!(
        b.call(act, foreign, Record::unit(), Condition::Always),
        Err(Error::UnknownEntity { kind: "resource", index: 1 })
    ));
    assert!(matches!(
        b.declare_simultaneous(&[act.into(), Entity::Resource(foreign)]),
        Err(Error::UnknownEntity { .. })
    ));

    let target = b.register_resource("core", "target", unit_spec());
    assert!(matches!(
        b.define_proxy(foreign, target),
        Err(Error::UnknownEntity { kind: "resource", index: 1 })
    ));
    assert!(matches!(
        b.define_proxy(target, foreign),
        Err(Error::UnknownEntity { kind: "resource", index: 1 })
    ));
}

#[test]
fn test_combinational_loop() {
    let mut b = ScheduleBuilder::new();
    let spec = ResourceSpec::new(Layout::scalar(4), Layout::scalar(4));
    let left = b.register_resource("alu", "left", spec.clone());
    let right = b.register_resource("alu", "right", spec);
    b.finalize_resource(left, ResourceBody::new()).unwrap();
    b.finalize_resource(right, ResourceBody::new()).unwrap();
    let first = b.register_action("core", "first");
    b.call(first, left, Operand::Output(right), Condition::Always).unwrap();
    b.finalize_action(first, Condition::Always).unwrap();
    let second = b.register_action("core", "second");
    b.call(second, right, Operand::Output(left), Condition::Always).unwrap();
    b.finalize_action(second, Condition::Always).unwrap();

    match build(b) {
        Error::CombinationalLoop { resources } => assert_eq!(resources, vec!["alu.left", "alu.right"]),
        other => panic!("expected CombinationalLoop, got {other:?}"),
    }
}

#[test]
fn test_invalid_config() {
    assert!(matches!(
        SchedulerConfig::from_json("{ \"default_policy\": 3 }"),
        Err(Error::Config(_))
    ));
}
