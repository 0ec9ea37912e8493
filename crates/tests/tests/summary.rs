//! Serialized schedule summaries and configuration documents.

use serde_json::json;
use strobe_foundation::{Layout, Record};
use strobe_scheduler::{Condition, ResourceBody, ResourceSpec, ScheduleBuilder, SchedulerConfig};

fn core_universe() -> ScheduleBuilder {
    let mut builder = ScheduleBuilder::new();
    let port = builder.register_resource("mem", "port", ResourceSpec::new(Layout::empty(), Layout::empty()));
    builder.finalize_resource(port, ResourceBody::new()).unwrap();
    for name in ["x", "y"] {
        let action = builder.register_action("core", name);
        builder
            .call(action, port, Record::unit(), Condition::Always)
            .unwrap();
        builder.finalize_action(action, Condition::Always).unwrap();
    }
    let z = builder.register_action("core", "z");
    builder.finalize_action(z, Condition::Always).unwrap();
    builder
}

#[test]
fn test_summary_json() {
    let config = SchedulerConfig::from_json(r#"{ "component_policies": { "core.z": "round_robin" } }"#).unwrap();
    let schedule = core_universe().build(&config).unwrap();

    let value = serde_json::to_value(schedule.summary()).unwrap();
    assert_eq!(
        value,
        json!({
            "order": ["core.x", "core.y", "core.z"],
            "components": [
                { "policy": "eager", "actions": ["core.x", "core.y"] },
                { "policy": "round_robin", "actions": ["core.z"] }
            ],
            "conflicts": [["core.x", "core.y"]],
            "merged": []
        })
    );
}

#[test]
fn test_summary_is_stable_across_builds() {
    let config = SchedulerConfig::default();
    let first = core_universe().build(&config).unwrap().summary();
    let second = core_universe().build(&config).unwrap().summary();
    assert_eq!(first, second);
}

#[test]
fn test_summary_lists_merged_groups() {
    let mut builder = ScheduleBuilder::new();
    let a = builder.register_action("top", "a");
    builder.finalize_action(a, Condition::Always).unwrap();
    let b = builder.register_action("top", "b");
    builder.finalize_action(b, Condition::Always).unwrap();
    builder.declare_simultaneous(&[b.into(), a.into()]).unwrap();

    let schedule = builder.build(&SchedulerConfig::default()).unwrap();
    let value = serde_json::to_value(schedule.summary()).unwrap();
    assert_eq!(value["order"], json!(["top.a+top.b"]));
    assert_eq!(
        value["merged"],
        json!([{ "action": "top.a+top.b", "constituents": ["top.a", "top.b"] }])
    );
}

#[test]
fn test_config_round_trips_through_json() {
    let config = SchedulerConfig::default().with_component("core.fetch", strobe_scheduler::ArbiterPolicy::RoundRobin);
    let text = serde_json::to_string(&config).unwrap();
    assert_eq!(
        text,
        r#"{"default_policy":"eager","component_policies":{"core.fetch":"round_robin"}}"#
    );
    assert_eq!(SchedulerConfig::from_json(&text).unwrap(), config);
}
