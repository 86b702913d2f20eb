//! Replays the golden register scenarios.

use mmapp_testkit::golden::{load_golden_scenarios, Scenario};
use mmapp_testkit::init_tracing;

#[test]
fn golden_scenarios_hold() {
    init_tracing();
    let scenarios = load_golden_scenarios();
    assert!(!scenarios.is_empty(), "no golden scenarios found");

    for scenario in &scenarios {
        scenario.assert_expected();
    }
}

#[test]
fn scenarios_survive_json_round_trip() {
    for scenario in load_golden_scenarios() {
        let text = serde_json::to_string_pretty(&scenario).unwrap();
        assert_eq!(Scenario::from_json(&text), scenario);
    }
}
