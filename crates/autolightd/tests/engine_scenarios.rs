//! End-to-end rule scenarios against an in-memory host.

use std::collections::HashMap;

use autolightd::Config;
use autolightd::engine::ActionRequest;
use autolightd::engine::Engine;
use autolightd::engine::EngineError;
use autolightd::engine::Host;
use autolightd::engine::HostError;
use autolightd::engine::LightAction;
use autolightd::engine::Subscription;
use autolightd::engine::Trigger;
use autolightd::engine::TriggerKind;
use serde_json::Value;
use serde_json::json;

#[derive(Default)]
struct RecordingHost {
    states: HashMap<String, String>,
    attributes: HashMap<(String, String), Value>,
    subscriptions: Vec<Subscription>,
    actions: Vec<ActionRequest>,
}

impl RecordingHost {
    fn with_states(states: &[(&str, &str)]) -> Self {
        let mut host = Self::default();
        for (entity_id, state) in states {
            host.set(entity_id, state);
        }
        host
    }

    fn set(&mut self, entity_id: &str, state: &str) {
        self.states.insert(entity_id.to_string(), state.to_string());
    }

    fn set_attribute(&mut self, entity_id: &str, attribute: &str, value: Value) {
        self.attributes
            .insert((entity_id.to_string(), attribute.to_string()), value);
    }

    /// Actions issued since the last call, one per line
    fn take_log(&mut self) -> String {
        self.actions
            .drain(..)
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Host for RecordingHost {
    fn state(&self, entity_id: &str) -> Option<String> {
        self.states.get(entity_id).cloned()
    }

    fn attribute(&self, entity_id: &str, attribute: &str) -> Option<Value> {
        self.attributes
            .get(&(entity_id.to_string(), attribute.to_string()))
            .cloned()
    }

    fn exists(&self, entity_id: &str) -> bool {
        self.states.contains_key(entity_id)
            || self.attributes.keys().any(|(e, _)| e == entity_id)
    }

    fn subscribe(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    fn invoke(&mut self, action: ActionRequest) -> Result<(), HostError> {
        self.actions.push(action);
        Ok(())
    }
}

fn engine(config: &str, host: RecordingHost) -> Engine<RecordingHost> {
    let config = Config::parse(config).unwrap();
    Engine::from_config(&config, host)
}

#[test]
fn test_occupancy_turns_dark_room_on() {
    let mut engine = engine(
        r#"
        [rooms.living_room]
        lights_entity = "light.living_room"
        occupancy_entity = "binary_sensor.living_room"
        luminance_entity = "sensor.living_room_lux"
        "#,
        RecordingHost::with_states(&[
            ("light.living_room", "off"),
            ("binary_sensor.living_room", "off"),
            ("sensor.living_room_lux", "5"),
        ]),
    );

    engine.start();
    insta::assert_snapshot!(engine.host_mut().take_log(), @"light.living_room turn_off");

    engine.host_mut().set("binary_sensor.living_room", "on");
    let decision = engine
        .decide("living_room", TriggerKind::Occupancy)
        .unwrap();
    assert!(decision.is_light_on);
    assert!(decision.changed);
    assert_eq!(decision.action, Some(LightAction::On));
    insta::assert_snapshot!(engine.host_mut().take_log(), @"light.living_room turn_on");

    engine.host_mut().set("binary_sensor.living_room", "off");
    engine
        .handle(&Trigger::room("living_room", TriggerKind::Occupancy))
        .unwrap();
    insta::assert_snapshot!(engine.host_mut().take_log(), @"light.living_room turn_off");
}

#[test]
fn test_repeated_triggers_are_idempotent() {
    let mut engine = engine(
        r#"
        [rooms.office]
        lights_entity = "light.office"
        occupancy_entity = "binary_sensor.office"
        luminance_entity = "sensor.office_lux"
        "#,
        RecordingHost::with_states(&[
            ("light.office", "off"),
            ("binary_sensor.office", "on"),
            ("sensor.office_lux", "3"),
        ]),
    );
    engine.start();
    engine.host_mut().take_log();
    let before = engine.room("office").unwrap().state;

    for kind in [TriggerKind::Occupancy, TriggerKind::LowLight, TriggerKind::Off] {
        let decision = engine.decide("office", kind).unwrap();
        assert!(!decision.changed);
        assert_eq!(decision.action, None);
    }

    assert_eq!(engine.room("office").unwrap().state, before);
    assert_eq!(engine.host_mut().take_log(), "");
}

#[test]
fn test_force_on_scene_overrides_vacancy_and_daylight() {
    let mut engine = engine(
        r#"
        [rooms.lounge]
        lights_entity = "light.lounge"
        occupancy_entity = "binary_sensor.lounge"
        luminance_entity = "sensor.lounge_lux"

        [[rooms.lounge.scenes]]
        scene_entity = "scene.movie"
        scene_trigger_entity = "input_boolean.movie"
        scene_trigger_value = true
        scene_force_light_on = true
        "#,
        RecordingHost::with_states(&[
            ("light.lounge", "off"),
            ("binary_sensor.lounge", "off"),
            ("sensor.lounge_lux", "100"),
            ("scene.movie", "scening"),
            ("input_boolean.movie", "off"),
        ]),
    );
    engine.start();
    insta::assert_snapshot!(engine.host_mut().take_log(), @"light.lounge turn_off");

    // Switching on from off uses the occupancy transition
    engine.host_mut().set("input_boolean.movie", "on");
    let decision = engine.decide("lounge", TriggerKind::Scene).unwrap();
    assert_eq!(
        decision.action,
        Some(LightAction::Scene("scene.movie".to_string()))
    );
    let state = engine.room("lounge").unwrap().state;
    assert!(!state.occupancy);
    assert!(!state.low_light);
    assert!(state.is_light_on);
    insta::assert_snapshot!(engine.host_mut().take_log(), @"scene.movie turn_on");

    // Lights already on in a bright room are left on when the scene ends
    engine.host_mut().set("input_boolean.movie", "off");
    engine.decide("lounge", TriggerKind::Scene).unwrap();
    insta::assert_snapshot!(engine.host_mut().take_log(), @"light.lounge turn_on transition=10");
}

#[test]
fn test_hysteresis_with_high_luminance_off() {
    let mut engine = engine(
        r#"
        [rooms.hall]
        lights_entity = "light.hall"
        luminance_entity = "sensor.hall_lux"
        luminance_limit = 10
        luminance_hysteresis = 2
        high_luminance_off_light = true
        "#,
        RecordingHost::with_states(&[("light.hall", "off"), ("sensor.hall_lux", "12")]),
    );
    engine.start();

    for lux in ["13", "9", "8", "12", "13"] {
        engine.host_mut().set("sensor.hall_lux", lux);
        engine.decide("hall", TriggerKind::LowLight).unwrap();
    }

    insta::assert_snapshot!(engine.host_mut().take_log(), @"
    light.hall turn_on
    light.hall turn_off
    light.hall turn_on transition=15
    light.hall turn_off
    ");
}

#[test]
fn test_lights_stay_on_while_bright() {
    let mut engine = engine(
        r#"
        [rooms.hall]
        lights_entity = "light.hall"
        luminance_entity = "sensor.hall_lux"
        "#,
        RecordingHost::with_states(&[("light.hall", "off"), ("sensor.hall_lux", "2")]),
    );
    engine.start();
    engine.host_mut().take_log();

    engine.host_mut().set("sensor.hall_lux", "400");
    let decision = engine.decide("hall", TriggerKind::LowLight).unwrap();
    assert!(decision.is_light_on);
    assert!(!engine.room("hall").unwrap().state.low_light);
    assert_eq!(engine.host_mut().take_log(), "");
}

#[test]
fn test_natural_lighting_bindings_follow_the_sun() {
    let mut host = RecordingHost::with_states(&[
        ("light.kitchen", "off"),
        ("light.kitchen_strip", "off"),
        ("sun.sun", "above_horizon"),
    ]);
    host.set_attribute("sun.sun", "elevation", json!(0.4));

    let mut engine = engine(
        r#"
        [natural_lighting]

        [[natural_lighting.modes]]
        name = "evening"
        max_brightness = 200

        [rooms.kitchen]
        lights_entity = "light.kitchen"

        [[rooms.kitchen.natural_lighting]]
        name = "evening"
        boost_brightness_pct = 50

        [[rooms.kitchen.natural_lighting]]
        lights_entity = "light.kitchen_strip"
        boost_brightness_pct = -50
        "#,
        host,
    );
    assert_eq!(
        engine.host().subscriptions[0],
        Subscription::attribute("sun.sun", "elevation", Trigger::SunElevation)
    );

    engine.start();
    insta::assert_snapshot!(engine.host_mut().take_log(), @"
    light.kitchen turn_on brightness=225 kelvin=2000
    light.kitchen_strip turn_on brightness=88 kelvin=2000
    ");

    engine
        .host_mut()
        .set_attribute("sun.sun", "elevation", json!(10.9));
    engine.handle(&Trigger::SunElevation).unwrap();
    assert_eq!(engine.natural_lighting().unwrap().sun_elevation(), 10);
    insta::assert_snapshot!(engine.host_mut().take_log(), @"
    light.kitchen turn_on brightness=255 kelvin=3750 transition=10
    light.kitchen_strip turn_on brightness=108 kelvin=3750 transition=10
    ");
}

#[test]
fn test_sun_change_skips_rooms_that_are_off() {
    let mut host = RecordingHost::with_states(&[
        ("light.bedroom", "off"),
        ("binary_sensor.bedroom", "off"),
    ]);
    host.set_attribute("sun.sun", "elevation", json!(-5));

    let mut engine = engine(
        r#"
        [natural_lighting]

        [rooms.bedroom]
        lights_entity = "light.bedroom"
        occupancy_entity = "binary_sensor.bedroom"
        natural_lighting = true
        "#,
        host,
    );
    engine.start();
    insta::assert_snapshot!(engine.host_mut().take_log(), @"light.bedroom turn_off");

    engine
        .host_mut()
        .set_attribute("sun.sun", "elevation", json!(15));
    engine.update_sun_elevation();
    assert_eq!(engine.host_mut().take_log(), "");
}

#[test]
fn test_scene_takes_priority_over_natural_lighting() {
    let mut engine = engine(
        r#"
        [natural_lighting]

        [rooms.study]
        lights_entity = "light.study"
        natural_lighting = true

        [[rooms.study.scenes]]
        scene_entity = "script.reading"
        scene_trigger_entity = "input_select.study_mode"
        scene_trigger_value = "reading"

        [[rooms.study.scenes]]
        scene_entity = "scene.focus"
        scene_trigger_entity = "input_select.study_mode"
        scene_trigger_value = "focus"
        "#,
        RecordingHost::with_states(&[
            ("light.study", "off"),
            ("script.reading", "off"),
            ("scene.focus", "scening"),
            ("input_select.study_mode", "reading"),
        ]),
    );
    engine.start();
    // Scripts never receive a transition
    engine.decide("study", TriggerKind::Scene).unwrap();

    engine.host_mut().set("input_select.study_mode", "focus");
    engine.decide("study", TriggerKind::Scene).unwrap();

    engine.host_mut().set("input_select.study_mode", "idle");
    engine.decide("study", TriggerKind::Scene).unwrap();

    insta::assert_snapshot!(engine.host_mut().take_log(), @"
    script.reading turn_on
    script.reading turn_on
    scene.focus turn_on transition=10
    light.study turn_on brightness=177 kelvin=2000 transition=10
    ");
}

#[test]
fn test_invalid_rooms_are_dropped() {
    let mut engine = engine(
        r#"
        [rooms.attic]
        lights_entity = "light.attic"

        [rooms.garage]
        lights_entity = "light.garage"
        occupancy_entity = "binary_sensor.garage_gone"
        "#,
        RecordingHost::with_states(&[("light.garage", "off")]),
    );

    assert!(engine.room("attic").is_none());
    let garage = engine.room("garage").unwrap();
    assert_eq!(garage.config.occupancy_entity, None);
    assert_eq!(engine.rooms().count(), 1);

    assert!(matches!(
        engine.decide("attic", TriggerKind::Init),
        Err(EngineError::UnknownRoom(name)) if name == "attic"
    ));
}

#[test]
fn test_room_without_lights_does_not_stop_others() {
    let mut engine = engine(
        r#"
        [rooms.attic]
        occupancy_entity = "binary_sensor.attic"

        [rooms.porch]
        lights_entity = ""

        [rooms.kitchen]
        lights_entity = "light.kitchen"

        [[rooms.kitchen.scenes]]
        scene_entity = "scene.cooking"
        "#,
        RecordingHost::with_states(&[
            ("light.kitchen", "off"),
            ("binary_sensor.attic", "on"),
            ("scene.cooking", "scening"),
        ]),
    );

    let names: Vec<&str> = engine.rooms().map(|room| room.name()).collect();
    assert_eq!(names, vec!["kitchen"]);
    assert!(engine.room("kitchen").unwrap().config.scenes.is_empty());

    engine.start();
    insta::assert_snapshot!(engine.host_mut().take_log(), @"light.kitchen turn_on");
}

#[test]
fn test_bindings_without_natural_lighting_section_turn_on_plainly() {
    let mut engine = engine(
        r#"
        [rooms.den]
        lights_entity = "light.den"
        luminance_entity = "sensor.den_lux"
        natural_lighting = true
        "#,
        RecordingHost::with_states(&[("light.den", "off"), ("sensor.den_lux", "50")]),
    );
    assert!(engine.natural_lighting().is_none());

    engine.start();
    engine.host_mut().set("sensor.den_lux", "3");
    let decision = engine.decide("den", TriggerKind::LowLight).unwrap();
    assert_eq!(decision.action, Some(LightAction::On));

    insta::assert_snapshot!(engine.host_mut().take_log(), @"
    light.den turn_off
    light.den turn_on transition=15
    ");
}
