use tracing::debug;
use tracing::warn;

use super::host::ActionParams;
use super::host::ActionRequest;
use super::host::Host;
use super::natural::NaturalLighting;
use super::room::Room;
use super::room::SceneKind;
use super::trigger::TransitionTable;
use super::trigger::TriggerKind;

/// What the dispatcher did for a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightAction {
    /// Turned on the named scene or script
    Scene(String),
    NaturalLighting,
    On,
    Off,
}

/// Apply a signed percentage boost, clamped to the valid brightness range
pub fn apply_boost(brightness: i64, boost_pct: i64) -> u8 {
    let b = brightness as f64;
    let boosted = (b + b / 100.0 * boost_pct as f64).trunc() as i64;
    boosted.clamp(1, 255) as u8
}

fn invoke<H: Host + ?Sized>(host: &mut H, room: &str, action: ActionRequest) {
    debug!("{}: {}", room, action);
    if let Err(e) = host.invoke(action.clone()) {
        warn!("{}: failed to invoke {}: {}", room, action, e);
    }
}

/// Issue the device action for the room's current on/off decision.
///
/// When on, the first matching scene wins, then natural lighting, then a
/// plain turn-on of the room's lights.
pub(crate) fn dispatch<H: Host + ?Sized>(
    host: &mut H,
    room: &Room,
    natural: Option<&NaturalLighting>,
    transitions: &TransitionTable,
    kind: TriggerKind,
) -> LightAction {
    let name = room.name();

    if !room.state.is_light_on {
        let transition = transitions.get(TriggerKind::Off);
        invoke(
            host,
            name,
            ActionRequest::turn_off(&room.config.lights_entity, transition),
        );
        return LightAction::Off;
    }

    let transition = transitions.get(kind);
    debug!("{}: {} ({:?})", name, kind, transition);

    if let Some(scene) = room.active_scene(&*host) {
        let entity_id = scene.entity_id.clone();
        let transition = match scene.kind {
            SceneKind::Scene => transition,
            SceneKind::Script => None,
        };
        invoke(
            host,
            name,
            ActionRequest::turn_on(
                &entity_id,
                ActionParams {
                    transition,
                    ..Default::default()
                },
            ),
        );
        return LightAction::Scene(entity_id);
    }

    if let Some(natural) = natural.filter(|_| !room.config.natural_lighting.is_empty()) {
        for binding in &room.config.natural_lighting {
            let mode = natural.mode(&binding.mode);
            let params = ActionParams {
                brightness: Some(apply_boost(mode.brightness, binding.boost_brightness_pct)),
                kelvin: u32::try_from(mode.kelvin).ok(),
                transition,
            };
            invoke(
                host,
                name,
                ActionRequest::turn_on(&binding.lights_entity, params),
            );
        }
        return LightAction::NaturalLighting;
    }

    invoke(
        host,
        name,
        ActionRequest::turn_on(
            &room.config.lights_entity,
            ActionParams {
                transition,
                ..Default::default()
            },
        ),
    );
    LightAction::On
}
