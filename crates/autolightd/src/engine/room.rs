//! Per-room configuration and mutable state.

use std::time::Duration;

use tracing::warn;

use super::coerce::is_occupied;
use super::coerce::state_to_int;
use super::host::Host;
use super::host::Subscription;
use super::host::domain_of;
use super::natural::DEFAULT_MODE;
use super::natural::NaturalLighting;
use super::trigger::Trigger;
use super::trigger::TriggerKind;
use crate::config::RoomSettings;
use crate::config::SceneSettings;

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("no lights_entity configured")]
    NoLights,

    #[error("lights_entity '{0}' does not exist")]
    MissingLights(String),
}

/// A configured entity id, ignoring blank values
fn configured(entity: Option<&String>) -> Option<&String> {
    entity.filter(|e| !e.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    Scene,
    /// Scripts are turned on without a transition
    Script,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub entity_id: String,
    pub kind: SceneKind,
    pub trigger_entity: String,
    pub trigger_value: String,
    pub force_light_on: bool,
}

impl Scene {
    fn build<H: Host + ?Sized>(room: &str, settings: &SceneSettings, host: &H) -> Option<Self> {
        let (Some(entity_id), Some(trigger_entity), Some(trigger_value)) = (
            configured(settings.scene_entity.as_ref()),
            configured(settings.scene_trigger_entity.as_ref()),
            settings.scene_trigger_value.as_ref(),
        ) else {
            warn!(
                "{}: scene needs scene_entity, scene_trigger_entity and scene_trigger_value, ignoring {:?}",
                room, settings
            );
            return None;
        };

        let kind = match domain_of(entity_id) {
            "scene" => SceneKind::Scene,
            "script" => SceneKind::Script,
            other => {
                warn!(
                    "{}: scene '{}' has unsupported domain '{}', ignoring",
                    room, entity_id, other
                );
                return None;
            }
        };
        if !host.exists(entity_id) {
            warn!("{}: scene '{}' does not exist, ignoring", room, entity_id);
            return None;
        }
        if !host.exists(trigger_entity) {
            warn!(
                "{}: scene trigger '{}' does not exist, ignoring scene '{}'",
                room, trigger_entity, entity_id
            );
            return None;
        }

        Some(Self {
            entity_id: entity_id.clone(),
            kind,
            trigger_entity: trigger_entity.clone(),
            trigger_value: trigger_value.clone(),
            force_light_on: settings.scene_force_light_on,
        })
    }

    /// Whether the trigger entity currently holds the match value
    pub fn is_active<H: Host + ?Sized>(&self, host: &H) -> bool {
        host.state(&self.trigger_entity).as_deref() == Some(self.trigger_value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NaturalLightingBinding {
    /// Resolved mode name
    pub mode: String,
    pub lights_entity: String,
    pub boost_brightness_pct: i64,
}

#[derive(Debug, Clone)]
pub struct RoomConfig {
    pub name: String,
    pub lights_entity: String,
    pub occupancy_entity: Option<String>,
    pub occupancy_off_delay: Duration,
    pub luminance_entity: Option<String>,
    pub luminance_limit: i64,
    pub luminance_hysteresis: i64,
    pub high_luminance_off_light: bool,
    pub scenes: Vec<Scene>,
    pub natural_lighting: Vec<NaturalLightingBinding>,
}

/// Keep an optional sensor only if it is set and known to the host
fn optional_entity<H: Host + ?Sized>(
    room: &str,
    key: &str,
    entity: Option<&String>,
    host: &H,
) -> Option<String> {
    let entity = configured(entity)?;
    if host.exists(entity) {
        Some(entity.clone())
    } else {
        warn!(
            "{}: {} '{}' does not exist, feature disabled",
            room, key, entity
        );
        None
    }
}

impl RoomConfig {
    /// Resolve settings against the entities the host knows about
    pub fn build<H: Host + ?Sized>(
        name: &str,
        settings: &RoomSettings,
        natural: Option<&NaturalLighting>,
        host: &H,
    ) -> Result<Self, RoomError> {
        let room_lights =
            configured(settings.lights_entity.as_ref()).ok_or(RoomError::NoLights)?;
        if !host.exists(room_lights) {
            return Err(RoomError::MissingLights(room_lights.clone()));
        }

        let occupancy_entity = optional_entity(
            name,
            "occupancy_entity",
            settings.occupancy_entity.as_ref(),
            host,
        );
        let luminance_entity = optional_entity(
            name,
            "luminance_entity",
            settings.luminance_entity.as_ref(),
            host,
        );

        let scenes = settings
            .scenes
            .iter()
            .filter_map(|s| Scene::build(name, s, host))
            .collect();

        let natural_lighting = settings
            .natural_lighting
            .bindings()
            .into_iter()
            .map(|binding| {
                let mode = match natural {
                    Some(n) if n.has_mode(&binding.name) => binding.name,
                    _ => DEFAULT_MODE.to_string(),
                };
                let lights_entity = match configured(binding.lights_entity.as_ref()) {
                    Some(entity) if host.exists(entity) => entity.clone(),
                    Some(entity) => {
                        warn!(
                            "{}: natural lighting target '{}' does not exist, using '{}'",
                            name, entity, room_lights
                        );
                        room_lights.clone()
                    }
                    None => room_lights.clone(),
                };
                NaturalLightingBinding {
                    mode,
                    lights_entity,
                    boost_brightness_pct: binding.boost_brightness_pct,
                }
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            lights_entity: room_lights.clone(),
            occupancy_entity,
            occupancy_off_delay: Duration::from_secs(settings.occupancy_off_delay),
            luminance_entity,
            luminance_limit: settings.luminance_limit,
            luminance_hysteresis: settings.luminance_hysteresis,
            high_luminance_off_light: settings.high_luminance_off_light,
            scenes,
            natural_lighting,
        })
    }

    /// Host subscriptions that re-evaluate this room
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let trigger = |kind| Trigger::room(self.name.clone(), kind);
        let mut subs = Vec::new();

        for scene in &self.scenes {
            subs.push(
                Subscription::state(&scene.trigger_entity, trigger(TriggerKind::Scene))
                    .with_new(&scene.trigger_value),
            );
            subs.push(
                Subscription::state(&scene.trigger_entity, trigger(TriggerKind::Scene))
                    .with_old(&scene.trigger_value),
            );
        }

        if let Some(ref occupancy) = self.occupancy_entity {
            if self.occupancy_off_delay.is_zero() {
                subs.push(Subscription::state(occupancy, trigger(TriggerKind::Occupancy)));
            } else {
                subs.push(
                    Subscription::state(occupancy, trigger(TriggerKind::Occupancy)).with_new("on"),
                );
                subs.push(
                    Subscription::state(occupancy, trigger(TriggerKind::Occupancy))
                        .with_new("off")
                        .with_duration(self.occupancy_off_delay),
                );
            }
        }

        if let Some(ref luminance) = self.luminance_entity {
            subs.push(Subscription::state(luminance, trigger(TriggerKind::LowLight)));
        }

        subs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomState {
    pub occupancy: bool,
    pub low_light: bool,
    pub is_light_on: bool,
}

impl Default for RoomState {
    fn default() -> Self {
        Self {
            occupancy: true,
            low_light: true,
            is_light_on: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    pub config: RoomConfig,
    pub state: RoomState,
}

impl Room {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            config,
            state: RoomState::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Rooms without an occupancy sensor stay occupied
    pub fn refresh_occupancy<H: Host + ?Sized>(&mut self, host: &H) {
        if let Some(ref entity) = self.config.occupancy_entity {
            self.state.occupancy = is_occupied(host.state(entity).as_deref());
        }
    }

    pub fn refresh_low_light<H: Host + ?Sized>(&mut self, host: &H) {
        if let Some(ref entity) = self.config.luminance_entity {
            let reading = state_to_int(entity, host.state(entity).as_deref());
            self.state.low_light = reading <= self.effective_threshold();
        }
    }

    /// Luminance limit widened by the hysteresis in the current direction
    pub fn effective_threshold(&self) -> i64 {
        if self.state.low_light {
            self.config.luminance_limit + self.config.luminance_hysteresis
        } else {
            self.config.luminance_limit - self.config.luminance_hysteresis
        }
    }

    /// First scene (in configured order) whose trigger matches
    pub fn active_scene<H: Host + ?Sized>(&self, host: &H) -> Option<&Scene> {
        self.config.scenes.iter().find(|s| s.is_active(host))
    }

    pub fn force_on<H: Host + ?Sized>(&self, host: &H) -> bool {
        self.config
            .scenes
            .iter()
            .any(|s| s.force_light_on && s.is_active(host))
    }

    /// Lights that are on in a bright room are left alone unless
    /// configured otherwise or occupancy itself changed.
    pub fn should_recompute(&self, kind: TriggerKind) -> bool {
        !(self.state.is_light_on && !self.state.low_light)
            || self.config.high_luminance_off_light
            || kind == TriggerKind::Occupancy
    }
}
