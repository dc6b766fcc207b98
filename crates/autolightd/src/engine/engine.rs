use std::collections::BTreeMap;

use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::coerce::value_to_int;
use super::dispatch::LightAction;
use super::dispatch::dispatch;
use super::host::Host;
use super::host::Subscription;
use super::natural::NaturalLighting;
use super::room::Room;
use super::room::RoomConfig;
use super::trigger::TransitionTable;
use super::trigger::Trigger;
use super::trigger::TriggerKind;
use crate::config::Config;

const ELEVATION_ATTRIBUTE: &str = "elevation";

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown room '{0}'")]
    UnknownRoom(String),
}

/// Outcome of evaluating one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub is_light_on: bool,
    pub changed: bool,
    /// Set when an action was dispatched
    pub action: Option<LightAction>,
}

/// autolightd rule engine
///
/// Owns every room's state and the natural lighting calculator. Triggers are
/// handled one at a time to completion; the host is the only way in or out.
pub struct Engine<H: Host> {
    host: H,
    rooms: BTreeMap<String, Room>,
    natural_lighting: Option<NaturalLighting>,
    transitions: TransitionTable,
}

impl<H: Host> Engine<H> {
    /// Build rooms from configuration and register their subscriptions
    pub fn from_config(config: &Config, mut host: H) -> Self {
        let natural_lighting = config.natural_lighting.as_ref().map(|settings| {
            let sun = &settings.sun_entity;
            if !host.exists(sun) {
                warn!("Sun entity '{}' does not exist yet", sun);
            }
            let elevation = value_to_int(sun, host.attribute(sun, ELEVATION_ATTRIBUTE).as_ref());
            host.subscribe(Subscription::attribute(
                sun,
                ELEVATION_ATTRIBUTE,
                Trigger::SunElevation,
            ));
            info!("Natural lighting enabled (sun elevation {})", elevation);
            NaturalLighting::new(settings, elevation)
        });

        let mut rooms = BTreeMap::new();
        for (name, settings) in &config.rooms {
            match RoomConfig::build(name, settings, natural_lighting.as_ref(), &host) {
                Ok(room_config) => {
                    for sub in room_config.subscriptions() {
                        host.subscribe(sub);
                    }
                    rooms.insert(name.clone(), Room::new(room_config));
                }
                Err(e) => error!("{}: room ignored: {}", name, e),
            }
        }
        info!("Loaded {} of {} rooms", rooms.len(), config.rooms.len());

        Self {
            host,
            rooms,
            natural_lighting,
            transitions: TransitionTable::from(&config.transitions),
        }
    }

    /// Evaluate every room once with the `init` trigger
    pub fn start(&mut self) {
        let names: Vec<String> = self.rooms.keys().cloned().collect();
        for name in names {
            if let Err(e) = self.decide(&name, TriggerKind::Init) {
                error!("Initial evaluation failed: {}", e);
            }
        }
        info!("Initialized");
    }

    pub fn handle(&mut self, trigger: &Trigger) -> Result<(), EngineError> {
        match trigger {
            Trigger::Room { room, kind } => self.decide(room, *kind).map(|_| ()),
            Trigger::SunElevation => {
                self.update_sun_elevation();
                Ok(())
            }
        }
    }

    /// Recompute a room's state and dispatch an action if needed
    pub fn decide(&mut self, room_name: &str, kind: TriggerKind) -> Result<Decision, EngineError> {
        let room = self
            .rooms
            .get_mut(room_name)
            .ok_or_else(|| EngineError::UnknownRoom(room_name.to_string()))?;

        let was_on = room.state.is_light_on;
        room.refresh_occupancy(&self.host);
        room.refresh_low_light(&self.host);

        let force_on = room.force_on(&self.host);
        if force_on {
            room.state.is_light_on = true;
        } else if room.should_recompute(kind) {
            room.state.is_light_on = room.state.occupancy && room.state.low_light;
        }

        let changed = was_on != room.state.is_light_on;
        debug!(
            "{}: {} occupancy={} low_light={} force_on={} is_light_on={}",
            room_name,
            kind,
            room.state.occupancy,
            room.state.low_light,
            force_on,
            room.state.is_light_on
        );

        let action = if kind.always_dispatches() || changed {
            // A forced scene switching the room on uses the occupancy transition
            let dispatch_kind = if force_on && kind == TriggerKind::Scene && !was_on {
                TriggerKind::Occupancy
            } else {
                kind
            };
            Some(dispatch(
                &mut self.host,
                room,
                self.natural_lighting.as_ref(),
                &self.transitions,
                dispatch_kind,
            ))
        } else {
            None
        };

        Ok(Decision {
            is_light_on: room.state.is_light_on,
            changed,
            action,
        })
    }

    /// Re-read the sun elevation and re-drive lit rooms using natural lighting
    pub fn update_sun_elevation(&mut self) {
        let Some(natural) = self.natural_lighting.as_mut() else {
            return;
        };
        let raw = self.host.attribute(&natural.sun_entity, ELEVATION_ATTRIBUTE);
        let elevation = value_to_int(&natural.sun_entity, raw.as_ref());
        natural.set_elevation(elevation);

        for room in self.rooms.values() {
            if room.state.is_light_on && !room.config.natural_lighting.is_empty() {
                dispatch(
                    &mut self.host,
                    room,
                    Some(&*natural),
                    &self.transitions,
                    TriggerKind::NaturalLighting,
                );
            }
        }
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn natural_lighting(&self) -> Option<&NaturalLighting> {
        self.natural_lighting.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}
