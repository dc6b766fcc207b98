use strum::Display;
use strum::EnumIter;
use strum::EnumString;
use strum::IntoStaticStr;

use crate::config::TransitionsConfig;

/// Why a room is being re-evaluated
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum TriggerKind {
    Init,
    Occupancy,
    LowLight,
    Scene,
    NaturalLighting,
    Off,
}

impl TriggerKind {
    /// Kinds that dispatch an action even when the on/off decision is unchanged
    pub fn always_dispatches(self) -> bool {
        match self {
            TriggerKind::Init | TriggerKind::Scene | TriggerKind::NaturalLighting => true,
            TriggerKind::Occupancy | TriggerKind::LowLight | TriggerKind::Off => false,
        }
    }
}

/// Delivered to the engine when a subscription fires
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    Room { room: String, kind: TriggerKind },
    SunElevation,
}

impl Trigger {
    pub fn room(room: impl Into<String>, kind: TriggerKind) -> Self {
        Trigger::Room {
            room: room.into(),
            kind,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Room { room, kind } => write!(f, "{}/{}", room, kind),
            Trigger::SunElevation => f.write_str("sun_elevation"),
        }
    }
}

/// Transition seconds per trigger kind; `None` means the parameter is omitted
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    init: Option<f64>,
    occupancy: Option<f64>,
    low_light: Option<f64>,
    scene: Option<f64>,
    natural_lighting: Option<f64>,
    off: Option<f64>,
}

impl TransitionTable {
    pub fn get(&self, kind: TriggerKind) -> Option<f64> {
        match kind {
            TriggerKind::Init => self.init,
            TriggerKind::Occupancy => self.occupancy,
            TriggerKind::LowLight => self.low_light,
            TriggerKind::Scene => self.scene,
            TriggerKind::NaturalLighting => self.natural_lighting,
            TriggerKind::Off => self.off,
        }
    }
}

impl From<&TransitionsConfig> for TransitionTable {
    fn from(config: &TransitionsConfig) -> Self {
        Self {
            init: config.init.seconds(),
            occupancy: config.occupancy.seconds(),
            low_light: config.low_light.seconds(),
            scene: config.scene.seconds(),
            natural_lighting: config.natural_lighting.seconds(),
            off: config.off.seconds(),
        }
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::from(&TransitionsConfig::default())
    }
}
