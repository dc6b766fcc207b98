use std::fmt;

use serde::Deserialize;

use super::ConfigError;

/// Transition requested for one trigger kind.
///
/// `Omit` means no transition parameter is sent at all, which lights treat
/// differently from an explicit zero-second transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionSetting {
    Seconds(f64),
    Omit,
}

impl TransitionSetting {
    pub fn seconds(self) -> Option<f64> {
        match self {
            TransitionSetting::Seconds(s) => Some(s),
            TransitionSetting::Omit => None,
        }
    }
}

/// Accepts a non-negative number of seconds or the keyword "omit".
impl<'de> Deserialize<'de> for TransitionSetting {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de;

        struct TransitionVisitor;

        fn seconds<E: de::Error>(v: f64) -> Result<TransitionSetting, E> {
            if v.is_finite() && v >= 0.0 {
                Ok(TransitionSetting::Seconds(v))
            } else {
                Err(E::custom(format!("transition must be >= 0, got {}", v)))
            }
        }

        impl<'de> de::Visitor<'de> for TransitionVisitor {
            type Value = TransitionSetting;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative number of seconds or \"omit\"")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                seconds(v as f64)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                seconds(v as f64)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                seconds(v)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                match v {
                    "omit" => Ok(TransitionSetting::Omit),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(TransitionVisitor)
    }
}

fn default_init_transition() -> TransitionSetting {
    TransitionSetting::Omit
}

fn default_occupancy_transition() -> TransitionSetting {
    TransitionSetting::Omit
}

fn default_low_light_transition() -> TransitionSetting {
    TransitionSetting::Seconds(15.0)
}

fn default_scene_transition() -> TransitionSetting {
    TransitionSetting::Seconds(10.0)
}

fn default_natural_lighting_transition() -> TransitionSetting {
    TransitionSetting::Seconds(10.0)
}

fn default_off_transition() -> TransitionSetting {
    TransitionSetting::Omit
}

/// `[transitions]` section, one entry per trigger kind
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionsConfig {
    #[serde(default = "default_init_transition")]
    pub init: TransitionSetting,

    #[serde(default = "default_occupancy_transition")]
    pub occupancy: TransitionSetting,

    #[serde(default = "default_low_light_transition")]
    pub low_light: TransitionSetting,

    #[serde(default = "default_scene_transition")]
    pub scene: TransitionSetting,

    #[serde(default = "default_natural_lighting_transition")]
    pub natural_lighting: TransitionSetting,

    #[serde(default = "default_off_transition")]
    pub off: TransitionSetting,
}

impl Default for TransitionsConfig {
    fn default() -> Self {
        Self {
            init: default_init_transition(),
            occupancy: default_occupancy_transition(),
            low_light: default_low_light_transition(),
            scene: default_scene_transition(),
            natural_lighting: default_natural_lighting_transition(),
            off: default_off_transition(),
        }
    }
}

fn default_sun_entity() -> String {
    "sun.sun".to_string()
}

fn default_min_elevation_for_brightness() -> i64 {
    -20
}

fn default_max_elevation_for_brightness() -> i64 {
    20
}

fn default_min_elevation_for_kelvin() -> i64 {
    0
}

fn default_max_elevation_for_kelvin() -> i64 {
    20
}

/// `[natural_lighting]` section
#[derive(Debug, Clone, Deserialize)]
pub struct NaturalLightingSettings {
    /// Entity carrying the `elevation` attribute
    #[serde(default = "default_sun_entity")]
    pub sun_entity: String,

    #[serde(default = "default_min_elevation_for_brightness")]
    pub min_elevation_for_brightness: i64,

    #[serde(default = "default_max_elevation_for_brightness")]
    pub max_elevation_for_brightness: i64,

    #[serde(default = "default_min_elevation_for_kelvin")]
    pub min_elevation_for_kelvin: i64,

    #[serde(default = "default_max_elevation_for_kelvin")]
    pub max_elevation_for_kelvin: i64,

    #[serde(default)]
    pub modes: Vec<ModeSettings>,
}

impl Default for NaturalLightingSettings {
    fn default() -> Self {
        Self {
            sun_entity: default_sun_entity(),
            min_elevation_for_brightness: default_min_elevation_for_brightness(),
            max_elevation_for_brightness: default_max_elevation_for_brightness(),
            min_elevation_for_kelvin: default_min_elevation_for_kelvin(),
            max_elevation_for_kelvin: default_max_elevation_for_kelvin(),
            modes: Vec::new(),
        }
    }
}

/// One named mode; unset bounds are taken from the `default` mode
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModeSettings {
    pub name: String,
    pub max_brightness: Option<i64>,
    pub min_brightness: Option<i64>,
    pub max_kelvin: Option<i64>,
    pub min_kelvin: Option<i64>,
}

impl NaturalLightingSettings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.min_elevation_for_brightness >= self.max_elevation_for_brightness {
            return Err(ConfigError::invalid(
                "natural_lighting.max_elevation_for_brightness",
                "must be greater than min_elevation_for_brightness",
            ));
        }
        if self.min_elevation_for_kelvin >= self.max_elevation_for_kelvin {
            return Err(ConfigError::invalid(
                "natural_lighting.max_elevation_for_kelvin",
                "must be greater than min_elevation_for_kelvin",
            ));
        }

        for (idx, mode) in self.modes.iter().enumerate() {
            if mode.name.is_empty() {
                return Err(ConfigError::invalid(
                    format!("natural_lighting.modes[{}].name", idx),
                    "mode name must not be empty",
                ));
            }
            for (field, value) in [
                ("max_brightness", mode.max_brightness),
                ("min_brightness", mode.min_brightness),
            ] {
                if let Some(v) = value {
                    if !(0..=255).contains(&v) {
                        return Err(ConfigError::invalid(
                            format!("natural_lighting.modes.{}.{}", mode.name, field),
                            format!("brightness must be within 0..=255, got {}", v),
                        ));
                    }
                }
            }
            for (field, value) in [
                ("max_kelvin", mode.max_kelvin),
                ("min_kelvin", mode.min_kelvin),
            ] {
                if let Some(v) = value {
                    if v <= 0 {
                        return Err(ConfigError::invalid(
                            format!("natural_lighting.modes.{}.{}", mode.name, field),
                            format!("kelvin must be positive, got {}", v),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}
