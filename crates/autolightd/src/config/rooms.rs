use std::fmt;

use serde::Deserialize;

use super::ConfigError;

/// Deserialize a field that can be a string, boolean, or number.
///
/// Home Assistant states are always strings, but trigger values are
/// naturally written as `true` or `1` in TOML. Booleans map to the
/// `"on"`/`"off"` states that boolean helpers report.
fn deserialize_state_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StateValue;

    impl<'de> de::Visitor<'de> for StateValue {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("string, boolean, or number")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_string<E>(self, v: String) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
            Ok(if v { "on" } else { "off" }.to_string())
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StateValue).map(Some)
}

fn default_luminance_limit() -> i64 {
    10
}

fn default_mode_name() -> String {
    "default".to_string()
}

/// `[rooms.<name>]` section
#[derive(Debug, Clone, Deserialize)]
pub struct RoomSettings {
    /// Light (or light group) driven by this room; rooms without one are skipped
    #[serde(default)]
    pub lights_entity: Option<String>,

    #[serde(default)]
    pub occupancy_entity: Option<String>,

    /// Seconds the occupancy sensor must report "off" before lights go out
    #[serde(default)]
    pub occupancy_off_delay: u64,

    #[serde(default)]
    pub luminance_entity: Option<String>,

    #[serde(default = "default_luminance_limit")]
    pub luminance_limit: i64,

    #[serde(default)]
    pub luminance_hysteresis: i64,

    #[serde(default, alias = "hight_luminance_off_light")]
    pub high_luminance_off_light: bool,

    #[serde(default)]
    pub scenes: Vec<SceneSettings>,

    #[serde(default)]
    pub natural_lighting: NaturalLightingBindings,
}

/// Incomplete entries parse fine and are dropped when the room is built
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SceneSettings {
    /// `scene.*` or `script.*` entity turned on while the scene is active
    #[serde(default)]
    pub scene_entity: Option<String>,

    #[serde(default)]
    pub scene_trigger_entity: Option<String>,

    #[serde(default, deserialize_with = "deserialize_state_value")]
    pub scene_trigger_value: Option<String>,

    #[serde(default)]
    pub scene_force_light_on: bool,
}

/// Either `natural_lighting = true` or an explicit list of bindings
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NaturalLightingBindings {
    Enabled(bool),
    Bindings(Vec<BindingSettings>),
}

impl Default for NaturalLightingBindings {
    fn default() -> Self {
        NaturalLightingBindings::Enabled(false)
    }
}

impl NaturalLightingBindings {
    pub fn bindings(&self) -> Vec<BindingSettings> {
        match self {
            NaturalLightingBindings::Enabled(true) => vec![BindingSettings::default()],
            NaturalLightingBindings::Enabled(false) => Vec::new(),
            NaturalLightingBindings::Bindings(bindings) => bindings.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BindingSettings {
    /// Mode name; unknown names fall back to "default"
    #[serde(default = "default_mode_name")]
    pub name: String,

    /// Light driven by this binding instead of the room's lights
    #[serde(default)]
    pub lights_entity: Option<String>,

    #[serde(default)]
    pub boost_brightness_pct: i64,
}

impl Default for BindingSettings {
    fn default() -> Self {
        Self {
            name: default_mode_name(),
            lights_entity: None,
            boost_brightness_pct: 0,
        }
    }
}

impl RoomSettings {
    pub(crate) fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.luminance_hysteresis < 0 {
            return Err(ConfigError::invalid(
                format!("rooms.{}.luminance_hysteresis", name),
                format!("must be >= 0, got {}", self.luminance_hysteresis),
            ));
        }
        for (idx, binding) in self.natural_lighting.bindings().iter().enumerate() {
            if binding.boost_brightness_pct < -100 {
                return Err(ConfigError::invalid(
                    format!("rooms.{}.natural_lighting[{}].boost_brightness_pct", name, idx),
                    format!("must be >= -100, got {}", binding.boost_brightness_pct),
                ));
            }
        }
        Ok(())
    }
}
