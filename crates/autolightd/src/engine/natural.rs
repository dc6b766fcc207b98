use std::collections::BTreeMap;

use tracing::debug;

use super::scale::scale;
use crate::config::ModeSettings;
use crate::config::NaturalLightingSettings;

pub const DEFAULT_MODE: &str = "default";

/// Brightness and colour temperature bounds for one mode, plus the values
/// derived from the current sun elevation
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    pub max_brightness: i64,
    pub min_brightness: i64,
    pub max_kelvin: i64,
    pub min_kelvin: i64,
    pub brightness: i64,
    pub kelvin: i64,
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            max_brightness: 255,
            min_brightness: 100,
            max_kelvin: 5500,
            min_kelvin: 2000,
            brightness: 0,
            kelvin: 0,
        }
    }
}

impl Mode {
    /// A copy of `base` with the bounds named in `settings` replaced
    fn derive(base: &Mode, settings: &ModeSettings) -> Self {
        Self {
            max_brightness: settings.max_brightness.unwrap_or(base.max_brightness),
            min_brightness: settings.min_brightness.unwrap_or(base.min_brightness),
            max_kelvin: settings.max_kelvin.unwrap_or(base.max_kelvin),
            min_kelvin: settings.min_kelvin.unwrap_or(base.min_kelvin),
            brightness: base.brightness,
            kelvin: base.kelvin,
        }
    }

    fn recompute(&mut self, elevation: i64, brightness_range: (i64, i64), kelvin_range: (i64, i64)) {
        self.brightness = scale(
            elevation,
            brightness_range,
            (self.min_brightness, self.max_brightness),
        );
        self.kelvin = scale(elevation, kelvin_range, (self.min_kelvin, self.max_kelvin));
    }
}

/// Sun-driven brightness and colour temperature for every configured mode
#[derive(Debug, Clone)]
pub struct NaturalLighting {
    pub sun_entity: String,
    default: Mode,
    modes: BTreeMap<String, Mode>,
    brightness_elevation: (i64, i64),
    kelvin_elevation: (i64, i64),
    sun_elevation: i64,
}

impl NaturalLighting {
    pub fn new(settings: &NaturalLightingSettings, sun_elevation: i64) -> Self {
        let mut default = Mode::default();
        for mode in settings.modes.iter().filter(|m| m.name == DEFAULT_MODE) {
            default = Mode::derive(&default, mode);
        }

        let modes = settings
            .modes
            .iter()
            .filter(|m| m.name != DEFAULT_MODE)
            .map(|m| (m.name.clone(), Mode::derive(&default, m)))
            .collect();

        let mut natural = Self {
            sun_entity: settings.sun_entity.clone(),
            default,
            modes,
            brightness_elevation: (
                settings.min_elevation_for_brightness,
                settings.max_elevation_for_brightness,
            ),
            kelvin_elevation: (
                settings.min_elevation_for_kelvin,
                settings.max_elevation_for_kelvin,
            ),
            sun_elevation,
        };
        natural.recompute();
        natural
    }

    pub fn sun_elevation(&self) -> i64 {
        self.sun_elevation
    }

    pub fn set_elevation(&mut self, elevation: i64) {
        self.sun_elevation = elevation;
        self.recompute();
    }

    fn recompute(&mut self) {
        debug!("Sun elevation: {}", self.sun_elevation);
        let elevation = self.sun_elevation;
        let (brightness_range, kelvin_range) = (self.brightness_elevation, self.kelvin_elevation);

        self.default
            .recompute(elevation, brightness_range, kelvin_range);
        debug!(
            "{} - brightness: {} - kelvin: {}",
            DEFAULT_MODE, self.default.brightness, self.default.kelvin
        );
        for (name, mode) in self.modes.iter_mut() {
            mode.recompute(elevation, brightness_range, kelvin_range);
            debug!(
                "{} - brightness: {} - kelvin: {}",
                name, mode.brightness, mode.kelvin
            );
        }
    }

    pub fn has_mode(&self, name: &str) -> bool {
        name == DEFAULT_MODE || self.modes.contains_key(name)
    }

    /// Mode by name; unknown names resolve to the default mode
    pub fn mode(&self, name: &str) -> &Mode {
        self.modes.get(name).unwrap_or(&self.default)
    }

    /// All modes, default first
    pub fn modes(&self) -> impl Iterator<Item = (&str, &Mode)> {
        std::iter::once((DEFAULT_MODE, &self.default))
            .chain(self.modes.iter().map(|(name, mode)| (name.as_str(), mode)))
    }
}
