mod config;
mod lighting;
mod rooms;

pub use config::*;
pub use lighting::ModeSettings;
pub use lighting::NaturalLightingSettings;
pub use lighting::TransitionSetting;
pub use lighting::TransitionsConfig;
pub use rooms::BindingSettings;
pub use rooms::NaturalLightingBindings;
pub use rooms::RoomSettings;
pub use rooms::SceneSettings;
