pub mod config;
pub mod engine;
pub mod integrations;
pub mod runtime;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use engine::Engine;
pub use engine::Host;
pub use engine::Trigger;
pub use engine::TriggerKind;
pub use runtime::Runtime;
pub use runtime::RuntimeHost;
