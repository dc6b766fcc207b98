mod coerce;
mod dispatch;
#[allow(clippy::module_inception)]
mod engine;
mod host;
mod natural;
mod room;
mod scale;
mod trigger;

pub use coerce::is_occupied;
pub use coerce::state_to_int;
pub use coerce::value_to_int;
pub use dispatch::LightAction;
pub use dispatch::apply_boost;
pub use engine::Decision;
pub use engine::Engine;
pub use engine::EngineError;
pub use host::ActionParams;
pub use host::ActionRequest;
pub use host::Host;
pub use host::HostError;
pub use host::Service;
pub use host::Subscription;
pub use host::domain_of;
pub use natural::Mode;
pub use natural::NaturalLighting;
pub use room::NaturalLightingBinding;
pub use room::Room;
pub use room::RoomConfig;
pub use room::RoomError;
pub use room::RoomState;
pub use room::Scene;
pub use room::SceneKind;
pub use scale::scale;
pub use trigger::TransitionTable;
pub use trigger::Trigger;
pub use trigger::TriggerKind;
