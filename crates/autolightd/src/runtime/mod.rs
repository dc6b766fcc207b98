//! Host runtime: mirrors host state, matches listeners and drives the engine.

mod actions;
mod host;
mod listeners;
#[allow(clippy::module_inception)]
mod runtime;
mod store;

pub use actions::ActionSink;
pub use actions::forward_actions;
pub use host::ActionReceiver;
pub use host::ActionSender;
pub use host::RuntimeHost;
pub use listeners::ListenerId;
pub use listeners::Listeners;
pub use runtime::HOST_CHANNEL_SIZE;
pub use runtime::HostMessage;
pub use runtime::HostReceiver;
pub use runtime::HostSender;
pub use runtime::Runtime;
pub use runtime::host_channel;
pub use runtime::sync;
pub use store::StateChange;
pub use store::StateStore;
pub use store::StateUpdate;
