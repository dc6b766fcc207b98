use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use super::listeners::Listeners;
use super::store::StateStore;
use crate::engine::ActionRequest;
use crate::engine::Host;
use crate::engine::HostError;
use crate::engine::Subscription;

/// Channel carrying engine actions to the action task (unbounded so the engine never blocks)
pub type ActionSender = mpsc::UnboundedSender<ActionRequest>;
pub type ActionReceiver = mpsc::UnboundedReceiver<ActionRequest>;

/// [`Host`] backed by the mirrored state store
pub struct RuntimeHost {
    pub store: StateStore,
    pub listeners: Listeners,
    actions: ActionSender,
}

impl RuntimeHost {
    pub fn new(store: StateStore, actions: ActionSender) -> Self {
        Self {
            store,
            listeners: Listeners::new(),
            actions,
        }
    }
}

impl Host for RuntimeHost {
    fn state(&self, entity_id: &str) -> Option<String> {
        self.store.state(entity_id).map(str::to_string)
    }

    fn attribute(&self, entity_id: &str, attribute: &str) -> Option<Value> {
        self.store.attribute(entity_id, attribute).cloned()
    }

    fn exists(&self, entity_id: &str) -> bool {
        self.store.contains(entity_id)
    }

    fn subscribe(&mut self, subscription: Subscription) {
        let id = self.listeners.register(subscription);
        debug!(
            "Listener {} registered: {:?}",
            id,
            self.listeners.get(id)
        );
    }

    fn invoke(&mut self, action: ActionRequest) -> Result<(), HostError> {
        self.actions
            .send(action)
            .map_err(|_| HostError::ChannelClosed)
    }
}
