use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::host::RuntimeHost;
use super::listeners::ListenerId;
use super::store::StateChange;
use super::store::StateStore;
use super::store::StateUpdate;
use crate::engine::Engine;
use crate::engine::Trigger;

/// Messages delivered to the runtime loop
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// A state source observed a new value
    Update(StateUpdate),

    /// A debounce timer for a listener expired
    Deferred {
        listener: ListenerId,
        generation: u64,
    },
}

pub type HostSender = mpsc::Sender<HostMessage>;
pub type HostReceiver = mpsc::Receiver<HostMessage>;

/// Capacity for the source→runtime channel
/// Provides backpressure when sources publish faster than the engine can evaluate
pub const HOST_CHANNEL_SIZE: usize = 1024;

pub fn host_channel() -> (HostSender, HostReceiver) {
    mpsc::channel(HOST_CHANNEL_SIZE)
}

/// Fill `store` from the updates that arrive within `window`.
///
/// Used at startup so retained state is known before rooms are built.
pub async fn sync(rx: &mut HostReceiver, store: &mut StateStore, window: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + window;
    let mut count = 0;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(HostMessage::Update(update))) => {
                store.apply(update);
                count += 1;
            }
            Ok(Some(other)) => debug!("Ignoring {:?} during sync", other),
            Ok(None) | Err(_) => break,
        }
    }
    info!(
        "Synced {} updates covering {} entities",
        count,
        store.len()
    );
    count
}

/// Single-task event loop owning the engine
pub struct Runtime {
    engine: Engine<RuntimeHost>,
    tx: HostSender,
    rx: HostReceiver,
    /// listener -> (generation, timer task)
    pending: HashMap<ListenerId, (u64, JoinHandle<()>)>,
    generation: u64,
}

impl Runtime {
    pub fn new(engine: Engine<RuntimeHost>, tx: HostSender, rx: HostReceiver) -> Self {
        Self {
            engine,
            tx,
            rx,
            pending: HashMap::new(),
            generation: 0,
        }
    }

    pub fn engine(&self) -> &Engine<RuntimeHost> {
        &self.engine
    }

    /// Number of debounce timers currently armed
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub async fn run(&mut self) {
        info!("Runtime starting");
        while self.step().await {}
        info!("Runtime shutting down");
    }

    /// Handle the next message; false once every sender is gone
    pub async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(msg) => {
                self.handle_message(msg);
                true
            }
            None => false,
        }
    }

    pub fn handle_message(&mut self, msg: HostMessage) {
        match msg {
            HostMessage::Update(update) => self.handle_update(update),
            HostMessage::Deferred {
                listener,
                generation,
            } => {
                let current = self.pending.get(&listener).map(|(g, _)| *g);
                if current != Some(generation) {
                    debug!("Stale timer for listener {} ignored", listener);
                    return;
                }
                self.pending.remove(&listener);
                let trigger = self
                    .engine
                    .host()
                    .listeners
                    .get(listener)
                    .map(|sub| sub.trigger.clone());
                if let Some(trigger) = trigger {
                    self.fire(&trigger);
                }
            }
        }
    }

    fn handle_update(&mut self, update: StateUpdate) {
        let Some(change) = self.engine.host_mut().store.apply(update) else {
            return;
        };
        debug!("State change: {:?}", change);

        if let StateChange::State { ref entity_id, .. } = change {
            self.cancel_pending(entity_id);
        }

        let matched = self.engine.host().listeners.matching(&change);
        let mut triggers = Vec::new();
        for id in matched {
            let Some((duration, trigger)) = self
                .engine
                .host()
                .listeners
                .get(id)
                .map(|sub| (sub.duration, sub.trigger.clone()))
            else {
                continue;
            };
            match duration {
                Some(duration) => self.schedule(id, duration),
                None => triggers.push(trigger),
            }
        }

        for trigger in triggers {
            self.fire(&trigger);
        }
    }

    fn fire(&mut self, trigger: &Trigger) {
        debug!("Trigger {}", trigger);
        if let Err(e) = self.engine.handle(trigger) {
            warn!("{}: {}", trigger, e);
        }
    }

    fn schedule(&mut self, listener: ListenerId, duration: Duration) {
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx
                .send(HostMessage::Deferred {
                    listener,
                    generation,
                })
                .await;
        });
        debug!("Listener {} armed for {:?}", listener, duration);

        if let Some((_, previous)) = self.pending.insert(listener, (generation, handle)) {
            previous.abort();
        }
    }

    fn cancel_pending(&mut self, entity_id: &str) {
        let ids: Vec<ListenerId> = self.engine.host().listeners.watching(entity_id).collect();
        for id in ids {
            if let Some((_, handle)) = self.pending.remove(&id) {
                debug!("Listener {} timer cancelled by change on {}", id, entity_id);
                handle.abort();
            }
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        for (_, (_, handle)) in self.pending.drain() {
            handle.abort();
        }
    }
}
