use std::error::Error;

use async_trait::async_trait;
use tracing::info;
use tracing::warn;

use super::host::ActionReceiver;
use crate::engine::ActionRequest;

/// Destination for service calls requested by the engine
///
/// This trait allows for mocking the Home Assistant API for testing purposes
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn call(&self, action: &ActionRequest) -> Result<(), Box<dyn Error + Send>>;
}

/// Perform queued actions one at a time until the channel closes.
///
/// Failures are logged and dropped; nothing is retried.
pub async fn forward_actions<S: ActionSink>(sink: S, mut rx: ActionReceiver) {
    while let Some(action) = rx.recv().await {
        info!("Calling {}", action);
        if let Err(e) = sink.call(&action).await {
            warn!("Failed to call {}: {}", action, e);
        }
    }
    info!("Action channel closed");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use tokio::sync::mpsc;

    use super::*;
    use crate::engine::ActionParams;

    #[derive(Default, Clone)]
    struct MockSink {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ActionSink for MockSink {
        async fn call(&self, action: &ActionRequest) -> Result<(), Box<dyn Error + Send>> {
            self.calls.lock().unwrap().push(action.to_string());
            if action.entity_id == "light.broken" {
                return Err(Box::new(std::io::Error::other("503 Service Unavailable")));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_forward_continues_after_failure() {
        let sink = MockSink::default();
        let calls = sink.calls.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(ActionRequest::turn_on("light.broken", ActionParams::default()))
            .unwrap();
        tx.send(ActionRequest::turn_off("light.hall", None)).unwrap();
        drop(tx);

        forward_actions(sink, rx).await;

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["light.broken turn_on", "light.hall turn_off"]
        );
    }
}
