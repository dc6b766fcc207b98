use std::error::Error;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::AsyncClient;
use rumqttc::Event;
use rumqttc::EventLoop;
use rumqttc::MqttOptions;
use rumqttc::Packet;
use rumqttc::QoS;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use crate::config::MqttConfig;

/// Retained attribute payloads (effect lists, forecasts) can be large
const MAX_PACKET_SIZE: usize = 2 * 1024 * 1024;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    /// Set for the snapshot the broker replays on subscribe
    pub retain: bool,
}

/// Read-only view of an MQTT broker
#[async_trait]
pub trait MqttClient: Send + Sync {
    async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>>;

    async fn subscribe(&mut self, filter: &str) -> Result<(), Box<dyn Error + Send>>;

    /// Next message on any subscribed topic, `None` once the connection is closed for good
    async fn poll_message(&mut self) -> Option<MqttMessage>;
}

/// Replays a fixed list of messages, then reports the connection closed
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockMqttClient {
    pub pending: std::collections::VecDeque<MqttMessage>,
    pub filters: Vec<String>,
    pub connected: bool,
}

#[cfg(test)]
impl MockMqttClient {
    pub fn replay<'a>(messages: impl IntoIterator<Item = (&'a str, &'a str, bool)>) -> Self {
        Self {
            pending: messages
                .into_iter()
                .map(|(topic, payload, retain)| MqttMessage {
                    topic: topic.to_string(),
                    payload: payload.as_bytes().to_vec(),
                    retain,
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[async_trait]
impl MqttClient for MockMqttClient {
    async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>> {
        self.connected = true;
        Ok(())
    }

    async fn subscribe(&mut self, filter: &str) -> Result<(), Box<dyn Error + Send>> {
        self.filters.push(filter.to_string());
        Ok(())
    }

    async fn poll_message(&mut self) -> Option<MqttMessage> {
        self.pending.pop_front()
    }
}

enum Connection {
    Idle(MqttOptions),
    Live {
        client: AsyncClient,
        incoming: mpsc::UnboundedReceiver<MqttMessage>,
        pump: JoinHandle<()>,
    },
}

/// rumqttc-backed client; the event loop runs on its own task once connected
pub struct RumqttcClient {
    connection: Connection,
}

impl RumqttcClient {
    pub fn new(config: &MqttConfig) -> anyhow::Result<Self> {
        let mut options =
            MqttOptions::new(config.client_id.clone(), config.broker.clone(), config.port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);

        match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                options.set_credentials(username, password);
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!("MQTT username and password must both be set, connecting anonymously");
            }
            (None, None) => {}
        }

        Ok(Self {
            connection: Connection::Idle(options),
        })
    }
}

/// Drive the rumqttc event loop, forwarding publishes until the receiver is dropped
async fn pump(mut event_loop: EventLoop, tx: mpsc::UnboundedSender<MqttMessage>) {
    loop {
        let publish = match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => publish,
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                debug!("MQTT connected");
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                // The next poll reconnects
                warn!("MQTT connection error: {}", e);
                tokio::time::sleep(RECONNECT_BACKOFF).await;
                continue;
            }
        };

        let msg = MqttMessage {
            topic: publish.topic.to_string(),
            payload: publish.payload.to_vec(),
            retain: publish.retain,
        };
        if tx.send(msg).is_err() {
            break;
        }
    }
    debug!("MQTT event loop stopped");
}

#[async_trait]
impl MqttClient for RumqttcClient {
    async fn connect(&mut self) -> Result<(), Box<dyn Error + Send>> {
        let Connection::Idle(options) = &self.connection else {
            return Ok(());
        };

        let (client, event_loop) = AsyncClient::new(options.clone(), 10);
        let (tx, incoming) = mpsc::unbounded_channel();
        self.connection = Connection::Live {
            client,
            incoming,
            pump: tokio::spawn(pump(event_loop, tx)),
        };
        Ok(())
    }

    async fn subscribe(&mut self, filter: &str) -> Result<(), Box<dyn Error + Send>> {
        match &self.connection {
            Connection::Live { client, .. } => client
                .subscribe(filter, QoS::AtMostOnce)
                .await
                .map_err(|e| Box::new(e) as Box<dyn Error + Send>),
            Connection::Idle(_) => Err(Box::new(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("cannot subscribe to {} before connect()", filter),
            ))),
        }
    }

    async fn poll_message(&mut self) -> Option<MqttMessage> {
        match &mut self.connection {
            Connection::Live { incoming, .. } => incoming.recv().await,
            Connection::Idle(_) => None,
        }
    }
}

impl Drop for RumqttcClient {
    fn drop(&mut self) {
        if let Connection::Live { pump, .. } = &self.connection {
            pump.abort();
        }
    }
}
