//! Home Assistant `mqtt_statestream` source.
//!
//! Home Assistant publishes every entity as a set of retained topics:
//! `<prefix>/<domain>/<object_id>/state` carries the raw state string and
//! `<prefix>/<domain>/<object_id>/<attribute>` carries each attribute as
//! JSON. Those are turned into [`StateUpdate`]s for the runtime.

use std::error::Error;

use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::client::MqttClient;
use super::client::MqttMessage;
use crate::runtime::HostMessage;
use crate::runtime::HostSender;
use crate::runtime::StateUpdate;

/// Timestamps are published alongside attributes but never drive rules
const IGNORED_LEAVES: [&str; 3] = ["last_changed", "last_updated", "last_reported"];

/// Split a statestream topic into (entity_id, leaf)
pub fn parse_statestream_topic(topic: &str, prefix: &str) -> Option<(String, String)> {
    let without_prefix = topic.strip_prefix(prefix)?.strip_prefix('/')?;

    let parts: Vec<&str> = without_prefix.split('/').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    Some((format!("{}.{}", parts[0], parts[1]), parts[2].to_string()))
}

pub fn parse_message(prefix: &str, msg: &MqttMessage) -> Option<StateUpdate> {
    let (entity_id, leaf) = parse_statestream_topic(&msg.topic, prefix)?;
    if IGNORED_LEAVES.contains(&leaf.as_str()) {
        return None;
    }

    let payload = match std::str::from_utf8(&msg.payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Non UTF-8 payload on {}: {}", msg.topic, e);
            return None;
        }
    };

    if leaf == "state" {
        return Some(StateUpdate::state(entity_id, payload));
    }

    let value = serde_json::from_str(payload).unwrap_or_else(|_| Value::String(payload.to_string()));
    Some(StateUpdate::attribute(entity_id, leaf, value))
}

/// Feeds statestream messages into the runtime
pub struct Statestream<C: MqttClient> {
    client: C,
    prefix: String,
}

impl<C: MqttClient> Statestream<C> {
    pub fn new(client: C, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Connect and subscribe to every statestream topic
    pub async fn setup(&mut self) -> Result<(), Box<dyn Error + Send>> {
        self.client.connect().await?;

        let topic = format!("{}/#", self.prefix);
        info!("Subscribing to statestream: {}", topic);
        self.client.subscribe(&topic).await?;
        Ok(())
    }

    /// Forward updates until the client or the runtime goes away
    pub async fn run(mut self, tx: HostSender) {
        while let Some(msg) = self.client.poll_message().await {
            let Some(update) = parse_message(&self.prefix, &msg) else {
                debug!("Ignoring topic {}", msg.topic);
                continue;
            };
            debug!("{} (retained={}): {:?}", msg.topic, msg.retain, update);
            if tx.send(HostMessage::Update(update)).await.is_err() {
                break;
            }
        }
        info!("Statestream stopped");
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::integrations::mqtt::client::MockMqttClient;
    use crate::runtime::host_channel;

    const PREFIX: &str = "homeassistant/statestream";

    fn message(topic: &str, payload: &str) -> MqttMessage {
        MqttMessage {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
            retain: true,
        }
    }

    #[test]
    fn test_parse_statestream_topic() {
        assert_eq!(
            parse_statestream_topic("homeassistant/statestream/light/kitchen/state", PREFIX),
            Some(("light.kitchen".to_string(), "state".to_string()))
        );
        assert_eq!(
            parse_statestream_topic("homeassistant/statestream/sun/sun/elevation", PREFIX),
            Some(("sun.sun".to_string(), "elevation".to_string()))
        );
    }

    #[test]
    fn test_parse_statestream_topic_invalid() {
        assert_eq!(parse_statestream_topic("homeassistant/statestream/light/kitchen", PREFIX), None);
        assert_eq!(
            parse_statestream_topic("homeassistant/statestream/light/kitchen/state/extra", PREFIX),
            None
        );
        assert_eq!(parse_statestream_topic("zigbee2mqtt/light/kitchen/state", PREFIX), None);
        assert_eq!(parse_statestream_topic("homeassistant/statestreamx/a/b/state", PREFIX), None);
    }

    #[test]
    fn test_parse_message() {
        assert_eq!(
            parse_message(PREFIX, &message("homeassistant/statestream/binary_sensor/hall/state", "on")),
            Some(StateUpdate::state("binary_sensor.hall", "on"))
        );
        assert_eq!(
            parse_message(PREFIX, &message("homeassistant/statestream/sun/sun/elevation", "-3.21")),
            Some(StateUpdate::attribute("sun.sun", "elevation", json!(-3.21)))
        );
        assert_eq!(
            parse_message(
                PREFIX,
                &message("homeassistant/statestream/light/hall/friendly_name", "\"Hall\"")
            ),
            Some(StateUpdate::attribute("light.hall", "friendly_name", json!("Hall")))
        );
        assert_eq!(
            parse_message(PREFIX, &message("homeassistant/statestream/light/hall/icon", "mdi:lamp")),
            Some(StateUpdate::attribute("light.hall", "icon", json!("mdi:lamp")))
        );
        assert_eq!(
            parse_message(
                PREFIX,
                &message("homeassistant/statestream/light/hall/last_changed", "\"2024-01-01T00:00:00\"")
            ),
            None
        );
    }

    #[tokio::test]
    async fn test_statestream_forwards_updates() {
        let client = MockMqttClient::replay([
            ("homeassistant/statestream/light/hall/state", "off", true),
            ("homeassistant/statestream/light/hall/last_updated", "\"now\"", true),
            ("homeassistant/statestream/sensor/hall_lux/state", "12", false),
        ]);

        let mut stream = Statestream::new(client, "homeassistant/statestream/");
        stream.setup().await.unwrap();
        assert!(stream.client.connected);
        assert_eq!(stream.client.filters, vec!["homeassistant/statestream/#"]);

        let (tx, mut rx) = host_channel();
        stream.run(tx).await;

        let mut received = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            received.push(msg);
        }
        assert_eq!(
            received,
            vec![
                HostMessage::Update(StateUpdate::state("light.hall", "off")),
                HostMessage::Update(StateUpdate::state("sensor.hall_lux", "12")),
            ]
        );
    }
}
