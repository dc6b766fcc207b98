mod client;
mod statestream;

pub use client::MqttClient;
pub use client::MqttMessage;
pub use client::RumqttcClient;
pub use statestream::Statestream;
pub use statestream::parse_message;
pub use statestream::parse_statestream_topic;
