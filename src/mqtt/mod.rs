//! # MQTT Integration Module
//!
//! Connects the bridge to the broker. The rest of the crate only sees the
//! [`MessageClient`] trait and implements [`MessageCallbacks`]; the concrete
//! client lives in [`mqtt_handler`] and is built on rumqttc's blocking client.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── config.rs        - Broker settings and rumqttc option building
//! ├── message.rs       - Inbound message representation
//! └── mqtt_handler.rs  - rumqttc client and its event-loop thread
//! ```
//!
//! ## Threading
//!
//! Callbacks are invoked from the client's own event-loop thread, one at a
//! time, in the order the broker delivered them. A callback that blocks holds
//! back every later delivery until it returns.
//!
//! ## Delivery Semantics
//!
//! Every publish and subscription uses [`QOS`] (at least once). Publishing is
//! fire-and-forget: a successful return only means the request was queued,
//! and the broker's acknowledgement arrives separately through
//! [`MessageCallbacks::on_delivery_complete`].

pub mod config;
pub mod message;
pub mod mqtt_handler;


use message::InboundMessage;
use rumqttc::QoS;
use std::sync::Arc;

/// Quality of service used for every publish, the subscription and the last will.
pub const QOS: QoS = QoS::AtLeastOnce;

#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    #[error("Client is not connected")]
    NotConnected,

    #[error("Client is already connected")]
    AlreadyConnected,

    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("No answer from broker within {0}s")]
    Timeout(u64),

    #[error("Failed to subscribe: {0}")]
    Subscribe(String),

    #[error("Failed to publish: {0}")]
    Publish(String),

    #[error("Failed to disconnect: {0}")]
    Disconnect(String),
}

/// Events the message client reports back to its owner.
pub trait MessageCallbacks: Send + Sync {
    /// The transport dropped after a successful connect.
    fn on_connection_lost(&self, reason: &str);

    /// A message arrived on a subscribed topic.
    fn on_message_arrived(&self, message: InboundMessage);

    /// The broker acknowledged one of our publishes.
    fn on_delivery_complete(&self, packet_id: u16);
}

/// Broker connection as seen by the bridge.
pub trait MessageClient: Send + Sync {
    /// Connects, registering `callbacks` for everything the connection reports.
    /// `will_topic` receives the configured last will if we drop uncleanly.
    fn connect(
        &self,
        will_topic: &str,
        callbacks: Arc<dyn MessageCallbacks>,
    ) -> Result<(), MqttError>;

    fn disconnect(&self) -> Result<(), MqttError>;

    fn is_connected(&self) -> bool;

    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), MqttError>;

    fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), MqttError>;
}
