use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use rumqttc::{Client, ConnectReturnCode, Connection, Event, Outgoing, Packet, QoS};
use tracing::{debug, error, info, warn};

use super::config::MqttConfig;
use super::message::InboundMessage;
use super::{MessageCallbacks, MessageClient, MqttError};

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Failed,
}

type ConnectOutcome = Result<(), String>;

/// Message client on top of rumqttc's blocking `Client`.
///
/// `connect` spawns one event-loop thread per connection. That thread drives
/// the rumqttc `Connection` and is the only place callbacks are invoked from.
/// Once the connection drops the thread exits; nothing reconnects.
pub struct RumqttClient {
    config: MqttConfig,
    state: Arc<Mutex<ConnectionState>>,
    client: Mutex<Option<Client>>,
}

impl RumqttClient {
    pub fn new(config: MqttConfig) -> Self {
        RumqttClient {
            config,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            client: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn with_client<T>(
        &self,
        action: impl FnOnce(&mut Client) -> Result<T, MqttError>,
    ) -> Result<T, MqttError> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected);
        }
        let mut guard = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        let client = guard.as_mut().ok_or(MqttError::NotConnected)?;
        action(client)
    }
}

impl MessageClient for RumqttClient {
    fn connect(
        &self,
        will_topic: &str,
        callbacks: Arc<dyn MessageCallbacks>,
    ) -> Result<(), MqttError> {
        match self.state() {
            ConnectionState::Connected | ConnectionState::Connecting => {
                return Err(MqttError::AlreadyConnected)
            }
            _ => {}
        }

        info!("Connecting to broker {}", self.config.broker_addr());
        let options = self.config.to_options(will_topic);
        let (client, connection) = Client::new(options, self.config.request_capacity);
        self.set_state(ConnectionState::Connecting);
        *self.client.lock().unwrap_or_else(PoisonError::into_inner) = Some(client);

        let (ready_tx, ready_rx) = mpsc::channel();
        let state = self.state.clone();
        let spawned = thread::Builder::new()
            .name("mqtt-eventloop".to_string())
            .spawn(move || run_event_loop(connection, state, ready_tx, callbacks));

        let outcome = match spawned {
            Ok(_) => match ready_rx.recv_timeout(self.config.connect_timeout()) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(reason)) => Err(MqttError::Connect(reason)),
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    Err(MqttError::Timeout(self.config.connect_timeout_secs))
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => Err(MqttError::Connect(
                    "event loop exited before connecting".to_string(),
                )),
            },
            Err(e) => Err(MqttError::Connect(format!(
                "failed to spawn event loop: {}",
                e
            ))),
        };

        match outcome {
            Ok(()) => {
                info!("Connected to {}", self.config.broker_addr());
                Ok(())
            }
            Err(e) => {
                // Dropping the client ends its request queue, which stops a
                // still-running event loop.
                self.set_state(ConnectionState::Failed);
                self.client
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                Err(e)
            }
        }
    }

    fn disconnect(&self) -> Result<(), MqttError> {
        let mut guard = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        let client = guard.as_mut().ok_or(MqttError::NotConnected)?;
        self.set_state(ConnectionState::Closing);
        let result = client
            .disconnect()
            .map_err(|e| MqttError::Disconnect(e.to_string()));
        guard.take();
        result
    }

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), MqttError> {
        self.with_client(|client| {
            client
                .subscribe(topic, qos)
                .map_err(|e| MqttError::Subscribe(e.to_string()))
        })
    }

    fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> Result<(), MqttError> {
        self.with_client(|client| {
            client
                .publish(topic, qos, false, payload.to_vec())
                .map_err(|e| MqttError::Publish(e.to_string()))
        })
    }
}

fn run_event_loop(
    mut connection: Connection,
    state: Arc<Mutex<ConnectionState>>,
    ready_tx: mpsc::Sender<ConnectOutcome>,
    callbacks: Arc<dyn MessageCallbacks>,
) {
    let mut ready_tx = Some(ready_tx);
    let mut report = |outcome: ConnectOutcome| {
        if let Some(tx) = ready_tx.take() {
            let _ = tx.send(outcome);
        }
    };

    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    report(Err(format!("broker refused connection: {:?}", ack.code)));
                    break;
                }
                let mut current = state.lock().unwrap_or_else(PoisonError::into_inner);
                if *current != ConnectionState::Connecting {
                    debug!("Late CONNACK after connect gave up, stopping event loop");
                    break;
                }
                *current = ConnectionState::Connected;
                drop(current);
                report(Ok(()));
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!("Incoming publish on {}", publish.topic);
                callbacks.on_message_arrived(InboundMessage::new(
                    publish.topic,
                    publish.payload.to_vec(),
                ));
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => {
                callbacks.on_delivery_complete(ack.pkid);
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                debug!("Subscription acknowledged: {:?}", ack.return_codes);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("DISCONNECT sent");
            }
            Ok(_) => {}
            Err(e) => {
                let mut current = state.lock().unwrap_or_else(PoisonError::into_inner);
                let previous = *current;
                match previous {
                    ConnectionState::Connecting => {
                        *current = ConnectionState::Failed;
                        drop(current);
                        report(Err(e.to_string()));
                    }
                    ConnectionState::Connected => {
                        *current = ConnectionState::Disconnected;
                        drop(current);
                        warn!("MQTT connection dropped: {}", e);
                        callbacks.on_connection_lost(&e.to_string());
                    }
                    ConnectionState::Closing => {
                        *current = ConnectionState::Disconnected;
                        debug!("Event loop stopped after disconnect: {}", e);
                    }
                    ConnectionState::Disconnected | ConnectionState::Failed => {
                        debug!("Event loop stopped: {}", e);
                    }
                }
                break;
            }
        }
    }

    // The iterator also ends quietly once the request queue is dropped.
    let mut current = state.lock().unwrap_or_else(PoisonError::into_inner);
    if *current == ConnectionState::Closing {
        *current = ConnectionState::Disconnected;
    }
    drop(current);

    if ready_tx.is_some() {
        error!("MQTT event loop ended before the connection was established");
    }
    debug!("MQTT event loop thread exiting");
}
