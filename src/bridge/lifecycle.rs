//! Bridge lifecycle with statum state machine
//!
//! ```text
//! Uninitialized ──startup──► Ready ──shutdown──► Terminated
//! ```
//!
//! Neither transition can fail. Each step inside them is attempted on its own
//! and a failed step is logged and skipped, so a bridge whose broker is down
//! still drives its pins, and a bridge whose pins are missing still talks to
//! the broker.
//!
//! A connection drop while `Ready` leaves the machine in `Ready` with
//! [`Bridge::is_connected`] returning false; nothing reconnects.

use std::sync::Arc;

use statum::{machine, state};
use tracing::{error, info, warn};

use super::control::ControlLoop;
use crate::config::BridgeConfig;
use crate::gpio::{EdgeMode, InputPin, PinProvider};
use crate::mqtt::{MessageCallbacks, MessageClient, QOS};

#[state]
#[derive(Debug, Clone)]
pub enum BridgeState {
    Uninitialized, // Collaborators chosen, nothing opened
    Ready,         // Handlers wired up
    Terminated,    // Pins released, client disconnected
}

#[machine]
pub struct Bridge<S: BridgeState> {
    config: BridgeConfig,
    client: Arc<dyn MessageClient>,
    pins: Arc<dyn PinProvider>,
    control: Arc<ControlLoop>,
    button: Option<Box<dyn InputPin>>,
}

impl<S: BridgeState> Bridge<S> {
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }
}

impl Bridge<Uninitialized> {
    pub fn create(
        config: BridgeConfig,
        client: Arc<dyn MessageClient>,
        pins: Arc<dyn PinProvider>,
    ) -> Self {
        let control = Arc::new(ControlLoop::new(
            config.topics.clone(),
            config.blink.clone(),
            client.clone(),
        ));

        Self::new(
            config,
            client,
            pins,
            control,
            None, // button
        )
    }

    /// Connects, announces, subscribes, then opens the button and the LED.
    pub fn startup(mut self) -> Bridge<Ready> {
        info!("Starting bridge");
        self.connect();
        self.subscribe();
        self.setup_button();
        self.setup_led();
        info!("Bridge ready");
        self.transition()
    }

    fn connect(&self) {
        let callbacks: Arc<dyn MessageCallbacks> = self.control.clone();
        info!("Connecting to broker {}", self.config.mqtt.broker_addr());
        match self.client.connect(&self.config.topics.gestion, callbacks) {
            Ok(()) => {
                info!("Connected");
                info!("Publishing welcome message");
                self.control
                    .publish(&self.config.topics.gestion, &self.config.mqtt.welcome);
            }
            Err(e) => error!("MQTT connect failed: {}", e),
        }
    }

    fn subscribe(&self) {
        let topic = &self.config.topics.led;
        match self.client.subscribe(topic, QOS) {
            Ok(()) => info!("Subscribed to {}", topic),
            Err(e) => error!("Failed to subscribe to {}: {}", topic, e),
        }
    }

    fn setup_button(&mut self) {
        let handler = self.control.clone();
        let result = self
            .pins
            .open_input(self.config.pins.button)
            .and_then(|mut button| {
                button.on_edge(EdgeMode::Both, handler)?;
                Ok(button)
            });
        match result {
            Ok(button) => {
                match button.level() {
                    Ok(high) => info!(
                        "Button ready on GPIO {} (level {})",
                        button.pin(),
                        if high { "high" } else { "low" }
                    ),
                    Err(e) => warn!(
                        "Button ready on GPIO {}, level unreadable: {}",
                        button.pin(),
                        e
                    ),
                }
                self.button = Some(button);
            }
            Err(e) => error!("Button setup failed: {}", e),
        }
    }

    fn setup_led(&self) {
        match self.pins.open_output(self.config.pins.led, false) {
            Ok(led) => {
                info!("LED ready on GPIO {}", led.pin());
                self.control.install_led(led);
            }
            Err(e) => error!("LED setup failed: {}", e),
        }
    }
}

impl Bridge<Ready> {
    pub fn control(&self) -> Arc<ControlLoop> {
        self.control.clone()
    }

    /// Releases the button, then the LED, then disconnects if still connected.
    pub fn shutdown(mut self) -> Bridge<Terminated> {
        info!("Shutting down bridge");

        if let Some(button) = self.button.take() {
            if let Err(e) = button.close() {
                error!("Failed to release button: {}", e);
            }
        }

        // An in-flight blink keeps running; its remaining steps find no pin.
        if let Some(led) = self.control.take_led() {
            if let Err(e) = led.close() {
                error!("Failed to release LED: {}", e);
            }
        }

        if self.client.is_connected() {
            match self.client.disconnect() {
                Ok(()) => info!("MQTT disconnected"),
                Err(e) => error!("MQTT disconnect failed: {}", e),
            }
        } else {
            warn!("MQTT client not connected, skipping disconnect");
        }

        info!("Bridge terminated");
        self.transition()
    }
}
