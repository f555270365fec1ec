//! Control loop
//!
//! Maps button edges to outbound messages and inbound LED commands to pin
//! writes. Both directions are driven by collaborator callbacks running on
//! their own threads (the GPIO interrupt thread and the MQTT event-loop
//! thread), so the LED handle sits behind a mutex and the message client is
//! shared through an `Arc`.
//!
//! Every failure is logged at the point it happens and then dropped. Nothing
//! is retried and nothing propagates back into the collaborators.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, error, info, warn};

use super::command::LedCommand;
use crate::config::{BlinkConfig, Topics};
use crate::gpio::{EdgeHandler, GpioError, OutputPin};
use crate::mqtt::message::InboundMessage;
use crate::mqtt::{MessageCallbacks, MessageClient, QOS};

/// Payload published on the button topic for every press.
pub const CLICK_PAYLOAD: &str = "click!";

pub struct ControlLoop {
    topics: Topics,
    blink: BlinkConfig,
    client: Arc<dyn MessageClient>,
    led: Mutex<Option<Box<dyn OutputPin>>>,
}

impl ControlLoop {
    pub fn new(topics: Topics, blink: BlinkConfig, client: Arc<dyn MessageClient>) -> Self {
        ControlLoop {
            topics,
            blink,
            client,
            led: Mutex::new(None),
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    fn led(&self) -> MutexGuard<'_, Option<Box<dyn OutputPin>>> {
        self.led.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands the LED pin to the control loop.
    pub fn install_led(&self, pin: Box<dyn OutputPin>) {
        if let Some(previous) = self.led().replace(pin) {
            warn!("Replacing already installed LED pin {}", previous.pin());
        }
    }

    /// Takes the LED pin back. Commands arriving afterwards find no pin.
    pub fn take_led(&self) -> Option<Box<dyn OutputPin>> {
        self.led().take()
    }

    pub fn has_led(&self) -> bool {
        self.led().is_some()
    }

    /// Publishes `message` on `topic` at the fixed QoS. Failures are logged only.
    pub fn publish(&self, topic: &str, message: &str) {
        info!("Publishing message: {}", message);
        match self.client.publish(topic, message.as_bytes(), QOS) {
            Ok(()) => info!("Message published on {}", topic),
            Err(e) => error!("Failed to publish on {}: {}", topic, e),
        }
    }

    /// Reacts to one button edge. Only a high level counts as a press.
    pub fn handle_edge(&self, level: Result<bool, GpioError>) -> bool {
        match level {
            Ok(pressed) => {
                info!("Triggered: button level {}", pressed);
                if pressed {
                    info!("Triggered: button pressed");
                    self.publish(&self.topics.boton, CLICK_PAYLOAD);
                }
            }
            Err(e) => error!("Could not read button level: {}", e),
        }
        // Stay registered whatever happened.
        true
    }

    pub fn handle_message(&self, message: &InboundMessage) {
        debug!("{}", message);
        match LedCommand::parse(&message.payload_text()) {
            Some(command) => self.execute(command),
            None => warn!("Unsupported command: {:?}", message.payload_text()),
        }
    }

    pub fn execute(&self, command: LedCommand) {
        match command {
            LedCommand::On => {
                self.set_led(true);
                debug!("LED ON");
            }
            LedCommand::Off => {
                self.set_led(false);
                debug!("LED OFF");
            }
            LedCommand::Shake => {
                debug!("Blinking LED {} times", self.blink.cycles);
                self.shake();
            }
        }
    }

    /// Blocks the calling thread for the whole sequence. The lock is taken per
    /// write, so the pin can be taken away between steps.
    fn shake(&self) {
        let step = self.blink.step();
        for _ in 0..self.blink.cycles {
            self.set_led(true);
            thread::sleep(step);
            self.set_led(false);
            thread::sleep(step);
        }
    }

    fn set_led(&self, high: bool) {
        let mut led = self.led();
        match led.as_mut() {
            Some(pin) => {
                if let Err(e) = pin.set_level(high) {
                    error!("Failed to set LED on GPIO {}: {}", pin.pin(), e);
                }
            }
            None => warn!("LED pin not available, dropping write of {}", high),
        }
    }
}

impl EdgeHandler for ControlLoop {
    fn on_edge(&self, level: Result<bool, GpioError>) -> bool {
        self.handle_edge(level)
    }
}

impl MessageCallbacks for ControlLoop {
    fn on_connection_lost(&self, reason: &str) {
        warn!("Connection lost: {}", reason);
    }

    fn on_message_arrived(&self, message: InboundMessage) {
        self.handle_message(&message);
    }

    fn on_delivery_complete(&self, packet_id: u16) {
        debug!("Delivery complete for packet {}", packet_id);
    }
}
