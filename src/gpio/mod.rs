//! Pin abstraction
//!
//! The bridge owns exactly one input pin (the button) and one output pin
//! (the LED). It only talks to them through the traits below so that the
//! control loop runs the same against the Raspberry Pi header ([`rppal_pins`])
//! and against the recording pins used in tests.
//!
//! # Threading
//!
//! Edge handlers are called from the backend's interrupt thread, never from
//! the thread that registered them.

pub mod rppal_pins;

#[cfg(test)]
pub mod mock;

use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GpioError {
    #[error("GPIO peripheral unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to open pin {pin}: {reason}")]
    PinOpen { pin: u8, reason: String },

    #[error("Failed to read pin: {0}")]
    Read(String),

    #[error("Failed to write pin: {0}")]
    Write(String),

    #[error("Failed to configure interrupt: {0}")]
    Interrupt(String),

    #[error("Failed to close pin: {0}")]
    Close(String),
}

/// Which transitions of an input pin raise an edge event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    Rising,
    Falling,
    Both,
}

/// Receives edge events from an input pin.
pub trait EdgeHandler: Send + Sync {
    /// `level` is the pin level read for this edge, `true` meaning high.
    ///
    /// Returns whether the handler wants further edges.
    fn on_edge(&self, level: Result<bool, GpioError>) -> bool;
}

/// An input pin with edge notification.
///
/// Edge handlers are not expected to call [`InputPin::level`]: the level for
/// an edge travels with the edge itself, as reported by the backend. `level`
/// is a direct read for callers outside the edge path, such as the startup
/// log of the button's resting state.
pub trait InputPin: Send {
    fn pin(&self) -> u8;

    fn level(&self) -> Result<bool, GpioError>;

    /// Registers `handler` for edges matching `mode`, replacing any previous handler.
    fn on_edge(&mut self, mode: EdgeMode, handler: Arc<dyn EdgeHandler>)
        -> Result<(), GpioError>;

    /// Unregisters the edge handler and releases the pin.
    fn close(self: Box<Self>) -> Result<(), GpioError>;
}

pub trait OutputPin: Send {
    fn pin(&self) -> u8;

    fn set_level(&mut self, high: bool) -> Result<(), GpioError>;

    fn close(self: Box<Self>) -> Result<(), GpioError>;
}

/// Hands out pins by BCM number.
pub trait PinProvider: Send + Sync {
    fn open_input(&self, pin: u8) -> Result<Box<dyn InputPin>, GpioError>;

    /// Opens `pin` as an output driven to `initial` before it is returned.
    fn open_output(&self, pin: u8, initial: bool) -> Result<Box<dyn OutputPin>, GpioError>;
}
