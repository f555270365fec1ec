//! Button/LED bridge
//!
//! Wires the pins to the broker:
//!
//! 1. [`control`] - edge handler, command handler and publish helper
//! 2. [`lifecycle`] - startup and shutdown sequencing
//! 3. [`command`] - the LED command vocabulary
//!
//! # Data Flow
//!
//! ```text
//! Button edge ──► ControlLoop ──► publish(boton, "click!")
//! Broker msg  ──► ControlLoop ──► LED write / blink
//! ```

pub mod command;
pub mod control;
pub mod lifecycle;


pub use lifecycle::{Bridge, Uninitialized};
