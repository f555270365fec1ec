//! Raspberry Pi GPIO through rppal
//!
//! rppal runs asynchronous interrupts on a thread of its own and reports each
//! edge as an [`Event`]. The level handed to the [`EdgeHandler`] is the one
//! the kernel reported with the edge: high after a rising edge, low after a
//! falling one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rppal::gpio::{Event, Gpio, Level, Trigger};
use tracing::{debug, info};

use super::{EdgeHandler, EdgeMode, GpioError, InputPin, OutputPin, PinProvider};

#[derive(Debug, Default, Clone, Copy)]
pub struct RppalPins;

impl RppalPins {
    fn gpio() -> Result<Gpio, GpioError> {
        Gpio::new().map_err(|e| GpioError::Unavailable(e.to_string()))
    }
}

impl PinProvider for RppalPins {
    fn open_input(&self, pin: u8) -> Result<Box<dyn InputPin>, GpioError> {
        let input = Self::gpio()?
            .get(pin)
            .map_err(|e| GpioError::PinOpen {
                pin,
                reason: e.to_string(),
            })?
            .into_input();
        info!("Opened GPIO {} as input", pin);
        Ok(Box::new(RppalInput {
            pin: input,
            listening: None,
        }))
    }

    fn open_output(&self, pin: u8, initial: bool) -> Result<Box<dyn OutputPin>, GpioError> {
        let pin_handle = Self::gpio()?.get(pin).map_err(|e| GpioError::PinOpen {
            pin,
            reason: e.to_string(),
        })?;
        let output = if initial {
            pin_handle.into_output_high()
        } else {
            pin_handle.into_output_low()
        };
        info!("Opened GPIO {} as output, initially {}", pin, initial);
        Ok(Box::new(RppalOutput { pin: output }))
    }
}

fn trigger_for(mode: EdgeMode) -> Trigger {
    match mode {
        EdgeMode::Rising => Trigger::RisingEdge,
        EdgeMode::Falling => Trigger::FallingEdge,
        EdgeMode::Both => Trigger::Both,
    }
}

pub struct RppalInput {
    pin: rppal::gpio::InputPin,
    // Cleared once the handler asks to stop; rppal keeps calling until the
    // interrupt is cleared from the owning side.
    listening: Option<Arc<AtomicBool>>,
}

impl InputPin for RppalInput {
    fn pin(&self) -> u8 {
        self.pin.pin()
    }

    fn level(&self) -> Result<bool, GpioError> {
        Ok(self.pin.is_high())
    }

    fn on_edge(
        &mut self,
        mode: EdgeMode,
        handler: Arc<dyn EdgeHandler>,
    ) -> Result<(), GpioError> {
        let listening = Arc::new(AtomicBool::new(true));
        let flag = listening.clone();
        let pin = self.pin.pin();

        self.pin
            .set_async_interrupt(trigger_for(mode), None, move |event: Event| {
                if !flag.load(Ordering::Acquire) {
                    return;
                }
                let level = match event.trigger {
                    Trigger::RisingEdge => Ok(true),
                    Trigger::FallingEdge => Ok(false),
                    other => Err(GpioError::Read(format!(
                        "GPIO {} reported unexpected trigger {:?}",
                        pin, other
                    ))),
                };
                if !handler.on_edge(level) {
                    debug!("Edge handler on GPIO {} unregistered itself", pin);
                    flag.store(false, Ordering::Release);
                }
            })
            .map_err(|e| GpioError::Interrupt(e.to_string()))?;

        if let Some(previous) = self.listening.replace(listening) {
            previous.store(false, Ordering::Release);
        }
        debug!("Registered {:?} edge handler on GPIO {}", mode, pin);
        Ok(())
    }

    fn close(mut self: Box<Self>) -> Result<(), GpioError> {
        let pin = self.pin.pin();
        if let Some(listening) = self.listening.take() {
            listening.store(false, Ordering::Release);
            self.pin
                .clear_async_interrupt()
                .map_err(|e| GpioError::Close(e.to_string()))?;
        }
        info!("Closed GPIO {}", pin);
        Ok(())
    }
}

pub struct RppalOutput {
    pin: rppal::gpio::OutputPin,
}

impl OutputPin for RppalOutput {
    fn pin(&self) -> u8 {
        self.pin.pin()
    }

    fn set_level(&mut self, high: bool) -> Result<(), GpioError> {
        self.pin.write(if high { Level::High } else { Level::Low });
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), GpioError> {
        let pin = self.pin.pin();
        // rppal restores the pin's original mode when the handle drops.
        drop(self);
        info!("Closed GPIO {}", pin);
        Ok(())
    }
}
