//! Recording pins for tests
//!
//! `MockPins` hands out pins that share one state block with the test, so a
//! test can fire button edges, inject failures and inspect every LED write
//! after the pins have been moved into the bridge.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use super::{EdgeHandler, EdgeMode, GpioError, InputPin, OutputPin, PinProvider};

/// Ordered log of pin and client operations, shared across test doubles.
pub type Journal = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
struct MockState {
    input_open: bool,
    input_level: bool,
    fail_reads: bool,
    edge_mode: Option<EdgeMode>,
    edge_handler: Option<Arc<dyn EdgeHandler>>,

    output_open: bool,
    output_level: bool,
    writes: Vec<(Instant, bool)>,

    fail_open_input: bool,
    fail_open_output: bool,
    fail_close_input: bool,
    fail_close_output: bool,
}

impl MockState {
    /// The button reading seen by both edges and direct reads.
    fn read(&self) -> Result<bool, GpioError> {
        if self.fail_reads {
            return Err(GpioError::Read("injected read failure".to_string()));
        }
        Ok(self.input_level)
    }
}

#[derive(Clone, Default)]
pub struct MockPins {
    state: Arc<Mutex<MockState>>,
    journal: Journal,
}

impl MockPins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        MockPins {
            state: Arc::default(),
            journal,
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(journal: &Journal, entry: String) {
        journal.lock().unwrap().push(entry);
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn fail_open_input(&self) {
        self.state().fail_open_input = true;
    }

    pub fn fail_open_output(&self) {
        self.state().fail_open_output = true;
    }

    pub fn fail_close_input(&self) {
        self.state().fail_close_input = true;
    }

    pub fn fail_close_output(&self) {
        self.state().fail_close_output = true;
    }

    pub fn fail_reads(&self) {
        self.state().fail_reads = true;
    }

    /// Drives the button to `level` and delivers the resulting edge.
    ///
    /// Returns the handler's continuation flag, or `None` when no handler
    /// is registered (pin closed or never set up).
    pub fn edge(&self, level: bool) -> Option<bool> {
        let (handler, reading) = {
            let mut state = self.state();
            state.input_level = level;
            (state.edge_handler.clone(), state.read())
        };
        handler.map(|h| h.on_edge(reading))
    }

    pub fn edge_mode(&self) -> Option<EdgeMode> {
        self.state().edge_mode
    }

    pub fn input_open(&self) -> bool {
        self.state().input_open
    }

    pub fn output_open(&self) -> bool {
        self.state().output_open
    }

    pub fn led(&self) -> bool {
        self.state().output_level
    }

    pub fn writes(&self) -> Vec<bool> {
        self.state().writes.iter().map(|(_, level)| *level).collect()
    }

    pub fn timed_writes(&self) -> Vec<(Instant, bool)> {
        self.state().writes.clone()
    }
}

impl PinProvider for MockPins {
    fn open_input(&self, pin: u8) -> Result<Box<dyn InputPin>, GpioError> {
        let mut state = self.state();
        if state.fail_open_input {
            return Err(GpioError::PinOpen {
                pin,
                reason: "injected open failure".to_string(),
            });
        }
        state.input_open = true;
        Self::record(&self.journal, format!("open input {}", pin));
        Ok(Box::new(MockInputPin {
            pin,
            pins: self.clone(),
        }))
    }

    fn open_output(&self, pin: u8, initial: bool) -> Result<Box<dyn OutputPin>, GpioError> {
        let mut state = self.state();
        if state.fail_open_output {
            return Err(GpioError::PinOpen {
                pin,
                reason: "injected open failure".to_string(),
            });
        }
        state.output_open = true;
        state.output_level = initial;
        Self::record(&self.journal, format!("open output {}", pin));
        Ok(Box::new(MockOutputPin {
            pin,
            pins: self.clone(),
        }))
    }
}

pub struct MockInputPin {
    pin: u8,
    pins: MockPins,
}

impl InputPin for MockInputPin {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn level(&self) -> Result<bool, GpioError> {
        self.pins.state().read()
    }

    fn on_edge(
        &mut self,
        mode: EdgeMode,
        handler: Arc<dyn EdgeHandler>,
    ) -> Result<(), GpioError> {
        let mut state = self.pins.state();
        state.edge_mode = Some(mode);
        state.edge_handler = Some(handler);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), GpioError> {
        let mut state = self.pins.state();
        MockPins::record(&self.pins.journal, format!("close input {}", self.pin));
        state.edge_handler = None;
        state.input_open = false;
        if state.fail_close_input {
            return Err(GpioError::Close("injected close failure".to_string()));
        }
        Ok(())
    }
}

pub struct MockOutputPin {
    pin: u8,
    pins: MockPins,
}

impl OutputPin for MockOutputPin {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn set_level(&mut self, high: bool) -> Result<(), GpioError> {
        let mut state = self.pins.state();
        state.output_level = high;
        state.writes.push((Instant::now(), high));
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), GpioError> {
        let mut state = self.pins.state();
        MockPins::record(&self.pins.journal, format!("close output {}", self.pin));
        state.output_open = false;
        if state.fail_close_output {
            return Err(GpioError::Close("injected close failure".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(Mutex<Vec<bool>>);

    impl EdgeHandler for Counter {
        fn on_edge(&self, level: Result<bool, GpioError>) -> bool {
            self.0.lock().unwrap().push(level.unwrap());
            true
        }
    }

    #[test]
    fn output_records_writes() {
        let pins = MockPins::new();
        let mut led = pins.open_output(18, false).unwrap();
        assert!(!pins.led());

        led.set_level(true).unwrap();
        led.set_level(false).unwrap();
        assert_eq!(pins.writes(), vec![true, false]);
        assert!(pins.output_open());

        led.close().unwrap();
        assert!(!pins.output_open());
    }

    #[test]
    fn edges_reach_registered_handler_until_closed() {
        let pins = MockPins::new();
        let mut button = pins.open_input(23).unwrap();
        assert_eq!(pins.edge(true), None);

        let counter = Arc::new(Counter(Mutex::new(Vec::new())));
        button.on_edge(EdgeMode::Both, counter.clone()).unwrap();
        assert_eq!(pins.edge(true), Some(true));
        assert_eq!(pins.edge(false), Some(true));
        assert_eq!(*counter.0.lock().unwrap(), vec![true, false]);
        assert!(button.level().is_ok_and(|high| !high));

        button.close().unwrap();
        assert_eq!(pins.edge(true), None);
        assert_eq!(
            *pins.journal().lock().unwrap(),
            vec!["open input 23".to_string(), "close input 23".to_string()]
        );
    }

    #[test]
    fn edge_reading_matches_direct_read() {
        struct Readings(Mutex<Vec<Result<bool, GpioError>>>);

        impl EdgeHandler for Readings {
            fn on_edge(&self, level: Result<bool, GpioError>) -> bool {
                self.0.lock().unwrap().push(level);
                true
            }
        }

        let pins = MockPins::new();
        let mut button = pins.open_input(23).unwrap();
        let readings = Arc::new(Readings(Mutex::new(Vec::new())));
        button.on_edge(EdgeMode::Both, readings.clone()).unwrap();

        pins.edge(true);
        assert!(matches!(readings.0.lock().unwrap()[0], Ok(true)));
        assert!(matches!(button.level(), Ok(true)));

        pins.fail_reads();
        pins.edge(false);
        assert!(matches!(readings.0.lock().unwrap()[1], Err(GpioError::Read(_))));
        assert!(matches!(button.level(), Err(GpioError::Read(_))));
    }

    #[test]
    fn injected_failures_surface_as_errors() {
        let pins = MockPins::new();
        pins.fail_open_output();
        assert!(pins.open_output(18, false).is_err());

        let button = pins.open_input(23).unwrap();
        pins.fail_reads();
        assert!(button.level().is_err());
    }
}
