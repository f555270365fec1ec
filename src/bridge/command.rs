use std::fmt;

/// A command understood on the LED topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
    Shake,
}

impl LedCommand {
    /// Matches `payload` exactly; case and surrounding whitespace matter.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload {
            "ON" => Some(LedCommand::On),
            "OFF" => Some(LedCommand::Off),
            "Shake!" => Some(LedCommand::Shake),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LedCommand::On => "ON",
            LedCommand::Off => "OFF",
            LedCommand::Shake => "Shake!",
        }
    }
}

impl fmt::Display for LedCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
