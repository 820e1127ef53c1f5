//! Operation — the four reconciliation entry points.

use std::fmt;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Launch every stream that has no session yet.
    Start,

    /// Quit every running stream session.
    Stop,

    /// Stop, wait for the display to release its layers, start.
    Restart,

    /// Relaunch streams whose display layer is missing.
    Repair,
}


impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Restart => "restart",
            Operation::Repair => "repair",
        }
    }

    /// Whether the operation launches players and so needs a grid layout.
    pub fn needs_layout(&self) -> bool {
        !matches!(self, Operation::Stop)
    }
}


impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
