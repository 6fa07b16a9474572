//! Host button latch.
//!
//! The host polls its input source once per frame and pushes the result
//! here; the core only ever reads the latched copy.

use crate::debugger::Debuggable;
use serde::Serialize;
use serde_json::Value;

/// Button state for the SuperZ80 pad.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostButtons {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
    pub start: bool,
    pub select: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DebugState {
    pub buttons: HostButtons,
}

#[derive(Debug, Default)]
pub struct Input {
    buttons: HostButtons,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.buttons = HostButtons::default();
    }

    pub fn set_host_buttons(&mut self, buttons: HostButtons) {
        self.buttons = buttons;
    }

    pub fn buttons(&self) -> HostButtons {
        self.buttons
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            buttons: self.buttons,
        }
    }
}

impl Debuggable for Input {
    fn read_state(&self) -> Value {
        serde_json::to_value(self.debug_state()).unwrap()
    }
}
