//! Level-sensitive interrupt controller.
//!
//! Five latched sources feed one `/INT` line. The line is never edge
//! buffered: it is always recomputed as `(pending & enable) != 0`, so an
//! acknowledge or an enable-mask change drops it in the same step.

use crate::debugger::Debuggable;
use serde::Serialize;
use serde_json::Value;

// IRQ source bits
pub const IRQ_VBLANK: u8 = 0x01;
pub const IRQ_TIMER: u8 = 0x02;
pub const IRQ_SCANLINE: u8 = 0x04;
pub const IRQ_SPR_OVERFLOW: u8 = 0x08;
pub const IRQ_DMA_DONE: u8 = 0x10;

// IRQ I/O ports
pub const PORT_IRQ_STATUS: u8 = 0x80;
pub const PORT_IRQ_ENABLE: u8 = 0x81;
pub const PORT_IRQ_ACK: u8 = 0x82;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DebugState {
    pub pending: u8,
    pub enable: u8,
    pub int_line_asserted: bool,
}

/// Pending/enable bitmask controller driving the CPU's `/INT` input.
#[derive(Debug, Default)]
pub struct IrqController {
    pending: u8,
    enable: u8,
    int_line: bool,
}

impl IrqController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears pending sources, masks everything, and deasserts `/INT`.
    pub fn reset(&mut self) {
        self.pending = 0;
        self.enable = 0;
        self.int_line = false;
    }

    /// Latches pending bits (OR-in), regardless of the enable mask.
    ///
    /// Does not recompute `/INT`; the surrounding scheduler step does.
    pub fn raise(&mut self, mask: u8) {
        self.pending |= mask;
    }

    /// Write-1-to-clear acknowledge. Recomputes `/INT` immediately so an
    /// ACK drops the line without waiting for the next scheduler update.
    pub fn ack(&mut self, w1c_mask: u8) {
        self.pending &= !w1c_mask;
        self.recompute_int_line();
    }

    /// Latched status read; no side effects, never auto-clears.
    pub fn read_status(&self) -> u8 {
        self.pending
    }

    pub fn read_enable(&self) -> u8 {
        self.enable
    }

    /// Replaces the enable mask and recomputes `/INT` immediately.
    pub fn write_enable(&mut self, mask: u8) {
        self.enable = mask;
        self.recompute_int_line();
    }

    /// Recompute `/INT` before the CPU runs a scanline slice.
    pub fn pre_cpu_update(&mut self) {
        self.recompute_int_line();
    }

    /// Recompute `/INT` after the CPU ran, so I/O-driven ACK or enable
    /// changes made during the slice are observable before the next step.
    pub fn post_cpu_update(&mut self) {
        self.recompute_int_line();
    }

    pub fn int_line_asserted(&self) -> bool {
        self.int_line
    }

    fn recompute_int_line(&mut self) {
        self.int_line = (self.pending & self.enable) != 0;
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            pending: self.pending,
            enable: self.enable,
            int_line_asserted: self.int_line,
        }
    }
}

impl Debuggable for IrqController {
    fn read_state(&self) -> Value {
        serde_json::to_value(self.debug_state()).unwrap()
    }
}
