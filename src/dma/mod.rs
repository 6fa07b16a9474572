//! VBlank-gated DMA engine.
//!
//! Seven programmable registers describe a block copy from CPU-visible
//! memory into VRAM or palette RAM. The START bit is edge-triggered and
//! auto-clears at the next scanline boundary; legality is phase-locked to
//! VBlank. A request issued mid-frame is either queued for the next VBlank
//! start (last write wins) or dropped with a debug flag, never executed
//! mid-render. Transfers are atomic in emulated time, so BUSY reads as 0.

use crate::debugger::Debuggable;
use serde::Serialize;
use serde_json::Value;

// DMA_CTRL register bits
pub const CTRL_START: u8 = 0x01;
pub const CTRL_QUEUE_IF_NOT_VBLANK: u8 = 0x02;
pub const CTRL_DST_IS_PALETTE: u8 = 0x08;
pub const CTRL_BUSY: u8 = 0x80;

// DMA I/O ports
pub const PORT_SRC_LO: u8 = 0x30;
pub const PORT_SRC_HI: u8 = 0x31;
pub const PORT_DST_LO: u8 = 0x32;
pub const PORT_DST_HI: u8 = 0x33;
pub const PORT_LEN_LO: u8 = 0x34;
pub const PORT_LEN_HI: u8 = 0x35;
pub const PORT_CTRL: u8 = 0x36;

/// A block-copy decision handed to the bus for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transfer {
    pub src: u16,
    pub dst: u16,
    pub len: u16,
    pub dst_is_palette: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DebugState {
    pub src: u16,
    pub dst: u16,
    pub len: u16,
    pub ctrl: u8,
    pub queue_enabled: bool,
    pub dst_is_palette: bool,

    pub queued_valid: bool,
    pub queued_src: u16,
    pub queued_dst: u16,
    pub queued_len: u16,
    pub queued_dst_is_palette: bool,

    pub last_exec_frame: i64,
    pub last_exec_scanline: i32,
    pub last_trigger_was_queued: bool,
    pub last_exec_was_palette: bool,

    pub last_illegal_start: bool,
}

#[derive(Debug, Default)]
pub struct DmaEngine {
    src_lo: u8,
    src_hi: u8,
    dst_lo: u8,
    dst_hi: u8,
    len_lo: u8,
    len_hi: u8,
    ctrl: u8,

    /// Queued request slot; last write wins.
    queued: Option<Transfer>,

    last_exec_frame: i64,
    last_exec_scanline: i32,
    last_trigger_was_queued: bool,
    last_exec_was_palette: bool,

    last_illegal_start: bool,
}

impl DmaEngine {
    pub fn new() -> Self {
        Self {
            last_exec_frame: -1,
            last_exec_scanline: -1,
            ..Default::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn read_reg(&self, port: u8) -> u8 {
        match port {
            PORT_SRC_LO => self.src_lo,
            PORT_SRC_HI => self.src_hi,
            PORT_DST_LO => self.dst_lo,
            PORT_DST_HI => self.dst_hi,
            PORT_LEN_LO => self.len_lo,
            PORT_LEN_HI => self.len_hi,
            // START reads as 0 (edge trigger), BUSY reads as 0 (transfers
            // are instantaneous in emulated time).
            PORT_CTRL => self.ctrl & CTRL_QUEUE_IF_NOT_VBLANK,
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, port: u8, value: u8) {
        match port {
            PORT_SRC_LO => self.src_lo = value,
            PORT_SRC_HI => self.src_hi = value,
            PORT_DST_LO => self.dst_lo = value,
            PORT_DST_HI => self.dst_hi = value,
            PORT_LEN_LO => self.len_lo = value,
            PORT_LEN_HI => self.len_hi = value,
            // The START trigger is sampled at the next scanline boundary.
            PORT_CTRL => self.ctrl = value,
            _ => {}
        }
    }

    /// Scanline-boundary decision. Returns a transfer for the bus to carry
    /// out, or `None` when nothing may run on this line.
    pub fn on_scanline_boundary(&mut self, scanline: u16, vblank: bool) -> Option<Transfer> {
        // A queued request drains exactly at the VBlank start line.
        if scanline == crate::VBLANK_START_SCANLINE && vblank {
            if let Some(queued) = self.queued.take() {
                self.last_trigger_was_queued = true;
                return Some(queued);
            }
        }

        if (self.ctrl & CTRL_START) == 0 {
            return None;
        }
        self.ctrl &= !CTRL_START;

        let transfer = Transfer {
            src: u16::from_le_bytes([self.src_lo, self.src_hi]),
            dst: u16::from_le_bytes([self.dst_lo, self.dst_hi]),
            len: u16::from_le_bytes([self.len_lo, self.len_hi]),
            dst_is_palette: (self.ctrl & CTRL_DST_IS_PALETTE) != 0,
        };

        if transfer.len == 0 {
            return None;
        }

        if vblank {
            self.last_trigger_was_queued = false;
            self.last_illegal_start = false;
            Some(transfer)
        } else if (self.ctrl & CTRL_QUEUE_IF_NOT_VBLANK) != 0 {
            self.queued = Some(transfer);
            self.last_illegal_start = false;
            None
        } else {
            self.last_illegal_start = true;
            None
        }
    }

    /// Bookkeeping after the bus finished a transfer.
    pub fn record_execution(&mut self, transfer: Transfer, frame: u64, scanline: u16) {
        self.last_exec_frame = frame as i64;
        self.last_exec_scanline = scanline as i32;
        self.last_exec_was_palette = transfer.dst_is_palette;
    }

    pub fn last_illegal_start(&self) -> bool {
        self.last_illegal_start
    }

    pub fn queued_request(&self) -> Option<Transfer> {
        self.queued
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            src: u16::from_le_bytes([self.src_lo, self.src_hi]),
            dst: u16::from_le_bytes([self.dst_lo, self.dst_hi]),
            len: u16::from_le_bytes([self.len_lo, self.len_hi]),
            ctrl: self.ctrl,
            queue_enabled: (self.ctrl & CTRL_QUEUE_IF_NOT_VBLANK) != 0,
            dst_is_palette: (self.ctrl & CTRL_DST_IS_PALETTE) != 0,
            queued_valid: self.queued.is_some(),
            queued_src: self.queued.map_or(0, |q| q.src),
            queued_dst: self.queued.map_or(0, |q| q.dst),
            queued_len: self.queued.map_or(0, |q| q.len),
            queued_dst_is_palette: self.queued.is_some_and(|q| q.dst_is_palette),
            last_exec_frame: self.last_exec_frame,
            last_exec_scanline: self.last_exec_scanline,
            last_trigger_was_queued: self.last_trigger_was_queued,
            last_exec_was_palette: self.last_exec_was_palette,
            last_illegal_start: self.last_illegal_start,
        }
    }
}

impl Debuggable for DmaEngine {
    fn read_state(&self) -> Value {
        serde_json::to_value(self.debug_state()).unwrap()
    }
}

#[cfg(test)]
mod tests;
