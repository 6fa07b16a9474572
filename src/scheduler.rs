//! Fractional-cycle scanline scheduler.
//!
//! `CPU_CYCLES_PER_LINE` is not an integer (~341.3364), so a double
//! accumulator carries the fractional remainder from line to line; each
//! line's budget is the floored accumulator. When the CPU overruns a
//! budget by finishing an instruction, the overshoot becomes cycle debt
//! and is repaid out of subsequent budgets. All floating-point arithmetic
//! is confined to the accumulator and consumed through `floor`, so the
//! long-run total stays within one cycle of `lines x cycles_per_line`.

use crate::debugger::Debuggable;
use crate::{CPU_CYCLES_PER_LINE, TOTAL_SCANLINES};
use serde::Serialize;
use serde_json::Value;

/// Depth of the per-scanline debug ring.
pub const DEBUG_RING_LEN: usize = 512;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanlineRecord {
    pub frame: u64,
    pub scanline: u16,
    pub cycles_this_line: u32,
    pub accumulator_before: f64,
    pub accumulator_after: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugState {
    pub current_scanline: u16,
    pub frame_counter: u64,
    pub cycle_accumulator: f64,
    pub cycle_debt: i64,
    pub total_tstates_executed: u64,
    pub lines_stepped: u64,
    /// Most recent scanline records, oldest first.
    pub recent: Vec<ScanlineRecord>,
}

#[derive(Debug)]
pub struct Scheduler {
    current_scanline: u16,
    frame_counter: u64,
    cycle_accumulator: f64,
    cycle_debt: i64,
    total_tstates_executed: u64,
    lines_stepped: u64,

    ring: Box<[ScanlineRecord; DEBUG_RING_LEN]>,
    ring_head: usize,
    ring_len: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            current_scanline: 0,
            frame_counter: 0,
            cycle_accumulator: 0.0,
            cycle_debt: 0,
            total_tstates_executed: 0,
            lines_stepped: 0,
            ring: Box::new([ScanlineRecord::default(); DEBUG_RING_LEN]),
            ring_head: 0,
            ring_len: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn current_scanline(&self) -> u16 {
        self.current_scanline
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn total_tstates_executed(&self) -> u64 {
        self.total_tstates_executed
    }

    pub fn cycle_accumulator(&self) -> f64 {
        self.cycle_accumulator
    }

    pub fn cycle_debt(&self) -> i64 {
        self.cycle_debt
    }

    pub fn lines_stepped(&self) -> u64 {
        self.lines_stepped
    }

    /// Computes this scanline's CPU budget per the accumulator protocol:
    /// accumulate, floor, then repay as much cycle debt as the line allows.
    pub fn begin_scanline_budget(&mut self) -> u32 {
        let before = self.cycle_accumulator;
        self.cycle_accumulator += CPU_CYCLES_PER_LINE;
        let mut cycles = self.cycle_accumulator.floor() as u32;
        self.cycle_accumulator -= cycles as f64;
        debug_assert!(self.cycle_accumulator >= 0.0 && self.cycle_accumulator < 1.0);

        if self.cycle_debt > 0 {
            let repay = self.cycle_debt.min(cycles as i64) as u32;
            cycles -= repay;
            self.cycle_debt -= repay as i64;
        }

        self.push_record(ScanlineRecord {
            frame: self.frame_counter,
            scanline: self.current_scanline,
            cycles_this_line: cycles,
            accumulator_before: before,
            accumulator_after: self.cycle_accumulator,
        });
        self.lines_stepped += 1;

        cycles
    }

    /// Books the CPU's actual execution; overshoot becomes debt.
    pub fn record_cpu_execution(&mut self, budget: u32, executed: u32) {
        self.total_tstates_executed += executed as u64;
        if executed > budget {
            self.cycle_debt += (executed - budget) as i64;
        }
    }

    /// Advances to the next scanline; returns true on frame wrap.
    pub fn advance_scanline(&mut self) -> bool {
        self.current_scanline += 1;
        if self.current_scanline == TOTAL_SCANLINES {
            self.current_scanline = 0;
            self.frame_counter += 1;
            return true;
        }
        false
    }

    fn push_record(&mut self, record: ScanlineRecord) {
        self.ring[self.ring_head] = record;
        self.ring_head = (self.ring_head + 1) % DEBUG_RING_LEN;
        self.ring_len = (self.ring_len + 1).min(DEBUG_RING_LEN);
    }

    /// Recent scanline records, oldest first.
    pub fn recent_records(&self) -> Vec<ScanlineRecord> {
        (0..self.ring_len)
            .map(|i| {
                let idx = (self.ring_head + DEBUG_RING_LEN - self.ring_len + i) % DEBUG_RING_LEN;
                self.ring[idx]
            })
            .collect()
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            current_scanline: self.current_scanline,
            frame_counter: self.frame_counter,
            cycle_accumulator: self.cycle_accumulator,
            cycle_debt: self.cycle_debt,
            total_tstates_executed: self.total_tstates_executed,
            lines_stepped: self.lines_stepped,
            recent: self.recent_records(),
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Debuggable for Scheduler {
    fn read_state(&self) -> Value {
        serde_json::to_value(self.debug_state()).unwrap()
    }
}
