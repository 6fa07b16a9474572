//! SuperZ80 console facade.
//!
//! Owns the bus (which owns every memory-mapped device), the CPU engine,
//! the scheduler, and the framebuffer, and drives them in the fixed
//! per-scanline order:
//!
//! 1. compute the line's CPU budget (fractional accumulator + debt)
//! 2. scanline-start hook: latch PPU registers, commit palette, VBlank
//!    flag + VBLANK IRQ at line 192, recompute `/INT` pre-CPU
//! 3. run the CPU for the budget (may overshoot by one instruction)
//! 4. recompute `/INT` post-CPU
//! 5. render the scanline if visible (0-191)
//! 6. DMA scanline boundary
//! 7. advance the APU by the line's cycles

use crate::apu::AudioHandle;
use crate::bus::Bus;
use crate::cartridge::RomError;
use crate::cpu::{BudgetCpu, Z80Engine};
use crate::debugger::Debuggable;
use crate::input::HostButtons;
use crate::irq::{IRQ_SPR_OVERFLOW, IRQ_TIMER, IRQ_VBLANK};
use crate::ppu::render::RenderOps;
use crate::scheduler::Scheduler;
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH, TOTAL_SCANLINES, VBLANK_START_SCANLINE};
use log::info;
use serde_json::Value;
use std::path::Path;

/// Scanline of the optional synthetic TIMER trigger (debug hook).
const SYNTHETIC_TIMER_SCANLINE: u16 = 10;

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct DebugState {
    pub scanline: u16,
    pub frame: u64,
    pub powered_on: bool,
}

pub struct SuperZ80 {
    scheduler: Scheduler,
    bus: Bus,
    cpu: Box<dyn Z80Engine>,
    framebuffer: Vec<u32>,
    audio: AudioHandle,
    powered_on: bool,

    /// Opt-in debug hook: raise TIMER at scanline 10 once per frame.
    synthetic_timer: bool,
    synthetic_fired_this_frame: bool,
}

impl SuperZ80 {
    /// Console with the budget-exact test engine.
    pub fn new() -> Self {
        Self::with_engine(Box::new(BudgetCpu::new()))
    }

    /// Console with an external Z80 engine.
    pub fn with_engine(cpu: Box<dyn Z80Engine>) -> Self {
        let bus = Bus::new();
        let audio = bus.apu.audio_handle();
        Self {
            scheduler: Scheduler::new(),
            bus,
            cpu,
            framebuffer: Vec::new(),
            audio,
            powered_on: false,
            synthetic_timer: false,
            synthetic_fired_this_frame: false,
        }
    }

    /// Allocates the framebuffer and brings every component to its
    /// post-reset state.
    pub fn power_on(&mut self) -> bool {
        self.framebuffer = vec![0xFF00_0000; SCREEN_WIDTH * SCREEN_HEIGHT];
        self.reset();
        self.powered_on = true;
        info!("console: power on, framebuffer {}x{}", SCREEN_WIDTH, SCREEN_HEIGHT);
        true
    }

    /// Reinitializes component state. Allocations and the loaded ROM
    /// persist.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.bus.reset();
        self.cpu.reset();
        self.synthetic_fired_this_frame = false;
    }

    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<(), RomError> {
        self.bus.cartridge.load(bytes)
    }

    pub fn load_rom_from_path(&mut self, path: &Path) -> Result<(), RomError> {
        self.bus.cartridge.load_from_path(path)
    }

    pub fn set_host_buttons(&mut self, buttons: HostButtons) {
        self.bus.input.set_host_buttons(buttons);
    }

    /// Enables the synthetic TIMER trigger (a debug-only scheduler hook;
    /// off by default).
    pub fn set_synthetic_timer(&mut self, enabled: bool) {
        self.synthetic_timer = enabled;
    }

    /// Advances exactly one frame (262 scanlines).
    pub fn step_frame(&mut self) {
        for _ in 0..TOTAL_SCANLINES {
            self.step_scanline();
        }
    }

    /// Advances exactly one scanline through the fixed execution order.
    pub fn step_scanline(&mut self) {
        let scanline = self.scheduler.current_scanline();
        let budget = self.scheduler.begin_scanline_budget();

        self.on_scanline_start(scanline);

        let executed = self.cpu.step(&mut self.bus, budget);
        self.scheduler.record_cpu_execution(budget, executed);

        // Post-CPU: an ACK or enable change during the slice must drop or
        // raise the level before anything else observes it.
        self.bus.irq.post_cpu_update();
        self.cpu.set_int_line(self.bus.irq.int_line_asserted());

        if (scanline as usize) < SCREEN_HEIGHT {
            let overflowed = self
                .bus
                .ppu
                .render_scanline(scanline, &mut self.framebuffer);
            if overflowed {
                self.bus.irq.raise(IRQ_SPR_OVERFLOW);
            }
        }

        let vblank = self.bus.ppu.vblank_flag();
        self.bus
            .tick_dma(scanline, vblank, self.scheduler.frame_counter());

        self.bus.apu.advance(budget);

        if self.scheduler.advance_scanline() {
            self.synthetic_fired_this_frame = false;
        }
    }

    fn on_scanline_start(&mut self, scanline: u16) {
        self.bus.ppu.set_current_frame(self.scheduler.frame_counter());
        self.bus.ppu.begin_scanline(scanline);

        if scanline == VBLANK_START_SCANLINE {
            self.bus.irq.raise(IRQ_VBLANK);
        }

        if self.synthetic_timer
            && scanline == SYNTHETIC_TIMER_SCANLINE
            && !self.synthetic_fired_this_frame
        {
            self.bus.irq.raise(IRQ_TIMER);
            self.synthetic_fired_this_frame = true;
        }

        self.bus.irq.pre_cpu_update();
        self.cpu.set_int_line(self.bus.irq.int_line_asserted());
    }

    /// ARGB8888 framebuffer, row-major 256x192. Empty before `power_on`.
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    /// Consumer side of the audio ring; safe to call from the host audio
    /// thread via [`SuperZ80::audio_handle`].
    pub fn pop_audio_frames(&self, out_interleaved_lr: &mut [i16]) -> usize {
        self.audio.pop_frames(out_interleaved_lr)
    }

    /// Cloneable handle for the host audio callback thread.
    pub fn audio_handle(&self) -> AudioHandle {
        self.audio.clone()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            scanline: self.scheduler.current_scanline(),
            frame: self.scheduler.frame_counter(),
            powered_on: self.powered_on,
        }
    }

    pub fn scheduler_debug(&self) -> crate::scheduler::DebugState {
        self.scheduler.debug_state()
    }

    pub fn bus_debug(&self) -> crate::bus::DebugState {
        self.bus.debug_state()
    }

    pub fn irq_debug(&self) -> crate::irq::DebugState {
        self.bus.irq.debug_state()
    }

    pub fn ppu_debug(&self) -> crate::ppu::DebugState {
        self.bus.ppu.debug_state()
    }

    pub fn apu_debug(&self) -> crate::apu::DebugState {
        self.bus.apu.debug_state()
    }

    pub fn dma_debug(&self) -> crate::dma::DebugState {
        self.bus.dma.debug_state()
    }

    pub fn cartridge_debug(&self) -> crate::cartridge::DebugState {
        self.bus.cartridge.debug_state()
    }

    pub fn input_debug(&self) -> crate::input::DebugState {
        self.bus.input.debug_state()
    }

    pub fn cpu_debug(&self) -> crate::cpu::DebugState {
        self.cpu.debug_state()
    }
}

impl Default for SuperZ80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Debuggable for SuperZ80 {
    fn read_state(&self) -> Value {
        serde_json::to_value(self.debug_state()).unwrap()
    }
}
