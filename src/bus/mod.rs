//! Memory and I/O address decode.
//!
//! The bus owns every memory-mapped device and is the single place where a
//! CPU-visible address turns into a device operation. It also keeps the
//! per-region access counters and the last-access trace the debug panels
//! read.
//!
//! ## Memory map (16-bit address space)
//!
//! | Range           | Target                                  |
//! |:----------------|:----------------------------------------|
//! | 0x0000-0x7FFF   | ROM (reads past image length are 0xFF)  |
//! | 0x8000-0xBFFF   | Open bus (reads 0xFF, writes ignored)   |
//! | 0xC000-0xFFFF   | 16 KiB work RAM                         |
//!
//! ## I/O map (8-bit port space)
//!
//! | Range       | Target                                      |
//! |:------------|:--------------------------------------------|
//! | 0x10-0x1F   | PPU registers / palette aperture            |
//! | 0x20-0x2F   | Sprite registers (and reserved)             |
//! | 0x30-0x36   | DMA registers                               |
//! | 0x60-0x7D   | APU registers                               |
//! | 0x80        | IRQ status (R)                              |
//! | 0x81        | IRQ enable (R/W)                            |
//! | 0x82        | IRQ ack (W1C)                               |

use crate::apu::Apu;
use crate::cartridge::Cartridge;
use crate::debugger::Debuggable;
use crate::dma::{DmaEngine, Transfer};
use crate::input::Input;
use crate::irq::{self, IrqController, IRQ_DMA_DONE};
use crate::ppu::Ppu;
use serde::Serialize;
use serde_json::Value;

pub const ROM_START: u16 = 0x0000;
pub const ROM_END: u16 = 0x7FFF;
pub const WRAM_START: u16 = 0xC000;
pub const WRAM_END: u16 = 0xFFFF;
pub const WRAM_SIZE: usize = 0x4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessKind {
    Mem,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessRw {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BusTarget {
    Rom,
    WorkRam,
    OpenBus,
    Io,
}

/// Trace of the most recent bus access.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LastAccess {
    pub kind: AccessKind,
    pub rw: AccessRw,
    pub addr: u16,
    pub value: u8,
    pub target: BusTarget,
}

impl Default for LastAccess {
    fn default() -> Self {
        Self {
            kind: AccessKind::Mem,
            rw: AccessRw::Read,
            addr: 0,
            value: 0,
            target: BusTarget::OpenBus,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Counters {
    pub mem_reads: u64,
    pub mem_writes: u64,
    pub rom_reads: u64,
    pub rom_writes_ignored: u64,
    pub ram_reads: u64,
    pub ram_writes: u64,
    pub open_bus_reads: u64,
    pub open_bus_writes_ignored: u64,
    pub io_reads: u64,
    pub io_writes: u64,
    pub io_reads_ff: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DebugState {
    pub rom_loaded: bool,
    pub rom_size: usize,
    pub counters: Counters,
    pub last_access: LastAccess,
}

/// The ownership hub: every memory-mapped device lives here.
#[derive(Debug)]
pub struct Bus {
    pub cartridge: Cartridge,
    work_ram: [u8; WRAM_SIZE],
    pub ppu: Ppu,
    pub apu: Apu,
    pub dma: DmaEngine,
    pub irq: IrqController,
    pub input: Input,

    counters: Counters,
    last_access: LastAccess,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            cartridge: Cartridge::new(),
            work_ram: [0; WRAM_SIZE],
            ppu: Ppu::new(),
            apu: Apu::new(),
            dma: DmaEngine::new(),
            irq: IrqController::new(),
            input: Input::new(),
            counters: Counters::default(),
            last_access: LastAccess::default(),
        }
    }

    /// Reinitializes all devices. The loaded ROM persists.
    pub fn reset(&mut self) {
        self.cartridge.reset();
        self.work_ram = [0; WRAM_SIZE];
        self.ppu.reset();
        self.apu.reset();
        self.dma.reset();
        self.irq.reset();
        self.input.reset();
        self.counters = Counters::default();
        self.last_access = LastAccess::default();
    }

    pub fn read8(&mut self, addr: u16) -> u8 {
        self.counters.mem_reads += 1;
        if addr <= ROM_END {
            let value = self.cartridge.read(addr);
            self.counters.rom_reads += 1;
            self.trace_mem(AccessRw::Read, addr, value, BusTarget::Rom);
            return value;
        }
        if addr >= WRAM_START {
            let value = self.work_ram[(addr - WRAM_START) as usize];
            self.counters.ram_reads += 1;
            self.trace_mem(AccessRw::Read, addr, value, BusTarget::WorkRam);
            return value;
        }
        self.counters.open_bus_reads += 1;
        self.trace_mem(AccessRw::Read, addr, 0xFF, BusTarget::OpenBus);
        0xFF
    }

    pub fn write8(&mut self, addr: u16, value: u8) {
        self.counters.mem_writes += 1;
        if addr <= ROM_END {
            self.counters.rom_writes_ignored += 1;
            self.trace_mem(AccessRw::Write, addr, value, BusTarget::Rom);
            return;
        }
        if addr >= WRAM_START {
            self.work_ram[(addr - WRAM_START) as usize] = value;
            self.counters.ram_writes += 1;
            self.trace_mem(AccessRw::Write, addr, value, BusTarget::WorkRam);
            return;
        }
        self.counters.open_bus_writes_ignored += 1;
        self.trace_mem(AccessRw::Write, addr, value, BusTarget::OpenBus);
    }

    pub fn io_in8(&mut self, port: u8) -> u8 {
        self.counters.io_reads += 1;
        let value = match port {
            0x10..=0x2F => self.ppu.io_read(port),
            0x30..=0x36 => self.dma.read_reg(port),
            0x60..=0x7D => self.apu.io_read(port),
            irq::PORT_IRQ_STATUS => self.irq.read_status(),
            irq::PORT_IRQ_ENABLE => self.irq.read_enable(),
            _ => 0xFF,
        };
        if value == 0xFF {
            self.counters.io_reads_ff += 1;
        }
        self.last_access = LastAccess {
            kind: AccessKind::Io,
            rw: AccessRw::Read,
            addr: port as u16,
            value,
            target: BusTarget::Io,
        };
        value
    }

    pub fn io_out8(&mut self, port: u8, value: u8) {
        self.counters.io_writes += 1;
        match port {
            0x10..=0x2F => self.ppu.io_write(port, value),
            0x30..=0x36 => self.dma.write_reg(port, value),
            0x60..=0x7D => self.apu.io_write(port, value),
            irq::PORT_IRQ_ENABLE => self.irq.write_enable(value),
            irq::PORT_IRQ_ACK => {
                self.irq.ack(value);
                self.irq.post_cpu_update();
            }
            _ => {}
        }
        self.last_access = LastAccess {
            kind: AccessKind::Io,
            rw: AccessRw::Write,
            addr: port as u16,
            value,
            target: BusTarget::Io,
        };
    }

    /// Scanline-boundary DMA processing: asks the engine for a decision
    /// and carries out the block copy.
    pub fn tick_dma(&mut self, scanline: u16, vblank: bool, frame: u64) {
        if let Some(transfer) = self.dma.on_scanline_boundary(scanline, vblank) {
            self.execute_dma(transfer, frame, scanline);
        }
    }

    /// Atomic block copy: source bytes are read through the bus (and
    /// counted like CPU accesses); destinations wrap modulo their
    /// container's size.
    fn execute_dma(&mut self, transfer: Transfer, frame: u64, scanline: u16) {
        for i in 0..transfer.len {
            let byte = self.read8(transfer.src.wrapping_add(i));
            if transfer.dst_is_palette {
                self.ppu
                    .palette_write_byte((transfer.dst.wrapping_add(i) & 0xFF) as u8, byte);
            } else {
                self.ppu
                    .vram_write(transfer.dst as usize + i as usize, byte);
            }
        }
        self.dma.record_execution(transfer, frame, scanline);
        self.irq.raise(IRQ_DMA_DONE);
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn last_access(&self) -> LastAccess {
        self.last_access
    }

    /// Direct work-RAM view for determinism checks and debug panels.
    pub fn work_ram(&self) -> &[u8; WRAM_SIZE] {
        &self.work_ram
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            rom_loaded: self.cartridge.is_loaded(),
            rom_size: self.cartridge.rom_len(),
            counters: self.counters,
            last_access: self.last_access,
        }
    }

    fn trace_mem(&mut self, rw: AccessRw, addr: u16, value: u8, target: BusTarget) {
        self.last_access = LastAccess {
            kind: AccessKind::Mem,
            rw,
            addr,
            value,
            target,
        };
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Debuggable for Bus {
    fn read_state(&self) -> Value {
        serde_json::to_value(self.debug_state()).unwrap()
    }
}


#[cfg(test)]
mod tests_dma;

#[cfg(test)]
mod tests_property;
