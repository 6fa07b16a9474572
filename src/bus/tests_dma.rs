//! DMA transfers executed through the bus (seed scenario S5 and the
//! boundary behaviors around wrapping and palette destinations).

use super::*;
use crate::dma::{CTRL_DST_IS_PALETTE, CTRL_QUEUE_IF_NOT_VBLANK, CTRL_START};
use crate::irq::IRQ_DMA_DONE;
use crate::ppu::VRAM_SIZE;

fn program_dma(bus: &mut Bus, src: u16, dst: u16, len: u16, ctrl: u8) {
    bus.io_out8(0x30, src as u8);
    bus.io_out8(0x31, (src >> 8) as u8);
    bus.io_out8(0x32, dst as u8);
    bus.io_out8(0x33, (dst >> 8) as u8);
    bus.io_out8(0x34, len as u8);
    bus.io_out8(0x35, (len >> 8) as u8);
    bus.io_out8(0x36, ctrl);
}

/// Drives the PPU into its VBlank window.
fn enter_vblank(bus: &mut Bus) {
    bus.ppu.begin_scanline(crate::VBLANK_START_SCANLINE);
}

#[test]
fn vram_copy_from_work_ram() {
    let mut bus = Bus::new();
    for (i, byte) in [0x01u8, 0x02, 0x03, 0x04].iter().enumerate() {
        bus.write8(0xC000 + i as u16, *byte);
    }
    enter_vblank(&mut bus);

    program_dma(&mut bus, 0xC000, 0x0100, 4, CTRL_START);
    bus.tick_dma(200, true, 0);

    for i in 0..4 {
        assert_eq!(bus.ppu.vram_read(0x0100 + i), (i + 1) as u8);
    }
}

#[test]
fn illegal_start_leaves_vram_untouched() {
    let mut bus = Bus::new();
    for i in 0..4u16 {
        bus.write8(0xC000 + i, 0x50 + i as u8);
    }

    program_dma(&mut bus, 0xC000, 0x0100, 4, CTRL_START);
    bus.tick_dma(50, false, 0);

    for i in 0..4 {
        assert_eq!(bus.ppu.vram_read(0x0100 + i), 0x00);
    }
    assert!(bus.dma.last_illegal_start());
}

#[test]
fn source_reads_go_through_the_bus() {
    let mut bus = Bus::new();
    bus.write8(0xC000, 0xAB);
    let reads_before = bus.counters().mem_reads;
    enter_vblank(&mut bus);

    program_dma(&mut bus, 0xC000, 0x0000, 1, CTRL_START);
    bus.tick_dma(200, true, 0);

    assert_eq!(bus.counters().mem_reads, reads_before + 1);
    assert_eq!(bus.ppu.vram_read(0), 0xAB);
}

#[test]
fn open_bus_source_copies_ff() {
    let mut bus = Bus::new();
    enter_vblank(&mut bus);

    program_dma(&mut bus, 0x8000, 0x0000, 2, CTRL_START);
    bus.tick_dma(200, true, 0);

    assert_eq!(bus.ppu.vram_read(0), 0xFF);
    assert_eq!(bus.ppu.vram_read(1), 0xFF);
}

#[test]
fn destination_wraps_modulo_vram_size() {
    let mut bus = Bus::new();
    bus.write8(0xC000, 0x11);
    bus.write8(0xC001, 0x22);
    enter_vblank(&mut bus);

    let dst = (VRAM_SIZE - 1) as u16;
    program_dma(&mut bus, 0xC000, dst, 2, CTRL_START);
    bus.tick_dma(200, true, 0);

    assert_eq!(bus.ppu.vram_read(VRAM_SIZE - 1), 0x11);
    assert_eq!(bus.ppu.vram_read(0), 0x22);
}

#[test]
fn palette_destination_writes_staged_bytes() {
    let mut bus = Bus::new();
    bus.write8(0xC000, 0x07); // entry 8 low byte: pure red
    bus.write8(0xC001, 0x00);
    enter_vblank(&mut bus);

    program_dma(&mut bus, 0xC000, 0x0010, 2, CTRL_START | CTRL_DST_IS_PALETTE);
    bus.tick_dma(200, true, 0);

    assert_eq!(bus.ppu.staged_palette()[8], 0x0007);
    // VRAM was never touched
    assert_eq!(bus.ppu.vram_read(0x0010), 0x00);
}

#[test]
fn palette_destination_wraps_modulo_aperture() {
    let mut bus = Bus::new();
    bus.write8(0xC000, 0x01);
    bus.write8(0xC001, 0x05);
    enter_vblank(&mut bus);

    // dst 0xFF: last aperture byte, then wraps to byte 0
    program_dma(&mut bus, 0xC000, 0x00FF, 2, CTRL_START | CTRL_DST_IS_PALETTE);
    bus.tick_dma(200, true, 0);

    assert_eq!(bus.ppu.staged_palette()[127], 0x0100);
    assert_eq!(bus.ppu.staged_palette()[0], 0x0005);
}

#[test]
fn completed_transfer_raises_dma_done() {
    let mut bus = Bus::new();
    enter_vblank(&mut bus);

    program_dma(&mut bus, 0xC000, 0x0000, 1, CTRL_START);
    bus.tick_dma(200, true, 7);

    assert_ne!(bus.irq.read_status() & IRQ_DMA_DONE, 0);
    assert_eq!(bus.dma.debug_state().last_exec_frame, 7);
}

#[test]
fn queued_copy_lands_at_vblank_start() {
    let mut bus = Bus::new();
    bus.write8(0xC000, 0x99);

    program_dma(&mut bus, 0xC000, 0x0040, 1, CTRL_START | CTRL_QUEUE_IF_NOT_VBLANK);
    bus.tick_dma(50, false, 0);
    assert_eq!(bus.ppu.vram_read(0x0040), 0x00);

    enter_vblank(&mut bus);
    bus.tick_dma(crate::VBLANK_START_SCANLINE, true, 0);
    assert_eq!(bus.ppu.vram_read(0x0040), 0x99);
    assert!(bus.dma.debug_state().last_trigger_was_queued);
}
