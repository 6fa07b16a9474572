use super::*;

#[test]
fn register_writes_stage_until_scanline_start() {
    let mut ppu = Ppu::new();

    ppu.io_write(PORT_VDP_CTRL, 0x03);
    ppu.io_write(PORT_PLANE_A_SCROLL_X, 42);
    ppu.io_write(PORT_PATTERN_BASE, 7);

    assert_eq!(ppu.pending_regs.vdp_ctrl, 0x03);
    assert_eq!(ppu.active_regs.vdp_ctrl, 0x00);
    assert_eq!(ppu.active_regs.plane_a_scroll_x, 0);

    ppu.begin_scanline(5);
    assert_eq!(ppu.active_regs.vdp_ctrl, 0x03);
    assert_eq!(ppu.active_regs.plane_a_scroll_x, 42);
    assert_eq!(ppu.active_regs.pattern_base, 7);
}

#[test]
fn register_reads_return_pending_values() {
    let mut ppu = Ppu::new();

    ppu.io_write(PORT_PLANE_B_BASE, 0x11);
    ppu.io_write(PORT_SAT_BASE, 0x22);

    assert_eq!(ppu.io_read(PORT_PLANE_B_BASE), 0x11);
    assert_eq!(ppu.io_read(PORT_SAT_BASE), 0x22);
}

#[test]
fn sprite_registers_stage_like_main_block() {
    let mut ppu = Ppu::new();

    ppu.io_write(PORT_SPR_CTRL, SPR_CTRL_ENABLE);
    assert_eq!(ppu.active_sprite_regs.spr_ctrl, 0);

    ppu.begin_scanline(0);
    assert_eq!(ppu.active_sprite_regs.spr_ctrl, SPR_CTRL_ENABLE);
}

#[test]
fn vdp_status_tracks_vblank_window() {
    let mut ppu = Ppu::new();
    assert_eq!(ppu.io_read(PORT_VDP_STATUS), 0x00);

    ppu.begin_scanline(crate::VBLANK_START_SCANLINE);
    assert_eq!(ppu.io_read(PORT_VDP_STATUS), 0x01);

    // VBlank persists through the blanking lines
    ppu.begin_scanline(261);
    assert_eq!(ppu.io_read(PORT_VDP_STATUS), 0x01);

    ppu.begin_scanline(0);
    assert_eq!(ppu.io_read(PORT_VDP_STATUS), 0x00);
}

#[test]
fn status_writes_are_ignored() {
    let mut ppu = Ppu::new();
    ppu.io_write(PORT_VDP_STATUS, 0xFF);
    ppu.io_write(PORT_SPR_STATUS, 0xFF);
    assert_eq!(ppu.io_read(PORT_VDP_STATUS), 0x00);
    assert_eq!(ppu.io_read(PORT_SPR_STATUS), 0x00);
}

#[test]
fn unmapped_ppu_ports_float_high() {
    let mut ppu = Ppu::new();
    assert_eq!(ppu.io_read(0x19), 0xFF);
    assert_eq!(ppu.io_read(0x2F), 0xFF);
    ppu.io_write(0x2F, 0x55); // ignored
}

#[test]
fn vram_addresses_wrap() {
    let mut ppu = Ppu::new();
    ppu.vram_write(VRAM_SIZE + 5, 0xAA);
    assert_eq!(ppu.vram_read(5), 0xAA);
    assert_eq!(ppu.vram_read(VRAM_SIZE + 5), 0xAA);
}
