use super::*;

#[test]
fn pal_data_auto_increments() {
    let mut ppu = Ppu::new();

    ppu.io_write(PORT_PAL_ADDR, 0x02); // entry 1, low byte
    ppu.io_write(PORT_PAL_DATA, 0x07);
    ppu.io_write(PORT_PAL_DATA, 0x01); // entry 1, high byte

    assert_eq!(ppu.staged_palette()[1], 0x0107);
    assert_eq!(ppu.io_read(PORT_PAL_ADDR), 0x04);
}

#[test]
fn pal_data_reads_auto_increment_too() {
    let mut ppu = Ppu::new();
    ppu.io_write(PORT_PAL_ADDR, 0x02);
    ppu.io_write(PORT_PAL_DATA, 0x34);
    ppu.io_write(PORT_PAL_DATA, 0x01);

    ppu.io_write(PORT_PAL_ADDR, 0x02);
    assert_eq!(ppu.io_read(PORT_PAL_DATA), 0x34);
    assert_eq!(ppu.io_read(PORT_PAL_DATA), 0x01);
    assert_eq!(ppu.io_read(PORT_PAL_ADDR), 0x04);
}

#[test]
fn pal_addr_wraps_at_aperture_end() {
    let mut ppu = Ppu::new();
    ppu.io_write(PORT_PAL_ADDR, 0xFF);
    ppu.io_write(PORT_PAL_DATA, 0x01); // entry 127, high byte
    assert_eq!(ppu.io_read(PORT_PAL_ADDR), 0x00);
    assert_eq!(ppu.staged_palette()[127], 0x0100);
}

#[test]
fn high_byte_respects_nine_bit_mask() {
    let mut ppu = Ppu::new();

    ppu.palette_write_byte(0x01, 0xFF);
    assert_eq!(ppu.palette_read_byte(0x01), 0x01);
    assert_eq!(ppu.staged_palette()[0], 0x0100);

    ppu.palette_write_byte(0x00, 0xFF);
    assert_eq!(ppu.palette_read_byte(0x00), 0xFF);
    assert_eq!(ppu.staged_palette()[0], 0x01FF);
}

#[test]
fn staged_writes_invisible_until_commit() {
    let mut ppu = Ppu::new();

    // Entry 1 := pure red (9-bit R in bits 0-2)
    ppu.palette_write_byte(0x02, 0x07);
    ppu.palette_write_byte(0x03, 0x00);

    assert_eq!(ppu.active_palette()[1], 0x0000);
    assert_eq!(ppu.active_argb()[1], 0xFF00_0000);

    ppu.begin_scanline(10);
    assert_eq!(ppu.active_palette()[1], 0x0007);
    assert_eq!(ppu.active_argb()[1], 0xFFFF_0000);
}

#[test]
fn commit_runs_on_every_scanline() {
    let mut ppu = Ppu::new();

    for line in [0u16, 50, 191, 192, 261] {
        ppu.palette_write_byte(0x00, line as u8 & 0x07);
        ppu.begin_scanline(line);
        assert_eq!(ppu.active_palette(), ppu.staged_palette());
    }
}

#[test]
fn expansion_hits_channel_extremes() {
    assert_eq!(expand_palette_entry(0x0000), 0xFF00_0000);
    assert_eq!(expand_palette_entry(0x0007), 0xFFFF_0000); // R max
    assert_eq!(expand_palette_entry(0x0038), 0xFF00_FF00); // G max
    assert_eq!(expand_palette_entry(0x01C0), 0xFF00_00FF); // B max
    assert_eq!(expand_palette_entry(0x01FF), 0xFFFF_FFFF);
}

#[test]
fn expansion_scales_midpoints() {
    // c8 = c3 * 255 / 7; c3 = 3 -> 109
    assert_eq!(expand_palette_entry(0x0003), 0xFF6D_0000);
    // Bits 9-15 are ignored
    assert_eq!(expand_palette_entry(0xFE00), 0xFF00_0000);
}
