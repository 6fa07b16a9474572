use super::render::RenderOps;
use super::*;
use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

const SAT_PAGE: u8 = 0x20; // VRAM 0x2000

fn new_fb() -> Vec<u32> {
    vec![0; SCREEN_WIDTH * SCREEN_HEIGHT]
}

fn write_solid_tile(ppu: &mut Ppu, tile: usize, color: u8) {
    let byte = (color << 4) | color;
    for i in 0..TILE_BYTES {
        ppu.vram_write(tile * TILE_BYTES + i, byte);
    }
}

fn set_palette_entry(ppu: &mut Ppu, entry: u8, packed: u16) {
    ppu.palette_write_byte(entry * 2, packed as u8);
    ppu.palette_write_byte(entry * 2 + 1, (packed >> 8) as u8);
}

fn write_sat_entry(ppu: &mut Ppu, index: usize, y: u8, x: u8, tile: u16, attr: u8) {
    let base = SAT_PAGE as usize * 256 + index * SAT_ENTRY_BYTES;
    ppu.vram_write(base, y);
    ppu.vram_write(base + 1, x);
    ppu.vram_write(base + 2, tile as u8);
    ppu.vram_write(base + 3, ((tile >> 8) & 0x0F) as u8);
    ppu.vram_write(base + 4, attr);
}

/// Display + sprites on, Plane A on page 4 (transparent), SAT on page 0x20.
fn sprite_ppu() -> Ppu {
    let mut ppu = Ppu::new();
    ppu.io_write(PORT_VDP_CTRL, CTRL_DISPLAY_ENABLE);
    ppu.io_write(PORT_PLANE_A_BASE, 4);
    ppu.io_write(PORT_SPR_CTRL, SPR_CTRL_ENABLE);
    ppu.io_write(PORT_SAT_BASE, SAT_PAGE);
    ppu
}

const RED: u16 = 0x0007;
const GREEN: u16 = 0x0038;
const BLUE: u16 = 0x01C0;

#[test]
fn sat_entry_decodes_per_layout() {
    let mut ppu = sprite_ppu();
    // attr: palette 5, behind, flip X, flip Y
    write_sat_entry(&mut ppu, 7, 100, 200, 0x0ABC, 0x75);
    ppu.begin_scanline(0);

    let entry = ppu.decode_sat_entry(7);
    assert_eq!(entry.y, 100);
    assert_eq!(entry.x, 200);
    assert_eq!(entry.tile, 0x0ABC);
    assert_eq!(entry.palette, 5);
    assert!(entry.behind_plane_a);
    assert!(entry.flip_x);
    assert!(entry.flip_y);
}

#[test]
fn tile_index_high_nibble_is_masked_to_twelve_bits() {
    let mut ppu = sprite_ppu();
    let base = SAT_PAGE as usize * 256 + 3 * SAT_ENTRY_BYTES;
    ppu.vram_write(base + 2, 0xFF);
    ppu.vram_write(base + 3, 0xFF); // upper nibble is reserved attr space
    ppu.begin_scanline(0);

    assert_eq!(ppu.decode_sat_entry(3).tile, 0x0FFF);
}

#[test]
fn selection_follows_wrapping_dy_rule() {
    let mut ppu = sprite_ppu();

    for scanline in [0u16, 5, 100, 191] {
        for y in 0..=255u8 {
            write_sat_entry(&mut ppu, 0, y, 0, 1, 0);
            ppu.begin_scanline(scanline);

            let selection = ppu.evaluate_sprites(scanline);
            let dy = (scanline as u8).wrapping_sub(y);
            let expected = dy < 8;
            assert_eq!(
                selection.count == 1,
                expected,
                "scanline={scanline} y={y} dy={dy}"
            );
        }
    }
}

#[test]
fn sprite_above_top_edge_does_not_wrap_into_line_zero() {
    let mut ppu = sprite_ppu();
    // y = 0xF8: dy at scanline 0 is 8, one past the 8x8 coverage
    write_sat_entry(&mut ppu, 0, 0xF8, 0, 1, 0);
    ppu.begin_scanline(0);
    assert_eq!(ppu.evaluate_sprites(0).count, 0);

    // y = 0xF9 still covers line 0 (dy = 7)
    write_sat_entry(&mut ppu, 0, 0xF9, 0, 1, 0);
    assert_eq!(ppu.evaluate_sprites(0).count, 1);
}

#[test]
fn seventeenth_candidate_sets_overflow_and_is_not_rendered() {
    let mut ppu = sprite_ppu();
    write_solid_tile(&mut ppu, 1, 1);
    set_palette_entry(&mut ppu, 1, RED);
    for i in 0..17 {
        write_sat_entry(&mut ppu, i, 0, (i * 8) as u8, 1, 0);
    }
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    let overflowed = ppu.render_scanline(0, &mut fb);
    assert!(overflowed);
    assert!(ppu.sprite_overflow_latched());

    let red_pixels = fb[..SCREEN_WIDTH]
        .iter()
        .filter(|&&p| p == 0xFFFF_0000)
        .count();
    assert_eq!(red_pixels, 16 * 8);
    // The 17th sprite's span stays at the backdrop color
    assert!(fb[128..136].iter().all(|&p| p == 0xFF00_0000));

    let selection = ppu.evaluate_sprites(0);
    assert_eq!(selection.count as usize, MAX_SPRITES_PER_LINE);
    assert_eq!(selection.indices[0], 0);
    assert_eq!(selection.indices[15], 15);
}

#[test]
fn overflow_latch_survives_until_vblank_start() {
    let mut ppu = sprite_ppu();
    write_solid_tile(&mut ppu, 1, 1);
    for i in 0..17 {
        write_sat_entry(&mut ppu, i, 0, (i * 8) as u8, 1, 0);
    }
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    assert!(ppu.sprite_overflow_latched());

    // The latch holds through the rest of the visible field...
    for line in 1..crate::VBLANK_START_SCANLINE {
        ppu.begin_scanline(line);
        assert!(ppu.sprite_overflow_latched(), "line {line}");
        assert_eq!(ppu.io_read(PORT_SPR_STATUS), 0x01);
    }

    // ...and clears at the start of scanline 192.
    ppu.begin_scanline(crate::VBLANK_START_SCANLINE);
    assert!(!ppu.sprite_overflow_latched());
    assert_eq!(ppu.io_read(PORT_SPR_STATUS), 0x00);
}

#[test]
fn lower_sat_index_wins_overlap() {
    let mut ppu = sprite_ppu();
    write_solid_tile(&mut ppu, 1, 1);
    write_solid_tile(&mut ppu, 2, 2);
    set_palette_entry(&mut ppu, 1, RED);
    set_palette_entry(&mut ppu, 2, GREEN);

    write_sat_entry(&mut ppu, 0, 0, 0, 1, 0);
    write_sat_entry(&mut ppu, 1, 0, 0, 2, 0);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    assert!(fb[..8].iter().all(|&p| p == 0xFFFF_0000));
}

#[test]
fn flip_x_mirrors_source_columns() {
    let mut ppu = sprite_ppu();
    // Tile 1: only pixel (0, y) is color 1
    for row in 0..8 {
        ppu.vram_write(TILE_BYTES + row * 4, 0x10);
    }
    set_palette_entry(&mut ppu, 1, RED);

    write_sat_entry(&mut ppu, 0, 0, 0, 1, 0x20);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    assert_eq!(fb[7], 0xFFFF_0000);
    assert_eq!(fb[0], 0xFF00_0000);
}

#[test]
fn flip_y_mirrors_source_rows() {
    let mut ppu = sprite_ppu();
    // Tile 1: row 0 is color 1, row 7 is color 2
    for col in 0..4 {
        ppu.vram_write(TILE_BYTES + col, 0x11);
        ppu.vram_write(TILE_BYTES + 7 * 4 + col, 0x22);
    }
    set_palette_entry(&mut ppu, 1, RED);
    set_palette_entry(&mut ppu, 2, GREEN);

    write_sat_entry(&mut ppu, 0, 0, 0, 1, 0x40);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    // dy = 0 with flip Y reads source row 7
    assert_eq!(fb[0], 0xFF00_FF00);
}

#[test]
fn behind_flag_yields_to_opaque_plane_a() {
    let mut ppu = sprite_ppu();
    write_solid_tile(&mut ppu, 0, 4); // Plane A opaque everywhere
    write_solid_tile(&mut ppu, 1, 1);
    set_palette_entry(&mut ppu, 1, RED);
    set_palette_entry(&mut ppu, 4, BLUE);

    write_sat_entry(&mut ppu, 0, 0, 0, 1, 0x10);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    assert!(fb[..8].iter().all(|&p| p == 0xFF00_00FF));
}

#[test]
fn behind_flag_shows_where_plane_a_is_transparent() {
    let mut ppu = sprite_ppu();
    write_solid_tile(&mut ppu, 1, 1);
    set_palette_entry(&mut ppu, 1, RED);

    write_sat_entry(&mut ppu, 0, 0, 0, 1, 0x10);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    assert!(fb[..8].iter().all(|&p| p == 0xFFFF_0000));
}

#[test]
fn front_sprite_covers_opaque_plane_a() {
    let mut ppu = sprite_ppu();
    write_solid_tile(&mut ppu, 0, 4);
    write_solid_tile(&mut ppu, 1, 1);
    set_palette_entry(&mut ppu, 1, RED);
    set_palette_entry(&mut ppu, 4, BLUE);

    write_sat_entry(&mut ppu, 0, 0, 0, 1, 0x00);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    assert!(fb[..8].iter().all(|&p| p == 0xFFFF_0000));
}

#[test]
fn color_zero_is_transparent() {
    let mut ppu = sprite_ppu();
    // Tile 1 left as all zeros
    set_palette_entry(&mut ppu, 0, BLUE);
    write_sat_entry(&mut ppu, 0, 0, 0, 1, 0);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    assert!(fb[..8].iter().all(|&p| p == 0xFF00_00FF));
}

#[test]
fn disabled_sprites_never_render() {
    let mut ppu = sprite_ppu();
    ppu.io_write(PORT_SPR_CTRL, 0x00);
    write_solid_tile(&mut ppu, 1, 1);
    set_palette_entry(&mut ppu, 1, RED);
    write_sat_entry(&mut ppu, 0, 0, 0, 1, 0);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    assert!(!ppu.render_scanline(0, &mut fb));
    assert!(fb[..8].iter().all(|&p| p == 0xFF00_0000));
}

#[test]
fn sprite_pixels_wrap_horizontally() {
    let mut ppu = sprite_ppu();
    write_solid_tile(&mut ppu, 1, 1);
    set_palette_entry(&mut ppu, 1, RED);
    write_sat_entry(&mut ppu, 0, 0, 252, 1, 0);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    assert!(fb[252..256].iter().all(|&p| p == 0xFFFF_0000));
    assert!(fb[..4].iter().all(|&p| p == 0xFFFF_0000));
    assert_eq!(fb[4], 0xFF00_0000);
}

#[test]
fn sprite_palette_bank_selects_upper_entries() {
    let mut ppu = sprite_ppu();
    write_solid_tile(&mut ppu, 1, 1);
    // Bank 3, color 1 -> palette entry 0x31
    set_palette_entry(&mut ppu, 0x31, GREEN);
    write_sat_entry(&mut ppu, 0, 0, 0, 1, 0x03);
    ppu.begin_scanline(0);

    let mut fb = new_fb();
    ppu.render_scanline(0, &mut fb);
    assert!(fb[..8].iter().all(|&p| p == 0xFF00_FF00));
}
