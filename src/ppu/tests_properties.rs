//! PPU property-based tests.

use super::render::RenderOps;
use super::*;
use proptest::prelude::*;

proptest! {
    /// Palette byte read-after-write returns the written byte, with the
    /// 9-bit mask applied to high-byte positions.
    #[test]
    fn palette_byte_roundtrip(addr in any::<u8>(), value in any::<u8>()) {
        let mut ppu = Ppu::new();
        ppu.palette_write_byte(addr, value);

        let expected = if addr & 1 == 0 { value } else { value & 0x01 };
        prop_assert_eq!(ppu.palette_read_byte(addr), expected);
    }

    /// Expanded colors always carry full alpha and only touch channel bits
    /// from the low 9 packed bits.
    #[test]
    fn palette_expansion_is_well_formed(packed in any::<u16>()) {
        let argb = expand_palette_entry(packed);
        prop_assert_eq!(argb & 0xFF00_0000, 0xFF00_0000);
        prop_assert_eq!(argb, expand_palette_entry(packed & 0x01FF));
    }

    /// VRAM accesses wrap modulo the VRAM size and never fault.
    #[test]
    fn vram_wraps_modulo_size(addr in 0usize..(3 * VRAM_SIZE), value in any::<u8>()) {
        let mut ppu = Ppu::new();
        ppu.vram_write(addr, value);
        prop_assert_eq!(ppu.vram_read(addr % VRAM_SIZE), value);
    }

    /// Tilemap entries mask to 10 bits regardless of stored data.
    #[test]
    fn tilemap_entry_masks_to_ten_bits(
        lo in any::<u8>(),
        hi in any::<u8>(),
        tile_x in 0usize..32,
        tile_y in 0usize..24,
    ) {
        let mut ppu = Ppu::new();
        let addr = 4 * 1024 + (tile_y * 32 + tile_x) * 2;
        ppu.vram_write(addr, lo);
        ppu.vram_write(addr + 1, hi);

        let entry = ppu.fetch_tilemap_entry(tile_x, tile_y, 4);
        prop_assert_eq!(entry, (((hi as u16) << 8) | lo as u16) & 0x03FF);
    }

    /// A single sprite is selected exactly when `(scanline - y) mod 256`
    /// lands inside its 8-pixel height.
    #[test]
    fn sprite_selection_matches_dy_rule(y in any::<u8>(), scanline in 0u16..192) {
        let mut ppu = Ppu::new();
        ppu.io_write(PORT_SPR_CTRL, SPR_CTRL_ENABLE);
        ppu.io_write(PORT_SAT_BASE, 0x20);
        ppu.begin_scanline(scanline);

        let base = 0x20usize * 256;
        // Park every other entry where it can never cover a visible line
        for i in 1..SAT_ENTRIES {
            ppu.vram_write(base + i * SAT_ENTRY_BYTES, 200);
        }
        ppu.vram_write(base, y);

        let selection = ppu.evaluate_sprites(scanline);
        let dy = (scanline as u8).wrapping_sub(y);
        prop_assert_eq!(selection.count == 1, dy < 8);
    }

    /// Tile pixel decode always yields a 4-bit index.
    #[test]
    fn tile_pixels_are_four_bit(
        tile in 0u16..0x400,
        x in 0usize..8,
        y in 0usize..8,
        fill in any::<u8>(),
    ) {
        let mut ppu = Ppu::new();
        for i in 0..VRAM_SIZE / 97 {
            ppu.vram_write(i * 97, fill);
        }
        prop_assert!(ppu.decode_tile_pixel(tile, x, y) <= 0x0F);
    }
}

#[cfg(test)]
mod selection_units {
    use super::*;

    /// With sprites on other scanlines present, only covering entries are
    /// picked and SAT order is preserved.
    #[test]
    fn selection_preserves_sat_order() {
        let mut ppu = Ppu::new();
        ppu.io_write(PORT_SPR_CTRL, SPR_CTRL_ENABLE);
        ppu.io_write(PORT_SAT_BASE, 0x20);
        ppu.begin_scanline(0);

        let base = 0x20usize * 256;
        // Entries 3, 9, 30 cover line 0; the rest sit far below
        for i in 0..SAT_ENTRIES {
            let y = if matches!(i, 3 | 9 | 30) { 0 } else { 100 };
            ppu.vram_write(base + i * SAT_ENTRY_BYTES, y);
        }

        let selection = ppu.evaluate_sprites(0);
        assert_eq!(selection.count, 3);
        assert_eq!(&selection.indices[..3], &[3, 9, 30]);
        assert!(!selection.overflow);
    }
}
