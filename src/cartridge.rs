//! Cartridge: the read-only ROM image mapped at `0x0000-0x7FFF`.
//!
//! The slot takes at most 32 KiB. Reads past the end of a shorter image
//! float to `0xFF` (open bus). Bank 0 is fixed in this core; the latch is
//! kept for debug visibility and survives `reset()` along with the image.

use crate::debugger::Debuggable;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Largest ROM image the cartridge slot accepts.
pub const MAX_ROM_SIZE: usize = 0x8000;

#[derive(Debug, Error)]
pub enum RomError {
    #[error("ROM image is {0} bytes; the cartridge slot takes at most 32768")]
    TooLarge(usize),
    #[error("failed to read ROM file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DebugState {
    pub loaded: bool,
    pub rom_size: usize,
    pub bank0: u8,
}

#[derive(Debug, Default)]
pub struct Cartridge {
    rom: Vec<u8>,
    bank0: u8,
}

impl Cartridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies a ROM image into the cartridge. Replaces any previous image.
    pub fn load(&mut self, bytes: &[u8]) -> Result<(), RomError> {
        if bytes.len() > MAX_ROM_SIZE {
            return Err(RomError::TooLarge(bytes.len()));
        }
        self.rom = bytes.to_vec();
        info!("cartridge: loaded {} byte ROM", self.rom.len());
        Ok(())
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<(), RomError> {
        let bytes = std::fs::read(path)?;
        self.load(&bytes)
    }

    /// Reinitializes mapper state. The ROM image and bank 0 persist.
    pub fn reset(&mut self) {}

    pub fn is_loaded(&self) -> bool {
        !self.rom.is_empty()
    }

    pub fn rom_len(&self) -> usize {
        self.rom.len()
    }

    /// ROM read; addresses past the image length return `0xFF`.
    pub fn read(&self, addr: u16) -> u8 {
        self.rom.get(addr as usize).copied().unwrap_or(0xFF)
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            loaded: self.is_loaded(),
            rom_size: self.rom.len(),
            bank0: self.bank0,
        }
    }
}

impl Debuggable for Cartridge {
    fn read_state(&self) -> Value {
        serde_json::to_value(self.debug_state()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_inside_and_past_image() {
        let mut cart = Cartridge::new();
        cart.load(&[0x11, 0x22, 0x33]).unwrap();

        assert_eq!(cart.read(0x0000), 0x11);
        assert_eq!(cart.read(0x0002), 0x33);
        assert_eq!(cart.read(0x0003), 0xFF);
        assert_eq!(cart.read(0x7FFF), 0xFF);
    }

    #[test]
    fn empty_cartridge_reads_open_bus() {
        let cart = Cartridge::new();
        assert!(!cart.is_loaded());
        assert_eq!(cart.read(0x0000), 0xFF);
    }

    #[test]
    fn oversized_rom_is_rejected() {
        let mut cart = Cartridge::new();
        let too_big = vec![0u8; MAX_ROM_SIZE + 1];
        assert!(matches!(cart.load(&too_big), Err(RomError::TooLarge(_))));
        assert!(!cart.is_loaded());
    }

    #[test]
    fn max_size_rom_is_accepted() {
        let mut cart = Cartridge::new();
        cart.load(&vec![0xAB; MAX_ROM_SIZE]).unwrap();
        assert_eq!(cart.rom_len(), MAX_ROM_SIZE);
        assert_eq!(cart.read(0x7FFF), 0xAB);
    }

    #[test]
    fn reset_preserves_rom() {
        let mut cart = Cartridge::new();
        cart.load(&[0x42]).unwrap();
        cart.reset();
        assert_eq!(cart.read(0x0000), 0x42);
        assert_eq!(cart.debug_state().bank0, 0);
    }
}
