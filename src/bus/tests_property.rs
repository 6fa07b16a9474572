//! Bus property-based tests over the memory map round-trip laws.

use super::*;
use proptest::prelude::*;

proptest! {
    /// Work RAM: write-then-read returns the written value.
    #[test]
    fn wram_write_read_roundtrip(addr in WRAM_START..=WRAM_END, value in any::<u8>()) {
        let mut bus = Bus::new();
        bus.write8(addr, value);
        prop_assert_eq!(bus.read8(addr), value);
    }

    /// ROM and open-bus regions: a write never changes what a read sees.
    #[test]
    fn non_ram_regions_ignore_writes(addr in 0x0000u16..WRAM_START, value in any::<u8>()) {
        let mut bus = Bus::new();
        bus.cartridge.load(&[0x5A; 16]).unwrap();

        let before = bus.read8(addr);
        bus.write8(addr, value);
        prop_assert_eq!(bus.read8(addr), before);
    }

    /// Every memory access leaves a coherent last-access trace.
    #[test]
    fn last_access_matches_decode(addr in any::<u16>()) {
        let mut bus = Bus::new();
        bus.read8(addr);

        let last = bus.last_access();
        prop_assert_eq!(last.addr, addr);
        prop_assert_eq!(last.kind, AccessKind::Mem);
        let expected = if addr <= ROM_END {
            BusTarget::Rom
        } else if addr >= WRAM_START {
            BusTarget::WorkRam
        } else {
            BusTarget::OpenBus
        };
        prop_assert_eq!(last.target, expected);
    }

    /// Counter totals add up per category.
    #[test]
    fn counters_partition_accesses(addrs in proptest::collection::vec(any::<u16>(), 1..64)) {
        let mut bus = Bus::new();
        for &addr in &addrs {
            bus.read8(addr);
        }

        let counters = bus.counters();
        prop_assert_eq!(counters.mem_reads, addrs.len() as u64);
        prop_assert_eq!(
            counters.rom_reads + counters.ram_reads + counters.open_bus_reads,
            counters.mem_reads
        );
    }
}
