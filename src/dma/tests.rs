use super::*;

fn program(dma: &mut DmaEngine, src: u16, dst: u16, len: u16, ctrl: u8) {
    dma.write_reg(PORT_SRC_LO, src as u8);
    dma.write_reg(PORT_SRC_HI, (src >> 8) as u8);
    dma.write_reg(PORT_DST_LO, dst as u8);
    dma.write_reg(PORT_DST_HI, (dst >> 8) as u8);
    dma.write_reg(PORT_LEN_LO, len as u8);
    dma.write_reg(PORT_LEN_HI, (len >> 8) as u8);
    dma.write_reg(PORT_CTRL, ctrl);
}

#[test]
fn start_in_vblank_executes_immediately() {
    let mut dma = DmaEngine::new();
    program(&mut dma, 0xC000, 0x0100, 4, CTRL_START);

    let transfer = dma.on_scanline_boundary(200, true).unwrap();
    assert_eq!(
        transfer,
        Transfer {
            src: 0xC000,
            dst: 0x0100,
            len: 4,
            dst_is_palette: false
        }
    );
    assert!(!dma.last_illegal_start());
    assert!(!dma.debug_state().last_trigger_was_queued);
}

#[test]
fn start_bit_auto_clears() {
    let mut dma = DmaEngine::new();
    program(&mut dma, 0xC000, 0x0000, 4, CTRL_START);

    assert!(dma.on_scanline_boundary(200, true).is_some());
    // The edge was consumed: nothing fires on later lines.
    assert!(dma.on_scanline_boundary(201, true).is_none());
}

#[test]
fn ctrl_reads_back_only_the_queue_bit() {
    let mut dma = DmaEngine::new();
    dma.write_reg(PORT_CTRL, CTRL_START | CTRL_QUEUE_IF_NOT_VBLANK | CTRL_DST_IS_PALETTE | CTRL_BUSY);
    assert_eq!(dma.read_reg(PORT_CTRL), CTRL_QUEUE_IF_NOT_VBLANK);

    dma.write_reg(PORT_SRC_LO, 0x34);
    dma.write_reg(PORT_SRC_HI, 0x12);
    assert_eq!(dma.read_reg(PORT_SRC_LO), 0x34);
    assert_eq!(dma.read_reg(PORT_SRC_HI), 0x12);
}

#[test]
fn zero_length_is_a_no_op() {
    let mut dma = DmaEngine::new();
    program(&mut dma, 0xC000, 0x0100, 0, CTRL_START);

    assert!(dma.on_scanline_boundary(200, true).is_none());
    assert!(!dma.last_illegal_start());
    assert!(dma.queued_request().is_none());
}

#[test]
fn illegal_start_outside_vblank_is_dropped_and_flagged() {
    let mut dma = DmaEngine::new();
    program(&mut dma, 0xC000, 0x0100, 4, CTRL_START);

    assert!(dma.on_scanline_boundary(50, false).is_none());
    assert!(dma.last_illegal_start());
    assert!(dma.queued_request().is_none());

    // A later legal transfer clears the flag
    program(&mut dma, 0xC000, 0x0100, 4, CTRL_START);
    assert!(dma.on_scanline_boundary(200, true).is_some());
    assert!(!dma.last_illegal_start());
}

#[test]
fn queue_flag_defers_to_vblank_start() {
    let mut dma = DmaEngine::new();
    program(&mut dma, 0xC000, 0x0200, 8, CTRL_START | CTRL_QUEUE_IF_NOT_VBLANK);

    assert!(dma.on_scanline_boundary(50, false).is_none());
    assert!(!dma.last_illegal_start());
    let queued = dma.queued_request().unwrap();
    assert_eq!(queued.len, 8);

    // Mid-frame lines do not drain the queue
    assert!(dma.on_scanline_boundary(51, false).is_none());
    assert!(dma.on_scanline_boundary(100, false).is_none());

    // The queued copy runs exactly at the VBlank start line
    let transfer = dma.on_scanline_boundary(crate::VBLANK_START_SCANLINE, true).unwrap();
    assert_eq!(transfer, queued);
    assert!(dma.debug_state().last_trigger_was_queued);
    assert!(dma.queued_request().is_none());
}

#[test]
fn queued_slot_last_write_wins() {
    let mut dma = DmaEngine::new();
    program(&mut dma, 0xC000, 0x0100, 4, CTRL_START | CTRL_QUEUE_IF_NOT_VBLANK);
    assert!(dma.on_scanline_boundary(10, false).is_none());

    program(&mut dma, 0xC100, 0x0300, 16, CTRL_START | CTRL_QUEUE_IF_NOT_VBLANK);
    assert!(dma.on_scanline_boundary(11, false).is_none());

    let transfer = dma.on_scanline_boundary(crate::VBLANK_START_SCANLINE, true).unwrap();
    assert_eq!(transfer.src, 0xC100);
    assert_eq!(transfer.dst, 0x0300);
    assert_eq!(transfer.len, 16);
}

#[test]
fn palette_destination_bit_rides_along() {
    let mut dma = DmaEngine::new();
    program(&mut dma, 0xC000, 0x0010, 2, CTRL_START | CTRL_DST_IS_PALETTE);

    let transfer = dma.on_scanline_boundary(195, true).unwrap();
    assert!(transfer.dst_is_palette);

    dma.record_execution(transfer, 3, 195);
    let debug = dma.debug_state();
    assert!(debug.last_exec_was_palette);
    assert_eq!(debug.last_exec_frame, 3);
    assert_eq!(debug.last_exec_scanline, 195);
}

#[test]
fn queued_request_beats_fresh_start_on_the_same_line() {
    let mut dma = DmaEngine::new();
    program(&mut dma, 0xC000, 0x0100, 4, CTRL_START | CTRL_QUEUE_IF_NOT_VBLANK);
    assert!(dma.on_scanline_boundary(10, false).is_none());

    // A fresh START is pending as VBlank begins; the queued copy runs
    // first, the fresh one on the next boundary.
    program(&mut dma, 0xC200, 0x0400, 2, CTRL_START);

    let first = dma.on_scanline_boundary(crate::VBLANK_START_SCANLINE, true).unwrap();
    assert_eq!(first.src, 0xC000);

    let second = dma.on_scanline_boundary(193, true).unwrap();
    assert_eq!(second.src, 0xC200);
}

#[test]
fn reset_clears_queue_and_flags() {
    let mut dma = DmaEngine::new();
    program(&mut dma, 0xC000, 0x0100, 4, CTRL_START | CTRL_QUEUE_IF_NOT_VBLANK);
    assert!(dma.on_scanline_boundary(10, false).is_none());
    dma.reset();

    assert!(dma.queued_request().is_none());
    assert_eq!(dma.read_reg(PORT_CTRL), 0);
    assert_eq!(dma.read_reg(PORT_LEN_LO), 0);
    let debug = dma.debug_state();
    assert_eq!(debug.last_exec_frame, -1);
    assert!(!debug.last_illegal_start);
}
