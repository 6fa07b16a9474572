//! Audio Processing Unit (APU)
//!
//! The APU couples the emulated CPU's timebase to a fixed output sample
//! rate and orchestrates the two sound chips:
//! - PSG (3 tone + 1 noise), rendered mono
//! - FM (8 channels x 4 operators), rendered stereo
//!
//! A Q32.32 fixed-point accumulator converts elapsed CPU cycles into whole
//! output frames; frames are mixed with per-chip gain and mute, scaled by
//! the master volume register, hard-clamped to i16, and pushed into the
//! lock-free ring for the host audio callback. A full ring drops frames and
//! counts them; the producer never blocks.

pub mod fm;
pub mod psg;
pub mod ring;

use crate::debugger::Debuggable;
use fm::FmChip;
use log::info;
use psg::Psg;
use ring::AudioRingBuffer;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const SAMPLE_RATE: u32 = 48_000;
pub const PSG_HZ: f64 = 3_579_545.0;
pub const FM_HZ: f64 = 3_579_545.0;
pub const RING_CAPACITY_FRAMES: usize = 16_384;

/// Depth of the timestamped register-write trace.
pub const MAX_LAST_WRITES: usize = 64;

const MAX_BATCH_FRAMES: usize = 1024;

// APU I/O ports
pub const PORT_PSG_DATA: u8 = 0x60;
pub const PORT_FM_ADDR: u8 = 0x70;
pub const PORT_FM_DATA: u8 = 0x71;
pub const PORT_MASTER_VOL: u8 = 0x7C;
pub const PORT_PAN: u8 = 0x7D;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IoWriteRecord {
    pub cpu_cycle: u64,
    pub port: u8,
    pub value: u8,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AudioStats {
    pub total_frames_generated: u64,
    pub underruns: u64,
    pub overflows: u64,
    pub ring_fill_frames: usize,
    pub ring_capacity_frames: usize,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugState {
    pub stats: AudioStats,
    pub psg_muted: bool,
    pub fm_muted: bool,
    pub master_vol: u8,
    pub pan: u8,
    /// Recent register writes, oldest first.
    pub last_writes: Vec<IoWriteRecord>,
}

/// Consumer-side handle for the host audio callback thread.
///
/// Cloning is cheap; all clones share the same ring and underrun counter.
#[derive(Debug, Clone)]
pub struct AudioHandle {
    ring: Arc<AudioRingBuffer>,
    underruns: Arc<AtomicU64>,
}

impl AudioHandle {
    /// Pops up to `out.len() / 2` interleaved stereo frames. A shortfall is
    /// zero-filled and counted as an underrun. Returns frames actually
    /// popped from the ring.
    pub fn pop_frames(&self, out: &mut [i16]) -> usize {
        let requested = out.len() / 2;
        let popped = self.ring.pop(out);
        if popped < requested {
            out[popped * 2..requested * 2].fill(0);
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
        popped
    }
}

#[derive(Debug)]
pub struct Apu {
    pub psg: Psg,
    pub fm: FmChip,

    ring: Arc<AudioRingBuffer>,
    underruns: Arc<AtomicU64>,

    // Q32.32 cycle-to-sample conversion
    cycle_accum_fp: u64,
    cycles_per_sample_fp: u64,

    // Mixer
    psg_gain: f32,
    fm_gain: f32,
    master_vol: u8,
    pan: u8,
    psg_muted: bool,
    fm_muted: bool,

    // Debug write trace
    last_writes: [IoWriteRecord; MAX_LAST_WRITES],
    last_write_head: usize,
    last_write_count: usize,

    total_frames_generated: u64,
    overflow_count: u64,

    /// Monotonic CPU-cycle counter used to timestamp register writes.
    cpu_cycle_counter: u64,
}

impl Apu {
    pub fn new() -> Self {
        let cps = crate::CPU_HZ / SAMPLE_RATE as f64;
        let cycles_per_sample_fp = (cps * 4294967296.0) as u64;
        info!(
            "apu: cpu_hz={:.1} sample_rate={} cycles_per_sample={:.6}",
            crate::CPU_HZ,
            SAMPLE_RATE,
            cps
        );

        Self {
            psg: Psg::new(PSG_HZ, SAMPLE_RATE),
            fm: FmChip::new(FM_HZ),
            ring: Arc::new(AudioRingBuffer::new(RING_CAPACITY_FRAMES)),
            underruns: Arc::new(AtomicU64::new(0)),
            cycle_accum_fp: 0,
            cycles_per_sample_fp,
            psg_gain: 0.20,
            fm_gain: 0.35,
            master_vol: 0xFF,
            pan: 0xFF,
            psg_muted: false,
            fm_muted: false,
            last_writes: [IoWriteRecord::default(); MAX_LAST_WRITES],
            last_write_head: 0,
            last_write_count: 0,
            total_frames_generated: 0,
            overflow_count: 0,
            cpu_cycle_counter: 0,
        }
    }

    /// Reinitializes chip and mixer state. Host mute toggles and the ring
    /// allocation survive.
    pub fn reset(&mut self) {
        self.psg.reset();
        self.fm.reset();
        self.cycle_accum_fp = 0;
        self.master_vol = 0xFF;
        self.pan = 0xFF;
        self.last_writes = [IoWriteRecord::default(); MAX_LAST_WRITES];
        self.last_write_head = 0;
        self.last_write_count = 0;
        self.total_frames_generated = 0;
        self.overflow_count = 0;
        self.cpu_cycle_counter = 0;
    }

    /// Consumer handle for the host audio callback thread.
    pub fn audio_handle(&self) -> AudioHandle {
        AudioHandle {
            ring: Arc::clone(&self.ring),
            underruns: Arc::clone(&self.underruns),
        }
    }

    pub fn io_write(&mut self, port: u8, value: u8) {
        self.record_write(port, value);
        match port {
            PORT_PSG_DATA => self.psg.write(value),
            PORT_FM_ADDR => self.fm.write_address(value),
            PORT_FM_DATA => self.fm.write_data(value),
            PORT_MASTER_VOL => self.master_vol = value,
            PORT_PAN => self.pan = value,
            _ => {}
        }
    }

    pub fn io_read(&self, port: u8) -> u8 {
        match port {
            PORT_FM_DATA => self.fm.read_status(),
            PORT_MASTER_VOL => self.master_vol,
            PORT_PAN => self.pan,
            _ => 0xFF,
        }
    }

    /// Advances the APU timebase by a scanline's worth of CPU cycles,
    /// generating every whole output frame that the elapsed time crossed.
    pub fn advance(&mut self, cpu_cycles: u32) {
        self.cpu_cycle_counter += cpu_cycles as u64;
        self.cycle_accum_fp += (cpu_cycles as u64) << 32;

        let mut frames = 0usize;
        while self.cycle_accum_fp >= self.cycles_per_sample_fp {
            self.cycle_accum_fp -= self.cycles_per_sample_fp;
            frames += 1;
        }

        if frames > 0 {
            self.generate_frames(frames);
        }
    }

    fn generate_frames(&mut self, mut frames: usize) {
        let mut psg_buf = [0.0f32; MAX_BATCH_FRAMES];
        let mut fm_l = [0.0f32; MAX_BATCH_FRAMES];
        let mut fm_r = [0.0f32; MAX_BATCH_FRAMES];
        let mut mix_buf = [0i16; MAX_BATCH_FRAMES * 2];

        let master = self.master_vol as f32 / 255.0;

        while frames > 0 {
            let batch = frames.min(MAX_BATCH_FRAMES);

            self.psg.render_mono(&mut psg_buf[..batch]);
            self.fm.render_stereo(&mut fm_l[..batch], &mut fm_r[..batch]);

            for i in 0..batch {
                let psg_s = if self.psg_muted {
                    0.0
                } else {
                    psg_buf[i] * self.psg_gain
                };
                let (fm_sl, fm_sr) = if self.fm_muted {
                    (0.0, 0.0)
                } else {
                    (fm_l[i] * self.fm_gain, fm_r[i] * self.fm_gain)
                };

                // PSG is mono, fed equally to both sides
                mix_buf[i * 2] = clamp16((psg_s + fm_sl) * master);
                mix_buf[i * 2 + 1] = clamp16((psg_s + fm_sr) * master);
            }

            let pushed = self.ring.push(&mix_buf[..batch * 2]);
            self.overflow_count += (batch - pushed) as u64;
            self.total_frames_generated += batch as u64;
            frames -= batch;
        }
    }

    fn record_write(&mut self, port: u8, value: u8) {
        self.last_writes[self.last_write_head] = IoWriteRecord {
            cpu_cycle: self.cpu_cycle_counter,
            port,
            value,
        };
        self.last_write_head = (self.last_write_head + 1) % MAX_LAST_WRITES;
        self.last_write_count = (self.last_write_count + 1).min(MAX_LAST_WRITES);
    }

    pub fn set_mute_psg(&mut self, mute: bool) {
        self.psg_muted = mute;
    }

    pub fn set_mute_fm(&mut self, mute: bool) {
        self.fm_muted = mute;
    }

    pub fn is_psg_muted(&self) -> bool {
        self.psg_muted
    }

    pub fn is_fm_muted(&self) -> bool {
        self.fm_muted
    }

    pub fn stats(&self) -> AudioStats {
        AudioStats {
            total_frames_generated: self.total_frames_generated,
            underruns: self.underruns.load(Ordering::Relaxed),
            overflows: self.overflow_count,
            ring_fill_frames: self.ring.fill_frames(),
            ring_capacity_frames: self.ring.capacity_frames(),
            sample_rate: SAMPLE_RATE,
        }
    }

    /// Recent register writes, oldest first.
    pub fn last_writes(&self) -> Vec<IoWriteRecord> {
        (0..self.last_write_count)
            .map(|i| {
                let idx = (self.last_write_head + MAX_LAST_WRITES - self.last_write_count + i)
                    % MAX_LAST_WRITES;
                self.last_writes[idx]
            })
            .collect()
    }

    pub fn debug_state(&self) -> DebugState {
        DebugState {
            stats: self.stats(),
            psg_muted: self.psg_muted,
            fm_muted: self.fm_muted,
            master_vol: self.master_vol,
            pan: self.pan,
            last_writes: self.last_writes(),
        }
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Debuggable for Apu {
    fn read_state(&self) -> Value {
        serde_json::to_value(self.debug_state()).unwrap()
    }
}

#[inline]
fn clamp16(v: f32) -> i16 {
    (v * 32767.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
