//! YM2151 chip interface
//!
//! Sits between the CPU-facing port and the synthesis engine. Tracks what the
//! CPU has written (register shadow and latches), what the engine has actually
//! applied (immediately or later through the pending FIFO), and produces audio
//! at the host rate from a native-rate backbuffer.

use std::collections::VecDeque;
use std::fmt;

use log::{debug, trace, warn};

use crate::backbuffer::{SampleBackbuffer, StereoFrame};
use crate::backend::{ChipInterface, OpmBackend};
use crate::config::ChipConfig;
use crate::opm::Opm;
use crate::registers::RegisterBank;
use crate::resampler::Resampler;
use crate::timing::ChipTiming;
use crate::{Result, CLOCKS_PER_SAMPLE};

/// Extra native samples generated on top of the estimate for a request
const GENERATE_MARGIN: u64 = 1;

/// YM2151 as seen by the host machine
pub struct Ym2151<B: OpmBackend = Opm> {
    engine: B,
    timing: ChipTiming,
    registers: RegisterBank,
    last_address: u8,
    last_data: u8,
    pending: VecDeque<(u8, u8)>,
    strict_busy: bool,
    irq_enabled: bool,
    cpu_clock_hz: u32,
    /// CPU clocks not yet turned into native samples, scaled by the native rate
    prerender_acc: u64,
    backbuffer: SampleBackbuffer,
    resamplers: Option<[Resampler; 2]>,
    /// Resampled output not yet delivered, per channel
    carry: [VecDeque<i16>; 2],
    last_output: StereoFrame,
}

impl Ym2151<Opm> {
    /// Create an interface around the bundled engine with default settings
    pub fn new() -> Self {
        let config = ChipConfig::default();
        Self::build(Opm::new(config.clock_hz), config)
    }

    /// Create an interface around the bundled engine
    pub fn with_config(config: ChipConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(Opm::new(config.clock_hz), config))
    }
}

impl Default for Ym2151<Opm> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: OpmBackend> Ym2151<B> {
    /// Create an interface around a custom engine
    ///
    /// The engine's own master clock determines the native sample rate;
    /// `config.clock_hz` is ignored.
    pub fn with_backend(engine: B, config: ChipConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(engine, config))
    }

    fn build(mut engine: B, config: ChipConfig) -> Self {
        let mut timing = ChipTiming::new();
        engine.reset(&mut timing);
        let capacity = engine.sample_rate() as usize;
        Ym2151 {
            engine,
            timing,
            registers: RegisterBank::new(),
            last_address: 0,
            last_data: 0,
            pending: VecDeque::new(),
            strict_busy: config.strict_busy,
            irq_enabled: config.irq_enabled,
            cpu_clock_hz: config.cpu_clock_hz,
            prerender_acc: 0,
            backbuffer: SampleBackbuffer::with_capacity(capacity),
            resamplers: None,
            carry: [VecDeque::new(), VecDeque::new()],
            last_output: [0, 0],
        }
    }

    /// Reset the chip
    ///
    /// Engine, timers, busy window and pending writes are cleared; the
    /// register shadow returns to its power-on contents. Buffered audio is
    /// left alone (see [`Ym2151::clear_backbuffer`]).
    pub fn reset(&mut self) {
        self.timing.reset();
        self.engine.reset(&mut self.timing);
        self.pending.clear();
        self.registers.reset();
        self.last_address = 0;
        self.last_data = 0;
        self.prerender_acc = 0;
    }

    /// CPU port write: even offsets latch the address, odd offsets write data
    pub fn write_port(&mut self, offset: u8, value: u8) {
        if offset & 1 != 0 {
            self.write(self.last_address, value);
        } else {
            self.last_address = value;
        }
    }

    /// Register write through the busy-window logic
    ///
    /// The shadow and both latches always reflect the attempt. The engine
    /// sees the write now if the chip is idle, later (in FIFO order) if it is
    /// busy, or never if it is busy and strict mode is on.
    pub fn write(&mut self, addr: u8, value: u8) {
        self.last_address = addr;
        self.last_data = value;
        self.registers.write(addr, value);

        let busy = self.timing.is_busy();
        if busy && self.strict_busy {
            warn!("Write to YM2151 (${addr:02X} <- ${value:02X}) while busy");
            return;
        }
        if busy || !self.pending.is_empty() {
            trace!("queueing ${addr:02X} <- ${value:02X}");
            self.pending.push_back((addr, value));
        } else {
            self.engine.write(addr, value, false, &mut self.timing);
        }
    }

    /// Apply a write immediately, without starting a busy window
    pub fn debug_write(&mut self, addr: u8, value: u8) {
        self.registers.write(addr, value);
        self.engine.write(addr, value, true, &mut self.timing);
    }

    /// Register shadow value (includes queued writes)
    pub fn debug_read(&self, addr: u8) -> u8 {
        self.registers.read(addr)
    }

    /// Status register as read by the CPU (bit 7 = busy)
    pub fn read_status(&self) -> u8 {
        let busy = if self.timing.is_busy() { 0x80 } else { 0 };
        self.engine.status() | busy
    }

    /// IRQ line towards the CPU
    pub fn irq(&self) -> bool {
        self.irq_enabled && self.timing.irq_asserted()
    }

    /// Apply the host-facing settings of `config` to a running chip
    ///
    /// Strict mode, IRQ gating and the prerender CPU clock are replaced; a
    /// changed CPU clock drops the partially accumulated prerender time.
    /// The engine's master clock is fixed at construction, so
    /// `config.clock_hz` is not applied.
    pub fn configure(&mut self, config: ChipConfig) -> Result<()> {
        config.validate()?;
        self.strict_busy = config.strict_busy;
        self.irq_enabled = config.irq_enabled;
        if config.cpu_clock_hz != self.cpu_clock_hz {
            debug!("prerender clock {} Hz -> {} Hz", self.cpu_clock_hz, config.cpu_clock_hz);
            self.cpu_clock_hz = config.cpu_clock_hz;
            self.prerender_acc = 0;
        }
        Ok(())
    }

    /// CPU clock driving [`Ym2151::prerender`], in Hz
    pub fn cpu_clock_hz(&self) -> u32 {
        self.cpu_clock_hz
    }

    /// Gate the IRQ line
    pub fn set_irq_enabled(&mut self, enabled: bool) {
        self.irq_enabled = enabled;
    }

    /// Whether the IRQ line is gated on
    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled
    }

    /// Select strict (drop) or queued busy handling
    pub fn set_strict_busy(&mut self, strict: bool) {
        self.strict_busy = strict;
    }

    /// Whether busy writes are dropped
    pub fn strict_busy(&self) -> bool {
        self.strict_busy
    }

    /// Whether a busy window is open
    pub fn is_busy(&self) -> bool {
        self.timing.is_busy()
    }

    /// Address latch
    pub fn last_address(&self) -> u8 {
        self.last_address
    }

    /// Data latch
    pub fn last_data(&self) -> u8 {
        self.last_data
    }

    /// Number of writes waiting for the engine
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Chip clocks until `timer` fires, `None` if it is not armed
    pub fn timer_remaining(&self, timer: usize) -> Option<u32> {
        self.timing.timer_remaining(timer)
    }

    /// Native sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    /// Synthesis engine
    pub fn engine(&self) -> &B {
        &self.engine
    }

    /// Register shadow
    pub fn registers(&self) -> &RegisterBank {
        &self.registers
    }

    /// Native-rate backbuffer
    pub fn backbuffer(&self) -> &SampleBackbuffer {
        &self.backbuffer
    }

    /// Run busy window and timers forward by `clocks` chip clocks
    pub fn advance(&mut self, clocks: u32) {
        let expired = self.timing.advance(clocks);
        for (timer, fired) in expired.into_iter().enumerate() {
            if fired {
                trace!("timer {timer} expired");
                self.engine.timer_expired(timer, &mut self.timing);
            }
        }
    }

    /// Generate up to `count` native frames into the backbuffer
    ///
    /// One pending write is applied before each generated frame. Returns the
    /// number of frames produced (limited by backbuffer space).
    pub fn pregenerate(&mut self, count: usize) -> usize {
        let count = count.min(self.backbuffer.remaining());
        for _ in 0..count {
            if let Some((addr, value)) = self.pending.pop_front() {
                self.engine.write(addr, value, false, &mut self.timing);
            }
            let (left, right) = self.engine.generate();
            self.backbuffer.push([clamp_sample(left), clamp_sample(right)]);
            self.advance(CLOCKS_PER_SAMPLE);
        }
        count
    }

    /// Keep the backbuffer in step with `cpu_clocks` elapsed CPU clocks
    pub fn prerender(&mut self, cpu_clocks: u32) {
        self.prerender_acc += u64::from(cpu_clocks) * u64::from(self.sample_rate());
        let cpu_hz = u64::from(self.cpu_clock_hz);
        let samples = self.prerender_acc / cpu_hz;
        self.prerender_acc %= cpu_hz;
        if samples > 0 {
            self.pregenerate(samples as usize);
        }
    }

    /// Drop buffered native frames and any undelivered resampled output
    pub fn clear_backbuffer(&mut self) {
        self.backbuffer.clear();
        self.carry.iter_mut().for_each(VecDeque::clear);
        if let Some(resamplers) = self.resamplers.as_mut() {
            resamplers.iter_mut().for_each(Resampler::reset);
        }
    }

    fn ensure_resamplers(&mut self, output_rate: u32) {
        let native = self.sample_rate();
        let current = self.resamplers.as_ref().map(|r| r[0].output_rate());
        if current != Some(output_rate) {
            debug!("resampling {native} Hz -> {output_rate} Hz");
            self.resamplers = Some([
                Resampler::new(native, output_rate),
                Resampler::new(native, output_rate),
            ]);
            self.carry.iter_mut().for_each(VecDeque::clear);
        }
    }

    /// Move carried-over output into `output` starting at frame `written`
    fn drain_carry(&mut self, output: &mut [i16], mut written: usize) -> usize {
        let frames = output.len() / 2;
        while written < frames {
            let (Some(left), Some(right)) = (self.carry[0].front(), self.carry[1].front()) else {
                break;
            };
            output[2 * written] = *left;
            output[2 * written + 1] = *right;
            self.last_output = [*left, *right];
            self.carry[0].pop_front();
            self.carry[1].pop_front();
            written += 1;
        }
        written
    }

    fn native_estimate(&self, frames: usize, output_rate: u32) -> usize {
        let needed = frames as u64 * u64::from(self.sample_rate()) / u64::from(output_rate);
        (needed + GENERATE_MARGIN) as usize
    }

    /// Fill `output` (interleaved stereo, `output.len() / 2` frames) at `output_rate`
    ///
    /// Carried-over output is delivered first; more native frames are
    /// generated when the backbuffer runs short. Native frames are retired
    /// exactly as far as they were consumed.
    pub fn generate(&mut self, output: &mut [i16], output_rate: u32) {
        let frames = output.len() / 2;
        if output_rate == 0 {
            output.fill(0);
            return;
        }
        self.ensure_resamplers(output_rate);

        if self.carry[0].len() != self.carry[1].len() {
            warn!(
                "resampler channel mismatch: {} left vs {} right",
                self.carry[0].len(),
                self.carry[1].len()
            );
        }
        let mut written = self.drain_carry(output, 0);
        if written == frames {
            return;
        }

        let needed = self.native_estimate(frames - written, output_rate);
        if self.backbuffer.len() < needed {
            self.pregenerate(needed - self.backbuffer.len());
        }

        let mut consumed = 0;
        while written < frames {
            if consumed == self.backbuffer.len() {
                self.backbuffer.retire(consumed);
                consumed = 0;
                let more = self.native_estimate(frames - written, output_rate);
                if self.pregenerate(more) == 0 {
                    warn!(
                        "YM2151 backbuffer exhausted, padding {} frames",
                        frames - written
                    );
                    for frame in output[2 * written..2 * frames].chunks_exact_mut(2) {
                        frame.copy_from_slice(&self.last_output);
                    }
                    return;
                }
                continue;
            }

            let [left, right] = self.backbuffer.frames()[consumed];
            consumed += 1;
            if let Some([rs_left, rs_right]) = self.resamplers.as_mut() {
                rs_left.process(left, &mut self.carry[0]);
                rs_right.process(right, &mut self.carry[1]);
            }
            written = self.drain_carry(output, written);
        }
        self.backbuffer.retire(consumed);
    }
}

fn clamp_sample(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

impl<B: OpmBackend> fmt::Debug for Ym2151<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ym2151")
            .field("last_address", &self.last_address)
            .field("last_data", &self.last_data)
            .field("busy_clocks", &self.timing.busy_clocks())
            .field("pending", &self.pending.len())
            .field("strict_busy", &self.strict_busy)
            .field("irq_enabled", &self.irq_enabled)
            .field("backbuffer", &self.backbuffer.len())
            .finish()
    }
}
