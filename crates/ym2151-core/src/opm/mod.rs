//! Reference OPM synthesis engine
//!
//! A compact four-operator FM engine covering what the interface layer needs
//! to be exercised end to end:
//!
//! - register file with key on/off and the eight connection algorithms
//! - operator 1 self-feedback
//! - key-scaled attack/decay/sustain/release envelopes
//! - Timer A/B, status flags and IRQ output
//! - busy-window signalling on every non-debug write
//! - LFO phase counter and AMD/PMD depth latches (for inspection)
//!
//! LFO modulation is tracked but not applied to the output. Noise, DT1 fine
//! detune and CSM key-on are not modelled.
//!
//! Operators are indexed in register order: `op * 8 + channel` with
//! op 0 = M1, 1 = M2, 2 = C1, 3 = C2.

mod operator;
mod tables;

pub use operator::{EnvelopeState, Operator};

use bitflags::bitflags;
use log::debug;

use crate::backend::{ChipInterface, OpmBackend};
use crate::registers::{channel, operator as opreg, Register, CHANNEL_CONTROL_RESET};
use operator::EnvelopeRates;
use tables::{
    sine_table, A4_HZ, A4_SEMITONE, DT2_CENTS, NOTE_SEMITONES, OPERATOR_SCALE,
};

/// Number of operator slots
pub const SLOTS: usize = 32;

/// Busy window started by a data write, in chip clocks
pub const BUSY_CLOCKS: u32 = 64;

/// Timer periods are counted in units of this many chip clocks
const TIMER_CLOCK_DIVIDER: u32 = 64;

const M1: usize = 0;
const M2: usize = 1;
const C1: usize = 2;
const C2: usize = 3;

/// Key-on register bit for each operator, in register order (M1, M2, C1, C2)
const KEY_ON_BITS: [u8; 4] = [0x08, 0x20, 0x10, 0x40];

/// Test register bit holding the LFO in reset
const TEST_LFO_RESET: u8 = 0x02;

/// Depth register bit selecting PMD (set) or AMD (clear)
const DEPTH_SELECT_PMD: u8 = 0x80;

bitflags! {
    /// Status register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Timer A overflowed
        const TIMER_A = 0x01;
        /// Timer B overflowed
        const TIMER_B = 0x02;
        /// Write in progress
        const BUSY = 0x80;
    }
}

bitflags! {
    /// Mode register (0x14) bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode: u8 {
        /// Load and start Timer A
        const LOAD_A = 0x01;
        /// Load and start Timer B
        const LOAD_B = 0x02;
        /// Timer A sets its status flag on overflow
        const IRQ_ENABLE_A = 0x04;
        /// Timer B sets its status flag on overflow
        const IRQ_ENABLE_B = 0x08;
        /// Clear Timer A status flag
        const RESET_A = 0x10;
        /// Clear Timer B status flag
        const RESET_B = 0x20;
        /// Composite sine mode
        const CSM = 0x80;
    }
}

/// OPM engine state
#[derive(Debug, Clone)]
pub struct Opm {
    clock_hz: u32,
    regs: [u8; 256],
    operators: Vec<Operator>,
    /// Last two M1 outputs per channel
    feedback: [[f32; 2]; 8],
    status: Status,
    timer_running: [bool; 2],
    irq_state: bool,
    /// Amplitude modulation depth (0x19 with bit 7 clear)
    amd: u8,
    /// Phase modulation depth (0x19 with bit 7 set)
    pmd: u8,
    /// LFO phase accumulator; one cycle per 2^30
    lfo_counter: u32,
    sine: Vec<f32>,
}

impl Opm {
    /// Create an engine for the given master clock
    pub fn new(clock_hz: u32) -> Self {
        let mut opm = Opm {
            clock_hz,
            regs: [0; 256],
            operators: vec![Operator::new(); SLOTS],
            feedback: [[0.0; 2]; 8],
            status: Status::empty(),
            timer_running: [false; 2],
            irq_state: false,
            amd: 0,
            pmd: 0,
            lfo_counter: 0,
            sine: sine_table(),
        };
        opm.reset_registers();
        opm
    }

    /// Engine-side register value
    pub fn register(&self, addr: u8) -> u8 {
        self.regs[addr as usize]
    }

    /// Operator state by slot index (`op * 8 + channel`)
    pub fn operator(&self, slot: usize) -> Option<&Operator> {
        self.operators.get(slot)
    }

    /// Whether timer `timer` is currently loaded
    pub fn timer_running(&self, timer: usize) -> bool {
        self.timer_running.get(timer).copied().unwrap_or(false)
    }

    /// Amplitude modulation depth
    pub fn amd(&self) -> u8 {
        self.amd
    }

    /// Phase modulation depth
    pub fn pmd(&self) -> u8 {
        self.pmd
    }

    /// Raw LFO phase accumulator
    pub fn lfo_counter(&self) -> u32 {
        self.lfo_counter
    }

    fn clock_lfo(&mut self) {
        if self.reg(Register::Test.addr()) & TEST_LFO_RESET != 0 {
            self.lfo_counter = 0;
            return;
        }
        let lfrq = u32::from(self.reg(Register::LfoFrequency.addr()));
        let step = (0x10 | (lfrq & 0x0F)) << (lfrq >> 4);
        self.lfo_counter = self.lfo_counter.wrapping_add(step);
    }

    fn reg(&self, addr: u8) -> u8 {
        self.regs[addr as usize]
    }

    fn reset_registers(&mut self) {
        self.regs = [0; 256];
        let base = channel::PAN_FB_CONNECT as usize;
        self.regs[base..base + 8].fill(CHANNEL_CONTROL_RESET);
        for op in self.operators.iter_mut() {
            op.reset();
        }
        self.feedback = [[0.0; 2]; 8];
        self.amd = 0;
        self.pmd = 0;
        self.lfo_counter = 0;
        for ch in 0..8 {
            self.update_channel_frequency(ch);
        }
    }

    fn key_on_write(&mut self, data: u8) {
        let ch = (data & 7) as usize;
        for (op, bit) in KEY_ON_BITS.iter().enumerate() {
            self.operators[op * 8 + ch].set_key(data & bit != 0);
        }
    }

    /// Channel frequency in Hz for a DT2 setting
    fn channel_frequency(&self, ch: usize, dt2: u8) -> f32 {
        let kc = self.reg(channel::KEY_CODE + ch as u8);
        let kf = self.reg(channel::KEY_FRACTION + ch as u8) >> 2;
        let octave = f32::from((kc >> 4) & 7);
        let note = f32::from(NOTE_SEMITONES[(kc & 0x0F) as usize]);
        let semitone = octave * 12.0
            + note
            + f32::from(kf) / 64.0
            + DT2_CENTS[(dt2 & 3) as usize] / 100.0;
        let clock_scale = self.clock_hz as f32 / crate::YM_CLOCK_HZ as f32;
        A4_HZ * 2f32.powf((semitone - A4_SEMITONE) / 12.0) * clock_scale
    }

    fn update_operator_frequency(&mut self, slot: usize) {
        let ch = slot & 7;
        let dt1_mul = self.reg(opreg::DT1_MUL + slot as u8);
        let dt2 = self.reg(opreg::DT2_D2R + slot as u8) >> 6;
        let mul = match dt1_mul & 0x0F {
            0 => 0.5,
            m => f32::from(m),
        };
        let step = self.channel_frequency(ch, dt2) * mul / self.sample_rate() as f32;
        self.operators[slot].set_phase_step(step);
    }

    fn update_channel_frequency(&mut self, ch: usize) {
        for op in 0..4 {
            self.update_operator_frequency(op * 8 + ch);
        }
    }

    fn envelope_rates(&self, slot: usize) -> EnvelopeRates {
        let ch = slot & 7;
        let slot_addr = slot as u8;
        let keycode = u32::from((self.reg(channel::KEY_CODE + ch as u8) >> 2) & 0x1F);
        let ks_ar = self.reg(opreg::KS_AR + slot_addr);
        let key_scale = keycode >> (3 - (ks_ar >> 6));
        let scaled = |rate: u8| -> u32 {
            match rate {
                0 => 0,
                r => (2 * u32::from(r) + key_scale).min(63),
            }
        };
        let d1l_rr = self.reg(opreg::D1L_RR + slot_addr);
        let d1l = u32::from(d1l_rr >> 4);
        EnvelopeRates {
            attack: scaled(ks_ar & 0x1F),
            decay1: scaled(self.reg(opreg::AMSEN_D1R + slot_addr) & 0x1F),
            decay2: scaled(self.reg(opreg::DT2_D2R + slot_addr) & 0x1F),
            release: (4 * u32::from(d1l_rr & 0x0F) + 2 + key_scale).min(63),
            sustain_level: if d1l == 15 { 992.0 } else { (d1l << 5) as f32 },
        }
    }

    fn slot_output(&self, op: usize, ch: usize, modulation: f32) -> f32 {
        let slot = op * 8 + ch;
        let total_level = self.reg(opreg::TOTAL_LEVEL + slot as u8) & 0x7F;
        self.operators[slot].output(modulation, total_level, &self.sine)
    }

    fn channel_output(&mut self, ch: usize) -> f32 {
        let control = self.reg(channel::PAN_FB_CONNECT + ch as u8);
        let algorithm = control & 7;
        let fb = (control >> 3) & 7;

        let history = self.feedback[ch];
        let self_mod = if fb == 0 {
            0.0
        } else {
            // In modulation units; MODULATION_CYCLES scaling happens in the operator
            (history[0] + history[1]) * 2f32.powi(i32::from(fb) - 7) / tables::MODULATION_CYCLES
        };
        let m1 = self.slot_output(M1, ch, self_mod);
        self.feedback[ch] = [history[1], m1];

        match algorithm {
            0 => {
                let c1 = self.slot_output(C1, ch, m1);
                let m2 = self.slot_output(M2, ch, c1);
                self.slot_output(C2, ch, m2)
            }
            1 => {
                let c1 = self.slot_output(C1, ch, 0.0);
                let m2 = self.slot_output(M2, ch, m1 + c1);
                self.slot_output(C2, ch, m2)
            }
            2 => {
                let c1 = self.slot_output(C1, ch, 0.0);
                let m2 = self.slot_output(M2, ch, c1);
                self.slot_output(C2, ch, m1 + m2)
            }
            3 => {
                let c1 = self.slot_output(C1, ch, m1);
                let m2 = self.slot_output(M2, ch, 0.0);
                self.slot_output(C2, ch, c1 + m2)
            }
            4 => {
                let c1 = self.slot_output(C1, ch, m1);
                let m2 = self.slot_output(M2, ch, 0.0);
                c1 + self.slot_output(C2, ch, m2)
            }
            5 => {
                self.slot_output(C1, ch, m1)
                    + self.slot_output(M2, ch, m1)
                    + self.slot_output(C2, ch, m1)
            }
            6 => {
                self.slot_output(C1, ch, m1)
                    + self.slot_output(M2, ch, 0.0)
                    + self.slot_output(C2, ch, 0.0)
            }
            _ => {
                m1 + self.slot_output(C1, ch, 0.0)
                    + self.slot_output(M2, ch, 0.0)
                    + self.slot_output(C2, ch, 0.0)
            }
        }
    }

    fn timer_a_value(&self) -> u32 {
        (u32::from(self.reg(Register::TimerAHi.addr())) << 2)
            | u32::from(self.reg(Register::TimerALo.addr()) & 3)
    }

    fn update_timer<I: ChipInterface>(&mut self, timer: usize, enable: bool, intf: &mut I) {
        if enable && !self.timer_running[timer] {
            let period = if timer == 0 {
                1024 - self.timer_a_value()
            } else {
                16 * (256 - u32::from(self.reg(Register::TimerB.addr())))
            };
            debug!("timer {timer} loaded: {period} ticks");
            intf.on_timer_set(timer, Some(period * TIMER_CLOCK_DIVIDER));
            self.timer_running[timer] = true;
        } else if !enable {
            if self.timer_running[timer] {
                debug!("timer {timer} stopped");
            }
            intf.on_timer_set(timer, None);
            self.timer_running[timer] = false;
        }
    }

    fn check_interrupts<I: ChipInterface>(&mut self, intf: &mut I) {
        let old = self.irq_state;
        self.irq_state = self.status.intersects(Status::TIMER_A | Status::TIMER_B);
        if old != self.irq_state {
            intf.on_irq_changed(self.irq_state);
        }
    }
}

impl OpmBackend for Opm {
    fn reset<I: ChipInterface>(&mut self, intf: &mut I) {
        self.reset_registers();
        self.status = Status::empty();
        self.timer_running = [false; 2];
        intf.on_timer_set(0, None);
        intf.on_timer_set(1, None);
        self.irq_state = false;
        intf.on_irq_changed(false);
    }

    fn write<I: ChipInterface>(&mut self, addr: u8, data: u8, debug: bool, intf: &mut I) {
        if !debug {
            intf.on_busy_end(BUSY_CLOCKS);
        }
        self.regs[addr as usize] = data;

        match addr {
            0x08 => self.key_on_write(data),
            0x19 => {
                if data & DEPTH_SELECT_PMD != 0 {
                    self.pmd = data & 0x7F;
                } else {
                    self.amd = data & 0x7F;
                }
            }
            0x14 => {
                intf.on_mode_write(data);
                self.mode_write(data, intf);
            }
            0x28..=0x37 => self.update_channel_frequency((addr & 7) as usize),
            0x40..=0x5F | 0xC0..=0xDF => self.update_operator_frequency((addr & 0x1F) as usize),
            _ => {}
        }
    }

    fn mode_write<I: ChipInterface>(&mut self, data: u8, intf: &mut I) {
        let mode = Mode::from_bits_truncate(data);
        if mode.contains(Mode::RESET_A) {
            self.status.remove(Status::TIMER_A);
        }
        if mode.contains(Mode::RESET_B) {
            self.status.remove(Status::TIMER_B);
        }
        self.update_timer(1, mode.contains(Mode::LOAD_B), intf);
        self.update_timer(0, mode.contains(Mode::LOAD_A), intf);
        self.check_interrupts(intf);
    }

    fn timer_expired<I: ChipInterface>(&mut self, timer: usize, intf: &mut I) {
        if timer > 1 {
            return;
        }
        let mode = Mode::from_bits_truncate(self.reg(Register::Mode.addr()));
        if timer == 0 && mode.contains(Mode::IRQ_ENABLE_A) {
            self.status.insert(Status::TIMER_A);
        } else if timer == 1 && mode.contains(Mode::IRQ_ENABLE_B) {
            self.status.insert(Status::TIMER_B);
        }
        self.timer_running[timer] = false;
        self.update_timer(timer, true, intf);
        self.check_interrupts(intf);
    }

    fn status(&self) -> u8 {
        self.status.bits()
    }

    fn generate(&mut self) -> (i32, i32) {
        let mut left = 0.0f32;
        let mut right = 0.0f32;
        for ch in 0..8 {
            let out = self.channel_output(ch);
            let control = self.reg(channel::PAN_FB_CONNECT + ch as u8);
            if control & 0x40 != 0 {
                left += out;
            }
            if control & 0x80 != 0 {
                right += out;
            }
        }

        for slot in 0..SLOTS {
            let rates = self.envelope_rates(slot);
            self.operators[slot].clock(&rates);
        }
        self.clock_lfo();

        (
            (left * OPERATOR_SCALE) as i32,
            (right * OPERATOR_SCALE) as i32,
        )
    }

    fn clock_hz(&self) -> u32 {
        self.clock_hz
    }
}
