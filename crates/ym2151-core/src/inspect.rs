//! Debug inspection and parameter editing
//!
//! Reads go to the register shadow; edits go through
//! [`Ym2151::debug_write`] so they take effect immediately and never open a
//! busy window. Out-of-range voices/operators read as 0 and ignore edits.

use crate::backend::OpmBackend;
use crate::fields::{Field, GlobalParam, OperatorParam, VoiceParam};
use crate::opm::{EnvelopeState, Opm, SLOTS};
use crate::registers::Register;
use crate::ym2151::Ym2151;

/// Snapshot of one operator slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotState {
    /// Oscillator frequency in Hz
    pub frequency: f32,
    /// Envelope output, 1.0 = full level, 0.0 = silent
    pub envelope_level: f32,
    /// Envelope generator phase
    pub state: EnvelopeState,
}

/// Snapshot of the LFO and modulation depths
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationState {
    /// Amplitude modulation depth (AMD, 0-127)
    pub amplitude_depth: u8,
    /// Phase modulation depth (PMD, 0-127)
    pub phase_depth: u8,
    /// LFO position within its cycle, 0.0 to just below 1.0
    pub lfo_phase: f32,
}

/// LFO cycle length in accumulator units
const LFO_CYCLE: u32 = 1 << 30;

impl<B: OpmBackend> Ym2151<B> {
    fn read_field(&self, location: Option<(u8, Field)>) -> u8 {
        location
            .map(|(addr, field)| field.get(self.debug_read(addr)))
            .unwrap_or(0)
    }

    fn write_field(&mut self, location: Option<(u8, Field)>, value: u8) {
        if let Some((addr, field)) = location {
            let byte = field.set(self.debug_read(addr), value);
            self.debug_write(addr, byte);
        }
    }

    /// Read a chip-wide parameter
    pub fn global(&self, param: GlobalParam) -> u8 {
        self.read_field(Some(param.location()))
    }

    /// Edit a chip-wide parameter
    pub fn set_global(&mut self, param: GlobalParam, value: u8) {
        self.write_field(Some(param.location()), value);
    }

    /// Read a voice parameter
    pub fn voice(&self, voice: u8, param: VoiceParam) -> u8 {
        self.read_field(param.location(voice))
    }

    /// Edit a voice parameter
    pub fn set_voice(&mut self, voice: u8, param: VoiceParam, value: u8) {
        self.write_field(param.location(voice), value);
    }

    /// Read an operator parameter (`op` in register order M1, M2, C1, C2)
    pub fn operator(&self, voice: u8, op: u8, param: OperatorParam) -> u8 {
        self.read_field(param.location(voice, op))
    }

    /// Edit an operator parameter
    pub fn set_operator(&mut self, voice: u8, op: u8, param: OperatorParam, value: u8) {
        self.write_field(param.location(voice, op), value);
    }

    /// Last value written to the key-on register
    pub fn last_key_on(&self) -> u8 {
        self.global(GlobalParam::LastKeyOn)
    }

    /// Key the given operators of `channel` on (and the others off)
    pub fn key_on(&mut self, channel: u8, m1: bool, c1: bool, m2: bool, c2: bool) {
        let value = (channel & 7)
            | u8::from(m1) << 3
            | u8::from(c1) << 4
            | u8::from(m2) << 5
            | u8::from(c2) << 6;
        self.debug_write(Register::KeyOn.addr(), value);
    }
}

impl Ym2151<Opm> {
    /// Current LFO phase and AMD/PMD depths
    pub fn modulation_state(&self) -> ModulationState {
        let engine = self.engine();
        ModulationState {
            amplitude_depth: engine.amd(),
            phase_depth: engine.pmd(),
            lfo_phase: (engine.lfo_counter() & (LFO_CYCLE - 1)) as f32 / LFO_CYCLE as f32,
        }
    }

    /// Snapshot of operator slot `slot` (`op * 8 + channel`)
    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        if slot >= SLOTS {
            return None;
        }
        let op = self.engine().operator(slot)?;
        Some(SlotState {
            frequency: op.phase_step() * self.sample_rate() as f32,
            envelope_level: (1024.0 - op.attenuation()) / 1024.0,
            state: op.state(),
        })
    }
}
