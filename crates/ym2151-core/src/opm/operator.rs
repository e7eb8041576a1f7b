//! FM operator: phase accumulator plus ADSR envelope

use super::tables::{
    attenuation_to_amplitude, rate_step, ATTENUATION_MAX, MODULATION_CYCLES, SINE_TABLE_SIZE,
};

/// Envelope generator phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Rising towards full volume after key on
    Attack,
    /// Falling towards the first decay level
    Decay,
    /// Falling at the second decay rate while the key is held
    Sustain,
    /// Falling at the release rate after key off
    Release,
}

/// Effective (key-scaled) envelope rates for one operator
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EnvelopeRates {
    pub attack: u32,
    pub decay1: u32,
    pub decay2: u32,
    pub release: u32,
    /// Attenuation at which decay hands over to sustain
    pub sustain_level: f32,
}

/// Single FM operator (slot)
#[derive(Debug, Clone)]
pub struct Operator {
    /// Phase in cycles, kept in [0, 1)
    phase: f32,
    /// Phase increment per native sample, in cycles
    phase_step: f32,
    /// Envelope attenuation in steps (0 = loudest, 1023 = silent)
    attenuation: f32,
    state: EnvelopeState,
    keyed: bool,
}

impl Operator {
    pub(crate) fn new() -> Self {
        Operator {
            phase: 0.0,
            phase_step: 0.0,
            attenuation: ATTENUATION_MAX,
            state: EnvelopeState::Release,
            keyed: false,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn set_phase_step(&mut self, step: f32) {
        self.phase_step = step;
    }

    /// Apply the key bit for this operator; only edges have an effect
    pub(crate) fn set_key(&mut self, on: bool) {
        if on && !self.keyed {
            self.phase = 0.0;
            self.state = EnvelopeState::Attack;
        } else if !on && self.keyed {
            self.state = EnvelopeState::Release;
        }
        self.keyed = on;
    }

    /// Output for the current phase, offset by `modulation` (in operator units)
    pub(crate) fn output(&self, modulation: f32, total_level: u8, sine: &[f32]) -> f32 {
        let attenuation = (self.attenuation + f32::from(total_level) * 8.0).min(ATTENUATION_MAX);
        if attenuation >= ATTENUATION_MAX {
            return 0.0;
        }
        let phase = (self.phase + modulation * MODULATION_CYCLES).rem_euclid(1.0);
        let index = (phase * SINE_TABLE_SIZE as f32) as usize & (SINE_TABLE_SIZE - 1);
        sine[index] * attenuation_to_amplitude(attenuation)
    }

    /// Advance phase and envelope by one native sample
    pub(crate) fn clock(&mut self, rates: &EnvelopeRates) {
        self.phase = (self.phase + self.phase_step).fract();

        match self.state {
            EnvelopeState::Attack => {
                if rates.attack >= 62 {
                    self.attenuation = 0.0;
                } else {
                    let k = (rate_step(rates.attack) / 16.0).min(1.0);
                    self.attenuation -= (self.attenuation + 1.0) * k;
                }
                if self.attenuation <= 0.0 {
                    self.attenuation = 0.0;
                    self.state = EnvelopeState::Decay;
                }
            }
            EnvelopeState::Decay => {
                if self.attenuation >= rates.sustain_level {
                    self.state = EnvelopeState::Sustain;
                } else {
                    self.attenuation += rate_step(rates.decay1);
                }
            }
            EnvelopeState::Sustain => self.attenuation += rate_step(rates.decay2),
            EnvelopeState::Release => self.attenuation += rate_step(rates.release),
        }
        self.attenuation = self.attenuation.min(ATTENUATION_MAX);
    }

    /// Phase increment per native sample, in cycles
    pub fn phase_step(&self) -> f32 {
        self.phase_step
    }

    /// Envelope attenuation in steps
    pub fn attenuation(&self) -> f32 {
        self.attenuation
    }

    /// Envelope generator phase
    pub fn state(&self) -> EnvelopeState {
        self.state
    }
}
