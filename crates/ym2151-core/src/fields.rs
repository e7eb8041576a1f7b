//! Bit-field register model
//!
//! Maps logical OPM parameters onto bit ranges of physical register bytes.
//! Everything here is pure: a parameter knows its register address and bit
//! range, and [`Field`] packs or unpacks values without touching chip state.

use bit_field::BitField;

use crate::registers::{channel, operator, Register};

/// Number of FM channels (voices)
pub const VOICES: u8 = 8;

/// Number of operators per voice
pub const OPERATORS: u8 = 4;

/// A contiguous bit range inside a register byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    lsb: u8,
    width: u8,
}

impl Field {
    /// Field covering bits `msb..=lsb`
    pub const fn bits(msb: u8, lsb: u8) -> Self {
        Field {
            lsb,
            width: msb - lsb + 1,
        }
    }

    /// Single-bit field
    pub const fn bit(bit: u8) -> Self {
        Field { lsb: bit, width: 1 }
    }

    /// Mask of the field value (unshifted)
    pub const fn max(&self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    /// Extract the field from `byte`
    pub fn get(&self, byte: u8) -> u8 {
        let lsb = self.lsb as usize;
        byte.get_bits(lsb..lsb + self.width as usize)
    }

    /// Return `byte` with the field replaced by `value` (masked to width)
    pub fn set(&self, byte: u8, value: u8) -> u8 {
        let lsb = self.lsb as usize;
        let mut out = byte;
        out.set_bits(lsb..lsb + self.width as usize, value & self.max());
        out
    }
}

/// Chip-wide parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalParam {
    /// Last value written to the key-on register
    LastKeyOn,
    /// LFO frequency
    LfoFrequency,
    /// AMD or PMD depth (whichever the type bit selects)
    ModulationDepth,
    /// 0 = amplitude depth, 1 = phase depth
    ModulationType,
    /// LFO waveform (saw, square, triangle, noise)
    Waveform,
    /// Control output 1
    Ct1,
    /// Control output 2
    Ct2,
}

impl GlobalParam {
    /// Register address and bit range
    pub fn location(&self) -> (u8, Field) {
        match self {
            GlobalParam::LastKeyOn => (Register::KeyOn.addr(), Field::bits(7, 0)),
            GlobalParam::LfoFrequency => (Register::LfoFrequency.addr(), Field::bits(7, 0)),
            GlobalParam::ModulationDepth => (Register::ModulationDepth.addr(), Field::bits(6, 0)),
            GlobalParam::ModulationType => (Register::ModulationDepth.addr(), Field::bit(7)),
            GlobalParam::Waveform => (Register::ControlWaveform.addr(), Field::bits(1, 0)),
            GlobalParam::Ct1 => (Register::ControlWaveform.addr(), Field::bit(6)),
            GlobalParam::Ct2 => (Register::ControlWaveform.addr(), Field::bit(7)),
        }
    }
}

/// Per-voice parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceParam {
    /// Algorithm (operator connection)
    Connection,
    /// Operator 1 self-feedback
    Feedback,
    /// Left output enable
    LeftEnable,
    /// Right output enable
    RightEnable,
    /// Note code within the octave
    Note,
    /// Octave (block)
    Octave,
    /// Key fraction, 1/64 semitone steps
    KeyFraction,
    /// Amplitude modulation sensitivity
    Ams,
    /// Phase modulation sensitivity
    Pms,
}

impl VoiceParam {
    /// Every voice parameter, in register order
    pub const ALL: [VoiceParam; 9] = [
        VoiceParam::Connection,
        VoiceParam::Feedback,
        VoiceParam::LeftEnable,
        VoiceParam::RightEnable,
        VoiceParam::Note,
        VoiceParam::Octave,
        VoiceParam::KeyFraction,
        VoiceParam::Ams,
        VoiceParam::Pms,
    ];

    fn base_and_field(&self) -> (u8, Field) {
        match self {
            VoiceParam::Connection => (channel::PAN_FB_CONNECT, Field::bits(2, 0)),
            VoiceParam::Feedback => (channel::PAN_FB_CONNECT, Field::bits(5, 3)),
            VoiceParam::LeftEnable => (channel::PAN_FB_CONNECT, Field::bit(6)),
            VoiceParam::RightEnable => (channel::PAN_FB_CONNECT, Field::bit(7)),
            VoiceParam::Note => (channel::KEY_CODE, Field::bits(3, 0)),
            VoiceParam::Octave => (channel::KEY_CODE, Field::bits(6, 4)),
            VoiceParam::KeyFraction => (channel::KEY_FRACTION, Field::bits(7, 2)),
            VoiceParam::Ams => (channel::PMS_AMS, Field::bits(1, 0)),
            VoiceParam::Pms => (channel::PMS_AMS, Field::bits(6, 4)),
        }
    }

    /// Register address and bit range for `voice`, or `None` if out of range
    pub fn location(&self, voice: u8) -> Option<(u8, Field)> {
        if voice >= VOICES {
            return None;
        }
        let (base, field) = self.base_and_field();
        Some((base + voice, field))
    }
}

/// Per-operator parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorParam {
    /// Frequency multiplier
    Mul,
    /// Fine detune
    Dt1,
    /// Total level (attenuation)
    TotalLevel,
    /// Attack rate
    AttackRate,
    /// Key scaling
    KeyScale,
    /// First decay rate
    Decay1Rate,
    /// Amplitude modulation enable
    AmsEnable,
    /// Second decay (sustain) rate
    Decay2Rate,
    /// Coarse detune
    Dt2,
    /// Release rate
    ReleaseRate,
    /// First decay level
    Decay1Level,
}

impl OperatorParam {
    /// Every operator parameter, in register order
    pub const ALL: [OperatorParam; 11] = [
        OperatorParam::Mul,
        OperatorParam::Dt1,
        OperatorParam::TotalLevel,
        OperatorParam::AttackRate,
        OperatorParam::KeyScale,
        OperatorParam::Decay1Rate,
        OperatorParam::AmsEnable,
        OperatorParam::Decay2Rate,
        OperatorParam::Dt2,
        OperatorParam::ReleaseRate,
        OperatorParam::Decay1Level,
    ];

    fn base_and_field(&self) -> (u8, Field) {
        match self {
            OperatorParam::Mul => (operator::DT1_MUL, Field::bits(3, 0)),
            OperatorParam::Dt1 => (operator::DT1_MUL, Field::bits(6, 4)),
            OperatorParam::TotalLevel => (operator::TOTAL_LEVEL, Field::bits(6, 0)),
            OperatorParam::AttackRate => (operator::KS_AR, Field::bits(4, 0)),
            OperatorParam::KeyScale => (operator::KS_AR, Field::bits(7, 6)),
            OperatorParam::Decay1Rate => (operator::AMSEN_D1R, Field::bits(4, 0)),
            OperatorParam::AmsEnable => (operator::AMSEN_D1R, Field::bit(7)),
            OperatorParam::Decay2Rate => (operator::DT2_D2R, Field::bits(4, 0)),
            OperatorParam::Dt2 => (operator::DT2_D2R, Field::bits(7, 6)),
            OperatorParam::ReleaseRate => (operator::D1L_RR, Field::bits(3, 0)),
            OperatorParam::Decay1Level => (operator::D1L_RR, Field::bits(7, 4)),
        }
    }

    /// Register address and bit range for `voice`/`op`, or `None` if out of range
    ///
    /// `op` counts in register order (M1, M2, C1, C2).
    pub fn location(&self, voice: u8, op: u8) -> Option<(u8, Field)> {
        if voice >= VOICES || op >= OPERATORS {
            return None;
        }
        let (base, field) = self.base_and_field();
        Some((base + op * 8 + voice, field))
    }
}
