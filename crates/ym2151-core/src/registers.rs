//! YM2151 Register Definitions
//!
//! The OPM exposes a flat 256-byte register space. A handful of global
//! registers sit below 0x20; above that are per-channel blocks (8 entries
//! each) and per-operator blocks (32 entries each, laid out as
//! `base + operator * 8 + channel`).

use std::fmt;

/// Global OPM register address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Test register / LFO reset - 0x01
    Test = 0x01,
    /// Key on/off (channel + operator mask) - 0x08
    KeyOn = 0x08,
    /// Noise enable / frequency - 0x0F
    Noise = 0x0F,
    /// Timer A period, high 8 bits - 0x10
    TimerAHi = 0x10,
    /// Timer A period, low 2 bits - 0x11
    TimerALo = 0x11,
    /// Timer B period - 0x12
    TimerB = 0x12,
    /// Timer load/IRQ enable/flag reset/CSM - 0x14
    Mode = 0x14,
    /// LFO frequency - 0x18
    LfoFrequency = 0x18,
    /// AMD/PMD depth - 0x19
    ModulationDepth = 0x19,
    /// CT2/CT1 outputs and LFO waveform - 0x1B
    ControlWaveform = 0x1B,
}

impl Register {
    /// Convert a raw address to a global register, if it names one
    pub fn from_addr(addr: u8) -> Option<Self> {
        match addr {
            0x01 => Some(Register::Test),
            0x08 => Some(Register::KeyOn),
            0x0F => Some(Register::Noise),
            0x10 => Some(Register::TimerAHi),
            0x11 => Some(Register::TimerALo),
            0x12 => Some(Register::TimerB),
            0x14 => Some(Register::Mode),
            0x18 => Some(Register::LfoFrequency),
            0x19 => Some(Register::ModulationDepth),
            0x1B => Some(Register::ControlWaveform),
            _ => None,
        }
    }

    /// Get the register address value
    pub fn addr(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Test => write!(f, "$01 (Test/LFO Reset)"),
            Register::KeyOn => write!(f, "$08 (Key On)"),
            Register::Noise => write!(f, "$0F (Noise)"),
            Register::TimerAHi => write!(f, "$10 (Timer A High)"),
            Register::TimerALo => write!(f, "$11 (Timer A Low)"),
            Register::TimerB => write!(f, "$12 (Timer B)"),
            Register::Mode => write!(f, "$14 (Timer Mode)"),
            Register::LfoFrequency => write!(f, "$18 (LFO Frequency)"),
            Register::ModulationDepth => write!(f, "$19 (AMD/PMD)"),
            Register::ControlWaveform => write!(f, "$1B (CT/Waveform)"),
        }
    }
}

/// Base address of the per-channel register blocks
pub mod channel {
    /// R/L enable, feedback, connection
    pub const PAN_FB_CONNECT: u8 = 0x20;
    /// Key code (octave, note)
    pub const KEY_CODE: u8 = 0x28;
    /// Key fraction
    pub const KEY_FRACTION: u8 = 0x30;
    /// PMS/AMS sensitivity
    pub const PMS_AMS: u8 = 0x38;
}

/// Base address of the per-operator register blocks
pub mod operator {
    /// DT1/MUL
    pub const DT1_MUL: u8 = 0x40;
    /// Total level
    pub const TOTAL_LEVEL: u8 = 0x60;
    /// Key scale / attack rate
    pub const KS_AR: u8 = 0x80;
    /// AMS enable / first decay rate
    pub const AMSEN_D1R: u8 = 0xA0;
    /// DT2 / second decay rate
    pub const DT2_D2R: u8 = 0xC0;
    /// First decay level / release rate
    pub const D1L_RR: u8 = 0xE0;
}

/// Value loaded into the channel control block on reset (both outputs on)
pub const CHANNEL_CONTROL_RESET: u8 = 0xC0;

/// Raw register mirror (256 bytes)
#[derive(Debug, Clone, Copy)]
pub struct RegisterBank {
    /// Register values 0x00-0xFF
    pub registers: [u8; 256],
}

impl RegisterBank {
    /// Create a new register bank in its reset state
    pub fn new() -> Self {
        let mut bank = RegisterBank {
            registers: [0; 256],
        };
        bank.reset();
        bank
    }

    /// Zero every register, then enable both outputs on all eight channels
    pub fn reset(&mut self) {
        self.registers = [0; 256];
        let base = channel::PAN_FB_CONNECT as usize;
        self.registers[base..base + 8].fill(CHANNEL_CONTROL_RESET);
    }

    /// Read a register value
    pub fn read(&self, addr: u8) -> u8 {
        self.registers[addr as usize]
    }

    /// Write a register value
    pub fn write(&mut self, addr: u8, value: u8) {
        self.registers[addr as usize] = value;
    }

    /// Get all registers as a slice
    pub fn as_slice(&self) -> &[u8; 256] {
        &self.registers
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}
