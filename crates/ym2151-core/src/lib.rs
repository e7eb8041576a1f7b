//! YM2151 (OPM) FM synthesizer interface for the Commander X16
//!
//! Wraps an OPM synthesis engine with the timing behaviour the host machine
//! relies on: the 256-byte register shadow, the write busy window, the
//! pending-write FIFO, the two chip timers and the IRQ line. Native-rate
//! samples are pre-generated in lockstep with the CPU clock and resampled to
//! the host output rate on demand.
//!
//! # Features
//! - Register shadow with address/data latches (`$9F40`/`$9F41` port semantics)
//! - Busy-window emulation with strict (drop) or queued (FIFO) write handling
//! - Timer A/B countdowns in chip clocks, IRQ derivation and status reads
//! - Bounded native-rate backbuffer and a windowed-sinc resampler
//! - Debug access and bit-field accessors for every voice and operator parameter
//!
//! # Backend Trait
//! The [`OpmBackend`] trait decouples the interface from the synthesis
//! engine. The bundled [`Opm`] engine is used by default; engines talk back
//! to the interface through the narrow [`ChipInterface`] capability trait.
//!
//! # Quick start
//! ```no_run
//! use ym2151::Ym2151;
//!
//! let mut ym = Ym2151::new();
//! ym.debug_write(0x20, 0xC7); // both channels, algorithm 7
//! ym.debug_write(0x28, 0x4A); // A4
//! ym.key_on(0, true, true, true, true);
//!
//! ym.prerender(8_000); // one millisecond of CPU time
//! let mut out = vec![0i16; 2 * 480];
//! ym.generate(&mut out, 48_000);
//! ```

#![warn(missing_docs)]

pub mod backbuffer;
pub mod backend;
pub mod config;
pub mod fields;
pub mod inspect;
pub mod opm;
pub mod registers;
pub mod resampler;
pub mod timing;
pub mod ym2151;

/// YM2151 master clock on the Commander X16 (NTSC colour burst crystal)
pub const YM_CLOCK_HZ: u32 = 3_579_545;

/// Chip clocks consumed per native output sample
pub const CLOCKS_PER_SAMPLE: u32 = 64;

/// Native sample rate for a given master clock
pub const fn native_sample_rate(clock_hz: u32) -> u32 {
    clock_hz / CLOCKS_PER_SAMPLE
}

/// Error types for YM2151 interface operations
#[derive(thiserror::Error, Debug)]
pub enum Ym2151Error {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type for YM2151 operations
pub type Result<T> = std::result::Result<T, Ym2151Error>;

pub use backbuffer::{SampleBackbuffer, StereoFrame};
pub use backend::{ChipInterface, OpmBackend};
pub use config::ChipConfig;
pub use fields::{Field, GlobalParam, OperatorParam, VoiceParam};
pub use inspect::{ModulationState, SlotState};
pub use opm::{EnvelopeState, Opm};
pub use registers::RegisterBank;
pub use resampler::Resampler;
pub use timing::ChipTiming;
pub use ym2151::Ym2151;
