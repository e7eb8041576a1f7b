//! Commander X16 machine core
//!
//! Drives one CPU core and the X16's clocked peripherals from a single master
//! loop, keeps the YM2151 sound chip in lockstep with CPU time, and handles
//! the machine-level lifecycle: reset, state dumps and warp mode.
//!
//! The CPU, VERA, the VIAs, memory banking and the host front end are
//! supplied by the embedder through the traits in [`collaborators`].
//!
//! # Example
//! ```no_run
//! # use x16_machine::*;
//! # fn build<C: Cpu>(
//! #     cpu: C,
//! #     memory: Box<dyn Memory>,
//! #     video: Box<dyn Video>,
//! #     via1: Box<dyn Via>,
//! #     via2: Box<dyn Via>,
//! #     host: Box<dyn Host>,
//! # ) -> Result<()> {
//! let config = MachineConfig::default();
//! let bus = SystemBus::new(memory, video, via1, via2, &config)?;
//! let mut machine = Machine::new(cpu, bus, Collaborators::new(host), config)?;
//! machine.reset();
//! match machine.run() {
//!     Exit::Shutdown => println!("bye"),
//!     Exit::Halted => println!("CPU halted"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod audio;
pub mod bus;
pub mod collaborators;
pub mod config;
pub mod dump;
pub mod error;
pub mod machine;
pub mod pacing;

pub use audio::AudioRenderer;
pub use bus::SystemBus;
pub use collaborators::{
    AudioSink, Bus, Clocked, Collaborators, Cpu, CpuRegisters, Debugger, Detached, FrameRecorder,
    Host, Hypercalls, Keyboard, Memory, Midi, Via, Video,
};
pub use config::{MachineConfig, MAX_CPU_MHZ, MAX_WARP_FACTOR};
pub use dump::DumpOptions;
pub use error::{MachineError, Result};
pub use machine::{warp_cheat_mask, Exit, Machine, StepOutcome, HALT_PC};
pub use pacing::{FramePacer, FRAME_US};
