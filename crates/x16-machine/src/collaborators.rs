//! Interfaces to the components the core drives but does not implement.
//!
//! The CPU core, VERA, the VIAs, memory banking and the host front end all
//! live outside this crate. The machine only relies on the contracts below.
//! [`Detached`] provides no-op implementations for the optional ones.

use std::io::{self, Write};

/// CPU-visible address space.
pub trait Bus {
    /// Read a byte (may have side effects on I/O registers).
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte.
    fn write(&mut self, addr: u16, value: u8);

    /// Read a byte without side effects.
    fn debug_read(&mut self, addr: u16) -> u8;
}

/// 65C02 register file snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuRegisters {
    /// Accumulator
    pub a: u8,
    /// X index
    pub x: u8,
    /// Y index
    pub y: u8,
    /// Stack pointer
    pub sp: u8,
    /// Processor status
    pub status: u8,
    /// Program counter
    pub pc: u16,
}

/// CPU core.
pub trait Cpu {
    /// Execute a single instruction and return the number of cycles consumed.
    fn step<B: Bus>(&mut self, bus: &mut B) -> u32;

    /// Signal a non-maskable interrupt.
    fn nmi(&mut self);

    /// Signal a maskable interrupt.
    fn irq(&mut self);

    /// Reset the CPU (fetches the reset vector through the bus).
    fn reset<B: Bus>(&mut self, bus: &mut B);

    /// Get the program counter.
    fn pc(&self) -> u16;

    /// Get all registers.
    fn registers(&self) -> CpuRegisters;
}

/// VERA video chip.
pub trait Video {
    /// Advance by `cycles` CPU cycles at `mhz`; returns true when a frame completed.
    fn step(&mut self, mhz: u32, cycles: u32) -> bool;

    /// IRQ output.
    fn irq(&self) -> bool;

    /// Read a register (`reg` = 0x00-0x1F).
    fn read(&mut self, reg: u8, debug: bool) -> u8;

    /// Write a register.
    fn write(&mut self, reg: u8, value: u8);

    /// Last completed frame.
    fn framebuffer(&self) -> &[u8];

    /// Set the mask of scanlines skipped while in warp mode.
    fn set_cheat_mask(&mut self, mask: u32);

    /// Redraw the whole screen on the next display refresh.
    fn force_redraw(&mut self);

    /// Reset to power-on state.
    fn reset(&mut self);

    /// Write video memory to `out`.
    fn save_vram(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// 6522 VIA.
pub trait Via {
    /// Power-on initialisation.
    fn init(&mut self);

    /// Advance by `cycles` CPU cycles.
    fn step(&mut self, cycles: u32);

    /// IRQ output.
    fn irq(&self) -> bool;

    /// Read a register (`reg` = 0x0-0xF).
    fn read(&mut self, reg: u8, debug: bool) -> u8;

    /// Write a register.
    fn write(&mut self, reg: u8, value: u8);
}

/// Peripheral that only needs to see elapsed cycles (RTC, serial bus).
pub trait Clocked {
    /// Advance by `cycles` CPU cycles.
    fn step(&mut self, cycles: u32);
}

/// RAM, ROM and bank switching.
pub trait Memory {
    /// Read a byte outside the I/O area.
    fn read(&mut self, addr: u16, debug: bool) -> u8;

    /// Write a byte outside the I/O area.
    fn write(&mut self, addr: u16, value: u8);

    /// Reset to power-on state.
    fn reset(&mut self);

    /// Write main RAM and/or banked RAM to `out`.
    fn save(&self, out: &mut dyn Write, ram: bool, banks: bool) -> io::Result<()>;
}

/// Host window, input and clock.
pub trait Host {
    /// Process window/input events; returns false when the user asked to quit.
    fn poll_events(&mut self) -> bool;

    /// Present a frame.
    fn refresh_display(&mut self, framebuffer: &[u8]);

    /// Monotonic wall clock in microseconds.
    fn now_us(&self) -> u64;

    /// Block for `us` microseconds.
    fn sleep_us(&mut self, us: u64);
}

/// Host audio output.
pub trait AudioSink {
    /// Queue `frames` interleaved stereo frames.
    fn push_samples(&mut self, samples: &[i16], frames: usize);
}

/// Debugger front end.
pub trait Debugger {
    /// Whether execution is paused.
    fn is_paused(&self) -> bool;

    /// Notification that an interrupt was delivered.
    fn interrupt(&mut self);
}

/// Emulator traps triggered by the running program.
pub trait Hypercalls {
    /// Handle any trap pending at `pc`.
    fn process(&mut self, pc: u16, bus: &mut dyn Bus);
}

/// MIDI input.
pub trait Midi {
    /// Drain pending host MIDI input.
    fn process(&mut self);
}

/// GIF/video recorder.
pub trait FrameRecorder {
    /// Offer a completed frame.
    fn update(&mut self, framebuffer: &[u8]);
}

/// Keyboard input.
pub trait Keyboard {
    /// Feed pending key events to the machine.
    fn process(&mut self);
}

/// No-op stand-in for optional collaborators.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl Clocked for Detached {
    fn step(&mut self, _cycles: u32) {}
}

impl AudioSink for Detached {
    fn push_samples(&mut self, _samples: &[i16], _frames: usize) {}
}

impl Debugger for Detached {
    fn is_paused(&self) -> bool {
        false
    }

    fn interrupt(&mut self) {}
}

impl Hypercalls for Detached {
    fn process(&mut self, _pc: u16, _bus: &mut dyn Bus) {}
}

impl Midi for Detached {
    fn process(&mut self) {}
}

impl FrameRecorder for Detached {
    fn update(&mut self, _framebuffer: &[u8]) {}
}

impl Keyboard for Detached {
    fn process(&mut self) {}
}

/// Host-side collaborators of a [`crate::Machine`].
pub struct Collaborators {
    /// Window, input and clock
    pub host: Box<dyn Host>,
    /// Audio output
    pub audio: Box<dyn AudioSink>,
    /// Debugger
    pub debugger: Box<dyn Debugger>,
    /// Trap handler
    pub hypercalls: Box<dyn Hypercalls>,
    /// MIDI input
    pub midi: Box<dyn Midi>,
    /// Frame recorder
    pub recorder: Box<dyn FrameRecorder>,
    /// Keyboard input
    pub keyboard: Box<dyn Keyboard>,
    /// Real-time clock
    pub rtc: Box<dyn Clocked>,
    /// Serial bus
    pub serial: Box<dyn Clocked>,
}

impl Collaborators {
    /// Collaborators with every optional component detached.
    pub fn new(host: Box<dyn Host>) -> Self {
        Collaborators {
            host,
            audio: Box::new(Detached),
            debugger: Box::new(Detached),
            hypercalls: Box::new(Detached),
            midi: Box::new(Detached),
            recorder: Box::new(Detached),
            keyboard: Box::new(Detached),
            rtc: Box::new(Detached),
            serial: Box::new(Detached),
        }
    }
}
