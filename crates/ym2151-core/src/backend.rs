//! Backend trait abstraction for OPM synthesis engines
//!
//! The interface layer ([`crate::Ym2151`]) owns busy-state, timers and the
//! IRQ line; the engine owns the synthesis state. The two meet through a pair
//! of traits:
//!
//! - [`OpmBackend`] is what the interface calls on the engine (apply a write,
//!   produce a sample, handle a timer expiry).
//! - [`ChipInterface`] is what the engine calls back on the interface (arm a
//!   timer, start a busy window, report an IRQ change).
//!
//! The interface is passed by `&mut` into every engine call that can trigger a
//! callback, so there is no shared ownership between the two.

/// Capabilities an OPM engine may use on the surrounding interface
///
/// All durations are in chip master clocks.
pub trait ChipInterface {
    /// Arm or cancel a chip timer
    ///
    /// # Arguments
    ///
    /// * `timer` - Timer index (0 = Timer A, 1 = Timer B)
    /// * `duration` - Clocks until expiry, or `None` to cancel
    fn on_timer_set(&mut self, timer: usize, duration: Option<u32>);

    /// Start a busy window lasting `clocks` chip clocks
    fn on_busy_end(&mut self, clocks: u32);

    /// Whether a busy window is currently open
    fn is_busy(&self) -> bool;

    /// Report a change of the engine's IRQ output
    fn on_irq_changed(&mut self, asserted: bool);

    /// Notification that the engine is applying a mode register write
    ///
    /// The write is applied synchronously right after this call returns.
    fn on_mode_write(&mut self, _data: u8) {}

    /// Read from external sample memory (not present on the OPM)
    fn on_external_read(&mut self, _address: u32) -> u8 {
        0
    }

    /// Write to external sample memory (not present on the OPM)
    fn on_external_write(&mut self, _address: u32, _data: u8) {}
}

/// Common interface for OPM engine backends
///
/// # Example
///
/// ```
/// use ym2151::{ChipTiming, Opm, OpmBackend};
///
/// let mut timing = ChipTiming::new();
/// let mut opm = Opm::new(ym2151::YM_CLOCK_HZ);
/// opm.reset(&mut timing);
/// opm.write(0x10, 0xFF, false, &mut timing); // Timer A high bits
/// opm.write(0x14, 0x05, false, &mut timing); // load + enable Timer A
/// assert!(timing.timer_remaining(0).is_some());
/// ```
pub trait OpmBackend {
    /// Reset the engine to power-on state
    ///
    /// Clears registers and envelopes, cancels both timers and drops the IRQ.
    fn reset<I: ChipInterface>(&mut self, intf: &mut I);

    /// Apply a register write
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address (0x00-0xFF)
    /// * `data` - Register value
    /// * `debug` - When set, no busy window is started
    /// * `intf` - Interface used for timer/busy/IRQ callbacks
    fn write<I: ChipInterface>(&mut self, addr: u8, data: u8, debug: bool, intf: &mut I);

    /// Apply a write to the mode register (0x14)
    ///
    /// Resets status flags, loads or stops the timers and updates the IRQ
    /// output. Called synchronously from [`OpmBackend::write`].
    fn mode_write<I: ChipInterface>(&mut self, data: u8, intf: &mut I);

    /// Handle expiry of a timer armed through [`ChipInterface::on_timer_set`]
    fn timer_expired<I: ChipInterface>(&mut self, timer: usize, intf: &mut I);

    /// Read the status register (busy bit not included)
    fn status(&self) -> u8;

    /// Produce one native-rate stereo sample
    ///
    /// # Returns
    ///
    /// `(left, right)` in signed 16-bit range (not yet clamped)
    fn generate(&mut self) -> (i32, i32);

    /// Master clock the engine was created for, in Hz
    fn clock_hz(&self) -> u32;

    /// Native sample rate in Hz
    fn sample_rate(&self) -> u32 {
        crate::native_sample_rate(self.clock_hz())
    }
}
