//! Busy window, chip timers and IRQ latch
//!
//! Counts in chip master clocks. The engine arms and cancels timers through
//! [`ChipInterface`]; [`ChipTiming::advance`] runs the countdowns and reports
//! which timers expired so the caller can hand them back to the engine.

use log::trace;

use crate::backend::ChipInterface;

/// Timer/busy/IRQ state shared between the interface and the engine
#[derive(Debug, Clone, Default)]
pub struct ChipTiming {
    /// Clocks left in the current busy window
    busy_clocks: u32,
    /// Clocks left per timer; `None` while the timer is not armed
    timers: [Option<u32>; 2],
    /// IRQ output as last reported by the engine
    irq: bool,
}

impl ChipTiming {
    /// Create idle timing state
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear busy window, timers and IRQ
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Run all countdowns forward by `clocks`
    ///
    /// # Returns
    ///
    /// Expiry flags per timer. An armed timer reaching zero fires once and is
    /// disarmed until the engine arms it again.
    pub fn advance(&mut self, clocks: u32) -> [bool; 2] {
        self.busy_clocks = self.busy_clocks.saturating_sub(clocks);

        let mut expired = [false; 2];
        for (timer, slot) in self.timers.iter_mut().enumerate() {
            if let Some(remaining) = slot {
                *remaining = remaining.saturating_sub(clocks);
                if *remaining == 0 {
                    *slot = None;
                    expired[timer] = true;
                }
            }
        }
        expired
    }

    /// Clocks left in the busy window
    pub fn busy_clocks(&self) -> u32 {
        self.busy_clocks
    }

    /// Clocks left before `timer` fires, `None` if it is not armed
    pub fn timer_remaining(&self, timer: usize) -> Option<u32> {
        self.timers.get(timer).copied().flatten()
    }

    /// IRQ output of the engine (not gated by the host enable)
    pub fn irq_asserted(&self) -> bool {
        self.irq
    }
}

impl ChipInterface for ChipTiming {
    fn on_timer_set(&mut self, timer: usize, duration: Option<u32>) {
        if let Some(slot) = self.timers.get_mut(timer) {
            trace!("timer {timer} set to {duration:?} clocks");
            *slot = duration;
        }
    }

    fn on_busy_end(&mut self, clocks: u32) {
        self.busy_clocks = clocks;
    }

    fn is_busy(&self) -> bool {
        self.busy_clocks > 0
    }

    fn on_irq_changed(&mut self, asserted: bool) {
        self.irq = asserted;
    }

    fn on_mode_write(&mut self, data: u8) {
        trace!("mode write ${data:02X}");
    }
}
