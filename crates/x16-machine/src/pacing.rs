//! Real-time frame pacing
//!
//! Keeps emulated frames aligned with wall-clock time by telling the loop
//! how long to sleep after each frame. Warp mode never sleeps.

use log::debug;

/// VERA frame period: 800 x 525 pixel clocks at 25 MHz
pub const FRAME_US: u64 = 16_800;

/// Minimum wall-clock gap between display refreshes in warp mode
pub const WARP_DISPLAY_INTERVAL_US: u64 = 16_000;

/// Falling further behind than this restarts the schedule
const MAX_LAG_US: u64 = 10 * FRAME_US;

/// Frame scheduler anchored at the last [`FramePacer::init`]
#[derive(Debug, Clone)]
pub struct FramePacer {
    frame_us: u64,
    start_us: u64,
    frames: u64,
}

impl FramePacer {
    /// Create a pacer for the VERA frame rate, anchored at `now_us`
    pub fn new(now_us: u64) -> Self {
        FramePacer {
            frame_us: FRAME_US,
            start_us: now_us,
            frames: 0,
        }
    }

    /// Restart the schedule at `now_us`
    pub fn init(&mut self, now_us: u64) {
        self.start_us = now_us;
        self.frames = 0;
    }

    /// Frames counted since the last restart
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Record a finished frame
    ///
    /// # Returns
    ///
    /// Microseconds to sleep before emulating the next frame
    pub fn frame_done(&mut self, now_us: u64, warp: bool) -> u64 {
        self.frames += 1;
        if warp {
            return 0;
        }

        let target = self.start_us + self.frames * self.frame_us;
        if target > now_us {
            return target - now_us;
        }
        if now_us - target > MAX_LAG_US {
            debug!("running {} us behind, resyncing", now_us - target);
            self.init(now_us);
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleeps_until_frame_deadline() {
        let mut pacer = FramePacer::new(1_000);
        assert_eq!(pacer.frame_done(1_000 + 5_000, false), FRAME_US - 5_000);
        assert_eq!(pacer.frame_done(1_000 + 2 * FRAME_US, false), 0);
    }

    #[test]
    fn test_warp_never_sleeps() {
        let mut pacer = FramePacer::new(0);
        assert_eq!(pacer.frame_done(0, true), 0);
        assert_eq!(pacer.frames(), 1);
    }

    #[test]
    fn test_resync_after_large_lag() {
        let mut pacer = FramePacer::new(0);
        pacer.frame_done(1_000_000, false);
        assert_eq!(pacer.frames(), 0, "schedule restarted");
        assert_eq!(pacer.frame_done(1_000_000, false), FRAME_US);
    }
}
