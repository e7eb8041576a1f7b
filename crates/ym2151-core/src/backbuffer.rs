//! Native-rate sample backbuffer
//!
//! Holds stereo frames produced ahead of the host's audio callback. Frames
//! stay in chronological order; consumers retire them from the front.

use log::trace;

/// One stereo frame, `[left, right]`
pub type StereoFrame = [i16; 2];

/// Bounded buffer of pre-generated native-rate frames
#[derive(Debug, Clone)]
pub struct SampleBackbuffer {
    frames: Vec<StereoFrame>,
    capacity: usize,
}

impl SampleBackbuffer {
    /// Create an empty buffer holding at most `capacity` frames
    pub fn with_capacity(capacity: usize) -> Self {
        SampleBackbuffer {
            frames: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame; returns `false` (and drops the frame) when full
    pub fn push(&mut self, frame: StereoFrame) -> bool {
        if self.frames.len() >= self.capacity {
            trace!("backbuffer full, dropping frame");
            return false;
        }
        self.frames.push(frame);
        true
    }

    /// Remove the oldest `count` frames, shifting the rest to the front
    pub fn retire(&mut self, count: usize) {
        let count = count.min(self.frames.len());
        self.frames.drain(..count);
    }

    /// Drop every buffered frame
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Buffered frames, oldest first
    pub fn frames(&self) -> &[StereoFrame] {
        &self.frames
    }

    /// Number of buffered frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Maximum number of frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames that can still be pushed
    pub fn remaining(&self) -> usize {
        self.capacity - self.frames.len()
    }
}
