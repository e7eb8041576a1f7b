//! Per-instruction audio rendering
//!
//! Every instruction's cycles are handed to the YM2151 so its native-rate
//! backbuffer, busy window and timers stay in step with the CPU. Host-rate
//! output is produced one buffer at a time, as soon as enough CPU time has
//! elapsed to fill it, and pushed to the audio sink.

use log::trace;
use ym2151::Ym2151;

use crate::collaborators::AudioSink;
use crate::config::MachineConfig;

/// Turns CPU cycles into host audio buffers
#[derive(Debug, Clone)]
pub struct AudioRenderer {
    sample_rate: u32,
    cpu_clock_hz: u64,
    /// Elapsed CPU clocks not yet converted to host frames, scaled by the host rate
    clock_acc: u64,
    /// Host frames owed but not yet rendered
    owed_frames: usize,
    buffer: Vec<i16>,
}

impl AudioRenderer {
    /// Create a renderer for the configured host rate and buffer size
    pub fn new(config: &MachineConfig) -> Self {
        AudioRenderer {
            sample_rate: config.audio_sample_rate,
            cpu_clock_hz: u64::from(config.cpu_clock_hz()),
            clock_acc: 0,
            owed_frames: 0,
            buffer: vec![0; 2 * config.audio_buffer_frames],
        }
    }

    /// Frames per host buffer
    pub fn buffer_frames(&self) -> usize {
        self.buffer.len() / 2
    }

    /// Host frames accumulated towards the next buffer
    pub fn owed_frames(&self) -> usize {
        self.owed_frames
    }

    /// Account for `cycles` CPU cycles
    pub fn render(&mut self, cycles: u32, ym: &mut Ym2151, sink: &mut dyn AudioSink) {
        ym.prerender(cycles);

        self.clock_acc += u64::from(cycles) * u64::from(self.sample_rate);
        self.owed_frames += (self.clock_acc / self.cpu_clock_hz) as usize;
        self.clock_acc %= self.cpu_clock_hz;

        let frames = self.buffer_frames();
        while self.owed_frames >= frames {
            ym.generate(&mut self.buffer, self.sample_rate);
            sink.push_samples(&self.buffer, frames);
            self.owed_frames -= frames;
            trace!("pushed {frames} audio frames");
        }
    }

    /// Forget partially accumulated time
    pub fn reset(&mut self) {
        self.clock_acc = 0;
        self.owed_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        pushes: usize,
        frames: usize,
    }

    impl AudioSink for CountingSink {
        fn push_samples(&mut self, samples: &[i16], frames: usize) {
            assert_eq!(samples.len(), 2 * frames);
            self.pushes += 1;
            self.frames += frames;
        }
    }

    #[test]
    fn test_one_second_of_cycles_yields_one_second_of_audio() {
        let config = MachineConfig {
            audio_buffer_frames: 480,
            ..MachineConfig::default()
        };
        let mut renderer = AudioRenderer::new(&config);
        let mut ym = Ym2151::new();
        let mut sink = CountingSink::default();

        // 8 MHz, four cycles per instruction
        for _ in 0..2_000_000 {
            renderer.render(4, &mut ym, &mut sink);
        }
        assert_eq!(sink.frames, 48_000);
        assert_eq!(sink.pushes, 100);
        assert_eq!(renderer.owed_frames(), 0);
    }

    #[test]
    fn test_no_output_before_a_full_buffer() {
        let mut renderer = AudioRenderer::new(&MachineConfig::default());
        let mut ym = Ym2151::new();
        let mut sink = CountingSink::default();
        renderer.render(1000, &mut ym, &mut sink);
        assert_eq!(sink.pushes, 0);
        assert_eq!(renderer.owed_frames(), 6);
        assert!(!ym.backbuffer().is_empty(), "YM prerendered alongside");
    }
}
