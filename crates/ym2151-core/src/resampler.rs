//! Native-rate to host-rate resampling
//!
//! Push-model resampler: every native input sample is pushed once and any
//! output samples that become computable are appended to the caller's queue.
//! Surplus output stays in that queue for the next request, so no fractional
//! state is lost between calls.
//!
//! Equal rates use an exact pass-through. Everything else goes through a
//! Kaiser-windowed sinc filter evaluated from a precomputed polyphase table
//! (nearest phase). Every phase is normalised to unity DC gain.

use std::collections::VecDeque;

/// Filter half-width in input samples (the filter has `2 * HALF_WIDTH` taps)
const HALF_WIDTH: usize = 16;
const TAPS: usize = 2 * HALF_WIDTH;

/// Polyphase table resolution
const PHASES: usize = 512;

/// Stopband attenuation in dB
const STOPBAND_DB: f64 = 80.0;

/// Fraction of the lower Nyquist frequency kept as passband
const PASSBAND: f64 = 0.9;

/// Zeroth-order modified Bessel function of the first kind
fn i0(x: f64) -> f64 {
    const EPSILON: f64 = 1e-6;
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut n = 1.0;
    loop {
        let t = half / n;
        n += 1.0;
        term *= t * t;
        sum += term;
        if term < EPSILON * sum {
            return sum;
        }
    }
}

fn build_table(input_rate: u32, output_rate: u32) -> Vec<f32> {
    let pi = std::f64::consts::PI;
    let ratio = (f64::from(output_rate) / f64::from(input_rate)).min(1.0);
    // Cutoff in cycles per input sample
    let cutoff = 0.5 * ratio * PASSBAND;
    let beta = 0.1102 * (STOPBAND_DB - 8.7);
    let i0_beta = i0(beta);
    let half = HALF_WIDTH as f64;

    let mut table = Vec::with_capacity((PHASES + 1) * TAPS);
    for phase in 0..=PHASES {
        let lag = phase as f64 / PHASES as f64;
        let start = table.len();
        for tap in 0..TAPS {
            let distance = half - tap as f64 - lag;
            let x = distance / half;
            let kaiser = if x.abs() <= 1.0 {
                i0(beta * (1.0 - x * x).sqrt()) / i0_beta
            } else {
                0.0
            };
            let arg = 2.0 * pi * cutoff * distance;
            let sinc = if arg.abs() >= 1e-9 { arg.sin() / arg } else { 1.0 };
            table.push(sinc * kaiser);
        }
        let sum: f64 = table[start..].iter().sum();
        for c in &mut table[start..] {
            *c /= sum;
        }
    }
    table.into_iter().map(|c| c as f32).collect()
}

/// Windowed-sinc resampler for one channel
#[derive(Debug, Clone)]
pub struct SincResampler {
    input_rate: u32,
    output_rate: u32,
    /// Last `TAPS` inputs, oldest first
    history: VecDeque<f32>,
    /// (newest input time - next output time) scaled by the output rate
    position: i64,
    table: Vec<f32>,
}

impl SincResampler {
    /// Create a resampler between two non-zero rates
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        SincResampler {
            input_rate,
            output_rate,
            history: VecDeque::from(vec![0.0; TAPS]),
            position: -i64::from(output_rate),
            table: build_table(input_rate, output_rate),
        }
    }

    /// Forget all filter history
    pub fn reset(&mut self) {
        self.history.iter_mut().for_each(|x| *x = 0.0);
        self.position = -i64::from(self.output_rate);
    }

    /// Push one input sample, appending any produced outputs to `out`
    pub fn process(&mut self, input: i16, out: &mut VecDeque<i16>) {
        self.history.pop_front();
        self.history.push_back(f32::from(input));

        let out_rate = i64::from(self.output_rate);
        self.position += out_rate;
        while self.position >= 0 {
            let phase = ((self.position * PHASES as i64 + out_rate / 2) / out_rate) as usize;
            let coeffs = &self.table[phase * TAPS..(phase + 1) * TAPS];
            let acc: f32 = self
                .history
                .iter()
                .zip(coeffs)
                .map(|(x, c)| x * c)
                .sum();
            out.push_back(acc.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16);
            self.position -= i64::from(self.input_rate);
        }
    }
}

/// Per-channel resampler
#[derive(Debug, Clone)]
pub enum Resampler {
    /// Input and output rates match; samples pass through untouched
    Identity {
        /// Shared sample rate
        rate: u32,
    },
    /// Band-limited rate conversion
    Sinc(SincResampler),
}

impl Resampler {
    /// Pick the conversion for a rate pair
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        if input_rate == output_rate {
            Resampler::Identity { rate: input_rate }
        } else {
            Resampler::Sinc(SincResampler::new(input_rate, output_rate))
        }
    }

    /// Push one input sample, appending any produced outputs to `out`
    pub fn process(&mut self, input: i16, out: &mut VecDeque<i16>) {
        match self {
            Resampler::Identity { .. } => out.push_back(input),
            Resampler::Sinc(sinc) => sinc.process(input, out),
        }
    }

    /// Forget filter history
    pub fn reset(&mut self) {
        if let Resampler::Sinc(sinc) = self {
            sinc.reset();
        }
    }

    /// Input (native) rate in Hz
    pub fn input_rate(&self) -> u32 {
        match self {
            Resampler::Identity { rate } => *rate,
            Resampler::Sinc(sinc) => sinc.input_rate,
        }
    }

    /// Output (host) rate in Hz
    pub fn output_rate(&self) -> u32 {
        match self {
            Resampler::Identity { rate } => *rate,
            Resampler::Sinc(sinc) => sinc.output_rate,
        }
    }

    /// Group delay in input samples
    pub fn latency(&self) -> usize {
        match self {
            Resampler::Identity { .. } => 0,
            Resampler::Sinc(_) => HALF_WIDTH - 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(resampler: &mut Resampler, input: &[i16]) -> Vec<i16> {
        let mut out = VecDeque::new();
        for &x in input {
            resampler.process(x, &mut out);
        }
        out.into_iter().collect()
    }

    #[test]
    fn test_identity_passes_through() {
        let mut rs = Resampler::new(48_000, 48_000);
        let input: Vec<i16> = (0..100).map(|i| (i * 37 - 1000) as i16).collect();
        assert_eq!(run(&mut rs, &input), input);
        assert_eq!(rs.latency(), 0);
    }

    #[test]
    fn test_output_count_tracks_ratio() {
        for (input_rate, output_rate) in [(55_930, 48_000), (55_930, 44_100), (22_050, 48_000)] {
            let mut rs = Resampler::new(input_rate, output_rate);
            let n = 10_000usize;
            let produced = run(&mut rs, &vec![0; n]).len();
            let expected = n as f64 * f64::from(output_rate) / f64::from(input_rate);
            assert!(
                (produced as f64 - expected).abs() <= 1.0,
                "{input_rate}->{output_rate}: produced {produced}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_unity_dc_gain() {
        let mut rs = Resampler::new(55_930, 48_000);
        let out = run(&mut rs, &vec![1000; 2000]);
        for &s in &out[TAPS..] {
            assert_eq!(s, 1000, "DC level must pass unchanged");
        }
    }

    #[test]
    fn test_passband_sine_amplitude() {
        let input_rate = 55_930u32;
        let mut rs = Resampler::new(input_rate, 48_000);
        let input: Vec<i16> = (0..8000)
            .map(|i| {
                let t = i as f64 / f64::from(input_rate);
                (10_000.0 * (2.0 * std::f64::consts::PI * 1000.0 * t).sin()) as i16
            })
            .collect();
        let out = run(&mut rs, &input);
        let peak = out[100..].iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        assert_relative_eq!(f64::from(peak), 10_000.0, max_relative = 0.02);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut rs = Resampler::new(55_930, 48_000);
        run(&mut rs, &vec![20_000; 500]);
        rs.reset();
        let out = run(&mut rs, &[0; 8]);
        assert!(out.iter().all(|&s| s == 0), "stale history leaked: {out:?}");
    }
}
