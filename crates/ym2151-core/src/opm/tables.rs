//! Lookup tables and conversion constants for the OPM engine

/// Sine table resolution (entries per full cycle)
pub(crate) const SINE_TABLE_SIZE: usize = 1 << 10;

/// Semitones above C for each 4-bit note code.
/// Codes 3, 7, 11 and 15 are unused on the chip and repeat their neighbour.
pub(crate) const NOTE_SEMITONES: [u8; 16] = [1, 2, 3, 3, 4, 5, 6, 6, 7, 8, 9, 9, 10, 11, 12, 12];

/// DT2 coarse detune in cents
pub(crate) const DT2_CENTS: [f32; 4] = [0.0, 600.0, 781.0, 950.0];

/// Key code 0x4A (octave 4, note code 10) is concert A
pub(crate) const A4_SEMITONE: f32 = 4.0 * 12.0 + 9.0;
pub(crate) const A4_HZ: f32 = 440.0;

/// Envelope attenuation range (10 bits); 0 is full volume
pub(crate) const ATTENUATION_MAX: f32 = 1023.0;

/// Attenuation per envelope step in dB
pub(crate) const DB_PER_STEP: f32 = 0.09375;

/// Operator output of ±1.0 shifts a modulated carrier by up to ±4 cycles
pub(crate) const MODULATION_CYCLES: f32 = 4.0;

/// Per-operator output scale (14-bit signed)
pub(crate) const OPERATOR_SCALE: f32 = 8192.0;

pub(crate) fn sine_table() -> Vec<f32> {
    (0..SINE_TABLE_SIZE)
        .map(|i| (i as f32 / SINE_TABLE_SIZE as f32 * std::f32::consts::TAU).sin())
        .collect()
}

/// Linear amplitude for an attenuation in envelope steps
pub(crate) fn attenuation_to_amplitude(attenuation: f32) -> f32 {
    10f32.powf(-attenuation * DB_PER_STEP / 20.0)
}

/// Attenuation change per sample at a 6-bit effective envelope rate
///
/// Every 4 rate steps double the speed; rate 0 freezes the envelope and
/// rate 63 completes a full sweep in one sample.
pub(crate) fn rate_step(rate: u32) -> f32 {
    match rate {
        0 => 0.0,
        63.. => ATTENUATION_MAX + 1.0,
        r => 2f32.powf((r as f32 - 44.0) / 4.0),
    }
}
