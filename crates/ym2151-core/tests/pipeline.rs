//! End-to-end behaviour of the YM2151 interface: port writes, busy queueing,
//! timers driven from CPU time and resampled output.

use ym2151::{ChipConfig, OperatorParam, VoiceParam, Ym2151};

fn tone_chip() -> Ym2151 {
    let mut ym = Ym2151::new();
    ym.set_voice(0, VoiceParam::Connection, 7);
    ym.set_voice(0, VoiceParam::Octave, 4);
    ym.set_voice(0, VoiceParam::Note, 10);
    ym.set_operator(0, 0, OperatorParam::Mul, 1);
    ym.set_operator(0, 0, OperatorParam::AttackRate, 31);
    for op in 1..4 {
        ym.set_operator(0, op, OperatorParam::TotalLevel, 0x7F);
    }
    ym.key_on(0, true, true, true, true);
    ym
}

#[test]
fn test_busy_write_scenario() {
    let mut ym = Ym2151::new();
    ym.write(0x08, 0x78);
    assert_eq!(ym.debug_read(0x08), 0x78);
    assert_eq!(ym.pending_writes(), 0);

    ym.write(0x08, 0x00);
    assert_eq!(ym.pending_writes(), 1, "second write lands in the queue");
    assert_eq!(ym.debug_read(0x08), 0x00, "shadow shows the newest value");

    ym.pregenerate(1);
    assert_eq!(ym.pending_writes(), 0, "one entry drained per sample");
}

#[test]
fn test_queued_writes_are_never_lost() {
    let mut ym = Ym2151::new();
    for i in 0..32u8 {
        ym.write_port(0, 0x60 + i);
        ym.write_port(1, i);
    }
    assert_eq!(ym.pending_writes(), 31);

    ym.pregenerate(31);
    for i in 0..32u8 {
        assert_eq!(ym.engine().register(0x60 + i), i, "TL register {i}");
    }
}

#[test]
fn test_strict_mode_via_config() {
    let mut ym = Ym2151::with_config(ChipConfig {
        strict_busy: true,
        ..ChipConfig::default()
    })
    .expect("default clocks are valid");
    ym.write_port(0, 0x28);
    ym.write_port(1, 0x4A);
    ym.write_port(1, 0x4B);
    assert_eq!(ym.pending_writes(), 0);
    assert_eq!(ym.engine().register(0x28), 0x4A);
}

#[test]
fn test_timer_b_irq_follows_cpu_time() {
    let mut ym = Ym2151::new();
    ym.set_irq_enabled(true);
    ym.debug_write(0x12, 0xFF); // one Timer B tick = 16 native samples
    ym.debug_write(0x14, 0x0A); // load B, IRQ enable B

    ym.prerender(2000); // 13 native samples
    assert!(!ym.irq(), "timer B must not fire early");

    ym.prerender(400); // 16 native samples in total
    assert!(ym.irq(), "timer B should have fired");
    assert_eq!(ym.read_status() & 0x02, 0x02);
}

#[test]
fn test_half_rate_generate_is_continuous() {
    let mut chained = tone_chip();
    let mut single = tone_chip();
    let rate = chained.sample_rate() / 2;

    let mut expected = vec![0i16; 400];
    single.generate(&mut expected, rate);

    let mut out = vec![0i16; 400];
    let (first, second) = out.split_at_mut(200);
    chained.generate(first, rate);
    chained.generate(second, rate);

    assert_eq!(out, expected, "boundary between calls must be seamless");
    assert!(out.iter().any(|&s| s != 0));
}

#[test]
fn test_host_rate_output_is_bounded() {
    let mut ym = tone_chip();
    let mut out = vec![0i16; 2 * 4800];
    for _ in 0..5 {
        ym.generate(&mut out, 48_000);
    }
    let peak = out.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
    assert!(peak > 4000, "tone should survive resampling, peak {peak}");
    assert!(
        ym.backbuffer().len() < 64,
        "consumed native frames are retired, {} left",
        ym.backbuffer().len()
    );
}

#[test]
fn test_clear_backbuffer() {
    let mut ym = tone_chip();
    ym.pregenerate(500);
    ym.clear_backbuffer();
    assert!(ym.backbuffer().is_empty());
}
