//! Master loop sequencing, interrupt routing, lifecycle and warp behaviour,
//! observed through recording stand-ins for every collaborator.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{self, Write};
use std::rc::Rc;

use x16_machine::{
    AudioSink, Bus, Clocked, Collaborators, Cpu, CpuRegisters, Debugger, Exit, Host, Hypercalls, Keyboard,
    Machine, MachineConfig, Memory, Midi, StepOutcome, SystemBus, Via, Video, FRAME_US,
};

#[derive(Default)]
struct Shared {
    log: RefCell<Vec<String>>,
    pc: Cell<u16>,
    cycles: Cell<u32>,
    /// VERA completes a frame every this many steps (0 = never)
    frame_every: Cell<u32>,
    vera_steps: Cell<u32>,
    vera_irq: Cell<bool>,
    via1_irq: Cell<bool>,
    /// Level VIA 1 drives after its next step
    via1_raise: Cell<bool>,
    via2_irq: Cell<bool>,
    cheat_mask: Cell<u32>,
    quit: Cell<bool>,
    paused: Cell<bool>,
    now_us: Cell<u64>,
    nmis: Cell<u32>,
    irqs: Cell<u32>,
    interrupts: Cell<u32>,
    refreshes: Cell<u32>,
}

impl Shared {
    fn record(&self, entry: impl Into<String>) {
        self.log.borrow_mut().push(entry.into());
    }

    fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

type Rig = Rc<Shared>;

struct TestCpu(Rig);

impl Cpu for TestCpu {
    fn step<B: Bus>(&mut self, _bus: &mut B) -> u32 {
        self.0.record("cpu step");
        self.0.cycles.get()
    }
    fn nmi(&mut self) {
        self.0.nmis.set(self.0.nmis.get() + 1);
    }
    fn irq(&mut self) {
        self.0.irqs.set(self.0.irqs.get() + 1);
    }
    fn reset<B: Bus>(&mut self, _bus: &mut B) {
        self.0.record("cpu reset");
    }
    fn pc(&self) -> u16 {
        self.0.pc.get()
    }
    fn registers(&self) -> CpuRegisters {
        CpuRegisters {
            a: 0x11,
            x: 0x22,
            y: 0x33,
            sp: 0xFD,
            status: 0x24,
            pc: self.0.pc.get(),
        }
    }
}

struct TestMemory(Rig);

impl Memory for TestMemory {
    fn read(&mut self, _addr: u16, _debug: bool) -> u8 {
        0
    }
    fn write(&mut self, _addr: u16, _value: u8) {}
    fn reset(&mut self) {
        self.0.record("mem reset");
    }
    fn save(&self, out: &mut dyn Write, ram: bool, banks: bool) -> io::Result<()> {
        if ram {
            out.write_all(&[0xAA; 4])?;
        }
        if banks {
            out.write_all(&[0xBB; 2])?;
        }
        Ok(())
    }
}

struct TestVideo(Rig);

impl Video for TestVideo {
    fn step(&mut self, mhz: u32, cycles: u32) -> bool {
        self.0.record(format!("vera step {mhz} {cycles}"));
        let steps = self.0.vera_steps.get() + 1;
        self.0.vera_steps.set(steps);
        let every = self.0.frame_every.get();
        every != 0 && steps % every == 0
    }
    fn irq(&self) -> bool {
        self.0.vera_irq.get()
    }
    fn read(&mut self, _reg: u8, _debug: bool) -> u8 {
        0
    }
    fn write(&mut self, _reg: u8, _value: u8) {}
    fn framebuffer(&self) -> &[u8] {
        &[]
    }
    fn set_cheat_mask(&mut self, mask: u32) {
        self.0.cheat_mask.set(mask);
    }
    fn force_redraw(&mut self) {
        self.0.record("vera redraw");
    }
    fn reset(&mut self) {
        self.0.record("vera reset");
    }
    fn save_vram(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(&[0xCC; 3])
    }
}

struct TestVia {
    name: &'static str,
    rig: Rig,
}

impl Via for TestVia {
    fn init(&mut self) {
        self.rig.record(format!("{} init", self.name));
    }
    fn step(&mut self, cycles: u32) {
        self.rig.record(format!("{} step {cycles}", self.name));
        if self.name == "via1" {
            self.rig.via1_irq.set(self.rig.via1_raise.get());
        }
    }
    fn irq(&self) -> bool {
        match self.name {
            "via1" => self.rig.via1_irq.get(),
            _ => self.rig.via2_irq.get(),
        }
    }
    fn read(&mut self, _reg: u8, _debug: bool) -> u8 {
        0
    }
    fn write(&mut self, _reg: u8, _value: u8) {}
}

struct TestHost(Rig);

impl Host for TestHost {
    fn poll_events(&mut self) -> bool {
        self.0.record("poll");
        !self.0.quit.get()
    }
    fn refresh_display(&mut self, _framebuffer: &[u8]) {
        self.0.record("refresh");
        self.0.refreshes.set(self.0.refreshes.get() + 1);
    }
    fn now_us(&self) -> u64 {
        self.0.now_us.get()
    }
    fn sleep_us(&mut self, us: u64) {
        self.0.record(format!("sleep {us}"));
        self.0.now_us.set(self.0.now_us.get() + us);
    }
}

struct Tick {
    name: &'static str,
    rig: Rig,
}

impl Clocked for Tick {
    fn step(&mut self, cycles: u32) {
        self.rig.record(format!("{} step {cycles}", self.name));
    }
}

struct TestAudio(Rig);

impl AudioSink for TestAudio {
    fn push_samples(&mut self, samples: &[i16], frames: usize) {
        assert_eq!(samples.len(), 2 * frames, "interleaved stereo");
        self.0.record(format!("audio {frames}"));
    }
}

struct Hooks(Rig);

impl Debugger for Hooks {
    fn is_paused(&self) -> bool {
        self.0.paused.get()
    }
    fn interrupt(&mut self) {
        self.0.interrupts.set(self.0.interrupts.get() + 1);
    }
}

impl Hypercalls for Hooks {
    fn process(&mut self, pc: u16, _bus: &mut dyn Bus) {
        self.0.record(format!("hypercall {pc:04X}"));
    }
}

impl Midi for Hooks {
    fn process(&mut self) {
        self.0.record("midi");
    }
}

impl x16_machine::FrameRecorder for Hooks {
    fn update(&mut self, _framebuffer: &[u8]) {
        self.0.record("recorder");
    }
}

impl Keyboard for Hooks {
    fn process(&mut self) {
        self.0.record("keyboard");
    }
}

fn machine_with(config: MachineConfig) -> (Machine<TestCpu>, Rig) {
    machine_with_bus(&config, config.clone())
}

/// Machine whose bus (and YM2151) was assembled from a different config
fn machine_with_bus(
    bus_config: &MachineConfig,
    config: MachineConfig,
) -> (Machine<TestCpu>, Rig) {
    let rig: Rig = Rc::default();
    rig.pc.set(0x0200);
    rig.cycles.set(3);

    let bus = SystemBus::new(
        Box::new(TestMemory(rig.clone())),
        Box::new(TestVideo(rig.clone())),
        Box::new(TestVia {
            name: "via1",
            rig: rig.clone(),
        }),
        Box::new(TestVia {
            name: "via2",
            rig: rig.clone(),
        }),
        bus_config,
    )
    .expect("valid config");

    let mut hooks = Collaborators::new(Box::new(TestHost(rig.clone())));
    hooks.audio = Box::new(TestAudio(rig.clone()));
    hooks.debugger = Box::new(Hooks(rig.clone()));
    hooks.hypercalls = Box::new(Hooks(rig.clone()));
    hooks.midi = Box::new(Hooks(rig.clone()));
    hooks.recorder = Box::new(Hooks(rig.clone()));
    hooks.keyboard = Box::new(Hooks(rig.clone()));
    hooks.rtc = Box::new(Tick {
        name: "rtc",
        rig: rig.clone(),
    });
    hooks.serial = Box::new(Tick {
        name: "serial",
        rig: rig.clone(),
    });

    let machine = Machine::new(TestCpu(rig.clone()), bus, hooks, config).expect("machine");
    (machine, rig)
}

fn machine() -> (Machine<TestCpu>, Rig) {
    machine_with(MachineConfig::default())
}

#[test]
fn test_peripherals_see_cycles_in_order() {
    let (mut m, rig) = machine();
    assert_eq!(m.step(), StepOutcome::Continue);
    assert_eq!(
        rig.take_log(),
        vec![
            "cpu step",
            "vera step 8 3",
            "via1 step 3",
            "via2 step 3",
            "rtc step 3",
            "hypercall 0200",
            "keyboard",
        ]
    );
}

#[test]
fn test_audio_renders_last_with_full_delta() {
    let (mut m, rig) = machine_with(MachineConfig {
        enable_serial: true,
        audio_buffer_frames: 1,
        ..MachineConfig::default()
    });
    // 500 cycles at 8 MHz is exactly three 48 kHz frames
    rig.cycles.set(500);
    m.step();
    assert_eq!(
        rig.take_log(),
        vec![
            "cpu step",
            "vera step 8 500",
            "via1 step 500",
            "via2 step 500",
            "rtc step 500",
            "serial step 500",
            "audio 1",
            "audio 1",
            "audio 1",
            "hypercall 0200",
            "keyboard",
        ]
    );
}

#[test]
fn test_serial_stepped_only_when_enabled() {
    let (mut m, rig) = machine_with(MachineConfig {
        enable_serial: true,
        ..MachineConfig::default()
    });
    m.step();
    let log = rig.take_log();
    let rtc = log.iter().position(|e| e == "rtc step 3").expect("rtc stepped");
    assert_eq!(log[rtc + 1], "serial step 3");

    let (mut m, rig) = machine();
    m.step();
    assert!(!rig.take_log().iter().any(|e| e.starts_with("serial")));
}

#[test]
fn test_frame_boundary_runs_host_work() {
    let (mut m, rig) = machine();
    rig.frame_every.set(1);
    let sleep = format!("sleep {FRAME_US}");
    assert_eq!(m.step(), StepOutcome::Frame);
    assert_eq!(
        rig.take_log(),
        vec![
            "cpu step",
            "vera step 8 3",
            "via1 step 3",
            "via2 step 3",
            "rtc step 3",
            "midi",
            "recorder",
            "refresh",
            "poll",
            sleep.as_str(),
            "hypercall 0200",
            "keyboard",
        ]
    );
}

#[test]
fn test_via1_rising_edge_raises_single_nmi() {
    let (mut m, rig) = machine();
    rig.via1_raise.set(true);
    m.step();
    m.step();
    m.step();
    assert_eq!(rig.nmis.get(), 1, "level held high is not a new edge");
    assert_eq!(rig.interrupts.get(), 1);

    rig.via1_raise.set(false);
    m.step();
    rig.via1_raise.set(true);
    m.step();
    assert_eq!(rig.nmis.get(), 2);
}

#[test]
fn test_irq_sources_are_ored() {
    let (mut m, rig) = machine();
    m.step();
    assert_eq!(rig.irqs.get(), 0);

    rig.vera_irq.set(true);
    m.step();
    rig.vera_irq.set(false);
    rig.via2_irq.set(true);
    m.step();
    rig.vera_irq.set(true);
    m.step();
    assert_eq!(rig.irqs.get(), 3, "one IRQ per step with any source high");
    assert_eq!(rig.interrupts.get(), 3);
}

#[test]
fn test_ym_timer_raises_cpu_irq() {
    let (mut m, rig) = machine_with(MachineConfig {
        ym_irq: true,
        ..MachineConfig::default()
    });
    m.bus_mut().ym.debug_write(0x12, 0xFF);
    m.bus_mut().ym.debug_write(0x14, 0x0A);

    rig.cycles.set(2000);
    m.step();
    assert_eq!(rig.irqs.get(), 0, "timer B still running");

    rig.cycles.set(400);
    m.step();
    assert_eq!(rig.irqs.get(), 1, "timer B expiry reaches the CPU");
}

#[test]
fn test_machine_config_overrides_bus_chip_settings() {
    let bus_config = MachineConfig::default();
    let (mut m, rig) = machine_with_bus(
        &bus_config,
        MachineConfig {
            ym_irq: true,
            ym_strict: true,
            cpu_mhz: 4,
            ..MachineConfig::default()
        },
    );
    assert!(m.bus().ym.irq_enabled());
    assert!(m.bus().ym.strict_busy());
    assert_eq!(m.bus().ym.cpu_clock_hz(), 4_000_000);

    m.bus_mut().ym.debug_write(0x12, 0xFF);
    m.bus_mut().ym.debug_write(0x14, 0x0A);
    // 16 native samples at 4 MHz
    rig.cycles.set(1200);
    m.step();
    assert_eq!(rig.irqs.get(), 1, "timer B reaches the CPU with the machine's IRQ setting");
}

#[test]
fn test_halt_dumps_and_exits() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut m, rig) = machine_with(MachineConfig {
        dump_dir: dir.path().to_path_buf(),
        dump_vram: true,
        ..MachineConfig::default()
    });
    rig.pc.set(0xFFFF);

    assert_eq!(m.step(), StepOutcome::Exit(Exit::Halted));
    assert!(!rig.take_log().contains(&"keyboard".to_string()));

    let bytes = fs::read(dir.path().join("dump.bin")).expect("dump written");
    let mut expected = vec![0x11, 0x22, 0x33, 0xFD, 0x24, 0xFF, 0xFF];
    expected.extend_from_slice(&[0xAA; 4]);
    expected.extend_from_slice(&[0xBB; 2]);
    expected.extend_from_slice(&[0xCC; 3]);
    assert_eq!(bytes, expected);
}

#[test]
fn test_halt_without_save_on_exit() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (mut m, rig) = machine_with(MachineConfig {
        dump_dir: dir.path().to_path_buf(),
        save_on_exit: false,
        ..MachineConfig::default()
    });
    rig.pc.set(0xFFFF);
    assert_eq!(m.run(), Exit::Halted);
    assert!(!dir.path().join("dump.bin").exists());
}

#[test]
fn test_dump_names_do_not_overwrite() {
    let dir = tempfile::tempdir().expect("temp dir");
    let (m, _rig) = machine_with(MachineConfig {
        dump_dir: dir.path().to_path_buf(),
        dump_ram: false,
        dump_bank: false,
        ..MachineConfig::default()
    });
    let first = m.dump().expect("first dump");
    let second = m.dump().expect("second dump");
    assert_eq!(first, dir.path().join("dump.bin"));
    assert_eq!(second, dir.path().join("dump-1.bin"));
    assert_eq!(fs::read(&second).expect("read").len(), 7, "CPU section only");
}

#[test]
fn test_quit_event_shuts_down() {
    let (mut m, rig) = machine();
    rig.frame_every.set(2);
    rig.quit.set(true);
    assert_eq!(m.run(), Exit::Shutdown);
    let log = rig.take_log();
    assert_eq!(log.iter().filter(|e| *e == "cpu step").count(), 2);
    assert_eq!(log.last().map(String::as_str), Some("poll"));
}

#[test]
fn test_paused_machine_only_presents() {
    let (mut m, rig) = machine();
    rig.paused.set(true);
    let sleep = format!("sleep {FRAME_US}");
    assert_eq!(m.step(), StepOutcome::Frame);
    assert_eq!(
        rig.take_log(),
        vec!["vera redraw", "refresh", "poll", sleep.as_str()]
    );

    rig.quit.set(true);
    assert_eq!(m.step(), StepOutcome::Exit(Exit::Shutdown));
}

#[test]
fn test_run_frame_stops_at_frame_boundary() {
    let (mut m, rig) = machine();
    rig.frame_every.set(3);
    assert_eq!(m.run_frame(), None);
    assert_eq!(rig.vera_steps.get(), 3);
}

#[test]
fn test_warp_factor_sets_cheat_mask() {
    let (mut m, rig) = machine_with(MachineConfig {
        warp_factor: 3,
        ..MachineConfig::default()
    });
    assert_eq!(rig.cheat_mask.get(), 3);

    m.set_warp_factor(7).expect("in range");
    assert_eq!(rig.cheat_mask.get(), 0x3F);
    assert!(m.set_warp_factor(10).is_err());
    assert_eq!(m.warp_factor(), 7, "rejected factor leaves warp unchanged");

    m.toggle_warp();
    assert_eq!(m.warp_factor(), 0);
    assert_eq!(rig.cheat_mask.get(), 0);
    m.toggle_warp();
    assert_eq!(m.warp_factor(), 9);
    assert_eq!(rig.cheat_mask.get(), 0x3F);
}

#[test]
fn test_warp_throttles_display_and_never_sleeps() {
    let (mut m, rig) = machine_with(MachineConfig {
        warp_factor: 9,
        ..MachineConfig::default()
    });
    rig.frame_every.set(1);

    m.step();
    assert_eq!(rig.refreshes.get(), 0, "too soon after start");
    rig.now_us.set(20_000);
    m.step();
    m.step();
    assert_eq!(rig.refreshes.get(), 1);
    assert!(!rig.take_log().iter().any(|e| e.starts_with("sleep")));
}

#[test]
fn test_reset_order() {
    let (mut m, rig) = machine();
    m.bus_mut().ym.debug_write(0x20, 0x07);
    m.reset();
    assert_eq!(
        rig.take_log(),
        vec!["mem reset", "via1 init", "via2 init", "vera reset", "cpu reset"]
    );
    assert_eq!(m.bus().ym.debug_read(0x20), 0xC0, "YM2151 reset with the machine");
}
