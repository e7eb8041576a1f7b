//! Commander X16 master cycle loop.
//!
//! One iteration retires one CPU instruction and feeds its cycle count, in a
//! fixed order, to VERA, VIA 1, VIA 2, the RTC, the serial bus (if enabled)
//! and the audio renderer. Interrupt lines are re-sampled afterwards:
//!
//! - VIA 1 IRQ rising edge (sampled before vs. after its step) raises NMI
//! - VERA IRQ, YM2151 IRQ or VIA 2 IRQ raises IRQ
//!
//! Host work (MIDI, recording, display, events, pacing) only happens on
//! iterations where VERA completed a frame.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::audio::AudioRenderer;
use crate::bus::SystemBus;
use crate::collaborators::{Collaborators, Cpu};
use crate::config::{MachineConfig, MAX_WARP_FACTOR};
use crate::dump::{next_dump_path, write_dump, DumpOptions};
use crate::error::{MachineError, Result};
use crate::pacing::{FramePacer, WARP_DISPLAY_INTERVAL_US};

/// Program counter value that ends emulation
pub const HALT_PC: u16 = 0xFFFF;

/// Cheat mask used by [`Machine::toggle_warp`]
const TOGGLE_WARP_MASK: u32 = 0x3F;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The host asked to quit
    Shutdown,
    /// The CPU reached [`HALT_PC`]
    Halted,
}

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Instruction retired, no frame boundary
    Continue,
    /// A frame was completed (or a paused frame was presented)
    Frame,
    /// The loop must stop
    Exit(Exit),
}

/// Cheat mask for a warp factor
pub fn warp_cheat_mask(warp_factor: u8) -> u32 {
    match warp_factor {
        0 => 0,
        w => (1u32 << (w - 1)) - 1,
    }
}

/// The emulated machine: CPU, bus devices and host collaborators
pub struct Machine<C: Cpu> {
    cpu: C,
    bus: SystemBus,
    hooks: Collaborators,
    audio: AudioRenderer,
    pacer: FramePacer,
    config: MachineConfig,
    last_display_us: u64,
}

impl<C: Cpu> Machine<C> {
    /// Wire up a machine; does not reset it (see [`Machine::reset`])
    ///
    /// The YM2151 on `bus` is reconfigured from `config`, so IRQ gating,
    /// strict busy handling and the prerender clock always follow the
    /// machine settings.
    pub fn new(
        cpu: C,
        mut bus: SystemBus,
        hooks: Collaborators,
        config: MachineConfig,
    ) -> Result<Self> {
        config.validate()?;
        bus.ym.configure(config.chip_config())?;
        bus.video.set_cheat_mask(warp_cheat_mask(config.warp_factor));
        let now = hooks.host.now_us();
        Ok(Machine {
            cpu,
            bus,
            hooks,
            audio: AudioRenderer::new(&config),
            pacer: FramePacer::new(now),
            config,
            last_display_us: now,
        })
    }

    /// CPU core
    pub fn cpu(&self) -> &C {
        &self.cpu
    }

    /// System bus
    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    /// Mutable system bus
    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    /// Active configuration
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Reset every device: memory, VIAs, VERA, YM2151, then the CPU
    pub fn reset(&mut self) {
        self.bus.memory.reset();
        self.bus.via1.init();
        self.bus.via2.init();
        self.bus.video.reset();
        self.bus.ym.reset();
        self.cpu.reset(&mut self.bus);
        self.audio.reset();
        debug!("machine reset");
    }

    /// Current warp factor
    pub fn warp_factor(&self) -> u8 {
        self.config.warp_factor
    }

    /// Set the warp factor (0 = real time) and restart frame timing
    pub fn set_warp_factor(&mut self, warp_factor: u8) -> Result<()> {
        if warp_factor > MAX_WARP_FACTOR {
            return Err(MachineError::Config(format!(
                "warp factor {warp_factor} out of range (0-{MAX_WARP_FACTOR})"
            )));
        }
        self.apply_warp(warp_factor, warp_cheat_mask(warp_factor));
        Ok(())
    }

    /// Switch between real time and full warp
    pub fn toggle_warp(&mut self) {
        if self.config.warp_factor == 0 {
            self.apply_warp(MAX_WARP_FACTOR, TOGGLE_WARP_MASK);
        } else {
            self.apply_warp(0, 0);
        }
    }

    fn apply_warp(&mut self, warp_factor: u8, mask: u32) {
        debug!("warp factor {warp_factor}, cheat mask {mask:#x}");
        self.config.warp_factor = warp_factor;
        self.bus.video.set_cheat_mask(mask);
        self.pacer.init(self.hooks.host.now_us());
    }

    /// Write a dump file into the configured directory
    ///
    /// # Returns
    ///
    /// Path of the written file
    pub fn dump(&self) -> Result<PathBuf> {
        let path = next_dump_path(&self.config.dump_dir);
        let mut out = BufWriter::new(File::create(&path)?);
        let options = DumpOptions {
            cpu: self.config.dump_cpu,
            ram: self.config.dump_ram,
            bank: self.config.dump_bank,
            vram: self.config.dump_vram,
        };
        write_dump(
            &mut out,
            options,
            &self.cpu.registers(),
            self.bus.memory.as_ref(),
            self.bus.video.as_ref(),
        )?;
        out.flush()?;
        info!("Dumped system to {}", path.display());
        Ok(path)
    }

    fn pace_frame(&mut self) {
        let now = self.hooks.host.now_us();
        let wait = self.pacer.frame_done(now, self.config.warp_factor > 0);
        if wait > 0 {
            self.hooks.host.sleep_us(wait);
        }
    }

    fn paused_iteration(&mut self) -> StepOutcome {
        self.bus.video.force_redraw();
        self.hooks.host.refresh_display(self.bus.video.framebuffer());
        if !self.hooks.host.poll_events() {
            return StepOutcome::Exit(Exit::Shutdown);
        }
        self.pace_frame();
        StepOutcome::Frame
    }

    /// Run one loop iteration
    pub fn step(&mut self) -> StepOutcome {
        if self.hooks.debugger.is_paused() {
            return self.paused_iteration();
        }

        let cycles = self.cpu.step(&mut self.bus);
        let new_frame = self.bus.video.step(self.config.cpu_mhz, cycles);
        let via1_irq_old = self.bus.via1.irq();
        self.bus.via1.step(cycles);
        self.bus.via2.step(cycles);
        self.hooks.rtc.step(cycles);
        if self.config.enable_serial {
            self.hooks.serial.step(cycles);
        }
        self.audio
            .render(cycles, &mut self.bus.ym, self.hooks.audio.as_mut());

        if new_frame {
            self.hooks.midi.process();
            self.hooks.recorder.update(self.bus.video.framebuffer());
            let now = self.hooks.host.now_us();
            if self.config.warp_factor == 0
                || now.saturating_sub(self.last_display_us) > WARP_DISPLAY_INTERVAL_US
            {
                self.hooks.host.refresh_display(self.bus.video.framebuffer());
                self.last_display_us = now;
            }
            if !self.hooks.host.poll_events() {
                return StepOutcome::Exit(Exit::Shutdown);
            }
            self.pace_frame();
        }

        if !via1_irq_old && self.bus.via1.irq() {
            self.cpu.nmi();
            self.hooks.debugger.interrupt();
        }
        if self.bus.video.irq() || self.bus.ym.irq() || self.bus.via2.irq() {
            self.cpu.irq();
            self.hooks.debugger.interrupt();
        }

        self.hooks.hypercalls.process(self.cpu.pc(), &mut self.bus);

        if self.cpu.pc() == HALT_PC {
            if self.config.save_on_exit {
                if let Err(e) = self.dump() {
                    warn!("machine dump failed: {e}");
                }
            }
            return StepOutcome::Exit(Exit::Halted);
        }

        self.hooks.keyboard.process();

        if new_frame {
            StepOutcome::Frame
        } else {
            StepOutcome::Continue
        }
    }

    /// Run until the host quits or the CPU halts
    pub fn run(&mut self) -> Exit {
        loop {
            if let StepOutcome::Exit(exit) = self.step() {
                return exit;
            }
        }
    }

    /// Run until the next frame boundary, for hosts that schedule frames themselves
    ///
    /// # Returns
    ///
    /// `Some(exit)` if the loop must stop, `None` after a frame
    pub fn run_frame(&mut self) -> Option<Exit> {
        loop {
            match self.step() {
                StepOutcome::Continue => continue,
                StepOutcome::Frame => return None,
                StepOutcome::Exit(exit) => return Some(exit),
            }
        }
    }
}
