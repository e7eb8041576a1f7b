//! Commander X16 system bus
//!
//! I/O map:
//!
//! | Range           | Device        |
//! |-----------------|---------------|
//! | `$9F00-$9F0F`   | VIA 1         |
//! | `$9F10-$9F1F`   | VIA 2         |
//! | `$9F20-$9F3F`   | VERA          |
//! | `$9F40-$9F41`   | YM2151        |
//! | everything else | memory        |

use ym2151::Ym2151;

use crate::collaborators::{Bus, Memory, Via, Video};
use crate::config::MachineConfig;
use crate::error::Result;

const VIA1_BASE: u16 = 0x9F00;
const VIA2_BASE: u16 = 0x9F10;
const VERA_BASE: u16 = 0x9F20;
const YM_BASE: u16 = 0x9F40;

/// Devices reachable from the CPU
pub struct SystemBus {
    /// RAM/ROM and banking
    pub memory: Box<dyn Memory>,
    /// VERA
    pub video: Box<dyn Video>,
    /// VIA 1 (NMI source)
    pub via1: Box<dyn Via>,
    /// VIA 2 (IRQ source)
    pub via2: Box<dyn Via>,
    /// YM2151
    pub ym: Ym2151,
}

impl SystemBus {
    /// Assemble the bus; the YM2151 is built from `config`
    pub fn new(
        memory: Box<dyn Memory>,
        video: Box<dyn Video>,
        via1: Box<dyn Via>,
        via2: Box<dyn Via>,
        config: &MachineConfig,
    ) -> Result<Self> {
        Ok(SystemBus {
            memory,
            video,
            via1,
            via2,
            ym: Ym2151::with_config(config.chip_config())?,
        })
    }

    fn read_inner(&mut self, addr: u16, debug: bool) -> u8 {
        match addr {
            0x9F00..=0x9F0F => self.via1.read((addr - VIA1_BASE) as u8, debug),
            0x9F10..=0x9F1F => self.via2.read((addr - VIA2_BASE) as u8, debug),
            0x9F20..=0x9F3F => self.video.read((addr - VERA_BASE) as u8, debug),
            0x9F40..=0x9F41 => self.ym.read_status(),
            _ => self.memory.read(addr, debug),
        }
    }
}

impl Bus for SystemBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.read_inner(addr, false)
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x9F00..=0x9F0F => self.via1.write((addr - VIA1_BASE) as u8, value),
            0x9F10..=0x9F1F => self.via2.write((addr - VIA2_BASE) as u8, value),
            0x9F20..=0x9F3F => self.video.write((addr - VERA_BASE) as u8, value),
            0x9F40..=0x9F41 => self.ym.write_port((addr - YM_BASE) as u8, value),
            _ => self.memory.write(addr, value),
        }
    }

    fn debug_read(&mut self, addr: u16) -> u8 {
        self.read_inner(addr, true)
    }
}
