//! Machine state dumps
//!
//! Layout (each section optional):
//!
//! 1. CPU: A, X, Y, SP, P, then PC little-endian (7 bytes)
//! 2. memory: main RAM and/or banked RAM, as written by the memory collaborator
//! 3. video memory

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::collaborators::{CpuRegisters, Memory, Video};

/// Which sections a dump contains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    /// CPU registers
    pub cpu: bool,
    /// Main RAM
    pub ram: bool,
    /// Banked RAM
    pub bank: bool,
    /// Video memory
    pub vram: bool,
}

/// First free name among `dump.bin`, `dump-1.bin`, `dump-2.bin`, ... in `dir`
pub fn next_dump_path(dir: &Path) -> PathBuf {
    let mut index = 0u32;
    loop {
        let name = if index == 0 {
            "dump.bin".to_string()
        } else {
            format!("dump-{index}.bin")
        };
        let path = dir.join(name);
        if !path.exists() {
            return path;
        }
        index += 1;
    }
}

/// Serialize the selected sections into `out`
pub fn write_dump(
    out: &mut dyn Write,
    options: DumpOptions,
    cpu: &CpuRegisters,
    memory: &dyn Memory,
    video: &dyn Video,
) -> io::Result<()> {
    if options.cpu {
        out.write_all(&[cpu.a, cpu.x, cpu.y, cpu.sp, cpu.status])?;
        out.write_all(&cpu.pc.to_le_bytes())?;
    }
    memory.save(out, options.ram, options.bank)?;
    if options.vram {
        video.save_vram(out)?;
    }
    Ok(())
}
