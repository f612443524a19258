//! Famicore: a 6502 CPU and NES background PPU, precise enough to replay nestest.
//!
//! Follows the [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide) where the hardware
//! is modeled, with instructions executed atomically rather than cycle by cycle.
//!
//! ## Modules (NESdev references)
//!
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): 2 KiB RAM, PPU ports,
//!   ignored APU/IO window, NROM PRG
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) header parsing; mapper 0 only
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU): opcode table, addressing modes, documented
//!   and undocumented opcodes, RESET/NMI/BRK
//! - **ppu** – [PPU registers](https://www.nesdev.org/wiki/PPU_registers),
//!   [PPU memory map](https://www.nesdev.org/wiki/PPU_memory_map), per-pixel background color
//! - **trace** – per-step snapshots and golden-trace diffing

pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod error;
pub mod ppu;
pub mod trace;

pub use error::{Error, Result};
