//! PPU (Picture Processing Unit) emulation for the NES.
//!
//! See [PPU registers](https://www.nesdev.org/wiki/PPU_registers) and
//! [PPU memory map](https://www.nesdev.org/wiki/PPU_memory_map). Models the nine CPU-visible
//! registers, 16 KiB of VRAM with its mirrors, and background color per pixel. No sprites, no
//! scrolling, no dot timing.

pub mod palette;
pub mod ppu;
