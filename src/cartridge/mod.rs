//! NES cartridge loading.
//!
//! - **cartridge**: parses iNES (.nes) files into PRG and CHR images. Only mapper 0 (NROM) is
//!   accepted; the CPU bus models its fixed banks directly.

pub mod cartridge;
