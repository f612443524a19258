//! NES cartridge loading from iNES format (.nes files).
//!
//! Implements the [iNES](https://www.nesdev.org/wiki/INES) format: 16-byte header (magic "NES\x1A",
//! PRG size in 16 KiB units, CHR size in 8 KiB units, flags 6–7 for mapper), an optional 512-byte
//! trainer, then PRG ROM, then CHR ROM.

use std::fs;
use std::path::Path;

use log::info;

use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 16;
pub const TRAINER_LEN: usize = 512;
pub const PRG_UNIT: usize = 16 * 1024;
pub const CHR_UNIT: usize = 8 * 1024;
const MAGIC: &[u8; 4] = b"NES\x1A";

/// Raw PRG and CHR images split out of an iNES file.
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub prg_rom: Vec<u8>,
    pub chr_rom: Vec<u8>,
    pub mapper: u8,
}

impl Cartridge {
    /// Load cartridge from an iNES file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let cart = Self::from_bytes(&data)?;
        info!(
            "{}: {} KiB PRG, {} KiB CHR, mapper {}",
            path.display(),
            cart.prg_rom.len() / 1024,
            cart.chr_rom.len() / 1024,
            cart.mapper
        );
        Ok(cart)
    }

    /// Parse an in-memory iNES image. Header bytes 4–5 = PRG/CHR size; bytes 6–7 = mapper number
    /// (high nibble of 6 | high nibble of 7).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = data
            .get(..HEADER_LEN)
            .ok_or_else(|| Error::RomFormat(format!("{} bytes is shorter than the header", data.len())))?;
        if &header[..4] != MAGIC {
            return Err(Error::RomFormat("missing NES\\x1A magic".to_string()));
        }

        let prg_rom_size = header[4] as usize * PRG_UNIT;
        let chr_rom_size = header[5] as usize * CHR_UNIT;
        let mapper = (header[6] >> 4) | (header[7] & 0xF0);
        if mapper != 0 {
            return Err(Error::RomFormat(format!("unsupported mapper {mapper}")));
        }
        if prg_rom_size == 0 {
            return Err(Error::RomFormat("no PRG ROM".to_string()));
        }

        let prg_start = if header[6] & 0x04 != 0 {
            HEADER_LEN + TRAINER_LEN
        } else {
            HEADER_LEN
        };
        let prg_end = prg_start + prg_rom_size;
        let chr_end = prg_end + chr_rom_size;
        if data.len() < chr_end {
            return Err(Error::RomFormat(format!(
                "truncated: header promises {chr_end} bytes, file has {}",
                data.len()
            )));
        }

        Ok(Self {
            prg_rom: data[prg_start..prg_end].to_vec(),
            chr_rom: data[prg_end..chr_end].to_vec(),
            mapper,
        })
    }
}
