//! Memory bus and address decoding for the NES.
//!
//! Maps CPU addresses to RAM, PPU ports, the ignored APU/IO window, and NROM PRG.

use log::{debug, info};

use crate::error::{Access, Error, Result};
use crate::ppu::ppu::{OAM_LEN, PPU};

pub const RAM_SIZE: usize = 0x0800;
pub const PRG_WINDOW: usize = 0x8000;
pub const PRG_BANK: usize = 0x4000;
pub const OAM_DMA_PORT: u16 = 0x4014;

/// Trait for memory-mapped I/O and bus access used by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> Result<u8>;
    fn write(&mut self, addr: u16, data: u8) -> Result<()>;
    /// Consume the pending NMI, if the bus has one to deliver.
    fn poll_nmi(&mut self) -> bool;
}

/// Main NES bus: RAM, PRG window, and the PPU.
pub struct NesBus {
    ram: [u8; RAM_SIZE],
    /// $8000-$FFFF. A 16 KiB image is copied into both halves.
    prg: [u8; PRG_WINDOW],
    pub(crate) ppu: PPU,
}

impl NesBus {
    pub fn new() -> Self {
        Self {
            ram: [0; RAM_SIZE],
            prg: [0; PRG_WINDOW],
            ppu: PPU::new(),
        }
    }

    /// Install PRG (16 or 32 KiB) and CHR (up to 8 KiB) images.
    pub fn load(&mut self, prg: &[u8], chr: &[u8]) -> Result<()> {
        match prg.len() {
            PRG_BANK => {
                self.prg[..PRG_BANK].copy_from_slice(prg);
                self.prg[PRG_BANK..].copy_from_slice(prg);
            }
            PRG_WINDOW => self.prg.copy_from_slice(prg),
            len => {
                return Err(Error::RomFormat(format!(
                    "PRG image is {len} bytes, expected 16384 or 32768"
                )));
            }
        }
        self.ppu.load_chr(chr)?;
        info!("loaded {} KiB PRG, {} KiB CHR", prg.len() / 1024, chr.len() / 1024);
        Ok(())
    }

    /// OAM DMA: copy CPU page `page` into OAM, starting at OAMADDR.
    fn oam_dma(&mut self, page: u8) -> Result<()> {
        let base = (page as u16) << 8;
        let mut data = [0u8; OAM_LEN];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = self.read(base | i as u16)?;
        }
        self.ppu.oam_dma(&data);
        Ok(())
    }
}

impl Default for NesBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> Result<u8> {
        match addr {
            // Internal RAM (mirrored 4x in 0x0000-0x1FFF)
            0x0000..=0x1FFF => Ok(self.ram[(addr & 0x07FF) as usize]),
            // PPU registers $2000-$3FFF (mirrored every 8 bytes)
            0x2000..=0x3FFF => self.ppu.port_read(addr & 0x2007),
            OAM_DMA_PORT => self.ppu.port_read(addr),
            // APU, IO, expansion: not modeled
            0x4000..=0x5FFF => Ok(0),
            0x6000..=0x7FFF => Err(Error::Address {
                addr,
                access: Access::Read,
            }),
            0x8000..=0xFFFF => Ok(self.prg[(addr - 0x8000) as usize]),
        }
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<()> {
        match addr {
            0x0000..=0x1FFF => {
                self.ram[(addr & 0x07FF) as usize] = data;
                Ok(())
            }
            0x2000..=0x3FFF => self.ppu.port_write(addr & 0x2007, data),
            OAM_DMA_PORT => {
                self.ppu.port_write(addr, data)?;
                self.oam_dma(data)
            }
            0x4000..=0x5FFF => Ok(()),
            0x6000..=0x7FFF => Err(Error::Address {
                addr,
                access: Access::Write,
            }),
            // NROM has no registers; PRG is read-only
            0x8000..=0xFFFF => {
                debug!("ignoring write ${data:02X} to PRG ${addr:04X}");
                Ok(())
            }
        }
    }

    fn poll_nmi(&mut self) -> bool {
        self.ppu.take_nmi()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_bus(prg: &[u8]) -> NesBus {
        let mut bus = NesBus::new();
        bus.load(prg, &[0; 0x2000]).unwrap();
        bus
    }

    #[test]
    fn ram_is_mirrored_every_2k() {
        let mut bus = NesBus::new();
        bus.write(0x0001, 0x43).unwrap();
        assert_eq!(bus.read(0x0801).unwrap(), 0x43);
        assert_eq!(bus.read(0x1801).unwrap(), 0x43);

        bus.write(0x1FFF, 0x99).unwrap();
        assert_eq!(bus.read(0x07FF).unwrap(), 0x99);
    }

    #[test]
    fn ignored_window_reads_zero_and_swallows_writes() {
        let mut bus = NesBus::new();
        bus.write(0x4000, 0xFF).unwrap();
        bus.write(0x5FFF, 0xFF).unwrap();
        assert_eq!(bus.read(0x4000).unwrap(), 0);
        assert_eq!(bus.read(0x4015).unwrap(), 0);
        assert_eq!(bus.read(0x5FFF).unwrap(), 0);
    }

    #[test]
    fn unmapped_window_is_an_address_error() {
        let mut bus = NesBus::new();
        assert!(matches!(
            bus.read(0x6000),
            Err(Error::Address { addr: 0x6000, access: Access::Read })
        ));
        assert!(matches!(
            bus.write(0x7FFF, 1),
            Err(Error::Address { addr: 0x7FFF, access: Access::Write })
        ));
    }

    #[test]
    fn sixteen_k_prg_is_mirrored() {
        let mut prg = vec![0u8; PRG_BANK];
        prg[0] = 0x4C;
        prg[PRG_BANK - 1] = 0xC0;
        let mut bus = loaded_bus(&prg);

        assert_eq!(bus.read(0x8000).unwrap(), 0x4C);
        assert_eq!(bus.read(0xC000).unwrap(), 0x4C);
        assert_eq!(bus.read(0xBFFF).unwrap(), 0xC0);
        assert_eq!(bus.read(0xFFFF).unwrap(), 0xC0);
    }

    #[test]
    fn thirty_two_k_prg_maps_directly() {
        let mut prg = vec![0u8; PRG_WINDOW];
        prg[0] = 1;
        prg[PRG_BANK] = 2;
        let mut bus = loaded_bus(&prg);

        assert_eq!(bus.read(0x8000).unwrap(), 1);
        assert_eq!(bus.read(0xC000).unwrap(), 2);
    }

    #[test]
    fn prg_writes_are_ignored() {
        let mut bus = loaded_bus(&[0xEA; PRG_BANK]);
        bus.write(0x8000, 0x00).unwrap();
        assert_eq!(bus.read(0x8000).unwrap(), 0xEA);
    }

    #[test]
    fn odd_prg_size_is_rejected() {
        let mut bus = NesBus::new();
        assert!(matches!(bus.load(&[0; 100], &[]), Err(Error::RomFormat(_))));
    }

    #[test]
    fn ppu_ports_are_mirrored_every_8_bytes() {
        let mut bus = NesBus::new();
        // PPUADDR via its mirror at $3FFE, then PPUDATA via $2007
        bus.write(0x3FFE, 0x21).unwrap();
        bus.write(0x3FFE, 0x00).unwrap();
        bus.write(0x2007, 0x5A).unwrap();
        assert_eq!(bus.ppu.vram_read(0x2100), 0x5A);
    }

    #[test]
    fn oam_dma_copies_a_ram_page() {
        let mut bus = NesBus::new();
        for i in 0..256u16 {
            bus.write(0x0200 + i, i as u8).unwrap();
        }
        bus.write(OAM_DMA_PORT, 0x02).unwrap();
        assert_eq!(bus.ppu.oam()[0], 0);
        assert_eq!(bus.ppu.oam()[0x7F], 0x7F);
        assert_eq!(bus.ppu.oam()[0xFF], 0xFF);
    }
}
