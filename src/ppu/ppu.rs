//! NES PPU register file, VRAM, and background color derivation.
//!
//! Registers: $2000–$2007 plus OAMDMA at $4014. VRAM is a flat 16 KiB array; pattern tables come
//! from CHR, there is a single name table at $2000, and palette RAM lives at $3F00.

use log::trace;

use crate::error::{Access, Error, Result};
use crate::ppu::palette::{COLOR_TABLE, Rgba};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

pub const VRAM_SIZE: usize = 0x4000;
pub const CHR_SIZE: usize = 0x2000;
/// OAM: 64 sprites × 4 bytes. Stored, never rendered.
pub const OAM_LEN: usize = 256;

const NAME_TABLE: usize = 0x2000;
const ATTRIBUTE_OFFSET: usize = 32 * 30;
const PALETTE: u16 = 0x3F00;

const STATUS_POWER_UP: u16 = 0b1010_0000;
const STATUS_VBLANK: u16 = 0x80;
const CTRL_NMI_ENABLE: u16 = 0x80;

/// The nine CPU-visible PPU registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpuRegister {
    PpuCtrl,
    PpuMask,
    PpuStatus,
    OamAddr,
    OamData,
    PpuScroll,
    PpuAddr,
    PpuData,
    OamDma,
}

impl PpuRegister {
    pub const ALL: [PpuRegister; 9] = [
        PpuRegister::PpuCtrl,
        PpuRegister::PpuMask,
        PpuRegister::PpuStatus,
        PpuRegister::OamAddr,
        PpuRegister::OamData,
        PpuRegister::PpuScroll,
        PpuRegister::PpuAddr,
        PpuRegister::PpuData,
        PpuRegister::OamDma,
    ];

    /// CPU address of the register (unmirrored).
    pub const fn port(self) -> u16 {
        match self {
            PpuRegister::OamDma => 0x4014,
            other => 0x2000 + other as u16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PpuRegister::PpuCtrl => "PPUCTRL",
            PpuRegister::PpuMask => "PPUMASK",
            PpuRegister::PpuStatus => "PPUSTATUS",
            PpuRegister::OamAddr => "OAMADDR",
            PpuRegister::OamData => "OAMDATA",
            PpuRegister::PpuScroll => "PPUSCROLL",
            PpuRegister::PpuAddr => "PPUADDR",
            PpuRegister::PpuData => "PPUDATA",
            PpuRegister::OamDma => "OAMDMA",
        }
    }

    fn from_port(addr: u16, access: Access) -> Result<Self> {
        PpuRegister::ALL
            .into_iter()
            .find(|r| r.port() == addr)
            .ok_or(Error::Address { addr, access })
    }
}

/// PPU state: registers, latches, VRAM, OAM.
pub struct PPU {
    /// Indexed by `PpuRegister as usize`. PPUSCROLL and PPUADDR hold 16 bits, the rest 8.
    registers: [u16; 9],
    /// Set after the high byte of a PPUSCROLL pair has been written.
    scroll_latch: bool,
    /// Same for PPUADDR; independent of `scroll_latch`.
    addr_latch: bool,
    /// PPUDATA read buffer for non-palette addresses.
    buffer: u8,
    vram: [u8; VRAM_SIZE],
    oam: [u8; OAM_LEN],
    /// "May NMI" latch. Armed on vblank with NMIs enabled; cleared by `take_nmi`.
    nmi: bool,
}

impl PPU {
    pub fn new() -> Self {
        let mut registers = [0; 9];
        registers[PpuRegister::PpuStatus as usize] = STATUS_POWER_UP;
        Self {
            registers,
            scroll_latch: false,
            addr_latch: false,
            buffer: 0,
            vram: [0; VRAM_SIZE],
            oam: [0; OAM_LEN],
            nmi: false,
        }
    }

    pub fn register(&self, reg: PpuRegister) -> u16 {
        self.registers[reg as usize]
    }

    fn set_register(&mut self, reg: PpuRegister, value: u16) {
        self.registers[reg as usize] = value;
    }

    /// Copy CHR into the pattern tables ($0000–$1FFF).
    pub fn load_chr(&mut self, chr: &[u8]) -> Result<()> {
        if chr.len() > CHR_SIZE {
            return Err(Error::RomFormat(format!(
                "CHR image is {} bytes, at most {CHR_SIZE} fit the pattern tables",
                chr.len()
            )));
        }
        self.vram[..chr.len()].copy_from_slice(chr);
        Ok(())
    }

    /// CPU read of a PPU port ($2000–$2007 or $4014, already unmirrored).
    pub fn port_read(&mut self, addr: u16) -> Result<u8> {
        let reg = PpuRegister::from_port(addr, Access::Read)?;
        let value = match reg {
            PpuRegister::PpuData => self.read_data(),
            // Everything else reads back as stored, PPUSTATUS included
            _ => self.register(reg) as u8,
        };
        Ok(value)
    }

    /// CPU write of a PPU port ($2000–$2007 or $4014, already unmirrored).
    pub fn port_write(&mut self, addr: u16, data: u8) -> Result<()> {
        let reg = PpuRegister::from_port(addr, Access::Write)?;
        trace!("{} <- ${data:02X}", reg.name());
        match reg {
            PpuRegister::PpuData => {
                let addr = self.register(PpuRegister::PpuAddr);
                self.vram_write(addr, data);
                self.set_register(PpuRegister::PpuAddr, addr.wrapping_add(1));
            }
            PpuRegister::PpuScroll | PpuRegister::PpuAddr => self.write_pair(reg, data),
            PpuRegister::PpuCtrl => {
                let was_enabled = self.register(reg) & CTRL_NMI_ENABLE != 0;
                self.set_register(reg, data as u16);
                let in_vblank = self.register(PpuRegister::PpuStatus) & STATUS_VBLANK != 0;
                // Enabling NMIs during vblank raises one immediately
                if !was_enabled && data as u16 & CTRL_NMI_ENABLE != 0 && in_vblank {
                    self.nmi = true;
                }
            }
            PpuRegister::OamData => {
                let oam_addr = self.register(PpuRegister::OamAddr);
                self.oam[oam_addr as usize] = data;
                self.set_register(reg, data as u16);
                self.set_register(PpuRegister::OamAddr, (oam_addr + 1) & 0xFF);
            }
            _ => self.set_register(reg, data as u16),
        }
        Ok(())
    }

    /// PPUDATA read. Palette reads are immediate; everything else comes out one read late.
    fn read_data(&mut self) -> u8 {
        let addr = self.register(PpuRegister::PpuAddr);
        let value = if (0x3F00..=0x3FFF).contains(&(addr & 0x3FFF)) {
            self.buffer = self.vram_read(addr);
            self.buffer
        } else {
            let previous = self.buffer;
            self.buffer = self.vram_read(addr);
            previous
        };
        self.set_register(PpuRegister::PpuAddr, addr.wrapping_add(1));
        value
    }

    /// Two-write registers: the first write of a pair is the high byte, the second the low byte.
    fn write_pair(&mut self, reg: PpuRegister, data: u8) {
        let latch = match reg {
            PpuRegister::PpuScroll => &mut self.scroll_latch,
            _ => &mut self.addr_latch,
        };
        let high = !*latch;
        *latch = high;

        let old = self.register(reg);
        let value = if high {
            (old & 0x00FF) | ((data as u16) << 8)
        } else {
            (old & 0xFF00) | data as u16
        };
        self.set_register(reg, value);
    }

    /// Resolve VRAM mirrors to the backing index.
    fn mirror(addr: u16) -> usize {
        let addr = addr & 0x3FFF;
        let addr = match addr {
            0x3000..=0x3EFF => addr - 0x1000,
            0x3F00..=0x3FFF => match PALETTE | (addr & 0x1F) {
                // Sprite backdrop slots alias the background ones
                mirrored @ (0x3F10 | 0x3F14 | 0x3F18 | 0x3F1C) => mirrored - 0x10,
                mirrored => mirrored,
            },
            _ => addr,
        };
        addr as usize
    }

    pub fn vram_read(&self, addr: u16) -> u8 {
        self.vram[Self::mirror(addr)]
    }

    pub fn vram_write(&mut self, addr: u16, data: u8) {
        self.vram[Self::mirror(addr)] = data;
    }

    pub fn oam(&self) -> &[u8; OAM_LEN] {
        &self.oam
    }

    /// Copy a 256-byte CPU page into OAM, starting at OAMADDR and wrapping.
    pub fn oam_dma(&mut self, data: &[u8; OAM_LEN]) {
        let start = self.register(PpuRegister::OamAddr) as usize;
        for (i, byte) in data.iter().enumerate() {
            self.oam[(start + i) % OAM_LEN] = *byte;
        }
    }

    /// Mark the start of vblank; arms the NMI latch when PPUCTRL allows it.
    pub fn enter_vblank(&mut self) {
        let status = self.register(PpuRegister::PpuStatus);
        self.set_register(PpuRegister::PpuStatus, status | STATUS_VBLANK);
        if self.register(PpuRegister::PpuCtrl) & CTRL_NMI_ENABLE != 0 {
            self.nmi = true;
        }
    }

    /// Consume the NMI latch.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi)
    }

    /// Background color at screen pixel (x, y), x in 0..256, y in 0..240.
    pub fn color_at(&self, x: usize, y: usize) -> Rgba {
        let tile = x / 8 + (y / 8) * 32;
        let pattern = self.vram_read((NAME_TABLE + tile) as u16) as usize * 16;

        let row = y % 8;
        let plane0 = self.vram_read((pattern + row) as u16);
        let plane1 = self.vram_read((pattern + row + 8) as u16);
        let bit = 0x80u8 >> (x % 8);
        let low = ((plane0 & bit) != 0) as u8 | ((((plane1 & bit) != 0) as u8) << 1);

        let attribute_addr = NAME_TABLE + ATTRIBUTE_OFFSET + (x >> 5) + (y >> 5) * 8;
        let attribute = self.vram_read(attribute_addr as u16);
        let shift = ((x & 0x10) >> 3) | ((y & 0x10) >> 2);
        let high = (attribute >> shift) & 0b11;

        let index = (high << 2) | low;
        let color = self.vram_read(PALETTE + index as u16);
        COLOR_TABLE[(color & 0x3F) as usize]
    }

    /// Fill a row-major 256×240 buffer of 0x00RRGGBB pixels.
    pub fn render(&self, surface: &mut [u32]) {
        for (y, row) in surface.chunks_mut(SCREEN_WIDTH).take(SCREEN_HEIGHT).enumerate() {
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = self.color_at(x, y).to_rgb();
            }
        }
    }
}

impl Default for PPU {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_addr(ppu: &mut PPU, addr: u16) {
        ppu.port_write(0x2006, (addr >> 8) as u8).unwrap();
        ppu.port_write(0x2006, addr as u8).unwrap();
    }

    #[test]
    fn power_up_status() {
        let ppu = PPU::new();
        assert_eq!(ppu.register(PpuRegister::PpuStatus), 0b1010_0000);
    }

    #[test]
    fn ports_map_to_named_registers() {
        assert_eq!(PpuRegister::from_port(0x2000, Access::Read).unwrap(), PpuRegister::PpuCtrl);
        assert_eq!(PpuRegister::from_port(0x2007, Access::Read).unwrap(), PpuRegister::PpuData);
        assert_eq!(PpuRegister::from_port(0x4014, Access::Write).unwrap(), PpuRegister::OamDma);
    }

    #[test]
    fn unknown_port_is_an_address_error() {
        let mut ppu = PPU::new();
        assert!(matches!(
            ppu.port_read(0x2008),
            Err(Error::Address { addr: 0x2008, access: Access::Read })
        ));
        assert!(matches!(
            ppu.port_write(0x4015, 0),
            Err(Error::Address { addr: 0x4015, access: Access::Write })
        ));
    }

    #[test]
    fn ppuaddr_takes_high_then_low() {
        let mut ppu = PPU::new();
        set_addr(&mut ppu, 0x2345);
        assert_eq!(ppu.register(PpuRegister::PpuAddr), 0x2345);
    }

    #[test]
    fn scroll_and_addr_toggles_are_independent() {
        let mut ppu = PPU::new();
        ppu.port_write(0x2006, 0x21).unwrap(); // PPUADDR high
        ppu.port_write(0x2005, 0x12).unwrap(); // PPUSCROLL high
        ppu.port_write(0x2006, 0x08).unwrap(); // PPUADDR low
        ppu.port_write(0x2005, 0x34).unwrap(); // PPUSCROLL low

        assert_eq!(ppu.register(PpuRegister::PpuAddr), 0x2108);
        assert_eq!(ppu.register(PpuRegister::PpuScroll), 0x1234);
    }

    #[test]
    fn ppudata_write_increments_address() {
        let mut ppu = PPU::new();
        set_addr(&mut ppu, 0x2000);
        ppu.port_write(0x2007, 0xAA).unwrap();
        ppu.port_write(0x2007, 0xBB).unwrap();

        assert_eq!(ppu.vram_read(0x2000), 0xAA);
        assert_eq!(ppu.vram_read(0x2001), 0xBB);
        assert_eq!(ppu.register(PpuRegister::PpuAddr), 0x2002);
    }

    #[test]
    fn ppudata_read_is_one_behind_outside_palette() {
        let mut ppu = PPU::new();
        set_addr(&mut ppu, 0x2400);
        ppu.port_write(0x2007, 0x11).unwrap();
        ppu.port_write(0x2007, 0x22).unwrap();

        set_addr(&mut ppu, 0x2400);
        // Buffer still holds whatever was there before the address change
        assert_eq!(ppu.port_read(0x2007).unwrap(), 0x00);
        assert_eq!(ppu.port_read(0x2007).unwrap(), 0x11);
        assert_eq!(ppu.port_read(0x2007).unwrap(), 0x22);
        assert_eq!(ppu.register(PpuRegister::PpuAddr), 0x2403);
    }

    #[test]
    fn ppudata_palette_read_is_immediate() {
        let mut ppu = PPU::new();
        set_addr(&mut ppu, 0x3F01);
        ppu.port_write(0x2007, 0x2C).unwrap();

        set_addr(&mut ppu, 0x3F01);
        assert_eq!(ppu.port_read(0x2007).unwrap(), 0x2C);
        assert_eq!(ppu.register(PpuRegister::PpuAddr), 0x3F02);
    }

    #[test]
    fn name_table_mirror_above_3000() {
        let mut ppu = PPU::new();
        ppu.vram_write(0x3123, 0x77);
        assert_eq!(ppu.vram_read(0x2123), 0x77);
    }

    #[test]
    fn palette_mirrors() {
        let mut ppu = PPU::new();
        ppu.vram_write(0x3F10, 0x0F);
        assert_eq!(ppu.vram_read(0x3F00), 0x0F);

        ppu.vram_write(0x3F1C, 0x30);
        assert_eq!(ppu.vram_read(0x3F0C), 0x30);

        ppu.vram_write(0x3F25, 0x16);
        assert_eq!(ppu.vram_read(0x3F05), 0x16);

        // $3F30 masks to $3F10, which aliases $3F00
        assert_eq!(ppu.vram_read(0x3F30), 0x0F);
    }

    #[test]
    fn blank_canvas_is_color_zero() {
        let ppu = PPU::new();
        for (x, y) in [(0, 0), (255, 239), (17, 130), (128, 16)] {
            assert_eq!(ppu.color_at(x, y), COLOR_TABLE[0]);
        }
    }

    #[test]
    fn pattern_bits_select_palette_entry() {
        let mut ppu = PPU::new();
        // Tile 1: row 0 has plane0 = 0b1000_0000, plane1 = 0b1100_0000
        ppu.load_chr(&{
            let mut chr = [0u8; 32];
            chr[16] = 0b1000_0000;
            chr[24] = 0b1100_0000;
            chr
        })
        .unwrap();
        ppu.vram_write(0x2000, 1);
        ppu.vram_write(0x3F03, 0x21);
        ppu.vram_write(0x3F02, 0x16);

        assert_eq!(ppu.color_at(0, 0), COLOR_TABLE[0x21]); // both planes
        assert_eq!(ppu.color_at(1, 0), COLOR_TABLE[0x16]); // plane1 only
        assert_eq!(ppu.color_at(2, 0), COLOR_TABLE[0]); // neither
    }

    #[test]
    fn attribute_quadrant_selects_high_bits() {
        let mut ppu = PPU::new();
        // Bottom-right quadrant of the first attribute byte → palette 3
        ppu.vram_write(0x23C0, 0b11_00_00_00);
        ppu.vram_write(0x3F0C, 0x2A);

        assert_eq!(ppu.color_at(16, 16), COLOR_TABLE[0x2A]);
        assert_eq!(ppu.color_at(0, 0), COLOR_TABLE[0]);
    }

    #[test]
    fn oam_data_writes_advance_oam_addr() {
        let mut ppu = PPU::new();
        ppu.port_write(0x2003, 0xFF).unwrap();
        ppu.port_write(0x2004, 0x42).unwrap();
        ppu.port_write(0x2004, 0x43).unwrap();

        assert_eq!(ppu.oam()[0xFF], 0x42);
        assert_eq!(ppu.oam()[0x00], 0x43);
        assert_eq!(ppu.register(PpuRegister::OamAddr), 0x01);
    }

    #[test]
    fn nmi_latch_is_armed_on_vblank_and_consumed_once() {
        let mut ppu = PPU::new();
        ppu.enter_vblank();
        assert!(!ppu.take_nmi(), "NMIs disabled in PPUCTRL");

        ppu.port_write(0x2000, 0x80).unwrap();
        // Status powers up with vblank set, so enabling raises one right away
        assert!(ppu.take_nmi());
        assert!(!ppu.take_nmi());

        ppu.enter_vblank();
        assert!(ppu.take_nmi());
    }

    #[test]
    fn status_reads_back_unchanged() {
        let mut ppu = PPU::new();
        assert_eq!(ppu.port_read(0x2002).unwrap(), 0b1010_0000);
        assert_eq!(ppu.port_read(0x2002).unwrap(), 0b1010_0000);
        assert_eq!(ppu.register(PpuRegister::PpuStatus), 0b1010_0000);
    }

    #[test]
    fn oam_data_reads_back_last_write() {
        let mut ppu = PPU::new();
        ppu.port_write(0x2003, 0x10).unwrap();
        ppu.port_write(0x2004, 0x42).unwrap();
        assert_eq!(ppu.port_read(0x2004).unwrap(), 0x42);
        assert_eq!(ppu.port_read(0x2004).unwrap(), 0x42);
        assert_eq!(ppu.register(PpuRegister::OamAddr), 0x11);
    }

    #[test]
    fn render_fills_the_surface() {
        let mut ppu = PPU::new();
        ppu.vram_write(0x3F00, 0x20);
        let mut surface = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];
        ppu.render(&mut surface);
        assert!(surface.iter().all(|&p| p == COLOR_TABLE[0x20].to_rgb()));
    }
}
