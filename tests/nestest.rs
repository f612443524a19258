//! Whole-machine runs through the public API.
//!
//! `tests/roms/conformance.json` is the golden trace of the small program in
//! `subroutine_program_matches_golden_trace`, replayed the same way as nestest.
//! The nestest replay needs `tests/roms/nestest.nes` and its golden trace `tests/roms/nestest.json`,
//! which are not checked in. Run with `cargo test -- --ignored` once they are in place.

use std::path::Path;

use famicore::{
    Error,
    bus::NesBus,
    cartridge::cartridge::Cartridge,
    cpu::{Interrupt, Register, CPU},
    ppu::palette::COLOR_TABLE,
    ppu::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
    trace::{DiffOutcome, TraceDiffer, NESTEST_END_SENTINEL},
};

const ROM: &str = "tests/roms/nestest.nes";
const GOLDEN: &str = "tests/roms/nestest.json";
const CONFORMANCE_GOLDEN: &str = "tests/roms/conformance.json";

/// One 16 KiB PRG bank and no CHR. RESET points at the program at $C000.
fn ines_image(program: &[u8], nmi: u16) -> Vec<u8> {
    let mut data = vec![b'N', b'E', b'S', 0x1A, 1, 0];
    data.resize(16, 0);

    let mut prg = vec![0xEA; 0x4000];
    prg[..program.len()].copy_from_slice(program);
    prg[0x3FFA..0x3FFC].copy_from_slice(&nmi.to_le_bytes());
    prg[0x3FFC..0x3FFE].copy_from_slice(&0xC000u16.to_le_bytes());
    data.extend(prg);
    data
}

#[test]
fn program_sets_backdrop_and_takes_nmi() {
    let program = [
        0xA9, 0x3F, // LDA #$3F
        0x8D, 0x06, 0x20, // STA $2006
        0xA9, 0x00, // LDA #$00
        0x8D, 0x06, 0x20, // STA $2006
        0xA9, 0x21, // LDA #$21
        0x8D, 0x07, 0x20, // STA $2007
        0xA9, 0x80, // LDA #$80
        0x8D, 0x00, 0x20, // STA $2000
        0x4C, 0x14, 0xC0, // JMP $C014
    ];
    let cart = Cartridge::from_bytes(&ines_image(&program, 0xC100)).unwrap();

    let mut cpu = CPU::<NesBus>::default();
    cpu.load(&cart.prg_rom, &cart.chr_rom).unwrap();
    cpu.interrupt(Interrupt::Reset).unwrap();
    assert_eq!(cpu.reg("PC").unwrap(), 0xC000);

    for _ in 0..12 {
        cpu.execute().unwrap();
    }
    assert_eq!(cpu.reg("PC").unwrap(), 0xC014);

    let mut framebuffer = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];
    cpu.draw(&mut framebuffer);
    assert_eq!(cpu.color_at(255, 239), COLOR_TABLE[0x21]);
    assert!(framebuffer.iter().all(|&px| px == COLOR_TABLE[0x21].to_rgb()));

    cpu.interrupt(Interrupt::Nmi).unwrap();
    assert_eq!(cpu.reg("PC").unwrap(), 0xC100);

    // The latch is spent
    cpu.set_register(Register::Pc, 0xC014).unwrap();
    cpu.interrupt(Interrupt::Nmi).unwrap();
    assert_eq!(cpu.reg("PC").unwrap(), 0xC014);
}

#[test]
fn unstable_opcode_stops_the_run() {
    let cart = Cartridge::from_bytes(&ines_image(&[0xEA, 0x02], 0xC000)).unwrap();
    let mut cpu = CPU::<NesBus>::default();
    cpu.load(&cart.prg_rom, &cart.chr_rom).unwrap();
    cpu.interrupt(Interrupt::Reset).unwrap();

    cpu.execute().unwrap();
    assert!(matches!(cpu.execute(), Err(Error::UnsupportedOperation(_))));
}

/// Replay from $C000 with P=$24, as nestest's automated mode does.
fn replay(cpu: &mut CPU<NesBus>, mut differ: TraceDiffer) -> usize {
    cpu.set_reg("PC", 0xC000).unwrap();
    cpu.set_reg("P", 0x24).unwrap();
    loop {
        let snapshot = cpu.execute().unwrap();
        match differ.diff(&snapshot) {
            Ok(DiffOutcome::Matched) => {}
            Ok(DiffOutcome::AllMatched) => return differ.cursor(),
            Err(e) => panic!("{e}"),
        }
    }
}

#[test]
fn subroutine_program_matches_golden_trace() {
    let mut program = vec![0xEA; 0x44];
    program[..0x2D].copy_from_slice(&[
        0xA2, 0x00, // LDX #$00
        0xA0, 0x10, // LDY #$10
        0xA9, 0xF0, // LDA #$F0
        0x85, 0x10, // STA $10
        0x18, // CLC
        0x69, 0x20, // ADC #$20
        0x38, // SEC
        0xE9, 0x50, // SBC #$50
        0xC9, 0xC0, // CMP #$C0
        0xF0, 0x02, // BEQ $C014
        0xA9, 0xFF, // LDA #$FF (skipped)
        0x20, 0x30, 0xC0, // JSR $C030
        0x08, // PHP
        0x68, // PLA
        0xA7, 0x10, // LAX $10
        0x87, 0x11, // SAX $11
        0xC7, 0x11, // DCP $11
        0xE7, 0x10, // ISB $10
        0x0A, // ASL A
        0x6A, // ROR A
        0x24, 0x10, // BIT $10
        0xA2, 0x02, // LDX #$02
        0xCA, // DEX
        0xD0, 0xFD, // BNE $C027
        0x6C, 0xFF, 0x02, // JMP ($02FF), high byte from $0200
    ]);
    program[0x30..0x3B].copy_from_slice(&[
        0xA9, 0x40, // LDA #$40
        0x8D, 0xFF, 0x02, // STA $02FF
        0xA9, 0xC0, // LDA #$C0
        0x8D, 0x00, 0x02, // STA $0200
        0x60, // RTS
    ]);
    program[0x40..0x43].copy_from_slice(&[
        0xEA, // NOP
        0x04, 0x10, // NOP $10
    ]);
    let cart = Cartridge::from_bytes(&ines_image(&program, 0xC000)).unwrap();
    let mut cpu = CPU::<NesBus>::default();
    cpu.load(&cart.prg_rom, &cart.chr_rom).unwrap();

    let differ = TraceDiffer::from_json(CONFORMANCE_GOLDEN).unwrap();
    assert_eq!(replay(&mut cpu, differ), 33);
    assert_eq!(cpu.mem(0x10).unwrap(), 0xF1);
    assert_eq!(cpu.mem(0x11).unwrap(), 0xEF);
}

#[test]
#[ignore = "needs tests/roms/nestest.nes and tests/roms/nestest.json"]
fn nestest_matches_golden_trace() {
    assert!(Path::new(ROM).exists(), "missing {ROM}");

    let cart = Cartridge::load(ROM).unwrap();
    let mut cpu = CPU::<NesBus>::default();
    cpu.load(&cart.prg_rom, &cart.chr_rom).unwrap();

    let differ = TraceDiffer::from_json(GOLDEN).unwrap().with_end(NESTEST_END_SENTINEL);
    assert_eq!(replay(&mut cpu, differ), NESTEST_END_SENTINEL);
}
