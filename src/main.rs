//! NES emulator entry point.
//!
//! Loads a cartridge and either runs it in a window or replays it against a golden trace.
//! Usage: famicore [--rom path/to/game.nes] [--golden nestest.json]

mod logger;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use ansi_term::Colour::Red;
use clap::{Parser, ValueEnum};
use famicore::{
    bus::NesBus,
    cartridge::cartridge::Cartridge,
    cpu::{Interrupt, Register, CPU},
    ppu::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
    trace::{DiffOutcome, TraceDiffer, NESTEST_END_SENTINEL},
};
use log::{LevelFilter, info};
use minifb::{Key, Scale, Window, WindowOptions};

/// NES runs at ~60.0988 Hz (NTSC). Target one frame per 16.67 ms for ~60 fps.
const FRAME_DURATION: Duration = Duration::from_nanos(16_666_667);

/// nestest's automated entry point and the status it expects there.
const NESTEST_START_PC: u16 = 0xC000;
const NESTEST_START_STATUS: u32 = 0x24;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindowScale {
    X1,
    X2,
    X4,
    Fit,
}

impl From<WindowScale> for Scale {
    fn from(scale: WindowScale) -> Self {
        match scale {
            WindowScale::X1 => Scale::X1,
            WindowScale::X2 => Scale::X2,
            WindowScale::X4 => Scale::X4,
            WindowScale::Fit => Scale::FitScreen,
        }
    }
}

/// 6502 + NES background PPU emulator
#[derive(Parser, Debug)]
#[command(name = "famicore", version)]
struct Args {
    /// Path to the iNES ROM file (mapper 0)
    #[arg(short, long, default_value = "tests/roms/nestest.nes")]
    rom: PathBuf,

    /// Instructions executed between frames
    #[arg(short, long, default_value_t = 10_000)]
    steps_per_frame: u32,

    /// Window scale
    #[arg(long, value_enum, default_value_t = WindowScale::X2)]
    scale: WindowScale,

    /// Golden trace (JSON) to replay headless instead of opening a window
    #[arg(short, long)]
    golden: Option<PathBuf>,

    /// Entries of the golden trace to compare
    #[arg(long, default_value_t = NESTEST_END_SENTINEL)]
    trace_end: usize,

    /// Start here with P=$24 instead of taking RESET (hex, e.g. C000)
    #[arg(long, value_parser = parse_hex_u16)]
    start_pc: Option<u16>,

    /// off, error, warn, info, debug or trace
    #[arg(short, long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(digits, 16).map_err(|e| format!("'{s}' is not a 16-bit hex address: {e}"))
}

fn main() {
    let args = Args::parse();
    if let Err(e) = logger::init(args.log_level) {
        eprintln!("{} {e}", Red.bold().paint("ERROR"));
    }

    if let Err(e) = run(&args) {
        eprintln!("{} {e}", Red.bold().paint("ERROR"));
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let cart = Cartridge::load(&args.rom)?;
    let mut cpu = CPU::<NesBus>::default();
    cpu.load(&cart.prg_rom, &cart.chr_rom)?;

    // A golden replay starts at nestest's automated entry unless told otherwise
    let start_pc = args
        .start_pc
        .or_else(|| args.golden.as_ref().map(|_| NESTEST_START_PC));
    match start_pc {
        Some(pc) => {
            cpu.set_register(Register::Pc, pc as u32)?;
            cpu.set_register(Register::P, NESTEST_START_STATUS)?;
        }
        None => cpu.interrupt(Interrupt::Reset)?,
    }

    match &args.golden {
        Some(golden) => replay(&mut cpu, golden, args.trace_end),
        None => windowed(&mut cpu, args),
    }
}

fn replay(cpu: &mut CPU<NesBus>, golden: &Path, end: usize) -> Result<(), Box<dyn Error>> {
    let mut differ = TraceDiffer::from_json(golden)?.with_end(end);
    loop {
        let snapshot = cpu.execute()?;
        if differ.diff(&snapshot)? == DiffOutcome::AllMatched {
            info!("all {} steps matched {}", differ.cursor(), golden.display());
            return Ok(());
        }
    }
}

fn windowed(cpu: &mut CPU<NesBus>, args: &Args) -> Result<(), Box<dyn Error>> {
    let mut window = Window::new(
        "Famicore",
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
        WindowOptions {
            resize: true,
            scale: args.scale.into(),
            ..WindowOptions::default()
        },
    )?;
    let mut framebuffer = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let frame_start = Instant::now();

        for _ in 0..args.steps_per_frame {
            cpu.execute()?;
        }
        cpu.interrupt(Interrupt::Nmi)?;
        cpu.draw(&mut framebuffer);

        window.update_with_buffer(&framebuffer, SCREEN_WIDTH, SCREEN_HEIGHT)?;

        // Pace to ~60 fps so we don't burn CPU
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }
    info!("window closed after {} instructions", cpu.steps());
    Ok(())
}
