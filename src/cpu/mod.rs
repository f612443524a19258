//! 6502 CPU emulation for the NES.
//!
//! Table-driven: each opcode byte decodes to a mnemonic and an addressing mode, the mode resolves
//! to an [`Operand`](cpu::Operand) once, and the mnemonic's handler acts on it. Covers the
//! documented set and the stable undocumented opcodes; nestest-compatible.
//! Memory and I/O go through the [`Bus`](crate::bus::Bus) trait.

pub mod cpu;
pub mod flags;
pub mod opcodes;
pub mod registers;

pub use cpu::{Interrupt, Operand, CPU};
pub use flags::Flag;
pub use opcodes::{AddressingMode, Mnemonic};
pub use registers::Register;
