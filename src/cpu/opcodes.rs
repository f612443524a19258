//! The 256-entry opcode table: opcode byte → (mnemonic, addressing mode).
//!
//! Covers every byte, including the undocumented opcodes. See
//! [CPU unofficial opcodes](https://www.nesdev.org/wiki/CPU_unofficial_opcodes).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Instruction mnemonic. Serialized in upper case, as traces print it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mnemonic {
    Adc, Ahx, Anc, And, Arr, Asl, Asr, Axs, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk,
    Bvc, Bvs, Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dcp, Dec, Dex, Dey, Eor, Inc, Inx,
    Iny, Isb, Jmp, Jsr, Kil, Las, Lax, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla,
    Plp, Rla, Rol, Ror, Rra, Rti, Rts, Sax, Sbc, Sec, Sed, Sei, Shx, Shy, Slo, Sre,
    Sta, Stx, Sty, Tas, Tax, Tay, Tsx, Txa, Txs, Tya, Xaa,
}

impl Mnemonic {
    pub fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Adc => "ADC", Ahx => "AHX", Anc => "ANC", And => "AND", Arr => "ARR",
            Asl => "ASL", Asr => "ASR", Axs => "AXS", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dcp => "DCP", Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR",
            Inc => "INC", Inx => "INX", Iny => "INY", Isb => "ISB", Jmp => "JMP",
            Jsr => "JSR", Kil => "KIL", Las => "LAS", Lax => "LAX", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rla => "RLA",
            Rol => "ROL", Ror => "ROR", Rra => "RRA", Rti => "RTI", Rts => "RTS",
            Sax => "SAX", Sbc => "SBC", Sec => "SEC", Sed => "SED", Sei => "SEI",
            Shx => "SHX", Shy => "SHY", Slo => "SLO", Sre => "SRE", Sta => "STA",
            Stx => "STX", Sty => "STY", Tas => "TAS", Tax => "TAX", Tay => "TAY",
            Tsx => "TSX", Txa => "TXA", Txs => "TXS", Tya => "TYA", Xaa => "XAA",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an instruction finds its operand. `Implied` also covers the accumulator forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Relative,
}

impl AddressingMode {
    /// Three-letter tag (IMP, IMM, ZPG, ...).
    pub fn tag(self) -> &'static str {
        match self {
            AddressingMode::Implied => "IMP",
            AddressingMode::Immediate => "IMM",
            AddressingMode::ZeroPage => "ZPG",
            AddressingMode::ZeroPageX => "ZPX",
            AddressingMode::ZeroPageY => "ZPY",
            AddressingMode::Absolute => "ABS",
            AddressingMode::AbsoluteX => "ABX",
            AddressingMode::AbsoluteY => "ABY",
            AddressingMode::Indirect => "IND",
            AddressingMode::IndirectX => "INX",
            AddressingMode::IndirectY => "INY",
            AddressingMode::Relative => "REL",
        }
    }

    /// Operand bytes that follow the opcode.
    pub fn operand_len(self) -> u16 {
        match self {
            AddressingMode::Implied => 0,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
}

/// Look up an opcode byte. Total: every byte decodes to something.
pub fn decode(opcode: u8) -> Instruction {
    table::OPCODES[opcode as usize]
}

mod table {
    use super::AddressingMode::*;
    use super::Instruction;
    use super::Mnemonic::*;

    const fn op(mnemonic: super::Mnemonic, mode: super::AddressingMode) -> Instruction {
        Instruction { mnemonic, mode }
    }

    pub(super) const OPCODES: [Instruction; 256] = [
        // $00
        op(Brk, Implied), op(Ora, IndirectX), op(Kil, Implied), op(Slo, IndirectX),
        op(Nop, ZeroPage), op(Ora, ZeroPage), op(Asl, ZeroPage), op(Slo, ZeroPage),
        op(Php, Implied), op(Ora, Immediate), op(Asl, Implied), op(Anc, Immediate),
        op(Nop, Absolute), op(Ora, Absolute), op(Asl, Absolute), op(Slo, Absolute),
        // $10
        op(Bpl, Relative), op(Ora, IndirectY), op(Kil, Implied), op(Slo, IndirectY),
        op(Nop, ZeroPageX), op(Ora, ZeroPageX), op(Asl, ZeroPageX), op(Slo, ZeroPageX),
        op(Clc, Implied), op(Ora, AbsoluteY), op(Nop, Implied), op(Slo, AbsoluteY),
        op(Nop, AbsoluteX), op(Ora, AbsoluteX), op(Asl, AbsoluteX), op(Slo, AbsoluteX),
        // $20
        op(Jsr, Absolute), op(And, IndirectX), op(Kil, Implied), op(Rla, IndirectX),
        op(Bit, ZeroPage), op(And, ZeroPage), op(Rol, ZeroPage), op(Rla, ZeroPage),
        op(Plp, Implied), op(And, Immediate), op(Rol, Implied), op(Anc, Immediate),
        op(Bit, Absolute), op(And, Absolute), op(Rol, Absolute), op(Rla, Absolute),
        // $30
        op(Bmi, Relative), op(And, IndirectY), op(Kil, Implied), op(Rla, IndirectY),
        op(Nop, ZeroPageX), op(And, ZeroPageX), op(Rol, ZeroPageX), op(Rla, ZeroPageX),
        op(Sec, Implied), op(And, AbsoluteY), op(Nop, Implied), op(Rla, AbsoluteY),
        op(Nop, AbsoluteX), op(And, AbsoluteX), op(Rol, AbsoluteX), op(Rla, AbsoluteX),
        // $40
        op(Rti, Implied), op(Eor, IndirectX), op(Kil, Implied), op(Sre, IndirectX),
        op(Nop, ZeroPage), op(Eor, ZeroPage), op(Lsr, ZeroPage), op(Sre, ZeroPage),
        op(Pha, Implied), op(Eor, Immediate), op(Lsr, Implied), op(Asr, Immediate),
        op(Jmp, Absolute), op(Eor, Absolute), op(Lsr, Absolute), op(Sre, Absolute),
        // $50
        op(Bvc, Relative), op(Eor, IndirectY), op(Kil, Implied), op(Sre, IndirectY),
        op(Nop, ZeroPageX), op(Eor, ZeroPageX), op(Lsr, ZeroPageX), op(Sre, ZeroPageX),
        op(Cli, Implied), op(Eor, AbsoluteY), op(Nop, Implied), op(Sre, AbsoluteY),
        op(Nop, AbsoluteX), op(Eor, AbsoluteX), op(Lsr, AbsoluteX), op(Sre, AbsoluteX),
        // $60
        op(Rts, Implied), op(Adc, IndirectX), op(Kil, Implied), op(Rra, IndirectX),
        op(Nop, ZeroPage), op(Adc, ZeroPage), op(Ror, ZeroPage), op(Rra, ZeroPage),
        op(Pla, Implied), op(Adc, Immediate), op(Ror, Implied), op(Arr, Immediate),
        op(Jmp, Indirect), op(Adc, Absolute), op(Ror, Absolute), op(Rra, Absolute),
        // $70
        op(Bvs, Relative), op(Adc, IndirectY), op(Kil, Implied), op(Rra, IndirectY),
        op(Nop, ZeroPageX), op(Adc, ZeroPageX), op(Ror, ZeroPageX), op(Rra, ZeroPageX),
        op(Sei, Implied), op(Adc, AbsoluteY), op(Nop, Implied), op(Rra, AbsoluteY),
        op(Nop, AbsoluteX), op(Adc, AbsoluteX), op(Ror, AbsoluteX), op(Rra, AbsoluteX),
        // $80
        op(Nop, Immediate), op(Sta, IndirectX), op(Nop, Immediate), op(Sax, IndirectX),
        op(Sty, ZeroPage), op(Sta, ZeroPage), op(Stx, ZeroPage), op(Sax, ZeroPage),
        op(Dey, Implied), op(Nop, Immediate), op(Txa, Implied), op(Xaa, Immediate),
        op(Sty, Absolute), op(Sta, Absolute), op(Stx, Absolute), op(Sax, Absolute),
        // $90
        op(Bcc, Relative), op(Sta, IndirectY), op(Kil, Implied), op(Ahx, IndirectY),
        op(Sty, ZeroPageX), op(Sta, ZeroPageX), op(Stx, ZeroPageY), op(Sax, ZeroPageY),
        op(Tya, Implied), op(Sta, AbsoluteY), op(Txs, Implied), op(Tas, AbsoluteY),
        op(Shy, AbsoluteX), op(Sta, AbsoluteX), op(Shx, AbsoluteY), op(Ahx, AbsoluteY),
        // $A0
        op(Ldy, Immediate), op(Lda, IndirectX), op(Ldx, Immediate), op(Lax, IndirectX),
        op(Ldy, ZeroPage), op(Lda, ZeroPage), op(Ldx, ZeroPage), op(Lax, ZeroPage),
        op(Tay, Implied), op(Lda, Immediate), op(Tax, Implied), op(Lax, Immediate),
        op(Ldy, Absolute), op(Lda, Absolute), op(Ldx, Absolute), op(Lax, Absolute),
        // $B0
        op(Bcs, Relative), op(Lda, IndirectY), op(Kil, Implied), op(Lax, IndirectY),
        op(Ldy, ZeroPageX), op(Lda, ZeroPageX), op(Ldx, ZeroPageY), op(Lax, ZeroPageY),
        op(Clv, Implied), op(Lda, AbsoluteY), op(Tsx, Implied), op(Las, AbsoluteY),
        op(Ldy, AbsoluteX), op(Lda, AbsoluteX), op(Ldx, AbsoluteY), op(Lax, AbsoluteY),
        // $C0
        op(Cpy, Immediate), op(Cmp, IndirectX), op(Nop, Immediate), op(Dcp, IndirectX),
        op(Cpy, ZeroPage), op(Cmp, ZeroPage), op(Dec, ZeroPage), op(Dcp, ZeroPage),
        op(Iny, Implied), op(Cmp, Immediate), op(Dex, Implied), op(Axs, Immediate),
        op(Cpy, Absolute), op(Cmp, Absolute), op(Dec, Absolute), op(Dcp, Absolute),
        // $D0
        op(Bne, Relative), op(Cmp, IndirectY), op(Kil, Implied), op(Dcp, IndirectY),
        op(Nop, ZeroPageX), op(Cmp, ZeroPageX), op(Dec, ZeroPageX), op(Dcp, ZeroPageX),
        op(Cld, Implied), op(Cmp, AbsoluteY), op(Nop, Implied), op(Dcp, AbsoluteY),
        op(Nop, AbsoluteX), op(Cmp, AbsoluteX), op(Dec, AbsoluteX), op(Dcp, AbsoluteX),
        // $E0
        op(Cpx, Immediate), op(Sbc, IndirectX), op(Nop, Immediate), op(Isb, IndirectX),
        op(Cpx, ZeroPage), op(Sbc, ZeroPage), op(Inc, ZeroPage), op(Isb, ZeroPage),
        op(Inx, Implied), op(Sbc, Immediate), op(Nop, Implied), op(Sbc, Immediate),
        op(Cpx, Absolute), op(Sbc, Absolute), op(Inc, Absolute), op(Isb, Absolute),
        // $F0
        op(Beq, Relative), op(Sbc, IndirectY), op(Kil, Implied), op(Isb, IndirectY),
        op(Nop, ZeroPageX), op(Sbc, ZeroPageX), op(Inc, ZeroPageX), op(Isb, ZeroPageX),
        op(Sed, Implied), op(Sbc, AbsoluteY), op(Nop, Implied), op(Isb, AbsoluteY),
        op(Nop, AbsoluteX), op(Sbc, AbsoluteX), op(Inc, AbsoluteX), op(Isb, AbsoluteX),
    ];
}
