use std::fmt;
use std::str::FromStr;

use log::{debug, info, trace};

use crate::{
    bus::{Bus, NesBus},
    cpu::{
        flags::{Flag, FLAG_BREAK, FLAG_UNUSED},
        opcodes::{self, AddressingMode, Instruction, Mnemonic},
        registers::Register,
    },
    error::{Error, Result},
    ppu::palette::Rgba,
    trace::Snapshot,
};

pub const STACK_BASE: u16 = 0x0100;
pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

const POWER_UP_STATUS: u8 = 0x34;
const POWER_UP_SP: u8 = 0xFD;

/// Interrupts the driver can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Reset,
    Nmi,
}

impl Interrupt {
    pub const fn vector(self) -> u16 {
        match self {
            Interrupt::Reset => RESET_VECTOR,
            Interrupt::Nmi => NMI_VECTOR,
        }
    }
}

impl FromStr for Interrupt {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("reset") {
            Ok(Interrupt::Reset)
        } else if s.eq_ignore_ascii_case("nmi") {
            Ok(Interrupt::Nmi)
        } else {
            Err(Error::UnsupportedOperation(format!("interrupt '{s}'")))
        }
    }
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Reset => f.write_str("RESET"),
            Interrupt::Nmi => f.write_str("NMI"),
        }
    }
}

/// What an addressing mode resolved to. Resolved once per instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No operand, or the accumulator.
    Implied,
    /// The operand byte itself; never dereferenced.
    Immediate(u8),
    Address(u16),
}

impl Operand {
    /// The value a trace records: the target address, or the immediate byte itself.
    /// Only implied operands have none.
    pub fn traced_address(self) -> Option<u16> {
        match self {
            Operand::Implied => None,
            Operand::Immediate(value) => Some(value as u16),
            Operand::Address(addr) => Some(addr),
        }
    }
}

pub struct CPU<B: Bus> {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,
    status: u8,
    steps: u64,
    bus: B,
}

impl<B: Bus> CPU<B> {
    /// Power-up state: P=$34, S=$FD, everything else zero.
    pub fn new(bus: B) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: POWER_UP_SP,
            pc: 0,
            status: POWER_UP_STATUS,
            steps: 0,
            bus,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn register(&self, reg: Register) -> u16 {
        match reg {
            Register::Pc => self.pc,
            Register::A => self.a as u16,
            Register::X => self.x as u16,
            Register::Y => self.y as u16,
            Register::S => self.sp as u16,
            Register::P => self.status as u16,
        }
    }

    pub fn set_register(&mut self, reg: Register, value: u32) -> Result<()> {
        reg.check(value)?;
        match reg {
            Register::Pc => self.pc = value as u16,
            Register::A => self.a = value as u8,
            Register::X => self.x = value as u8,
            Register::Y => self.y = value as u8,
            Register::S => self.sp = value as u8,
            Register::P => self.status = value as u8,
        }
        Ok(())
    }

    /// Register by case-insensitive name ("pc", "A", ...).
    pub fn reg(&self, name: &str) -> Result<u16> {
        Ok(self.register(name.parse()?))
    }

    pub fn set_reg(&mut self, name: &str, value: u32) -> Result<()> {
        self.set_register(name.parse()?, value)
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.status & flag.mask() != 0
    }

    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        if on {
            self.status |= flag.mask();
        } else {
            self.status &= !flag.mask();
        }
    }

    /// Bus read. Takes `&mut self` because PPU port reads have side effects.
    pub fn mem(&mut self, addr: u16) -> Result<u8> {
        self.bus.read(addr)
    }

    pub fn set_mem(&mut self, addr: u16, value: u8) -> Result<()> {
        self.bus.write(addr, value)
    }

    /// Fetch the byte at PC and advance PC.
    pub fn next_byte(&mut self) -> Result<u8> {
        let byte = self.bus.read(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(byte)
    }

    fn next_word(&mut self) -> Result<u16> {
        let lo = self.next_byte()? as u16;
        let hi = self.next_byte()? as u16;
        Ok((hi << 8) | lo)
    }

    /// Little-endian word whose high byte never leaves the pointer's page.
    /// This is the JMP ($xxFF) bug, and for zero-page pointers it is the $FF→$00 wrap.
    fn read_word_in_page(&mut self, ptr: u16) -> Result<u16> {
        let lo = self.bus.read(ptr)? as u16;
        let hi = self.bus.read((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF))? as u16;
        Ok((hi << 8) | lo)
    }

    fn read_vector(&mut self, vector: u16) -> Result<u16> {
        let lo = self.bus.read(vector)? as u16;
        let hi = self.bus.read(vector.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }

    /// Consume operand bytes and work out what the instruction acts on.
    pub fn resolve_address(&mut self, mode: AddressingMode) -> Result<Operand> {
        let operand = match mode {
            AddressingMode::Implied => Operand::Implied,
            AddressingMode::Immediate => Operand::Immediate(self.next_byte()?),
            AddressingMode::ZeroPage => Operand::Address(self.next_byte()? as u16),
            AddressingMode::ZeroPageX => {
                Operand::Address(self.next_byte()?.wrapping_add(self.x) as u16)
            }
            AddressingMode::ZeroPageY => {
                Operand::Address(self.next_byte()?.wrapping_add(self.y) as u16)
            }
            AddressingMode::Absolute => Operand::Address(self.next_word()?),
            AddressingMode::AbsoluteX => {
                Operand::Address(self.next_word()?.wrapping_add(self.x as u16))
            }
            AddressingMode::AbsoluteY => {
                Operand::Address(self.next_word()?.wrapping_add(self.y as u16))
            }
            AddressingMode::Indirect => {
                let ptr = self.next_word()?;
                Operand::Address(self.read_word_in_page(ptr)?)
            }
            AddressingMode::IndirectX => {
                let ptr = self.next_byte()?.wrapping_add(self.x) as u16;
                Operand::Address(self.read_word_in_page(ptr)?)
            }
            AddressingMode::IndirectY => {
                let ptr = self.next_byte()? as u16;
                let base = self.read_word_in_page(ptr)?;
                Operand::Address(base.wrapping_add(self.y as u16))
            }
            AddressingMode::Relative => {
                let offset = self.next_byte()? as i8;
                Operand::Address(self.pc.wrapping_add(offset as u16))
            }
        };
        Ok(operand)
    }

    pub fn push(&mut self, value: u8) -> Result<()> {
        self.bus.write(STACK_BASE | self.sp as u16, value)?;
        self.sp = self.sp.wrapping_sub(1);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u8> {
        self.sp = self.sp.wrapping_add(1);
        self.bus.read(STACK_BASE | self.sp as u16)
    }

    fn push_pc(&mut self, pc: u16) -> Result<()> {
        self.push((pc >> 8) as u8)?;
        self.push(pc as u8)
    }

    fn pop_pc(&mut self) -> Result<u16> {
        let lo = self.pop()? as u16;
        let hi = self.pop()? as u16;
        Ok((hi << 8) | lo)
    }

    /// Run one whole instruction. The returned snapshot is the state after decode, before
    /// execution, with `pc` pointing at the opcode.
    pub fn execute(&mut self) -> Result<Snapshot> {
        let pc = self.pc;
        let opcode = self.next_byte()?;
        let Instruction { mnemonic, mode } = opcodes::decode(opcode);
        let operand = self.resolve_address(mode)?;

        let snapshot = Snapshot {
            pc,
            a: self.a,
            x: self.x,
            y: self.y,
            p: self.status,
            s: self.sp,
            op: mnemonic,
            address: operand.traced_address(),
        };
        trace!("{snapshot}");

        self.dispatch(mnemonic, mode, operand)?;
        self.steps += 1;
        Ok(snapshot)
    }

    /// RESET or NMI. Pushes PC and P (with B set in the pushed copy), then jumps through the
    /// vector. An NMI the PPU has not armed is dropped.
    pub fn interrupt(&mut self, kind: Interrupt) -> Result<()> {
        if kind == Interrupt::Nmi && !self.bus.poll_nmi() {
            debug!("NMI not armed, ignored");
            return Ok(());
        }

        self.push_pc(self.pc)?;
        self.push(self.status | FLAG_BREAK)?;
        self.pc = self.read_vector(kind.vector())?;

        if kind == Interrupt::Reset {
            info!("{kind}: PC=${:04X}", self.pc);
        }
        Ok(())
    }

    fn dispatch(&mut self, mnemonic: Mnemonic, mode: AddressingMode, operand: Operand) -> Result<()> {
        match mnemonic {
            // Loads and stores
            Mnemonic::Lda => self.a = self.load_operand(operand)?,
            Mnemonic::Ldx => self.x = self.load_operand(operand)?,
            Mnemonic::Ldy => self.y = self.load_operand(operand)?,
            Mnemonic::Sta => self.bus.write(effective_address(operand)?, self.a)?,
            Mnemonic::Stx => self.bus.write(effective_address(operand)?, self.x)?,
            Mnemonic::Sty => self.bus.write(effective_address(operand)?, self.y)?,

            // Transfers
            Mnemonic::Tax => self.x = self.transfer(self.a),
            Mnemonic::Tay => self.y = self.transfer(self.a),
            Mnemonic::Txa => self.a = self.transfer(self.x),
            Mnemonic::Tya => self.a = self.transfer(self.y),
            Mnemonic::Tsx => self.x = self.transfer(self.sp),
            Mnemonic::Txs => self.sp = self.x,

            // Arithmetic and logic
            Mnemonic::Adc => self.adc(operand)?,
            Mnemonic::Sbc => self.sbc(operand)?,
            Mnemonic::And => self.logic(operand, |a, m| a & m)?,
            Mnemonic::Ora => self.logic(operand, |a, m| a | m)?,
            Mnemonic::Eor => self.logic(operand, |a, m| a ^ m)?,
            Mnemonic::Bit => self.bit(operand)?,
            Mnemonic::Cmp => self.compare(self.a, operand)?,
            Mnemonic::Cpx => self.compare(self.x, operand)?,
            Mnemonic::Cpy => self.compare(self.y, operand)?,

            // Shifts and rotates
            Mnemonic::Asl => self.shift(operand, asl)?,
            Mnemonic::Lsr => self.shift(operand, lsr)?,
            Mnemonic::Rol => self.shift(operand, rol)?,
            Mnemonic::Ror => self.shift(operand, ror)?,

            // Increments and decrements
            Mnemonic::Inc => self.step_memory(operand, 1)?,
            Mnemonic::Dec => self.step_memory(operand, 0xFF)?,
            Mnemonic::Inx => self.x = self.transfer(self.x.wrapping_add(1)),
            Mnemonic::Iny => self.y = self.transfer(self.y.wrapping_add(1)),
            Mnemonic::Dex => self.x = self.transfer(self.x.wrapping_sub(1)),
            Mnemonic::Dey => self.y = self.transfer(self.y.wrapping_sub(1)),

            // Branches
            Mnemonic::Bcc => self.branch(!self.flag(Flag::Carry), operand)?,
            Mnemonic::Bcs => self.branch(self.flag(Flag::Carry), operand)?,
            Mnemonic::Bne => self.branch(!self.flag(Flag::Zero), operand)?,
            Mnemonic::Beq => self.branch(self.flag(Flag::Zero), operand)?,
            Mnemonic::Bpl => self.branch(!self.flag(Flag::Negative), operand)?,
            Mnemonic::Bmi => self.branch(self.flag(Flag::Negative), operand)?,
            Mnemonic::Bvc => self.branch(!self.flag(Flag::Overflow), operand)?,
            Mnemonic::Bvs => self.branch(self.flag(Flag::Overflow), operand)?,

            // Jumps, subroutines, stack
            Mnemonic::Jmp => self.pc = effective_address(operand)?,
            Mnemonic::Jsr => self.jsr(operand)?,
            Mnemonic::Rts => self.pc = self.pop_pc()?.wrapping_add(1),
            Mnemonic::Rti => self.rti()?,
            Mnemonic::Brk => self.brk()?,
            Mnemonic::Pha => self.push(self.a)?,
            Mnemonic::Php => self.push(self.status | FLAG_BREAK | FLAG_UNUSED)?,
            Mnemonic::Pla => {
                let value = self.pop()?;
                self.a = self.transfer(value);
            }
            Mnemonic::Plp => {
                let value = self.pop()?;
                self.status = (value & !FLAG_BREAK) | FLAG_UNUSED;
            }

            // Flags
            Mnemonic::Sec => self.set_flag(Flag::Carry, true),
            Mnemonic::Clc => self.set_flag(Flag::Carry, false),
            Mnemonic::Sei => self.set_flag(Flag::InterruptDisable, true),
            Mnemonic::Cli => self.set_flag(Flag::InterruptDisable, false),
            Mnemonic::Sed => self.set_flag(Flag::Decimal, true),
            Mnemonic::Cld => self.set_flag(Flag::Decimal, false),
            Mnemonic::Clv => self.set_flag(Flag::Overflow, false),

            // Operand bytes were already consumed during resolution
            Mnemonic::Nop => {}

            // Undocumented: two canonical operations on one resolved operand
            Mnemonic::Slo => {
                self.shift(operand, asl)?;
                self.logic(operand, |a, m| a | m)?;
            }
            Mnemonic::Rla => {
                self.shift(operand, rol)?;
                self.logic(operand, |a, m| a & m)?;
            }
            Mnemonic::Sre => {
                self.shift(operand, lsr)?;
                self.logic(operand, |a, m| a ^ m)?;
            }
            Mnemonic::Rra => {
                self.shift(operand, ror)?;
                self.adc(operand)?;
            }
            Mnemonic::Dcp => {
                self.step_memory(operand, 0xFF)?;
                self.compare(self.a, operand)?;
            }
            Mnemonic::Isb => {
                self.step_memory(operand, 1)?;
                self.sbc(operand)?;
            }
            Mnemonic::Lax => {
                let value = self.load_operand(operand)?;
                self.a = value;
                self.x = value;
            }
            Mnemonic::Sax => self.bus.write(effective_address(operand)?, self.a & self.x)?,
            Mnemonic::Anc => {
                self.logic(operand, |a, m| a & m)?;
                self.set_flag(Flag::Carry, self.flag(Flag::Negative));
            }
            Mnemonic::Asr => {
                self.logic(operand, |a, m| a & m)?;
                self.shift(Operand::Implied, lsr)?;
            }
            Mnemonic::Arr => self.arr(operand)?,
            Mnemonic::Axs => {
                let value = self.operand_value(operand)?;
                let masked = self.a & self.x;
                self.set_flag(Flag::Carry, masked >= value);
                self.x = self.transfer(masked.wrapping_sub(value));
            }
            Mnemonic::Las => {
                let value = self.operand_value(operand)? & self.sp;
                self.sp = value;
                self.x = value;
                self.a = self.transfer(value);
            }

            Mnemonic::Kil
            | Mnemonic::Xaa
            | Mnemonic::Ahx
            | Mnemonic::Tas
            | Mnemonic::Shx
            | Mnemonic::Shy => {
                return Err(Error::UnsupportedOperation(format!(
                    "{mnemonic} {} before ${:04X}",
                    mode.tag(),
                    self.pc
                )));
            }
        }
        Ok(())
    }

    fn operand_value(&mut self, operand: Operand) -> Result<u8> {
        match operand {
            Operand::Implied => Ok(self.a),
            Operand::Immediate(value) => Ok(value),
            Operand::Address(addr) => self.bus.read(addr),
        }
    }

    fn write_operand(&mut self, operand: Operand, value: u8) -> Result<()> {
        match operand {
            Operand::Implied => {
                self.a = value;
                Ok(())
            }
            Operand::Address(addr) => self.bus.write(addr, value),
            Operand::Immediate(_) => Err(Error::UnsupportedOperation(
                "write to an immediate operand".to_string(),
            )),
        }
    }

    fn load_operand(&mut self, operand: Operand) -> Result<u8> {
        let value = self.operand_value(operand)?;
        self.update_zero_and_negative_flags(value);
        Ok(value)
    }

    fn transfer(&mut self, value: u8) -> u8 {
        self.update_zero_and_negative_flags(value);
        value
    }

    fn adc(&mut self, operand: Operand) -> Result<()> {
        let value = self.operand_value(operand)?;
        let carry_in = self.flag(Flag::Carry) as i16;

        let sum = self.a as i16 + value as i16 + carry_in;
        let signed = self.a as i8 as i16 + value as i8 as i16 + carry_in;

        self.set_flag(Flag::Carry, sum > 0xFF);
        self.set_flag(Flag::Overflow, !(-128..=127).contains(&signed));
        self.a = self.transfer(sum as u8);
        Ok(())
    }

    fn sbc(&mut self, operand: Operand) -> Result<()> {
        let value = self.operand_value(operand)?;
        let borrow = 1 - self.flag(Flag::Carry) as i16;

        let difference = self.a as i16 - value as i16 - borrow;
        let signed = self.a as i8 as i16 - value as i8 as i16 - borrow;

        self.set_flag(Flag::Carry, difference >= 0);
        self.set_flag(Flag::Overflow, !(-128..=127).contains(&signed));
        self.a = self.transfer(difference as u8);
        Ok(())
    }

    fn logic(&mut self, operand: Operand, op: fn(u8, u8) -> u8) -> Result<()> {
        let value = self.operand_value(operand)?;
        self.a = self.transfer(op(self.a, value));
        Ok(())
    }

    fn bit(&mut self, operand: Operand) -> Result<()> {
        let value = self.operand_value(operand)?;
        self.set_flag(Flag::Zero, self.a & value == 0);
        self.set_flag(Flag::Negative, value & 0x80 != 0);
        self.set_flag(Flag::Overflow, value & 0x40 != 0);
        Ok(())
    }

    /// register − value; C means no borrow.
    fn compare(&mut self, register: u8, operand: Operand) -> Result<()> {
        let value = self.operand_value(operand)?;
        let result = register as i16 - value as i16;
        self.set_flag(Flag::Carry, result >= 0);
        self.update_zero_and_negative_flags(result as u8);
        Ok(())
    }

    /// Read-modify-write through `op`, which gets the carry in and returns the carry out.
    /// An implied operand means the accumulator.
    fn shift(&mut self, operand: Operand, op: fn(u8, bool) -> (u8, bool)) -> Result<()> {
        let value = self.operand_value(operand)?;
        let (result, carry) = op(value, self.flag(Flag::Carry));
        self.write_operand(operand, result)?;
        self.set_flag(Flag::Carry, carry);
        self.update_zero_and_negative_flags(result);
        Ok(())
    }

    fn step_memory(&mut self, operand: Operand, delta: u8) -> Result<()> {
        let addr = effective_address(operand)?;
        let value = self.bus.read(addr)?.wrapping_add(delta);
        self.bus.write(addr, value)?;
        self.update_zero_and_negative_flags(value);
        Ok(())
    }

    fn branch(&mut self, condition: bool, operand: Operand) -> Result<()> {
        let addr = effective_address(operand)?;
        if condition {
            self.pc = addr;
        }
        Ok(())
    }

    fn jsr(&mut self, operand: Operand) -> Result<()> {
        let addr = effective_address(operand)?;
        self.push_pc(self.pc.wrapping_sub(1))?;
        self.pc = addr;
        Ok(())
    }

    fn rti(&mut self) -> Result<()> {
        let status = self.pop()?;
        self.status = (status & !FLAG_BREAK) | FLAG_UNUSED;
        self.pc = self.pop_pc()?;
        Ok(())
    }

    /// BRK pushes the PC as it stands after the opcode fetch; no padding byte is skipped.
    fn brk(&mut self) -> Result<()> {
        self.push_pc(self.pc)?;
        self.push(self.status | FLAG_BREAK | FLAG_UNUSED)?;
        self.set_flag(Flag::InterruptDisable, true);
        self.pc = self.read_vector(IRQ_VECTOR)?;
        Ok(())
    }

    fn arr(&mut self, operand: Operand) -> Result<()> {
        self.logic(operand, |a, m| a & m)?;
        self.shift(Operand::Implied, ror)?;
        let bit6 = self.a & 0x40 != 0;
        let bit5 = self.a & 0x20 != 0;
        self.set_flag(Flag::Carry, bit6);
        self.set_flag(Flag::Overflow, bit6 ^ bit5);
        Ok(())
    }

    fn update_zero_and_negative_flags(&mut self, value: u8) {
        self.set_flag(Flag::Zero, value == 0);
        self.set_flag(Flag::Negative, value & 0x80 != 0);
    }
}

/// The operand as a memory reference; immediates and implied operands have none.
fn effective_address(operand: Operand) -> Result<u16> {
    match operand {
        Operand::Address(addr) => Ok(addr),
        other => Err(Error::UnsupportedOperation(format!(
            "{other:?} has no effective address"
        ))),
    }
}

fn asl(value: u8, _carry: bool) -> (u8, bool) {
    (value << 1, value & 0x80 != 0)
}

fn lsr(value: u8, _carry: bool) -> (u8, bool) {
    (value >> 1, value & 0x01 != 0)
}

fn rol(value: u8, carry: bool) -> (u8, bool) {
    ((value << 1) | carry as u8, value & 0x80 != 0)
}

fn ror(value: u8, carry: bool) -> (u8, bool) {
    ((value >> 1) | ((carry as u8) << 7), value & 0x01 != 0)
}

impl CPU<NesBus> {
    /// Install PRG and CHR images; CHR goes to the PPU pattern tables.
    pub fn load(&mut self, prg: &[u8], chr: &[u8]) -> Result<()> {
        self.bus.load(prg, chr)
    }

    /// Render the background into a caller-owned 256×240 surface, then enter vblank.
    pub fn draw(&mut self, surface: &mut [u32]) {
        self.bus.ppu.render(surface);
        self.bus.ppu.enter_vblank();
    }

    pub fn color_at(&self, x: usize, y: usize) -> Rgba {
        self.bus.ppu.color_at(x, y)
    }
}

impl Default for CPU<NesBus> {
    fn default() -> Self {
        Self::new(NesBus::new())
    }
}
