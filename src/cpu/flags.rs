//! 6502 processor status register (P) flag bits.

pub const FLAG_CARRY: u8 = 1 << 0;
pub const FLAG_ZERO: u8 = 1 << 1;
pub const FLAG_INTERRUPT_DISABLE: u8 = 1 << 2;
pub const FLAG_DECIMAL: u8 = 1 << 3;  // Settable, but arithmetic stays binary
pub const FLAG_BREAK: u8 = 1 << 4;    // Only meaningful in pushed copies of P
pub const FLAG_UNUSED: u8 = 1 << 5;   // Reads back as 1 after PLP/RTI
pub const FLAG_OVERFLOW: u8 = 1 << 6;
pub const FLAG_NEGATIVE: u8 = 1 << 7;

/// A named bit of P.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Negative,
    Overflow,
    Break,
    Decimal,
    InterruptDisable,
    Zero,
    Carry,
}

impl Flag {
    /// All flags in NV-BDIZC display order.
    pub const ALL: [Flag; 7] = [
        Flag::Negative,
        Flag::Overflow,
        Flag::Break,
        Flag::Decimal,
        Flag::InterruptDisable,
        Flag::Zero,
        Flag::Carry,
    ];

    pub const fn mask(self) -> u8 {
        match self {
            Flag::Negative => FLAG_NEGATIVE,
            Flag::Overflow => FLAG_OVERFLOW,
            Flag::Break => FLAG_BREAK,
            Flag::Decimal => FLAG_DECIMAL,
            Flag::InterruptDisable => FLAG_INTERRUPT_DISABLE,
            Flag::Zero => FLAG_ZERO,
            Flag::Carry => FLAG_CARRY,
        }
    }
}
