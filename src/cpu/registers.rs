//! Register names for the string-keyed accessors.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Pc,
    A,
    X,
    Y,
    S,
    P,
}

impl Register {
    pub const ALL: [Register; 6] = [
        Register::Pc,
        Register::A,
        Register::X,
        Register::Y,
        Register::S,
        Register::P,
    ];

    /// Width in bits: 16 for PC, 8 for everything else.
    pub const fn bits(self) -> u32 {
        match self {
            Register::Pc => 16,
            _ => 8,
        }
    }

    pub const fn max(self) -> u32 {
        (1 << self.bits()) - 1
    }

    pub const fn name(self) -> &'static str {
        match self {
            Register::Pc => "PC",
            Register::A => "A",
            Register::X => "X",
            Register::Y => "Y",
            Register::S => "S",
            Register::P => "P",
        }
    }

    /// Reject `value` if it is wider than the register.
    pub fn check(self, value: u32) -> Result<()> {
        if value > self.max() {
            return Err(Error::Range {
                name: self.name(),
                value,
                bits: self.bits(),
            });
        }
        Ok(())
    }
}

impl FromStr for Register {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Register::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::RegisterName(s.to_string()))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
