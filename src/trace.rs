//! Per-step CPU snapshots and golden-trace comparison.
//!
//! A golden trace is a JSON array of snapshot objects recorded from a reference emulator, e.g.
//! `{"PC": 49152, "op": "JMP", "address": 50677, "A": 0, "X": 0, "Y": 0, "S": 253, "P": 36}`.
//! `address` is the operand byte for immediates and `-1` for implied instructions.

use std::fmt;
use std::fs;
use std::path::Path;

use ansi_term::Colour::{Green, Red};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cpu::opcodes::Mnemonic;
use crate::error::{Error, Result};

/// Length of the documented part of the nestest golden log.
pub const NESTEST_END_SENTINEL: usize = 8991;

const FLAG_LEGEND: &str = "NVss DIZC";
const LINE_PREFIX_LEN: usize = "expect: ".len();

/// CPU state after decode, before execution. `pc` is the opcode's own address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "PC")]
    pub pc: u16,
    pub op: Mnemonic,
    #[serde(with = "address_sentinel")]
    pub address: Option<u16>,
    #[serde(rename = "A")]
    pub a: u8,
    #[serde(rename = "X")]
    pub x: u8,
    #[serde(rename = "Y")]
    pub y: u8,
    #[serde(rename = "S")]
    pub s: u8,
    #[serde(rename = "P")]
    pub p: u8,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X} {} ", self.pc, self.op)?;
        match self.address {
            Some(addr) => write!(f, "{addr:04X} ")?,
            None => f.write_str("---- ")?,
        }
        write!(
            f,
            "A:{:02X} X:{:02X} Y:{:02X} S:{:02X} P:{:04b} {:04b}",
            self.a,
            self.x,
            self.y,
            self.s,
            self.p >> 4,
            self.p & 0x0F
        )
    }
}

/// `None` travels as `-1`.
mod address_sentinel {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(address: &Option<u16>, serializer: S) -> Result<S::Ok, S::Error> {
        match address {
            Some(addr) => serializer.serialize_u16(*addr),
            None => serializer.serialize_i32(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
        match i32::deserialize(deserializer)? {
            -1 => Ok(None),
            value => u16::try_from(value)
                .map(Some)
                .map_err(|_| D::Error::custom(format!("address {value} out of range"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOutcome {
    Matched,
    /// The end sentinel was reached; nothing was compared.
    AllMatched,
}

/// Walks a golden trace one entry per executed instruction.
pub struct TraceDiffer {
    entries: Vec<Map<String, Value>>,
    cursor: usize,
    end: usize,
}

impl TraceDiffer {
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::parse(&json)
    }

    pub fn parse(json: &str) -> Result<Self> {
        let entries: Vec<Map<String, Value>> = serde_json::from_str(json)?;
        let end = entries.len();
        Ok(Self {
            entries,
            cursor: 0,
            end,
        })
    }

    /// Stop comparing after `end` entries.
    pub fn with_end(mut self, end: usize) -> Self {
        self.end = end;
        self
    }

    /// Entries compared so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Compare the next golden entry against `snapshot`. Only keys present in the entry count.
    /// A mismatch is an [`Error::Trace`] carrying a printable diff.
    pub fn diff(&mut self, snapshot: &Snapshot) -> Result<DiffOutcome> {
        if self.cursor >= self.end {
            return Ok(DiffOutcome::AllMatched);
        }
        let expected = self
            .entries
            .get(self.cursor)
            .ok_or_else(|| Error::Trace(format!("golden trace ends after {} entries", self.cursor)))?;
        self.cursor += 1;

        let result = serde_json::to_value(snapshot)?;
        if expected.iter().all(|(key, value)| result.get(key) == Some(value)) {
            return Ok(DiffOutcome::Matched);
        }

        let mut merged = result;
        if let Value::Object(fields) = &mut merged {
            fields.extend(expected.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        let expected: Snapshot = serde_json::from_value(merged)?;
        Err(Error::Trace(diff_message(self.cursor, &expected, snapshot)))
    }
}

/// Header with the flag legend over the P bits, then expected, result, and a caret line.
fn diff_message(line: usize, expected: &Snapshot, result: &Snapshot) -> String {
    let expect = expected.to_string();
    let got = result.to_string();
    let marks: String = expect
        .chars()
        .zip(got.chars())
        .map(|(e, r)| if e == r { ' ' } else { '^' })
        .collect();

    let indent = LINE_PREFIX_LEN;
    let legend_column = indent + expect.find("P:").map_or(0, |i| i + 2);
    let header = format!("line {line}");

    format!(
        "{header:<legend_column$}{FLAG_LEGEND}\n{}\n{}\n{:indent$}{}",
        Green.paint(format!("expect: {expect}")),
        Red.paint(format!("result: {got}")),
        "",
        Red.bold().paint(marks)
    )
}
