//! Typed sub-operations for the `BITFIELD` command.
//!
//! A bitfield treats a string value as an array of fixed-width integers.
//! Each [`BitFieldOp`] names an integer encoding ([`BitFieldType`]), a
//! position ([`BitOffset`]) and what to do there.

use std::fmt;
use std::str::FromStr;

use crate::core::command::Cmd;
use crate::{Error, Result};

/// Integer encoding of a bitfield slot: signedness plus width in bits.
///
/// Signed fields are 1 to 64 bits wide, unsigned fields 1 to 63 bits.
/// Parses from the server notation, e.g. `"i5"` or `"u8"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitFieldType {
    signed: bool,
    bits: u8,
}

impl BitFieldType {
    /// A signed integer of `bits` width.
    pub fn signed(bits: u8) -> Result<Self> {
        Self::checked(true, bits)
    }

    /// An unsigned integer of `bits` width.
    pub fn unsigned(bits: u8) -> Result<Self> {
        Self::checked(false, bits)
    }

    fn checked(signed: bool, bits: u8) -> Result<Self> {
        let max = if signed { 64 } else { 63 };
        if bits == 0 || bits > max {
            return Err(Error::InvalidArgument {
                message: format!(
                    "{} bitfield width must be between 1 and {max}, got {bits}",
                    if signed { "signed" } else { "unsigned" }
                ),
            });
        }
        Ok(Self { signed, bits })
    }

    /// Whether the field is two's-complement signed.
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Width in bits.
    pub fn bits(&self) -> u8 {
        self.bits
    }
}

impl fmt::Display for BitFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.signed { 'i' } else { 'u' };
        write!(f, "{prefix}{}", self.bits)
    }
}

impl FromStr for BitFieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidArgument {
            message: format!("invalid bitfield type {s:?}, expected e.g. \"i8\" or \"u16\""),
        };
        let (signed, width) = match s.as_bytes().first() {
            Some(b'i') => (true, &s[1..]),
            Some(b'u') => (false, &s[1..]),
            _ => return Err(invalid()),
        };
        let bits = width.parse::<u8>().map_err(|_| invalid())?;
        Self::checked(signed, bits)
    }
}

/// Where a bitfield slot starts.
///
/// Parses from `"100"` (absolute bit offset) or `"#2"` (the third slot of
/// the field's own width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitOffset {
    /// Absolute offset in bits from the start of the string.
    Bit(u64),
    /// Offset counted in multiples of the field width.
    Field(u64),
}

impl fmt::Display for BitOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitOffset::Bit(n) => write!(f, "{n}"),
            BitOffset::Field(n) => write!(f, "#{n}"),
        }
    }
}

impl FromStr for BitOffset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (field, digits) = match s.strip_prefix('#') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let n = digits.parse::<u64>().map_err(|_| Error::InvalidArgument {
            message: format!("invalid bitfield offset {s:?}"),
        })?;
        Ok(if field {
            BitOffset::Field(n)
        } else {
            BitOffset::Bit(n)
        })
    }
}

/// Behaviour of `SET`/`INCRBY` when a value does not fit its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    /// Wrap around modulo the field range.
    #[default]
    Wrap,
    /// Saturate at the field's minimum or maximum.
    Sat,
    /// Leave the field untouched and reply nil for that sub-operation.
    Fail,
}

impl Overflow {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Overflow::Wrap => "WRAP",
            Overflow::Sat => "SAT",
            Overflow::Fail => "FAIL",
        }
    }
}

/// One sub-operation of a `BITFIELD` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitFieldOp {
    /// Read the field.
    Get {
        /// Field encoding.
        ty: BitFieldType,
        /// Field position.
        offset: BitOffset,
    },
    /// Overwrite the field, replying with its previous value.
    Set {
        /// Field encoding.
        ty: BitFieldType,
        /// Field position.
        offset: BitOffset,
        /// New value.
        value: i64,
    },
    /// Add to the field, replying with its new value.
    IncrBy {
        /// Field encoding.
        ty: BitFieldType,
        /// Field position.
        offset: BitOffset,
        /// Amount to add, may be negative.
        increment: i64,
    },
}

impl BitFieldOp {
    /// True for sub-operations affected by `OVERFLOW`.
    pub fn is_write(&self) -> bool {
        !matches!(self, BitFieldOp::Get { .. })
    }

    pub(crate) fn write_args(&self, cmd: Cmd) -> Cmd {
        match *self {
            BitFieldOp::Get { ty, offset } => cmd
                .arg("GET")
                .arg(ty.to_string())
                .arg(offset.to_string()),
            BitFieldOp::Set { ty, offset, value } => cmd
                .arg("SET")
                .arg(ty.to_string())
                .arg(offset.to_string())
                .arg(value.to_string()),
            BitFieldOp::IncrBy {
                ty,
                offset,
                increment,
            } => cmd
                .arg("INCRBY")
                .arg(ty.to_string())
                .arg(offset.to_string())
                .arg(increment.to_string()),
        }
    }
}
