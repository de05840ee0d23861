//! RK packed-number codec.
//!
//! RK encoding (4 bytes):
//! - Bit 0: if 1, the decoded number is scaled by 1/100
//! - Bit 1: if 1, bits 2..31 are a signed 30-bit integer;
//!          if 0, bits 2..31 are the upper 30 bits of an IEEE 754 double
//!          (the lower 34 bits of the double are zero)

use std::fmt;

use crate::error::{XlsError, XlsResult};

/// A decoded RK value. Integers stay integers unless scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RkValue {
    Int(i64),
    Float(f64),
}

impl RkValue {
    /// The value as a float, promoting integers.
    pub fn to_f64(self) -> f64 {
        match self {
            RkValue::Int(i) => i as f64,
            RkValue::Float(f) => f,
        }
    }
}

impl fmt::Display for RkValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RkValue::Int(i) => write!(f, "{i}"),
            RkValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// A raw 4-byte RK value as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rk(pub u32);

impl Rk {
    /// Decode into an integer or float.
    #[inline]
    pub fn value(self) -> RkValue {
        let scaled = self.0 & 0x01 != 0;
        let is_integer = self.0 & 0x02 != 0;
        let raw = (self.0 as i32) >> 2;

        if !is_integer {
            let bits = ((raw as u32) as u64) << 34;
            let v = f64::from_bits(bits);
            return RkValue::Float(if scaled { v * 0.01 } else { v });
        }

        if scaled {
            RkValue::Float(raw as f64 * 0.01)
        } else {
            RkValue::Int(raw as i64)
        }
    }

    /// The value as a float; integers are rejected.
    pub fn as_float(self) -> XlsResult<f64> {
        match self.value() {
            RkValue::Float(f) => Ok(f),
            RkValue::Int(_) => Err(XlsError::IsIntegerNotFloat),
        }
    }
}

impl fmt::Display for Rk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt(f)
    }
}
