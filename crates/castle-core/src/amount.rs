//! # Amount — Fixed-Point Virtual Funds
//!
//! Balances, prices and escrowed sums are [`Amount`] values: non-negative
//! integers counting micro-units (six fractional digits). Addition and
//! subtraction are checked, so a balance can never wrap or go negative.
//!
//! ## Wire Format
//!
//! The persisted document stores amounts as JSON numbers. Whole amounts are
//! written as integers (`100`), fractional amounts as decimals (`12.5`).
//! Reading accepts integers, decimals and decimal strings; decimals are
//! rounded to the nearest micro-unit.
//!
//! Amounts are capped at [`Amount::MAX`] (2^52 - 1 micro-units). Below that
//! bound the decimal written for a fractional amount decodes back to the
//! same micro-unit count, so a flushed document always holds exactly the
//! committed balances.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Number of fractional decimal digits carried by an [`Amount`].
pub const SCALE: u32 = 6;

const UNIT: u64 = 10u64.pow(SCALE);

const MAX_MICROS: u64 = (1 << 52) - 1;

/// A non-negative quantity of virtual funds with micro-unit precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// The largest representable amount.
    pub const MAX: Amount = Amount(MAX_MICROS);

    /// Construct from a raw micro-unit count, or `None` above [`Amount::MAX`].
    pub const fn from_micros(micros: u64) -> Option<Self> {
        if micros > MAX_MICROS {
            None
        } else {
            Some(Self(micros))
        }
    }

    /// Construct a whole amount (no fractional part).
    ///
    /// Every `u32` unit count fits below [`Amount::MAX`].
    pub const fn whole(units: u32) -> Self {
        Self(units as u64 * UNIT)
    }

    /// The raw micro-unit count.
    pub const fn micros(&self) -> u64 {
        self.0
    }

    /// Whether this amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self + other`, or `None` above [`Amount::MAX`].
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).and_then(Amount::from_micros)
    }

    /// `self - other`, or `None` if the result would be negative.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Parse a human-entered decimal such as `"150"`, `"12.50"` or `"12,5"`.
    ///
    /// A comma is accepted as the decimal separator. Signs, currency symbols,
    /// thousands separators and more than six fractional digits are rejected
    /// rather than silently dropped.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let reject = |reason: &str| CoreError::MalformedAmount {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let text = input.trim().replace(',', ".");
        if text.is_empty() {
            return Err(reject("empty"));
        }
        if text.starts_with('-') {
            return Err(reject("amount must not be negative"));
        }

        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text.as_str(), ""),
        };
        if whole.is_empty() || (text.contains('.') && frac.is_empty()) {
            return Err(reject("expected digits on both sides of the decimal separator"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(reject("only digits and one decimal separator are allowed"));
        }
        if frac.len() > SCALE as usize {
            return Err(reject("at most 6 fractional digits are allowed"));
        }

        let whole: u64 = whole.parse().map_err(|_| reject("amount is too large"))?;
        let mut frac_micros: u64 = 0;
        for (i, digit) in frac.bytes().enumerate() {
            frac_micros += u64::from(digit - b'0') * 10u64.pow(SCALE - 1 - i as u32);
        }

        whole
            .checked_mul(UNIT)
            .and_then(|w| w.checked_add(frac_micros))
            .and_then(Amount::from_micros)
            .ok_or_else(|| reject("amount is too large"))
    }

    /// Convert from a binary float, rounding to the nearest micro-unit.
    ///
    /// The float is scaled with integer arithmetic, so the only rounding
    /// is the final one to a whole micro-unit.
    pub fn from_f64(value: f64) -> Result<Self, CoreError> {
        let reject = |reason: &str| CoreError::MalformedAmount {
            input: value.to_string(),
            reason: reason.to_string(),
        };
        if !value.is_finite() {
            return Err(reject("amount must be finite"));
        }
        if value < 0.0 {
            return Err(reject("amount must not be negative"));
        }
        scaled_micros(value)
            .and_then(Amount::from_micros)
            .ok_or_else(|| reject("amount is too large"))
    }

    fn whole_part(&self) -> u64 {
        self.0 / UNIT
    }

    fn frac_part(&self) -> u64 {
        self.0 % UNIT
    }
}

/// `round(value * UNIT)` for a finite non-negative float, computed exactly.
fn scaled_micros(value: f64) -> Option<u64> {
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mantissa, exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };

    // mantissa < 2^53 and UNIT < 2^20
    let scaled = u128::from(mantissa) * u128::from(UNIT);
    let micros = if exponent >= 0 {
        if exponent > 54 {
            return None;
        }
        scaled << exponent
    } else {
        let shift = exponent.unsigned_abs();
        if shift >= 128 {
            0
        } else {
            let truncated = scaled >> shift;
            let remainder = scaled - (truncated << shift);
            if remainder >= 1u128 << (shift - 1) {
                truncated + 1
            } else {
                truncated
            }
        }
    };
    u64::try_from(micros).ok()
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let frac = self.frac_part();
        if frac == 0 {
            return write!(f, "{}", self.whole_part());
        }
        let digits = format!("{frac:06}");
        write!(f, "{}.{}", self.whole_part(), digits.trim_end_matches('0'))
    }
}

impl std::str::FromStr for Amount {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.frac_part() == 0 {
            serializer.serialize_u64(self.whole_part())
        } else {
            serializer.serialize_f64(self.0 as f64 / UNIT as f64)
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a non-negative number or decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        v.checked_mul(UNIT)
            .and_then(Amount::from_micros)
            .ok_or_else(|| E::custom(format!("amount {v} is too large")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        let v = u64::try_from(v).map_err(|_| E::custom(format!("amount {v} is negative")))?;
        self.visit_u64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::from_f64(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse(v).map_err(E::custom)
    }
}
