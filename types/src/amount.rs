//! Decimal amounts for balances, fees, nonces and transferred values.
//!
//! Ledgers report amounts as integers in their smallest unit ("raw"). The
//! engine converts them into human-readable decimals by shifting the scale,
//! never by going through floating point. The mantissa is unbounded, so an
//! 18-decimal token with a huge supply scales the same way as an 8-decimal
//! coin.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use crate::TypesError;

/// An arbitrary-precision decimal: `digits * 10^-scale`.
///
/// Always kept normalised (no trailing fractional zeros), so derived
/// equality and hashing compare values rather than representations.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct DecimalValue {
    digits: BigInt,
    scale: u32,
}

fn ten_pow(exp: u32) -> BigInt {
    BigInt::from(10u8).pow(exp)
}

impl DecimalValue {
    pub const ZERO: Self = Self {
        digits: BigInt::ZERO,
        scale: 0,
    };

    fn normalized(mut digits: BigInt, mut scale: u32) -> Self {
        if digits.is_zero() {
            return Self::ZERO;
        }
        let ten = BigInt::from(10u8);
        while scale > 0 && (&digits % &ten).is_zero() {
            digits /= &ten;
            scale -= 1;
        }
        Self { digits, scale }
    }

    /// Both mantissas at the larger of the two scales.
    fn aligned(&self, other: &Self) -> (BigInt, BigInt, u32) {
        let scale = self.scale.max(other.scale);
        let lhs = &self.digits * ten_pow(scale - self.scale);
        let rhs = &other.digits * ten_pow(scale - other.scale);
        (lhs, rhs, scale)
    }

    /// Scale a ledger-native integer down to its human-readable value.
    ///
    /// `from_raw(150_000_000, 8)` is `1.5`.
    pub fn from_raw(raw: u128, decimals: u32) -> Result<Self, TypesError> {
        Ok(Self::from_raw_big(BigUint::from(raw), decimals))
    }

    pub fn from_raw_big(raw: BigUint, decimals: u32) -> Self {
        Self::normalized(BigInt::from_biguint(Sign::Plus, raw), decimals)
    }

    /// Same as [`DecimalValue::from_raw`] for amounts the ledger sends as
    /// strings. Any number of digits is accepted.
    pub fn from_raw_str(raw: &str, decimals: u32) -> Result<Self, TypesError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::ZERO);
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypesError::InvalidAmount(format!(
                "{trimmed}: not an unsigned integer"
            )));
        }
        let raw = BigUint::parse_bytes(trimmed.as_bytes(), 10)
            .ok_or_else(|| TypesError::InvalidAmount(trimmed.to_string()))?;
        Ok(Self::from_raw_big(raw, decimals))
    }

    /// Scale a human-readable value back up to the ledger-native integer.
    ///
    /// Fails rather than rounding when the value has more fractional digits
    /// than `decimals`, or when it is negative.
    pub fn to_raw_big(&self, decimals: u32) -> Result<BigUint, TypesError> {
        if self.is_negative() {
            return Err(TypesError::InvalidAmount(format!("negative amount {self}")));
        }
        if self.scale > decimals {
            return Err(TypesError::PrecisionLoss {
                value: self.to_string(),
                decimals,
            });
        }
        let scaled = &self.digits * ten_pow(decimals - self.scale);
        Ok(scaled.magnitude().clone())
    }

    /// [`DecimalValue::to_raw_big`] narrowed to `u128`.
    pub fn to_raw(&self, decimals: u32) -> Result<u128, TypesError> {
        self.to_raw_big(decimals)?
            .to_u128()
            .ok_or(TypesError::AmountOverflow)
    }

    /// [`DecimalValue::to_raw_big`] rendered the way ledgers send amounts.
    pub fn to_raw_string(&self, decimals: u32) -> Result<String, TypesError> {
        Ok(self.to_raw_big(decimals)?.to_str_radix(10))
    }

    /// Number of fractional digits in the normalised value.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.digits.is_negative()
    }
}

impl Ord for DecimalValue {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs, _) = self.aligned(other);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for DecimalValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for DecimalValue {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let (lhs, rhs, scale) = self.aligned(&rhs);
        Self::normalized(lhs + rhs, scale)
    }
}

impl Sub for DecimalValue {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let (lhs, rhs, scale) = self.aligned(&rhs);
        Self::normalized(lhs - rhs, scale)
    }
}

impl Sub<&DecimalValue> for DecimalValue {
    type Output = Self;
    fn sub(self, rhs: &DecimalValue) -> Self {
        let (lhs, rhs, scale) = self.aligned(rhs);
        Self::normalized(lhs - rhs, scale)
    }
}

impl Mul for DecimalValue {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::normalized(self.digits * rhs.digits, self.scale + rhs.scale)
    }
}

impl Neg for DecimalValue {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            digits: -self.digits,
            scale: self.scale,
        }
    }
}

impl Sum for DecimalValue {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, v| acc + v)
    }
}

impl From<u64> for DecimalValue {
    fn from(value: u64) -> Self {
        Self::normalized(BigInt::from(value), 0)
    }
}

impl From<u128> for DecimalValue {
    fn from(value: u128) -> Self {
        Self::normalized(BigInt::from(value), 0)
    }
}

impl FromStr for DecimalValue {
    type Err = TypesError;

    /// Plain decimal notation: optional sign, digits, optional fraction.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypesError::InvalidAmount(s.to_string());
        let text = s.trim();
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        let joined = format!("{int_part}{frac_part}");
        let magnitude = BigUint::parse_bytes(joined.as_bytes(), 10).ok_or_else(invalid)?;
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        let scale = u32::try_from(frac_part.len()).map_err(|_| invalid())?;
        Ok(Self::normalized(BigInt::from_biguint(sign, magnitude), scale))
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.digits.magnitude().to_str_radix(10);
        let sign = if self.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

impl fmt::Debug for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecimalValue({self})")
    }
}

impl Serialize for DecimalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = DecimalValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(DecimalValue::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(DecimalValue::normalized(BigInt::from(v), 0))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        v.to_string().parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for DecimalValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}
