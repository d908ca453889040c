//! Numeric handling of Kubernetes resource quantities
//!
//! `k8s_openapi` models a quantity as an opaque string, but the API server
//! canonicalizes what it stores ("4000m" comes back as "4", "4096Mi" as
//! "4Gi"). Comparing the strings would report drift that does not exist, so
//! quantities are parsed into an exact integer amount before comparison.
//!
//! Amounts are held as nano-units in an `i128`, which covers every suffix up
//! to `Ei` without loss. Fractions smaller than one nano-unit round up, the
//! same way the API server rounds them.

use std::fmt;
use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use thiserror::Error;

const NANO_EXPONENT: i32 = 9;
const MAX_EXPONENT: i32 = 64;

/// Why a quantity string could not be parsed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("invalid number in quantity '{0}'")]
    InvalidNumber(String),

    #[error("unknown suffix in quantity '{0}'")]
    UnknownSuffix(String),

    #[error("quantity '{0}' is out of range")]
    Overflow(String),
}

/// An exact resource amount in nano-units
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParsedQuantity {
    nanos: i128,
}

impl ParsedQuantity {
    pub fn from_nanos(nanos: i128) -> Self {
        Self { nanos }
    }

    pub fn as_nanos(&self) -> i128 {
        self.nanos
    }

    pub fn is_negative(&self) -> bool {
        self.nanos < 0
    }
}

impl fmt::Display for ParsedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}n", self.nanos)
    }
}

impl FromStr for ParsedQuantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_quantity(s)
    }
}

impl TryFrom<&Quantity> for ParsedQuantity {
    type Error = QuantityError;

    fn try_from(q: &Quantity) -> Result<Self, Self::Error> {
        parse_quantity(&q.0)
    }
}

/// Parse a quantity string such as `500m`, `4Gi`, `1.5` or `1e3`.
pub fn parse_quantity(input: &str) -> Result<ParsedQuantity, QuantityError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(QuantityError::Empty);
    }

    let (negative, rest) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let split = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let (number, suffix) = rest.split_at(split);

    let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
    if (int_part.is_empty() && frac_part.is_empty()) || frac_part.contains('.') {
        return Err(QuantityError::InvalidNumber(input.to_string()));
    }

    let overflow = || QuantityError::Overflow(input.to_string());

    let mut digits: i128 = 0;
    for c in int_part.bytes().chain(frac_part.bytes()) {
        digits = digits
            .checked_mul(10)
            .and_then(|d| d.checked_add(i128::from(c - b'0')))
            .ok_or_else(overflow)?;
    }

    let (binary_power, decimal_exponent) = suffix_scale(suffix, input)?;

    let mut value = 1024i128
        .checked_pow(binary_power)
        .and_then(|m| digits.checked_mul(m))
        .ok_or_else(overflow)?;

    let frac_len = i32::try_from(frac_part.len()).map_err(|_| overflow())?;
    let exponent = decimal_exponent - frac_len + NANO_EXPONENT;
    if exponent >= 0 {
        value = 10i128
            .checked_pow(exponent.unsigned_abs())
            .and_then(|m| value.checked_mul(m))
            .ok_or_else(overflow)?;
    } else {
        value = match 10i128.checked_pow(exponent.unsigned_abs()) {
            Some(divisor) => ceil_div(value, divisor),
            None if value == 0 => 0,
            None => 1,
        };
    }

    Ok(ParsedQuantity::from_nanos(if negative { -value } else { value }))
}

/// Compare two quantities by amount.
///
/// Falls back to string equality when either side does not parse, so a
/// malformed value is only "equal" to itself.
pub fn quantities_equal(a: &Quantity, b: &Quantity) -> bool {
    match (ParsedQuantity::try_from(a), ParsedQuantity::try_from(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => a.0 == b.0,
    }
}

/// Returns `(power of 1024, power of 10)` for a suffix.
fn suffix_scale(suffix: &str, input: &str) -> Result<(u32, i32), QuantityError> {
    let scale = match suffix {
        "" => (0, 0),
        "n" => (0, -9),
        "u" => (0, -6),
        "m" => (0, -3),
        "k" => (0, 3),
        "M" => (0, 6),
        "G" => (0, 9),
        "T" => (0, 12),
        "P" => (0, 15),
        "E" => (0, 18),
        "Ki" => (1, 0),
        "Mi" => (2, 0),
        "Gi" => (3, 0),
        "Ti" => (4, 0),
        "Pi" => (5, 0),
        "Ei" => (6, 0),
        other => {
            let exponent = other
                .strip_prefix('e')
                .or_else(|| other.strip_prefix('E'))
                .and_then(|e| e.parse::<i32>().ok())
                .ok_or_else(|| QuantityError::UnknownSuffix(input.to_string()))?;
            if exponent.abs() > MAX_EXPONENT {
                return Err(QuantityError::Overflow(input.to_string()));
            }
            (0, exponent)
        }
    };
    Ok(scale)
}

fn ceil_div(value: i128, divisor: i128) -> i128 {
    let quotient = value / divisor;
    if value % divisor == 0 {
        quotient
    } else {
        quotient + 1
    }
}
