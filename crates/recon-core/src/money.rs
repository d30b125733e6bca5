//! Fixed-point monetary arithmetic and table-driven FX conversion.
//!
//! Amounts never touch floating point. A [`Money`] is a whole count of
//! cents (2 fractional digits), the same representation the matching
//! engine uses internally for every tolerance comparison.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A monetary amount, stored as whole cents. Never negative in this
/// domain (transactions, settlements, and adjustments are all `>= 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a decimal string like `"1000.00"` into whole cents.
    pub fn from_str_decimal(s: &str) -> Option<Self> {
        let s = s.trim();
        let (sign, s) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let mut parts = s.splitn(2, '.');
        let whole = parts.next()?;
        let frac = parts.next().unwrap_or("0");
        let whole: i64 = whole.parse().ok()?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().ok()? * 10,
            _ => frac[..2].parse().ok()?,
        };
        Some(Money(sign * (whole * 100 + frac_cents)))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn abs(&self) -> Money {
        Money(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `|self - other| / baseline <= tolerance_percent / 100`, with the
    /// degenerate zero-handling from the amount-tolerance checks in
    /// phases 2-4: both zero is a perfect match, baseline zero with a
    /// nonzero comparand is never within tolerance.
    pub fn within_tolerance(&self, other: Money, baseline: Money, tolerance_percent: f64) -> bool {
        let diff = (self.0 - other.0).abs();
        if baseline.0 == 0 {
            return diff == 0;
        }
        // diff/baseline <= tolerance_percent/100  <=>  diff*100 <= baseline*tolerance_percent
        (diff as f64) * 100.0 <= (baseline.0 as f64) * tolerance_percent
    }

    pub fn diff(&self, other: Money) -> Money {
        Money((self.0 - other.0).abs())
    }

    /// Fraction of `diff(other)` over `baseline`, as a percent (0.0-based
    /// when baseline is zero and both are equal, otherwise the true ratio).
    pub fn diff_percent(&self, other: Money, baseline: Money) -> f64 {
        if baseline.0 == 0 {
            return if self.0 == other.0 { 0.0 } else { f64::INFINITY };
        }
        (self.diff(other).0 as f64) / (baseline.0 as f64) * 100.0
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Static USD conversion table. Unknown currency codes default to 1.0
/// rather than failing the conversion.
const FX_TO_USD: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("MXN", 0.058),
    ("COP", 0.00025),
    ("BRL", 0.20),
    ("EUR", 1.08),
    ("GBP", 1.27),
    ("CAD", 0.73),
];

fn fx_rate(currency: &str) -> f64 {
    FX_TO_USD
        .iter()
        .find(|(code, _)| *code == currency)
        .map(|(_, rate)| *rate)
        .unwrap_or(1.0)
}

/// `amount * FX_TO_USD[currency]`.
pub fn to_usd(amount: Money, currency: &str) -> f64 {
    amount.0 as f64 / 100.0 * fx_rate(currency)
}

/// Converts `amount` from `currency` `from` to `currency` `to`, pivoting
/// through USD. Short-circuits when `from == to`. When the target rate is
/// zero, returns the USD value unchanged (documented degenerate case).
pub fn convert(amount: Money, from: &str, to: &str) -> Money {
    if from == to {
        return amount;
    }
    let usd = to_usd(amount, from);
    let to_rate = fx_rate(to);
    let converted = if to_rate == 0.0 { usd } else { usd / to_rate };
    Money((converted * 100.0).round() as i64)
}
