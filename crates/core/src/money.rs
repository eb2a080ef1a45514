//! Fixed-point currency amounts (two fractional digits).

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Signed currency amount held in minor units (cents).
///
/// Crosses serialization boundaries as a decimal string with exactly two fractional
/// digits (`"300.00"`). Deserialization also accepts JSON numbers, rounded to cents.
/// Parsed amounts are bounded to 15 significant digits (13 integer, 2 fractional), so
/// sums of parsed amounts stay far inside `i64`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest magnitude accepted from outside: 9 999 999 999 999.99.
    pub const MAX: Money = Money(999_999_999_999_999);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Whole currency units plus cents, e.g. `Money::new(300, 0)`.
    pub const fn new(units: i64, cents: i64) -> Self {
        Self(units * 100 + cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Sum that reports overflow instead of panicking.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }

    /// `cents` as an amount, rejected when its magnitude exceeds [`Money::MAX`].
    pub fn bounded(cents: i64) -> DomainResult<Self> {
        if cents.checked_abs().is_some_and(|abs| abs <= Self::MAX.0) {
            Ok(Self(cents))
        } else {
            Err(DomainError::validation(
                "amount",
                format!("magnitude must not exceed {}", Self::MAX),
            ))
        }
    }

    /// `self / denominator` as a plain ratio; zero when the denominator is zero.
    pub fn ratio_of(self, denominator: Money) -> f64 {
        if denominator.0 == 0 {
            0.0
        } else {
            self.0 as f64 / denominator.0 as f64
        }
    }

    /// Amount rounded (half away from zero) from a floating-point unit value.
    pub fn from_f64(units: f64) -> DomainResult<Self> {
        if !units.is_finite() {
            return Err(DomainError::validation("amount", "must be a finite number"));
        }
        let cents = (units * 100.0).round();
        if cents.abs() > Self::MAX.0 as f64 {
            return Err(DomainError::validation("amount", "out of range"));
        }
        Self::bounded(cents as i64)
    }

    /// Split into `parts` amounts that sum exactly to `self`.
    ///
    /// Every part gets the truncated quotient; the rounding residue lands on the last
    /// part (100.00 / 3 → 33.33, 33.33, 33.34).
    pub fn split(self, parts: u32) -> DomainResult<Vec<Money>> {
        if parts == 0 {
            return Err(DomainError::validation(
                "installments",
                "installment count must be at least 1",
            ));
        }
        let n = parts as i64;
        let base = self.0 / n;
        let residue = self.0 - base * n;
        let mut out = vec![Money(base); parts as usize];
        if let Some(last) = out.last_mut() {
            last.0 += residue;
        }
        Ok(out)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    /// Accepts `123`, `123.4`, `123.45`, `-7.50`; a comma is accepted as the decimal
    /// separator (`"1234,56"`). More than two fractional digits is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation("amount", format!("not a currency amount: {s:?}"));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let normalized = digits.replace(',', ".");
        let (units, frac) = match normalized.split_once('.') {
            Some((u, f)) => (u, f),
            None => (normalized.as_str(), ""),
        };

        if units.is_empty() || !units.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: i64 = units.parse().map_err(|_| invalid())?;
        let cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(invalid)?;

        Money::bounded(if negative { -total } else { total })
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MoneyRepr {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match MoneyRepr::deserialize(deserializer)? {
            MoneyRepr::Text(s) => s.parse::<Money>(),
            MoneyRepr::Integer(units) => units
                .checked_mul(100)
                .ok_or_else(|| DomainError::validation("amount", "out of range"))
                .and_then(Money::bounded),
            MoneyRepr::Float(units) => Money::from_f64(units),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_with_two_fraction_digits() {
        assert_eq!(Money::new(300, 0).to_string(), "300.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-530).to_string(), "-5.30");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("300".parse::<Money>().unwrap(), Money::new(300, 0));
        assert_eq!("300.5".parse::<Money>().unwrap(), Money::from_cents(30050));
        assert_eq!("1234,56".parse::<Money>().unwrap(), Money::from_cents(123456));
        assert_eq!("-7.50".parse::<Money>().unwrap(), Money::from_cents(-750));
        assert!("1.234".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
    }

    #[test]
    fn serde_uses_fixed_point_strings_and_accepts_numbers() {
        let json = serde_json::to_string(&Money::new(12, 30)).unwrap();
        assert_eq!(json, "\"12.30\"");

        let from_str: Money = serde_json::from_str("\"99.99\"").unwrap();
        let from_float: Money = serde_json::from_str("99.99").unwrap();
        let from_int: Money = serde_json::from_str("100").unwrap();
        assert_eq!(from_str, Money::from_cents(9999));
        assert_eq!(from_float, Money::from_cents(9999));
        assert_eq!(from_int, Money::new(100, 0));
    }

    #[test]
    fn split_assigns_residue_to_last_part() {
        let parts = Money::new(100, 0).split(3).unwrap();
        assert_eq!(
            parts,
            vec![
                Money::from_cents(3333),
                Money::from_cents(3333),
                Money::from_cents(3334)
            ]
        );
    }

    #[test]
    fn amounts_beyond_fifteen_digits_are_rejected() {
        assert_eq!("9999999999999.99".parse::<Money>().unwrap(), Money::MAX);
        assert_eq!("-9999999999999.99".parse::<Money>().unwrap(), -Money::MAX);

        let err = "10000000000000.00".parse::<Money>().unwrap_err();
        assert_eq!(err.field(), Some("amount"));
        assert!("-92233720368547758.07".parse::<Money>().is_err());
        assert!(serde_json::from_str::<Money>("\"90000000000000000.00\"").is_err());
        assert!(serde_json::from_str::<Money>("90000000000000000").is_err());
        assert!(serde_json::from_str::<Money>("1e17").is_err());
    }

    #[test]
    fn checked_sum_reports_overflow() {
        let near_max = Money::from_cents(i64::MAX - 1);
        assert_eq!(Money::checked_sum([near_max, Money::from_cents(2)]), None);
        assert_eq!(
            Money::checked_sum([Money::MAX, Money::MAX]),
            Some(Money::from_cents(2 * Money::MAX.cents()))
        );
        assert_eq!(Money::checked_sum(Vec::new()), Some(Money::ZERO));
    }

    #[test]
    fn split_into_zero_parts_is_rejected() {
        let err = Money::new(10, 0).split(0).unwrap_err();
        assert_eq!(err.field(), Some("installments"));
    }

    #[test]
    fn ratio_of_zero_denominator_is_zero() {
        assert_eq!(Money::new(10, 0).ratio_of(Money::ZERO), 0.0);
        assert_eq!(Money::new(25, 0).ratio_of(Money::new(100, 0)), 0.25);
    }

    proptest! {
        #[test]
        fn split_parts_always_sum_to_total(cents in 0i64..10_000_000_000, parts in 1u32..48) {
            let total = Money::from_cents(cents);
            let split = total.split(parts).unwrap();
            prop_assert_eq!(split.len(), parts as usize);
            prop_assert_eq!(split.iter().sum::<Money>(), total);

            // Only the last part may differ, and only by less than `parts` cents.
            let first = split[0];
            for part in &split[..split.len() - 1] {
                prop_assert_eq!(*part, first);
            }
            let residue = split[split.len() - 1].cents() - first.cents();
            prop_assert!(residue >= 0 && residue < parts as i64);
        }

        #[test]
        fn display_then_parse_is_identity(cents in -1_000_000_000i64..1_000_000_000) {
            let money = Money::from_cents(cents);
            prop_assert_eq!(money.to_string().parse::<Money>().unwrap(), money);
        }
    }
}
