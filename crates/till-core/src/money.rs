//! # Money Module
//!
//! Provides the `Money` type and the amount parsing/formatting helpers used
//! wherever free-text input meets arithmetic.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Decimal in, integer cents out                           │
//! │    "10,00" ──parse_amount──► Decimal(10.00) ──round──► 1000 cents      │
//! │                                                                         │
//! │  Quantities and percentages stay Decimal; every monetary result is     │
//! │  rounded once (half away from zero) into cents.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::{parse_amount, Money};
//!
//! let price = Money::parse(" 10,50 ");
//! assert_eq!(price.cents(), 1050);
//!
//! // Garbage never panics, it reads as zero
//! assert!(parse_amount("abc").is_zero());
//! ```

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

// =============================================================================
// Amount Parsing / Formatting
// =============================================================================

/// Parses a free-text amount into a decimal.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Either `,` or `.` is accepted as the decimal separator
/// - Anything that is not a finite number reads as `0` (never errors)
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use till_core::money::parse_amount;
///
/// assert_eq!(parse_amount("10,00"), Decimal::new(1000, 2));
/// assert_eq!(parse_amount(" 2.5 "), Decimal::new(25, 1));
/// assert_eq!(parse_amount(""), Decimal::ZERO);
/// assert_eq!(parse_amount("1,2,3"), Decimal::ZERO);
/// ```
pub fn parse_amount(raw: &str) -> Decimal {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return Decimal::ZERO;
    }

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .unwrap_or(Decimal::ZERO)
}

/// Like [`parse_amount`], but reports whether the input was a number at all.
///
/// Used by validators that must tell "0" apart from "not a number".
pub fn try_parse_amount(raw: &str) -> Option<Decimal> {
    let normalized = raw.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Formats a decimal as a fixed two-decimal string.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use till_core::money::format_amount;
///
/// assert_eq!(format_amount(Decimal::new(19, 0)), "19.00");
/// assert_eq!(format_amount(Decimal::new(12345, 3)), "12.35");
/// ```
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Formats a float as a fixed two-decimal string; NaN and infinities format as `"0.00"`.
pub fn format_float_amount(value: f64) -> String {
    Decimal::from_f64(value)
        .map(format_amount)
        .unwrap_or_else(|| "0.00".to_string())
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences (remaining, change, mismatch) can be negative
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Wire format**: serialized as a JSON number (`12.5`), deserialized from
///   numbers or decimal strings with either separator
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CartLine.unit_price ──► LinePricing ──► TransactionTotals.net_total    │
/// │                                                    │                    │
/// │  PaymentEntry.amount (text) ──► PaymentLedger.total() ──► tolerance    │
/// │                                                                         │
/// │  KitchenOrderSnapshot.total ──► (verbatim) ──► net_total               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Rounds a decimal amount to the nearest cent (half away from zero).
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(5985, 3)).cents(), 599);
    /// ```
    pub fn from_decimal(value: Decimal) -> Self {
        let saturated = || {
            if value.is_sign_negative() {
                Money(i64::MIN)
            } else {
                Money(i64::MAX)
            }
        };

        match value.checked_mul(Decimal::ONE_HUNDRED) {
            Some(scaled) => scaled
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .map(Money)
                .unwrap_or_else(saturated),
            None => saturated(),
        }
    }

    /// Parses free text into Money; invalid input reads as zero.
    pub fn parse(raw: &str) -> Self {
        Money::from_decimal(parse_amount(raw))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the value as an exact two-decimal number.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value, saturating at `i64::MAX` cents.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use till_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(399);
    /// let subtotal = unit_price.multiply_quantity(Decimal::new(15, 1)); // 1.5 kg
    /// assert_eq!(subtotal.cents(), 599); // 5.985 → 5.99
    /// ```
    pub fn multiply_quantity(&self, qty: Decimal) -> Self {
        match self.to_decimal().checked_mul(qty) {
            Some(value) => Money::from_decimal(value),
            None => Money(i64::MAX),
        }
    }

    /// Returns `percent`% of this amount, rounded to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use till_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(2000);
    /// assert_eq!(subtotal.percentage(Decimal::from(5)).cents(), 100);
    /// ```
    pub fn percentage(&self, percent: Decimal) -> Self {
        match self.to_decimal().checked_mul(percent) {
            Some(value) => Money::from_decimal(value / Decimal::ONE_HUNDRED),
            None => Money(i64::MAX),
        }
    }

    /// Clamps the value into `[min, max]`.
    ///
    /// `min` wins when `max < min`, so a negative ceiling still yields `min`.
    #[inline]
    pub fn clamp_between(self, min: Money, max: Money) -> Self {
        if self > max {
            if max < min {
                min
            } else {
                max
            }
        } else if self < min {
            min
        } else {
            self
        }
    }

    /// Floors the value at zero.
    #[inline]
    pub fn floor_zero(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Fixed two-decimal text, no currency symbol (`"19.00"`, `"-0.50"`).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a number or string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Ok(Money::parse(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money::from_decimal(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Ok(Money::from_decimal(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Ok(Decimal::from_f64(v).map(Money::from_decimal).unwrap_or_default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
