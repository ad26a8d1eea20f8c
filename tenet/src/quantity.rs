//! Unit-aware numeric values
//!
//! A `Quantity` is an exact decimal magnitude with a dimension. Addition and
//! subtraction need equal dimensions, multiplication and division combine
//! them, and powers scale them.

use crate::{TenetError, TenetResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// Integer powers above this are computed through f64
const MAX_EXACT_EXPONENT: i64 = 64;

/// Dimension of a quantity: base symbol -> exponent
///
/// `{"kg": 1, "m": 1, "s": -2}` is a force. The empty map is dimensionless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unit(BTreeMap<String, i32>);

impl Unit {
    pub fn dimensionless() -> Self {
        Self::default()
    }

    /// A single base dimension with exponent 1
    pub fn base(symbol: impl Into<String>) -> Self {
        let mut exponents = BTreeMap::new();
        exponents.insert(symbol.into(), 1);
        Self(exponents)
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.is_empty()
    }

    pub fn exponents(&self) -> &BTreeMap<String, i32> {
        &self.0
    }

    fn combine(&self, other: &Unit, sign: i32) -> Unit {
        let mut exponents = self.0.clone();
        for (symbol, exponent) in &other.0 {
            let entry = exponents.entry(symbol.clone()).or_insert(0);
            *entry += sign * exponent;
        }
        exponents.retain(|_, e| *e != 0);
        Unit(exponents)
    }

    /// Raise every exponent by `power`, if all results are whole
    fn scaled(&self, power: Decimal) -> Option<Unit> {
        let mut exponents = BTreeMap::new();
        for (symbol, exponent) in &self.0 {
            let scaled = Decimal::from(*exponent).checked_mul(power)?;
            if !scaled.fract().is_zero() {
                return None;
            }
            let scaled = scaled.to_i32()?;
            if scaled != 0 {
                exponents.insert(symbol.clone(), scaled);
            }
        }
        Some(Unit(exponents))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (symbol, exponent) in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            if *exponent == 1 {
                write!(f, "{}", symbol)?;
            } else {
                write!(f, "{}^{}", symbol, exponent)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Unit {
    type Err = TenetError;

    /// Parses whitespace separated terms such as `kg m s^-2`
    fn from_str(s: &str) -> TenetResult<Self> {
        let mut unit = Unit::dimensionless();
        for term in s.split_whitespace() {
            let (symbol, exponent) = match term.split_once('^') {
                Some((symbol, exponent)) => {
                    let exponent = exponent.parse::<i32>().map_err(|_| {
                        TenetError::Declaration(format!("Invalid unit exponent in '{}'", term))
                    })?;
                    (symbol, exponent)
                }
                None => (term, 1),
            };
            if symbol.is_empty() || !symbol.chars().all(char::is_alphabetic) {
                return Err(TenetError::Declaration(format!(
                    "Invalid unit symbol '{}'",
                    symbol
                )));
            }
            let mut single = BTreeMap::new();
            single.insert(symbol.to_string(), exponent);
            unit = unit.combine(&Unit(single), 1);
        }
        Ok(unit)
    }
}

/// Declared type of a component field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Any dimensionless decimal
    Number,
    /// Dimensionless, rounded to a whole number on cast
    Integer,
    /// A value with the given dimension
    Measure(Unit),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Number => write!(f, "number"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Measure(unit) if unit.is_dimensionless() => write!(f, "measure"),
            FieldType::Measure(unit) => write!(f, "measure [{}]", unit),
        }
    }
}

/// An exact decimal value with a dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Unit::is_dimensionless")]
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: Decimal, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// A dimensionless quantity
    pub fn number(value: impl Into<Decimal>) -> Self {
        Self::new(value.into(), Unit::dimensionless())
    }

    pub fn zero() -> Self {
        Self::number(Decimal::ZERO)
    }

    pub fn one() -> Self {
        Self::number(Decimal::ONE)
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.value == Decimal::ONE && self.unit.is_dimensionless()
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }

    pub fn is_integer(&self) -> bool {
        self.value.fract().is_zero()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.unit.is_dimensionless()
    }

    /// Whole dimensionless values, as `i64`
    pub fn as_integer(&self) -> Option<i64> {
        if self.is_dimensionless() && self.is_integer() {
            self.value.to_i64()
        } else {
            None
        }
    }

    pub fn neg(&self) -> Quantity {
        Quantity::new(-self.value, self.unit.clone())
    }

    pub fn add(&self, other: &Quantity) -> TenetResult<Quantity> {
        self.require_same_unit(other)?;
        let value = self
            .value
            .checked_add(other.value)
            .ok_or_else(|| overflow("addition"))?;
        Ok(Quantity::new(value, self.unit.clone()))
    }

    pub fn sub(&self, other: &Quantity) -> TenetResult<Quantity> {
        self.require_same_unit(other)?;
        let value = self
            .value
            .checked_sub(other.value)
            .ok_or_else(|| overflow("subtraction"))?;
        Ok(Quantity::new(value, self.unit.clone()))
    }

    pub fn mul(&self, other: &Quantity) -> TenetResult<Quantity> {
        let value = self
            .value
            .checked_mul(other.value)
            .ok_or_else(|| overflow("multiplication"))?;
        Ok(Quantity::new(value, self.unit.combine(&other.unit, 1)))
    }

    pub fn div(&self, other: &Quantity) -> TenetResult<Quantity> {
        if other.value.is_zero() {
            return Err(TenetError::DivisionByZero);
        }
        let value = self
            .value
            .checked_div(other.value)
            .ok_or_else(|| overflow("division"))?;
        Ok(Quantity::new(value, self.unit.combine(&other.unit, -1)))
    }

    /// Raise to a dimensionless power
    ///
    /// Whole exponents are computed exactly; anything else goes through f64.
    pub fn pow(&self, exponent: &Quantity) -> TenetResult<Quantity> {
        if !exponent.is_dimensionless() {
            return Err(TenetError::UnitMismatch {
                left: "a dimensionless exponent".to_string(),
                right: exponent.to_string(),
            });
        }
        let unit = self.unit.scaled(exponent.value).ok_or_else(|| {
            TenetError::Arithmetic(format!(
                "cannot raise [{}] to a power of {}",
                self.unit, exponent.value
            ))
        })?;

        if let Some(n) = exponent.as_integer().filter(|n| n.abs() <= MAX_EXACT_EXPONENT) {
            let magnitude = exact_power(self.value, n.unsigned_abs())?;
            let value = if n < 0 {
                if magnitude.is_zero() {
                    return Err(TenetError::DivisionByZero);
                }
                Decimal::ONE
                    .checked_div(magnitude)
                    .ok_or_else(|| overflow("power"))?
            } else {
                magnitude
            };
            return Ok(Quantity::new(value, unit));
        }

        let base = to_f64(self.value)?;
        let exp = to_f64(exponent.value)?;
        Ok(Quantity::new(from_f64(base.powf(exp), "power")?, unit))
    }

    /// Apply a real function to a dimensionless value
    pub fn map_real(&self, name: &str, function: impl Fn(f64) -> f64) -> TenetResult<Quantity> {
        if !self.is_dimensionless() {
            return Err(TenetError::Arithmetic(format!(
                "{} expects a dimensionless argument, got {}",
                name, self
            )));
        }
        let result = function(to_f64(self.value)?);
        Ok(Quantity::number(from_f64(result, name)?))
    }

    /// Convert to the declared type of a field
    pub fn cast(&self, target: &FieldType) -> TenetResult<Quantity> {
        let refuse = || TenetError::Cast {
            value: self.to_string(),
            target: target.to_string(),
        };
        match target {
            FieldType::Number if self.is_dimensionless() => Ok(self.clone()),
            FieldType::Integer if self.is_dimensionless() => {
                Ok(Quantity::number(self.value.round()))
            }
            FieldType::Measure(unit) if self.unit == *unit || self.is_dimensionless() => {
                Ok(Quantity::new(self.value, unit.clone()))
            }
            _ => Err(refuse()),
        }
    }

    fn require_same_unit(&self, other: &Quantity) -> TenetResult<()> {
        if self.unit == other.unit {
            Ok(())
        } else {
            Err(TenetError::UnitMismatch {
                left: self.to_string(),
                right: other.to_string(),
            })
        }
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Quantity::number(value)
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Quantity::number(value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value.normalize())?;
        if !self.unit.is_dimensionless() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}

impl FromStr for Quantity {
    type Err = TenetError;

    /// Parses `9.81` or `9.81 m s^-2`
    fn from_str(s: &str) -> TenetResult<Self> {
        let s = s.trim();
        let (number, unit) = match s.split_once(char::is_whitespace) {
            Some((number, unit)) => (number, unit.parse::<Unit>()?),
            None => (s, Unit::dimensionless()),
        };
        let value = Decimal::from_str(number)
            .or_else(|_| Decimal::from_scientific(number))
            .map_err(|_| TenetError::Declaration(format!("Invalid number '{}'", number)))?;
        Ok(Quantity::new(value, unit))
    }
}

fn exact_power(base: Decimal, exponent: u64) -> TenetResult<Decimal> {
    let mut result = Decimal::ONE;
    let mut square = base;
    let mut remaining = exponent;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = result
                .checked_mul(square)
                .ok_or_else(|| overflow("power"))?;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = square
                .checked_mul(square)
                .ok_or_else(|| overflow("power"))?;
        }
    }
    Ok(result)
}

fn to_f64(value: Decimal) -> TenetResult<f64> {
    value
        .to_f64()
        .ok_or_else(|| TenetError::Arithmetic(format!("cannot convert {} to float", value)))
}

fn from_f64(value: f64, operation: &str) -> TenetResult<Decimal> {
    if !value.is_finite() {
        return Err(TenetError::Arithmetic(format!(
            "{} has no real result",
            operation
        )));
    }
    Decimal::from_f64(value).ok_or_else(|| {
        TenetError::Arithmetic(format!("{} result cannot be represented", operation))
    })
}

fn overflow(operation: &str) -> TenetError {
    TenetError::Arithmetic(format!("{} overflowed", operation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    #[test]
    fn multiplication_combines_units() {
        let force = q("2 kg").mul(&q("9.81 m s^-2")).unwrap();
        assert_eq!(force, q("19.62 kg m s^-2"));
    }

    #[test]
    fn addition_requires_equal_units() {
        assert!(matches!(
            q("1 m").add(&q("1 s")),
            Err(TenetError::UnitMismatch { .. })
        ));
        assert_eq!(q("1 m").add(&q("2.5 m")).unwrap(), q("3.5 m"));
    }

    #[test]
    fn equality_ignores_trailing_zeros() {
        assert_eq!(q("2.0"), q("2"));
        assert_ne!(q("2 m"), q("2"));
    }

    #[test]
    fn integer_powers_are_exact() {
        assert_eq!(q("1.1").pow(&q("2")).unwrap(), q("1.21"));
        assert_eq!(q("2").pow(&q("-2")).unwrap(), q("0.25"));
        assert_eq!(q("3 m").pow(&q("2")).unwrap(), q("9 m^2"));
    }

    #[test]
    fn fractional_power_halves_dimension() {
        assert_eq!(q("16 m^2").pow(&q("0.5")).unwrap(), q("4 m"));
        assert!(q("2 m").pow(&q("0.5")).is_err());
    }

    #[test]
    fn huge_power_of_unit_is_an_error() {
        let result = q("3 m^2").pow(&q("50000000000000000000000000000"));
        assert!(matches!(result, Err(TenetError::Arithmetic(_))));
    }

    #[test]
    fn division_by_zero_is_reported() {
        assert_eq!(q("1").div(&q("0")), Err(TenetError::DivisionByZero));
    }

    #[test]
    fn cast_follows_field_type() {
        assert_eq!(q("2.6").cast(&FieldType::Integer).unwrap(), q("3"));
        assert_eq!(
            q("5").cast(&FieldType::Measure(Unit::base("kg"))).unwrap(),
            q("5 kg")
        );
        assert!(q("5 s").cast(&FieldType::Number).is_err());
    }
}
