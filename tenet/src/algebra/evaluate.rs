//! Numeric reduction of expression trees

use super::expression::{is_series, series_instance, Expression};
use crate::quantity::Quantity;
use crate::{TenetError, TenetResult};
use std::collections::{BTreeSet, HashMap};

/// Values of the free variables of an expression
pub type Bindings = HashMap<String, Quantity>;

impl Expression {
    /// Evaluate against `bindings`
    ///
    /// Every variable leaf must be bound; series aggregates run over the
    /// contiguous indices `1..=n` for which all their series variables are bound.
    pub fn evaluate(&self, bindings: &Bindings) -> TenetResult<Quantity> {
        match self {
            Expression::Const(value) => Ok(value.clone()),
            Expression::Var(name) => bindings
                .get(name)
                .cloned()
                .ok_or_else(|| TenetError::MissingVariable(name.clone())),
            Expression::Sum(members) => {
                let mut members = members.iter();
                let mut total = match members.next() {
                    Some(first) => first.evaluate(bindings)?,
                    None => return Ok(Quantity::zero()),
                };
                for member in members {
                    total = total.add(&member.evaluate(bindings)?)?;
                }
                Ok(total)
            }
            Expression::Sub(l, r) => l.evaluate(bindings)?.sub(&r.evaluate(bindings)?),
            Expression::Prod(members) => {
                let mut total = Quantity::one();
                for member in members {
                    total = total.mul(&member.evaluate(bindings)?)?;
                }
                Ok(total)
            }
            Expression::Div(l, r) => l.evaluate(bindings)?.div(&r.evaluate(bindings)?),
            Expression::Pow(base, exponent) => {
                base.evaluate(bindings)?.pow(&exponent.evaluate(bindings)?)
            }
            Expression::Minus(inner) => Ok(inner.evaluate(bindings)?.neg()),
            Expression::Function(function, inner) => function.apply(&inner.evaluate(bindings)?),
            Expression::GenericSum(body) => {
                let count = series_length(body, bindings)?;
                let mut total: Option<Quantity> = None;
                for index in 1..=count {
                    let value = body.instantiate(index).evaluate(bindings)?;
                    total = Some(match total {
                        Some(acc) => acc.add(&value)?,
                        None => value,
                    });
                }
                Ok(total.unwrap_or_else(Quantity::zero))
            }
            Expression::All(body) => {
                let count = series_length(body, bindings)?;
                let mut common: Option<Quantity> = None;
                for index in 1..=count {
                    let value = body.instantiate(index).evaluate(bindings)?;
                    match &common {
                        Some(expected) if *expected != value => {
                            return Err(TenetError::Arithmetic(format!(
                                "series values disagree in {}: {} and {}",
                                self, expected, value
                            )));
                        }
                        Some(_) => {}
                        None => common = Some(value),
                    }
                }
                common.ok_or_else(|| {
                    TenetError::MissingVariable(format!("any element of the series in {}", self))
                })
            }
            Expression::Counter(name) => {
                let mut count = 0u32;
                while bindings.contains_key(&series_instance(name, count + 1)) {
                    count += 1;
                }
                Ok(Quantity::from(i64::from(count)))
            }
            Expression::Indexing(body, index) => body.instantiate(*index).evaluate(bindings),
        }
    }
}

/// Number of leading indices for which every series variable of `body` is bound
fn series_length(body: &Expression, bindings: &Bindings) -> TenetResult<u32> {
    let series: BTreeSet<String> = body
        .variables()
        .into_iter()
        .filter(|name| is_series(name))
        .collect();
    if series.is_empty() {
        return Err(TenetError::Arithmetic(format!(
            "aggregate over {} names no series variable",
            body
        )));
    }
    let mut count = 0u32;
    while series
        .iter()
        .all(|name| bindings.contains_key(&series_instance(name, count + 1)))
    {
        count += 1;
    }
    Ok(count)
}
