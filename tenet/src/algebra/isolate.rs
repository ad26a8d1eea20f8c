//! Isolation of a variable by algebraic inversion
//!
//! For `y = f(x)` the isolation of `x` in `f` is the chain of inverse steps
//! that turns `y` back into `x`. Each node kind inverts the slot that holds
//! the variable; nested nodes compose their steps from the root down.
//!
//! Only variables reachable along a single root-to-leaf path are supported:
//! `x + x` or `x * (x + 1)` are rejected with [`TenetError::Unsolvable`].

use super::expression::{Expression, Function};
use crate::{TenetError, TenetResult};

/// One inverse step applied to the other side of an equation
#[derive(Debug, Clone, PartialEq)]
pub enum Inverse {
    /// `t - e`
    Subtract(Expression),
    /// `e - t`
    SubtractFrom(Expression),
    /// `t + e`
    Add(Expression),
    /// `t / e`
    DivideBy(Expression),
    /// `t * e`
    Multiply(Expression),
    /// `e / t`
    DivideInto(Expression),
    /// `t ^ (1 / e)`
    Root(Expression),
    /// `ln(t) / ln(e)`
    Logarithm(Expression),
    /// `-t`
    Negate,
    /// The registered reciprocal of a function
    Reciprocal(Function),
}

impl Inverse {
    pub fn apply(&self, target: Expression) -> Expression {
        match self {
            Inverse::Subtract(e) => target - e.clone(),
            Inverse::SubtractFrom(e) => e.clone() - target,
            Inverse::Add(e) => target + e.clone(),
            Inverse::DivideBy(e) => target / e.clone(),
            Inverse::Multiply(e) => target * e.clone(),
            Inverse::DivideInto(e) => e.clone() / target,
            Inverse::Root(e) => target.pow(Expression::number(1) / e.clone()),
            Inverse::Logarithm(e) => {
                Expression::apply(Function::Ln, target) / Expression::apply(Function::Ln, e.clone())
            }
            Inverse::Negate => -target,
            Inverse::Reciprocal(function) => function.reciprocal(target),
        }
    }
}

/// The inverse of an expression with respect to one of its variables
#[derive(Debug, Clone, PartialEq)]
pub struct Isolation {
    variable: String,
    steps: Vec<Inverse>,
}

impl Isolation {
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Steps from the root of the expression down to the variable
    pub fn steps(&self) -> &[Inverse] {
        &self.steps
    }

    /// Expression for the variable, given the value `target` of the whole
    /// isolated expression
    pub fn apply(&self, target: Expression) -> Expression {
        self.steps.iter().fold(target, |acc, step| step.apply(acc))
    }
}

impl Expression {
    /// Isolate `variable` in this expression
    ///
    /// ```
    /// use tenet::Expression;
    ///
    /// let weight = Expression::var("mass") * Expression::number(10);
    /// let mass = weight.isolate("mass").unwrap().apply(Expression::var("weight"));
    /// assert_eq!(mass.to_string(), "weight / 10");
    /// ```
    pub fn isolate(&self, variable: &str) -> TenetResult<Isolation> {
        let mut steps = Vec::new();
        let mut current = self;
        loop {
            match current {
                Expression::Var(name) if name == variable => {
                    return Ok(Isolation {
                        variable: variable.to_string(),
                        steps,
                    });
                }
                Expression::GenericSum(_)
                | Expression::All(_)
                | Expression::Counter(_)
                | Expression::Indexing(_, _)
                    if current.contains_variable(variable) =>
                {
                    return Err(TenetError::unsolvable(
                        variable,
                        format!("series aggregate {} cannot be inverted", current),
                    ));
                }
                _ => {}
            }

            let members = current.members();
            let holders: Vec<usize> = members
                .iter()
                .enumerate()
                .filter(|(_, member)| member.contains_variable(variable))
                .map(|(slot, _)| slot)
                .collect();

            match holders.as_slice() {
                [] => {
                    return Err(TenetError::unsolvable(
                        variable,
                        format!("does not occur in {}", self),
                    ));
                }
                [slot] => {
                    steps.push(inverse_of(current, *slot, variable)?);
                    current = members[*slot];
                }
                _ => {
                    return Err(TenetError::unsolvable(
                        variable,
                        format!("occurs in more than one branch of {}", current),
                    ));
                }
            }
        }
    }
}

/// Inverse of `node` for the child in `slot`
fn inverse_of(node: &Expression, slot: usize, variable: &str) -> TenetResult<Inverse> {
    let others = |members: &[Expression]| -> Vec<Expression> {
        members
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != slot)
            .map(|(_, member)| member.clone())
            .collect()
    };
    let inverse = match node {
        Expression::Sum(members) => Inverse::Subtract(Expression::sum_of(others(members))),
        Expression::Prod(members) => Inverse::DivideBy(Expression::prod_of(others(members))),
        Expression::Sub(_, r) if slot == 0 => Inverse::Add((**r).clone()),
        Expression::Sub(l, _) => Inverse::SubtractFrom((**l).clone()),
        Expression::Div(_, d) if slot == 0 => Inverse::Multiply((**d).clone()),
        Expression::Div(n, _) => Inverse::DivideInto((**n).clone()),
        Expression::Pow(_, e) if slot == 0 => Inverse::Root((**e).clone()),
        Expression::Pow(b, _) => Inverse::Logarithm((**b).clone()),
        Expression::Minus(_) => Inverse::Negate,
        Expression::Function(function, _) => Inverse::Reciprocal(*function),
        other => {
            return Err(TenetError::unsolvable(
                variable,
                format!("{} has no inverse", other),
            ))
        }
    };
    Ok(inverse)
}
