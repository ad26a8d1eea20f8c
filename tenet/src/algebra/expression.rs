//! Expression trees
//!
//! Trees are immutable values. Every operation that changes a tree rebuilds
//! the touched path through [`Expression::with_members`].

use crate::quantity::Quantity;
use crate::{TenetError, TenetResult};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marks a variable or alias as a member of an indexed series
pub const SERIES_MARK: char = '#';

/// Whether a variable or alias name stands for an indexed series
pub fn is_series(name: &str) -> bool {
    name.contains(SERIES_MARK)
}

/// Name of the `index`-th element of a series: `m#` -> `m3`
pub fn series_instance(name: &str, index: u32) -> String {
    name.replacen(SERIES_MARK, &index.to_string(), 1)
}

/// Index of `instance` within the series named by `pattern`, if it belongs to it
pub fn series_index(pattern: &str, instance: &str) -> Option<u32> {
    let (head, tail) = pattern.split_once(SERIES_MARK)?;
    let digits = instance.strip_prefix(head)?.strip_suffix(tail)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|index| *index > 0)
}

/// Unary functions with a registered reciprocal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Ln,
    Exp,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::Sqrt => "sqrt",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Asin => "asin",
            Function::Acos => "acos",
            Function::Atan => "atan",
            Function::Ln => "ln",
            Function::Exp => "exp",
        }
    }

    /// Expression for `x` given `self(x) = target`
    pub fn reciprocal(&self, target: Expression) -> Expression {
        let wrap = |function: Function| Expression::Function(function, Box::new(target.clone()));
        match self {
            // sqrt(u) = t  =>  u = t ^ 2
            Function::Sqrt => target.clone().pow(Expression::number(2)),
            Function::Sin => wrap(Function::Asin),
            Function::Cos => wrap(Function::Acos),
            Function::Tan => wrap(Function::Atan),
            Function::Asin => wrap(Function::Sin),
            Function::Acos => wrap(Function::Cos),
            Function::Atan => wrap(Function::Tan),
            Function::Ln => wrap(Function::Exp),
            Function::Exp => wrap(Function::Ln),
        }
    }

    /// Whether `self(inner(x)) == x` wherever `inner(x)` is defined
    pub fn cancels(&self, inner: Function) -> bool {
        matches!(
            (self, inner),
            (Function::Exp, Function::Ln)
                | (Function::Ln, Function::Exp)
                | (Function::Sin, Function::Asin)
                | (Function::Cos, Function::Acos)
                | (Function::Tan, Function::Atan)
        )
    }

    pub fn apply(&self, argument: &Quantity) -> TenetResult<Quantity> {
        match self {
            Function::Sqrt => argument.pow(&Quantity::number(rust_decimal::Decimal::new(5, 1))),
            Function::Sin => argument.map_real("sin", f64::sin),
            Function::Cos => argument.map_real("cos", f64::cos),
            Function::Tan => argument.map_real("tan", f64::tan),
            Function::Asin => argument.map_real("asin", f64::asin),
            Function::Acos => argument.map_real("acos", f64::acos),
            Function::Atan => argument.map_real("atan", f64::atan),
            Function::Ln => argument.map_real("ln", f64::ln),
            Function::Exp => argument.map_real("exp", f64::exp),
        }
    }
}

/// A node of an expression tree
///
/// `Sum` and `Prod` are commutative: two of them compare equal when they
/// hold the same members in any order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Const(Quantity),
    Var(String),
    Sum(Vec<Expression>),
    Sub(Box<Expression>, Box<Expression>),
    Prod(Vec<Expression>),
    Div(Box<Expression>, Box<Expression>),
    Pow(Box<Expression>, Box<Expression>),
    Minus(Box<Expression>),
    Function(Function, Box<Expression>),
    /// Sum of the body over every bound index of its series variables
    GenericSum(Box<Expression>),
    /// The common value of the body over every bound index
    All(Box<Expression>),
    /// Number of bound indices of a series variable
    Counter(String),
    /// The body instantiated at one index
    Indexing(Box<Expression>, u32),
}

impl Expression {
    pub fn var(name: impl Into<String>) -> Self {
        Expression::Var(name.into())
    }

    pub fn constant(value: Quantity) -> Self {
        Expression::Const(value)
    }

    pub fn number(value: i64) -> Self {
        Expression::Const(Quantity::from(value))
    }

    pub fn pow(self, exponent: Expression) -> Self {
        Expression::Pow(Box::new(self), Box::new(exponent))
    }

    pub fn apply(function: Function, argument: Expression) -> Self {
        Expression::Function(function, Box::new(argument))
    }

    pub fn generic_sum(body: Expression) -> Self {
        Expression::GenericSum(Box::new(body))
    }

    pub fn all(body: Expression) -> Self {
        Expression::All(Box::new(body))
    }

    /// Sum of `members`, collapsing the trivial cases
    pub fn sum_of(mut members: Vec<Expression>) -> Self {
        match members.len() {
            0 => Expression::Const(Quantity::zero()),
            1 => members.remove(0),
            _ => Expression::Sum(members),
        }
    }

    /// Product of `members`, collapsing the trivial cases
    pub fn prod_of(mut members: Vec<Expression>) -> Self {
        match members.len() {
            0 => Expression::Const(Quantity::one()),
            1 => members.remove(0),
            _ => Expression::Prod(members),
        }
    }

    pub fn as_const(&self) -> Option<&Quantity> {
        match self {
            Expression::Const(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_const_value(&self, value: i64) -> bool {
        self.as_const()
            .is_some_and(|q| q.is_dimensionless() && q.value == rust_decimal::Decimal::from(value))
    }

    /// Direct children, in slot order
    pub fn members(&self) -> Vec<&Expression> {
        match self {
            Expression::Const(_) | Expression::Var(_) | Expression::Counter(_) => Vec::new(),
            Expression::Sum(members) | Expression::Prod(members) => members.iter().collect(),
            Expression::Sub(l, r) | Expression::Div(l, r) | Expression::Pow(l, r) => {
                vec![l.as_ref(), r.as_ref()]
            }
            Expression::Minus(inner)
            | Expression::Function(_, inner)
            | Expression::GenericSum(inner)
            | Expression::All(inner)
            | Expression::Indexing(inner, _) => vec![inner.as_ref()],
        }
    }

    /// Same node kind rebuilt over new children
    ///
    /// `members` must have the arity returned by [`Expression::members`].
    pub fn with_members(&self, members: Vec<Expression>) -> Expression {
        match self {
            Expression::Sum(_) => return Expression::Sum(members),
            Expression::Prod(_) => return Expression::Prod(members),
            _ => {}
        }
        let mut members = members.into_iter();
        let mut next = || Box::new(members.next().unwrap_or_else(|| Expression::number(0)));
        match self {
            Expression::Const(_)
            | Expression::Var(_)
            | Expression::Counter(_)
            | Expression::Sum(_)
            | Expression::Prod(_) => self.clone(),
            Expression::Sub(_, _) => Expression::Sub(next(), next()),
            Expression::Div(_, _) => Expression::Div(next(), next()),
            Expression::Pow(_, _) => Expression::Pow(next(), next()),
            Expression::Minus(_) => Expression::Minus(next()),
            Expression::Function(function, _) => Expression::Function(*function, next()),
            Expression::GenericSum(_) => Expression::GenericSum(next()),
            Expression::All(_) => Expression::All(next()),
            Expression::Indexing(_, index) => Expression::Indexing(next(), *index),
        }
    }

    /// Replace every subtree equal to `old` by `new`
    pub fn substitute(&self, old: &Expression, new: &Expression) -> Expression {
        if self == old {
            return new.clone();
        }
        let members = self.members();
        if members.is_empty() {
            return self.clone();
        }
        self.with_members(
            members
                .into_iter()
                .map(|member| member.substitute(old, new))
                .collect(),
        )
    }

    /// Rename a variable, including series counters that name it
    pub fn rename_variable(&self, old: &str, new: &str) -> Expression {
        match self {
            Expression::Var(name) if name == old => Expression::Var(new.to_string()),
            Expression::Counter(name) if name == old => Expression::Counter(new.to_string()),
            _ => {
                let members = self.members();
                if members.is_empty() {
                    return self.clone();
                }
                self.with_members(
                    members
                        .into_iter()
                        .map(|member| member.rename_variable(old, new))
                        .collect(),
                )
            }
        }
    }

    /// Replace every series variable `x#` by its element at `index`
    pub fn instantiate(&self, index: u32) -> Expression {
        match self {
            Expression::Var(name) if is_series(name) => {
                Expression::Var(series_instance(name, index))
            }
            _ => {
                let members = self.members();
                if members.is_empty() {
                    return self.clone();
                }
                self.with_members(
                    members
                        .into_iter()
                        .map(|member| member.instantiate(index))
                        .collect(),
                )
            }
        }
    }

    /// Free variables of the tree
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expression::Var(name) | Expression::Counter(name) => {
                out.insert(name.clone());
            }
            _ => {
                for member in self.members() {
                    member.collect_variables(out);
                }
            }
        }
    }

    /// How many leaves name `variable`
    pub fn occurrences(&self, variable: &str) -> usize {
        match self {
            Expression::Var(name) | Expression::Counter(name) => usize::from(name == variable),
            _ => self
                .members()
                .iter()
                .map(|member| member.occurrences(variable))
                .sum(),
        }
    }

    pub fn contains_variable(&self, variable: &str) -> bool {
        self.occurrences(variable) > 0
    }

    /// Nesting depth of the tree
    pub fn depth(&self) -> usize {
        1 + self
            .members()
            .iter()
            .map(|member| member.depth())
            .max()
            .unwrap_or(0)
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Sum(_) | Expression::Sub(_, _) => 1,
            Expression::Prod(_) | Expression::Div(_, _) => 2,
            Expression::Minus(_) => 3,
            Expression::Const(q) if q.is_negative() || !q.is_dimensionless() => 3,
            Expression::Pow(_, _) => 4,
            _ => 5,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }

    fn discriminant(&self) -> u8 {
        match self {
            Expression::Const(_) => 0,
            Expression::Var(_) => 1,
            Expression::Sum(_) => 2,
            Expression::Sub(_, _) => 3,
            Expression::Prod(_) => 4,
            Expression::Div(_, _) => 5,
            Expression::Pow(_, _) => 6,
            Expression::Minus(_) => 7,
            Expression::Function(_, _) => 8,
            Expression::GenericSum(_) => 9,
            Expression::All(_) => 10,
            Expression::Counter(_) => 11,
            Expression::Indexing(_, _) => 12,
        }
    }
}

fn same_multiset(left: &[Expression], right: &[Expression]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut used = vec![false; right.len()];
    left.iter().all(|l| {
        let found = right
            .iter()
            .enumerate()
            .find(|(i, r)| !used[*i] && l == *r)
            .map(|(i, _)| i);
        match found {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        use Expression as E;
        match (self, other) {
            (E::Const(a), E::Const(b)) => a == b,
            (E::Var(a), E::Var(b)) | (E::Counter(a), E::Counter(b)) => a == b,
            (E::Sum(a), E::Sum(b)) | (E::Prod(a), E::Prod(b)) => same_multiset(a, b),
            (E::Sub(a1, a2), E::Sub(b1, b2))
            | (E::Div(a1, a2), E::Div(b1, b2))
            | (E::Pow(a1, a2), E::Pow(b1, b2)) => a1 == b1 && a2 == b2,
            (E::Minus(a), E::Minus(b))
            | (E::GenericSum(a), E::GenericSum(b))
            | (E::All(a), E::All(b)) => a == b,
            (E::Function(fa, a), E::Function(fb, b)) => fa == fb && a == b,
            (E::Indexing(a, ia), E::Indexing(b, ib)) => ia == ib && a == b,
            _ => false,
        }
    }
}

impl Eq for Expression {}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            Expression::Const(q) => q.hash(state),
            Expression::Var(name) | Expression::Counter(name) => name.hash(state),
            Expression::Sum(members) | Expression::Prod(members) => {
                // order-independent, to agree with multiset equality
                let combined = members.iter().fold(0u64, |acc, member| {
                    let mut hasher = DefaultHasher::new();
                    member.hash(&mut hasher);
                    acc.wrapping_add(hasher.finish())
                });
                members.len().hash(state);
                combined.hash(state);
            }
            Expression::Function(function, inner) => {
                function.hash(state);
                inner.hash(state);
            }
            Expression::Indexing(inner, index) => {
                index.hash(state);
                inner.hash(state);
            }
            _ => {
                for member in self.members() {
                    member.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Const(q) if q.is_dimensionless() => write!(f, "{}", q),
            Expression::Const(q) => write!(f, "{}[{}]", q.value.normalize(), q.unit),
            Expression::Var(name) => write!(f, "{}", name),
            Expression::Sum(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    member.fmt_operand(f, 1)?;
                }
                Ok(())
            }
            Expression::Sub(l, r) => {
                l.fmt_operand(f, 1)?;
                write!(f, " - ")?;
                r.fmt_operand(f, 2)
            }
            Expression::Prod(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    member.fmt_operand(f, 2)?;
                }
                Ok(())
            }
            Expression::Div(l, r) => {
                l.fmt_operand(f, 2)?;
                write!(f, " / ")?;
                r.fmt_operand(f, 3)
            }
            Expression::Pow(base, exponent) => {
                base.fmt_operand(f, 5)?;
                write!(f, "^")?;
                exponent.fmt_operand(f, 4)
            }
            Expression::Minus(inner) => {
                write!(f, "-")?;
                inner.fmt_operand(f, 4)
            }
            Expression::Function(function, inner) => write!(f, "{}({})", function.name(), inner),
            Expression::GenericSum(body) => write!(f, "sum({})", body),
            Expression::All(body) => write!(f, "all({})", body),
            Expression::Counter(name) => write!(f, "count({})", name),
            Expression::Indexing(body, index) => write!(f, "at({}, {})", body, index),
        }
    }
}

impl std::ops::Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::Sum(vec![self, rhs])
    }
}

impl std::ops::Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        Expression::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        Expression::Prod(vec![self, rhs])
    }
}

impl std::ops::Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Expression) -> Expression {
        Expression::Div(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::Minus(Box::new(self))
    }
}

/// Ensure a name does not contain the series mark unless `series` is set
pub(crate) fn check_series_mark(name: &str, series: bool, what: &str) -> TenetResult<()> {
    if is_series(name) != series {
        let expectation = if series { "must" } else { "must not" };
        return Err(TenetError::Declaration(format!(
            "{} '{}' {} contain '{}'",
            what, name, expectation, SERIES_MARK
        )));
    }
    Ok(())
}
