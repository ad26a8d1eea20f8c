//! Rewrite-based simplification
//!
//! A pass simplifies children first and then rewrites the node itself:
//!
//! - nested sums and products are flattened
//! - constants are folded
//! - neutral elements disappear (`0` in sums, `1` in products, `x^1`, `x^0`)
//! - terms with equal bases are merged by adding their coefficients,
//!   factors with equal bases by adding their exponents
//! - binomial expansions are folded back into `(a + b)^n`
//! - chained divisions become a single dividend/divider pair
//! - negation is pushed outwards and a sum with negative terms is split
//!   into `positive - negative`
//!
//! Passes repeat until the tree stops changing.

use super::binomial;
use super::expression::{Expression, Function};
use crate::quantity::Quantity;
use std::collections::HashMap;

const DEFAULT_MAX_PASSES: usize = 16;

/// Memoizing simplifier
///
/// Results are cached per input tree, so shared subtrees and repeated
/// requests are only simplified once.
#[derive(Debug)]
pub struct Simplifier {
    max_passes: usize,
    cache: HashMap<Expression, Expression>,
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Simplifier {
    pub fn new() -> Self {
        Self::with_max_passes(DEFAULT_MAX_PASSES)
    }

    pub fn with_max_passes(max_passes: usize) -> Self {
        Self {
            max_passes: max_passes.max(1),
            cache: HashMap::new(),
        }
    }

    pub fn simplify(&mut self, expr: &Expression) -> Expression {
        if let Some(done) = self.cache.get(expr) {
            return done.clone();
        }

        let mut current = expr.clone();
        let mut settled = false;
        for _ in 0..self.max_passes {
            let next = pass(&current);
            if next == current {
                settled = true;
                break;
            }
            current = next;
        }

        self.cache.insert(expr.clone(), current.clone());
        if settled {
            self.cache.insert(current.clone(), current.clone());
        }
        current
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl Expression {
    /// Simplified form of this tree
    ///
    /// Each call starts from an empty memo table. Keep a [`Simplifier`] to
    /// reuse results across calls.
    pub fn simplify(&self) -> Expression {
        Simplifier::new().simplify(self)
    }
}

fn pass(expr: &Expression) -> Expression {
    let members = expr.members();
    if members.is_empty() {
        return expr.clone();
    }
    rewrite(expr.with_members(members.into_iter().map(pass).collect()))
}

/// Rewrite one node whose children are already simplified
fn rewrite(expr: Expression) -> Expression {
    match expr {
        Expression::Sum(members) => sum(members),
        Expression::Sub(l, r) => sum(vec![*l, negate(*r)]),
        Expression::Prod(members) => product(members),
        Expression::Div(l, r) => quotient(*l, *r),
        Expression::Pow(base, exponent) => power(*base, *exponent),
        Expression::Minus(inner) => negate(*inner),
        Expression::Function(function, inner) => apply_function(function, *inner),
        other => other,
    }
}

/// An additive term split into `coefficient * base`
///
/// A pure constant has no base.
#[derive(Debug, Clone)]
pub(super) struct Term {
    pub(super) base: Option<Expression>,
    pub(super) coefficient: Quantity,
}

pub(super) fn negate(expr: Expression) -> Expression {
    match expr {
        Expression::Const(value) => Expression::Const(value.neg()),
        Expression::Minus(inner) => *inner,
        Expression::Sub(l, r) => Expression::Sub(r, l),
        other => Expression::Minus(Box::new(other)),
    }
}

pub(super) fn sum(members: Vec<Expression>) -> Expression {
    let mut flat = Vec::new();
    for member in members {
        collect_terms(member, false, &mut flat);
    }

    let mut terms: Vec<Term> = Vec::new();
    for term in flat {
        merge_term(&mut terms, split_term(term));
    }
    binomial::recombine(&mut terms);

    build_sum(terms)
}

fn collect_terms(expr: Expression, negative: bool, out: &mut Vec<Expression>) {
    match expr {
        Expression::Sum(members) => {
            for member in members {
                collect_terms(member, negative, out);
            }
        }
        Expression::Sub(l, r) => {
            collect_terms(*l, negative, out);
            collect_terms(*r, !negative, out);
        }
        Expression::Minus(inner) => collect_terms(*inner, !negative, out),
        other if negative => out.push(negate(other)),
        other => out.push(other),
    }
}

pub(super) fn split_term(expr: Expression) -> Term {
    match expr {
        Expression::Const(value) => Term {
            base: None,
            coefficient: value,
        },
        Expression::Minus(inner) => {
            let term = split_term(*inner);
            Term {
                base: term.base,
                coefficient: term.coefficient.neg(),
            }
        }
        Expression::Prod(members) => {
            let (constants, rest): (Vec<_>, Vec<_>) = members
                .into_iter()
                .partition(|member| matches!(member, Expression::Const(_)));
            let mut coefficient = Quantity::one();
            for constant in &constants {
                if let Expression::Const(value) = constant {
                    match coefficient.mul(value) {
                        Ok(product) => coefficient = product,
                        Err(_) => {
                            let mut members = constants.clone();
                            members.extend(rest);
                            return Term {
                                base: Some(Expression::Prod(members)),
                                coefficient: Quantity::one(),
                            };
                        }
                    }
                }
            }
            Term {
                base: (!rest.is_empty()).then(|| Expression::prod_of(rest)),
                coefficient,
            }
        }
        Expression::Div(numerator, denominator) => {
            let term = split_term(*numerator);
            let numerator = term
                .base
                .unwrap_or_else(|| Expression::Const(Quantity::one()));
            Term {
                base: Some(Expression::Div(Box::new(numerator), denominator)),
                coefficient: term.coefficient,
            }
        }
        other => Term {
            base: Some(other),
            coefficient: Quantity::one(),
        },
    }
}

pub(super) fn merge_term(terms: &mut Vec<Term>, term: Term) {
    if let Some(existing) = terms
        .iter_mut()
        .find(|t| t.base == term.base && t.coefficient.unit == term.coefficient.unit)
    {
        if let Ok(total) = existing.coefficient.add(&term.coefficient) {
            existing.coefficient = total;
            return;
        }
    }
    terms.push(term);
}

/// `coefficient * base` in canonical form, for a positive coefficient
pub(super) fn rebuild_term(base: Option<Expression>, coefficient: Quantity) -> Expression {
    match base {
        None => Expression::Const(coefficient),
        Some(Expression::Div(numerator, denominator)) => {
            Expression::Div(Box::new(scale(*numerator, coefficient)), denominator)
        }
        Some(base) => scale(base, coefficient),
    }
}

fn scale(expr: Expression, coefficient: Quantity) -> Expression {
    if coefficient.is_one() {
        return expr;
    }
    match expr {
        Expression::Const(value) if value.is_one() => Expression::Const(coefficient),
        Expression::Prod(mut members) => {
            members.insert(0, Expression::Const(coefficient));
            Expression::Prod(members)
        }
        other => Expression::Prod(vec![Expression::Const(coefficient), other]),
    }
}

fn build_sum(terms: Vec<Term>) -> Expression {
    let mut positive = Vec::new();
    let mut negative = Vec::new();
    for term in terms {
        if term.coefficient.is_zero() {
            continue;
        }
        if term.coefficient.is_negative() {
            negative.push(rebuild_term(term.base, term.coefficient.neg()));
        } else {
            positive.push(rebuild_term(term.base, term.coefficient));
        }
    }
    sort_terms(&mut positive);
    sort_terms(&mut negative);

    match (positive.is_empty(), negative.is_empty()) {
        (true, true) => Expression::Const(Quantity::zero()),
        (false, true) => Expression::sum_of(positive),
        (true, false) => negate(Expression::sum_of(negative)),
        (false, false) => Expression::Sub(
            Box::new(Expression::sum_of(positive)),
            Box::new(Expression::sum_of(negative)),
        ),
    }
}

// Constants go last in sums and first in products
fn sort_terms(terms: &mut [Expression]) {
    terms.sort_by_cached_key(|term| (matches!(term, Expression::Const(_)), term.to_string()));
}

pub(super) fn product(members: Vec<Expression>) -> Expression {
    let mut factors = Factors::default();
    for member in members {
        factors.collect(member);
    }

    if !factors.denominators.is_empty() {
        let mut numerator = factors.plain;
        if !factors.coefficient.is_one() {
            numerator.push(Expression::Const(factors.coefficient));
        }
        let result = quotient(product(numerator), product(factors.denominators));
        return if factors.negative {
            negate(result)
        } else {
            result
        };
    }

    let mut coefficient = factors.coefficient;
    let mut negative = factors.negative;
    if coefficient.is_zero() {
        return Expression::Const(Quantity::zero());
    }

    let mut powers: Vec<(Expression, Expression)> = Vec::new();
    for factor in factors.plain {
        let (base, exponent) = match factor {
            Expression::Pow(base, exponent) => (*base, *exponent),
            other => (other, Expression::number(1)),
        };
        match powers.iter_mut().find(|(b, _)| *b == base) {
            Some(entry) => entry.1 = sum(vec![entry.1.clone(), exponent]),
            None => powers.push((base, exponent)),
        }
    }

    let mut rest = Vec::new();
    for (base, exponent) in powers {
        if exponent.is_const_value(0) {
            continue;
        }
        match power(base, exponent) {
            Expression::Const(value) => match coefficient.mul(&value) {
                Ok(product) => coefficient = product,
                Err(_) => rest.push(Expression::Const(value)),
            },
            Expression::Minus(inner) => {
                negative = !negative;
                rest.push(*inner);
            }
            other => rest.push(other),
        }
    }

    if coefficient.is_zero() {
        return Expression::Const(Quantity::zero());
    }
    if coefficient.is_negative() {
        negative = !negative;
        coefficient = coefficient.neg();
    }
    sort_terms(&mut rest);
    if !coefficient.is_one() {
        rest.insert(0, Expression::Const(coefficient));
    }

    let result = Expression::prod_of(rest);
    if negative {
        negate(result)
    } else {
        result
    }
}

struct Factors {
    coefficient: Quantity,
    negative: bool,
    plain: Vec<Expression>,
    denominators: Vec<Expression>,
}

impl Default for Factors {
    fn default() -> Self {
        Self {
            coefficient: Quantity::one(),
            negative: false,
            plain: Vec::new(),
            denominators: Vec::new(),
        }
    }
}

impl Factors {
    fn collect(&mut self, expr: Expression) {
        match expr {
            Expression::Prod(members) => {
                for member in members {
                    self.collect(member);
                }
            }
            Expression::Minus(inner) => {
                self.negative = !self.negative;
                self.collect(*inner);
            }
            Expression::Const(value) => match self.coefficient.mul(&value) {
                Ok(product) => self.coefficient = product,
                Err(_) => self.plain.push(Expression::Const(value)),
            },
            Expression::Div(numerator, denominator) => {
                self.collect(*numerator);
                self.denominators.push(*denominator);
            }
            other => self.plain.push(other),
        }
    }
}

fn strip_sign(expr: Expression, negative: &mut bool) -> Expression {
    match expr {
        Expression::Minus(inner) => {
            *negative = !*negative;
            *inner
        }
        Expression::Const(value) if value.is_negative() => {
            *negative = !*negative;
            Expression::Const(value.neg())
        }
        other => other,
    }
}

pub(super) fn quotient(numerator: Expression, denominator: Expression) -> Expression {
    let mut negative = false;
    let numerator = strip_sign(numerator, &mut negative);
    let denominator = strip_sign(denominator, &mut negative);

    let result = match (numerator, denominator) {
        (Expression::Div(a, b), Expression::Div(c, d)) => {
            quotient(product(vec![*a, *d]), product(vec![*b, *c]))
        }
        (Expression::Div(a, b), d) => quotient(*a, product(vec![*b, d])),
        (n, Expression::Div(c, d)) => quotient(product(vec![n, *d]), *c),
        (n, d) if d.is_const_value(1) => n,
        (Expression::Const(n), Expression::Const(d)) => match n.div(&d) {
            Ok(value) => Expression::Const(value),
            Err(_) => Expression::Div(
                Box::new(Expression::Const(n)),
                Box::new(Expression::Const(d)),
            ),
        },
        (n, _) if n.as_const().is_some_and(Quantity::is_zero) => {
            Expression::Const(Quantity::zero())
        }
        (n, d) => Expression::Div(Box::new(n), Box::new(d)),
    };

    if negative {
        negate(result)
    } else {
        result
    }
}

pub(super) fn power(base: Expression, exponent: Expression) -> Expression {
    if exponent.is_const_value(0) {
        return Expression::number(1);
    }
    if exponent.is_const_value(1) {
        return base;
    }
    if let (Expression::Const(b), Expression::Const(e)) = (&base, &exponent) {
        if let Ok(value) = b.pow(e) {
            return Expression::Const(value);
        }
    }
    if base.is_const_value(1) {
        return Expression::number(1);
    }

    let whole = exponent.as_const().and_then(Quantity::as_integer);
    match (base, whole) {
        (Expression::Pow(inner, inner_exponent), Some(n)) => {
            match inner_exponent
                .as_const()
                .and_then(Quantity::as_integer)
                .and_then(|m| m.checked_mul(n))
            {
                Some(combined) => power(*inner, Expression::number(combined)),
                None => Expression::Pow(
                    Box::new(Expression::Pow(inner, inner_exponent)),
                    Box::new(exponent),
                ),
            }
        }
        (Expression::Minus(inner), Some(n)) => {
            let raised = power(*inner, Expression::number(n));
            if n % 2 == 0 {
                raised
            } else {
                negate(raised)
            }
        }
        (Expression::Function(Function::Sqrt, inner), Some(2)) => *inner,
        (base, _) => Expression::Pow(Box::new(base), Box::new(exponent)),
    }
}

fn apply_function(function: Function, argument: Expression) -> Expression {
    if let Expression::Const(value) = &argument {
        if let Ok(result) = function.apply(value) {
            return Expression::Const(result);
        }
    }
    if let Expression::Function(inner, inner_argument) = &argument {
        if function.cancels(*inner) {
            return (**inner_argument).clone();
        }
    }
    Expression::Function(function, Box::new(argument))
}
