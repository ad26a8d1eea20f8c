//! Folding binomial expansions back into powers of sums
//!
//! `x^2 + 2*x*y + y^2` becomes `(x + y)^2` and `x^2 + 2*x + 1` becomes
//! `(x + 1)^2`. A partial expansion folds too, as long as most of the
//! expected terms are present and at least one of them is a mixed term:
//! `x^3 + 3*x^2*y + y^3` becomes `(x + y)^3 - 3*x*y^2`.

use super::expression::Expression;
use super::simplify::{merge_term, power, product, split_term, sum, Term};
use crate::quantity::Quantity;

const MAX_DEGREE: i64 = 6;

/// A term that can open or close an expansion of degree `degree`
#[derive(Debug)]
struct Anchor {
    index: usize,
    root: Expression,
    degree: i64,
    constant: bool,
}

/// Fold at most one expansion found among `terms`
///
/// Returns whether `terms` changed.
pub(super) fn recombine(terms: &mut Vec<Term>) -> bool {
    let anchors = anchors(terms);
    for (i, first) in anchors.iter().enumerate() {
        for second in &anchors[i + 1..] {
            if first.index == second.index
                || first.degree != second.degree
                || (first.constant && second.constant)
            {
                continue;
            }
            if let Some(folded) = fold(terms, first, second) {
                *terms = folded;
                return true;
            }
        }
    }
    false
}

fn anchors(terms: &[Term]) -> Vec<Anchor> {
    let mut anchors = Vec::new();
    for (index, term) in terms.iter().enumerate() {
        match &term.base {
            Some(Expression::Pow(root, exponent)) if term.coefficient.is_one() => {
                let degree = exponent.as_const().and_then(Quantity::as_integer);
                if let Some(degree) = degree.filter(|d| (2..=MAX_DEGREE).contains(d)) {
                    anchors.push(Anchor {
                        index,
                        root: (**root).clone(),
                        degree,
                        constant: false,
                    });
                }
            }
            None => {
                let Some(value) = term.coefficient.as_integer().filter(|v| *v > 0) else {
                    continue;
                };
                for degree in 2..=MAX_DEGREE {
                    if let Some(root) = integer_root(value, degree) {
                        anchors.push(Anchor {
                            index,
                            root: Expression::number(root),
                            degree,
                            constant: true,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    anchors
}

fn fold(terms: &[Term], first: &Anchor, second: &Anchor) -> Option<Vec<Term>> {
    let degree = first.degree;
    let expansion: Vec<Term> = (0..=degree)
        .map(|k| {
            split_term(product(vec![
                Expression::number(binomial_coefficient(degree, k)),
                power(first.root.clone(), Expression::number(degree - k)),
                power(second.root.clone(), Expression::number(k)),
            ]))
        })
        .collect();

    let mut used = vec![false; terms.len()];
    let mut matched = vec![false; expansion.len()];
    for (k, expected) in expansion.iter().enumerate() {
        let found = terms.iter().enumerate().position(|(i, term)| {
            !used[i] && term.base == expected.base && term.coefficient == expected.coefficient
        });
        if let Some(i) = found {
            used[i] = true;
            matched[k] = true;
        }
    }

    let count = matched.iter().filter(|m| **m).count();
    let mixed = matched[1..degree as usize].iter().any(|m| *m);
    if !mixed || count * 2 < expansion.len() {
        return None;
    }

    let mut folded: Vec<Term> = terms
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(term, _)| term.clone())
        .collect();
    let root = sum(vec![first.root.clone(), second.root.clone()]);
    merge_term(
        &mut folded,
        Term {
            base: Some(power(root, Expression::number(degree))),
            coefficient: Quantity::one(),
        },
    );
    for (term, matched) in expansion.into_iter().zip(matched) {
        if !matched {
            merge_term(
                &mut folded,
                Term {
                    base: term.base,
                    coefficient: term.coefficient.neg(),
                },
            );
        }
    }
    Some(folded)
}

fn binomial_coefficient(n: i64, k: i64) -> i64 {
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

fn integer_root(value: i64, degree: i64) -> Option<i64> {
    let guess = (value as f64).powf(1.0 / degree as f64).round() as i64;
    (guess.max(1) - 1..=guess + 1).find(|root| {
        *root >= 1
            && u32::try_from(degree)
                .ok()
                .and_then(|d| root.checked_pow(d))
                == Some(value)
    })
}
