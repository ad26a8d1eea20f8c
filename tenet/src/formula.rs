//! Formulas: a requirement pattern, an equation and a declared output
//!
//! A formula is declared once (`Builtin`) and derived on demand: retargeting
//! isolates another variable of its equation (`IsolatedFrom`), composition
//! plugs the right-hand side of the formula that produced an input into the
//! equation (`ComposedOf`).

use crate::algebra::{Expression, Simplifier};
use crate::matcher::Binding;
use crate::requirement::Requirement;
use crate::{TenetError, TenetResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// `left = right`, with a single variable on the left
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    pub left: String,
    pub right: Expression,
}

impl Equation {
    pub fn new(left: impl Into<String>, right: Expression) -> Self {
        Self {
            left: left.into(),
            right,
        }
    }

    /// The same equation solved for `variable`
    pub fn isolate(&self, variable: &str, simplifier: &mut Simplifier) -> TenetResult<Equation> {
        if variable == self.left {
            return Ok(self.clone());
        }
        if self.right.contains_variable(&self.left) {
            return Err(TenetError::unsolvable(
                variable,
                format!("'{}' occurs on both sides of {}", self.left, self),
            ));
        }
        let isolation = self.right.isolate(variable)?;
        let right = simplifier.simplify(&isolation.apply(Expression::var(&self.left)));
        Ok(Equation::new(variable, right))
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.left, self.right)
    }
}

/// The field a formula computes: `variable`, read from `alias.field`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub variable: String,
    pub alias: String,
    pub field: String,
}

impl Output {
    pub fn new(
        variable: impl Into<String>,
        alias: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            alias: alias.into(),
            field: field.into(),
        }
    }
}

/// How a formula came to be
#[derive(Debug, Clone)]
pub enum Obtention {
    /// Declared in the knowledge base
    Builtin(String),
    /// `source` solved for `variable`
    IsolatedFrom {
        variable: String,
        source: Arc<Formula>,
    },
    /// Composition of the listed formulas, outermost first
    ComposedOf(Vec<Arc<Formula>>),
}

#[derive(Debug, Clone)]
pub struct Formula {
    name: String,
    obtention: Obtention,
    requirements: Vec<Requirement>,
    output: Output,
    equation: Equation,
}

impl Formula {
    /// Declare a formula computing `output` as `right`
    ///
    /// Requirements sharing an alias are fused. Fails with
    /// [`TenetError::Declaration`] when they cannot be, when a variable is
    /// mapped twice or not at all, or when the output or a location names
    /// an alias no requirement declares.
    pub fn new(
        name: impl Into<String>,
        requirements: Vec<Requirement>,
        output: Output,
        right: Expression,
    ) -> TenetResult<Formula> {
        let name = name.into();
        let mut requirements = fuse_by_alias(requirements)?;
        let invalid = |reason: String| TenetError::Declaration(format!("Formula '{}': {}", name, reason));

        let mut declared = BTreeSet::new();
        for requirement in &requirements {
            for variable in requirement.variables().keys() {
                if !declared.insert(variable.clone()) {
                    return Err(invalid(format!("variable '{}' is mapped twice", variable)));
                }
            }
        }

        let owner = requirements
            .iter_mut()
            .find(|r| r.alias() == output.alias)
            .ok_or_else(|| invalid(format!("output alias '{}' is not declared", output.alias)))?;
        if owner.is_select_all() {
            return Err(invalid(format!("output alias '{}' is a series", output.alias)));
        }
        match owner.field_of(&output.variable) {
            Some(field) if field == output.field => {}
            Some(field) => {
                return Err(invalid(format!(
                    "output variable '{}' reads '{}', not '{}'",
                    output.variable, field, output.field
                )))
            }
            None => {
                return Err(invalid(format!(
                    "output variable '{}' is not mapped on '{}'",
                    output.variable, output.alias
                )))
            }
        }
        owner.set_optional(&output.variable, true);

        for variable in right.variables() {
            if variable == output.variable {
                return Err(invalid(format!(
                    "output variable '{}' occurs on the right-hand side",
                    variable
                )));
            }
            if !declared.contains(&variable) {
                return Err(invalid(format!("variable '{}' is not mapped", variable)));
            }
        }

        let aliases: BTreeSet<&str> = requirements.iter().map(Requirement::alias).collect();
        for requirement in &requirements {
            let referenced = requirement
                .location()
                .owner()
                .into_iter()
                .chain(requirement.distinct().iter().map(String::as_str));
            for alias in referenced {
                if !aliases.contains(alias) {
                    return Err(invalid(format!(
                        "requirement '{}' refers to undeclared alias '{}'",
                        requirement.alias(),
                        alias
                    )));
                }
            }
        }

        Ok(Formula {
            obtention: Obtention::Builtin(name.clone()),
            equation: Equation::new(output.variable.clone(), right),
            name,
            requirements,
            output,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn obtention(&self) -> &Obtention {
        &self.obtention
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn requirement(&self, alias: &str) -> Option<&Requirement> {
        self.requirements.iter().find(|r| r.alias() == alias)
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn equation(&self) -> &Equation {
        &self.equation
    }

    pub fn aliases(&self) -> BTreeSet<String> {
        self.requirements.iter().map(|r| r.alias().to_string()).collect()
    }

    /// Every mapped variable
    pub fn variables(&self) -> BTreeSet<String> {
        self.requirements
            .iter()
            .flat_map(|r| r.variables().keys().cloned())
            .collect()
    }

    /// Inputs that may carry a formula of their own: `(alias, variable, field)`
    /// of every plain variable on the right-hand side
    pub fn inputs(&self) -> Vec<(String, String, String)> {
        let right = self.equation.right.variables();
        let used = &right;
        self.requirements
            .iter()
            .filter(|r| !r.is_select_all())
            .flat_map(move |r| {
                r.variables()
                    .iter()
                    .filter(move |(variable, _)| used.contains(*variable))
                    .map(move |(variable, field)| {
                        (r.alias().to_string(), variable.clone(), field.clone())
                    })
            })
            .collect()
    }

    /// Solve the formula for `variable`, read from `alias`, making that the output
    pub fn retarget(
        self: &Arc<Self>,
        alias: &str,
        variable: &str,
        simplifier: &mut Simplifier,
    ) -> TenetResult<Formula> {
        if alias == self.output.alias && variable == self.output.variable {
            return Ok((**self).clone());
        }
        let requirement = self.requirement(alias).ok_or_else(|| {
            TenetError::mismatch(&self.name, format!("no requirement '{}'", alias))
        })?;
        if requirement.is_select_all() {
            return Err(TenetError::mismatch(
                &self.name,
                format!("cannot compute a field of series '{}'", alias),
            ));
        }
        let field = requirement
            .field_of(variable)
            .ok_or_else(|| {
                TenetError::mismatch(
                    &self.name,
                    format!("'{}' does not read variable '{}'", alias, variable),
                )
            })?
            .to_string();

        let equation = self.equation.isolate(variable, simplifier)?;

        let mut requirements = self.requirements.clone();
        for requirement in &mut requirements {
            if requirement.alias() == self.output.alias {
                requirement.set_optional(&self.output.variable, false);
            }
        }
        for requirement in &mut requirements {
            if requirement.alias() == alias {
                requirement.set_optional(variable, true);
            }
        }

        Ok(Formula {
            name: self.name.clone(),
            obtention: Obtention::IsolatedFrom {
                variable: variable.to_string(),
                source: Arc::clone(self),
            },
            requirements,
            output: Output::new(variable, alias, field),
            equation,
        })
    }

    /// Replace input `variable` by the right-hand side of `nested`
    ///
    /// `binding` binds this formula and `nested_binding` binds `nested`. The
    /// output alias of `nested` is merged into the requirement that reads
    /// `variable`, since both stand for the same component. Other aliases and
    /// variables of `nested` that collide with this formula's get a numeric
    /// suffix; the returned binding covers both formulas.
    pub fn compose(
        self: &Arc<Self>,
        variable: &str,
        nested: &Arc<Formula>,
        binding: &Binding,
        nested_binding: &Binding,
    ) -> TenetResult<(Formula, Binding)> {
        let anchor = self
            .requirements
            .iter()
            .find(|r| !r.is_select_all() && r.field_of(variable).is_some())
            .map(|r| r.alias().to_string())
            .ok_or_else(|| {
                TenetError::NamingConflict(format!(
                    "formula '{}' has no input '{}' to compose into",
                    self.name, variable
                ))
            })?;
        let (renamed, aliases) = nested.renamed_apart(&self.aliases(), &self.variables(), &anchor);

        let right = self
            .equation
            .right
            .substitute(&Expression::var(variable), &renamed.equation.right);

        let mut requirements = self.requirements.clone();
        for requirement in &mut requirements {
            if requirement.alias() == anchor {
                requirement.set_optional(variable, true);
            }
        }
        for requirement in renamed.requirements {
            match requirements.iter_mut().find(|r| r.alias() == requirement.alias()) {
                Some(existing) => existing.absorb(&requirement)?,
                None => requirements.push(requirement),
            }
        }

        let mut merged = binding.clone();
        for (alias, component) in nested_binding.renamed(&aliases).iter() {
            merged.bind(alias, component)?;
        }

        let mut parts = match &self.obtention {
            Obtention::ComposedOf(parts) => parts.clone(),
            _ => vec![Arc::clone(self)],
        };
        parts.push(Arc::clone(nested));

        let formula = Formula {
            name: self.name.clone(),
            obtention: Obtention::ComposedOf(parts),
            requirements,
            output: self.output.clone(),
            equation: Equation::new(self.equation.left.clone(), right),
        };
        Ok((formula, merged))
    }

    /// Copy renamed for merging into a formula with `aliases` and `variables`
    ///
    /// The output alias becomes `anchor`; colliding aliases and variables get
    /// fresh names. Also returns the alias renames.
    fn renamed_apart(
        &self,
        aliases: &BTreeSet<String>,
        variables: &BTreeSet<String>,
        anchor: &str,
    ) -> (Formula, BTreeMap<String, String>) {
        let mut formula = self.clone();
        let mut alias_renames = BTreeMap::new();

        let mut taken: BTreeSet<String> = aliases.union(&self.aliases()).cloned().collect();
        taken.insert(anchor.to_string());
        for alias in self.aliases() {
            if alias != self.output.alias && (aliases.contains(&alias) || alias == anchor) {
                let fresh = fresh_name(&alias, &taken);
                taken.insert(fresh.clone());
                for requirement in &mut formula.requirements {
                    requirement.rename_alias(&alias, &fresh);
                }
                alias_renames.insert(alias, fresh);
            }
        }
        if self.output.alias != anchor {
            for requirement in &mut formula.requirements {
                requirement.rename_alias(&self.output.alias, anchor);
            }
            formula.output.alias = anchor.to_string();
            alias_renames.insert(self.output.alias.clone(), anchor.to_string());
        }

        let mut taken: BTreeSet<String> = variables.union(&self.variables()).cloned().collect();
        for variable in self.variables() {
            if variables.contains(&variable) {
                let fresh = fresh_name(&variable, &taken);
                taken.insert(fresh.clone());
                for requirement in &mut formula.requirements {
                    requirement.rename_variable(&variable, &fresh);
                }
                formula.equation.right = formula.equation.right.rename_variable(&variable, &fresh);
                if formula.equation.left == variable {
                    formula.equation.left = fresh.clone();
                    formula.output.variable = fresh.clone();
                }
            }
        }

        (formula, alias_renames)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.equation)
    }
}

/// `name_1`, `name_2`, ... whichever is free first
fn fresh_name(name: &str, taken: &BTreeSet<String>) -> String {
    (1..)
        .map(|n| format!("{}_{}", name, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

fn fuse_by_alias(requirements: Vec<Requirement>) -> TenetResult<Vec<Requirement>> {
    let mut fused: Vec<Requirement> = Vec::with_capacity(requirements.len());
    for requirement in requirements {
        match fused.iter_mut().find(|r| r.alias() == requirement.alias()) {
            Some(existing) => *existing = existing.fuse(&requirement)?,
            None => fused.push(requirement),
        }
    }
    Ok(fused)
}
