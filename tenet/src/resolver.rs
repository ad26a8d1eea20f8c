//! Answering "what is field F of component C"
//!
//! Every formula of the knowledge base is tried in order. A candidate is
//! oriented so that it outputs F (retargeting it if F is one of its inputs),
//! bound with its output alias anchored at C, composed with the formulas
//! behind its inputs and evaluated. The first candidate that evaluates wins;
//! recoverable failures only move on to the next one.

use crate::algebra::Simplifier;
use crate::formula::Formula;
use crate::knowledge::KnowledgeBase;
use crate::matcher::{Binding, Matcher};
use crate::model::{ComponentId, Provenance, System};
use crate::quantity::{FieldType, Quantity};
use crate::{ResourceLimits, TenetError, TenetResult};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// A computed field value and how it was obtained
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub component: ComponentId,
    pub label: Option<String>,
    pub field: String,
    pub value: Quantity,
    /// Name of the knowledge base formula the computation started from
    pub formula: String,
    /// The fully composed equation that was evaluated
    pub equation: String,
    pub binding: Binding,
    #[serde(skip)]
    pub provenance: Arc<Formula>,
}

// Fields being composed, to catch formulas that feed on themselves
type Active = BTreeSet<(ComponentId, String)>;

pub struct Resolver<'a> {
    system: &'a System,
    knowledge: &'a KnowledgeBase,
    limits: &'a ResourceLimits,
    simplifier: Simplifier,
}

impl<'a> Resolver<'a> {
    pub fn new(system: &'a System, knowledge: &'a KnowledgeBase, limits: &'a ResourceLimits) -> Self {
        Self {
            system,
            knowledge,
            limits,
            simplifier: Simplifier::with_max_passes(limits.max_simplify_passes),
        }
    }

    /// Compute an unknown field without storing it
    pub fn fill(&mut self, component: ComponentId, field: &str) -> TenetResult<Resolution> {
        let target = self.system.component(component)?;
        let slot = target.field(field)?;
        if slot.is_known() {
            return Err(TenetError::FieldAlreadyKnown {
                component: target.name(),
                field: field.to_string(),
            });
        }
        let field_type = slot.ty().clone();

        let knowledge = self.knowledge;
        let mut attempts = Vec::new();
        for formula in knowledge.formulas() {
            let orientations = self.orientations(formula, component, field);
            if orientations.is_empty() {
                attempts.push(TenetError::mismatch(
                    formula.name(),
                    format!("reads no field '{}' of {}", field, self.system.describe(component)),
                ));
                continue;
            }

            for oriented in orientations {
                let outcome = oriented.and_then(|candidate| {
                    let (composed, binding) = self.resolve_candidate(
                        Arc::new(candidate),
                        component,
                        field,
                        &mut Active::new(),
                        0,
                    )?;
                    self.evaluate(formula, composed, binding, component, field, &field_type)
                });
                match outcome {
                    Ok(resolution) => {
                        debug!(
                            formula = formula.name(),
                            component = %self.system.describe(component),
                            field,
                            value = %resolution.value,
                            "formula applied"
                        );
                        return Ok(resolution);
                    }
                    Err(error) if error.is_recoverable() => {
                        debug!(formula = formula.name(), %error, "candidate rejected");
                        attempts.push(error);
                    }
                    Err(error) => return Err(error),
                }
            }
        }

        Err(TenetError::NoApplicableFormula {
            component: self.system.describe(component),
            field: field.to_string(),
            attempts,
        })
    }

    /// `formula` oriented to output `field`, once per requirement that can
    /// read it from `component`
    fn orientations(
        &mut self,
        formula: &Arc<Formula>,
        component: ComponentId,
        field: &str,
    ) -> Vec<TenetResult<Formula>> {
        let targets: Vec<(String, String)> = formula
            .requirements()
            .iter()
            .filter(|r| !r.is_select_all() && self.system.is_instance(component, r.class()))
            .flat_map(|r| {
                r.variables_for(field)
                    .map(|variable| (r.alias().to_string(), variable.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect();

        targets
            .into_iter()
            .map(|(alias, variable)| formula.retarget(&alias, &variable, &mut self.simplifier))
            .collect()
    }

    /// Bind `formula` anchored at `component` and compose its inputs
    fn resolve_candidate(
        &mut self,
        formula: Arc<Formula>,
        component: ComponentId,
        field: &str,
        active: &mut Active,
        depth: usize,
    ) -> TenetResult<(Arc<Formula>, Binding)> {
        if depth > self.limits.max_composition_depth {
            return Err(TenetError::CompositionDepth(self.limits.max_composition_depth));
        }
        let key = (component, field.to_string());
        if !active.insert(key.clone()) {
            return Err(TenetError::Cycle(format!(
                "'{}' of {} depends on itself through '{}'",
                field,
                self.system.describe(component),
                formula.name()
            )));
        }
        let result = self.bind_and_compose(formula, component, active, depth);
        active.remove(&key);
        result
    }

    fn bind_and_compose(
        &mut self,
        formula: Arc<Formula>,
        component: ComponentId,
        active: &mut Active,
        depth: usize,
    ) -> TenetResult<(Arc<Formula>, Binding)> {
        let matcher = Matcher::new(self.system, self.limits);
        let mut binding = matcher.bind(
            formula.requirements(),
            Binding::anchored(formula.output().alias.clone(), component),
        )?;
        trace!(formula = formula.name(), %binding, "formula bound");

        let mut current = Arc::clone(&formula);
        for (alias, variable, field) in formula.inputs() {
            let Some(input) = binding.get(&alias) else {
                continue;
            };
            let nested = match self
                .system
                .get_field(input, &field)?
                .provenance()
                .and_then(Provenance::formula)
            {
                Some(nested) => Arc::clone(nested),
                None => continue,
            };
            let (nested, nested_binding) =
                self.resolve_candidate(nested, input, &field, active, depth + 1)?;
            let (composed, merged) = current.compose(&variable, &nested, &binding, &nested_binding)?;
            trace!(variable = variable.as_str(), equation = %composed.equation(), "input composed");
            current = Arc::new(composed);
            binding = merged;
        }
        Ok((current, binding))
    }

    fn evaluate(
        &self,
        origin: &Formula,
        formula: Arc<Formula>,
        binding: Binding,
        component: ComponentId,
        field: &str,
        field_type: &FieldType,
    ) -> TenetResult<Resolution> {
        let matcher = Matcher::new(self.system, self.limits);
        let arguments = matcher.arguments(formula.requirements(), &binding)?;
        let value = formula.equation().right.evaluate(&arguments)?.cast(field_type)?;
        Ok(Resolution {
            component,
            label: self.system.component(component)?.label().map(str::to_string),
            field: field.to_string(),
            value,
            formula: origin.name().to_string(),
            equation: formula.equation().to_string(),
            binding,
            provenance: formula,
        })
    }
}
