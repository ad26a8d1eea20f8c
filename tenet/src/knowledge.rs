use crate::formula::Formula;
use crate::{TenetError, TenetResult};
use std::sync::Arc;

/// Declared formulas, tried in insertion order
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    formulas: Vec<Arc<Formula>>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, formula: Formula) -> TenetResult<Arc<Formula>> {
        if self.get(formula.name()).is_some() {
            return Err(TenetError::Declaration(format!(
                "Formula '{}' is declared twice",
                formula.name()
            )));
        }
        let formula = Arc::new(formula);
        self.formulas.push(Arc::clone(&formula));
        Ok(formula)
    }

    pub fn formulas(&self) -> &[Arc<Formula>] {
        &self.formulas
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Formula>> {
        self.formulas.iter().find(|formula| formula.name() == name)
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}
