//! Parsed declarations the engine loads
//!
//! A knowledge base arrives as already structured records: classes,
//! formulas with their requirement patterns and expression trees, and the
//! component instances to reason about. The records deserialize from JSON.
//!
//! ```json
//! {
//!   "classes": [{ "name": "Body", "fields": { "mass": "number", "weight": "number" } }],
//!   "formulas": [{
//!     "name": "weight",
//!     "requirements": [{ "alias": "b", "class": "Body", "variables": { "m": "mass", "w": "weight" } }],
//!     "output": { "variable": "w", "alias": "b", "field": "weight" },
//!     "expression": { "prod": [{ "var": "m" }, { "const": { "value": "9.81" } }] }
//!   }],
//!   "components": [{ "label": "rock", "class": "Body", "fields": { "mass": "2" } }]
//! }
//! ```

use crate::algebra::Expression;
use crate::formula::{Formula, Output};
use crate::model::{ClassDeclaration, ClassRegistry};
use crate::quantity::Quantity;
use crate::requirement::{Location, Predicate, Requirement};
use crate::{TenetError, TenetResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub classes: Vec<ClassDeclaration>,
    #[serde(default)]
    pub formulas: Vec<FormulaDeclaration>,
    #[serde(default)]
    pub components: Vec<ComponentDeclaration>,
}

impl Declarations {
    pub fn from_json(json: &str) -> TenetResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TenetError::Declaration(format!("Invalid declarations: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementDeclaration {
    pub alias: String,
    pub class: String,
    /// `owner.group`; anywhere when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// variable -> field
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub select_all: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distinct_from: Vec<String>,
}

impl RequirementDeclaration {
    pub fn build(&self, classes: &ClassRegistry) -> TenetResult<Requirement> {
        let class = classes.get(classes.lookup(&self.class)?);
        let mut requirement = if self.select_all {
            Requirement::select_all(&self.alias, class)?
        } else {
            Requirement::new(&self.alias, class)?
        };
        if let Some(location) = &self.location {
            let (owner, group) = location.split_once('.').ok_or_else(|| {
                TenetError::Declaration(format!(
                    "Location '{}' of '{}' is not of the form owner.group",
                    location, self.alias
                ))
            })?;
            requirement = requirement.with_location(Location::at(owner, group));
        }
        for (variable, field) in &self.variables {
            requirement = requirement.with_variable(variable, field)?;
        }
        for predicate in &self.predicates {
            requirement = requirement.with_predicate(predicate.clone());
        }
        for alias in &self.distinct_from {
            requirement = requirement.distinct_from(alias);
        }
        Ok(requirement)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaDeclaration {
    pub name: String,
    pub requirements: Vec<RequirementDeclaration>,
    pub output: Output,
    pub expression: Expression,
}

impl FormulaDeclaration {
    pub fn build(&self, classes: &ClassRegistry) -> TenetResult<Formula> {
        let requirements = self
            .requirements
            .iter()
            .map(|requirement| requirement.build(classes))
            .collect::<TenetResult<Vec<_>>>()?;
        Formula::new(
            &self.name,
            requirements,
            self.output.clone(),
            self.expression.clone(),
        )
    }
}

/// A field value: `"9.81 m s^-2"`, `"2"` or a bare JSON number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueDeclaration {
    Text(String),
    Number(Decimal),
}

impl ValueDeclaration {
    pub fn to_quantity(&self) -> TenetResult<Quantity> {
        match self {
            ValueDeclaration::Text(text) => text.parse(),
            ValueDeclaration::Number(value) => Ok(Quantity::number(*value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDeclaration {
    pub label: String,
    pub class: String,
    #[serde(default)]
    pub fields: BTreeMap<String, ValueDeclaration>,
    /// Group name -> members, created along with this component
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<ComponentDeclaration>>,
}
