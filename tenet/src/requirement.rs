//! Requirements: component patterns a formula binds its aliases with
//!
//! A requirement names an alias, the class the bound component must be an
//! instance of, where that component lives, and which of its fields the
//! formula reads through which variables. A `selectAll` requirement binds a
//! whole indexed series `alias#` at once; its alias and variables carry the
//! series mark `#`.

use crate::algebra::expression::check_series_mark;
use crate::model::{ClassId, Component, ComponentClass};
use crate::quantity::Quantity;
use crate::{TenetError, TenetResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Where a bound component must be found
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Anywhere,
    /// A member of group `group` of the component bound to alias `owner`
    At { owner: String, group: String },
}

impl Location {
    pub fn at(owner: impl Into<String>, group: impl Into<String>) -> Self {
        Location::At {
            owner: owner.into(),
            group: group.into(),
        }
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            Location::Anywhere => None,
            Location::At { owner, .. } => Some(owner),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Anywhere => write!(f, "anywhere"),
            Location::At { owner, group } => write!(f, "in {}.{}", owner, group),
        }
    }
}

/// Value constraint on a candidate component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    FieldKnown { field: String },
    FieldUnknown { field: String },
    FieldEquals { field: String, value: Quantity },
}

impl Predicate {
    pub fn admits(&self, component: &Component) -> bool {
        match self {
            Predicate::FieldKnown { field } => component.is_known(field),
            Predicate::FieldUnknown { field } => {
                component.fields().contains_key(field) && !component.is_known(field)
            }
            Predicate::FieldEquals { field, value } => component.value(field) == Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    alias: String,
    class: ClassId,
    class_name: String,
    class_fields: BTreeSet<String>,
    location: Location,
    /// variable -> field
    variables: BTreeMap<String, String>,
    /// Variables whose field does not have to be known
    optional: BTreeSet<String>,
    predicates: Vec<Predicate>,
    select_all: bool,
    distinct_from: BTreeSet<String>,
}

impl Requirement {
    /// Bind `alias` to one instance of `class`
    pub fn new(alias: impl Into<String>, class: &ComponentClass) -> TenetResult<Self> {
        Self::build(alias.into(), class, false)
    }

    /// Bind every admissible instance of `class` to `alias#` as `alias1..aliasN`
    pub fn select_all(alias: impl Into<String>, class: &ComponentClass) -> TenetResult<Self> {
        Self::build(alias.into(), class, true)
    }

    fn build(alias: String, class: &ComponentClass, select_all: bool) -> TenetResult<Self> {
        check_series_mark(&alias, select_all, "Alias")?;
        Ok(Self {
            alias,
            class: class.id(),
            class_name: class.name().to_string(),
            class_fields: class.fields().keys().cloned().collect(),
            location: Location::Anywhere,
            variables: BTreeMap::new(),
            optional: BTreeSet::new(),
            predicates: Vec::new(),
            select_all,
            distinct_from: BTreeSet::new(),
        })
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Read `field` of the bound component through `variable`
    pub fn with_variable(
        mut self,
        variable: impl Into<String>,
        field: impl Into<String>,
    ) -> TenetResult<Self> {
        let variable = variable.into();
        let field = field.into();
        check_series_mark(&variable, self.select_all, "Variable")?;
        if !self.class_fields.contains(&field) {
            return Err(TenetError::Declaration(format!(
                "Class '{}' has no field '{}' for variable '{}'",
                self.class_name, field, variable
            )));
        }
        self.variables.insert(variable, field);
        Ok(self)
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Never bind the same component as `alias`
    pub fn distinct_from(mut self, alias: impl Into<String>) -> Self {
        self.distinct_from.insert(alias.into());
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn field_of(&self, variable: &str) -> Option<&str> {
        self.variables.get(variable).map(String::as_str)
    }

    /// Variables reading `field`, in name order
    pub fn variables_for<'s>(&'s self, field: &'s str) -> impl Iterator<Item = &'s str> + 's {
        self.variables
            .iter()
            .filter(move |(_, f)| f.as_str() == field)
            .map(|(variable, _)| variable.as_str())
    }

    pub fn is_optional(&self, variable: &str) -> bool {
        self.optional.contains(variable)
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_select_all(&self) -> bool {
        self.select_all
    }

    pub fn distinct(&self) -> &BTreeSet<String> {
        &self.distinct_from
    }

    /// Fields that must be known on a candidate
    pub fn required_fields(&self) -> BTreeSet<&str> {
        self.variables
            .iter()
            .filter(|(variable, _)| !self.optional.contains(*variable))
            .map(|(_, field)| field.as_str())
            .collect()
    }

    /// Whether `component`, an instance of the right class, satisfies the
    /// field and predicate constraints
    pub fn admits(&self, component: &Component) -> bool {
        self.missing_fields(component).is_empty()
            && self.predicates.iter().all(|p| p.admits(component))
    }

    pub fn missing_fields(&self, component: &Component) -> Vec<String> {
        self.required_fields()
            .into_iter()
            .filter(|field| !component.is_known(field))
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn set_optional(&mut self, variable: &str, optional: bool) {
        if optional {
            self.optional.insert(variable.to_string());
        } else {
            self.optional.remove(variable);
        }
    }

    pub(crate) fn rename_alias(&mut self, old: &str, new: &str) {
        if self.alias == old {
            self.alias = new.to_string();
        }
        if let Location::At { owner, .. } = &mut self.location {
            if owner == old {
                *owner = new.to_string();
            }
        }
        if self.distinct_from.remove(old) {
            self.distinct_from.insert(new.to_string());
        }
    }

    pub(crate) fn rename_variable(&mut self, old: &str, new: &str) {
        if let Some(field) = self.variables.remove(old) {
            self.variables.insert(new.to_string(), field);
        }
        if self.optional.remove(old) {
            self.optional.insert(new.to_string());
        }
    }

    /// Take over the variables and constraints of `other`, a requirement
    /// known to bind the same component
    pub(crate) fn absorb(&mut self, other: &Requirement) -> TenetResult<()> {
        for (variable, field) in &other.variables {
            match self.variables.get(variable) {
                Some(existing) if existing != field => {
                    return Err(TenetError::NamingConflict(format!(
                        "variable '{}' of alias '{}' reads both '{}' and '{}'",
                        variable, self.alias, existing, field
                    )))
                }
                Some(_) => {
                    if !other.optional.contains(variable) {
                        self.optional.remove(variable);
                    }
                }
                None => {
                    self.variables.insert(variable.clone(), field.clone());
                    if other.optional.contains(variable) {
                        self.optional.insert(variable.clone());
                    }
                }
            }
        }
        for predicate in &other.predicates {
            if !self.predicates.contains(predicate) {
                self.predicates.push(predicate.clone());
            }
        }
        self.distinct_from.extend(other.distinct_from.iter().cloned());
        Ok(())
    }

    /// Merge two declarations of the same alias
    ///
    /// They must agree on class, multiplicity and the field of every shared
    /// variable; locations must agree unless one of them is `Anywhere`.
    pub fn fuse(&self, other: &Requirement) -> TenetResult<Requirement> {
        let incompatible = |what: &str| {
            TenetError::Declaration(format!(
                "Requirements for alias '{}' disagree on {}",
                self.alias, what
            ))
        };
        if self.alias != other.alias {
            return Err(incompatible("the alias"));
        }
        if self.class != other.class {
            return Err(incompatible("the class"));
        }
        if self.select_all != other.select_all {
            return Err(incompatible("selectAll"));
        }
        let location = match (&self.location, &other.location) {
            (Location::Anywhere, other) => other.clone(),
            (mine, Location::Anywhere) => mine.clone(),
            (mine, theirs) if mine == theirs => mine.clone(),
            _ => return Err(incompatible("the location")),
        };

        let mut variables = self.variables.clone();
        for (variable, field) in &other.variables {
            match variables.get(variable) {
                Some(existing) if existing != field => {
                    return Err(incompatible(&format!("the field of variable '{}'", variable)))
                }
                Some(_) => {}
                None => {
                    variables.insert(variable.clone(), field.clone());
                }
            }
        }

        // Optional only where neither side requires the field
        let optional = variables
            .keys()
            .filter(|variable| {
                let mine = !self.variables.contains_key(*variable) || self.optional.contains(*variable);
                let theirs =
                    !other.variables.contains_key(*variable) || other.optional.contains(*variable);
                mine && theirs
            })
            .cloned()
            .collect();

        let mut predicates = self.predicates.clone();
        for predicate in &other.predicates {
            if !predicates.contains(predicate) {
                predicates.push(predicate.clone());
            }
        }

        Ok(Requirement {
            alias: self.alias.clone(),
            class: self.class,
            class_name: self.class_name.clone(),
            class_fields: self.class_fields.clone(),
            location,
            variables,
            optional,
            predicates,
            select_all: self.select_all,
            distinct_from: self.distinct_from.union(&other.distinct_from).cloned().collect(),
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.select_all {
            write!(f, "all ")?;
        }
        write!(f, "{}: {} {}", self.alias, self.class_name, self.location)?;
        if !self.variables.is_empty() {
            let variables: Vec<String> = self
                .variables
                .iter()
                .map(|(variable, field)| format!("{}={}", variable, field))
                .collect();
            write!(f, " [{}]", variables.join(", "))?;
        }
        Ok(())
    }
}
