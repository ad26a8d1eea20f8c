use super::class::ClassId;
use crate::formula::Formula;
use crate::quantity::{FieldType, Quantity};
use crate::{TenetError, TenetResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a computed field value came from
#[derive(Debug, Clone)]
pub enum Provenance {
    /// Computed by the resolver; the formula is fully composed
    Formula(Arc<Formula>),
    /// Supplied by an outside source that cannot be composed further
    Opaque(String),
}

impl Provenance {
    pub fn formula(&self) -> Option<&Arc<Formula>> {
        match self {
            Provenance::Formula(formula) => Some(formula),
            Provenance::Opaque(_) => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Formula(formula) => write!(f, "{}", formula.equation()),
            Provenance::Opaque(source) => write!(f, "{}", source),
        }
    }
}

/// A typed slot that is written at most once
#[derive(Debug, Clone)]
pub struct Field {
    ty: FieldType,
    value: Option<Quantity>,
    provenance: Option<Provenance>,
}

impl Field {
    pub fn new(ty: FieldType) -> Self {
        Self {
            ty,
            value: None,
            provenance: None,
        }
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn value(&self) -> Option<&Quantity> {
        self.value.as_ref()
    }

    /// `None` for unknown fields and for values given directly
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }

    pub fn is_known(&self) -> bool {
        self.value.is_some()
    }
}

/// Members of a group, in insertion order
#[derive(Debug, Clone)]
pub struct Group {
    class: ClassId,
    min: usize,
    max: Option<usize>,
    members: Vec<ComponentId>,
}

impl Group {
    pub(crate) fn new(class: ClassId, min: usize, max: Option<usize>) -> Self {
        Self {
            class,
            min,
            max,
            members: Vec::new(),
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    pub fn members(&self) -> &[ComponentId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, component: ComponentId) -> bool {
        self.members.contains(&component)
    }

    pub fn within_bounds(&self) -> bool {
        self.members.len() >= self.min && self.max.map_or(true, |max| self.members.len() <= max)
    }

    pub(crate) fn insert(&mut self, component: ComponentId) {
        self.members.push(component);
    }

    pub(crate) fn remove(&mut self, component: ComponentId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != component);
        self.members.len() != before
    }
}

/// An instance of a class
#[derive(Debug, Clone)]
pub struct Component {
    id: ComponentId,
    class: ClassId,
    label: Option<String>,
    fields: BTreeMap<String, Field>,
    groups: BTreeMap<String, Group>,
    container: Option<(ComponentId, String)>,
}

impl Component {
    pub(crate) fn new(
        id: ComponentId,
        class: ClassId,
        label: Option<String>,
        fields: BTreeMap<String, Field>,
        groups: BTreeMap<String, Group>,
    ) -> Self {
        Self {
            id,
            class,
            label,
            fields,
            groups,
            container: None,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Label if there is one, id otherwise
    pub fn name(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.id.to_string(),
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> TenetResult<&Field> {
        self.fields.get(name).ok_or_else(|| TenetError::UnknownField {
            component: self.name(),
            field: name.to_string(),
        })
    }

    pub fn value(&self, field: &str) -> Option<&Quantity> {
        self.fields.get(field).and_then(Field::value)
    }

    pub fn is_known(&self, field: &str) -> bool {
        self.value(field).is_some()
    }

    pub fn groups(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    pub fn group(&self, name: &str) -> TenetResult<&Group> {
        self.groups.get(name).ok_or_else(|| TenetError::UnknownGroup {
            component: self.name(),
            group: name.to_string(),
        })
    }

    /// Owner and group name this component is a member of
    pub fn container(&self) -> Option<(ComponentId, &str)> {
        self.container
            .as_ref()
            .map(|(owner, group)| (*owner, group.as_str()))
    }

    pub(crate) fn group_mut(&mut self, name: &str) -> TenetResult<&mut Group> {
        let component = self.name();
        self.groups
            .get_mut(name)
            .ok_or_else(|| TenetError::UnknownGroup {
                component,
                group: name.to_string(),
            })
    }

    pub(crate) fn set_container(&mut self, container: Option<(ComponentId, String)>) {
        self.container = container;
    }

    /// Write a field once, cast to its declared type
    pub(crate) fn set_field(
        &mut self,
        name: &str,
        value: Quantity,
        provenance: Option<Provenance>,
    ) -> TenetResult<()> {
        let component = self.name();
        let field = self
            .fields
            .get_mut(name)
            .ok_or_else(|| TenetError::UnknownField {
                component: component.clone(),
                field: name.to_string(),
            })?;
        if field.is_known() {
            return Err(TenetError::FieldAlreadyKnown {
                component,
                field: name.to_string(),
            });
        }
        field.value = Some(value.cast(&field.ty)?);
        field.provenance = provenance;
        Ok(())
    }
}
