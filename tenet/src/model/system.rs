use super::class::{ClassDeclaration, ClassId, ClassRegistry};
use super::component::{Component, ComponentId, Field, Group};
use super::transaction::Transaction;
use crate::{TenetError, TenetResult};
use std::collections::{BTreeMap, HashMap};

/// The component graph: declared classes and every instance
#[derive(Debug, Clone, Default)]
pub struct System {
    classes: ClassRegistry,
    pub(super) components: Vec<Component>,
    labels: HashMap<String, ComponentId>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn declare_class(&mut self, declaration: ClassDeclaration) -> TenetResult<ClassId> {
        self.classes.declare(declaration)
    }

    /// Instantiate a class with every field unknown and every group empty
    pub fn create_component(&mut self, class: &str, label: Option<&str>) -> TenetResult<ComponentId> {
        let class_id = self.classes.lookup(class)?;
        let template = self.classes.get(class_id);
        if template.is_abstract() {
            return Err(TenetError::Declaration(format!(
                "Class '{}' is abstract and cannot be instantiated",
                class
            )));
        }
        if let Some(label) = label {
            if self.labels.contains_key(label) {
                return Err(TenetError::Declaration(format!(
                    "Component label '{}' is already in use",
                    label
                )));
            }
        }

        let fields: BTreeMap<String, Field> = template
            .fields()
            .iter()
            .map(|(name, ty)| (name.clone(), Field::new(ty.clone())))
            .collect();
        let groups: BTreeMap<String, Group> = template
            .groups()
            .iter()
            .map(|(name, group)| (name.clone(), Group::new(group.class, group.min, group.max)))
            .collect();

        let id = ComponentId(self.components.len());
        self.components.push(Component::new(
            id,
            class_id,
            label.map(str::to_string),
            fields,
            groups,
        ));
        if let Some(label) = label {
            self.labels.insert(label.to_string(), id);
        }
        Ok(id)
    }

    pub fn component(&self, id: ComponentId) -> TenetResult<&Component> {
        self.components
            .get(id.0)
            .ok_or_else(|| TenetError::UnknownComponent(id.to_string()))
    }

    pub fn component_by_label(&self, label: &str) -> TenetResult<ComponentId> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| TenetError::UnknownComponent(label.to_string()))
    }

    /// Every component, in creation order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    /// Every component, depth first from the top-level ones
    ///
    /// Top-level components come in creation order and group members follow
    /// their owner, group by group. This is the scan order of the matcher.
    pub fn flattened(&self) -> Vec<ComponentId> {
        let mut order = Vec::with_capacity(self.components.len());
        let mut stack: Vec<ComponentId> = self
            .components
            .iter()
            .rev()
            .filter(|component| component.container().is_none())
            .map(Component::id)
            .collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(component) = self.components.get(id.0) {
                for group in component.groups().values().rev() {
                    stack.extend(group.members().iter().rev().copied());
                }
            }
        }
        order
    }

    pub fn container_of(&self, id: ComponentId) -> Option<(ComponentId, &str)> {
        self.components.get(id.0).and_then(Component::container)
    }

    pub fn is_instance(&self, id: ComponentId, class: ClassId) -> bool {
        self.components
            .get(id.0)
            .is_some_and(|component| self.classes.is_subclass(component.class(), class))
    }

    pub fn get_field(&self, id: ComponentId, field: &str) -> TenetResult<&Field> {
        self.component(id)?.field(field)
    }

    pub fn get_subcomponent_group(&self, id: ComponentId, group: &str) -> TenetResult<&Group> {
        self.component(id)?.group(group)
    }

    /// Name used in messages: the label, or the id
    pub fn describe(&self, id: ComponentId) -> String {
        self.components
            .get(id.0)
            .map(Component::name)
            .unwrap_or_else(|| id.to_string())
    }

    /// Stage group and field changes that apply together on commit
    pub fn transaction(&mut self) -> Transaction<'_> {
        Transaction::new(self)
    }
}
