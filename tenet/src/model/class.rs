//! Component classes
//!
//! Classes form an inheritance graph: a class holds its own fields and
//! groups plus everything its parents declare.

use crate::quantity::FieldType;
use crate::{TenetError, TenetResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(usize);

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// A group as declared on a class: members of `class`, between `min` and `max`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDeclaration {
    pub class: String,
    #[serde(default)]
    pub min: usize,
    #[serde(default)]
    pub max: Option<usize>,
}

/// A class as declared, before parents and group classes are resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDeclaration {
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldType>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupDeclaration>,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

impl ClassDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            fields: BTreeMap::new(),
            groups: BTreeMap::new(),
            is_abstract: false,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    pub fn with_group(
        mut self,
        name: impl Into<String>,
        class: impl Into<String>,
        min: usize,
        max: Option<usize>,
    ) -> Self {
        self.groups.insert(
            name.into(),
            GroupDeclaration {
                class: class.into(),
                min,
                max,
            },
        );
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

/// Resolved group template of a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTemplate {
    pub class: ClassId,
    pub min: usize,
    pub max: Option<usize>,
}

/// A declared class with its inherited fields and groups flattened in
#[derive(Debug, Clone)]
pub struct ComponentClass {
    id: ClassId,
    name: String,
    ancestors: BTreeSet<ClassId>,
    fields: BTreeMap<String, FieldType>,
    groups: BTreeMap<String, GroupTemplate>,
    is_abstract: bool,
}

impl ComponentClass {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this class is `other` or inherits from it
    pub fn is_a(&self, other: ClassId) -> bool {
        self.ancestors.contains(&other)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldType> {
        &self.fields
    }

    pub fn field_type(&self, field: &str) -> Option<&FieldType> {
        self.fields.get(field)
    }

    pub fn groups(&self) -> &BTreeMap<String, GroupTemplate> {
        &self.groups
    }

    pub fn group(&self, group: &str) -> Option<&GroupTemplate> {
        self.groups.get(group)
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// Arena of declared classes
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: Vec<ComponentClass>,
    by_name: HashMap<String, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class; parents and group classes must already exist,
    /// except a group may hold members of the class being declared
    pub fn declare(&mut self, declaration: ClassDeclaration) -> TenetResult<ClassId> {
        if self.by_name.contains_key(&declaration.name) {
            return Err(TenetError::Declaration(format!(
                "Class '{}' is declared twice",
                declaration.name
            )));
        }
        let id = ClassId(self.classes.len());

        let mut ancestors = BTreeSet::from([id]);
        let mut fields: BTreeMap<String, FieldType> = BTreeMap::new();
        let mut groups: BTreeMap<String, GroupTemplate> = BTreeMap::new();

        for parent_name in &declaration.parents {
            let parent = self.get(self.lookup(parent_name)?);
            ancestors.extend(parent.ancestors.iter().copied());
            for (name, ty) in &parent.fields {
                inherit(&mut fields, name, ty.clone(), &declaration.name, "field")?;
            }
            for (name, template) in &parent.groups {
                inherit(&mut groups, name, template.clone(), &declaration.name, "group")?;
            }
        }

        for (name, ty) in declaration.fields {
            inherit(&mut fields, &name, ty, &declaration.name, "field")?;
        }

        for (name, group) in declaration.groups {
            let class = if group.class == declaration.name {
                id
            } else {
                self.lookup(&group.class)?
            };
            if group.max.is_some_and(|max| max < group.min) {
                return Err(TenetError::Declaration(format!(
                    "Group '{}' of class '{}' has max below min",
                    name, declaration.name
                )));
            }
            let template = GroupTemplate {
                class,
                min: group.min,
                max: group.max,
            };
            inherit(&mut groups, &name, template, &declaration.name, "group")?;
        }

        self.classes.push(ComponentClass {
            id,
            name: declaration.name.clone(),
            ancestors,
            fields,
            groups,
            is_abstract: declaration.is_abstract,
        });
        self.by_name.insert(declaration.name, id);
        Ok(id)
    }

    pub fn lookup(&self, name: &str) -> TenetResult<ClassId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TenetError::UnknownClass(name.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<&ComponentClass> {
        self.by_name.get(name).map(|id| self.get(*id))
    }

    /// Class by id
    ///
    /// Ids are only handed out by this registry, so every id indexes a class.
    pub fn get(&self, id: ClassId) -> &ComponentClass {
        &self.classes[id.0]
    }

    pub fn is_subclass(&self, class: ClassId, of: ClassId) -> bool {
        self.get(class).is_a(of)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentClass> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

// Same name from two sources must agree
fn inherit<T: PartialEq>(
    into: &mut BTreeMap<String, T>,
    name: &str,
    value: T,
    class: &str,
    kind: &str,
) -> TenetResult<()> {
    match into.get(name) {
        Some(existing) if *existing != value => Err(TenetError::Declaration(format!(
            "Class '{}' inherits conflicting declarations of {} '{}'",
            class, kind, name
        ))),
        Some(_) => Ok(()),
        None => {
            into.insert(name.to_string(), value);
            Ok(())
        }
    }
}
