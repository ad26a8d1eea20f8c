//! Atomic changes to the component graph
//!
//! A transaction records operations and applies them on [`Transaction::commit`]
//! to a staged copy of the components. The graph is only replaced once every
//! operation succeeded and every touched group is within its bounds, so a
//! failed or dropped transaction leaves no trace.

use super::component::{Component, ComponentId, Provenance};
use super::system::System;
use crate::quantity::Quantity;
use crate::{TenetError, TenetResult};
use std::collections::BTreeSet;
use tracing::trace;

#[derive(Debug, Clone)]
enum Operation {
    Add {
        owner: ComponentId,
        group: String,
        member: ComponentId,
    },
    Remove {
        owner: ComponentId,
        group: String,
        member: ComponentId,
    },
    SetField {
        component: ComponentId,
        field: String,
        value: Quantity,
        provenance: Option<Provenance>,
    },
}

pub struct Transaction<'a> {
    system: &'a mut System,
    operations: Vec<Operation>,
}

impl<'a> Transaction<'a> {
    pub(super) fn new(system: &'a mut System) -> Self {
        Self {
            system,
            operations: Vec::new(),
        }
    }

    pub fn add_to_group(&mut self, owner: ComponentId, group: &str, member: ComponentId) -> &mut Self {
        self.operations.push(Operation::Add {
            owner,
            group: group.to_string(),
            member,
        });
        self
    }

    pub fn remove_from_group(
        &mut self,
        owner: ComponentId,
        group: &str,
        member: ComponentId,
    ) -> &mut Self {
        self.operations.push(Operation::Remove {
            owner,
            group: group.to_string(),
            member,
        });
        self
    }

    /// Give an unknown field a value from outside the engine
    pub fn set_field(&mut self, component: ComponentId, field: &str, value: Quantity) -> &mut Self {
        self.operations.push(Operation::SetField {
            component,
            field: field.to_string(),
            value,
            provenance: None,
        });
        self
    }

    pub fn set_field_with_provenance(
        &mut self,
        component: ComponentId,
        field: &str,
        value: Quantity,
        provenance: Provenance,
    ) -> &mut Self {
        self.operations.push(Operation::SetField {
            component,
            field: field.to_string(),
            value,
            provenance: Some(provenance),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn commit(self) -> TenetResult<()> {
        let mut staged = self.system.components.clone();
        let mut touched: BTreeSet<(ComponentId, String)> = BTreeSet::new();

        for operation in self.operations {
            match operation {
                Operation::Add {
                    owner,
                    group,
                    member,
                } => {
                    add(self.system, &mut staged, owner, &group, member)?;
                    touched.insert((owner, group));
                }
                Operation::Remove {
                    owner,
                    group,
                    member,
                } => {
                    let removed = lookup(&mut staged, owner)?
                        .group_mut(&group)?
                        .remove(member);
                    if !removed {
                        return Err(TenetError::Declaration(format!(
                            "{} is not a member of group '{}' of {}",
                            member, group, owner
                        )));
                    }
                    lookup(&mut staged, member)?.set_container(None);
                    touched.insert((owner, group));
                }
                Operation::SetField {
                    component,
                    field,
                    value,
                    provenance,
                } => {
                    lookup(&mut staged, component)?.set_field(&field, value, provenance)?;
                }
            }
        }

        for (owner, group_name) in &touched {
            let component = lookup(&mut staged, *owner)?;
            let name = component.name();
            let group = component.group(group_name)?;
            if !group.within_bounds() {
                return Err(TenetError::GroupBounds {
                    component: name,
                    group: group_name.clone(),
                    size: group.len(),
                    min: group.min(),
                    max: group.max().unwrap_or(usize::MAX),
                });
            }
        }

        trace!(groups = touched.len(), "transaction committed");
        self.system.components = staged;
        Ok(())
    }
}

fn lookup(staged: &mut [Component], id: ComponentId) -> TenetResult<&mut Component> {
    staged
        .get_mut(id.0)
        .ok_or_else(|| TenetError::UnknownComponent(id.to_string()))
}

fn add(
    system: &System,
    staged: &mut [Component],
    owner: ComponentId,
    group: &str,
    member: ComponentId,
) -> TenetResult<()> {
    let member_class = lookup(staged, member)?.class();
    let group_class = lookup(staged, owner)?.group(group)?.class();
    if !system.classes().is_subclass(member_class, group_class) {
        return Err(TenetError::Declaration(format!(
            "{} is not a '{}' and cannot join group '{}'",
            member,
            system.classes().get(group_class).name(),
            group
        )));
    }

    if let Some((container, name)) = lookup(staged, member)?.container() {
        return Err(TenetError::Declaration(format!(
            "{} already belongs to group '{}' of {}",
            member, name, container
        )));
    }

    // The member must not contain its new owner
    let mut cursor = Some(owner);
    while let Some(current) = cursor {
        if current == member {
            return Err(TenetError::Declaration(format!(
                "Adding {} to {} would make it contain itself",
                member, owner
            )));
        }
        cursor = lookup(staged, current)?.container().map(|(container, _)| container);
    }

    lookup(staged, owner)?.group_mut(group)?.insert(member);
    lookup(staged, member)?.set_container(Some((owner, group.to_string())));
    Ok(())
}
