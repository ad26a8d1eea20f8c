//! Binding requirement aliases to components
//!
//! Requirements are resolved one at a time in a greedy order: aliases that
//! are already bound are checked first, then owners that can be read off a
//! bound member, then requirements whose location is known. Candidates are
//! scanned in [`System::flattened`] order, so binding is deterministic for a
//! given graph and declaration order.

use crate::algebra::expression::{is_series, series_index, series_instance};
use crate::algebra::Bindings;
use crate::model::{ComponentId, System};
use crate::requirement::{Location, Requirement};
use crate::{ResourceLimits, TenetError, TenetResult};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{trace, warn};

/// Alias -> component, with series aliases stored per index (`m1`, `m2`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Binding(BTreeMap<String, ComponentId>);

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binding with only `alias` bound
    pub fn anchored(alias: impl Into<String>, component: ComponentId) -> Self {
        let mut binding = Self::new();
        binding.0.insert(alias.into(), component);
        binding
    }

    /// Bind `alias`; rebinding it to another component is a collision
    pub fn bind(&mut self, alias: impl Into<String>, component: ComponentId) -> TenetResult<()> {
        let alias = alias.into();
        match self.0.get(&alias) {
            Some(existing) if *existing != component => Err(TenetError::AliasCollision {
                alias,
                existing: existing.to_string(),
                requested: component.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.0.insert(alias, component);
                Ok(())
            }
        }
    }

    pub fn get(&self, alias: &str) -> Option<ComponentId> {
        self.0.get(alias).copied()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.0.contains_key(alias)
    }

    /// Components bound to `pattern#`, by index from 1 while contiguous
    pub fn series(&self, pattern: &str) -> Vec<ComponentId> {
        if !is_series(pattern) {
            return Vec::new();
        }
        (1..)
            .map_while(|index| self.get(&series_instance(pattern, index)))
            .collect()
    }

    /// Components bound to `alias`, one for a plain alias, all for a series
    pub fn bound_to(&self, alias: &str) -> Vec<ComponentId> {
        match self.get(alias) {
            Some(component) => vec![component],
            None => self.series(alias),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ComponentId)> {
        self.0.iter().map(|(alias, component)| (alias.as_str(), *component))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of this binding with aliases renamed through `renames`, which
    /// maps plain and series aliases alike
    pub(crate) fn renamed(&self, renames: &BTreeMap<String, String>) -> Binding {
        let rename = |alias: &str| -> String {
            if let Some(new) = renames.get(alias) {
                return new.clone();
            }
            for (old, new) in renames {
                if let Some(index) = series_index(old, alias) {
                    return series_instance(new, index);
                }
            }
            alias.to_string()
        };
        Binding(
            self.0
                .iter()
                .map(|(alias, component)| (rename(alias), *component))
                .collect(),
        )
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .0
            .iter()
            .map(|(alias, component)| format!("{}={}", alias, component))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

pub struct Matcher<'a> {
    system: &'a System,
    limits: &'a ResourceLimits,
}

impl<'a> Matcher<'a> {
    pub fn new(system: &'a System, limits: &'a ResourceLimits) -> Self {
        Self { system, limits }
    }

    /// Extend `initial` until every requirement's alias is bound
    pub fn bind(&self, requirements: &[Requirement], initial: Binding) -> TenetResult<Binding> {
        let mut binding = initial;
        let mut pending: Vec<&Requirement> = requirements.iter().collect();
        while !pending.is_empty() {
            let index = self.next_requirement(&pending, requirements, &binding);
            let requirement = pending.remove(index);
            self.resolve(requirement, requirements, &mut binding)?;
        }
        Ok(binding)
    }

    /// Values of every variable the requirements read, from the bound fields
    ///
    /// Series variables yield one value per bound index (`x#` -> `x1`, `x2`, ...).
    /// Optional variables are included only when their field is known.
    pub fn arguments(&self, requirements: &[Requirement], binding: &Binding) -> TenetResult<Bindings> {
        let mut arguments = Bindings::new();
        for requirement in requirements {
            let alias = requirement.alias();
            let targets: Vec<(Option<u32>, ComponentId)> = if requirement.is_select_all() {
                binding
                    .series(alias)
                    .into_iter()
                    .zip(1..)
                    .map(|(component, index)| (Some(index), component))
                    .collect()
            } else {
                let component = binding.get(alias).ok_or_else(|| self.unresolved(requirement, Vec::new()))?;
                vec![(None, component)]
            };

            for (index, id) in targets {
                let component = self.system.component(id)?;
                for (variable, field) in requirement.variables() {
                    let name = match index {
                        Some(index) => series_instance(variable, index),
                        None => variable.clone(),
                    };
                    match component.value(field) {
                        Some(value) => {
                            arguments.insert(name, value.clone());
                        }
                        None if requirement.is_optional(variable) => {}
                        None => return Err(self.unresolved(requirement, vec![field.clone()])),
                    }
                }
            }
        }
        Ok(arguments)
    }

    /// Greedy choice of the requirement to resolve next
    fn next_requirement(
        &self,
        pending: &[&Requirement],
        all: &[Requirement],
        binding: &Binding,
    ) -> usize {
        let bound = pending
            .iter()
            .position(|r| !r.is_select_all() && binding.contains(r.alias()));
        let inferable = || {
            pending.iter().position(|r| {
                !r.is_select_all() && self.member_of(r.alias(), all, binding).is_some()
            })
        };
        let located = || {
            pending.iter().position(|r| match r.location() {
                Location::Anywhere => true,
                Location::At { owner, .. } => !binding.bound_to(owner).is_empty(),
            })
        };
        bound.or_else(inferable).or_else(located).unwrap_or(0)
    }

    /// A bound requirement whose location names `owner`, with its component
    fn member_of<'r>(
        &self,
        owner: &str,
        all: &'r [Requirement],
        binding: &Binding,
    ) -> Option<(&'r Requirement, ComponentId)> {
        all.iter().find_map(|r| match r.location() {
            Location::At { owner: o, .. } if o == owner && !r.is_select_all() => {
                binding.get(r.alias()).map(|component| (r, component))
            }
            _ => None,
        })
    }

    fn resolve(
        &self,
        requirement: &Requirement,
        all: &[Requirement],
        binding: &mut Binding,
    ) -> TenetResult<()> {
        if requirement.is_select_all() {
            return self.resolve_all(requirement, all, binding);
        }
        let alias = requirement.alias();

        if let Some(component) = binding.get(alias) {
            if self.fits(requirement, component, all, binding) {
                trace!(alias, %component, "bound alias verified");
                return Ok(());
            }
            return Err(self.unresolved(requirement, self.missing(requirement, &[component])));
        }

        if let Some((member, component)) = self.member_of(alias, all, binding) {
            let group = match member.location() {
                Location::At { group, .. } => group.as_str(),
                Location::Anywhere => "",
            };
            return match self.system.container_of(component) {
                Some((owner, name))
                    if name == group && self.fits(requirement, owner, all, binding) =>
                {
                    trace!(alias, component = %owner, "owner inferred from member");
                    binding.bind(alias, owner)
                }
                Some((owner, _)) => {
                    Err(self.unresolved(requirement, self.missing(requirement, &[owner])))
                }
                None => Err(self.unresolved(requirement, Vec::new())),
            };
        }

        let candidates = self.candidates(requirement, binding);
        let mut iter = candidates.iter().copied();
        match self.next_candidate(requirement, &mut iter, &BTreeSet::new(), all, binding) {
            Some(component) => {
                trace!(alias, %component, "alias bound");
                binding.bind(alias, component)
            }
            None => Err(self.unresolved(requirement, self.missing(requirement, &candidates))),
        }
    }

    /// Bind `alias#` to every admissible candidate as indices `1..=n`
    fn resolve_all(
        &self,
        requirement: &Requirement,
        all: &[Requirement],
        binding: &mut Binding,
    ) -> TenetResult<()> {
        let alias = requirement.alias();
        let mut taken: BTreeSet<ComponentId> = BTreeSet::new();
        let mut index = 1u32;
        while let Some(component) = binding.get(&series_instance(alias, index)) {
            if !taken.insert(component) || !self.fits(requirement, component, all, binding) {
                return Err(self.unresolved(requirement, self.missing(requirement, &[component])));
            }
            index += 1;
        }

        let candidates = self.candidates(requirement, binding);
        let mut iter = candidates.iter().copied();
        while let Some(component) =
            self.next_candidate(requirement, &mut iter, &taken, all, binding)
        {
            if index as usize > self.limits.max_series_length {
                warn!(
                    alias,
                    limit = self.limits.max_series_length,
                    "series truncated at max_series_length"
                );
                break;
            }
            binding.bind(series_instance(alias, index), component)?;
            taken.insert(component);
            index += 1;
        }
        trace!(alias, count = index - 1, "series bound");
        Ok(())
    }

    /// The next admissible candidate, or `None` once the candidates run out
    fn next_candidate(
        &self,
        requirement: &Requirement,
        candidates: &mut impl Iterator<Item = ComponentId>,
        taken: &BTreeSet<ComponentId>,
        all: &[Requirement],
        binding: &Binding,
    ) -> Option<ComponentId> {
        candidates.find(|component| {
            !taken.contains(component) && self.fits(requirement, *component, all, binding)
        })
    }

    /// Components the requirement's location allows, in scan order
    fn candidates(&self, requirement: &Requirement, binding: &Binding) -> Vec<ComponentId> {
        match requirement.location() {
            Location::Anywhere => self.system.flattened(),
            Location::At { owner, group } => binding
                .bound_to(owner)
                .into_iter()
                .filter_map(|owner| self.system.get_subcomponent_group(owner, group).ok())
                .flat_map(|group| group.members().iter().copied())
                .collect(),
        }
    }

    /// Class, location, distinctness, field and predicate constraints
    fn fits(
        &self,
        requirement: &Requirement,
        id: ComponentId,
        all: &[Requirement],
        binding: &Binding,
    ) -> bool {
        let Ok(component) = self.system.component(id) else {
            return false;
        };
        if !self.system.is_instance(id, requirement.class()) {
            return false;
        }
        if let Location::At { owner, group } = requirement.location() {
            let owners = binding.bound_to(owner);
            if !owners.is_empty() {
                match self.system.container_of(id) {
                    Some((container, name)) if name == group && owners.contains(&container) => {}
                    _ => return false,
                }
            }
        }
        if self.overlaps(requirement, id, all, binding) {
            return false;
        }
        requirement.admits(component)
    }

    /// Whether `id` is already bound to an alias that must stay distinct
    /// from `requirement`, whichever side declared it
    fn overlaps(
        &self,
        requirement: &Requirement,
        id: ComponentId,
        all: &[Requirement],
        binding: &Binding,
    ) -> bool {
        let alias = requirement.alias();
        let declared = requirement.distinct().iter().map(String::as_str);
        let declaring = all
            .iter()
            .filter(|other| other.alias() != alias && other.distinct().contains(alias))
            .map(Requirement::alias);
        declared
            .chain(declaring)
            .any(|other| binding.bound_to(other).contains(&id))
    }

    /// Known-field gaps of the class-compatible candidates, for error reports
    fn missing(&self, requirement: &Requirement, candidates: &[ComponentId]) -> Vec<String> {
        let mut missing = BTreeSet::new();
        for id in candidates {
            if !self.system.is_instance(*id, requirement.class()) {
                continue;
            }
            if let Ok(component) = self.system.component(*id) {
                missing.extend(requirement.missing_fields(component));
            }
        }
        missing.into_iter().collect()
    }

    fn unresolved(&self, requirement: &Requirement, missing: Vec<String>) -> TenetError {
        TenetError::Unresolved {
            alias: requirement.alias().to_string(),
            class: requirement.class_name().to_string(),
            location: requirement.location().to_string(),
            missing,
        }
    }
}
