use crate::algebra::Bindings;
use crate::declaration::{ComponentDeclaration, Declarations};
use crate::formula::Formula;
use crate::knowledge::KnowledgeBase;
use crate::matcher::{Binding, Matcher};
use crate::model::{
    ClassDeclaration, ClassId, Component, ComponentId, Field, Group, Provenance, System, Transaction,
};
use crate::quantity::Quantity;
use crate::requirement::Requirement;
use crate::resolver::{Resolution, Resolver};
use crate::{ResourceLimits, TenetError, TenetResult};
use std::sync::Arc;
use tracing::{info, warn};

/// The Tenet inference engine.
///
/// Owns the component graph and the knowledge base, and fills unknown
/// fields from the formulas it knows.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    system: System,
    knowledge: KnowledgeBase,
    limits: ResourceLimits,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom resource limits
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self {
            system: System::new(),
            knowledge: KnowledgeBase::new(),
            limits,
        }
    }

    /// Get the current resource limits
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn declare_class(&mut self, declaration: ClassDeclaration) -> TenetResult<ClassId> {
        self.system.declare_class(declaration)
    }

    /// Start a requirement on a declared class
    pub fn requirement(&self, alias: &str, class: &str) -> TenetResult<Requirement> {
        let class = self.class(class)?;
        Requirement::new(alias, self.system.classes().get(class))
    }

    /// Start a `selectAll` requirement on a declared class
    pub fn select_all(&self, alias: &str, class: &str) -> TenetResult<Requirement> {
        let class = self.class(class)?;
        Requirement::select_all(alias, self.system.classes().get(class))
    }

    fn class(&self, name: &str) -> TenetResult<ClassId> {
        self.system.classes().lookup(name)
    }

    /// Declare classes and formulas and create components, in that order
    ///
    /// Group memberships and given field values of the new components are
    /// applied in one transaction.
    pub fn load(&mut self, declarations: Declarations) -> TenetResult<()> {
        for class in declarations.classes {
            self.declare_class(class)?;
        }
        for formula in &declarations.formulas {
            let formula = formula.build(self.system.classes())?;
            self.add_formula(formula)?;
        }

        let mut staged = Staged::default();
        for component in &declarations.components {
            self.instantiate(component, &mut staged)?;
        }
        let mut transaction = self.system.transaction();
        for (owner, group, member) in &staged.memberships {
            transaction.add_to_group(*owner, group, *member);
        }
        for (component, field, value) in staged.values {
            transaction.set_field(component, &field, value);
        }
        transaction.commit()
    }

    pub fn load_json(&mut self, json: &str) -> TenetResult<()> {
        self.load(Declarations::from_json(json)?)
    }

    fn instantiate(
        &mut self,
        declaration: &ComponentDeclaration,
        staged: &mut Staged,
    ) -> TenetResult<ComponentId> {
        let id = self.create_component(&declaration.class, Some(&declaration.label))?;
        for (field, value) in &declaration.fields {
            staged.values.push((id, field.clone(), value.to_quantity()?));
        }
        for (group, members) in &declaration.groups {
            for member in members {
                let member = self.instantiate(member, staged)?;
                staged.memberships.push((id, group.clone(), member));
            }
        }
        Ok(id)
    }

    pub fn create_component(&mut self, class: &str, label: Option<&str>) -> TenetResult<ComponentId> {
        self.system.create_component(class, label)
    }

    pub fn add_formula(&mut self, formula: Formula) -> TenetResult<Arc<Formula>> {
        self.knowledge.add(formula)
    }

    pub fn component(&self, id: ComponentId) -> TenetResult<&Component> {
        self.system.component(id)
    }

    pub fn component_by_label(&self, label: &str) -> TenetResult<ComponentId> {
        self.system.component_by_label(label)
    }

    pub fn get_field(&self, component: ComponentId, field: &str) -> TenetResult<&Field> {
        self.system.get_field(component, field)
    }

    pub fn get_subcomponent_group(&self, component: ComponentId, group: &str) -> TenetResult<&Group> {
        self.system.get_subcomponent_group(component, group)
    }

    /// Stage group membership and field changes
    pub fn transaction(&mut self) -> Transaction<'_> {
        self.system.transaction()
    }

    /// Bind every alias of `requirements`, extending `initial`
    pub fn bind(&self, requirements: &[Requirement], initial: Binding) -> TenetResult<Binding> {
        Matcher::new(&self.system, &self.limits).bind(requirements, initial)
    }

    /// Field values of every variable `requirements` read under `binding`
    pub fn arguments(&self, requirements: &[Requirement], binding: &Binding) -> TenetResult<Bindings> {
        Matcher::new(&self.system, &self.limits).arguments(requirements, binding)
    }

    /// Compute an unknown field without storing it
    pub fn resolve(&self, component: ComponentId, field: &str) -> TenetResult<Resolution> {
        Resolver::new(&self.system, &self.knowledge, &self.limits).fill(component, field)
    }

    /// Compute an unknown field and store it with its formula as provenance
    pub fn fill(&mut self, component: ComponentId, field: &str) -> TenetResult<Resolution> {
        let resolution = self.resolve(component, field)?;
        let mut transaction = self.system.transaction();
        transaction.set_field_with_provenance(
            component,
            field,
            resolution.value.clone(),
            Provenance::Formula(Arc::clone(&resolution.provenance)),
        );
        transaction.commit()?;
        info!(
            component = %self.system.describe(component),
            field,
            value = %resolution.value,
            equation = resolution.equation.as_str(),
            "field filled"
        );
        Ok(resolution)
    }

    /// Fill every field some formula can compute
    ///
    /// Runs in rounds over all unknown fields until a round fills nothing,
    /// so values computed in one round feed the formulas of the next.
    pub fn solve(&mut self) -> TenetResult<Vec<Resolution>> {
        let mut filled = Vec::new();
        for round in 1..=self.limits.max_saturation_rounds {
            let unknown: Vec<(ComponentId, String)> = self
                .system
                .flattened()
                .into_iter()
                .filter_map(|id| self.system.component(id).ok())
                .flat_map(|component| {
                    component
                        .fields()
                        .iter()
                        .filter(|(_, field)| !field.is_known())
                        .map(|(name, _)| (component.id(), name.clone()))
                        .collect::<Vec<_>>()
                })
                .collect();

            let before = filled.len();
            for (component, field) in unknown {
                match self.fill(component, &field) {
                    Ok(resolution) => filled.push(resolution),
                    Err(TenetError::NoApplicableFormula { .. }) => {}
                    Err(error) if error.is_recoverable() => {}
                    Err(error) => return Err(error),
                }
            }
            if filled.len() == before {
                return Ok(filled);
            }
            if round == self.limits.max_saturation_rounds {
                warn!(rounds = round, "solve stopped at max_saturation_rounds");
            }
        }
        Ok(filled)
    }
}

#[derive(Default)]
struct Staged {
    memberships: Vec<(ComponentId, String, ComponentId)>,
    values: Vec<(ComponentId, String, Quantity)>,
}
