//! # Tenet Engine
//!
//! **Fill in what the formulas already know**
//!
//! Tenet is an inference engine over typed components. A knowledge base of
//! algebraic formulas describes how fields relate; the engine finds the
//! formula that can compute an unknown field, solves it for that field if
//! needed, binds its variables to concrete components and evaluates it.
//!
//! ## Quick Start
//!
//! ```rust
//! use tenet::{ClassDeclaration, Engine, Expression, FieldType, Formula, Output, Quantity, TenetResult};
//!
//! fn main() -> TenetResult<()> {
//!     let mut engine = Engine::new();
//!     engine.declare_class(
//!         ClassDeclaration::new("Body")
//!             .with_field("mass", FieldType::Number)
//!             .with_field("weight", FieldType::Number),
//!     )?;
//!
//!     // weight = mass * 9.81
//!     let body = engine
//!         .requirement("b", "Body")?
//!         .with_variable("m", "mass")?
//!         .with_variable("w", "weight")?;
//!     let gravity = Expression::constant("9.81".parse()?);
//!     engine.add_formula(Formula::new(
//!         "weight",
//!         vec![body],
//!         Output::new("w", "b", "weight"),
//!         Expression::var("m") * gravity,
//!     )?)?;
//!
//!     let rock = engine.create_component("Body", Some("rock"))?;
//!     let mut transaction = engine.transaction();
//!     transaction.set_field(rock, "weight", "19.62".parse()?);
//!     transaction.commit()?;
//!
//!     // Solved for mass: m = w / 9.81
//!     let resolution = engine.fill(rock, "mass")?;
//!     assert_eq!(resolution.value, Quantity::from(2));
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Components
//! Instances of classes with typed fields, each written at most once, and
//! bounded groups of sub-components.
//!
//! ### Requirements
//! Patterns that bind a formula's aliases to components: by class, by
//! location in a group, by which fields are known.
//!
//! ### Formulas
//! An equation with one output variable. Any other variable can become the
//! output by algebraic isolation, and inputs that were themselves computed
//! are composed into the equation.

pub mod algebra;
pub mod declaration;
pub mod engine;
pub mod error;
pub mod formula;
pub mod knowledge;
pub mod matcher;
pub mod model;
pub mod quantity;
pub mod requirement;
pub mod resolver;
pub mod resource_limits;

pub use algebra::{Bindings, Expression, Function, Inverse, Isolation, Simplifier};
pub use declaration::{
    ComponentDeclaration, Declarations, FormulaDeclaration, RequirementDeclaration, ValueDeclaration,
};
pub use engine::Engine;
pub use error::TenetError;
pub use formula::{Equation, Formula, Obtention, Output};
pub use knowledge::KnowledgeBase;
pub use matcher::{Binding, Matcher};
pub use model::{
    ClassDeclaration, ClassId, ClassRegistry, Component, ComponentClass, ComponentId, Field, Group,
    GroupDeclaration, Provenance, System, Transaction,
};
pub use quantity::{FieldType, Quantity, Unit};
pub use requirement::{Location, Predicate, Requirement};
pub use resolver::{Resolution, Resolver};
pub use resource_limits::ResourceLimits;

/// Result type for Tenet operations
pub type TenetResult<T> = Result<T, TenetError>;

#[cfg(test)]
mod tests;
