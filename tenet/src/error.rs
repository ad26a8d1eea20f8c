use thiserror::Error;

/// Error types for the Tenet engine
///
/// Failures fall into two families. Recoverable ones describe why a single
/// candidate formula does not apply (the resolver moves on to the next one);
/// the rest are contract violations or lookups of things that do not exist.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TenetError {
    /// A formula's shape does not fit the requested field and component
    #[error("Formula '{formula}' does not apply: {reason}")]
    StructuralMismatch { formula: String, reason: String },

    /// No component satisfies a requirement
    #[error(
        "No component satisfies requirement '{alias}' ({class}) {location}{}",
        format_missing(.missing)
    )]
    Unresolved {
        alias: String,
        class: String,
        location: String,
        missing: Vec<String>,
    },

    /// One alias would be bound to two different components
    #[error("Alias '{alias}' is already bound to {existing}, cannot rebind it to {requested}")]
    AliasCollision {
        alias: String,
        existing: String,
        requested: String,
    },

    /// Two aliases or variables collide while merging or renaming
    #[error("Naming conflict: {0}")]
    NamingConflict(String),

    /// The variable cannot be isolated by closed-form inversion
    #[error("Cannot isolate '{variable}': {reason}")]
    Unsolvable { variable: String, reason: String },

    /// A variable has no value in the evaluation bindings
    #[error("Missing variable: {0}")]
    MissingVariable(String),

    #[error("Unit mismatch: cannot combine {left} with {right}")]
    UnitMismatch { left: String, right: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// A value cannot be cast to the declared field type
    #[error("Cannot cast {value} to {target}")]
    Cast { value: String, target: String },

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Component {component} has no field '{field}'")]
    UnknownField { component: String, field: String },

    #[error("Component {component} has no group '{group}'")]
    UnknownGroup { component: String, group: String },

    /// Fields are written at most once
    #[error("Field '{field}' of {component} is already known")]
    FieldAlreadyKnown { component: String, field: String },

    #[error("Group '{group}' of {component} would hold {size} members, allowed range is {min}..={max}")]
    GroupBounds {
        component: String,
        group: String,
        size: usize,
        min: usize,
        max: usize,
    },

    /// Every formula of the knowledge base was tried and none applied
    #[error("No formula can compute '{field}' of {component} ({} candidates tried)", .attempts.len())]
    NoApplicableFormula {
        component: String,
        field: String,
        attempts: Vec<TenetError>,
    },

    /// A formula depends on its own output through composition
    #[error("Circular composition: {0}")]
    Cycle(String),

    #[error("Composition nested deeper than {0} formulas")]
    CompositionDepth(usize),

    /// A declaration breaks a construction-time contract
    #[error("Invalid declaration: {0}")]
    Declaration(String),
}

impl TenetError {
    /// Whether this failure only rules out the current candidate formula
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TenetError::StructuralMismatch { .. }
                | TenetError::Unresolved { .. }
                | TenetError::AliasCollision { .. }
                | TenetError::NamingConflict(_)
                | TenetError::Unsolvable { .. }
                | TenetError::MissingVariable(_)
                | TenetError::UnitMismatch { .. }
                | TenetError::DivisionByZero
                | TenetError::Arithmetic(_)
                | TenetError::Cast { .. }
                | TenetError::Cycle(_)
                | TenetError::CompositionDepth(_)
        )
    }

    pub fn mismatch(formula: impl Into<String>, reason: impl Into<String>) -> Self {
        TenetError::StructuralMismatch {
            formula: formula.into(),
            reason: reason.into(),
        }
    }

    pub fn unsolvable(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        TenetError::Unsolvable {
            variable: variable.into(),
            reason: reason.into(),
        }
    }
}

fn format_missing(missing: &[String]) -> String {
    if missing.is_empty() {
        String::new()
    } else {
        format!(" (needs known fields: {})", missing.join(", "))
    }
}
