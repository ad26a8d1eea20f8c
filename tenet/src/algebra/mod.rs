//! Expression algebra: trees, simplification, isolation and evaluation

mod binomial;
pub mod evaluate;
pub mod expression;
pub mod isolate;
pub mod simplify;

pub use evaluate::Bindings;
pub use expression::{is_series, series_index, series_instance, Expression, Function, SERIES_MARK};
pub use isolate::{Inverse, Isolation};
pub use simplify::Simplifier;
