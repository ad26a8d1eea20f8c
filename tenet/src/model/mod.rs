//! Component model: classes, instances, fields and groups

pub mod class;
pub mod component;
pub mod system;
pub mod transaction;

pub use class::{ClassDeclaration, ClassId, ClassRegistry, ComponentClass, GroupDeclaration, GroupTemplate};
pub use component::{Component, ComponentId, Field, Group, Provenance};
pub use system::System;
pub use transaction::Transaction;
