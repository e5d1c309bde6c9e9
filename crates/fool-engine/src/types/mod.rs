//! Type system for FOOL
//!
//! Nominal class types with single inheritance, structural arrow types, and
//! the subtyping relation used by the type checker:
//!
//! - `ty`: the [`Type`] representation
//! - `subtyping`: the subtype relation and lowest-common-ancestor search

pub mod subtyping;
pub mod ty;

pub use subtyping::{ClassHierarchy, SubtypingContext};
pub use ty::{ArrowType, ClassType, Type};
