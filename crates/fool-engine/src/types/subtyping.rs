//! Subtyping rules for the FOOL type system
//!
//! Implements the subtyping relation T <: U (T is a subtype of U) and the
//! lowest-common-ancestor search used to unify the branches of a conditional.

use rustc_hash::FxHashMap;

use super::ty::{ArrowType, Type};

/// Read access to the declared superclass of each class
///
/// Implemented by the class registry built during scope resolution.
pub trait ClassHierarchy {
    /// Declared superclass of `class`, if any
    fn superclass(&self, class: &str) -> Option<&str>;
}

impl ClassHierarchy for FxHashMap<String, String> {
    fn superclass(&self, class: &str) -> Option<&str> {
        self.get(class).map(String::as_str)
    }
}

/// Context for checking subtyping relationships
#[derive(Debug)]
pub struct SubtypingContext<'a, H: ClassHierarchy + ?Sized> {
    hierarchy: &'a H,
}

impl<'a, H: ClassHierarchy + ?Sized> SubtypingContext<'a, H> {
    /// Create a new subtyping context over a class hierarchy
    pub fn new(hierarchy: &'a H) -> Self {
        SubtypingContext { hierarchy }
    }

    /// Check if `sub` is a subtype of `sup` (sub <: sup)
    ///
    /// Returns true if a value of type `sub` can be used where `sup` is expected.
    pub fn is_subtype(&self, sub: &Type, sup: &Type) -> bool {
        match (sub, sup) {
            (Type::Int, Type::Int) | (Type::Bool, Type::Bool) | (Type::Empty, Type::Empty) => true,

            // Booleans are the integers 0 and 1
            (Type::Bool, Type::Int) => true,

            // null inhabits every class reference type
            (Type::Empty, Type::Ref(_)) => true,

            (Type::Ref(sub_class), Type::Ref(sup_class)) => self.inherits_from(sub_class, sup_class),

            (Type::Arrow(sub_arrow), Type::Arrow(sup_arrow))
            | (Type::Method(sub_arrow), Type::Method(sup_arrow)) => {
                self.is_arrow_subtype(sub_arrow, sup_arrow)
            }

            (Type::Class(sub_class), Type::Class(sup_class)) => sub_class == sup_class,

            _ => false,
        }
    }

    /// Arrow subtyping: covariant return, contravariant parameters
    pub fn is_arrow_subtype(&self, sub: &ArrowType, sup: &ArrowType) -> bool {
        sub.arity() == sup.arity()
            && self.is_subtype(&sub.ret, &sup.ret)
            && sub
                .params
                .iter()
                .zip(&sup.params)
                .all(|(sub_param, sup_param)| self.is_subtype(sup_param, sub_param))
    }

    /// Whether `ancestor` is reachable from `class` by following superclass links
    ///
    /// Reflexive: every class inherits from itself.
    pub fn inherits_from(&self, class: &str, ancestor: &str) -> bool {
        self.ancestors(class).any(|c| c == ancestor)
    }

    /// `class` followed by its superclass chain, nearest first
    pub fn ancestors<'s>(&'s self, class: &'s str) -> impl Iterator<Item = &'s str> + 's {
        std::iter::successors(Some(class), move |current| self.hierarchy.superclass(current))
    }

    /// Lowest common ancestor of two types, when one exists
    ///
    /// For class references (or `null`), walks the ancestor chain of `a` until a
    /// class is found that `b` is a subtype of. For int/bool, the result is int
    /// when either side is int. There is no universal root class, so two
    /// unrelated hierarchies have no common ancestor.
    pub fn lowest_common_ancestor(&self, a: &Type, b: &Type) -> Option<Type> {
        match (a, b) {
            (Type::Empty, Type::Empty) => Some(Type::Empty),
            (Type::Empty, Type::Ref(_)) => Some(b.clone()),
            (Type::Ref(_), Type::Empty) => Some(a.clone()),
            (Type::Ref(class), Type::Ref(_)) => self
                .ancestors(class)
                .map(|ancestor| Type::Ref(ancestor.to_string()))
                .find(|candidate| self.is_subtype(b, candidate)),
            (Type::Int | Type::Bool, Type::Int | Type::Bool) => {
                if *a == Type::Int || *b == Type::Int {
                    Some(Type::Int)
                } else {
                    Some(Type::Bool)
                }
            }
            _ => None,
        }
    }
}
