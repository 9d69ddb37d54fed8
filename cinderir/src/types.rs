//! Opaque type values attached to arguments, instructions and function
//! signatures.
//!
//! The container core does not interpret types; it only needs them to be
//! comparable and substitutable so that generic/template-style resolution
//! passes can rewrite a whole function in one sweep.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// The subtype of every type. Fresh functions return `Bottom` until a
    /// real return type is assigned.
    #[default]
    Bottom,

    /// An opaque nominal type, compared by name.
    Named(String),

    /// An ordered aggregate of element types.
    Tuple(Vec<Type>),
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    /// Substitute every occurrence of `from` (including nested occurrences
    /// inside aggregates) with a copy of `to`.
    pub fn replace(&mut self, from: &Type, to: &Type) {
        if self == from {
            *self = to.clone();
            return;
        }

        if let Type::Tuple(elements) = self {
            for element in elements {
                element.replace(from, to);
            }
        }
    }
}

impl From<&str> for Type {
    fn from(name: &str) -> Self {
        Type::Named(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_rewrites_nested_aggregates() {
        let mut ty = Type::Tuple(vec![
            Type::named("T"),
            Type::Tuple(vec![Type::named("T"), Type::named("u8")]),
        ]);

        ty.replace(&Type::named("T"), &Type::named("i32"));

        assert_eq!(
            ty,
            Type::Tuple(vec![
                Type::named("i32"),
                Type::Tuple(vec![Type::named("i32"), Type::named("u8")]),
            ])
        );
    }

    #[test]
    fn replace_of_whole_type_substitutes_in_place() {
        let mut ty = Type::named("T");
        ty.replace(&Type::named("T"), &Type::Bottom);
        assert_eq!(ty, Type::Bottom);
    }
}
