//! The B-Minor type system.
//!
//! Types are attached to declarations (as written by the parser) and to
//! expressions (inferred by the semantic analyzer). `Type::Error` is the
//! sentinel assigned to an expression whose type-check failed, so that
//! enclosing expressions do not cascade the same failure into a second
//! diagnostic (`spec.md` §7 "type propagation on failure").

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Integer,
    Float,
    Boolean,
    Char,
    String,
    Void,
    Array {
        element: Box<Type>,
        /// `None` means the size wasn't statically known at this point
        /// (e.g. a function parameter declared `array[] integer`). Array
        /// type *equality* ignores size: two arrays are the same type iff
        /// their element types match.
        size: Option<i64>,
    },
    /// A function's "type" as far as call-site checking is concerned:
    /// its parameter types and return type.
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
    },
    /// Sentinel for an expression that failed to type-check.
    Error,
}

impl Type {
    pub fn array(element: Type, size: Option<i64>) -> Type {
        Type::Array {
            element: Box::new(element),
            size,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Float)
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Type equality for the purposes of assignment/initializer/argument
    /// checking: array sizes are not part of the compared type.
    pub fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Error, _) | (_, Type::Error) => true,
            (
                Type::Array { element: e1, .. },
                Type::Array { element: e2, .. },
            ) => e1.compatible(e2),
            (
                Type::Function {
                    params: p1,
                    ret: r1,
                },
                Type::Function {
                    params: p2,
                    ret: r2,
                },
            ) => p1.len() == p2.len() && p1.iter().zip(p2).all(|(a, b)| a.compatible(b)) && r1.compatible(r2),
            _ => self == other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "integer"),
            Type::Float => write!(f, "float"),
            Type::Boolean => write!(f, "boolean"),
            Type::Char => write!(f, "char"),
            Type::String => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Array { element, size } => match size {
                Some(n) => write!(f, "array[{n}] {element}"),
                None => write!(f, "array[] {element}"),
            },
            Type::Function { params, ret } => {
                write!(f, "function {ret}(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            Type::Error => write!(f, "<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_equality_ignores_size() {
        let a = Type::array(Type::Integer, Some(3));
        let b = Type::array(Type::Integer, Some(10));
        assert!(a.compatible(&b));
    }

    #[test]
    fn error_is_compatible_with_anything() {
        assert!(Type::Error.compatible(&Type::Integer));
        assert!(Type::Boolean.compatible(&Type::Error));
    }

    #[test]
    fn nested_array_compatibility() {
        let a = Type::array(Type::array(Type::Integer, Some(2)), Some(3));
        let b = Type::array(Type::array(Type::Integer, None), None);
        assert!(a.compatible(&b));
    }

    #[test]
    fn display_nested_array() {
        let t = Type::array(Type::array(Type::Float, Some(2)), Some(3));
        assert_eq!(t.to_string(), "array[3] array[2] float");
    }
}
