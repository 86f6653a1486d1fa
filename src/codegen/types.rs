//! `spec.md` §4.4 type mapping: every B-Minor type lowers to one LLVM type.

use crate::types::Type;

/// Render the LLVM type `ty` lowers to. Arrays lower to a pointer to their
/// element type (`array<T> -> ptr<T>`); the runtime tracks length
/// separately via `array_length_<T>`, so the pointee type alone is the
/// array's LLVM type.
pub fn llvm_type(ty: &Type) -> String {
    match ty {
        Type::Integer => "i64".to_string(),
        Type::Float => "double".to_string(),
        Type::Boolean => "i1".to_string(),
        Type::Char => "i8".to_string(),
        Type::String => "ptr".to_string(),
        Type::Void => "void".to_string(),
        Type::Array { .. } => "ptr".to_string(),
        Type::Function { .. } => "ptr".to_string(),
        Type::Error => unreachable!("a type-checked program never lowers an error type"),
    }
}

/// The runtime suffix used by `array_new_<T>` / `array_length_<T>`, keyed
/// on the array's element type. Only the three element types the runtime
/// ABI lists (`spec.md` §6) are legal here; a type-checked program cannot
/// produce anything else as an array element.
pub fn array_runtime_suffix(element: &Type) -> &'static str {
    match element {
        Type::Integer => "i64",
        Type::Float => "double",
        Type::Boolean => "i1",
        other => unreachable!("arrays of {other} are not representable at the runtime ABI boundary"),
    }
}

/// A type-appropriate zero literal, used for uninitialized locals and for
/// the implicit return value of a function whose body falls off the end.
pub fn zero_literal(ty: &Type) -> String {
    match ty {
        Type::Integer => "0".to_string(),
        Type::Float => "0.0".to_string(),
        Type::Boolean => "0".to_string(),
        Type::Char => "0".to_string(),
        Type::String | Type::Array { .. } | Type::Function { .. } => "null".to_string(),
        Type::Void => String::new(),
        Type::Error => unreachable!("a type-checked program never lowers an error type"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_types_map_per_spec_table() {
        assert_eq!(llvm_type(&Type::Integer), "i64");
        assert_eq!(llvm_type(&Type::Float), "double");
        assert_eq!(llvm_type(&Type::Boolean), "i1");
        assert_eq!(llvm_type(&Type::Char), "i8");
        assert_eq!(llvm_type(&Type::String), "ptr");
        assert_eq!(llvm_type(&Type::Void), "void");
    }

    #[test]
    fn arrays_map_to_pointer() {
        assert_eq!(llvm_type(&Type::array(Type::Integer, Some(3))), "ptr");
    }
}
