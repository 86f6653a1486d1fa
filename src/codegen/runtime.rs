//! Runtime ABI declarations, `spec.md` §6.
//!
//! Every symbol the generated IR calls is declared once at the top of the
//! module so the text is self-contained and linkable against the C
//! runtime without relying on implicit declarations.

use std::fmt::Write as _;

use super::error::CodeGenError;

pub fn emit_runtime_declarations(ir: &mut String) -> Result<(), CodeGenError> {
    writeln!(ir, "declare void @print_integer(i64)")?;
    writeln!(ir, "declare void @print_float(double)")?;
    writeln!(ir, "declare void @print_boolean(i1)")?;
    writeln!(ir, "declare void @print_char(i8)")?;
    writeln!(ir, "declare void @print_string(ptr)")?;
    writeln!(ir, "declare i64 @read_integer()")?;
    writeln!(ir, "declare double @read_float()")?;
    writeln!(ir, "declare void @read_string(ptr, i32)")?;
    writeln!(ir, "declare double @sqrt_func(double)")?;
    writeln!(ir, "declare double @abs_func(double)")?;
    writeln!(ir, "declare double @max_func(double, double)")?;
    writeln!(ir, "declare double @min_func(double, double)")?;
    writeln!(ir, "declare i32 @string_length(ptr)")?;
    for suffix in ["i64", "double", "i1"] {
        writeln!(ir, "declare ptr @array_new_{suffix}(i32)")?;
        writeln!(ir, "declare i64 @array_length_{suffix}(ptr)")?;
    }
    writeln!(ir, "declare double @llvm.pow.f64(double, double)")?;
    writeln!(ir)?;
    Ok(())
}
