#![forbid(unsafe_code)]

use crate::decl::ConstantDecl;
use crate::diagnostics::{Diagnostics, Payload};
use crate::infer::ExprTyper;
use crate::oracle::TypeOracle;
use crate::types::{GenericEnv, Ty};

/// A constant's declared type must be a subtype of its enum class's bound.
pub fn validate_bound(
    owner: &str,
    constant: &ConstantDecl,
    bound: &Ty,
    oracle: &dyn TypeOracle,
    diags: &mut Diagnostics,
) -> bool {
    if oracle.is_subtype(&constant.ty, bound, &GenericEnv::new()) {
        return true;
    }
    diags.emit(
        Some(owner),
        constant.ty_span,
        Payload::ConstantTypeMismatch {
            constant: constant.name.clone(),
            expected: bound.clone(),
            actual: constant.ty.clone(),
        },
    );
    false
}

/// The initializer's inferred type must be a subtype of the declared type.
pub fn validate_initializer(
    owner: &str,
    constant: &ConstantDecl,
    typer: &mut dyn ExprTyper,
    oracle: &dyn TypeOracle,
    diags: &mut Diagnostics,
) -> bool {
    let actual = typer.infer_expr(&constant.init, Some(&constant.ty));
    if oracle.is_subtype(&actual, &constant.ty, &GenericEnv::new()) {
        return true;
    }
    diags.emit(
        Some(owner),
        constant.init.span,
        Payload::ConstantTypeMismatch {
            constant: constant.name.clone(),
            expected: constant.ty.clone(),
            actual,
        },
    );
    false
}
