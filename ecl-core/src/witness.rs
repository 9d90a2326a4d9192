#![forbid(unsafe_code)]

use std::sync::Arc;

use ecl_ast::Span;

use crate::diagnostics::{Diagnostics, Payload};
use crate::oracle::TypeOracle;
use crate::registry::{EnumClassRegistry, Lookup};
use crate::table::EnumClassTable;
use crate::types::{GenericEnv, Subst, Ty, Variance};
use crate::unify::{UnifyError, Unifier};

/// Checks occurrences of `HH\MemberOf` and `HH\EnumClass\Label` against the
/// resolved enum-class tables.
pub struct WitnessChecker<'a> {
    registry: &'a EnumClassRegistry,
    oracle: &'a dyn TypeOracle,
}

impl<'a> WitnessChecker<'a> {
    pub fn new(registry: &'a EnumClassRegistry, oracle: &'a dyn TypeOracle) -> Self {
        Self { registry, oracle }
    }

    /// The resolved table of `name`, or `UnresolvedEnumClass` at `span`.
    pub fn table(&self, name: &str, span: Span, decl: &str, diags: &mut Diagnostics) -> Option<&'a Arc<EnumClassTable>> {
        match self.registry.lookup(name) {
            Lookup::Resolved(table) => Some(table),
            Lookup::Poisoned(_) => {
                diags.emit(
                    Some(decl),
                    span,
                    Payload::UnresolvedEnumClass {
                        name: name.to_string(),
                        poisoned: true,
                    },
                );
                None
            }
            Lookup::Missing => {
                diags.emit(
                    Some(decl),
                    span,
                    Payload::UnresolvedEnumClass {
                        name: name.to_string(),
                        poisoned: false,
                    },
                );
                None
            }
        }
    }

    /// Every witness type inside `ty` must name a resolved enum class.
    ///
    /// A type parameter in the enum position is accepted when unbounded (it
    /// can only be pinned later) and checked through its bound otherwise.
    pub fn check_well_formed(&self, ty: &Ty, env: &GenericEnv, span: Span, decl: &str, diags: &mut Diagnostics) -> bool {
        match ty {
            Ty::MemberOf { enum_class, elem } | Ty::Label { enum_class, elem } => {
                let enum_ok = self.check_enum_arg(enum_class, env, span, decl, diags);
                let elem_ok = self.check_well_formed(elem, env, span, decl, diags);
                enum_ok && elem_ok
            }
            Ty::Class { args, .. } => args
                .iter()
                .fold(true, |ok, a| self.check_well_formed(a, env, span, decl, diags) && ok),
            _ => true,
        }
    }

    fn check_enum_arg(&self, arg: &Ty, env: &GenericEnv, span: Span, decl: &str, diags: &mut Diagnostics) -> bool {
        match arg {
            Ty::Unknown => true,
            Ty::EnumClass(name) => self.table(name, span, decl, diags).is_some(),
            Ty::Param(p) => match env.bound_of(p) {
                Some(bound @ Ty::EnumClass(_)) => self.check_enum_arg(bound, env, span, decl, diags),
                _ => true,
            },
            other => {
                diags.emit(
                    Some(decl),
                    span,
                    Payload::UnresolvedEnumClass {
                        name: other.display(),
                        poisoned: false,
                    },
                );
                false
            }
        }
    }

    /// A reference to the specific constant `constant` of `table`, used
    /// where `expected` (a member-of or label type) is required.
    ///
    /// Member-of elements accept a subtype of the element; label elements
    /// must be equivalent.
    pub fn check_direct(
        &self,
        table: &EnumClassTable,
        constant: &str,
        expected: &Ty,
        env: &GenericEnv,
        span: Span,
        decl: &str,
        diags: &mut Diagnostics,
    ) -> bool {
        let Some(entry) = table.get(constant) else {
            if !table.is_rejected(constant) {
                diags.emit(
                    Some(decl),
                    span,
                    Payload::UnknownEnumClassConstant {
                        enum_class: table.name.clone(),
                        constant: constant.to_string(),
                    },
                );
            }
            return false;
        };

        let (variance, elem) = match expected {
            Ty::MemberOf { elem, .. } => (Variance::Covariant, elem.as_ref()),
            Ty::Label { elem, .. } => (Variance::Invariant, elem.as_ref()),
            _ => return true,
        };
        if self.oracle.related(&entry.ty, elem, variance, env) {
            return true;
        }
        diags.emit(
            Some(decl),
            span,
            Payload::MemberOfTypeMismatch {
                enum_class: table.name.clone(),
                constant: constant.to_string(),
                expected: elem.clone(),
                actual: entry.ty.clone(),
            },
        );
        false
    }

    /// Generic binding mode: every constant of `table` is matched against
    /// the element `shape`, and the parameters in `solvable` must come out
    /// with one instantiation across all of them. A constant that cannot
    /// agree with a `pinned` parameter makes the instantiation ambiguous.
    pub fn check_generic(
        &self,
        table: &EnumClassTable,
        shape: &Ty,
        solvable: &[String],
        pinned: &Subst,
        env: &GenericEnv,
        span: Span,
        decl: &str,
        diags: &mut Diagnostics,
    ) -> Option<Subst> {
        let unifier = Unifier::new(self.oracle, env, solvable);
        let mut bindings = Vec::new();
        let mut fits = true;

        for c in table.constants() {
            match unifier.collect(shape, &c.ty, Variance::Covariant) {
                Ok(found) => bindings.extend(found),
                Err(_) => {
                    fits = false;
                    diags.emit(
                        Some(decl),
                        span,
                        Payload::MemberOfTypeMismatch {
                            enum_class: table.name.clone(),
                            constant: c.name.clone(),
                            expected: shape.substitute(pinned),
                            actual: c.ty.clone(),
                        },
                    );
                }
            }
        }

        match unifier.solve(&bindings, pinned) {
            Ok(subst) => fits.then_some(subst),
            Err(UnifyError::Conflict { param, candidates }) => {
                diags.emit(
                    Some(decl),
                    span,
                    Payload::AmbiguousMemberGenericInstantiation {
                        enum_class: table.name.clone(),
                        param,
                        candidates,
                    },
                );
                None
            }
            Err(UnifyError::ShapeMismatch { shape, actual }) => {
                diags.emit(
                    Some(decl),
                    span,
                    Payload::TypeMismatch {
                        expected: shape,
                        actual,
                    },
                );
                None
            }
        }
    }
}

/// The enum class a witness's first argument stands for, following a type
/// parameter's bound.
pub fn enum_target(arg: &Ty, env: &GenericEnv) -> Option<String> {
    let mut cur = arg;
    for _ in 0..16 {
        match cur {
            Ty::EnumClass(name) => return Some(name.clone()),
            Ty::Param(p) => cur = env.bound_of(p)?,
            _ => return None,
        }
    }
    None
}
