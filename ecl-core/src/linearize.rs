#![forbid(unsafe_code)]

use crate::constant::validate_bound;
use crate::decl::EnumClassDecl;
use crate::diagnostics::{Diagnostics, Payload};
use crate::fingerprint::Fingerprint;
use crate::oracle::TypeOracle;
use crate::table::{ConstantEntry, EnumClassTable, PoisonReason};
use crate::types::{GenericEnv, Ty};

/// State of an included enum class as seen by its includer.
#[derive(Clone, Copy, Debug)]
pub enum Dependency<'a> {
    Resolved(&'a EnumClassTable),
    Poisoned(&'a PoisonReason),
    Missing,
}

/// Flatten `decl` into one ordered, collision-checked constant table.
///
/// Included enum classes are merged in declaration order, each contributing
/// its constants in its own order, then the local constants follow.
/// Every included table must already be settled; `lookup` never triggers
/// resolution.
pub fn linearize<'a>(
    decl: &EnumClassDecl,
    lookup: impl Fn(&str) -> Dependency<'a>,
    oracle: &dyn TypeOracle,
    fingerprint: Fingerprint,
    diags: &mut Diagnostics,
) -> EnumClassTable {
    let owner = decl.name.as_str();
    let env = GenericEnv::new();
    let mut table = EnumClassTable::new(owner, decl.bound.clone());
    table.fingerprint = fingerprint;

    check_extension_forms(decl, diags);

    for inc in &decl.includes {
        let dep = match lookup(&inc.name) {
            Dependency::Resolved(dep) => dep,
            unresolved => {
                let poisoned = matches!(unresolved, Dependency::Poisoned(_));
                diags.emit(
                    Some(owner),
                    inc.span,
                    Payload::UnresolvedEnumClass {
                        name: inc.name.clone(),
                        poisoned,
                    },
                );
                continue;
            }
        };

        for name in dep.rejected() {
            table.reject(name);
        }

        for c in dep.constants() {
            if !oracle.is_subtype(&c.ty, &decl.bound, &env) {
                diags.emit(
                    Some(owner),
                    inc.span,
                    Payload::ConstantTypeMismatch {
                        constant: c.name.clone(),
                        expected: decl.bound.clone(),
                        actual: c.ty.clone(),
                    },
                );
                table.reject(&c.name);
                continue;
            }

            match table.get(&c.name) {
                None => table.push(c.clone()),
                Some(existing) if oracle.is_equivalent(&existing.ty, &c.ty, &env) => {
                    if existing.owner != c.owner {
                        diags.emit(
                            Some(owner),
                            inc.span,
                            Payload::MergedDuplicateConstant {
                                constant: c.name.clone(),
                                first_owner: existing.owner.clone(),
                                second_owner: c.owner.clone(),
                            },
                        );
                    }
                }
                Some(existing) => {
                    diags.emit(
                        Some(owner),
                        inc.span,
                        Payload::DuplicateConstant {
                            constant: c.name.clone(),
                            first_owner: existing.owner.clone(),
                            second_owner: c.owner.clone(),
                        },
                    );
                }
            }
        }
    }

    for c in &decl.constants {
        if !validate_bound(owner, c, &decl.bound, oracle, diags) {
            table.reject(&c.name);
            continue;
        }
        if let Some(existing) = table.get(&c.name) {
            diags.emit(
                Some(owner),
                c.span,
                Payload::DuplicateConstant {
                    constant: c.name.clone(),
                    first_owner: existing.owner.clone(),
                    second_owner: owner.to_string(),
                },
            );
            continue;
        }
        table.push(ConstantEntry {
            name: c.name.clone(),
            ty: c.ty.clone(),
            owner: owner.to_string(),
            span: c.span,
        });
    }

    table
}

/// `extends` between enum classes, or an enum class as element bound, is
/// nominal extension where inclusion was required.
pub fn check_extension_forms(decl: &EnumClassDecl, diags: &mut Diagnostics) {
    for ext in &decl.extends {
        diags.emit(
            Some(&decl.name),
            ext.span,
            Payload::InvalidEnumClassExtension {
                decl: decl.name.clone(),
                target: ext.name.clone(),
            },
        );
    }
    if let Ty::EnumClass(target) = &decl.bound {
        diags.emit(
            Some(&decl.name),
            decl.bound_span,
            Payload::InvalidEnumClassExtension {
                decl: decl.name.clone(),
                target: target.clone(),
            },
        );
    }
}

/// Bound checks for a class whose table is poisoned: its own constants are
/// still validated even though no table is built.
pub fn validate_poisoned(decl: &EnumClassDecl, oracle: &dyn TypeOracle, diags: &mut Diagnostics) {
    check_extension_forms(decl, diags);
    for c in &decl.constants {
        validate_bound(&decl.name, c, &decl.bound, oracle, diags);
    }
}
