//! `<<__Atom>>` parameters: a call site passes a constant's name and the
//! checker turns it into the typed constant reference.

use ecl_ast::{BinOp, Expr, ExprKind, Ident, Span, Spanned};

use crate::diagnostics::{Diagnostics, Payload};
use crate::hierarchy::Hierarchy;
use crate::infer::Globals;
use crate::types::{normalize_name, GenericEnv, Ty};
use crate::witness::WitnessChecker;

/// How deeply `const` references are followed when computing a static name.
const MAX_CONST_DEPTH: usize = 16;

/// A constant name known at check time, optionally qualified (`E#A`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticName {
    pub class: Option<String>,
    pub name: String,
}

/// A resolved atom binding and the call-site rewrite it implies.
#[derive(Clone, Debug, PartialEq)]
pub struct AtomRewrite {
    pub call_span: Span,
    pub arg_index: usize,
    pub enum_class: String,
    pub constant: String,
    /// `HH\MemberOf<E, T_A>` for the chosen constant.
    pub ty: Ty,
    /// The argument after rewriting: `E::A`.
    pub rewritten: Expr,
}

/// The enum class an atom parameter ranges over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AtomTarget {
    Enum(String),
    /// An unbounded type parameter: nothing to resolve the name against.
    Unbounded(String),
    /// Already reported while lowering the parameter.
    Unknown,
}

pub fn atom_target(param_ty: &Ty, env: &GenericEnv) -> AtomTarget {
    let arg = match param_ty {
        Ty::MemberOf { enum_class, .. } => enum_class.as_ref(),
        Ty::EnumClass(_) | Ty::Param(_) => param_ty,
        _ => return AtomTarget::Unknown,
    };
    match arg {
        Ty::EnumClass(name) => AtomTarget::Enum(name.clone()),
        Ty::Param(p) => match env.bound_of(p) {
            Some(Ty::EnumClass(name)) => AtomTarget::Enum(name.clone()),
            _ => AtomTarget::Unbounded(p.clone()),
        },
        _ => AtomTarget::Unknown,
    }
}

/// The constant name `expr` denotes at check time, if any.
///
/// Locals never count, even when assigned a literal: only literals, labels,
/// top-level constants with a static value and concatenations of those do.
pub fn static_name(expr: &Expr, globals: &Globals) -> Option<StaticName> {
    static_name_at(expr, globals, 0)
}

fn static_name_at(expr: &Expr, globals: &Globals, depth: usize) -> Option<StaticName> {
    if depth > MAX_CONST_DEPTH {
        return None;
    }
    match &expr.kind {
        ExprKind::StringLit(s) => Some(StaticName {
            class: None,
            name: s.clone(),
        }),
        ExprKind::Label { class, name } => Some(StaticName {
            class: class.as_ref().map(|c| normalize_name(&c.node).to_string()),
            name: name.node.clone(),
        }),
        ExprKind::Name(id) => {
            let info = globals.constant(&id.node)?;
            static_name_at(&info.value, globals, depth + 1)
        }
        ExprKind::Binary {
            left,
            op: BinOp::Concat,
            right,
        } => {
            let l = static_name_at(left, globals, depth + 1)?;
            let r = static_name_at(right, globals, depth + 1)?;
            if l.class.is_some() || r.class.is_some() {
                return None;
            }
            Some(StaticName {
                class: None,
                name: l.name + &r.name,
            })
        }
        _ => None,
    }
}

/// Looks atom names up in the resolved tables.
pub struct AtomResolver<'a> {
    hierarchy: &'a Hierarchy,
    witness: WitnessChecker<'a>,
}

impl<'a> AtomResolver<'a> {
    pub fn new(hierarchy: &'a Hierarchy, witness: WitnessChecker<'a>) -> Self {
        Self { hierarchy, witness }
    }

    /// Find the one constant of `enum_class` that `name` denotes.
    ///
    /// Returns the constant's name and declared type. A name that was
    /// dropped for violating the bound fails without a second report.
    pub fn resolve(
        &self,
        enum_class: &str,
        name: &StaticName,
        span: Span,
        decl: &str,
        diags: &mut Diagnostics,
    ) -> Option<(String, Ty)> {
        let table = self.witness.table(enum_class, span, decl, diags)?;

        let unknown = |diags: &mut Diagnostics| {
            diags.emit(
                Some(decl),
                span,
                Payload::UnknownEnumClassConstant {
                    enum_class: enum_class.to_string(),
                    constant: name.name.clone(),
                },
            );
        };

        if let Some(class) = &name.class
            && class != enum_class
            && !self.hierarchy.includes_transitively(enum_class, class)
        {
            unknown(diags);
            return None;
        }

        match table.get(&name.name) {
            Some(entry) => Some((entry.name.clone(), entry.ty.clone())),
            None => {
                if !table.is_rejected(&name.name) {
                    unknown(diags);
                }
                None
            }
        }
    }
}

/// Build the rewrite for argument `arg_index` of the call at `call_span`.
pub fn rewrite(call_span: Span, arg_index: usize, arg_span: Span, enum_class: &str, constant: &str, elem: Ty) -> AtomRewrite {
    let ident = |s: &str| -> Ident { Spanned::new(arg_span, s.to_string()) };
    AtomRewrite {
        call_span,
        arg_index,
        enum_class: enum_class.to_string(),
        constant: constant.to_string(),
        ty: Ty::member_of(Ty::EnumClass(enum_class.to_string()), elem),
        rewritten: Expr {
            span: arg_span,
            kind: ExprKind::ClassConst {
                class: ident(enum_class),
                name: ident(constant),
            },
        },
    }
}
