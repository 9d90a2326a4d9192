#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use ecl_ast::{
    ClassDecl, ClassMember, ConstDecl, Decl, ExprKind, FunctionDecl, InterfaceDecl, MethodDecl, Param,
    Program, Span, TypeHint, TypeParam,
};

use crate::decl::{ConstantDecl, EnumClassDecl, EnumRef};
use crate::diagnostics::{Diagnostics, Payload};
use crate::hierarchy::{ClassInfo, ClassKind, EnumHeader, FnSig, Hierarchy, ParamSig};
use crate::infer::{ConstInfo, Globals};
use crate::types::{normalize_name, GenericEnv, GenericParam, Ty};

pub const ATOM_ATTRIBUTE: &str = "__Atom";
pub const CONSTRUCTOR: &str = "__construct";

/// Declarations lowered out of one program.
pub struct Collected<'p> {
    pub hierarchy: Hierarchy,
    pub globals: Globals,
    /// Enum classes in declaration order, duplicates dropped.
    pub enums: Vec<EnumClassDecl>,
    pub functions: Vec<&'p FunctionDecl>,
    pub classes: Vec<&'p ClassDecl>,
    pub interfaces: Vec<&'p InterfaceDecl>,
    pub consts: Vec<&'p ConstDecl>,
}

/// Register every name, then lower every hint.
pub fn collect<'p>(program: &'p Program, diags: &mut Diagnostics) -> Collected<'p> {
    let kept = dedupe(program, diags);

    let mut hierarchy = Hierarchy::new();
    for decl in kept.iter().copied() {
        match decl {
            Decl::Interface(d) => {
                let mut info = ClassInfo::new(normalize_name(&d.name.node), ClassKind::Interface, d.span);
                info.params = skeleton_params(&d.type_params);
                hierarchy.insert_class(info);
            }
            Decl::Class(d) => {
                let mut info = ClassInfo::new(normalize_name(&d.name.node), ClassKind::Class, d.span);
                info.is_abstract = d.is_abstract;
                info.params = skeleton_params(&d.type_params);
                hierarchy.insert_class(info);
            }
            Decl::EnumClass(d) => hierarchy.insert_enum(EnumHeader {
                name: normalize_name(&d.name.node).to_string(),
                bound: Ty::Unknown,
                includes: d
                    .includes
                    .iter()
                    .map(|h| normalize_name(&h.name.node).to_string())
                    .collect(),
            }),
            Decl::Function(_) | Decl::Const(_) => {}
        }
    }

    let mut out = Collected {
        hierarchy: Hierarchy::new(),
        globals: Globals::default(),
        enums: Vec::new(),
        functions: Vec::new(),
        classes: Vec::new(),
        interfaces: Vec::new(),
        consts: Vec::new(),
    };

    for decl in kept.iter().copied() {
        match decl {
            Decl::Interface(d) => {
                let info = lower_interface(&hierarchy, d, diags);
                hierarchy.insert_class(info);
                out.interfaces.push(d);
            }
            Decl::Class(d) => {
                let info = lower_class(&hierarchy, d, diags);
                hierarchy.insert_class(info);
                out.classes.push(d);
            }
            Decl::EnumClass(d) => {
                let lowered = lower_enum_class(&hierarchy, d, diags);
                if let Some(header) = hierarchy.enum_header_mut(&lowered.name) {
                    header.bound = lowered.bound.clone();
                }
                out.enums.push(lowered);
            }
            Decl::Function(d) => {
                let name = normalize_name(&d.name.node);
                let sig = lower_sig(
                    &hierarchy,
                    SigParts {
                        name,
                        span: d.span,
                        type_params: &d.type_params,
                        params: &d.params,
                        ret: d.ret.as_ref(),
                    },
                    &GenericEnv::new(),
                    name,
                    diags,
                );
                out.globals.functions.insert(name.to_string(), sig);
                out.functions.push(d);
            }
            Decl::Const(d) => {
                let name = normalize_name(&d.name.node).to_string();
                let ty = match &d.ty {
                    Some(hint) => hierarchy.lower_hint(hint, &GenericEnv::new(), &name, diags),
                    None => literal_type(&d.value.kind),
                };
                out.globals.consts.insert(
                    name.clone(),
                    ConstInfo {
                        name,
                        ty,
                        value: d.value.clone(),
                        span: d.span,
                    },
                );
                out.consts.push(d);
            }
        }
    }

    break_inheritance_cycles(&mut hierarchy, &kept, diags);
    hierarchy.seal();
    out.hierarchy = hierarchy;
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Active,
    Done,
}

/// Report every `extends`/`implements` edge that closes a cycle and drop it
/// from the lowered supers, so walks up the hierarchy always terminate.
/// Classes are visited depth first in declaration order.
fn break_inheritance_cycles(h: &mut Hierarchy, kept: &[&Decl], diags: &mut Diagnostics) {
    let mut order = Vec::new();
    let mut edges: HashMap<String, Vec<(String, Span)>> = HashMap::new();
    for decl in kept {
        let (name, hints): (&str, Vec<&TypeHint>) = match decl {
            Decl::Interface(d) => (normalize_name(&d.name.node), d.extends.iter().collect()),
            Decl::Class(d) => (
                normalize_name(&d.name.node),
                d.extends.iter().chain(&d.implements).collect(),
            ),
            Decl::EnumClass(_) | Decl::Function(_) | Decl::Const(_) => continue,
        };
        let targets = hints
            .into_iter()
            .map(|hint| (normalize_name(&hint.name.node).to_string(), hint.span))
            .filter(|(target, _)| h.class(target).is_some())
            .collect();
        order.push(name.to_string());
        edges.insert(name.to_string(), targets);
    }

    let mut marks: HashMap<&str, Visit> = HashMap::new();
    for root in &order {
        if marks.contains_key(root.as_str()) {
            continue;
        }
        marks.insert(root, Visit::Active);
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            let Some((target, span)) = edges.get(node).and_then(|e| e.get(next)) else {
                marks.insert(node, Visit::Done);
                stack.pop();
                continue;
            };
            top.1 += 1;
            match marks.get(target.as_str()) {
                None => {
                    marks.insert(target, Visit::Active);
                    stack.push((target.as_str(), 0));
                }
                Some(Visit::Active) => {
                    let start = stack.iter().position(|(n, _)| *n == target.as_str()).unwrap_or(0);
                    let mut cycle: Vec<String> = stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                    cycle.rotate_right(1);
                    diags.emit(Some(node), *span, Payload::CyclicInheritance { cycle });
                    if let Some(info) = h.class_mut(node)
                        && let Some(i) = info
                            .supers
                            .iter()
                            .position(|sup| matches!(sup, Ty::Class { name, .. } if name == target))
                    {
                        info.supers.remove(i);
                    }
                }
                Some(Visit::Done) => {}
            }
        }
    }
}

/// Keep the first declaration of each name. Classes, interfaces and enum
/// classes share one namespace; functions and constants have their own.
fn dedupe<'p>(program: &'p Program, diags: &mut Diagnostics) -> Vec<&'p Decl> {
    let mut types = HashSet::new();
    let mut functions = HashSet::new();
    let mut consts = HashSet::new();
    let mut kept = Vec::new();

    for decl in &program.decls {
        let name = normalize_name(&decl.name().node).to_string();
        let fresh = match decl {
            Decl::Interface(_) | Decl::Class(_) | Decl::EnumClass(_) => types.insert(name.clone()),
            Decl::Function(_) => functions.insert(name.clone()),
            Decl::Const(_) => consts.insert(name.clone()),
        };
        if fresh {
            kept.push(decl);
        } else {
            diags.emit(
                Some(&name),
                decl.name().span,
                Payload::DuplicateDeclaration { name: name.clone() },
            );
        }
    }
    kept
}

fn skeleton_params(params: &[TypeParam]) -> Vec<GenericParam> {
    params
        .iter()
        .map(|p| GenericParam {
            name: p.name.node.clone(),
            variance: p.variance,
            bound: None,
        })
        .collect()
}

/// Type parameters with their `as` bounds, which may mention any parameter
/// of the same list.
fn lower_type_params(
    h: &Hierarchy,
    params: &[TypeParam],
    outer: &GenericEnv,
    decl: &str,
    diags: &mut Diagnostics,
) -> Vec<GenericParam> {
    let mut env = outer.clone();
    for p in skeleton_params(params) {
        env.push(p);
    }
    params
        .iter()
        .map(|p| GenericParam {
            name: p.name.node.clone(),
            variance: p.variance,
            bound: p.bound.as_ref().map(|b| h.lower_hint(b, &env, decl, diags)),
        })
        .collect()
}

fn extend_env(outer: &GenericEnv, params: &[GenericParam]) -> GenericEnv {
    let mut env = outer.clone();
    for p in params {
        env.push(p.clone());
    }
    env
}

/// A super type of a class or interface. Naming an enum class there is
/// nominal extension of an enum class and is dropped.
fn lower_super(h: &Hierarchy, hint: &TypeHint, env: &GenericEnv, decl: &str, diags: &mut Diagnostics) -> Option<Ty> {
    let target = normalize_name(&hint.name.node);
    if h.is_enum_class(target) {
        diags.emit(
            Some(decl),
            hint.span,
            Payload::InvalidEnumClassExtension {
                decl: decl.to_string(),
                target: target.to_string(),
            },
        );
        return None;
    }
    match h.lower_hint(hint, env, decl, diags) {
        Ty::Unknown => None,
        ty => Some(ty),
    }
}

fn lower_interface(h: &Hierarchy, d: &InterfaceDecl, diags: &mut Diagnostics) -> ClassInfo {
    let name = normalize_name(&d.name.node);
    let mut info = ClassInfo::new(name, ClassKind::Interface, d.span);
    info.params = lower_type_params(h, &d.type_params, &GenericEnv::new(), name, diags);
    let env = GenericEnv::from_params(info.params.iter().cloned());
    info.supers = d
        .extends
        .iter()
        .filter_map(|hint| lower_super(h, hint, &env, name, diags))
        .collect();
    lower_members(h, &mut info, &d.members, &env, diags);
    info
}

fn lower_class(h: &Hierarchy, d: &ClassDecl, diags: &mut Diagnostics) -> ClassInfo {
    let name = normalize_name(&d.name.node);
    let mut info = ClassInfo::new(name, ClassKind::Class, d.span);
    info.is_abstract = d.is_abstract;
    info.params = lower_type_params(h, &d.type_params, &GenericEnv::new(), name, diags);
    let env = GenericEnv::from_params(info.params.iter().cloned());
    info.supers = d
        .extends
        .iter()
        .chain(&d.implements)
        .filter_map(|hint| lower_super(h, hint, &env, name, diags))
        .collect();
    lower_members(h, &mut info, &d.members, &env, diags);
    info
}

fn lower_members(h: &Hierarchy, info: &mut ClassInfo, members: &[ClassMember], env: &GenericEnv, diags: &mut Diagnostics) {
    for member in members {
        match member {
            ClassMember::Property(p) => {
                let decl = format!("{}::{}", info.name, p.name.node);
                let ty = h.lower_hint(&p.ty, env, &decl, diags);
                info.props.insert(p.name.node.clone(), ty);
            }
            ClassMember::Method(m) => {
                let sig = lower_method(h, &info.name, m, env, diags);
                if m.name.node == CONSTRUCTOR {
                    for (param, ast) in sig.params.iter().zip(&m.params) {
                        if ast.promoted.is_some() {
                            info.props.insert(param.name.clone(), param.ty.clone());
                        }
                    }
                    info.ctor = Some(sig);
                } else {
                    info.methods.insert(m.name.node.clone(), sig);
                }
            }
        }
    }
}

fn lower_method(h: &Hierarchy, class: &str, m: &MethodDecl, env: &GenericEnv, diags: &mut Diagnostics) -> FnSig {
    let decl = format!("{class}::{}", m.name.node);
    lower_sig(
        h,
        SigParts {
            name: &decl,
            span: m.span,
            type_params: &m.type_params,
            params: &m.params,
            ret: m.ret.as_ref(),
        },
        env,
        &decl,
        diags,
    )
}

struct SigParts<'a> {
    name: &'a str,
    span: Span,
    type_params: &'a [TypeParam],
    params: &'a [Param],
    ret: Option<&'a TypeHint>,
}

fn lower_sig(h: &Hierarchy, parts: SigParts<'_>, outer: &GenericEnv, decl: &str, diags: &mut Diagnostics) -> FnSig {
    let type_params = lower_type_params(h, parts.type_params, outer, decl, diags);
    let env = extend_env(outer, &type_params);

    let params = parts
        .params
        .iter()
        .map(|p| {
            let ty = h.lower_hint(&p.ty, &env, decl, diags);
            let mut is_atom = p.has_attribute(ATOM_ATTRIBUTE);
            if is_atom && !is_atom_capable(&ty, &env) {
                diags.emit(
                    Some(decl),
                    p.span,
                    Payload::InvalidAtomParameter {
                        param: p.name.node.clone(),
                        ty: ty.clone(),
                    },
                );
                is_atom = false;
            }
            ParamSig {
                name: p.name.node.clone(),
                ty,
                is_atom,
                span: p.span,
            }
        })
        .collect();

    FnSig {
        name: parts.name.to_string(),
        span: parts.span,
        type_params,
        params,
        ret: parts.ret.map(|r| h.lower_hint(r, &env, decl, diags)),
    }
}

fn is_atom_capable(ty: &Ty, env: &GenericEnv) -> bool {
    match ty {
        Ty::Unknown | Ty::MemberOf { .. } | Ty::EnumClass(_) => true,
        Ty::Param(p) => matches!(env.bound_of(p), Some(Ty::EnumClass(_))),
        _ => false,
    }
}

fn lower_enum_class(h: &Hierarchy, d: &ecl_ast::EnumClassDecl, diags: &mut Diagnostics) -> EnumClassDecl {
    let name = normalize_name(&d.name.node).to_string();
    let env = GenericEnv::new();
    let enum_ref = |hint: &TypeHint| EnumRef {
        name: normalize_name(&hint.name.node).to_string(),
        span: hint.span,
    };
    EnumClassDecl {
        bound: h.lower_hint(&d.bound, &env, &name, diags),
        bound_span: d.bound.span,
        includes: d.includes.iter().map(enum_ref).collect(),
        extends: d.extends.iter().map(enum_ref).collect(),
        constants: d
            .constants
            .iter()
            .map(|c| ConstantDecl {
                name: c.name.node.clone(),
                ty: h.lower_hint(&c.ty, &env, &name, diags),
                ty_span: c.ty.span,
                span: c.span,
                init: c.init.clone(),
            })
            .collect(),
        span: d.span,
        name,
    }
}

/// Type of an untyped top-level constant.
fn literal_type(kind: &ExprKind) -> Ty {
    match kind {
        ExprKind::IntLit(_) => Ty::Int,
        ExprKind::StringLit(_) => Ty::String,
        ExprKind::BoolLit(_) => Ty::Bool,
        ExprKind::Binary {
            op: ecl_ast::BinOp::Concat,
            ..
        } => Ty::String,
        _ => Ty::Unknown,
    }
}
