#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ecl_ast::{BinOp, Block, Expr, ExprKind, Ident, Span, Stmt, TypeHint};

use crate::atom::{atom_target, rewrite, static_name, AtomResolver, AtomRewrite, AtomTarget};
use crate::diagnostics::{Diagnostics, Payload};
use crate::hierarchy::{ClassKind, FnSig, Hierarchy, ParamSig};
use crate::oracle::TypeOracle;
use crate::registry::EnumClassRegistry;
use crate::table::EnumClassTable;
use crate::types::{normalize_name, GenericEnv, Subst, Ty, Variance};
use crate::unify::{Binding, Unifier};
use crate::witness::{enum_target, WitnessChecker};

const MAX_CTOR_DEPTH: usize = 64;

/// The expression-typing collaborator: the type of `expr` given an optional
/// expected type. Problems are reported through the implementor's own sink.
pub trait ExprTyper {
    fn infer_expr(&mut self, expr: &Expr, expected: Option<&Ty>) -> Ty;
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstInfo {
    pub name: String,
    pub ty: Ty,
    pub value: Expr,
    pub span: Span,
}

/// Top-level functions and constants.
#[derive(Clone, Debug, Default)]
pub struct Globals {
    pub functions: BTreeMap<String, FnSig>,
    pub consts: BTreeMap<String, ConstInfo>,
}

impl Globals {
    pub fn function(&self, name: &str) -> Option<&FnSig> {
        self.functions.get(normalize_name(name))
    }

    pub fn constant(&self, name: &str) -> Option<&ConstInfo> {
        self.consts.get(normalize_name(name))
    }
}

/// Everything an expression checker reads.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub hierarchy: &'a Hierarchy,
    pub globals: &'a Globals,
    pub registry: &'a EnumClassRegistry,
}

impl<'a> CheckContext<'a> {
    fn witness(&self) -> WitnessChecker<'a> {
        WitnessChecker::new(self.registry, self.hierarchy)
    }
}

enum AtomArg {
    Resolved { constant: String, ty: Ty },
    Dynamic(Ty),
    Failed,
}

/// Reference expression typer for function bodies, constant initializers
/// and top-level constants.
pub struct ExprChecker<'a> {
    ctx: CheckContext<'a>,
    env: GenericEnv,
    locals: HashMap<String, Ty>,
    decl: String,
    diags: Diagnostics,
    rewrites: Vec<AtomRewrite>,
}

impl<'a> ExprChecker<'a> {
    pub fn new(ctx: CheckContext<'a>, decl: impl Into<String>, env: GenericEnv) -> Self {
        Self {
            ctx,
            env,
            locals: HashMap::new(),
            decl: decl.into(),
            diags: Diagnostics::new(),
            rewrites: Vec::new(),
        }
    }

    pub fn bind_local(&mut self, name: impl Into<String>, ty: Ty) {
        self.locals.insert(name.into(), ty);
    }

    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        &mut self.diags
    }

    pub fn into_parts(self) -> (Diagnostics, Vec<AtomRewrite>) {
        (self.diags, self.rewrites)
    }

    fn oracle(&self) -> &'a dyn TypeOracle {
        self.ctx.hierarchy
    }

    fn is_subtype(&self, sub: &Ty, sup: &Ty) -> bool {
        self.oracle().is_subtype(sub, sup, &self.env)
    }

    fn emit(&mut self, span: Span, payload: Payload) {
        self.diags.emit(Some(&self.decl), span, payload);
    }

    fn lower(&mut self, hint: &TypeHint) -> Ty {
        self.ctx.hierarchy.lower_hint(hint, &self.env, &self.decl, &mut self.diags)
    }

    /// Check a function body against its declared return type (`None` when
    /// the function has no return hint).
    pub fn check_body(&mut self, body: &Block, ret: Option<&Ty>) {
        for stmt in &body.stmts {
            self.check_stmt(stmt, ret);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt, ret: Option<&Ty>) {
        match stmt {
            Stmt::Expr(e) => {
                self.infer(e, None);
            }
            Stmt::Assign(assign) => match &assign.target.kind {
                ExprKind::Var(name) => {
                    let ty = self.infer(&assign.value, None);
                    self.locals.insert(name.clone(), ty);
                }
                _ => {
                    let target = self.infer(&assign.target, None);
                    self.check_expr(&assign.value, &target);
                }
            },
            Stmt::Return(r) => match (ret, &r.value) {
                (Some(Ty::Void), Some(value)) => {
                    let actual = self.infer(value, None);
                    self.emit(
                        value.span,
                        Payload::TypeMismatch {
                            expected: Ty::Void,
                            actual,
                        },
                    );
                }
                (Some(expected), Some(value)) => {
                    self.check_expr(value, expected);
                }
                (Some(expected), None) if *expected != Ty::Void => {
                    self.emit(
                        r.span,
                        Payload::TypeMismatch {
                            expected: expected.clone(),
                            actual: Ty::Void,
                        },
                    );
                }
                (None, Some(value)) => {
                    self.infer(value, None);
                }
                _ => {}
            },
            Stmt::Echo(echo) => {
                for arg in &echo.args {
                    self.infer(arg, None);
                }
            }
        }
    }

    /// Infer `expr` and require it to be a subtype of `expected`.
    pub fn check_expr(&mut self, expr: &Expr, expected: &Ty) -> Ty {
        let actual = self.infer(expr, Some(expected));
        if !self.is_subtype(&actual, expected) {
            self.emit(
                expr.span,
                Payload::TypeMismatch {
                    expected: expected.clone(),
                    actual: actual.clone(),
                },
            );
        }
        actual
    }

    pub fn infer(&mut self, expr: &Expr, expected: Option<&Ty>) -> Ty {
        match &expr.kind {
            ExprKind::IntLit(_) => Ty::Int,
            ExprKind::StringLit(_) => Ty::String,
            ExprKind::BoolLit(_) => Ty::Bool,
            ExprKind::Var(name) => match self.locals.get(name).cloned() {
                Some(ty) => ty,
                None => {
                    self.emit(expr.span, Payload::UnboundName { name: format!("${name}") });
                    Ty::Unknown
                }
            },
            ExprKind::Name(id) => match self.ctx.globals.constant(&id.node) {
                Some(info) => info.ty.clone(),
                None => {
                    self.emit(id.span, Payload::UnboundName { name: id.node.clone() });
                    Ty::Unknown
                }
            },
            ExprKind::ClassConst { class, name } => self.infer_class_const(expr.span, class, name, expected),
            ExprKind::Label { class, name } => self.infer_label(expr.span, class.as_ref(), name, expected),
            ExprKind::New { class, args } => self.infer_new(expr.span, class, args, expected),
            ExprKind::Call { callee, targs, args } => match self.ctx.globals.function(&callee.node) {
                Some(sig) => self.check_call(sig, targs, args, expr.span),
                None => {
                    self.emit(callee.span, Payload::UnboundName { name: callee.node.clone() });
                    self.infer_all(args);
                    Ty::Unknown
                }
            },
            ExprKind::StaticCall {
                class,
                method,
                targs,
                args,
            } => self.infer_static_call(expr.span, class, method, targs, args),
            ExprKind::Prop { base, name } => {
                let base_ty = self.infer(base, None);
                match self.ctx.hierarchy.property(&base_ty, &name.node, &self.env) {
                    Some(ty) => ty,
                    None => {
                        self.emit(
                            name.span,
                            Payload::UnboundName {
                                name: format!("{base_ty}->{}", name.node),
                            },
                        );
                        Ty::Unknown
                    }
                }
            }
            ExprKind::Binary { left, op, right } => self.infer_binary(left, *op, right),
        }
    }

    fn infer_all(&mut self, args: &[Expr]) {
        for arg in args {
            self.infer(arg, None);
        }
    }

    fn enum_table(&mut self, class: &Ident) -> Option<&'a Arc<EnumClassTable>> {
        let name = normalize_name(&class.node);
        self.ctx.witness().table(name, class.span, &self.decl, &mut self.diags)
    }

    fn missing_constant(&mut self, table: &EnumClassTable, name: &Ident) {
        if !table.is_rejected(&name.node) {
            self.emit(
                name.span,
                Payload::UnknownEnumClassConstant {
                    enum_class: table.name.clone(),
                    constant: name.node.clone(),
                },
            );
        }
    }

    /// `E::A` has type `HH\MemberOf<E, T_A>`. Where a concrete witness of a
    /// related enum class is expected the constant is checked directly, and
    /// a failure types the expression as unknown so the caller stays quiet.
    fn infer_class_const(&mut self, span: Span, class: &Ident, name: &Ident, expected: Option<&Ty>) -> Ty {
        let class_name = normalize_name(&class.node);
        if !self.ctx.hierarchy.is_enum_class(class_name) {
            self.emit(
                span,
                Payload::UnboundName {
                    name: format!("{class_name}::{}", name.node),
                },
            );
            return Ty::Unknown;
        }
        let Some(table) = self.enum_table(class) else {
            return Ty::Unknown;
        };
        let Some(entry) = table.get(&name.node) else {
            self.missing_constant(table, name);
            return Ty::Unknown;
        };
        let own = Ty::EnumClass(table.name.clone());

        if let Some(want) = expected
            && let Ty::MemberOf { enum_class, .. } = want
            && self.ctx.hierarchy.enum_related(&own, enum_class, &self.env)
            && !self.ctx.witness().check_direct(table, &name.node, want, &self.env, span, &self.decl, &mut self.diags)
        {
            return Ty::Unknown;
        }
        Ty::member_of(own, entry.ty.clone())
    }

    /// `E#A`, or `#A` with the enum class taken from the expected label type.
    fn infer_label(&mut self, span: Span, class: Option<&Ident>, name: &Ident, expected: Option<&Ty>) -> Ty {
        let enum_name = match class {
            Some(c) => Some(normalize_name(&c.node).to_string()),
            None => match expected {
                Some(Ty::Label { enum_class, .. }) => enum_target(enum_class, &self.env),
                _ => None,
            },
        };
        let Some(enum_name) = enum_name else {
            self.emit(span, Payload::UnboundName { name: format!("#{}", name.node) });
            return Ty::Unknown;
        };

        let witness = self.ctx.witness();
        let Some(table) = witness.table(&enum_name, span, &self.decl, &mut self.diags) else {
            return Ty::Unknown;
        };
        let Some(entry) = table.get(&name.node) else {
            self.missing_constant(table, name);
            return Ty::Unknown;
        };
        let own = Ty::EnumClass(table.name.clone());

        if let Some(want) = expected
            && let Ty::Label { enum_class, .. } = want
            && self.ctx.hierarchy.enum_related(&own, enum_class, &self.env)
            && !witness.check_direct(table, &name.node, want, &self.env, span, &self.decl, &mut self.diags)
        {
            return Ty::Unknown;
        }
        Ty::label(own, entry.ty.clone())
    }

    /// `new C(args)`: class parameters are solved from the constructor,
    /// seeded by the known arguments of an expected `C<..>`.
    fn infer_new(&mut self, span: Span, class: &Ident, args: &[Expr], expected: Option<&Ty>) -> Ty {
        let name = normalize_name(&class.node);
        let Some(info) = self.ctx.hierarchy.class(name) else {
            self.emit(class.span, Payload::UnboundName { name: name.to_string() });
            self.infer_all(args);
            return Ty::Unknown;
        };

        let own_args: Vec<Ty> = info.params.iter().map(|p| Ty::Param(p.name.clone())).collect();
        let ctor = self.constructor(name);
        let mut type_params = info.params.clone();
        let mut params = Vec::new();
        if let Some(ctor) = &ctor {
            type_params.extend(ctor.type_params.iter().cloned());
            params = ctor.params.clone();
        }
        let sig = FnSig {
            name: name.to_string(),
            span: info.span,
            type_params,
            params,
            ret: Some(Ty::class(name, own_args)),
        };

        let mut seed = Subst::new();
        if let Some(Ty::Class { name: want, args: want_args }) = expected
            && want == name
        {
            for (p, a) in info.params.iter().zip(want_args) {
                if *a != Ty::Unknown {
                    seed.insert(p.name.clone(), a.clone());
                }
            }
        }
        self.check_call_with(&sig, seed, false, args, span)
    }

    /// The constructor of `class`, inherited through `extends` when the
    /// class declares none, instantiated at the class's own parameters.
    fn constructor(&self, class: &str) -> Option<FnSig> {
        let hierarchy = self.ctx.hierarchy;
        let info = hierarchy.class(class)?;
        let mut cur = Ty::class(class, info.params.iter().map(|p| Ty::Param(p.name.clone())).collect());
        for _ in 0..MAX_CTOR_DEPTH {
            let Ty::Class { name, args } = &cur else {
                return None;
            };
            let info = hierarchy.class(name)?;
            let subst: Subst = info
                .params
                .iter()
                .zip(args)
                .map(|(p, a)| (p.name.clone(), a.clone()))
                .collect();
            if let Some(ctor) = &info.ctor {
                let mut sig = ctor.clone();
                for p in &mut sig.params {
                    p.ty = p.ty.substitute(&subst);
                }
                return Some(sig);
            }
            let parent = info.supers.iter().find(|sup| match sup {
                Ty::Class { name, .. } => hierarchy.class(name).is_some_and(|c| c.kind == ClassKind::Class),
                _ => false,
            })?;
            cur = parent.substitute(&subst);
        }
        None
    }

    fn infer_static_call(
        &mut self,
        span: Span,
        class: &Ident,
        method: &Ident,
        targs: &[TypeHint],
        args: &[Expr],
    ) -> Ty {
        let class_name = normalize_name(&class.node);
        if self.ctx.hierarchy.is_enum_class(class_name) && matches!(method.node.as_str(), "valueOf" | "nameOf") {
            return self.infer_label_builtin(span, class_name, method, args);
        }
        match self.ctx.hierarchy.static_method(class_name, &method.node) {
            Some(sig) => self.check_call(sig, targs, args, span),
            None => {
                self.emit(
                    method.span,
                    Payload::UnboundName {
                        name: format!("{class_name}::{}", method.node),
                    },
                );
                self.infer_all(args);
                Ty::Unknown
            }
        }
    }

    /// `E::valueOf(Label<E, T>): T` and `E::nameOf(Label<E, T>): string`.
    fn infer_label_builtin(&mut self, span: Span, class: &str, method: &Ident, args: &[Expr]) -> Ty {
        if args.len() != 1 {
            self.emit(
                span,
                Payload::ArityMismatch {
                    name: format!("{class}::{}", method.node),
                    expected: 1,
                    actual: args.len(),
                },
            );
            self.infer_all(args);
            return Ty::Unknown;
        }
        let own = Ty::EnumClass(class.to_string());
        let expected = Ty::label(own.clone(), Ty::Unknown);
        let actual = self.infer(&args[0], Some(&expected));
        let elem = match &actual {
            Ty::Unknown => Ty::Unknown,
            Ty::Label { enum_class, elem } if self.ctx.hierarchy.enum_related(enum_class, &own, &self.env) => {
                (**elem).clone()
            }
            _ => {
                self.emit(
                    args[0].span,
                    Payload::TypeMismatch {
                        expected: Ty::label(own, Ty::Mixed),
                        actual,
                    },
                );
                Ty::Unknown
            }
        };
        if method.node == "nameOf" { Ty::String } else { elem }
    }

    fn infer_binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> Ty {
        let l = self.infer(left, None);
        let r = self.infer(right, None);
        if op == BinOp::Concat {
            return Ty::String;
        }
        if self.is_subtype(&l, &Ty::Int) && self.is_subtype(&r, &Ty::Int) {
            return Ty::Int;
        }
        for (side, ty) in [(left, &l), (right, &r)] {
            if !self.is_subtype(ty, &Ty::Num) {
                self.emit(
                    side.span,
                    Payload::TypeMismatch {
                        expected: Ty::Num,
                        actual: ty.clone(),
                    },
                );
                return Ty::Unknown;
            }
        }
        Ty::Num
    }

    /// Check a call to `sig`: arity, explicit type arguments, arguments
    /// unified left to right, atom parameters, type-parameter bounds.
    pub fn check_call(&mut self, sig: &FnSig, targs: &[TypeHint], args: &[Expr], span: Span) -> Ty {
        let mut pinned = Subst::new();
        let mut explicit = false;
        if !targs.is_empty() {
            if targs.len() == sig.type_params.len() {
                for (tp, hint) in sig.type_params.iter().zip(targs) {
                    let ty = self.lower(hint);
                    pinned.insert(tp.name.clone(), ty);
                }
                explicit = true;
            } else {
                self.emit(
                    span,
                    Payload::ArityMismatch {
                        name: format!("{} type arguments", sig.name),
                        expected: sig.type_params.len(),
                        actual: targs.len(),
                    },
                );
            }
        }
        self.check_call_with(sig, pinned, explicit, args, span)
    }

    fn check_call_with(&mut self, sig: &FnSig, pinned: Subst, explicit: bool, args: &[Expr], span: Span) -> Ty {
        let solvable = sig.type_param_names();
        let callee_env = sig.env();

        if args.len() != sig.params.len() {
            self.emit(
                span,
                Payload::ArityMismatch {
                    name: sig.name.clone(),
                    expected: sig.params.len(),
                    actual: args.len(),
                },
            );
            self.infer_all(args);
            return instantiate_ret(sig, &solvable, &pinned);
        }

        let oracle = self.oracle();
        let mut bindings: Vec<Binding> = Vec::new();
        let mut solved = pinned.clone();

        for (i, (param, arg)) in sig.params.iter().zip(args).enumerate() {
            let shape = param.ty.substitute(&solved);

            if explicit {
                self.check_generic_param(&callee_env, param, &solvable, &pinned, arg.span);
            }

            let (actual, atom_constant) = if param.is_atom {
                match self.check_atom_arg(&callee_env, param, &shape, &solvable, arg, i, span) {
                    AtomArg::Resolved { constant, ty } => (ty, Some(constant)),
                    AtomArg::Dynamic(ty) => (ty, None),
                    AtomArg::Failed => continue,
                }
            } else {
                let expected = erase_callee_params(&shape, &callee_env, &solvable);
                (self.infer(arg, Some(&expected)), None)
            };

            let unifier = Unifier::new(oracle, &self.env, &solvable);
            let outcome = unifier.collect(&shape, &actual, Variance::Covariant).and_then(|found| {
                let mut all = bindings.clone();
                all.extend(found);
                let subst = unifier.solve(&all, &pinned)?;
                Ok((all, subst))
            });

            match outcome {
                Ok((all, subst)) => {
                    bindings = all;
                    solved = subst;
                    solved.retain(|_, ty| *ty != Ty::Unknown);
                }
                Err(_) => self.report_arg_mismatch(arg.span, &shape, &actual, &solved, atom_constant),
            }
        }

        for tp in &sig.type_params {
            let (Some(bound), Some(value)) = (&tp.bound, solved.get(&tp.name)) else {
                continue;
            };
            let bound = bound.substitute(&solved);
            if !oracle.is_subtype(value, &bound, &self.env) {
                self.emit(
                    span,
                    Payload::TypeMismatch {
                        expected: bound,
                        actual: value.clone(),
                    },
                );
            }
        }

        instantiate_ret(sig, &solvable, &solved)
    }

    fn report_arg_mismatch(
        &mut self,
        span: Span,
        shape: &Ty,
        actual: &Ty,
        solved: &Subst,
        atom_constant: Option<String>,
    ) {
        let expected = shape.substitute(solved);
        let payload = match atom_constant {
            Some(constant) => {
                let (expected, actual) = match (&expected, actual) {
                    (Ty::MemberOf { elem: want, .. }, Ty::MemberOf { elem: got, .. }) => {
                        ((**want).clone(), (**got).clone())
                    }
                    _ => (expected.clone(), actual.clone()),
                };
                Payload::AtomTypeMismatch {
                    constant,
                    expected,
                    actual,
                }
            }
            None => Payload::TypeMismatch {
                expected,
                actual: actual.clone(),
            },
        };
        self.emit(span, payload);
    }

    /// A generic-mode parameter called with explicit type arguments: the
    /// pinned instantiation must fit every constant of the enum class.
    fn check_generic_param(
        &mut self,
        callee_env: &GenericEnv,
        param: &ParamSig,
        solvable: &[String],
        pinned: &Subst,
        span: Span,
    ) {
        let Some((enum_param, shape)) = generic_mode(&param.ty, callee_env) else {
            return;
        };
        let target = match pinned.get(&enum_param) {
            Some(Ty::EnumClass(name)) => name.clone(),
            Some(_) => return,
            None => match enum_target(&Ty::Param(enum_param), callee_env) {
                Some(name) => name,
                None => return,
            },
        };
        let witness = self.ctx.witness();
        let Some(table) = witness.table(&target, span, &self.decl, &mut self.diags) else {
            return;
        };
        let others: Vec<String> = solvable.iter().filter(|p| shape.mentions_param(p)).cloned().collect();
        let pinned_here: Subst = pinned
            .iter()
            .filter(|(k, _)| others.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        witness.check_generic(table, &shape, &others, &pinned_here, callee_env, span, &self.decl, &mut self.diags);
    }

    fn check_atom_arg(
        &mut self,
        callee_env: &GenericEnv,
        param: &ParamSig,
        shape: &Ty,
        solvable: &[String],
        arg: &Expr,
        index: usize,
        call_span: Span,
    ) -> AtomArg {
        let Some(name) = static_name(arg, self.ctx.globals) else {
            let expected = erase_callee_params(shape, callee_env, solvable);
            let ty = self.infer(arg, Some(&expected));
            if ty.is_witness() {
                return AtomArg::Dynamic(ty);
            }
            if ty != Ty::Unknown {
                self.emit(
                    arg.span,
                    Payload::AtomRequiresStaticName {
                        param: param.name.clone(),
                    },
                );
            }
            return AtomArg::Failed;
        };

        let enum_class = match atom_target(shape, callee_env) {
            AtomTarget::Enum(name) => name,
            AtomTarget::Unbounded(p) => {
                self.emit(
                    arg.span,
                    Payload::UnresolvedEnumClass {
                        name: p,
                        poisoned: false,
                    },
                );
                return AtomArg::Failed;
            }
            AtomTarget::Unknown => return AtomArg::Failed,
        };

        let resolver = AtomResolver::new(self.ctx.hierarchy, self.ctx.witness());
        let Some((constant, elem)) = resolver.resolve(&enum_class, &name, arg.span, &self.decl, &mut self.diags) else {
            return AtomArg::Failed;
        };
        let rewrite = rewrite(call_span, index, arg.span, &enum_class, &constant, elem);
        let ty = rewrite.ty.clone();
        self.rewrites.push(rewrite);
        AtomArg::Resolved { constant, ty }
    }
}

impl ExprTyper for ExprChecker<'_> {
    fn infer_expr(&mut self, expr: &Expr, expected: Option<&Ty>) -> Ty {
        self.infer(expr, expected)
    }
}

/// `MemberOf<TEnum, Shape>` where `TEnum` is a type parameter bounded by an
/// enum class: returns `TEnum` and `Shape`.
pub fn generic_mode(ty: &Ty, env: &GenericEnv) -> Option<(String, Ty)> {
    let Ty::MemberOf { enum_class, elem } = ty else {
        return None;
    };
    let Ty::Param(p) = enum_class.as_ref() else {
        return None;
    };
    enum_target(enum_class, env)?;
    Some((p.clone(), (**elem).clone()))
}

/// The expected type handed to an argument: the callee's own parameters are
/// unknown there, except a witness's enum argument, which is its bound.
fn erase_callee_params(shape: &Ty, env: &GenericEnv, solvable: &[String]) -> Ty {
    let erase = |ty: &Ty| {
        ty.map_params(&mut |name| solvable.iter().any(|p| p == name).then_some(Ty::Unknown))
    };
    let erase_enum = |ty: &Ty| match ty {
        Ty::Param(p) if solvable.contains(p) => env.bound_of(p).cloned().unwrap_or(Ty::Unknown),
        other => erase(other),
    };
    match shape {
        Ty::MemberOf { enum_class, elem } => Ty::member_of(erase_enum(enum_class), erase(elem)),
        Ty::Label { enum_class, elem } => Ty::label(erase_enum(enum_class), erase(elem)),
        other => erase(other),
    }
}

/// The declared return type with solved parameters substituted and the
/// rest unknown.
fn instantiate_ret(sig: &FnSig, solvable: &[String], solved: &Subst) -> Ty {
    match &sig.ret {
        Some(ret) => ret.map_params(&mut |name| {
            solvable
                .iter()
                .any(|p| p == name)
                .then(|| solved.get(name).cloned().unwrap_or(Ty::Unknown))
        }),
        None => Ty::Unknown,
    }
}
