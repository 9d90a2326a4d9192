#![forbid(unsafe_code)]

use ecl_ast::{Block, ClassMember, Program};
use rayon::prelude::*;
use tracing::debug;

use crate::atom::AtomRewrite;
use crate::cache::TableCache;
use crate::collect::{collect, Collected, CONSTRUCTOR};
use crate::constant::validate_initializer;
use crate::decl::EnumClassDecl;
use crate::diagnostics::Diagnostics;
use crate::error::CheckFailed;
use crate::hierarchy::FnSig;
use crate::infer::{generic_mode, CheckContext, ExprChecker};
use crate::registry::EnumClassRegistry;
use crate::types::{GenericEnv, Subst, Ty};
use crate::witness::{enum_target, WitnessChecker};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckOptions {
    /// Linearize independent enum classes and check bodies on the rayon pool.
    pub parallel: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Result of checking one program.
#[derive(Debug)]
pub struct CheckReport {
    pub diagnostics: Diagnostics,
    pub registry: EnumClassRegistry,
    /// Atom call-site rewrites, in body order.
    pub rewrites: Vec<AtomRewrite>,
}

impl CheckReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// `Err` when any error-severity record was produced.
    pub fn into_result(self) -> Result<Self, CheckFailed> {
        if !self.has_errors() {
            return Ok(self);
        }
        Err(CheckFailed {
            errors: self.diagnostics.error_count(),
            codes: self
                .diagnostics
                .iter()
                .filter(|d| d.is_error())
                .map(|d| d.code())
                .collect(),
        })
    }
}

/// Enum-class checker. Keeps resolved tables across `check_program` calls.
#[derive(Debug, Default)]
pub struct Checker {
    options: CheckOptions,
    cache: TableCache,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CheckOptions) -> Self {
        Self {
            options,
            cache: TableCache::new(),
        }
    }

    pub fn options(&self) -> CheckOptions {
        self.options
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TableCache {
        &mut self.cache
    }

    pub fn check_program(&mut self, program: &Program) -> CheckReport {
        let parallel = self.options.parallel;
        let mut diags = Diagnostics::new();

        // Phase 1: names, hierarchy, signatures.
        let collected = collect(program, &mut diags);
        debug!(
            enums = collected.enums.len(),
            functions = collected.functions.len(),
            classes = collected.classes.len(),
            "collected declarations"
        );

        // Phase 2: enum-class tables.
        let (registry, resolved) = EnumClassRegistry::resolve_all(
            &collected.enums,
            &collected.hierarchy,
            collected.hierarchy.fingerprint(),
            &mut self.cache,
            parallel,
        );
        diags.append(resolved);
        debug!(
            hits = self.cache.hits(),
            misses = self.cache.misses(),
            "resolved enum class tables"
        );

        let ctx = CheckContext {
            hierarchy: &collected.hierarchy,
            globals: &collected.globals,
            registry: &registry,
        };

        // Phase 3: constant initializers.
        let initializers: Vec<Diagnostics> = if parallel {
            collected.enums.par_iter().map(|d| check_initializers(ctx, d)).collect()
        } else {
            collected.enums.iter().map(|d| check_initializers(ctx, d)).collect()
        };
        for d in initializers {
            diags.append(d);
        }

        // Phase 4: witness types in signatures.
        check_signatures(ctx, &collected, &mut diags);

        // Phase 5: top-level constants, then function bodies.
        let mut rewrites = Vec::new();
        for c in &collected.consts {
            let Some(info) = collected.globals.constant(&c.name.node) else {
                continue;
            };
            let mut checker = ExprChecker::new(ctx, info.name.clone(), GenericEnv::new());
            if c.ty.is_some() {
                checker.check_expr(&c.value, &info.ty);
            } else {
                checker.infer(&c.value, None);
            }
            let (d, r) = checker.into_parts();
            diags.append(d);
            rewrites.extend(r);
        }

        let bodies: Vec<(Diagnostics, Vec<AtomRewrite>)> = if parallel {
            collected
                .functions
                .par_iter()
                .map(|f| check_function(ctx, &f.name.node, &f.body))
                .collect()
        } else {
            collected
                .functions
                .iter()
                .map(|f| check_function(ctx, &f.name.node, &f.body))
                .collect()
        };
        for (d, r) in bodies {
            diags.append(d);
            rewrites.extend(r);
        }

        debug!(
            errors = diags.error_count(),
            warnings = diags.warning_count(),
            rewrites = rewrites.len(),
            "checked program"
        );

        CheckReport {
            diagnostics: diags,
            registry,
            rewrites,
        }
    }
}

/// Check `program` with a fresh checker and default options.
pub fn check_program(program: &Program) -> CheckReport {
    Checker::new().check_program(program)
}

fn check_initializers(ctx: CheckContext<'_>, decl: &EnumClassDecl) -> Diagnostics {
    let mut out = Diagnostics::new();
    for c in &decl.constants {
        let mut typer = ExprChecker::new(ctx, decl.name.clone(), GenericEnv::new());
        let mut mismatch = Diagnostics::new();
        validate_initializer(&decl.name, c, &mut typer, ctx.hierarchy, &mut mismatch);
        let (inferred, _) = typer.into_parts();
        out.append(inferred);
        out.append(mismatch);
    }
    out
}

fn check_function(ctx: CheckContext<'_>, name: &str, body: &Block) -> (Diagnostics, Vec<AtomRewrite>) {
    let Some(sig) = ctx.globals.function(name) else {
        return (Diagnostics::new(), Vec::new());
    };
    let mut checker = ExprChecker::new(ctx, sig.name.clone(), sig.env());
    for p in &sig.params {
        checker.bind_local(p.name.clone(), p.ty.clone());
    }
    checker.check_body(body, sig.ret.as_ref());
    checker.into_parts()
}

/// Witness well-formedness for every parameter and return type, then the
/// generic binding mode for `MemberOf<TEnum as E, Shape>` parameters.
fn check_signatures(ctx: CheckContext<'_>, collected: &Collected<'_>, diags: &mut Diagnostics) {
    for f in &collected.functions {
        if let Some(sig) = ctx.globals.function(&f.name.node) {
            check_signature(ctx, sig, &GenericEnv::new(), diags);
        }
    }

    let hierarchy = ctx.hierarchy;
    let owners = collected
        .classes
        .iter()
        .map(|c| (&c.name, &c.members))
        .chain(collected.interfaces.iter().map(|i| (&i.name, &i.members)));
    for (name, members) in owners {
        let Some(info) = hierarchy.class(&name.node) else {
            continue;
        };
        let class_env = GenericEnv::from_params(info.params.iter().cloned());
        for member in members {
            let ClassMember::Method(m) = member else {
                continue;
            };
            let sig = if m.name.node == CONSTRUCTOR {
                info.ctor.as_ref()
            } else {
                info.methods.get(&m.name.node)
            };
            if let Some(sig) = sig {
                check_signature(ctx, sig, &class_env, diags);
            }
        }
    }
}

fn check_signature(ctx: CheckContext<'_>, sig: &FnSig, outer: &GenericEnv, diags: &mut Diagnostics) {
    let witness = WitnessChecker::new(ctx.registry, ctx.hierarchy);
    let mut env = outer.clone();
    for p in &sig.type_params {
        env.push(p.clone());
    }
    let decl = sig.name.as_str();
    let solvable = sig.type_param_names();

    for param in &sig.params {
        if !witness.check_well_formed(&param.ty, &env, param.span, decl, diags) {
            continue;
        }
        let Some((enum_param, shape)) = generic_mode(&param.ty, &env) else {
            continue;
        };
        let Some(target) = enum_target(&Ty::Param(enum_param.clone()), &env) else {
            continue;
        };
        let Some(table) = ctx.registry.table(&target) else {
            continue;
        };
        let others: Vec<String> = solvable
            .iter()
            .filter(|p| **p != enum_param && shape.mentions_param(p))
            .cloned()
            .collect();
        witness.check_generic(table, &shape, &others, &Subst::new(), &env, param.span, decl, diags);
    }

    if let Some(ret) = &sig.ret {
        witness.check_well_formed(ret, &env, sig.span, decl, diags);
    }
}
