#![forbid(unsafe_code)]

use std::collections::HashMap;

use ecl_ast::{Block, ClassMember, Decl, Expr, ExprKind, Program, Stmt};

use crate::atom::AtomRewrite;

type Key = (usize, usize);

/// Substitute every resolved atom argument with its `E::A` reference.
///
/// Calls are matched by span; rewrites whose call is not found are ignored.
pub fn apply_atom_rewrites(program: &Program, rewrites: &[AtomRewrite]) -> Program {
    let mut by_call: HashMap<Key, Vec<&AtomRewrite>> = HashMap::new();
    for r in rewrites {
        by_call
            .entry((r.call_span.offset(), r.call_span.len()))
            .or_default()
            .push(r);
    }

    let mut out = program.clone();
    if by_call.is_empty() {
        return out;
    }
    for decl in &mut out.decls {
        match decl {
            Decl::Function(f) => rewrite_block(&mut f.body, &by_call),
            Decl::Const(c) => rewrite_expr(&mut c.value, &by_call),
            Decl::EnumClass(e) => {
                for c in &mut e.constants {
                    rewrite_expr(&mut c.init, &by_call);
                }
            }
            Decl::Class(c) => {
                for m in &mut c.members {
                    if let ClassMember::Method(m) = m
                        && let Some(body) = &mut m.body
                    {
                        rewrite_block(body, &by_call);
                    }
                }
            }
            Decl::Interface(_) => {}
        }
    }
    out
}

fn rewrite_block(block: &mut Block, by_call: &HashMap<Key, Vec<&AtomRewrite>>) {
    for stmt in &mut block.stmts {
        match stmt {
            Stmt::Expr(e) => rewrite_expr(e, by_call),
            Stmt::Assign(a) => {
                rewrite_expr(&mut a.target, by_call);
                rewrite_expr(&mut a.value, by_call);
            }
            Stmt::Return(r) => {
                if let Some(v) = &mut r.value {
                    rewrite_expr(v, by_call);
                }
            }
            Stmt::Echo(e) => {
                for a in &mut e.args {
                    rewrite_expr(a, by_call);
                }
            }
        }
    }
}

fn rewrite_expr(expr: &mut Expr, by_call: &HashMap<Key, Vec<&AtomRewrite>>) {
    let key = (expr.span.offset(), expr.span.len());
    match &mut expr.kind {
        ExprKind::Call { args, .. } | ExprKind::StaticCall { args, .. } => {
            for a in args.iter_mut() {
                rewrite_expr(a, by_call);
            }
            if let Some(found) = by_call.get(&key) {
                for r in found {
                    if let Some(slot) = args.get_mut(r.arg_index) {
                        *slot = r.rewritten.clone();
                    }
                }
            }
        }
        ExprKind::New { args, .. } => {
            for a in args.iter_mut() {
                rewrite_expr(a, by_call);
            }
        }
        ExprKind::Prop { base, .. } => rewrite_expr(base, by_call),
        ExprKind::Binary { left, right, .. } => {
            rewrite_expr(left, by_call);
            rewrite_expr(right, by_call);
        }
        ExprKind::IntLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::Var(_)
        | ExprKind::Name(_)
        | ExprKind::ClassConst { .. }
        | ExprKind::Label { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::rewrite;
    use crate::types::Ty;
    use ecl_ast::{span, Spanned};

    fn call(args: Vec<Expr>) -> Expr {
        Expr {
            span: span(10, 8),
            kind: ExprKind::Call {
                callee: Spanned::new(span(10, 1), "f".into()),
                targs: Vec::new(),
                args,
            },
        }
    }

    fn program(body: Expr) -> Program {
        Program {
            file_features: Vec::new(),
            decls: vec![Decl::Const(ecl_ast::ConstDecl {
                span: span(0, 20),
                ty: None,
                name: Spanned::new(span(6, 1), "X".into()),
                value: body,
            })],
        }
    }

    #[test]
    fn replaces_the_argument_at_the_matching_call() {
        let arg = Expr {
            span: span(12, 3),
            kind: ExprKind::StringLit("A".into()),
        };
        let before = program(call(vec![arg]));
        let r = rewrite(span(10, 8), 0, span(12, 3), "E", "A", Ty::Int);
        let after = apply_atom_rewrites(&before, &[r]);

        let Decl::Const(c) = &after.decls[0] else {
            panic!("const expected");
        };
        let ExprKind::Call { args, .. } = &c.value.kind else {
            panic!("call expected");
        };
        assert!(matches!(
            &args[0].kind,
            ExprKind::ClassConst { class, name } if class.node == "E" && name.node == "A"
        ));
    }

    #[test]
    fn unmatched_rewrites_leave_the_program_alone() {
        let before = program(call(Vec::new()));
        let r = rewrite(span(40, 8), 0, span(42, 3), "E", "A", Ty::Int);
        assert_eq!(apply_atom_rewrites(&before, &[r]), before);
    }
}
