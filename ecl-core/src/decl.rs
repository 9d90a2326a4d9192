#![forbid(unsafe_code)]

use ecl_ast::{Expr, Span};

use crate::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::types::Ty;

/// A reference to another enum class in an `includes` or `extends` clause.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumRef {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstantDecl {
    pub name: String,
    pub ty: Ty,
    pub ty_span: Span,
    pub span: Span,
    pub init: Expr,
}

/// An enum-class declaration with its hints already lowered.
///
/// Inclusion edges and `extends` clauses are disjoint: only `includes`
/// flattens constants, `extends` is kept so it can be rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumClassDecl {
    pub name: String,
    pub span: Span,
    pub bound: Ty,
    pub bound_span: Span,
    pub includes: Vec<EnumRef>,
    pub extends: Vec<EnumRef>,
    pub constants: Vec<ConstantDecl>,
}

impl EnumClassDecl {
    /// Fingerprint of the declaration's own canonical form.
    ///
    /// Initializers are left out: they never influence the resolved table.
    /// Positions are kept so a cached table replays correctly placed
    /// diagnostics.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut fp = FingerprintBuilder::new("enum-class-decl");
        fp.field("name", &self.name)
            .field("bound", &self.bound)
            .field("at", at(self.span))
            .field("bound-at", at(self.bound_span));
        for inc in &self.includes {
            fp.field("includes", &inc.name).field("at", at(inc.span));
        }
        for ext in &self.extends {
            fp.field("extends", &ext.name).field("at", at(ext.span));
        }
        for c in &self.constants {
            fp.field("const", format!("{}: {}", c.name, c.ty))
                .field("at", at(c.span))
                .field("ty-at", at(c.ty_span));
        }
        fp.finish()
    }
}

fn at(span: Span) -> String {
    format!("{}+{}", span.offset(), span.len())
}
