#![forbid(unsafe_code)]

//! Human-readable rendering of checker records through miette.

use std::fmt::Display;

use ecl_ast::Span;
use ecl_core::{Diagnostic as Record, DiagnosticCode, Payload, Severity};
use miette::{Diagnostic, LabeledSpan, NamedSource};
use thiserror::Error;

/// One checker record, ready for miette's graphical handler.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RenderedDiagnostic {
    code: DiagnosticCode,
    severity: Severity,
    message: String,
    label: &'static str,
    span: Span,
    decl: Option<String>,
}

impl RenderedDiagnostic {
    pub fn new(record: &Record) -> Self {
        Self {
            code: record.code(),
            severity: record.severity(),
            message: message(&record.payload),
            label: label(&record.payload),
            span: record.span,
            decl: record.decl.clone(),
        }
    }
}

impl Diagnostic for RenderedDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(format!("ecl::{}", self.code)))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.decl
            .as_ref()
            .map(|d| Box::new(format!("in `{d}`")) as Box<dyn Display + 'a>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.label.to_string()),
            self.span,
        ))))
    }
}

/// Print every record of one file to stderr.
pub fn emit(name: &str, src: &str, records: &[Record]) {
    for record in records {
        let report = miette::Report::new(RenderedDiagnostic::new(record))
            .with_source_code(NamedSource::new(name, src.to_string()));
        eprintln!("{report:?}");
    }
}

pub fn emit_report(name: &str, src: &str, report: miette::Report) {
    eprintln!("{:?}", report.with_source_code(NamedSource::new(name, src.to_string())));
}

/// One-line description of a record.
pub fn message(payload: &Payload) -> String {
    match payload {
        Payload::ConstantTypeMismatch {
            constant,
            expected,
            actual,
        } => format!("constant `{constant}` has type `{actual}`, which does not fit `{expected}`"),
        Payload::DuplicateConstant {
            constant,
            first_owner,
            second_owner,
        } => format!(
            "constant `{constant}` from `{second_owner}` conflicts with the one from `{first_owner}`"
        ),
        Payload::InvalidEnumClassExtension { decl, target } => {
            format!("`{decl}` cannot extend enum class `{target}`; use `includes` instead")
        }
        Payload::CyclicInclusion { cycle } => format!("cyclic inclusion: {}", closed_path(cycle)),
        Payload::CyclicInheritance { cycle } => format!("cyclic inheritance: {}", closed_path(cycle)),
        Payload::UnresolvedEnumClass { name, poisoned } => {
            if *poisoned {
                format!("enum class `{name}` is unusable because of an inclusion cycle")
            } else {
                format!("`{name}` is not an enum class")
            }
        }
        Payload::MemberOfTypeMismatch {
            enum_class,
            constant,
            expected,
            actual,
        } => format!("`{enum_class}::{constant}` has type `{actual}`, expected `{expected}`"),
        Payload::AmbiguousMemberGenericInstantiation {
            enum_class,
            param,
            candidates,
        } => {
            let candidates: Vec<String> = candidates.iter().map(|t| format!("`{t}`")).collect();
            if candidates.is_empty() {
                format!("no single instantiation of `{param}` fits every constant of `{enum_class}`")
            } else {
                format!(
                    "no single instantiation of `{param}` fits every constant of `{enum_class}` (candidates: {})",
                    candidates.join(", ")
                )
            }
        }
        Payload::UnknownEnumClassConstant {
            enum_class,
            constant,
        } => format!("enum class `{enum_class}` has no constant `{constant}`"),
        Payload::AtomRequiresStaticName { param } => {
            format!("the argument for atom parameter `${param}` must be a statically known constant name")
        }
        Payload::AtomTypeMismatch {
            constant,
            expected,
            actual,
        } => format!("atom `{constant}` has type `{actual}`, expected `{expected}`"),
        Payload::MergedDuplicateConstant {
            constant,
            first_owner,
            second_owner,
        } => format!(
            "constant `{constant}` is declared by both `{first_owner}` and `{second_owner}`; the copies were merged"
        ),
        Payload::UnboundName { name } => format!("unbound name `{name}`"),
        Payload::TypeMismatch { expected, actual } => {
            format!("expected `{expected}`, found `{actual}`")
        }
        Payload::ArityMismatch {
            name,
            expected,
            actual,
        } => format!("`{name}` takes {expected} argument(s) but {actual} were supplied"),
        Payload::DuplicateDeclaration { name } => format!("`{name}` is declared more than once"),
        Payload::InvalidAtomParameter { param, ty } => format!(
            "`<<__Atom>>` parameter `${param}` has type `{ty}`, which is not an enum class or member witness"
        ),
    }
}

fn label(payload: &Payload) -> &'static str {
    match payload {
        Payload::ConstantTypeMismatch { .. } | Payload::TypeMismatch { .. } => "this type",
        Payload::DuplicateConstant { .. } | Payload::MergedDuplicateConstant { .. } => "duplicate",
        Payload::DuplicateDeclaration { .. } => "declared again here",
        Payload::InvalidEnumClassExtension { .. } => "extension",
        Payload::CyclicInclusion { .. } | Payload::CyclicInheritance { .. } => "cycle",
        Payload::UnresolvedEnumClass { .. } => "here",
        Payload::MemberOfTypeMismatch { .. } | Payload::AtomTypeMismatch { .. } => "this constant",
        Payload::AmbiguousMemberGenericInstantiation { .. } => "ambiguous",
        Payload::UnknownEnumClassConstant { .. } | Payload::UnboundName { .. } => "not found",
        Payload::AtomRequiresStaticName { .. } => "not a static name",
        Payload::ArityMismatch { .. } => "this call",
        Payload::InvalidAtomParameter { .. } => "this parameter",
    }
}

fn closed_path(cycle: &[String]) -> String {
    let mut path = cycle.join(" -> ");
    if let Some(first) = cycle.first() {
        path.push_str(" -> ");
        path.push_str(first);
    }
    path
}

/// 1-based line and column of a byte offset.
pub fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let upto = &src[..offset.min(src.len())];
    let line = upto.matches('\n').count() + 1;
    let col = upto.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, col)
}
