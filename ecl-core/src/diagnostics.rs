//! Structured checking diagnostics.
//!
//! Records carry a code, a primary span, the declaration they belong to and
//! a typed payload. Turning them into text is the renderer's job.

use ecl_ast::Span;

use crate::types::Ty;

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Error that must be fixed
    Error,
    /// Warning that should be addressed
    Warning,
}

impl Severity {
    pub fn display(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCode {
    ConstantTypeMismatch,
    DuplicateConstant,
    InvalidEnumClassExtension,
    CyclicInclusion,
    UnresolvedEnumClass,
    MemberOfTypeMismatch,
    AmbiguousMemberGenericInstantiation,
    UnknownEnumClassConstant,
    AtomRequiresStaticName,
    AtomTypeMismatch,
    MergedDuplicateConstant,
    UnboundName,
    TypeMismatch,
    ArityMismatch,
    DuplicateDeclaration,
    InvalidAtomParameter,
    CyclicInheritance,
}

impl DiagnosticCode {
    pub const ALL: [DiagnosticCode; 17] = [
        DiagnosticCode::ConstantTypeMismatch,
        DiagnosticCode::DuplicateConstant,
        DiagnosticCode::InvalidEnumClassExtension,
        DiagnosticCode::CyclicInclusion,
        DiagnosticCode::UnresolvedEnumClass,
        DiagnosticCode::MemberOfTypeMismatch,
        DiagnosticCode::AmbiguousMemberGenericInstantiation,
        DiagnosticCode::UnknownEnumClassConstant,
        DiagnosticCode::AtomRequiresStaticName,
        DiagnosticCode::AtomTypeMismatch,
        DiagnosticCode::MergedDuplicateConstant,
        DiagnosticCode::UnboundName,
        DiagnosticCode::TypeMismatch,
        DiagnosticCode::ArityMismatch,
        DiagnosticCode::DuplicateDeclaration,
        DiagnosticCode::InvalidAtomParameter,
        DiagnosticCode::CyclicInheritance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::ConstantTypeMismatch => "ConstantTypeMismatch",
            DiagnosticCode::DuplicateConstant => "DuplicateConstant",
            DiagnosticCode::InvalidEnumClassExtension => "InvalidEnumClassExtension",
            DiagnosticCode::CyclicInclusion => "CyclicInclusion",
            DiagnosticCode::UnresolvedEnumClass => "UnresolvedEnumClass",
            DiagnosticCode::MemberOfTypeMismatch => "MemberOfTypeMismatch",
            DiagnosticCode::AmbiguousMemberGenericInstantiation => "AmbiguousMemberGenericInstantiation",
            DiagnosticCode::UnknownEnumClassConstant => "UnknownEnumClassConstant",
            DiagnosticCode::AtomRequiresStaticName => "AtomRequiresStaticName",
            DiagnosticCode::AtomTypeMismatch => "AtomTypeMismatch",
            DiagnosticCode::MergedDuplicateConstant => "MergedDuplicateConstant",
            DiagnosticCode::UnboundName => "UnboundName",
            DiagnosticCode::TypeMismatch => "TypeMismatch",
            DiagnosticCode::ArityMismatch => "ArityMismatch",
            DiagnosticCode::DuplicateDeclaration => "DuplicateDeclaration",
            DiagnosticCode::InvalidAtomParameter => "InvalidAtomParameter",
            DiagnosticCode::CyclicInheritance => "CyclicInheritance",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::MergedDuplicateConstant => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data attached to a diagnostic. One variant per code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    ConstantTypeMismatch {
        constant: String,
        expected: Ty,
        actual: Ty,
    },
    DuplicateConstant {
        constant: String,
        first_owner: String,
        second_owner: String,
    },
    InvalidEnumClassExtension {
        decl: String,
        target: String,
    },
    /// The cycle path starts at the reporting enum class.
    CyclicInclusion {
        cycle: Vec<String>,
    },
    UnresolvedEnumClass {
        name: String,
        poisoned: bool,
    },
    MemberOfTypeMismatch {
        enum_class: String,
        constant: String,
        expected: Ty,
        actual: Ty,
    },
    AmbiguousMemberGenericInstantiation {
        enum_class: String,
        param: String,
        candidates: Vec<Ty>,
    },
    UnknownEnumClassConstant {
        enum_class: String,
        constant: String,
    },
    AtomRequiresStaticName {
        param: String,
    },
    AtomTypeMismatch {
        constant: String,
        expected: Ty,
        actual: Ty,
    },
    MergedDuplicateConstant {
        constant: String,
        first_owner: String,
        second_owner: String,
    },
    UnboundName {
        name: String,
    },
    TypeMismatch {
        expected: Ty,
        actual: Ty,
    },
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    DuplicateDeclaration {
        name: String,
    },
    InvalidAtomParameter {
        param: String,
        ty: Ty,
    },
    /// A class or interface reaches itself through `extends`/`implements`.
    /// The path starts at the class whose edge closes the cycle.
    CyclicInheritance {
        cycle: Vec<String>,
    },
}

impl Payload {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Payload::ConstantTypeMismatch { .. } => DiagnosticCode::ConstantTypeMismatch,
            Payload::DuplicateConstant { .. } => DiagnosticCode::DuplicateConstant,
            Payload::InvalidEnumClassExtension { .. } => DiagnosticCode::InvalidEnumClassExtension,
            Payload::CyclicInclusion { .. } => DiagnosticCode::CyclicInclusion,
            Payload::UnresolvedEnumClass { .. } => DiagnosticCode::UnresolvedEnumClass,
            Payload::MemberOfTypeMismatch { .. } => DiagnosticCode::MemberOfTypeMismatch,
            Payload::AmbiguousMemberGenericInstantiation { .. } => {
                DiagnosticCode::AmbiguousMemberGenericInstantiation
            }
            Payload::UnknownEnumClassConstant { .. } => DiagnosticCode::UnknownEnumClassConstant,
            Payload::AtomRequiresStaticName { .. } => DiagnosticCode::AtomRequiresStaticName,
            Payload::AtomTypeMismatch { .. } => DiagnosticCode::AtomTypeMismatch,
            Payload::MergedDuplicateConstant { .. } => DiagnosticCode::MergedDuplicateConstant,
            Payload::UnboundName { .. } => DiagnosticCode::UnboundName,
            Payload::TypeMismatch { .. } => DiagnosticCode::TypeMismatch,
            Payload::ArityMismatch { .. } => DiagnosticCode::ArityMismatch,
            Payload::DuplicateDeclaration { .. } => DiagnosticCode::DuplicateDeclaration,
            Payload::InvalidAtomParameter { .. } => DiagnosticCode::InvalidAtomParameter,
            Payload::CyclicInheritance { .. } => DiagnosticCode::CyclicInheritance,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    /// Top-level declaration the record belongs to (`E`, `f`, `C::m`).
    pub decl: Option<String>,
    pub payload: Payload,
}

impl Diagnostic {
    pub fn code(&self) -> DiagnosticCode {
        self.payload.code()
    }

    pub fn severity(&self) -> Severity {
        self.code().severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

/// Ordered sink for one checking pass. Emitting never aborts the pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, decl: Option<&str>, span: Span, payload: Payload) {
        self.records.push(Diagnostic {
            span,
            decl: decl.map(str::to_string),
            payload,
        });
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.records.extend(other);
    }

    pub fn append(&mut self, other: Diagnostics) {
        self.records.extend(other.records);
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.records.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.records.iter().any(Diagnostic::is_error)
    }

    /// Whether any error-severity record was recorded for `decl`.
    ///
    /// Keys are the bare name for enum classes, functions, classes and
    /// top-level constants (`E`, `f`, `K`). Members are keyed by owner:
    /// `C::m` for methods and constructors (`C::__construct`), `C::p` for
    /// property hints.
    pub fn has_errors_for(&self, decl: &str) -> bool {
        self.records
            .iter()
            .any(|d| d.is_error() && d.decl.as_deref() == Some(decl))
    }

    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.records.len() - self.error_count()
    }

    pub fn codes(&self) -> Vec<DiagnosticCode> {
        self.records.iter().map(Diagnostic::code).collect()
    }

    pub fn count(&self, code: DiagnosticCode) -> usize {
        self.records.iter().filter(|d| d.code() == code).count()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecl_ast::span;

    #[test]
    fn per_declaration_error_query_ignores_warnings() {
        let mut diags = Diagnostics::new();
        diags.emit(
            Some("E"),
            span(0, 1),
            Payload::MergedDuplicateConstant {
                constant: "A".into(),
                first_owner: "F".into(),
                second_owner: "G".into(),
            },
        );
        assert!(!diags.has_errors_for("E"));
        assert!(!diags.has_errors());

        diags.emit(
            Some("E"),
            span(3, 1),
            Payload::DuplicateConstant {
                constant: "A".into(),
                first_owner: "F".into(),
                second_owner: "E".into(),
            },
        );
        assert!(diags.has_errors_for("E"));
        assert!(!diags.has_errors_for("F"));
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn every_code_has_a_stable_name() {
        for code in DiagnosticCode::ALL {
            assert_eq!(code.to_string(), code.as_str());
        }
    }
}
