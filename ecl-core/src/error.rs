#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

use crate::diagnostics::DiagnosticCode;

#[derive(Debug, Error, Diagnostic)]
#[error("check failed: {errors} error(s)")]
#[diagnostic(code(ecl::check))]
pub struct CheckFailed {
    pub errors: usize,
    pub codes: Vec<DiagnosticCode>,
}
