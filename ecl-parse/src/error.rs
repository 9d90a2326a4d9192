#![forbid(unsafe_code)]

use ecl_ast::Span;
use miette::Diagnostic;
use thiserror::Error;

/// A syntax error at one location. Recovery mode collects these and keeps
/// going; the strict entry points stop at the first.
#[derive(Debug, Error, Diagnostic)]
#[error("parse error: {message}")]
#[diagnostic(code(ecl::parse))]
pub struct ParseError {
    pub message: String,
    #[label("here")]
    pub span: Span,
}

impl ParseError {
    pub fn at(span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}
