#![forbid(unsafe_code)]

mod error;
mod parser;

use ecl_lex::Lexer;
use miette::IntoDiagnostic;
use std::collections::BTreeSet;

pub use error::ParseError;
pub use parser::Parser;

/// Unstable feature enabling `enum class` declarations.
pub const FEATURE_ENUM_CLASS: &str = "enum_class";
/// Unstable feature enabling the `<<__Atom>>` parameter attribute.
pub const FEATURE_ENUM_ATOM: &str = "enum_atom";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseConfig {
    /// Enabled unstable features (stringly-typed for forward compatibility).
    pub features: BTreeSet<String>,
}

impl ParseConfig {
    pub fn with_features<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.eq_ignore_ascii_case(name))
    }
}

pub fn parse_source(src: &str) -> miette::Result<ecl_ast::Program> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_program().into_diagnostic()
}

pub fn parse_source_with_config(src: &str, config: &ParseConfig) -> miette::Result<ecl_ast::Program> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new_with_config(&tokens, config);
    parser.parse_program().into_diagnostic()
}

/// Parse a source file while attempting to recover from errors.
///
/// Returns a best-effort AST and a list of encountered `ParseError`s.
pub fn parse_source_with_recovery(src: &str) -> miette::Result<(ecl_ast::Program, Vec<ParseError>)> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    Ok(parser.parse_program_with_recovery())
}

pub fn parse_source_with_recovery_config(
    src: &str,
    config: &ParseConfig,
) -> miette::Result<(ecl_ast::Program, Vec<ParseError>)> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new_with_config(&tokens, config);
    Ok(parser.parse_program_with_recovery())
}

pub fn parse_expr(src: &str) -> miette::Result<ecl_ast::Expr> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_expr_eof().into_diagnostic()
}
