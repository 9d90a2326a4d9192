#![forbid(unsafe_code)]

use ecl_ast::{span_between, Span};
use logos::Logos;
use miette::Diagnostic;
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error: {message}")]
#[diagnostic(code(ecl::lex))]
pub struct LexError {
    pub message: String,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    #[regex(r"<\?hh[^\n]*", logos::skip)]
    Trivia,

    #[token("interface")]
    KwInterface,
    #[token("class")]
    KwClass,
    #[token("enum")]
    KwEnum,
    #[token("extends")]
    KwExtends,
    #[token("implements")]
    KwImplements,
    #[token("includes")]
    KwIncludes,
    #[token("function")]
    KwFunction,
    #[token("abstract")]
    KwAbstract,
    #[token("final")]
    KwFinal,
    #[token("public")]
    KwPublic,
    #[token("protected")]
    KwProtected,
    #[token("private")]
    KwPrivate,
    #[token("static")]
    KwStatic,
    #[token("new")]
    KwNew,
    #[token("return")]
    KwReturn,
    #[token("echo")]
    KwEcho,
    #[token("const")]
    KwConst,
    #[token("as")]
    KwAs,
    #[token("true")]
    KwTrue,
    #[token("false")]
    KwFalse,

    #[token("->")]
    Arrow,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("=")]
    Eq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("#")]
    Hash,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    #[regex(r"0b[01_]+", |lex| parse_int_prefixed(lex.slice(), 2, 2))]
    #[regex(r"0o[0-7_]+", |lex| parse_int_prefixed(lex.slice(), 8, 2))]
    #[regex(r"0x[0-9a-fA-F_]+", |lex| parse_int_prefixed(lex.slice(), 16, 2))]
    #[regex(r"[0-9][0-9_]*", |lex| parse_int_decimal(lex.slice()))]
    Int(Option<u64>),

    // Double-quoted: \n, \t, \r, \", \\, \$. Single-quoted: \' and \\ only.
    #[regex(r#""([^"\\]|\\.)*""#, parse_double_quoted)]
    #[regex(r"'([^'\\]|\\.)*'", parse_single_quoted)]
    String(Option<String>),

    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice()[1..].to_string())]
    Variable(String),

    // Namespace-qualified names keep their backslashes: `HH\MemberOf`.
    #[regex(r"\\?[a-zA-Z_][a-zA-Z0-9_]*(\\[a-zA-Z_][a-zA-Z0-9_]*)*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn parse_int_decimal(s: &str) -> Option<u64> {
    let digits = strip_underscores(s)?;
    digits.parse::<u64>().ok()
}

fn parse_int_prefixed(s: &str, radix: u32, prefix_len: usize) -> Option<u64> {
    let rest = s.get(prefix_len..)?;
    let digits = strip_underscores(rest)?;
    u64::from_str_radix(&digits, radix).ok()
}

fn strip_underscores(s: &str) -> Option<String> {
    if s.is_empty() {
        return None;
    }
    if s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return None;
    }
    Some(s.replace('_', ""))
}

fn parse_double_quoted(lex: &mut logos::Lexer<RawToken>) -> Option<String> {
    unescape(lex.slice(), |esc| match esc {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        '"' => Some('"'),
        '\\' => Some('\\'),
        '$' => Some('$'),
        _ => None,
    })
}

fn parse_single_quoted(lex: &mut logos::Lexer<RawToken>) -> Option<String> {
    unescape(lex.slice(), |esc| match esc {
        '\'' => Some('\''),
        '\\' => Some('\\'),
        _ => None,
    })
}

fn unescape(quoted: &str, escape: impl Fn(char) -> Option<char>) -> Option<String> {
    let inner = quoted.get(1..quoted.len().saturating_sub(1))?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let esc = chars.next()?;
        out.push(escape(esc)?);
    }

    Some(out)
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut lex = RawToken::lexer(self.src);

        while let Some(raw) = lex.next() {
            let range = lex.span();
            let span = span_between(range.start, range.end);

            let kind = match raw {
                Ok(RawToken::Trivia) => continue,

                Ok(RawToken::KwInterface) => TokenKind::KwInterface,
                Ok(RawToken::KwClass) => TokenKind::KwClass,
                Ok(RawToken::KwEnum) => TokenKind::KwEnum,
                Ok(RawToken::KwExtends) => TokenKind::KwExtends,
                Ok(RawToken::KwImplements) => TokenKind::KwImplements,
                Ok(RawToken::KwIncludes) => TokenKind::KwIncludes,
                Ok(RawToken::KwFunction) => TokenKind::KwFunction,
                Ok(RawToken::KwAbstract) => TokenKind::KwAbstract,
                Ok(RawToken::KwFinal) => TokenKind::KwFinal,
                Ok(RawToken::KwPublic) => TokenKind::KwPublic,
                Ok(RawToken::KwProtected) => TokenKind::KwProtected,
                Ok(RawToken::KwPrivate) => TokenKind::KwPrivate,
                Ok(RawToken::KwStatic) => TokenKind::KwStatic,
                Ok(RawToken::KwNew) => TokenKind::KwNew,
                Ok(RawToken::KwReturn) => TokenKind::KwReturn,
                Ok(RawToken::KwEcho) => TokenKind::KwEcho,
                Ok(RawToken::KwConst) => TokenKind::KwConst,
                Ok(RawToken::KwAs) => TokenKind::KwAs,
                Ok(RawToken::KwTrue) => TokenKind::KwTrue,
                Ok(RawToken::KwFalse) => TokenKind::KwFalse,

                Ok(RawToken::Arrow) => TokenKind::Arrow,
                Ok(RawToken::ColonColon) => TokenKind::ColonColon,
                Ok(RawToken::Colon) => TokenKind::Colon,
                Ok(RawToken::Semi) => TokenKind::Semi,
                Ok(RawToken::Comma) => TokenKind::Comma,
                Ok(RawToken::Dot) => TokenKind::Dot,
                Ok(RawToken::Eq) => TokenKind::Eq,
                Ok(RawToken::Plus) => TokenKind::Plus,
                Ok(RawToken::Minus) => TokenKind::Minus,
                Ok(RawToken::Hash) => TokenKind::Hash,
                Ok(RawToken::Lt) => TokenKind::Lt,
                Ok(RawToken::Gt) => TokenKind::Gt,

                Ok(RawToken::LParen) => TokenKind::LParen,
                Ok(RawToken::RParen) => TokenKind::RParen,
                Ok(RawToken::LBrace) => TokenKind::LBrace,
                Ok(RawToken::RBrace) => TokenKind::RBrace,

                Ok(RawToken::Ident(s)) => TokenKind::Ident(s),
                Ok(RawToken::Variable(s)) => TokenKind::Variable(s),
                Ok(RawToken::Int(Some(n))) => TokenKind::Int(n),
                Ok(RawToken::Int(None)) => {
                    return Err(LexError {
                        message: "invalid integer literal".to_string(),
                        span,
                    });
                }
                Ok(RawToken::String(Some(s))) => TokenKind::String(s),
                Ok(RawToken::String(None)) => {
                    return Err(LexError {
                        message: "invalid string literal".to_string(),
                        span,
                    });
                }

                Err(_) => {
                    return Err(LexError {
                        message: format!("unexpected character `{}`", lex.slice()),
                        span,
                    });
                }
            };

            tokens.push(Token { kind, span });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: span_between(self.src.len(), self.src.len()),
        });

        Ok(tokens)
    }
}
