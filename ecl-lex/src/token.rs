#![forbid(unsafe_code)]

use ecl_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwInterface,
    KwClass,
    KwEnum,
    KwExtends,
    KwImplements,
    KwIncludes,
    KwFunction,
    KwAbstract,
    KwFinal,
    KwPublic,
    KwProtected,
    KwPrivate,
    KwStatic,
    KwNew,
    KwReturn,
    KwEcho,
    KwConst,
    KwAs,
    KwTrue,
    KwFalse,

    // Operators / punctuation
    Arrow,
    ColonColon,
    Colon,
    Semi,
    Comma,
    Dot,
    Eq,
    Plus,
    Minus,
    Hash,
    Lt,
    Gt,

    LParen,
    RParen,
    LBrace,
    RBrace,

    Eof,

    // Literals / identifiers
    Ident(String),
    /// `$name`, without the sigil.
    Variable(String),
    Int(u64),
    String(String),
}

impl TokenKind {
    /// Short human-readable form used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::KwInterface => "`interface`".to_string(),
            TokenKind::KwClass => "`class`".to_string(),
            TokenKind::KwEnum => "`enum`".to_string(),
            TokenKind::KwExtends => "`extends`".to_string(),
            TokenKind::KwImplements => "`implements`".to_string(),
            TokenKind::KwIncludes => "`includes`".to_string(),
            TokenKind::KwFunction => "`function`".to_string(),
            TokenKind::KwAbstract => "`abstract`".to_string(),
            TokenKind::KwFinal => "`final`".to_string(),
            TokenKind::KwPublic => "`public`".to_string(),
            TokenKind::KwProtected => "`protected`".to_string(),
            TokenKind::KwPrivate => "`private`".to_string(),
            TokenKind::KwStatic => "`static`".to_string(),
            TokenKind::KwNew => "`new`".to_string(),
            TokenKind::KwReturn => "`return`".to_string(),
            TokenKind::KwEcho => "`echo`".to_string(),
            TokenKind::KwConst => "`const`".to_string(),
            TokenKind::KwAs => "`as`".to_string(),
            TokenKind::KwTrue => "`true`".to_string(),
            TokenKind::KwFalse => "`false`".to_string(),
            TokenKind::Arrow => "`->`".to_string(),
            TokenKind::ColonColon => "`::`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::Semi => "`;`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Dot => "`.`".to_string(),
            TokenKind::Eq => "`=`".to_string(),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Minus => "`-`".to_string(),
            TokenKind::Hash => "`#`".to_string(),
            TokenKind::Lt => "`<`".to_string(),
            TokenKind::Gt => "`>`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBrace => "`{`".to_string(),
            TokenKind::RBrace => "`}`".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Variable(name) => format!("variable `${name}`"),
            TokenKind::Int(n) => format!("integer `{n}`"),
            TokenKind::String(_) => "string literal".to_string(),
        }
    }
}
