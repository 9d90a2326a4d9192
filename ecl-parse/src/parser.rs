#![forbid(unsafe_code)]

use std::mem;

use ecl_ast::{
    join, span_between, AssignStmt, Attribute, BinOp, Block, ClassDecl, ClassMember, ConstDecl, Decl,
    EchoStmt, EnumClassDecl, EnumConstDecl, Expr, ExprKind, FunctionDecl, Ident, InterfaceDecl,
    MethodDecl, Param, Program, PropertyDecl, ReturnStmt, Span, Stmt, TypeHint, TypeParam, Variance,
    Visibility,
};
use ecl_lex::{Token, TokenKind};

use crate::error::ParseError;
use crate::{ParseConfig, FEATURE_ENUM_ATOM, FEATURE_ENUM_CLASS};

const ATTR_ATOM: &str = "__Atom";
const ATTR_ENABLE_FEATURES: &str = "__EnableUnstableFeatures";

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    config: ParseConfig,
}

#[derive(Default)]
struct Modifiers {
    visibility: Option<Visibility>,
    is_static: bool,
    is_abstract: bool,
    is_final: bool,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            idx: 0,
            config: ParseConfig::default(),
        }
    }

    pub fn new_with_config(tokens: &'a [Token], config: &ParseConfig) -> Self {
        Self {
            tokens,
            idx: 0,
            config: config.clone(),
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let file_features = self.parse_file_attribute()?;
        let mut decls = Vec::new();
        while !self.at(TokenKind::Eof) {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { file_features, decls })
    }

    /// Parse a program while attempting to recover from errors.
    ///
    /// On a declaration parse error, rewind to the start of that declaration
    /// and skip past its body (the first balanced `}` or a top-level `;`),
    /// then continue with the next declaration.
    pub fn parse_program_with_recovery(&mut self) -> (Program, Vec<ParseError>) {
        let mut decls = Vec::new();
        let mut errors = Vec::new();

        let file_features = match self.parse_file_attribute() {
            Ok(features) => features,
            Err(err) => {
                errors.push(err);
                self.recover_to_decl_boundary(0);
                Vec::new()
            }
        };

        while !self.at(TokenKind::Eof) {
            let start = self.idx;
            match self.parse_decl() {
                Ok(decl) => decls.push(decl),
                Err(err) => {
                    errors.push(err);
                    self.recover_to_decl_boundary(start);
                }
            }
        }

        (Program { file_features, decls }, errors)
    }

    fn recover_to_decl_boundary(&mut self, start: usize) {
        self.idx = start;
        let mut depth = 0usize;
        while !self.at(TokenKind::Eof) {
            let Some(tok) = self.next() else {
                return;
            };
            match tok.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                TokenKind::Semi if depth == 0 => return,
                _ => {}
            }
        }
    }

    /// `<<file: __EnableUnstableFeatures('a', 'b')>>`
    fn parse_file_attribute(&mut self) -> Result<Vec<String>, ParseError> {
        let is_file_attr = self.at(TokenKind::Lt)
            && matches!(self.peek_kind_n(1), Some(TokenKind::Lt))
            && matches!(self.peek_kind_n(2), Some(TokenKind::Ident(n)) if n == "file")
            && matches!(self.peek_kind_n(3), Some(TokenKind::Colon));
        if !is_file_attr {
            return Ok(Vec::new());
        }

        self.expect(TokenKind::Lt)?;
        self.expect(TokenKind::Lt)?;
        self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let attrs = self.parse_attribute_list()?;

        let mut features = Vec::new();
        for attr in attrs {
            if !attr.is(ATTR_ENABLE_FEATURES) {
                continue;
            }
            for arg in &attr.args {
                match &arg.kind {
                    ExprKind::StringLit(name) => features.push(name.clone()),
                    _ => {
                        return Err(ParseError::at(
                            arg.span,
                            format!("{ATTR_ENABLE_FEATURES} expects string literal feature names"),
                        ));
                    }
                }
            }
        }

        self.config.features.extend(features.iter().cloned());
        Ok(features)
    }

    /// `<<A, B(args)>>`
    fn parse_attributes(&mut self) -> Result<Vec<Attribute>, ParseError> {
        if !(self.at(TokenKind::Lt) && matches!(self.peek_kind_n(1), Some(TokenKind::Lt))) {
            return Ok(Vec::new());
        }
        self.expect(TokenKind::Lt)?;
        self.expect(TokenKind::Lt)?;
        self.parse_attribute_list()
    }

    /// Attribute entries after the opening `<<`, through the closing `>>`.
    fn parse_attribute_list(&mut self) -> Result<Vec<Attribute>, ParseError> {
        let mut attrs = Vec::new();
        loop {
            let name = self.expect_ident()?;
            let mut args = Vec::new();
            if self.at(TokenKind::LParen) {
                args = self.parse_args()?;
            }
            attrs.push(Attribute {
                span: join(name.span, self.prev_span()),
                name,
                args,
            });
            if self.at(TokenKind::Comma) {
                self.next();
                continue;
            }
            break;
        }
        self.expect(TokenKind::Gt)?;
        self.expect(TokenKind::Gt)?;
        Ok(attrs)
    }

    fn parse_decl(&mut self) -> Result<Decl, ParseError> {
        let attributes = self.parse_attributes()?;

        match self.peek_kind() {
            Some(TokenKind::KwInterface) => Ok(Decl::Interface(self.parse_interface()?)),
            Some(TokenKind::KwClass | TokenKind::KwAbstract | TokenKind::KwFinal) => {
                Ok(Decl::Class(self.parse_class()?))
            }
            Some(TokenKind::KwEnum) => Ok(Decl::EnumClass(self.parse_enum_class()?)),
            Some(TokenKind::KwFunction) => Ok(Decl::Function(self.parse_function(attributes)?)),
            Some(TokenKind::KwConst) => Ok(Decl::Const(self.parse_const()?)),
            Some(other) => Err(ParseError::at(
                self.peek_span().unwrap_or_else(|| span_between(0, 0)),
                format!("expected a declaration, found {}", other.describe()),
            )),
            None => Err(ParseError::at(span_between(0, 0), "unexpected end of input")),
        }
    }

    fn parse_interface(&mut self) -> Result<InterfaceDecl, ParseError> {
        let start = self.expect(TokenKind::KwInterface)?.span;
        let name = self.expect_ident()?;
        let type_params = self.parse_type_params()?;

        let mut extends = Vec::new();
        if self.at(TokenKind::KwExtends) {
            self.next();
            extends = self.parse_hint_list()?;
        }

        let members = self.parse_members()?;
        Ok(InterfaceDecl {
            span: join(start, self.prev_span()),
            name,
            type_params,
            extends,
            members,
        })
    }

    fn parse_class(&mut self) -> Result<ClassDecl, ParseError> {
        let start = self.peek_span().unwrap_or_else(|| span_between(0, 0));
        let mut is_abstract = false;
        let mut is_final = false;
        loop {
            match self.peek_kind() {
                Some(TokenKind::KwAbstract) => is_abstract = true,
                Some(TokenKind::KwFinal) => is_final = true,
                _ => break,
            }
            self.next();
        }

        self.expect(TokenKind::KwClass)?;
        let name = self.expect_ident()?;
        let type_params = self.parse_type_params()?;

        let mut extends = None;
        if self.at(TokenKind::KwExtends) {
            self.next();
            extends = Some(self.parse_type_hint()?);
        }

        let mut implements = Vec::new();
        if self.at(TokenKind::KwImplements) {
            self.next();
            implements = self.parse_hint_list()?;
        }

        let members = self.parse_members()?;
        Ok(ClassDecl {
            span: join(start, self.prev_span()),
            name,
            is_abstract,
            is_final,
            type_params,
            extends,
            implements,
            members,
        })
    }

    fn parse_members(&mut self) -> Result<Vec<ClassMember>, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(ParseError::at(
                    self.peek_span().unwrap_or_else(|| span_between(0, 0)),
                    "unterminated class body",
                ));
            }
            members.push(self.parse_member()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(members)
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut mods = Modifiers::default();
        loop {
            match self.peek_kind() {
                Some(TokenKind::KwPublic) => mods.visibility = Some(Visibility::Public),
                Some(TokenKind::KwProtected) => mods.visibility = Some(Visibility::Protected),
                Some(TokenKind::KwPrivate) => mods.visibility = Some(Visibility::Private),
                Some(TokenKind::KwStatic) => mods.is_static = true,
                Some(TokenKind::KwAbstract) => mods.is_abstract = true,
                Some(TokenKind::KwFinal) => mods.is_final = true,
                _ => return mods,
            }
            self.next();
        }
    }

    fn parse_member(&mut self) -> Result<ClassMember, ParseError> {
        let start = self.peek_span().unwrap_or_else(|| span_between(0, 0));
        let mods = self.parse_modifiers();
        let visibility = mods.visibility.unwrap_or(Visibility::Public);

        if self.at(TokenKind::KwFunction) {
            self.next();
            let name = self.expect_ident()?;
            let type_params = self.parse_type_params()?;
            let params = self.parse_params()?;
            let ret = self.parse_return_hint()?;
            let body = if self.at(TokenKind::Semi) {
                self.next();
                None
            } else {
                Some(self.parse_block()?)
            };
            return Ok(ClassMember::Method(MethodDecl {
                span: join(start, self.prev_span()),
                name,
                visibility,
                is_static: mods.is_static,
                is_abstract: mods.is_abstract,
                type_params,
                params,
                ret,
                body,
            }));
        }

        let ty = self.parse_type_hint()?;
        let name = self.expect_variable()?;
        self.expect(TokenKind::Semi)?;
        Ok(ClassMember::Property(PropertyDecl {
            span: join(start, self.prev_span()),
            visibility,
            is_static: mods.is_static,
            ty,
            name,
        }))
    }

    fn parse_enum_class(&mut self) -> Result<EnumClassDecl, ParseError> {
        let start = self.expect(TokenKind::KwEnum)?.span;
        if !self.at(TokenKind::KwClass) {
            return Err(ParseError::at(
                self.peek_span().unwrap_or(start),
                "expected `class` after `enum` (only enum classes are supported)",
            ));
        }
        let class_kw = self.expect(TokenKind::KwClass)?.span;

        if !self.config.has_feature(FEATURE_ENUM_CLASS) {
            return Err(ParseError::at(
                join(start, class_kw),
                format!("enum classes are gated behind feature '{FEATURE_ENUM_CLASS}'"),
            ));
        }

        let name = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let bound = self.parse_type_hint()?;

        let mut includes = Vec::new();
        let mut extends = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::KwIncludes) => {
                    self.next();
                    includes.extend(self.parse_hint_list()?);
                }
                Some(TokenKind::KwExtends) => {
                    self.next();
                    extends.extend(self.parse_hint_list()?);
                }
                _ => break,
            }
        }

        self.expect(TokenKind::LBrace)?;
        let mut constants = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(ParseError::at(self.peek_span().unwrap_or(start), "unterminated enum class body"));
            }
            constants.push(self.parse_enum_const()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(EnumClassDecl {
            span: join(start, self.prev_span()),
            name,
            bound,
            includes,
            extends,
            constants,
        })
    }

    fn parse_enum_const(&mut self) -> Result<EnumConstDecl, ParseError> {
        let ty = self.parse_type_hint()?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::Eq)?;
        let init = self.parse_expr()?;
        self.expect(TokenKind::Semi)?;
        Ok(EnumConstDecl {
            span: join(ty.span, self.prev_span()),
            ty,
            name,
            init,
        })
    }

    fn parse_function(&mut self, attributes: Vec<Attribute>) -> Result<FunctionDecl, ParseError> {
        let kw = self.expect(TokenKind::KwFunction)?.span;
        let start = attributes.first().map(|a| a.span).unwrap_or(kw);
        let name = self.expect_ident()?;
        let type_params = self.parse_type_params()?;
        let params = self.parse_params()?;
        let ret = self.parse_return_hint()?;
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            span: join(start, body.span),
            attributes,
            name,
            type_params,
            params,
            ret,
            body,
        })
    }

    /// `const string NAME = "A";` or `const NAME = "A";`
    fn parse_const(&mut self) -> Result<ConstDecl, ParseError> {
        let start = self.expect(TokenKind::KwConst)?.span;
        let ty = if matches!(self.peek_kind_n(1), Some(TokenKind::Eq)) {
            None
        } else {
            Some(self.parse_type_hint()?)
        };
        let name = self.expect_ident()?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semi)?;
        Ok(ConstDecl {
            span: join(start, self.prev_span()),
            ty,
            name,
            value,
        })
    }

    fn parse_type_params(&mut self) -> Result<Vec<TypeParam>, ParseError> {
        if !self.at(TokenKind::Lt) {
            return Ok(Vec::new());
        }
        self.next();

        let mut params = Vec::new();
        loop {
            let start = self.peek_span().unwrap_or_else(|| span_between(0, 0));
            let variance = match self.peek_kind() {
                Some(TokenKind::Plus) => {
                    self.next();
                    Variance::Covariant
                }
                Some(TokenKind::Minus) => {
                    self.next();
                    Variance::Contravariant
                }
                _ => Variance::Invariant,
            };
            let name = self.expect_ident()?;
            let bound = if self.at(TokenKind::KwAs) {
                self.next();
                Some(self.parse_type_hint()?)
            } else {
                None
            };
            params.push(TypeParam {
                span: join(start, self.prev_span()),
                name,
                variance,
                bound,
            });
            if self.at(TokenKind::Comma) {
                self.next();
                continue;
            }
            break;
        }
        self.expect(TokenKind::Gt)?;
        Ok(params)
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.at(TokenKind::RParen) {
            self.next();
            return Ok(params);
        }

        loop {
            let start = self.peek_span().unwrap_or_else(|| span_between(0, 0));
            let attributes = self.parse_attributes()?;
            if let Some(atom) = attributes.iter().find(|a| a.is(ATTR_ATOM))
                && !self.config.has_feature(FEATURE_ENUM_ATOM)
            {
                return Err(ParseError::at(
                    atom.span,
                    format!("the <<{ATTR_ATOM}>> attribute is gated behind feature '{FEATURE_ENUM_ATOM}'"),
                ));
            }

            let promoted = match self.peek_kind() {
                Some(TokenKind::KwPublic) => Some(Visibility::Public),
                Some(TokenKind::KwProtected) => Some(Visibility::Protected),
                Some(TokenKind::KwPrivate) => Some(Visibility::Private),
                _ => None,
            };
            if promoted.is_some() {
                self.next();
            }

            let ty = self.parse_type_hint()?;
            let name = self.expect_variable()?;
            params.push(Param {
                span: join(start, name.span),
                attributes,
                promoted,
                ty,
                name,
            });

            if self.at(TokenKind::Comma) {
                self.next();
                // Trailing comma.
                if self.at(TokenKind::RParen) {
                    break;
                }
                continue;
            }
            break;
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_return_hint(&mut self) -> Result<Option<TypeHint>, ParseError> {
        if self.at(TokenKind::Colon) {
            self.next();
            Ok(Some(self.parse_type_hint()?))
        } else {
            Ok(None)
        }
    }

    fn parse_hint_list(&mut self) -> Result<Vec<TypeHint>, ParseError> {
        let mut hints = vec![self.parse_type_hint()?];
        while self.at(TokenKind::Comma) {
            self.next();
            hints.push(self.parse_type_hint()?);
        }
        Ok(hints)
    }

    fn parse_type_hint(&mut self) -> Result<TypeHint, ParseError> {
        let name = self.expect_ident()?;
        let mut args = Vec::new();
        if self.at(TokenKind::Lt) {
            self.next();
            args = self.parse_hint_list()?;
            self.expect(TokenKind::Gt)?;
        }
        Ok(TypeHint {
            span: join(name.span, self.prev_span()),
            name,
            args,
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(ParseError::at(start, "unterminated block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Block {
            span: join(start, end),
            stmts,
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwReturn) => {
                let start = self.expect(TokenKind::KwReturn)?.span;
                let value = if self.at(TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Return(ReturnStmt {
                    span: join(start, self.prev_span()),
                    value,
                }))
            }
            Some(TokenKind::KwEcho) => {
                let start = self.expect(TokenKind::KwEcho)?.span;
                let mut args = vec![self.parse_expr()?];
                while self.at(TokenKind::Comma) {
                    self.next();
                    args.push(self.parse_expr()?);
                }
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Echo(EchoStmt {
                    span: join(start, self.prev_span()),
                    args,
                }))
            }
            _ => {
                let expr = self.parse_expr()?;
                if self.at(TokenKind::Eq) {
                    self.next();
                    if !matches!(expr.kind, ExprKind::Var(_) | ExprKind::Prop { .. }) {
                        return Err(ParseError::at(expr.span, "invalid assignment target"));
                    }
                    let value = self.parse_expr()?;
                    self.expect(TokenKind::Semi)?;
                    return Ok(Stmt::Assign(AssignStmt {
                        span: join(expr.span, self.prev_span()),
                        target: expr,
                        value,
                    }));
                }
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_add_expr()?;
        while self.at(TokenKind::Dot) {
            self.next();
            let right = self.parse_add_expr()?;
            left = Expr {
                span: join(left.span, right.span),
                kind: ExprKind::Binary {
                    left: Box::new(left),
                    op: BinOp::Concat,
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    pub fn parse_expr_eof(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if !self.at(TokenKind::Eof) {
            return Err(ParseError::at(self.peek_span().unwrap_or(expr.span), "expected end of input"));
        }
        Ok(expr)
    }

    fn parse_add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_postfix_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next();
            let right = self.parse_postfix_expr()?;
            left = Expr {
                span: join(left.span, right.span),
                kind: ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary_expr()?;
        while self.at(TokenKind::Arrow) {
            self.next();
            let name = self.expect_ident()?;
            expr = Expr {
                span: join(expr.span, name.span),
                kind: ExprKind::Prop {
                    base: Box::new(expr),
                    name,
                },
            };
        }
        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        let tok = self.expect_any()?;
        let start = tok.span;

        let kind = match tok.kind {
            TokenKind::Int(n) => ExprKind::IntLit(n),
            TokenKind::String(s) => ExprKind::StringLit(s),
            TokenKind::KwTrue => ExprKind::BoolLit(true),
            TokenKind::KwFalse => ExprKind::BoolLit(false),
            TokenKind::Variable(name) => ExprKind::Var(name),
            TokenKind::Hash => {
                let name = self.expect_ident()?;
                ExprKind::Label { class: None, name }
            }
            TokenKind::KwNew => {
                let class = self.expect_ident()?;
                let args = self.parse_args()?;
                ExprKind::New { class, args }
            }
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                let end = self.expect(TokenKind::RParen)?.span;
                return Ok(Expr {
                    span: join(start, end),
                    kind: inner.kind,
                });
            }
            TokenKind::Ident(name) => {
                let ident = Ident { span: start, node: name };
                self.parse_name_expr(ident)?
            }
            other => {
                return Err(ParseError::at(start, format!("expected expression, found {}", other.describe())));
            }
        };

        Ok(Expr {
            span: join(start, self.prev_span()),
            kind,
        })
    }

    /// Everything that starts with a bare name: labels, class constants,
    /// static calls, calls and constant references.
    fn parse_name_expr(&mut self, ident: Ident) -> Result<ExprKind, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Hash) => {
                self.next();
                let name = self.expect_ident()?;
                Ok(ExprKind::Label {
                    class: Some(ident),
                    name,
                })
            }
            Some(TokenKind::ColonColon) => {
                self.next();
                let member = self.expect_ident()?;
                if self.at(TokenKind::Lt) || self.at(TokenKind::LParen) {
                    let targs = self.parse_call_targs()?;
                    let args = self.parse_args()?;
                    Ok(ExprKind::StaticCall {
                        class: ident,
                        method: member,
                        targs,
                        args,
                    })
                } else {
                    Ok(ExprKind::ClassConst {
                        class: ident,
                        name: member,
                    })
                }
            }
            Some(TokenKind::Lt | TokenKind::LParen) => {
                let targs = self.parse_call_targs()?;
                let args = self.parse_args()?;
                Ok(ExprKind::Call {
                    callee: ident,
                    targs,
                    args,
                })
            }
            _ => Ok(ExprKind::Name(ident)),
        }
    }

    /// The surface has no comparison operators, so `<` after a callee always
    /// opens explicit type arguments.
    fn parse_call_targs(&mut self) -> Result<Vec<TypeHint>, ParseError> {
        if !self.at(TokenKind::Lt) {
            return Ok(Vec::new());
        }
        self.next();
        let targs = self.parse_hint_list()?;
        self.expect(TokenKind::Gt)?;
        Ok(targs)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.at(TokenKind::RParen) {
            self.next();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.at(TokenKind::Comma) {
                self.next();
                if self.at(TokenKind::RParen) {
                    break;
                }
                continue;
            }
            break;
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(Ident {
                span: tok.span,
                node: name,
            }),
            other => Err(ParseError::at(
                tok.span,
                format!("expected identifier, found {}", other.describe()),
            )),
        }
    }

    fn expect_variable(&mut self) -> Result<Ident, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Variable(name) => Ok(Ident {
                span: tok.span,
                node: name,
            }),
            other => Err(ParseError::at(tok.span, format!("expected variable, found {}", other.describe()))),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let tok = self.expect_any()?;
        if mem::discriminant(&tok.kind) == mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError::at(
                tok.span,
                format!("expected {}, found {}", expected.describe(), tok.kind.describe()),
            ))
        }
    }

    fn expect_any(&mut self) -> Result<Token, ParseError> {
        match self.next() {
            Some(tok) if tok.kind == TokenKind::Eof => Err(ParseError::at(
                tok.span,
                "unexpected end of input",
            )),
            Some(tok) => Ok(tok),
            None => Err(ParseError::at(span_between(0, 0), "unexpected end of input")),
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| mem::discriminant(k) == mem::discriminant(&kind))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx)?.clone();
        self.idx += 1;
        Some(tok)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.idx).map(|t| &t.kind)
    }

    fn peek_kind_n(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.idx + n).map(|t| &t.kind)
    }

    fn peek_span(&self) -> Option<Span> {
        self.tokens.get(self.idx).map(|t| t.span)
    }

    fn prev_span(&self) -> Span {
        self.idx
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_else(|| span_between(0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecl_lex::Lexer;

    fn parse(src: &str) -> Program {
        let tokens = Lexer::new(src).lex().unwrap();
        Parser::new(&tokens).parse_program().unwrap()
    }

    #[test]
    fn file_attribute_enables_features_for_the_rest_of_the_file() {
        let program = parse(
            "<<file: __EnableUnstableFeatures('enum_class')>>\nenum class E: mixed { int A = 1; }",
        );
        assert_eq!(program.file_features, vec!["enum_class".to_string()]);
        assert!(matches!(program.decls[0], Decl::EnumClass(_)));
    }

    #[test]
    fn nested_generic_hints_close_on_separate_angle_tokens() {
        let program = parse("function f(Box<Box<int>> $x): void {}");
        let Decl::Function(f) = &program.decls[0] else {
            panic!("expected function");
        };
        let hint = &f.params[0].ty;
        assert_eq!(hint.name.node, "Box");
        assert_eq!(hint.args[0].name.node, "Box");
        assert_eq!(hint.args[0].args[0].name.node, "int");
    }

    #[test]
    fn includes_and_extends_are_kept_apart() {
        let program = parse(
            "<<file: __EnableUnstableFeatures('enum_class')>>\n\
             enum class F: ExBox includes E, G extends H { }",
        );
        let Decl::EnumClass(f) = &program.decls[0] else {
            panic!("expected enum class");
        };
        let includes: Vec<_> = f.includes.iter().map(|h| h.name.node.as_str()).collect();
        assert_eq!(includes, vec!["E", "G"]);
        assert_eq!(f.extends.len(), 1);
        assert_eq!(f.extends[0].name.node, "H");
    }

    #[test]
    fn label_and_class_constant_forms() {
        let tokens = Lexer::new("E#A . #B . E::C").lex().unwrap();
        let expr = Parser::new(&tokens).parse_expr_eof().unwrap();
        let ExprKind::Binary { left, right, .. } = expr.kind else {
            panic!("expected concat");
        };
        assert!(matches!(right.kind, ExprKind::ClassConst { .. }));
        let ExprKind::Binary { left, right, .. } = left.kind else {
            panic!("expected concat");
        };
        assert!(matches!(left.kind, ExprKind::Label { class: Some(_), .. }));
        assert!(matches!(right.kind, ExprKind::Label { class: None, .. }));
    }

    #[test]
    fn recovery_skips_to_the_next_declaration() {
        let src = "function broken(: void {}\nfunction ok(): void {}\nconst X = ;\nconst Y = 1;";
        let tokens = Lexer::new(src).lex().unwrap();
        let (program, errors) = Parser::new(&tokens).parse_program_with_recovery();
        assert_eq!(errors.len(), 2);
        let names: Vec<_> = program.decls.iter().map(|d| d.name().node.as_str()).collect();
        assert_eq!(names, vec!["ok", "Y"]);
    }
}
