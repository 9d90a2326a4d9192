#![forbid(unsafe_code)]

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            span: self.span,
            node: f(self.node),
        }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Smallest span covering both `a` and `b`.
pub fn join(a: Span, b: Span) -> Span {
    let a0: usize = a.offset();
    let b0: usize = b.offset();
    let start = a0.min(b0);
    let end = (a0 + a.len()).max(b0 + b.len());
    span_between(start, end)
}

pub type Ident = Spanned<String>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    /// Features enabled by a `<<file: __EnableUnstableFeatures(..)>>` attribute.
    pub file_features: Vec<String>,
    pub decls: Vec<Decl>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Interface(InterfaceDecl),
    Class(ClassDecl),
    EnumClass(EnumClassDecl),
    Function(FunctionDecl),
    Const(ConstDecl),
}

impl Decl {
    pub fn name(&self) -> &Ident {
        match self {
            Decl::Interface(d) => &d.name,
            Decl::Class(d) => &d.name,
            Decl::EnumClass(d) => &d.name,
            Decl::Function(d) => &d.name,
            Decl::Const(d) => &d.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Decl::Interface(d) => d.span,
            Decl::Class(d) => d.span,
            Decl::EnumClass(d) => d.span,
            Decl::Function(d) => d.span,
            Decl::Const(d) => d.span,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Variance {
    #[default]
    Invariant,
    Covariant,
    Contravariant,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeParam {
    pub span: Span,
    pub name: Ident,
    pub variance: Variance,
    /// `T as Bound`
    pub bound: Option<TypeHint>,
}

/// A written type: `int`, `Box<T>`, `HH\MemberOf<E, Box<int>>`.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeHint {
    pub span: Span,
    pub name: Ident,
    pub args: Vec<TypeHint>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub span: Span,
    pub name: Ident,
    pub args: Vec<Expr>,
}

impl Attribute {
    pub fn is(&self, name: &str) -> bool {
        self.name.node == name
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceDecl {
    pub span: Span,
    pub name: Ident,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeHint>,
    pub members: Vec<ClassMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub span: Span,
    pub name: Ident,
    pub is_abstract: bool,
    pub is_final: bool,
    pub type_params: Vec<TypeParam>,
    pub extends: Option<TypeHint>,
    pub implements: Vec<TypeHint>,
    pub members: Vec<ClassMember>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClassMember {
    Method(MethodDecl),
    Property(PropertyDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDecl {
    pub span: Span,
    pub name: Ident,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub ret: Option<TypeHint>,
    /// `None` for abstract and interface methods.
    pub body: Option<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDecl {
    pub span: Span,
    pub visibility: Visibility,
    pub is_static: bool,
    pub ty: TypeHint,
    pub name: Ident,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    /// Constructor property promotion (`public T $data`).
    pub promoted: Option<Visibility>,
    pub ty: TypeHint,
    pub name: Ident,
}

impl Param {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.is(name))
    }
}

/// `enum class E: Bound includes F, G { ... }`
///
/// `includes` and `extends` are kept apart: only inclusion flattens constants,
/// an `extends` clause is recorded so the checker can reject it.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumClassDecl {
    pub span: Span,
    pub name: Ident,
    pub bound: TypeHint,
    pub includes: Vec<TypeHint>,
    pub extends: Vec<TypeHint>,
    pub constants: Vec<EnumConstDecl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumConstDecl {
    pub span: Span,
    pub ty: TypeHint,
    pub name: Ident,
    pub init: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub name: Ident,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub ret: Option<TypeHint>,
    pub body: Block,
}

/// Top-level `const string NAME = "A";`
#[derive(Clone, Debug, PartialEq)]
pub struct ConstDecl {
    pub span: Span,
    pub ty: Option<TypeHint>,
    pub name: Ident,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Assign(AssignStmt),
    Return(ReturnStmt),
    Echo(EchoStmt),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub span: Span,
    pub target: Expr,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub span: Span,
    pub value: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EchoStmt {
    pub span: Span,
    pub args: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    IntLit(u64),
    StringLit(String),
    BoolLit(bool),
    /// `$name` (stored without the sigil; `$this` is `Var("this")`).
    Var(String),
    /// Bare identifier: a reference to a top-level constant.
    Name(Ident),
    /// `E::A`
    ClassConst { class: Ident, name: Ident },
    /// `E#A` or `#A`
    Label { class: Option<Ident>, name: Ident },
    /// `f<T>(args)`
    Call {
        callee: Ident,
        targs: Vec<TypeHint>,
        args: Vec<Expr>,
    },
    /// `C::m<T>(args)`
    StaticCall {
        class: Ident,
        method: Ident,
        targs: Vec<TypeHint>,
        args: Vec<Expr>,
    },
    /// `new C(args)`
    New { class: Ident, args: Vec<Expr> },
    /// `$x->prop`
    Prop { base: Box<Expr>, name: Ident },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    /// `.`
    Concat,
}
