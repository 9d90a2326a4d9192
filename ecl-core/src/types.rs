#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

pub use ecl_ast::Variance;

pub const MEMBER_OF: &str = "HH\\MemberOf";
pub const LABEL: &str = "HH\\EnumClass\\Label";

/// Type-parameter substitution.
pub type Subst = BTreeMap<String, Ty>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ty {
    /// Error recovery; related to every type in both directions.
    Unknown,
    Mixed,
    Nothing,
    Void,
    Bool,
    Int,
    Float,
    Num,
    String,
    Arraykey,
    Class {
        name: String,
        args: Vec<Ty>,
    },
    /// An enum class used directly as a type hint.
    EnumClass(String),
    Param(String),
    MemberOf {
        enum_class: Box<Ty>,
        elem: Box<Ty>,
    },
    Label {
        enum_class: Box<Ty>,
        elem: Box<Ty>,
    },
}

impl Ty {
    pub fn class(name: impl Into<String>, args: Vec<Ty>) -> Self {
        Ty::Class {
            name: name.into(),
            args,
        }
    }

    pub fn member_of(enum_class: Ty, elem: Ty) -> Self {
        Ty::MemberOf {
            enum_class: Box::new(enum_class),
            elem: Box::new(elem),
        }
    }

    pub fn label(enum_class: Ty, elem: Ty) -> Self {
        Ty::Label {
            enum_class: Box::new(enum_class),
            elem: Box::new(elem),
        }
    }

    pub fn is_witness(&self) -> bool {
        matches!(self, Ty::MemberOf { .. } | Ty::Label { .. })
    }

    /// `(enum argument, element)` of a member-of or label type.
    pub fn witness_parts(&self) -> Option<(&Ty, &Ty)> {
        match self {
            Ty::MemberOf { enum_class, elem } | Ty::Label { enum_class, elem } => Some((enum_class, elem)),
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        self.to_string()
    }

    pub fn substitute(&self, subst: &Subst) -> Ty {
        if subst.is_empty() {
            return self.clone();
        }
        self.map_params(&mut |name| subst.get(name).cloned())
    }

    /// Rewrite type parameters through `f`; `None` keeps the parameter.
    pub fn map_params(&self, f: &mut impl FnMut(&str) -> Option<Ty>) -> Ty {
        match self {
            Ty::Param(name) => f(name).unwrap_or_else(|| self.clone()),
            Ty::Class { name, args } => Ty::Class {
                name: name.clone(),
                args: args.iter().map(|a| a.map_params(f)).collect(),
            },
            Ty::MemberOf { enum_class, elem } => Ty::member_of(enum_class.map_params(f), elem.map_params(f)),
            Ty::Label { enum_class, elem } => Ty::label(enum_class.map_params(f), elem.map_params(f)),
            _ => self.clone(),
        }
    }

    pub fn mentions_param(&self, name: &str) -> bool {
        match self {
            Ty::Param(p) => p == name,
            Ty::Class { args, .. } => args.iter().any(|a| a.mentions_param(name)),
            Ty::MemberOf { enum_class, elem } | Ty::Label { enum_class, elem } => {
                enum_class.mentions_param(name) || elem.mentions_param(name)
            }
            _ => false,
        }
    }

    pub fn mentions_any(&self, names: &[String]) -> bool {
        names.iter().any(|n| self.mentions_param(n))
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unknown => f.write_str("<unknown>"),
            Ty::Mixed => f.write_str("mixed"),
            Ty::Nothing => f.write_str("nothing"),
            Ty::Void => f.write_str("void"),
            Ty::Bool => f.write_str("bool"),
            Ty::Int => f.write_str("int"),
            Ty::Float => f.write_str("float"),
            Ty::Num => f.write_str("num"),
            Ty::String => f.write_str("string"),
            Ty::Arraykey => f.write_str("arraykey"),
            Ty::Class { name, args } => {
                f.write_str(name)?;
                write_args(f, args)
            }
            Ty::EnumClass(name) | Ty::Param(name) => f.write_str(name),
            Ty::MemberOf { enum_class, elem } => write!(f, "{MEMBER_OF}<{enum_class}, {elem}>"),
            Ty::Label { enum_class, elem } => write!(f, "{LABEL}<{enum_class}, {elem}>"),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Ty]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    f.write_str("<")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    f.write_str(">")
}

/// Variance of a position nested at `inner` inside a position of `outer`.
pub fn compose(outer: Variance, inner: Variance) -> Variance {
    match outer {
        Variance::Covariant => inner,
        Variance::Contravariant => flip(inner),
        Variance::Invariant => Variance::Invariant,
    }
}

pub fn flip(v: Variance) -> Variance {
    match v {
        Variance::Covariant => Variance::Contravariant,
        Variance::Contravariant => Variance::Covariant,
        Variance::Invariant => Variance::Invariant,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericParam {
    pub name: String,
    pub variance: Variance,
    pub bound: Option<Ty>,
}

/// In-scope type parameters, innermost last.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenericEnv {
    params: Vec<GenericParam>,
}

impl GenericEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: impl IntoIterator<Item = GenericParam>) -> Self {
        Self {
            params: params.into_iter().collect(),
        }
    }

    pub fn push(&mut self, param: GenericParam) {
        self.params.push(param);
    }

    pub fn get(&self, name: &str) -> Option<&GenericParam> {
        self.params.iter().rev().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn bound_of(&self, name: &str) -> Option<&Ty> {
        self.get(name).and_then(|p| p.bound.as_ref())
    }

    pub fn params(&self) -> &[GenericParam] {
        &self.params
    }

    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }
}

/// `\HH\MemberOf` and `MemberOf` name the same witness.
pub fn normalize_name(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

pub fn is_member_of_name(name: &str) -> bool {
    matches!(normalize_name(name), "HH\\MemberOf" | "MemberOf")
}

pub fn is_label_name(name: &str) -> bool {
    matches!(normalize_name(name), "HH\\EnumClass\\Label" | "EnumClass\\Label")
}

pub fn primitive(name: &str) -> Option<Ty> {
    let ty = match normalize_name(name) {
        "mixed" => Ty::Mixed,
        "nothing" | "noreturn" => Ty::Nothing,
        "void" => Ty::Void,
        "bool" => Ty::Bool,
        "int" => Ty::Int,
        "float" => Ty::Float,
        "num" => Ty::Num,
        "string" => Ty::String,
        "arraykey" => Ty::Arraykey,
        "dynamic" => Ty::Unknown,
        _ => return None,
    };
    Some(ty)
}
