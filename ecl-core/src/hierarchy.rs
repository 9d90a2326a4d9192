#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use ecl_ast::{Span, TypeHint};

use crate::diagnostics::{Diagnostics, Payload};
use crate::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::oracle::TypeOracle;
use crate::types::{
    is_label_name, is_member_of_name, normalize_name, primitive, GenericEnv, GenericParam, Subst, Ty,
    Variance,
};

const MAX_DEPTH: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamSig {
    pub name: String,
    pub ty: Ty,
    /// Declared with `<<__Atom>>`.
    pub is_atom: bool,
    pub span: Span,
}

/// A function, method or constructor signature, lowered.
#[derive(Clone, Debug, PartialEq)]
pub struct FnSig {
    pub name: String,
    pub span: Span,
    pub type_params: Vec<GenericParam>,
    pub params: Vec<ParamSig>,
    /// `None` when the declaration has no return hint.
    pub ret: Option<Ty>,
}

impl FnSig {
    pub fn env(&self) -> GenericEnv {
        GenericEnv::from_params(self.type_params.iter().cloned())
    }

    pub fn type_param_names(&self) -> Vec<String> {
        self.type_params.iter().map(|p| p.name.clone()).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub kind: ClassKind,
    pub span: Span,
    pub is_abstract: bool,
    pub params: Vec<GenericParam>,
    /// `extends` and `implements`, in terms of this class's own parameters.
    pub supers: Vec<Ty>,
    pub ctor: Option<FnSig>,
    pub props: BTreeMap<String, Ty>,
    pub methods: BTreeMap<String, FnSig>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>, kind: ClassKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
            is_abstract: false,
            params: Vec::new(),
            supers: Vec::new(),
            ctor: None,
            props: BTreeMap::new(),
            methods: BTreeMap::new(),
        }
    }

    fn instantiate(&self, args: &[Ty]) -> Subst {
        self.params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), args.get(i).cloned().unwrap_or(Ty::Unknown)))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumHeader {
    pub name: String,
    pub bound: Ty,
    pub includes: Vec<String>,
}

/// Nominal class hierarchy plus enum-class headers: the reference
/// [`TypeOracle`].
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    classes: BTreeMap<String, ClassInfo>,
    enums: BTreeMap<String, EnumHeader>,
    fingerprint: Fingerprint,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_class(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    pub fn insert_enum(&mut self, header: EnumHeader) {
        self.enums.insert(header.name.clone(), header);
    }

    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(normalize_name(name))
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut ClassInfo> {
        self.classes.get_mut(normalize_name(name))
    }

    pub fn enum_header(&self, name: &str) -> Option<&EnumHeader> {
        self.enums.get(normalize_name(name))
    }

    pub fn enum_header_mut(&mut self, name: &str) -> Option<&mut EnumHeader> {
        self.enums.get_mut(normalize_name(name))
    }

    pub fn is_enum_class(&self, name: &str) -> bool {
        self.enums.contains_key(normalize_name(name))
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Compute the fingerprint once every declaration has been inserted.
    pub fn seal(&mut self) {
        let mut fp = FingerprintBuilder::new("hierarchy");
        for class in self.classes.values() {
            fp.field("class", &class.name);
            for p in &class.params {
                fp.field("param", format!("{:?} {}", p.variance, p.name));
                if let Some(bound) = &p.bound {
                    fp.field("as", bound);
                }
            }
            for sup in &class.supers {
                fp.field("super", sup);
            }
            for (name, ty) in &class.props {
                fp.field("prop", format!("{name}: {ty}"));
            }
        }
        for header in self.enums.values() {
            fp.field("enum", &header.name).field("bound", &header.bound);
        }
        self.fingerprint = fp.finish();
    }

    /// Whether `outer` includes `inner`, directly or transitively.
    pub fn includes_transitively(&self, outer: &str, inner: &str) -> bool {
        let mut seen = BTreeSet::new();
        let mut work = vec![normalize_name(outer).to_string()];
        while let Some(cur) = work.pop() {
            let Some(header) = self.enums.get(&cur) else {
                continue;
            };
            for inc in &header.includes {
                if inc == inner {
                    return true;
                }
                if seen.insert(inc.clone()) {
                    work.push(inc.clone());
                }
            }
        }
        false
    }

    /// Resolve a written hint. Problems are reported and lowered to `Unknown`.
    pub fn lower_hint(&self, hint: &TypeHint, env: &GenericEnv, decl: &str, diags: &mut Diagnostics) -> Ty {
        let name = normalize_name(&hint.name.node);

        if is_member_of_name(name) || is_label_name(name) {
            if hint.args.len() != 2 {
                diags.emit(
                    Some(decl),
                    hint.span,
                    Payload::ArityMismatch {
                        name: name.to_string(),
                        expected: 2,
                        actual: hint.args.len(),
                    },
                );
                return Ty::Unknown;
            }
            let enum_class = self.lower_enum_arg(&hint.args[0], env, decl, diags);
            let elem = self.lower_hint(&hint.args[1], env, decl, diags);
            return if is_member_of_name(name) {
                Ty::member_of(enum_class, elem)
            } else {
                Ty::label(enum_class, elem)
            };
        }

        let expected_arity = if let Some(ty) = primitive(name) {
            if hint.args.is_empty() {
                return ty;
            }
            0
        } else if env.contains(name) {
            if hint.args.is_empty() {
                return Ty::Param(name.to_string());
            }
            0
        } else if self.enums.contains_key(name) {
            if hint.args.is_empty() {
                return Ty::EnumClass(name.to_string());
            }
            0
        } else if let Some(class) = self.classes.get(name) {
            if hint.args.len() == class.params.len() {
                let args = hint
                    .args
                    .iter()
                    .map(|a| self.lower_hint(a, env, decl, diags))
                    .collect();
                return Ty::class(name, args);
            }
            class.params.len()
        } else {
            diags.emit(
                Some(decl),
                hint.name.span,
                Payload::UnboundName {
                    name: name.to_string(),
                },
            );
            return Ty::Unknown;
        };

        diags.emit(
            Some(decl),
            hint.span,
            Payload::ArityMismatch {
                name: name.to_string(),
                expected: expected_arity,
                actual: hint.args.len(),
            },
        );
        Ty::Unknown
    }

    /// The first argument of a witness hint. An unknown bare name is kept
    /// as an enum-class reference so the witness checker can report it as
    /// unresolved.
    fn lower_enum_arg(&self, hint: &TypeHint, env: &GenericEnv, decl: &str, diags: &mut Diagnostics) -> Ty {
        let name = normalize_name(&hint.name.node);
        let known = primitive(name).is_some()
            || env.contains(name)
            || self.enums.contains_key(name)
            || self.classes.contains_key(name)
            || is_member_of_name(name)
            || is_label_name(name);
        if !known && hint.args.is_empty() {
            return Ty::EnumClass(name.to_string());
        }
        self.lower_hint(hint, env, decl, diags)
    }

    /// Whether two enum-class arguments relate: `sub` is `sup`, or `sup`
    /// includes `sub`.
    pub fn enum_related(&self, sub: &Ty, sup: &Ty, env: &GenericEnv) -> bool {
        self.enum_related_at(sub, sup, env, 0)
    }

    fn enum_related_at(&self, sub: &Ty, sup: &Ty, env: &GenericEnv, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (Ty::Unknown, _) | (_, Ty::Unknown) => true,
            (Ty::EnumClass(a), Ty::EnumClass(b)) => self.includes_transitively(b, a),
            (Ty::Param(p), _) => env
                .bound_of(p)
                .is_some_and(|bound| self.enum_related_at(bound, sup, env, depth + 1)),
            _ => false,
        }
    }

    /// Type of property `prop` read from a value of type `ty`.
    pub fn property(&self, ty: &Ty, prop: &str, env: &GenericEnv) -> Option<Ty> {
        self.property_at(ty, prop, env, 0)
    }

    fn property_at(&self, ty: &Ty, prop: &str, env: &GenericEnv, depth: usize) -> Option<Ty> {
        if depth > MAX_DEPTH {
            return None;
        }
        match ty {
            Ty::Unknown => Some(Ty::Unknown),
            Ty::Class { name, args } => {
                let mut queue = VecDeque::from([(name.clone(), args.clone())]);
                let mut seen = BTreeSet::new();
                while let Some((cur, cur_args)) = queue.pop_front() {
                    if !seen.insert(cur.clone()) {
                        continue;
                    }
                    let info = self.classes.get(&cur)?;
                    let subst = info.instantiate(&cur_args);
                    if let Some(found) = info.props.get(prop) {
                        return Some(found.substitute(&subst));
                    }
                    for sup in &info.supers {
                        if let Ty::Class { name, args } = sup.substitute(&subst) {
                            queue.push_back((name, args));
                        }
                    }
                }
                None
            }
            Ty::MemberOf { elem, .. } => self.property_at(elem, prop, env, depth + 1),
            Ty::EnumClass(name) => {
                let header = self.enums.get(name)?;
                self.property_at(&header.bound, prop, env, depth + 1)
            }
            Ty::Param(p) => {
                let bound = env.bound_of(p)?;
                self.property_at(bound, prop, env, depth + 1)
            }
            _ => None,
        }
    }

    /// Static method `method` declared on `class` or one of its ancestors.
    pub fn static_method(&self, class: &str, method: &str) -> Option<&FnSig> {
        let mut work = vec![normalize_name(class).to_string()];
        let mut seen = BTreeSet::new();
        while let Some(cur) = work.pop() {
            if !seen.insert(cur.clone()) {
                continue;
            }
            let Some(info) = self.classes.get(&cur) else {
                continue;
            };
            if let Some(sig) = info.methods.get(method) {
                return Some(sig);
            }
            for sup in &info.supers {
                if let Ty::Class { name, .. } = sup {
                    work.push(name.clone());
                }
            }
        }
        None
    }

    fn subtype_at(&self, sub: &Ty, sup: &Ty, env: &GenericEnv, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (Ty::Unknown, _) | (_, Ty::Unknown) => true,
            (Ty::Nothing, _) => true,
            (Ty::Void, _) | (_, Ty::Void) => false,
            (_, Ty::Mixed) => true,
            (Ty::Param(p), _) => env
                .bound_of(p)
                .is_some_and(|bound| self.subtype_at(bound, sup, env, depth + 1)),
            (Ty::Int | Ty::Float, Ty::Num) => true,
            (Ty::Int | Ty::String, Ty::Arraykey) => true,
            (
                Ty::MemberOf {
                    enum_class: e1,
                    elem: x1,
                },
                Ty::MemberOf {
                    enum_class: e2,
                    elem: x2,
                },
            ) => self.enum_related(e1, e2, env) && self.subtype_at(x1, x2, env, depth + 1),
            (
                Ty::Label {
                    enum_class: e1,
                    elem: x1,
                },
                Ty::Label {
                    enum_class: e2,
                    elem: x2,
                },
            ) => {
                self.enum_related(e1, e2, env)
                    && self.subtype_at(x1, x2, env, depth + 1)
                    && self.subtype_at(x2, x1, env, depth + 1)
            }
            (Ty::MemberOf { enum_class, .. }, Ty::EnumClass(_)) => self.enum_related(enum_class, sup, env),
            (Ty::MemberOf { elem, .. }, _) => self.subtype_at(elem, sup, env, depth + 1),
            (Ty::EnumClass(name), _) => self
                .enums
                .get(name)
                .is_some_and(|h| self.subtype_at(&h.bound, sup, env, depth + 1)),
            (Ty::Class { .. }, Ty::Class { name, args }) => {
                let Some(sub_args) = self.ascend_at(sub, name, env, depth + 1) else {
                    return false;
                };
                if sub_args.len() != args.len() {
                    return false;
                }
                let variances = self.class_variances(name);
                sub_args.iter().zip(args).enumerate().all(|(i, (a, b))| {
                    let v = variances.get(i).copied().unwrap_or_default();
                    match v {
                        Variance::Covariant => self.subtype_at(a, b, env, depth + 1),
                        Variance::Contravariant => self.subtype_at(b, a, env, depth + 1),
                        Variance::Invariant => {
                            self.subtype_at(a, b, env, depth + 1) && self.subtype_at(b, a, env, depth + 1)
                        }
                    }
                })
            }
            _ => false,
        }
    }

    fn ascend_at(&self, ty: &Ty, class: &str, env: &GenericEnv, depth: usize) -> Option<Vec<Ty>> {
        if depth > MAX_DEPTH {
            return None;
        }
        match ty {
            Ty::Class { name, args } => {
                // Depth first in declaration order; each ancestor is expanded once.
                let mut work = vec![(name.clone(), args.clone())];
                let mut seen = BTreeSet::new();
                while let Some((cur, cur_args)) = work.pop() {
                    if cur == class {
                        return Some(cur_args);
                    }
                    if !seen.insert(cur.clone()) {
                        continue;
                    }
                    let Some(info) = self.classes.get(&cur) else {
                        continue;
                    };
                    let subst = info.instantiate(&cur_args);
                    for sup in info.supers.iter().rev() {
                        if let Ty::Class { name, args } = sup.substitute(&subst) {
                            work.push((name, args));
                        }
                    }
                }
                None
            }
            Ty::Param(p) => self.ascend_at(env.bound_of(p)?, class, env, depth + 1),
            Ty::MemberOf { elem, .. } => self.ascend_at(elem, class, env, depth + 1),
            Ty::EnumClass(name) => {
                let header = self.enums.get(name)?;
                self.ascend_at(&header.bound, class, env, depth + 1)
            }
            Ty::Unknown => {
                let arity = self.classes.get(class).map_or(0, |c| c.params.len());
                Some(vec![Ty::Unknown; arity])
            }
            _ => None,
        }
    }
}

impl TypeOracle for Hierarchy {
    fn is_subtype(&self, sub: &Ty, sup: &Ty, env: &GenericEnv) -> bool {
        self.subtype_at(sub, sup, env, 0)
    }

    fn ascend(&self, ty: &Ty, class: &str, env: &GenericEnv) -> Option<Vec<Ty>> {
        self.ascend_at(ty, normalize_name(class), env, 0)
    }

    fn class_variances(&self, class: &str) -> Vec<Variance> {
        self.class(class)
            .map(|c| c.params.iter().map(|p| p.variance).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecl_ast::span;

    fn param(name: &str, variance: Variance) -> GenericParam {
        GenericParam {
            name: name.into(),
            variance,
            bound: None,
        }
    }

    /// `interface ExBox`, `class Box<T> implements ExBox`, `class IBox extends Box<int>`,
    /// `class RO<+T>`, enum classes `E: ExBox` and `F: ExBox includes E`.
    fn boxes() -> Hierarchy {
        let mut h = Hierarchy::new();
        h.insert_class(ClassInfo::new("ExBox", ClassKind::Interface, span(0, 0)));

        let mut boxed = ClassInfo::new("Box", ClassKind::Class, span(0, 0));
        boxed.params.push(param("T", Variance::Invariant));
        boxed.supers.push(Ty::class("ExBox", vec![]));
        boxed.props.insert("data".into(), Ty::Param("T".into()));
        h.insert_class(boxed);

        let mut ibox = ClassInfo::new("IBox", ClassKind::Class, span(0, 0));
        ibox.supers.push(Ty::class("Box", vec![Ty::Int]));
        h.insert_class(ibox);

        let mut ro = ClassInfo::new("RO", ClassKind::Class, span(0, 0));
        ro.params.push(param("T", Variance::Covariant));
        h.insert_class(ro);

        let bound = Ty::class("ExBox", vec![]);
        h.insert_enum(EnumHeader {
            name: "E".into(),
            bound: bound.clone(),
            includes: vec![],
        });
        h.insert_enum(EnumHeader {
            name: "F".into(),
            bound,
            includes: vec!["E".into()],
        });
        h.seal();
        h
    }

    #[test]
    fn nominal_subtyping_through_extends_and_implements() {
        let h = boxes();
        let env = GenericEnv::new();
        let ibox = Ty::class("IBox", vec![]);
        assert!(h.is_subtype(&ibox, &Ty::class("Box", vec![Ty::Int]), &env));
        assert!(h.is_subtype(&ibox, &Ty::class("ExBox", vec![]), &env));
        assert!(!h.is_subtype(&ibox, &Ty::class("Box", vec![Ty::String]), &env));
        assert!(!h.is_subtype(&Ty::class("Box", vec![Ty::Int]), &Ty::class("Box", vec![Ty::Num]), &env));
        assert!(h.is_subtype(&Ty::class("RO", vec![Ty::Int]), &Ty::class("RO", vec![Ty::Num]), &env));
    }

    #[test]
    fn primitives_and_top_bottom() {
        let h = boxes();
        let env = GenericEnv::new();
        assert!(h.is_subtype(&Ty::Int, &Ty::Num, &env));
        assert!(h.is_subtype(&Ty::String, &Ty::Arraykey, &env));
        assert!(!h.is_subtype(&Ty::Float, &Ty::Arraykey, &env));
        assert!(h.is_subtype(&Ty::Nothing, &Ty::Void, &env));
        assert!(!h.is_subtype(&Ty::Void, &Ty::Mixed, &env));
        assert!(h.is_subtype(&Ty::class("IBox", vec![]), &Ty::Mixed, &env));
    }

    #[test]
    fn member_of_relations_follow_inclusion() {
        let h = boxes();
        let env = GenericEnv::new();
        let e = Ty::EnumClass("E".into());
        let f = Ty::EnumClass("F".into());
        let m_e = Ty::member_of(e.clone(), Ty::class("IBox", vec![]));

        assert!(h.is_subtype(&m_e, &Ty::member_of(f.clone(), Ty::class("ExBox", vec![])), &env));
        assert!(!h.is_subtype(&Ty::member_of(f.clone(), Ty::Mixed), &Ty::member_of(e.clone(), Ty::Mixed), &env));
        assert!(h.is_subtype(&m_e, &Ty::class("Box", vec![Ty::Int]), &env));
        assert!(h.is_subtype(&m_e, &e, &env));
        assert!(h.is_subtype(&m_e, &f, &env));
        assert!(h.is_subtype(&e, &Ty::class("ExBox", vec![]), &env));
    }

    #[test]
    fn label_elements_are_invariant() {
        let h = boxes();
        let env = GenericEnv::new();
        let e = Ty::EnumClass("E".into());
        assert!(h.is_subtype(&Ty::label(e.clone(), Ty::Int), &Ty::label(e.clone(), Ty::Int), &env));
        assert!(!h.is_subtype(&Ty::label(e.clone(), Ty::Int), &Ty::label(e, Ty::Num), &env));
    }

    #[test]
    fn bounded_parameters_inherit_their_bound() {
        let h = boxes();
        let env = GenericEnv::from_params([GenericParam {
            name: "TEnum".into(),
            variance: Variance::Invariant,
            bound: Some(Ty::EnumClass("E".into())),
        }]);
        let m = Ty::member_of(Ty::Param("TEnum".into()), Ty::Int);
        assert!(h.is_subtype(&m, &Ty::member_of(Ty::EnumClass("F".into()), Ty::Num), &env));
        assert!(h.is_subtype(&Ty::Param("TEnum".into()), &Ty::class("ExBox", vec![]), &env));
    }

    #[test]
    fn property_lookup_substitutes_ancestors() {
        let h = boxes();
        let env = GenericEnv::new();
        let ibox = Ty::class("IBox", vec![]);
        assert_eq!(h.property(&ibox, "data", &env), Some(Ty::Int));
        let through = Ty::member_of(Ty::EnumClass("E".into()), Ty::class("Box", vec![Ty::String]));
        assert_eq!(h.property(&through, "data", &env), Some(Ty::String));
        assert_eq!(h.property(&ibox, "missing", &env), None);
    }
}
