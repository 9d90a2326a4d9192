#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use thiserror::Error;

use crate::oracle::TypeOracle;
use crate::types::{compose, GenericEnv, Subst, Ty, Variance};

/// One constraint on a solvable parameter: `param` relates to `ty` the way
/// `variance` says (covariant: `ty <: param`).
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub param: String,
    pub ty: Ty,
    pub variance: Variance,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UnifyError {
    #[error("`{actual}` does not fit `{shape}`")]
    ShapeMismatch { shape: Ty, actual: Ty },
    #[error("no single instantiation of `{param}` fits all of {}", display_all(.candidates))]
    Conflict { param: String, candidates: Vec<Ty> },
}

fn display_all(tys: &[Ty]) -> String {
    tys.iter().map(Ty::display).collect::<Vec<_>>().join(", ")
}

/// Matches types against shapes mentioning solvable parameters and merges
/// the resulting bindings.
///
/// There is exactly one policy for "no unique solution": a parameter gets a
/// value only if one of its candidate types satisfies every binding. No
/// union is ever synthesised.
pub struct Unifier<'a> {
    oracle: &'a dyn TypeOracle,
    env: &'a GenericEnv,
    solvable: &'a [String],
}

impl<'a> Unifier<'a> {
    pub fn new(oracle: &'a dyn TypeOracle, env: &'a GenericEnv, solvable: &'a [String]) -> Self {
        Self { oracle, env, solvable }
    }

    fn is_solvable(&self, name: &str) -> bool {
        self.solvable.iter().any(|p| p == name)
    }

    pub fn collect(&self, shape: &Ty, actual: &Ty, variance: Variance) -> Result<Vec<Binding>, UnifyError> {
        let mut out = Vec::new();
        self.collect_into(shape, actual, variance, &mut out)?;
        Ok(out)
    }

    fn collect_into(&self, shape: &Ty, actual: &Ty, variance: Variance, out: &mut Vec<Binding>) -> Result<(), UnifyError> {
        if let Ty::Param(p) = shape
            && self.is_solvable(p)
        {
            out.push(Binding {
                param: p.clone(),
                ty: actual.clone(),
                variance,
            });
            return Ok(());
        }

        if matches!(actual, Ty::Unknown) {
            return Ok(());
        }

        let mismatch = || UnifyError::ShapeMismatch {
            shape: shape.clone(),
            actual: actual.clone(),
        };

        if !shape.mentions_any(self.solvable) {
            return if self.oracle.related(actual, shape, variance, self.env) {
                Ok(())
            } else {
                Err(mismatch())
            };
        }

        match shape {
            Ty::Class { name, args } => {
                let actual_args = match actual {
                    Ty::Class { name: n, args: a } if n == name => Some(a.clone()),
                    _ => self.oracle.ascend(actual, name, self.env),
                };
                let Some(actual_args) = actual_args else {
                    return Err(mismatch());
                };
                if actual_args.len() != args.len() {
                    return Err(mismatch());
                }
                let variances = self.oracle.class_variances(name);
                for (i, (s, a)) in args.iter().zip(&actual_args).enumerate() {
                    let v = variances.get(i).copied().unwrap_or_default();
                    self.collect_into(s, a, compose(variance, v), out)?;
                }
                Ok(())
            }
            Ty::MemberOf { enum_class, elem } => match actual {
                Ty::MemberOf {
                    enum_class: actual_enum,
                    elem: actual_elem,
                } => {
                    self.collect_into(enum_class, actual_enum, variance, out)?;
                    self.collect_into(elem, actual_elem, variance, out)
                }
                _ => Err(mismatch()),
            },
            Ty::Label { enum_class, elem } => match actual {
                Ty::Label {
                    enum_class: actual_enum,
                    elem: actual_elem,
                } => {
                    self.collect_into(enum_class, actual_enum, variance, out)?;
                    self.collect_into(elem, actual_elem, compose(variance, Variance::Invariant), out)
                }
                _ => Err(mismatch()),
            },
            _ => Err(mismatch()),
        }
    }

    /// Merge `bindings` on top of the already `pinned` parameters.
    pub fn solve(&self, bindings: &[Binding], pinned: &Subst) -> Result<Subst, UnifyError> {
        let mut groups: BTreeMap<&str, Vec<&Binding>> = BTreeMap::new();
        for b in bindings {
            groups.entry(b.param.as_str()).or_default().push(b);
        }

        let mut out = pinned.clone();
        for (param, group) in groups {
            if let Some(fixed) = pinned.get(param) {
                if let Some(bad) = group
                    .iter()
                    .find(|b| !self.oracle.related(&b.ty, fixed, b.variance, self.env))
                {
                    return Err(UnifyError::Conflict {
                        param: param.to_string(),
                        candidates: vec![fixed.clone(), bad.ty.clone()],
                    });
                }
                continue;
            }

            let mut candidates: Vec<Ty> = Vec::new();
            for b in &group {
                if !matches!(b.ty, Ty::Unknown) && !candidates.contains(&b.ty) {
                    candidates.push(b.ty.clone());
                }
            }
            if candidates.is_empty() {
                out.insert(param.to_string(), Ty::Unknown);
                continue;
            }

            let chosen = candidates.iter().find(|c| {
                group
                    .iter()
                    .all(|b| self.oracle.related(&b.ty, c, b.variance, self.env))
            });
            match chosen {
                Some(c) => {
                    out.insert(param.to_string(), c.clone());
                }
                None => {
                    return Err(UnifyError::Conflict {
                        param: param.to_string(),
                        candidates,
                    });
                }
            }
        }
        Ok(out)
    }

    pub fn unify(&self, shape: &Ty, actual: &Ty, variance: Variance, pinned: &Subst) -> Result<Subst, UnifyError> {
        let bindings = self.collect(shape, actual, variance)?;
        self.solve(&bindings, pinned)
    }
}
