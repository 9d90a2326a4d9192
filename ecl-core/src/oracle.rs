#![forbid(unsafe_code)]

use crate::types::{GenericEnv, Ty, Variance};

/// Subtype judgments the enum-class checker delegates to the type system.
///
/// `Hierarchy` is the reference implementation; the checker components only
/// ever see this trait.
pub trait TypeOracle: Sync {
    fn is_subtype(&self, sub: &Ty, sup: &Ty, env: &GenericEnv) -> bool;

    /// Instantiate `ty` as the class or interface `class`, returning its type
    /// arguments, or `None` when `ty` does not extend `class`.
    fn ascend(&self, ty: &Ty, class: &str, env: &GenericEnv) -> Option<Vec<Ty>>;

    fn class_variances(&self, class: &str) -> Vec<Variance>;

    /// `a` relates to `b` under `variance`: covariant is `a <: b`,
    /// contravariant is `b <: a`, invariant is both.
    fn related(&self, a: &Ty, b: &Ty, variance: Variance, env: &GenericEnv) -> bool {
        match variance {
            Variance::Covariant => self.is_subtype(a, b, env),
            Variance::Contravariant => self.is_subtype(b, a, env),
            Variance::Invariant => self.is_subtype(a, b, env) && self.is_subtype(b, a, env),
        }
    }

    fn is_equivalent(&self, a: &Ty, b: &Ty, env: &GenericEnv) -> bool {
        self.related(a, b, Variance::Invariant, env)
    }
}
