#![forbid(unsafe_code)]

pub mod atom;
pub mod cache;
pub mod collect;
pub mod constant;
pub mod decl;
pub mod diagnostics;
mod error;
pub mod fingerprint;
pub mod hierarchy;
pub mod infer;
pub mod linearize;
pub mod oracle;
pub mod registry;
mod rewrite;
mod sema;
pub mod table;
pub mod types;
pub mod unify;
pub mod witness;

pub use atom::AtomRewrite;
pub use cache::TableCache;
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Payload, Severity};
pub use error::CheckFailed;
pub use hierarchy::Hierarchy;
pub use oracle::TypeOracle;
pub use registry::EnumClassRegistry;
pub use rewrite::apply_atom_rewrites;
pub use sema::{check_program, CheckOptions, CheckReport, Checker};
pub use table::{ConstantEntry, EnumClassTable, PoisonReason, ResolutionState};
pub use types::{Ty, Variance};
