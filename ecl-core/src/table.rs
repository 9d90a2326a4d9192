#![forbid(unsafe_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use ecl_ast::Span;

use crate::fingerprint::Fingerprint;
use crate::types::Ty;

#[derive(Clone, Debug, PartialEq)]
pub struct ConstantEntry {
    pub name: String,
    pub ty: Ty,
    /// Enum class that declared the constant, not the one including it.
    pub owner: String,
    pub span: Span,
}

/// The resolved, linearized constant set of one enum class.
#[derive(Clone, Debug)]
pub struct EnumClassTable {
    pub name: String,
    pub bound: Ty,
    constants: Vec<ConstantEntry>,
    index: HashMap<String, usize>,
    rejected: BTreeSet<String>,
    pub fingerprint: Fingerprint,
}

impl PartialEq for EnumClassTable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.bound == other.bound
            && self.constants == other.constants
            && self.rejected == other.rejected
    }
}

impl EnumClassTable {
    pub fn new(name: impl Into<String>, bound: Ty) -> Self {
        Self {
            name: name.into(),
            bound,
            constants: Vec::new(),
            index: HashMap::new(),
            rejected: BTreeSet::new(),
            fingerprint: Fingerprint::default(),
        }
    }

    pub fn constants(&self) -> &[ConstantEntry] {
        &self.constants
    }

    pub fn get(&self, name: &str) -> Option<&ConstantEntry> {
        self.index.get(name).map(|&i| &self.constants[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names dropped because their declared type violated a bound. Lookups of
    /// these names fail quietly instead of cascading.
    pub fn is_rejected(&self, name: &str) -> bool {
        self.rejected.contains(name)
    }

    pub fn rejected(&self) -> impl Iterator<Item = &str> {
        self.rejected.iter().map(String::as_str)
    }

    pub fn names(&self) -> Vec<&str> {
        self.constants.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Append a constant. Callers check for collisions first.
    pub(crate) fn push(&mut self, entry: ConstantEntry) {
        self.rejected.remove(&entry.name);
        self.index.insert(entry.name.clone(), self.constants.len());
        self.constants.push(entry);
    }

    pub(crate) fn reject(&mut self, name: &str) {
        if !self.index.contains_key(name) {
            self.rejected.insert(name.to_string());
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoisonReason {
    /// The cycle path, starting at the poisoned enum class.
    CyclicInclusion(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResolutionState {
    Unresolved,
    Resolving,
    Resolved(Arc<EnumClassTable>),
    Poisoned(PoisonReason),
}

impl ResolutionState {
    pub fn table(&self) -> Option<&Arc<EnumClassTable>> {
        match self {
            ResolutionState::Resolved(table) => Some(table),
            _ => None,
        }
    }

    pub fn is_poisoned(&self) -> bool {
        matches!(self, ResolutionState::Poisoned(_))
    }
}
