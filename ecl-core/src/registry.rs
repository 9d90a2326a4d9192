#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::cache::{CacheEntry, TableCache};
use crate::decl::EnumClassDecl;
use crate::diagnostics::{Diagnostics, Payload};
use crate::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::linearize::{linearize, validate_poisoned, Dependency};
use crate::oracle::TypeOracle;
use crate::table::{EnumClassTable, PoisonReason, ResolutionState};

/// What a witness type or atom binding finds when it looks up an enum class.
#[derive(Clone, Copy, Debug)]
pub enum Lookup<'a> {
    Resolved(&'a Arc<EnumClassTable>),
    Poisoned(&'a PoisonReason),
    Missing,
}

/// The set of resolved enum-class tables of one checking pass.
#[derive(Clone, Debug, Default)]
pub struct EnumClassRegistry {
    states: BTreeMap<String, ResolutionState>,
    order: Vec<String>,
}

impl EnumClassRegistry {
    /// Resolve every declaration, included-before-includer.
    ///
    /// Declarations whose includes are all settled are linearized layer by
    /// layer (in parallel when `parallel` is set). Whatever is left sits on
    /// or behind an inclusion cycle and goes through the recursive resolver.
    /// Diagnostics come back in declaration order either way.
    pub fn resolve_all(
        decls: &[EnumClassDecl],
        oracle: &dyn TypeOracle,
        hierarchy: Fingerprint,
        cache: &mut TableCache,
        parallel: bool,
    ) -> (Self, Diagnostics) {
        let mut resolver = Resolver::new(decls, oracle, hierarchy);
        resolver.run_layers(cache, parallel);
        resolver.run_leftovers(cache);
        resolver.finish()
    }

    pub fn state(&self, name: &str) -> Option<&ResolutionState> {
        self.states.get(name)
    }

    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        match self.states.get(name) {
            Some(ResolutionState::Resolved(table)) => Lookup::Resolved(table),
            Some(ResolutionState::Poisoned(reason)) => Lookup::Poisoned(reason),
            _ => Lookup::Missing,
        }
    }

    pub fn table(&self, name: &str) -> Option<&Arc<EnumClassTable>> {
        self.states.get(name).and_then(ResolutionState::table)
    }

    pub fn is_poisoned(&self, name: &str) -> bool {
        self.states.get(name).is_some_and(ResolutionState::is_poisoned)
    }

    /// Enum class names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }
}

struct Built {
    table: Arc<EnumClassTable>,
    diags: Diagnostics,
    cached: bool,
}

struct Resolver<'a> {
    decls: Vec<&'a EnumClassDecl>,
    index: HashMap<&'a str, usize>,
    /// Known include targets per declaration, distinct, in include order.
    deps: Vec<Vec<usize>>,
    states: Vec<ResolutionState>,
    diags: Vec<Diagnostics>,
    oracle: &'a dyn TypeOracle,
    hierarchy: Fingerprint,
}

impl<'a> Resolver<'a> {
    fn new(all: &'a [EnumClassDecl], oracle: &'a dyn TypeOracle, hierarchy: Fingerprint) -> Self {
        let mut decls = Vec::new();
        let mut index = HashMap::new();
        for decl in all {
            // Later duplicates are reported during collection and ignored here.
            if !index.contains_key(decl.name.as_str()) {
                index.insert(decl.name.as_str(), decls.len());
                decls.push(decl);
            }
        }

        let deps = decls
            .iter()
            .map(|decl| {
                let mut out: Vec<usize> = Vec::new();
                for inc in &decl.includes {
                    if let Some(&j) = index.get(inc.name.as_str())
                        && !out.contains(&j)
                    {
                        out.push(j);
                    }
                }
                out
            })
            .collect();

        let n = decls.len();
        Self {
            decls,
            index,
            deps,
            states: vec![ResolutionState::Unresolved; n],
            diags: vec![Diagnostics::new(); n],
            oracle,
            hierarchy,
        }
    }

    fn run_layers(&mut self, cache: &mut TableCache, parallel: bool) {
        let n = self.decls.len();
        let mut indegree: Vec<usize> = self.deps.iter().map(Vec::len).collect();
        let mut dependents = vec![Vec::new(); n];
        for (i, deps) in self.deps.iter().enumerate() {
            for &j in deps {
                dependents[j].push(i);
            }
        }

        let mut ready: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut layer_no = 0usize;
        while !ready.is_empty() {
            ready.sort_unstable();
            let layer = std::mem::take(&mut ready);
            debug!(layer = layer_no, size = layer.len(), "linearizing enum class layer");

            let this = &*self;
            let cache_ref = &*cache;
            let built: Vec<(usize, Built)> = if parallel {
                layer.par_iter().map(|&i| (i, this.build(i, cache_ref))).collect()
            } else {
                layer.iter().map(|&i| (i, this.build(i, cache_ref))).collect()
            };

            for (i, b) in built {
                self.install(i, b, cache);
                for &d in &dependents[i] {
                    indegree[d] -= 1;
                    if indegree[d] == 0 {
                        ready.push(d);
                    }
                }
            }
            layer_no += 1;
        }
    }

    /// Memoized recursive resolution for declarations on or behind a cycle.
    ///
    /// `Resolving` marks declarations whose strongly connected component is
    /// still open; reaching one again closes a cycle.
    fn run_leftovers(&mut self, cache: &mut TableCache) {
        let n = self.decls.len();
        let mut walk = Walk {
            index: vec![None; n],
            low: vec![0; n],
            stack: Vec::new(),
            next: 0,
        };
        for i in 0..n {
            if matches!(self.states[i], ResolutionState::Unresolved) {
                self.visit(i, &mut walk, cache);
            }
        }
    }

    fn visit(&mut self, v: usize, walk: &mut Walk, cache: &mut TableCache) {
        walk.index[v] = Some(walk.next);
        walk.low[v] = walk.next;
        walk.next += 1;
        walk.stack.push(v);
        self.states[v] = ResolutionState::Resolving;

        for w in self.deps[v].clone() {
            if matches!(self.states[w], ResolutionState::Unresolved) {
                self.visit(w, walk, cache);
                walk.low[v] = walk.low[v].min(walk.low[w]);
            } else if matches!(self.states[w], ResolutionState::Resolving)
                && let Some(iw) = walk.index[w]
            {
                walk.low[v] = walk.low[v].min(iw);
            }
        }

        if Some(walk.low[v]) != walk.index[v] {
            return;
        }

        let mut component = Vec::new();
        while let Some(w) = walk.stack.pop() {
            component.push(w);
            if w == v {
                break;
            }
        }

        let cyclic = component.len() > 1 || self.deps[v].contains(&v);
        if cyclic {
            component.sort_unstable();
            for &member in &component {
                self.poison(member, &component);
            }
        } else {
            let built = self.build(v, cache);
            self.install(v, built, cache);
        }
    }

    /// Poison `i`, reporting each include that points back into its cycle.
    fn poison(&mut self, i: usize, component: &[usize]) {
        let decl = self.decls[i];
        let mut diags = Diagnostics::new();
        let mut first_path = None;

        for inc in &decl.includes {
            let Some(&target) = self.index.get(inc.name.as_str()) else {
                continue;
            };
            if !component.contains(&target) {
                continue;
            }
            let path = self.cycle_path(i, target, component);
            diags.emit(
                Some(&decl.name),
                inc.span,
                Payload::CyclicInclusion { cycle: path.clone() },
            );
            first_path.get_or_insert(path);
        }

        validate_poisoned(decl, self.oracle, &mut diags);

        let path = first_path.unwrap_or_else(|| vec![decl.name.clone()]);
        debug!(enum_class = %decl.name, cycle = ?path, "poisoned enum class table");
        self.states[i] = ResolutionState::Poisoned(PoisonReason::CyclicInclusion(path));
        self.diags[i].append(diags);
    }

    /// Names along the shortest cycle `from -> via -> ... -> from`, without
    /// repeating `from` at the end.
    fn cycle_path(&self, from: usize, via: usize, component: &[usize]) -> Vec<String> {
        let mut prev: HashMap<usize, usize> = HashMap::new();
        let mut queue = VecDeque::from([via]);
        let mut seen = vec![via];
        let mut reached = via == from;

        while let Some(cur) = queue.pop_front() {
            if reached {
                break;
            }
            for &next in &self.deps[cur] {
                if !component.contains(&next) || seen.contains(&next) {
                    continue;
                }
                seen.push(next);
                prev.insert(next, cur);
                if next == from {
                    reached = true;
                    break;
                }
                queue.push_back(next);
            }
        }

        // Walk back from `from` to `via`.
        let mut rev = Vec::new();
        if via != from {
            let mut cur = from;
            while let Some(&p) = prev.get(&cur) {
                rev.push(p);
                if p == via {
                    break;
                }
                cur = p;
            }
        }
        let mut path = vec![self.decls[from].name.clone()];
        path.extend(rev.iter().rev().map(|&k| self.decls[k].name.clone()));
        path
    }

    fn dependency(&self, name: &str) -> Dependency<'_> {
        let Some(&i) = self.index.get(name) else {
            return Dependency::Missing;
        };
        match &self.states[i] {
            ResolutionState::Resolved(table) => Dependency::Resolved(table),
            ResolutionState::Poisoned(reason) => Dependency::Poisoned(reason),
            ResolutionState::Unresolved | ResolutionState::Resolving => Dependency::Missing,
        }
    }

    /// Fingerprint of everything the table of `decl` is computed from.
    fn input_fingerprint(&self, decl: &EnumClassDecl) -> Fingerprint {
        let mut fp = FingerprintBuilder::new("enum-class-table");
        fp.fingerprint("decl", &decl.fingerprint())
            .fingerprint("hierarchy", &self.hierarchy);
        for inc in &decl.includes {
            match self.dependency(&inc.name) {
                Dependency::Resolved(table) => fp.fingerprint("dep", &table.fingerprint),
                Dependency::Poisoned(_) => fp.field("poisoned", &inc.name),
                Dependency::Missing => fp.field("missing", &inc.name),
            };
        }
        fp.finish()
    }

    fn build(&self, i: usize, cache: &TableCache) -> Built {
        let decl = self.decls[i];
        let fingerprint = self.input_fingerprint(decl);

        if let Some(entry) = cache.get(&decl.name, fingerprint) {
            trace!(enum_class = %decl.name, fingerprint = %fingerprint.short(), "table cache hit");
            let mut diags = Diagnostics::new();
            diags.extend(entry.diagnostics.iter().cloned());
            return Built {
                table: Arc::clone(&entry.table),
                diags,
                cached: true,
            };
        }

        let mut diags = Diagnostics::new();
        let table = linearize(decl, |name| self.dependency(name), self.oracle, fingerprint, &mut diags);
        Built {
            table: Arc::new(table),
            diags,
            cached: false,
        }
    }

    fn install(&mut self, i: usize, built: Built, cache: &mut TableCache) {
        let name = self.decls[i].name.clone();
        debug!(
            enum_class = %name,
            constants = built.table.len(),
            fingerprint = %built.table.fingerprint.short(),
            "resolved enum class table"
        );
        cache.record(built.cached);
        if !built.cached {
            cache.insert(
                name,
                CacheEntry {
                    fingerprint: built.table.fingerprint,
                    table: Arc::clone(&built.table),
                    diagnostics: built.diags.records().to_vec(),
                },
            );
        }
        self.states[i] = ResolutionState::Resolved(built.table);
        self.diags[i].append(built.diags);
    }

    fn finish(self) -> (EnumClassRegistry, Diagnostics) {
        let mut registry = EnumClassRegistry::default();
        let mut diags = Diagnostics::new();
        for ((decl, state), d) in self.decls.iter().zip(self.states).zip(self.diags) {
            registry.order.push(decl.name.clone());
            registry.states.insert(decl.name.clone(), state);
            diags.append(d);
        }
        (registry, diags)
    }
}

struct Walk {
    index: Vec<Option<usize>>,
    low: Vec<usize>,
    stack: Vec<usize>,
    next: usize,
}
