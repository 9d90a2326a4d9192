use miette::Result;
use proptest::{
    prelude::{any, prop, Strategy},
    prop_assert, prop_assert_eq,
    test_runner::{Config, TestRunner},
};

mod common;
use common::parse;
use ecl_core::{CheckOptions, Checker, Ty};

const BOUNDS: [&str; 3] = ["mixed", "arraykey", "int"];
const NAMES: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Clone, Debug)]
struct ClassSpec {
    bound: usize,
    includes: Vec<usize>,
    /// (name index, declared as int rather than string)
    constants: Vec<(usize, bool)>,
}

fn class_spec() -> impl Strategy<Value = ClassSpec> {
    (
        0..BOUNDS.len(),
        prop::collection::vec(0..8usize, 0..3),
        prop::collection::vec((0..NAMES.len(), any::<bool>()), 0..4),
    )
        .prop_map(|(bound, includes, constants)| ClassSpec {
            bound,
            includes,
            constants,
        })
}

fn program() -> impl Strategy<Value = Vec<ClassSpec>> {
    prop::collection::vec(class_spec(), 1..7)
}

fn fits(bound: usize, is_int: bool) -> bool {
    BOUNDS[bound] != "int" || is_int
}

/// Include edges with targets folded into range, duplicates dropped and,
/// for acyclic programs, only pointing at earlier classes.
fn edges(classes: &[ClassSpec], acyclic: bool) -> Vec<Vec<usize>> {
    let n = classes.len();
    classes
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let mut out = Vec::new();
            for &j in &c.includes {
                let j = j % n;
                if (acyclic && j >= i) || out.contains(&j) {
                    continue;
                }
                out.push(j);
            }
            out
        })
        .collect()
}

fn render(classes: &[ClassSpec], edges: &[Vec<usize>]) -> String {
    let mut src = String::new();
    for (i, (c, inc)) in classes.iter().zip(edges).enumerate() {
        src.push_str(&format!("enum class K{i}: {}", BOUNDS[c.bound]));
        if !inc.is_empty() {
            let names: Vec<String> = inc.iter().map(|j| format!("K{j}")).collect();
            src.push_str(&format!(" includes {}", names.join(", ")));
        }
        src.push_str(" {\n");
        for &(name, is_int) in &c.constants {
            if is_int {
                src.push_str(&format!("  int {} = 1;\n", NAMES[name]));
            } else {
                src.push_str(&format!("  string {} = 's';\n", NAMES[name]));
            }
        }
        src.push_str("}\n");
    }
    src
}

/// Expected table order of an acyclic program.
fn model_order(classes: &[ClassSpec], edges: &[Vec<usize>]) -> Vec<Vec<(String, bool)>> {
    let mut tables: Vec<Vec<(String, bool)>> = Vec::new();
    for (c, inc) in classes.iter().zip(edges) {
        let mut table: Vec<(String, bool)> = Vec::new();
        for &j in inc {
            for (name, is_int) in tables[j].clone() {
                if fits(c.bound, is_int) && !table.iter().any(|(n, _)| *n == name) {
                    table.push((name, is_int));
                }
            }
        }
        for &(name, is_int) in &c.constants {
            let name = NAMES[name].to_string();
            if fits(c.bound, is_int) && !table.iter().any(|(n, _)| *n == name) {
                table.push((name, is_int));
            }
        }
        tables.push(table);
    }
    tables
}

fn on_cycle(edges: &[Vec<usize>], start: usize) -> bool {
    let mut stack = edges[start].clone();
    let mut seen = vec![false; edges.len()];
    while let Some(v) = stack.pop() {
        if v == start {
            return true;
        }
        if !std::mem::replace(&mut seen[v], true) {
            stack.extend(edges[v].iter().copied());
        }
    }
    false
}

fn runner() -> TestRunner {
    TestRunner::new(Config {
        cases: 64,
        ..Config::default()
    })
}

#[test]
fn resolved_tables_follow_include_order_and_respect_bounds() -> Result<()> {
    runner()
        .run(&program(), |classes| {
            let edges = edges(&classes, true);
            let report = Checker::new().check_program(&parse(&render(&classes, &edges)));

            for (i, expected) in model_order(&classes, &edges).into_iter().enumerate() {
                let name = format!("K{i}");
                let table = report.registry.table(&name);
                prop_assert!(table.is_some(), "{name} should resolve");
                let Some(table) = table else {
                    continue;
                };
                let actual: Vec<(String, bool)> = table
                    .constants()
                    .iter()
                    .map(|c| (c.name.clone(), c.ty == Ty::Int))
                    .collect();
                prop_assert_eq!(&actual, &expected, "table of {}", name);
                for (_, is_int) in &actual {
                    prop_assert!(fits(classes[i].bound, *is_int));
                }
            }
            Ok(())
        })
        .map_err(|e| miette::miette!("linearization property failed: {e}"))?;
    Ok(())
}

#[test]
fn exactly_the_classes_on_a_cycle_are_poisoned() -> Result<()> {
    runner()
        .run(&program(), |classes| {
            let edges = edges(&classes, false);
            let report = Checker::new().check_program(&parse(&render(&classes, &edges)));

            for i in 0..classes.len() {
                let name = format!("K{i}");
                prop_assert_eq!(report.registry.is_poisoned(&name), on_cycle(&edges, i), "{}", name);
                if let Some(table) = report.registry.table(&name) {
                    for c in table.constants() {
                        prop_assert!(fits(classes[i].bound, c.ty == Ty::Int));
                    }
                }
            }
            Ok(())
        })
        .map_err(|e| miette::miette!("cycle property failed: {e}"))?;
    Ok(())
}

#[test]
fn checking_is_idempotent_and_independent_of_parallelism() -> Result<()> {
    runner()
        .run(&program(), |classes| {
            let edges = edges(&classes, false);
            let program = parse(&render(&classes, &edges));

            let mut cached = Checker::new();
            let first = cached.check_program(&program);
            let again = cached.check_program(&program);
            let sequential = Checker::with_options(CheckOptions { parallel: false }).check_program(&program);

            prop_assert_eq!(&first.diagnostics, &again.diagnostics);
            prop_assert_eq!(&first.diagnostics, &sequential.diagnostics);
            for name in first.registry.names() {
                prop_assert_eq!(first.registry.state(name), again.registry.state(name));
                prop_assert_eq!(first.registry.state(name), sequential.registry.state(name));
            }
            Ok(())
        })
        .map_err(|e| miette::miette!("determinism property failed: {e}"))?;
    Ok(())
}
