mod common;

use common::{check, codes, payloads};
use ecl_core::{DiagnosticCode, Payload};

fn cycle_of(payload: &Payload) -> Vec<&str> {
    let Payload::CyclicInheritance { cycle } = payload else {
        panic!("expected CyclicInheritance, got {payload:?}");
    };
    cycle.iter().map(String::as_str).collect()
}

#[test]
fn branching_interface_cycles_are_reported_and_checking_terminates() {
    let report = check(
        r#"<?hh
interface A extends B, C {}
interface B extends A, C {}
interface C extends A, B {}
class D {}

function f(A $x): D {
  return $x;
}
"#,
    );
    assert_eq!(
        codes(&report),
        [
            DiagnosticCode::CyclicInheritance,
            DiagnosticCode::CyclicInheritance,
            DiagnosticCode::CyclicInheritance,
            DiagnosticCode::TypeMismatch,
        ]
    );
    let cycles: Vec<Vec<&str>> = payloads(&report, DiagnosticCode::CyclicInheritance)
        .into_iter()
        .map(cycle_of)
        .collect();
    assert_eq!(cycles, [vec!["B", "A"], vec!["C", "A", "B"], vec!["C", "B"]]);

    let decls: Vec<Option<&str>> = report.diagnostics.iter().map(|d| d.decl.as_deref()).collect();
    assert_eq!(decls, [Some("B"), Some("C"), Some("C"), Some("f")]);
}

#[test]
fn two_interfaces_extending_each_other_form_one_cycle() {
    let report = check(
        r#"<?hh
interface A extends B {}
interface B extends A {}
class D {}

function f(A $x): D {
  return $x;
}
"#,
    );
    assert_eq!(
        codes(&report),
        [DiagnosticCode::CyclicInheritance, DiagnosticCode::TypeMismatch]
    );
    assert_eq!(
        cycle_of(payloads(&report, DiagnosticCode::CyclicInheritance)[0]),
        ["B", "A"]
    );
}

#[test]
fn a_class_extending_itself_is_a_cycle_of_one() {
    let report = check(
        r#"<?hh
class Loop extends Loop {}
"#,
    );
    assert_eq!(codes(&report), [DiagnosticCode::CyclicInheritance]);
    assert_eq!(
        cycle_of(payloads(&report, DiagnosticCode::CyclicInheritance)[0]),
        ["Loop"]
    );
}

#[test]
fn edges_outside_the_cycle_still_count_for_subtyping() {
    let report = check(
        r#"<?hh
interface I {}
interface A extends B, I {}
interface B extends A {}

function f(A $x): I {
  return $x;
}
"#,
    );
    assert_eq!(codes(&report), [DiagnosticCode::CyclicInheritance]);
    assert_eq!(report.diagnostics.records()[0].decl.as_deref(), Some("B"));
}

#[test]
fn member_records_are_keyed_by_their_owner() {
    let report = check(
        r#"<?hh
class C {
  public Missing $p;
  public function __construct(Missing $y) {}
  public function m(Missing $x): void {}
}
"#,
    );
    assert_eq!(codes(&report), [DiagnosticCode::UnboundName; 3]);
    let decls: Vec<Option<&str>> = report.diagnostics.iter().map(|d| d.decl.as_deref()).collect();
    assert_eq!(decls, [Some("C::p"), Some("C::__construct"), Some("C::m")]);
    assert!(report.diagnostics.has_errors_for("C::m"));
    assert!(!report.diagnostics.has_errors_for("C"));
}
