mod common;

use common::{check, check_with_prelude, codes};
use ecl_core::{DiagnosticCode, Payload, Ty};

#[test]
fn initializers_must_fit_the_declared_type() {
    let report = check(
        r#"
enum class E: mixed {
  int X = 'str';
  string Y = 'ok';
}
"#,
    );
    assert_eq!(
        report.diagnostics.records().iter().map(|d| &d.payload).collect::<Vec<_>>(),
        [&Payload::ConstantTypeMismatch {
            constant: "X".into(),
            expected: Ty::Int,
            actual: Ty::String,
        }]
    );
    assert_eq!(report.diagnostics.records()[0].decl.as_deref(), Some("E"));
    // The declared type still stands; the table keeps the constant.
    assert_eq!(common::table_names(&report, "E"), ["X", "Y"]);
}

#[test]
fn constructor_results_are_checked_against_subclasses() {
    let report = check_with_prelude(
        r#"
enum class E: ExBox {
  IBox B = new Box(1);
  IBox C = new IBox(2);
}
"#,
    );
    assert_eq!(
        report.diagnostics.records().iter().map(|d| &d.payload).collect::<Vec<_>>(),
        [&Payload::ConstantTypeMismatch {
            constant: "B".into(),
            expected: Ty::class("IBox", Vec::new()),
            actual: Ty::class("Box", vec![Ty::Int]),
        }]
    );
}

#[test]
fn expected_types_seed_constructor_inference() {
    let report = check_with_prelude(
        r#"
enum class E: ExBox {
  Box<num> N = new Box(1);
  Box<int> S = new Box('s');
}
"#,
    );
    // The argument is wrong, the constant itself is not.
    assert_eq!(codes(&report), [DiagnosticCode::TypeMismatch]);
}

#[test]
fn unknown_names_in_initializers_are_reported_once() {
    let report = check(
        r#"
enum class E: mixed {
  int X = nope();
  int Y = MISSING;
}
"#,
    );
    assert_eq!(codes(&report), [DiagnosticCode::UnboundName, DiagnosticCode::UnboundName]);
}

#[test]
fn bound_violations_and_initializer_problems_are_independent() {
    let report = check(
        r#"
enum class E: int {
  string S = 1;
}
"#,
    );
    assert_eq!(
        codes(&report),
        [DiagnosticCode::ConstantTypeMismatch, DiagnosticCode::ConstantTypeMismatch]
    );
    let payloads: Vec<&Payload> = report.diagnostics.records().iter().map(|d| &d.payload).collect();
    // Bound check first (during linearization), then the initializer.
    assert_eq!(
        payloads[0],
        &Payload::ConstantTypeMismatch {
            constant: "S".into(),
            expected: Ty::Int,
            actual: Ty::String,
        }
    );
    assert_eq!(
        payloads[1],
        &Payload::ConstantTypeMismatch {
            constant: "S".into(),
            expected: Ty::String,
            actual: Ty::Int,
        }
    );
}

#[test]
fn top_level_constants_are_checked_against_their_hint() {
    let report = check(
        r#"
const int N = "x";
const string S = "s" . "t";
const UNTYPED = 3;
"#,
    );
    assert_eq!(
        report.diagnostics.records().iter().map(|d| &d.payload).collect::<Vec<_>>(),
        [&Payload::TypeMismatch {
            expected: Ty::Int,
            actual: Ty::String,
        }]
    );
}

#[test]
fn untyped_top_level_constants_are_still_checked() {
    let report = check(
        r#"
enum class E: mixed {
  int A = 1;
}

const K = E::Z;
const HH\MemberOf<E, int> J = E::Z;
const L = E::A;
"#,
    );
    let records: Vec<(Option<&str>, &Payload)> = report
        .diagnostics
        .iter()
        .map(|d| (d.decl.as_deref(), &d.payload))
        .collect();
    let missing = Payload::UnknownEnumClassConstant {
        enum_class: "E".into(),
        constant: "Z".into(),
    };
    assert_eq!(records, [(Some("K"), &missing), (Some("J"), &missing)]);
}

#[test]
fn duplicate_top_level_names_are_reported() {
    let report = check(
        r#"
function f(): void {}
function f(): void {}
const int f = 1;
"#,
    );
    assert_eq!(codes(&report), [DiagnosticCode::DuplicateDeclaration]);
}
