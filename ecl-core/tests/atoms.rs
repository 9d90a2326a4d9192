mod common;

use common::{check, check_with_prelude, codes, parse, PRELUDE};
use ecl_core::{apply_atom_rewrites, Checker, DiagnosticCode, Payload, Ty};

const ATOMS: &str = r#"
enum class E: ExBox {
   Box<string> A = new Box('bli');
   IBox B = Helper::ibox();
   Box<int> B2 = new Box(42);
}

const string NAME = "A";
const string ALIAS = NAME;
const string PREFIX = "B";

function f<T>(<<__Atom>> HH\MemberOf<E, Box<T>> $elt): T {
  return $elt->data;
}

function expect_string(string $x): void {}
function expect_int(int $x): void {}
"#;

fn with_atoms(src: &str) -> String {
    format!("{PRELUDE}\n{ATOMS}\n{src}")
}

#[test]
fn static_names_bind_to_constants() {
    let report = check(&with_atoms(
        r#"
function test(): void {
  expect_string(f(#A));
  expect_string(f("A"));
  expect_string(f(ALIAS));
  expect_int(f(PREFIX . "2"));
  expect_int(f(E#B));
}
"#,
    ));
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let bound: Vec<(&str, &str)> = report
        .rewrites
        .iter()
        .map(|r| (r.enum_class.as_str(), r.constant.as_str()))
        .collect();
    assert_eq!(bound, [("E", "A"), ("E", "A"), ("E", "A"), ("E", "B2"), ("E", "B")]);
    assert!(report.rewrites.iter().all(|r| r.arg_index == 0));
    assert_eq!(
        report.rewrites[3].ty,
        Ty::member_of(Ty::EnumClass("E".into()), Ty::class("Box", vec![Ty::Int]))
    );
}

#[test]
fn rewritten_programs_check_clean() {
    let program = parse(&with_atoms(
        r#"
function test(): void {
  expect_string(f(#A));
  expect_int(f("B2"));
}
"#,
    ));
    let mut checker = Checker::new();
    let first = checker.check_program(&program);
    assert!(first.diagnostics.is_empty(), "{:?}", first.diagnostics);
    assert_eq!(first.rewrites.len(), 2);

    let rewritten = apply_atom_rewrites(&program, &first.rewrites);
    assert_ne!(rewritten, program);
    let second = checker.check_program(&rewritten);
    assert!(second.diagnostics.is_empty(), "{:?}", second.diagnostics);
    assert!(second.rewrites.is_empty());
}

#[test]
fn locals_are_not_static_names() {
    let report = check(&with_atoms(
        r#"
<<__EntryPoint>>
function main() {
  $x = "A";
  echo("Hello " . f($x) . "!\n");
}
"#,
    ));
    assert_eq!(codes(&report), [DiagnosticCode::AtomRequiresStaticName]);
    assert_eq!(
        report.diagnostics.records()[0].payload,
        Payload::AtomRequiresStaticName { param: "elt".into() }
    );
    assert!(report.rewrites.is_empty());
}

#[test]
fn witness_values_pass_through_atom_parameters() {
    let report = check(&with_atoms(
        r#"
function forward<U>(<<__Atom>> HH\MemberOf<E, Box<U>> $elt): U {
  return f($elt);
}

function test(): void {
  expect_string(forward(#A));
  expect_int(f(E::B2));
}
"#,
    ));
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(report.rewrites.len(), 1);
}

#[test]
fn unbounded_enum_parameters_cannot_resolve_names() {
    let report = check(&with_atoms(
        r#"
function g<TE, T>(<<__Atom>> HH\MemberOf<TE, Box<T>> $elt): T {
  return $elt->data;
}

function test(): void {
  $x = "A";
  g("A");
  g($x);
}
"#,
    ));
    assert_eq!(
        codes(&report),
        [DiagnosticCode::UnresolvedEnumClass, DiagnosticCode::AtomRequiresStaticName]
    );
    assert_eq!(
        report.diagnostics.records()[0].payload,
        Payload::UnresolvedEnumClass {
            name: "TE".into(),
            poisoned: false,
        }
    );
}

#[test]
fn bare_enum_class_atoms() {
    let report = check(&with_atoms(
        r#"
function h(<<__Atom>> E $elt): ExBox {
  return $elt;
}

function test(): void {
  h(#B);
  $y = "B";
  h($y);
}
"#,
    ));
    assert_eq!(codes(&report), [DiagnosticCode::AtomRequiresStaticName]);
    assert_eq!(report.rewrites.len(), 1);
    assert_eq!(report.rewrites[0].constant, "B");
}

#[test]
fn names_outside_the_target_are_unknown() {
    let report = check(&with_atoms(
        r#"
enum class Other: ExBox {
   Box<string> A = new Box('other');
}

function test(): void {
  f(#Nope);
  f(Other#A);
}
"#,
    ));
    assert_eq!(
        report.diagnostics.records().iter().map(|d| &d.payload).collect::<Vec<_>>(),
        [
            &Payload::UnknownEnumClassConstant {
                enum_class: "E".into(),
                constant: "Nope".into(),
            },
            &Payload::UnknownEnumClassConstant {
                enum_class: "E".into(),
                constant: "A".into(),
            },
        ]
    );
}

#[test]
fn qualified_names_from_included_classes_resolve() {
    let report = check_with_prelude(
        r#"
enum class Base: ExBox {
   Box<string> A = new Box('base');
}

enum class Wide: ExBox includes Base {
   Box<int> N = new Box(1);
}

function w<T>(<<__Atom>> HH\MemberOf<Wide, Box<T>> $elt): T {
  return $elt->data;
}

function test(): string {
  return w(Base#A);
}
"#,
    );
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(report.rewrites[0].enum_class, "Wide");
    assert_eq!(report.rewrites[0].constant, "A");
}

#[test]
fn pinned_type_arguments_constrain_the_bound_constant() {
    let report = check(&with_atoms(
        r#"
function test(): void {
  f<int>(#A);
}
"#,
    ));
    assert_eq!(
        report.diagnostics.records().iter().map(|d| &d.payload).collect::<Vec<_>>(),
        [&Payload::AtomTypeMismatch {
            constant: "A".into(),
            expected: Ty::class("Box", vec![Ty::Int]),
            actual: Ty::class("Box", vec![Ty::String]),
        }]
    );
}

#[test]
fn earlier_arguments_constrain_the_bound_constant() {
    let report = check(&with_atoms(
        r#"
function g<T>(T $x, <<__Atom>> HH\MemberOf<E, Box<T>> $elt): void {}

function test(): void {
  g(1, "A");
  g(1, "B2");
}
"#,
    ));
    assert_eq!(
        report.diagnostics.records().iter().map(|d| &d.payload).collect::<Vec<_>>(),
        [&Payload::AtomTypeMismatch {
            constant: "A".into(),
            expected: Ty::class("Box", vec![Ty::Int]),
            actual: Ty::class("Box", vec![Ty::String]),
        }]
    );
    assert_eq!(report.diagnostics.records()[0].decl.as_deref(), Some("test"));
}

#[test]
fn atom_attribute_needs_a_witness_parameter() {
    let report = check(&with_atoms(
        r#"
function bad(<<__Atom>> int $x): void {}

function test(): void {
  bad(1);
}
"#,
    ));
    assert_eq!(
        report.diagnostics.records().iter().map(|d| &d.payload).collect::<Vec<_>>(),
        [&Payload::InvalidAtomParameter {
            param: "x".into(),
            ty: Ty::Int,
        }]
    );
}

#[test]
fn rejected_constants_fail_silently() {
    let report = check_with_prelude(
        r#"
enum class R: ExBox {
   int Bad = 1;
   Box<int> Good = new Box(1);
}

function r<T>(<<__Atom>> HH\MemberOf<R, T> $elt): T {
  return $elt;
}

function test(): void {
  r(#Bad);
  r(#Good);
}
"#,
    );
    assert_eq!(codes(&report), [DiagnosticCode::ConstantTypeMismatch]);
    assert_eq!(report.rewrites.len(), 1);
}
