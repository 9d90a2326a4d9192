mod common;

use common::{check_with_prelude, codes, payloads};
use ecl_core::{DiagnosticCode, Payload, Ty};

const BOXES: &str = r#"
enum class E: ExBox {
   Box<string> A = new Box('bli');
   IBox B = Helper::ibox();
   Box<int> B2 = new Box(42);
}

function expect_string(string $x): void {}
function expect_int(int $x): void {}
"#;

fn with_boxes(src: &str) -> String {
    format!("{BOXES}\n{src}")
}

#[test]
fn constant_table_of_the_box_fixture() {
    let report = check_with_prelude(BOXES);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(common::table_names(&report, "E"), ["A", "B", "B2"]);
    let table = report.registry.table("E").expect("E resolves");
    assert_eq!(table.get("B").map(|c| c.ty.clone()), Some(Ty::class("IBox", Vec::new())));
}

#[test]
fn generic_member_of_needs_one_instantiation_for_every_constant() {
    let report = check_with_prelude(&with_boxes(
        r#"
function generic<TEnum as E, T>(HH\MemberOf<TEnum, Box<T>> $param): T {
  return $param->data;
}

function test(): void {
  expect_string(generic(E::B));
}
"#,
    ));
    assert_eq!(
        codes(&report),
        [
            DiagnosticCode::AmbiguousMemberGenericInstantiation,
            DiagnosticCode::TypeMismatch,
        ]
    );
    let Payload::AmbiguousMemberGenericInstantiation { enum_class, param, .. } =
        payloads(&report, DiagnosticCode::AmbiguousMemberGenericInstantiation)[0]
    else {
        unreachable!();
    };
    assert_eq!(enum_class, "E");
    assert_eq!(param, "T");

    let records = report.diagnostics.records();
    assert_eq!(records[0].decl.as_deref(), Some("generic"));
    assert_eq!(records[1].decl.as_deref(), Some("test"));
    assert_eq!(
        records[1].payload,
        Payload::TypeMismatch {
            expected: Ty::String,
            actual: Ty::Int,
        }
    );
}

#[test]
fn pinned_instantiations_must_agree_with_every_constant() {
    let report = check_with_prelude(&with_boxes(
        r#"
function generic<TEnum as E, T>(HH\MemberOf<TEnum, Box<T>> $param): T {
  return $param->data;
}

function test(): void {
  expect_string(generic<E, string>(E::A));
}
"#,
    ));
    let ambiguous: Vec<Option<&str>> = report
        .diagnostics
        .iter()
        .filter(|d| d.code() == DiagnosticCode::AmbiguousMemberGenericInstantiation)
        .map(|d| d.decl.as_deref())
        .collect();
    // Once for the signature, once for the pinned call.
    assert_eq!(ambiguous, [Some("generic"), Some("test")]);
    assert_eq!(report.diagnostics.count(DiagnosticCode::TypeMismatch), 0);
    assert_eq!(report.diagnostics.count(DiagnosticCode::MemberOfTypeMismatch), 0);
}

#[test]
fn enum_position_parameters_without_generic_elements_are_fine() {
    let report = check_with_prelude(&with_boxes(
        r#"
function any_box<TEnum as E>(HH\MemberOf<TEnum, ExBox> $param): ExBox {
  return $param;
}

function test(): void {
  any_box(E::A);
  any_box(E::B);
}
"#,
    ));
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
}

#[test]
fn covariant_elements_settle_on_the_common_supertype() {
    let report = check_with_prelude(
        r#"
class Ro<+T> {
  public function __construct(public T $data) {}
}

enum class N: mixed {
  Ro<int> I = new Ro(1);
  Ro<num> F = new Ro(2);
}

function pick<TEnum as N, T>(HH\MemberOf<TEnum, Ro<T>> $x): T {
  return $x->data;
}

function test(): num {
  return pick(N::F);
}
"#,
    );
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
}

#[test]
fn included_constants_are_members_of_the_includer() {
    let report = check_with_prelude(&with_boxes(
        r#"
enum class F: ExBox includes E {
  Box<int> C = new Box(7);
}

function show(HH\MemberOf<F, ExBox> $x): void {}
function only_e(HH\MemberOf<E, ExBox> $x): void {}

function test(): void {
  show(E::A);
  show(F::A);
  show(F::C);
  only_e(E::B);
}
"#,
    ));
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
}

#[test]
fn the_includer_is_not_a_member_of_what_it_includes() {
    let report = check_with_prelude(&with_boxes(
        r#"
enum class F: ExBox includes E {
  Box<int> C = new Box(7);
}

function only_e(HH\MemberOf<E, ExBox> $x): void {}

function test(): void {
  only_e(F::C);
}
"#,
    ));
    assert_eq!(codes(&report), [DiagnosticCode::TypeMismatch]);
}

#[test]
fn a_direct_reference_must_fit_the_expected_element() {
    let report = check_with_prelude(&with_boxes(
        r#"
function want_int(HH\MemberOf<E, Box<int>> $x): void {}

function test(): void {
  want_int(E::A);
  want_int(E::B2);
}
"#,
    ));
    assert_eq!(
        payloads(&report, DiagnosticCode::MemberOfTypeMismatch),
        [&Payload::MemberOfTypeMismatch {
            enum_class: "E".into(),
            constant: "A".into(),
            expected: Ty::class("Box", vec![Ty::Int]),
            actual: Ty::class("Box", vec![Ty::String]),
        }]
    );
    assert_eq!(codes(&report), [DiagnosticCode::MemberOfTypeMismatch]);
}

#[test]
fn unknown_constants_and_enum_classes_are_reported() {
    let report = check_with_prelude(&with_boxes(
        r#"
function missing(HH\MemberOf<Missing, int> $x): void {}
function not_enum(HH\MemberOf<ExBox, int> $x): void {}

function test(): void {
  E::Nope;
}
"#,
    ));
    assert_eq!(
        codes(&report),
        [
            DiagnosticCode::UnresolvedEnumClass,
            DiagnosticCode::UnresolvedEnumClass,
            DiagnosticCode::UnknownEnumClassConstant,
        ]
    );
    assert_eq!(
        report.diagnostics.records()[0].payload,
        Payload::UnresolvedEnumClass {
            name: "Missing".into(),
            poisoned: false,
        }
    );
    assert_eq!(
        report.diagnostics.records()[2].payload,
        Payload::UnknownEnumClassConstant {
            enum_class: "E".into(),
            constant: "Nope".into(),
        }
    );
}

#[test]
fn witnesses_of_poisoned_classes_say_so() {
    let report = check_with_prelude(
        r#"
enum class P: mixed includes Q { int X = 1; }
enum class Q: mixed includes P { int Y = 2; }

function f(HH\MemberOf<P, int> $x): void {}
"#,
    );
    assert_eq!(
        payloads(&report, DiagnosticCode::UnresolvedEnumClass),
        [&Payload::UnresolvedEnumClass {
            name: "P".into(),
            poisoned: true,
        }]
    );
}

#[test]
fn labels_carry_the_constant_type() {
    let report = check_with_prelude(
        r#"
enum class L: mixed {
  int I = 1;
  string S = 's';
}

function expect_int(int $x): void {}

function get<T>(HH\EnumClass\Label<L, T> $label): T {
  return L::valueOf($label);
}

function name_of<T>(HH\EnumClass\Label<L, T> $label): string {
  return L::nameOf($label);
}

function test(): void {
  expect_int(get(#I));
  expect_int(get(L#I));
  echo name_of(#S);
  expect_int(get(L#S));
}
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
