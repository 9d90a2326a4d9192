mod common;

use common::{check, codes};
use ecl_core::{CheckFailed, Checker, DiagnosticCode, Payload, Ty};
use ecl_parse::{parse_source_with_config, parse_source_with_recovery_config, ParseConfig};

const MEMBER_OF_GENERIC: &str = include_str!("fixtures/member_of_generic.hack");
const INCLUSION: &str = include_str!("fixtures/inclusion.hack");
const ATOM_UNBOUNDED: &str = include_str!("fixtures/atom_unbounded.hack");
const ATOM_ENUM_CLASS: &str = include_str!("fixtures/atom_enum_class.hack");
const LABEL_INCOMPLETE: &str = include_str!("fixtures/label_incomplete.hack");

#[test]
fn file_attribute_is_enough_to_enable_enum_classes() {
    let program = ecl_parse::parse_source(INCLUSION).expect("fixture enables its own features");
    assert_eq!(program.file_features, ["enum_class"]);
}

#[test]
fn member_of_generic_is_ambiguous_and_mistyped() {
    let report = check(MEMBER_OF_GENERIC);
    assert_eq!(
        codes(&report),
        [
            DiagnosticCode::AmbiguousMemberGenericInstantiation,
            DiagnosticCode::TypeMismatch,
        ]
    );
    let records = report.diagnostics.records();
    assert_eq!(records[0].decl.as_deref(), Some("generic"));
    assert_eq!(records[1].decl.as_deref(), Some("testit2"));
    assert_eq!(
        records[1].payload,
        Payload::TypeMismatch {
            expected: Ty::String,
            actual: Ty::Int,
        }
    );

    let failed: CheckFailed = report.into_result().expect_err("errors were reported");
    assert_eq!(failed.errors, 2);
}

#[test]
fn inclusion_fixture_is_valid() {
    let report = check(INCLUSION);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(common::table_names(&report, "F"), ["A", "B", "C", "D"]);

    let f = report.registry.table("F").expect("F resolves");
    assert_eq!(f.get("B").map(|c| c.owner.as_str()), Some("E"));
    assert_eq!(f.get("D").map(|c| c.owner.as_str()), Some("F"));
    assert!(report.into_result().is_ok());
}

#[test]
fn atoms_reject_locals_with_an_unbounded_enum_parameter() {
    let report = check(ATOM_UNBOUNDED);
    assert_eq!(codes(&report), [DiagnosticCode::AtomRequiresStaticName]);
    assert_eq!(report.diagnostics.records()[0].decl.as_deref(), Some("main"));
}

#[test]
fn atoms_reject_locals_with_an_enum_class_parameter() {
    let report = check(ATOM_ENUM_CLASS);
    // `data` is not reachable through the interface bound of `E`.
    assert_eq!(
        codes(&report),
        [DiagnosticCode::UnboundName, DiagnosticCode::AtomRequiresStaticName]
    );
}

#[test]
fn atom_fixture_with_a_static_name_binds() {
    let src = ATOM_ENUM_CLASS.replace("f($x)", "f(#A)");
    let report = check(&src);
    assert_eq!(codes(&report), [DiagnosticCode::UnboundName]);
    assert_eq!(report.rewrites.len(), 1);
    assert_eq!(report.rewrites[0].constant, "A");
}

#[test]
fn incomplete_label_call_does_not_parse() {
    let config = ParseConfig::with_features(["enum_class"]);
    assert!(parse_source_with_config(LABEL_INCOMPLETE, &config).is_err());

    let (program, errors) =
        parse_source_with_recovery_config(LABEL_INCOMPLETE, &config).expect("lexing succeeds");
    assert!(!errors.is_empty());
    let names: Vec<&str> = program.decls.iter().map(|d| d.name().node.as_str()).collect();
    assert_eq!(names, ["E", "C"]);

    let report = Checker::new().check_program(&program);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
}

#[test]
fn completed_label_call_checks() {
    let src = LABEL_INCOMPLETE.replace("C::g<int>#AUTO332", "C::g<int>(#A);");
    let report = check(&src);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    let wrong = LABEL_INCOMPLETE.replace("C::g<int>#AUTO332", "C::g<string>(#A);");
    let report = check(&wrong);
    assert_eq!(codes(&report), [DiagnosticCode::MemberOfTypeMismatch]);
}
