#![allow(dead_code)]

use ecl_ast::Program;
use ecl_core::{CheckOptions, CheckReport, Checker, DiagnosticCode, Payload};
use ecl_parse::{parse_source_with_config, ParseConfig};

/// Class hierarchy shared by the enum-class fixtures.
pub const PRELUDE: &str = r#"<?hh
interface ExBox {}

class Box<T> implements ExBox {
  public function __construct(public T $data) {}
}

class IBox extends Box<int> {
  public function add(int $x): void {
    $this->data = $this->data + $x;
  }
}

abstract final class Helper {
  public static function ibox(): IBox {
    return new IBox(42);
  }
}
"#;

pub fn parse(src: &str) -> Program {
    let config = ParseConfig::with_features(["enum_class", "enum_atom"]);
    parse_source_with_config(src, &config).expect("fixture should parse")
}

pub fn check(src: &str) -> CheckReport {
    Checker::new().check_program(&parse(src))
}

pub fn check_sequential(src: &str) -> CheckReport {
    Checker::with_options(CheckOptions { parallel: false }).check_program(&parse(src))
}

/// `src` appended to the class prelude.
pub fn check_with_prelude(src: &str) -> CheckReport {
    check(&format!("{PRELUDE}\n{src}"))
}

pub fn codes(report: &CheckReport) -> Vec<DiagnosticCode> {
    report.diagnostics.codes()
}

pub fn payloads(report: &CheckReport, code: DiagnosticCode) -> Vec<&Payload> {
    report
        .diagnostics
        .iter()
        .filter(|d| d.code() == code)
        .map(|d| &d.payload)
        .collect()
}

/// Constant names of `enum_class` in table order.
pub fn table_names(report: &CheckReport, enum_class: &str) -> Vec<String> {
    report
        .registry
        .table(enum_class)
        .unwrap_or_else(|| panic!("{enum_class} should resolve"))
        .names()
        .into_iter()
        .map(str::to_string)
        .collect()
}
