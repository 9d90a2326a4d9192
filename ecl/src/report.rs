#![forbid(unsafe_code)]

use ecl_ast::Span;
use ecl_core::{EnumClassRegistry, PoisonReason, ResolutionState};
use serde::Serialize;

use crate::{render, Unit};

#[derive(Debug, Clone, Serialize)]
pub struct SpanRange {
    pub offset: usize,
    pub len: usize,
}

impl From<Span> for SpanRange {
    fn from(s: Span) -> Self {
        Self {
            offset: s.offset(),
            len: s.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReportJson {
    pub schema: &'static str,
    pub ok: bool,
    pub errors: usize,
    pub warnings: usize,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    pub parse_errors: Vec<ParseErrorReport>,
    pub diagnostics: Vec<DiagnosticReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseErrorReport {
    pub message: String,
    pub span: SpanRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub code: &'static str,
    pub severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decl: Option<String>,
    pub span: SpanRange,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

pub fn check_report(units: &[Unit], ok: bool) -> CheckReportJson {
    let files: Vec<FileReport> = units.iter().map(file_report).collect();
    CheckReportJson {
        schema: "ecl.check/v1",
        ok,
        errors: units.iter().map(Unit::error_count).sum(),
        warnings: units.iter().map(|u| u.report.diagnostics.warning_count()).sum(),
        files,
    }
}

fn file_report(unit: &Unit) -> FileReport {
    FileReport {
        path: unit.name.clone(),
        parse_errors: unit
            .parse_errors
            .iter()
            .map(|e| ParseErrorReport {
                message: e.message.clone(),
                span: e.span.into(),
            })
            .collect(),
        diagnostics: unit
            .report
            .diagnostics
            .iter()
            .map(|d| {
                let (line, column) = render::line_col(&unit.src, d.span.offset());
                DiagnosticReport {
                    code: d.code().as_str(),
                    severity: d.severity().display(),
                    decl: d.decl.clone(),
                    span: d.span.into(),
                    line,
                    column,
                    message: render::message(&d.payload),
                }
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TablesReport {
    pub schema: &'static str,
    pub path: String,
    pub enum_classes: Vec<TableReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub name: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub constants: Vec<ConstantReport>,
    pub rejected: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConstantReport {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub owner: String,
}

pub fn tables_report(path: &str, registry: &EnumClassRegistry) -> TablesReport {
    TablesReport {
        schema: "ecl.tables/v1",
        path: path.to_string(),
        enum_classes: registry
            .names()
            .iter()
            .map(|name| table_report(name, registry.state(name)))
            .collect(),
    }
}

fn table_report(name: &str, state: Option<&ResolutionState>) -> TableReport {
    let mut out = TableReport {
        name: name.to_string(),
        state: "unresolved",
        bound: None,
        fingerprint: None,
        constants: Vec::new(),
        rejected: Vec::new(),
        cycle: None,
    };
    match state {
        Some(ResolutionState::Resolved(table)) => {
            out.state = "resolved";
            out.bound = Some(table.bound.to_string());
            out.fingerprint = Some(table.fingerprint.to_hex());
            out.constants = table
                .constants()
                .iter()
                .map(|c| ConstantReport {
                    name: c.name.clone(),
                    ty: c.ty.to_string(),
                    owner: c.owner.clone(),
                })
                .collect();
            out.rejected = table.rejected().map(str::to_string).collect();
        }
        Some(ResolutionState::Poisoned(PoisonReason::CyclicInclusion(cycle))) => {
            out.state = "poisoned";
            out.cycle = Some(cycle.clone());
        }
        Some(ResolutionState::Unresolved | ResolutionState::Resolving) | None => {}
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct RewritesReport {
    pub schema: &'static str,
    pub path: String,
    pub rewrites: Vec<RewriteReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewriteReport {
    pub call: SpanRange,
    pub line: usize,
    pub column: usize,
    pub arg_index: usize,
    pub enum_class: String,
    pub constant: String,
    #[serde(rename = "type")]
    pub ty: String,
}

pub fn rewrites_report(unit: &Unit) -> RewritesReport {
    RewritesReport {
        schema: "ecl.rewrites/v1",
        path: unit.name.clone(),
        rewrites: unit
            .report
            .rewrites
            .iter()
            .map(|r| {
                let (line, column) = render::line_col(&unit.src, r.call_span.offset());
                RewriteReport {
                    call: r.call_span.into(),
                    line,
                    column,
                    arg_index: r.arg_index,
                    enum_class: r.enum_class.clone(),
                    constant: r.constant.clone(),
                    ty: r.ty.to_string(),
                }
            })
            .collect(),
    }
}
