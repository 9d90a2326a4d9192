#![forbid(unsafe_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, NamedSource};
use rayon::prelude::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ecl_core::{CheckOptions, CheckReport, Checker};
use ecl_parse::{ParseConfig, ParseError};

use manifest::{OutputFormat, ResolvedManifest};

mod manifest;
mod render;
mod report;

#[derive(Parser, Debug)]
#[command(name = "ecl", version, about = "Enum class checker for Hack sources")]
struct Cli {
    /// Enable an unstable language feature (repeatable). Also configurable via `ecl.toml`.
    #[arg(long, global = true)]
    feature: Vec<String>,

    /// Log checker phases at debug level. `ECL_LOG` takes precedence.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Resolve and check on the current thread only.
    #[arg(long, global = true)]
    sequential: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Check every .hack/.php file under the given paths
    Check {
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Fail on warnings as well as errors.
        #[arg(long, default_value_t = false)]
        deny_warnings: bool,
    },
    /// Print the linearized constant table of every enum class in a file
    Tables {
        path: PathBuf,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the atom arguments of a file and the constants they bind to
    Rewrite {
        path: PathBuf,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

/// One parsed and checked source file.
pub struct Unit {
    pub name: String,
    pub src: String,
    pub parse_errors: Vec<ParseError>,
    pub report: CheckReport,
}

impl Unit {
    pub fn error_count(&self) -> usize {
        self.parse_errors.len() + self.report.diagnostics.error_count()
    }

    fn failed(&self, deny_warnings: bool) -> bool {
        self.error_count() > 0 || (deny_warnings && self.report.diagnostics.warning_count() > 0)
    }
}

fn main() -> miette::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Check {
            ref paths,
            format,
            deny_warnings,
        } => {
            let start = paths.first().map_or_else(|| PathBuf::from("."), Clone::clone);
            let resolved = manifest::load_resolved_manifest(&start)?;
            let parse_cfg = build_parse_config(&cli.feature, &resolved);
            let options = check_options(&cli, &resolved);
            let format = format.unwrap_or(resolved.format);
            let deny_warnings = deny_warnings || resolved.deny_warnings;

            let files = collect_sources(paths)?;
            debug!(files = files.len(), parallel = options.parallel, "checking");
            let units = check_files(&files, &parse_cfg, options)?;
            let failed = units.iter().any(|u| u.failed(deny_warnings));

            match format {
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&report::check_report(&units, !failed))
                        .into_diagnostic()?;
                    println!("{json}");
                }
                OutputFormat::Human => {
                    let errors: usize = units.iter().map(Unit::error_count).sum();
                    let warnings: usize =
                        units.iter().map(|u| u.report.diagnostics.warning_count()).sum();
                    let count = units.len();
                    for unit in units {
                        emit_unit(unit);
                    }
                    eprintln!("{errors} error(s), {warnings} warning(s) in {count} file(s)");
                }
            }
            Ok(exit(failed))
        }
        Cmd::Tables { ref path, format } => {
            let resolved = manifest::load_resolved_manifest(path)?;
            let parse_cfg = build_parse_config(&cli.feature, &resolved);
            let unit = check_file(path, &parse_cfg, check_options(&cli, &resolved))?;
            let failed = unit.failed(false);

            match format.unwrap_or(resolved.format) {
                OutputFormat::Json => {
                    let tables = report::tables_report(&unit.name, &unit.report.registry);
                    println!("{}", serde_json::to_string_pretty(&tables).into_diagnostic()?);
                }
                OutputFormat::Human => {
                    print!("{}", format_tables(&report::tables_report(&unit.name, &unit.report.registry)));
                    emit_unit(unit);
                }
            }
            Ok(exit(failed))
        }
        Cmd::Rewrite { ref path, format } => {
            let resolved = manifest::load_resolved_manifest(path)?;
            let parse_cfg = build_parse_config(&cli.feature, &resolved);
            let unit = check_file(path, &parse_cfg, check_options(&cli, &resolved))?;
            let failed = unit.failed(false);
            let rewrites = report::rewrites_report(&unit);

            match format.unwrap_or(resolved.format) {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&rewrites).into_diagnostic()?);
                }
                OutputFormat::Human => {
                    for r in &rewrites.rewrites {
                        println!(
                            "{}:{}:{}: argument {} -> {}::{} ({})",
                            rewrites.path, r.line, r.column, r.arg_index, r.enum_class, r.constant, r.ty
                        );
                    }
                    emit_unit(unit);
                }
            }
            Ok(exit(failed))
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("ECL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn exit(failed: bool) -> ExitCode {
    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn build_parse_config(cli_features: &[String], resolved: &ResolvedManifest) -> ParseConfig {
    debug!(
        manifest = ?resolved.manifest_path,
        project = resolved.name.as_deref().unwrap_or("-"),
        root = %resolved.project_root.display(),
        "resolved manifest"
    );
    ParseConfig::with_features(resolved.features.iter().chain(cli_features.iter()).cloned())
}

fn check_options(cli: &Cli, resolved: &ResolvedManifest) -> CheckOptions {
    CheckOptions {
        parallel: resolved.parallel && !cli.sequential,
    }
}

fn collect_sources(paths: &[PathBuf]) -> miette::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for p in paths {
        if fs::metadata(p).into_diagnostic()?.is_dir() {
            collect_source_files(p, &mut out)?;
        } else {
            out.push(p.clone());
        }
    }
    Ok(out)
}

fn collect_source_files(dir: &Path, out: &mut Vec<PathBuf>) -> miette::Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .into_diagnostic()?
        .map(|e| e.map(|e| e.path()).into_diagnostic())
        .collect::<miette::Result<_>>()?;
    entries.sort();
    for p in entries {
        if p.is_dir() {
            collect_source_files(&p, out)?;
        } else if matches!(p.extension().and_then(|e| e.to_str()), Some("hack" | "php")) {
            out.push(p);
        }
    }
    Ok(())
}

/// Files are independent compilation units.
fn check_files(files: &[PathBuf], parse_cfg: &ParseConfig, options: CheckOptions) -> miette::Result<Vec<Unit>> {
    if options.parallel {
        files.par_iter().map(|f| check_file(f, parse_cfg, options)).collect()
    } else {
        files.iter().map(|f| check_file(f, parse_cfg, options)).collect()
    }
}

fn check_file(path: &Path, parse_cfg: &ParseConfig, options: CheckOptions) -> miette::Result<Unit> {
    let name = display_path(path);
    let src = fs::read_to_string(path).into_diagnostic()?;
    let (program, parse_errors) = ecl_parse::parse_source_with_recovery_config(&src, parse_cfg)
        .map_err(|e| e.with_source_code(NamedSource::new(name.clone(), src.clone())))?;

    let report = Checker::with_options(options).check_program(&program);
    debug!(
        file = %name,
        parse_errors = parse_errors.len(),
        diagnostics = report.diagnostics.len(),
        "checked"
    );
    Ok(Unit {
        name,
        src,
        parse_errors,
        report,
    })
}

fn emit_unit(unit: Unit) {
    let Unit {
        name,
        src,
        parse_errors,
        report,
    } = unit;
    for e in parse_errors {
        render::emit_report(&name, &src, miette::Report::new(e));
    }
    render::emit(&name, &src, report.diagnostics.records());
}

fn format_tables(tables: &report::TablesReport) -> String {
    let mut out = String::new();
    for t in &tables.enum_classes {
        match t.state {
            "resolved" => {
                let bound = t.bound.as_deref().unwrap_or("mixed");
                let fp = t.fingerprint.as_deref().map_or("", |f| &f[..f.len().min(12)]);
                out.push_str(&format!("enum class {}: {bound} [{fp}]\n", t.name));
                for (i, c) in t.constants.iter().enumerate() {
                    out.push_str(&format!("  {i:>2} {} : {} (from {})\n", c.name, c.ty, c.owner));
                }
                if !t.rejected.is_empty() {
                    out.push_str(&format!("  rejected: {}\n", t.rejected.join(", ")));
                }
            }
            "poisoned" => {
                let cycle = t.cycle.as_ref().map(|c| c.join(" -> ")).unwrap_or_default();
                out.push_str(&format!("enum class {}: poisoned (cycle {cycle})\n", t.name));
            }
            state => out.push_str(&format!("enum class {}: {state}\n", t.name)),
        }
    }
    out
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
