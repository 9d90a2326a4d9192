#![forbid(unsafe_code)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

pub const MANIFEST_NAME: &str = "ecl.toml";

#[derive(Debug, Error, Diagnostic)]
#[error("manifest error: {message}")]
#[diagnostic(code(ecl::manifest))]
pub struct ManifestError {
    pub message: String,
}

#[derive(clap::ValueEnum, serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Rendered diagnostics on stderr
    #[default]
    Human,
    /// One JSON document on stdout
    Json,
}

#[derive(Clone, Debug)]
pub struct ResolvedManifest {
    pub manifest_path: Option<PathBuf>,
    pub project_root: PathBuf,
    pub name: Option<String>,

    /// Enabled unstable features.
    pub features: Vec<String>,

    pub deny_warnings: bool,
    pub parallel: bool,
    pub format: OutputFormat,
}

impl ResolvedManifest {
    pub fn empty(project_root: PathBuf) -> Self {
        Self {
            manifest_path: None,
            project_root,
            name: None,
            features: Vec::new(),
            deny_warnings: false,
            parallel: true,
            format: OutputFormat::Human,
        }
    }
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    project: Option<Project>,

    #[serde(default)]
    check: Option<CheckSection>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
struct Project {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    features: Vec<String>,
}

#[derive(Clone, Debug, Default, serde::Deserialize)]
struct CheckSection {
    #[serde(default)]
    deny_warnings: Option<bool>,

    #[serde(default)]
    parallel: Option<bool>,

    #[serde(default)]
    format: Option<OutputFormat>,
}

pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(MANIFEST_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
        match cur.parent() {
            Some(p) => cur = p.to_path_buf(),
            None => return None,
        }
    }
}

pub fn load_resolved_manifest(start: &Path) -> Result<ResolvedManifest, ManifestError> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    let project_root = if start.is_file() {
        start.parent().unwrap_or_else(|| Path::new(".")).to_path_buf()
    } else {
        start.clone()
    };

    let Some(manifest_path) = find_manifest(&project_root) else {
        return Ok(ResolvedManifest::empty(project_root));
    };

    let manifest_dir = manifest_path
        .parent()
        .ok_or_else(|| ManifestError {
            message: "manifest has no parent directory".to_string(),
        })?
        .to_path_buf();

    let raw = fs::read_to_string(&manifest_path).map_err(|e| ManifestError {
        message: format!("failed to read {}: {e}", manifest_path.display()),
    })?;

    let parsed: Manifest = toml::from_str(&raw).map_err(|e| ManifestError {
        message: format!("failed to parse {}: {e}", manifest_path.display()),
    })?;

    let mut out = ResolvedManifest::empty(manifest_dir);
    out.manifest_path = Some(manifest_path);

    if let Some(project) = parsed.project {
        out.name = project.name;
        out.features = dedup_features(project.features);
    }

    if let Some(check) = parsed.check {
        out.deny_warnings = check.deny_warnings.unwrap_or(out.deny_warnings);
        out.parallel = check.parallel.unwrap_or(out.parallel);
        out.format = check.format.unwrap_or(out.format);
    }

    Ok(out)
}

/// Case-insensitive, order preserving.
fn dedup_features(features: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    features
        .into_iter()
        .filter(|f| seen.insert(f.to_ascii_lowercase()))
        .collect()
}
