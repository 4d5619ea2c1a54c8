//! # Conveyor Artifact Versioner
//!
//! Computes the next report version by inspecting previously produced
//! artifacts and validates the HTML/PDF pair a run generates. Versions are
//! derived from the versioned filenames on disk, so they stay monotonic
//! across runs sharing a report directory even if `version.txt` is lost.
pub mod error;

use std::fs;
use std::path::{Path, PathBuf};

pub use error::ReportError;

/// Base name of the versioned report pair: `test_result_report_v{N}.html`
/// and `test_result_report_v{N}.pdf`.
pub const REPORT_BASE_NAME: &str = "test_result_report";

/// Plain-integer file recording the version of the most recent pair.
pub const VERSION_FILE: &str = "version.txt";

/// The versioned HTML/PDF output pair of a single run. Immutable once
/// written; both files of a pair always share the same version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub version: u64,
    pub html_path: PathBuf,
    pub pdf_path: PathBuf,
    pub version_file: PathBuf,
}

impl ReportArtifact {
    /// Resolve the pair for `version` in `report_dir`, verifying that both
    /// members exist. A missing member is a version skew: the error reports
    /// the highest version actually present per extension.
    pub fn expect_pair(report_dir: &Path, version: u64) -> Result<Self, ReportError> {
        let html_path = report_dir.join(format!("{}_v{}.html", REPORT_BASE_NAME, version));
        let pdf_path = report_dir.join(format!("{}_v{}.pdf", REPORT_BASE_NAME, version));

        if !html_path.is_file() || !pdf_path.is_file() {
            let (html, pdf) = latest_versions(report_dir)?;
            return Err(ReportError::VersionMismatch { expected: version, html, pdf });
        }

        Ok(Self {
            version,
            html_path,
            pdf_path,
            version_file: report_dir.join(VERSION_FILE),
        })
    }
}

/// One plus the highest version found among versioned report filenames in
/// `report_dir`; `1` when none exist (or the directory is absent).
pub fn next_version(report_dir: &Path) -> Result<u64, ReportError> {
    let (html, pdf) = latest_versions(report_dir)?;
    Ok(html.max(pdf).map_or(1, |v| v + 1))
}

/// Check that `version.txt` records `version`, as written by the renderer.
pub fn verify_version_file(report_dir: &Path, version: u64) -> Result<(), ReportError> {
    let path = report_dir.join(VERSION_FILE);
    let content = fs::read_to_string(&path).map_err(|e| ReportError::VersionFile {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let recorded: u64 = content.trim().parse().map_err(|_| ReportError::VersionFile {
        path: path.clone(),
        reason: format!("not an integer: {:?}", content.trim()),
    })?;
    if recorded != version {
        return Err(ReportError::VersionFile {
            path,
            reason: format!("records v{recorded}, expected v{version}"),
        });
    }
    Ok(())
}

/// Highest versions present per extension, scanned from filenames.
fn latest_versions(report_dir: &Path) -> Result<(Option<u64>, Option<u64>), ReportError> {
    let mut html = None;
    let mut pdf = None;
    if !report_dir.exists() {
        return Ok((html, pdf));
    }

    let entries = fs::read_dir(report_dir).map_err(|source| ReportError::Scan {
        path: report_dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReportError::Scan {
            path: report_dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some((version, is_html)) = parse_versioned_name(name) {
            let slot = if is_html { &mut html } else { &mut pdf };
            *slot = (*slot).max(Some(version));
        }
    }
    Ok((html, pdf))
}

/// Parse `test_result_report_v{N}.html|pdf`; other names are ignored.
fn parse_versioned_name(name: &str) -> Option<(u64, bool)> {
    let rest = name.strip_prefix(REPORT_BASE_NAME)?.strip_prefix("_v")?;
    if let Some(stem) = rest.strip_suffix(".html") {
        return stem.parse().ok().map(|v| (v, true));
    }
    if let Some(stem) = rest.strip_suffix(".pdf") {
        return stem.parse().ok().map(|v| (v, false));
    }
    None
}
