//! CTF Guard evidence bundle
//!
//! PipelineOutcome → pretty JSON artifacts → SHA256 manifest
//! `verify` recomputes every checksum listed in the manifest.

pub mod inputs;

use anyhow::{bail, Context, Result};
use cg_core::PipelineOutcome;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path};

pub use inputs::{load_seeds, load_spec};

pub const SPEC_BEFORE_FILE: &str = "spec.before.json";
pub const SPEC_AFTER_FILE: &str = "spec.after.json";
pub const AUDIT_BEFORE_FILE: &str = "audit.before.json";
pub const AUDIT_AFTER_FILE: &str = "audit.after.json";
pub const PATCH_FILE: &str = "patch.json";
pub const LOGS_BEFORE_FILE: &str = "logs.before.json";
pub const LOGS_AFTER_FILE: &str = "logs.after.json";
pub const RESULT_FILE: &str = "result.json";
pub const MANIFEST_FILE: &str = "manifest.json";

pub const MANIFEST_VERSION: u32 = 1;

/// One artifact and its checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// File name relative to the output directory
    pub name: String,
    /// SHA256 checksum (lowercase hex)
    pub sha256: String,
    pub bytes: u64,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest_version: u32,
    /// ctf-guard version that wrote the bundle
    pub tool_version: String,
    /// RFC3339
    pub created_at: String,
    /// Final gate verdict of the run
    pub passed: bool,
    pub files: Vec<ManifestEntry>,
}

/// Result of re-hashing a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub checked: usize,
    pub missing: Vec<String>,
    pub mismatched: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn write_json<T: Serialize + ?Sized>(out_dir: &Path, name: &str, value: &T) -> Result<ManifestEntry> {
    let bytes = serde_json::to_vec_pretty(value)
        .with_context(|| format!("Failed to serialize artifact: {}", name))?;
    let path = out_dir.join(name);
    fs::write(&path, &bytes)
        .with_context(|| format!("Failed to write artifact: {}", path.display()))?;

    Ok(ManifestEntry {
        name: name.to_string(),
        sha256: sha256_hex(&bytes),
        bytes: bytes.len() as u64,
    })
}

/// Write every artifact of `outcome` plus `manifest.json` into `out_dir`.
///
/// The directory is created if needed; existing artifacts are overwritten.
pub fn write_artifacts(out_dir: &Path, outcome: &PipelineOutcome) -> Result<Manifest> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let files = vec![
        write_json(out_dir, SPEC_BEFORE_FILE, &outcome.spec_before)?,
        write_json(out_dir, SPEC_AFTER_FILE, outcome.spec_after())?,
        write_json(out_dir, AUDIT_BEFORE_FILE, &outcome.report_before)?,
        write_json(out_dir, AUDIT_AFTER_FILE, outcome.report_after())?,
        write_json(out_dir, PATCH_FILE, outcome.selected_patch())?,
        write_json(out_dir, LOGS_BEFORE_FILE, &outcome.logs_before)?,
        write_json(out_dir, LOGS_AFTER_FILE, outcome.logs_after())?,
        write_json(out_dir, RESULT_FILE, &outcome.summary())?,
    ];

    let manifest = Manifest {
        manifest_version: MANIFEST_VERSION,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        passed: outcome.passed,
        files,
    };

    let path = out_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
    fs::write(&path, json).with_context(|| format!("Failed to write manifest: {}", path.display()))?;
    tracing::debug!(path = %path.display(), files = manifest.files.len(), "manifest written");

    Ok(manifest)
}

pub fn load_manifest(out_dir: &Path) -> Result<Manifest> {
    let path = out_dir.join(MANIFEST_FILE);
    let json = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse manifest: {}", path.display()))
}

/// Manifest names must stay inside the bundle directory.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

/// Recompute the checksum of every file listed in the manifest.
///
/// Missing and altered files are reported, not raised; only an unreadable
/// manifest or an unsafe entry name is an error.
pub fn verify_artifacts(out_dir: &Path) -> Result<VerifyReport> {
    let manifest = load_manifest(out_dir)?;
    let mut report = VerifyReport::default();

    for entry in &manifest.files {
        if !is_plain_file_name(&entry.name) {
            bail!("Manifest entry escapes the bundle directory: {}", entry.name);
        }
        let path = out_dir.join(&entry.name);
        report.checked += 1;
        match fs::read(&path) {
            Ok(bytes) => {
                if sha256_hex(&bytes) != entry.sha256 {
                    report.mismatched.push(entry.name.clone());
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => report.missing.push(entry.name.clone()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read artifact: {}", path.display()))
            }
        }
    }

    Ok(report)
}
