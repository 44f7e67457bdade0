//! Artifact service: trigger document generation, fetch one document, or bundle them all.
//!
//! Every operation takes an advisory lock on `<reports_dir>/.lock`. Generation holds it
//! exclusively while it renders; fetch and bundle hold it shared. The lock lives on disk, so
//! separate processes (a `generate` and a `bundle` started side by side) exclude each other
//! too, and a bundle never enumerates a directory that is being rewritten.

use std::fs::{File, OpenOptions};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Serialize;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::models::artifact_stem;
use crate::report::pdf::{self, RenderSummary};
use crate::store::RecordStore;

pub const BUNDLE_NAME: &str = "All_Company_ESG_Reports.zip";
const LOCK_FILE: &str = ".lock";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationMessage {
    pub message: String,
}

/// A binary payload plus the filename it should be served under.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Held advisory lock on the reports directory, released on drop.
struct DirLock {
    file: File,
}

impl DirLock {
    fn open(dir: &Path) -> std::io::Result<File> {
        std::fs::create_dir_all(dir)?;
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))
    }

    fn exclusive(dir: &Path) -> std::io::Result<Self> {
        let file = Self::open(dir)?;
        FileExt::lock_exclusive(&file)?;
        Ok(Self { file })
    }

    fn shared(dir: &Path) -> std::io::Result<Self> {
        let file = Self::open(dir)?;
        FileExt::lock_shared(&file)?;
        Ok(Self { file })
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub struct ArtifactService {
    reports_dir: PathBuf,
    store_path: PathBuf,
}

impl ArtifactService {
    pub fn new(reports_dir: impl Into<PathBuf>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            store_path: store_path.into(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Re-render every document from the current record store.
    ///
    /// Companies whose entry cannot be rendered are logged and skipped; only an unreadable
    /// store or an unusable output directory fails the call.
    pub fn trigger_generation(&self, report_type: &str) -> Result<GenerationMessage> {
        info!(report_type, store = %self.store_path.display(), "generation triggered");
        self.render()?;

        Ok(GenerationMessage {
            message: format!("{} report generated successfully.", capitalize(report_type)),
        })
    }

    /// Render every store entry under the exclusive directory lock.
    pub fn render(&self) -> Result<RenderSummary> {
        let _lock = DirLock::exclusive(&self.reports_dir).map_err(|e| {
            Error::GenerationFailure(format!(
                "cannot lock {}: {}",
                self.reports_dir.display(),
                e
            ))
        })?;

        let entries = RecordStore::load_entries(&self.store_path)
            .map_err(|e| Error::GenerationFailure(e.to_string()))?;
        let summary = pdf::render_all(&entries, &self.reports_dir)
            .map_err(|e| Error::GenerationFailure(format!("{:#}", e)))?;

        if !summary.failed.is_empty() {
            warn!(
                rendered = summary.rendered.len(),
                failed = summary.failed.len(),
                "generation finished with skipped companies"
            );
        }
        Ok(summary)
    }

    /// Return the current document for `company`, served as `<stem>_report.pdf`.
    pub fn fetch_document(&self, company: &str) -> Result<Artifact> {
        let _lock = DirLock::shared(&self.reports_dir)?;

        let stem = artifact_stem(company);
        let path = self.reports_dir.join(format!("{}.pdf", stem));
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Artifact {
                filename: format!("{}_report.pdf", stem),
                bytes,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound {
                company: company.to_string(),
            }),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Zip every `*.pdf` currently in the reports directory. Built fresh on each call.
    pub fn fetch_bundle(&self) -> Result<Artifact> {
        let _lock = DirLock::shared(&self.reports_dir)?;

        let documents = list_documents(&self.reports_dir)?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for path in &documents {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            zip.start_file(name, options).map_err(zip_failure)?;
            zip.write_all(&std::fs::read(path)?)?;
        }

        let bytes = zip.finish().map_err(zip_failure)?.into_inner();
        info!(documents = documents.len(), "bundle built");

        Ok(Artifact {
            filename: BUNDLE_NAME.to_string(),
            bytes,
        })
    }
}

/// Sorted `*.pdf` files in `dir`. A directory that does not exist yet holds no documents.
fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::Io(e)),
    };

    let mut documents = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "pdf") {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

fn zip_failure(e: zip::result::ZipError) -> Error {
    Error::GenerationFailure(format!("cannot build bundle: {}", e))
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
