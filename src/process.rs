//! Document processing: parse, merge, serialize, and batch reporting.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::criteria::Criteria;
use crate::dom::Document;
use crate::epub::{self, Selection};
use crate::error::Result;
use crate::merge::Merger;
use crate::util::{decode_text, is_epub_path, is_markup_path};

/// The rewritten markup of one document and the number of fusions made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub markup: String,
    pub occurrences: usize,
    /// Encoding the source was decoded with; output is written back in it.
    pub encoding: &'static Encoding,
}

impl Processed {
    /// The markup encoded for writing back.
    ///
    /// Characters the encoding cannot represent become numeric character
    /// references.
    pub fn encoded(&self) -> Cow<'_, [u8]> {
        let (bytes, _, _) = self.encoding.encode(&self.markup);
        bytes
    }
}

/// Merge one document's markup.
///
/// Any error discards the document; nothing is partially applied.
pub fn process_markup(text: &str, criteria: &Criteria) -> Result<Processed> {
    let merger = Merger::new(criteria)?;
    process_with(&merger, text, encoding_rs::UTF_8)
}

/// Decode raw document bytes and merge them.
///
/// The result remembers the source encoding, so [`Processed::encoded`]
/// matches what the document's XML declaration says.
pub fn process_bytes(bytes: &[u8], criteria: &Criteria) -> Result<Processed> {
    let merger = Merger::new(criteria)?;
    process_bytes_with(&merger, bytes)
}

pub(crate) fn process_bytes_with(merger: &Merger, bytes: &[u8]) -> Result<Processed> {
    let (text, encoding) = decode_text(bytes);
    process_with(merger, &text, encoding)
}

fn process_with(merger: &Merger, text: &str, encoding: &'static Encoding) -> Result<Processed> {
    let mut dom = Document::parse(text)?;
    let occurrences = merger.merge(&mut dom);
    Ok(Processed {
        markup: dom.serialize(),
        occurrences,
        encoding,
    })
}

/// Outcome for one document in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Merged with this many fusions.
    Changed(usize),
    /// Nothing matched the criteria.
    Unchanged,
    /// Could not be processed; left as it was.
    Skipped(String),
}

impl DocumentStatus {
    pub fn from_result(result: &Result<Processed>) -> Self {
        match result {
            Ok(p) if p.occurrences > 0 => DocumentStatus::Changed(p.occurrences),
            Ok(_) => DocumentStatus::Unchanged,
            Err(e) => DocumentStatus::Skipped(e.to_string()),
        }
    }

    pub fn occurrences(&self) -> usize {
        match self {
            DocumentStatus::Changed(n) => *n,
            _ => 0,
        }
    }
}

/// Per-document line of a batch report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub name: String,
    pub status: DocumentStatus,
}

impl DocumentReport {
    pub fn new(name: impl Into<String>, status: DocumentStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

impl fmt::Display for DocumentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            DocumentStatus::Changed(n) => {
                write!(f, "Occurrences found/changed in {}: {}", self.name, n)
            }
            DocumentStatus::Unchanged => write!(f, "Criteria not found in {}", self.name),
            DocumentStatus::Skipped(reason) => {
                write!(f, "Error parsing {}! File skipped. ({})", self.name, reason)
            }
        }
    }
}

/// Results of processing a set of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: DocumentReport) {
        self.documents.push(report);
    }

    pub fn extend(&mut self, other: BatchReport) {
        self.documents.extend(other.documents);
    }

    /// Total fusions across all documents.
    pub fn total(&self) -> usize {
        self.documents.iter().map(|d| d.status.occurrences()).sum()
    }

    pub fn changed(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents
            .iter()
            .filter(|d| matches!(d.status, DocumentStatus::Changed(_)))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &DocumentReport> {
        self.documents
            .iter()
            .filter(|d| matches!(d.status, DocumentStatus::Skipped(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for doc in &self.documents {
            writeln!(f, "{doc}")?;
        }
        let total = self.total();
        if total > 0 {
            write!(f, "Total occurrences found/changed: {total}")
        } else {
            write!(f, "No changes made")
        }
    }
}

/// Whether changed documents are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Overwrite each changed document.
    #[default]
    InPlace,
    /// Report only.
    DryRun,
}

/// Expand inputs into the documents to process.
///
/// Directories are walked for markup files and EPUBs, sorted by path;
/// explicit file paths are taken as given.
pub fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<_> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_markup_path(p) || is_epub_path(p))
                .collect();
            found.sort();
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    paths
}

/// Merge every document named by `inputs`.
///
/// Markup files and EPUBs are processed in parallel, one task per input.
/// A document that fails is reported as skipped and never aborts the batch.
pub fn process_files(inputs: &[PathBuf], criteria: &Criteria, mode: WriteMode) -> BatchReport {
    let paths = collect_inputs(inputs);
    debug!(count = paths.len(), %criteria, "processing documents");

    let reports: Vec<BatchReport> = paths
        .par_iter()
        .map(|path| {
            if is_epub_path(path) {
                process_epub(path, criteria, mode)
            } else {
                let mut report = BatchReport::new();
                report.push(process_file(path, criteria, mode));
                report
            }
        })
        .collect();

    let mut batch = BatchReport::new();
    for report in reports {
        batch.extend(report);
    }
    batch
}

/// Merge a single markup file, writing it back if changed.
pub fn process_file(path: &Path, criteria: &Criteria, mode: WriteMode) -> DocumentReport {
    let name = path.display().to_string();
    let result: Result<Processed> = std::fs::read(path)
        .map_err(Into::into)
        .and_then(|bytes| process_bytes(&bytes, criteria));

    let mut status = DocumentStatus::from_result(&result);
    match (&result, mode) {
        (Ok(processed), WriteMode::InPlace) if processed.occurrences > 0 => {
            if let Err(e) = std::fs::write(path, processed.encoded()) {
                status = DocumentStatus::Skipped(e.to_string());
            }
        }
        _ => {}
    }

    log_status(&name, &status);
    DocumentReport::new(name, status)
}

fn process_epub(path: &Path, criteria: &Criteria, mode: WriteMode) -> BatchReport {
    let result = match mode {
        WriteMode::InPlace => epub::rewrite_epub_file(path, path, criteria, &Selection::All),
        WriteMode::DryRun => epub::scan_epub_file(path, criteria, &Selection::All),
    };

    match result {
        Ok(report) => report,
        Err(e) => {
            let status = DocumentStatus::Skipped(e.to_string());
            let name = path.display().to_string();
            log_status(&name, &status);
            BatchReport {
                documents: vec![DocumentReport::new(name, status)],
            }
        }
    }
}

pub(crate) fn log_status(name: &str, status: &DocumentStatus) {
    match status {
        DocumentStatus::Changed(n) => info!(document = name, occurrences = n, "merged"),
        DocumentStatus::Unchanged => debug!(document = name, "no matches"),
        DocumentStatus::Skipped(reason) => warn!(document = name, %reason, "skipped"),
    }
}
