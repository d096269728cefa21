use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::debug;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::parser::{ManifestItem, parse_container_xml, parse_manifest};
use crate::criteria::Criteria;
use crate::error::{Error, Result};
use crate::merge::Merger;
use crate::process::{
    BatchReport, DocumentReport, DocumentStatus, Processed, log_status, process_bytes_with,
};
use crate::util::{decode_text, resolve_href};

/// Which content documents of a book to process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// Every XHTML item in the manifest.
    #[default]
    All,
    /// Only these hrefs, as written in the manifest or as archive paths.
    Only(Vec<String>),
}

impl Selection {
    fn includes(&self, item: &ManifestItem, archive_path: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(hrefs) => hrefs
                .iter()
                .any(|h| h == &item.href || h == archive_path),
        }
    }
}

/// A content document selected for merging.
struct Target {
    href: String,
    archive_path: String,
    data: Vec<u8>,
}

/// Merge results for a book, keyed by archive path.
struct Scan {
    report: BatchReport,
    rewritten: HashMap<String, Vec<u8>>,
}

/// Merge the selected content documents of an EPUB and write a new archive.
///
/// The `mimetype` entry is written first and stored. Entries that were not
/// changed are copied raw, without recompression. A document that fails to
/// merge keeps its original bytes and is reported as skipped.
pub fn rewrite_epub<R: Read + Seek, W: Write + Seek>(
    reader: R,
    writer: W,
    criteria: &Criteria,
    selection: &Selection,
) -> Result<BatchReport> {
    let mut archive = ZipArchive::new(reader)?;
    let Scan {
        report,
        mut rewritten,
    } = scan(&mut archive, criteria, selection)?;

    let mut zip = ZipWriter::new(writer);
    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    // mimetype must be first, uncompressed
    let mut order: Vec<usize> = (0..archive.len()).collect();
    if let Some(index) = archive.index_for_name("mimetype") {
        order.retain(|&i| i != index);
        order.insert(0, index);
    }

    for index in order {
        let entry = archive.by_index_raw(index)?;
        let name = entry.name().to_string();

        match rewritten.remove(&name) {
            Some(data) => {
                drop(entry);
                zip.start_file(name.as_str(), options_deflate)?;
                zip.write_all(&data)?;
            }
            None if name == "mimetype" => {
                drop(entry);
                let mut data = Vec::new();
                archive.by_index(index)?.read_to_end(&mut data)?;
                zip.start_file(name.as_str(), options_stored)?;
                zip.write_all(&data)?;
            }
            None => zip.raw_copy_file(entry)?,
        }
    }

    zip.finish()?;
    Ok(report)
}

/// Read an EPUB from disk, merge it, and write the result to `output`.
///
/// `output` may be the input path. When nothing changed and the output is
/// the input, the file is left untouched.
pub fn rewrite_epub_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    criteria: &Criteria,
    selection: &Selection,
) -> Result<BatchReport> {
    let input = input.as_ref();
    let output = output.as_ref();
    let data = std::fs::read(input)?;

    let mut buffer = Cursor::new(Vec::new());
    let report = rewrite_epub(Cursor::new(&data), &mut buffer, criteria, selection)?;
    if input == output && report.total() == 0 {
        return Ok(report);
    }
    std::fs::write(output, buffer.into_inner())?;
    Ok(report)
}

/// Merge the selected content documents without writing anything.
pub fn scan_epub<R: Read + Seek>(
    reader: R,
    criteria: &Criteria,
    selection: &Selection,
) -> Result<BatchReport> {
    let mut archive = ZipArchive::new(reader)?;
    Ok(scan(&mut archive, criteria, selection)?.report)
}

/// Path form of [`scan_epub`].
pub fn scan_epub_file<P: AsRef<Path>>(
    path: P,
    criteria: &Criteria,
    selection: &Selection,
) -> Result<BatchReport> {
    let file = std::fs::File::open(path)?;
    scan_epub(file, criteria, selection)
}

fn scan<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    criteria: &Criteria,
    selection: &Selection,
) -> Result<Scan> {
    let targets = collect_targets(archive, selection)?;
    debug!(count = targets.len(), "content documents selected");

    let merger = Merger::new(criteria)?;
    let results: Vec<(Target, Result<Processed>)> = targets
        .into_par_iter()
        .map(|target| {
            let result = process_bytes_with(&merger, &target.data);
            (target, result)
        })
        .collect();

    let mut report = BatchReport::new();
    let mut rewritten = HashMap::new();
    for (target, result) in results {
        let status = DocumentStatus::from_result(&result);
        log_status(&target.href, &status);
        if let Ok(processed) = result
            && processed.occurrences > 0
        {
            rewritten.insert(target.archive_path, processed.encoded().into_owned());
        }
        report.push(DocumentReport::new(target.href, status));
    }

    Ok(Scan { report, rewritten })
}

fn collect_targets<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    selection: &Selection,
) -> Result<Vec<Target>> {
    let container = read_archive_file(archive, "META-INF/container.xml")?;
    let opf_path = parse_container_xml(&container)?;
    let opf_dir = opf_path
        .rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default();

    let opf = read_archive_file(archive, &opf_path)?;
    let (opf_text, _) = decode_text(&opf);
    let manifest = parse_manifest(&opf_text)?;

    let mut targets = Vec::new();
    for item in manifest.iter().filter(|item| item.is_xhtml()) {
        let archive_path = resolve_href(&opf_dir, &item.href);
        if !selection.includes(item, &archive_path) {
            continue;
        }
        match read_archive_file(archive, &archive_path) {
            Ok(data) => targets.push(Target {
                href: item.href.clone(),
                archive_path,
                data,
            }),
            Err(e) => debug!(href = %item.href, error = %e, "manifest item missing from archive"),
        }
    }

    Ok(targets)
}

fn read_archive_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(path).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => {
            Error::InvalidEpub(format!("missing archive entry: {path}"))
        }
        other => Error::Zip(other),
    })?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}
