//! EPUB rewriting tests against books assembled in memory.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use tagmerge::{
    Criteria, DocumentStatus, SearchMode, Selection, rewrite_epub, rewrite_epub_file, scan_epub,
    scan_epub_file,
};

const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const OPF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Test</dc:title>
  </metadata>
  <manifest>
    <item id="ch1" href="Text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="Text/ch%202.xhtml" media-type="application/xhtml+xml"/>
    <item id="bad" href="Text/bad.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="Styles/style.css" media-type="text/css"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
    <itemref idref="bad"/>
  </spine>
</package>"#;

const CH1: &str = r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p><span class="c1">Hel</span><span class="c1">lo</span></p></body></html>"#;
const CH2: &str = r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p><b>a</b><b>b</b><b>c</b></p></body></html>"#;
const BAD: &str = r#"<html><body><p><b>unclosed</p></body></html>"#;
const CSS: &str = "span.c1 { font-weight: bold; }";

fn build_epub() -> Vec<u8> {
    build_epub_with(CH1.as_bytes())
}

fn build_epub_with(ch1: &[u8]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    let entries = [
        ("META-INF/container.xml", CONTAINER),
        ("OEBPS/content.opf", OPF),
        ("OEBPS/Text/ch 2.xhtml", CH2),
        ("OEBPS/Text/bad.xhtml", BAD),
        ("OEBPS/Styles/style.css", CSS),
    ];
    for (name, content) in entries {
        zip.start_file(name, deflated).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.start_file("OEBPS/Text/ch1.xhtml", deflated).unwrap();
    zip.write_all(ch1).unwrap();

    zip.finish().unwrap().into_inner()
}

fn read_entry(data: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

fn rewrite(input: &[u8], criteria: &Criteria, selection: &Selection) -> (Vec<u8>, tagmerge::BatchReport) {
    let mut out = Cursor::new(Vec::new());
    let report = rewrite_epub(Cursor::new(input), &mut out, criteria, selection).unwrap();
    (out.into_inner(), report)
}

#[test]
fn test_rewrite_merges_all_content_documents() {
    let epub = build_epub();
    let (out, report) = rewrite(&epub, &Criteria::any(), &Selection::All);

    assert_eq!(report.total(), 3);
    assert_eq!(report.documents.len(), 3);
    assert_eq!(
        read_entry(&out, "OEBPS/Text/ch1.xhtml"),
        r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p><span class="c1">Hello</span></p></body></html>"#
    );
    assert_eq!(
        read_entry(&out, "OEBPS/Text/ch 2.xhtml"),
        r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p><b>abc</b></p></body></html>"#
    );
}

#[test]
fn test_rewrite_keeps_other_entries() {
    let epub = build_epub();
    let (out, _) = rewrite(&epub, &Criteria::any(), &Selection::All);

    assert_eq!(read_entry(&out, "OEBPS/Styles/style.css"), CSS);
    assert_eq!(read_entry(&out, "OEBPS/content.opf"), OPF);
    assert_eq!(read_entry(&out, "META-INF/container.xml"), CONTAINER);
}

#[test]
fn test_mimetype_is_first_and_stored() {
    let epub = build_epub();
    let (out, _) = rewrite(&epub, &Criteria::any(), &Selection::All);

    let mut archive = ZipArchive::new(Cursor::new(out.as_slice())).unwrap();
    let mut first = archive.by_index(0).unwrap();
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), CompressionMethod::Stored);

    let mut content = String::new();
    first.read_to_string(&mut content).unwrap();
    assert_eq!(content, "application/epub+zip");
}

#[test]
fn test_malformed_document_is_skipped_and_kept() {
    let epub = build_epub();
    let (out, report) = rewrite(&epub, &Criteria::any(), &Selection::All);

    let skipped: Vec<_> = report.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].name, "Text/bad.xhtml");
    assert_eq!(read_entry(&out, "OEBPS/Text/bad.xhtml"), BAD);
}

#[test]
fn test_rewritten_item_keeps_declared_encoding() {
    let ch1 = b"<?xml version=\"1.0\" encoding=\"iso-8859-1\"?><p><b>caf\xE9</b><b>!</b></p>";
    let epub = build_epub_with(ch1);
    let selection = Selection::Only(vec!["Text/ch1.xhtml".to_string()]);
    let (out, report) = rewrite(&epub, &Criteria::any(), &selection);
    assert_eq!(report.total(), 1);

    let mut archive = ZipArchive::new(Cursor::new(out.as_slice())).unwrap();
    let mut data = Vec::new();
    archive
        .by_name("OEBPS/Text/ch1.xhtml")
        .unwrap()
        .read_to_end(&mut data)
        .unwrap();
    assert_eq!(
        data,
        b"<?xml version=\"1.0\" encoding=\"iso-8859-1\"?><p><b>caf\xE9!</b></p>"
    );
}

#[test]
fn test_selection_limits_documents() {
    let epub = build_epub();
    let selection = Selection::Only(vec!["Text/ch1.xhtml".to_string()]);
    let (out, report) = rewrite(&epub, &Criteria::any(), &selection);

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].status, DocumentStatus::Changed(1));
    assert_eq!(read_entry(&out, "OEBPS/Text/ch 2.xhtml"), CH2);
}

#[test]
fn test_selection_accepts_archive_paths() {
    let epub = build_epub();
    let selection = Selection::Only(vec!["OEBPS/Text/ch 2.xhtml".to_string()]);
    let (_, report) = rewrite(&epub, &Criteria::any(), &selection);

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].name, "Text/ch%202.xhtml");
    assert_eq!(report.total(), 2);
}

#[test]
fn test_criteria_apply_inside_book() {
    let epub = build_epub();
    let criteria = Criteria::any().with_attribute("class", "^c\\d", SearchMode::Regex);
    let (out, report) = rewrite(&epub, &criteria, &Selection::All);

    assert_eq!(report.total(), 1);
    assert_eq!(read_entry(&out, "OEBPS/Text/ch 2.xhtml"), CH2);
}

#[test]
fn test_invalid_pattern_fails_whole_book() {
    let epub = build_epub();
    let criteria = Criteria::any().with_attribute("class", "[", SearchMode::Regex);
    let mut out = Cursor::new(Vec::new());

    assert!(rewrite_epub(Cursor::new(epub.as_slice()), &mut out, &criteria, &Selection::All).is_err());
}

#[test]
fn test_scan_reports_without_writing() {
    let epub = build_epub();
    let report = scan_epub(Cursor::new(epub.as_slice()), &Criteria::any(), &Selection::All).unwrap();
    assert_eq!(report.total(), 3);
    assert_eq!(report.changed().count(), 2);
}

#[test]
fn test_not_an_epub() {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("readme.txt", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"hello").unwrap();
    let data = zip.finish().unwrap().into_inner();

    let err = scan_epub(Cursor::new(data.as_slice()), &Criteria::any(), &Selection::All).unwrap_err();
    assert!(matches!(err, tagmerge::Error::InvalidEpub(_)));
}

#[test]
fn test_rewrite_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    std::fs::write(&path, build_epub()).unwrap();

    let report = rewrite_epub_file(&path, &path, &Criteria::any(), &Selection::All).unwrap();
    assert_eq!(report.total(), 3);

    let data = std::fs::read(&path).unwrap();
    assert_eq!(
        read_entry(&data, "OEBPS/Text/ch 2.xhtml"),
        r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p><b>abc</b></p></body></html>"#
    );

    let again = scan_epub_file(&path, &Criteria::any(), &Selection::All).unwrap();
    assert_eq!(again.total(), 0);
}

#[test]
fn test_rewrite_file_unchanged_is_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.epub");
    let original = build_epub();
    std::fs::write(&path, &original).unwrap();

    let criteria = Criteria::any().with_tag("table");
    let report = rewrite_epub_file(&path, &path, &criteria, &Selection::All).unwrap();
    assert_eq!(report.total(), 0);
    assert_eq!(std::fs::read(&path).unwrap(), original);
}
