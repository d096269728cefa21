//! tagmerge - merge adjacent identical elements in XHTML/XML and EPUB files

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tagmerge::{
    BatchReport, Criteria, DocumentReport, DocumentStatus, SearchMode, Selection, WriteMode,
    process_bytes, process_files, rewrite_epub_file, scan_epub_file,
};

#[derive(Parser)]
#[command(name = "tagmerge")]
#[command(version, about = "Merge adjacent identical elements in XHTML/XML documents", long_about = None)]
#[command(after_help = "EXAMPLES:
    tagmerge chapter.xhtml                       Merge any identical adjacent elements
    tagmerge -t span -a class -s calibre3 Text/  Merge <span class=\"calibre3\"> runs
    tagmerge -a class -s '^c\\d' -r book.epub    Match class by regex
    tagmerge book.epub -o merged.epub -n         Report what would change")]
struct Cli {
    /// Input files, directories, or EPUB books
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Only merge elements with this tag name
    #[arg(short, long)]
    tag: Option<String>,

    /// Only merge elements carrying this attribute
    #[arg(short, long = "attr", value_name = "NAME", requires = "value")]
    attribute: Option<String>,

    /// Value the attribute must match
    #[arg(short = 's', long)]
    value: Option<String>,

    /// Treat the value as a regular expression matched at the start
    #[arg(short, long)]
    regex: bool,

    /// Load criteria from a JSON file (overrides -t/-a/-s/-r)
    #[arg(short, long, value_name = "FILE")]
    criteria: Option<PathBuf>,

    /// Save the effective criteria to a JSON file
    #[arg(long, value_name = "FILE")]
    save_criteria: Option<PathBuf>,

    /// Write the result here instead of in place (single input only)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Only process these EPUB content documents (manifest hrefs)
    #[arg(long = "only", value_name = "HREF")]
    only: Vec<String>,

    /// Report what would change without writing
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Suppress the report
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(report) => {
            if !cli.quiet {
                println!("{report}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "tagmerge=debug",
        _ => "tagmerge=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<BatchReport, String> {
    let criteria = load_criteria(cli).map_err(|e| e.to_string())?;
    criteria.validate().map_err(|e| e.to_string())?;

    if let Some(path) = &cli.save_criteria {
        criteria.save(path).map_err(|e| e.to_string())?;
    }

    let mode = if cli.dry_run {
        WriteMode::DryRun
    } else {
        WriteMode::InPlace
    };

    let selection = if cli.only.is_empty() {
        Selection::All
    } else {
        Selection::Only(cli.only.clone())
    };

    match &cli.output {
        Some(output) => {
            let [input] = cli.inputs.as_slice() else {
                return Err("--output requires exactly one input".to_string());
            };
            convert(input, output, &criteria, &selection, mode)
        }
        None if selection != Selection::All => {
            let mut batch = BatchReport::new();
            for input in &cli.inputs {
                require_epub(input)?;
                let report = match mode {
                    WriteMode::InPlace => rewrite_epub_file(input, input, &criteria, &selection),
                    WriteMode::DryRun => scan_epub_file(input, &criteria, &selection),
                };
                batch.extend(report.map_err(|e| format!("{}: {e}", input.display()))?);
            }
            Ok(batch)
        }
        None => Ok(process_files(&cli.inputs, &criteria, mode)),
    }
}

fn load_criteria(cli: &Cli) -> tagmerge::Result<Criteria> {
    if let Some(path) = &cli.criteria {
        return Criteria::load(path);
    }
    let mode = if cli.regex {
        SearchMode::Regex
    } else {
        SearchMode::Literal
    };
    Criteria::from_parts(
        cli.tag.as_deref(),
        cli.attribute.as_deref(),
        cli.value.as_deref(),
        mode,
    )
}

/// Process one input into a separate output file.
fn convert(
    input: &Path,
    output: &Path,
    criteria: &Criteria,
    selection: &Selection,
    mode: WriteMode,
) -> Result<BatchReport, String> {
    if is_epub(input) {
        let report = match mode {
            WriteMode::InPlace => rewrite_epub_file(input, output, criteria, selection),
            WriteMode::DryRun => scan_epub_file(input, criteria, selection),
        };
        return report.map_err(|e| format!("{}: {e}", input.display()));
    }

    if *selection != Selection::All {
        require_epub(input)?;
    }

    let name = input.display().to_string();
    let bytes = std::fs::read(input).map_err(|e| format!("{name}: {e}"))?;
    let result = process_bytes(&bytes, criteria);
    let status = DocumentStatus::from_result(&result);

    if let (Ok(processed), WriteMode::InPlace) = (&result, mode) {
        std::fs::write(output, processed.encoded())
            .map_err(|e| format!("{}: {e}", output.display()))?;
    }

    let mut batch = BatchReport::new();
    batch.push(DocumentReport::new(name, status));
    Ok(batch)
}

fn is_epub(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("epub"))
}

/// `--only` names manifest items, so it needs an EPUB input.
fn require_epub(input: &Path) -> Result<(), String> {
    if is_epub(input) {
        Ok(())
    } else {
        Err(format!("{}: --only requires an EPUB input", input.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_rejects_selection_for_markup_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ch1.xhtml");
        let output = dir.path().join("out.xhtml");
        std::fs::write(&input, "<p><b>a</b><b>b</b></p>").unwrap();

        let selection = Selection::Only(vec!["Text/ch1.xhtml".to_string()]);
        let err = convert(&input, &output, &Criteria::any(), &selection, WriteMode::InPlace)
            .unwrap_err();

        assert!(err.contains("--only requires an EPUB input"));
        assert!(!output.exists());
    }

    #[test]
    fn test_convert_markup_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("ch1.xhtml");
        let output = dir.path().join("out.xhtml");
        std::fs::write(&input, "<p><b>a</b><b>b</b></p>").unwrap();

        let report =
            convert(&input, &output, &Criteria::any(), &Selection::All, WriteMode::InPlace)
                .unwrap();

        assert_eq!(report.total(), 1);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "<p><b>ab</b></p>");
        assert_eq!(
            std::fs::read_to_string(&input).unwrap(),
            "<p><b>a</b><b>b</b></p>"
        );
    }

    #[test]
    fn test_require_epub() {
        assert!(require_epub(Path::new("book.EPUB")).is_ok());
        assert!(require_epub(Path::new("chapter.xhtml")).is_err());
    }
}
