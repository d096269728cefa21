//! # tagmerge
//!
//! Merge adjacent identical elements in XHTML/XML documents.
//!
//! Ebook converters and editors often leave markup like
//! `<span class="x">Hel</span><span class="x">lo</span>`. tagmerge fuses
//! such runs of sibling elements into one element, at every depth of the
//! tree, optionally restricted to a tag name and to elements whose attribute
//! value matches a literal string or a regular expression.
//!
//! ## Features
//!
//! - Arena document tree parsed with quick-xml that round-trips untouched
//!   markup as written
//! - Literal and regex (prefix-anchored) attribute filters
//! - Batch processing of files, directories and EPUB books in parallel
//! - JSON criteria files
//!
//! ## Quick Start
//!
//! ```
//! use tagmerge::{Criteria, SearchMode, process_markup};
//!
//! let criteria = Criteria::any()
//!     .with_tag("span")
//!     .with_attribute("class", "^calibre", SearchMode::Regex);
//!
//! let out = process_markup(
//!     r#"<p><span class="calibre3">Hel</span><span class="calibre3">lo</span></p>"#,
//!     &criteria,
//! )?;
//!
//! assert_eq!(out.markup, r#"<p><span class="calibre3">Hello</span></p>"#);
//! assert_eq!(out.occurrences, 1);
//! # Ok::<(), tagmerge::Error>(())
//! ```

pub mod criteria;
pub mod dom;
pub mod epub;
pub mod error;
pub mod matcher;
pub mod merge;
pub mod process;
pub(crate) mod util;

pub use criteria::{AttributeFilter, Criteria, CriteriaFile};
pub use dom::{Document, NodeId};
pub use epub::{Selection, rewrite_epub, rewrite_epub_file, scan_epub, scan_epub_file};
pub use error::{Error, Result};
pub use matcher::{SearchMode, ValueMatcher, attribute_sets_equal, values_match};
pub use merge::{Merger, merge};
pub use process::{
    BatchReport, DocumentReport, DocumentStatus, Processed, WriteMode, collect_inputs,
    process_bytes, process_file, process_files, process_markup,
};
