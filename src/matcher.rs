//! Attribute matching: literal and regex value tests, and attribute-set
//! equality.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dom::Attributes;
use crate::error::{Error, Result};

/// How a search value is compared against an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchMode {
    /// Exact string equality.
    #[default]
    #[serde(rename = "normal", alias = "literal")]
    Literal,
    /// Regular expression matched at the start of the value.
    ///
    /// Patterns use the `regex` crate syntax, which has no lookaround or
    /// backreferences; patterns such as `(?=calibre)` or `(a)\1` are
    /// rejected as [`Error::InvalidPattern`].
    #[serde(rename = "regex")]
    Regex,
}

/// A compiled search value.
///
/// Regex patterns match a prefix of the value: the match must begin at
/// position 0 but need not run to the end.
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    Literal(String),
    Regex(Regex),
}

impl ValueMatcher {
    /// Compile a search value for the given mode.
    ///
    /// Fails with [`Error::InvalidPattern`] if a regex does not compile.
    pub fn new(mode: SearchMode, pattern: &str) -> Result<Self> {
        match mode {
            SearchMode::Literal => Ok(ValueMatcher::Literal(pattern.to_string())),
            SearchMode::Regex => {
                let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
                Ok(ValueMatcher::Regex(regex))
            }
        }
    }

    /// Test an attribute value.
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            ValueMatcher::Literal(expected) => value == expected,
            // Leftmost search: a match exists at 0 iff the leftmost one starts there
            ValueMatcher::Regex(regex) => regex.find(value).is_some_and(|m| m.start() == 0),
        }
    }
}

/// Test a single attribute value against a search pattern.
pub fn values_match(value: &str, mode: SearchMode, pattern: &str) -> Result<bool> {
    Ok(ValueMatcher::new(mode, pattern)?.is_match(value))
}

/// Compare two attribute sets for exact equality.
///
/// Two absent sets are equal; exactly one absent is unequal. Otherwise the
/// key sets must be identical and every value must match exactly.
pub fn attribute_sets_equal(a: Option<&Attributes>, b: Option<&Attributes>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|attr| b.get(&attr.name) == Some(attr.value.as_str()))
        }
        _ => false,
    }
}
