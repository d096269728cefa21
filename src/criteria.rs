//! Merge criteria: which adjacent element pairs qualify for fusion.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matcher::{SearchMode, ValueMatcher};

/// Restrict merging to elements carrying an attribute whose value matches.
///
/// The search value is part of the filter itself, so an attribute filter
/// without a value cannot be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    pub name: String,
    pub search_value: String,
    pub search_mode: SearchMode,
}

impl AttributeFilter {
    pub(crate) fn compile(&self) -> Result<ValueMatcher> {
        ValueMatcher::new(self.search_mode, &self.search_value)
    }
}

/// Immutable criteria for one merge run.
///
/// ```
/// use tagmerge::{Criteria, SearchMode};
///
/// let criteria = Criteria::any()
///     .with_tag("span")
///     .with_attribute("class", "^calibre", SearchMode::Regex);
/// assert!(criteria.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CriteriaFile", into = "CriteriaFile")]
pub struct Criteria {
    tag_filter: Option<String>,
    attribute_filter: Option<AttributeFilter>,
}

impl Criteria {
    /// Merge any adjacent identical elements.
    pub fn any() -> Self {
        Self::default()
    }

    /// Only merge elements with this tag name.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag_filter = Some(tag.into());
        self
    }

    /// Only merge elements whose `name` attribute matches `search_value`.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        search_value: impl Into<String>,
        search_mode: SearchMode,
    ) -> Self {
        self.attribute_filter = Some(AttributeFilter {
            name: name.into(),
            search_value: search_value.into(),
            search_mode,
        });
        self
    }

    /// Build criteria from loosely-typed form values.
    ///
    /// Empty strings count as absent. A search value without an attribute
    /// is ignored; an attribute without a search value is rejected.
    pub fn from_parts(
        tag: Option<&str>,
        attribute: Option<&str>,
        search_value: Option<&str>,
        search_mode: SearchMode,
    ) -> Result<Self> {
        let tag = tag.filter(|s| !s.is_empty());
        let attribute = attribute.filter(|s| !s.is_empty());
        let search_value = search_value.filter(|s| !s.is_empty());

        let mut criteria = Criteria::any();
        if let Some(tag) = tag {
            criteria = criteria.with_tag(tag);
        }
        if let Some(attribute) = attribute {
            let Some(value) = search_value else {
                return Err(Error::MissingSearchValue {
                    attribute: attribute.to_string(),
                });
            };
            criteria = criteria.with_attribute(attribute, value, search_mode);
        }
        Ok(criteria)
    }

    pub fn tag_filter(&self) -> Option<&str> {
        self.tag_filter.as_deref()
    }

    pub fn attribute_filter(&self) -> Option<&AttributeFilter> {
        self.attribute_filter.as_ref()
    }

    /// Check that the search pattern compiles.
    pub fn validate(&self) -> Result<()> {
        if let Some(filter) = &self.attribute_filter {
            filter.compile()?;
        }
        Ok(())
    }

    /// Load criteria from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save criteria to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag_filter {
            Some(tag) => write!(f, "tag <{tag}>")?,
            None => f.write_str("any tag")?,
        }
        match &self.attribute_filter {
            Some(filter) => {
                let op = match filter.search_mode {
                    SearchMode::Literal => "=",
                    SearchMode::Regex => "~",
                };
                write!(f, ", {} {} \"{}\"", filter.name, op, filter.search_value)
            }
            None => Ok(()),
        }
    }
}

/// On-disk form of [`Criteria`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaFile {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub attrib: Option<String>,
    #[serde(default)]
    pub srch_str: Option<String>,
    #[serde(default)]
    pub srch_method: SearchMode,
}

impl TryFrom<CriteriaFile> for Criteria {
    type Error = Error;

    fn try_from(file: CriteriaFile) -> Result<Self> {
        Criteria::from_parts(
            file.tag.as_deref(),
            file.attrib.as_deref(),
            file.srch_str.as_deref(),
            file.srch_method,
        )
    }
}

impl From<Criteria> for CriteriaFile {
    fn from(criteria: Criteria) -> Self {
        let (attrib, srch_str, srch_method) = match criteria.attribute_filter {
            Some(filter) => (
                Some(filter.name),
                Some(filter.search_value),
                filter.search_mode,
            ),
            None => (None, None, SearchMode::default()),
        };
        CriteriaFile {
            tag: criteria.tag_filter,
            attrib,
            srch_str,
            srch_method,
        }
    }
}
