//! Adjacent element merging.
//!
//! One top-down pass over the document. At every parent, consecutive
//! element children (text, comments and other non-element nodes are skipped
//! when pairing) are fused when they share a tag name and an identical
//! attribute set and pass the criteria filters. Fusing moves the second
//! element's children to the end of the first and discards the second.
//!
//! ```
//! use tagmerge::{Criteria, Document, merge};
//!
//! let mut dom = Document::parse("<p><b>X</b><b>Y</b><i>Z</i></p>").unwrap();
//! let occurrences = merge(&mut dom, &Criteria::any()).unwrap();
//!
//! assert_eq!(occurrences, 1);
//! assert_eq!(dom.serialize(), "<p><b>XY</b><i>Z</i></p>");
//! ```

mod pass;

use tracing::{debug, trace};

use crate::criteria::Criteria;
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::matcher::{ValueMatcher, attribute_sets_equal};

use pass::walk_top_down;

/// Merge adjacent mergeable elements throughout a document.
///
/// Returns the number of fusions performed. The search pattern is compiled
/// before the tree is touched, so an [`Error::InvalidPattern`] leaves the
/// document unmodified.
///
/// [`Error::InvalidPattern`]: crate::Error::InvalidPattern
pub fn merge(dom: &mut Document, criteria: &Criteria) -> Result<usize> {
    Ok(Merger::new(criteria)?.merge(dom))
}

/// A compiled merge predicate.
#[derive(Debug, Clone)]
pub struct Merger {
    tag_filter: Option<String>,
    attribute_filter: Option<(String, ValueMatcher)>,
}

impl Merger {
    /// Compile the criteria.
    pub fn new(criteria: &Criteria) -> Result<Self> {
        let attribute_filter = match criteria.attribute_filter() {
            Some(filter) => Some((filter.name.clone(), filter.compile()?)),
            None => None,
        };
        Ok(Self {
            tag_filter: criteria.tag_filter().map(str::to_string),
            attribute_filter,
        })
    }

    /// Run the merge pass over a document.
    pub fn merge(&self, dom: &mut Document) -> usize {
        let mut occurrences = 0;
        walk_top_down(dom, |dom, parent_id| {
            occurrences += self.merge_siblings(dom, parent_id);
        });
        debug!(occurrences, "merge pass complete");
        occurrences
    }

    /// Check whether two adjacent elements qualify for fusion.
    ///
    /// The attribute filter is checked against `current` only; full
    /// attribute equality between the two is checked independently.
    pub fn qualifies(&self, dom: &Document, current: NodeId, next: NodeId) -> bool {
        let (Some(name), Some(next_name)) = (dom.element_name(current), dom.element_name(next))
        else {
            return false;
        };

        // Nameless elements never match
        if name.is_empty() || name != next_name {
            return false;
        }

        if let Some(tag) = &self.tag_filter
            && name != tag
        {
            return false;
        }

        if let Some((attr_name, matcher)) = &self.attribute_filter {
            match dom.get_attr(current, attr_name) {
                Some(value) if matcher.is_match(value) => {}
                _ => return false,
            }
        }

        attribute_sets_equal(dom.attributes(current), dom.attributes(next))
    }

    fn merge_siblings(&self, dom: &mut Document, parent_id: NodeId) -> usize {
        let mut fused = 0;
        let mut siblings = dom.element_children(parent_id);
        let mut i = 0;

        while i + 1 < siblings.len() {
            let (current, next) = (siblings[i], siblings[i + 1]);
            trace!(
                current = dom.element_name(current),
                next = dom.element_name(next),
                "checking sibling pair"
            );

            if self.qualifies(dom, current, next) {
                fuse(dom, current, next);
                fused += 1;
                // Re-read the live child list; a new sibling now sits at i + 1.
                // Don't advance - it may also fuse into current.
                siblings = dom.element_children(parent_id);
                continue;
            }

            i += 1;
        }

        fused
    }
}

/// Move `next`'s children into `current` and discard `next`.
fn fuse(dom: &mut Document, current: NodeId, next: NodeId) {
    debug!(tag = dom.element_name(current), "fusing adjacent elements");
    dom.move_children(next, current);
    dom.detach(next);
}
