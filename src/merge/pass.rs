//! Tree traversal for the merge pass.

use crate::dom::{Document, NodeId};

/// Walk the tree top-down and call visitor at each parent.
///
/// A parent is visited before its children, and its element children are
/// collected only after the visitor returns. Fusing two siblings therefore
/// puts their joined child lists in front of the walk, so the junction
/// between them is examined in the same pass.
pub fn walk_top_down<F>(dom: &mut Document, mut visitor: F)
where
    F: FnMut(&mut Document, NodeId),
{
    let root = dom.document();
    walk_children(dom, root, &mut visitor);
}

fn walk_children<F>(dom: &mut Document, parent_id: NodeId, visitor: &mut F)
where
    F: FnMut(&mut Document, NodeId),
{
    // 1. Visit this parent first (top-down)
    visitor(dom, parent_id);
    // 2. Recurse into the element children that survived the visit
    for child_id in dom.element_children(parent_id) {
        walk_children(dom, child_id, visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visits_every_parent_in_preorder() {
        let mut dom = Document::parse("<a><b><c/></b><d/></a>").unwrap();

        let mut seen = Vec::new();
        walk_top_down(&mut dom, |dom, id| {
            seen.push(dom.element_name(id).unwrap_or("#document").to_string());
        });

        assert_eq!(seen, vec!["#document", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_children_collected_after_visit() {
        let mut dom = Document::parse("<a><b/><c/></a>").unwrap();

        let mut seen = Vec::new();
        walk_top_down(&mut dom, |dom, id| {
            if dom.element_name(id) == Some("a")
                && let Some(c) = dom.find_by_tag("c")
            {
                dom.detach(c);
            }
            seen.push(dom.element_name(id).unwrap_or("#document").to_string());
        });

        assert_eq!(seen, vec!["#document", "a", "b"]);
    }
}
