//! Collection tree snapshot loaded from the Zotero library.

use serde::{Deserialize, Serialize};

/// One flat row from the collections table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRow {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// A node in the rooted collection tree. Read-only to this crate; only the
/// Zotero application mutates collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    /// Stable label shown in listings, `C{id}`.
    pub tree_view_id: String,
    pub children: Vec<Collection>,
}

impl Collection {
    pub fn new(id: i64, name: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
            tree_view_id: format!("C{}", id),
            children: Vec::new(),
        }
    }

    /// Count of this node plus all descendants.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Collection::size).sum::<usize>()
    }
}

/// Build the rooted tree from flat rows. Children are ordered by name;
/// rows whose parent is missing from the snapshot are treated as roots so a
/// torn snapshot still yields every collection somewhere in the listing.
pub fn build_tree(rows: &[CollectionRow]) -> Vec<Collection> {
    let known: std::collections::HashSet<i64> = rows.iter().map(|r| r.id).collect();

    fn attach(rows: &[CollectionRow], parent: Option<i64>, known: &std::collections::HashSet<i64>) -> Vec<Collection> {
        let mut nodes: Vec<Collection> = rows
            .iter()
            .filter(|r| match (r.parent_id, parent) {
                (Some(p), Some(q)) => p == q,
                (None, None) => true,
                // Orphaned child: surfaces at the root level.
                (Some(p), None) => !known.contains(&p),
                _ => false,
            })
            .map(|r| {
                let mut node = Collection::new(r.id, r.name.clone(), r.parent_id);
                node.children = attach_children(rows, r.id);
                node
            })
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    fn attach_children(rows: &[CollectionRow], parent: i64) -> Vec<Collection> {
        let mut nodes: Vec<Collection> = rows
            .iter()
            .filter(|r| r.parent_id == Some(parent))
            .map(|r| {
                let mut node = Collection::new(r.id, r.name.clone(), r.parent_id);
                node.children = attach_children(rows, r.id);
                node
            })
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    attach(rows, None, &known)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<CollectionRow> {
        vec![
            CollectionRow { id: 1, name: "Papers".into(), parent_id: None },
            CollectionRow { id: 2, name: "ML".into(), parent_id: Some(1) },
            CollectionRow { id: 3, name: "Biology".into(), parent_id: Some(1) },
            CollectionRow { id: 4, name: "Archive".into(), parent_id: None },
        ]
    }

    #[test]
    fn builds_rooted_tree_sorted_by_name() {
        let tree = build_tree(&rows());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "Archive");
        assert_eq!(tree[1].name, "Papers");
        let children: Vec<&str> = tree[1].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["Biology", "ML"]);
    }

    #[test]
    fn orphans_surface_as_roots() {
        let mut r = rows();
        r.push(CollectionRow { id: 9, name: "Lost".into(), parent_id: Some(999) });
        let tree = build_tree(&r);
        assert!(tree.iter().any(|c| c.id == 9));
    }

    #[test]
    fn tree_view_id_encodes_numeric_id() {
        let node = Collection::new(42, "X", None);
        assert_eq!(node.tree_view_id, "C42");
    }
}
