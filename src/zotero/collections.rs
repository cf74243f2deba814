//! Read-only view of the manager's collections.
//!
//! Collections are read straight out of zotero.sqlite rather than over the
//! connector, which does not expose them. Every call opens a fresh
//! read-only connection and re-reads the table, so renames and moves made
//! in the manager are visible immediately and the manager's own writes are
//! never blocked.

use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;

use crate::config::LibraryConfig;
use crate::error::{Error, Result};
use crate::models::{build_tree, Collection, CollectionRow};

#[derive(Debug, Clone)]
pub struct CollectionStore {
    sqlite_path: PathBuf,
}

impl CollectionStore {
    pub fn new(cfg: &LibraryConfig) -> Self {
        Self {
            sqlite_path: cfg.sqlite_path(),
        }
    }

    #[cfg(test)]
    fn at_path(path: PathBuf) -> Self {
        Self { sqlite_path: path }
    }

    fn load_rows(&self) -> Result<Vec<CollectionRow>> {
        let conn = Connection::open_with_flags(
            &self.sqlite_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let mut stmt = conn.prepare(
            "SELECT collectionID, collectionName, parentCollectionID FROM collections",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CollectionRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    parent_id: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// The current collection hierarchy, roots sorted by name.
    pub fn tree(&self) -> Result<Vec<Collection>> {
        Ok(build_tree(&self.load_rows()?))
    }

    /// Indented pre-order listing, one `<key> <name>` line per collection.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for root in self.tree()? {
            Self::render(&root, 0, &mut lines);
        }
        Ok(lines)
    }

    fn render(node: &Collection, depth: usize, out: &mut Vec<String>) {
        out.push(format!(
            "{}{} {}",
            "  ".repeat(depth),
            node.tree_view_id,
            node.name
        ));
        for child in &node.children {
            Self::render(child, depth + 1, out);
        }
    }

    /// Resolve a user-supplied target to a collection.
    ///
    /// Accepts the listing key (`C42`), a bare numeric id, a collection
    /// name, or a `Parent/Child` path. Name matching is case-insensitive;
    /// a bare name searches the whole tree in pre-order and takes the
    /// first hit.
    pub fn resolve(&self, target: &str) -> Result<Collection> {
        let target = target.trim();
        if target.is_empty() {
            return Err(Error::CollectionNotFound(target.to_string()));
        }
        let tree = self.tree()?;

        let id = target
            .strip_prefix(['C', 'c'])
            .unwrap_or(target)
            .parse::<i64>()
            .ok();
        if let Some(id) = id {
            if let Some(found) = Self::find_by_id(&tree, id) {
                return Ok(found);
            }
            return Err(Error::CollectionNotFound(target.to_string()));
        }

        let segments: Vec<&str> = target.split('/').map(str::trim).collect();
        match segments.as_slice() {
            [name] => Self::find_by_name(&tree, name),
            path => Self::find_by_path(&tree, path),
        }
        .ok_or_else(|| Error::CollectionNotFound(target.to_string()))
    }

    fn find_by_id(nodes: &[Collection], id: i64) -> Option<Collection> {
        for node in nodes {
            if node.id == id {
                return Some(node.clone());
            }
            if let Some(found) = Self::find_by_id(&node.children, id) {
                return Some(found);
            }
        }
        None
    }

    fn find_by_name(nodes: &[Collection], name: &str) -> Option<Collection> {
        for node in nodes {
            if node.name.eq_ignore_ascii_case(name) {
                return Some(node.clone());
            }
            if let Some(found) = Self::find_by_name(&node.children, name) {
                return Some(found);
            }
        }
        None
    }

    fn find_by_path(nodes: &[Collection], path: &[&str]) -> Option<Collection> {
        let (head, rest) = path.split_first()?;
        let node = nodes.iter().find(|n| n.name.eq_ignore_ascii_case(head))?;
        if rest.is_empty() {
            Some(node.clone())
        } else {
            Self::find_by_path(&node.children, rest)
        }
    }
}
