//! Structural integrity pass.
//!
//! The host's generic editing knows nothing about sections, so a paste, a block merge or a
//! range delete can leave a title outside its container, a container with one part, or a part
//! with no blocks. [`repair_sections`] runs after every commit over the nodes that commit
//! touched and puts each affected section back into shape:
//!
//! - a title or content whose parent is not a container is unwrapped;
//! - a container not shaped `[Title, Content]` is unwrapped entirely;
//! - a container whose parts are both empty is removed, and a single empty part gets a
//!   paragraph;
//! - a container that ends a root-like block list gets a trailing paragraph.
//!
//! On a well-formed tree the pass writes nothing.

use crate::locate::remove_section;
use crate::nodes::{CONTAINER_TYPE, CONTENT_TYPE, TITLE_TYPE, section_keys, unwrap_section};
use blockdoc_core::{NodeKey, Selection, Transaction, TreeError};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, trace};

/// What one integrity pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Titles and contents unwrapped because they were not inside a container.
    pub orphan_parts_unwrapped: usize,
    /// Containers unwrapped because of a wrong shape.
    pub containers_unwrapped: usize,
    /// Containers removed because both parts were empty.
    pub containers_removed: usize,
    /// Empty parts given a placeholder paragraph.
    pub parts_filled: usize,
    /// Trailing paragraphs added after a container.
    pub trailing_paragraphs: usize,
}

impl RepairReport {
    /// Whether the pass changed nothing.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Repair every section touched by `dirty`.
pub fn repair_sections(
    tx: &mut Transaction<'_>,
    dirty: &HashSet<NodeKey>,
) -> Result<RepairReport, TreeError> {
    let mut report = RepairReport::default();
    let mut keys: Vec<NodeKey> = dirty.iter().copied().filter(|key| tx.contains(*key)).collect();
    keys.sort();

    let mut containers = BTreeSet::new();
    let mut block_lists = BTreeSet::new();
    for key in keys {
        if !tx.contains(key) {
            continue;
        }
        if tx.is_type(key, TITLE_TYPE) || tx.is_type(key, CONTENT_TYPE) {
            let Some(parent) = tx.parent(key) else {
                continue;
            };
            if tx.is_type(parent, CONTAINER_TYPE) {
                containers.insert(parent);
            } else {
                trace!(%key, %parent, "unwrapping orphan section part");
                tx.unwrap(key)?;
                block_lists.insert(parent);
                report.orphan_parts_unwrapped += 1;
                continue;
            }
        } else if tx.is_type(key, CONTAINER_TYPE) {
            containers.insert(key);
        }
        if tx.is_root_like(key) {
            block_lists.insert(key);
        }
    }

    for container in containers {
        if !tx.contains(container) {
            continue;
        }
        let parent = tx.parent(container);
        repair_container(tx, container, &mut report)?;
        if let Some(parent) = parent {
            block_lists.insert(parent);
        }
    }

    for list in block_lists {
        if !tx.contains(list) || !tx.is_root_like(list) {
            continue;
        }
        if let Some(last) = tx.last_child(list)
            && tx.is_type(last, CONTAINER_TYPE)
        {
            let paragraph = tx.create_paragraph();
            tx.append(list, paragraph)?;
            report.trailing_paragraphs += 1;
        }
    }

    if !report.is_clean() {
        debug!(?report, "sections repaired");
    }
    Ok(report)
}

fn repair_container(
    tx: &mut Transaction<'_>,
    container: NodeKey,
    report: &mut RepairReport,
) -> Result<(), TreeError> {
    let Some(keys) = section_keys(tx, container) else {
        trace!(%container, "unwrapping misshapen section");
        unwrap_section(tx, container)?;
        report.containers_unwrapped += 1;
        return Ok(());
    };

    let title_empty = tx.children(keys.title).is_empty();
    let content_empty = tx.children(keys.content).is_empty();
    if title_empty && content_empty {
        if selection_touches(tx, container) {
            remove_section(tx, container)?;
        } else {
            let parent = tx.parent(container).ok_or(TreeError::Detached(container))?;
            tx.remove(container)?;
            if tx.children(parent).is_empty() {
                let paragraph = tx.create_paragraph();
                tx.append(parent, paragraph)?;
            }
        }
        report.containers_removed += 1;
        return Ok(());
    }
    for (part, empty) in [(keys.title, title_empty), (keys.content, content_empty)] {
        if empty {
            let paragraph = tx.create_paragraph();
            tx.append(part, paragraph)?;
            report.parts_filled += 1;
        }
    }
    Ok(())
}

fn selection_touches(tx: &Transaction<'_>, container: NodeKey) -> bool {
    let inside = |key: NodeKey| key == container || tx.is_ancestor_of(container, key);
    match tx.selection() {
        Some(Selection::Range(range)) => inside(range.anchor.key) || inside(range.focus.key),
        Some(Selection::Node(nodes)) => nodes.keys().any(inside),
        None => false,
    }
}
