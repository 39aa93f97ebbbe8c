//! Selection model: text ranges and whole-node selections.

use crate::node::NodeKey;
use std::collections::BTreeSet;

/// What a [`Point`] offset counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// `offset` is a `char` offset into a text node.
    Text,
    /// `offset` is a child index into an element.
    Element,
}

/// A caret position in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    /// Node the offset is relative to.
    pub key: NodeKey,
    /// Char offset (text points) or child index (element points).
    pub offset: usize,
    /// Offset interpretation.
    pub kind: PointKind,
}

impl Point {
    /// A point inside a text node.
    pub fn text(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Text,
        }
    }

    /// A point between the children of an element.
    pub fn element(key: NodeKey, offset: usize) -> Self {
        Self {
            key,
            offset,
            kind: PointKind::Element,
        }
    }
}

/// A text range selection. Collapsed when `anchor == focus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSelection {
    /// Where the selection started.
    pub anchor: Point,
    /// Where the selection ends (the moving side).
    pub focus: Point,
}

impl RangeSelection {
    /// A caret.
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    /// Returns `true` if anchor and focus coincide.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// The earlier of anchor and focus in document order, when both are text points in the same
    /// node.
    pub fn ordered_in_text(&self) -> Option<(Point, Point)> {
        if self.anchor.key != self.focus.key
            || self.anchor.kind != PointKind::Text
            || self.focus.kind != PointKind::Text
        {
            return None;
        }
        if self.anchor.offset <= self.focus.offset {
            Some((self.anchor, self.focus))
        } else {
            Some((self.focus, self.anchor))
        }
    }
}

/// A selection of whole nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSelection {
    keys: BTreeSet<NodeKey>,
}

impl NodeSelection {
    /// An empty node selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// A selection of exactly one node.
    pub fn single(key: NodeKey) -> Self {
        let mut selection = Self::new();
        selection.insert(key);
        selection
    }

    /// Add a node.
    pub fn insert(&mut self, key: NodeKey) {
        self.keys.insert(key);
    }

    /// Selected keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.keys.iter().copied()
    }

    /// Whether `key` is selected.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.keys.contains(&key)
    }

    /// Number of selected nodes.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The only selected node, if exactly one is selected.
    pub fn sole(&self) -> Option<NodeKey> {
        if self.keys.len() == 1 {
            self.keys.first().copied()
        } else {
            None
        }
    }

    pub(crate) fn retain(&mut self, mut f: impl FnMut(NodeKey) -> bool) {
        self.keys.retain(|key| f(*key));
    }
}

/// The editor selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A text range (or caret).
    Range(RangeSelection),
    /// Whole nodes.
    Node(NodeSelection),
}

impl Selection {
    /// A caret at `point`.
    pub fn caret(point: Point) -> Self {
        Selection::Range(RangeSelection::collapsed(point))
    }

    /// The range variant, if any.
    pub fn as_range(&self) -> Option<&RangeSelection> {
        match self {
            Selection::Range(range) => Some(range),
            Selection::Node(_) => None,
        }
    }

    /// The node variant, if any.
    pub fn as_node(&self) -> Option<&NodeSelection> {
        match self {
            Selection::Node(nodes) => Some(nodes),
            Selection::Range(_) => None,
        }
    }

    /// The anchor of a range selection.
    pub fn anchor(&self) -> Option<Point> {
        self.as_range().map(|range| range.anchor)
    }

    /// The caret position when this is a collapsed range.
    pub fn caret_point(&self) -> Option<Point> {
        self.as_range()
            .filter(|range| range.is_collapsed())
            .map(|range| range.anchor)
    }
}
