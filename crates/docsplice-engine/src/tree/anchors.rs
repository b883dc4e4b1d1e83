//! Positions and the markers that keep them valid across structural edits.
//!
//! A [`Marker`] is a handle into the tree's marker slab. Every mutation of
//! [`DocumentTree`](crate::tree::DocumentTree) calls one of the `on_*`
//! rebasing hooks below, so a resolved marker always names a live node.

use std::fmt;

use crate::tree::node::NodeId;

/// A location inside a node: byte offset into its text
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    pub fn start_of(node: NodeId) -> Self {
        Self { node, offset: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.offset)
    }
}

/// An ordered pair of positions
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn collapsed(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Handle to a tracked position; resolve it through the tree that issued it
#[derive(Debug, PartialEq, Eq)]
#[must_use = "markers stay registered until released"]
pub struct Marker {
    slot: usize,
}

/// A tracked range, made of two markers
#[derive(Debug, PartialEq, Eq)]
#[must_use = "markers stay registered until released"]
pub struct RangeMarker {
    pub(crate) start: Marker,
    pub(crate) end: Marker,
}

/// Storage for all live markers of one tree
#[derive(Debug, Clone, Default)]
pub(crate) struct MarkerSlab {
    slots: Vec<Option<Position>>,
    free: Vec<usize>,
}

impl MarkerSlab {
    pub(crate) fn insert(&mut self, position: Position) -> Marker {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(position);
                slot
            }
            None => {
                self.slots.push(Some(position));
                self.slots.len() - 1
            }
        };
        Marker { slot }
    }

    pub(crate) fn get(&self, marker: &Marker) -> Option<Position> {
        self.slots.get(marker.slot).copied().flatten()
    }

    pub(crate) fn set(&mut self, marker: &Marker, position: Position) {
        if let Some(slot) = self.slots.get_mut(marker.slot) {
            *slot = Some(position);
        }
    }

    pub(crate) fn remove(&mut self, marker: Marker) -> Option<Position> {
        let position = self.slots.get_mut(marker.slot)?.take();
        if position.is_some() {
            self.free.push(marker.slot);
        }
        position
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub(crate) fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.slots.iter().filter_map(|slot| *slot)
    }

    fn rebase(&mut self, mut f: impl FnMut(Position) -> Position) {
        for position in self.slots.iter_mut().flatten() {
            *position = f(*position);
        }
    }

    /// `node` was split at `at`; everything at or after it now lives in `right`
    pub(crate) fn on_split(&mut self, node: NodeId, at: usize, right: NodeId) {
        self.rebase(|p| {
            if p.node == node && p.offset >= at {
                Position::new(right, p.offset - at)
            } else {
                p
            }
        });
    }

    /// `left` and `right` were joined into `survivor`, left content first
    pub(crate) fn on_join(&mut self, left: NodeId, right: NodeId, left_len: usize, survivor: NodeId) {
        self.rebase(|p| {
            if p.node == left {
                Position::new(survivor, p.offset)
            } else if p.node == right {
                Position::new(survivor, left_len + p.offset)
            } else {
                p
            }
        });
    }

    /// `len` bytes were inserted into `node` at `at`
    pub(crate) fn on_insert(&mut self, node: NodeId, at: usize, len: usize) {
        self.rebase(|p| {
            if p.node == node && p.offset >= at {
                Position::new(node, p.offset + len)
            } else {
                p
            }
        });
    }

    /// `range` was deleted from the text of `node`
    pub(crate) fn on_delete(&mut self, node: NodeId, range: std::ops::Range<usize>) {
        let removed = range.end - range.start;
        self.rebase(|p| {
            if p.node != node || p.offset <= range.start {
                p
            } else if p.offset >= range.end {
                Position::new(node, p.offset - removed)
            } else {
                Position::new(node, range.start)
            }
        });
    }

    /// `node` left the tree; its markers move to `fallback`
    pub(crate) fn on_remove(&mut self, node: NodeId, fallback: Position) {
        self.rebase(|p| if p.node == node { fallback } else { p });
    }
}
