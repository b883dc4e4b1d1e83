use std::collections::HashMap;
use std::fmt::Write as _;

use xi_rope::Rope;

use crate::tree::anchors::{Marker, MarkerSlab, Position, Range, RangeMarker};
use crate::tree::format::{
    CharFormat, InlineHint, ListId, ParagraphFormat, StyleRef, StyleSheet,
};
use crate::tree::node::{Node, NodeId, NodeKind, ObjectKind};

/// Placeholder used for object nodes in [`DocumentTree::text`]
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Structural precondition violations reported by tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node {0} is not part of the document")]
    DeadNode(NodeId),
    #[error("position {position} is outside a node of length {len}")]
    OffsetOutOfBounds { position: Position, len: usize },
    #[error("position {0} does not fall on a character boundary")]
    NotCharBoundary(Position),
    #[error("node {0} does not hold text")]
    NotText(NodeId),
    #[error("range {0} runs backwards")]
    InvertedRange(Range),
    #[error("hint {range:?} exceeds node {node} of length {len}")]
    HintOutOfBounds {
        node: NodeId,
        range: std::ops::Range<usize>,
        len: usize,
    },
    #[error("cannot remove the last node of the document")]
    LastNode,
}

/// Which neighbour a join pulls in
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Arena-backed document: an ordered sequence of block nodes.
///
/// Nodes live in `slots`, addressed by [`NodeId`]; `order` holds the live ids
/// in document order. Splitting keeps the original id on the left half, and a
/// join keeps the id it was called on. Every mutation rebases the registered
/// markers, so positions handed out through [`DocumentTree::anchor`] stay
/// valid for as long as they are held.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    pub(crate) slots: Vec<Option<Node>>,
    pub(crate) order: Vec<NodeId>,
    pub(crate) markers: MarkerSlab,
    pub(crate) styles: StyleSheet,
    /// Incremented on every mutation
    pub(crate) version: u64,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new(StyleSheet::default())
    }
}

impl DocumentTree {
    /// A document holding one empty neutral paragraph
    pub fn new(styles: StyleSheet) -> Self {
        Self::from_nodes(styles, Vec::new())
    }

    /// Build a document from nodes in order; an empty list yields one empty paragraph
    pub fn from_nodes(styles: StyleSheet, nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            order: Vec::new(),
            markers: MarkerSlab::default(),
            styles,
            version: 0,
        };
        for node in nodes {
            let id = tree.allocate(node);
            tree.order.push(id);
        }
        if tree.order.is_empty() {
            let id = tree.allocate(Node::paragraph(StyleRef::neutral()));
            tree.order.push(id);
        }
        tree
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        self.slots.push(Some(node));
        NodeId(self.slots.len() - 1)
    }

    /// Id the next allocated node will receive
    pub(crate) fn next_id(&self) -> NodeId {
        NodeId(self.slots.len())
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    // Read access

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TreeError::DeadNode(id))
    }

    fn text_node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        let node = self.node_mut(id)?;
        if !node.is_text() {
            return Err(TreeError::NotText(id));
        }
        Ok(node)
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Live node ids in document order
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.node(id).map(|node| (id, node)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|&candidate| candidate == id)
    }

    pub fn first(&self) -> Option<NodeId> {
        self.order.first().copied()
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        let index = self.index_of(id)?;
        self.order.get(index + 1).copied()
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        let index = self.index_of(id)?;
        index.checked_sub(1).and_then(|i| self.order.get(i).copied())
    }

    /// Plain text of the whole document, one line per node
    pub fn text(&self) -> String {
        let mut out = String::new();
        for (i, (_, node)) in self.nodes().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            match node.kind() {
                NodeKind::Text => out.push_str(&node.text()),
                NodeKind::Object(_) => out.push(OBJECT_REPLACEMENT),
            }
        }
        out
    }

    /// Resolved paragraph-level character formatting: style, then direct formatting
    pub fn paragraph_char_format(&self, id: NodeId) -> Option<CharFormat> {
        let node = self.node(id)?;
        Some(
            self.styles
                .char_format(&node.style)
                .overlay(&node.format.char_format),
        )
    }

    pub fn check_position(&self, position: Position) -> Result<(), TreeError> {
        let node = self
            .node(position.node)
            .ok_or(TreeError::DeadNode(position.node))?;
        if position.offset > node.len() {
            return Err(TreeError::OffsetOutOfBounds {
                position,
                len: node.len(),
            });
        }
        if !node.is_char_boundary(position.offset) {
            return Err(TreeError::NotCharBoundary(position));
        }
        Ok(())
    }

    pub fn check_range(&self, range: Range) -> Result<(), TreeError> {
        self.check_position(range.start)?;
        self.check_position(range.end)?;
        if self.compare(range.start, range.end) == Some(std::cmp::Ordering::Greater) {
            return Err(TreeError::InvertedRange(range));
        }
        Ok(())
    }

    /// Document order of two positions; `None` if either node is dead
    pub fn compare(&self, a: Position, b: Position) -> Option<std::cmp::Ordering> {
        let ia = self.index_of(a.node)?;
        let ib = self.index_of(b.node)?;
        Some(ia.cmp(&ib).then(a.offset.cmp(&b.offset)))
    }

    /// A list id not used by any node yet
    pub fn allocate_list(&self) -> ListId {
        let next = self
            .nodes()
            .filter_map(|(_, node)| node.list())
            .map(|membership| membership.list.0 + 1)
            .max()
            .unwrap_or(1);
        ListId(next)
    }

    // Markers

    pub fn anchor(&mut self, position: Position) -> Result<Marker, TreeError> {
        self.check_position(position)?;
        Ok(self.markers.insert(position))
    }

    /// Current position of a marker issued by this tree
    pub fn resolve(&self, marker: &Marker) -> Option<Position> {
        self.markers.get(marker)
    }

    /// Unregister a marker, returning its final position
    pub fn release(&mut self, marker: Marker) -> Option<Position> {
        self.markers.remove(marker)
    }

    pub fn move_marker(&mut self, marker: &Marker, position: Position) -> Result<(), TreeError> {
        self.check_position(position)?;
        self.markers.set(marker, position);
        Ok(())
    }

    pub fn anchor_range(&mut self, range: Range) -> Result<RangeMarker, TreeError> {
        self.check_range(range)?;
        Ok(RangeMarker {
            start: self.markers.insert(range.start),
            end: self.markers.insert(range.end),
        })
    }

    pub fn resolve_range(&self, marker: &RangeMarker) -> Option<Range> {
        Some(Range::new(
            self.markers.get(&marker.start)?,
            self.markers.get(&marker.end)?,
        ))
    }

    pub fn release_range(&mut self, marker: RangeMarker) -> Option<Range> {
        let start = self.markers.remove(marker.start);
        let end = self.markers.remove(marker.end);
        Some(Range::new(start?, end?))
    }

    /// Number of markers currently registered
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    // Structural edits

    /// Split the node containing `at` into two.
    ///
    /// The left node keeps the id, paragraph style and direct formatting. The
    /// right node is new, holds the text at and after the offset, and starts
    /// with the neutral style and no direct formatting. Either side may be
    /// empty.
    pub fn split(&mut self, at: Position) -> Result<(NodeId, NodeId), TreeError> {
        self.check_position(at)?;
        let offset = at.offset;
        let node = self.text_node_mut(at.node)?;

        let len = node.text.len();
        let right_text = Rope::from(node.text.slice_to_cow(offset..len).as_ref());
        node.text.edit(offset..len, "");

        let mut left_hints = Vec::new();
        let mut right_hints = Vec::new();
        for hint in node.hints.drain(..) {
            if hint.range.start < offset {
                let end = hint.range.end.min(offset);
                left_hints.push(InlineHint::new(hint.range.start..end, hint.format.clone()));
            }
            if hint.range.end > offset {
                let start = hint.range.start.max(offset) - offset;
                right_hints.push(InlineHint::new(start..hint.range.end - offset, hint.format));
            }
        }
        node.hints = left_hints;

        let right = Node {
            kind: NodeKind::Text,
            text: right_text,
            style: StyleRef::neutral(),
            format: ParagraphFormat::default(),
            hints: right_hints,
        };
        let right_id = self.allocate(right);
        let index = self
            .index_of(at.node)
            .ok_or(TreeError::DeadNode(at.node))?;
        self.order.insert(index + 1, right_id);

        normalize_hints(&mut self.node_mut(at.node)?.hints);
        normalize_hints(&mut self.node_mut(right_id)?.hints);
        self.markers.on_split(at.node, offset, right_id);
        self.touch();
        Ok((at.node, right_id))
    }

    /// Join `id` with its neighbour in `direction`; `id` survives.
    ///
    /// Returns false without touching anything when there is no neighbour or
    /// either node does not hold text. The survivor keeps its own paragraph
    /// style and direct formatting.
    pub fn join(&mut self, id: NodeId, direction: Direction) -> bool {
        let neighbour = match direction {
            Direction::Next => self.next(id),
            Direction::Prev => self.prev(id),
        };
        let Some(neighbour) = neighbour else {
            return false;
        };
        let both_text = self.node(id).is_some_and(Node::is_text)
            && self.node(neighbour).is_some_and(Node::is_text);
        if !both_text {
            return false;
        }

        let Some(absorbed) = self.slots[neighbour.0].take() else {
            return false;
        };
        self.order.retain(|&candidate| candidate != neighbour);
        let Some(survivor) = self.slots[id.0].as_mut() else {
            return false;
        };

        let (left, right, left_len) = match direction {
            Direction::Next => {
                let left_len = survivor.text.len();
                survivor.text.edit(left_len..left_len, absorbed.text);
                survivor
                    .hints
                    .extend(absorbed.hints.into_iter().map(|hint| shift(hint, left_len)));
                (id, neighbour, left_len)
            }
            Direction::Prev => {
                let left_len = absorbed.text.len();
                survivor.text.edit(0..0, absorbed.text);
                let own = std::mem::take(&mut survivor.hints);
                survivor.hints = absorbed
                    .hints
                    .into_iter()
                    .chain(own.into_iter().map(|hint| shift(hint, left_len)))
                    .collect();
                (neighbour, id, left_len)
            }
        };
        normalize_hints(&mut survivor.hints);

        self.markers.on_join(left, right, left_len, id);
        self.touch();
        true
    }

    pub fn set_paragraph_style(&mut self, id: NodeId, style: StyleRef) -> Result<(), TreeError> {
        self.text_node_mut(id)?.style = style;
        self.touch();
        Ok(())
    }

    pub fn set_paragraph_format(
        &mut self,
        id: NodeId,
        format: ParagraphFormat,
    ) -> Result<(), TreeError> {
        self.text_node_mut(id)?.format = format;
        self.touch();
        Ok(())
    }

    /// Copy direct paragraph formatting from `src` onto `dst`.
    ///
    /// With `exclude_list_attrs` the list identity of `dst` is left as it was.
    pub fn copy_paragraph_formatting(
        &mut self,
        src: NodeId,
        dst: NodeId,
        exclude_list_attrs: bool,
    ) -> Result<(), TreeError> {
        let source = self
            .node(src)
            .ok_or(TreeError::DeadNode(src))?
            .format
            .clone();
        let target = self.text_node_mut(dst)?;
        let list = if exclude_list_attrs {
            target.format.list
        } else {
            source.list
        };
        target.format = ParagraphFormat { list, ..source };
        self.touch();
        Ok(())
    }

    /// Turn the paragraph-level character formatting of `id` into an inline
    /// hint over its whole text, ahead of joining it into `into`.
    ///
    /// Only attributes that differ from the paragraph formatting of `into` are
    /// recorded, so the text keeps its look once it lives under the other
    /// paragraph. Existing hints stay on top of the new one.
    pub fn convert_paragraph_formatting_to_inline_hints(
        &mut self,
        id: NodeId,
        into: NodeId,
    ) -> Result<(), TreeError> {
        let own = self
            .paragraph_char_format(id)
            .ok_or(TreeError::DeadNode(id))?
            .resolve();
        let base = self
            .paragraph_char_format(into)
            .ok_or(TreeError::DeadNode(into))?
            .resolve();
        let difference = own.difference_from(&base);

        let node = self.text_node_mut(id)?;
        let len = node.text.len();
        if difference.is_empty() || len == 0 {
            return Ok(());
        }
        node.hints.insert(0, InlineHint::new(0..len, difference));
        self.touch();
        Ok(())
    }

    pub fn add_hint(&mut self, id: NodeId, hint: InlineHint) -> Result<(), TreeError> {
        let node = self.text_node_mut(id)?;
        let len = node.text.len();
        if hint.range.start > hint.range.end || hint.range.end > len {
            return Err(TreeError::HintOutOfBounds {
                node: id,
                range: hint.range,
                len,
            });
        }
        node.hints.push(hint);
        normalize_hints(&mut node.hints);
        self.touch();
        Ok(())
    }

    /// Insert text at a position; markers at or after it move along
    pub fn insert_text(&mut self, at: Position, text: &str) -> Result<(), TreeError> {
        self.check_position(at)?;
        let inserted = text.len();
        if inserted == 0 {
            return Ok(());
        }
        let offset = at.offset;
        let node = self.text_node_mut(at.node)?;
        node.text.edit(offset..offset, text);
        for hint in &mut node.hints {
            if hint.range.start >= offset {
                hint.range.start += inserted;
            }
            if hint.range.end > offset {
                hint.range.end += inserted;
            }
        }
        self.markers.on_insert(at.node, offset, inserted);
        self.touch();
        Ok(())
    }

    /// Insert a node directly after `after`
    pub fn insert_node_after(&mut self, after: NodeId, node: Node) -> Result<NodeId, TreeError> {
        let index = self.index_of(after).ok_or(TreeError::DeadNode(after))?;
        let id = self.allocate(node);
        self.order.insert(index + 1, id);
        self.touch();
        Ok(id)
    }

    /// Insert a node directly before `before`
    pub fn insert_node_before(&mut self, before: NodeId, node: Node) -> Result<NodeId, TreeError> {
        let index = self.index_of(before).ok_or(TreeError::DeadNode(before))?;
        let id = self.allocate(node);
        self.order.insert(index, id);
        self.touch();
        Ok(id)
    }

    pub fn insert_object_after(&mut self, after: NodeId, kind: ObjectKind) -> Result<NodeId, TreeError> {
        self.insert_node_after(after, Node::object(kind))
    }

    /// Take a node out of the document.
    ///
    /// Its markers move to the start of the following node, or to the end of
    /// the preceding one when it was last.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, TreeError> {
        if !self.is_live(id) {
            return Err(TreeError::DeadNode(id));
        }
        if self.order.len() == 1 {
            return Err(TreeError::LastNode);
        }
        let fallback = match (self.next(id), self.prev(id)) {
            (Some(next), _) => Position::start_of(next),
            (None, Some(prev)) => {
                let len = self.node(prev).map(Node::len).unwrap_or(0);
                Position::new(prev, len)
            }
            (None, None) => return Err(TreeError::LastNode),
        };
        self.detach(id, fallback)
    }

    fn detach(&mut self, id: NodeId, fallback: Position) -> Result<Node, TreeError> {
        let node = self.slots[id.0].take().ok_or(TreeError::DeadNode(id))?;
        self.order.retain(|&candidate| candidate != id);
        self.markers.on_remove(id, fallback);
        self.touch();
        Ok(node)
    }

    /// Delete the content of `range`.
    ///
    /// A range spanning several nodes removes the nodes in between and joins
    /// what is left of the end node onto the start node.
    pub fn delete(&mut self, range: Range) -> Result<(), TreeError> {
        self.check_range(range)?;
        let Range { start, end } = range;
        if start.node == end.node {
            return self.delete_within(start.node, start.offset..end.offset);
        }

        let start_len = self.text_node_mut(start.node)?.text.len();
        self.text_node_mut(end.node)?;

        self.delete_within(start.node, start.offset..start_len)?;
        let between: Vec<NodeId> = {
            let first = self.index_of(start.node).ok_or(TreeError::DeadNode(start.node))?;
            let last = self.index_of(end.node).ok_or(TreeError::DeadNode(end.node))?;
            self.order[first + 1..last].to_vec()
        };
        for id in between {
            self.detach(id, start)?;
        }
        self.delete_within(end.node, 0..end.offset)?;
        self.join(start.node, Direction::Next);
        Ok(())
    }

    fn delete_within(&mut self, id: NodeId, range: std::ops::Range<usize>) -> Result<(), TreeError> {
        if range.is_empty() {
            return Ok(());
        }
        let node = self.text_node_mut(id)?;
        node.text.edit(range.clone(), "");
        let removed = range.end - range.start;
        let map = |offset: usize| {
            if offset <= range.start {
                offset
            } else if offset >= range.end {
                offset - removed
            } else {
                range.start
            }
        };
        for hint in &mut node.hints {
            hint.range = map(hint.range.start)..map(hint.range.end);
        }
        normalize_hints(&mut node.hints);
        self.markers.on_delete(id, range);
        self.touch();
        Ok(())
    }

    // Diagnostics

    /// Human-readable listing of the document, one line per node.
    ///
    /// ```text
    /// Standard "AXB" [0..1 +bold]
    /// List Paragraph "Item" list=1:0
    /// <rule>
    /// ```
    pub fn outline(&self) -> String {
        let mut out = String::new();
        for (_, node) in self.nodes() {
            match node.kind() {
                NodeKind::Object(kind) => {
                    let _ = match kind {
                        ObjectKind::Rule => writeln!(out, "<rule>"),
                        ObjectKind::Image { source } => writeln!(out, "<image {source}>"),
                        ObjectKind::Table => writeln!(out, "<table>"),
                    };
                }
                NodeKind::Text => {
                    let _ = write!(out, "{} {:?}", node.style, node.text());
                    if let Some(list) = node.list() {
                        let _ = write!(out, " list={}:{}", list.list.0, list.level);
                    }
                    if !node.format.char_format.is_empty() {
                        let _ = write!(out, " para({})", describe(&node.format.char_format));
                    }
                    for hint in &node.hints {
                        let _ = write!(
                            out,
                            " [{}..{} {}]",
                            hint.range.start,
                            hint.range.end,
                            describe(&hint.format)
                        );
                    }
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Everything that breaks the tree's invariants, empty when healthy
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let live = self.slots.iter().filter(|slot| slot.is_some()).count();
        if live != self.order.len() {
            problems.push(format!(
                "{live} live nodes but {} in document order",
                self.order.len()
            ));
        }
        if self.order.is_empty() {
            problems.push("document has no nodes".to_string());
        }

        for &id in &self.order {
            let Some(node) = self.node(id) else {
                problems.push(format!("order references dead node {id}"));
                continue;
            };
            for hint in &node.hints {
                if hint.range.start > hint.range.end
                    || hint.range.end > node.len()
                    || !node.is_char_boundary(hint.range.start)
                    || !node.is_char_boundary(hint.range.end)
                {
                    problems.push(format!("hint {:?} invalid in node {id}", hint.range));
                }
            }
        }

        for position in self.markers.positions() {
            if let Err(err) = self.check_position(position) {
                problems.push(format!("marker invalid: {err}"));
            }
        }

        let mut runs: HashMap<ListId, usize> = HashMap::new();
        let mut previous: Option<ListId> = None;
        for (_, node) in self.nodes() {
            let current = node.list().map(|membership| membership.list);
            if let Some(list) = current
                && current != previous
            {
                *runs.entry(list).or_default() += 1;
            }
            previous = current;
        }
        for (list, count) in runs {
            if count > 1 {
                problems.push(format!("list {} is split into {count} runs", list.0));
            }
        }

        problems
    }
}

fn shift(hint: InlineHint, by: usize) -> InlineHint {
    InlineHint::new(hint.range.start + by..hint.range.end + by, hint.format)
}

/// Drop hints that cover nothing or set nothing
fn normalize_hints(hints: &mut Vec<InlineHint>) {
    hints.retain(|hint| !hint.range.is_empty() && !hint.format.is_empty());
}

fn describe(format: &CharFormat) -> String {
    let mut parts = Vec::new();
    let flags = [
        ("bold", format.bold),
        ("italic", format.italic),
        ("underline", format.underline),
        ("strike", format.strikethrough),
    ];
    for (name, value) in flags {
        match value {
            Some(true) => parts.push(format!("+{name}")),
            Some(false) => parts.push(format!("-{name}")),
            None => {}
        }
    }
    if let Some(size) = format.size {
        parts.push(format!("size={size}"));
    }
    parts.join(" ")
}
