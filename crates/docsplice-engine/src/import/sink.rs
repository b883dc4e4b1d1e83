use crate::import::{ImportError, ImportMode};
use crate::tree::{
    CharFormat, DocumentTree, InlineHint, ListId, Node, NodeId, ObjectKind, ParagraphFormat,
    Position, Range, StyleRef,
};

/// Write-side helper shared by the importers.
///
/// The sink starts at the target position and only ever edits the node it is
/// writing into, or nodes it created itself:
///
/// - the first paragraph is written into the target node; it takes the
///   paragraph's style only when that node is empty (or in replace mode)
/// - each further paragraph splits off a new node at the write cursor, unless
///   the current node is an empty one of the sink's own that no paragraph has
///   claimed yet, so empty paragraphs in the content are kept
/// - objects get a node of their own, followed by an empty paragraph that the
///   next paragraph reuses
pub struct ImportSink<'a> {
    tree: &'a mut DocumentTree,
    current: NodeId,
    cursor: usize,
    /// The current node was created by the sink, or was empty when it began
    owned: bool,
    /// A paragraph was opened in the current node
    claimed: bool,
    started: bool,
    mode: ImportMode,
}

impl<'a> ImportSink<'a> {
    pub fn begin(
        tree: &'a mut DocumentTree,
        target: Range,
        mode: ImportMode,
    ) -> Result<Self, ImportError> {
        tree.check_range(target)?;
        if mode == ImportMode::Replace && !target.is_collapsed() {
            tree.delete(target)?;
        }
        let start = target.start;
        let owned = tree.node(start.node).is_some_and(Node::is_empty);
        Ok(Self {
            tree,
            current: start.node,
            cursor: start.offset,
            owned,
            claimed: false,
            started: false,
            mode,
        })
    }

    /// Start a paragraph; text written afterwards belongs to it
    pub fn paragraph(&mut self, style: StyleRef, format: ParagraphFormat) -> Result<(), ImportError> {
        let first = !self.started;
        self.started = true;
        let reusable = self.current_is_blank();

        if first && !reusable && self.mode == ImportMode::Insert {
            // continue inline in the paragraph holding the target
            self.claimed = true;
            return Ok(());
        }
        if !first && !reusable {
            let (_, right) = self.tree.split(self.position())?;
            self.current = right;
            self.cursor = 0;
            self.owned = true;
        }
        self.claimed = true;
        self.tree.set_paragraph_style(self.current, style)?;
        self.tree.set_paragraph_format(self.current, format)?;
        Ok(())
    }

    /// Append text to the current paragraph
    pub fn text(&mut self, text: &str, format: &CharFormat) -> Result<(), ImportError> {
        if text.is_empty() {
            return Ok(());
        }
        if !self.started {
            self.paragraph(StyleRef::neutral(), ParagraphFormat::default())?;
        }
        self.tree.insert_text(self.position(), text)?;
        let end = self.cursor + text.len();
        if !format.is_empty() {
            self.tree
                .add_hint(self.current, InlineHint::new(self.cursor..end, format.clone()))?;
        }
        self.cursor = end;
        Ok(())
    }

    /// Place an object between the text written so far and whatever follows
    pub fn object(&mut self, kind: ObjectKind) -> Result<(), ImportError> {
        self.started = true;
        // an object standing alone in its paragraph takes that paragraph's place
        self.claimed = false;
        if self.current_is_blank() {
            self.tree
                .insert_node_before(self.current, Node::object(kind))?;
            return Ok(());
        }
        let (left, right) = self.tree.split(self.position())?;
        self.tree.insert_object_after(left, kind)?;
        self.current = right;
        self.cursor = 0;
        self.owned = true;
        Ok(())
    }

    /// A list id not used anywhere in the document yet
    pub fn allocate_list(&self) -> ListId {
        self.tree.allocate_list()
    }

    fn current_is_blank(&self) -> bool {
        self.owned && !self.claimed && self.tree.node(self.current).is_some_and(Node::is_empty)
    }

    /// Where the next write would land
    pub fn position(&self) -> Position {
        Position::new(self.current, self.cursor)
    }

    /// Position directly after the written content
    pub fn finish(self) -> Position {
        self.position()
    }
}
