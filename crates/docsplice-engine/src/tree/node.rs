use std::fmt;
use xi_rope::Rope;

use crate::tree::format::{InlineHint, ListMembership, ParagraphFormat, StyleRef};

/// Stable arena handle for a node.
///
/// Ids are handed out in increasing order and never reused, so comparing two
/// ids tells which node was created first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Non-text block content that occupies a node of its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Rule,
    Image { source: String },
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A paragraph; the only kind that can be split or joined
    Text,
    Object(ObjectKind),
}

/// One block of the document
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) text: Rope,
    pub(crate) style: StyleRef,
    pub(crate) format: ParagraphFormat,
    pub(crate) hints: Vec<InlineHint>,
}

impl Node {
    /// An empty paragraph with the given style
    pub fn paragraph(style: StyleRef) -> Self {
        Self {
            kind: NodeKind::Text,
            text: Rope::from(""),
            style,
            format: ParagraphFormat::default(),
            hints: Vec::new(),
        }
    }

    pub fn object(kind: ObjectKind) -> Self {
        Self {
            kind: NodeKind::Object(kind),
            text: Rope::from(""),
            style: StyleRef::neutral(),
            format: ParagraphFormat::default(),
            hints: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Rope::from(text);
        self
    }

    pub fn with_format(mut self, format: ParagraphFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_list(mut self, list: ListMembership) -> Self {
        self.format.list = Some(list);
        self
    }

    pub fn with_hint(mut self, hint: InlineHint) -> Self {
        self.hints.push(hint);
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.len() == 0
    }

    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn style(&self) -> &StyleRef {
        &self.style
    }

    pub fn format(&self) -> &ParagraphFormat {
        &self.format
    }

    pub fn list(&self) -> Option<ListMembership> {
        self.format.list
    }

    pub fn hints(&self) -> &[InlineHint] {
        &self.hints
    }

    pub(crate) fn is_char_boundary(&self, offset: usize) -> bool {
        offset <= self.text.len() && self.text.is_codepoint_boundary(offset)
    }
}
