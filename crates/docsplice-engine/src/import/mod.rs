//! Importer delegates: turn a foreign content stream into document nodes.
//!
//! The splice controller only knows the [`ImporterDelegate`] contract. The
//! importers in this module are small reference implementations that write
//! through an [`ImportSink`], so they never touch the tree outside the range
//! they were handed.

pub mod markdown;
pub mod plain;
pub mod rtf;
pub mod sink;

use std::io::Read;

use crate::tree::{DocumentTree, Position, Range, StyleSheet, TreeError};

pub use markdown::MarkdownImporter;
pub use plain::PlainTextImporter;
pub use rtf::RtfImporter;
pub use sink::ImportSink;

/// How imported content relates to the target range
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Insert at the start of the range, leaving existing content in place
    #[default]
    Insert,
    /// Replace the content of the range, including the target paragraph's style
    Replace,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read import stream: {0}")]
    Io(#[from] std::io::Error),
    #[error("imported content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("malformed content: {0}")]
    Malformed(String),
    #[error("unsupported content: {0}")]
    Unsupported(String),
    #[error("import could not edit the document: {0}")]
    Tree(#[from] TreeError),
}

/// A parser for one foreign format that inserts its result into a document.
///
/// Implementations must only mutate the tree within or through `target`, and
/// on failure must leave the node holding `target.start` alive.
pub trait ImporterDelegate {
    /// Short format name used in log output
    fn name(&self) -> &str;

    fn filter(
        &mut self,
        tree: &mut DocumentTree,
        target: Range,
        content: &mut dyn Read,
        mode: ImportMode,
    ) -> Result<(), ImportError>;
}

/// Read a whole stream as UTF-8 text
pub(crate) fn read_text(content: &mut dyn Read) -> Result<String, ImportError> {
    let mut bytes = Vec::new();
    content.read_to_end(&mut bytes)?;
    Ok(String::from_utf8(bytes)?)
}

/// Build a fresh document from content using `importer`
pub fn load(
    importer: &mut dyn ImporterDelegate,
    mut content: &[u8],
    styles: StyleSheet,
) -> Result<DocumentTree, ImportError> {
    let mut tree = DocumentTree::new(styles);
    let first = tree
        .first()
        .ok_or(ImportError::Malformed("empty document".to_string()))?;
    let target = Range::collapsed(Position::start_of(first));
    importer.filter(&mut tree, target, &mut content, ImportMode::Replace)?;
    log::debug!(
        "loaded {} nodes with the {} importer",
        tree.len(),
        importer.name()
    );
    Ok(tree)
}
