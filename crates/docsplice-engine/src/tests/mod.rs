use std::io::Read;

use crate::import::{ImportError, ImportMode, ImporterDelegate};
use crate::tree::{DocumentTree, Node, Position, Range, StyleRef, StyleSheet};

/// A text paragraph with the given style
pub fn paragraph(style: &str, text: &str) -> Node {
    Node::paragraph(StyleRef::new(style)).with_text(text)
}

/// A document with the default style sheet holding `nodes` in order
pub fn tree_of(nodes: Vec<Node>) -> DocumentTree {
    DocumentTree::from_nodes(StyleSheet::default(), nodes)
}

/// Importer that runs a closure instead of parsing anything
pub struct Scripted<F>(F);

pub fn scripted<F>(f: F) -> Scripted<F>
where
    F: FnMut(&mut DocumentTree, Range) -> Result<(), ImportError>,
{
    Scripted(f)
}

impl<F> ImporterDelegate for Scripted<F>
where
    F: FnMut(&mut DocumentTree, Range) -> Result<(), ImportError>,
{
    fn name(&self) -> &str {
        "scripted"
    }

    fn filter(
        &mut self,
        tree: &mut DocumentTree,
        target: Range,
        _content: &mut dyn Read,
        _mode: ImportMode,
    ) -> Result<(), ImportError> {
        (self.0)(tree, target)
    }
}

/// Importer that writes some text into the gap and then gives up
pub struct FailingImporter {
    partial: String,
}

impl FailingImporter {
    pub fn after_writing(partial: &str) -> Self {
        Self {
            partial: partial.to_string(),
        }
    }
}

impl ImporterDelegate for FailingImporter {
    fn name(&self) -> &str {
        "failing"
    }

    fn filter(
        &mut self,
        tree: &mut DocumentTree,
        target: Range,
        _content: &mut dyn Read,
        _mode: ImportMode,
    ) -> Result<(), ImportError> {
        tree.insert_text(target.start, &self.partial)?;
        let (_, tail) = tree.split(target.start)?;
        tree.insert_text(Position::start_of(tail), "more")?;
        Err(ImportError::Malformed("unexpected end of input".to_string()))
    }
}
