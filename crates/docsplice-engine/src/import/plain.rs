use std::io::Read;

use crate::import::{ImportError, ImportMode, ImportSink, ImporterDelegate, read_text};
use crate::tree::{CharFormat, DocumentTree, ParagraphFormat, Range, StyleRef};

/// Plain UTF-8 text, one paragraph per line
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextImporter;

impl ImporterDelegate for PlainTextImporter {
    fn name(&self) -> &str {
        "text"
    }

    fn filter(
        &mut self,
        tree: &mut DocumentTree,
        target: Range,
        content: &mut dyn Read,
        mode: ImportMode,
    ) -> Result<(), ImportError> {
        let text = read_text(content)?;
        let mut sink = ImportSink::begin(tree, target, mode)?;
        for line in text.lines() {
            sink.paragraph(StyleRef::neutral(), ParagraphFormat::default())?;
            sink.text(line, &CharFormat::default())?;
        }
        let end = sink.finish();
        log::trace!("plain text import ended at {end}");
        Ok(())
    }
}
