use std::io::Read;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::import::{ImportError, ImportMode, ImportSink, ImporterDelegate, read_text};
use crate::tree::{
    CharFormat, DocumentTree, ListId, ListMembership, ObjectKind, ParagraphFormat, Range, StyleRef,
};

const QUOTE_STYLE: &str = "Quote";
const LIST_STYLE: &str = "List Paragraph";

/// CommonMark importer built on pulldown-cmark.
///
/// Headings map to the `Heading N` styles, block quotes to `Quote` and list
/// items to `List Paragraph` with a list membership; nested lists share the
/// outermost list's id at a deeper level. Emphasis, strong and strikethrough
/// become inline hints. Rules, images and tables are inserted as objects.
#[derive(Debug, Clone)]
pub struct MarkdownImporter {
    options: Options,
}

impl Default for MarkdownImporter {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES,
        }
    }
}

impl ImporterDelegate for MarkdownImporter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn filter(
        &mut self,
        tree: &mut DocumentTree,
        target: Range,
        content: &mut dyn Read,
        mode: ImportMode,
    ) -> Result<(), ImportError> {
        let text = read_text(content)?;
        let sink = ImportSink::begin(tree, target, mode)?;
        let mut processor = MarkdownProcessor::new(sink);
        for event in Parser::new_ext(&text, self.options) {
            processor.process_event(event)?;
        }
        let end = processor.sink.finish();
        log::trace!("markdown import ended at {end}");
        Ok(())
    }
}

/// Walks the pulldown-cmark event stream and writes blocks through the sink
struct MarkdownProcessor<'a> {
    sink: ImportSink<'a>,

    /// Active inline formats, innermost last
    inline: Vec<CharFormat>,

    /// Open lists; the id is shared by every nesting level of one list
    lists: Vec<ListId>,

    quote_depth: usize,

    /// A list item started and its paragraph is not open yet
    item_pending: bool,

    /// Code block text is buffered and written line by line at its end
    code: Option<String>,

    /// Events inside images and tables are not imported as text
    skip_depth: usize,
}

impl<'a> MarkdownProcessor<'a> {
    fn new(sink: ImportSink<'a>) -> Self {
        Self {
            sink,
            inline: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            item_pending: false,
            code: None,
            skip_depth: 0,
        }
    }

    fn process_event(&mut self, event: Event) -> Result<(), ImportError> {
        if self.skip_depth > 0 {
            match event {
                Event::Start(Tag::Image { .. } | Tag::Table(_)) => self.skip_depth += 1,
                Event::End(TagEnd::Image | TagEnd::Table) => self.skip_depth -= 1,
                _ => {}
            }
            return Ok(());
        }

        match event {
            Event::Start(Tag::Paragraph) => {
                self.item_pending = false;
                let (style, format) = self.block_style();
                self.sink.paragraph(style, format)?;
            }
            Event::Start(Tag::Heading { level, .. }) => {
                self.item_pending = false;
                self.sink
                    .paragraph(StyleRef::heading(level as u8), ParagraphFormat::default())?;
            }
            Event::Start(Tag::BlockQuote(_)) => self.quote_depth += 1,
            Event::End(TagEnd::BlockQuote(_)) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            Event::Start(Tag::List(_)) => {
                let list = match self.lists.first() {
                    Some(&outer) => outer,
                    None => self.sink.allocate_list(),
                };
                self.lists.push(list);
            }
            Event::End(TagEnd::List(_)) => {
                self.lists.pop();
            }
            Event::Start(Tag::Item) => self.item_pending = true,
            Event::End(TagEnd::Item) => {
                // an item with no content still counts as an entry
                self.open_item()?;
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                if let CodeBlockKind::Fenced(lang) = &kind
                    && !lang.is_empty()
                {
                    log::trace!("importing {lang} code block as plain text");
                }
                self.code = Some(String::new());
            }
            Event::End(TagEnd::CodeBlock) => {
                let code = self.code.take().unwrap_or_default();
                let (style, format) = self.block_style();
                for line in code.lines() {
                    self.sink.paragraph(style.clone(), format.clone())?;
                    self.sink.text(line, &CharFormat::default())?;
                }
                self.item_pending = false;
            }
            Event::Start(Tag::Emphasis) => self.inline.push(CharFormat::italic()),
            Event::Start(Tag::Strong) => self.inline.push(CharFormat::bold()),
            Event::Start(Tag::Strikethrough) => self.inline.push(CharFormat::strikethrough()),
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough) => {
                self.inline.pop();
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                self.sink.object(ObjectKind::Image {
                    source: dest_url.to_string(),
                })?;
                self.item_pending = false;
                self.skip_depth = 1;
            }
            Event::Start(Tag::Table(_)) => {
                self.sink.object(ObjectKind::Table)?;
                self.skip_depth = 1;
            }
            Event::Rule => self.sink.object(ObjectKind::Rule)?,
            Event::Text(text) => {
                if let Some(code) = &mut self.code {
                    code.push_str(&text);
                } else {
                    self.write(&text)?;
                }
            }
            Event::Code(code) => self.write(&code)?,
            Event::SoftBreak | Event::HardBreak => self.write(" ")?,
            _ => {}
        }
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), ImportError> {
        self.open_item()?;
        let format = self
            .inline
            .iter()
            .fold(CharFormat::default(), |acc, layer| acc.overlay(layer));
        self.sink.text(text, &format)
    }

    /// Open the paragraph of a tight list item on its first content
    fn open_item(&mut self) -> Result<(), ImportError> {
        if !self.item_pending {
            return Ok(());
        }
        self.item_pending = false;
        let (style, format) = self.block_style();
        self.sink.paragraph(style, format)
    }

    /// Paragraph style for body text at the current nesting
    fn block_style(&self) -> (StyleRef, ParagraphFormat) {
        if let Some(&list) = self.lists.last() {
            let level = u8::try_from(self.lists.len() - 1).unwrap_or(u8::MAX);
            let format = ParagraphFormat {
                list: Some(ListMembership { list, level }),
                ..ParagraphFormat::default()
            };
            return (StyleRef::new(LIST_STYLE), format);
        }
        if self.quote_depth > 0 {
            return (StyleRef::new(QUOTE_STYLE), ParagraphFormat::default());
        }
        (StyleRef::neutral(), ParagraphFormat::default())
    }
}
