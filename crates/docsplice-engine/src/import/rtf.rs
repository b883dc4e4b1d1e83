use std::borrow::Cow;
use std::io::Read;

use rtf_parser::paragraph::Paragraph as RtfParagraph;
use rtf_parser::{Painter, RtfDocument};

use crate::import::{ImportError, ImportMode, ImportSink, ImporterDelegate};
use crate::tree::{CharFormat, DocumentTree, ParagraphFormat, Range, StyleRef};

/// Marks `\par` in the source so paragraph breaks survive the parser
const PARAGRAPH_BREAK_SENTINEL: char = '\u{001E}';
const PARAGRAPH_BREAK_ESCAPE: &str = "\\'1e";

/// RTF importer built on rtf-parser.
///
/// Supports paragraphs and bold, italic, underline and strikethrough runs.
/// Every paragraph is imported with the neutral style.
#[derive(Debug, Default, Clone, Copy)]
pub struct RtfImporter;

impl ImporterDelegate for RtfImporter {
    fn name(&self) -> &str {
        "rtf"
    }

    fn filter(
        &mut self,
        tree: &mut DocumentTree,
        target: Range,
        content: &mut dyn Read,
        mode: ImportMode,
    ) -> Result<(), ImportError> {
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes)?;
        // RTF is 7-bit by definition; stray high bytes are not worth failing over
        let source = String::from_utf8_lossy(&bytes);
        if !source.trim_start().starts_with("{\\rtf") {
            return Err(ImportError::Malformed("missing {\\rtf header".to_string()));
        }
        let normalized = inject_paragraph_sentinels(source.as_ref());
        let rtf = RtfDocument::try_from(normalized.as_ref())
            .map_err(|err| ImportError::Malformed(err.to_string()))?;

        let mut sink = ImportSink::begin(tree, target, mode)?;
        let mut open = false;
        let mut after_break = false;
        let mut last_paragraph: Option<RtfParagraph> = None;

        for block in rtf.body.iter() {
            if last_paragraph
                .as_ref()
                .is_some_and(|prev| prev != &block.paragraph)
            {
                open = false;
            }
            let format = char_format(&block.painter);
            let text = block.text.replace('\r', "");
            let mut lines = text.split(['\n', PARAGRAPH_BREAK_SENTINEL]).peekable();
            while let Some(line) = lines.next() {
                if !line.is_empty() {
                    if !open {
                        sink.paragraph(StyleRef::neutral(), ParagraphFormat::default())?;
                        open = true;
                    }
                    sink.text(line, &format)?;
                    last_paragraph = Some(block.paragraph);
                    after_break = false;
                }
                if lines.peek().is_some() {
                    if after_break {
                        // two breaks in a row enclose an empty paragraph
                        sink.paragraph(StyleRef::neutral(), ParagraphFormat::default())?;
                    }
                    open = false;
                    after_break = true;
                }
            }
        }

        let end = sink.finish();
        log::trace!("rtf import ended at {end}");
        Ok(())
    }
}

fn char_format(painter: &Painter) -> CharFormat {
    let flag = |enabled: bool| enabled.then_some(true);
    CharFormat {
        bold: flag(painter.bold),
        italic: flag(painter.italic),
        underline: flag(painter.underline),
        strikethrough: flag(painter.strike),
        size: None,
    }
}

/// Append an escaped sentinel after every `\par` control word.
///
/// `\pard`, `\parshape` and other words that merely start with `par` are left
/// alone, as are `\par`s that already carry a sentinel.
fn inject_paragraph_sentinels(input: &str) -> Cow<'_, str> {
    const NEEDLE: &[u8] = b"par";
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut last_copied = 0;
    let mut output: Option<String> = None;

    while i + NEEDLE.len() < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        let word = &bytes[i + 1..i + 1 + NEEDLE.len()];
        if !word.eq_ignore_ascii_case(NEEDLE) {
            i += 1;
            continue;
        }
        let after_word = i + 1 + NEEDLE.len();
        if bytes.get(after_word).is_some_and(u8::is_ascii_alphabetic) {
            i += 1;
            continue;
        }
        let mut after_space = after_word;
        if bytes.get(after_space) == Some(&b' ') {
            after_space += 1;
        }
        let tagged = bytes
            .get(after_space..after_space + PARAGRAPH_BREAK_ESCAPE.len())
            .is_some_and(|segment| segment == PARAGRAPH_BREAK_ESCAPE.as_bytes());
        if tagged {
            i = after_space;
            continue;
        }

        let out = output.get_or_insert_with(|| String::with_capacity(input.len() + 8));
        out.push_str(&input[last_copied..after_space]);
        out.push_str(PARAGRAPH_BREAK_ESCAPE);
        last_copied = after_space;
        i = after_space;
    }

    match output {
        Some(mut out) => {
            out.push_str(&input[last_copied..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{paragraph, tree_of};
    use crate::tree::Position;
    use pretty_assertions::assert_eq;

    fn import(rtf: &str) -> Result<DocumentTree, ImportError> {
        let mut tree = tree_of(vec![paragraph("Standard", "")]);
        let id = tree.node_ids()[0];
        RtfImporter.filter(
            &mut tree,
            Range::collapsed(Position::start_of(id)),
            &mut rtf.as_bytes(),
            ImportMode::Insert,
        )?;
        Ok(tree)
    }

    #[test]
    fn styled_runs_become_hints() {
        let tree = import(
            r#"{\rtf1\ansi{\fonttbl{\f0 Arial;}}\f0\pard Simple {\b bold} and {\i italic}.\par Next line.}"#,
        )
        .unwrap();

        insta::assert_snapshot!(tree.outline(), @r###"
        Standard "Simple bold and italic." [7..11 +bold] [16..22 +italic]
        Standard "Next line."
        "###);
    }

    #[test]
    fn repeated_par_keeps_the_empty_paragraph() {
        let tree = import(r"{\rtf1\ansi one\par\par two}").unwrap();

        insta::assert_snapshot!(tree.outline(), @r###"
        Standard "one"
        Standard ""
        Standard "two"
        "###);
    }

    #[test]
    fn text_without_header_is_rejected() {
        let err = import("just words").unwrap_err();

        assert!(matches!(err, ImportError::Malformed(_)));
    }

    #[test]
    fn sentinels_follow_par_but_not_pard() {
        let raw = r"{\rtf1\pard Foo\par Bar\par
}";

        assert_eq!(
            inject_paragraph_sentinels(raw),
            "{\\rtf1\\pard Foo\\par \\'1eBar\\par\\'1e\n}"
        );
    }

    #[test]
    fn tagged_input_is_left_alone() {
        let raw = r"{\rtf1 A\par \'1eB}";

        assert!(matches!(inject_paragraph_sentinels(raw), Cow::Borrowed(_)));
    }
}
