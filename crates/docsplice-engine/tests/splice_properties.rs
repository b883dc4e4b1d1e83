use std::io::Read;

use docsplice_engine::{
    CharFormat, DocumentTree, ImportError, ImportMode, ImporterDelegate, InlineHint, ListId,
    ListMembership, MarkdownImporter, Node, NodeKind, OBJECT_REPLACEMENT, PlainTextImporter,
    Position, Range, RtfImporter, SpliceError, SpliceOptions, StyleRef, StyleSheet, splice,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn paragraph(style: &str, text: &str) -> Node {
    Node::paragraph(StyleRef::new(style)).with_text(text)
}

fn list_item(text: &str, list: u32) -> Node {
    paragraph("List Paragraph", text).with_list(ListMembership {
        list: ListId(list),
        level: 0,
    })
}

/// A document touching every kind of paragraph the engine knows
fn sample() -> DocumentTree {
    DocumentTree::from_nodes(
        StyleSheet::default(),
        vec![
            paragraph("Heading 1", "Title"),
            paragraph("Standard", "héllo wörld")
                .with_hint(InlineHint::new(0..6, CharFormat::bold())),
            list_item("first", 1),
            list_item("second", 1),
            Node::object(docsplice_engine::ObjectKind::Rule),
            paragraph("Quote", "said"),
        ],
    )
}

fn single(text: &str) -> (DocumentTree, Position) {
    let tree = DocumentTree::from_nodes(StyleSheet::default(), vec![paragraph("Standard", text)]);
    let id = tree.node_ids()[0];
    (tree, Position::start_of(id))
}

/// Every position a splice may target
fn valid_positions(tree: &DocumentTree) -> Vec<Position> {
    tree.nodes()
        .filter(|(_, node)| node.is_text())
        .flat_map(|(id, node)| {
            let text = node.text();
            let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
            offsets.push(text.len());
            offsets.into_iter().map(move |offset| Position::new(id, offset))
        })
        .collect()
}

/// Empty paragraphs that could have been joined with a text neighbour
fn scaffolding(tree: &DocumentTree) -> Vec<String> {
    let ids = tree.node_ids();
    let is_object = |index: Option<usize>| {
        index
            .and_then(|i| ids.get(i))
            .and_then(|&id| tree.node(id))
            .is_some_and(|node| !node.is_text())
    };
    ids.iter()
        .enumerate()
        .filter(|(_, id)| tree.node(**id).is_some_and(|node| node.is_text() && node.is_empty()))
        .filter(|(i, _)| !is_object(i.checked_sub(1)) && !is_object(Some(i + 1)))
        .map(|(_, id)| format!("empty paragraph {id}"))
        .collect()
}

fn styles(tree: &DocumentTree) -> Vec<String> {
    tree.nodes()
        .map(|(_, node)| match node.kind() {
            NodeKind::Text => format!("{} {:?}", node.style(), node.list()),
            NodeKind::Object(kind) => format!("{kind:?}"),
        })
        .collect()
}

/// Map a byte offset into `tree.text()` back to a position
fn position_at(tree: &DocumentTree, mut offset: usize) -> Position {
    for (id, node) in tree.nodes() {
        let len = if node.is_text() {
            node.len()
        } else {
            OBJECT_REPLACEMENT.len_utf8()
        };
        if offset <= len {
            return Position::new(id, offset.min(node.len()));
        }
        offset -= len + 1;
    }
    panic!("offset past the end of the document");
}

fn text_offset(tree: &DocumentTree, position: Position) -> usize {
    let mut offset = 0;
    for (id, node) in tree.nodes() {
        if id == position.node {
            return offset + position.offset;
        }
        offset += if node.is_text() {
            node.len()
        } else {
            OBJECT_REPLACEMENT.len_utf8()
        } + 1;
    }
    panic!("position {position} not in the document");
}

fn plain() -> Box<dyn ImporterDelegate> {
    Box::new(PlainTextImporter)
}

fn markdown() -> Box<dyn ImporterDelegate> {
    Box::new(MarkdownImporter::default())
}

fn rtf() -> Box<dyn ImporterDelegate> {
    Box::new(RtfImporter)
}

fn run(
    tree: &mut DocumentTree,
    target: Position,
    content: &str,
    importer: &mut dyn ImporterDelegate,
) -> Result<Position, SpliceError> {
    splice(
        tree,
        target,
        &mut content.as_bytes(),
        importer,
        &SpliceOptions::default(),
    )
}

/// Writes into the gap, adds a paragraph of its own and then fails
struct BrokenImporter;

impl ImporterDelegate for BrokenImporter {
    fn name(&self) -> &str {
        "broken"
    }

    fn filter(
        &mut self,
        tree: &mut DocumentTree,
        target: Range,
        _content: &mut dyn Read,
        _mode: ImportMode,
    ) -> Result<(), ImportError> {
        tree.insert_text(target.start, "half")?;
        tree.insert_node_after(target.start.node, paragraph("Heading 2", "written"))?;
        Err(ImportError::Unsupported("nested tables".to_string()))
    }
}

/// Removes the prefix bracket before writing its content
struct PrefixRemover;

impl ImporterDelegate for PrefixRemover {
    fn name(&self) -> &str {
        "prefix-remover"
    }

    fn filter(
        &mut self,
        tree: &mut DocumentTree,
        target: Range,
        _content: &mut dyn Read,
        _mode: ImportMode,
    ) -> Result<(), ImportError> {
        if let Some(prefix) = tree.prev(target.start.node) {
            tree.remove_node(prefix)?;
        }
        tree.insert_text(target.start, "X")?;
        Ok(())
    }
}

#[test]
fn empty_content_never_changes_text() {
    let original = sample();

    for target in valid_positions(&original) {
        for importer in [
            &mut PlainTextImporter as &mut dyn ImporterDelegate,
            &mut MarkdownImporter::default(),
        ] {
            let mut tree = original.clone();

            run(&mut tree, target, "", importer).unwrap();

            assert_eq!(tree.text(), original.text(), "splice at {target}");
            assert_eq!(styles(&tree), styles(&original), "splice at {target}");
            assert_eq!(tree.marker_count(), 0);
            assert!(tree.invariant_violations().is_empty());
        }
    }
}

#[test]
fn empty_gap_restores_the_original_paragraph() {
    let (mut tree, start) = single("AB");
    let id = start.node;

    let end = run(&mut tree, Position::new(id, 1), "", &mut PlainTextImporter).unwrap();

    assert_eq!(tree.node_ids(), &[id]);
    assert_eq!(end, Position::new(id, 1));
    assert_eq!(tree.outline(), "Standard \"AB\"\n");
}

#[rstest]
#[case::plain(plain(), "X")]
#[case::markdown(markdown(), "X")]
#[case::rtf(rtf(), r"{\rtf1\ansi X}")]
fn single_paragraph_is_spliced_inline(
    #[case] mut importer: Box<dyn ImporterDelegate>,
    #[case] content: &str,
) {
    let (mut tree, start) = single("AB");

    let end = run(&mut tree, Position::new(start.node, 1), content, importer.as_mut()).unwrap();

    assert_eq!(tree.text(), "AXB");
    assert_eq!(tree.len(), 1);
    assert_eq!(end.offset, 2);
    assert_eq!(tree.marker_count(), 0);
}

#[rstest]
#[case::plain_lines(plain(), "one\ntwo\nthree")]
#[case::heading_and_body(markdown(), "# Head\n\nbody *text*")]
#[case::list(markdown(), "- a\n- b\n")]
#[case::leading_rule(markdown(), "---\n\nafter")]
#[case::trailing_rule(markdown(), "before\n\n---")]
#[case::only_a_rule(markdown(), "***")]
#[case::rtf_paragraphs(rtf(), r"{\rtf1\ansi one {\b two}\par three}")]
fn splice_leaves_no_scaffolding(
    #[case] mut importer: Box<dyn ImporterDelegate>,
    #[case] content: &str,
    #[values(1, 2, 3)] offset: usize,
) {
    let (mut tree, start) = single("ABC");

    run(&mut tree, Position::new(start.node, offset), content, importer.as_mut()).unwrap();

    assert_eq!(scaffolding(&tree), Vec::<String>::new(), "{}", tree.outline());
    assert_eq!(tree.marker_count(), 0);
    assert!(tree.invariant_violations().is_empty());
}

#[rstest]
#[case(plain(), "X")]
#[case(plain(), "one\ntwo")]
#[case(markdown(), "# Head\n\nbody")]
#[case(markdown(), "X\n\n---\n\nY")]
#[case(rtf(), r"{\rtf1\ansi one\par {\i two}}")]
fn deleting_the_inserted_span_restores_the_text(
    #[case] mut importer: Box<dyn ImporterDelegate>,
    #[case] content: &str,
) {
    let mut tree = sample();
    let before = tree.text();
    let target = Position::new(tree.node_ids()[1], 3);
    let start = text_offset(&tree, target);

    run(&mut tree, target, content, importer.as_mut()).unwrap();
    let inserted = tree.text().len() - before.len();
    let range = Range::new(position_at(&tree, start), position_at(&tree, start + inserted));
    tree.delete(range).unwrap();

    assert_eq!(tree.text(), before);
}

#[rstest]
#[case::start(0)]
#[case::middle(2)]
#[case::end(4)]
fn importer_failure_leaves_text_unchanged(#[case] offset: usize) {
    let mut tree = sample();
    let before = tree.text();
    let count = tree.len();
    let target = Position::new(tree.node_ids()[0], offset);

    let err = run(&mut tree, target, "ignored", &mut BrokenImporter).unwrap_err();

    assert!(matches!(err, SpliceError::Read(ImportError::Unsupported(_))));
    assert_eq!(tree.text(), before);
    assert_eq!(tree.len(), count);
    assert_eq!(tree.marker_count(), 0);
}

#[rstest]
#[case::rtf_without_header(rtf(), b"plain words")]
#[case::invalid_utf8(plain(), &[0xC3, 0x28])]
fn parser_errors_surface_as_read_errors(
    #[case] mut importer: Box<dyn ImporterDelegate>,
    #[case] mut content: &[u8],
) {
    let (mut tree, start) = single("AB");

    let result = splice(
        &mut tree,
        Position::new(start.node, 1),
        &mut content,
        importer.as_mut(),
        &SpliceOptions::default(),
    );

    assert!(matches!(result, Err(SpliceError::Read(_))));
    assert_eq!(tree.outline(), "Standard \"AB\"\n");
    assert_eq!(tree.marker_count(), 0);
}

#[rstest]
#[case::one_line("Text")]
#[case::two_lines("Text\nMore")]
fn list_item_keeps_its_identity(#[case] content: &str) {
    let mut tree = DocumentTree::from_nodes(
        StyleSheet::default(),
        vec![list_item("Item", 1), paragraph("Standard", "After")],
    );
    let item = tree.node_ids()[0];

    run(&mut tree, Position::new(item, 4), content, &mut PlainTextImporter).unwrap();

    let members: Vec<String> = tree
        .nodes()
        .filter(|(_, node)| node.list().is_some())
        .map(|(_, node)| node.text())
        .collect();
    assert_eq!(members, vec!["ItemText".to_string()]);
    assert_eq!(tree.text(), format!("Item{content}\nAfter"));
    assert!(tree.invariant_violations().is_empty());
}

#[rstest]
#[case::end_of_item(5, "X\nY", &[("firstX", Some(1)), ("Y", None), ("second", Some(2))])]
#[case::middle_of_item(
    2,
    "X\nY\nZ",
    &[("fiX", Some(1)), ("Y", None), ("Zrst", Some(2)), ("second", Some(2))]
)]
fn list_cut_by_a_splice_is_renumbered(
    #[case] offset: usize,
    #[case] content: &str,
    #[case] expected: &[(&str, Option<u32>)],
) {
    let mut tree = DocumentTree::from_nodes(
        StyleSheet::default(),
        vec![list_item("first", 1), list_item("second", 1)],
    );
    let first = tree.node_ids()[0];

    run(&mut tree, Position::new(first, offset), content, &mut PlainTextImporter).unwrap();

    let entries: Vec<(String, Option<u32>)> = tree
        .nodes()
        .map(|(_, node)| (node.text(), node.list().map(|membership| membership.list.0)))
        .collect();
    let expected: Vec<(String, Option<u32>)> = expected
        .iter()
        .map(|(text, list)| (text.to_string(), *list))
        .collect();
    assert_eq!(entries, expected);
    assert!(tree.invariant_violations().is_empty());
}

#[test]
fn empty_imported_heading_survives_the_splice() {
    let (mut tree, start) = single("AB");

    run(
        &mut tree,
        Position::new(start.node, 1),
        "# Head\n\n#\n\nx",
        &mut MarkdownImporter::default(),
    )
    .unwrap();

    assert_eq!(tree.text(), "AHead\n\nxB");
    assert_eq!(
        styles(&tree),
        vec!["Heading 1 None", "Heading 1 None", "Standard None"]
    );
    assert_eq!(tree.marker_count(), 0);
}

#[test]
fn removed_prefix_is_not_joined() {
    let mut tree = DocumentTree::from_nodes(
        StyleSheet::default(),
        vec![paragraph("Heading 1", "Before"), paragraph("Standard", "AB")],
    );
    let target = Position::new(tree.node_ids()[1], 1);

    let end = run(&mut tree, target, "", &mut PrefixRemover).unwrap();

    assert_eq!(tree.text(), "Before\nXB");
    assert_eq!(tree.node(tree.node_ids()[0]).unwrap().style().name(), "Heading 1");
    assert_eq!(end.offset, 1);
    assert_eq!(tree.marker_count(), 0);
}

#[test]
fn invalid_targets_are_rejected_before_any_change() {
    let mut tree = sample();
    let before = tree.version();
    let rule = tree.node_ids()[4];
    let accented = tree.node_ids()[1];

    for target in [Position::start_of(rule), Position::new(accented, 2)] {
        let err = run(&mut tree, target, "X", &mut PlainTextImporter).unwrap_err();
        assert!(matches!(err, SpliceError::StructuralPrecondition(_)));
    }
    assert_eq!(tree.version(), before);
}

#[test]
fn replace_mode_is_passed_to_the_importer() {
    let (mut tree, start) = single("AB");
    let options = SpliceOptions {
        mode: ImportMode::Replace,
        ..SpliceOptions::default()
    };

    splice(
        &mut tree,
        Position::new(start.node, 1),
        &mut "# Head".as_bytes(),
        &mut MarkdownImporter::default(),
        &options,
    )
    .unwrap();

    assert_eq!(tree.text(), "AHeadB");
    assert!(tree.invariant_violations().is_empty());
}
