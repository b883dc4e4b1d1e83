use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use docsplice_engine::{
    DocumentTree, MarkdownImporter, PlainTextImporter, Position, SpliceOptions, StyleSheet, load,
    splice,
};

fn generate_document(sections: usize) -> DocumentTree {
    let mut content = String::new();
    for i in 0..sections {
        content.push_str(&format!("# Section {i}\n\n"));
        content.push_str("Some **bold** and *italic* text in a paragraph.\n\n");
        content.push_str("- first item\n- second item\n  - nested item\n\n");
        content.push_str("> quoted words\n\n");
    }
    load(
        &mut MarkdownImporter::default(),
        content.as_bytes(),
        StyleSheet::default(),
    )
    .unwrap()
}

fn middle(tree: &DocumentTree) -> Position {
    let id = tree.node_ids()[tree.len() / 2 + 1];
    let len = tree.node(id).map_or(0, |node| node.len());
    Position::new(id, len / 2)
}

fn bench_splice(c: &mut Criterion) {
    let mut group = c.benchmark_group("splice");
    group.sample_size(10);

    let doc = generate_document(100);
    let target = middle(&doc);
    let options = SpliceOptions::default();
    let plain = "one line\nanother line\nand a third\n".repeat(20);
    let markdown = "## Inserted\n\nWith *emphasis*\n\n- a\n- b\n\n---\n\n".repeat(20);

    group.bench_function("plain_text", |b| {
        b.iter_batched(
            || doc.clone(),
            |mut tree| {
                splice(
                    &mut tree,
                    target,
                    &mut plain.as_bytes(),
                    &mut PlainTextImporter,
                    &options,
                )
                .unwrap();
                std::hint::black_box(tree)
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("markdown", |b| {
        b.iter_batched(
            || doc.clone(),
            |mut tree| {
                splice(
                    &mut tree,
                    target,
                    &mut markdown.as_bytes(),
                    &mut MarkdownImporter::default(),
                    &options,
                )
                .unwrap();
                std::hint::black_box(tree)
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("empty", |b| {
        b.iter_batched(
            || doc.clone(),
            |mut tree| {
                splice(
                    &mut tree,
                    target,
                    &mut "".as_bytes(),
                    &mut PlainTextImporter,
                    &options,
                )
                .unwrap();
                std::hint::black_box(tree)
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_splice);
criterion_main!(benches);
