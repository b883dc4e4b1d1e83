use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use docsplice_config::{Config, Mode};
use docsplice_engine::{
    CharFormat, DocumentTree, ImportMode, ImporterDelegate, MarkdownImporter, ParagraphStyle,
    PlainTextImporter, Position, RtfImporter, SpliceOptions, StyleRef, StyleSheet, load, splice,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug)]
#[command(name = "docsplice")]
#[command(about = "Splice a fragment into a document and print the result", long_about = None)]
struct Args {
    /// Markdown document to splice into
    document: PathBuf,

    /// Fragment to insert
    fragment: PathBuf,

    /// Paragraph to insert into, counting from 0
    #[arg(short = 'p', long = "paragraph", default_value = "0")]
    paragraph: usize,

    /// Byte offset inside the paragraph (default: end of the paragraph)
    #[arg(short = 'o', long = "offset")]
    offset: Option<usize>,

    /// Format of the fragment (default: guessed from its extension)
    #[arg(short = 'f', long = "format", value_enum)]
    format: Option<Format>,

    /// Config file (default: ~/.config/docsplice/config.toml)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Md,
    Rtf,
    Text,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("rtf") => Format::Rtf,
            Some("txt" | "text") => Format::Text,
            _ => Format::Md,
        }
    }

    fn importer(self) -> Box<dyn ImporterDelegate> {
        match self {
            Format::Md => Box::new(MarkdownImporter::default()),
            Format::Rtf => Box::new(RtfImporter),
            Format::Text => Box::new(PlainTextImporter),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let loaded = load_config(args.config.as_deref())?;
    let from_file = loaded.is_some();
    let config = loaded.unwrap_or_default();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();
    if !from_file {
        log::debug!("No config file found, using defaults");
    }

    let document = fs::read(&args.document)
        .with_context(|| format!("Failed to read document {}", args.document.display()))?;
    let mut tree = load(
        &mut MarkdownImporter::default(),
        &document,
        style_sheet(&config),
    )
    .with_context(|| format!("Failed to load document {}", args.document.display()))?;
    log::info!("Loaded {} paragraphs from {}", tree.len(), args.document.display());

    let target = target_position(&tree, args.paragraph, args.offset)?;
    let format = args
        .format
        .unwrap_or_else(|| Format::from_path(&args.fragment));
    let fragment = fs::read(&args.fragment)
        .with_context(|| format!("Failed to read fragment {}", args.fragment.display()))?;

    let options = splice_options(&config);
    let mut importer = format.importer();
    let end = splice(
        &mut tree,
        target,
        &mut fragment.as_slice(),
        importer.as_mut(),
        &options,
    )
    .with_context(|| format!("Failed to splice {} at {target}", args.fragment.display()))?;

    print!("{}", tree.outline());
    println!("cursor: {end}");
    Ok(())
}

/// Load the explicit config file, or the default one if it exists
fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    let loaded = match path {
        Some(path) => {
            let path = Config::expand_path(path).unwrap_or_else(|| path.to_path_buf());
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            Config::load_from_path(&path)?
        }
        None => Config::load()?,
    };
    Ok(loaded)
}

fn style_sheet(config: &Config) -> StyleSheet {
    let mut styles = StyleSheet::default();
    for style in &config.styles {
        styles.insert(ParagraphStyle {
            name: StyleRef::new(style.name.as_str()),
            char_format: CharFormat {
                bold: style.bold,
                italic: style.italic,
                underline: style.underline,
                strikethrough: style.strikethrough,
                size: style.size,
            },
        });
    }
    styles
}

fn splice_options(config: &Config) -> SpliceOptions {
    SpliceOptions {
        neutral_style: StyleRef::new(config.neutral_style.as_str()),
        mode: match config.mode {
            Mode::Insert => ImportMode::Insert,
            Mode::Replace => ImportMode::Replace,
        },
    }
}

fn target_position(tree: &DocumentTree, paragraph: usize, offset: Option<usize>) -> Result<Position> {
    let Some(&id) = tree.node_ids().get(paragraph) else {
        bail!(
            "Paragraph {paragraph} does not exist; the document has {} paragraphs",
            tree.len()
        );
    };
    let Some(node) = tree.node(id).filter(|node| node.is_text()) else {
        bail!("Paragraph {paragraph} is not a text paragraph");
    };
    Ok(Position::new(id, offset.unwrap_or(node.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsplice_config::StyleConfig;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("fragment.rtf", Format::Rtf)]
    #[case("FRAGMENT.RTF", Format::Rtf)]
    #[case("notes.txt", Format::Text)]
    #[case("notes.md", Format::Md)]
    #[case("no-extension", Format::Md)]
    fn test_format_from_path(#[case] path: &str, #[case] expected: Format) {
        assert_eq!(Format::from_path(Path::new(path)), expected);
    }

    #[test]
    fn test_configured_styles_extend_defaults() {
        let config = Config {
            styles: vec![StyleConfig {
                name: "Callout".to_string(),
                bold: Some(true),
                ..StyleConfig::default()
            }],
            ..Config::default()
        };

        let styles = style_sheet(&config);

        assert_eq!(styles.char_format(&StyleRef::new("Callout")), CharFormat::bold());
        assert!(styles.contains(&StyleRef::heading(1)));
    }

    #[test]
    fn test_target_defaults_to_end_of_paragraph() {
        let tree = load(
            &mut MarkdownImporter::default(),
            b"first\n\nsecond",
            StyleSheet::default(),
        )
        .unwrap();

        let target = target_position(&tree, 1, None).unwrap();

        assert_eq!(target, Position::new(tree.node_ids()[1], 6));
        assert!(target_position(&tree, 2, None).is_err());
    }

    #[test]
    fn test_replace_mode_maps_through() {
        let config = Config {
            mode: Mode::Replace,
            neutral_style: "Body".to_string(),
            ..Config::default()
        };

        let options = splice_options(&config);

        assert_eq!(options.mode, ImportMode::Replace);
        assert_eq!(options.neutral_style, StyleRef::new("Body"));
    }
}
