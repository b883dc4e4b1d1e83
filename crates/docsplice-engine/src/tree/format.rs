use std::collections::HashMap;
use std::fmt;

/// Font size used when neither a style nor direct formatting sets one
pub const DEFAULT_FONT_SIZE: u16 = 12;

/// Name of the paragraph style the splice assigns to its gap node
pub const NEUTRAL_STYLE: &str = "Standard";

/// Character-level formatting where every attribute is optional.
///
/// `None` means "inherit"; the value is taken from whatever lies underneath
/// (paragraph formatting, paragraph style, or the document defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
    pub size: Option<u16>,
}

/// Fully resolved character formatting with no inherited attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCharFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub size: u16,
}

impl Default for ResolvedCharFormat {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            size: DEFAULT_FONT_SIZE,
        }
    }
}

impl CharFormat {
    pub fn bold() -> Self {
        Self {
            bold: Some(true),
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: Some(true),
            ..Self::default()
        }
    }

    pub fn underline() -> Self {
        Self {
            underline: Some(true),
            ..Self::default()
        }
    }

    pub fn strikethrough() -> Self {
        Self {
            strikethrough: Some(true),
            ..Self::default()
        }
    }

    /// True when no attribute is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of `self`; attributes set in `other` win
    pub fn overlay(&self, other: &CharFormat) -> CharFormat {
        CharFormat {
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            underline: other.underline.or(self.underline),
            strikethrough: other.strikethrough.or(self.strikethrough),
            size: other.size.or(self.size),
        }
    }

    pub fn resolve(&self) -> ResolvedCharFormat {
        let defaults = ResolvedCharFormat::default();
        ResolvedCharFormat {
            bold: self.bold.unwrap_or(defaults.bold),
            italic: self.italic.unwrap_or(defaults.italic),
            underline: self.underline.unwrap_or(defaults.underline),
            strikethrough: self.strikethrough.unwrap_or(defaults.strikethrough),
            size: self.size.unwrap_or(defaults.size),
        }
    }
}

impl ResolvedCharFormat {
    /// The attributes of `self` that differ from `base`, as explicit settings.
    ///
    /// Applying the result on top of `base` yields `self`.
    pub fn difference_from(&self, base: &ResolvedCharFormat) -> CharFormat {
        CharFormat {
            bold: (self.bold != base.bold).then_some(self.bold),
            italic: (self.italic != base.italic).then_some(self.italic),
            underline: (self.underline != base.underline).then_some(self.underline),
            strikethrough: (self.strikethrough != base.strikethrough)
                .then_some(self.strikethrough),
            size: (self.size != base.size).then_some(self.size),
        }
    }
}

/// Run-level formatting over a byte range of a node's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineHint {
    pub range: std::ops::Range<usize>,
    pub format: CharFormat,
}

impl InlineHint {
    pub fn new(range: std::ops::Range<usize>, format: CharFormat) -> Self {
        Self { range, format }
    }
}

/// Stable identity of a list chain
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListId(pub u32);

/// A node's membership in a list chain
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ListMembership {
    pub list: ListId,
    /// Nesting level, 0 for top-level entries
    pub level: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Alignment {
    Start,
    Center,
    End,
    Justify,
}

/// Formatting set directly on a paragraph, on top of its paragraph style
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphFormat {
    pub alignment: Option<Alignment>,
    /// Left indent in points
    pub indent: Option<u16>,
    /// Paragraph-level character attributes
    pub char_format: CharFormat,
    /// List identity; never copied implicitly between paragraphs
    pub list: Option<ListMembership>,
}

impl ParagraphFormat {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Reference to a named paragraph style in the document's [`StyleSheet`]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleRef(String);

impl StyleRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn neutral() -> Self {
        Self::new(NEUTRAL_STYLE)
    }

    pub fn heading(level: u8) -> Self {
        Self(format!("Heading {}", level.clamp(1, 6)))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StyleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StyleRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A named paragraph style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphStyle {
    pub name: StyleRef,
    pub char_format: CharFormat,
}

/// The paragraph style collection of a document
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    styles: HashMap<StyleRef, ParagraphStyle>,
}

impl StyleSheet {
    /// A sheet holding only the neutral style
    pub fn empty() -> Self {
        let mut sheet = Self {
            styles: HashMap::new(),
        };
        sheet.insert(ParagraphStyle {
            name: StyleRef::neutral(),
            char_format: CharFormat::default(),
        });
        sheet
    }

    pub fn insert(&mut self, style: ParagraphStyle) {
        self.styles.insert(style.name.clone(), style);
    }

    pub fn get(&self, name: &StyleRef) -> Option<&ParagraphStyle> {
        self.styles.get(name)
    }

    pub fn contains(&self, name: &StyleRef) -> bool {
        self.styles.contains_key(name)
    }

    /// Character formatting contributed by a style; unknown styles contribute nothing
    pub fn char_format(&self, name: &StyleRef) -> CharFormat {
        self.styles
            .get(name)
            .map(|style| style.char_format.clone())
            .unwrap_or_default()
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        let mut sheet = Self::empty();
        let sizes = [24, 20, 16, 14, 13, 12];
        for (level, size) in (1..=6u8).zip(sizes) {
            sheet.insert(ParagraphStyle {
                name: StyleRef::heading(level),
                char_format: CharFormat {
                    bold: Some(true),
                    size: Some(size),
                    ..CharFormat::default()
                },
            });
        }
        sheet.insert(ParagraphStyle {
            name: StyleRef::new("Quote"),
            char_format: CharFormat::italic(),
        });
        sheet.insert(ParagraphStyle {
            name: StyleRef::new("List Paragraph"),
            char_format: CharFormat::default(),
        });
        sheet
    }
}
