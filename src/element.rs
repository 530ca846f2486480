use std::ops::Range;

/// Kind of a parsed Markdown element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Header,
    Paragraph,
    BulletedList,
    NumberedList,
    ListItem,
    Blockquote,
    CodeBlock,
    LineBreak,
    HorizontalRule,
    Strikethrough,
    Strong,
    Em,
    CodeSpan,
    Image,
    Link,
    MailTo,
    Entity,
    Html,
    /// Plain inline text taken verbatim from the source range
    PlainRun,
    Table,
    TableHeader,
    TableHeaderCell,
    TableRow,
    TableRowCell,
    Unknown,
}

impl ElementKind {
    /// Leaf kinds contribute their source text to the surrounding run instead of
    /// being built into nodes of their own.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            ElementKind::PlainRun | ElementKind::Html | ElementKind::LineBreak
        )
    }
}

/// A node of the parsed Markdown tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub kind: ElementKind,
    /// Byte range into [`MarkdownDocument::source`]
    pub range: Range<usize>,
    pub children: Vec<Element>,
    /// Link or image destination
    pub href: Option<String>,
    /// Image alternative text
    pub alt: Option<String>,
    /// Header level, 1-6 for well-formed headers
    pub level: u8,
}

impl Element {
    pub fn new(kind: ElementKind, range: Range<usize>) -> Self {
        Self {
            kind,
            range,
            children: Vec::new(),
            href: None,
            alt: None,
            level: 0,
        }
    }

    pub fn with_children(mut self, children: Vec<Element>) -> Self {
        self.children = children;
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }
}

/// A parsed document: the source text plus its top-level elements.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownDocument {
    source: String,
    elements: Vec<Element>,
}

impl MarkdownDocument {
    pub fn new(source: impl Into<String>, elements: Vec<Element>) -> Self {
        Self {
            source: source.into(),
            elements,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Source text covered by `element`. Out-of-bounds ranges yield an empty string.
    pub fn text(&self, element: &Element) -> &str {
        self.source.get(element.range.clone()).unwrap_or_default()
    }
}
