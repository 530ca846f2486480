use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, LinkType, Options, Parser, Tag};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::element::{Element, ElementKind, MarkdownDocument};
use crate::error::ParseError;

/// Turns Markdown text into a [`MarkdownDocument`].
pub trait MarkdownParser {
    fn parse(&self, markdown: &str) -> Result<MarkdownDocument, ParseError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Drop a leading `---` delimited front matter block
    pub strip_frontmatter: bool,
    /// Deepest element nesting accepted before the parse fails
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strip_frontmatter: true,
            max_depth: 128,
        }
    }
}

/// [`MarkdownParser`] backed by pulldown-cmark's offset events.
#[derive(Debug, Clone, Default)]
pub struct CmarkParser {
    options: ParseOptions,
}

impl CmarkParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl MarkdownParser for CmarkParser {
    fn parse(&self, markdown: &str) -> Result<MarkdownDocument, ParseError> {
        let source = if self.options.strip_frontmatter {
            strip_frontmatter(markdown)
        } else {
            markdown
        };

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_FOOTNOTES);
        let parser = Parser::new_ext(source, options).into_offset_iter();

        let mut state = ParseState::new(source, self.options.max_depth);
        for (event, range) in parser {
            process_event(event, range, &mut state)?;
        }
        state.finish()
    }
}

/// Strip YAML frontmatter from the beginning of markdown content
fn strip_frontmatter(markdown: &str) -> &str {
    if !markdown.starts_with("---") {
        return markdown;
    }
    // Find the closing ---
    if let Some(end) = markdown[3..].find("\n---") {
        // Skip past the closing --- and any trailing newline
        let after_frontmatter = &markdown[3 + end + 4..];
        after_frontmatter.trim_start_matches('\n')
    } else {
        markdown
    }
}

struct ParseState<'s> {
    source: &'s str,
    // Elements still waiting for their end event
    open: Vec<Element>,
    elements: Vec<Element>,
    max_depth: usize,
}

impl<'s> ParseState<'s> {
    fn new(source: &'s str, max_depth: usize) -> Self {
        Self {
            source,
            open: Vec::new(),
            elements: Vec::new(),
            max_depth,
        }
    }

    fn start(&mut self, element: Element) -> Result<(), ParseError> {
        if self.open.len() >= self.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        self.open.push(element);
        Ok(())
    }

    fn end(&mut self) -> Result<(), ParseError> {
        let mut element = self.open.pop().ok_or(ParseError::UnexpectedEnd)?;
        if element.kind == ElementKind::Image {
            // Alt text is kept on the element, not rendered as children
            let alt: String = element
                .children
                .drain(..)
                .map(|child| &self.source[child.range])
                .collect();
            element.alt = (!alt.is_empty()).then_some(alt);
        }
        self.push(element);
        Ok(())
    }

    fn push(&mut self, element: Element) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(element),
            None => self.elements.push(element),
        }
    }

    fn parent_kind(&self) -> Option<ElementKind> {
        self.open.last().map(|element| element.kind)
    }

    fn finish(self) -> Result<MarkdownDocument, ParseError> {
        if !self.open.is_empty() {
            return Err(ParseError::Unbalanced {
                open: self.open.len(),
            });
        }
        Ok(MarkdownDocument::new(self.source, self.elements))
    }

    /// Narrow `range` to where `text` occurs in the source, so the element slices
    /// back to exactly the decoded text.
    fn locate(&self, text: &str, range: &Range<usize>) -> Option<Range<usize>> {
        let offset = self.source[range.clone()].find(text)?;
        let start = range.start + offset;
        Some(start..start + text.len())
    }
}

fn process_event(
    event: Event,
    range: Range<usize>,
    state: &mut ParseState,
) -> Result<(), ParseError> {
    match event {
        Event::Start(tag) => {
            let element = element_for_tag(tag, range, state.parent_kind());
            state.start(element)?;
        }
        Event::End(_) => state.end()?,

        Event::Text(text) => {
            // Entities decode to text that may not appear in the source
            let element = match state.locate(&text, &range) {
                Some(range) => Element::new(ElementKind::PlainRun, range),
                None => Element::new(ElementKind::Entity, range),
            };
            state.push(element);
        }

        // Inline code: the span wraps the code itself
        Event::Code(code) => {
            let slice = &state.source[range.clone()];
            let start = range.start + (slice.len() - slice.trim_start_matches('`').len());
            let end = range.start + slice.trim_end_matches('`').len();
            let inner = start..end.max(start);
            let content = state.locate(&code, &inner).unwrap_or(inner);
            let run = Element::new(ElementKind::PlainRun, content);
            state.push(Element::new(ElementKind::CodeSpan, range).with_children(vec![run]));
        }

        Event::Html(_) | Event::InlineHtml(_) => {
            state.push(Element::new(ElementKind::Html, range));
        }

        // Soft breaks keep their source newline; hard breaks become empty-range
        // line breaks
        Event::SoftBreak => state.push(Element::new(ElementKind::PlainRun, range)),
        Event::HardBreak => {
            state.push(Element::new(ElementKind::LineBreak, range.start..range.start));
        }

        Event::Rule => state.push(Element::new(ElementKind::HorizontalRule, range)),

        other => {
            debug!(event = ?other, "unsupported markdown event");
            state.push(Element::new(ElementKind::Unknown, range));
        }
    }
    Ok(())
}

fn element_for_tag(tag: Tag, range: Range<usize>, parent: Option<ElementKind>) -> Element {
    match tag {
        Tag::Paragraph => Element::new(ElementKind::Paragraph, range),
        Tag::Heading { level, .. } => {
            Element::new(ElementKind::Header, range).with_level(heading_level_to_u8(level))
        }
        Tag::BlockQuote(_) => Element::new(ElementKind::Blockquote, range),
        Tag::CodeBlock(_) => Element::new(ElementKind::CodeBlock, range),
        Tag::HtmlBlock => Element::new(ElementKind::Html, range),
        Tag::List(Some(_)) => Element::new(ElementKind::NumberedList, range),
        Tag::List(None) => Element::new(ElementKind::BulletedList, range),
        Tag::Item => Element::new(ElementKind::ListItem, range),
        Tag::Emphasis => Element::new(ElementKind::Em, range),
        Tag::Strong => Element::new(ElementKind::Strong, range),
        Tag::Strikethrough => Element::new(ElementKind::Strikethrough, range),
        Tag::Link {
            link_type,
            dest_url,
            ..
        } => {
            let dest = dest_url.into_string();
            if link_type == LinkType::Email || dest.starts_with("mailto:") {
                let href = if dest.starts_with("mailto:") {
                    dest
                } else {
                    format!("mailto:{dest}")
                };
                Element::new(ElementKind::MailTo, range).with_href(href)
            } else {
                Element::new(ElementKind::Link, range).with_href(dest)
            }
        }
        Tag::Image { dest_url, .. } => {
            Element::new(ElementKind::Image, range).with_href(dest_url.into_string())
        }
        Tag::Table(_) => Element::new(ElementKind::Table, range),
        Tag::TableHead => Element::new(ElementKind::TableHeader, range),
        Tag::TableRow => Element::new(ElementKind::TableRow, range),
        Tag::TableCell if parent == Some(ElementKind::TableHeader) => {
            Element::new(ElementKind::TableHeaderCell, range)
        }
        Tag::TableCell => Element::new(ElementKind::TableRowCell, range),
        _ => Element::new(ElementKind::Unknown, range),
    }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
