//! Recursive element-to-node transducer.
//!
//! [`NodeBuilder::build`] walks one element, feeding inline text into a shared
//! [`TextAccumulator`] and returning the composed node for everything that starts
//! a visual block. Per-kind behavior comes from a single [`dispatch`] table.

use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::decorate::decorate;
use crate::element::{Element, ElementKind, MarkdownDocument};
use crate::layout::{ImageId, ImagePlaceholder, LayoutNode, TextAttributes};
use crate::profile::{BlockFormat, FormattingProfile};
use crate::style::{BlockStyle, TextStyle};
use crate::text::TextAccumulator;

/// An image discovered during the walk, waiting for its data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingImageLoad {
    pub id: ImageId,
    pub url: Url,
    pub loaded: bool,
}

/// Where an element sits in its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub parent: Option<ElementKind>,
    pub index: usize,
}

impl Position {
    pub fn top_level(index: usize) -> Self {
        Self {
            parent: None,
            index,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Special {
    #[default]
    None,
    HorizontalRule,
    Image,
    ListItem,
    /// Element and its children contribute nothing
    Skip,
}

#[derive(Debug, Default)]
struct Dispatch<'p> {
    text: Option<&'p TextStyle>,
    block: Option<&'p BlockStyle>,
    boundary: bool,
    strikethrough: bool,
    link: bool,
    special: Special,
}

impl<'p> Dispatch<'p> {
    fn block(format: &'p BlockFormat) -> Self {
        Self {
            text: Some(&format.text),
            block: Some(&format.block),
            boundary: true,
            ..Self::default()
        }
    }

    fn inline(text: &'p TextStyle) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }
}

fn dispatch<'p>(profile: &'p FormattingProfile, element: &Element) -> Dispatch<'p> {
    match element.kind {
        ElementKind::Header => Dispatch::block(profile.header(element.level)),
        ElementKind::Paragraph => Dispatch::block(&profile.paragraph),
        ElementKind::Blockquote => Dispatch::block(&profile.quote),
        ElementKind::CodeBlock => Dispatch::block(&profile.code_block),
        ElementKind::ListItem => Dispatch {
            special: Special::ListItem,
            ..Dispatch::block(&profile.list_item)
        },
        ElementKind::BulletedList | ElementKind::NumberedList => Dispatch {
            boundary: false,
            ..Dispatch::block(&profile.list)
        },
        ElementKind::LineBreak | ElementKind::PlainRun | ElementKind::Html => Dispatch::default(),
        ElementKind::HorizontalRule => Dispatch {
            special: Special::HorizontalRule,
            ..Dispatch::default()
        },
        ElementKind::Strikethrough => Dispatch {
            strikethrough: true,
            ..Dispatch::inline(&profile.strikethrough)
        },
        ElementKind::Strong => Dispatch::inline(&profile.bold),
        ElementKind::Em => Dispatch::inline(&profile.italic),
        ElementKind::CodeSpan => Dispatch::inline(&profile.code),
        ElementKind::Image => Dispatch {
            block: Some(&profile.image),
            special: Special::Image,
            ..Dispatch::default()
        },
        ElementKind::Link | ElementKind::MailTo => Dispatch {
            link: true,
            ..Dispatch::inline(&profile.hyperlink)
        },
        ElementKind::Entity
        | ElementKind::Table
        | ElementKind::TableHeader
        | ElementKind::TableHeaderCell
        | ElementKind::TableRow
        | ElementKind::TableRowCell
        | ElementKind::Unknown => Dispatch {
            special: Special::Skip,
            ..Dispatch::default()
        },
    }
}

/// Builds layout nodes for the elements of one document.
pub struct NodeBuilder<'a> {
    document: &'a MarkdownDocument,
    profile: &'a FormattingProfile,
    base_url: Option<&'a Url>,
    images: Vec<PendingImageLoad>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(document: &'a MarkdownDocument, profile: &'a FormattingProfile) -> Self {
        Self {
            document,
            profile,
            base_url: None,
            images: Vec::new(),
        }
    }

    /// Resolve relative image destinations against `base_url`.
    pub fn with_base_url(mut self, base_url: Option<&'a Url>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Images registered so far, in discovery order.
    pub fn into_images(self) -> Vec<PendingImageLoad> {
        self.images
    }

    /// Build the node for `element`, or `None` when it contributes nothing visible.
    ///
    /// Inline text is appended to `text` with `inherited` attributes overlaid by the
    /// element's own text style. Pending text is flushed into this element's
    /// children before any child node, and once more at the end of block
    /// boundaries.
    pub fn build(
        &mut self,
        element: &Element,
        position: Position,
        inherited: Option<&TextAttributes>,
        text: &mut TextAccumulator,
        depth: usize,
    ) -> Option<LayoutNode> {
        let dispatch = dispatch(self.profile, element);
        trace!(depth, kind = ?element.kind, "building element");

        let mut nodes = Vec::new();
        match dispatch.special {
            Special::Skip => {
                trace!(depth, kind = ?element.kind, "ignoring unsupported element");
                return None;
            }
            Special::HorizontalRule => {
                text.flush_into(&mut nodes);
                nodes.push(self.profile.rule.node());
            }
            Special::Image => {
                let url = self.resolve_image(element)?;
                text.flush_into(&mut nodes);
                nodes.push(self.register_image(url, element.alt.clone()));
            }
            Special::None | Special::ListItem => {}
        }

        let mut attributes = match dispatch.text {
            Some(style) => Some(TextAttributes::overlay(inherited, style)),
            None => inherited.cloned(),
        };
        if let Some(attributes) = attributes.as_mut() {
            if dispatch.strikethrough {
                attributes.strikethrough = true;
            }
            if dispatch.link {
                attributes.link = element.href.clone();
            }
        }

        for (index, child) in element.children.iter().enumerate() {
            if child.kind.is_leaf() {
                self.append_leaf(child, attributes.as_ref(), text);
                continue;
            }
            let position = Position {
                parent: Some(element.kind),
                index,
            };
            if let Some(node) = self.build(child, position, attributes.as_ref(), text, depth + 1) {
                text.flush_into(&mut nodes);
                nodes.push(node);
            }
        }

        if dispatch.boundary {
            text.trim_trailing_newline();
            text.flush_into(&mut nodes);
        }

        let mut node = compose(nodes)?;
        if dispatch.special == Special::ListItem {
            node = self.list_item(node, position, attributes);
        }
        decorate(Some(node), dispatch.block)
    }

    fn append_leaf(
        &self,
        leaf: &Element,
        attributes: Option<&TextAttributes>,
        text: &mut TextAccumulator,
    ) {
        if leaf.range.is_empty() {
            text.append_line_break();
        } else {
            text.append(self.document.text(leaf), attributes);
        }
    }

    fn resolve_image(&self, element: &Element) -> Option<Url> {
        let href = element.href.as_deref().unwrap_or_default();
        if href.is_empty() || href.contains(char::is_whitespace) {
            debug!(href, "skipping image with unusable url");
            return None;
        }
        let resolved = match self.base_url {
            Some(base) => base.join(href),
            None => Url::parse(href),
        };
        match resolved {
            Ok(url) => Some(url),
            Err(err) => {
                debug!(href, error = %err, "skipping image with unresolvable url");
                None
            }
        }
    }

    fn register_image(&mut self, url: Url, alt: Option<String>) -> LayoutNode {
        let id = ImageId(self.images.len());
        debug!(id = id.0, url = %url, "registered image");
        self.images.push(PendingImageLoad {
            id,
            url: url.clone(),
            loaded: false,
        });
        LayoutNode::Image(ImagePlaceholder { id, url, alt })
    }

    fn list_item(
        &self,
        content: LayoutNode,
        position: Position,
        attributes: Option<TextAttributes>,
    ) -> LayoutNode {
        let delimiter = match position.parent {
            Some(ElementKind::NumberedList) => format!("{}.", position.index + 1),
            _ => "•".to_string(),
        };
        LayoutNode::horizontal(
            vec![LayoutNode::text(delimiter, attributes), content],
            self.profile.item_spacing,
        )
    }
}

fn compose(mut nodes: Vec<LayoutNode>) -> Option<LayoutNode> {
    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(LayoutNode::vertical(nodes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Axis;
    use crate::style::{Insets, TextStyle};

    fn run(kind: ElementKind, range: std::ops::Range<usize>) -> Element {
        Element::new(kind, range)
    }

    fn build_top(
        doc: &MarkdownDocument,
        profile: &FormattingProfile,
    ) -> (Vec<LayoutNode>, Vec<PendingImageLoad>) {
        let mut builder = NodeBuilder::new(doc, profile);
        let mut text = TextAccumulator::new();
        let mut nodes = Vec::new();
        for (index, element) in doc.elements().iter().enumerate() {
            if let Some(node) = builder.build(element, Position::top_level(index), None, &mut text, 0) {
                text.flush_into(&mut nodes);
                nodes.push(node);
            }
        }
        text.flush_into(&mut nodes);
        (nodes, builder.into_images())
    }

    fn paragraph_with(children: Vec<Element>, len: usize) -> Element {
        run(ElementKind::Paragraph, 0..len).with_children(children)
    }

    #[test]
    fn image_with_unparseable_href_is_skipped() {
        let doc = MarkdownDocument::new(
            "x",
            vec![run(ElementKind::Image, 0..1).with_href("not a url")],
        );
        let (nodes, images) = build_top(&doc, &FormattingProfile::default());
        assert!(nodes.is_empty());
        assert!(images.is_empty());
    }

    #[test]
    fn image_with_absolute_href_registers_load() {
        let doc = MarkdownDocument::new(
            "x",
            vec![run(ElementKind::Image, 0..1).with_href("https://x/y.png")],
        );
        let (nodes, images) = build_top(&doc, &FormattingProfile::default());
        assert_eq!(nodes.len(), 1);
        let LayoutNode::Image(placeholder) = &nodes[0] else {
            panic!("expected image placeholder, got {nodes:?}");
        };
        assert_eq!(placeholder.url.as_str(), "https://x/y.png");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, placeholder.id);
        assert!(!images[0].loaded);
    }

    #[test]
    fn relative_image_resolves_against_base() {
        let doc = MarkdownDocument::new(
            "x",
            vec![run(ElementKind::Image, 0..1).with_href("img/cat.png")],
        );
        let profile = FormattingProfile::default();
        let base = Url::parse("file:///docs/").unwrap();
        let mut builder = NodeBuilder::new(&doc, &profile).with_base_url(Some(&base));
        let mut text = TextAccumulator::new();
        let node = builder.build(&doc.elements()[0], Position::top_level(0), None, &mut text, 0);
        assert!(node.is_some());
        assert_eq!(builder.into_images()[0].url.as_str(), "file:///docs/img/cat.png");
    }

    #[test]
    fn base_url_does_not_rescue_unusable_hrefs() {
        let doc = MarkdownDocument::new(
            "xy",
            vec![
                run(ElementKind::Image, 0..1).with_href("not a url"),
                run(ElementKind::Image, 1..2).with_href(""),
            ],
        );
        let profile = FormattingProfile::default();
        let base = Url::parse("file:///docs/").unwrap();
        let mut builder = NodeBuilder::new(&doc, &profile).with_base_url(Some(&base));
        let mut text = TextAccumulator::new();
        for (index, element) in doc.elements().iter().enumerate() {
            let node = builder.build(element, Position::top_level(index), None, &mut text, 0);
            assert_eq!(node, None);
        }
        assert!(builder.into_images().is_empty());
    }

    #[test]
    fn image_flushes_pending_text_as_sibling() {
        let source = "before x";
        let doc = MarkdownDocument::new(
            source,
            vec![paragraph_with(
                vec![
                    run(ElementKind::PlainRun, 0..7),
                    run(ElementKind::Image, 7..8).with_href("https://x/y.png"),
                ],
                8,
            )],
        );
        let (nodes, _) = build_top(&doc, &FormattingProfile::default());
        assert_eq!(
            nodes[0].outline(),
            "vstack spacing=0\n  text \"before \"\n  image #0 https://x/y.png\n"
        );
    }

    #[test]
    fn numbered_items_use_position_not_content() {
        let source = "same";
        let item = || {
            run(ElementKind::ListItem, 0..4).with_children(vec![run(ElementKind::PlainRun, 0..4)])
        };
        let doc = MarkdownDocument::new(
            source,
            vec![run(ElementKind::NumberedList, 0..4).with_children(vec![item(), item(), item()])],
        );
        let (nodes, _) = build_top(&doc, &FormattingProfile::default());
        let LayoutNode::Container { children, .. } = &nodes[0] else {
            panic!("expected list container");
        };
        let delimiters: Vec<String> = children
            .iter()
            .map(|item| match item {
                LayoutNode::Container {
                    axis: Axis::Horizontal,
                    children,
                    ..
                } => children[0].as_text().unwrap().text(),
                other => panic!("expected list item row, got {other:?}"),
            })
            .collect();
        assert_eq!(delimiters, vec!["1.", "2.", "3."]);
    }

    #[test]
    fn bulleted_items_use_bullet() {
        let doc = MarkdownDocument::new(
            "a",
            vec![run(ElementKind::BulletedList, 0..1).with_children(vec![
                run(ElementKind::ListItem, 0..1)
                    .with_children(vec![run(ElementKind::PlainRun, 0..1)]),
            ])],
        );
        let (nodes, _) = build_top(&doc, &FormattingProfile::default());
        assert_eq!(
            nodes[0].outline(),
            "hstack spacing=8\n  text \"•\"\n  text \"a\"\n"
        );
    }

    #[test]
    fn blockquote_trailing_line_break_is_stripped() {
        let source = "quoted";
        let without = MarkdownDocument::new(
            source,
            vec![run(ElementKind::Blockquote, 0..6)
                .with_children(vec![run(ElementKind::PlainRun, 0..6)])],
        );
        let with = MarkdownDocument::new(
            source,
            vec![run(ElementKind::Blockquote, 0..6).with_children(vec![
                run(ElementKind::PlainRun, 0..6),
                run(ElementKind::LineBreak, 6..6),
            ])],
        );
        let profile = FormattingProfile::compiled_default();
        assert_eq!(build_top(&with, &profile), build_top(&without, &profile));
    }

    #[test]
    fn inline_styles_apply_to_descendants() {
        let source = "plain bold";
        let doc = MarkdownDocument::new(
            source,
            vec![paragraph_with(
                vec![
                    run(ElementKind::PlainRun, 0..6),
                    run(ElementKind::Strong, 6..10)
                        .with_children(vec![run(ElementKind::PlainRun, 6..10)]),
                ],
                10,
            )],
        );
        let profile = FormattingProfile::compiled_default();
        let (nodes, _) = build_top(&doc, &profile);
        assert_eq!(nodes.len(), 1);
        let block = nodes[0].as_text().unwrap();
        assert_eq!(block.text(), "plain bold");
        assert_eq!(block.runs[1].attributes.as_ref().unwrap().font, profile.bold.font);
    }

    #[test]
    fn link_and_strikethrough_mark_runs() {
        let source = "gone site";
        let doc = MarkdownDocument::new(
            source,
            vec![paragraph_with(
                vec![
                    run(ElementKind::Strikethrough, 0..5)
                        .with_children(vec![run(ElementKind::PlainRun, 0..5)]),
                    run(ElementKind::Link, 5..9)
                        .with_href("https://example.com")
                        .with_children(vec![run(ElementKind::PlainRun, 5..9)]),
                ],
                9,
            )],
        );
        let (nodes, _) = build_top(&doc, &FormattingProfile::default());
        let block = nodes[0].as_text().unwrap();
        let gone = block.runs[0].attributes.as_ref().unwrap();
        let site = block.runs[1].attributes.as_ref().unwrap();
        assert!(gone.strikethrough);
        assert_eq!(gone.link, None);
        assert_eq!(site.link.as_deref(), Some("https://example.com"));
        assert_eq!(block.link_at(6), Some("https://example.com"));
    }

    #[test]
    fn horizontal_rule_flushes_then_divides() {
        let source = "above";
        let doc = MarkdownDocument::new(
            source,
            vec![run(ElementKind::Blockquote, 0..5).with_children(vec![
                run(ElementKind::PlainRun, 0..5),
                run(ElementKind::HorizontalRule, 5..5),
            ])],
        );
        let (nodes, _) = build_top(&doc, &FormattingProfile::default());
        assert_eq!(
            nodes[0].outline(),
            "vstack spacing=0\n  text \"above\"\n  divider *x1\n"
        );
    }

    #[test]
    fn tables_and_unknown_elements_contribute_nothing() {
        let source = "cell";
        let table = run(ElementKind::Table, 0..4).with_children(vec![
            run(ElementKind::TableRow, 0..4).with_children(vec![
                run(ElementKind::TableRowCell, 0..4)
                    .with_children(vec![run(ElementKind::PlainRun, 0..4)]),
            ]),
        ]);
        let doc = MarkdownDocument::new(
            source,
            vec![table, run(ElementKind::Unknown, 0..4), run(ElementKind::Entity, 0..4)],
        );
        let (nodes, images) = build_top(&doc, &FormattingProfile::default());
        assert!(nodes.is_empty());
        assert!(images.is_empty());
    }

    #[test]
    fn empty_paragraph_contributes_nothing() {
        let doc = MarkdownDocument::new("", vec![run(ElementKind::Paragraph, 0..0)]);
        let (nodes, _) = build_top(&doc, &FormattingProfile::compiled_default());
        assert!(nodes.is_empty());
    }

    #[test]
    fn code_block_gets_padded_box() {
        let source = "let x = 1;\n";
        let doc = MarkdownDocument::new(
            source,
            vec![run(ElementKind::CodeBlock, 0..11)
                .with_children(vec![run(ElementKind::PlainRun, 0..11)])],
        );
        let profile = FormattingProfile::compiled_default();
        let (nodes, _) = build_top(&doc, &profile);
        let LayoutNode::Decorated { inner, decoration } = &nodes[0] else {
            panic!("expected decorated code block");
        };
        assert_eq!(decoration.inset, Insets::uniform(8.0));
        assert!(decoration.background.is_some());
        assert_eq!(inner.as_text().unwrap().text(), "let x = 1;");
    }

    #[test]
    fn header_text_uses_level_style() {
        let doc = MarkdownDocument::new(
            "Sub",
            vec![run(ElementKind::Header, 0..3)
                .with_level(2)
                .with_children(vec![run(ElementKind::PlainRun, 0..3)])],
        );
        let profile = FormattingProfile::compiled_default();
        let (nodes, _) = build_top(&doc, &profile);
        let attributes = nodes[0].as_text().unwrap().runs[0].attributes.clone().unwrap();
        assert_eq!(attributes, TextAttributes::from_style(&profile.h2.text));
    }

    #[test]
    fn header_level_zero_falls_back_to_level_one() {
        let doc = MarkdownDocument::new(
            "Odd",
            vec![run(ElementKind::Header, 0..3)
                .with_children(vec![run(ElementKind::PlainRun, 0..3)])],
        );
        let profile = FormattingProfile::compiled_default();
        let (nodes, _) = build_top(&doc, &profile);
        let attributes = nodes[0].as_text().unwrap().runs[0].attributes.clone().unwrap();
        assert_eq!(attributes, TextAttributes::from_style(&profile.h1.text));
    }

    #[test]
    fn list_delimiter_uses_item_text_style() {
        let profile = FormattingProfile {
            list_item: BlockFormat {
                text: TextStyle {
                    strikethrough: true,
                    ..TextStyle::default()
                },
                ..Default::default()
            },
            ..FormattingProfile::default()
        };
        let doc = MarkdownDocument::new(
            "a",
            vec![run(ElementKind::BulletedList, 0..1).with_children(vec![
                run(ElementKind::ListItem, 0..1)
                    .with_children(vec![run(ElementKind::PlainRun, 0..1)]),
            ])],
        );
        let (nodes, _) = build_top(&doc, &profile);
        let LayoutNode::Container { children, .. } = &nodes[0] else {
            panic!("expected list item row");
        };
        let delimiter = children[0].as_text().unwrap();
        assert!(delimiter.runs[0].attributes.as_ref().unwrap().strikethrough);
    }
}
