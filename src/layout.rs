//! The render tree handed to a layout/paint engine.
//!
//! Nodes are built bottom-up by [`crate::builder::NodeBuilder`] and never mutated once
//! returned; styling is added by wrapping a node in [`LayoutNode::Decorated`].

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::style::{Border, Color, Font, Insets, TextStyle};

/// Attributes attached to a run of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAttributes {
    pub font: Font,
    pub color: Option<Color>,
    pub background: Option<Color>,
    pub strikethrough: bool,
    /// Destination reported when the run is activated
    pub link: Option<String>,
}

impl TextAttributes {
    pub fn from_style(style: &TextStyle) -> Self {
        Self {
            font: style.font.clone(),
            color: style.color,
            background: style.background,
            strikethrough: style.strikethrough,
            link: None,
        }
    }

    /// Apply `style` on top of inherited attributes. The font is replaced, colors
    /// only when the style sets them; strikethrough and links carry through.
    pub fn overlay(inherited: Option<&TextAttributes>, style: &TextStyle) -> Self {
        let Some(base) = inherited else {
            return Self::from_style(style);
        };
        Self {
            font: style.font.clone(),
            color: style.color.or(base.color),
            background: style.background.or(base.background),
            strikethrough: style.strikethrough || base.strikethrough,
            link: base.link.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// `None` for unstyled text such as line breaks and raw HTML
    pub attributes: Option<TextAttributes>,
}

/// A flushed, immutable block of styled text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub runs: Vec<TextRun>,
}

impl TextBlock {
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Link destination of the run containing byte `offset`.
    pub fn link_at(&self, offset: usize) -> Option<&str> {
        let mut start = 0;
        for run in &self.runs {
            let end = start + run.text.len();
            if (start..end).contains(&offset) {
                return run.attributes.as_ref()?.link.as_deref();
            }
            start = end;
        }
        None
    }
}

/// Index of an image placeholder within one rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePlaceholder {
    pub id: ImageId,
    pub url: Url,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Vertical,
    Horizontal,
}

/// Styling carried by a [`LayoutNode::Decorated`] wrapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Decoration {
    /// Space between the wrapper's edge and the inner node
    pub inset: Insets,
    /// Painted across the whole wrapper, inset included
    pub background: Option<Color>,
    pub corner_radius: Option<f32>,
    pub border: Option<Border>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutNode {
    Text(TextBlock),
    Image(ImagePlaceholder),
    Container {
        axis: Axis,
        #[serde(default)]
        spacing: f32,
        children: Vec<LayoutNode>,
    },
    Decorated {
        inner: Box<LayoutNode>,
        #[serde(default)]
        decoration: Decoration,
    },
    /// A solid bar; a missing dimension stretches to fill the parent
    Divider {
        #[serde(default)]
        width: Option<f32>,
        #[serde(default)]
        height: Option<f32>,
        #[serde(default)]
        color: Option<Color>,
    },
}

impl LayoutNode {
    pub fn text(text: impl Into<String>, attributes: Option<TextAttributes>) -> Self {
        LayoutNode::Text(TextBlock {
            runs: vec![TextRun {
                text: text.into(),
                attributes,
            }],
        })
    }

    pub fn vertical(children: Vec<LayoutNode>) -> Self {
        LayoutNode::Container {
            axis: Axis::Vertical,
            spacing: 0.0,
            children,
        }
    }

    pub fn horizontal(children: Vec<LayoutNode>, spacing: f32) -> Self {
        LayoutNode::Container {
            axis: Axis::Horizontal,
            spacing,
            children,
        }
    }

    pub fn decorated(inner: LayoutNode, decoration: Decoration) -> Self {
        LayoutNode::Decorated {
            inner: Box::new(inner),
            decoration,
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            LayoutNode::Text(block) => Some(block),
            _ => None,
        }
    }

    /// Visit this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a LayoutNode)) {
        visit(self);
        match self {
            LayoutNode::Container { children, .. } => {
                for child in children {
                    child.walk(visit);
                }
            }
            LayoutNode::Decorated { inner, .. } => inner.walk(visit),
            LayoutNode::Text(_) | LayoutNode::Image(_) | LayoutNode::Divider { .. } => {}
        }
    }

    /// Indented one-line-per-node dump, used by the CLI and in tests.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match self {
            LayoutNode::Text(block) => {
                let _ = writeln!(out, "{indent}text {:?}", block.text());
            }
            LayoutNode::Image(image) => {
                let _ = writeln!(out, "{indent}image #{} {}", image.id.0, image.url);
            }
            LayoutNode::Divider { width, height, .. } => {
                let dim = |d: &Option<f32>| d.map_or_else(|| "*".to_string(), |v| v.to_string());
                let _ = writeln!(out, "{indent}divider {}x{}", dim(width), dim(height));
            }
            LayoutNode::Container {
                axis,
                spacing,
                children,
            } => {
                let name = match axis {
                    Axis::Vertical => "vstack",
                    Axis::Horizontal => "hstack",
                };
                let _ = writeln!(out, "{indent}{name} spacing={spacing}");
                for child in children {
                    child.write_outline(depth + 1, out);
                }
            }
            LayoutNode::Decorated { inner, decoration } => {
                let Insets {
                    top,
                    right,
                    bottom,
                    left,
                } = decoration.inset;
                let _ = write!(out, "{indent}decorated inset=({top},{right},{bottom},{left})");
                if let Some(background) = decoration.background {
                    let _ = write!(out, " bg={background}");
                }
                if let Some(border) = decoration.border {
                    let _ = write!(out, " border={}@{}", border.width, border.color);
                }
                if let Some(radius) = decoration.corner_radius {
                    let _ = write!(out, " radius={radius}");
                }
                out.push('\n');
                inner.write_outline(depth + 1, out);
            }
        }
    }
}
