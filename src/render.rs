use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::builder::{NodeBuilder, PendingImageLoad, Position};
use crate::element::{ElementKind, MarkdownDocument};
use crate::layout::{Axis, ImageId, ImagePlaceholder, LayoutNode};
use crate::profile::FormattingProfile;
use crate::text::TextAccumulator;

/// Result of rendering one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedDocument {
    /// Top-level nodes in source order
    pub nodes: Vec<LayoutNode>,
    /// Images discovered during the walk, all still unloaded
    pub images: Vec<PendingImageLoad>,
    /// Spacing between top-level nodes, from the profile
    pub item_spacing: f32,
}

impl RenderedDocument {
    /// Stack the top-level nodes into a single vertical container.
    pub fn into_root(self) -> LayoutNode {
        LayoutNode::Container {
            axis: Axis::Vertical,
            spacing: self.item_spacing,
            children: self.nodes,
        }
    }

    pub fn placeholder(&self, id: ImageId) -> Option<&ImagePlaceholder> {
        let mut found = None;
        for node in &self.nodes {
            node.walk(&mut |node| {
                if let LayoutNode::Image(image) = node {
                    if image.id == id {
                        found = Some(image);
                    }
                }
            });
        }
        found
    }

    pub fn outline(&self) -> String {
        self.nodes.iter().map(LayoutNode::outline).collect()
    }
}

/// Walk the top-level elements of `document` and collect their nodes.
///
/// Top-level raw HTML goes straight into the text buffer as unstyled text.
pub fn render_document(
    document: &MarkdownDocument,
    profile: &FormattingProfile,
    base_url: Option<&Url>,
) -> RenderedDocument {
    let mut builder = NodeBuilder::new(document, profile).with_base_url(base_url);
    let mut text = TextAccumulator::new();
    let mut nodes = Vec::new();

    for (index, element) in document.elements().iter().enumerate() {
        if element.kind == ElementKind::Html {
            text.append(document.text(element), None);
            continue;
        }
        if let Some(node) = builder.build(element, Position::top_level(index), None, &mut text, 0) {
            text.flush_into(&mut nodes);
            nodes.push(node);
        }
    }
    text.flush_into(&mut nodes);

    let images = builder.into_images();
    debug!(nodes = nodes.len(), images = images.len(), "rendered document");
    RenderedDocument {
        nodes,
        images,
        item_spacing: profile.item_spacing,
    }
}
