mod assets;
mod builder;
mod decorate;
mod element;
mod error;
mod layout;
mod parser;
mod profile;
mod render;
mod style;
mod text;
mod view;

pub use assets::{
    BridgeCallbacks, CachedLoader, FileLoader, Generation, ImageBridge, ImageData,
    ImageLoadedCallback, ImageLoader, ImagesLoadedCallback,
};
pub use builder::{NodeBuilder, PendingImageLoad, Position};
pub use decorate::decorate;
pub use element::{Element, ElementKind, MarkdownDocument};
pub use error::{Error, LoadError, ParseError, Result};
pub use layout::{
    Axis, Decoration, ImageId, ImagePlaceholder, LayoutNode, TextAttributes, TextBlock, TextRun,
};
pub use parser::{CmarkParser, MarkdownParser, ParseOptions};
pub use profile::{BlockFormat, FormattingProfile, RuleStyle};
pub use render::{RenderedDocument, render_document};
pub use style::{BlockStyle, Border, Color, EdgeAccessories, Font, FontWeight, Insets, TextStyle};
pub use text::TextAccumulator;
pub use view::{LinkTappedCallback, MarkdownView};

use url::Url;

/// Options for turning Markdown text into a rendered document.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub parse: ParseOptions,
    /// Base for relative image paths; without one they are skipped
    pub base_url: Option<Url>,
}

/// Parse markdown text into a document.
pub fn parse(markdown: &str) -> Result<MarkdownDocument> {
    Ok(CmarkParser::default().parse(markdown)?)
}

/// Render markdown with the built-in profile.
pub fn render(markdown: &str) -> Result<RenderedDocument> {
    render_with_profile(markdown, &FormattingProfile::compiled_default())
}

/// Render markdown with a custom profile.
pub fn render_with_profile(markdown: &str, profile: &FormattingProfile) -> Result<RenderedDocument> {
    render_with_options(markdown, profile, &RenderOptions::default())
}

pub fn render_with_options(
    markdown: &str,
    profile: &FormattingProfile,
    options: &RenderOptions,
) -> Result<RenderedDocument> {
    let document = CmarkParser::new(options.parse.clone()).parse(markdown)?;
    Ok(render_document(&document, profile, options.base_url.as_ref()))
}
