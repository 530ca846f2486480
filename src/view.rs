//! Stateful front end tying rendering, image loading and link taps together.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::assets::{
    BridgeCallbacks, Generation, ImageBridge, ImageData, ImageLoadedCallback, ImageLoader,
    ImagesLoadedCallback,
};
use crate::builder::PendingImageLoad;
use crate::error::Result;
use crate::layout::{ImageId, LayoutNode, TextBlock};
use crate::profile::FormattingProfile;
use crate::render::RenderedDocument;
use crate::{RenderOptions, render_with_options};

pub type LinkTappedCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Owns a Markdown source and its current rendering.
///
/// Changing the markdown or profile re-renders immediately. Image loads from a
/// previous rendering, or started through a replaced loader, stop reporting.
pub struct MarkdownView {
    markdown: String,
    profile: FormattingProfile,
    options: RenderOptions,
    rendered: RenderedDocument,
    bridge: Option<ImageBridge>,
    // Shared by every bridge this view creates
    generation: Arc<AtomicU64>,
    loads: LoadState,
    pub on_image_loaded: Option<ImageLoadedCallback>,
    pub on_images_loaded: Option<ImagesLoadedCallback>,
    pub on_link_tapped: Option<LinkTappedCallback>,
}

/// Image progress of the current rendering, written by the load callbacks.
struct LoadState {
    loaded: Arc<Vec<AtomicBool>>,
    complete: Arc<AtomicBool>,
    dispatched: Option<Generation>,
}

impl LoadState {
    fn new(rendered: &RenderedDocument) -> Self {
        Self {
            loaded: Arc::new(rendered.images.iter().map(|_| AtomicBool::new(false)).collect()),
            complete: Arc::new(AtomicBool::new(false)),
            dispatched: None,
        }
    }
}

impl MarkdownView {
    /// Render `markdown` with the built-in profile.
    pub fn new(markdown: impl Into<String>) -> Result<Self> {
        Self::with_profile(markdown, FormattingProfile::compiled_default())
    }

    pub fn with_profile(markdown: impl Into<String>, profile: FormattingProfile) -> Result<Self> {
        Self::with_options(markdown, profile, RenderOptions::default())
    }

    pub fn with_options(
        markdown: impl Into<String>,
        profile: FormattingProfile,
        options: RenderOptions,
    ) -> Result<Self> {
        let markdown = markdown.into();
        let rendered = render_with_options(&markdown, &profile, &options)?;
        Ok(Self {
            markdown,
            profile,
            options,
            loads: LoadState::new(&rendered),
            rendered,
            bridge: None,
            generation: Arc::new(AtomicU64::new(0)),
            on_image_loaded: None,
            on_images_loaded: None,
            on_link_tapped: None,
        })
    }

    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    pub fn profile(&self) -> &FormattingProfile {
        &self.profile
    }

    pub fn rendered(&self) -> &RenderedDocument {
        &self.rendered
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.rendered.nodes
    }

    /// Image records of the current rendering with their current `loaded` flags.
    pub fn images(&self) -> Vec<PendingImageLoad> {
        self.rendered
            .images
            .iter()
            .zip(self.loads.loaded.iter())
            .map(|(image, loaded)| PendingImageLoad {
                loaded: loaded.load(Ordering::Acquire),
                ..image.clone()
            })
            .collect()
    }

    /// Whether every image of the current rendering has completed.
    pub fn images_loaded(&self) -> bool {
        self.loads.complete.load(Ordering::Acquire)
    }

    /// Replace the markdown and re-render. On failure the previous rendering
    /// and markdown are kept.
    pub fn set_markdown(&mut self, markdown: impl Into<String>) -> Result<()> {
        let markdown = markdown.into();
        let rendered = render_with_options(&markdown, &self.profile, &self.options)?;
        self.markdown = markdown;
        self.replace_rendered(rendered);
        Ok(())
    }

    pub fn set_profile(&mut self, profile: FormattingProfile) -> Result<()> {
        let rendered = render_with_options(&self.markdown, &profile, &self.options)?;
        self.profile = profile;
        self.replace_rendered(rendered);
        Ok(())
    }

    /// Use `loader` for later loads. Loads started through the previous loader
    /// stop reporting; images they already completed stay loaded.
    pub fn set_image_loader(&mut self, loader: Arc<dyn ImageLoader>) {
        let bridge = ImageBridge::with_generation(loader, Arc::clone(&self.generation));
        let generation = bridge.invalidate();
        debug!(generation = generation.0, "image loader replaced");
        self.bridge = Some(bridge);
    }

    /// Fetch the images of the current rendering that are not loaded yet.
    ///
    /// Returns `None` when no image loader is set, or when a load for this
    /// rendering and loader was already started or has finished. Must be called
    /// from within a tokio runtime.
    pub fn load_images(&mut self) -> Option<JoinHandle<Vec<PendingImageLoad>>> {
        let bridge = self.bridge.clone()?;
        let generation = bridge.generation();
        if self.loads.dispatched == Some(generation) || self.images_loaded() {
            debug!(generation = generation.0, "images already requested");
            return None;
        }
        self.loads.dispatched = Some(generation);

        let loaded = Arc::clone(&self.loads.loaded);
        let on_image_loaded = self.on_image_loaded.clone();
        let complete = Arc::clone(&self.loads.complete);
        let on_images_loaded = self.on_images_loaded.clone();
        let callbacks = BridgeCallbacks {
            on_image_loaded: Some(Arc::new(move |id: ImageId, data: Option<&ImageData>| {
                if let Some(flag) = loaded.get(id.0) {
                    flag.store(true, Ordering::Release);
                }
                if let Some(on_image_loaded) = &on_image_loaded {
                    on_image_loaded(id, data);
                }
            })),
            on_images_loaded: Some(Arc::new(move || {
                complete.store(true, Ordering::Release);
                if let Some(on_images_loaded) = &on_images_loaded {
                    on_images_loaded();
                }
            })),
        };
        Some(bridge.dispatch(self.images(), callbacks))
    }

    fn replace_rendered(&mut self, rendered: RenderedDocument) {
        let generation = Generation(self.generation.fetch_add(1, Ordering::AcqRel) + 1);
        debug!(generation = generation.0, "document replaced");
        self.loads = LoadState::new(&rendered);
        self.rendered = rendered;
    }

    /// Report the link under byte `offset` of `block` to `on_link_tapped`.
    ///
    /// Returns whether a link was there. Nothing is opened.
    pub fn activate_link(&self, block: &TextBlock, offset: usize) -> bool {
        let Some(link) = block.link_at(offset) else {
            return false;
        };
        info!(link, "link activated");
        if let Some(on_link_tapped) = &self.on_link_tapped {
            on_link_tapped(link);
        }
        true
    }
}
