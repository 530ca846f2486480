use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use mdview::{
    BridgeCallbacks, CachedLoader, FileLoader, FormattingProfile, ImageBridge, ImageData, ImageId,
    ParseOptions, PendingImageLoad, RenderOptions,
};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Indented node tree
    Outline,
    /// Rendered document as JSON
    Json,
}

#[derive(Parser)]
#[command(name = "mdview")]
#[command(about = "Render Markdown files into a layout tree")]
struct Cli {
    /// Input Markdown file
    input: PathBuf,

    /// Formatting profile (TOML); the built-in profile is used otherwise
    #[arg(short, long)]
    profile: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "outline")]
    format: Format,

    /// Read referenced local images and report each completion
    #[arg(long)]
    load_images: bool,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let markdown = match fs::read_to_string(&cli.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {}", cli.input.display(), e);
            std::process::exit(1);
        }
    };

    let profile = match &cli.profile {
        Some(path) => match FormattingProfile::load(path) {
            Ok(profile) => profile,
            Err(e) => {
                eprintln!("Error loading profile {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FormattingProfile::compiled_default(),
    };

    let options = RenderOptions {
        parse: ParseOptions::default(),
        base_url: base_url(&cli.input),
    };
    let rendered = match mdview::render_with_options(&markdown, &profile, &options) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.format {
        Format::Outline => print!("{}", rendered.outline()),
        Format::Json => match serde_json::to_string_pretty(&rendered) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                std::process::exit(1);
            }
        },
    }

    if cli.load_images {
        load_images(rendered.images).await;
    }
}

/// Directory of the input file, so relative image paths resolve next to it.
fn base_url(input: &Path) -> Option<Url> {
    let path = fs::canonicalize(input).ok()?;
    Url::from_directory_path(path.parent()?).ok()
}

async fn load_images(images: Vec<PendingImageLoad>) {
    let bridge = ImageBridge::new(Arc::new(CachedLoader::new(FileLoader)));
    let callbacks = BridgeCallbacks {
        on_image_loaded: Some(Arc::new(|id: ImageId, data: Option<&ImageData>| {
            match data {
                Some(data) => println!("image #{}: {} bytes from {}", id.0, data.bytes.len(), data.url),
                None => println!("image #{}: failed", id.0),
            }
        })),
        on_images_loaded: Some(Arc::new(|| println!("all images loaded"))),
    };

    if let Err(e) = bridge.dispatch(images, callbacks).await {
        eprintln!("Error: image loading stopped: {}", e);
        std::process::exit(1);
    }
}
