use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use posterforge::moderation::ModerationEngine;
use posterforge::rendering::compose::{Compositor, OutputFormat, RenderOptions};
use posterforge::{EventType, RuntimeSettings};

/// Compose a campaign poster: moderate the text, draw it over the background
/// and write the result to disk.
#[derive(Parser, Debug)]
#[command(name = "posterforge", version, about)]
struct Args {
    /// Background image (path or URL)
    #[arg(short, long)]
    background: String,

    /// Poster text; screened against the banned-term tiers before drawing
    #[arg(short, long, default_value = "")]
    text: String,

    /// Event theme: cheer or award_speech
    #[arg(short, long, default_value = "cheer")]
    event_type: String,

    /// Output file
    #[arg(short, long, default_value = "poster.png")]
    output: PathBuf,

    /// Font file used for text drawing
    #[arg(long)]
    font: Option<PathBuf>,

    /// Encode as JPEG tuned for message-size limits instead of PNG
    #[arg(long)]
    jpeg: bool,

    /// Maximum text length in characters
    #[arg(long, default_value_t = 50)]
    max_length: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let event_type = EventType::parse_or_default(&args.event_type);

    let engine = ModerationEngine::new();
    let length = engine.check_length(&args.text, args.max_length);
    if !length.is_valid {
        anyhow::bail!(
            "text is too long: {} characters (maximum {})",
            length.current_length,
            length.max_length
        );
    }

    let report = engine.validate(&args.text);
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    let settings = RuntimeSettings {
        font_path: args.font.clone(),
        ..Default::default()
    };
    let options = RenderOptions {
        format: if args.jpeg {
            OutputFormat::message_optimized()
        } else {
            OutputFormat::Png
        },
        ..Default::default()
    };

    let compositor = Compositor::new(&settings);
    let blob = compositor
        .compose(&args.background, &report.filtered_text, event_type, options)
        .await
        .context("failed to compose poster")?;

    std::fs::write(&args.output, blob.bytes())
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "wrote {} ({} bytes, {})",
        args.output.display(),
        blob.len(),
        blob.mime_type()
    );
    Ok(())
}
