use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use region_box::io::{
    default_sidecar_for, ensure_parent_dir, load_image, read_document, save_image, write_json_pretty,
};
use region_box::{
    crop, reinsert, resize, scale_for_preview, Config, FallbackMode, ImageTensor, RegionSelector,
    ResizeTarget,
};

#[derive(Parser, Debug)]
#[command(
    name = "region-box",
    version,
    about = "Select, crop, resize and reinsert rectangular image regions"
)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[allow(clippy::enum_variant_names)]
enum Commands {
    /// Print supported commands in JSON
    Commands,
    /// Emit the region document for an image, optionally rendering its outline
    Select(SelectArgs),
    /// Crop an image to the region described by a region document
    Crop(CropArgs),
    /// Resize a cropped region for generation and emit resize metadata
    Resize(ResizeArgs),
    /// Paste a generated image back into the original at the region
    Reinsert(ReinsertArgs),
    /// Downscale a large image for interactive selection
    Preview(PreviewArgs),
}

#[derive(Args, Debug)]
struct SelectArgs {
    /// Input image path
    #[arg(long)]
    input: PathBuf,
    /// Region document: inline JSON, file path, or - for stdin
    #[arg(long, default_value = "")]
    metadata: String,
    /// Write the image with the region outlined to this path
    #[arg(long)]
    overlay_out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CropArgs {
    /// Input image path
    #[arg(long)]
    input: PathBuf,
    /// Region document: inline JSON, file path, or - for stdin
    #[arg(long, default_value = "{}")]
    region: String,
    /// Behavior when no valid region is available
    #[arg(long, value_enum, default_value_t = FallbackMode::UseFullImage)]
    fallback: FallbackMode,
    /// Output image path
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct ResizeArgs {
    /// Input image path (usually a crop)
    #[arg(long)]
    input: PathBuf,
    /// Target width in pixels (requires --height)
    #[arg(long, requires = "height", conflicts_with = "scale")]
    width: Option<u32>,
    /// Target height in pixels (requires --width)
    #[arg(long, requires = "width", conflicts_with = "scale")]
    height: Option<u32>,
    /// Uniform scale factor
    #[arg(long)]
    scale: Option<f64>,
    /// Output image path
    #[arg(long)]
    out: PathBuf,
    /// Resize metadata path (default: <out>.json)
    #[arg(long)]
    meta_out: Option<PathBuf>,
    /// Do not write the resize metadata file
    #[arg(long, action = ArgAction::SetTrue)]
    no_meta: bool,
}

#[derive(Args, Debug)]
struct ReinsertArgs {
    /// Original full-size image
    #[arg(long)]
    original: PathBuf,
    /// Generated image to paste back
    #[arg(long)]
    generated: PathBuf,
    /// Region document the crop was made from
    #[arg(long = "box")]
    box_metadata: String,
    /// Resize document; empty means the generated image is pasted as-is
    #[arg(long = "resize", default_value = "")]
    resize_metadata: String,
    /// Output image path
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Source image path
    #[arg(long)]
    input: PathBuf,
    /// Longest preview side (default: REGION_BOX_PREVIEW_MAX or 1024)
    #[arg(long)]
    max_size: Option<u32>,
    /// Directory for scaled previews (default: <out root>/preview)
    #[arg(long)]
    temp_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("{}", failure_line(&err));
        std::process::exit(1);
    }
}

fn failure_line(err: &anyhow::Error) -> String {
    format!("error: {err:#}")
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("region_box={level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env();

    match cli.command {
        Commands::Commands => print_commands(),
        Commands::Select(args) => command_select(args),
        Commands::Crop(args) => command_crop(args),
        Commands::Resize(args) => command_resize(args),
        Commands::Reinsert(args) => command_reinsert(args),
        Commands::Preview(args) => command_preview(args, &config),
    }
}

fn print_commands() -> Result<()> {
    let rows = vec![
        json!({
            "name": "select",
            "description": "Adopt or replay a region document and optionally outline it.",
            "inputs": ["image", "box_metadata"],
            "outputs": ["box_metadata"]
        }),
        json!({
            "name": "crop",
            "description": "Crop an image to a region with a fallback policy.",
            "inputs": ["image", "region_metadata", "fallback_mode"],
            "outputs": ["cropped_image"]
        }),
        json!({
            "name": "resize",
            "description": "Resize a crop for generation and record the scale.",
            "inputs": ["image", "size|scale"],
            "outputs": ["image", "resize_metadata"]
        }),
        json!({
            "name": "reinsert",
            "description": "Undo the resize and paste the generated image back.",
            "inputs": ["original_image", "generated_image", "box_metadata", "resize_metadata"],
            "outputs": ["image"]
        }),
        json!({
            "name": "preview",
            "description": "Downscale large images for interactive selection.",
            "inputs": ["image", "max_size"],
            "outputs": ["scaled", "path", "scale"]
        }),
    ];

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "commands": rows }))?
    );
    Ok(())
}

fn command_select(args: SelectArgs) -> Result<()> {
    let image = open_input(&args.input)?;
    let incoming = read_document(&args.metadata).context("failed to read region metadata")?;

    let mut selector = RegionSelector::new();
    let (image, metadata) = selector.update(image, &incoming);

    let mut overlay_path = None;
    if let Some(path) = &args.overlay_out {
        match selector.render_overlay(&image)? {
            Some(canvas) => {
                ensure_parent_dir(path)?;
                canvas
                    .save(path)
                    .with_context(|| format!("failed to save overlay: {}", path.display()))?;
                overlay_path = Some(abs_path(path).display().to_string());
            }
            None => warn!("no region selected, overlay not written"),
        }
    }

    let parsed: Value = serde_json::from_str(&metadata).unwrap_or(Value::String(metadata));
    println!(
        "{}",
        serde_json::to_string(&json!({
            "box_metadata": parsed,
            "overlay": overlay_path,
            "size": {"width": image.width(), "height": image.height()},
        }))?
    );
    Ok(())
}

fn command_crop(args: CropArgs) -> Result<()> {
    let image = open_input(&args.input)?;
    let region = read_document(&args.region).context("failed to read region metadata")?;

    let cropped = crop(&image, &region, args.fallback)?;
    save_image(&cropped, &args.out)
        .with_context(|| format!("failed to save cropped image: {}", args.out.display()))?;

    println!(
        "{}",
        serde_json::to_string(&json!({
            "output_path": abs_path(&args.out).display().to_string(),
            "fallback_mode": args.fallback.as_str(),
            "size": {"width": cropped.width(), "height": cropped.height()},
        }))?
    );
    Ok(())
}

fn command_resize(args: ResizeArgs) -> Result<()> {
    let target = match (args.width, args.height, args.scale) {
        (Some(width), Some(height), None) => ResizeTarget::Exact { width, height },
        (None, None, Some(scale)) => ResizeTarget::Scale(scale),
        _ => bail!("pass either --width and --height, or --scale"),
    };

    let image = open_input(&args.input)?;
    let (resized, record) = resize(&image, target)?;
    save_image(&resized, &args.out)
        .with_context(|| format!("failed to save resized image: {}", args.out.display()))?;

    let mut meta_path = None;
    if !args.no_meta {
        let path = args
            .meta_out
            .clone()
            .unwrap_or_else(|| default_sidecar_for(&args.out));
        let mut payload = serde_json::to_value(&record)?;
        if let Value::Object(fields) = &mut payload {
            fields.insert("generated_at".to_string(), json!(timestamp_iso()));
        }
        write_json_pretty(&path, &payload)
            .with_context(|| format!("failed to write resize metadata: {}", path.display()))?;
        meta_path = Some(abs_path(&path).display().to_string());
    }

    println!(
        "{}",
        serde_json::to_string(&json!({
            "output_path": abs_path(&args.out).display().to_string(),
            "meta_path": meta_path,
            "resize_metadata": record,
        }))?
    );
    Ok(())
}

fn command_reinsert(args: ReinsertArgs) -> Result<()> {
    let original = open_input(&args.original)?;
    let generated = open_input(&args.generated)?;
    let box_metadata = read_document(&args.box_metadata).context("failed to read box metadata")?;
    let resize_metadata =
        read_document(&args.resize_metadata).context("failed to read resize metadata")?;

    let composed = reinsert(&original, &generated, &box_metadata, &resize_metadata)?;
    save_image(&composed, &args.out)
        .with_context(|| format!("failed to save output image: {}", args.out.display()))?;

    println!("{}", abs_path(&args.out).display());
    Ok(())
}

fn command_preview(args: PreviewArgs, config: &Config) -> Result<()> {
    let max_size = args.max_size.unwrap_or(config.preview_max);
    let temp_dir = args.temp_dir.unwrap_or_else(|| config.preview_dir());

    let result = scale_for_preview(&args.input, max_size, &temp_dir)?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

fn open_input(path: &Path) -> Result<ImageTensor> {
    if !path.exists() {
        bail!("input not found: {}", path.display());
    }
    load_image(path).with_context(|| format!("failed to open input image: {}", path.display()))
}

fn abs_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

fn timestamp_iso() -> String {
    Utc::now().to_rfc3339()
}
