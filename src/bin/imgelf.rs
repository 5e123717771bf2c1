use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};
use imgelf::{Color, ColorMode, ImageService, ImgElfError, ServiceConfig};

#[derive(Parser, Debug)]
#[command(name = "imgelf", version)]
struct Cli {
    /// Service config JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the per-axis pixel cap (0 disables it).
    #[arg(long, global = true)]
    max_dimension: Option<u32>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a placeholder image.
    Render(RenderArgs),
    /// Print effective dimension limits as JSON.
    Limits(LimitsArgs),
    /// List supported formats as JSON.
    Formats,
    /// Print the advisory encoded size in bytes.
    Estimate(EstimateArgs),
    /// Validate raw request fields and print the error map as JSON.
    Validate(ValidateArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Width in pixels.
    #[arg(long)]
    width: String,

    /// Height in pixels.
    #[arg(long)]
    height: String,

    /// Output format (png, jpeg, gif, webp, tiff, ico, bmp). Defaults to the configured format.
    #[arg(long, default_value = "")]
    format: String,

    /// Label text (defaults to "<width> x <height>").
    #[arg(long)]
    text: Option<String>,

    /// Do not draw a label.
    #[arg(long)]
    no_text: bool,

    /// Background color (#rrggbb or #rrggbbaa).
    #[arg(long)]
    bg: Option<Color>,

    /// Label color (#rrggbb or #rrggbbaa).
    #[arg(long)]
    fg: Option<Color>,

    /// Canvas color mode (L, RGB, RGBA).
    #[arg(long)]
    mode: Option<ColorMode>,

    /// Output file, or an existing directory to write `_ImgElf.<ext>` into.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct LimitsArgs {
    /// Format name. Defaults to the configured format.
    #[arg(long, default_value = "")]
    format: String,
}

#[derive(Parser, Debug)]
struct EstimateArgs {
    /// Width in pixels.
    #[arg(long)]
    width: u32,

    /// Height in pixels.
    #[arg(long)]
    height: u32,

    /// Format name. Defaults to the configured format.
    #[arg(long, default_value = "")]
    format: String,

    /// Color mode (1, L, P, RGB, RGBA). Defaults to the format's typical depth.
    #[arg(long)]
    mode: Option<ColorMode>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Raw width value.
    #[arg(long, default_value = "")]
    width: String,

    /// Raw height value.
    #[arg(long, default_value = "")]
    height: String,

    /// Raw format name.
    #[arg(long, default_value = "")]
    format: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let service = make_service(cli.config.as_deref(), cli.max_dimension)?;
    match cli.cmd {
        Command::Render(args) => cmd_render(&service, args),
        Command::Limits(args) => cmd_limits(&service, args),
        Command::Formats => cmd_formats(&service),
        Command::Estimate(args) => cmd_estimate(&service, args),
        Command::Validate(args) => cmd_validate(&service, args),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn make_service(config: Option<&Path>, max_dimension: Option<u32>) -> anyhow::Result<ImageService> {
    let mut cfg = match config {
        Some(path) => ServiceConfig::from_path(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(cap) = max_dimension {
        cfg.absolute_max_dimension = (cap > 0).then_some(cap);
    }
    Ok(ImageService::new(cfg)?)
}

fn cmd_render(service: &ImageService, args: RenderArgs) -> anyhow::Result<()> {
    let mut options = service.config().render_options();
    if let Some(text) = args.text {
        options.custom_text = Some(text);
    }
    if args.no_text {
        options.draw_text = false;
    }
    if let Some(bg) = args.bg {
        options.background = bg;
    }
    if let Some(fg) = args.fg {
        options.text_color = fg;
    }
    if let Some(mode) = args.mode {
        options.color_mode = mode;
    }

    let encoded =
        match service.generate_image_with(&args.width, &args.height, &args.format, options) {
            Ok(encoded) => encoded,
            Err(ImgElfError::Validation(errors)) => {
                eprintln!("{}", serde_json::to_string_pretty(&errors)?);
                anyhow::bail!("invalid request: {errors}");
            }
            Err(e) => return Err(e.into()),
        };

    let out = if args.out.is_dir() {
        args.out.join(&encoded.download_name)
    } else {
        args.out
    };
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&out, &encoded.bytes)
        .with_context(|| format!("write image '{}'", out.display()))?;

    eprintln!(
        "wrote {} ({}, {}x{}, {} bytes)",
        out.display(),
        encoded.mime_type,
        encoded.width,
        encoded.height,
        encoded.bytes.len()
    );
    Ok(())
}

fn cmd_limits(service: &ImageService, args: LimitsArgs) -> anyhow::Result<()> {
    let limits = service.config_limits(&args.format)?;
    println!("{}", serde_json::to_string_pretty(&limits)?);
    Ok(())
}

fn cmd_formats(service: &ImageService) -> anyhow::Result<()> {
    let formats = imgelf::variants()
        .map(|v| -> anyhow::Result<serde_json::Value> {
            let native = v.config_limits();
            let effective = service.config_limits(v.name())?;
            Ok(serde_json::json!({
                "name": v.name(),
                "mime_type": v.mime_type(),
                "extension": v.file_extension(),
                "native_limits": native,
                "effective_limits": effective,
            }))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    println!("{}", serde_json::to_string_pretty(&formats)?);
    Ok(())
}

fn cmd_estimate(service: &ImageService, args: EstimateArgs) -> anyhow::Result<()> {
    let bytes = service.estimate_file_size(args.width, args.height, &args.format, args.mode)?;
    println!("{bytes}");
    Ok(())
}

fn cmd_validate(service: &ImageService, args: ValidateArgs) -> anyhow::Result<()> {
    let errors = service.validate(&args.width, &args.height, &args.format);
    println!("{}", serde_json::to_string_pretty(&errors)?);
    if !errors.is_empty() {
        anyhow::bail!("{} invalid field(s)", errors.len());
    }
    Ok(())
}
