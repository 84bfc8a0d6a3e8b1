use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use marker_renderer::{MarkerCache, MarkerParams, MarkerService, MarkerSettings};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "markers", version)]
struct Cli {
    /// Settings JSON (media root, media URL, template roots, font).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render (or fetch from cache) a marker and print its URL.
    Render(RenderArgs),
    /// Delete every cached marker.
    Clean(CleanArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Template name, resolved against the configured template roots.
    template: String,

    /// Target hue, 0-360. 0 leaves the template's colours alone.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    hue: i64,

    /// Template opacity, 0-1.
    #[arg(long, default_value_t = 1.0)]
    opacity: f64,

    /// Text drawn over the template.
    #[arg(long, default_value = "")]
    text: String,

    /// Horizontal text offset; centered when omitted.
    #[arg(long, allow_negative_numbers = true)]
    text_x: Option<i32>,

    /// Vertical text offset; centered when omitted.
    #[arg(long, allow_negative_numbers = true)]
    text_y: Option<i32>,

    /// Font size in pixels per em.
    #[arg(long, default_value_t = 10)]
    text_size: u32,

    /// Text colour as six hex digits.
    #[arg(long, default_value = "000000")]
    text_colour: String,

    /// Also copy the PNG to this path.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CleanArgs {
    /// Do not ask for confirmation.
    #[arg(long)]
    noinput: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => MarkerSettings::from_file(path)
            .with_context(|| format!("load settings '{}'", path.display()))?,
        None => MarkerSettings::default(),
    };

    match cli.cmd {
        Command::Render(args) => cmd_render(settings, args),
        Command::Clean(args) => cmd_clean(settings, args),
    }
}

fn cmd_render(settings: MarkerSettings, args: RenderArgs) -> anyhow::Result<()> {
    let service = MarkerService::new(settings).context("initialise marker service")?;
    let params = MarkerParams::new(args.template)
        .with_hue(args.hue)
        .with_opacity(args.opacity)
        .with_text(args.text)
        .with_text_position(args.text_x, args.text_y)
        .with_text_size(args.text_size)
        .with_text_colour(args.text_colour);

    let marker = service.create(&params)?;
    let url = marker.url()?;

    if let Some(out) = args.output {
        let bytes = marker.png_bytes()?;
        std::fs::write(&out, bytes).with_context(|| format!("write '{}'", out.display()))?;
    }

    println!("{url}");
    Ok(())
}

fn cmd_clean(settings: MarkerSettings, args: CleanArgs) -> anyhow::Result<()> {
    let cache = MarkerCache::new(settings.cache_root());
    let dir = cache.markers_dir();

    if !dir.exists() {
        println!("Markers cache directory \"{}\" does not exist.", dir.display());
        return Ok(());
    }

    if !args.noinput && !confirm(&format!("Deleting \"{}\", is that cool? (Y/n) ", dir.display()))? {
        println!("Nothing deleted.");
        return Ok(());
    }

    cache.clear()?;
    println!("Directory \"{}\" removed.", dir.display());
    Ok(())
}

/// An empty answer or `y` counts as yes.
fn confirm(prompt: &str) -> anyhow::Result<bool> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim();
    Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y"))
}
