use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use coverage_editor::stats::{PlanOutcome, PlanStats};
use coverage_editor::widget::{preload_session, CanvasWidget};
use coverage_editor::{Editor, EditorConfig};

const DEFAULT_SESSION: &str = "coverage-session.json";

#[derive(Parser, Debug)]
#[command(
    name = "coverage-editor",
    version,
    about = "Draw coverage boundaries and obstacles, then plan and replay a path"
)]
struct Cli {
    /// JSON file with editor settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Playback speed multiplier
    #[arg(long, global = true)]
    speed: Option<f64>,

    /// Distance between coverage stripes, in world units
    #[arg(long, global = true)]
    spacing: Option<f64>,

    /// Cell size used to estimate the obstacle union area
    #[arg(long, global = true)]
    cell_size: Option<f64>,

    /// Write logs to this file (the interactive editor owns the terminal)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the interactive terminal editor
    Edit {
        /// Session file used by the save and load keys
        #[arg(long, default_value = DEFAULT_SESSION)]
        session: PathBuf,
    },
    /// Print statistics for a saved session
    Stats { file: PathBuf },
    /// Generate a path for a saved session and write it back
    Plan {
        file: PathBuf,
        /// Where to write the planned session; defaults to FILE
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
        }
        None if !interactive => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
        }
        None => {}
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<EditorConfig> {
    let mut config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if let Some(speed) = cli.speed {
        config.playback_speed = speed;
    }
    if let Some(spacing) = cli.spacing {
        config.stripe_spacing = spacing;
    }
    if let Some(cell_size) = cli.cell_size {
        config.union_cell_size = cell_size;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    let command = cli.command.take().unwrap_or_else(|| Command::Edit {
        session: PathBuf::from(DEFAULT_SESSION),
    });

    let interactive = matches!(command, Command::Edit { .. });
    init_tracing(cli.log_file.as_deref(), interactive)?;
    let config = load_config(&cli)?;

    match command {
        Command::Edit { session } => edit_command(config, session),
        Command::Stats { file } => stats_command(config, &file),
        Command::Plan { file, output } => {
            let output = output.unwrap_or_else(|| file.clone());
            plan_command(config, &file, &output)
        }
    }
}

fn edit_command(config: EditorConfig, session: PathBuf) -> Result<()> {
    let mut editor = Editor::new(config);
    preload_session(&mut editor, &session)?;
    let editor = CanvasWidget::new(editor, session).run()?;
    info!(obstacles = editor.obstacles().len(), "editor session ended");
    Ok(())
}

fn stats_command(config: EditorConfig, file: &Path) -> Result<()> {
    let mut editor = Editor::new(config);
    editor
        .load_session(file)
        .with_context(|| format!("failed to load session {}", file.display()))?;
    print_stats(&editor, editor.stats());
    Ok(())
}

fn plan_command(config: EditorConfig, file: &Path, output: &Path) -> Result<()> {
    let mut editor = Editor::new(config);
    editor
        .load_session(file)
        .with_context(|| format!("failed to load session {}", file.display()))?;

    match editor
        .generate_path()
        .context("failed to generate a coverage path")?
    {
        PlanOutcome::Generated { waypoints } => println!("Generated {waypoints} waypoint(s)"),
        PlanOutcome::Empty => println!("No coverage pattern fits the boundary"),
    }

    editor
        .save_session(output)
        .with_context(|| format!("failed to write session {}", output.display()))?;
    print_stats(&editor, editor.stats());
    println!("Wrote {}", output.display());
    Ok(())
}

fn print_stats(editor: &Editor, stats: &PlanStats) {
    println!("Boundary:        {}", if editor.boundary().is_some() { "yes" } else { "no" });
    println!("Obstacles:       {}", editor.obstacles().len());
    println!("Waypoints:       {}", editor.path().len());
    println!("Path length:     {:.2} m", stats.path_length_m);
    println!("Coverage area:   {:.2} m²", stats.coverage_area_m2);
    println!("Obstacles area:  {:.2} m²", stats.obstacles_area_m2);
    println!("Useful area:     {:.2} m²", stats.useful_area_m2);
    println!("Efficiency:      {:.2}", stats.efficiency);
    println!("Estimated time:  {}", stats.eta_label());
}
