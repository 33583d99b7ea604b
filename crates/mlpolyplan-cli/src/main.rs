use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use mlpolyplan_core::{BuildPlan, ConfigManager, MakefileDocument, PlanConfig};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

#[derive(Parser)]
#[command(name = "mlpolyplan")]
#[command(
    about = "Generate a Makefile that computes all maximal-length LFSR polynomials of an order in parallel",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Polynomial order
    #[arg(required_unless_present = "print_default_config")]
    order: Option<u32>,

    /// Split depth (number of keyspace bits); chosen from the order when omitted
    segments_order: Option<u32>,

    /// Split bits resolved per merge level
    #[arg(long)]
    incr_per_level: Option<u32>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "MLPOLYPLAN_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "makefile")]
    format: OutputFormat,

    /// Write each target to a temporary file and rename it on success
    #[arg(long)]
    atomic: bool,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Makefile,
    Json,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.print_default_config {
        let toml = ConfigManager::default_toml()?;
        return emit(cli.output.as_deref(), toml.as_bytes());
    }

    let log_filter = init_tracing(cli.verbose);
    let manager =
        ConfigManager::load(cli.config.as_deref()).context("Failed to load configuration")?;
    log_filter
        .reload(level_filter(&manager.config().logging.level, cli.verbose))
        .context("Failed to apply configured log level")?;
    if let Some(path) = manager.config_path() {
        debug!("using config file {}", path.display());
    }

    let invocation = std::env::args().collect::<Vec<_>>().join(" ");
    let bytes = render(cli, manager.config().clone(), &invocation)?;
    emit(cli.output.as_deref(), &bytes)
}

/// Applies command-line overrides to `config` and builds the plan.
fn plan_for(cli: &Cli, config: &PlanConfig) -> Result<BuildPlan> {
    let order = cli.order.context("order is required")?;
    let params = config
        .policy
        .resolve(order, cli.segments_order, cli.incr_per_level)
        .context("Invalid split parameters")?;
    info!(%params, "planning");

    BuildPlan::with_files_dir(params, &config.recipes.files_dir)
        .context("Failed to build rule graph")
}

fn render(cli: &Cli, mut config: PlanConfig, invocation: &str) -> Result<Vec<u8>> {
    if cli.atomic {
        config.recipes.atomic_writes = true;
    }
    let plan = plan_for(cli, &config)?;

    let bytes = match cli.format {
        OutputFormat::Makefile => MakefileDocument::new(&plan, &config.recipes, invocation)
            .to_string()
            .into_bytes(),
        OutputFormat::Json => {
            let mut json = serde_json::to_vec_pretty(&plan)?;
            json.push(b'\n');
            json
        }
    };
    Ok(bytes)
}

/// Installs the stderr subscriber before configuration is read so loading is
/// logged too; the returned handle swaps in the configured level afterwards.
fn init_tracing(verbose: bool) -> reload::Handle<EnvFilter, Registry> {
    let initial = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let (filter, handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
    handle
}

/// Logs go to stderr so stdout stays a usable makefile.
fn level_filter(level: &str, verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Writes to `path` through a sibling temp file, or to stdout.
fn emit(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            let mut tmp = path.as_os_str().to_owned();
            tmp.push(".tmp");
            let tmp = PathBuf::from(tmp);
            fs::write(&tmp, bytes)
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
            fs::rename(&tmp, path)
                .with_context(|| format!("Failed to move output to {}", path.display()))?;
            info!("wrote {}", path.display());
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(bytes)?;
            out.flush()?;
            Ok(())
        }
    }
}
