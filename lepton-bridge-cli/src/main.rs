mod prompt;
mod report;
mod viewer;

use clap::{Parser, Subcommand};
use lepton_bridge_core::jvm::JvmRuntime;
use lepton_bridge_core::{
    exit_code, format_fatal, run_with_runtime, BridgeConfig, BridgeError, EngineMode, EventCard,
    EventResult, RunPlan,
};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lepton-bridge")]
#[command(about = "Drive the JULIeT lepton propagation engine from native code", long_about = None)]
struct Cli {
    /// Log every call made into the engine
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run events and print what the engine reports
    Run {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Use the default engine and prompt for the particle and axis
        #[arg(short, long)]
        interactive: bool,
        /// Events to run on the configured geometry
        #[arg(short = 'n', long, default_value_t = 1)]
        events: usize,
        /// Also write all results to this file as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Run one scripted event and plot it
    View {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

enum CliError {
    Bridge(BridgeError),
    Io(io::Error),
    Viewer(String),
}

impl From<BridgeError> for CliError {
    fn from(err: BridgeError) -> Self {
        CliError::Bridge(err)
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::Io(err)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Bridge(err) => f.write_str(&format_fatal(err)),
            CliError::Io(err) => write!(f, "fatal i/o error: {err}"),
            CliError::Viewer(msg) => write!(f, "fatal viewer error: {msg}"),
        }
    }
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Bridge(err) => exit_code(err),
            CliError::Io(_) | CliError::Viewer(_) => 1,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Commands::Run {
            config,
            interactive,
            events,
            json,
        } => run(config.as_deref(), interactive, events, json.as_deref()),
        Commands::View { config } => view(config.as_deref()),
    };

    if let Err(e) = outcome {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}

/// Logs go to stderr; stdout carries the results.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig, BridgeError> {
    match path {
        Some(path) => {
            let config = BridgeConfig::load(path)?;
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(BridgeConfig::default()),
    }
}

fn execute(config: &BridgeConfig, plan: &RunPlan) -> Result<Vec<EventResult>, BridgeError> {
    let runtime = JvmRuntime::create(&config.runtime)?;
    run_with_runtime(runtime, plan)
}

fn run(
    config: Option<&Path>,
    interactive: bool,
    events: usize,
    json: Option<&Path>,
) -> Result<(), CliError> {
    let config = load_config(config)?;

    let mut plan = if interactive {
        let stdin = io::stdin();
        let card = EventCard {
            geometry_shift: config.event.geometry_shift,
            start_location_cm: config.event.start_location_cm,
            ..prompt::read_event_card(&mut stdin.lock(), &mut io::stdout())?
        };
        RunPlan::new(EngineMode::Default, card)
    } else {
        RunPlan::new(
            EngineMode::Parametrized(config.engine.clone()),
            config.event.clone(),
        )
    };
    plan.events = events;

    let results = execute(&config, &plan)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (n, result) in results.iter().enumerate() {
        report::write_event(&mut out, n + 1, result)?;
    }

    if let Some(path) = json {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, &results).map_err(io::Error::from)?;
        info!(path = %path.display(), events = results.len(), "results written");
    }
    Ok(())
}

fn view(config: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config)?;
    let plan = RunPlan::new(
        EngineMode::Parametrized(config.engine.clone()),
        config.event.clone(),
    );
    let results = execute(&config, &plan)?;
    viewer::show(results).map_err(|e| CliError::Viewer(e.to_string()))
}
