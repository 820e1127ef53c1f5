//! streamgrid CLI — displays a grid of RTSP camera streams on the attached
//! display and keeps it running.

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use streamgrid_core::check::{require_executables, required_executables};
use streamgrid_core::types::config::{default_config_path, StreamConfig};
use streamgrid_core::{DispmanxProbe, Operation, ReconcileError, Reconciler, ScreenRegistry};
use tracing_subscriber::EnvFilter;


#[derive(Parser, Debug)]
#[command(name = "streamgrid")]
#[command(about = "Displays a grid of RTSP streams from IP cameras on the attached display")]
struct Cli {
    /// Action to take
    #[arg(value_enum)]
    action: ActionArg,

    /// Assembles and prints commands without executing them
    #[arg(long)]
    dry: bool,

    /// Configuration file (default: ~/.ip_cam_viewer_cfg.json)
    #[arg(long, env = "STREAMGRID_CONFIG")]
    config: Option<PathBuf>,
}


#[derive(Clone, Copy, Debug, ValueEnum)]
enum ActionArg {
    /// Start streams, skipping any that are already running
    Start,
    /// Stop all streams
    Stop,
    /// Stop all streams, then start them anew
    Restart,
    /// Restart streams that are missing from the display
    Repair,
}

impl From<ActionArg> for Operation {
    fn from(arg: ActionArg) -> Operation {
        match arg {
            ActionArg::Start => Operation::Start,
            ActionArg::Stop => Operation::Stop,
            ActionArg::Restart => Operation::Restart,
            ActionArg::Repair => Operation::Repair,
        }
    }
}


fn main() {
    let cli = Cli::parse();
    init_logging();

    println!("{}", chrono::Local::now().format("%a %Y-%m-%d %I:%M:%S %p"));
    println!();

    if let Err(e) = run(cli) {
        eprintln!("streamgrid: {}", e);
        process::exit(1);
    }
}


fn run(cli: Cli) -> Result<(), ReconcileError> {
    let op = Operation::from(cli.action);
    println!("Parsing arguments...");
    println!("   * action: {}", op);
    println!("   * dry: {}", cli.dry);
    println!();

    let config_path = resolve_config_path(cli.config)?;
    println!("Parsing configuration file '{}'...", config_path.display());
    let config = StreamConfig::load(&config_path)?;
    let streams = config.streams().to_vec();
    println!("Parsed {} streams from configuration file:", streams.len());
    for stream in &streams {
        let transport = stream.transport.as_str().to_uppercase();
        println!("   * {}: {} ({})", stream.name, stream.uri, transport);
    }
    println!();

    let mut settings = config.settings;
    settings.dry_run = cli.dry;
    require_executables(required_executables(&settings, op))?;

    let registry = ScreenRegistry::new(&settings);
    let probe = DispmanxProbe::new(&settings);
    let mut reconciler = Reconciler::new(settings, streams, registry, probe);

    let result = reconciler.execute(op);
    for action in reconciler.drain_actions() {
        println!("{}", action);
    }
    println!();
    result?;

    println!("Done.");
    Ok(())
}


fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf, ReconcileError> {
    match explicit {
        Some(path) => Ok(path),
        None => default_config_path().ok_or_else(|| {
            ReconcileError::InvalidConfiguration(
                "no home directory; pass --config <path>".into(),
            )
        }),
    }
}


/// Log to stderr so stdout carries only the execution log.
fn init_logging() {
    let filter = std::env::var("STREAMGRID_LOG")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
