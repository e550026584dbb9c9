//! vpcsynth - VPC topology to CloudFormation synthesizer
//!
//! This is the main entry point for the vpcsynth CLI.

mod cli;

use anyhow::Result;
use cli::commands::{CommandContext, Runnable};
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vpcsynth::config::Config;

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Configuration comes first so its log level can seed the filter. An
    // explicit --config must load; searched files fall back to defaults.
    let loaded = Config::load(cli.config.as_ref());
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(e) if cli.config.is_some() => {
            eprintln!("ERROR: {}", e);
            std::process::exit(e.exit_code());
        }
        Err(_) => Config::default(),
    };

    let json_logs = matches!(cli.output, cli::OutputFormat::Json);
    init_logging(cli.verbosity(), config.log_level(), json_logs);

    if let Err(e) = &loaded {
        tracing::warn!("Failed to load config: {}", e);
    }

    if cli.verbosity() >= 2 {
        eprintln!("vpcsynth v{}", VERSION);
    }

    // Create command context
    let mut ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let result = match &cli.command {
        Commands::Synth(args) => args.run(&mut ctx).await,
        Commands::Validate(args) => args.run(&mut ctx).await,
        Commands::Graph(args) => args.run(&mut ctx).await,
        Commands::List(args) => args.run(&mut ctx).await,
        Commands::Diff(args) => args.run(&mut ctx).await,
        Commands::Init(args) => args.run(&mut ctx).await,
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => {
            ctx.output.error(&format!("{:#}", err));
            if let Some(issues) = err.downcast_ref::<vpcsynth::Error>().map(|e| e.issues()) {
                ctx.output.issues(issues, &[]);
            }
            err.downcast_ref::<vpcsynth::Error>()
                .map(vpcsynth::Error::exit_code)
                .unwrap_or(1)
        }
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level; JSON output mode also logs
/// as JSON lines
fn init_logging(verbosity: u8, configured: &str, json: bool) {
    let filter = match verbosity {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity >= 3)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
