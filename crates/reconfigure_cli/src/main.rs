use std::io;

use clap::{Parser, Subcommand};
use reconfigure_core::RunSettings;
use tracing::error;

use reconfigure_cli::commands::platform_cmd::{self, PlatformArgs};
use reconfigure_cli::commands::repository_cmd::{self, RepositoryArgs};
use reconfigure_cli::commands::{self, RunOptions};
use reconfigure_cli::config::{AppConfig, ReportFormat};
use reconfigure_cli::errors::Error;
use reconfigure_cli::logging::{init_logging, log_filter, LOG_ENV_VAR};

/// Reconfigure: bring an installation in line with its canonical configuration
#[derive(Parser)]
#[command(name = "reconfigure")]
#[command(about = "Reconcile an installation with a canonical configuration", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./reconfigure.toml when present)
    #[arg(long, global = true)]
    settings: Option<String>,

    /// Report format
    #[arg(long, global = true, value_enum)]
    format: Option<ReportFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconfigure a BI platform install and its catalog
    Platform(PlatformArgs),

    /// Reconfigure an ETL repository file and its catalog
    Repository(RepositoryArgs),

    /// Show the CLI version
    Version,
}

impl Commands {
    fn options(&self) -> Option<&RunOptions> {
        match self {
            Commands::Platform(args) => Some(&args.options),
            Commands::Repository(args) => Some(&args.options),
            Commands::Version => None,
        }
    }
}

fn run(settings: Result<RunSettings, Error>, format: ReportFormat) -> i32 {
    let mut stdout = io::stdout().lock();
    match settings.and_then(|settings| commands::execute(settings, format, &mut stdout)) {
        Ok(report) => report.exit_code(),
        Err(e) => {
            error!(error = %e, "Reconfiguration did not complete");
            eprintln!("Error: {e}");
            e.exit_code()
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let app_config = match AppConfig::load_or_default(cli.settings.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let env_filter = std::env::var(LOG_ENV_VAR).ok();
    let debug = cli.command.options().is_some_and(|options| options.debug);
    init_logging(
        &log_filter(env_filter.as_deref(), debug, app_config.logging.filter.as_deref()),
        app_config.logging.json,
    );

    let format = cli.format.unwrap_or(app_config.report.format);
    let code = match &cli.command {
        Commands::Platform(args) => run(platform_cmd::settings(args, &app_config), format),
        Commands::Repository(args) => run(repository_cmd::settings(args, &app_config), format),
        Commands::Version => {
            println!(
                "reconfigure version {}",
                option_env!("RECONFIGURE_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            );
            0
        }
    };
    std::process::exit(code);
}
