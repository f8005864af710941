use clap::{Parser, Subcommand};
use console::style;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lintmend::cli::commands;

#[derive(Parser)]
#[command(name = "lintmend")]
#[command(
    version,
    about = "Automated lint remediation with validated, rollback-protected fix batches"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize lintmend in the current directory
    Init {
        #[arg(long, short, help = "Overwrite existing initialization")]
        force: bool,
    },

    /// Run the analyzer, record metrics and show the remediation plan
    Analyze {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Apply automatic fixes in validated batches
    Fix {
        #[arg(long = "dry-run", help = "Report what would change without writing")]
        dry_run: bool,
        #[arg(long, short, help = "Approve a live run when manual approval is required")]
        yes: bool,
    },

    /// Evaluate a quality gate; exits non-zero when it fails
    #[command(name = "quality-gate")]
    QualityGate {
        #[arg(long, short, help = "Gate name (default: ci)")]
        gate: Option<String>,
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Generate the quality report
    Report {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, markdown, json"
        )]
        format: String,
        #[arg(long, help = "Print the latest report without re-running the analyzer")]
        latest: bool,
    },

    /// Show recorded metrics, gate results, runs and alerts
    Status {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },

    /// Manage alert suppressions
    Alerts {
        #[command(subcommand)]
        action: AlertsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum AlertsAction {
    /// List recent alerts and suppressed metrics
    List,
    /// Stop alerting on a metric
    Suppress {
        metric: String,
        #[arg(long, help = "Why the metric is suppressed")]
        reason: Option<String>,
    },
    /// Resume alerting on a metric
    Unsuppress { metric: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json, yaml, toml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Edit configuration file with $EDITOR
    Edit {
        #[arg(long, short, help = "Edit global config")]
        global: bool,
    },
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n{}", style("━━━ PANIC ━━━").red().bold());
        eprintln!("{}", style("lintmend encountered an unexpected error:").red());
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "{}",
                style(format!(
                    "Location: {}:{}:{}",
                    location.file(),
                    location.line(),
                    location.column()
                ))
                .dim()
            );
        }
        eprintln!(
            "{}",
            style("A fix run in progress leaves its snapshot under .lintmend/snapshots/").yellow()
        );
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red(), e);
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` when the command ran but reports failure (gate failed,
/// fix run rolled back)
fn run_cli() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let quiet = cli.quiet;
    let ok = match cli.command {
        Commands::Init { force } => {
            commands::init::run(force)?;
            true
        }
        Commands::Analyze { format } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::analyze::run(&format, quiet))?;
            true
        }
        Commands::Fix { dry_run, yes } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::fix::run(dry_run, yes, quiet))?
        }
        Commands::QualityGate { gate, format } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::gate::run(gate.as_deref(), &format, quiet))?
        }
        Commands::Report { format, latest } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::report::run(&format, latest, quiet))?;
            true
        }
        Commands::Status { format } => {
            commands::status::run(&format)?;
            true
        }
        Commands::Alerts { action } => {
            match action {
                AlertsAction::List => commands::alerts::list()?,
                AlertsAction::Suppress { metric, reason } => {
                    commands::alerts::suppress(&metric, reason.as_deref())?
                }
                AlertsAction::Unsuppress { metric } => commands::alerts::unsuppress(&metric)?,
            }
            true
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show { global, format } => commands::config::show(global, &format)?,
                ConfigAction::Path => commands::config::path()?,
                ConfigAction::Edit { global } => commands::config::edit(global)?,
                ConfigAction::Init { global, force } => {
                    if global {
                        commands::config::init_global(force)?;
                    } else {
                        commands::config::init_project()?;
                    }
                }
            }
            true
        }
    };

    Ok(ok)
}
