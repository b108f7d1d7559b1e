mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{account::AccountSubcommand, config::ConfigSubcommand, ou::OuSubcommand};

#[derive(Parser)]
#[command(
    name = "vending",
    about = "Provision, inspect and retire cloud accounts through a provisioning catalog",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest vending.yaml from the current directory up)
    #[arg(long, global = true, env = "VENDING_CONFIG")]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log remote calls and poll cycles
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, read, update and delete vended accounts
    Account {
        #[command(subcommand)]
        subcommand: AccountSubcommand,
    },

    /// Resolve and list organizational units
    Ou {
        #[command(subcommand)]
        subcommand: OuSubcommand,
    },

    /// Write or check the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = root::resolve_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Account { subcommand } => cmd::account::run(&config_path, subcommand, cli.json),
        Commands::Ou { subcommand } => cmd::ou::run(&config_path, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
