mod commands;

use clap::{Parser, Subcommand};
use commands::{chaos, iam_auth, reset, status};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4000";

#[derive(Parser)]
#[command(name = "ldk", version, about = "Control a running ldk fleet's management plane")]
struct Cli {
    /// Management plane base URL
    #[arg(long, global = true, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show fleet and per-service status
    Status,
    /// Inspect or mutate per-service chaos configuration
    Chaos {
        #[command(subcommand)]
        action: ChaosAction,
    },
    /// Inspect or mutate runtime IAM enforcement
    IamAuth {
        #[command(subcommand)]
        action: IamAuthAction,
    },
    /// Drop every provider's in-memory data (identities/permissions survive)
    Reset,
}

#[derive(Subcommand)]
enum ChaosAction {
    /// Print every service's chaos configuration
    Get,
    /// Merge-patch one service's chaos configuration
    Set {
        /// Service name (e.g. dynamodb, s3)
        service: String,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        error_rate: Option<f64>,
        #[arg(long)]
        latency_min_ms: Option<u64>,
        #[arg(long)]
        latency_max_ms: Option<u64>,
        #[arg(long)]
        timeout_rate: Option<f64>,
        #[arg(long)]
        connection_reset_rate: Option<f64>,
    },
}

#[derive(Subcommand)]
enum IamAuthAction {
    /// Print the current IAM enforcement config
    Get,
    /// Merge-patch the IAM enforcement config
    Set {
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        default_identity: Option<String>,
        #[arg(long)]
        enable_service: Option<String>,
        #[arg(long)]
        disable_service: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Status => status::run(&cli.endpoint).await,
        Commands::Chaos { action } => match action {
            ChaosAction::Get => chaos::get(&cli.endpoint).await,
            ChaosAction::Set { service, enabled, error_rate, latency_min_ms, latency_max_ms, timeout_rate, connection_reset_rate } => {
                chaos::set(&cli.endpoint, &service, enabled, error_rate, latency_min_ms, latency_max_ms, timeout_rate, connection_reset_rate).await
            }
        },
        Commands::IamAuth { action } => match action {
            IamAuthAction::Get => iam_auth::get(&cli.endpoint).await,
            IamAuthAction::Set { mode, default_identity, enable_service, disable_service } => {
                iam_auth::set(&cli.endpoint, mode, default_identity, enable_service, disable_service).await
            }
        },
        Commands::Reset => reset::run(&cli.endpoint).await,
    };

    if let Err(e) = result {
        eprintln!("{}", colored::Colorize::red(format!("Error: {e:#}").as_str()));
        std::process::exit(1);
    }
}
