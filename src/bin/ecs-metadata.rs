//! CLI binary for the ecs-metadata crate.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ecs_metadata::{EcsMetadata, MetadataClient, MetadataError, DEFAULT_BASE_URL};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ecs-metadata")]
#[command(
    author,
    version,
    about = "Query the ECS instance metadata service"
)]
struct Cli {
    /// Metadata service base URL
    #[arg(long, env = "ECS_METADATA_ENDPOINT", default_value = DEFAULT_BASE_URL)]
    endpoint: String,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the instance host name
    Hostname,

    /// Print the instance ID
    Id,

    /// Print the instance region
    Region,

    /// Print the instance zone
    Zone,

    /// Print the scheduled release time of a preemptible instance
    TerminationTime,

    /// Print the credentials of a RAM role
    Ram {
        /// Role name; the attached role is discovered when empty
        #[arg(env = "ECS_RAM_NAME", default_value = "")]
        role: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print ECS API client settings for this instance
    Ecs {
        /// Role name; the attached role is discovered when empty
        #[arg(env = "ECS_RAM_NAME", default_value = "")]
        role: String,
    },

    /// Keep the role credentials refreshed until interrupted
    Watch {
        /// Seconds between refreshes
        #[arg(
            short,
            long,
            default_value_t = 60,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval: u64,

        /// Export credentials as ALIBABA_CLOUD_* variables
        #[arg(long)]
        export_env: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown format: {}", s)),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), MetadataError> {
    let client = MetadataClient::new(Duration::from_millis(cli.timeout_ms), &cli.endpoint)?;
    let metadata = EcsMetadata::from_client(client);

    match cli.command {
        Commands::Hostname => println!("{}", metadata.hostname().await),
        Commands::Id => println!("{}", metadata.instance_id().await),
        Commands::Region => println!("{}", metadata.region().await),
        Commands::Zone => println!("{}", metadata.zone().await),
        Commands::TerminationTime => {
            println!("{}", metadata.termination_time().await.to_rfc3339())
        }

        Commands::Ram { role, format } => {
            let credential = metadata.ram(&role).await?;
            match format {
                OutputFormat::Text => {
                    println!("AccessKeyId: {}", credential.access_key_id);
                    println!("AccessKeySecret: {}", credential.access_key_secret);
                    println!("SecurityToken: {}", credential.security_token);
                    if let Some(expiration) = credential.expiration {
                        println!("Expiration: {}", expiration.to_rfc3339());
                    }
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&credential)?);
                }
            }
        }

        Commands::Ecs { role } => {
            let config = metadata.ecs_client_config(&role).await?;
            println!("RegionId: {}", config.region_id);
            println!("Endpoint: {}", config.endpoint);
            println!("AccessKeyId: {}", config.access_key_id);
            println!("AccessKeySecret: {}", config.access_key_secret);
            println!("SecurityToken: {}", config.security_token);
        }

        Commands::Watch {
            interval,
            export_env,
        } => {
            let metadata = metadata
                .with_cache(true)
                .with_env_propagation(export_env)
                .with_refresh_interval(Duration::from_secs(interval));
            let refresher = metadata.start_refresh();
            if !refresher.is_running() {
                tracing::info!("nothing to refresh");
                return Ok(());
            }
            tokio::signal::ctrl_c().await?;
            tracing::info!("shutting down");
            refresher.shutdown().await;
        }
    }
    Ok(())
}
