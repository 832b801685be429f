use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossregion::lifecycle::COMMAND;
use crossregion::policy::{ReplicationPolicy, TrustPolicy};
use crossregion::workflow::ReplicationPair;
use crossregion::{AwsProvider, CreatedResource, LifecycleEvent};
use crossregion_config::RuntimeConfig;
use dialoguer::Confirm;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

/// Provision two S3 buckets with bidirectional replication
#[derive(Parser)]
#[command(name = "crossregion")]
#[command(version)]
#[command(about = "Provision two S3 buckets with bidirectional replication", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// AWS region for the clients (overrides config file)
    #[arg(long, global = true)]
    region: Option<String>,

    /// AWS shared-config profile
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Endpoint override, e.g. http://localhost:4566 for a local emulator
    #[arg(long, value_name = "URL", global = true)]
    endpoint_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = COMMAND.usage, alias = "bidirectionalReplication")]
    BidirectionalReplication {
        /// Run a single lifecycle event instead of both
        #[arg(long, value_enum)]
        only: Option<Phase>,

        /// Delete everything this run created if a step fails
        #[arg(long)]
        rollback_on_failure: bool,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Print the IAM documents that would be sent, without calling AWS
    RenderPolicies,
}

#[derive(Clone, Copy, ValueEnum)]
enum Phase {
    CreateBuckets,
    AttachPermissions,
}

impl From<Phase> for LifecycleEvent {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::CreateBuckets => LifecycleEvent::CreateBuckets,
            Phase::AttachPermissions => LifecycleEvent::AttachPermissions,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    crossregion::init_tracing(&config.log);
    config.validate().context("Invalid configuration")?;

    let pair = config
        .replication_pair()
        .map(ReplicationPair::from)
        .context("No bucket pair configured")?;

    match cli.command {
        Commands::BidirectionalReplication {
            only,
            rollback_on_failure,
            yes,
        } => {
            let events: Vec<LifecycleEvent> = match only {
                Some(phase) => vec![phase.into()],
                None => COMMAND.lifecycle_events.to_vec(),
            };
            let rollback = rollback_on_failure || config.workflow.rollback_on_failure;

            if !yes && !confirm(&pair, &events)? {
                println!("Aborted.");
                return Ok(());
            }

            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?
                .block_on(run_replication(&config, &pair, &events, rollback))
        }
        Commands::RenderPolicies => render_policies(&pair),
    }
}

fn load_config(cli: &Cli) -> Result<RuntimeConfig> {
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RuntimeConfig::load().context("Failed to load configuration")?,
    };

    // CLI flags win over file and environment
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    if let Some(region) = &cli.region {
        config.aws.region = Some(region.clone());
    }
    if let Some(profile) = &cli.profile {
        config.aws.profile = Some(profile.clone());
    }
    if let Some(endpoint) = &cli.endpoint_url {
        config.aws.endpoint_url = Some(endpoint.clone());
    }

    Ok(config)
}

fn confirm(pair: &ReplicationPair, events: &[LifecycleEvent]) -> Result<bool> {
    println!();
    println!("crossregion {} - {}", COMMAND.name, COMMAND.usage);
    println!();
    println!("  Source bucket:      {}", pair.source_bucket);
    println!("  Destination bucket: {}", pair.destination_bucket);
    println!("  Destination region: {}", pair.destination_region);
    println!(
        "  Lifecycle events:   {}",
        events
            .iter()
            .map(LifecycleEvent::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    let proceed = Confirm::new()
        .with_prompt("Create these resources in your AWS account?")
        .default(false)
        .interact()?;
    Ok(proceed)
}

async fn run_replication(
    config: &RuntimeConfig,
    pair: &ReplicationPair,
    events: &[LifecycleEvent],
    rollback: bool,
) -> Result<()> {
    let provider = AwsProvider::from_config(&config.aws).await;

    let created = crossregion::run_command(&provider, pair, events, rollback)
        .await
        .with_context(|| format!("{} failed", COMMAND.name))?;

    info!(resources = created.len(), "Replication setup complete");

    println!();
    println!("Created:");
    for resource in created.iter() {
        match resource {
            CreatedResource::Bucket(name) => println!("  bucket       {}", name),
            CreatedResource::Role(name) => println!("  role         {}", name),
            CreatedResource::Policy { arn } => println!("  policy       {}", arn),
            CreatedResource::Attachment {
                role_name,
                policy_arn,
            } => println!("  attachment   {} -> {}", policy_arn, role_name),
            CreatedResource::Replication { bucket } => {
                println!("  replication  on {}", bucket)
            }
        }
    }
    println!();

    Ok(())
}

fn render_policies(pair: &ReplicationPair) -> Result<()> {
    let mut permission_policies = serde_json::Map::new();
    for direction in pair.directions() {
        let policy = ReplicationPolicy::new(direction.from_bucket, direction.to_bucket);
        permission_policies.insert(
            direction.policy_name.to_string(),
            serde_json::to_value(&policy)?,
        );
    }

    let documents = json!({
        "AssumeRolePolicyDocument": TrustPolicy::storage_service(),
        "PolicyDocuments": permission_policies,
    });
    println!("{}", serde_json::to_string_pretty(&documents)?);
    Ok(())
}
