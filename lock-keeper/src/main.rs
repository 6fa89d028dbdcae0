use std::process::ExitCode;

use aws_config::BehaviorVersion;
use clap::Parser;
use dynamo_lock::{DynamoStore, LeaseLockClient, LockKey};
use lifecycle::{wait_for_shutdown_signal, SdNotifier};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use lock_keeper::cli::Args;
use lock_keeper::config::Config;
use lock_keeper::coordinator::{Coordinator, CoordinatorSettings};
use lock_keeper::error::KeeperError;
use lock_keeper::identity::ImdsIdentityProvider;

async fn dynamodb_client(config: &Config) -> aws_sdk_dynamodb::Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(endpoint) = &config.dynamodb_endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;
    aws_sdk_dynamodb::Client::new(&aws_config)
}

async fn run() -> Result<(), KeeperError> {
    let config = Config::load()?;
    // Exits with a usage message when KEY is missing.
    let args = Args::parse();
    let key = LockKey::new(args.key).map_err(|e| KeeperError::Configuration(e.to_string()))?;

    let store = DynamoStore::new(dynamodb_client(&config).await, &config.dynamodb_table_name)
        .with_partition_key(&config.partition_key);
    let table = store.table().to_string();
    let client = LeaseLockClient::new(store, config.lease_duration());

    tracing::info!(
        table = %table,
        key = %key,
        lease_duration_secs = client.lease_duration().as_secs(),
        refresh_period_secs = config.refresh_period_secs,
        additional_wait_secs = config.additional_wait_secs,
        "starting lock-keeper"
    );

    let settings = CoordinatorSettings {
        key,
        owner_name: args.owner_name,
        acquire: config.acquire_options(),
        release: config.release_options(),
    };
    let coordinator = Coordinator::new(
        client,
        ImdsIdentityProvider::new(),
        SdNotifier::from_env(),
        settings,
    );

    coordinator.run(wait_for_shutdown_signal()).await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(exit_code = e.exit_code(), "{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
