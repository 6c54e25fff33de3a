mod args;
mod outputs;

use anyhow::{Context, Result};
use args::Args;
use clap::Parser;
use dogedeploy_cloud::{DeployProgress, DeployResult, Deployer, DogeCloudStore};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    match run(&args).await {
        Ok(result) if !result.is_complete_success() && args.fail_on_error => {
            error!(
                "deploy finished with {} failed operations",
                result.failed_keys.len()
            );
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("deploy failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> Result<DeployResult> {
    info!("deploying to DogeCloud");
    info!("local path: {}", args.local_path.display());
    info!("remote path: {}", args.remote_path);
    info!("bucket: {}", args.bucket_name);
    info!("max concurrency: {}", args.max_concurrency);
    info!("retry attempts: {}", args.retry_attempts);

    let cloud = args.cloud_config();
    let cdn_domain = cloud.cdn_domain.clone();
    let store = DogeCloudStore::new(cloud, args.api_key.clone(), args.secret_key.clone())
        .context("failed to initialize DogeCloud client")?;

    let retries = Arc::new(AtomicUsize::new(0));
    let retries_seen = Arc::clone(&retries);

    let deployer = Deployer::new(Arc::new(store), args.sync_config())
        .with_cdn_domain(cdn_domain)
        .with_progress(Box::new(move |event| {
            if let DeployProgress::UploadRetry { .. } = event {
                retries_seen.fetch_add(1, Ordering::Relaxed);
            }
        }));

    let result = deployer
        .deploy(&args.deploy_options())
        .await
        .context("deploy aborted")?;

    if let Some(path) = std::env::var_os("GITHUB_OUTPUT") {
        outputs::write_outputs(std::path::Path::new(&path), &result)?;
    }

    let retries = retries.load(Ordering::Relaxed);
    if retries > 0 {
        info!("{retries} upload attempts were retried");
    }

    if result.is_complete_success() {
        info!("deploy completed successfully");
    } else {
        warn!(
            "deploy completed with {} failed operations: {}",
            result.failed_keys.len(),
            result.failed_keys.join(", ")
        );
    }
    info!("uploaded files: {}", result.uploaded_count);
    info!("deployment url: {}", result.deployment_url);

    Ok(result)
}
