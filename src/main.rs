use std::net::SocketAddr;
use std::time::Duration;

use appshare_operator::{controller, crd::AppShare, telemetry, Error};
use clap::{Parser, Subcommand};
use kube::api::Api;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the operator
    Run(RunArgs),
    /// Show version and build information
    Version,
    /// Show cluster information
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Namespace to watch (all namespaces when empty)
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "")]
    namespace: String,

    /// Maximum number of AppShares reconciled concurrently (0 = unbounded)
    #[arg(long, env = "RECONCILE_CONCURRENCY", default_value_t = 4)]
    concurrency: u16,

    /// Seconds before the follow-up pass after a managed object is created
    #[arg(long, env = "REQUEUE_AFTER_CREATE_SECS", default_value_t = 1)]
    requeue_after_create_secs: u64,

    /// Seconds between periodic resyncs of converged AppShares
    #[arg(long, env = "RESYNC_INTERVAL_SECS", default_value_t = 300)]
    resync_interval_secs: u64,

    /// Seconds to back off after a retriable reconcile error
    #[arg(long, env = "ERROR_BACKOFF_SECS", default_value_t = 15)]
    error_backoff_secs: u64,

    /// Address of the health and metrics endpoint
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:8080")]
    metrics_addr: SocketAddr,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = telemetry::LogFormat::Text)]
    log_format: telemetry::LogFormat,
}

impl RunArgs {
    fn reconciler_config(&self) -> controller::ReconcilerConfig {
        controller::ReconcilerConfig {
            namespace: Some(self.namespace.clone()).filter(|ns| !ns.is_empty()),
            concurrency: self.concurrency,
            requeue_after_create: Duration::from_secs(self.requeue_after_create_secs),
            resync_interval: Duration::from_secs(self.resync_interval_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
        }
    }
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Namespace to inspect
    #[arg(long, env = "WATCH_NAMESPACE", default_value = "default")]
    namespace: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("AppShare Operator v{}", env!("CARGO_PKG_VERSION"));
            println!("Build Date: {}", env!("BUILD_DATE"));
            println!("Git SHA: {}", env!("GIT_SHA"));
            Ok(())
        }
        Commands::Info(info_args) => run_info(info_args).await,
        Commands::Run(run_args) => run_operator(run_args).await,
    }
}

async fn run_info(args: InfoArgs) -> Result<(), Error> {
    let client = kube::Client::try_default()
        .await
        .map_err(Error::KubeError)?;

    let api: Api<AppShare> = Api::namespaced(client, &args.namespace);
    let app_shares = api
        .list(&Default::default())
        .await
        .map_err(Error::KubeError)?;

    println!(
        "Managed AppShares in {}: {}",
        args.namespace,
        app_shares.items.len()
    );
    Ok(())
}

async fn run_operator(args: RunArgs) -> Result<(), Error> {
    telemetry::init(args.log_format)?;

    info!(
        "Starting AppShare Operator v{}",
        env!("CARGO_PKG_VERSION")
    );

    let client = kube::Client::try_default()
        .await
        .map_err(Error::KubeError)?;

    info!("Connected to Kubernetes cluster");

    #[cfg(feature = "metrics")]
    {
        let addr = args.metrics_addr;
        tokio::spawn(async move {
            if let Err(e) = appshare_operator::rest_api::run_server(addr).await {
                tracing::error!("Metrics server error: {:?}", e);
            }
        });
    }

    let result = controller::run_controller(client, args.reconciler_config()).await;

    telemetry::shutdown();

    result
}
