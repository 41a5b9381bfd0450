use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cluster_gateway::api::ApiServerBuilder;
use cluster_gateway::discovery::{self, FileTopology, StaticTopology, TopologySource};
use cluster_gateway::dispatch::HttpNodeClient;
use cluster_gateway::security::{Authenticator, CachedPermissionResolver, RbacPolicy};
use cluster_gateway::{Config, DispatchCoordinator, Gateway, NodeRegistry, PermissionResolver};

/// Cluster Gateway - authorization-aware fan-out for cluster management
#[derive(Parser)]
#[command(name = "cluster-gateway", version, about)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, env = "CLUSTER_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load and print the effective configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,cluster_gateway=info",
        1 => "info,cluster_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(Command::CheckConfig) = cli.command {
        println!("{config:#?}");
        return Ok(());
    }

    tracing::info!(
        port = config.server.port,
        local_node = ?config.cluster.local_node,
        "starting cluster gateway"
    );

    let registry = Arc::new(NodeRegistry::new());
    let source: Arc<dyn TopologySource> = match &config.cluster.topology_file {
        Some(path) => Arc::new(FileTopology::new(path.clone())),
        None => Arc::new(StaticTopology::new(config.cluster.nodes.clone())),
    };

    // Serve with a populated registry when the source is healthy at startup
    if let Err(e) = discovery::refresh_once(&registry, source.as_ref()).await {
        tracing::warn!(error = %e, "starting with an empty topology");
    }
    let _refresh = discovery::spawn_refresh_loop(
        registry.clone(),
        source,
        config.cluster.refresh_interval,
    );

    let policy: Arc<dyn PermissionResolver> = Arc::new(RbacPolicy::new(config.rbac.roles.clone()));
    let permissions = Arc::new(CachedPermissionResolver::new(
        policy,
        config.rbac.decision_cache_ttl,
    ));

    let coordinator = DispatchCoordinator::new(
        registry,
        permissions,
        Arc::new(HttpNodeClient::new()),
        config.dispatch.settings(),
    );
    let gateway = Arc::new(Gateway::new(coordinator, config.dispatch.max_limit));

    if config.auth.jwt_secret.is_none() {
        if config.auth.allow_anonymous {
            tracing::warn!("no JWT secret configured - anonymous callers act as administrator");
        } else {
            tracing::warn!("no JWT secret configured - all cluster requests will be rejected");
        }
    }
    let authenticator = Authenticator::new(&config.auth);

    ApiServerBuilder::new(gateway, authenticator)
        .bind(config.server.bind.clone())
        .port(config.server.port)
        .local_node(config.cluster.local_node.clone())
        .rate_limit_rpm(config.server.rate_limit_rpm)
        .build()
        .run()
        .await?;

    Ok(())
}
