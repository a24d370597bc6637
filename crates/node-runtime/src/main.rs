//! # Decichain Node
//!
//! Entry point. Runs the rendezvous service or a worker node depending on
//! the command line, until Ctrl-C.

use std::path::PathBuf;

use anyhow::{Context, Result};
use node_runtime::config::ENV_CONFIG_PATH;
use node_runtime::{parse_args, Discovery, NodeConfig, Rendezvous, Role, WorkerNode};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn load_config(cli: &node_runtime::Cli) -> Result<NodeConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from));
    let mut config = NodeConfig::load(path.as_deref())?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = match parse_args(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    let role = cli.role().context("invalid command line")?;
    let config = load_config(&cli)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    match role {
        Role::Bootstrap => {
            let rendezvous = Rendezvous::bind(
                config.network.bootstrap_addr,
                config.network.listen_backlog,
            )
            .context("failed to start rendezvous service")?;
            let task = tokio::spawn(rendezvous.run(shutdown_rx));

            tokio::signal::ctrl_c().await?;
            info!("Shutting down rendezvous service");
            // The task may have exited already.
            let _ = shutdown_tx.send(true);
            task.await??;
        }
        Role::Worker { ports } => {
            let node = WorkerNode::start(config, &ports, Discovery::Rendezvous)
                .await
                .context("failed to start worker node")?;

            info!("Node is running. Press Ctrl+C to stop.");
            tokio::signal::ctrl_c().await?;
            info!("Shutting down worker node");
            node.shutdown().await?;
        }
    }
    Ok(())
}
