//! Command-line surface.
//!
//! ```text
//! node-runtime -bootstrap
//! node-runtime -numworkers 2 -ports 8000 8001 [-difficulty 1] [-numtxinblock 50000] [-numcores 4]
//! ```
//!
//! The single-dash long flags are rewritten to `--flag` before clap sees
//! them, so both spellings work.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::config::{NodeConfig, SyncMode};

const LEGACY_FLAGS: &[&str] = &[
    "bootstrap",
    "numworkers",
    "ports",
    "difficulty",
    "numtxinblock",
    "numcores",
    "config",
    "bootstrap-addr",
    "sync-mode",
];

#[derive(Debug, Parser)]
#[command(name = "node-runtime", version, about = "Decichain proof-of-work node")]
pub struct Cli {
    /// Run the rendezvous service instead of a worker node.
    #[arg(long)]
    pub bootstrap: bool,

    /// Number of listening ports this node opens.
    #[arg(long)]
    pub numworkers: Option<usize>,

    /// Listening ports, one per worker.
    #[arg(long, num_args = 1..)]
    pub ports: Vec<u16>,

    /// Trailing zero hex digits required in a block hash.
    #[arg(long)]
    pub difficulty: Option<usize>,

    /// Transactions per block.
    #[arg(long)]
    pub numtxinblock: Option<usize>,

    /// Worker tasks processing readable connections.
    #[arg(long)]
    pub numcores: Option<usize>,

    /// TOML configuration file (also read from DC_CONFIG).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Rendezvous service address.
    #[arg(long)]
    pub bootstrap_addr: Option<SocketAddr>,

    /// `event-driven` or `blocking` ancestor search.
    #[arg(long)]
    pub sync_mode: Option<SyncMode>,
}

/// What this process runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Bootstrap,
    Worker { ports: Vec<u16> },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("-numworkers must be given and greater than zero")]
    MissingWorkers,

    #[error("-ports must list at least one port")]
    NoPorts,

    #[error("-numworkers is {workers} but {ports} ports were given")]
    PortCountMismatch { workers: usize, ports: usize },
}

impl Cli {
    pub fn role(&self) -> Result<Role, CliError> {
        if self.bootstrap {
            return Ok(Role::Bootstrap);
        }
        let workers = self
            .numworkers
            .filter(|n| *n > 0)
            .ok_or(CliError::MissingWorkers)?;
        if self.ports.is_empty() {
            return Err(CliError::NoPorts);
        }
        if workers != self.ports.len() {
            return Err(CliError::PortCountMismatch {
                workers,
                ports: self.ports.len(),
            });
        }
        Ok(Role::Worker {
            ports: self.ports.clone(),
        })
    }

    /// Overlay flags onto `config`. Flags win over file and environment.
    pub fn apply(&self, config: &mut NodeConfig) {
        if let Some(difficulty) = self.difficulty {
            config.chain.difficulty = difficulty;
        }
        if let Some(n) = self.numtxinblock {
            config.chain.transactions_per_block = n;
        }
        if let Some(cores) = self.numcores {
            config.workers.cores = cores.max(1);
        }
        if let Some(addr) = self.bootstrap_addr {
            config.network.bootstrap_addr = addr;
        }
        if let Some(mode) = self.sync_mode {
            config.sync.mode = mode;
        }
    }
}

/// Rewrite `-numworkers` style flags to `--numworkers`.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| match arg.to_str() {
            Some(s) if is_legacy_flag(s) => OsString::from(format!("-{s}")),
            _ => arg,
        })
        .collect()
}

fn is_legacy_flag(arg: &str) -> bool {
    match arg.strip_prefix('-') {
        Some(name) if !name.starts_with('-') => {
            let name = name.split('=').next().unwrap_or(name);
            LEGACY_FLAGS.contains(&name)
        }
        _ => false,
    }
}

pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    Cli::try_parse_from(normalize_legacy_flags(args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Cli {
        parse_args(line.split_whitespace()).unwrap()
    }

    #[test]
    fn test_legacy_worker_invocation() {
        let cli = parse("node -numworkers 2 -ports 8000 8001 -difficulty 3 -numtxinblock 10 -numcores 4");
        assert_eq!(
            cli.role().unwrap(),
            Role::Worker {
                ports: vec![8000, 8001]
            }
        );

        let mut config = NodeConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.chain.difficulty, 3);
        assert_eq!(config.chain.transactions_per_block, 10);
        assert_eq!(config.workers.cores, 4);
    }

    #[test]
    fn test_double_dash_flags_also_work() {
        let cli = parse("node --numworkers 1 --ports 9000 --sync-mode blocking");
        assert_eq!(cli.role().unwrap(), Role::Worker { ports: vec![9000] });
        assert_eq!(cli.sync_mode, Some(SyncMode::Blocking));
    }

    #[test]
    fn test_bootstrap_role() {
        assert_eq!(parse("node -bootstrap").role().unwrap(), Role::Bootstrap);
    }

    #[test]
    fn test_port_count_mismatch() {
        let cli = parse("node -numworkers 3 -ports 8000 8001");
        assert_eq!(
            cli.role().unwrap_err(),
            CliError::PortCountMismatch {
                workers: 3,
                ports: 2
            }
        );
    }

    #[test]
    fn test_zero_workers_is_a_usage_error() {
        assert_eq!(
            parse("node -numworkers 0 -ports 8000").role().unwrap_err(),
            CliError::MissingWorkers
        );
        assert_eq!(parse("node").role().unwrap_err(), CliError::MissingWorkers);
        assert_eq!(
            parse("node -numworkers 1").role().unwrap_err(),
            CliError::NoPorts
        );
    }

    #[test]
    fn test_unknown_single_dash_flag_is_left_alone() {
        let args = normalize_legacy_flags(["node", "-x", "-ports", "--config"]);
        assert_eq!(args, vec!["node", "-x", "--ports", "--config"]);
    }
}
