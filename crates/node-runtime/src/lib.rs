//! # Decichain Node Runtime
//!
//! Process-level wiring for a Decichain node: configuration, CLI, the
//! worker event loop, the worker pool, message dispatch, the miner
//! controller and the rendezvous service.
//!
//! ## Roles
//!
//! - **Rendezvous** (`-bootstrap`): records worker registrations and
//!   announces the full port list whenever membership changes.
//! - **Worker**: listens on its ports, registers with the rendezvous
//!   service, dials announced peers, reconciles chains and mines.
//!
//! ## Worker Data Flow
//!
//! ```text
//!  peer socket ──readable──→ EventLoop ──claim──→ WorkerPool job
//!                                                      │
//!                                      dispatch::process_readable
//!                          ┌───────────────┬───────────┴──────────┬─────────────┐
//!                    SEND_TRANSACTION  SEND_BLOCK            GET_HASH/BLOCK   SEND_PORTS
//!                          │               │                      │             │
//!                     mempool admit   ReconciliationService    reply        membership
//!                          │          (classify / search /                   task dials
//!                          │           settle)                               new peers
//!                          └──────┬────────┘
//!                                 ↓
//!                      mining::maybe_start ──→ miner thread ──MinerEvent──→ EventLoop
//! ```
//!
//! ## Modular Structure
//!
//! - `config` - NodeConfig (TOML file, DC_* environment)
//! - `cli` - clap flags, legacy single-dash spelling
//! - `context` - NodeContext shared by every task
//! - `peers` - connections and the peer table
//! - `framing` - resumable frame reader
//! - `dispatch` - one message per job, both search drivers
//! - `sessions` - event-driven search sessions and the sweep
//! - `mining` - miner controller
//! - `membership` - dialling announced peers
//! - `worker_pool` - job queue workers
//! - `event_loop` - readiness multiplexing
//! - `bootstrap` - rendezvous service and registration
//! - `node` - WorkerNode startup and shutdown

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event_loop;
pub mod framing;
pub mod membership;
pub mod mining;
pub mod node;
pub mod peers;
pub mod sessions;
pub mod worker_pool;

pub use bootstrap::{register_with_rendezvous, Rendezvous};
pub use cli::{parse_args, Cli, CliError, Role};
pub use config::{NodeConfig, SyncMode};
pub use context::NodeContext;
pub use error::{Result, RuntimeError};
pub use node::{Discovery, WorkerNode};
