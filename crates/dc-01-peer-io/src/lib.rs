//! # Peer I/O Subsystem
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Non-blocking socket plumbing underneath the reconciliation protocol:
//! per-socket outbound buffers for would-block writes, per-socket inbound
//! accumulation for reads that span several readiness events, and the shared
//! readiness book the event loop consults once per iteration.
//!
//! ## Read Outcomes
//!
//! A read attempt distinguishes three states and never conflates them:
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Complete` | requested length fully buffered |
//! | `Pending { filled }` | would-block; keep what we have, wait for readiness |
//! | `Closed` | zero-length read: the peer closed the stream |
//!
//! ## Write Path
//!
//! ```text
//! send(bytes) ──pending empty?──yes──→ try_write ──WouldBlock──→ queue remainder
//!      │                                   │
//!      no                                  └──done──→ Flushed
//!      ↓
//! append to queue ──→ flush (keeps byte order)
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/tcp.rs   - tokio TcpStream binding, listener, connect │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/outbound.rs - RawSocket trait                            │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/buffers.rs   - InboundBuffer, OutboundBuffer            │
//! │  domain/readiness.rs - ReadinessBook                            │
//! │  domain/errors.rs    - PeerIoError                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
