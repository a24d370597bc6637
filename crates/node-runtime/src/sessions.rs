//! Event-driven search sessions and the periodic sweep.
//!
//! A session is an [`AncestorSearch`] parked on the connection it talks to.
//! Nothing else times it out, so the sweep abandons sessions that have seen
//! no reply for `session_timeout`, and closes connections stuck mid-frame
//! for longer than `read_stall`. Abandoning a session never touches the
//! chain because the search only commits when it completes.

use std::time::{Duration, Instant};

use dc_05_reconciliation::AncestorSearch;
use tracing::{info, warn};

use crate::context::NodeContext;

#[derive(Debug)]
pub struct SearchSession {
    pub search: AncestorSearch,
    started: Instant,
    last_activity: Instant,
}

impl SearchSession {
    pub fn new(search: AncestorSearch) -> Self {
        let now = Instant::now();
        Self {
            search,
            started: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }
}

/// What one sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub abandoned_sessions: usize,
    pub closed_connections: usize,
}

pub fn sweep(ctx: &NodeContext, now: Instant) -> SweepReport {
    let session_timeout = ctx.config().sync.session_timeout();
    let read_stall = ctx.config().sync.read_stall();
    let mut report = SweepReport::default();

    for conn in ctx.peers().all() {
        if conn
            .session_idle_for(now)
            .is_some_and(|idle| idle > session_timeout)
        {
            if let Some(session) = conn.take_session() {
                info!(
                    "[dc-05] abandoning search toward {:?} with {} after {:?}",
                    session.search.target().height(),
                    conn.peer(),
                    session.age(now)
                );
                report.abandoned_sessions += 1;
            }
        }

        if ctx.readiness().is_busy(conn.id()) {
            continue;
        }
        if conn
            .read_stalled_for(now)
            .is_some_and(|stalled| stalled > read_stall)
        {
            warn!("[dc-01] closing {}: partial frame stalled", conn.peer());
            ctx.close(conn.id());
            report.closed_connections += 1;
        }
    }
    report
}
