//! Shared readiness bookkeeping.
//!
//! The event loop recomputes socket interest once per iteration. A socket is
//! read-interesting unless a worker job currently owns it, and
//! write-interesting while its outbound buffer holds bytes. Workers update the
//! book from their own threads, so it is guarded by a mutex.

use std::collections::HashSet;
use std::hash::Hash;

use parking_lot::Mutex;
use tokio::io::Interest;

#[derive(Debug)]
struct Book<K> {
    busy: HashSet<K>,
    pending_write: HashSet<K>,
}

impl<K: Hash + Eq> Book<K> {
    fn interest_of(&self, key: &K) -> Option<Interest> {
        let read = !self.busy.contains(key);
        let write = self.pending_write.contains(key);
        match (read, write) {
            (true, true) => Some(Interest::READABLE.add(Interest::WRITABLE)),
            (true, false) => Some(Interest::READABLE),
            (false, true) => Some(Interest::WRITABLE),
            (false, false) => None,
        }
    }
}

/// Which sockets are owned by a job and which have queued output.
#[derive(Debug)]
pub struct ReadinessBook<K> {
    inner: Mutex<Book<K>>,
}

impl<K: Hash + Eq + Copy> Default for ReadinessBook<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Copy> ReadinessBook<K> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Book {
                busy: HashSet::new(),
                pending_write: HashSet::new(),
            }),
        }
    }

    /// Claim a socket for a job. Returns false if another job holds it.
    pub fn try_claim(&self, key: K) -> bool {
        self.inner.lock().busy.insert(key)
    }

    pub fn release(&self, key: K) {
        self.inner.lock().busy.remove(&key);
    }

    pub fn is_busy(&self, key: K) -> bool {
        self.inner.lock().busy.contains(&key)
    }

    pub fn set_pending_write(&self, key: K, pending: bool) {
        let mut book = self.inner.lock();
        if pending {
            book.pending_write.insert(key);
        } else {
            book.pending_write.remove(&key);
        }
    }

    pub fn has_pending_write(&self, key: K) -> bool {
        self.inner.lock().pending_write.contains(&key)
    }

    /// Drop every trace of a closed socket.
    pub fn forget(&self, key: K) {
        let mut book = self.inner.lock();
        book.busy.remove(&key);
        book.pending_write.remove(&key);
    }

    /// Interest for one socket, or `None` if nothing should wake it.
    pub fn interest(&self, key: K) -> Option<Interest> {
        self.inner.lock().interest_of(&key)
    }

    /// Interest for every live socket, computed under one lock.
    pub fn interests<I>(&self, live: I) -> Vec<(K, Interest)>
    where
        I: IntoIterator<Item = K>,
    {
        let book = self.inner.lock();
        live.into_iter()
            .filter_map(|key| book.interest_of(&key).map(|i| (key, i)))
            .collect()
    }
}
