//! Process-wide active-connection accounting.
//!
//! The counter is plain observability state: it is incremented when a
//! connection is accepted and decremented when the connection is torn down,
//! on every teardown path. It never gates admission.

use std::sync::atomic::{AtomicUsize, Ordering};

static ACTIVE_CONNECTIONS: AtomicUsize = AtomicUsize::new(0);

/// Number of connections currently being served.
pub fn active_connection_count() -> usize {
    ACTIVE_CONNECTIONS.load(Ordering::Relaxed)
}

/// RAII handle tying the counter to a connection's lifetime.
///
/// Create one when a connection is accepted and keep it alive in the
/// connection task; dropping it (normally or on panic/error unwind)
/// decrements the counter.
#[derive(Debug)]
#[must_use = "the connection is only counted while the guard is alive"]
pub struct ConnectionGuard(());

impl ConnectionGuard {
    pub fn new() -> Self {
        ACTIVE_CONNECTIONS.fetch_add(1, Ordering::Relaxed);
        Self(())
    }
}

impl Default for ConnectionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        ACTIVE_CONNECTIONS.fetch_sub(1, Ordering::Relaxed);
    }
}
