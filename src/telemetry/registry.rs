//! Listener registry and byte counter
//!
//! Both live behind one lock so a telemetry read sees a consistent pair. The
//! lock is only held for the increment, decrement or copy, never across I/O.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Counters {
    listeners: usize,
    total_bytes: u64,
}

/// Consistent copy of the shared counters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterSnapshot {
    pub listeners: usize,
    pub total_bytes: u64,
    pub elapsed: Duration,
}

/// Process-wide streaming state shared by all handlers
#[derive(Debug)]
pub struct StreamState {
    counters: RwLock<Counters>,
    start_time: Instant,
}

impl StreamState {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    /// Count a new listener. The returned guard removes it again on drop.
    pub fn register(self: &Arc<Self>) -> ListenerGuard {
        let listeners = {
            let mut counters = self.counters.write();
            counters.listeners += 1;
            counters.listeners
        };
        tracing::debug!("Listener registered ({} active)", listeners);
        ListenerGuard {
            state: Arc::clone(self),
        }
    }

    fn unregister(&self) {
        let listeners = {
            let mut counters = self.counters.write();
            counters.listeners = counters.listeners.saturating_sub(1);
            counters.listeners
        };
        tracing::debug!("Listener unregistered ({} active)", listeners);
    }

    /// Add relayed bytes to the lifetime total
    pub fn record_bytes(&self, n: usize) {
        self.counters.write().total_bytes += n as u64;
    }

    pub fn listeners(&self) -> usize {
        self.counters.read().listeners
    }

    pub fn total_bytes(&self) -> u64 {
        self.counters.read().total_bytes
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let counters = self.counters.read();
        CounterSnapshot {
            listeners: counters.listeners,
            total_bytes: counters.total_bytes,
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StreamState {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps one listener counted for as long as it is alive
#[derive(Debug)]
pub struct ListenerGuard {
    state: Arc<StreamState>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.state.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_guard_counts_exactly_once() {
        let state = Arc::new(StreamState::new());
        let a = state.register();
        let b = state.register();
        assert_eq!(state.listeners(), 2);

        drop(a);
        assert_eq!(state.listeners(), 1);
        drop(b);
        assert_eq!(state.listeners(), 0);
    }

    #[test]
    fn test_concurrent_sessions() {
        let state = Arc::new(StreamState::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || {
                    let _guard = state.register();
                    for _ in 0..100 {
                        state.record_bytes(8192);
                    }
                    assert!(state.listeners() >= 1);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(state.listeners(), 0);
        assert_eq!(state.total_bytes(), 16 * 100 * 8192);
    }

    #[test]
    fn test_byte_counter_is_monotonic() {
        let state = Arc::new(StreamState::new());
        let mut last = 0;
        for n in [0usize, 1, 4096, 0, 8192] {
            state.record_bytes(n);
            let now = state.total_bytes();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 12289);
    }

    #[test]
    fn test_snapshot_is_consistent() {
        let state = Arc::new(StreamState::new());
        let _guard = state.register();
        state.record_bytes(48000);
        let before = state.snapshot();
        let snap = state.snapshot();
        assert_eq!(snap.listeners, 1);
        assert_eq!(snap.total_bytes, 48000);
        assert!(snap.elapsed >= before.elapsed);
    }
}
