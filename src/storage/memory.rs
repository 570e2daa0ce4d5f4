use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use super::KeyValueStore;
use crate::error::StorageError;

/// In-process backend. Failures and latency can be injected so callers can
/// exercise their error paths without touching a disk.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
    writes: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fail_writes: AtomicUsize,
    fail_reads: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_value(key: &str, value: &str) -> Self {
        let s = Self::new();
        s.values.lock().insert(key.to_string(), value.to_string());
        s
    }

    /// Current value without going through the async interface.
    pub fn peek(&self, key: &str) -> Option<String> { self.values.lock().get(key).cloned() }

    /// Number of successful `set` calls so far.
    pub fn writes(&self) -> usize { self.writes.load(Ordering::SeqCst) }

    /// The next `n` writes (set or remove) fail.
    pub fn fail_next_writes(&self, n: usize) { self.fail_writes.store(n, Ordering::SeqCst); }

    /// Most `set` calls ever running at the same time.
    pub fn peak_concurrent_writes(&self) -> usize { self.peak_in_flight.load(Ordering::SeqCst) }

    pub fn fail_reads(&self, fail: bool) { self.fail_reads.store(fail, Ordering::SeqCst); }

    /// Every `set` sleeps this long before landing.
    pub fn set_write_delay(&self, delay: Option<Duration>) { *self.write_delay.lock() = delay; }

    fn take_write_failure(&self) -> bool {
        self.fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::read(key, "injected read failure"));
        }
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.write_delay.lock();
        if let Some(d) = delay { tokio::time::sleep(d).await; }
        let res = if self.take_write_failure() {
            Err(StorageError::write(key, "injected write failure"))
        } else {
            self.values.lock().insert(key.to_string(), value.to_string());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        res
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.take_write_failure() {
            return Err(StorageError::write(key, "injected write failure"));
        }
        self.values.lock().remove(key);
        Ok(())
    }
}
