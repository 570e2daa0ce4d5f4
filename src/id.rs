use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh item ids. Injected into the store so tests can use
/// predictable ids; implementations must never hand out the same value twice.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs. The default.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String { uuid::Uuid::new_v4().to_string() }
}

/// Monotonic counter ids: "1", "2", "3", ...
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn starting_at(first: u64) -> Self { Self { next: AtomicU64::new(first) } }
}

impl Default for SequentialIds {
    fn default() -> Self { Self::starting_at(1) }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String { self.next.fetch_add(1, Ordering::Relaxed).to_string() }
}
