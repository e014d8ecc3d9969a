use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

pub const NULL_VALUE: i64 = -1;
pub const NULL_POSITION: i64 = -1;
pub const NULL_COUNTER_ID: i32 = -1;

/// A single published, externally-observable counter.
///
/// Writes use release ordering so that any thread observing a new value via
/// `load` (acquire) is guaranteed to see everything that happened-before the
/// write on the writer's thread, per spec §5.
#[derive(Clone)]
pub struct Counter {
    value: Arc<AtomicI64>,
}

impl Counter {
    pub fn new(initial: i64) -> Self {
        Self {
            value: Arc::new(AtomicI64::new(initial)),
        }
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Stores `value` iff it is greater than the current value. Returns
    /// whether the counter was updated.
    pub fn set_max(&self, value: i64) -> bool {
        loop {
            let current = self.value.load(Ordering::Acquire);
            if value <= current {
                return false;
            }
            if self
                .value
                .compare_exchange(current, value, Ordering::Release, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }
}

/// Published counters: the state counter, the live-log position, and the
/// next-query deadline, plus an open-ended table for per-recording progress
/// counters (e.g. the live-log recording-position counter keyed by the
/// archive's counter id) used to simulate the "counters registry" that the
/// real system backs with a shared-memory file.
///
/// `Clone` is cheap (every field is an `Arc`) and is what lets an
/// `ArchiveClient` implementation share the same registry as the `Agent`
/// that reads it, the same way a real archive media driver and this agent
/// would both map the same counters file.
#[derive(Clone)]
pub struct CountersManager {
    state: Counter,
    live_log_position: Counter,
    next_query_deadline_ms: Counter,

    recording_counters: Arc<Mutex<HashMap<i32, Counter>>>,
    next_counter_id: Arc<AtomicI64>,
}

impl CountersManager {
    pub fn new() -> Self {
        Self {
            state: Counter::new(0),
            live_log_position: Counter::new(0),
            next_query_deadline_ms: Counter::new(NULL_VALUE),
            recording_counters: Arc::new(Mutex::new(HashMap::new())),
            next_counter_id: Arc::new(AtomicI64::new(1)),
        }
    }

    pub fn state_counter(&self) -> &Counter {
        &self.state
    }

    pub fn live_log_position_counter(&self) -> &Counter {
        &self.live_log_position
    }

    pub fn next_query_deadline_counter(&self) -> &Counter {
        &self.next_query_deadline_ms
    }

    /// Allocates a new recording-position counter and returns its id. Used by
    /// the (fake) archive client when it starts recording a replayed stream.
    pub fn allocate_recording_counter(&self, initial_position: i64) -> i32 {
        let id = self.next_counter_id.fetch_add(1, Ordering::Relaxed) as i32;
        self.recording_counters
            .lock()
            .unwrap()
            .insert(id, Counter::new(initial_position));
        id
    }

    pub fn recording_counter_value(&self, counter_id: i32) -> Option<i64> {
        self.recording_counters
            .lock()
            .unwrap()
            .get(&counter_id)
            .map(|c| c.get())
    }

    pub fn set_recording_counter_value(&self, counter_id: i32, value: i64) {
        if let Some(c) = self.recording_counters.lock().unwrap().get(&counter_id) {
            c.set(value);
        }
    }

    /// Simulates the counter disappearing (e.g. because the archive process
    /// that owned it died).
    pub fn remove_recording_counter(&self, counter_id: i32) {
        self.recording_counters.lock().unwrap().remove(&counter_id);
    }

    pub fn counter_exists(&self, counter_id: i32) -> bool {
        self.recording_counters.lock().unwrap().contains_key(&counter_id)
    }
}

impl Default for CountersManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_max_is_monotonic() {
        let c = Counter::new(0);
        assert!(c.set_max(5));
        assert_eq!(c.get(), 5);
        assert!(!c.set_max(3));
        assert_eq!(c.get(), 5);
        assert!(c.set_max(10));
        assert_eq!(c.get(), 10);
    }

    #[test]
    fn recording_counter_lifecycle() {
        let mgr = CountersManager::new();
        let id = mgr.allocate_recording_counter(100);
        assert_eq!(mgr.recording_counter_value(id), Some(100));
        mgr.set_recording_counter_value(id, 200);
        assert_eq!(mgr.recording_counter_value(id), Some(200));
        mgr.remove_recording_counter(id);
        assert_eq!(mgr.recording_counter_value(id), None);
        assert!(!mgr.counter_exists(id));
    }

    #[test]
    fn cloned_handle_observes_same_counters() {
        let mgr = CountersManager::new();
        let writer = mgr.clone();

        writer.state_counter().set_max(3);
        writer.live_log_position_counter().set_max(7);
        let id = writer.allocate_recording_counter(1);

        assert_eq!(mgr.state_counter().get(), 3);
        assert_eq!(mgr.live_log_position_counter().get(), 7);
        assert_eq!(mgr.recording_counter_value(id), Some(1));

        writer.live_log_position_counter().set_max(9);
        assert_eq!(mgr.live_log_position_counter().get(), 9);
    }
}
