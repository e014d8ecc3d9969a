use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current epoch time, injected so that tests can drive the
/// agent's notion of "now" without sleeping.
pub trait EpochClock: Send {
    fn now_ms(&self) -> i64;
}

/// Real clock backed by `SystemTime::now()`.
pub struct SystemEpochClock;

impl EpochClock for SystemEpochClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Test clock whose value is set explicitly by the test driving the agent.
/// Backed by an `AtomicI64` rather than a `Cell` so a test can keep an
/// `Arc<ManualEpochClock>` handle to advance time after handing the agent
/// its own `Arc` (which also implements `EpochClock`).
#[cfg(test)]
pub struct ManualEpochClock {
    now_ms: std::sync::atomic::AtomicI64,
}

#[cfg(test)]
impl ManualEpochClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: std::sync::atomic::AtomicI64::new(now_ms),
        }
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl EpochClock for ManualEpochClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl EpochClock for std::sync::Arc<ManualEpochClock> {
    fn now_ms(&self) -> i64 {
        ManualEpochClock::now_ms(self)
    }
}
