//! PIR presence hold-off.
//!
//! The HC-SR501 output toggles while an animal moves around the bowl.  A
//! single positive sample keeps "present" asserted for `timeout_ms`.

/// Debounced presence tracker.
#[derive(Debug, Clone, Copy)]
pub struct MotionDebounce {
    last_seen_ms: Option<u64>,
    timeout_ms: u64,
}

impl MotionDebounce {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            last_seen_ms: None,
            timeout_ms: u64::from(timeout_ms),
        }
    }

    /// Feed one raw PIR sample; returns the debounced presence.
    pub fn update(&mut self, raw: bool, now_ms: u64) -> bool {
        if raw {
            self.last_seen_ms = Some(now_ms);
        }
        self.present(now_ms)
    }

    /// Presence at `now_ms` without a new sample.
    pub fn present(&self, now_ms: u64) -> bool {
        self.last_seen_ms
            .is_some_and(|seen| now_ms.saturating_sub(seen) <= self.timeout_ms)
    }
}
