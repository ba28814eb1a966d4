//! Pulse-train engine for the status LED and buzzer.
//!
//! Generates the indicator output for each control tick.  The main loop
//! calls `tick()` with the current monotonic time and feeds the result to
//! [`StatusLed`](super::status_led::StatusLed) and
//! [`Buzzer`](super::buzzer::Buzzer).
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Pulse train**: the oldest queued [`PulsePattern`] plays to completion
//! 2. **Ambient**: solid colour for food level or refill mode, buzzer silent
//!
//! Patterns queue behind each other; nothing blocks the caller.

use heapless::Deque;
use log::debug;

use crate::app::feedback::{PulsePattern, Rgb, OFF};

const QUEUE_DEPTH: usize = 8;

/// One tick's worth of indicator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorOutput {
    pub colour: Rgb,
    pub buzzer: bool,
}

/// Stack-allocated, no heap.
pub struct PulseEngine {
    ambient: Rgb,
    queue: Deque<PulsePattern, QUEUE_DEPTH>,
    active: Option<(PulsePattern, u64)>,
}

impl PulseEngine {
    pub fn new() -> Self {
        Self {
            ambient: OFF,
            queue: Deque::new(),
            active: None,
        }
    }

    /// Queue a train.  A full queue drops the new pattern.
    pub fn enqueue(&mut self, pattern: PulsePattern) {
        if pattern.count == 0 {
            return;
        }
        if self.queue.push_back(pattern).is_err() {
            debug!("pulse: queue full, pattern dropped");
        }
    }

    pub fn set_ambient(&mut self, colour: Rgb) {
        self.ambient = colour;
    }

    /// A train is playing or waiting.
    pub fn is_busy(&self) -> bool {
        self.active.is_some() || !self.queue.is_empty()
    }

    /// Advance to `now_ms` and return what the LED and buzzer should show.
    pub fn tick(&mut self, now_ms: u64) -> IndicatorOutput {
        loop {
            let (pattern, started) = match self.active {
                Some(a) => a,
                None => match self.queue.pop_front() {
                    Some(next) => {
                        self.active = Some((next, now_ms));
                        (next, now_ms)
                    }
                    None => {
                        return IndicatorOutput {
                            colour: self.ambient,
                            buzzer: false,
                        };
                    }
                },
            };

            let elapsed = now_ms.saturating_sub(started);
            if elapsed >= u64::from(pattern.duration_ms()) {
                self.active = None;
                continue;
            }

            let period = u64::from(pattern.on_ms) + u64::from(pattern.off_ms);
            let on = elapsed % period.max(1) < u64::from(pattern.on_ms);
            return if on {
                IndicatorOutput {
                    colour: pattern.colour,
                    buzzer: pattern.buzzer,
                }
            } else {
                IndicatorOutput {
                    colour: OFF,
                    buzzer: false,
                }
            };
        }
    }
}

impl Default for PulseEngine {
    fn default() -> Self {
        Self::new()
    }
}
