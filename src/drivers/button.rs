//! Polled, debounced push-button driver.
//!
//! ## Hardware
//!
//! Active-low momentary switch on an input with the internal pull-up.
//! `tick()` is called from the control loop; it samples the pin and runs
//! the debounce state machine.  A press is reported once, when the
//! contact has read closed for [`DEBOUNCE_MS`].  The button must then read
//! open for the same time before another press can register.

use crate::drivers::hw_init;

pub const DEBOUNCE_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Released,
    Closing { since_ms: u64 },
    Held,
    Opening { since_ms: u64 },
}

pub struct ButtonDriver {
    gpio: i32,
    state: DebounceState,
}

impl ButtonDriver {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            state: DebounceState::Released,
        }
    }

    /// GPIO pin this button is attached to.
    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Sample the pin.  Returns `true` on a debounced press.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let closed = !hw_init::gpio_read(self.gpio);
        self.update(closed, now_ms)
    }

    /// Feed one raw sample (`closed` = contact made).
    pub fn update(&mut self, closed: bool, now_ms: u64) -> bool {
        match self.state {
            DebounceState::Released => {
                if closed {
                    self.state = DebounceState::Closing { since_ms: now_ms };
                }
                false
            }
            DebounceState::Closing { since_ms } => {
                if !closed {
                    self.state = DebounceState::Released;
                    false
                } else if now_ms.saturating_sub(since_ms) >= DEBOUNCE_MS {
                    self.state = DebounceState::Held;
                    true
                } else {
                    false
                }
            }
            DebounceState::Held => {
                if !closed {
                    self.state = DebounceState::Opening { since_ms: now_ms };
                }
                false
            }
            DebounceState::Opening { since_ms } => {
                if closed {
                    self.state = DebounceState::Held;
                } else if now_ms.saturating_sub(since_ms) >= DEBOUNCE_MS {
                    self.state = DebounceState::Released;
                }
                false
            }
        }
    }

    pub fn is_held(&self) -> bool {
        matches!(self.state, DebounceState::Held | DebounceState::Opening { .. })
    }
}
