//! Active piezo buzzer on a plain GPIO.

use crate::drivers::hw_init;

pub struct Buzzer {
    gpio: i32,
    on: bool,
}

impl Buzzer {
    pub fn new(gpio: i32) -> Self {
        Self { gpio, on: false }
    }

    /// Only touches the pin on a change.
    pub fn set(&mut self, on: bool) {
        if on != self.on {
            hw_init::gpio_write(self.gpio, on);
            self.on = on;
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
