//! RGB status LED driver.
//!
//! Three plain GPIOs drive the discrete R/G/B dies (common cathode).  The
//! LED is on/off per channel: any non-zero component lights its die.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: writes the three GPIOs via hw_init.
//! On host/test: tracks state in-memory only.

use crate::app::feedback::{Rgb, OFF};
use crate::drivers::hw_init;
use crate::pins;

pub struct StatusLed {
    current: Rgb,
}

impl StatusLed {
    pub fn new() -> Self {
        Self { current: OFF }
    }

    pub fn set_colour(&mut self, colour: Rgb) {
        if colour == self.current {
            return;
        }
        hw_init::gpio_write(pins::LED_R_GPIO, colour.r > 0);
        hw_init::gpio_write(pins::LED_G_GPIO, colour.g > 0);
        hw_init::gpio_write(pins::LED_B_GPIO, colour.b > 0);
        self.current = colour;
    }

    pub fn off(&mut self) {
        self.set_colour(OFF);
    }

    pub fn current_colour(&self) -> Rgb {
        self.current
    }
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}
