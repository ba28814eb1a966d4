//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod button;
pub mod buzzer;
pub mod hw_init;
pub mod pulse;
pub mod servo;
pub mod status_led;
