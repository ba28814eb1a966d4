//! SG90 dispenser servo on LEDC channel 0.
//!
//! Open loop: the driver writes the duty for the requested angle and
//! remembers it.  Movement timing is the dispensing FSM's business.

use log::debug;

use super::hw_init::{self, LEDC_CH_SERVO, SERVO_MAX_DUTY};

const MIN_PULSE_US: u32 = 500; // 0°
const MAX_PULSE_US: u32 = 2500; // 180°
const PERIOD_US: u32 = 20_000; // 50 Hz

pub struct Servo {
    channel: u32,
    max_duty: u32,
    angle: Option<u8>,
}

impl Servo {
    pub fn new() -> Self {
        Self {
            channel: LEDC_CH_SERVO,
            max_duty: SERVO_MAX_DUTY,
            angle: None,
        }
    }

    /// Command an absolute angle, clamped to 0–180°.
    pub fn set_angle(&mut self, angle: u8) {
        let angle = angle.min(180);
        let duty = angle_to_duty(angle, self.max_duty);
        hw_init::ledc_set(self.channel, duty);
        if self.angle != Some(angle) {
            debug!("servo: {}° (duty {})", angle, duty);
        }
        self.angle = Some(angle);
    }

    /// Last commanded angle, `None` before the first command.
    pub fn angle(&self) -> Option<u8> {
        self.angle
    }

    /// Stop driving the signal line; the horn holds by friction only.
    pub fn release(&mut self) {
        hw_init::ledc_set(self.channel, 0);
        self.angle = None;
    }
}

impl Default for Servo {
    fn default() -> Self {
        Self::new()
    }
}

fn angle_to_duty(angle: u8, max_duty: u32) -> u32 {
    let pulse_us = MIN_PULSE_US + (u32::from(angle) * (MAX_PULSE_US - MIN_PULSE_US)) / 180;
    pulse_us * max_duty / PERIOD_US
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_endpoints() {
        // 0.5 ms and 2.5 ms of a 20 ms frame.
        assert_eq!(angle_to_duty(0, 20_000), 500);
        assert_eq!(angle_to_duty(90, 20_000), 1500);
        assert_eq!(angle_to_duty(180, 20_000), 2500);
    }

    #[test]
    fn clamps_and_tracks_angle() {
        let mut s = Servo::new();
        assert_eq!(s.angle(), None);
        s.set_angle(45);
        assert_eq!(s.angle(), Some(45));
        s.set_angle(250);
        assert_eq!(s.angle(), Some(180));
        s.release();
        assert_eq!(s.angle(), None);
    }
}
