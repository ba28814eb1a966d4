//! Indicator vocabulary: colours and pulse trains.
//!
//! The domain only names *what* the operator should see or hear; the
//! pulse engine in [`crate::drivers::pulse`] decides how to play it
//! without blocking the control loop.

/// Status LED colour, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn is_off(self) -> bool {
        self == OFF
    }
}

pub const OFF: Rgb = Rgb::new(0, 0, 0);
pub const GREEN: Rgb = Rgb::new(0, 255, 0);
pub const BLUE: Rgb = Rgb::new(0, 0, 255);
pub const RED: Rgb = Rgb::new(255, 0, 0);
pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
pub const WHITE: Rgb = Rgb::new(255, 255, 255);

/// A finite train of identical pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulsePattern {
    pub count: u8,
    pub on_ms: u16,
    pub off_ms: u16,
    pub colour: Rgb,
    /// Sound the buzzer during each ON phase.
    pub buzzer: bool,
}

impl PulsePattern {
    /// Wall time from first ON edge to the end of the last ON phase.
    pub fn duration_ms(&self) -> u32 {
        let n = u32::from(self.count);
        if n == 0 {
            return 0;
        }
        n * u32::from(self.on_ms) + (n - 1) * u32::from(self.off_ms)
    }
}

/// Servo left a stop: rest → dispense or dispense → rest.
pub const MOVEMENT: PulsePattern = PulsePattern {
    count: 1,
    on_ms: 200,
    off_ms: 0,
    colour: BLUE,
    buzzer: true,
};

/// Dispense sequence finished.
pub const COMPLETION: PulsePattern = PulsePattern {
    count: 3,
    on_ms: 150,
    off_ms: 150,
    colour: GREEN,
    buzzer: true,
};

/// Any button press.
pub const BUTTON_ACK: PulsePattern = PulsePattern {
    count: 1,
    on_ms: 100,
    off_ms: 0,
    colour: WHITE,
    buzzer: true,
};

/// Manual request refused.
pub const DANGER: PulsePattern = PulsePattern {
    count: 5,
    on_ms: 100,
    off_ms: 100,
    colour: RED,
    buzzer: true,
};

pub const REFILL_ENTER: PulsePattern = PulsePattern {
    count: 3,
    on_ms: 100,
    off_ms: 100,
    colour: YELLOW,
    buzzer: true,
};

pub const REFILL_EXIT: PulsePattern = PulsePattern {
    count: 1,
    on_ms: 500,
    off_ms: 0,
    colour: GREEN,
    buzzer: true,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(MOVEMENT.duration_ms(), 200);
        assert_eq!(COMPLETION.duration_ms(), 750);
        assert_eq!(DANGER.duration_ms(), 900);
        let silent = PulsePattern { count: 0, ..DANGER };
        assert_eq!(silent.duration_ms(), 0);
    }
}
