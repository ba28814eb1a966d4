//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the sensor drivers, the servo and the indicator chain, exposing
//! them through [`SensorPort`], [`ActuatorPort`] and [`IndicatorPort`].
//! This is the only module in the system that touches actual hardware.
//! On non-espidf targets, the underlying drivers use cfg-gated simulation
//! stubs.

use heapless::Vec;
use log::{error, info, warn};

use crate::app::commands::AppCommand;
use crate::app::feedback::{PulsePattern, Rgb};
use crate::app::ports::{ActuatorPort, IndicatorPort, SensorPort};
use crate::drivers::button::ButtonDriver;
use crate::drivers::buzzer::Buzzer;
use crate::drivers::hw_init::{self, BootClock, GpioIn, GpioOut, SysDelay};
use crate::drivers::pulse::PulseEngine;
use crate::drivers::servo::Servo;
use crate::drivers::status_led::StatusLed;
use crate::error::{Result, SensorError};
use crate::feeding::Origin;
use crate::pins;
use crate::sensors::load_cell::{Hx711, DEFAULT_COUNTS_PER_GRAM, SAMPLES_PER_READ};
use crate::sensors::ultrasonic::Ultrasonic;

type FoodRanger = Ultrasonic<GpioOut, GpioIn, BootClock, SysDelay>;
type BowlScale = Hx711<GpioIn, GpioOut, SysDelay>;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    ranger: FoodRanger,
    scale: BowlScale,
    pir: GpioIn,
    servo: Servo,
    led: StatusLed,
    buzzer: Buzzer,
    pulses: PulseEngine,
    refill_button: ButtonDriver,
    feed_button: ButtonDriver,
}

impl HardwareAdapter {
    /// Configure the board pins, build the drivers and tare the scale.
    ///
    /// The bowl must be empty at power-on for the tare to be meaningful.
    /// Only pin configuration is fatal; a failed tare is logged.
    pub fn new() -> Result<Self> {
        hw_init::init_peripherals().inspect_err(|e| error!("HW: {}", e))?;

        let ranger = Ultrasonic::new(
            GpioOut(pins::ULTRASONIC_TRIG_GPIO),
            GpioIn(pins::ULTRASONIC_ECHO_GPIO),
            BootClock,
            SysDelay,
        );
        let scale = Hx711::new(
            GpioIn(pins::HX711_DOUT_GPIO),
            GpioOut(pins::HX711_SCK_GPIO),
            SysDelay,
            DEFAULT_COUNTS_PER_GRAM,
        );
        let mut hw = Self {
            ranger,
            scale,
            pir: GpioIn(pins::PIR_GPIO),
            servo: Servo::new(),
            led: StatusLed::new(),
            buzzer: Buzzer::new(pins::BUZZER_GPIO),
            pulses: PulseEngine::new(),
            refill_button: ButtonDriver::new(pins::BUTTON_REFILL_GPIO),
            feed_button: ButtonDriver::new(pins::BUTTON_FEED_GPIO),
        };
        if let Err(e) = hw.tare() {
            warn!("HW: {} at tare, reading from raw offset 0", e);
        }
        info!("HW: adapter ready");
        Ok(hw)
    }

    /// Zero the scale on the current load.
    pub fn tare(&mut self) -> Result<()> {
        self.scale.tare(SAMPLES_PER_READ)?;
        Ok(())
    }

    /// Advance the pulse engine and drive the LED and buzzer.
    pub fn tick_indicators(&mut self, now_ms: u64) {
        let out = self.pulses.tick(now_ms);
        self.led.set_colour(out.colour);
        self.buzzer.set(out.buzzer);
    }

    /// Sample both front-panel buttons.
    pub fn poll_buttons(&mut self, now_ms: u64) -> Vec<AppCommand, 2> {
        let mut cmds = Vec::new();
        if self.refill_button.tick(now_ms) {
            let _ = cmds.push(AppCommand::ToggleRefillMode);
        }
        if self.feed_button.tick(now_ms) {
            let _ = cmds.push(AppCommand::Dispense(Origin::Manual));
        }
        cmds
    }

    pub fn servo_angle(&self) -> Option<u8> {
        self.servo.angle()
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_distance_cm(&mut self) -> core::result::Result<f32, SensorError> {
        self.ranger.measure_cm()
    }

    fn read_weight_grams(&mut self) -> core::result::Result<f32, SensorError> {
        self.scale.read_grams(SAMPLES_PER_READ)
    }

    fn motion_detected(&mut self) -> bool {
        hw_init::gpio_read(self.pir.0)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn set_angle(&mut self, degrees: u8) {
        self.servo.set_angle(degrees);
    }
}

// ── IndicatorPort implementation ──────────────────────────────

impl IndicatorPort for HardwareAdapter {
    fn pulse(&mut self, pattern: PulsePattern) {
        self.pulses.enqueue(pattern);
    }

    fn set_ambient(&mut self, colour: Rgb) {
        self.pulses.set_ambient(colour);
    }
}
