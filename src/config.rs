//! Feeder configuration parameters
//!
//! All tunable constants for the dispenser, schedule, sensors and reporting.
//! Built once at start-up and immutable afterwards; nothing is persisted.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum number of daily schedule entries.
pub const MAX_SCHEDULE_ENTRIES: usize = 4;

/// Minutes in one calendar day.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Core feeder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeederConfig {
    // --- Portions ---
    /// Grams released per accepted dispense request
    pub portion_grams: u32,
    /// Daily cap for manual and scheduled feeding (grams)
    pub max_daily_grams: u32,
    /// Minimum gap between two local feedings (milliseconds)
    pub min_feeding_interval_ms: u64,

    // --- Dispenser mechanics ---
    /// Number of open/close cycles per dispense
    pub dispense_cycles: u8,
    /// Servo angle that opens the chute (degrees)
    pub dispense_angle_deg: u8,
    /// Servo angle that closes the chute (degrees)
    pub rest_angle_deg: u8,
    /// Time held at the dispense angle (milliseconds)
    pub dispense_hold_ms: u32,
    /// Time allowed for the return to rest (milliseconds)
    pub rest_settle_ms: u32,
    /// Pause between two cycles (milliseconds)
    pub inter_cycle_pause_ms: u32,

    // --- Schedule ---
    /// Feeding times as minutes since midnight, ascending
    pub schedule_minutes: Vec<u16, MAX_SCHEDULE_ENTRIES>,
    /// Scheduled feeding enabled at boot
    pub auto_feeding_enabled: bool,

    // --- Food container (ultrasonic distance, cm) ---
    pub food_full_cm: f32,
    pub food_half_cm: f32,
    pub food_empty_cm: f32,

    // --- Bowl (load cell, grams) ---
    pub bowl_empty_g: f32,
    pub bowl_full_g: f32,

    // --- Presence ---
    /// Motion stays "present" this long after the last PIR trigger
    pub pir_timeout_ms: u32,

    // --- Cadences (milliseconds) ---
    pub ultrasonic_poll_ms: u32,
    pub weight_poll_ms: u32,
    pub motion_poll_ms: u32,
    pub clock_poll_ms: u32,
    pub display_refresh_ms: u32,
    pub telemetry_interval_ms: u32,

    // --- Time & identity ---
    /// Local time offset from UTC (minutes)
    pub utc_offset_minutes: i16,
    /// Device identity used in telemetry and MQTT topics
    pub device_id: String<32>,
}

impl Default for FeederConfig {
    fn default() -> Self {
        let mut schedule_minutes = Vec::new();
        for minute in [480, 720, 1080, 1320] {
            // 08:00, 12:00, 18:00, 22:00; capacity is exactly four.
            let _ = schedule_minutes.push(minute);
        }
        let mut device_id = String::new();
        let _ = device_id.push_str("petfeeder-01");

        Self {
            // Portions
            portion_grams: 25,
            max_daily_grams: 200,
            min_feeding_interval_ms: 5 * 60 * 1000,

            // Dispenser
            dispense_cycles: 3,
            dispense_angle_deg: 45,
            rest_angle_deg: 90,
            dispense_hold_ms: 700,
            rest_settle_ms: 200,
            inter_cycle_pause_ms: 1000,

            // Schedule
            schedule_minutes,
            auto_feeding_enabled: true,

            // Container thresholds
            food_full_cm: 9.0,
            food_half_cm: 13.5,
            food_empty_cm: 18.0,

            // Bowl thresholds
            bowl_empty_g: 10.0,
            bowl_full_g: 200.0,

            // Presence
            pir_timeout_ms: 30_000,

            // Cadences
            ultrasonic_poll_ms: 1000,
            weight_poll_ms: 500,
            motion_poll_ms: 100,
            clock_poll_ms: 1000,
            display_refresh_ms: 1000,
            telemetry_interval_ms: 30_000,

            // Philippine Standard Time
            utc_offset_minutes: 8 * 60,
            device_id,
        }
    }
}

impl FeederConfig {
    /// Reject configurations the controller cannot run safely.
    pub fn validate(&self) -> Result<()> {
        if self.portion_grams == 0 {
            return Err(Error::Config("portion_grams must be > 0"));
        }
        if self.max_daily_grams < self.portion_grams {
            return Err(Error::Config("max_daily_grams below one portion"));
        }
        if self.dispense_cycles == 0 {
            return Err(Error::Config("dispense_cycles must be > 0"));
        }
        if self.dispense_angle_deg > 180 || self.rest_angle_deg > 180 {
            return Err(Error::Config("servo angle above 180"));
        }
        if self.schedule_minutes.iter().any(|&m| m >= MINUTES_PER_DAY) {
            return Err(Error::Config("schedule entry past midnight"));
        }
        if self.schedule_minutes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::Config("schedule must be strictly ascending"));
        }
        if !(self.food_full_cm < self.food_half_cm && self.food_half_cm < self.food_empty_cm) {
            return Err(Error::Config("food distance thresholds out of order"));
        }
        if self.bowl_empty_g >= self.bowl_full_g {
            return Err(Error::Config("bowl weight thresholds out of order"));
        }
        if self.telemetry_interval_ms == 0 {
            return Err(Error::Config("telemetry_interval_ms must be > 0"));
        }
        Ok(())
    }

    /// Wall-clock length of one full dispense sequence (milliseconds).
    pub fn dispense_duration_ms(&self) -> u64 {
        let cycles = u64::from(self.dispense_cycles);
        let cycle = u64::from(self.dispense_hold_ms) + u64::from(self.rest_settle_ms);
        cycles * cycle + cycles.saturating_sub(1) * u64::from(self.inter_cycle_pause_ms)
    }
}
