//! Sensor subsystem: drivers, classifiers and the polling [`SensorHub`].
//!
//! The hub reads each sensor through [`SensorPort`] on its own cadence and
//! folds the results into a [`SensorSnapshot`].  It is the only writer of
//! the snapshot; the dispensing controller and scheduler only read it.

pub mod classify;
pub mod load_cell;
pub mod motion;
pub mod ultrasonic;

use log::{debug, warn};
use serde::Serialize;

pub use classify::{classify_bowl, classify_food_level, BowlStatus, FoodLevel};
use motion::MotionDebounce;

use crate::app::ports::SensorPort;
use crate::config::FeederConfig;

/// Latest classified readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSnapshot {
    /// Container level.  Starts EMPTY until the first good distance reading.
    pub food_level: FoodLevel,
    pub bowl_status: BowlStatus,
    pub weight_grams: f32,
    pub distance_cm: f32,
    /// PIR presence after the hold-off.
    pub motion_present: bool,
    /// Last ultrasonic read succeeded.
    pub distance_ok: bool,
    /// Last load-cell read succeeded.
    pub weight_ok: bool,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            food_level: FoodLevel::Empty,
            bowl_status: BowlStatus::Empty,
            weight_grams: 0.0,
            distance_cm: 0.0,
            motion_present: false,
            distance_ok: false,
            weight_ok: false,
        }
    }
}

/// What changed during one [`SensorHub::poll`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorChanges {
    pub food_level: Option<FoodLevel>,
    pub bowl_status: Option<BowlStatus>,
    pub motion: Option<bool>,
}

impl SensorChanges {
    pub fn any(&self) -> bool {
        self.food_level.is_some() || self.bowl_status.is_some() || self.motion.is_some()
    }
}

/// Polls every sensor on its configured cadence.
pub struct SensorHub {
    next_distance_ms: u64,
    next_weight_ms: u64,
    next_motion_ms: u64,
    motion: MotionDebounce,
}

impl SensorHub {
    pub fn new(config: &FeederConfig) -> Self {
        Self {
            next_distance_ms: 0,
            next_weight_ms: 0,
            next_motion_ms: 0,
            motion: MotionDebounce::new(config.pir_timeout_ms),
        }
    }

    /// Read whichever sensors are due and update `snap` in place.
    ///
    /// A failed read keeps the previous classification and clears the
    /// matching `*_ok` flag; it never aborts the poll.
    pub fn poll(
        &mut self,
        now_ms: u64,
        port: &mut impl SensorPort,
        config: &FeederConfig,
        snap: &mut SensorSnapshot,
    ) -> SensorChanges {
        let mut changes = SensorChanges::default();

        if now_ms >= self.next_distance_ms {
            self.next_distance_ms = now_ms + u64::from(config.ultrasonic_poll_ms);
            match port.read_distance_cm() {
                Ok(cm) => {
                    snap.distance_cm = cm;
                    snap.distance_ok = true;
                    let level = classify_food_level(cm, config);
                    if level != snap.food_level {
                        debug!("Sensors: food level {} -> {} ({:.1} cm)", snap.food_level, level, cm);
                        snap.food_level = level;
                        changes.food_level = Some(level);
                    }
                }
                Err(e) => {
                    if snap.distance_ok {
                        warn!("Sensors: ultrasonic read failed ({}), keeping {}", e, snap.food_level);
                    }
                    snap.distance_ok = false;
                }
            }
        }

        if now_ms >= self.next_weight_ms {
            self.next_weight_ms = now_ms + u64::from(config.weight_poll_ms);
            match port.read_weight_grams() {
                Ok(g) => {
                    snap.weight_grams = g;
                    snap.weight_ok = true;
                    let status = classify_bowl(g, config);
                    if status != snap.bowl_status {
                        debug!("Sensors: bowl {} -> {} ({:.1} g)", snap.bowl_status, status, g);
                        snap.bowl_status = status;
                        changes.bowl_status = Some(status);
                    }
                }
                Err(e) => {
                    if snap.weight_ok {
                        warn!("Sensors: load cell read failed ({}), keeping {}", e, snap.bowl_status);
                    }
                    snap.weight_ok = false;
                }
            }
        }

        if now_ms >= self.next_motion_ms {
            self.next_motion_ms = now_ms + u64::from(config.motion_poll_ms);
            let raw = port.motion_detected();
            let present = self.motion.update(raw, now_ms);
            if present != snap.motion_present {
                snap.motion_present = present;
                changes.motion = Some(present);
            }
        }

        changes
    }
}
