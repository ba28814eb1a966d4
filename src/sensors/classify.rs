//! Pure classification of raw sensor readings.
//!
//! No state, no I/O. The dispensing eligibility policy depends on these
//! outputs, so they are kept trivially testable.

use core::fmt;

use serde::Serialize;

use crate::config::FeederConfig;

/// Fill level of the food container, derived from ultrasonic distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FoodLevel {
    Full,
    Half,
    Empty,
}

impl FoodLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Half => "HALF",
            Self::Empty => "EMPTY",
        }
    }
}

impl fmt::Display for FoodLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill state of the bowl, derived from load-cell weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BowlStatus {
    Empty,
    Partial,
    Full,
}

impl BowlStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::Partial => "PARTIAL",
            Self::Full => "FULL",
        }
    }
}

impl fmt::Display for BowlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map sensor-to-food distance (cm) to a container level.
///
/// The band between the half and empty thresholds is treated as HALF:
/// low, but still dispensable.
pub fn classify_food_level(distance_cm: f32, config: &FeederConfig) -> FoodLevel {
    if distance_cm <= config.food_full_cm {
        FoodLevel::Full
    } else if distance_cm <= config.food_half_cm {
        FoodLevel::Half
    } else if distance_cm > config.food_empty_cm {
        FoodLevel::Empty
    } else {
        FoodLevel::Half
    }
}

/// Map bowl weight (g) to a bowl status.
pub fn classify_bowl(weight_g: f32, config: &FeederConfig) -> BowlStatus {
    if weight_g <= config.bowl_empty_g {
        BowlStatus::Empty
    } else if weight_g >= config.bowl_full_g {
        BowlStatus::Full
    } else {
        BowlStatus::Partial
    }
}
