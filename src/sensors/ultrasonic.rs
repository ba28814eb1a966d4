//! HC-SR04 ultrasonic distance sensor.
//!
//! Mounted in the lid of the food container, pointing down.  Larger
//! distance means less food.
//!
//! Ranging itself (trigger burst, echo timing, speed-of-sound correction)
//! is done by `hcsr04_async`.  This wrapper blocks on one measurement and
//! rejects readings outside the sensor's rated range.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::digital::Wait;
use hcsr04_async::{Config, DistanceUnit, Hcsr04, Now, TemperatureUnit};

use crate::error::SensorError;

/// The container is indoors; a fixed temperature is close enough.
const AMBIENT_TEMPERATURE_C: f64 = 20.0;
/// Beyond the HC-SR04's rated range.
const MAX_RANGE_CM: f32 = 400.0;

/// Food-level ranger on one trigger/echo pair.
pub struct Ultrasonic<T, E, C, D> {
    sensor: Hcsr04<T, E, C, D>,
}

impl<T, E, C, D> Ultrasonic<T, E, C, D>
where
    T: OutputPin,
    E: InputPin + Wait,
    C: Now,
    D: DelayNs + embedded_hal::delay::DelayNs,
{
    pub fn new(trig: T, echo: E, clock: C, delay: D) -> Self {
        let config = Config {
            distance_unit: DistanceUnit::Centimeters,
            temperature_unit: TemperatureUnit::Celsius,
        };
        Self {
            sensor: Hcsr04::new(trig, echo, config, clock, delay),
        }
    }

    /// Fire one ranging burst and return the distance in centimetres.
    pub fn measure_cm(&mut self) -> Result<f32, SensorError> {
        let reading = futures_lite::future::block_on(self.sensor.measure(AMBIENT_TEMPERATURE_C));
        validate_cm(reading.map(|cm| cm as f32).map_err(|_| SensorError::EchoTimeout))
    }
}

/// Reject readings a healthy sensor cannot produce.
pub fn validate_cm(reading: Result<f32, SensorError>) -> Result<f32, SensorError> {
    let cm = reading?;
    if !cm.is_finite() || cm <= 0.0 || cm > MAX_RANGE_CM {
        return Err(SensorError::OutOfRange);
    }
    Ok(cm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_reading_passes() {
        assert_eq!(validate_cm(Ok(10.0)), Ok(10.0));
        assert_eq!(validate_cm(Ok(MAX_RANGE_CM)), Ok(MAX_RANGE_CM));
    }

    #[test]
    fn impossible_readings_rejected() {
        for cm in [0.0, -3.0, 400.5, f32::NAN, f32::INFINITY] {
            assert_eq!(validate_cm(Ok(cm)), Err(SensorError::OutOfRange), "{cm}");
        }
    }

    #[test]
    fn driver_failure_passes_through() {
        assert_eq!(validate_cm(Err(SensorError::EchoTimeout)), Err(SensorError::EchoTimeout));
    }
}
