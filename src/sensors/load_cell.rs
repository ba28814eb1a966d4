//! HX711 load-cell amplifier under the food bowl.
//!
//! Bit-banged 24-bit two's-complement readout on channel A, gain 128
//! (25 SCK pulses per conversion).  DOUT goes LOW when a conversion is
//! ready; a read attempted before that returns
//! [`SensorError::LoadCellNotReady`] instead of blocking the control loop.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;

/// Raw counts per gram for the 5 kg bar cell fitted to the bowl.
pub const DEFAULT_COUNTS_PER_GRAM: f32 = 48.4;

/// Conversions averaged per weight sample.
pub const SAMPLES_PER_READ: u8 = 10;

pub struct Hx711<DT, SCK, D> {
    dout: DT,
    sck: SCK,
    delay: D,
    offset: i32,
    counts_per_gram: f32,
}

impl<DT, SCK, D> Hx711<DT, SCK, D>
where
    DT: InputPin,
    SCK: OutputPin,
    D: DelayNs,
{
    pub fn new(dout: DT, sck: SCK, delay: D, counts_per_gram: f32) -> Self {
        Self {
            dout,
            sck,
            delay,
            offset: 0,
            counts_per_gram,
        }
    }

    /// `true` when a conversion is waiting to be clocked out.
    pub fn is_ready(&mut self) -> bool {
        self.dout.is_low().unwrap_or(false)
    }

    /// Clock out one raw conversion.
    pub fn read_raw(&mut self) -> Result<i32, SensorError> {
        if !self.is_ready() {
            return Err(SensorError::LoadCellNotReady);
        }

        let mut value: u32 = 0;
        for _ in 0..24 {
            self.pulse()?;
            let bit = self.dout.is_high().map_err(|_| SensorError::GpioFailed)?;
            value = (value << 1) | u32::from(bit);
        }
        // 25th pulse selects channel A, gain 128 for the next conversion.
        self.pulse()?;

        // Sign-extend 24 → 32 bits.
        Ok(((value << 8) as i32) >> 8)
    }

    /// Average `samples` conversions and convert to grams.
    pub fn read_grams(&mut self, samples: u8) -> Result<f32, SensorError> {
        let mean = self.read_average(samples)?;
        Ok((mean - self.offset as f32) / self.counts_per_gram)
    }

    /// Zero the scale at the current load.
    pub fn tare(&mut self, samples: u8) -> Result<(), SensorError> {
        self.offset = self.read_average(samples)? as i32;
        log::info!("HX711: tared at offset {}", self.offset);
        Ok(())
    }

    fn read_average(&mut self, samples: u8) -> Result<f32, SensorError> {
        let samples = samples.max(1);
        let mut sum: i64 = 0;
        for _ in 0..samples {
            sum += i64::from(self.read_raw()?);
        }
        Ok(sum as f32 / f32::from(samples))
    }

    fn pulse(&mut self) -> Result<(), SensorError> {
        self.sck.set_high().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(1);
        self.sck.set_low().map_err(|_| SensorError::GpioFailed)?;
        self.delay.delay_us(1);
        Ok(())
    }
}
