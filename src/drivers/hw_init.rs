//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions and the servo LEDC timer/channel using raw
//! ESP-IDF sys calls.  Called once from `main()` before the control loop
//! starts.  Also provides the thin pin/time primitives the drivers build on,
//! with simulation stubs for host builds.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use core::convert::Infallible;
use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_async::digital::Wait;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(match e {
            HwInitError::GpioConfigFailed(_) => "GPIO config failed",
            HwInitError::LedcInitFailed(_) => "LEDC config failed",
        })
    }
}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the control loop; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_ledc()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn config_input(pin: i32, pull_up: bool) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Buttons are active-low and rely on the internal pull-up.
    for pin in [pins::BUTTON_REFILL_GPIO, pins::BUTTON_FEED_GPIO] {
        unsafe { config_input(pin, true)? };
    }
    for pin in [pins::ULTRASONIC_ECHO_GPIO, pins::PIR_GPIO, pins::HX711_DOUT_GPIO] {
        unsafe { config_input(pin, false)? };
    }
    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Host builds read every input HIGH (buttons released).
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::POWER_LED_GPIO,
        pins::ULTRASONIC_TRIG_GPIO,
        pins::HX711_SCK_GPIO,
        pins::LED_R_GPIO,
        pins::LED_G_GPIO,
        pins::LED_B_GPIO,
        pins::BUZZER_GPIO,
    ];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: pin was configured as an output in init_gpio_outputs().
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── LEDC PWM (servo) ─────────────────────────────────────────

pub const LEDC_CH_SERVO: u32 = 0;

/// Full-scale duty at the configured resolution.
pub const SERVO_MAX_DUTY: u32 = (1 << crate::pins::SERVO_RESOLUTION_BITS) - 1;

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: servo (50 Hz, 14-bit)
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_14_BIT,
        freq_hz: pins::SERVO_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let ret = unsafe { ledc_timer_config(&timer0) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    // Channel 0: servo signal, output held low until the first set_angle.
    let ret = unsafe {
        ledc_channel_config(&ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: LEDC_CH_SERVO,
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: pins::SERVO_GPIO,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        })
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::LedcInitFailed(ret));
    }

    info!("hw_init: LEDC configured (servo=CH0 @ {} Hz)", pins::SERVO_PWM_FREQ_HZ);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u32) {
    // SAFETY: LEDC channel configured in init_ledc(); only the control
    // loop writes duty registers.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u32) {}

// ── Time ─────────────────────────────────────────────────────

/// Microseconds since boot.
#[cfg(target_os = "espidf")]
pub fn micros() -> u64 {
    // SAFETY: esp_timer_get_time reads the monotonic RTC counter.
    (unsafe { esp_timer_get_time() }).max(0) as u64
}

#[cfg(not(target_os = "espidf"))]
pub fn micros() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static BOOT: OnceLock<Instant> = OnceLock::new();
    BOOT.get_or_init(Instant::now).elapsed().as_micros() as u64
}

pub fn millis() -> u64 {
    micros() / 1_000
}

// ── embedded-hal glue ────────────────────────────────────────

/// Busy-wait delay for the bit-banged sensor protocols.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysDelay;

impl DelayNs for SysDelay {
    #[cfg(target_os = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        // SAFETY: ROM busy-wait, no shared state.
        unsafe { esp_rom_delay_us(ns.div_ceil(1_000)) };
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Sub-millisecond waits spin; longer ones park on the async-io-mini reactor.
impl embedded_hal_async::delay::DelayNs for SysDelay {
    async fn delay_ns(&mut self, ns: u32) {
        if ns < 1_000_000 {
            DelayNs::delay_ns(self, ns);
        } else {
            async_io_mini::Timer::after(Duration::from_nanos(u64::from(ns))).await;
        }
    }
}

/// Microsecond time source for the ranging driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct BootClock;

impl hcsr04_async::Now for BootClock {
    fn now_micros(&self) -> u64 {
        micros()
    }
}

/// A configured input pin.
#[derive(Debug, Clone, Copy)]
pub struct GpioIn(pub i32);

/// A configured output pin.
#[derive(Debug, Clone, Copy)]
pub struct GpioOut(pub i32);

impl ErrorType for GpioIn {
    type Error = Infallible;
}

impl InputPin for GpioIn {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(gpio_read(self.0))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!gpio_read(self.0))
    }
}

/// Edge waits poll the level and yield between reads.
impl Wait for GpioIn {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        while !gpio_read(self.0) {
            futures_lite::future::yield_now().await;
        }
        Ok(())
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        while gpio_read(self.0) {
            futures_lite::future::yield_now().await;
        }
        Ok(())
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        self.wait_for_low().await?;
        self.wait_for_high().await
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        self.wait_for_high().await?;
        self.wait_for_low().await
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        if gpio_read(self.0) {
            self.wait_for_low().await
        } else {
            self.wait_for_high().await
        }
    }
}

impl ErrorType for GpioOut {
    type Error = Infallible;
}

impl OutputPin for GpioOut {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.0, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.0, true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_inputs_read_high() {
        let mut pin = GpioIn(14);
        assert!(pin.is_high().unwrap());
        assert!(!pin.is_low().unwrap());
    }

    #[test]
    fn sim_input_already_high_resolves() {
        let mut pin = GpioIn(14);
        assert!(futures_lite::future::block_on(pin.wait_for_high()).is_ok());
    }

    #[test]
    fn sim_clock_is_monotonic() {
        let a = micros();
        let b = micros();
        assert!(b >= a);
    }

    #[test]
    fn servo_duty_range() {
        assert_eq!(SERVO_MAX_DUTY, 16_383);
    }
}
