//! PetFeeder firmware entry point.
//!
//! Hexagonal architecture with a single-threaded control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter        LogEventSink   SystemClock  LcdDisplay │
//! │  (Sensor+Actuator+      (EventSink)    (ClockPort)  (Display)  │
//! │   Indicator)                                                   │
//! │  ChannelTelemetrySink   ChannelRemoteSource   mqtt uplink      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Dispense FSM · Eligibility · Scheduler · Sensor hub   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::thread;
use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use petfeeder::adapters::display::LcdDisplay;
use petfeeder::adapters::hardware::HardwareAdapter;
use petfeeder::adapters::log_sink::LogEventSink;
use petfeeder::adapters::mqtt::{self, LinkMonitor, NetworkSettings};
use petfeeder::adapters::time::SystemClock;
use petfeeder::app::commands::AppCommand;
use petfeeder::app::service::AppService;
use petfeeder::config::FeederConfig;
use petfeeder::drivers::hw_init;
use petfeeder::pins;
use petfeeder::remote::{ChannelRemoteSource, INBOX};
use petfeeder::telemetry::{ChannelTelemetrySink, OUTBOX};

/// Control-loop period.  Button debounce and pulse timing resolve to this.
const LOOP_PERIOD_MS: u64 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PetFeeder v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    let mut hw = match HardwareAdapter::new() {
        Ok(hw) => hw,
        Err(e) => {
            error!("HAL init failed: {}, halting", e);
            #[allow(clippy::empty_loop)]
            loop {}
        }
    };

    // ── 3. Configuration (built-in defaults, no persistence) ──
    let config = FeederConfig::default();
    config.validate()?;
    info!(
        "Config: {} g portions, {} g/day, {} cycles, schedule {:?}",
        config.portion_grams, config.max_daily_grams, config.dispense_cycles, config.schedule_minutes
    );

    // ── 4. Construct adapters ─────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(pins::I2C_FREQ_HZ.Hz()),
    )?;
    let mut display = LcdDisplay::new(i2c, pins::LCD_I2C_ADDR, Ets);

    let mut clock = SystemClock::new(config.utc_offset_minutes);
    let mut log_sink = LogEventSink::new();
    let mut telemetry = ChannelTelemetrySink::new(&OUTBOX, &config.device_id);
    let mut remote = ChannelRemoteSource::new(&INBOX, &OUTBOX);
    let mut link = LinkMonitor::new();

    // ── 5. Network (optional; the feeder runs offline) ────────
    if let Err(e) = mqtt::start(
        peripherals.modem,
        sys_loop,
        nvs,
        NetworkSettings::from_build_env(),
        &config.device_id,
    ) {
        warn!("Uplink unavailable ({:#}), running offline", e);
    }

    // ── 6. Construct app service ──────────────────────────────
    let mut app = AppService::new(config);
    app.start(&mut hw, &mut log_sink);
    hw_init::gpio_write(pins::POWER_LED_GPIO, true);

    info!("System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        let now_ms = hw_init::millis();

        for cmd in hw.poll_buttons(now_ms) {
            if let Err(reason) = app.handle_command(cmd, now_ms, &mut hw, &mut clock, &mut log_sink) {
                debug!("Button {:?} refused: {}", cmd, reason);
            }
        }

        if let Some(up) = link.poll() {
            let cmd = AppCommand::SetBackendConnected(up);
            if let Err(reason) = app.handle_command(cmd, now_ms, &mut hw, &mut clock, &mut log_sink) {
                debug!("Link change refused: {}", reason);
            }
        }
        app.poll_remote(now_ms, &mut remote, &mut hw, &mut clock, &mut log_sink);

        app.tick(now_ms, &mut hw, &mut clock, &mut log_sink, &mut telemetry);
        app.refresh_display(now_ms, &mut display);
        hw.tick_indicators(now_ms);

        thread::sleep(Duration::from_millis(LOOP_PERIOD_MS));
    }
}
