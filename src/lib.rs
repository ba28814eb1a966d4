//! PetFeeder firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod feeding;
pub mod fsm;
pub mod remote;
pub mod scheduler;
pub mod telemetry;

pub mod pins;

// Hardware-facing modules; ESP-IDF implementations are cfg-guarded inside,
// host builds get simulation stubs.
pub mod adapters;
pub mod drivers;
pub mod sensors;
