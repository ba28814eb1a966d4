//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to: the latest sensor snapshot, status flags, feeding counters,
//! the progress of the running actuation sequence and the actuator
//! commands produced this tick.  Think of it as the "blackboard" in a
//! blackboard architecture.

use heapless::Vec;

use crate::app::feedback::{self, PulsePattern, Rgb};
use crate::clock::WallClock;
use crate::config::FeederConfig;
use crate::feeding::{self, FeedingCounters, FeedingStatus, Origin, SystemState};
use crate::sensors::{FoodLevel, SensorSnapshot};

// ---------------------------------------------------------------------------
// Actuation progress
// ---------------------------------------------------------------------------

/// Where the servo is within the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Holding at the dispense angle.
    Open,
    /// Back at rest, settling.
    Closing,
}

/// Step index of the running actuation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispenseProgress {
    pub origin: Origin,
    /// Zero-based index of the cycle in flight.
    pub cycle: u8,
    pub phase: CyclePhase,
    /// Monotonic ms at which the next step is due.  Deadlines are chained
    /// from the previous deadline, not from the tick that noticed it.
    pub due_ms: u64,
}

// ---------------------------------------------------------------------------
// Actuator commands (written by state handlers; consumed by AppService)
// ---------------------------------------------------------------------------

/// Maximum pulse trains a single tick can request.
pub const MAX_PULSES_PER_TICK: usize = 4;

/// Commands that state handlers write to request actuator actions.
/// Drained by the service after every FSM call.
#[derive(Debug, Clone, Default)]
pub struct ActuatorCommands {
    pub servo_angle: Option<u8>,
    pub pulses: Vec<PulsePattern, MAX_PULSES_PER_TICK>,
    pub ambient: Option<Rgb>,
}

impl ActuatorCommands {
    pub fn is_empty(&self) -> bool {
        self.servo_angle.is_none() && self.pulses.is_empty() && self.ambient.is_none()
    }

    pub fn pulse(&mut self, pattern: PulsePattern) {
        if self.pulses.push(pattern).is_err() {
            log::debug!("FSM: pulse queue full, dropping {:?}", pattern.colour);
        }
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    /// Monotonic milliseconds for the current tick.
    pub now_ms: u64,
    /// Wall time from the last successful clock poll.
    pub wall: Option<WallClock>,

    // -- Domain state --
    pub config: FeederConfig,
    pub state: SystemState,
    pub sensors: SensorSnapshot,
    pub counters: FeedingCounters,
    pub feeding_status: FeedingStatus,

    // -- Sequence --
    pub progress: Option<DispenseProgress>,
    /// Set for exactly one tick when a sequence finishes.
    pub completed: Option<Origin>,

    // -- Actuator outputs --
    pub commands: ActuatorCommands,
}

impl FsmContext {
    pub fn new(config: FeederConfig) -> Self {
        let state = SystemState {
            auto_feeding_enabled: config.auto_feeding_enabled,
            ..SystemState::default()
        };
        Self {
            now_ms: 0,
            wall: None,
            config,
            state,
            sensors: SensorSnapshot::default(),
            counters: FeedingCounters::default(),
            feeding_status: FeedingStatus::default(),
            progress: None,
            completed: None,
            commands: ActuatorCommands::default(),
        }
    }

    /// Colour the status LED shows when nothing else is playing.
    pub fn ambient_colour(&self) -> Rgb {
        if self.state.refill_mode {
            return feedback::YELLOW;
        }
        match self.sensors.food_level {
            FoodLevel::Full => feedback::GREEN,
            FoodLevel::Half => feedback::BLUE,
            FoodLevel::Empty => feedback::RED,
        }
    }

    /// Recompute the cached feeding-status string.
    pub fn refresh_status(&mut self) {
        self.feeding_status =
            feeding::feeding_status(&self.sensors, &self.counters, &self.config, self.now_ms);
    }

    /// Claim the actuator for `origin`.  Caller has already checked
    /// eligibility.
    pub fn begin(&mut self, origin: Origin) {
        self.state.dispensing = true;
        self.progress = Some(DispenseProgress {
            origin,
            cycle: 0,
            phase: CyclePhase::Open,
            due_ms: self.now_ms,
        });
    }

    pub fn step_due(&self) -> bool {
        self.progress.is_some_and(|p| self.now_ms >= p.due_ms)
    }

    /// Push the next deadline `ms` past the previous one.
    pub fn defer(&mut self, ms: u32) {
        if let Some(p) = self.progress.as_mut() {
            p.due_ms += u64::from(ms);
        }
    }
}
