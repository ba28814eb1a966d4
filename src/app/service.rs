//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the dispenser FSM, the sensor hub, the scheduler
//! and the shared context.  It is the single writer of `SystemState`,
//! `SensorSnapshot` and `FeedingCounters`; everything else reads through
//! the query methods.  All I/O flows through port traits injected at call
//! sites, making the entire service testable with mock adapters.
//!
//! ```text
//!   SensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!    ClockPort ──▶ │        AppService         │ ──▶ TelemetrySink
//! RemoteSource ──▶ │ Hub · Scheduler · FSM     │ ──▶ ActuatorPort
//!  AppCommand ───▶ └──────────────────────────┘ ──▶ IndicatorPort
//! ```

use log::{debug, info, warn};

use crate::config::FeederConfig;
use crate::display::{self, DisplayFrame};
use crate::feeding::{self, DispenseRequest, FeedingCounters, FeedingStatus, Origin, Rejection, SystemState};
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::remote::RemoteMethod;
use crate::scheduler::{NextFeed, ScheduleTable, Scheduler};
use crate::sensors::{SensorHub, SensorSnapshot};
use crate::telemetry::TelemetrySnapshot;

use super::commands::AppCommand;
use super::events::AppEvent;
use super::feedback;
use super::ports::{
    ActuatorPort, ClockPort, DisplayPort, EventSink, IndicatorPort, RemoteCommandSource, SensorPort,
    TelemetrySink,
};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    hub: SensorHub,
    scheduler: Scheduler,
    next_clock_ms: u64,
    next_display_ms: u64,
    next_telemetry_ms: u64,
    message_id: u32,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: FeederConfig) -> Self {
        let hub = SensorHub::new(&config);
        let scheduler = Scheduler::new(ScheduleTable::from_config(&config));
        let next_telemetry_ms = u64::from(config.telemetry_interval_ms);
        let ctx = FsmContext::new(config);
        let fsm = Fsm::new(build_state_table(), StateId::Idle);

        Self {
            fsm,
            ctx,
            hub,
            scheduler,
            next_clock_ms: 0,
            next_display_ms: 0,
            next_telemetry_ms,
            message_id: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in Idle: servo to rest, ambient colour on.
    pub fn start(&mut self, hw: &mut (impl ActuatorPort + IndicatorPort), sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        self.apply_actuators(hw);
        self.ctx.refresh_status();
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!(
            "AppService started in {:?}, auto feeding {}",
            self.fsm.current_state(),
            if self.ctx.state.auto_feeding_enabled { "on" } else { "off" }
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one pass of the control loop: clock → roll-over → sensors →
    /// FSM → scheduler → telemetry.
    ///
    /// The `hw` parameter satisfies the sensor, actuator and indicator
    /// ports at once; this avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SensorPort + ActuatorPort + IndicatorPort),
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
        telemetry: &mut impl TelemetrySink,
    ) {
        self.ctx.now_ms = now_ms;

        // 1. Wall clock and daily roll-over
        if now_ms >= self.next_clock_ms {
            self.next_clock_ms = now_ms + u64::from(self.ctx.config.clock_poll_ms);
            self.poll_clock(clock, sink);
        }

        // 2. Sensors
        let changes = self.hub.poll(now_ms, hw, &self.ctx.config, &mut self.ctx.sensors);
        if let Some(level) = changes.food_level {
            sink.emit(&AppEvent::FoodLevelChanged(level));
            hw.set_ambient(self.ctx.ambient_colour());
        }
        if let Some(bowl) = changes.bowl_status {
            sink.emit(&AppEvent::BowlStatusChanged(bowl));
        }
        self.ctx.refresh_status();

        // 3. Dispenser FSM
        let prev = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        self.apply_actuators(hw);
        self.emit_transition(prev, sink);

        if let Some(origin) = self.ctx.completed.take() {
            sink.emit(&AppEvent::DispenseCompleted {
                origin,
                daily_grams: self.ctx.counters.daily_grams,
                total_grams: self.ctx.counters.total_grams,
            });
            self.publish_telemetry(telemetry, sink);
        }

        // 4. Time-table
        if self.scheduler.poll(self.ctx.wall.as_ref(), &self.ctx.state) {
            let req = DispenseRequest::new(Origin::Scheduled, now_ms);
            if self.request(req, hw, clock, sink).is_ok() {
                if let Some(wall) = self.ctx.wall {
                    self.scheduler.mark_auto_feed(wall);
                }
            }
        }

        // 5. Periodic telemetry
        if now_ms >= self.next_telemetry_ms {
            self.next_telemetry_ms = now_ms + u64::from(self.ctx.config.telemetry_interval_ms);
            self.publish_telemetry(telemetry, sink);
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (button, backend).
    ///
    /// Only `Dispense` can be refused; every other command returns `Ok`.
    /// The clock is read again before a dispense is arbitrated, so a
    /// request just after midnight sees the new day.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        hw: &mut (impl ActuatorPort + IndicatorPort),
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Rejection> {
        self.ctx.now_ms = self.ctx.now_ms.max(now_ms);
        if cmd.is_button() {
            hw.pulse(feedback::BUTTON_ACK);
        }

        match cmd {
            AppCommand::Dispense(origin) => {
                let outcome = self.request(DispenseRequest::new(origin, now_ms), hw, clock, sink);
                if origin == Origin::Manual && outcome.is_err() {
                    hw.pulse(feedback::DANGER);
                }
                outcome
            }
            AppCommand::ToggleRefillMode => {
                let on = !self.ctx.state.refill_mode;
                self.ctx.state.refill_mode = on;
                hw.pulse(if on { feedback::REFILL_ENTER } else { feedback::REFILL_EXIT });
                hw.set_ambient(self.ctx.ambient_colour());
                info!("Refill mode {}", if on { "ON" } else { "OFF" });
                if on && self.ctx.state.dispensing {
                    info!("Refill mode: current dispense will finish");
                }
                sink.emit(&AppEvent::RefillModeChanged(on));
                Ok(())
            }
            AppCommand::SetAutoFeeding(on) => {
                if self.ctx.state.auto_feeding_enabled != on {
                    self.ctx.state.auto_feeding_enabled = on;
                    info!("Auto feeding {}", if on { "enabled" } else { "disabled" });
                    sink.emit(&AppEvent::AutoFeedingChanged(on));
                }
                Ok(())
            }
            AppCommand::SetBackendConnected(up) => {
                if self.ctx.state.backend_connected != up {
                    self.ctx.state.backend_connected = up;
                    info!("Backend {}", if up { "connected" } else { "disconnected" });
                }
                Ok(())
            }
        }
    }

    /// Drain pending backend method calls and answer each one.
    ///
    /// Calls are arbitrated one at a time; a second dispense arriving in
    /// the same batch is refused as already dispensing.
    pub fn poll_remote(
        &mut self,
        now_ms: u64,
        source: &mut impl RemoteCommandSource,
        hw: &mut (impl ActuatorPort + IndicatorPort),
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) {
        while let Some(request) = source.poll() {
            match request.method {
                RemoteMethod::Dispense => {
                    let outcome = self.handle_command(AppCommand::Dispense(Origin::Remote), now_ms, hw, clock, sink);
                    source.respond(&request, outcome);
                }
                RemoteMethod::Unknown(ref name) => {
                    warn!("Remote: ignoring unrouted method '{}'", name);
                }
            }
        }
    }

    /// Push a fresh frame to the display when the refresh interval is due.
    pub fn refresh_display(&mut self, now_ms: u64, display: &mut impl DisplayPort) -> bool {
        if now_ms < self.next_display_ms {
            return false;
        }
        self.next_display_ms = now_ms + u64::from(self.ctx.config.display_refresh_ms);
        display.show(&self.display_frame());
        true
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn system_state(&self) -> &SystemState {
        &self.ctx.state
    }

    pub fn sensors(&self) -> &SensorSnapshot {
        &self.ctx.sensors
    }

    pub fn counters(&self) -> &FeedingCounters {
        &self.ctx.counters
    }

    pub fn config(&self) -> &FeederConfig {
        &self.ctx.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Readiness of the local feeding path, evaluated now.
    pub fn feeding_status(&self) -> FeedingStatus {
        feeding::feeding_status(&self.ctx.sensors, &self.ctx.counters, &self.ctx.config, self.ctx.now_ms)
    }

    /// Next table entry, if the clock is up.
    pub fn next_feed(&self) -> Option<NextFeed> {
        if !self.ctx.state.rtc_ready {
            return None;
        }
        self.ctx
            .wall
            .and_then(|now| self.scheduler.next_scheduled_feed(&now))
    }

    /// Snapshot for the uplink.  Carries the id of the last published
    /// message.
    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        let s = &self.ctx.sensors;
        let st = &self.ctx.state;
        let c = &self.ctx.counters;
        TelemetrySnapshot {
            message_id: self.message_id,
            device_id: self.ctx.config.device_id.clone(),
            timestamp: if st.rtc_ready { self.ctx.wall } else { None },
            uptime_ms: self.ctx.now_ms,
            bowl_weight: s.weight_grams,
            container_level: s.food_level,
            bowl_status: s.bowl_status,
            pet_status: s.motion_present,
            dispensing: st.dispensing,
            refill_mode: st.refill_mode,
            auto_feeding: st.auto_feeding_enabled,
            daily_dispensed_g: c.daily_grams,
            total_dispensed_g: c.total_grams,
            feeding_status: self.ctx.feeding_status,
            next_feed: self.next_feed(),
            last_feeding: c.last_feeding_wall,
            rtc_ready: st.rtc_ready,
            distance_ok: s.distance_ok,
            weight_ok: s.weight_ok,
        }
    }

    pub fn display_frame(&self) -> DisplayFrame {
        display::render(
            &self.ctx.state,
            &self.ctx.sensors,
            self.ctx.wall.as_ref(),
            self.next_feed().as_ref(),
        )
    }

    // ── Internal ──────────────────────────────────────────────

    /// Arbitrate one request.  The only path that starts the actuator.
    ///
    /// Re-reads the clock first so the daily roll-over is never stale.
    fn request(
        &mut self,
        req: DispenseRequest,
        hw: &mut (impl ActuatorPort + IndicatorPort),
        clock: &mut impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Rejection> {
        self.poll_clock(clock, sink);

        let origin = req.origin;
        let ctx = &self.ctx;
        if let Err(reason) =
            feeding::check_eligibility(origin, &ctx.state, &ctx.sensors, &ctx.counters, &ctx.config, ctx.now_ms)
        {
            warn!("Dispense ({}) issued at {} ms rejected: {}", origin, req.issued_ms, reason);
            sink.emit(&AppEvent::DispenseRejected { origin, reason });
            return Err(reason);
        }

        info!("Dispense ({}) accepted", origin);
        let prev = self.fsm.current_state();
        self.ctx.begin(origin);
        self.fsm.force_transition(StateId::Dispensing, &mut self.ctx);
        self.apply_actuators(hw);
        sink.emit(&AppEvent::DispenseAccepted(origin));
        self.emit_transition(prev, sink);
        Ok(())
    }

    fn poll_clock(&mut self, clock: &mut impl ClockPort, sink: &mut impl EventSink) {
        match clock.now() {
            Ok(now) => {
                self.ctx.wall = Some(now);
                if !self.ctx.state.rtc_ready {
                    self.ctx.state.rtc_ready = true;
                    info!("Clock available: {}", now);
                    sink.emit(&AppEvent::ClockAvailability(true));
                }
                if self.ctx.counters.roll_over(now.day) {
                    info!("New day {}: daily total reset", now);
                    sink.emit(&AppEvent::DailyReset(now));
                }
            }
            Err(e) => {
                self.ctx.wall = None;
                if self.ctx.state.rtc_ready {
                    self.ctx.state.rtc_ready = false;
                    warn!("Clock lost ({}); scheduled feeding paused", e);
                    sink.emit(&AppEvent::ClockAvailability(false));
                }
            }
        }
    }

    fn publish_telemetry(&mut self, telemetry: &mut impl TelemetrySink, sink: &mut impl EventSink) {
        self.message_id = self.message_id.wrapping_add(1);
        let snapshot = self.telemetry_snapshot();
        match telemetry.publish(&snapshot) {
            Ok(()) => sink.emit(&AppEvent::Telemetry {
                message_id: snapshot.message_id,
            }),
            Err(e) => {
                warn!("Telemetry #{} dropped: {}", snapshot.message_id, e);
                sink.emit(&AppEvent::TelemetryDropped {
                    message_id: snapshot.message_id,
                });
            }
        }
    }

    fn emit_transition(&self, prev: StateId, sink: &mut impl EventSink) {
        let now = self.fsm.current_state();
        if now != prev {
            sink.emit(&AppEvent::StateChanged { from: prev, to: now });
        }
    }

    /// Translate FSM actuator commands into port calls.
    fn apply_actuators(&mut self, hw: &mut (impl ActuatorPort + IndicatorPort)) {
        let cmds = core::mem::take(&mut self.ctx.commands);
        if cmds.is_empty() {
            return;
        }
        if let Some(angle) = cmds.servo_angle {
            debug!("Servo -> {}°", angle);
            hw.set_angle(angle);
        }
        for pattern in cmds.pulses {
            hw.pulse(pattern);
        }
        if let Some(colour) = cmds.ambient {
            hw.set_ambient(colour);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::feedback::{PulsePattern, Rgb};
    use crate::clock::{ClockError, WallClock};
    use crate::error::SensorError;
    use crate::app::ports::PublishError;

    #[derive(Default)]
    struct Bench {
        angles: std::vec::Vec<u8>,
        pulses: std::vec::Vec<PulsePattern>,
        ambient: Option<Rgb>,
        distance_cm: f32,
    }

    impl SensorPort for Bench {
        fn read_distance_cm(&mut self) -> Result<f32, SensorError> {
            Ok(self.distance_cm)
        }
        fn read_weight_grams(&mut self) -> Result<f32, SensorError> {
            Ok(0.0)
        }
        fn motion_detected(&mut self) -> bool {
            false
        }
    }
    impl ActuatorPort for Bench {
        fn set_angle(&mut self, degrees: u8) {
            self.angles.push(degrees);
        }
    }
    impl IndicatorPort for Bench {
        fn pulse(&mut self, pattern: PulsePattern) {
            self.pulses.push(pattern);
        }
        fn set_ambient(&mut self, colour: Rgb) {
            self.ambient = Some(colour);
        }
    }

    struct NoClock;
    impl ClockPort for NoClock {
        fn now(&mut self) -> Result<WallClock, ClockError> {
            Err(ClockError::Unavailable)
        }
    }

    #[derive(Default)]
    struct Events(std::vec::Vec<AppEvent>);
    impl EventSink for Events {
        fn emit(&mut self, event: &AppEvent) {
            self.0.push(event.clone());
        }
    }

    struct Uplink(u32);
    impl TelemetrySink for Uplink {
        fn publish(&mut self, _s: &TelemetrySnapshot) -> Result<(), PublishError> {
            self.0 += 1;
            Err(PublishError::Disconnected)
        }
    }

    fn running() -> (AppService, Bench, Events) {
        let mut app = AppService::new(FeederConfig::default());
        let mut hw = Bench {
            distance_cm: 5.0,
            ..Bench::default()
        };
        let mut ev = Events::default();
        app.start(&mut hw, &mut ev);
        app.tick(0, &mut hw, &mut NoClock, &mut ev, &mut Uplink(0));
        (app, hw, ev)
    }

    #[test]
    fn start_parks_servo() {
        let (_app, hw, ev) = running();
        assert_eq!(hw.angles.first(), Some(&90));
        assert_eq!(ev.0.first(), Some(&AppEvent::Started(StateId::Idle)));
        assert_eq!(hw.ambient, Some(feedback::GREEN));
    }

    #[test]
    fn manual_press_acks_then_moves() {
        let (mut app, mut hw, mut ev) = running();
        hw.pulses.clear();
        assert_eq!(
            app.handle_command(AppCommand::Dispense(Origin::Manual), 10, &mut hw, &mut NoClock, &mut ev),
            Ok(())
        );
        assert_eq!(hw.pulses[0], feedback::BUTTON_ACK);
        assert_eq!(hw.pulses[1], feedback::MOVEMENT);
        assert_eq!(hw.angles.last(), Some(&45));
        assert_eq!(app.state(), StateId::Dispensing);
    }

    #[test]
    fn refused_manual_plays_danger() {
        let (mut app, mut hw, mut ev) = running();
        app.handle_command(AppCommand::ToggleRefillMode, 10, &mut hw, &mut NoClock, &mut ev).unwrap();
        assert_eq!(hw.ambient, Some(feedback::YELLOW));
        hw.pulses.clear();

        assert_eq!(
            app.handle_command(AppCommand::Dispense(Origin::Manual), 20, &mut hw, &mut NoClock, &mut ev),
            Err(Rejection::RefillMode)
        );
        assert_eq!(hw.pulses, [feedback::BUTTON_ACK, feedback::DANGER]);
    }

    #[test]
    fn refused_remote_is_silent() {
        let (mut app, mut hw, mut ev) = running();
        app.handle_command(AppCommand::ToggleRefillMode, 10, &mut hw, &mut NoClock, &mut ev).unwrap();
        hw.pulses.clear();
        assert!(app
            .handle_command(AppCommand::Dispense(Origin::Remote), 20, &mut hw, &mut NoClock, &mut ev)
            .is_err());
        assert!(hw.pulses.is_empty());
    }

    #[test]
    fn telemetry_failure_is_contained() {
        let (mut app, mut hw, mut ev) = running();
        let mut uplink = Uplink(0);
        app.tick(30_000, &mut hw, &mut NoClock, &mut ev, &mut uplink);
        assert_eq!(uplink.0, 1);
        assert!(ev.0.contains(&AppEvent::TelemetryDropped { message_id: 1 }));
        assert_eq!(app.state(), StateId::Idle);
    }
}
