//! Function-pointer finite state machine engine for the dispenser.
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │  StateTable                                       │
//! │  ┌────────────┬───────────┬───────────────────┐   │
//! │  │ StateId    │ on_enter  │ on_update         │   │
//! │  ├────────────┼───────────┼───────────────────┤   │
//! │  │ Idle       │ fn(ctx)   │ fn(ctx)->Option<> │   │
//! │  │ Dispensing │ fn(ctx)   │ fn(ctx)->Option<> │   │
//! │  │ CycleWait  │ fn(ctx)   │ fn(ctx)->Option<> │   │
//! │  └────────────┴───────────┴───────────────────┘   │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine moves the current pointer
//! and runs `on_enter` for the next state.  All functions receive `&mut FsmContext`.
//!
//! The machine never sleeps.  Every timed step stores its deadline in the
//! context and `on_update` compares it with `ctx.now_ms`, so the caller's
//! loop keeps servicing sensors, buttons and the network while the servo
//! is moving.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all dispenser states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    Dispensing = 1,
    CycleWait = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Dispensing,
            2 => Self::CycleWait,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }

    /// The actuator is owned by a running sequence.
    pub fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.  Row `i` describes the
/// state whose discriminant is `i`.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current state was entered.
    state_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, row)| row.id as usize == i),
            "state table rows out of order"
        );
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            state_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    ///
    /// Follows at most one transition per call; chained deadlines that
    /// are already overdue are caught up on subsequent ticks.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        self.tick_count += 1;

        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition (used when a dispense request is
    /// accepted between ticks).
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    /// How many ticks the FSM has been in the current state.
    pub fn ticks_in_current_state(&self) -> u64 {
        self.tick_count - self.state_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        self.current = next_idx;
        self.state_entry_tick = self.tick_count;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::context::FsmContext;
    use super::*;
    use crate::config::FeederConfig;
    use crate::feeding::Origin;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sequence_always_completes(steps in proptest::collection::vec(1u64..400, 1..200)) {
            let mut fsm = Fsm::new(states::build_state_table(), StateId::Idle);
            let mut ctx = FsmContext::new(FeederConfig::default());
            fsm.start(&mut ctx);
            ctx.begin(Origin::Scheduled);
            fsm.force_transition(StateId::Dispensing, &mut ctx);

            let mut now = 0u64;
            for dt in steps {
                now += dt;
                ctx.commands = Default::default();
                ctx.now_ms = now;
                fsm.tick(&mut ctx);
                prop_assert_eq!(ctx.state.dispensing, fsm.current_state().is_busy());
            }
            // Drain whatever remains.
            for _ in 0..16 {
                now += 5_000;
                ctx.now_ms = now;
                fsm.tick(&mut ctx);
            }
            prop_assert_eq!(fsm.current_state(), StateId::Idle);
            prop_assert_eq!(ctx.counters.total_grams, 25);
        }
    }
}
