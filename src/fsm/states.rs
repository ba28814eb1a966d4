//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers over a shared context.
//!
//! ```text
//!  IDLE ──[accepted request]──▶ DISPENSING ◀──[pause elapsed]── CYCLE_WAIT
//!    ▲                              │  │                             ▲
//!    │                              │  └──[cycle done, more left]───┘
//!    └────────[last cycle done]─────┘
//! ```
//!
//! Within DISPENSING the servo walks Open → Closing once per cycle.  Every
//! step is a deadline check against `ctx.now_ms`; nothing here blocks.

use super::context::{CyclePhase, FsmContext};
use super::{StateDescriptor, StateId};
use crate::app::feedback;
use log::{debug, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_update: idle_update,
        },
        // Index 1: Dispensing
        StateDescriptor {
            id: StateId::Dispensing,
            name: "Dispensing",
            on_enter: Some(dispensing_enter),
            on_update: dispensing_update,
        },
        // Index 2: CycleWait
        StateDescriptor {
            id: StateId::CycleWait,
            name: "CycleWait",
            on_enter: Some(cycle_wait_enter),
            on_update: cycle_wait_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    ctx.commands.servo_angle = Some(ctx.config.rest_angle_deg);
    ctx.commands.ambient = Some(ctx.ambient_colour());
}

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    // Normally entered via `force_transition` when a request is accepted.
    if ctx.progress.is_some() && ctx.state.dispensing {
        return Some(StateId::Dispensing);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISPENSING state: one open/close excursion per entry
// ═══════════════════════════════════════════════════════════════════════════

fn dispensing_enter(ctx: &mut FsmContext) {
    let Some(progress) = ctx.progress.as_mut() else {
        return;
    };
    progress.phase = CyclePhase::Open;
    let cycle = progress.cycle;

    ctx.commands.servo_angle = Some(ctx.config.dispense_angle_deg);
    ctx.commands.pulse(feedback::MOVEMENT);
    ctx.defer(ctx.config.dispense_hold_ms);
    info!(
        "DISPENSING: cycle {}/{} open at {}°",
        cycle + 1,
        ctx.config.dispense_cycles,
        ctx.config.dispense_angle_deg
    );
}

fn dispensing_update(ctx: &mut FsmContext) -> Option<StateId> {
    let Some(progress) = ctx.progress else {
        return Some(StateId::Idle);
    };
    if !ctx.step_due() {
        return None;
    }

    match progress.phase {
        CyclePhase::Open => {
            ctx.commands.servo_angle = Some(ctx.config.rest_angle_deg);
            ctx.commands.pulse(feedback::MOVEMENT);
            if let Some(p) = ctx.progress.as_mut() {
                p.phase = CyclePhase::Closing;
            }
            ctx.defer(ctx.config.rest_settle_ms);
            None
        }
        CyclePhase::Closing => {
            let done = progress.cycle + 1;
            if done < ctx.config.dispense_cycles {
                if let Some(p) = ctx.progress.as_mut() {
                    p.cycle = done;
                }
                Some(StateId::CycleWait)
            } else {
                complete(ctx);
                Some(StateId::Idle)
            }
        }
    }
}

/// Close out the sequence: rest angle, completion signal, counters.
fn complete(ctx: &mut FsmContext) {
    let Some(progress) = ctx.progress.take() else {
        return;
    };

    ctx.commands.servo_angle = Some(ctx.config.rest_angle_deg);
    ctx.commands.pulse(feedback::COMPLETION);

    ctx.counters
        .record(progress.origin, ctx.config.portion_grams, ctx.now_ms, ctx.wall);
    ctx.state.dispensing = false;
    ctx.completed = Some(progress.origin);
    ctx.refresh_status();
    ctx.commands.ambient = Some(ctx.ambient_colour());

    info!(
        "DISPENSING: {} portion complete, daily {} g, total {} g",
        progress.origin, ctx.counters.daily_grams, ctx.counters.total_grams
    );
}

// ═══════════════════════════════════════════════════════════════════════════
//  CYCLE_WAIT state: pause between excursions
// ═══════════════════════════════════════════════════════════════════════════

fn cycle_wait_enter(ctx: &mut FsmContext) {
    ctx.defer(ctx.config.inter_cycle_pause_ms);
    debug!("CYCLE_WAIT: pausing {} ms", ctx.config.inter_cycle_pause_ms);
}

fn cycle_wait_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.progress.is_none() {
        return Some(StateId::Idle);
    }
    if ctx.step_due() {
        return Some(StateId::Dispensing);
    }
    None
}
