//! Concrete power-state handlers and table builder.
//!
//! ```text
//!   OFF ──[power on, battery > 0]──▶ LOCKED ──[unlock]──▶ MONITORING
//!    ▲                                 │                      │
//!    └────────[power off / battery dead]─────────────────────┘
//! ```
//!
//! Power and unlock arrive as user commands (forced transitions); the only
//! condition the handlers watch on their own is a flat battery.

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Off,
            name: "Off",
            on_enter: Some(off_enter),
            on_exit: None,
            on_update: off_update,
        },
        StateDescriptor {
            id: StateId::Locked,
            name: "Locked",
            on_enter: Some(locked_enter),
            on_exit: None,
            on_update: powered_update,
        },
        StateDescriptor {
            id: StateId::Monitoring,
            name: "Monitoring",
            on_enter: Some(monitoring_enter),
            on_exit: Some(monitoring_exit),
            on_update: powered_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  OFF
// ═══════════════════════════════════════════════════════════════════════════

fn off_enter(ctx: &mut FsmContext) {
    ctx.monitoring = false;
    if ctx.battery_dead() {
        warn!("OFF: battery depleted");
    } else {
        info!("OFF: device powered down");
    }
}

fn off_update(_ctx: &mut FsmContext) -> Option<StateId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  LOCKED / MONITORING
// ═══════════════════════════════════════════════════════════════════════════

fn locked_enter(ctx: &mut FsmContext) {
    info!(
        "LOCKED: powered on at {:.0}% battery, awaiting unlock",
        ctx.battery_level * 100.0
    );
}

fn monitoring_enter(ctx: &mut FsmContext) {
    ctx.monitoring = true;
    info!("MONITORING: closed loop active");
}

fn monitoring_exit(ctx: &mut FsmContext) {
    ctx.monitoring = false;
    info!("MONITORING: closed loop stopped");
}

/// Shared by every powered state: a flat battery cuts power.
fn powered_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.battery_dead() {
        return Some(StateId::Off);
    }
    None
}
