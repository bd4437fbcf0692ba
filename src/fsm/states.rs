//! Concrete state handler functions and table builder.
//!
//! Each state is defined by three plain `fn` pointers: no closures, no
//! dynamic dispatch, no heap.  This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!  EMPTY ──[package present, lid closed]──▶ PACKAGE_DETECTED
//!    ▲        lock, issue OTP                       │
//!    │                                          [lid opens]
//!    │                                              ▼
//!    └──────────[package gone]──────────────── OPENED
//!         unlock, clear OTP
//! ```

use log::{info, warn};

use super::context::{BoxContext, BoxState};
use super::{StateDescriptor, StateId};
use crate::app::events::NotificationEvent;
use crate::control::lock::LockCommand;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0 Empty
        StateDescriptor {
            id: StateId::Empty,
            name: "Empty",
            can_enter: None,
            on_enter: Some(empty_enter),
            on_exit: None,
            on_update: empty_update,
        },
        // Index 1 PackageDetected
        StateDescriptor {
            id: StateId::PackageDetected,
            name: "PackageDetected",
            can_enter: None,
            on_enter: Some(package_enter),
            on_exit: None,
            on_update: package_update,
        },
        // Index 2 Opened
        StateDescriptor {
            id: StateId::Opened,
            name: "Opened",
            can_enter: Some(holds_record),
            on_enter: Some(opened_enter),
            on_exit: None,
            on_update: opened_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  EMPTY state: waiting for a delivery
// ═══════════════════════════════════════════════════════════════════════════

fn empty_enter(ctx: &mut BoxContext) {
    ctx.state = BoxState::Empty;
    ctx.unlock_hold.cancel();
    ctx.request_lock(LockCommand::Unlock);
    info!("EMPTY: box unlocked, waiting for a delivery");
}

fn empty_update(ctx: &mut BoxContext) -> Option<StateId> {
    // Only a closed lid gives a trustworthy floor reading.
    if ctx.sensors.package_present && ctx.sensors.box_closed {
        return Some(StateId::PackageDetected);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  PACKAGE_DETECTED state: locked, OTP issued
// ═══════════════════════════════════════════════════════════════════════════

fn package_enter(ctx: &mut BoxContext) {
    ctx.request_lock(LockCommand::Lock);

    if let Some(mut record) = ctx.state.take_otp() {
        // Never reissue: the recipient already has this code.
        record.reset_attempts();
        ctx.state = BoxState::PackageDetected(record);
        warn!("PACKAGE_DETECTED: re-entered with a live OTP, keeping it");
        return;
    }

    let record = ctx.authenticator.generate(ctx.now);
    let otp = record.code().clone();
    ctx.state = BoxState::PackageDetected(record);

    let distance_cm = ctx.sensors.distance.map_or(0, |d| d.distance_cm);
    info!("PACKAGE_DETECTED: package at {} cm, box locked", distance_cm);
    ctx.emit(NotificationEvent::PackageArrived {
        otp,
        distance_cm,
        at: ctx.now,
    });
}

fn package_update(ctx: &mut BoxContext) -> Option<StateId> {
    service_open_button(ctx);
    service_unlock_hold(ctx);

    if !ctx.sensors.box_closed {
        return Some(StateId::Opened);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  OPENED state: lid opened with a package inside
// ═══════════════════════════════════════════════════════════════════════════

fn holds_record(ctx: &BoxContext) -> bool {
    ctx.state.otp().is_some()
}

fn opened_enter(ctx: &mut BoxContext) {
    // `holds_record` guarantees a record here.
    if let Some(record) = ctx.state.take_otp() {
        ctx.state = BoxState::Opened(record);
    }
    info!("OPENED: lid opened at {}", ctx.now);
    ctx.emit(NotificationEvent::BoxOpened { at: ctx.now });
}

fn opened_update(ctx: &mut BoxContext) -> Option<StateId> {
    service_open_button(ctx);
    service_unlock_hold(ctx);

    if !ctx.sensors.package_present {
        info!("OPENED: package removed after {}s", ctx.secs_in_state());
        ctx.emit(NotificationEvent::PickupConfirmed { at: ctx.now });
        return Some(StateId::Empty);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Open button: release the lock and start the same hold a granted code
/// starts.
fn service_open_button(ctx: &mut BoxContext) {
    if !ctx.sensors.open_pressed {
        return;
    }
    let hold = ctx.config.lock_open_hold_secs;
    info!("Open button pressed, unlocking for {}s", hold);
    ctx.request_lock(LockCommand::Unlock);
    ctx.unlock_hold.arm(ctx.now, hold);
    ctx.emit(NotificationEvent::ButtonUnlock { at: ctx.now });
}

/// Re-engage the lock once the post-unlock hold runs out.  Waits for the
/// lid to be shut so the bolt does not hit an open lid.
fn service_unlock_hold(ctx: &mut BoxContext) {
    if ctx.unlock_hold.is_expired(ctx.now) && ctx.sensors.box_closed {
        ctx.unlock_hold.cancel();
        info!("Unlock hold elapsed, re-locking");
        ctx.request_lock(LockCommand::Lock);
    }
}
