//! Full delivery cycle through `DeliveryStateMachine` with mock hardware:
//! arrival → lid opened → pickup, plus the lock hold and fault paths.

use parcelbox::app::events::NotificationEvent;
use parcelbox::app::ports::Indicator;
use parcelbox::app::service::BoxState;
use parcelbox::control::lock::{LockCommand, LockStatus};
use parcelbox::error::SensorError;
use parcelbox::fsm::StateId;
use parcelbox::timing::Instant;

use crate::mock_hw::Rig;

// ── Startup ───────────────────────────────────────────────────

#[test]
fn starts_empty_and_unlocked() {
    let rig = Rig::new();
    assert_eq!(*rig.sm.state(), BoxState::Empty);
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);
    assert_eq!(rig.hw.lock_writes(), vec![false]);
    assert_eq!(rig.hw.last_indicator(), Some(Indicator::Ready));
    assert_eq!(
        rig.events,
        vec![NotificationEvent::SystemStarted { baseline_cm: 50 }]
    );
}

// ── Arrival ───────────────────────────────────────────────────

#[test]
fn package_arrival_locks_and_issues_one_otp() {
    let mut rig = Rig::new();
    rig.take_events();

    rig.deliver();

    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
    assert_eq!(rig.sm.lock_status(), LockStatus::Locked);
    assert_eq!(rig.hw.lock_writes(), vec![false, true]);
    assert_eq!(rig.hw.last_indicator(), Some(Indicator::PackageHeld));

    let arrivals: Vec<_> = rig
        .events
        .iter()
        .filter_map(|e| match e {
            NotificationEvent::PackageArrived {
                otp, distance_cm, ..
            } => Some((otp.clone(), *distance_cm)),
            _ => None,
        })
        .collect();
    assert_eq!(arrivals.len(), 1);
    let (otp, distance) = &arrivals[0];
    assert_eq!(*distance, 44);
    assert_eq!(otp.len(), 6);
    assert!(otp.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(otp.as_str(), rig.otp());
}

#[test]
fn package_staying_put_does_not_renotify() {
    let mut rig = Rig::new();
    rig.deliver();
    for _ in 0..20 {
        rig.tick();
    }
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::PackageArrived { .. })),
        1
    );
    assert_eq!(rig.hw.lock_writes(), vec![false, true]);
}

#[test]
fn reading_above_threshold_is_a_no_op() {
    let mut rig = Rig::new();
    rig.take_events();
    // 46 cm is only 4 cm below the baseline.
    rig.hw.distance = Ok(46);
    rig.tick();
    assert_eq!(*rig.sm.state(), BoxState::Empty);
    assert!(rig.events.is_empty());
}

#[test]
fn reading_at_threshold_counts() {
    let mut rig = Rig::new();
    rig.hw.distance = Ok(45);
    rig.tick();
    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
}

// ── Lid opened ────────────────────────────────────────────────

#[test]
fn lid_open_emits_exactly_one_box_opened() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.hw.closed = Ok(false);
    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(rig.sm.state_id(), StateId::Opened);
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::BoxOpened { .. })),
        1
    );
}

// ── Pickup ────────────────────────────────────────────────────

#[test]
fn pickup_returns_to_empty_and_unlocks() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.hw.closed = Ok(false);
    rig.tick();
    assert!(matches!(rig.sm.state(), BoxState::Opened(_)));

    rig.hw.distance = Ok(50);
    rig.tick();

    assert_eq!(*rig.sm.state(), BoxState::Empty);
    assert!(rig.sm.otp().is_none());
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);
    assert_eq!(rig.hw.lock_writes(), vec![false, true, false]);
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::PickupConfirmed { .. })),
        1
    );
    assert_eq!(rig.hw.last_indicator(), Some(Indicator::Ready));
}

#[test]
fn second_delivery_gets_a_fresh_notification() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.hw.closed = Ok(false);
    rig.tick();
    rig.hw.distance = Ok(50);
    rig.tick();
    rig.hw.closed = Ok(true);
    rig.tick();

    rig.deliver();
    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::PackageArrived { .. })),
        2
    );
}

#[test]
fn event_order_over_a_full_cycle() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.hw.closed = Ok(false);
    rig.tick();
    rig.hw.distance = Ok(50);
    rig.tick();

    let kinds: Vec<&str> = rig
        .events
        .iter()
        .map(|e| match e {
            NotificationEvent::SystemStarted { .. } => "started",
            NotificationEvent::PackageArrived { .. } => "arrived",
            NotificationEvent::BoxOpened { .. } => "opened",
            NotificationEvent::PickupConfirmed { .. } => "pickup",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["started", "arrived", "opened", "pickup"]);
}

// ── Unlock hold ───────────────────────────────────────────────

#[test]
fn granted_unlock_relocks_after_hold_if_lid_stays_shut() {
    let mut rig = Rig::new();
    rig.deliver();
    let otp = rig.otp();
    rig.send_code(&otp);
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);

    // Hold is 30 s; still released just before it runs out.
    rig.tick_after(28);
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);

    rig.tick_after(2);
    assert_eq!(rig.sm.lock_status(), LockStatus::Locked);
    assert_eq!(rig.hw.lock_writes(), vec![false, true, false, true]);
    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
}

#[test]
fn hold_does_not_relock_an_open_lid() {
    let mut rig = Rig::new();
    rig.deliver();
    let otp = rig.otp();
    rig.send_code(&otp);
    rig.hw.closed = Ok(false);
    rig.tick();
    assert_eq!(rig.sm.state_id(), StateId::Opened);

    rig.tick_after(60);
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);

    // Lid shut again with the package still inside.
    rig.hw.closed = Ok(true);
    rig.tick();
    assert_eq!(rig.sm.lock_status(), LockStatus::Locked);
}

// ── Open button ───────────────────────────────────────────────

fn button_unlocks(e: &NotificationEvent) -> bool {
    matches!(e, NotificationEvent::ButtonUnlock { .. })
}

#[test]
fn open_button_releases_lock_for_the_hold() {
    let mut rig = Rig::new();
    rig.deliver();
    let otp = rig.otp();
    rig.take_events();

    rig.press_button();
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);
    assert_eq!(
        rig.events,
        vec![NotificationEvent::ButtonUnlock {
            at: Instant::from_secs(2)
        }]
    );

    rig.tick_after(29);
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);
    rig.tick();
    assert_eq!(rig.sm.lock_status(), LockStatus::Locked);

    assert_eq!(rig.hw.lock_writes(), vec![false, true, false, true]);
    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
    assert_eq!(rig.otp(), otp);
    assert_eq!(rig.count(button_unlocks), 1);
}

#[test]
fn held_button_counts_as_one_press() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.hw.button = Ok(true);
    // Pressed at 2 s, re-locks at 32 s.
    for _ in 0..31 {
        rig.tick();
    }
    assert_eq!(rig.count(button_unlocks), 1);
    assert_eq!(rig.sm.lock_status(), LockStatus::Locked);
}

#[test]
fn open_button_then_pickup_completes_the_cycle() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.press_button();
    rig.hw.closed = Ok(false);
    rig.tick();
    rig.hw.distance = Ok(50);
    rig.tick();

    assert_eq!(*rig.sm.state(), BoxState::Empty);
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);
    let kinds: Vec<&str> = rig
        .events
        .iter()
        .filter_map(|e| match e {
            NotificationEvent::PackageArrived { .. } => Some("arrived"),
            NotificationEvent::ButtonUnlock { .. } => Some("button"),
            NotificationEvent::BoxOpened { .. } => Some("opened"),
            NotificationEvent::PickupConfirmed { .. } => Some("pickup"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["arrived", "button", "opened", "pickup"]);
}

#[test]
fn open_button_on_empty_box_does_nothing() {
    let mut rig = Rig::new();
    rig.press_button();
    rig.tick();
    assert_eq!(rig.count(button_unlocks), 0);
    assert_eq!(rig.hw.lock_writes(), vec![false]);
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn distance_fault_holds_last_state() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.hw.distance = Err(SensorError::EchoTimeout);
    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
    assert_ne!(rig.sm.sensor_faults(), 0);

    rig.hw.distance = Ok(44);
    rig.tick();
    assert_eq!(rig.sm.sensor_faults(), 0);
}

#[test]
fn out_of_range_echo_is_not_a_pickup() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.hw.closed = Ok(false);
    rig.tick();
    // 0 cm is what a disconnected sensor reports.
    rig.hw.distance = Ok(0);
    rig.tick();
    assert_eq!(rig.sm.state_id(), StateId::Opened);
}

#[test]
fn actuator_fault_is_reported_and_not_retried() {
    let mut rig = Rig::new();
    rig.hw.lock_fails = true;
    rig.take_events();

    rig.deliver();

    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);
    assert!(rig.events.contains(&NotificationEvent::ActuatorFault {
        command: LockCommand::Lock
    }));

    rig.tick();
    rig.tick();
    assert_eq!(rig.hw.lock_writes(), vec![false, true]);
}

#[test]
fn lid_fault_keeps_box_closed() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.hw.closed = Err(SensorError::GpioReadFailed);
    rig.tick();
    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
    assert!(
        rig.count(|e| matches!(e, NotificationEvent::BoxOpened { .. })) == 0,
        "a failed hall read must not look like an open lid"
    );
}
