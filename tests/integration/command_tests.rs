//! Inbound commands end to end: OTP unlock and lockout, status, arm and
//! disarm, motion alert debouncing.

use parcelbox::app::commands::InboundCommand;
use parcelbox::app::events::NotificationEvent;
use parcelbox::app::ports::Indicator;
use parcelbox::app::service::BoxState;
use parcelbox::control::lock::LockStatus;
use parcelbox::fsm::StateId;

use crate::mock_hw::Rig;

fn attempts(rig: &Rig) -> u8 {
    rig.sm.otp().map(|r| r.attempts()).expect("no live OTP")
}

// ── OTP unlock ────────────────────────────────────────────────

#[test]
fn correct_code_unlocks() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.take_events();

    let otp = rig.otp();
    rig.send_code(&otp);

    assert_eq!(rig.events, vec![NotificationEvent::UnlockGranted]);
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);
    // Still holding the package until the lid opens and it is taken.
    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
}

#[test]
fn wrong_code_reports_remaining_attempts() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.take_events();

    let wrong = rig.wrong_code();
    rig.send_code(wrong);
    rig.send_code(wrong);

    assert_eq!(
        rig.events,
        vec![
            NotificationEvent::UnlockDenied {
                remaining_attempts: 2
            },
            NotificationEvent::UnlockDenied {
                remaining_attempts: 1
            },
        ]
    );
    assert_eq!(rig.sm.lock_status(), LockStatus::Locked);
}

#[test]
fn three_wrong_codes_lock_out() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.take_events();

    let wrong = rig.wrong_code();
    for _ in 0..3 {
        rig.send_code(wrong);
    }

    assert_eq!(
        rig.events.last(),
        Some(&NotificationEvent::TemporaryLockout {
            remaining_secs: 300
        })
    );
    assert_eq!(rig.hw.last_indicator(), Some(Indicator::Lockout));
    assert_eq!(rig.sm.lock_status(), LockStatus::Locked);
}

#[test]
fn attempts_during_lockout_are_not_counted() {
    let mut rig = Rig::new();
    rig.deliver();
    let wrong = rig.wrong_code();
    for _ in 0..3 {
        rig.send_code(wrong);
    }
    let before = attempts(&rig);
    rig.take_events();

    rig.send_code(wrong);
    assert_eq!(attempts(&rig), before);
    assert!(matches!(
        rig.events.as_slice(),
        [NotificationEvent::TemporaryLockout { .. }]
    ));

    // The right code is refused too while the lockout runs.
    let otp = rig.otp();
    rig.send_code(&otp);
    assert_eq!(rig.sm.lock_status(), LockStatus::Locked);
    assert_eq!(attempts(&rig), before);
}

#[test]
fn lockout_expiry_resets_attempts_and_accepts_the_code() {
    let mut rig = Rig::new();
    rig.deliver();
    let wrong = rig.wrong_code();
    for _ in 0..3 {
        rig.send_code(wrong);
    }

    rig.tick_after(301);
    assert_eq!(rig.hw.last_indicator(), Some(Indicator::PackageHeld));
    assert_eq!(attempts(&rig), 0);

    rig.take_events();
    let otp = rig.otp();
    rig.send_code(&otp);
    assert_eq!(rig.events, vec![NotificationEvent::UnlockGranted]);
    assert_eq!(rig.sm.lock_status(), LockStatus::Unlocked);
}

#[test]
fn malformed_code_is_ignored() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.take_events();

    rig.send_code("12ab56");
    assert!(rig.events.is_empty());
    assert_eq!(attempts(&rig), 0);
}

#[test]
fn codes_are_ignored_while_empty() {
    let mut rig = Rig::new();
    rig.take_events();
    rig.send_code("123456");
    rig.send(InboundCommand::UnlockRequest);
    assert!(rig.events.is_empty());
    assert_eq!(*rig.sm.state(), BoxState::Empty);
}

// ── Unlock request ────────────────────────────────────────────

#[test]
fn unlock_request_prompts_without_revealing_the_code() {
    let mut rig = Rig::new();
    rig.deliver();
    let wrong = rig.wrong_code();
    rig.send_code(wrong);
    rig.take_events();

    rig.send(InboundCommand::UnlockRequest);
    assert_eq!(
        rig.events,
        vec![NotificationEvent::UnlockPrompt {
            remaining_attempts: 2
        }]
    );
}

#[test]
fn unlock_request_during_lockout_reports_wait() {
    let mut rig = Rig::new();
    rig.deliver();
    let wrong = rig.wrong_code();
    for _ in 0..3 {
        rig.send_code(wrong);
    }
    rig.tick_after(99);
    rig.take_events();

    rig.send(InboundCommand::UnlockRequest);
    match rig.events.as_slice() {
        [NotificationEvent::TemporaryLockout { remaining_secs }] => {
            assert!(*remaining_secs < 300 && *remaining_secs > 190);
        }
        other => panic!("unexpected events {:?}", other),
    }
}

// ── Status and help ───────────────────────────────────────────

#[test]
fn status_reports_current_state() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.take_events();

    rig.send(InboundCommand::StatusQuery);
    let [NotificationEvent::StatusReport(s)] = rig.events.as_slice() else {
        panic!("expected one status report, got {:?}", rig.events);
    };
    assert_eq!(s.state, StateId::PackageDetected);
    assert_eq!(s.lock, LockStatus::Locked);
    assert_eq!(s.distance_cm, Some(44));
    assert_eq!(s.baseline_cm, Some(50));
    assert!(s.box_closed);
    assert!(s.armed);
    assert_eq!(s.lockout_remaining_secs, None);
}

#[test]
fn help_is_answered() {
    let mut rig = Rig::new();
    rig.take_events();
    rig.send(InboundCommand::HelpQuery);
    assert_eq!(rig.events, vec![NotificationEvent::Help]);
}

// ── Motion alerts ─────────────────────────────────────────────

#[test]
fn motion_10s_apart_alerts_once() {
    let mut rig = Rig::new();
    rig.hw.motion = Ok(true);
    rig.tick();
    rig.tick_after(10);
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::MotionAlert { .. })),
        1
    );
}

#[test]
fn motion_31s_apart_alerts_twice() {
    let mut rig = Rig::new();
    rig.hw.motion = Ok(true);
    rig.tick();
    rig.hw.motion = Ok(false);
    rig.tick_after(15);
    rig.hw.motion = Ok(true);
    rig.tick_after(16);
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::MotionAlert { .. })),
        2
    );
}

#[test]
fn motion_alerts_in_every_state() {
    let mut rig = Rig::new();
    rig.deliver();
    rig.hw.motion = Ok(true);
    rig.tick();
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::MotionAlert { .. })),
        1
    );
}

#[test]
fn disarm_silences_motion_alerts() {
    let mut rig = Rig::new();
    rig.send(InboundCommand::Disarm);
    assert!(!rig.sm.is_armed());
    assert!(rig.events.contains(&NotificationEvent::ArmedChanged { armed: false }));

    rig.hw.motion = Ok(true);
    for _ in 0..40 {
        rig.tick();
    }
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::MotionAlert { .. })),
        0
    );

    rig.send(InboundCommand::Arm);
    assert!(rig.sm.is_armed());
    // Motion is sampled before commands, so the alert lands next tick.
    rig.tick();
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::MotionAlert { .. })),
        1
    );
}

#[test]
fn motion_sensor_fault_does_not_alert() {
    let mut rig = Rig::new();
    rig.hw.motion = Err(parcelbox::error::SensorError::GpioReadFailed);
    for _ in 0..5 {
        rig.tick();
    }
    assert_eq!(
        rig.count(|e| matches!(e, NotificationEvent::MotionAlert { .. })),
        0
    );
}
