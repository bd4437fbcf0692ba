//! Runtime configuration: validation, effect on the running machine, and
//! persistence through `ConfigPort`.

use parcelbox::adapters::nvs::NvsAdapter;
use parcelbox::app::events::NotificationEvent;
use parcelbox::app::ports::{ConfigError, ConfigPort};
use parcelbox::config::BoxConfig;
use parcelbox::fsm::StateId;

use crate::mock_hw::{MockNvs, Rig};

#[test]
fn threshold_change_applies_on_next_tick() {
    let mut rig = Rig::new();
    rig.sm
        .update_config(BoxConfig {
            package_threshold_cm: 10,
            ..Default::default()
        })
        .unwrap();

    rig.hw.distance = Ok(44);
    rig.tick();
    assert_eq!(rig.sm.state_id(), StateId::Empty);

    rig.hw.distance = Ok(40);
    rig.tick();
    assert_eq!(rig.sm.state_id(), StateId::PackageDetected);
}

#[test]
fn attempt_policy_follows_config() {
    let mut rig = Rig::new();
    rig.sm
        .update_config(BoxConfig {
            max_otp_attempts: 1,
            lockout_duration_secs: 60,
            ..Default::default()
        })
        .unwrap();
    rig.deliver();
    rig.take_events();

    let wrong = rig.wrong_code();
    rig.send_code(wrong);
    assert_eq!(
        rig.events,
        vec![NotificationEvent::TemporaryLockout { remaining_secs: 60 }]
    );
}

#[test]
fn invalid_update_is_rejected_and_not_saved() {
    let mut rig = Rig::new();
    let nvs = MockNvs::default();
    let bad = BoxConfig {
        motion_debounce_secs: 0,
        ..Default::default()
    };
    assert!(matches!(
        rig.sm.update_config(bad),
        Err(ConfigError::ValidationFailed(_))
    ));
    assert!(!rig.sm.save_config_if_dirty(&nvs));
    assert!(nvs.saved.borrow().is_empty());
}

#[test]
fn dirty_config_is_saved_once() {
    let mut rig = Rig::new();
    let nvs = MockNvs::default();
    let cfg = BoxConfig {
        lock_open_hold_secs: 45,
        ..Default::default()
    };
    rig.sm.update_config(cfg.clone()).unwrap();

    assert!(rig.sm.save_config_if_dirty(&nvs));
    assert!(!rig.sm.save_config_if_dirty(&nvs));
    assert_eq!(nvs.load().unwrap(), cfg);
}

#[test]
fn live_otp_survives_config_update() {
    let mut rig = Rig::new();
    rig.deliver();
    let otp = rig.otp();
    rig.sm
        .update_config(BoxConfig {
            motion_debounce_secs: 120,
            ..Default::default()
        })
        .unwrap();
    rig.tick();
    assert_eq!(rig.otp(), otp);
    assert_eq!(rig.sm.baseline(), Some(50));
}

#[test]
fn nvs_roundtrip_feeds_a_new_machine() {
    let nvs = NvsAdapter::new().unwrap();
    let cfg = BoxConfig {
        package_threshold_cm: 8,
        ..Default::default()
    };
    nvs.save(&cfg).unwrap();

    let rig = Rig::with_config(nvs.load_or_default());
    assert_eq!(rig.sm.config().package_threshold_cm, 8);
}

#[test]
fn disabled_leds_are_never_driven() {
    let mut rig = Rig::with_config(BoxConfig {
        status_led_enabled: false,
        ..Default::default()
    });
    rig.deliver();
    assert_eq!(rig.hw.last_indicator(), None);
}
