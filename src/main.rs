//! ParcelBox Firmware: Main Entry Point
//!
//! Hexagonal architecture with a fixed-period control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    NvsAdapter     QueueSink     CommandInbox  │
//! │  (Sensor+Actuator)  (ConfigPort)   (Notif.Sink)  (CmdSource)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          DeliveryStateMachine (pure logic)             │    │
//! │  │  Fusion · FSM · OTP · Lock                             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  notify thread: queue → chat::render → transport               │
//! │  console thread: UART lines → chat::parse_command → inbox      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pin map (ESP32 DevKit)
//!
//! | Signal            | GPIO | Notes                         |
//! |-------------------|------|-------------------------------|
//! | HC-SR04 TRIG      | 5    | output                        |
//! | HC-SR04 ECHO      | 18   | input (5V → 3V3 divider)      |
//! | PIR (HC-SR501)    | 27   | input, active high            |
//! | Hall (A3144) lid  | 26   | input, pull-up, active low    |
//! | Open button       | 25   | input, pull-up, active low    |
//! | Lock servo (SG90) | 13   | LEDC ch0, 50 Hz               |
//! | LED red           | 32   | output                        |
//! | LED green         | 33   | output                        |
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::io::BufRead;

use anyhow::Result;
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{PinDriver, Pull};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::FromValueType;
use log::{debug, error, info, warn};

use parcelbox::adapters::channel::{CommandInbox, NotificationQueue};
use parcelbox::adapters::chat;
use parcelbox::adapters::hardware::HardwareAdapter;
use parcelbox::adapters::log_sink::LogNotificationSink;
use parcelbox::adapters::nvs::NvsAdapter;
use parcelbox::adapters::time::{self, MonotonicClock};
use parcelbox::app::ports::{NotificationSink, SensorPort};
use parcelbox::app::service::DeliveryStateMachine;
use parcelbox::drivers::servo::ServoLock;
use parcelbox::drivers::status_led::StatusLed;
use parcelbox::drivers::watchdog::Watchdog;
use parcelbox::error::Error;
use parcelbox::otp::OtpAuthenticator;
use parcelbox::sensors::SensorHub;
use parcelbox::sensors::digital::DigitalSensor;
use parcelbox::sensors::ultrasonic::Ultrasonic;

// ── Inter-task queues ─────────────────────────────────────────

static NOTIFICATIONS: NotificationQueue = NotificationQueue::new();
static COMMANDS: CommandInbox = CommandInbox::new();

/// Full calibration rounds before startup gives up.
const CALIBRATION_ROUNDS: u32 = 5;
const CALIBRATION_SAMPLE_GAP_MS: u32 = 100;

// ── Background tasks ──────────────────────────────────────────

fn spawn_notify_task() -> Result<()> {
    std::thread::Builder::new()
        .name("notify".into())
        .stack_size(6 * 1024)
        .spawn(|| {
            let mut log_sink = LogNotificationSink::new();
            loop {
                while let Some(event) = NOTIFICATIONS.try_next() {
                    let text = chat::render(&event);
                    log_sink.enqueue(event);
                    // The chat HTTP transport lives outside this crate; the
                    // rendered text is only logged here.
                    debug!("chat >> {}", text);
                }
                FreeRtos::delay_ms(100);
            }
        })?;
    Ok(())
}

/// Serial console as a command source until the bot poller exists.
fn spawn_console_task() -> Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(4 * 1024)
        .spawn(|| {
            let mut ingress = COMMANDS.ingress(time::uptime);
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.lock().read_line(&mut line) {
                    Ok(n) if n > 0 => match chat::parse_command(&line) {
                        Some(cmd) => {
                            if let Err(e) = ingress.submit(cmd) {
                                warn!("Console command rejected: {:?}", e);
                            }
                        }
                        None => debug!("Console: ignored {:?}", line.trim()),
                    },
                    _ => FreeRtos::delay_ms(100),
                }
            }
        })?;
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ParcelBox v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let watchdog = Watchdog::default();

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().map_err(|_| Error::Config("NVS flash init failed"))?;
    let config = nvs.load_or_default();

    // ── 3. Claim peripherals ──────────────────────────────────
    let peripherals = Peripherals::take().map_err(|_| Error::Init("peripherals already taken"))?;
    let pins = peripherals.pins;

    let trig = PinDriver::output(pins.gpio5)?;
    let echo = PinDriver::input(pins.gpio18)?;
    let pir = PinDriver::input(pins.gpio27)?;
    let mut hall = PinDriver::input(pins.gpio26)?;
    hall.set_pull(Pull::Up)?;
    let mut button = PinDriver::input(pins.gpio25)?;
    button.set_pull(Pull::Up)?;

    let servo_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(50.Hz().into())
            .resolution(Resolution::Bits14),
    )?;
    let servo_pwm = LedcDriver::new(peripherals.ledc.channel0, &servo_timer, pins.gpio13)?;

    let led_red = PinDriver::output(pins.gpio32)?;
    let led_green = PinDriver::output(pins.gpio33)?;

    // ── 4. Construct adapters ─────────────────────────────────
    let sensor_hub = SensorHub::new(
        Ultrasonic::new(trig, echo, Ets, time::uptime_us),
        DigitalSensor::active_high(pir),
        DigitalSensor::active_low(hall),
        DigitalSensor::active_low(button),
    );
    let mut hw = HardwareAdapter::new(
        sensor_hub,
        ServoLock::new(servo_pwm),
        StatusLed::new(led_red, led_green),
    );

    let authenticator =
        OtpAuthenticator::from_entropy(config.max_otp_attempts, config.lockout_duration_secs);
    let mut service = DeliveryStateMachine::new(config.clone(), authenticator);

    // ── 5. Baseline calibration (box must be empty) ───────────
    let required = usize::from(config.calibration_min_samples);
    let mut round = 0;
    let baseline = loop {
        round += 1;
        let samples: Vec<u16> = (0..required)
            .map(|_| {
                // A failed read counts as 0 cm and is discarded by calibration.
                let s = hw.sensors_mut().read_distance_cm().unwrap_or(0);
                FreeRtos::delay_ms(CALIBRATION_SAMPLE_GAP_MS);
                watchdog.feed();
                s
            })
            .collect();
        match service.calibrate(&samples) {
            Ok(b) => break b,
            Err(e) if round < CALIBRATION_ROUNDS => {
                warn!("Calibration round {} failed: {}, retrying", round, e);
            }
            Err(e) => {
                error!("Calibration failed after {} rounds: {}", round, e);
                return Err(Error::from(e).into());
            }
        }
    };
    info!("Empty-box baseline: {} cm", baseline);

    // ── 6. Start tasks and the state machine ──────────────────
    spawn_notify_task()?;
    spawn_console_task()?;

    let clock = MonotonicClock::new();
    let mut sink = NOTIFICATIONS.sender();
    let mut commands = &COMMANDS;
    service.start(clock.now(), &mut hw, &mut sink);

    // ── 7. Control loop ───────────────────────────────────────
    let mut last_dropped = 0;
    loop {
        service.tick(clock.now(), &mut hw, &mut commands, &mut sink);
        service.save_config_if_dirty(&nvs);

        let dropped = NOTIFICATIONS.dropped();
        if dropped != last_dropped {
            warn!("Notifications dropped so far: {}", dropped);
            last_dropped = dropped;
        }

        watchdog.feed();
        FreeRtos::delay_ms(service.config().control_loop_interval_ms);
    }
}
