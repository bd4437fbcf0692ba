//! Chat bot adapter: message text in, message text out.
//!
//! Inbound, a bot update (JSON, `update_id` + `message.text`) is decoded
//! and its text mapped to an [`InboundCommand`].  Outbound, every
//! [`NotificationEvent`] renders to one plain-text message.
//!
//! | Text                  | Command          |
//! |-----------------------|------------------|
//! | `/status`             | `StatusQuery`    |
//! | `/unlock`             | `UnlockRequest`  |
//! | `/help`, `/start`     | `HelpQuery`      |
//! | `/arm`, `/disarm`     | `Arm`, `Disarm`  |
//! | any 6-character word  | `OtpAttempt`     |
//!
//! The HTTP side of the bot lives outside this crate.

use serde::Deserialize;

use crate::app::commands::InboundCommand;
use crate::app::events::NotificationEvent;
use crate::otp::{OTP_LEN, OtpCode};
use crate::sensors::fusion::SensorChannel;

/// Map one message to a command.  `None` for chatter the box ignores.
pub fn parse_command(text: &str) -> Option<InboundCommand> {
    let text = text.trim();
    // Group chats append the bot name: `/status@parcel_bot`.
    let word = text.split('@').next().unwrap_or(text);

    match word {
        "/status" => Some(InboundCommand::StatusQuery),
        "/unlock" => Some(InboundCommand::UnlockRequest),
        "/help" | "/start" => Some(InboundCommand::HelpQuery),
        "/arm" => Some(InboundCommand::Arm),
        "/disarm" => Some(InboundCommand::Disarm),
        _ if text.chars().count() == OTP_LEN => {
            // Non-digit candidates still go through so the authenticator
            // can ignore them in one place.
            let mut code = OtpCode::new();
            code.push_str(text).ok()?;
            Some(InboundCommand::OtpAttempt { code })
        }
        _ => None,
    }
}

// ───────────────────────────────────────────────────────────────
// Bot update decoding
// ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    text: Option<String>,
}

/// One decoded bot update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUpdate {
    /// Acknowledge with `update_id + 1` on the next poll.
    pub update_id: i64,
    pub command: Option<InboundCommand>,
}

/// Decode a single bot update.
pub fn parse_update(json: &str) -> Result<ChatUpdate, serde_json::Error> {
    let raw: RawUpdate = serde_json::from_str(json)?;
    let command = raw
        .message
        .and_then(|m| m.text)
        .and_then(|t| parse_command(&t));
    Ok(ChatUpdate {
        update_id: raw.update_id,
        command,
    })
}

// ───────────────────────────────────────────────────────────────
// Outbound rendering
// ───────────────────────────────────────────────────────────────

const FAULT_CHANNELS: [SensorChannel; 4] = [
    SensorChannel::Distance,
    SensorChannel::Motion,
    SensorChannel::Lid,
    SensorChannel::Button,
];

/// Plain-text message for `event`.
pub fn render(event: &NotificationEvent) -> String {
    match event {
        NotificationEvent::SystemStarted { baseline_cm } => format!(
            "Parcel box online. Empty-box distance {baseline_cm} cm. Send /help for commands."
        ),
        NotificationEvent::MotionAlert { at } => {
            format!("Motion detected at the parcel box ({at}).")
        }
        NotificationEvent::PackageArrived {
            otp, distance_cm, ..
        } => format!(
            "A package has arrived ({distance_cm} cm). The box is locked.\nYour unlock code: {otp}"
        ),
        NotificationEvent::BoxOpened { at } => format!("The box was opened ({at})."),
        NotificationEvent::ButtonUnlock { at } => {
            format!("The box was unlocked with the open button ({at}).")
        }
        NotificationEvent::PickupConfirmed { .. } => {
            "Package picked up. The box is ready for the next delivery.".to_string()
        }
        NotificationEvent::UnlockGranted => "Code accepted. The box is unlocked.".to_string(),
        NotificationEvent::UnlockDenied { remaining_attempts } => {
            format!("Wrong code. {remaining_attempts} attempt(s) left.")
        }
        NotificationEvent::TemporaryLockout { remaining_secs } => format!(
            "Too many wrong codes. Try again in {}:{:02}.",
            remaining_secs / 60,
            remaining_secs % 60
        ),
        NotificationEvent::UnlockPrompt { remaining_attempts } => format!(
            "Send the 6-digit code from the delivery message. {remaining_attempts} attempt(s) left."
        ),
        NotificationEvent::StatusReport(s) => {
            let mut text = format!(
                "Status: {}\nLock: {}\nLid: {}\nAlerts: {}\nUptime: {}",
                s.state,
                s.lock,
                if s.box_closed { "closed" } else { "open" },
                if s.armed { "armed" } else { "disarmed" },
                s.at
            );
            match (s.distance_cm, s.baseline_cm) {
                (Some(d), Some(b)) => {
                    text.push_str(&format!("\nDistance: {d} cm (empty: {b} cm)"));
                }
                (Some(d), None) => text.push_str(&format!("\nDistance: {d} cm")),
                (None, Some(b)) => text.push_str(&format!("\nEmpty-box distance: {b} cm")),
                (None, None) => {}
            }
            if let Some(secs) = s.lockout_remaining_secs {
                text.push_str(&format!("\nCode entry locked for {secs}s"));
            }
            if s.sensor_faults != 0 {
                let failed: Vec<String> = FAULT_CHANNELS
                    .iter()
                    .filter(|c| s.sensor_faults & c.mask() != 0)
                    .map(|c| c.to_string())
                    .collect();
                text.push_str(&format!("\nSensor fault: {}", failed.join(", ")));
            }
            text
        }
        NotificationEvent::Help => "Commands:\n\
             /status - box status\n\
             /unlock - how to unlock\n\
             /arm - enable motion alerts\n\
             /disarm - silence motion alerts\n\
             /help - this message\n\
             Send the 6-digit code to unlock."
            .to_string(),
        NotificationEvent::ArmedChanged { armed: true } => "Motion alerts enabled.".to_string(),
        NotificationEvent::ArmedChanged { armed: false } => "Motion alerts silenced.".to_string(),
        NotificationEvent::ActuatorFault { command } => {
            format!("Lock did not respond to '{command}'. Check the box.")
        }
    }
}
