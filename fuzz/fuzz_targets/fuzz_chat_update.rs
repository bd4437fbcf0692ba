//! Fuzz target: `chat::parse_update` / `chat::parse_command`
//!
//! Feeds arbitrary bytes as a bot update and as raw message text.  Neither
//! parser may panic, and any code that comes out must fit the OTP length.
//!
//! cargo fuzz run fuzz_chat_update

#![no_main]

use libfuzzer_sys::fuzz_target;
use parcelbox::adapters::chat::{parse_command, parse_update};
use parcelbox::app::commands::InboundCommand;
use parcelbox::otp::OTP_LEN;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    let _ = parse_update(text);

    if let Some(InboundCommand::OtpAttempt { code }) = parse_command(text) {
        assert_eq!(code.chars().count(), OTP_LEN);
        assert!(code.len() <= OTP_LEN);
    }
});
