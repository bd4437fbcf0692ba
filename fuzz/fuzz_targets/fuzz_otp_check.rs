//! Fuzz target: `OtpAuthenticator::check`
//!
//! Replays arbitrary candidate sequences at arbitrary times against one
//! issued code.  The attempt counter must stay below the limit and a
//! lockout must never be cut short by more attempts.
//!
//! cargo fuzz run fuzz_otp_check

#![no_main]

use libfuzzer_sys::fuzz_target;
use parcelbox::otp::{AuthResult, OtpAuthenticator};
use parcelbox::timing::Instant;

fuzz_target!(|data: &[u8]| {
    let Some((&seed, rest)) = data.split_first() else {
        return;
    };
    let mut auth = OtpAuthenticator::with_seed(u64::from(seed), 3, 300);
    let mut record = auth.generate(Instant::ZERO);
    let mut now = Instant::ZERO;

    // Each 7-byte chunk: one time step, then six candidate bytes.
    for chunk in rest.chunks_exact(7) {
        now = now.add_secs(u32::from(chunk[0]));
        let Ok(candidate) = core::str::from_utf8(&chunk[1..]) else {
            continue;
        };
        let locked_before = record.is_locked_out(now);
        let result = auth.check(&mut record, candidate, now);

        assert!(record.attempts() < 3);
        if locked_before {
            assert!(matches!(result, AuthResult::LockedOut { .. } | AuthResult::Ignored));
        }
        if let AuthResult::Granted = result {
            assert_eq!(candidate, record.code().as_str());
        }
    }
});
