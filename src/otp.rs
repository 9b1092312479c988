//! Verification session state machine.
//!
//! One session covers one open code-entry dialog for one email
//! address: a 6-slot digit buffer with focus tracking, a countdown
//! from 10 minutes, and an attempt/resend state pair. The machine is
//! pure; time arrives as [`VerificationSession::tick`] events and
//! network resolutions arrive as `*_resolved` calls, so every rule
//! here is testable without a clock or a socket. The async side lives
//! in [`crate::runtime`].

use std::time::Duration;

pub const CODE_SLOTS: usize = 6;
pub const CODE_TTL_SECS: u32 = 600;

/// How long the success confirmation stays up before the session
/// closes itself.
pub const SUCCESS_CLOSE_DELAY: Duration = Duration::from_secs(4);

pub const INVALID_CODE_MESSAGE: &str = "Invalid OTP. Please try again.";
pub const VERIFY_FAILED_MESSAGE: &str = "Verification failed. Please try again.";
pub const RESEND_FAILED_MESSAGE: &str = "Failed to resend OTP. Please try again.";
pub const EXPIRED_MESSAGE: &str = "Code expired";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Accepting digits; verify is armed once the buffer fills.
    Collecting,
    /// Verify request in flight; inputs and further verifies are held.
    Verifying,
    /// Terminal: confirmation showing, auto-close pending.
    Succeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendState {
    Idle,
    Resending,
}

/// What the session asks its owner to do. The session never calls
/// outward; the owner performs the network call and reports back
/// through `verify_resolved` / `resend_resolved`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    VerifyRequested(String),
    ResendRequested,
}

/// How an in-flight verify request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyResolution {
    /// The account API accepted the code.
    Accepted,
    /// The account API answered and rejected the code.
    Rejected,
    /// The request never got an answer.
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSession {
    email: String,
    code: [Option<char>; CODE_SLOTS],
    focus: usize,
    seconds_left: u32,
    attempt: AttemptState,
    resend: ResendState,
    error: Option<&'static str>,
}

impl VerificationSession {
    /// Fresh session: empty buffer, full countdown, focus on slot 0.
    pub fn open(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            code: [None; CODE_SLOTS],
            focus: 0,
            seconds_left: CODE_TTL_SECS,
            attempt: AttemptState::Collecting,
            resend: ResendState::Idle,
            error: None,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn digits(&self) -> &[Option<char>; CODE_SLOTS] {
        &self.code
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn expired(&self) -> bool {
        self.seconds_left == 0
    }

    pub fn attempt(&self) -> AttemptState {
        self.attempt
    }

    pub fn resend(&self) -> ResendState {
        self.resend
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// The concatenated code, once all six slots are filled.
    pub fn code(&self) -> Option<String> {
        if self.code.iter().all(Option::is_some) {
            Some(self.code.iter().flatten().collect())
        } else {
            None
        }
    }

    /// One wall-clock second elapsed. Saturates at zero; the expired
    /// state holds until a successful resend.
    pub fn tick(&mut self) {
        self.seconds_left = self.seconds_left.saturating_sub(1);
    }

    /// A keystroke on the focused slot. Non-digits are ignored
    /// outright. A digit fills the slot and advances focus when the
    /// next slot exists and is empty.
    pub fn enter_digit(&mut self, c: char) {
        if !c.is_ascii_digit() || self.attempt != AttemptState::Collecting {
            return;
        }

        self.code[self.focus] = Some(c);
        if self.focus + 1 < CODE_SLOTS && self.code[self.focus + 1].is_none() {
            self.focus += 1;
        }
    }

    /// Backspace on the focused slot: clears it if filled, otherwise
    /// steps focus back one slot.
    pub fn backspace(&mut self) {
        if self.attempt != AttemptState::Collecting {
            return;
        }

        if self.code[self.focus].is_some() {
            self.code[self.focus] = None;
        } else if self.focus > 0 {
            self.focus -= 1;
        }
    }

    /// Clipboard paste: digits only, at most six, distributed from
    /// slot 0 overwriting what was there. Focus lands on the first
    /// empty slot, or the last slot when all six filled.
    pub fn paste(&mut self, text: &str) {
        if self.attempt != AttemptState::Collecting {
            return;
        }

        for (slot, digit) in text
            .chars()
            .filter(char::is_ascii_digit)
            .take(CODE_SLOTS)
            .enumerate()
        {
            self.code[slot] = Some(digit);
        }

        self.focus = self
            .code
            .iter()
            .position(Option::is_none)
            .unwrap_or(CODE_SLOTS - 1);
    }

    /// Verify is armed only with a full buffer, no attempt in flight,
    /// an unexpired code, and no prior success.
    pub fn can_verify(&self) -> bool {
        self.attempt == AttemptState::Collecting
            && !self.expired()
            && self.code.iter().all(Option::is_some)
    }

    /// Arms a verify attempt. Emits the code to send; the owner calls
    /// the account API and reports back via [`Self::verify_resolved`].
    pub fn begin_verify(&mut self) -> Option<SessionEvent> {
        if !self.can_verify() {
            return None;
        }

        self.attempt = AttemptState::Verifying;
        self.error = None;
        // can_verify guarantees a full buffer.
        Some(SessionEvent::VerifyRequested(self.code()?))
    }

    /// Outcome of the in-flight verify. Success is terminal; either
    /// failure keeps the digits for correction and re-arms
    /// collecting, with the error text naming a rejected code or an
    /// unreachable API. Returns true exactly when this call
    /// transitioned to success, so the owner schedules the auto-close
    /// once.
    pub fn verify_resolved(&mut self, resolution: VerifyResolution) -> bool {
        if self.attempt != AttemptState::Verifying {
            return false;
        }

        match resolution {
            VerifyResolution::Accepted => {
                self.attempt = AttemptState::Succeeded;
                self.error = None;
                true
            }
            VerifyResolution::Rejected => {
                self.attempt = AttemptState::Collecting;
                self.error = Some(INVALID_CODE_MESSAGE);
                false
            }
            VerifyResolution::Unreachable => {
                self.attempt = AttemptState::Collecting;
                self.error = Some(VERIFY_FAILED_MESSAGE);
                false
            }
        }
    }

    /// Resend only becomes available once the code has expired, and
    /// never while a resend is already in flight.
    pub fn can_resend(&self) -> bool {
        self.expired() && self.resend == ResendState::Idle && self.attempt != AttemptState::Succeeded
    }

    pub fn begin_resend(&mut self) -> Option<SessionEvent> {
        if !self.can_resend() {
            return None;
        }

        self.resend = ResendState::Resending;
        Some(SessionEvent::ResendRequested)
    }

    /// Outcome of the in-flight resend. Success restores the full
    /// countdown with an empty buffer; failure leaves the countdown
    /// untouched. Returns true exactly when the countdown was reset.
    pub fn resend_resolved(&mut self, ok: bool) -> bool {
        if self.resend != ResendState::Resending {
            return false;
        }

        self.resend = ResendState::Idle;
        if ok {
            self.seconds_left = CODE_TTL_SECS;
            self.code = [None; CODE_SLOTS];
            self.focus = 0;
            self.error = None;
            true
        } else {
            self.error = Some(RESEND_FAILED_MESSAGE);
            false
        }
    }
}

/// Countdown display: minutes, colon, zero-padded seconds, switching
/// to the fixed expiry message at zero.
pub fn format_countdown(seconds: u32) -> String {
    if seconds == 0 {
        EXPIRED_MESSAGE.to_string()
    } else {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(session: &mut VerificationSession, digits: &str) {
        session.paste(digits);
    }

    #[test]
    fn opens_reset_with_full_countdown() {
        let session = VerificationSession::open("jo@x.com");
        assert_eq!(session.digits(), &[None; CODE_SLOTS]);
        assert_eq!(session.focus(), 0);
        assert_eq!(session.seconds_left(), CODE_TTL_SECS);
        assert_eq!(session.attempt(), AttemptState::Collecting);
        assert_eq!(session.error(), None);
    }

    #[test]
    fn typing_digits_advances_focus_and_arms_verify_on_the_sixth() {
        let mut session = VerificationSession::open("jo@x.com");
        for (i, c) in "123456".chars().enumerate() {
            assert!(!session.can_verify(), "armed before keystroke {}", i + 1);
            session.enter_digit(c);
        }
        assert!(session.can_verify());
        assert_eq!(session.code().as_deref(), Some("123456"));
        assert_eq!(session.focus(), CODE_SLOTS - 1);
    }

    #[test]
    fn non_digit_keystrokes_are_ignored() {
        let mut session = VerificationSession::open("jo@x.com");
        for c in ['a', ' ', '-', '#'] {
            session.enter_digit(c);
        }
        assert_eq!(session.digits(), &[None; CODE_SLOTS]);
        assert_eq!(session.focus(), 0);
    }

    #[test]
    fn backspace_clears_then_steps_back() {
        let mut session = VerificationSession::open("jo@x.com");
        session.enter_digit('1');
        session.enter_digit('2');
        // Focus is on the empty slot 2.
        assert_eq!(session.focus(), 2);

        session.backspace();
        assert_eq!(session.focus(), 1);
        session.backspace();
        assert_eq!(session.digits()[1], None);
        assert_eq!(session.focus(), 1);
        session.backspace();
        assert_eq!(session.focus(), 0);
    }

    #[test]
    fn paste_keeps_first_six_digits_and_focuses_past_them() {
        let mut session = VerificationSession::open("jo@x.com");
        session.paste("98-7654 3210");
        assert_eq!(session.code().as_deref(), Some("987654"));
        assert_eq!(session.focus(), CODE_SLOTS - 1);

        let mut partial = VerificationSession::open("jo@x.com");
        partial.paste("12a3");
        assert_eq!(partial.digits()[..3], [Some('1'), Some('2'), Some('3')]);
        assert_eq!(partial.focus(), 3);
    }

    #[test]
    fn paste_overwrites_existing_digits_from_slot_zero() {
        let mut session = VerificationSession::open("jo@x.com");
        filled(&mut session, "111111");
        session.paste("22");
        assert_eq!(session.digits()[..2], [Some('2'), Some('2')]);
        assert_eq!(session.digits()[2], Some('1'));
    }

    #[test]
    fn countdown_decrements_and_saturates_at_zero() {
        let mut session = VerificationSession::open("jo@x.com");
        session.tick();
        assert_eq!(session.seconds_left(), CODE_TTL_SECS - 1);

        for _ in 0..CODE_TTL_SECS * 2 {
            session.tick();
        }
        assert_eq!(session.seconds_left(), 0);
        assert!(session.expired());
    }

    #[test]
    fn expiry_disables_verify_and_enables_resend() {
        let mut session = VerificationSession::open("jo@x.com");
        filled(&mut session, "123456");
        assert!(session.can_verify());
        assert!(!session.can_resend());

        for _ in 0..CODE_TTL_SECS {
            session.tick();
        }
        assert!(!session.can_verify());
        assert!(session.can_resend());
    }

    #[test]
    fn verify_failure_retains_digits_with_an_error() {
        let mut session = VerificationSession::open("jo@x.com");
        filled(&mut session, "123456");

        let event = session.begin_verify();
        assert_eq!(
            event,
            Some(SessionEvent::VerifyRequested("123456".to_string()))
        );
        assert_eq!(session.attempt(), AttemptState::Verifying);
        // No double-arm while in flight.
        assert_eq!(session.begin_verify(), None);

        assert!(!session.verify_resolved(VerifyResolution::Rejected));
        assert_eq!(session.attempt(), AttemptState::Collecting);
        assert_eq!(session.code().as_deref(), Some("123456"));
        assert_eq!(session.error(), Some(INVALID_CODE_MESSAGE));
    }

    #[test]
    fn verify_success_is_terminal_and_reports_once() {
        let mut session = VerificationSession::open("jo@x.com");
        filled(&mut session, "123456");
        session.begin_verify();

        assert!(session.verify_resolved(VerifyResolution::Accepted));
        assert_eq!(session.attempt(), AttemptState::Succeeded);
        // Late or duplicate resolutions are inert.
        assert!(!session.verify_resolved(VerifyResolution::Accepted));
        assert!(!session.can_verify());
        assert!(!session.can_resend());
    }

    #[test]
    fn unreachable_api_reports_its_own_error_and_keeps_the_digits() {
        let mut session = VerificationSession::open("jo@x.com");
        filled(&mut session, "123456");
        session.begin_verify();

        assert!(!session.verify_resolved(VerifyResolution::Unreachable));
        assert_eq!(session.attempt(), AttemptState::Collecting);
        assert_eq!(session.code().as_deref(), Some("123456"));
        assert_eq!(session.error(), Some(VERIFY_FAILED_MESSAGE));
    }

    #[test]
    fn input_is_held_while_verifying() {
        let mut session = VerificationSession::open("jo@x.com");
        filled(&mut session, "123456");
        session.begin_verify();

        session.enter_digit('9');
        session.backspace();
        session.paste("999999");
        assert_eq!(session.code().as_deref(), Some("123456"));
    }

    #[test]
    fn resend_resets_countdown_and_buffer_only_on_success() {
        let mut session = VerificationSession::open("jo@x.com");
        filled(&mut session, "123456");
        for _ in 0..CODE_TTL_SECS {
            session.tick();
        }

        assert_eq!(session.begin_resend(), Some(SessionEvent::ResendRequested));
        assert_eq!(session.resend(), ResendState::Resending);
        // No double-send while in flight.
        assert_eq!(session.begin_resend(), None);

        assert!(!session.resend_resolved(false));
        assert_eq!(session.seconds_left(), 0);
        assert_eq!(session.error(), Some(RESEND_FAILED_MESSAGE));

        session.begin_resend();
        assert!(session.resend_resolved(true));
        assert_eq!(session.seconds_left(), CODE_TTL_SECS);
        assert_eq!(session.digits(), &[None; CODE_SLOTS]);
        assert_eq!(session.focus(), 0);
        assert_eq!(session.error(), None);
    }

    #[test]
    fn countdown_display_formats_minutes_and_seconds() {
        assert_eq!(format_countdown(600), "10:00");
        assert_eq!(format_countdown(61), "1:01");
        assert_eq!(format_countdown(59), "0:59");
        assert_eq!(format_countdown(0), EXPIRED_MESSAGE);
    }

    #[test]
    fn expiry_mid_verify_still_honors_the_resolution() {
        let mut session = VerificationSession::open("jo@x.com");
        filled(&mut session, "123456");
        session.begin_verify();

        for _ in 0..CODE_TTL_SECS {
            session.tick();
        }
        assert!(session.expired());

        // The in-flight result still lands.
        assert!(session.verify_resolved(VerifyResolution::Accepted));
        assert_eq!(session.attempt(), AttemptState::Succeeded);
    }
}
