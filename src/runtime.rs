//! Async shell around [`VerificationSession`].
//!
//! The machine in [`crate::otp`] is pure; this module gives it a
//! clock and a lifetime. A [`SessionHandle`] owns the session state
//! plus one cancellation token: the countdown task, the success
//! auto-close, and any late network resolution are all tied to that
//! token, so a closed session can neither tick nor resolve into stale
//! state.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::otp::{SessionEvent, VerificationSession, VerifyResolution, SUCCESS_CLOSE_DELAY};

pub struct SessionHandle {
    state: Arc<Mutex<VerificationSession>>,
    token: CancellationToken,
}

impl SessionHandle {
    /// Opens a session and starts its countdown.
    pub fn open(email: &str) -> Self {
        let handle = Self {
            state: Arc::new(Mutex::new(VerificationSession::open(email))),
            token: CancellationToken::new(),
        };
        handle.spawn_countdown();
        handle
    }

    /// Runs `f` against the live session state.
    pub fn with<R>(&self, f: impl FnOnce(&mut VerificationSession) -> R) -> R {
        let mut state = self.state.lock().expect("session state lock poisoned");
        f(&mut state)
    }

    /// Closes the session: stops the countdown and makes any
    /// still-in-flight resolution inert. Idempotent.
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Arms a verify attempt, returning the code to send.
    pub fn begin_verify(&self) -> Option<String> {
        if self.is_closed() {
            return None;
        }
        self.with(|s| match s.begin_verify() {
            Some(SessionEvent::VerifyRequested(code)) => Some(code),
            _ => None,
        })
    }

    /// Applies the verify outcome. Dropped without effect when the
    /// session closed while the request was in flight. On the success
    /// transition, schedules the one auto-close.
    pub fn verify_resolved(&self, resolution: VerifyResolution) -> bool {
        if self.is_closed() {
            debug!("session closed while verify in flight; dropping resolution");
            return false;
        }

        let succeeded = self.with(|s| s.verify_resolved(resolution));
        if succeeded {
            self.schedule_success_close();
        }
        succeeded
    }

    /// Arms a resend, once the code has expired.
    pub fn begin_resend(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.with(|s| s.begin_resend()) == Some(SessionEvent::ResendRequested)
    }

    /// Applies the resend outcome; a reset countdown gets a fresh
    /// ticker task (the old one stopped at zero).
    pub fn resend_resolved(&self, ok: bool) {
        if self.is_closed() {
            debug!("session closed while resend in flight; dropping resolution");
            return;
        }

        if self.with(|s| s.resend_resolved(ok)) {
            self.spawn_countdown();
        }
    }

    fn spawn_countdown(&self) {
        let state = self.state.clone();
        let token = self.token.child_token();

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            // Missed ticks catch up in a burst so the countdown stays
            // aligned with wall time under a stalled executor.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            // The zeroth tick fires immediately; the countdown starts
            // one second after open.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let expired = {
                            let mut session =
                                state.lock().expect("session state lock poisoned");
                            session.tick();
                            session.expired()
                        };
                        // The timer stops at zero; a successful resend
                        // spawns a fresh one.
                        if expired {
                            break;
                        }
                    }
                }
            }
        });
    }

    fn schedule_success_close(&self) {
        let token = self.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = sleep(SUCCESS_CLOSE_DELAY) => {
                    debug!("verification confirmed; closing session");
                    token.cancel();
                }
            }
        });
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::advance;

    use crate::otp::{AttemptState, CODE_TTL_SECS};

    use super::*;

    /// Lets spawned tasks register their timers before the clock moves.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance_secs(secs: u64) {
        advance(Duration::from_secs(secs)).await;
        settle().await;
    }

    fn fill(handle: &SessionHandle) {
        handle.with(|s| s.paste("123456"));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_once_per_second() {
        let handle = SessionHandle::open("jo@x.com");
        settle().await;

        advance_secs(3).await;
        assert_eq!(handle.with(|s| s.seconds_left()), CODE_TTL_SECS - 3);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_stops_the_countdown() {
        let handle = SessionHandle::open("jo@x.com");
        settle().await;
        advance_secs(2).await;

        handle.close();
        settle().await;
        advance_secs(30).await;

        assert!(handle.is_closed());
        assert_eq!(handle.with(|s| s.seconds_left()), CODE_TTL_SECS - 2);
    }

    #[tokio::test(start_paused = true)]
    async fn success_auto_closes_after_the_confirmation_delay() {
        let handle = SessionHandle::open("jo@x.com");
        settle().await;

        fill(&handle);
        assert!(handle.begin_verify().is_some());
        assert!(handle.verify_resolved(VerifyResolution::Accepted));
        settle().await;

        advance_secs(3).await;
        assert!(!handle.is_closed());
        advance_secs(1).await;
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn late_resolution_after_close_is_inert() {
        let handle = SessionHandle::open("jo@x.com");
        settle().await;

        fill(&handle);
        assert!(handle.begin_verify().is_some());
        handle.close();

        assert!(!handle.verify_resolved(VerifyResolution::Accepted));
        assert_eq!(handle.with(|s| s.attempt()), AttemptState::Verifying);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_success_resolution_schedules_one_close() {
        let handle = SessionHandle::open("jo@x.com");
        settle().await;

        fill(&handle);
        handle.begin_verify();
        assert!(handle.verify_resolved(VerifyResolution::Accepted));
        assert!(!handle.verify_resolved(VerifyResolution::Accepted));
        settle().await;

        advance_secs(4).await;
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn resend_after_expiry_restarts_the_countdown() {
        let handle = SessionHandle::open("jo@x.com");
        settle().await;

        advance_secs(CODE_TTL_SECS as u64).await;
        assert!(handle.with(|s| s.expired()));

        assert!(handle.begin_resend());
        handle.resend_resolved(true);
        settle().await;

        assert_eq!(handle.with(|s| s.seconds_left()), CODE_TTL_SECS);
        advance_secs(2).await;
        assert_eq!(handle.with(|s| s.seconds_left()), CODE_TTL_SECS - 2);
    }
}
