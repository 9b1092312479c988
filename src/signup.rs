//! Signup orchestrator.
//!
//! Owns the registration draft and the verified-email flag, sequences
//! the three account API calls (send code, verify code, register),
//! and opens/closes the verification session. The three calls are
//! strictly sequential; nothing here issues two at once.

use std::time::Duration;

use tracing::{info, warn};

use crate::{
    api::AccountApi,
    error::{ApiError, FormErrors},
    otp::VerifyResolution,
    runtime::SessionHandle,
    validate::{self, Field, LiveChecks},
};

/// Delay between a confirmed registration and the redirect to login.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub security_key: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupPhase {
    NotSubmitted,
    AwaitingCode,
    AwaitingVerification,
    AwaitingAccountCreation,
    Succeeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Field validation failed; no network call was made.
    Invalid,
    /// Code emailed; the verification session is open.
    CodeSent,
    /// Account registered; redirect after [`REDIRECT_DELAY`].
    AccountCreated,
    /// The account API rejected the request; errors were recorded and
    /// the form is editable again.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// No open session, or the code is not ready to send.
    NotReady,
    /// The session closed while the request was in flight; the
    /// resolution was dropped.
    SessionClosed,
    /// Wrong or expired code; the session keeps the digits and shows
    /// an error.
    CodeRejected,
    /// Code accepted and the follow-up registration succeeded.
    AccountCreated,
    /// Code accepted but registration failed; the email stays
    /// verified, so the next submit retries the register call alone.
    RegisterFailed,
}

pub struct SignupFlow<C: AccountApi> {
    api: C,
    draft: RegistrationDraft,
    email_verified: bool,
    phase: SignupPhase,
    errors: FormErrors,
    session: Option<SessionHandle>,
}

impl<C: AccountApi> SignupFlow<C> {
    pub fn new(api: C) -> Self {
        Self {
            api,
            draft: RegistrationDraft::default(),
            email_verified: false,
            phase: SignupPhase::NotSubmitted,
            errors: FormErrors::default(),
            session: None,
        }
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    pub fn api(&self) -> &C {
        &self.api
    }

    pub fn phase(&self) -> SignupPhase {
        self.phase
    }

    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    pub fn live_checks(&self) -> LiveChecks {
        LiveChecks::of(&self.draft)
    }

    /// Records one keystroke's worth of form input. The phone field
    /// passes through the display formatter first. The form is frozen
    /// once registration succeeded.
    pub fn set_field(&mut self, field: Field, value: &str) {
        if self.phase == SignupPhase::Succeeded {
            return;
        }

        match field {
            Field::Name => self.draft.name = value.to_string(),
            Field::Email => self.draft.email = value.to_string(),
            Field::Phone => self.draft.phone = validate::format_phone(value),
            Field::SecurityKey => self.draft.security_key = value.to_string(),
            Field::Password => self.draft.password = value.to_string(),
            Field::ConfirmPassword => self.draft.confirm_password = value.to_string(),
        }
    }

    /// The submit action. Validates the whole draft first; an invalid
    /// draft never reaches the network. A valid draft either requests
    /// a verification code (first pass) or goes straight to account
    /// creation (email already verified).
    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.phase == SignupPhase::Succeeded {
            return SubmitOutcome::AccountCreated;
        }

        let invalid = validate::validate_draft(&self.draft);
        if !invalid.is_empty() {
            self.errors = FormErrors::from_validation(invalid);
            return SubmitOutcome::Invalid;
        }
        self.errors = FormErrors::default();

        if self.email_verified {
            return self.create_account().await;
        }

        self.phase = SignupPhase::AwaitingCode;
        info!("requesting verification code for {}", self.draft.email);

        match self.api.request_code(&self.draft.email).await {
            Ok(()) => {
                self.phase = SignupPhase::AwaitingVerification;
                self.session = Some(SessionHandle::open(&self.draft.email));
                SubmitOutcome::CodeSent
            }
            Err(e) => {
                warn!("verification code request failed: {e}");
                self.errors = FormErrors::from_api(&e);
                self.phase = SignupPhase::NotSubmitted;
                SubmitOutcome::Failed
            }
        }
    }

    /// Checks one code with the account API. Never errors: any
    /// rejection or transport failure is `false`, so the session can
    /// render an inline error instead of crashing the flow. A `true`
    /// marks the email verified for the rest of the flow.
    pub async fn verify(&mut self, code: &str) -> bool {
        self.verify_attempt(code).await == VerifyResolution::Accepted
    }

    /// Like [`Self::verify`], but keeps the failure kind so the
    /// session can tell a rejected code from an unreachable API.
    async fn verify_attempt(&mut self, code: &str) -> VerifyResolution {
        match self.api.verify_code(&self.draft.email, code).await {
            Ok(()) => {
                info!("email {} verified", self.draft.email);
                self.email_verified = true;
                VerifyResolution::Accepted
            }
            Err(e @ ApiError::Transport(_)) => {
                warn!("code verification unreachable: {e}");
                VerifyResolution::Unreachable
            }
            Err(e) => {
                warn!("code verification failed: {e}");
                VerifyResolution::Rejected
            }
        }
    }

    /// Drives one full verify attempt: arms the session, performs the
    /// network call, applies the resolution, and on success runs the
    /// follow-up registration without further user action.
    pub async fn drive_verify(&mut self) -> VerifyOutcome {
        let Some(code) = self.session.as_ref().and_then(SessionHandle::begin_verify) else {
            return VerifyOutcome::NotReady;
        };

        let resolution = self.verify_attempt(&code).await;

        // A session closed mid-flight swallows the resolution; the
        // verified flag above still stands for the next submit.
        let resolved = self.session.as_ref().map(|session| {
            let open = !session.is_closed();
            session.verify_resolved(resolution);
            open
        });
        if resolved != Some(true) {
            return VerifyOutcome::SessionClosed;
        }
        if resolution != VerifyResolution::Accepted {
            return VerifyOutcome::CodeRejected;
        }

        match self.create_account().await {
            SubmitOutcome::AccountCreated => VerifyOutcome::AccountCreated,
            _ => VerifyOutcome::RegisterFailed,
        }
    }

    /// Drives one resend: re-requests a code for the session's email
    /// and applies the outcome to the session. Failures surface as a
    /// session error, not a form error.
    pub async fn drive_resend(&mut self) -> bool {
        if !self.session.as_ref().is_some_and(SessionHandle::begin_resend) {
            return false;
        }

        let ok = match self.api.request_code(&self.draft.email).await {
            Ok(()) => true,
            Err(e) => {
                warn!("code resend failed: {e}");
                false
            }
        };

        if let Some(session) = self.session.as_ref() {
            session.resend_resolved(ok);
        }
        ok
    }

    /// Explicit cancel: discards the open session and returns the
    /// form to an editable state. The draft and the verified flag are
    /// kept.
    pub fn cancel_verification(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
        if self.phase == SignupPhase::AwaitingVerification {
            self.phase = SignupPhase::NotSubmitted;
        }
    }

    /// Registers the account: name, email, and password only. Phone
    /// and security key are validated locally and never transmitted;
    /// that asymmetry is part of the dashboard's wire contract.
    async fn create_account(&mut self) -> SubmitOutcome {
        self.phase = SignupPhase::AwaitingAccountCreation;
        info!("registering account for {}", self.draft.email);

        match self
            .api
            .register(
                self.draft.name.trim(),
                &self.draft.email,
                &self.draft.password,
            )
            .await
        {
            Ok(()) => {
                self.phase = SignupPhase::Succeeded;
                info!("account registered; redirecting in {REDIRECT_DELAY:?}");
                SubmitOutcome::AccountCreated
            }
            Err(e) => {
                warn!("registration failed: {e}");
                self.errors = FormErrors::from_api(&e);
                // Editable again, but the email stays verified: the
                // retry goes straight back to the register call.
                self.phase = SignupPhase::NotSubmitted;
                SubmitOutcome::Failed
            }
        }
    }
}
