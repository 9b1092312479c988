//! # Verdex Signup
//!
//! Account signup and email verification for the Verdex produce-export
//! admin dashboard.
//!
//! The dashboard backend ("the account API") owns accounts and code
//! delivery; this crate owns everything on the operator's side of the
//! wire.
//!
//!
//!
//! ## Flow
//!
//! - Operator fills out the registration form (name, email, phone,
//!   security key, password, confirmation)
//! - Submit validates every field locally; nothing leaves the machine
//!   while any field is invalid
//! - First valid submit asks the account API to email a 6-digit code,
//!   then opens a verification session
//! - The session counts down from 10 minutes; the code expires at zero
//!   and can only be resent after expiry
//! - A correct code marks the email verified and immediately registers
//!   the account; the form then redirects after a short delay
//! - A failed registration returns the form to an editable state but
//!   keeps the email verified, so the retry skips straight to the
//!   register call
//!
//!
//!
//! ## Layout
//!
//! - [`validate`] — the field rule table, shared by submit-time and
//!   live checks so the two can never drift
//! - [`api`] — the account API client (plus a scripted mock for tests)
//! - [`otp`] — the verification session state machine, pure and
//!   event-driven
//! - [`runtime`] — countdown task, success auto-close, cancellation
//! - [`signup`] — the orchestrator tying the above together

pub mod api;
pub mod config;
pub mod error;
pub mod otp;
pub mod runtime;
pub mod signup;
pub mod validate;
