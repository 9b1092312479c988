//! Field validation rule table.
//!
//! Submit-time validation and the live per-keystroke flags both go
//! through [`validate_field`], so the two surfaces cannot disagree on
//! the same input.

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;

use crate::signup::RegistrationDraft;

/// Shared key an operator must present to register. Compared
/// client-side against this literal; the account API does not enforce
/// it. That is a known gap inherited from the dashboard contract, not
/// something this crate can fix on its own.
pub const SECURITY_KEY: &str = "VERDEX-EXPORT-2024";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[1-9][0-9]{0,15}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    Phone,
    SecurityKey,
    Password,
    ConfirmPassword,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Name,
        Field::Email,
        Field::Phone,
        Field::SecurityKey,
        Field::Password,
        Field::ConfirmPassword,
    ];

    /// Wire name, as the account API spells it in `details[].path`.
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::SecurityKey => "securityKey",
            Field::Password => "password",
            Field::ConfirmPassword => "confirmPassword",
        }
    }

    pub fn from_path(path: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == path)
    }
}

/// Checks one field against the rule table. `None` means acceptable.
pub fn validate_field(field: Field, draft: &RegistrationDraft) -> Option<&'static str> {
    match field {
        Field::Name => {
            let name = draft.name.trim();
            if name.is_empty() {
                Some("Name is required")
            } else if name.chars().count() < 2 {
                Some("Name must be at least 2 characters")
            } else {
                None
            }
        }
        Field::Email => {
            if draft.email.is_empty() {
                Some("Email is required")
            } else if !EMAIL_RE.is_match(&draft.email) {
                Some("Please enter a valid email address")
            } else {
                None
            }
        }
        Field::Phone => {
            let stripped: String = draft
                .phone
                .chars()
                .filter(|&c| !matches!(c, ' ' | '-' | '(' | ')'))
                .collect();
            if stripped.is_empty() {
                Some("Phone number is required")
            } else if !PHONE_RE.is_match(&stripped) {
                Some("Please enter a valid phone number")
            } else {
                None
            }
        }
        Field::SecurityKey => {
            if draft.security_key.is_empty() {
                Some("Security key is required")
            } else if draft.security_key != SECURITY_KEY {
                Some("Invalid security key")
            } else {
                None
            }
        }
        Field::Password => {
            let password = &draft.password;
            if password.is_empty() {
                Some("Password is required")
            } else if password.chars().count() < 8 {
                Some("Password must be at least 8 characters")
            } else if !password.chars().any(|c| c.is_ascii_lowercase())
                || !password.chars().any(|c| c.is_ascii_uppercase())
                || !password.chars().any(|c| c.is_ascii_digit())
            {
                Some("Password must contain an uppercase letter, a lowercase letter, and a number")
            } else {
                None
            }
        }
        Field::ConfirmPassword => {
            if draft.confirm_password.is_empty() {
                Some("Please confirm your password")
            } else if draft.confirm_password != draft.password {
                Some("Passwords do not match")
            } else {
                None
            }
        }
    }
}

/// Full-form check, no short-circuit: every invalid field gets its
/// message. Submission proceeds only when the result is empty.
pub fn validate_draft(draft: &RegistrationDraft) -> BTreeMap<Field, &'static str> {
    Field::ALL
        .into_iter()
        .filter_map(|field| validate_field(field, draft).map(|message| (field, message)))
        .collect()
}

/// Per-keystroke validity flags behind the inline form affordances.
/// Derived from the same predicates as [`validate_draft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveChecks {
    pub email: bool,
    pub phone: bool,
    pub security_key: bool,
    pub password_strength: bool,
    pub passwords_match: bool,
}

impl LiveChecks {
    pub fn of(draft: &RegistrationDraft) -> Self {
        Self {
            email: validate_field(Field::Email, draft).is_none(),
            phone: validate_field(Field::Phone, draft).is_none(),
            security_key: validate_field(Field::SecurityKey, draft).is_none(),
            password_strength: validate_field(Field::Password, draft).is_none(),
            passwords_match: validate_field(Field::ConfirmPassword, draft).is_none(),
        }
    }
}

/// Display transform for the phone field, run before validation on
/// every keystroke. Pure function of the digit sequence: strips
/// everything that is not a digit, keeps at most 10, and re-inserts
/// separators once enough digits exist.
pub fn format_phone(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).take(10).collect();

    match digits.len() {
        0..=3 => digits,
        4..=6 => format!("{}-{}", &digits[..3], &digits[3..]),
        _ => format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]),
    }
}
