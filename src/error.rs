use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

use crate::validate::Field;

/// Shown whenever the account API fails without naming a field, and
/// whenever the request itself never made it out.
pub const GENERAL_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// One entry of the account API's structured failure list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldDetail {
    #[serde(default)]
    pub path: Vec<String>,
    pub message: String,
}

/// Failure body shape shared by every account API endpoint:
/// `{error, details: [{path: [field], message}]}`, both parts optional.
#[derive(Debug, Default, Deserialize)]
pub struct FailureBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Vec<FieldDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Non-2xx response, with whatever structure the body carried.
    #[error("request rejected (status {status})")]
    Rejected {
        status: u16,
        message: Option<String>,
        details: Vec<FieldDetail>,
    },

    /// The request itself failed: unreachable host, timeout, bad body.
    #[error("network failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Field-keyed and general errors as the form surfaces them. Local
/// validation and server `details` land in the same map so the form
/// renders both the same way.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    pub fields: BTreeMap<Field, String>,
    pub general: Option<String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_none()
    }

    pub fn from_validation(fields: BTreeMap<Field, &'static str>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(field, message)| (field, message.to_string()))
                .collect(),
            general: None,
        }
    }

    /// Maps an API failure onto the form: structured details land on
    /// their named fields, everything else collapses to one general
    /// message. Unknown field paths fall back to the general message
    /// rather than being dropped silently.
    pub fn from_api(error: &ApiError) -> Self {
        let mut mapped = Self::default();

        match error {
            ApiError::Rejected {
                message, details, ..
            } => {
                for detail in details {
                    match detail.path.first().and_then(|p| Field::from_path(p)) {
                        Some(field) => {
                            mapped.fields.insert(field, detail.message.clone());
                        }
                        None => {
                            mapped.general = Some(detail.message.clone());
                        }
                    }
                }

                if mapped.is_empty() {
                    mapped.general = Some(
                        message
                            .clone()
                            .unwrap_or_else(|| GENERAL_FAILURE_MESSAGE.to_string()),
                    );
                }
            }
            ApiError::Transport(_) => {
                mapped.general = Some(GENERAL_FAILURE_MESSAGE.to_string());
            }
        }

        mapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(details: Vec<FieldDetail>, message: Option<&str>) -> ApiError {
        ApiError::Rejected {
            status: 400,
            message: message.map(str::to_string),
            details,
        }
    }

    #[test]
    fn structured_details_map_to_fields() {
        let error = rejected(
            vec![FieldDetail {
                path: vec!["email".to_string()],
                message: "Email already registered".to_string(),
            }],
            None,
        );

        let mapped = FormErrors::from_api(&error);
        assert_eq!(
            mapped.fields.get(&Field::Email).map(String::as_str),
            Some("Email already registered")
        );
        assert_eq!(mapped.general, None);
    }

    #[test]
    fn message_only_failure_becomes_general() {
        let mapped = FormErrors::from_api(&rejected(vec![], Some("Registration closed")));
        assert!(mapped.fields.is_empty());
        assert_eq!(mapped.general.as_deref(), Some("Registration closed"));
    }

    #[test]
    fn bare_rejection_gets_the_stock_message() {
        let mapped = FormErrors::from_api(&rejected(vec![], None));
        assert_eq!(mapped.general.as_deref(), Some(GENERAL_FAILURE_MESSAGE));
    }

    #[test]
    fn transport_failure_gets_the_stock_message() {
        let mapped = FormErrors::from_api(&ApiError::Transport("connection refused".to_string()));
        assert!(mapped.fields.is_empty());
        assert_eq!(mapped.general.as_deref(), Some(GENERAL_FAILURE_MESSAGE));
    }

    #[test]
    fn unknown_detail_path_is_not_dropped() {
        let error = rejected(
            vec![FieldDetail {
                path: vec!["companyCode".to_string()],
                message: "Unknown company".to_string(),
            }],
            None,
        );

        let mapped = FormErrors::from_api(&error);
        assert!(mapped.fields.is_empty());
        assert_eq!(mapped.general.as_deref(), Some("Unknown company"));
    }
}
