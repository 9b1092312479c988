//! Account API client.
//!
//! The dashboard backend exposes three JSON endpoints for the signup
//! flow; everything else it does is out of scope here. [`AccountApi`]
//! is the seam the orchestrator works against, [`HttpAccountApi`] is
//! the production implementation, and [`mock`] holds a scripted
//! in-memory stand-in for tests.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{ApiError, FailureBody},
};

pub const SEND_CODE_PATH: &str = "/api/auth/send-otp";
pub const VERIFY_CODE_PATH: &str = "/api/auth/verify-otp";
pub const REGISTER_PATH: &str = "/api/auth/register";

/// The three signup calls, in the order the flow issues them. Phone
/// and security key are deliberately absent from `register`: the wire
/// contract takes name, email, and password only.
#[allow(async_fn_in_trait)]
pub trait AccountApi {
    async fn request_code(&self, email: &str) -> Result<(), ApiError>;
    async fn verify_code(&self, email: &str, otp: &str) -> Result<(), ApiError>;
    async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError>;
}

pub struct HttpAccountApi {
    client: Client,
    base_url: String,
}

impl HttpAccountApi {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("HTTP client misconfigured!");

        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {url}");

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        // Failure bodies are best-effort: a non-JSON body still maps
        // to a plain rejection with the status attached.
        let body: FailureBody = response.json().await.unwrap_or_default();
        warn!("POST {url} rejected with status {status}");

        Err(ApiError::Rejected {
            status: status.as_u16(),
            message: body.error,
            details: body.details,
        })
    }
}

impl AccountApi for HttpAccountApi {
    async fn request_code(&self, email: &str) -> Result<(), ApiError> {
        self.post(SEND_CODE_PATH, json!({ "email": email })).await
    }

    async fn verify_code(&self, email: &str, otp: &str) -> Result<(), ApiError> {
        self.post(VERIFY_CODE_PATH, json!({ "email": email, "otp": otp }))
            .await
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        self.post(
            REGISTER_PATH,
            json!({ "name": name, "email": email, "password": password }),
        )
        .await
    }
}

pub mod mock {
    //! Scripted account API for tests: every call is recorded, and
    //! each endpoint pops from a queue of scripted outcomes (empty
    //! queue means success).

    use std::sync::Mutex;

    use crate::error::ApiError;

    use super::AccountApi;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        RequestCode { email: String },
        VerifyCode { email: String, otp: String },
        Register { name: String, email: String, password: String },
    }

    #[derive(Default)]
    struct Script {
        request_code: Vec<Result<(), ApiError>>,
        verify_code: Vec<Result<(), ApiError>>,
        register: Vec<Result<(), ApiError>>,
        calls: Vec<Call>,
    }

    #[derive(Default)]
    pub struct MockAccountApi {
        script: Mutex<Script>,
    }

    impl MockAccountApi {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues the outcome for the next `request_code` call.
        pub fn script_request_code(&self, outcome: Result<(), ApiError>) {
            self.lock().request_code.push(outcome);
        }

        pub fn script_verify_code(&self, outcome: Result<(), ApiError>) {
            self.lock().verify_code.push(outcome);
        }

        pub fn script_register(&self, outcome: Result<(), ApiError>) {
            self.lock().register.push(outcome);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.lock().calls.clone()
        }

        pub fn call_count(&self, matches: impl Fn(&Call) -> bool) -> usize {
            self.lock().calls.iter().filter(|c| matches(c)).count()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
            self.script.lock().expect("mock script lock poisoned")
        }

        fn take(queue: &mut Vec<Result<(), ApiError>>) -> Result<(), ApiError> {
            if queue.is_empty() {
                Ok(())
            } else {
                queue.remove(0)
            }
        }
    }

    impl AccountApi for MockAccountApi {
        async fn request_code(&self, email: &str) -> Result<(), ApiError> {
            let mut script = self.lock();
            script.calls.push(Call::RequestCode {
                email: email.to_string(),
            });
            Self::take(&mut script.request_code)
        }

        async fn verify_code(&self, email: &str, otp: &str) -> Result<(), ApiError> {
            let mut script = self.lock();
            script.calls.push(Call::VerifyCode {
                email: email.to_string(),
                otp: otp.to_string(),
            });
            Self::take(&mut script.verify_code)
        }

        async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
            let mut script = self.lock();
            script.calls.push(Call::Register {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            });
            Self::take(&mut script.register)
        }
    }
}
