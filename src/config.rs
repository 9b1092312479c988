use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            api_base_url: try_load("VERDEX_API_URL", "http://localhost:1100"),
            request_timeout_ms: try_load("VERDEX_TIMEOUT_MS", "5000"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
