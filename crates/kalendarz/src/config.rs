//! Configuration loading from environment variables.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::order::DEFAULT_ORDER_URL;

pub const ORDER_URL_VAR: &str = "KALENDARZ_ORDER_URL";
pub const DATA_FILE_VAR: &str = "KALENDARZ_DATA_FILE";
pub const TIMEOUT_VAR: &str = "KALENDARZ_TIMEOUT_SECS";

/// Runtime settings for the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Where orders are posted
    pub order_url: String,

    /// JSON file with offer and order days
    pub data_file: PathBuf,

    /// Transport timeout for order requests; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            order_url: DEFAULT_ORDER_URL.to_string(),
            data_file: PathBuf::from("data").join("calendar.json"),
            request_timeout: None,
        }
    }
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// Reads a `.env` file first if one exists. Unset variables fall back to
    /// [`Settings::default`].
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(url) = lookup(ORDER_URL_VAR) {
            settings.order_url = url;
        }

        if let Some(path) = lookup(DATA_FILE_VAR) {
            settings.data_file = PathBuf::from(path);
        }

        if let Some(secs) = lookup(TIMEOUT_VAR) {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_VAR} must be a number of seconds, got {secs:?}"))?;
            settings.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(settings)
    }
}
