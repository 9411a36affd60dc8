//! Order submission: the single outgoing request of the widget.

use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::types::DateKey;

/// Endpoint used when nothing else is configured.
pub const DEFAULT_ORDER_URL: &str = "https://example.com/order";

/// Why an order could not be placed.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// The endpoint answered with a non-success status.
    #[error("order endpoint responded with status {status}")]
    Rejected { status: u16 },

    /// The request could not be sent or no response came back.
    #[error("could not reach order endpoint: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Something that accepts an order for a date.
pub trait OrderSubmitter {
    fn submit(&self, date: &DateKey) -> impl Future<Output = Result<(), OrderError>> + Send;
}

/// JSON body of the order request
#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    date: &'a DateKey,
}

/// Posts orders to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpOrderClient {
    client: reqwest::Client,
    url: String,
}

impl HttpOrderClient {
    /// Create a client for `url`. Without a `timeout` the request waits as
    /// long as the transport allows.
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl OrderSubmitter for HttpOrderClient {
    async fn submit(&self, date: &DateKey) -> Result<(), OrderError> {
        let response = self
            .client
            .post(&self.url)
            .json(&OrderRequest { date })
            .send()
            .await
            .inspect_err(|e| error!(date = %date, url = %self.url, error = %e, "Order request failed"))?;

        let status = response.status();
        if !status.is_success() {
            warn!(date = %date, status = status.as_u16(), "Order rejected");
            return Err(OrderError::Rejected {
                status: status.as_u16(),
            });
        }

        info!(date = %date, "Order placed");
        Ok(())
    }
}

/// Message shown to the user after a submission attempt.
pub fn notice(result: &Result<DateKey, OrderError>) -> String {
    match result {
        Ok(date) => format!("Order for {date} has been placed."),
        Err(OrderError::Rejected { .. }) => {
            "An error occurred while placing the order.".to_string()
        }
        Err(OrderError::Transport(_)) => "Could not connect to the server.".to_string(),
    }
}
