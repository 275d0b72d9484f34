//! Outbound push to replica endpoints.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::Namespace;
use crate::error::{Effect, Transience};

/// One processed change record, as pushed to a replica. A skipped
/// record is never sent; a deletion carries no payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncDelivery {
    pub namespace: Namespace,
    pub record_id: String,
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("push to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("replica endpoint {url} answered {status}")]
    Rejected { url: String, status: u16 },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}

impl DeliveryError {
    pub fn transience(&self) -> Transience {
        match self {
            DeliveryError::Network { .. } | DeliveryError::Rejected { .. } => {
                Transience::Retryable
            }
            DeliveryError::Client(_) => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            // A timed-out push may still have been applied; replicas
            // must apply re-deliveries idempotently.
            DeliveryError::Network { .. } => Effect::Unknown,
            DeliveryError::Rejected { .. } | DeliveryError::Client(_) => Effect::None,
        }
    }
}

/// Confirmed, per-record push to one replica endpoint.
pub trait SyncTransport: Send + Sync {
    /// Returns only once the replica has acknowledged the delivery.
    fn push(&self, url: &str, delivery: &SyncDelivery) -> Result<(), DeliveryError>;
}

/// HTTP transport posting each delivery to `<base>/api/sync`.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Client)?;
        Ok(Self { client })
    }
}

impl SyncTransport for HttpTransport {
    fn push(&self, url: &str, delivery: &SyncDelivery) -> Result<(), DeliveryError> {
        let endpoint = format!("{}/api/sync", url.trim_end_matches('/'));
        let response = self
            .client
            .post(&endpoint)
            .json(delivery)
            .send()
            .map_err(|source| DeliveryError::Network {
                url: endpoint.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                url: endpoint,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
