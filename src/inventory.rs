//! Remote inventory service client.
//!
//! A thin synchronous RPC wrapper over the stock service's HTTP API: no
//! business logic and no retries. Retry policy belongs to the orchestrator,
//! which is the only place that knows whether the local half of a compound
//! operation has already been applied.
//!
//! Wire protocol: `GET {base}` for everything, `GET {base}?productCodes=a&
//! productCodes=b` for a batch, `POST {base}` with `[{productCode, stock}]`
//! and a bearer credential, `DELETE {base}` with `[{productCode}]` and a
//! bearer credential.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::InventoryConfig;

/// One remote stock record, keyed by `productCode == sku`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub product_code: String,
    pub stock: i64,
}

/// Delete-request body item: the code alone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductCodeRef {
    product_code: String,
}

/// Inventory client error.
#[derive(Debug)]
pub enum InventoryError {
    /// The remote service answered with a non-success status; carries the
    /// remote-reported status and body verbatim.
    Rejected { status: u16, detail: String },
    /// Transport-level failure: timeout, connection refused, or a response
    /// body that did not parse.
    Unreachable(String),
}

impl fmt::Display for InventoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryError::Rejected { status, detail } => {
                write!(f, "inventory service rejected the call ({status}): {detail}")
            }
            InventoryError::Unreachable(detail) => {
                write!(f, "inventory service unreachable: {detail}")
            }
        }
    }
}

impl std::error::Error for InventoryError {}

/// The stock-service operations the orchestrator composes with.
///
/// A code missing from a fetch response means "stock unknown", which readers
/// treat as zero; it is never an error.
pub trait InventoryApi {
    fn fetch_all(&self) -> Result<Vec<InventoryRecord>, InventoryError>;
    fn fetch_batch(&self, codes: &[String]) -> Result<Vec<InventoryRecord>, InventoryError>;
    fn create(
        &self,
        credential: &str,
        records: &[InventoryRecord],
    ) -> Result<(), InventoryError>;
    fn delete(&self, credential: &str, codes: &[String]) -> Result<(), InventoryError>;
}

/// HTTP implementation over a `ureq` agent with a bounded per-call timeout.
/// A timeout classifies as [`InventoryError::Unreachable`].
pub struct HttpInventoryClient {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpInventoryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &InventoryConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    fn parse_records(response: ureq::Response) -> Result<Vec<InventoryRecord>, InventoryError> {
        response
            .into_json::<Vec<InventoryRecord>>()
            .map_err(|e| InventoryError::Unreachable(format!("malformed inventory response: {e}")))
    }
}

fn bearer(credential: &str) -> String {
    format!("Bearer {credential}")
}

fn classify(err: ureq::Error) -> InventoryError {
    match err {
        ureq::Error::Status(status, response) => InventoryError::Rejected {
            status,
            detail: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => InventoryError::Unreachable(transport.to_string()),
    }
}

impl InventoryApi for HttpInventoryClient {
    fn fetch_all(&self) -> Result<Vec<InventoryRecord>, InventoryError> {
        let response = self.agent.get(&self.base_url).call().map_err(classify)?;
        Self::parse_records(response)
    }

    fn fetch_batch(&self, codes: &[String]) -> Result<Vec<InventoryRecord>, InventoryError> {
        let mut request = self.agent.get(&self.base_url);
        for code in codes {
            request = request.query("productCodes", code);
        }
        let response = request.call().map_err(classify)?;
        Self::parse_records(response)
    }

    fn create(
        &self,
        credential: &str,
        records: &[InventoryRecord],
    ) -> Result<(), InventoryError> {
        self.agent
            .post(&self.base_url)
            .set("Authorization", &bearer(credential))
            .send_json(records)
            .map_err(classify)?;
        Ok(())
    }

    fn delete(&self, credential: &str, codes: &[String]) -> Result<(), InventoryError> {
        let body: Vec<ProductCodeRef> = codes
            .iter()
            .map(|code| ProductCodeRef {
                product_code: code.clone(),
            })
            .collect();
        self.agent
            .delete(&self.base_url)
            .set("Authorization", &bearer(credential))
            .send_json(body)
            .map_err(classify)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_camel_case_wire_names() {
        let record = InventoryRecord {
            product_code: "10000-FIL".to_string(),
            stock: 10,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"productCode":"10000-FIL","stock":10}"#);

        let parsed: InventoryRecord =
            serde_json::from_str(r#"{"productCode":"10000-FIL","stock":10}"#).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn delete_body_carries_code_only() {
        let body = ProductCodeRef {
            product_code: "10000-FIL".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"productCode":"10000-FIL"}"#
        );
    }

    #[test]
    fn error_display_carries_remote_detail() {
        let err = InventoryError::Rejected {
            status: 422,
            detail: "stock must be a number".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("422"));
        assert!(text.contains("stock must be a number"));
    }
}
