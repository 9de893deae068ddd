//! Service-wide error taxonomy.
//!
//! Every error carries a machine-stable [`kind`](CatalogError::kind) plus a
//! human-readable message. Remote failures keep the remote-reported detail
//! verbatim so a caller can distinguish "nothing happened" from "local
//! happened, remote failed, rolled back".

use std::fmt;

use crate::auth::AuthError;
use crate::inventory::InventoryError;
use crate::sku::SkuError;
use crate::store::StoreError;

#[derive(Debug)]
pub enum CatalogError {
    /// Bad or missing input, rejected before any store mutation.
    InvalidArgument(String),
    /// No credential, or the credential failed verification.
    Unauthenticated(String),
    /// Valid credential, insufficient role.
    Forbidden(String),
    /// No local record for the given key.
    NotFound(String),
    /// SKU collision survived the retry budget.
    Conflict(String),
    /// The inventory service answered with a non-success status.
    RemoteRejected { status: u16, detail: String },
    /// The inventory service could not be reached (incl. timeout).
    RemoteUnreachable(String),
    /// Local persistence failure.
    StoreUnavailable(String),
}

impl CatalogError {
    /// Machine-stable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::InvalidArgument(_) => "invalid_argument",
            CatalogError::Unauthenticated(_) => "unauthenticated",
            CatalogError::Forbidden(_) => "forbidden",
            CatalogError::NotFound(_) => "not_found",
            CatalogError::Conflict(_) => "conflict",
            CatalogError::RemoteRejected { .. } => "remote_rejected",
            CatalogError::RemoteUnreachable(_) => "remote_unreachable",
            CatalogError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            CatalogError::Unauthenticated(msg) => write!(f, "unauthenticated: {msg}"),
            CatalogError::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            CatalogError::NotFound(msg) => write!(f, "not found: {msg}"),
            CatalogError::Conflict(msg) => write!(f, "conflict: {msg}"),
            CatalogError::RemoteRejected { status, detail } => {
                write!(f, "inventory service rejected the call ({status}): {detail}")
            }
            CatalogError::RemoteUnreachable(msg) => {
                write!(f, "inventory service unreachable: {msg}")
            }
            CatalogError::StoreUnavailable(msg) => write!(f, "product store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RowNotFound => CatalogError::NotFound("no such product".to_string()),
            StoreError::UniqueViolation(key) => {
                CatalogError::Conflict(format!("sku already exists: {key}"))
            }
            other => CatalogError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<InventoryError> for CatalogError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Rejected { status, detail } => {
                CatalogError::RemoteRejected { status, detail }
            }
            InventoryError::Unreachable(detail) => CatalogError::RemoteUnreachable(detail),
        }
    }
}

impl From<AuthError> for CatalogError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(detail) => CatalogError::Unauthenticated(detail),
            AuthError::Forbidden(detail) => CatalogError::Forbidden(detail),
        }
    }
}

impl From<SkuError> for CatalogError {
    fn from(err: SkuError) -> Self {
        match err {
            SkuError::Store(store) => store.into(),
            unknown_name => CatalogError::InvalidArgument(unknown_name.to_string()),
        }
    }
}
