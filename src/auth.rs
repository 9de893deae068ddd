//! Access-guard contract.
//!
//! Credential verification itself (signature, expiry, signing key) is an
//! external collaborator; this module fixes the shape the catalog depends
//! on: a request-scoped [`AuthContext`] carrying the verified identity, its
//! role, and the raw bearer credential. The raw credential is kept because
//! the remote inventory service performs its own authorization check and
//! the orchestrator must re-present the caller's identity verbatim.

use std::fmt;

/// The role with write privilege over the catalog.
pub const ROLE_ADMIN: &str = "admin";

/// Request-scoped identity bundle produced by an [`AccessGuard`].
/// Never persisted; constructed fresh per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Subject identifier from the verified credential.
    pub subject: String,
    /// Display name, when the credential carries one.
    pub name: String,
    /// Role claim, checked against [`ROLE_ADMIN`] for writes.
    pub role: String,
    /// The raw bearer credential, forwarded to the remote inventory service.
    pub token: String,
}

impl AuthContext {
    /// Whether this identity may create, update, or delete products.
    pub fn can_write(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Authentication/authorization error.
#[derive(Debug)]
pub enum AuthError {
    /// No credential presented, or the credential failed verification.
    Unauthenticated(String),
    /// Verified identity without the required privilege.
    Forbidden(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Unauthenticated(detail) => write!(f, "not authenticated: {detail}"),
            AuthError::Forbidden(detail) => write!(f, "not allowed: {detail}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Verifies a raw `Authorization` header value into an [`AuthContext`].
pub trait AccessGuard {
    fn authenticate(&self, authorization: Option<&str>) -> Result<AuthContext, AuthError>;
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
