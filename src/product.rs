//! Product entity and the request/response shapes of the catalog boundary.
//!
//! The `sku` is the business primary key: immutable once assigned and
//! globally unique in the local store. `stock` is never persisted locally;
//! reads re-fetch it from the remote inventory service and attach it as
//! [`ProductWithStock`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A locally persisted product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image: Option<String>,
    pub country: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product enriched with the remote stock count for read responses.
///
/// A product with no matching remote record reports `stock == 0`; it is
/// never omitted and never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductWithStock {
    #[serde(flatten)]
    pub product: Product,
    pub stock: i64,
}

/// Create-request body. The SKU is server-assigned, so it has no field here.
///
/// `stock` is the initial count mirrored to the remote inventory service.
/// It is required and must be non-negative; absence is rejected before any
/// store mutation, never defaulted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    pub country: String,
    pub category: String,
    pub stock: Option<i64>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Partial-update body: only fields present (and, for strings, non-empty
/// after trimming) overwrite existing values. `updated_at` is refreshed on
/// every update regardless of which fields are present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
}

impl ProductPatch {
    /// Trim string fields, drop the ones that are empty after trimming, and
    /// round the price to two fraction digits.
    pub fn normalized(&self) -> ProductPatch {
        fn trimmed(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }

        ProductPatch {
            name: trimmed(&self.name),
            price: self.price.map(round_price),
            description: trimmed(&self.description),
            image: trimmed(&self.image),
            country: trimmed(&self.country),
            category: trimmed(&self.category),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.country.is_none()
            && self.category.is_none()
    }
}

/// Round a price to the two-fraction-digit precision the store keeps.
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp(2)
}
