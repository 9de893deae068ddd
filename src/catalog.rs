//! Consistency orchestrator.
//!
//! Composes local-store operations with inventory-client calls so the two
//! stores never diverge visibly. Every compound write follows the same
//! ordering: the local mutation happens first inside an open transaction,
//! the remote call is made while that transaction is still open, and the
//! remote outcome gates commit versus rollback. The local store supports
//! rollback; the remote service exposes no compensating primitive this
//! system could safely invoke blind, so failure must be caught before the
//! local side is durably committed.
//!
//! Reads are enriched with remote stock via a left-merge: a product with no
//! matching remote record reports stock 0 and is never omitted, while a
//! failed remote fetch fails the whole read, because stock is a required
//! field of the response contract and partial results are never returned.

use chrono::Utc;

use crate::auth::AuthContext;
use crate::error::CatalogError;
use crate::inventory::{InventoryApi, InventoryRecord};
use crate::product::{self, NewProduct, Product, ProductPatch, ProductWithStock};
use crate::sku;
use crate::store::{ProductStore, ProductWriter, StoreError};

/// How many times a create retries generation after losing an insert race
/// before surfacing a conflict.
const MAX_SKU_ATTEMPTS: usize = 5;

/// The catalog service core, generic over its two collaborators.
pub struct Catalog<S, I> {
    store: S,
    inventory: I,
}

impl<S: ProductStore, I: InventoryApi> Catalog<S, I> {
    pub fn new(store: S, inventory: I) -> Self {
        Self { store, inventory }
    }

    /// All products, each enriched with its remote stock count.
    pub fn list(&self) -> Result<Vec<ProductWithStock>, CatalogError> {
        let products = self.store.find_all()?;
        let records = self.inventory.fetch_all()?;
        Ok(merge_stock(products, &records))
    }

    /// One product by SKU, enriched with its remote stock count.
    pub fn get(&self, sku: &str) -> Result<ProductWithStock, CatalogError> {
        let product = self
            .store
            .find_by_sku(sku)?
            .ok_or_else(|| CatalogError::NotFound(format!("no product with sku {sku}")))?;
        let codes = [sku.to_string()];
        let records = self.inventory.fetch_batch(&codes)?;
        let stock = stock_for(&records, sku);
        Ok(ProductWithStock { product, stock })
    }

    /// Products for the given codes. Codes with no local record are simply
    /// absent from the result; an empty request list is rejected.
    pub fn get_batch(&self, codes: &[String]) -> Result<Vec<ProductWithStock>, CatalogError> {
        if codes.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "provide a list of product codes".to_string(),
            ));
        }
        let products = self.store.find_batch(codes)?;
        let records = self.inventory.fetch_batch(codes)?;
        Ok(merge_stock(products, &records))
    }

    /// Create a product: assign a SKU, insert locally, mirror the initial
    /// stock to the inventory service, and commit only when both succeeded.
    ///
    /// The insert's uniqueness violation is the authoritative collision
    /// signal for concurrent SKU generation; on a lost race the generator
    /// retries from the failed sequence forward, up to a bounded budget.
    pub fn create(&self, ctx: &AuthContext, request: NewProduct) -> Result<Product, CatalogError> {
        require_write(ctx)?;

        let stock = match request.stock {
            Some(stock) if stock >= 0 => stock,
            Some(_) => {
                return Err(CatalogError::InvalidArgument(
                    "stock must be non-negative".to_string(),
                ))
            }
            None => {
                return Err(CatalogError::InvalidArgument(
                    "stock is required".to_string(),
                ))
            }
        };

        let name = request.name.trim();
        if name.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "name is required".to_string(),
            ));
        }
        if request.price.is_sign_negative() {
            return Err(CatalogError::InvalidArgument(
                "price must be non-negative".to_string(),
            ));
        }
        let (country_code, category_code) = sku::resolve(&request.country, &request.category)?;
        let price = product::round_price(request.price);

        let mut floor = sku::SEQUENCE_FLOOR;
        for _ in 0..MAX_SKU_ATTEMPTS {
            let (code, sequence) = sku::next_free(&self.store, country_code, category_code, floor)?;
            let now = Utc::now();
            let candidate = Product {
                sku: code.clone(),
                name: name.to_string(),
                price,
                description: request.description.trim().to_string(),
                image: request.image.clone(),
                country: request.country.clone(),
                category: request.category.clone(),
                created_at: now,
                updated_at: now,
            };

            let mut txn = self.store.begin()?;
            match txn.insert(&candidate) {
                Ok(()) => {
                    let records = [InventoryRecord {
                        product_code: code.clone(),
                        stock,
                    }];
                    match self.inventory.create(&ctx.token, &records) {
                        Ok(()) => {
                            txn.commit().map_err(|e| {
                                // The remote row now exists without a local
                                // counterpart; reconciliation is manual.
                                log::error!(
                                    "local commit failed after inventory create for {code}: {e}"
                                );
                                CatalogError::from(e)
                            })?;
                            log::info!("created product {code}");
                            return Ok(candidate);
                        }
                        Err(remote) => {
                            txn.rollback()?;
                            log::warn!("inventory create failed for {code}, rolled back: {remote}");
                            return Err(remote.into());
                        }
                    }
                }
                Err(StoreError::UniqueViolation(_)) => {
                    txn.rollback()?;
                    log::debug!("sku {code} lost the insert race, retrying forward");
                    floor = sequence + 1;
                }
                Err(other) => {
                    if let Err(rb) = txn.rollback() {
                        log::warn!("rollback after failed insert also failed: {rb}");
                    }
                    return Err(other.into());
                }
            }
        }

        Err(CatalogError::Conflict(format!(
            "could not allocate a unique sku after {MAX_SKU_ATTEMPTS} attempts"
        )))
    }

    /// Partial update of local fields only. Stock mutation is out of this
    /// entity's write path entirely; the remote service is never touched.
    pub fn update(
        &self,
        ctx: &AuthContext,
        sku: &str,
        patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        require_write(ctx)?;

        let patch = patch.normalized();
        if let Some(price) = patch.price {
            if price.is_sign_negative() {
                return Err(CatalogError::InvalidArgument(
                    "price must be non-negative".to_string(),
                ));
            }
        }
        if let Some(country) = &patch.country {
            if sku::country_code(country).is_none() {
                return Err(CatalogError::InvalidArgument(format!(
                    "not a valid country: {country}"
                )));
            }
        }
        if let Some(category) = &patch.category {
            if sku::category_code(category).is_none() {
                return Err(CatalogError::InvalidArgument(format!(
                    "not a valid category: {category}"
                )));
            }
        }

        let mut txn = self.store.begin()?;
        match txn.update(sku, &patch, Utc::now()) {
            Ok(updated) => {
                txn.commit()?;
                Ok(updated)
            }
            Err(err) => {
                if let Err(rb) = txn.rollback() {
                    log::warn!("rollback after failed update also failed: {rb}");
                }
                Err(err.into())
            }
        }
    }

    /// Delete a product locally and remove its mirrored remote record.
    ///
    /// The remote delete is made while the local transaction is still open;
    /// if it fails the local row survives, because a locally deleted product
    /// would leave its remote stock permanently unreachable.
    pub fn delete(&self, ctx: &AuthContext, sku: &str) -> Result<(), CatalogError> {
        require_write(ctx)?;

        let mut txn = self.store.begin()?;
        if let Err(err) = txn.delete(sku) {
            if let Err(rb) = txn.rollback() {
                log::warn!("rollback after failed delete also failed: {rb}");
            }
            return Err(err.into());
        }

        let codes = [sku.to_string()];
        match self.inventory.delete(&ctx.token, &codes) {
            Ok(()) => {
                txn.commit()?;
                log::info!("deleted product {sku}");
                Ok(())
            }
            Err(remote) => {
                txn.rollback()?;
                log::warn!("inventory delete failed for {sku}, rolled back: {remote}");
                Err(remote.into())
            }
        }
    }
}

fn require_write(ctx: &AuthContext) -> Result<(), CatalogError> {
    if ctx.can_write() {
        Ok(())
    } else {
        Err(CatalogError::Forbidden(
            "write access requires the admin role".to_string(),
        ))
    }
}

fn stock_for(records: &[InventoryRecord], sku: &str) -> i64 {
    records
        .iter()
        .find(|record| record.product_code == sku)
        .map(|record| record.stock)
        .unwrap_or(0)
}

/// Left-merge products with remote stock records: every product appears in
/// the result exactly once, with stock 0 when no record matches its SKU.
pub fn merge_stock(products: Vec<Product>, records: &[InventoryRecord]) -> Vec<ProductWithStock> {
    products
        .into_iter()
        .map(|product| {
            let stock = stock_for(records, &product.sku);
            ProductWithStock { product, stock }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(sku: &str) -> Product {
        let now = Utc::now();
        Product {
            sku: sku.to_string(),
            name: "Test".to_string(),
            price: Decimal::ONE,
            description: String::new(),
            image: None,
            country: "Finland".to_string(),
            category: "Lager".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn record(sku: &str, stock: i64) -> InventoryRecord {
        InventoryRecord {
            product_code: sku.to_string(),
            stock,
        }
    }

    #[test]
    fn merge_matches_by_exact_sku() {
        let merged = merge_stock(
            vec![product("10000-FIL"), product("10001-SEA")],
            &[record("10001-SEA", 7), record("10000-FIL", 3)],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].product.sku, "10000-FIL");
        assert_eq!(merged[0].stock, 3);
        assert_eq!(merged[1].stock, 7);
    }

    #[test]
    fn merge_defaults_missing_records_to_zero() {
        let merged = merge_stock(vec![product("10000-FIL")], &[record("10001-SEA", 7)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].stock, 0);
    }

    #[test]
    fn merge_of_nothing_is_nothing() {
        assert!(merge_stock(Vec::new(), &[record("10000-FIL", 1)]).is_empty());
    }
}
