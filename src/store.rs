//! Local product store.
//!
//! [`ProductStore`] and [`ProductWriter`] are the seams the orchestrator and
//! tests depend on; [`PgProductStore`] is the PostgreSQL implementation over
//! `may_postgres`, a blocking-style client that suspends the calling
//! coroutine at I/O boundaries.
//!
//! Transactions follow the compound-operation protocol: a writer stays open
//! while the remote inventory call is made, so a remote failure can still
//! roll the local mutation back. Every writer owns a dedicated connection,
//! because `BEGIN`/`COMMIT`/`ROLLBACK` are session-level statements and two
//! compound operations interleaved on one session would commit or discard
//! each other's statements. The `sku` primary-key constraint is the
//! authoritative arbiter for concurrent SKU generation; violations are
//! classified as [`StoreError::UniqueViolation`] so the caller can retry.

use chrono::{DateTime, Utc};
use may_postgres::error::SqlState;
use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use std::fmt;

use crate::product::{Product, ProductPatch};

/// Local store error.
#[derive(Debug)]
pub enum StoreError {
    /// PostgreSQL error from `may_postgres`.
    Postgres(PostgresError),
    /// Insert violated the `sku` uniqueness constraint; carries the key.
    UniqueViolation(String),
    /// The targeted row does not exist.
    RowNotFound,
    /// The transaction has already been committed or rolled back.
    TransactionClosed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Postgres(e) => write!(f, "PostgreSQL error: {e}"),
            StoreError::UniqueViolation(key) => {
                write!(f, "unique constraint violated for key {key}")
            }
            StoreError::RowNotFound => write!(f, "row not found"),
            StoreError::TransactionClosed => {
                write!(f, "transaction has already been committed or rolled back")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        StoreError::Postgres(err)
    }
}

impl StoreError {
    /// Classify an insert error, turning SQLSTATE 23505 into the
    /// [`StoreError::UniqueViolation`] collision signal for `key`.
    fn classify_insert(err: PostgresError, key: &str) -> Self {
        if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            StoreError::UniqueViolation(key.to_string())
        } else {
            StoreError::Postgres(err)
        }
    }
}

/// Read side of the local store plus the transaction entry point.
pub trait ProductStore {
    type Writer: ProductWriter;

    /// Begin a transaction scoped to one compound operation.
    fn begin(&self) -> Result<Self::Writer, StoreError>;

    fn find_all(&self) -> Result<Vec<Product>, StoreError>;
    fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError>;
    fn find_batch(&self, skus: &[String]) -> Result<Vec<Product>, StoreError>;

    /// Existence probe used by the SKU generator.
    fn sku_exists(&self, sku: &str) -> Result<bool, StoreError>;
}

/// Write side of the local store, valid until committed or rolled back.
pub trait ProductWriter {
    fn insert(&mut self, product: &Product) -> Result<(), StoreError>;

    /// Partial-field merge: only fields present in the (already normalized)
    /// patch overwrite existing values; `updated_at` is always refreshed.
    /// Returns the updated row.
    fn update(
        &mut self,
        sku: &str,
        patch: &ProductPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Product, StoreError>;

    fn delete(&mut self, sku: &str) -> Result<(), StoreError>;

    fn commit(self) -> Result<(), StoreError>;
    fn rollback(self) -> Result<(), StoreError>;
}

const SELECT_COLUMNS: &str =
    "sku, name, price, description, image, country, category, created_at, updated_at";

fn product_from_row(row: &Row) -> Result<Product, StoreError> {
    Ok(Product {
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        description: row.try_get("description")?,
        image: row.try_get("image")?,
        country: row.try_get("country")?,
        category: row.try_get("category")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// PostgreSQL-backed product store.
///
/// Reads share one pipelined connection; each transaction opens its own
/// (see [`ProductStore::begin`]).
pub struct PgProductStore {
    client: Client,
    url: String,
}

impl PgProductStore {
    /// Connect and wrap a store in one step.
    ///
    /// This is a blocking call that works within coroutines; the connection
    /// is established synchronously. The URL is kept so every transaction
    /// can open a session of its own.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let client = may_postgres::connect(url)?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Create the products table when it does not exist yet. Mirrors
    /// `migrations/0001_create_products.sql` for test and dev setups.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.client.execute(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                sku         TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                price       NUMERIC(12, 2) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                image       TEXT,
                country     TEXT NOT NULL,
                category    TEXT NOT NULL,
                created_at  TIMESTAMPTZ NOT NULL,
                updated_at  TIMESTAMPTZ NOT NULL
            )
            "#,
            &[],
        )?;
        Ok(())
    }
}

impl ProductStore for PgProductStore {
    type Writer = PgTxn;

    /// Open a transaction on a dedicated connection. Sharing the read
    /// session would let concurrent compound operations interleave their
    /// session-level `BEGIN`/`COMMIT`/`ROLLBACK` statements.
    fn begin(&self) -> Result<PgTxn, StoreError> {
        let session = may_postgres::connect(&self.url)?;
        PgTxn::new(session)
    }

    fn find_all(&self) -> Result<Vec<Product>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM products ORDER BY sku");
        let rows = self.client.query(sql.as_str(), &[])?;
        rows.iter().map(product_from_row).collect()
    }

    fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM products WHERE sku = $1");
        let rows = self.client.query(sql.as_str(), &[&sku])?;
        rows.first().map(product_from_row).transpose()
    }

    fn find_batch(&self, skus: &[String]) -> Result<Vec<Product>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM products WHERE sku = ANY($1) ORDER BY sku");
        let rows = self.client.query(sql.as_str(), &[&skus])?;
        rows.iter().map(product_from_row).collect()
    }

    fn sku_exists(&self, sku: &str) -> Result<bool, StoreError> {
        let rows = self
            .client
            .query("SELECT 1 FROM products WHERE sku = $1", &[&sku])?;
        Ok(!rows.is_empty())
    }
}

/// An open local transaction over its own `may_postgres` session.
///
/// Commit and rollback consume the transaction; any use after close is
/// rejected with [`StoreError::TransactionClosed`]. Dropping the session
/// without committing leaves the statements unapplied.
pub struct PgTxn {
    client: Client,
    closed: bool,
}

impl PgTxn {
    fn new(client: Client) -> Result<Self, StoreError> {
        client.execute("BEGIN", &[])?;
        Ok(Self {
            client,
            closed: false,
        })
    }

    fn guard(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::TransactionClosed)
        } else {
            Ok(())
        }
    }
}

impl ProductWriter for PgTxn {
    fn insert(&mut self, product: &Product) -> Result<(), StoreError> {
        self.guard()?;
        self.client
            .execute(
                r#"
                INSERT INTO products
                    (sku, name, price, description, image, country, category, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
                &[
                    &product.sku,
                    &product.name,
                    &product.price,
                    &product.description,
                    &product.image,
                    &product.country,
                    &product.category,
                    &product.created_at,
                    &product.updated_at,
                ],
            )
            .map_err(|e| StoreError::classify_insert(e, &product.sku))?;
        Ok(())
    }

    fn update(
        &mut self,
        sku: &str,
        patch: &ProductPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Product, StoreError> {
        self.guard()?;

        let mut assignments: Vec<String> = Vec::new();
        let mut params: Vec<&dyn ToSql> = Vec::new();
        let mut idx = 1;

        if let Some(name) = &patch.name {
            assignments.push(format!("name = ${idx}"));
            params.push(name);
            idx += 1;
        }
        if let Some(price) = &patch.price {
            assignments.push(format!("price = ${idx}"));
            params.push(price);
            idx += 1;
        }
        if let Some(description) = &patch.description {
            assignments.push(format!("description = ${idx}"));
            params.push(description);
            idx += 1;
        }
        if let Some(image) = &patch.image {
            assignments.push(format!("image = ${idx}"));
            params.push(image);
            idx += 1;
        }
        if let Some(country) = &patch.country {
            assignments.push(format!("country = ${idx}"));
            params.push(country);
            idx += 1;
        }
        if let Some(category) = &patch.category {
            assignments.push(format!("category = ${idx}"));
            params.push(category);
            idx += 1;
        }

        assignments.push(format!("updated_at = ${idx}"));
        params.push(&updated_at);
        idx += 1;

        params.push(&sku);
        let sql = format!(
            "UPDATE products SET {} WHERE sku = ${idx} RETURNING {SELECT_COLUMNS}",
            assignments.join(", "),
        );

        let rows = self.client.query(sql.as_str(), &params)?;
        match rows.first() {
            Some(row) => product_from_row(row),
            None => Err(StoreError::RowNotFound),
        }
    }

    fn delete(&mut self, sku: &str) -> Result<(), StoreError> {
        self.guard()?;
        let affected = self
            .client
            .execute("DELETE FROM products WHERE sku = $1", &[&sku])?;
        if affected == 0 {
            return Err(StoreError::RowNotFound);
        }
        Ok(())
    }

    fn commit(mut self) -> Result<(), StoreError> {
        self.guard()?;
        self.client.execute("COMMIT", &[])?;
        self.closed = true;
        Ok(())
    }

    fn rollback(mut self) -> Result<(), StoreError> {
        self.guard()?;
        self.client.execute("ROLLBACK", &[])?;
        self.closed = true;
        Ok(())
    }
}
