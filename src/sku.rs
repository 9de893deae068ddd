//! SKU generation.
//!
//! A SKU has the form `{sequence}-{countryCode}{categoryCode}`: a plain
//! decimal sequence starting at [`SEQUENCE_FLOOR`], a 2-letter country code
//! and a 1-letter category code, both resolved through closed mappings.
//!
//! The generator probes the local store for the first free sequence number.
//! The probe and the eventual insert are not atomic with each other, so the
//! store's uniqueness constraint on `sku` is the authoritative collision
//! signal: when an insert loses the race the caller retries generation from
//! the failed sequence forward (see [`next_free`]).

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

use crate::store::{ProductStore, StoreError};

/// The lowest sequence number ever issued.
pub const SEQUENCE_FLOOR: u64 = 10_000;

/// Closed country-name (Swedish) to ISO 3166-1 alpha-2 code mapping.
static COUNTRY_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("USA", "US"),
        ("Kanada", "CA"),
        ("Tyskland", "DE"),
        ("Storbritannien", "GB"),
        ("Frankrike", "FR"),
        ("Italien", "IT"),
        ("Spanien", "ES"),
        ("Australien", "AU"),
        ("Japan", "JP"),
        ("Brasilien", "BR"),
        ("Indien", "IN"),
        ("Mexiko", "MX"),
        ("Nederländerna", "NL"),
        ("Kina", "CN"),
        ("Sydkorea", "KR"),
        ("Sydafrika", "ZA"),
        ("Nya Zeeland", "NZ"),
        ("Belgien", "BE"),
        ("Sverige", "SE"),
        ("Schweiz", "CH"),
        ("Danmark", "DK"),
        ("Norge", "NO"),
        ("Finland", "FI"),
        ("Irland", "IE"),
        ("Ryssland", "RU"),
        ("Argentina", "AR"),
        ("Tjeckien", "CZ"),
        ("Polen", "PL"),
        ("Österrike", "AT"),
        ("Vietnam", "VN"),
        ("Thailand", "TH"),
        ("Filippinerna", "PH"),
        ("Colombia", "CO"),
        ("Peru", "PE"),
        ("Chile", "CL"),
        ("Ukraina", "UA"),
        ("Serbien", "RS"),
        ("Ungern", "HU"),
    ])
});

/// Closed beer-category to 1-letter code mapping.
static CATEGORY_CODES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Lager", "L"),
        ("Ale", "A"),
        ("IPA", "I"),
        ("Stout & Porter", "S"),
        ("Veteöl", "W"),
        ("Pilsner", "P"),
        ("Suröl & Specialöl", "O"),
    ])
});

/// SKU generation error.
#[derive(Debug)]
pub enum SkuError {
    /// The country name is not in the closed mapping.
    UnknownCountry(String),
    /// The category name is not in the closed mapping.
    UnknownCategory(String),
    /// The existence probe against the local store failed.
    Store(StoreError),
}

impl fmt::Display for SkuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkuError::UnknownCountry(name) => write!(f, "not a valid country: {name}"),
            SkuError::UnknownCategory(name) => write!(f, "not a valid category: {name}"),
            SkuError::Store(e) => write!(f, "store error during sku probe: {e}"),
        }
    }
}

impl std::error::Error for SkuError {}

impl From<StoreError> for SkuError {
    fn from(err: StoreError) -> Self {
        SkuError::Store(err)
    }
}

/// Look up the 2-letter code for a country name.
pub fn country_code(name: &str) -> Option<&'static str> {
    COUNTRY_CODES.get(name).copied()
}

/// Look up the 1-letter code for a category name.
pub fn category_code(name: &str) -> Option<&'static str> {
    CATEGORY_CODES.get(name).copied()
}

/// Resolve both closed mappings, rejecting unknown names without touching
/// the store.
pub fn resolve(country: &str, category: &str) -> Result<(&'static str, &'static str), SkuError> {
    let country_code =
        country_code(country).ok_or_else(|| SkuError::UnknownCountry(country.to_string()))?;
    let category_code =
        category_code(category).ok_or_else(|| SkuError::UnknownCategory(category.to_string()))?;
    Ok((country_code, category_code))
}

/// Generate a free SKU for the given country and category names.
///
/// Resolves the closed mappings first (unknown names are rejected with no
/// store query performed), then probes ascending from [`SEQUENCE_FLOOR`].
pub fn generate<S: ProductStore>(
    store: &S,
    country: &str,
    category: &str,
) -> Result<String, SkuError> {
    let (country_code, category_code) = resolve(country, category)?;
    let (code, _) = next_free(store, country_code, category_code, SEQUENCE_FLOOR)?;
    Ok(code)
}

/// Probe the store ascending from `floor` and return the first free
/// candidate together with its sequence number.
///
/// The search is strictly sequential with no upper ceiling; every occupied
/// slot costs one store round-trip. A store error during the existence check
/// propagates immediately rather than being retried.
pub fn next_free<S: ProductStore>(
    store: &S,
    country_code: &str,
    category_code: &str,
    floor: u64,
) -> Result<(String, u64), SkuError> {
    let mut sequence = floor.max(SEQUENCE_FLOOR);
    loop {
        let candidate = format!("{sequence}-{country_code}{category_code}");
        if !store.sku_exists(&candidate)? {
            return Ok((candidate, sequence));
        }
        log::debug!("sku candidate {candidate} is taken, probing next");
        sequence += 1;
    }
}

/// Parse the numeric sequence prefix of a SKU.
pub fn sequence_of(sku: &str) -> Option<u64> {
    sku.split_once('-').and_then(|(n, _)| n.parse().ok())
}
