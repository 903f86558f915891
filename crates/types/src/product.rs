//! Canonical product model.
//!
//! [`ProductDetails`] is the normalized view of an upstream payload where
//! every field may be absent. [`Product`] is the record held by the
//! application for one accepted scan; it always carries the scanned EAN, a
//! non-empty display name and the time of the scan.

use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Display name used whenever no brand, name or quantity could be resolved.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown Product";

/// Separator placed between brand, name and quantity in a full name.
pub const FULL_NAME_SEPARATOR: &str = " • ";

static NEXT_PRODUCT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local identifier, unique for every product created in this process.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Allocate the next identifier.
    pub fn next() -> Self {
        Self(NEXT_PRODUCT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Nutri-Score grade, `a` (best) through `e` (worst).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutriScore {
    A,
    B,
    C,
    D,
    E,
}

impl NutriScore {
    /// Accept exactly one of `a`..`e` in either case; anything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" => Some(Self::A),
            "b" => Some(Self::B),
            "c" => Some(Self::C),
            "d" => Some(Self::D),
            "e" => Some(Self::E),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
            Self::D => "d",
            Self::E => "e",
        }
    }
}

impl fmt::Display for NutriScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NutriScore {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid Nutri-Score grade '{s}'"))
    }
}

/// Qualitative level reported for a single nutrient (fat, salt, sugars, ...).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NutrientLevel {
    Low,
    Moderate,
    High,
}

impl NutrientLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "moderate" => Some(Self::Moderate),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

impl fmt::Display for NutrientLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized product fields resolved from an upstream payload.
///
/// Every field is optional; an empty payload yields `ProductDetails::default()`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub quantity: Option<String>,
    pub image_url: Option<String>,
    pub nutri_score: Option<NutriScore>,
    pub allergens: Option<Vec<String>>,
    pub ingredients_text: Option<String>,
    pub nutrient_levels: Option<IndexMap<String, NutrientLevel>>,
}

impl ProductDetails {
    /// Full display name composed from brand, name and quantity.
    pub fn full_name(&self) -> String {
        compose_full_name(self.brand.as_deref(), self.name.as_deref(), self.quantity.as_deref())
    }

    /// True when nothing at all was resolved.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Join brand, name and quantity with [`FULL_NAME_SEPARATOR`], skipping absent
/// or blank parts. Falls back to [`UNKNOWN_PRODUCT_NAME`].
///
/// # Example
/// ```rust
/// use shelfscan_types::compose_full_name;
///
/// assert_eq!(compose_full_name(Some("Ferrero"), Some("Nutella"), Some("400 g")), "Ferrero • Nutella • 400 g");
/// assert_eq!(compose_full_name(None, Some("Nutella"), None), "Nutella");
/// assert_eq!(compose_full_name(None, None, None), "Unknown Product");
/// ```
pub fn compose_full_name(brand: Option<&str>, name: Option<&str>, quantity: Option<&str>) -> String {
    let joined = [brand, name, quantity]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(FULL_NAME_SEPARATOR);
    if joined.is_empty() {
        UNKNOWN_PRODUCT_NAME.to_string()
    } else {
        joined
    }
}

/// The record held as "current product" for one accepted scan.
///
/// Identity fields (`id`, `ean`, `full_name`, `scanned_at`) are fixed at
/// construction; the descriptive fields are plain data for the renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    ean: String,
    full_name: String,
    pub brand: Option<String>,
    pub quantity: Option<String>,
    pub image_url: Option<String>,
    pub nutri_score: Option<NutriScore>,
    pub allergens: Option<Vec<String>>,
    pub ingredients_text: Option<String>,
    pub nutrient_levels: Option<IndexMap<String, NutrientLevel>>,
    scanned_at: DateTime<Utc>,
}

impl Product {
    /// Build a product for `ean` from resolved details.
    pub fn from_details(ean: impl Into<String>, details: ProductDetails, scanned_at: DateTime<Utc>) -> Self {
        let full_name = details.full_name();
        Self {
            id: ProductId::next(),
            ean: ean.into(),
            full_name,
            brand: details.brand,
            quantity: details.quantity,
            image_url: details.image_url,
            nutri_score: details.nutri_score,
            allergens: details.allergens,
            ingredients_text: details.ingredients_text,
            nutrient_levels: details.nutrient_levels,
            scanned_at,
        }
    }

    /// Minimal record substituted when a lookup fails.
    pub fn placeholder(ean: impl Into<String>, scanned_at: DateTime<Utc>) -> Self {
        Self::from_details(ean, ProductDetails::default(), scanned_at)
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn ean(&self) -> &str {
        &self.ean
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn scanned_at(&self) -> DateTime<Utc> {
        self.scanned_at
    }

    /// True when the record carries nothing beyond the fallback name.
    pub fn is_unknown(&self) -> bool {
        self.full_name == UNKNOWN_PRODUCT_NAME && self.brand.is_none()
    }
}
