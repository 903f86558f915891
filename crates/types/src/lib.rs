//! # Shelfscan Types
//!
//! Shared type definitions for the Shelfscan workspace: the canonical
//! [`Product`] record produced by a lookup, the normalized
//! [`ProductDetails`] it is built from, barcode values delivered by the
//! camera collaborator, and the application [`AppMode`].

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod barcode;
pub mod product;

pub use barcode::{DecodedCode, Ean, EanError, Symbology};
pub use product::{
    FULL_NAME_SEPARATOR, NutriScore, NutrientLevel, Product, ProductDetails, ProductId, UNKNOWN_PRODUCT_NAME, compose_full_name,
};

/// Top-level presentation mode of the application.
///
/// The camera is only active while [`AppMode::Scanning`]; the AR overlay is
/// only shown while [`AppMode::ArDisplay`].
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    #[default]
    Scanning,
    ArDisplay,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::ArDisplay => "ar_display",
        }
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
