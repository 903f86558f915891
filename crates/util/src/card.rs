//! Product card view model.
//!
//! The AR renderer receives either nothing (placeholder) or a [`ProductCard`]
//! built from the current [`Product`]. Layout and styling stay with the
//! renderer; this module only decides the text of each line.

use serde::Serialize;
use shelfscan_types::{NutriScore, Product};

use crate::date_handling::format_scan_time;
use crate::text_processing::{ingredients_excerpt, name_only, pretty_allergens};

/// Text shown by the renderer when no product has been scanned yet.
pub const PLACEHOLDER_TEXT: &str = "Scan a product first";

/// Colour used when no Nutri-Score grade is known.
pub const NUTRI_SCORE_FALLBACK_COLOR: &str = "#E0E0E0";

/// Longest ingredients excerpt shown on a card, in characters.
pub const INGREDIENTS_EXCERPT_CHARS: usize = 120;

const EMPTY_LINE: &str = "—";

/// Hex colour for a Nutri-Score grade.
pub fn nutri_score_color(grade: Option<NutriScore>) -> &'static str {
    match grade {
        Some(NutriScore::A) => "#11A611",
        Some(NutriScore::B) => "#5BC236",
        Some(NutriScore::C) => "#FFCC00",
        Some(NutriScore::D) => "#FF8C00",
        Some(NutriScore::E) => "#E53935",
        None => NUTRI_SCORE_FALLBACK_COLOR,
    }
}

/// Structured text of the AR label panel for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    pub ean: String,
    pub brand: String,
    pub name: String,
    pub quantity: Option<String>,
    pub allergens: String,
    pub nutri_score: String,
    pub nutri_score_color: &'static str,
    pub ingredients: Option<String>,
    pub image_url: Option<String>,
    pub scanned_at: String,
}

impl ProductCard {
    pub fn from_product(product: &Product) -> Self {
        let brand = product.brand.as_deref().map(str::trim).filter(|brand| !brand.is_empty());
        let allergens = match product.allergens.as_deref() {
            Some(list) if !list.is_empty() => format!("Allergens: {}", pretty_allergens(list)),
            _ => format!("Allergens: {EMPTY_LINE}"),
        };
        let nutri_score = product
            .nutri_score
            .map(|grade| grade.as_str().to_ascii_uppercase())
            .unwrap_or_else(|| "N/A".to_string());

        Self {
            ean: product.ean().to_string(),
            brand: brand.unwrap_or(EMPTY_LINE).to_string(),
            name: name_only(product.full_name(), brand),
            quantity: product.quantity.clone(),
            allergens,
            nutri_score: format!("Nutri-Score: {nutri_score}"),
            nutri_score_color: nutri_score_color(product.nutri_score),
            ingredients: product
                .ingredients_text
                .as_deref()
                .map(|text| ingredients_excerpt(text, INGREDIENTS_EXCERPT_CHARS))
                .filter(|text| !text.is_empty()),
            image_url: product.image_url.clone(),
            scanned_at: format_scan_time(&product.scanned_at()),
        }
    }

    /// Card lines in panel order: brand, name, quantity, allergens, grade, ingredients, scan time.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.brand.clone(), self.name.clone()];
        if let Some(quantity) = &self.quantity {
            lines.push(quantity.clone());
        }
        lines.push(self.allergens.clone());
        lines.push(self.nutri_score.clone());
        if let Some(ingredients) = &self.ingredients {
            lines.push(format!("Ingredients: {ingredients}"));
        }
        lines.push(format!("Scanned {}", self.scanned_at));
        lines
    }
}
