//! # Shelfscan Utilities
//!
//! Helpers shared by the lookup client, the session engine and the binary:
//! strict HTTP response parsing, text and date formatting, and the
//! [`ProductCard`](card::ProductCard) view model consumed by the AR renderer.

pub mod card;
pub mod date_handling;
pub mod http;
pub mod text_processing;

pub use card::{NUTRI_SCORE_FALLBACK_COLOR, ProductCard, nutri_score_color};
pub use text_processing::{ingredients_excerpt, name_only, pretty_allergens};
