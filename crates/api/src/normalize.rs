//! Product payload normalization.
//!
//! Upstream product payloads are loosely typed: fields may be missing, hold
//! the wrong JSON type, be stored under locale-suffixed keys
//! (`product_name_fr`) or live inside nested image-selection objects. Every
//! resolver here is total: a field that cannot be resolved is `None`, never
//! an error.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use shelfscan_types::{NutriScore, NutrientLevel, ProductDetails};
use url::Url;

/// Locales tried after the declared locale and English.
pub const FALLBACK_LOCALES: &[&str] = &["fr", "de", "es", "it"];

const ENGLISH: &str = "en";

/// Keys holding the payload's declared language code, in priority order.
const LOCALE_KEYS: &[&str] = &["lang", "lc"];
const SPECIFIC_NAME_FIELD: &str = "product_name";
const GENERIC_NAME_FIELD: &str = "generic_name";
const INGREDIENTS_FIELD: &str = "ingredients_text";
const BRANDS_FIELD: &str = "brands";
const QUANTITY_FIELD: &str = "quantity";
const QUANTITY_AMOUNT_FIELD: &str = "product_quantity";
const QUANTITY_UNIT_FIELD: &str = "product_quantity_unit";
const ALLERGEN_TAGS_FIELD: &str = "allergens_tags";
const ALLERGENS_TEXT_FIELD: &str = "allergens";
const IMAGE_URL_FIELDS: &[&str] = &["image_front_url", "image_url"];
const NUTRI_SCORE_FIELDS: &[&str] = &["nutriscore_grade", "nutrition_grades"];
const NUTRIENT_LEVELS_FIELD: &str = "nutrient_levels";

/// Where a candidate key in a localized lookup comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Declared,
    English,
    Fallback,
    Bare,
}

/// One entry of a localized lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKey {
    pub key: String,
    pub source: KeySource,
}

/// Ordered keys to try for `field`: declared locale, English, fallback locales, bare name.
///
/// Duplicate keys (for example a declared locale of `en`) are listed once.
///
/// # Example
/// ```rust
/// use shelfscan_api::normalize::localized_candidates;
///
/// let keys: Vec<String> = localized_candidates("product_name", Some("de"))
///     .into_iter()
///     .map(|candidate| candidate.key)
///     .collect();
/// assert_eq!(
///     keys,
///     ["product_name_de", "product_name_en", "product_name_fr", "product_name_es", "product_name_it", "product_name"]
/// );
/// ```
pub fn localized_candidates(field: &str, locale: Option<&str>) -> Vec<CandidateKey> {
    let mut candidates: Vec<CandidateKey> = Vec::with_capacity(FALLBACK_LOCALES.len() + 3);
    let mut push = |key: String, source: KeySource| {
        if !candidates.iter().any(|existing| existing.key == key) {
            candidates.push(CandidateKey { key, source });
        }
    };

    if let Some(locale) = locale {
        push(format!("{field}_{locale}"), KeySource::Declared);
    }
    push(format!("{field}_{ENGLISH}"), KeySource::English);
    for fallback in FALLBACK_LOCALES {
        push(format!("{field}_{fallback}"), KeySource::Fallback);
    }
    push(field.to_string(), KeySource::Bare);
    candidates
}

/// Map a raw product payload onto [`ProductDetails`].
///
/// Anything other than a JSON object yields empty details.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use shelfscan_api::normalize::normalize_product;
///
/// let details = normalize_product(&json!({
///     "product_name": " Nutella ",
///     "brands": "Ferrero, Nutella",
///     "allergens_tags": ["en:milk", "en:soy-beans"],
///     "nutriscore_grade": "E",
/// }));
/// assert_eq!(details.name.as_deref(), Some("Nutella"));
/// assert_eq!(details.brand.as_deref(), Some("Ferrero"));
/// assert_eq!(details.allergens, Some(vec!["milk".to_string(), "soy beans".to_string()]));
/// assert_eq!(details.full_name(), "Ferrero • Nutella");
/// ```
pub fn normalize_product(raw: &Value) -> ProductDetails {
    let Some(payload) = raw.as_object() else {
        return ProductDetails::default();
    };
    let locale = declared_locale(payload);

    ProductDetails {
        name: resolve_name(payload, locale.as_deref()),
        brand: resolve_brand(payload),
        quantity: resolve_quantity(payload),
        image_url: resolve_image_url(payload, locale.as_deref()),
        nutri_score: resolve_nutri_score(payload),
        allergens: resolve_allergens(payload),
        ingredients_text: resolve_localized(payload, INGREDIENTS_FIELD, locale.as_deref()),
        nutrient_levels: resolve_nutrient_levels(payload),
    }
}

/// The payload's declared language code, lower-cased.
pub fn declared_locale(payload: &Map<String, Value>) -> Option<String> {
    LOCALE_KEYS
        .iter()
        .find_map(|key| string_field(payload, key))
        .map(|locale| locale.to_ascii_lowercase())
}

/// Specific name through the locale chain, then generic name through the same chain.
pub fn resolve_name(payload: &Map<String, Value>, locale: Option<&str>) -> Option<String> {
    resolve_localized(payload, SPECIFIC_NAME_FIELD, locale).or_else(|| resolve_localized(payload, GENERIC_NAME_FIELD, locale))
}

/// First comma-separated brand that is not blank.
pub fn resolve_brand(payload: &Map<String, Value>) -> Option<String> {
    let brands = string_field(payload, BRANDS_FIELD)?;
    brands
        .split(',')
        .map(str::trim)
        .find(|brand| !brand.is_empty())
        .map(str::to_string)
}

/// Explicit quantity string, else `<amount> <unit>` composed from the numeric fields.
pub fn resolve_quantity(payload: &Map<String, Value>) -> Option<String> {
    if let Some(quantity) = string_field(payload, QUANTITY_FIELD) {
        return Some(quantity);
    }

    let amount = payload.get(QUANTITY_AMOUNT_FIELD).and_then(numeric_text)?;
    match string_field(payload, QUANTITY_UNIT_FIELD) {
        Some(unit) => Some(format!("{amount} {unit}")),
        None => Some(amount),
    }
}

/// Allergen labels from language-prefixed tags, else from the free-text field.
///
/// `None` only when neither field is present.
pub fn resolve_allergens(payload: &Map<String, Value>) -> Option<Vec<String>> {
    if let Some(Value::Array(tags)) = payload.get(ALLERGEN_TAGS_FIELD) {
        let labels = tags
            .iter()
            .filter_map(Value::as_str)
            .map(|tag| strip_language_prefix(tag).replace('-', " ").trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        return Some(labels);
    }

    let text = payload.get(ALLERGENS_TEXT_FIELD)?.as_str()?;
    let labels = text
        .split([',', ';'])
        .map(|token| strip_language_prefix(token.trim()).trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    Some(labels)
}

/// Remove a two-character language prefix such as `en:`.
///
/// # Example
/// ```rust
/// use shelfscan_api::normalize::strip_language_prefix;
///
/// assert_eq!(strip_language_prefix("en:soy-beans"), "soy-beans");
/// assert_eq!(strip_language_prefix("milk"), "milk");
/// assert_eq!(strip_language_prefix("fr:"), "");
/// ```
pub fn strip_language_prefix(tag: &str) -> &str {
    let mut chars = tag.char_indices();
    let prefix_ok = matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some((_, first)), Some((_, second)), Some((_, ':'))) if first != ':' && second != ':'
    );
    if !prefix_ok {
        return tag;
    }
    match chars.next() {
        Some((offset, _)) => &tag[offset..],
        None => "",
    }
}

/// Front image, generic image, then the nested `selected_images.front.display` per locale.
pub fn resolve_image_url(payload: &Map<String, Value>, locale: Option<&str>) -> Option<String> {
    if let Some(url) = IMAGE_URL_FIELDS
        .iter()
        .filter_map(|key| string_field(payload, key))
        .find_map(absolute_http_url)
    {
        return Some(url);
    }

    let display = payload.get("selected_images")?.get("front")?.get("display")?.as_object()?;
    locale
        .into_iter()
        .chain(std::iter::once(ENGLISH))
        .filter_map(|key| string_field(display, key))
        .find_map(absolute_http_url)
}

/// Grade passed through when it is exactly one of `a`..`e`.
pub fn resolve_nutri_score(payload: &Map<String, Value>) -> Option<NutriScore> {
    NUTRI_SCORE_FIELDS
        .iter()
        .filter_map(|key| string_field(payload, key))
        .find_map(|grade| NutriScore::parse(&grade))
}

/// Nutrient name to level, keeping only recognized levels.
pub fn resolve_nutrient_levels(payload: &Map<String, Value>) -> Option<IndexMap<String, NutrientLevel>> {
    let levels: IndexMap<String, NutrientLevel> = payload
        .get(NUTRIENT_LEVELS_FIELD)?
        .as_object()?
        .iter()
        .filter_map(|(nutrient, level)| {
            let level = NutrientLevel::parse(level.as_str()?)?;
            Some((nutrient.clone(), level))
        })
        .collect();
    if levels.is_empty() { None } else { Some(levels) }
}

fn resolve_localized(payload: &Map<String, Value>, field: &str, locale: Option<&str>) -> Option<String> {
    localized_candidates(field, locale)
        .iter()
        .find_map(|candidate| string_field(payload, &candidate.key))
}

/// A trimmed, non-empty string value.
fn string_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    let trimmed = payload.get(key)?.as_str()?.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn numeric_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(format_number(number)),
        Value::String(text) => {
            let trimmed = text.trim();
            trimmed.parse::<f64>().ok().filter(|amount| amount.is_finite())?;
            Some(trimmed.to_string())
        }
        _ => None,
    }
}

fn format_number(number: &Number) -> String {
    if let Some(integer) = number.as_i64() {
        return integer.to_string();
    }
    match number.as_f64() {
        Some(float) if float.fract() == 0.0 => format!("{float:.0}"),
        _ => number.to_string(),
    }
}

fn absolute_http_url(candidate: String) -> Option<String> {
    let parsed = Url::parse(&candidate).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(candidate)
}
