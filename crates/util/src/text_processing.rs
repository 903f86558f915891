//! # Text Processing Utilities
//!
//! Display-oriented string helpers for product cards: deriving a name line
//! that omits the brand, prettifying allergen labels and cutting long
//! ingredient lists down to an excerpt.

/// Marker appended to text cut by [`ingredients_excerpt`].
pub const ELLIPSIS: char = '…';

/// Derive the "name-only" display line from a full name.
///
/// When the trimmed brand is a case-insensitive prefix of the trimmed full
/// name, the brand and a following `•` separator are removed. If nothing
/// remains the full name is returned unchanged.
///
/// # Example
/// ```rust
/// use shelfscan_util::name_only;
///
/// assert_eq!(name_only("Ferrero • Nutella • 400 g", Some("ferrero")), "Nutella • 400 g");
/// assert_eq!(name_only("Nutella", Some("Ferrero")), "Nutella");
/// assert_eq!(name_only("Ferrero", Some("Ferrero")), "Ferrero");
/// assert_eq!(name_only("  Plain  ", None), "Plain");
/// ```
pub fn name_only(full_name: &str, brand: Option<&str>) -> String {
    let full = full_name.trim();
    let brand = brand.map(str::trim).unwrap_or_default();
    if brand.is_empty() {
        return full.to_string();
    }

    match strip_prefix_ignore_case(full, brand) {
        Some(rest) => {
            let rest = rest.trim();
            let rest = rest.strip_prefix('•').map(str::trim_start).unwrap_or(rest);
            if rest.is_empty() { full.to_string() } else { rest.to_string() }
        }
        None => full.to_string(),
    }
}

/// Return the remainder of `haystack` after `prefix`, comparing case-insensitively.
fn strip_prefix_ignore_case<'a>(haystack: &'a str, prefix: &str) -> Option<&'a str> {
    let mut haystack_chars = haystack.char_indices();
    for prefix_char in prefix.chars() {
        let (_, haystack_char) = haystack_chars.next()?;
        if !haystack_char.to_lowercase().eq(prefix_char.to_lowercase()) {
            return None;
        }
    }
    let offset = haystack_chars.next().map(|(index, _)| index).unwrap_or(haystack.len());
    Some(&haystack[offset..])
}

/// Capitalize each word of every allergen, turn hyphens into spaces and join with `", "`.
///
/// # Example
/// ```rust
/// use shelfscan_util::pretty_allergens;
///
/// let labels = vec!["milk".to_string(), "soy beans".to_string(), "gluten-free oats".to_string()];
/// assert_eq!(pretty_allergens(&labels), "Milk, Soy Beans, Gluten Free Oats");
/// assert_eq!(pretty_allergens(&[]), "");
/// ```
pub fn pretty_allergens(allergens: &[String]) -> String {
    allergens
        .iter()
        .map(|label| capitalize_words(label).replace('-', " ").trim().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Upper-case the first character of every word, leaving the rest untouched.
pub fn capitalize_words(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut previous_is_word = false;
    for ch in input.chars() {
        let is_word = ch.is_alphanumeric() || ch == '_';
        if is_word && !previous_is_word {
            output.extend(ch.to_uppercase());
        } else {
            output.push(ch);
        }
        previous_is_word = is_word;
    }
    output
}

/// Cut `text` to at most `max_chars` characters, appending [`ELLIPSIS`] when shortened.
///
/// # Example
/// ```rust
/// use shelfscan_util::ingredients_excerpt;
///
/// assert_eq!(ingredients_excerpt("sugar, palm oil", 120), "sugar, palm oil");
/// assert_eq!(ingredients_excerpt("sugar, palm oil, hazelnuts", 10), "sugar, pal…");
/// ```
pub fn ingredients_excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut excerpt: String = trimmed.chars().take(max_chars).collect();
    let kept = excerpt.trim_end().len();
    excerpt.truncate(kept);
    excerpt.push(ELLIPSIS);
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_only_strips_brand_and_separator() {
        assert_eq!(name_only("Lindt • Excellence 70% • 100 g", Some("LINDT")), "Excellence 70% • 100 g");
        assert_eq!(name_only("Lindt Excellence", Some("Lindt")), "Excellence");
    }

    #[test]
    fn name_only_ignores_non_prefix_brand() {
        assert_eq!(name_only("Excellence • Lindt", Some("Lindt")), "Excellence • Lindt");
        assert_eq!(name_only("Unknown Product", Some("")), "Unknown Product");
    }

    #[test]
    fn name_only_handles_multibyte_brands() {
        assert_eq!(name_only("Émile • Crème", Some("émile")), "Crème");
        assert_eq!(name_only("É", Some("Éa")), "É");
    }

    #[test]
    fn capitalizes_after_any_non_word_character() {
        assert_eq!(capitalize_words("sulphur dioxide-and sulphites"), "Sulphur Dioxide-And Sulphites");
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(ingredients_excerpt("ééééé", 3), "ééé…");
        assert_eq!(ingredients_excerpt("   ", 3), "");
    }
}
