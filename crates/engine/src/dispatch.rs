//! Lookup dispatch boundary.
//!
//! Lookup failures never reach the user as an error state: whatever goes
//! wrong, the caller receives a product to show, falling back to a
//! placeholder carrying only the scanned EAN and the fallback name.

use chrono::Utc;
use shelfscan_api::ProductLookup;
use shelfscan_types::Product;
use tracing::warn;

/// Run one lookup, substituting a placeholder product on any failure.
///
/// The placeholder is stamped with the time the lookup was requested.
pub async fn resolve_or_placeholder(lookup: &dyn ProductLookup, ean: &str) -> Product {
    let requested_at = Utc::now();
    match lookup.lookup(ean).await {
        Ok(product) => product,
        Err(error) => {
            warn!(ean = %ean, error = %error, hint = ?error.hint(), "product lookup failed; showing placeholder");
            Product::placeholder(ean, requested_at)
        }
    }
}
