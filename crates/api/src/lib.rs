//! Product lookup client.
//!
//! This crate resolves a scanned EAN against the public grocery product
//! database and shapes the answer into a canonical [`Product`]. It focuses on:
//!
//! - Building the lookup URL from a validated base URL and API version
//! - Issuing a single GET per lookup with a consistent User-Agent
//! - Treating "barcode scanned but product unknown" as a normal outcome
//! - Delegating field resolution to [`normalize::normalize_product`]
//!
//! The primary entry point is [`OpenFoodFactsClient`]. The engine depends
//! only on the [`ProductLookup`] trait so it can be driven by fakes in tests.
//!
//! # Example
//!
//! ```ignore
//! use shelfscan_api::{LookupConfig, OpenFoodFactsClient};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let client = OpenFoodFactsClient::new(LookupConfig::from_env()?)?;
//!     let product = client.lookup("3017620422003").await?;
//!     println!("{}", product.full_name());
//!     Ok(())
//! }
//! ```

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Client, Url, header};
use serde_json::{Map, Value};
use shelfscan_types::Product;
use shelfscan_util::http::{JsonParseError, parse_response_json_strict, status_error_message};
use thiserror::Error;
use tracing::{debug, info};

pub mod normalize;

/// Environment variable overriding the lookup host.
pub const API_BASE_ENV: &str = "SHELFSCAN_API_BASE";
/// Environment variable overriding the API version path segment.
pub const API_VERSION_ENV: &str = "SHELFSCAN_API_VERSION";
/// Environment variable requesting full payloads instead of a field selection.
pub const FULL_PAYLOAD_ENV: &str = "SHELFSCAN_FULL_PAYLOAD";

pub const DEFAULT_API_BASE: &str = "https://world.openfoodfacts.org";
pub const DEFAULT_API_VERSION: &str = "v2";

/// Fields requested through `?fields=` unless full payloads are enabled.
pub const DEFAULT_FIELDS: &[&str] = &[
    "product_name",
    "generic_name",
    "brands",
    "quantity",
    "product_quantity",
    "product_quantity_unit",
    "nutriscore_grade",
    "allergens_tags",
    "allergens",
    "image_front_url",
    "image_url",
    "selected_images",
    "ingredients_text",
    "nutrient_levels",
    "lang",
];

/// Allowed base domains for non-local configurations of `SHELFSCAN_API_BASE`.
/// Subdomains of these domains are also allowed.
const ALLOWED_API_DOMAINS: &[&str] = &["openfoodfacts.org", "openfoodfacts.net"];
/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Characters escaped in the EAN path segment; matches `encodeURIComponent`.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Error surfaced while building a client from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid SHELFSCAN_API_BASE URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("SHELFSCAN_API_BASE must include a host")]
    MissingHost,
    #[error("SHELFSCAN_API_BASE must use https for non-localhost hosts; got '{0}://'")]
    InsecureScheme(String),
    #[error("SHELFSCAN_API_BASE host '{host}' is not allowed; must be one of {allowed:?} or a subdomain, or localhost")]
    DisallowedHost { host: String, allowed: &'static [&'static str] },
    #[error("API version must not be empty")]
    EmptyVersion,
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Network or decoding failure while talking to the product database.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error(transparent)]
    Parse(#[from] JsonParseError),
}

/// Failure of a single product lookup.
///
/// A well-formed "no such product" answer is not an error; it resolves to a
/// product carrying only the fallback name.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Non-2xx response. Nothing retries automatically.
    #[error("product lookup returned HTTP {status}")]
    Http { status: u16 },
    #[error("product lookup transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl LookupError {
    /// True for status-code failures, which a later scan may succeed on.
    pub fn is_retrievable(&self) -> bool {
        matches!(self, Self::Http { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    /// User-facing hint for the failure, when one is known.
    pub fn hint(&self) -> Option<String> {
        self.status().and_then(status_error_message)
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(TransportError::Network(error))
    }
}

impl From<JsonParseError> for LookupError {
    fn from(error: JsonParseError) -> Self {
        Self::Transport(TransportError::Parse(error))
    }
}

/// Resolves an EAN into a [`Product`].
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, ean: &str) -> Result<Product, LookupError>;
}

/// Where and how lookups are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub base_url: String,
    pub api_version: String,
    /// `None` requests the full payload.
    pub fields: Option<Vec<String>>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            fields: Some(DEFAULT_FIELDS.iter().map(|field| field.to_string()).collect()),
        }
    }
}

impl LookupConfig {
    /// Build a configuration from `SHELFSCAN_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(base_url) = non_empty_env(API_BASE_ENV) {
            config.base_url = base_url;
        }
        if let Some(version) = non_empty_env(API_VERSION_ENV) {
            config.api_version = version;
        }
        if non_empty_env(FULL_PAYLOAD_ENV).is_some_and(|value| value == "1" || value.eq_ignore_ascii_case("true")) {
            config.fields = None;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_full_payload(mut self) -> Self {
        self.fields = None;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        validate_base_url(&self.base_url)
    }

    /// Lookup URL for `ean`, without the field selection query.
    ///
    /// # Example
    /// ```rust
    /// use shelfscan_api::LookupConfig;
    ///
    /// let config = LookupConfig::default();
    /// assert_eq!(
    ///     config.product_url("3017620422003"),
    ///     "https://world.openfoodfacts.org/api/v2/product/3017620422003.json"
    /// );
    /// assert_eq!(
    ///     config.product_url("12 34/5"),
    ///     "https://world.openfoodfacts.org/api/v2/product/12%2034%2F5.json"
    /// );
    /// ```
    pub fn product_url(&self, ean: &str) -> String {
        format!(
            "{}/api/{}/product/{}.json",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim().trim_matches('/'),
            utf8_percent_encode(ean, PATH_SEGMENT)
        )
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS, and host must be one of the allowed
///   product database domains or a subdomain thereof
pub fn validate_base_url(base: &str) -> Result<(), ConfigError> {
    let parsed_base_url = Url::parse(base).map_err(|source| ConfigError::InvalidBaseUrl {
        url: base.to_string(),
        source,
    })?;

    let host_name = parsed_base_url.host_str().ok_or(ConfigError::MissingHost)?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed_base_url.scheme() != "https" {
        return Err(ConfigError::InsecureScheme(parsed_base_url.scheme().to_string()));
    }

    let is_allowed_domain = ALLOWED_API_DOMAINS.iter().any(|&allowed_domain| {
        host_name.eq_ignore_ascii_case(allowed_domain) || host_name.ends_with(&format!(".{}", allowed_domain))
    });
    if !is_allowed_domain {
        return Err(ConfigError::DisallowedHost {
            host: host_name.to_string(),
            allowed: ALLOWED_API_DOMAINS,
        });
    }

    Ok(())
}

/// Pick the raw product payload out of a lookup response.
///
/// The product is considered found when `status` is `1` or `true` and a
/// `product` object is present. Anything else yields an empty payload.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use shelfscan_api::extract_product_payload;
///
/// let found = extract_product_payload(json!({"status": 1, "product": {"brands": "Acme"}}));
/// assert_eq!(found, json!({"brands": "Acme"}));
///
/// let missing = extract_product_payload(json!({"status": 0, "status_verbose": "product not found"}));
/// assert_eq!(missing, json!({}));
/// ```
pub fn extract_product_payload(response: Value) -> Value {
    let Value::Object(mut envelope) = response else {
        return Value::Object(Map::new());
    };
    let found = match envelope.get("status") {
        Some(Value::Number(number)) => number.as_i64() == Some(1),
        Some(Value::Bool(flag)) => *flag,
        _ => false,
    };
    match envelope.remove("product") {
        Some(product @ Value::Object(_)) if found => product,
        _ => Value::Object(Map::new()),
    }
}

/// HTTP client for the Open Food Facts product API.
#[derive(Debug, Clone)]
pub struct OpenFoodFactsClient {
    config: LookupConfig,
    http: Client,
    user_agent: String,
}

impl OpenFoodFactsClient {
    /// Construct a client after validating `config`.
    pub fn new(config: LookupConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            config,
            http,
            user_agent: format!("shelfscan/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Construct a client from `SHELFSCAN_*` environment variables.
    pub fn new_from_env() -> Result<Self, ConfigError> {
        Self::new(LookupConfig::from_env()?)
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Fetch the raw product payload for `ean`; an unknown product is an empty object.
    pub async fn fetch_raw(&self, ean: &str) -> Result<Value, LookupError> {
        let url = self.config.product_url(ean);
        debug!(%url, "requesting product");

        let mut request = self.http.get(&url).header(header::USER_AGENT, &self.user_agent);
        if let Some(fields) = &self.config.fields {
            request = request.query(&[("fields", fields.join(","))]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Http { status: status.as_u16() });
        }

        let text = response.text().await?;
        let envelope = parse_response_json_strict(&text, Some(status))?;
        Ok(extract_product_payload(envelope))
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn lookup(&self, ean: &str) -> Result<Product, LookupError> {
        let requested_at = Utc::now();
        let raw = self.fetch_raw(ean).await?;
        let details = normalize::normalize_product(&raw);

        info!(
            ean = %ean,
            name = ?details.name,
            brand = ?details.brand,
            nutri_score = ?details.nutri_score,
            allergens = ?details.allergens.as_ref().map(|list| list.iter().take(5).collect::<Vec<_>>()),
            "resolved product"
        );

        Ok(Product::from_details(ean, details, requested_at))
    }
}
