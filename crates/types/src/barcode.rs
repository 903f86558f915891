//! Barcode values as delivered by the camera/decoder collaborator.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two retail symbologies the decoder is configured for.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Symbology {
    #[serde(rename = "ean-8")]
    Ean8,
    #[serde(rename = "ean-13")]
    Ean13,
}

impl Symbology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ean8 => "ean-8",
            Self::Ean13 => "ean-13",
        }
    }

    /// Number of digits carried by a code of this symbology.
    pub fn digit_count(&self) -> usize {
        match self {
            Self::Ean8 => 8,
            Self::Ean13 => 13,
        }
    }

    fn from_digit_count(count: usize) -> Option<Self> {
        match count {
            8 => Some(Self::Ean8),
            13 => Some(Self::Ean13),
            _ => None,
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Symbology {
    type Err = EanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ean-8" | "ean8" => Ok(Self::Ean8),
            "ean-13" | "ean13" => Ok(Self::Ean13),
            other => Err(EanError::UnsupportedSymbology(other.to_string())),
        }
    }
}

/// Error returned when a string cannot be interpreted as an EAN.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EanError {
    #[error("barcode value is empty")]
    Empty,
    #[error("barcode '{0}' contains non-digit characters")]
    NonDigit(String),
    #[error("barcode '{value}' has {length} digits; expected 8 or 13")]
    Length { value: String, length: usize },
    #[error("unsupported symbology '{0}'")]
    UnsupportedSymbology(String),
}

/// A validated EAN-8 or EAN-13 code.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ean {
    digits: String,
    symbology: Symbology,
}

impl Ean {
    /// Parse a trimmed string of exactly 8 or 13 ASCII digits.
    ///
    /// # Example
    /// ```rust
    /// use shelfscan_types::{Ean, Symbology};
    ///
    /// let ean = Ean::parse(" 3017620422003 ").unwrap();
    /// assert_eq!(ean.as_str(), "3017620422003");
    /// assert_eq!(ean.symbology(), Symbology::Ean13);
    ///
    /// assert!(Ean::parse("12345").is_err());
    /// assert!(Ean::parse("1234567a").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, EanError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EanError::Empty);
        }
        if !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(EanError::NonDigit(trimmed.to_string()));
        }
        let symbology = Symbology::from_digit_count(trimmed.len()).ok_or_else(|| EanError::Length {
            value: trimmed.to_string(),
            length: trimmed.len(),
        })?;
        Ok(Self {
            digits: trimmed.to_string(),
            symbology,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn symbology(&self) -> Symbology {
        self.symbology
    }

    /// Wrap the code as a decoder event, the shape the scan controller consumes.
    pub fn to_decoded(&self) -> DecodedCode {
        DecodedCode::new(self.digits.clone(), self.symbology)
    }
}

impl FromStr for Ean {
    type Err = EanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Ean {
    type Error = EanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ean> for String {
    fn from(value: Ean) -> Self {
        value.digits
    }
}

impl AsRef<str> for Ean {
    fn as_ref(&self) -> &str {
        &self.digits
    }
}

impl fmt::Display for Ean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

/// One decoded barcode reported by the camera for a single frame.
///
/// The decoder guarantees a supported symbology but the value is not
/// re-validated by the scan controller beyond being non-empty.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct DecodedCode {
    pub value: String,
    pub symbology: Symbology,
}

impl DecodedCode {
    pub fn new(value: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            value: value.into(),
            symbology,
        }
    }
}
