//! Currency code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CurrencyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyCodeError {
    /// The input string is empty.
    #[error("currency code cannot be empty")]
    Empty,
    /// The input is not exactly three ASCII letters.
    #[error("currency code must be three ASCII letters (got {0:?})")]
    Malformed(String),
}

/// An ISO 4217-style currency code such as `USD`, `EUR`, `CUP` or `MXN`.
///
/// The catalog supports any three-letter code without conversion between
/// them, so this is a validated string rather than a closed enum. Codes are
/// normalised to upper case on parse, which keeps them usable as map keys.
///
/// ## Examples
///
/// ```
/// use chatcart_core::CurrencyCode;
///
/// assert_eq!(CurrencyCode::parse("usd").unwrap().as_str(), "USD");
/// assert!(CurrencyCode::parse("").is_err());
/// assert!(CurrencyCode::parse("US").is_err());
/// assert!(CurrencyCode::parse("U$D").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// The code that is always listed first in per-currency totals.
    pub const USD: &'static str = "USD";

    /// Parse a `CurrencyCode` from a string.
    ///
    /// Surrounding whitespace is ignored and letters are upper-cased.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or not exactly three ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CurrencyCodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CurrencyCodeError::Empty);
        }

        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyCodeError::Malformed(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// US dollars.
    #[must_use]
    pub fn usd() -> Self {
        Self(Self::USD.to_owned())
    }

    /// Get the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the US dollar.
    #[must_use]
    pub fn is_usd(&self) -> bool {
        self.0 == Self::USD
    }

    /// Display symbol used when formatting amounts.
    ///
    /// Returns `None` for codes without a dedicated symbol; those are shown
    /// with the code itself as prefix.
    #[must_use]
    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" | "CUP" | "MXN" | "CAD" | "AUD" | "ARS" | "COP" | "CLP" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            _ => None,
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::usd()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
