//! Cart versions and the concurrency tokens derived from them.

use serde::{Deserialize, Serialize};

/// Stored version of a cart document.
///
/// Starts at [`CartVersion::INITIAL`] when a cart is created and increases by
/// exactly one on every successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartVersion(i64);

impl CartVersion {
    /// Version of a freshly created cart.
    pub const INITIAL: Self = Self(1);

    /// Wrap a stored version number.
    #[must_use]
    pub const fn new(version: i64) -> Self {
        Self(version)
    }

    /// The raw number, as stored in the `version` column.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// The version a successful mutation produces.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The concurrency token clients must present for this version.
    #[must_use]
    pub const fn token(self) -> ConcurrencyToken {
        ConcurrencyToken(self)
    }
}

impl std::fmt::Display for CartVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque concurrency token (ETag) for a cart version.
///
/// Rendered as a strong entity tag, e.g. `"6"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConcurrencyToken(CartVersion);

impl ConcurrencyToken {
    /// Parse an `ETag`/`If-Match` header value.
    ///
    /// Accepts `"6"`, `W/"6"` and a bare `6`. Returns `None` for anything
    /// else, which callers treat as a token that can never match.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let value = value.strip_prefix("W/").unwrap_or(value);
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        value.parse::<i64>().ok().map(|v| Self(CartVersion(v)))
    }

    /// Header representation of this token.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// The version this token was issued for.
    #[must_use]
    pub const fn version(&self) -> CartVersion {
        self.0
    }
}

impl std::fmt::Display for ConcurrencyToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_increments_by_one() {
        assert_eq!(CartVersion::new(5).next(), CartVersion::new(6));
        assert_eq!(CartVersion::INITIAL.as_i64(), 1);
    }

    #[test]
    fn test_token_header_value() {
        assert_eq!(CartVersion::new(5).token().to_header_value(), "\"5\"");
    }

    #[test]
    fn test_parse_forms() {
        let expected = Some(CartVersion::new(5).token());
        assert_eq!(ConcurrencyToken::parse("\"5\""), expected);
        assert_eq!(ConcurrencyToken::parse("W/\"5\""), expected);
        assert_eq!(ConcurrencyToken::parse(" 5 "), expected);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(ConcurrencyToken::parse("*"), None);
        assert_eq!(ConcurrencyToken::parse("\"abc\""), None);
        assert_eq!(ConcurrencyToken::parse(""), None);
    }
}
