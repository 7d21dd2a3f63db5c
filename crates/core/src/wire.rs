//! JSON bodies and headers exchanged between the synchronizer and the store.
//!
//! Request bodies carry raw strings and integers; [`LineRequest::validate`]
//! and friends turn them into validated domain types. Validation happens
//! before any state change on the server, and the client runs the same
//! checks so obviously invalid requests never leave the process.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{CartLine, CartLines, ColorId, ProductId, Quantity, SizeId, VariantKey};

/// Response header carrying the cart's concurrency token.
pub const ETAG_HEADER: &str = "etag";

/// Request header carrying the required concurrency token.
pub const IF_MATCH_HEADER: &str = "if-match";

/// Body of every successful cart response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartResponse {
    pub items: CartLines,
}

/// Body of `POST /cart/items` and `PATCH /cart/items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRequest {
    pub product_id: String,
    #[serde(default)]
    pub size_id: Option<String>,
    #[serde(default)]
    pub color_id: Option<String>,
    pub quantity: i64,
}

impl LineRequest {
    /// Build a request body for a validated line.
    #[must_use]
    pub fn from_line(line: &CartLine) -> Self {
        let key = KeyRequest::from_key(&line.key());
        Self {
            product_id: key.product_id,
            size_id: key.size_id,
            color_id: key.color_id,
            quantity: i64::from(line.quantity.get()),
        }
    }

    /// Validate into a cart line.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for malformed identifiers or a quantity
    /// below one.
    pub fn validate(&self) -> Result<CartLine, ValidationError> {
        let key = validate_key(
            &self.product_id,
            self.size_id.as_deref(),
            self.color_id.as_deref(),
        )?;
        let quantity = Quantity::parse(self.quantity)?;
        Ok(CartLine::new(key, quantity))
    }
}

/// Body of `DELETE /cart/items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRequest {
    pub product_id: String,
    #[serde(default)]
    pub size_id: Option<String>,
    #[serde(default)]
    pub color_id: Option<String>,
}

impl KeyRequest {
    #[must_use]
    pub fn from_key(key: &VariantKey) -> Self {
        Self {
            product_id: key.product_id.as_str().to_owned(),
            size_id: key.size_id.as_ref().map(|s| s.as_str().to_owned()),
            color_id: key.color_id.as_ref().map(|c| c.as_str().to_owned()),
        }
    }

    /// Validate into a variant key.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for malformed identifiers.
    pub fn validate(&self) -> Result<VariantKey, ValidationError> {
        validate_key(
            &self.product_id,
            self.size_id.as_deref(),
            self.color_id.as_deref(),
        )
    }
}

/// Body of `POST /cart/merge`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub items: Vec<LineRequest>,
}

impl MergeRequest {
    #[must_use]
    pub fn from_lines(lines: &CartLines) -> Self {
        Self {
            items: lines.iter().map(LineRequest::from_line).collect(),
        }
    }

    /// Validate every line; the whole batch is rejected if any line is.
    ///
    /// # Errors
    ///
    /// Returns the first line's validation error.
    pub fn validate(&self) -> Result<Vec<CartLine>, ValidationError> {
        self.items.iter().map(LineRequest::validate).collect()
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn validate_key(
    product_id: &str,
    size_id: Option<&str>,
    color_id: Option<&str>,
) -> Result<VariantKey, ValidationError> {
    Ok(VariantKey::new(
        ProductId::parse(product_id)?,
        SizeId::parse_optional(size_id)?,
        ColorId::parse_optional(color_id)?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_request_accepts_missing_dimensions() {
        let req: LineRequest =
            serde_json::from_str(r#"{"productId":"p1","quantity":2}"#).unwrap();
        let line = req.validate().unwrap();
        assert_eq!(line.size_id, None);
        assert_eq!(line.color_id, None);
        assert_eq!(line.quantity.get(), 2);
    }

    #[test]
    fn test_line_request_empty_string_dimension_is_absent() {
        let req: LineRequest = serde_json::from_str(
            r#"{"productId":"p1","sizeId":"","colorId":"c1","quantity":1}"#,
        )
        .unwrap();
        let line = req.validate().unwrap();
        assert_eq!(line.size_id, None);
        assert_eq!(line.color_id.unwrap().as_str(), "c1");
    }

    #[test]
    fn test_line_request_rejects_bad_input() {
        let zero = LineRequest {
            product_id: "p1".into(),
            size_id: None,
            color_id: None,
            quantity: 0,
        };
        assert_eq!(
            zero.validate(),
            Err(ValidationError::QuantityOutOfRange(0))
        );

        let bad_id = LineRequest {
            product_id: String::new(),
            ..zero
        };
        assert!(matches!(
            bad_id.validate(),
            Err(ValidationError::EmptyId { field: "productId" })
        ));
    }

    #[test]
    fn test_line_request_clamps_large_quantity() {
        let req = LineRequest {
            product_id: "p1".into(),
            size_id: Some("s1".into()),
            color_id: None,
            quantity: 25,
        };
        assert_eq!(req.validate().unwrap().quantity, Quantity::MAX);
    }

    #[test]
    fn test_merge_request_all_or_nothing() {
        let req: MergeRequest = serde_json::from_str(
            r#"{"items":[{"productId":"p1","quantity":1},{"productId":"p 2","quantity":1}]}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_merge_request_accepts_large_guest_cart() {
        let items: Vec<LineRequest> = (0..250)
            .map(|i| LineRequest {
                product_id: format!("p{i}"),
                size_id: None,
                color_id: None,
                quantity: 1,
            })
            .collect();
        let lines = MergeRequest { items }.validate().unwrap();
        assert_eq!(lines.len(), 250);
    }

    #[test]
    fn test_cart_response_shape() {
        let body: CartResponse = serde_json::from_str(
            r#"{"items":[{"productId":"p1","sizeId":"s1","colorId":null,"quantity":3}]}"#,
        )
        .unwrap();
        assert_eq!(body.items.len(), 1);
        assert_eq!(body.items.total_quantity(), 3);
    }
}
