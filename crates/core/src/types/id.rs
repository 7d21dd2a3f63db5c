//! Newtype IDs for type-safe entity references.
//!
//! Catalog and user identifiers are opaque strings owned by external
//! collaborators (the product catalog and the auth service). Use the
//! `define_id!` macro to create wrappers that prevent mixing them up.

use crate::error::ValidationError;

/// Maximum length of an opaque identifier.
pub const MAX_ID_LENGTH: usize = 64;

/// Validate an opaque identifier.
///
/// Identifiers are non-empty, at most [`MAX_ID_LENGTH`] bytes, and restricted
/// to ASCII alphanumerics, `-` and `_`.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming `field` if the value is rejected.
pub fn validate_id(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyId { field });
    }
    if value.len() > MAX_ID_LENGTH {
        return Err(ValidationError::IdTooLong {
            field,
            max: MAX_ID_LENGTH,
        });
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(ValidationError::InvalidIdCharacters { field });
    }
    Ok(())
}

/// Macro to define a type-safe opaque string ID.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Validating constructors: `parse()`, `parse_optional()`
/// - `sqlx` `Type`, `Encode`, and validating `Decode` implementations (with
///   `postgres` feature)
///
/// The second argument is the wire name used in validation messages.
///
/// # Example
///
/// ```rust
/// # use cartsync_core::define_id;
/// define_id!(WishlistId, "wishlistId");
///
/// let id = WishlistId::parse("w-1").unwrap();
/// assert_eq!(id.as_str(), "w-1");
/// assert!(WishlistId::parse("").is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $field:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wire name of this identifier.
            pub const FIELD: &'static str = $field;

            /// Parse and validate an identifier.
            ///
            /// # Errors
            ///
            /// Returns a validation error if the value is empty, too long,
            /// or contains characters outside `[A-Za-z0-9_-]`.
            pub fn parse(value: &str) -> ::core::result::Result<Self, $crate::ValidationError> {
                $crate::types::id::validate_id(Self::FIELD, value)?;
                Ok(Self(value.to_owned()))
            }

            /// Parse an optional dimension; `None` and `""` both mean absent.
            ///
            /// # Errors
            ///
            /// Returns a validation error if a non-empty value is invalid.
            pub fn parse_optional(
                value: Option<&str>,
            ) -> ::core::result::Result<Option<Self>, $crate::ValidationError> {
                match value {
                    None | Some("") => Ok(None),
                    Some(v) => Self::parse(v).map(Some),
                }
            }

            /// Whether the wrapped value passes validation.
            #[must_use]
            pub fn is_valid(&self) -> bool {
                $crate::types::id::validate_id(Self::FIELD, &self.0).is_ok()
            }

            /// Get the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::ValidationError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <&str as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self::parse(id)?)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(UserId, "userId");
define_id!(ProductId, "productId");
define_id!(SizeId, "sizeId");
define_id!(ColorId, "colorId");

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_object_ids_and_short_ids() {
        assert!(ProductId::parse("64b7f0c2a1e4d3b2c1a09f8e").is_ok());
        assert!(ProductId::parse("p1").is_ok());
        assert!(SizeId::parse("size_XL-2").is_ok());
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(
            ProductId::parse(""),
            Err(ValidationError::EmptyId { field: "productId" })
        );
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let long = "a".repeat(MAX_ID_LENGTH + 1);
        assert!(matches!(
            ColorId::parse(&long),
            Err(ValidationError::IdTooLong { field: "colorId", .. })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_characters() {
        assert!(matches!(
            ProductId::parse("p1; DROP TABLE"),
            Err(ValidationError::InvalidIdCharacters { .. })
        ));
        assert!(ProductId::parse("p/1").is_err());
    }

    #[test]
    fn test_parse_optional_treats_empty_as_absent() {
        assert_eq!(SizeId::parse_optional(None).unwrap(), None);
        assert_eq!(SizeId::parse_optional(Some("")).unwrap(), None);
        assert_eq!(
            SizeId::parse_optional(Some("s1")).unwrap(),
            Some(SizeId::parse("s1").unwrap())
        );
        assert!(SizeId::parse_optional(Some("s 1")).is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let id = ProductId::parse("p1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"p1\"");
        let back: ProductId = serde_json::from_str("\"p1\"").unwrap();
        assert_eq!(back, id);
    }
}
