//! Cart lines and the variant-key uniqueness rule.
//!
//! A cart never holds two lines with the same `(product, size, color)`
//! tuple. Every mutation in this module preserves that invariant and keeps
//! each quantity within `1..=20`; the server store and the client
//! synchronizer both mutate carts exclusively through [`CartLines`].

use serde::{Deserialize, Serialize};

use super::id::{ColorId, ProductId, SizeId};
use super::quantity::Quantity;
use crate::error::CartError;

/// Identity of a cart line: `(productId, sizeId, colorId)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub product_id: ProductId,
    pub size_id: Option<SizeId>,
    pub color_id: Option<ColorId>,
}

impl VariantKey {
    #[must_use]
    pub const fn new(
        product_id: ProductId,
        size_id: Option<SizeId>,
        color_id: Option<ColorId>,
    ) -> Self {
        Self {
            product_id,
            size_id,
            color_id,
        }
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}::{}::{}",
            self.product_id,
            self.size_id.as_ref().map_or("", SizeId::as_str),
            self.color_id.as_ref().map_or("", ColorId::as_str)
        )
    }
}

/// One product variant selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    #[serde(default)]
    pub size_id: Option<SizeId>,
    #[serde(default)]
    pub color_id: Option<ColorId>,
    pub quantity: Quantity,
}

impl CartLine {
    #[must_use]
    pub fn new(key: VariantKey, quantity: Quantity) -> Self {
        Self {
            product_id: key.product_id,
            size_id: key.size_id,
            color_id: key.color_id,
            quantity,
        }
    }

    /// The variant key of this line.
    #[must_use]
    pub fn key(&self) -> VariantKey {
        VariantKey::new(
            self.product_id.clone(),
            self.size_id.clone(),
            self.color_id.clone(),
        )
    }

    /// Whether this line has the given variant key.
    #[must_use]
    pub fn matches(&self, key: &VariantKey) -> bool {
        self.product_id == key.product_id
            && self.size_id == key.size_id
            && self.color_id == key.color_id
    }
}

/// Ordered collection of cart lines with unique variant keys.
///
/// Insertion order is kept for display stability; it carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLines(Vec<CartLine>);

impl CartLines {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a well-formed collection from untrusted lines.
    ///
    /// Lines with an invalid product id are dropped, empty or invalid
    /// optional dimensions become absent, and duplicates are folded by
    /// summing (and clamping) their quantities.
    #[must_use]
    pub fn sanitized(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut out = Self::new();
        for mut line in lines {
            if !line.product_id.is_valid() {
                continue;
            }
            line.size_id = line.size_id.filter(SizeId::is_valid);
            line.color_id = line.color_id.filter(ColorId::is_valid);
            out.upsert(line);
        }
        out
    }

    /// Add a line's quantity to the matching line, or append it.
    pub fn upsert(&mut self, line: CartLine) {
        let key = line.key();
        match self.0.iter_mut().find(|l| l.matches(&key)) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => self.0.push(line),
        }
    }

    /// Set the quantity of the matching line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if no line has this key; lines
    /// are never created by this operation.
    pub fn set_quantity(&mut self, key: &VariantKey, quantity: Quantity) -> Result<(), CartError> {
        let line = self
            .0
            .iter_mut()
            .find(|l| l.matches(key))
            .ok_or(CartError::LineNotFound)?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove the matching line. Returns whether a line was removed.
    pub fn remove(&mut self, key: &VariantKey) -> bool {
        let before = self.0.len();
        self.0.retain(|l| !l.matches(key));
        self.0.len() != before
    }

    /// Fold a batch of lines in with the same semantics as [`Self::upsert`].
    pub fn merge(&mut self, lines: impl IntoIterator<Item = CartLine>) {
        for line in lines {
            self.upsert(line);
        }
    }

    /// Find the line with this key.
    #[must_use]
    pub fn get(&self, key: &VariantKey) -> Option<&CartLine> {
        self.0.iter().find(|l| l.matches(key))
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.0.iter().map(|l| u32::from(l.quantity.get())).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CartLine> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CartLine] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<CartLine> {
        self.0
    }
}

impl<'a> IntoIterator for &'a CartLines {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for CartLines {
    type Item = CartLine;
    type IntoIter = std::vec::IntoIter<CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(p: &str, s: Option<&str>, c: Option<&str>) -> VariantKey {
        VariantKey::new(
            ProductId::parse(p).unwrap(),
            SizeId::parse_optional(s).unwrap(),
            ColorId::parse_optional(c).unwrap(),
        )
    }

    fn line(p: &str, s: Option<&str>, c: Option<&str>, q: i64) -> CartLine {
        CartLine::new(key(p, s, c), Quantity::clamped(q))
    }

    #[test]
    fn test_upsert_sums_matching_variant() {
        let mut lines = CartLines::new();
        lines.upsert(line("p1", Some("s1"), None, 2));
        lines.upsert(line("p1", Some("s1"), None, 3));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.as_slice()[0].quantity.get(), 5);
    }

    #[test]
    fn test_upsert_distinguishes_dimensions() {
        let mut lines = CartLines::new();
        lines.upsert(line("p1", Some("s1"), None, 1));
        lines.upsert(line("p1", Some("s2"), None, 1));
        lines.upsert(line("p1", Some("s1"), Some("c1"), 1));
        lines.upsert(line("p1", None, None, 1));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_upsert_clamps_sum() {
        let mut lines = CartLines::new();
        lines.upsert(line("p1", None, None, 18));
        lines.upsert(line("p1", None, None, 18));
        assert_eq!(lines.as_slice()[0].quantity, Quantity::MAX);
    }

    #[test]
    fn test_set_quantity_missing_line() {
        let mut lines = CartLines::new();
        assert_eq!(
            lines.set_quantity(&key("p1", None, None), Quantity::ONE),
            Err(CartError::LineNotFound)
        );
        assert!(lines.is_empty());
    }

    #[test]
    fn test_set_quantity_replaces() {
        let mut lines = CartLines::new();
        lines.upsert(line("p1", Some("s1"), None, 2));
        lines
            .set_quantity(&key("p1", Some("s1"), None), Quantity::clamped(7))
            .unwrap();
        assert_eq!(lines.as_slice()[0].quantity.get(), 7);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut lines = CartLines::new();
        lines.upsert(line("p1", None, None, 1));
        lines.upsert(line("p2", None, None, 1));
        assert!(lines.remove(&key("p1", None, None)));
        assert!(!lines.remove(&key("p1", None, None)));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.as_slice()[0].product_id.as_str(), "p2");
    }

    #[test]
    fn test_merge_same_lines_twice_sums_without_duplicates() {
        let guest = vec![line("p1", Some("s1"), None, 3), line("p2", None, Some("c1"), 1)];
        let mut lines = CartLines::new();
        lines.merge(guest.clone());
        lines.merge(guest);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.get(&key("p1", Some("s1"), None)).unwrap().quantity.get(), 6);
        assert_eq!(lines.total_quantity(), 8);
    }

    #[test]
    fn test_sanitized_folds_duplicates_and_drops_invalid() {
        let raw = r#"[
            {"productId":"p1","sizeId":"","colorId":null,"quantity":3},
            {"productId":"p1","sizeId":null,"quantity":30},
            {"productId":"","quantity":1},
            {"productId":"p2","colorId":"c 1","quantity":0}
        ]"#;
        let parsed: Vec<CartLine> = serde_json::from_str(raw).unwrap();
        let lines = CartLines::sanitized(parsed);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.get(&key("p1", None, None)).unwrap().quantity, Quantity::MAX);
        assert_eq!(lines.get(&key("p2", None, None)).unwrap().quantity, Quantity::ONE);
    }

    #[test]
    fn test_line_json_shape() {
        let json = serde_json::to_value(line("p1", Some("s1"), None, 3)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"productId":"p1","sizeId":"s1","colorId":null,"quantity":3})
        );
    }

    #[test]
    fn test_variant_key_display() {
        assert_eq!(key("p1", None, Some("c1")).to_string(), "p1::::c1");
    }

    // === invariants over arbitrary operation sequences =====================

    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Upsert(CartLine),
        SetQuantity(VariantKey, Quantity),
        Remove(VariantKey),
        Merge(Vec<CartLine>),
    }

    fn arb_key() -> impl Strategy<Value = VariantKey> {
        (
            prop::sample::select(vec!["p1", "p2", "p3"]),
            prop::option::of(prop::sample::select(vec!["s1", "s2"])),
            prop::option::of(prop::sample::select(vec!["c1", "c2"])),
        )
            .prop_map(|(p, s, c)| key(p, s, c))
    }

    fn arb_line() -> impl Strategy<Value = CartLine> {
        (arb_key(), -5i64..40).prop_map(|(k, q)| CartLine::new(k, Quantity::clamped(q)))
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            arb_line().prop_map(Op::Upsert),
            (arb_key(), 1i64..30).prop_map(|(k, q)| Op::SetQuantity(k, Quantity::clamped(q))),
            arb_key().prop_map(Op::Remove),
            prop::collection::vec(arb_line(), 0..8).prop_map(Op::Merge),
        ]
    }

    proptest! {
        #[test]
        fn prop_keys_unique_and_quantities_bounded(ops in prop::collection::vec(arb_op(), 0..40)) {
            let mut lines = CartLines::new();
            for op in ops {
                match op {
                    Op::Upsert(line) => lines.upsert(line),
                    Op::SetQuantity(k, q) => {
                        let had = lines.get(&k).is_some();
                        prop_assert_eq!(lines.set_quantity(&k, q).is_ok(), had);
                    }
                    Op::Remove(k) => {
                        lines.remove(&k);
                        prop_assert!(lines.get(&k).is_none());
                    }
                    Op::Merge(batch) => lines.merge(batch),
                }

                let keys: std::collections::HashSet<_> = lines.iter().map(CartLine::key).collect();
                prop_assert_eq!(keys.len(), lines.len());
                for line in &lines {
                    prop_assert!((1..=crate::types::MAX_QUANTITY_PER_LINE).contains(&line.quantity.get()));
                }
            }
        }

        #[test]
        fn prop_merge_equals_sequential_upserts(
            start in prop::collection::vec(arb_line(), 0..10),
            batch in prop::collection::vec(arb_line(), 0..10),
        ) {
            let mut merged = CartLines::sanitized(start);
            let mut upserted = merged.clone();
            merged.merge(batch.clone());
            for line in batch {
                upserted.upsert(line);
            }
            prop_assert_eq!(merged, upserted);
        }
    }
}
