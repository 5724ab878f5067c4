// src/ledger.rs

use crate::assistant::ParsedItem;
use crate::ids::IdGenerator;
use crate::sanitize::{self, ZeroPolicy};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, info};

/// One billable row on the invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub description: String,
    pub sub_description: String,
    pub quantity: f64,
    pub rate: f64,
    pub total: f64,
    pub unit: String,
}

impl LineItem {
    fn blank(id: String) -> Self {
        Self {
            id,
            description: String::new(),
            sub_description: String::new(),
            quantity: 1.0,
            rate: 1.0,
            total: 1.0,
            unit: String::new(),
        }
    }

    fn recompute(&mut self) {
        self.total = self.quantity * self.rate;
    }
}

/// Editable fields of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Description,
    SubDescription,
    Unit,
    Quantity,
    Rate,
}

/// The two fields that feed the line total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Quantity,
    Rate,
}

impl FromStr for ItemField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desc" | "description" => Ok(Self::Description),
            "sub" | "subdesc" | "sub_description" => Ok(Self::SubDescription),
            "unit" => Ok(Self::Unit),
            "qty" | "quantity" => Ok(Self::Quantity),
            "rate" | "price" => Ok(Self::Rate),
            other => Err(format!("unknown item field '{other}'")),
        }
    }
}

impl FromStr for NumericField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<ItemField>()? {
            ItemField::Quantity => Ok(Self::Quantity),
            ItemField::Rate => Ok(Self::Rate),
            other => Err(format!("{other:?} is not a numeric field")),
        }
    }
}

/// Ordered line items of the invoice being edited.
///
/// Every mutation goes through a method here, which keeps two things true:
/// each item's `total` equals `quantity * rate`, and the list is never empty.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Ledger {
    items: Vec<LineItem>,
    #[serde(skip)]
    ids: IdGenerator,
    #[serde(skip)]
    zero_policy: ZeroPolicy,
}

impl Ledger {
    /// The template ledger: a single sample item priced at 100.
    pub fn seeded(zero_policy: ZeroPolicy) -> Self {
        Self::seeded_with(IdGenerator::new(), zero_policy)
    }

    pub(crate) fn seeded_with(ids: IdGenerator, zero_policy: ZeroPolicy) -> Self {
        let sample = LineItem {
            id: "1".to_string(),
            description: "Sample Item".to_string(),
            sub_description: String::new(),
            quantity: 1.0,
            rate: 100.0,
            total: 100.0,
            unit: String::new(),
        };
        Self {
            items: vec![sample],
            ids,
            zero_policy,
        }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a blank item (qty 1, rate 1) and return its id.
    pub fn add_item(&mut self) -> String {
        let id = self.fresh_id();
        self.items.push(LineItem::blank(id.clone()));
        info!(id = %id, count = self.items.len(), "Item added");
        id
    }

    /// Remove an item. The last remaining item and unknown ids are left alone.
    pub fn remove_item(&mut self, id: &str) -> bool {
        if self.items.len() == 1 {
            debug!(id = %id, "Refusing to remove the only item");
            return false;
        }
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        let removed = self.items.len() != before;
        if removed {
            info!(id = %id, count = self.items.len(), "Item removed");
        }
        removed
    }

    /// Apply a keystroke-level edit. Returns `false` if the id is unknown.
    pub fn set_item_field(&mut self, id: &str, field: ItemField, value: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        match field {
            ItemField::Description => item.description = value.to_string(),
            ItemField::SubDescription => item.sub_description = value.to_string(),
            ItemField::Unit => item.unit = value.to_string(),
            ItemField::Quantity => {
                item.quantity = sanitize::during_edit(value);
                item.recompute();
            }
            ItemField::Rate => {
                item.rate = sanitize::during_edit(value);
                item.recompute();
            }
        }
        true
    }

    /// Normalize a numeric field once the user leaves it.
    pub fn finish_edit(&mut self, id: &str, field: NumericField) -> bool {
        let policy = self.zero_policy;
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        match field {
            NumericField::Quantity => {
                item.quantity = sanitize::on_edit_complete(item.quantity, policy);
            }
            NumericField::Rate => item.rate = sanitize::on_edit_complete(item.rate, policy),
        }
        item.recompute();
        true
    }

    /// Swap the whole list for parsed items. An empty parse changes nothing.
    pub fn replace_items(&mut self, parsed: &[ParsedItem]) -> bool {
        if parsed.is_empty() {
            return false;
        }
        let mut fresh = Vec::with_capacity(parsed.len());
        for p in parsed {
            let id = self
                .ids
                .next_free(|candidate| fresh.iter().any(|i: &LineItem| i.id == candidate));
            let quantity = positive_or_one(p.quantity);
            let rate = positive_or_one(p.rate);
            fresh.push(LineItem {
                id,
                description: p.description.clone(),
                sub_description: p.sub_description.clone().unwrap_or_default(),
                quantity,
                rate,
                total: quantity * rate,
                unit: p.unit.clone().unwrap_or_default(),
            });
        }
        self.items = fresh;
        info!(count = self.items.len(), "Items replaced from parsed input");
        true
    }

    pub fn subtotal(&self) -> f64 {
        self.items.iter().map(|item| item.quantity * item.rate).sum()
    }

    /// There is no tax or discount model, so this equals the subtotal.
    pub fn grand_total(&self) -> f64 {
        self.subtotal()
    }

    fn fresh_id(&mut self) -> String {
        let items = &self.items;
        self.ids
            .next_free(|candidate| items.iter().any(|item| item.id == candidate))
    }
}

fn positive_or_one(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.min(sanitize::MAX_INPUT),
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        Ledger::seeded_with(IdGenerator::with_seed(1), ZeroPolicy::ResetToOne)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_seeded_sample_item() {
        let l = ledger();
        assert_eq!(l.len(), 1);
        let item = &l.items()[0];
        assert_eq!(item.id, "1");
        assert_eq!(item.rate, 100.0);
        assert_eq!(item.total, 100.0);
        assert_close(l.subtotal(), 100.0);
    }

    #[test]
    fn test_add_item_defaults() {
        let mut l = ledger();
        let before: Vec<String> = l.items().iter().map(|i| i.id.clone()).collect();
        let id = l.add_item();
        assert_eq!(l.len(), 2);
        let item = l.get(&id).expect("new item");
        assert_eq!(item.description, "");
        assert_eq!((item.quantity, item.rate, item.total), (1.0, 1.0, 1.0));
        assert_eq!(l.items()[0].id, before[0]);
        assert_eq!(l.items()[1].id, id);
    }

    #[test]
    fn test_add_item_ids_unique() {
        let mut l = ledger();
        let mut seen = vec![l.items()[0].id.clone()];
        for _ in 0..50 {
            let id = l.add_item();
            assert!(!seen.contains(&id));
            seen.push(id);
        }
    }

    #[test]
    fn test_remove_only_item_is_noop() {
        let mut l = ledger();
        assert!(!l.remove_item("1"));
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut l = ledger();
        l.add_item();
        assert!(!l.remove_item("nope"));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn test_quantity_edit_recomputes_only_target() {
        let mut l = ledger();
        let id = l.add_item();
        assert!(l.set_item_field(&id, ItemField::Quantity, "5"));
        let edited = l.get(&id).expect("item");
        assert_eq!(edited.total, 5.0);
        let untouched = l.get("1").expect("item");
        assert_eq!(untouched.total, 100.0);
    }

    #[test]
    fn test_empty_rate_is_zero_while_editing() {
        let mut l = ledger();
        l.set_item_field("1", ItemField::Quantity, "3");
        l.set_item_field("1", ItemField::Rate, "");
        let item = l.get("1").expect("item");
        assert_eq!(item.rate, 0.0);
        assert_eq!(item.total, 0.0);
    }

    #[test]
    fn test_huge_values_keep_totals_finite() {
        let mut l = ledger();
        l.set_item_field("1", ItemField::Quantity, "1e200");
        l.set_item_field("1", ItemField::Rate, "1e200");
        assert!(l.get("1").expect("item").total.is_finite());
        assert!(l.grand_total().is_finite());

        l.replace_items(&[ParsedItem {
            description: "Gold".to_string(),
            sub_description: None,
            quantity: Some(f64::MAX),
            rate: Some(f64::MAX),
            unit: None,
        }]);
        assert!(l.grand_total().is_finite());
    }

    #[test]
    fn test_blur_resets_zero_rate_to_one() {
        let mut l = ledger();
        l.set_item_field("1", ItemField::Quantity, "3");
        l.set_item_field("1", ItemField::Rate, "");
        assert!(l.finish_edit("1", NumericField::Rate));
        let item = l.get("1").expect("item");
        assert_eq!(item.rate, 1.0);
        assert_eq!(item.total, 3.0);
    }

    #[test]
    fn test_blur_keeps_nonzero_value() {
        let mut l = ledger();
        l.set_item_field("1", ItemField::Rate, "12.5");
        l.finish_edit("1", NumericField::Rate);
        assert_eq!(l.get("1").expect("item").rate, 12.5);
    }

    #[test]
    fn test_blur_with_keep_policy_allows_zero() {
        let mut l = Ledger::seeded_with(IdGenerator::with_seed(1), ZeroPolicy::Keep);
        l.set_item_field("1", ItemField::Rate, "0");
        l.finish_edit("1", NumericField::Rate);
        let item = l.get("1").expect("item");
        assert_eq!(item.rate, 0.0);
        assert_eq!(item.total, 0.0);
    }

    #[test]
    fn test_text_fields_stored_verbatim() {
        let mut l = ledger();
        l.set_item_field("1", ItemField::Description, "  Cement bags ");
        l.set_item_field("1", ItemField::Unit, "kg");
        let item = l.get("1").expect("item");
        assert_eq!(item.description, "  Cement bags ");
        assert_eq!(item.unit, "kg");
        assert_eq!(item.total, 100.0);
    }

    #[test]
    fn test_subtotal_scenario() {
        let mut l = ledger();
        assert_close(l.subtotal(), 100.0);

        let second = l.add_item();
        assert_close(l.subtotal(), 101.0);

        l.set_item_field(&second, ItemField::Quantity, "5");
        assert_close(l.subtotal(), 105.0);

        assert!(l.remove_item("1"));
        assert_close(l.subtotal(), 5.0);
        assert_close(l.grand_total(), 5.0);
        assert_eq!(l.get(&second).expect("item").total, 5.0);
    }

    #[test]
    fn test_replace_items_from_parse() {
        let mut l = ledger();
        l.add_item();
        let parsed = vec![ParsedItem {
            description: "Cement".to_string(),
            sub_description: None,
            quantity: Some(5.0),
            rate: Some(450.0),
            unit: None,
        }];
        assert!(l.replace_items(&parsed));
        assert_eq!(l.len(), 1);
        let item = &l.items()[0];
        assert_eq!(item.description, "Cement");
        assert_eq!(item.total, 2250.0);
        assert_close(l.grand_total(), 2250.0);
    }

    #[test]
    fn test_replace_items_defaults_missing_numbers() {
        let mut l = ledger();
        let parsed = vec![ParsedItem {
            description: "Apples".to_string(),
            sub_description: Some("Green".to_string()),
            quantity: None,
            rate: Some(0.0),
            unit: Some("kg".to_string()),
        }];
        l.replace_items(&parsed);
        let item = &l.items()[0];
        assert_eq!((item.quantity, item.rate, item.total), (1.0, 1.0, 1.0));
        assert_eq!(item.sub_description, "Green");
        assert_eq!(item.unit, "kg");
    }

    #[test]
    fn test_replace_with_empty_parse_keeps_items() {
        let mut l = ledger();
        assert!(!l.replace_items(&[]));
        assert_eq!(l.len(), 1);
        assert_eq!(l.items()[0].id, "1");
    }

    #[test]
    fn test_invariants_hold_over_mixed_operations() {
        let mut l = ledger();
        let mut state: u64 = 0x2545_f491;
        let mut next = || {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            state >> 33
        };

        for _ in 0..500 {
            let ids: Vec<String> = l.items().iter().map(|i| i.id.clone()).collect();
            let target = ids[(next() as usize) % ids.len()].clone();
            let totals_before: Vec<(String, f64)> = l
                .items()
                .iter()
                .map(|i| (i.id.clone(), i.total))
                .collect();

            match next() % 5 {
                0 => {
                    l.add_item();
                }
                1 => {
                    l.remove_item(&target);
                }
                2 => {
                    let raw = format!("{}", next() % 20);
                    l.set_item_field(&target, ItemField::Quantity, &raw);
                    for (id, total) in &totals_before {
                        if *id != target {
                            assert_eq!(l.get(id).expect("item").total, *total);
                        }
                    }
                }
                3 => {
                    let raw = if next() % 4 == 0 {
                        String::new()
                    } else {
                        format!("{}.{}", next() % 500, next() % 100)
                    };
                    l.set_item_field(&target, ItemField::Rate, &raw);
                }
                _ => {
                    l.finish_edit(&target, NumericField::Quantity);
                }
            }

            assert!(!l.is_empty());
            for item in l.items() {
                assert_eq!(item.total, item.quantity * item.rate);
            }
            let expected: f64 = l.items().iter().map(|i| i.quantity * i.rate).sum();
            assert_close(l.grand_total(), expected);
        }
    }

    #[test]
    fn test_field_names_parse() {
        assert_eq!("qty".parse::<ItemField>(), Ok(ItemField::Quantity));
        assert_eq!("Rate".parse::<NumericField>(), Ok(NumericField::Rate));
        assert!("desc".parse::<NumericField>().is_err());
        assert!("colour".parse::<ItemField>().is_err());
    }
}
