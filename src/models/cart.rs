use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StayType, ValidationError, ValidationResult};

/// Display data for a room, captured when the line item was added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub beds: u32,
    #[serde(default)]
    pub available_seats: u32,
    #[serde(default)]
    pub booked_seats: u32,
}

/// One purchasable unit in a pending booking
///
/// `total` always equals `quantity * unit_price_with_tax * selected_seats`;
/// it is only ever written by [`CartLineItem::recompute_total`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub(crate) id: Uuid,
    pub room_id: String,
    pub room: RoomSnapshot,
    #[serde(default, rename = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub stay_type: StayType,
    pub selected_seats: u32,
    pub quantity: u32,
    #[serde(rename = "priceWithTax")]
    pub(crate) unit_price_with_tax: Decimal,
    pub(crate) total: Decimal,
    pub(crate) added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<NaiveDate>,
}

/// Candidate line item handed to the cart by a room-detail view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartLineItem {
    pub room_id: String,
    pub room: RoomSnapshot,
    #[serde(default, rename = "image")]
    pub image_url: Option<String>,
    pub stay_type: StayType,
    pub selected_seats: u32,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(rename = "priceWithTax")]
    pub unit_price_with_tax: Decimal,
}

/// Partial update applied by `CartStore::update_item`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPatch {
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub selected_seats: Option<u32>,
    #[serde(default)]
    pub check_in_date: Option<NaiveDate>,
    #[serde(default)]
    pub check_out_date: Option<NaiveDate>,
    #[serde(default, rename = "image")]
    pub image_url: Option<String>,
}

/// Read model of the whole cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartLineItem>,
    pub item_count: u32,
    pub total_amount: Decimal,
    pub line_count: usize,
}

fn default_quantity() -> u32 {
    1
}

/// Price of a line: `quantity * unit_price * seats`, or `None` if it overflows
pub fn line_total(quantity: u32, unit_price: Decimal, seats: u32) -> Option<Decimal> {
    Decimal::from(quantity)
        .checked_mul(unit_price)?
        .checked_mul(Decimal::from(seats))
}

/// Sum of line totals, saturating at `Decimal::MAX`
pub fn sum_totals(items: &[CartLineItem]) -> Decimal {
    items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.total))
        .unwrap_or(Decimal::MAX)
}

/// Sum of quantities, saturating at `u32::MAX`
pub fn sum_quantities(items: &[CartLineItem]) -> u32 {
    items
        .iter()
        .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
}

impl CartLineItem {
    /// Create a line item from a candidate, assigning a fresh id
    pub fn new(candidate: NewCartLineItem) -> ValidationResult<Self> {
        let mut item = Self {
            id: Uuid::new_v4(),
            room_id: candidate.room_id,
            room: candidate.room,
            image_url: candidate.image_url,
            stay_type: candidate.stay_type,
            selected_seats: candidate.selected_seats,
            quantity: candidate.quantity,
            unit_price_with_tax: candidate.unit_price_with_tax,
            total: Decimal::ZERO,
            added_at: Utc::now(),
            check_in_date: None,
            check_out_date: None,
        };
        item.recompute_total()?;
        Ok(item)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn unit_price_with_tax(&self) -> Decimal {
        self.unit_price_with_tax
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// Whether this line has the same merge key as the candidate
    pub fn matches(&self, room_id: &str, selected_seats: u32, stay_type: StayType) -> bool {
        self.room_id == room_id
            && self.selected_seats == selected_seats
            && self.stay_type == stay_type
    }

    /// Recalculate `total` from quantity, price and seats
    ///
    /// Leaves the line untouched if the product does not fit in a `Decimal`.
    pub fn recompute_total(&mut self) -> ValidationResult<()> {
        self.total = line_total(self.quantity, self.unit_price_with_tax, self.selected_seats)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "total".to_string(),
                value: format!(
                    "{} x {} x {}",
                    self.quantity, self.unit_price_with_tax, self.selected_seats
                ),
                reason: "Line total is too large".to_string(),
            })?;
        Ok(())
    }

    /// Whether `total` is consistent with the other price fields
    pub fn total_is_consistent(&self) -> bool {
        line_total(self.quantity, self.unit_price_with_tax, self.selected_seats) == Some(self.total)
    }

    /// Apply a partial update and recompute the total
    ///
    /// On error the line is left exactly as it was.
    pub fn apply_patch(&mut self, patch: &CartItemPatch) -> ValidationResult<()> {
        let mut patched = self.clone();
        if let Some(quantity) = patch.quantity {
            patched.quantity = quantity;
        }
        if let Some(seats) = patch.selected_seats {
            patched.selected_seats = seats;
        }
        if let Some(check_in) = patch.check_in_date {
            patched.check_in_date = Some(check_in);
        }
        if let Some(check_out) = patch.check_out_date {
            patched.check_out_date = Some(check_out);
        }
        if let Some(image_url) = &patch.image_url {
            patched.image_url = Some(image_url.clone());
        }
        patched.recompute_total()?;
        *self = patched;
        Ok(())
    }
}

impl CartSummary {
    pub fn from_items(items: &[CartLineItem]) -> Self {
        Self {
            items: items.to_vec(),
            item_count: sum_quantities(items),
            total_amount: sum_totals(items),
            line_count: items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn dorm_room(beds: u32) -> RoomSnapshot {
        RoomSnapshot {
            title: "Six-bed dorm".to_string(),
            description: "Mixed dorm with lockers".to_string(),
            beds,
            available_seats: beds,
            booked_seats: 0,
        }
    }

    fn candidate(seats: u32, quantity: u32, price: Decimal) -> NewCartLineItem {
        NewCartLineItem {
            room_id: "R101".to_string(),
            room: dorm_room(6),
            image_url: None,
            stay_type: StayType::ShortTerm,
            selected_seats: seats,
            quantity,
            unit_price_with_tax: price,
        }
    }

    #[test]
    fn test_new_line_item_computes_total() {
        let item = CartLineItem::new(candidate(2, 3, dec!(12.50))).unwrap();

        assert_eq!(item.total(), dec!(75.00));
        assert!(item.total_is_consistent());
        assert!(item.check_in_date.is_none());
    }

    #[test]
    fn test_new_line_items_get_distinct_ids() {
        let first = CartLineItem::new(candidate(1, 1, dec!(10))).unwrap();
        let second = CartLineItem::new(candidate(1, 1, dec!(10))).unwrap();
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_matches_on_room_seats_and_stay_type() {
        let item = CartLineItem::new(candidate(2, 1, dec!(10))).unwrap();

        assert!(item.matches("R101", 2, StayType::ShortTerm));
        assert!(!item.matches("R101", 3, StayType::ShortTerm));
        assert!(!item.matches("R101", 2, StayType::LongTerm));
        assert!(!item.matches("R102", 2, StayType::ShortTerm));
    }

    #[test]
    fn test_apply_patch_recomputes_total() {
        let mut item = CartLineItem::new(candidate(1, 2, dec!(500))).unwrap();

        item.apply_patch(&CartItemPatch {
            selected_seats: Some(3),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(item.selected_seats, 3);
        assert_eq!(item.total(), dec!(3000));
    }

    #[test]
    fn test_apply_patch_sets_dates_without_price_change() {
        let mut item = CartLineItem::new(candidate(1, 1, dec!(40))).unwrap();
        let check_in = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();

        item.apply_patch(&CartItemPatch {
            check_in_date: Some(check_in),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(item.check_in_date, Some(check_in));
        assert_eq!(item.total(), dec!(40));
    }

    #[test]
    fn test_summary_counts_quantities_not_lines() {
        let items = vec![
            CartLineItem::new(candidate(1, 2, dec!(10))).unwrap(),
            CartLineItem::new(candidate(2, 3, dec!(10))).unwrap(),
        ];

        let summary = CartSummary::from_items(&items);

        assert_eq!(summary.item_count, 5);
        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.total_amount, dec!(80));
        assert!(!summary.is_empty());
    }

    #[test]
    fn test_line_total_overflow_is_an_error() {
        assert_eq!(line_total(2, dec!(10), 3), Some(dec!(60)));
        assert_eq!(line_total(2, Decimal::MAX, 1), None);

        let err = CartLineItem::new(candidate(2, 1, Decimal::MAX)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "total"));
    }

    #[test]
    fn test_failed_patch_leaves_line_unchanged() {
        let mut item = CartLineItem::new(candidate(1, 1, Decimal::MAX)).unwrap();

        assert!(item
            .apply_patch(&CartItemPatch {
                selected_seats: Some(2),
                ..Default::default()
            })
            .is_err());
        assert_eq!(item.selected_seats, 1);
        assert_eq!(item.total(), Decimal::MAX);
    }

    #[test]
    fn test_sums_saturate() {
        let mut huge = CartLineItem::new(candidate(1, 1, Decimal::MAX)).unwrap();
        huge.quantity = u32::MAX;
        let items = vec![huge.clone(), huge];

        assert_eq!(sum_totals(&items), Decimal::MAX);
        assert_eq!(sum_quantities(&items), u32::MAX);
    }

    #[test]
    fn test_persisted_field_names() {
        let item = CartLineItem::new(candidate(2, 1, dec!(99.90))).unwrap();
        let value = serde_json::to_value(&item).unwrap();

        assert!(value.get("roomId").is_some());
        assert!(value.get("priceWithTax").is_some());
        assert!(value.get("stayType").is_some());
        assert_eq!(value["room"]["beds"], 6);
        assert!(value.get("checkOutDate").is_none());
    }

    #[test]
    fn test_serde_serialization() {
        let item = CartLineItem::new(candidate(2, 1, dec!(99.90))).unwrap();

        let json = serde_json::to_string(&item).unwrap();
        let deserialized: CartLineItem = serde_json::from_str(&json).unwrap();

        assert_eq!(item, deserialized);
    }
}
