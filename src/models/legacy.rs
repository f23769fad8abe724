//! Decoding of the persisted cart slot.
//!
//! Items written by older builds may lack `priceWithTax` or `room.beds`, and
//! may carry a `pricePerUnit` field instead. Every element is parsed against
//! the current schema first and falls back to the permissive legacy schema;
//! both are normalized into [`CartLineItem`] before entering the store.
//!
//! Zero quantities, seats or beds are treated like missing values and a
//! quantity above the cart maximum is capped. Elements whose price is out of
//! range, or whose line total cannot be represented, are dropped.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    validate_unit_price, CartLineItem, RoomSnapshot, StayType, ValidationResult,
    MAX_CART_QUANTITY, MIN_CART_QUANTITY, MIN_SELECTED_SEATS,
};

/// A persisted element, in either the current or the legacy shape
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredLineItem {
    Current(CartLineItem),
    Legacy(LegacyLineItem),
}

/// Permissive shape of items persisted before prices and bed counts were mandatory
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyLineItem {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub room_id: String,
    #[serde(default)]
    pub room: Option<LegacyRoom>,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(default)]
    pub stay_type: Option<StayType>,
    #[serde(default)]
    pub selected_seats: Option<u32>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub price_with_tax: Option<Decimal>,
    #[serde(default)]
    pub price_per_unit: Option<Decimal>,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub check_in_date: Option<NaiveDate>,
    #[serde(default)]
    pub check_out_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRoom {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub beds: Option<u32>,
    #[serde(default)]
    pub available_seats: Option<u32>,
    #[serde(default)]
    pub booked_seats: Option<u32>,
}

/// Outcome of decoding a persisted slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedCart {
    pub items: Vec<CartLineItem>,
    /// Elements that needed defaulting or a total correction
    pub migrated: usize,
    /// Elements that matched neither schema or carried an unusable price
    pub dropped: usize,
}

impl DecodedCart {
    /// Whether the normalized collection differs from what is stored
    pub fn needs_rewrite(&self) -> bool {
        self.migrated > 0 || self.dropped > 0
    }
}

impl StoredLineItem {
    /// Normalize into the canonical record; the flag reports whether anything changed
    pub fn normalize(self) -> ValidationResult<(CartLineItem, bool)> {
        let (mut item, migrated) = match self {
            StoredLineItem::Current(item) => (item, false),
            StoredLineItem::Legacy(legacy) => (legacy.into_line_item(), true),
        };

        validate_unit_price(&item.unit_price_with_tax)?;
        let repaired = repair_counts(&mut item);
        let consistent = item.total_is_consistent();
        item.recompute_total()?;

        Ok((item, migrated || repaired || !consistent))
    }
}

/// Bring counts back inside the bounds new line items are held to
fn repair_counts(item: &mut CartLineItem) -> bool {
    let mut changed = false;
    let quantity = item.quantity.clamp(MIN_CART_QUANTITY, MAX_CART_QUANTITY);
    if quantity != item.quantity {
        item.quantity = quantity;
        changed = true;
    }
    if item.selected_seats < MIN_SELECTED_SEATS {
        item.selected_seats = MIN_SELECTED_SEATS;
        changed = true;
    }
    if item.room.beds == 0 {
        item.room.beds = 1;
        changed = true;
    }
    changed
}

impl LegacyLineItem {
    fn into_line_item(self) -> CartLineItem {
        let room = self.room.unwrap_or_default();
        let id = self
            .id
            .as_ref()
            .and_then(|value| value.as_str())
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .unwrap_or_else(Uuid::new_v4);

        CartLineItem {
            id,
            room_id: self.room_id,
            room: RoomSnapshot {
                title: room.title.unwrap_or_default(),
                description: room.description.unwrap_or_default(),
                beds: room.beds.unwrap_or(1),
                available_seats: room.available_seats.unwrap_or_default(),
                booked_seats: room.booked_seats.unwrap_or_default(),
            },
            image_url: self.image,
            stay_type: self.stay_type.unwrap_or_default(),
            selected_seats: self.selected_seats.unwrap_or(1),
            quantity: self.quantity.unwrap_or(1),
            unit_price_with_tax: self
                .price_with_tax
                .or(self.price_per_unit)
                .unwrap_or(Decimal::ZERO),
            total: Decimal::ZERO,
            added_at: self.added_at.unwrap_or_else(Utc::now),
            check_in_date: self.check_in_date,
            check_out_date: self.check_out_date,
        }
    }
}

/// Decode a raw slot value
///
/// Returns `None` if the value is not a JSON array at all. Elements that fit
/// neither schema are skipped.
pub fn decode_collection(raw: &str) -> Option<DecodedCart> {
    let elements: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(elements) => elements,
        Err(e) => {
            warn!(error = %e, "Persisted cart is not a JSON array");
            return None;
        }
    };

    let mut decoded = DecodedCart::default();
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<StoredLineItem>(element) {
            Ok(stored) => match stored.normalize() {
                Ok((item, changed)) => {
                    if changed {
                        debug!(index, room_id = %item.room_id, "Migrated persisted cart item");
                        decoded.migrated += 1;
                    }
                    decoded.items.push(item);
                }
                Err(e) => {
                    warn!(index, error = %e, "Dropping persisted cart item with unusable price");
                    decoded.dropped += 1;
                }
            },
            Err(e) => {
                warn!(index, error = %e, "Dropping unreadable persisted cart item");
                decoded.dropped += 1;
            }
        }
    }

    Some(decoded)
}
