use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    decode_collection, sum_quantities, sum_totals, validate_cart_quantity,
    validate_selected_seats, validate_stay_dates, CartItemPatch, CartLineItem, CartResult,
    CartSummary, NewCartLineItem, Validate,
};
use crate::repositories::SlotStore;

/// The cart aggregator: an ordered collection of line items mirrored into one storage slot
///
/// Every mutation rewrites the whole slot before returning. If the write
/// fails the in-memory change is rolled back, so memory and slot agree.
pub struct CartStore {
    storage: Arc<dyn SlotStore>,
    slot_key: String,
    items: Vec<CartLineItem>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("slot_key", &self.slot_key)
            .field("items", &self.items.len())
            .finish()
    }
}

impl CartStore {
    /// Load the cart from its slot; never fails
    ///
    /// A missing or unreadable slot yields an empty cart. Legacy items are
    /// migrated and, if anything changed, the normalized cart is written back.
    #[instrument(skip(storage), fields(slot_key = %slot_key))]
    pub fn initialize(storage: Arc<dyn SlotStore>, slot_key: &str) -> Self {
        let items = match storage.read(slot_key) {
            Ok(Some(raw)) => match decode_collection(&raw) {
                Some(decoded) => {
                    if decoded.needs_rewrite() {
                        info!(
                            migrated = decoded.migrated,
                            dropped = decoded.dropped,
                            "Normalizing persisted cart"
                        );
                        match serde_json::to_string(&decoded.items) {
                            Ok(json) => {
                                if let Err(e) = storage.write(slot_key, &json) {
                                    warn!(error = %e, "Failed to write back normalized cart");
                                }
                            }
                            Err(e) => warn!(error = %e, "Failed to serialize normalized cart"),
                        }
                    }
                    decoded.items
                }
                None => Vec::new(),
            },
            Ok(None) => {
                debug!("No persisted cart found");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted cart, starting empty");
                Vec::new()
            }
        };

        info!(line_count = items.len(), "Cart initialized");
        Self {
            storage,
            slot_key: slot_key.to_string(),
            items,
        }
    }

    /// Add a candidate, merging into an existing line with the same room, seats and stay type
    ///
    /// On a merge only the candidate's quantity is used; the existing line
    /// keeps its own price and seats. The merged quantity is held to the same
    /// bound as a single candidate.
    #[instrument(skip(self, candidate), fields(
        room_id = %candidate.room_id,
        selected_seats = candidate.selected_seats,
        stay_type = %candidate.stay_type,
        quantity = candidate.quantity,
    ))]
    pub fn add(&mut self, candidate: NewCartLineItem) -> CartResult<CartLineItem> {
        candidate.validate()?;

        let previous = self.items.clone();
        let existing = self.items.iter_mut().find(|item| {
            item.matches(
                &candidate.room_id,
                candidate.selected_seats,
                candidate.stay_type,
            )
        });

        let result = match existing {
            Some(item) => {
                let quantity = item.quantity.saturating_add(candidate.quantity);
                validate_cart_quantity(quantity)?;
                item.apply_patch(&CartItemPatch {
                    quantity: Some(quantity),
                    ..Default::default()
                })?;
                info!(item_id = %item.id(), quantity = item.quantity, "Merged into existing line item");
                item.clone()
            }
            None => {
                let item = CartLineItem::new(candidate)?;
                info!(item_id = %item.id(), "Appended new line item");
                self.items.push(item.clone());
                item
            }
        };

        self.persist_or_rollback(previous)?;
        Ok(result)
    }

    /// Apply a partial update to the line with `id`
    ///
    /// `Ok(None)` means no such line; the cart and its slot are untouched.
    /// The total is recomputed on every update.
    #[instrument(skip(self, patch), fields(item_id = %id))]
    pub fn update_item(
        &mut self,
        id: Uuid,
        patch: &CartItemPatch,
    ) -> CartResult<Option<CartLineItem>> {
        patch.validate()?;

        let Some(index) = self.position(id) else {
            debug!("Update for unknown line item ignored");
            return Ok(None);
        };

        let previous = self.items.clone();
        let Some(item) = self.items.get_mut(index) else {
            return Ok(None);
        };

        if let Some(seats) = patch.selected_seats {
            validate_selected_seats(seats, item.room.beds)?;
        }
        if let Some(check_in) = patch.check_in_date.or(item.check_in_date) {
            validate_stay_dates(check_in, patch.check_out_date.or(item.check_out_date))?;
        }

        item.apply_patch(patch)?;
        let updated = item.clone();
        info!(
            quantity = updated.quantity,
            selected_seats = updated.selected_seats,
            total = %updated.total(),
            "Line item updated"
        );

        self.persist_or_rollback(previous)?;
        Ok(Some(updated))
    }

    /// Remove the line with `id`; `Ok(None)` if there is none
    #[instrument(skip(self), fields(item_id = %id))]
    pub fn remove(&mut self, id: Uuid) -> CartResult<Option<CartLineItem>> {
        let Some(index) = self.position(id) else {
            debug!("Remove for unknown line item ignored");
            return Ok(None);
        };

        let previous = self.items.clone();
        let removed = self.items.remove(index);
        self.persist_or_rollback(previous)?;

        info!("Line item removed");
        Ok(Some(removed))
    }

    /// Remove every line whose id is listed, returning how many were removed
    ///
    /// Clears the slot entirely when nothing remains.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub fn remove_many(&mut self, ids: &[Uuid]) -> CartResult<usize> {
        let before = self.items.len();
        let remaining: Vec<CartLineItem> = self
            .items
            .iter()
            .filter(|item| !ids.contains(&item.id()))
            .cloned()
            .collect();
        let removed = before - remaining.len();

        if removed == 0 {
            return Ok(0);
        }
        if remaining.is_empty() {
            self.clear()?;
            return Ok(removed);
        }

        let previous = std::mem::replace(&mut self.items, remaining);
        self.persist_or_rollback(previous)?;
        info!(removed, "Line items removed");
        Ok(removed)
    }

    /// Empty the cart and delete its slot
    #[instrument(skip(self), fields(slot_key = %self.slot_key))]
    pub fn clear(&mut self) -> CartResult<()> {
        let previous = std::mem::take(&mut self.items);
        if let Err(e) = self.storage.delete(&self.slot_key) {
            warn!(error = %e, "Failed to delete cart slot, restoring items");
            self.items = previous;
            return Err(e.into());
        }

        info!("Cart cleared");
        Ok(())
    }

    /// Sum of line totals
    pub fn total_amount(&self) -> Decimal {
        sum_totals(&self.items)
    }

    /// Sum of quantities (not the number of lines)
    pub fn item_count(&self) -> u32 {
        sum_quantities(&self.items)
    }

    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    pub fn get(&self, id: Uuid) -> Option<&CartLineItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn slot_key(&self) -> &str {
        &self.slot_key
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary::from_items(&self.items)
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    fn persist_or_rollback(&mut self, previous: Vec<CartLineItem>) -> CartResult<()> {
        let result = serde_json::to_string(&self.items)
            .map_err(Into::into)
            .and_then(|json| self.storage.write(&self.slot_key, &json));

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist cart, rolling back");
            self.items = previous;
            return Err(e.into());
        }

        debug!(line_count = self.items.len(), "Cart persisted");
        Ok(())
    }
}
