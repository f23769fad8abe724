use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{
    CartItemPatch, NewCartLineItem, SubmitBookingRequest, ValidationError, ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_ROOM_ID_LENGTH: usize = 100;
pub const MIN_SELECTED_SEATS: u32 = 1;
pub const MIN_CART_QUANTITY: u32 = 1;
pub const MAX_CART_QUANTITY: u32 = 1000;
pub const MAX_UNIT_PRICE: i64 = 1_000_000;

impl Validate for NewCartLineItem {
    fn validate(&self) -> ValidationResult<()> {
        validate_room_id(&self.room_id)?;
        validate_bed_count(self.room.beds)?;
        validate_selected_seats(self.selected_seats, self.room.beds)?;
        validate_cart_quantity(self.quantity)?;
        validate_unit_price(&self.unit_price_with_tax)?;
        Ok(())
    }
}

impl Validate for CartItemPatch {
    fn validate(&self) -> ValidationResult<()> {
        if let Some(quantity) = self.quantity {
            validate_cart_quantity(quantity)?;
        }
        if let Some(seats) = self.selected_seats {
            if seats < MIN_SELECTED_SEATS {
                return Err(ValidationError::OutOfRange {
                    field: "selected_seats".to_string(),
                    min: MIN_SELECTED_SEATS.to_string(),
                    max: "beds".to_string(),
                    value: seats.to_string(),
                });
            }
        }
        if let (Some(check_in), Some(check_out)) = (self.check_in_date, self.check_out_date) {
            validate_stay_dates(check_in, Some(check_out))?;
        }
        Ok(())
    }
}

impl Validate for SubmitBookingRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_stay_dates(self.check_in_date, self.check_out_date)
    }
}

/// Validate room ID
pub fn validate_room_id(room_id: &str) -> ValidationResult<()> {
    let trimmed = room_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "room_id".to_string(),
        });
    }

    if trimmed.len() > MAX_ROOM_ID_LENGTH {
        return Err(ValidationError::InvalidValue {
            field: "room_id".to_string(),
            value: trimmed.to_string(),
            reason: format!("Must be at most {} characters", MAX_ROOM_ID_LENGTH),
        });
    }

    Ok(())
}

/// Validate the bed count carried by a room snapshot
pub fn validate_bed_count(beds: u32) -> ValidationResult<()> {
    if beds == 0 {
        return Err(ValidationError::InvalidValue {
            field: "room.beds".to_string(),
            value: beds.to_string(),
            reason: "A room must have at least one bed".to_string(),
        });
    }
    Ok(())
}

/// Validate `1 <= seats <= beds`
pub fn validate_selected_seats(seats: u32, beds: u32) -> ValidationResult<()> {
    if seats < MIN_SELECTED_SEATS || seats > beds {
        return Err(ValidationError::OutOfRange {
            field: "selected_seats".to_string(),
            min: MIN_SELECTED_SEATS.to_string(),
            max: beds.to_string(),
            value: seats.to_string(),
        });
    }
    Ok(())
}

/// Validate cart item quantity
pub fn validate_cart_quantity(quantity: u32) -> ValidationResult<()> {
    if !(MIN_CART_QUANTITY..=MAX_CART_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: MIN_CART_QUANTITY.to_string(),
            max: MAX_CART_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }
    Ok(())
}

/// Validate tax-inclusive unit price
pub fn validate_unit_price(price: &Decimal) -> ValidationResult<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::InvalidValue {
            field: "price_with_tax".to_string(),
            value: price.to_string(),
            reason: "Price cannot be negative".to_string(),
        });
    }
    if *price > Decimal::from(MAX_UNIT_PRICE) {
        return Err(ValidationError::OutOfRange {
            field: "price_with_tax".to_string(),
            min: "0".to_string(),
            max: MAX_UNIT_PRICE.to_string(),
            value: price.to_string(),
        });
    }
    Ok(())
}

/// Validate that check-out, when given, falls after check-in
pub fn validate_stay_dates(
    check_in: NaiveDate,
    check_out: Option<NaiveDate>,
) -> ValidationResult<()> {
    if let Some(check_out) = check_out {
        if check_out <= check_in {
            return Err(ValidationError::InvalidValue {
                field: "check_out_date".to_string(),
                value: check_out.to_string(),
                reason: format!("Must be after check-in date {}", check_in),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoomSnapshot, StayType};
    use rust_decimal_macros::dec;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, day).unwrap()
    }

    fn candidate(beds: u32, seats: u32) -> NewCartLineItem {
        NewCartLineItem {
            room_id: "R7".to_string(),
            room: RoomSnapshot {
                title: "Quad".to_string(),
                description: String::new(),
                beds,
                available_seats: beds,
                booked_seats: 0,
            },
            image_url: None,
            stay_type: StayType::LongTerm,
            selected_seats: seats,
            quantity: 1,
            unit_price_with_tax: dec!(250),
        }
    }

    #[test]
    fn test_validate_room_id() {
        assert!(validate_room_id("R7").is_ok());
        assert!(validate_room_id("").is_err());
        assert!(validate_room_id("   ").is_err());
        assert!(validate_room_id(&"r".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_selected_seats() {
        assert!(validate_selected_seats(1, 4).is_ok());
        assert!(validate_selected_seats(4, 4).is_ok());
        assert!(validate_selected_seats(0, 4).is_err());
        assert!(validate_selected_seats(5, 4).is_err());
    }

    #[test]
    fn test_validate_cart_quantity() {
        assert!(validate_cart_quantity(1).is_ok());
        assert!(validate_cart_quantity(1000).is_ok());
        assert!(validate_cart_quantity(0).is_err());
        assert!(validate_cart_quantity(1001).is_err());
    }

    #[test]
    fn test_validate_unit_price() {
        assert!(validate_unit_price(&dec!(0)).is_ok());
        assert!(validate_unit_price(&dec!(18.75)).is_ok());
        assert!(validate_unit_price(&dec!(-0.01)).is_err());
        assert!(validate_unit_price(&dec!(1000000)).is_ok());
        assert!(validate_unit_price(&dec!(1000000.01)).is_err());
        assert!(validate_unit_price(&Decimal::MAX).is_err());
    }

    #[test]
    fn test_validate_stay_dates() {
        assert!(validate_stay_dates(date(2), None).is_ok());
        assert!(validate_stay_dates(date(2), Some(date(5))).is_ok());
        assert!(validate_stay_dates(date(5), Some(date(5))).is_err());
        assert!(validate_stay_dates(date(5), Some(date(2))).is_err());
    }

    #[test]
    fn test_new_line_item_validation() {
        assert!(candidate(4, 2).validate().is_ok());
        assert!(candidate(4, 5).validate().is_err());
        assert!(candidate(0, 0).validate().is_err());
    }

    #[test]
    fn test_patch_validation() {
        let patch = CartItemPatch {
            quantity: Some(0),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = CartItemPatch {
            selected_seats: Some(0),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = CartItemPatch {
            check_in_date: Some(date(9)),
            check_out_date: Some(date(3)),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        assert!(CartItemPatch::default().validate().is_ok());
    }
}
