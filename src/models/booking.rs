use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BookingSource, BookingStatus, CartLineItem, StayType};

/// Shared dates supplied by the booking-confirmation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBookingRequest {
    pub check_in_date: NaiveDate,
    #[serde(default)]
    pub check_out_date: Option<NaiveDate>,
}

/// One booking-creation request, built from one cart line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub room_id: String,
    pub stay_type: StayType,
    pub selected_seats: u32,
    pub check_in_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<NaiveDate>,
    pub base_amount: Decimal,
    pub status: BookingStatus,
    pub source: BookingSource,
}

/// Body of the batch booking call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchBookingRequest {
    pub bookings: Vec<BookingRequest>,
}

/// Remote API answer to a batch booking call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchBookingResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "data")]
    pub booking_ids: Vec<String>,
}

/// Data handed to the confirmation view after a successful submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking_ids: Vec<String>,
    pub total_amount: Decimal,
    pub line_count: usize,
    pub check_in_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out_date: Option<NaiveDate>,
}

impl BookingRequest {
    /// Build the request for a line item; check-out only applies to short stays
    pub fn from_line_item(
        item: &CartLineItem,
        check_in_date: NaiveDate,
        check_out_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            room_id: item.room_id.clone(),
            stay_type: item.stay_type,
            selected_seats: item.selected_seats,
            check_in_date,
            check_out_date: if item.stay_type.has_check_out() {
                check_out_date
            } else {
                None
            },
            base_amount: item.total(),
            status: BookingStatus::Pending,
            source: BookingSource::User,
        }
    }
}
