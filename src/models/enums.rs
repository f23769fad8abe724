use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of stay a line item is booked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StayType {
    ShortTerm,
    LongTerm,
}

impl StayType {
    /// Only short stays carry a check-out date
    pub fn has_check_out(&self) -> bool {
        matches!(self, StayType::ShortTerm)
    }
}

impl Default for StayType {
    fn default() -> Self {
        StayType::ShortTerm
    }
}

impl fmt::Display for StayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StayType::ShortTerm => write!(f, "SHORT_TERM"),
            StayType::LongTerm => write!(f, "LONG_TERM"),
        }
    }
}

impl FromStr for StayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "SHORT_TERM" => Ok(StayType::ShortTerm),
            "LONG_TERM" => Ok(StayType::LongTerm),
            _ => Err(format!("Invalid stay type: {}", s)),
        }
    }
}

/// Role tag stored in the session role slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
    Coordinator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "USER"),
            Role::Admin => write!(f, "ADMIN"),
            Role::Coordinator => write!(f, "COORDINATOR"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "COORDINATOR" => Ok(Role::Coordinator),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Initial status attached to every booking-creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "PENDING"),
            BookingStatus::Confirmed => write!(f, "CONFIRMED"),
            BookingStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Origin tag identifying who raised a booking request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingSource {
    User,
    Admin,
}

impl Default for BookingSource {
    fn default() -> Self {
        BookingSource::User
    }
}

impl fmt::Display for BookingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingSource::User => write!(f, "USER"),
            BookingSource::Admin => write!(f, "ADMIN"),
        }
    }
}
