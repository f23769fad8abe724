// Services module - cart aggregation and booking submission

pub mod booking_service;
pub mod cart_store;
pub mod session;

pub use booking_service::{lock_cart, BookingService, SharedCart};
pub use cart_store::CartStore;
pub use session::{Session, BOOKING_ROLES};
