// Repositories module - slot storage and remote booking API

pub mod booking_api;
pub mod slot_store;

pub use booking_api::{BookingApi, HttpBookingApi};
pub use slot_store::{FileSlotStore, MemorySlotStore, SlotStore};
