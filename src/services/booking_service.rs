use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    BookingConfirmation, BookingRequest, RepositoryError, ServiceError, ServiceResult,
    SubmitBookingRequest, Validate,
};
use crate::repositories::BookingApi;
use crate::services::cart_store::CartStore;
use crate::services::session::{Session, BOOKING_ROLES};

/// The cart shared between the views of one process
pub type SharedCart = Arc<Mutex<CartStore>>;

/// Lock the shared cart, mapping a poisoned lock to a repository error
pub fn lock_cart(cart: &SharedCart) -> ServiceResult<MutexGuard<'_, CartStore>> {
    cart.lock()
        .map_err(|_| ServiceError::from(RepositoryError::LockPoisoned))
}

/// Converts the cart into one batch of booking-creation requests
pub struct BookingService {
    cart: SharedCart,
    booking_api: Arc<dyn BookingApi>,
    in_flight: AtomicBool,
}

/// Resets the in-flight flag on every exit path
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BookingService {
    /// Create a new BookingService
    pub fn new(cart: SharedCart, booking_api: Arc<dyn BookingApi>) -> Self {
        Self {
            cart,
            booking_api,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a submission is currently awaiting the remote API
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit the whole cart as one batch
    ///
    /// The cart is left untouched unless the API confirms every request.
    #[instrument(skip(self, session, request), fields(
        check_in = %request.check_in_date,
        has_check_out = request.check_out_date.is_some(),
    ))]
    pub async fn submit(
        &self,
        session: &Session,
        request: SubmitBookingRequest,
    ) -> ServiceResult<BookingConfirmation> {
        info!("Submitting booking");

        session.require_role(BOOKING_ROLES, "submit a booking")?;
        request.validate()?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Rejected overlapping booking submission");
            return Err(ServiceError::SubmissionInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let items = {
            let cart = lock_cart(&self.cart)?;
            if cart.is_empty() {
                return Err(ServiceError::EmptyCart);
            }
            cart.items().to_vec()
        };

        let bookings: Vec<BookingRequest> = items
            .iter()
            .map(|item| {
                BookingRequest::from_line_item(item, request.check_in_date, request.check_out_date)
            })
            .collect();
        let submitted_ids: Vec<Uuid> = items.iter().map(|item| item.id()).collect();
        let total_amount: Decimal = items.iter().map(|item| item.total()).sum();

        let response = match self.booking_api.create_bookings(&bookings).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Booking API call failed, cart kept for retry");
                return Err(e.into());
            }
        };

        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Booking request was not accepted".to_string());
            warn!(message = %message, "Booking rejected, cart kept for retry");
            return Err(ServiceError::BookingRejected { message });
        }

        if response.booking_ids.len() != bookings.len() {
            warn!(
                requested = bookings.len(),
                created = response.booking_ids.len(),
                "Booking API reported a partial batch, cart kept for reconciliation"
            );
            return Err(ServiceError::PartialBooking {
                requested: bookings.len(),
                created: response.booking_ids,
            });
        }

        {
            let mut cart = lock_cart(&self.cart)?;
            if let Err(e) = cart.remove_many(&submitted_ids) {
                // the bookings exist remotely; a retry would duplicate them
                error!(error = %e, "Bookings created but the cart could not be cleared");
            }
        }

        info!(
            created = response.booking_ids.len(),
            total_amount = %total_amount,
            "Booking submitted successfully"
        );

        Ok(BookingConfirmation {
            booking_ids: response.booking_ids,
            total_amount,
            line_count: bookings.len(),
            check_in_date: request.check_in_date,
            check_out_date: request.check_out_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BatchBookingResponse, NewCartLineItem, RepositoryResult, Role, RoomSnapshot, StayType,
    };
    use crate::repositories::{MemorySlotStore, SlotStore};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use mockall::mock;
    use rust_decimal_macros::dec;
    use tokio::sync::Notify;

    mock! {
        TestBookingApi {}

        #[async_trait]
        impl BookingApi for TestBookingApi {
            async fn create_bookings(&self, bookings: &[BookingRequest]) -> Result<BatchBookingResponse, RepositoryError>;
        }
    }

    const SLOT: &str = "cart";

    fn user_session() -> Session {
        Session {
            authenticated: true,
            role: Some(Role::User),
        }
    }

    fn request() -> SubmitBookingRequest {
        SubmitBookingRequest {
            check_in_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2026, 11, 22),
        }
    }

    fn candidate(room_id: &str, stay_type: StayType) -> NewCartLineItem {
        NewCartLineItem {
            room_id: room_id.to_string(),
            room: RoomSnapshot {
                title: "Dorm".to_string(),
                description: "Bunks".to_string(),
                beds: 4,
                available_seats: 4,
                booked_seats: 0,
            },
            image_url: None,
            stay_type,
            selected_seats: 2,
            quantity: 1,
            unit_price_with_tax: dec!(25),
        }
    }

    fn cart_with_items() -> (Arc<MemorySlotStore>, SharedCart) {
        let storage = Arc::new(MemorySlotStore::new());
        let mut store = CartStore::initialize(storage.clone(), SLOT);
        store.add(candidate("R1", StayType::ShortTerm)).unwrap();
        store.add(candidate("R2", StayType::LongTerm)).unwrap();
        (storage, Arc::new(Mutex::new(store)))
    }

    fn ok_response(ids: &[&str]) -> BatchBookingResponse {
        BatchBookingResponse {
            success: true,
            message: None,
            booking_ids: ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_submit_success_clears_cart() {
        let (storage, cart) = cart_with_items();
        let mut api = MockTestBookingApi::new();
        api.expect_create_bookings()
            .withf(|bookings| {
                bookings.len() == 2
                    && bookings[0].check_out_date.is_some()
                    && bookings[1].check_out_date.is_none()
                    && bookings[0].base_amount == dec!(50)
            })
            .times(1)
            .returning(|_| Ok(ok_response(&["B1", "B2"])));

        let service = BookingService::new(cart.clone(), Arc::new(api));
        let confirmation = service.submit(&user_session(), request()).await.unwrap();

        assert_eq!(confirmation.booking_ids, vec!["B1", "B2"]);
        assert_eq!(confirmation.total_amount, dec!(100));
        assert_eq!(confirmation.line_count, 2);
        assert!(lock_cart(&cart).unwrap().is_empty());
        assert!(storage.read(SLOT).unwrap().is_none());
        assert!(!service.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_rejected_keeps_cart() {
        let (storage, cart) = cart_with_items();
        let before = storage.read(SLOT).unwrap();
        let mut api = MockTestBookingApi::new();
        api.expect_create_bookings().times(1).returning(|_| {
            Ok(BatchBookingResponse {
                success: false,
                message: Some("Room R1 is fully booked".to_string()),
                booking_ids: vec![],
            })
        });

        let service = BookingService::new(cart.clone(), Arc::new(api));
        let result = service.submit(&user_session(), request()).await;

        match result {
            Err(ServiceError::BookingRejected { message }) => {
                assert_eq!(message, "Room R1 is fully booked");
            }
            other => panic!("Expected BookingRejected, got {:?}", other),
        }
        assert_eq!(lock_cart(&cart).unwrap().len(), 2);
        assert_eq!(storage.read(SLOT).unwrap(), before);
        assert!(!service.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_transport_error_keeps_cart() {
        let (_storage, cart) = cart_with_items();
        let mut api = MockTestBookingApi::new();
        api.expect_create_bookings()
            .times(1)
            .returning(|_| Err(RepositoryError::Timeout));

        let service = BookingService::new(cart.clone(), Arc::new(api));
        let result = service.submit(&user_session(), request()).await;

        assert!(matches!(
            result,
            Err(ServiceError::Repository {
                source: RepositoryError::Timeout
            })
        ));
        assert_eq!(lock_cart(&cart).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_partial_batch_keeps_cart() {
        let (_storage, cart) = cart_with_items();
        let mut api = MockTestBookingApi::new();
        api.expect_create_bookings()
            .times(1)
            .returning(|_| Ok(ok_response(&["B1"])));

        let service = BookingService::new(cart.clone(), Arc::new(api));
        let result = service.submit(&user_session(), request()).await;

        match result {
            Err(ServiceError::PartialBooking { requested, created }) => {
                assert_eq!(requested, 2);
                assert_eq!(created, vec!["B1"]);
            }
            other => panic!("Expected PartialBooking, got {:?}", other),
        }
        assert_eq!(lock_cart(&cart).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_empty_cart() {
        let storage: Arc<dyn SlotStore> = Arc::new(MemorySlotStore::new());
        let cart = Arc::new(Mutex::new(CartStore::initialize(storage, SLOT)));
        let api = MockTestBookingApi::new();

        let service = BookingService::new(cart, Arc::new(api));
        let result = service.submit(&user_session(), request()).await;

        assert!(matches!(result, Err(ServiceError::EmptyCart)));
        assert!(!service.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_requires_session() {
        let (_storage, cart) = cart_with_items();
        let service = BookingService::new(cart, Arc::new(MockTestBookingApi::new()));

        let result = service.submit(&Session::default(), request()).await;

        assert!(matches!(result, Err(ServiceError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_submit_rejects_inverted_dates() {
        let (_storage, cart) = cart_with_items();
        let service = BookingService::new(cart, Arc::new(MockTestBookingApi::new()));
        let request = SubmitBookingRequest {
            check_in_date: NaiveDate::from_ymd_opt(2026, 11, 20).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2026, 11, 19),
        };

        let result = service.submit(&user_session(), request).await;

        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    struct BlockingBookingApi {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl BookingApi for BlockingBookingApi {
        async fn create_bookings(
            &self,
            bookings: &[BookingRequest],
        ) -> RepositoryResult<BatchBookingResponse> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(BatchBookingResponse {
                success: true,
                message: None,
                booking_ids: (0..bookings.len()).map(|i| format!("B{}", i)).collect(),
            })
        }
    }

    #[tokio::test]
    async fn test_overlapping_submission_is_rejected() {
        let (_storage, cart) = cart_with_items();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let service = Arc::new(BookingService::new(
            cart.clone(),
            Arc::new(BlockingBookingApi {
                entered: entered.clone(),
                release: release.clone(),
            }),
        ));

        let first = {
            let service = service.clone();
            tokio::spawn(async move { service.submit(&user_session(), request()).await })
        };
        entered.notified().await;
        assert!(service.is_submitting());

        let second = service.submit(&user_session(), request()).await;
        assert!(matches!(second, Err(ServiceError::SubmissionInFlight)));

        release.notify_one();
        let confirmation = first.await.unwrap().unwrap();
        assert_eq!(confirmation.booking_ids.len(), 2);
        assert!(!service.is_submitting());
        assert!(lock_cart(&cart).unwrap().is_empty());
    }
}
