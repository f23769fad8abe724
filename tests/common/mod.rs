#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hostelcart_rs::{
    create_app,
    handlers::{ApiState, SessionKeys},
    repositories::{HttpBookingApi, MemorySlotStore, SlotStore},
    services::{BookingService, CartStore},
    Metrics,
};

pub const CART_SLOT: &str = "cart";

/// A running service bound to an ephemeral port, talking to a mock booking API
pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub storage: Arc<MemorySlotStore>,
    pub booking_api: MockServer,
}

impl TestEnvironment {
    /// Start with an anonymous session and an empty cart slot
    pub async fn new() -> Self {
        Self::with_slots(&[]).await
    }

    /// Start with pre-seeded slots, e.g. a logged-in user or a legacy cart
    pub async fn with_slots(slots: &[(&str, &str)]) -> Self {
        let booking_api = MockServer::start().await;
        let storage = Arc::new(MemorySlotStore::with_slots(slots.iter().copied()));
        let dyn_storage: Arc<dyn SlotStore> = storage.clone();

        let cart = Arc::new(Mutex::new(CartStore::initialize(
            dyn_storage.clone(),
            CART_SLOT,
        )));
        let api = HttpBookingApi::new(
            format!("{}/api", booking_api.uri()),
            Duration::from_secs(2),
            Some("test-token".to_string()),
        )
        .expect("Failed to build booking API client");
        let booking_service = Arc::new(BookingService::new(cart.clone(), Arc::new(api)));

        let state = ApiState::new(
            cart,
            booking_service,
            dyn_storage,
            SessionKeys {
                user_key: "user".to_string(),
                role_key: "role".to_string(),
            },
            Arc::new(Metrics::new().expect("Failed to create metrics")),
        );
        let app = create_app(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{}", addr),
            storage,
            booking_api,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Raw contents of the persisted cart slot
    pub fn persisted_cart(&self) -> Option<Value> {
        self.storage
            .read(CART_SLOT)
            .expect("Failed to read cart slot")
            .map(|raw| serde_json::from_str(&raw).expect("Cart slot is not JSON"))
    }

    /// Make the mock booking API answer every authorized batch with `body`
    pub async fn mock_booking_response(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path("/api/bookings/batch"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.booking_api)
            .await;
    }

    pub async fn add_item(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/cart/items"))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get_cart(&self) -> Value {
        self.client
            .get(self.url("/api/cart"))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse cart")
    }
}

pub const LOGGED_IN_USER: &[(&str, &str)] = &[("user", r#"{"id":"u-1"}"#), ("role", "USER")];

/// A candidate line item as the room-detail view would post it
pub fn candidate(room_id: &str, seats: u32, price: &str, stay_type: &str) -> Value {
    json!({
        "roomId": room_id,
        "room": {
            "title": format!("Room {}", room_id),
            "description": "Shared dorm",
            "beds": 4,
            "availableSeats": 4,
            "bookedSeats": 0
        },
        "image": format!("https://img.example.com/{}.jpg", room_id),
        "stayType": stay_type,
        "selectedSeats": seats,
        "priceWithTax": price
    })
}
