use anyhow::Context;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use hostelcart_rs::{
    create_app,
    handlers::{ApiState, SessionKeys},
    init_observability,
    observability::{Metrics, TracedSlotStore},
    repositories::{FileSlotStore, HttpBookingApi, SlotStore},
    services::{BookingService, CartStore},
    shutdown_observability, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment().context("Failed to load configuration")?;

    init_observability(&config.observability).context("Failed to initialize observability")?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!(
        data_dir = %config.storage.data_dir.display(),
        booking_api = %config.booking_api.api_base_url,
        "Service configuration"
    );

    let metrics = Arc::new(Metrics::new().context("Failed to initialize metrics")?);

    let file_store = FileSlotStore::open(&config.storage.data_dir)
        .context("Failed to open slot storage")?;
    let storage: Arc<dyn SlotStore> =
        Arc::new(TracedSlotStore::new(Arc::new(file_store), metrics.clone()));

    let cart_store = CartStore::initialize(storage.clone(), &config.storage.cart_slot_key);
    metrics.set_cart_size(cart_store.len(), cart_store.item_count());
    info!(line_count = cart_store.len(), "Cart restored");
    let cart = Arc::new(Mutex::new(cart_store));

    let booking_api = HttpBookingApi::new(
        config.booking_api.api_base_url.clone(),
        config.booking_api.timeout(),
        config.booking_api.api_token.clone(),
    )
    .context("Failed to build booking API client")?;
    if config.booking_api.api_token.is_none() {
        warn!("No booking API token configured, requests will be unauthenticated");
    }

    let booking_service = Arc::new(BookingService::new(cart.clone(), Arc::new(booking_api)));

    let state = ApiState::new(
        cart,
        booking_service,
        storage,
        SessionKeys {
            user_key: config.storage.session_user_key.clone(),
            role_key: config.storage.session_role_key.clone(),
        },
        metrics,
    );
    let app = create_app(state);

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .context("Invalid server bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown_observability().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
