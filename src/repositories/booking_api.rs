use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, instrument, Instrument};

use crate::models::{
    BatchBookingRequest, BatchBookingResponse, BookingRequest, RepositoryError, RepositoryResult,
};

/// Trait defining the remote booking-creation endpoint
#[async_trait]
pub trait BookingApi: Send + Sync {
    /// Submit one batch of booking-creation requests
    async fn create_bookings(
        &self,
        bookings: &[BookingRequest],
    ) -> RepositoryResult<BatchBookingResponse>;
}

/// reqwest implementation of the BookingApi trait
#[derive(Debug, Clone)]
pub struct HttpBookingApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBookingApi {
    /// Create a new client for the booking API rooted at `base_url`
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        token: Option<String>,
    ) -> RepositoryResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// URL of the batch endpoint
    pub fn batch_url(&self) -> String {
        format!("{}/bookings/batch", self.base_url)
    }

    fn create_http_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "BookingApi",
            "otel.kind" = "client",
            "otel.name" = format!("BookingApi.{}", operation),
            "http.method" = "POST",
            "http.url" = %self.batch_url(),
            "http.status_code" = tracing::field::Empty,
        )
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    #[instrument(skip(self, bookings), fields(batch_size = bookings.len()))]
    async fn create_bookings(
        &self,
        bookings: &[BookingRequest],
    ) -> RepositoryResult<BatchBookingResponse> {
        info!("Submitting booking batch");

        let body = BatchBookingRequest {
            bookings: bookings.to_vec(),
        };
        let span = self.create_http_span("CreateBookings");

        let response = async {
            let mut request = self.client.post(self.batch_url()).json(&body);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            tracing::Span::current().record("http.status_code", response.status().as_u16());
            Ok::<_, RepositoryError>(response)
        }
        .instrument(span)
        .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Booking API returned an error status");
            return Err(RepositoryError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: BatchBookingResponse = response.json().await?;
        info!(
            success = parsed.success,
            created = parsed.booking_ids.len(),
            "Booking batch answered"
        );
        Ok(parsed)
    }
}
