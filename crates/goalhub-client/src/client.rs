//! Goalhub HTTP client implementation.

use std::time::Duration;

use goalhub_core::{NewBooking, PaymentStatus, PaymentStatusView};
use reqwest::{Client, RequestBuilder};
use tokio::time::Instant;

use crate::error::ClientError;
use crate::types::{ApiErrorResponse, BookingResponse, PaymentInitiation, StkPushRequest};

/// Goalhub API client.
///
/// Provides methods for initiating payments, polling their outcome and
/// booking against them.
#[derive(Debug, Clone)]
pub struct GoalhubClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
    poll_interval: Duration,
}

impl GoalhubClient {
    /// Create a new goalhub client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the goalhub service (e.g., `"http://goalhub:8000"`)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new goalhub client with custom options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: options.bearer_token,
            poll_interval: Duration::from_millis(options.poll_interval_ms),
        })
    }

    /// Prompt a subscriber to pay.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::RateLimited` when this client has made too many
    /// initiations, or another error if the request fails.
    pub async fn initiate_payment(
        &self,
        phone: impl Into<String>,
        amount: i64,
    ) -> Result<PaymentInitiation, ClientError> {
        let url = format!("{}/api/stkpush", self.base_url);
        let request = StkPushRequest {
            phone: phone.into(),
            amount,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        self.handle_response(response).await
    }

    /// Current status of a payment.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` for an unknown checkout request id.
    pub async fn payment_status(
        &self,
        checkout_request_id: &str,
    ) -> Result<PaymentStatusView, ClientError> {
        let url = format!("{}/api/payment-status/{checkout_request_id}", self.base_url);

        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Poll a payment until it completes or fails.
    ///
    /// Returns the terminal view; whether the payment succeeded is for the
    /// caller to check.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Timeout` if the payment is still pending once
    /// `deadline` has elapsed.
    pub async fn wait_for_payment(
        &self,
        checkout_request_id: &str,
        deadline: Duration,
    ) -> Result<PaymentStatusView, ClientError> {
        let give_up_at = Instant::now() + deadline;

        loop {
            let view = self.payment_status(checkout_request_id).await?;
            if view.status.is_terminal() {
                return Ok(view);
            }

            let now = Instant::now();
            if now >= give_up_at {
                return Err(ClientError::Timeout {
                    checkout_request_id: checkout_request_id.to_string(),
                    last_status: view.status,
                });
            }

            tracing::debug!(checkout_request_id, "Payment still pending");
            tokio::time::sleep(self.poll_interval.min(give_up_at - now)).await;
        }
    }

    /// Create a booking, confirmed when `checkout_request_id` names a
    /// completed payment. Requires a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::PaymentIncomplete` if the payment has not
    /// completed, `ClientError::NotFound` for an unknown payment or turf, or
    /// `ClientError::Configuration` if no bearer token is set.
    pub async fn create_booking(
        &self,
        request: &NewBooking,
        checkout_request_id: Option<&str>,
    ) -> Result<BookingResponse, ClientError> {
        let url = format!("{}/api/bookings", self.base_url);

        let mut builder = self.client.post(&url).json(request);
        if let Some(id) = checkout_request_id {
            builder = builder.query(&[("checkout_request_id", id)]);
        }

        let response = self.authorized(builder)?.send().await?;

        self.handle_response(response).await
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or_else(|| ClientError::Configuration("bearer token required".into()))?;
        Ok(builder.bearer_auth(token))
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let code = api_error.error.code.as_str();
                let message = api_error.error.message;

                // Map specific error codes to typed errors
                match code {
                    "not_found" => Err(ClientError::NotFound { message }),
                    "rate_limited" => Err(ClientError::RateLimited { message }),
                    "precondition_failed" => {
                        let reported = api_error
                            .error
                            .details
                            .as_ref()
                            .and_then(|d| d.get("payment_status"))
                            .and_then(serde_json::Value::as_str)
                            .and_then(|s| s.parse::<PaymentStatus>().ok());

                        match reported {
                            Some(payment_status) => Err(ClientError::PaymentIncomplete {
                                status: payment_status,
                            }),
                            None => Err(ClientError::Api {
                                code: code.to_string(),
                                message,
                                status: status.as_u16(),
                            }),
                        }
                    }
                    _ => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Delay between status polls in `wait_for_payment` (default: 2000).
    pub poll_interval_ms: u64,
    /// User JWT sent on authenticated routes.
    pub bearer_token: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            poll_interval_ms: 2000,
            bearer_token: None,
        }
    }
}

impl ClientOptions {
    /// Create options with a bearer token.
    #[must_use]
    pub fn with_bearer_token(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
            ..Self::default()
        }
    }
}
