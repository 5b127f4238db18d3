//! Daraja API client implementation.

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;

use goalhub_core::{normalize_phone, validate_amount, ValidationError};

use super::types::{
    DarajaErrorResponse, StkPushRequest, StkPushResponse, TokenResponse, ACCEPTED_RESPONSE_CODE,
    ACCOUNT_REFERENCE, TRANSACTION_DESC, TRANSACTION_TYPE,
};
use crate::config::{Environment, MpesaConfig};

/// Seconds shaved off the provider's token lifetime.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Used when the provider omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3599);

/// East Africa Time is UTC+3 with no daylight saving.
const EAT_OFFSET_HOURS: i64 = 3;

/// Error type for M-Pesa operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Token exchange rejected or unreachable.
    #[error("M-Pesa authentication failed: {0}")]
    AuthFailure(String),

    /// A bounded request timeout elapsed.
    #[error("M-Pesa {0} request timed out")]
    Timeout(&'static str),

    /// Transport or HTTP failure on the push request.
    #[error("M-Pesa request failed: {0}")]
    Failure(String),

    /// Phone or amount rejected before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The provider answered but did not accept the push.
    #[error("M-Pesa rejected the push: {code} {description}")]
    Rejected {
        /// Provider response code.
        code: String,
        /// Provider response description.
        description: String,
    },
}

/// An access token, or the marker that no real token could be obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessToken {
    /// A bearer token issued by the provider.
    Real(String),
    /// Sandbox stand-in. Pushes made with it never leave the process.
    Simulated,
}

/// Result of a submitted push.
#[derive(Debug, Clone)]
pub struct PushResult {
    /// Normalized subscriber number that was prompted.
    pub phone: String,
    /// Amount that was requested.
    pub amount: i64,
    /// Provider acknowledgment, or the synthesized one.
    pub response: StkPushResponse,
    /// Whether the response was synthesized locally.
    pub simulated: bool,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// M-Pesa Daraja API client.
///
/// Owns the HTTP client and the access token cache. Outside production a
/// failed token exchange degrades to [`AccessToken::Simulated`]; in production
/// it is returned as an error.
pub struct MpesaClient {
    client: Client,
    config: MpesaConfig,
    environment: Environment,
    callback_url: String,
    token: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for MpesaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpesaClient")
            .field("config", &self.config)
            .field("environment", &self.environment)
            .field("callback_url", &self.callback_url)
            .finish_non_exhaustive()
    }
}

impl MpesaClient {
    /// Create a new M-Pesa client.
    ///
    /// # Arguments
    ///
    /// * `config` - Credentials, shortcode and timeouts
    /// * `environment` - Production disables the simulated fallback
    /// * `callback_url` - URL registered with every push
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: MpesaConfig,
        environment: Environment,
        callback_url: String,
    ) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.token_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            environment,
            callback_url,
            token: RwLock::new(None),
        })
    }

    /// The callback URL registered with each push.
    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Get an access token, from cache when still valid.
    ///
    /// # Errors
    ///
    /// In production, returns `GatewayError::AuthFailure` or
    /// `GatewayError::Timeout` when the exchange fails. Outside production
    /// those failures yield `AccessToken::Simulated` instead.
    pub async fn access_token(&self) -> Result<AccessToken, GatewayError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
                return Ok(AccessToken::Real(token.token.clone()));
            }
        }

        let mut cached = self.token.write().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(AccessToken::Real(token.token.clone()));
        }

        match self.fetch_token().await {
            Ok(response) => {
                let lifetime = response
                    .expires_in_seconds()
                    .map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs);
                let token = response.access_token;
                *cached = Some(CachedToken {
                    token: token.clone(),
                    expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
                });
                tracing::debug!(lifetime_seconds = lifetime.as_secs(), "M-Pesa token refreshed");
                Ok(AccessToken::Real(token))
            }
            Err(e) if self.environment.is_production() => {
                tracing::error!(error = %e, "M-Pesa token exchange failed");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    environment = %self.environment,
                    "M-Pesa token exchange failed, using simulated token"
                );
                Ok(AccessToken::Simulated)
            }
        }
    }

    /// Drop the cached token so the next call performs a fresh exchange.
    pub async fn invalidate_token(&self) {
        self.token.write().await.take();
    }

    /// Prompt a subscriber to pay.
    ///
    /// Phone and amount are validated before any network call. With a
    /// simulated token no request is sent and a canned acknowledgment with a
    /// locally generated checkout request id is returned.
    ///
    /// # Arguments
    ///
    /// * `phone` - Subscriber number in any accepted local or international form
    /// * `amount` - Whole shillings, `1..=300_000`
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Validation` for a bad phone or amount, and the
    /// token or transport errors otherwise. The provider's response code is
    /// not checked here.
    pub async fn initiate_push(&self, phone: &str, amount: i64) -> Result<PushResult, GatewayError> {
        let phone = normalize_phone(phone)?;
        let amount = validate_amount(amount)?;

        let token = match self.access_token().await? {
            AccessToken::Real(token) => token,
            AccessToken::Simulated => {
                let response = simulated_response();
                tracing::info!(
                    event = "stk_push_initiated",
                    simulated = true,
                    checkout_request_id = %response.checkout_request_id,
                    amount,
                    "Simulated STK push"
                );
                return Ok(PushResult {
                    phone,
                    amount,
                    response,
                    simulated: true,
                });
            }
        };

        let timestamp = eat_timestamp(Utc::now());
        let request = StkPushRequest {
            business_short_code: self.config.shortcode.clone(),
            password: password(&self.config.shortcode, &self.config.passkey, &timestamp),
            timestamp,
            transaction_type: TRANSACTION_TYPE.to_string(),
            amount,
            party_a: phone.clone(),
            party_b: self.config.shortcode.clone(),
            phone_number: phone.clone(),
            callback_url: self.callback_url.clone(),
            account_reference: ACCOUNT_REFERENCE.to_string(),
            transaction_desc: TRANSACTION_DESC.to_string(),
        };

        let response = self
            .client
            .post(format!(
                "{}/mpesa/stkpush/v1/processrequest",
                self.config.effective_base_url()
            ))
            .bearer_auth(&token)
            .timeout(Duration::from_secs(self.config.push_timeout_seconds))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e, "push"))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
            return Err(GatewayError::AuthFailure(
                "access token rejected by provider".into(),
            ));
        }

        let response: StkPushResponse = self.handle_response(response).await?;

        Ok(PushResult {
            phone,
            amount,
            response,
            simulated: false,
        })
    }

    async fn fetch_token(&self) -> Result<TokenResponse, GatewayError> {
        let (Some(key), Some(secret)) = (
            self.config.consumer_key.as_deref(),
            self.config.consumer_secret.as_deref(),
        ) else {
            return Err(GatewayError::AuthFailure(
                "consumer key and secret are not configured".into(),
            ));
        };

        let response = self
            .client
            .get(format!(
                "{}/oauth/v1/generate",
                self.config.effective_base_url()
            ))
            .query(&[("grant_type", "client_credentials")])
            .basic_auth(key, Some(secret))
            .timeout(Duration::from_secs(self.config.token_timeout_seconds))
            .send()
            .await
            .map_err(|e| match transport_error(&e, "token") {
                GatewayError::Failure(msg) => GatewayError::AuthFailure(msg),
                other => other,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::AuthFailure(format!("HTTP {status}")));
        }

        response.json().await.map_err(|e| match transport_error(&e, "token") {
            GatewayError::Failure(msg) => GatewayError::AuthFailure(msg),
            other => other,
        })
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();

        if status.is_success() {
            return response.json().await.map_err(|e| transport_error(&e, "push"));
        }

        let error_body: Result<DarajaErrorResponse, _> = response.json().await;

        match error_body {
            Ok(DarajaErrorResponse {
                error_message: Some(message),
                error_code,
                ..
            }) => Err(GatewayError::Failure(match error_code {
                Some(code) => format!("{code}: {message}"),
                None => message,
            })),
            _ => Err(GatewayError::Failure(format!("HTTP {status}"))),
        }
    }
}

fn transport_error(err: &reqwest::Error, stage: &'static str) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(stage)
    } else {
        GatewayError::Failure(err.to_string())
    }
}

/// `YYYYMMDDHHMMSS` in East Africa Time.
fn eat_timestamp(now: DateTime<Utc>) -> String {
    (now.naive_utc() + chrono::Duration::hours(EAT_OFFSET_HOURS))
        .format("%Y%m%d%H%M%S")
        .to_string()
}

/// `base64(shortcode + passkey + timestamp)`.
fn password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

fn simulated_response() -> StkPushResponse {
    let id = ulid::Ulid::new();
    StkPushResponse {
        merchant_request_id: format!("SIM-{id}"),
        checkout_request_id: format!("ws_CO_SIM_{id}"),
        response_code: ACCEPTED_RESPONSE_CODE.to_string(),
        response_description: "Success. Request accepted for processing (simulated)".into(),
        customer_message: "Success. Request accepted for processing".into(),
    }
}
