//! Authentication extractors and identity verification.
//!
//! Bearer tokens are JWTs issued by an external identity provider and
//! verified against its published key set. The token's email is mapped to a
//! local user row, created with role `user` on first sight.
//!
//! Outside production, with no key set configured, `mock-token-<uid>` is
//! accepted as the user `<uid>@example.com`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use goalhub_core::{NewUser, Role, User};
use goalhub_store::StoreError;

use crate::config::{AuthConfig, Environment};
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Constants
// ============================================================================

/// How long to cache JWKS keys before refreshing.
const JWKS_CACHE_DURATION: Duration = Duration::from_secs(3600); // 1 hour

/// Timeout for JWKS fetch requests.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Development token prefix.
const MOCK_TOKEN_PREFIX: &str = "mock-token-";

/// Domain given to development users.
const MOCK_EMAIL_DOMAIN: &str = "example.com";

/// A verified identity, before it is mapped to a user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Provider subject.
    pub subject: String,
    /// Email address, the join key to local users.
    pub email: String,
    /// Display name, if the provider sent one.
    pub name: Option<String>,
}

/// An authenticated user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The local user row.
    pub user: User,
}

impl AuthUser {
    /// Require the admin or manager role.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` otherwise.
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.user.role.can_manage() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Require the admin role.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` otherwise.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.user.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Extract the Authorization header
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        // Extract the Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized)?;

        let identity = state.identity.verify(token).await?;
        let user = resolve_user(state, identity).await?;

        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Inactive user rejected");
            return Err(ApiError::Forbidden);
        }

        Ok(AuthUser { user })
    }
}

/// Find the user for an identity, creating it on first sight.
async fn resolve_user(state: &AppState, identity: Identity) -> Result<User, ApiError> {
    if let Some(user) = state.store.get_user_by_email(&identity.email).await? {
        return Ok(user);
    }

    let user = NewUser {
        email: identity.email.clone(),
        name: identity.name,
        phone: None,
        role: Role::User,
        avatar: None,
    }
    .into_user()
    .map_err(|e| {
        tracing::debug!(error = %e, "Identity email rejected");
        ApiError::Unauthorized
    })?;

    match state.store.insert_user(&user).await {
        Ok(()) => {
            tracing::info!(user_id = %user.id, subject = %identity.subject, "User provisioned");
            Ok(user)
        }
        // Lost a race with a concurrent first request.
        Err(StoreError::Conflict(_)) => state
            .store
            .get_user_by_email(&user.email)
            .await?
            .ok_or_else(|| ApiError::Internal("user vanished after conflict".into())),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Identity Verification
// ============================================================================

/// JWT claims we read from identity tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtClaims {
    /// Subject.
    pub sub: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Expiration time.
    pub exp: i64,
}

/// JWKS (JSON Web Key Set) response structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    /// List of JWK keys.
    pub keys: Vec<Jwk>,
}

/// Single JSON Web Key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Key ID.
    pub kid: Option<String>,
    /// RSA public key modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA public key exponent (base64url encoded).
    pub e: Option<String>,
}

struct JwksCache {
    keys: HashMap<String, DecodingKey>,
    /// Key for tokens without `kid`.
    default_key: Option<DecodingKey>,
    last_updated: Option<Instant>,
}

impl JwksCache {
    fn is_expired(&self) -> bool {
        self.last_updated
            .map_or(true, |at| at.elapsed() >= JWKS_CACHE_DURATION)
    }

    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self.keys.get(kid).cloned(),
            None => self.default_key.clone(),
        }
    }
}

/// Verifies bearer tokens.
///
/// Holds the JWKS cache for as long as the owning `AppState` lives.
pub struct IdentityVerifier {
    config: AuthConfig,
    environment: Environment,
    client: reqwest::Client,
    cache: RwLock<JwksCache>,
}

impl IdentityVerifier {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AuthConfig, environment: Environment) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()?;

        Ok(Self {
            config,
            environment,
            client,
            cache: RwLock::new(JwksCache {
                keys: HashMap::new(),
                default_key: None,
                last_updated: None,
            }),
        })
    }

    /// Whether development mock tokens are accepted.
    #[must_use]
    pub fn accepts_mock_tokens(&self) -> bool {
        !self.environment.is_production() && !self.config.is_configured()
    }

    /// Verify a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for invalid tokens and
    /// `ApiError::ExternalService` if the key set cannot be fetched.
    pub async fn verify(&self, token: &str) -> Result<Identity, ApiError> {
        if self.accepts_mock_tokens() {
            let uid = token
                .strip_prefix(MOCK_TOKEN_PREFIX)
                .filter(|uid| !uid.is_empty())
                .ok_or(ApiError::Unauthorized)?;
            return Ok(Identity {
                subject: uid.to_string(),
                email: format!("{uid}@{MOCK_EMAIL_DOMAIN}"),
                name: None,
            });
        }

        let Some(jwks_url) = self.config.jwks_url.as_deref() else {
            return Err(ApiError::Unauthorized);
        };

        let claims = self.validate_jwt(token, jwks_url).await?;
        let email = claims.email.ok_or_else(|| {
            tracing::debug!(subject = %claims.sub, "Token has no email claim");
            ApiError::Unauthorized
        })?;

        Ok(Identity {
            subject: claims.sub,
            email,
            name: claims.name,
        })
    }

    async fn validate_jwt(&self, token: &str, jwks_url: &str) -> Result<JwtClaims, ApiError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(error = %e, "Failed to decode JWT header");
            ApiError::Unauthorized
        })?;

        let decoding_key = self.decoding_key(header.kid.as_deref(), jwks_url).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        match self.config.audience.as_deref() {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = self.config.issuer.as_deref() {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<JwtClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::Unauthorized
        })?;

        Ok(token_data.claims)
    }

    async fn decoding_key(&self, kid: Option<&str>, jwks_url: &str) -> Result<DecodingKey, ApiError> {
        {
            let cache = self.cache.read().await;
            if !cache.is_expired() {
                if let Some(key) = cache.lookup(kid) {
                    return Ok(key);
                }
            }
        }

        // Cache miss or expired - fetch JWKS
        let jwks = self.fetch_jwks(jwks_url).await?;

        let mut cache = self.cache.write().await;
        cache.keys.clear();
        cache.default_key = None;
        cache.last_updated = Some(Instant::now());

        for jwk in &jwks.keys {
            if let Some(decoding_key) = jwk_to_decoding_key(jwk) {
                if let Some(ref key_kid) = jwk.kid {
                    cache.keys.insert(key_kid.clone(), decoding_key.clone());
                }
                if cache.default_key.is_none() {
                    cache.default_key = Some(decoding_key);
                }
            }
        }

        cache.lookup(kid).ok_or(ApiError::Unauthorized)
    }

    async fn fetch_jwks(&self, jwks_url: &str) -> Result<Jwks, ApiError> {
        tracing::debug!(url = %jwks_url, "Fetching JWKS");

        let response = self.client.get(jwks_url).send().await.map_err(|e| {
            tracing::error!(error = %e, url = %jwks_url, "Failed to fetch JWKS");
            ApiError::ExternalService("Failed to fetch authentication keys".into())
        })?;

        if !response.status().is_success() {
            tracing::error!(
                status = %response.status(),
                url = %jwks_url,
                "JWKS fetch returned non-success status"
            );
            return Err(ApiError::ExternalService(
                "Failed to fetch authentication keys".into(),
            ));
        }

        let jwks: Jwks = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS response");
            ApiError::ExternalService("Failed to parse authentication keys".into())
        })?;

        tracing::info!(keys_count = %jwks.keys.len(), "JWKS fetched successfully");

        Ok(jwks)
    }
}

/// Convert a JWK to a `DecodingKey`.
fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if jwk.kty != "RSA" {
        tracing::debug!(kty = %jwk.kty, "Skipping non-RSA JWK");
        return None;
    }

    let n = jwk.n.as_ref()?;
    let e = jwk.e.as_ref()?;

    DecodingKey::from_rsa_components(n, e).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_tokens_map_to_example_emails() {
        let verifier =
            IdentityVerifier::new(AuthConfig::default(), Environment::Development).unwrap();
        let identity = verifier.verify("mock-token-wanjiru").await.unwrap();
        assert_eq!(identity.email, "wanjiru@example.com");
        assert_eq!(identity.subject, "wanjiru");

        assert!(verifier.verify("mock-token-").await.is_err());
        assert!(verifier.verify("something-else").await.is_err());
    }

    #[tokio::test]
    async fn mock_tokens_rejected_in_production() {
        let verifier =
            IdentityVerifier::new(AuthConfig::default(), Environment::Production).unwrap();
        assert!(!verifier.accepts_mock_tokens());
        assert!(matches!(
            verifier.verify("mock-token-wanjiru").await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn mock_tokens_rejected_when_jwks_configured() {
        let verifier = IdentityVerifier::new(
            AuthConfig {
                jwks_url: Some("http://127.0.0.1:1/jwks.json".into()),
                issuer: None,
                audience: None,
            },
            Environment::Development,
        )
        .unwrap();
        assert!(matches!(
            verifier.verify("mock-token-wanjiru").await,
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn non_rsa_keys_are_skipped() {
        let jwk = Jwk {
            kty: "EC".into(),
            kid: Some("k1".into()),
            n: None,
            e: None,
        };
        assert!(jwk_to_decoding_key(&jwk).is_none());
    }
}
