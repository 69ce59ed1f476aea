//! Firebase Authentication identity provider.
//!
//! # ID token verification
//!
//! Firebase ID tokens are RS256 JWTs. Verification follows Google's
//! published rules:
//!
//! - `kid` names one of the keys in the `securetoken` JWK set
//! - `aud` is the project id, `iss` is `https://securetoken.google.com/<project id>`
//! - `exp` is in the future, `iat` and `auth_time` are present and in the past
//! - `sub` is a non-empty uid
//!
//! The key set is cached for an hour and refetched early when a token names
//! an unknown `kid` (keys rotate).
//!
//! # Account lookup
//!
//! Email lookups go through the Identity Toolkit `accounts:lookup` endpoint,
//! authorized with an OAuth access token minted from the service-account key
//! (JWT bearer grant). Access tokens are cached until shortly before expiry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use kashpages_core::{Email, SubjectId};

use super::{IdentityError, IdentityProvider, VerifiedIdentity};
use crate::config::{FirebaseConfig, ServiceAccountKey};

/// Google's JWK set for Firebase ID token signing keys.
const KEY_SET_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Identity Toolkit API base URL.
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// OAuth scopes requested for the service-account access token.
const ACCESS_TOKEN_SCOPES: &str = "https://www.googleapis.com/auth/identitytoolkit \
                                   https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Clock skew tolerated on `exp`, `iat` and `auth_time`.
const LEEWAY_SECS: u64 = 60;

const KEY_SET_TTL: Duration = Duration::from_secs(60 * 60);

/// Minimum age of the cached key set before an unknown `kid` forces a refetch.
const KEY_REFRESH_COOLDOWN: Duration = Duration::from_secs(60);

/// Access tokens live for an hour; stop using them well before that.
const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

/// Firebase Authentication provider.
pub struct FirebaseIdentityProvider {
    http: reqwest::Client,
    project_id: String,
    validation: Validation,
    key_set_url: String,
    keys: Cache<(), Arc<CachedKeySet>>,
    accounts: Option<AccountLookup>,
}

struct CachedKeySet {
    keys: JwkSet,
    fetched_at: Instant,
}

struct AccountLookup {
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    api_url: String,
    tokens: Cache<(), Arc<SecretString>>,
}

/// Claims this site reads from an ID token. The rest pass through.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountLookupRequest<'a> {
    local_id: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct AccountLookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

impl FirebaseIdentityProvider {
    /// Create a provider for the configured project.
    ///
    /// The HTTP client is shared with the rest of the application and should
    /// carry a request timeout.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Token` if the service-account private key is
    /// not a PEM-encoded RSA key.
    pub fn new(http: reqwest::Client, config: &FirebaseConfig) -> Result<Self, IdentityError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[config.project_id.as_str()]);
        validation.set_issuer(&[format!("{ISSUER_PREFIX}{}", config.project_id)]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
        validation.leeway = LEEWAY_SECS;

        let accounts = config
            .service_account
            .as_ref()
            .map(AccountLookup::new)
            .transpose()?;

        Ok(Self {
            http,
            project_id: config.project_id.clone(),
            validation,
            key_set_url: KEY_SET_URL.to_string(),
            keys: Cache::builder()
                .max_capacity(1)
                .time_to_live(KEY_SET_TTL)
                .build(),
            accounts,
        })
    }

    /// Fetch signing keys from another URL (Auth emulator, tests).
    #[must_use]
    pub fn with_key_set_url(mut self, url: impl Into<String>) -> Self {
        self.key_set_url = url.into();
        self
    }

    /// Send account lookups to another Identity Toolkit host.
    #[must_use]
    pub fn with_identity_toolkit_url(mut self, url: impl Into<String>) -> Self {
        if let Some(accounts) = &mut self.accounts {
            accounts.api_url = url.into().trim_end_matches('/').to_string();
        }
        self
    }

    async fn verify_id_token(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let header = jsonwebtoken::decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::Parse("token header has no kid".to_string()))?;
        let jwk = self.signing_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)?;

        let claims = jsonwebtoken::decode::<IdTokenClaims>(token, &key, &self.validation)?.claims;

        let subject_id =
            SubjectId::parse(&claims.sub).map_err(|e| IdentityError::Parse(e.to_string()))?;

        let now = chrono::Utc::now().timestamp();
        #[allow(clippy::cast_possible_wrap)] // Leeway is a small constant
        let latest = now + LEEWAY_SECS as i64;
        // jsonwebtoken only validates exp/nbf/aud/iss/sub itself
        let in_past = |claim: &str| {
            claims
                .rest
                .get(claim)
                .and_then(Value::as_i64)
                .is_some_and(|t| t <= latest)
        };
        if !in_past("iat") || !in_past("auth_time") {
            return Err(IdentityError::Parse(
                "iat or auth_time missing or in the future".to_string(),
            ));
        }

        let email = claims.email.as_deref().and_then(|e| Email::parse(e).ok());

        Ok(VerifiedIdentity {
            subject_id,
            email,
            claims: claims.rest,
        })
    }

    async fn signing_key(&self, kid: &str) -> Result<Jwk, IdentityError> {
        let cached = self.key_set().await?;
        if let Some(jwk) = cached.keys.find(kid) {
            return Ok(jwk.clone());
        }

        if cached.fetched_at.elapsed() < KEY_REFRESH_COOLDOWN {
            return Err(IdentityError::Parse(format!("unknown signing key {kid}")));
        }

        self.keys.invalidate(&()).await;
        let refreshed = self.key_set().await?;
        refreshed
            .keys
            .find(kid)
            .cloned()
            .ok_or_else(|| IdentityError::Parse(format!("unknown signing key {kid}")))
    }

    async fn key_set(&self) -> Result<Arc<CachedKeySet>, IdentityError> {
        self.keys
            .try_get_with((), self.fetch_key_set())
            .await
            .map_err(|e| IdentityError::Keys(e.to_string()))
    }

    async fn fetch_key_set(&self) -> Result<Arc<CachedKeySet>, IdentityError> {
        let response = self.http.get(&self.key_set_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(format!("invalid key set: {e}")))?;
        tracing::debug!(keys = keys.keys.len(), "Fetched Firebase signing keys");

        Ok(Arc::new(CachedKeySet {
            keys,
            fetched_at: Instant::now(),
        }))
    }
}

impl AccountLookup {
    fn new(key: &ServiceAccountKey) -> Result<Self, IdentityError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())?;

        Ok(Self {
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            signing_key,
            api_url: IDENTITY_TOOLKIT_URL.to_string(),
            tokens: Cache::builder()
                .max_capacity(1)
                .time_to_live(ACCESS_TOKEN_TTL)
                .build(),
        })
    }

    async fn access_token(&self, http: &reqwest::Client) -> Result<Arc<SecretString>, IdentityError> {
        self.tokens
            .try_get_with((), self.fetch_access_token(http))
            .await
            .map_err(|e| IdentityError::Parse(format!("access token unavailable: {e}")))
    }

    async fn fetch_access_token(
        &self,
        http: &reqwest::Client,
    ) -> Result<Arc<SecretString>, IdentityError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: ACCESS_TOKEN_SCOPES,
            aud: &self.token_uri,
            iat,
            exp: iat + 3600,
        };
        let assertion =
            jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)?;

        let response = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(format!("invalid token response: {e}")))?;

        Ok(Arc::new(SecretString::from(token.access_token)))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        self.verify_id_token(credential).await.map_err(|e| {
            tracing::debug!(error = %e, "ID token rejected");
            IdentityError::InvalidCredential
        })
    }

    async fn user_email(&self, subject_id: &SubjectId) -> Result<Option<Email>, IdentityError> {
        let accounts = self
            .accounts
            .as_ref()
            .ok_or(IdentityError::NotConfigured("FIREBASE_ADMIN_SDK_KEY"))?;
        let token = accounts.access_token(&self.http).await?;

        let url = format!(
            "{}/v1/projects/{}/accounts:lookup",
            accounts.api_url, self.project_id
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&AccountLookupRequest {
                local_id: [subject_id.as_str()],
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let lookup: AccountLookupResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Parse(format!("invalid lookup response: {e}")))?;

        Ok(lookup
            .users
            .into_iter()
            .find(|user| user.local_id == subject_id.as_str())
            .and_then(|user| user.email)
            .and_then(|email| Email::parse(&email).ok()))
    }
}
