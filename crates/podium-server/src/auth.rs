//! Credential verification for `WebSocket` and HTTP callers.
//!
//! Credentials are HS256 JWTs issued by the surrounding application. The
//! gateway verifies them on every upgrade and REST call. [`JwtVerifier::sign`]
//! mints tokens with the same secret for embedding applications and tests;
//! no route issues tokens.

use axum::http::{HeaderMap, header};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use podium_core::{Identity, Role};
use serde::{Deserialize, Serialize};

/// Wire code for every authentication failure.
pub const AUTH_FAILED: &str = "AUTH_FAILED";

/// A connection or request could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("authentication required")]
    MissingCredential,

    /// The credential was malformed, expired or forged.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
}

impl AuthError {
    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        AUTH_FAILED
    }
}

/// Turns a presented credential into a trusted [`Identity`].
pub trait IdentityVerifier: Send + Sync {
    /// Verify `credential`.
    fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// Subject claim as issued: numeric database IDs or opaque strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    /// Numeric user ID.
    Number(i64),
    /// String user ID.
    Text(String),
}

impl Subject {
    fn into_user_id(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Claims carried by a podium credential.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (`id` accepted as an alias).
    #[serde(alias = "id")]
    pub sub: Subject,
    /// `admin` or `musician`.
    pub role: String,
    /// Email, used as display name when `name` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Expiry (seconds since the epoch).
    pub exp: u64,
}

impl Claims {
    /// Claims for `identity`, valid for `ttl_secs` from now.
    pub fn for_identity(identity: &Identity, ttl_secs: u64) -> Self {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        Self {
            sub: Subject::Text(identity.user_id.to_string()),
            role: identity.role.as_str().to_string(),
            email: None,
            name: identity.display_name.clone(),
            exp: now + ttl_secs,
        }
    }

    fn into_identity(self) -> Result<Identity, AuthError> {
        let role = match self.role.as_str() {
            "admin" => Role::Admin,
            "musician" => Role::Musician,
            other => {
                return Err(AuthError::InvalidCredential(format!("unknown role '{other}'")));
            }
        };
        let user_id = self.sub.into_user_id();
        if user_id.trim().is_empty() {
            return Err(AuthError::InvalidCredential("empty subject".into()));
        }
        let identity = Identity::new(user_id, role);
        Ok(match self.name.or(self.email) {
            Some(display) => identity.with_display_name(display),
            None => identity,
        })
    }
}

/// HS256 JWT verifier with a shared secret.
pub struct JwtVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Verifier for `secret`, tolerating `leeway_secs` of clock skew.
    pub fn new(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign `claims` with the same secret.
    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        if credential.trim().is_empty() {
            return Err(AuthError::MissingCredential);
        }
        let data = jsonwebtoken::decode::<Claims>(credential, &self.decoding, &self.validation)
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))?;
        data.claims.into_identity()
    }
}

/// Bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Verify the bearer credential in `headers`.
pub fn authenticate_headers(
    verifier: &dyn IdentityVerifier,
    headers: &HeaderMap,
) -> Result<Identity, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingCredential)?;
    verifier.verify(&token)
}
