//! Authentication payloads and the user model.
//!
//! These shapes mirror the backend's auth DTOs: login and register both
//! return the same `{accessToken, refreshToken, user}` envelope, and the
//! access token is a JWT whose payload carries the claims in
//! [`TokenClaims`].

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

/// Serialize a secret as its inner string.
///
/// Request bodies have to carry the actual password; everywhere else the
/// secret stays wrapped so it cannot leak through `Debug` or logging.
fn expose_secret<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Login credentials for `POST /users/login`.
///
/// The password is held as a [`SecretString`] so accidental `Debug` output
/// prints `[REDACTED]` instead of the secret.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// Account email address.
    pub email: String,
    /// Account password, exposed only when the request body is serialized.
    #[serde(serialize_with = "expose_secret")]
    pub password: SecretString,
}

impl Credentials {
    /// Create credentials from an email and a password.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::new(password.into().into()),
        }
    }
}

/// Account-creation payload for `POST /users/register`.
///
/// Same field set as [`Credentials`]; the backend decides everything else
/// about the new account.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    /// Email address for the new account.
    pub email: String,
    /// Initial password.
    #[serde(serialize_with = "expose_secret")]
    pub password: SecretString,
}

impl RegisterRequest {
    /// Create a registration payload.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::new(password.into().into()),
        }
    }
}

/// Authenticated session as returned by login, register, and token refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Short-lived bearer credential attached to every request.
    pub access_token: String,
    /// Longer-lived credential used solely to obtain a new access token.
    ///
    /// The refresh endpoint may rotate it; absence means "keep the old one".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// The authenticated user, when the endpoint includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// A backend user account.
///
/// Immutable from the client's perspective; the server is the source of
/// truth for role and permission assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier.
    pub id: i64,
    /// Account email address.
    pub email: String,
    /// Assigned role, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// A role grouping a set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Backend identifier.
    pub id: i64,
    /// Role name.
    pub name: String,
    /// Permissions granted by this role, when expanded by the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,
}

/// A single named permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Backend identifier.
    pub id: i64,
    /// Permission name, as used by `GET /users/can-do/:permission`.
    pub name: String,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Minimal profile returned by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Email of the authenticated account.
    pub email: String,
}

/// Claims carried in the access token's JWT payload.
///
/// Only the fields the client inspects; any extra claims are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject email.
    pub email: String,
    /// Expiry as a Unix timestamp in seconds.
    pub exp: i64,
    /// Issued-at timestamp, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}
