//! Session tokens.
//!
//! A session is an HS256-signed JWT carrying the user's id, email and
//! display name. Handlers receive the decoded [`Session`] explicitly.

use chrono::{Duration, Utc};
use huddle_common::config::SessionConfig;
use huddle_common::{AppError, AppResult};
use huddle_db::entities::user;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// The authenticated identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    /// Lower-cased email.
    pub email: String,
    pub name: Option<String>,
}

impl Session {
    #[must_use]
    pub fn from_user(user: &user::Model) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user::normalize_email(&user.email),
            name: user.name.clone(),
        }
    }

    /// Name to show for this user: display name, falling back to email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionManager {
    /// Create a session manager from configuration.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::seconds(config.ttl_secs),
        }
    }

    /// Sign a token for the session.
    pub fn issue(&self, session: &Session) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: session.user_id.clone(),
            email: session.email.clone(),
            name: session.name.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {e}")))
    }

    /// Decode a token. Expired, tampered or malformed tokens are `Unauthenticated`.
    pub fn verify(&self, token: &str) -> AppResult<Session> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            AppError::Unauthenticated
        })?;

        Ok(Session {
            user_id: data.claims.sub,
            email: data.claims.email,
            name: data.claims.name,
        })
    }
}
