//! External identity providers.

use std::time::Duration;

use async_trait::async_trait;
use huddle_common::config::OAuthClientConfig;
use huddle_common::{AppError, AppResult};
use huddle_db::entities::user::AuthProvider;
use serde::Deserialize;
use url::Url;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// An identity asserted by an external provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: AuthProvider,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// OAuth-style sign-in with a third party.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Which provider this is.
    fn provider(&self) -> AuthProvider;

    /// URL to send the browser to. `state` is echoed back on the callback.
    fn authorize_url(&self, state: &str) -> AppResult<String>;

    /// Redeem an authorization code for the user's identity.
    async fn exchange_code(&self, code: &str) -> AppResult<ExternalIdentity>;
}

/// Google sign-in over the OAuth 2.0 authorization code flow.
#[derive(Clone)]
pub struct GoogleIdentityProvider {
    config: OAuthClientConfig,
    http_client: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleIdentityProvider {
    /// Create a Google provider from client credentials.
    pub fn new(config: OAuthClientConfig) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn identity_from(info: GoogleUserInfo) -> AppResult<ExternalIdentity> {
        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::Unauthorized("Google account has no email".to_string()))?;

        if !info.email_verified {
            return Err(AppError::Unauthorized(
                "Google account email is not verified".to_string(),
            ));
        }

        Ok(ExternalIdentity {
            provider: AuthProvider::Google,
            email,
            name: info.name,
            image: info.picture,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn provider(&self) -> AuthProvider {
        AuthProvider::Google
    }

    fn authorize_url(&self, state: &str) -> AppResult<String> {
        let url = Url::parse_with_params(
            GOOGLE_AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Internal(format!("Invalid authorize URL: {e}")))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> AppResult<ExternalIdentity> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Google token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(%status, "Google rejected authorization code");
            return Err(AppError::Unauthorized(
                "Sign-in with Google failed".to_string(),
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid Google token response: {e}")))?;

        let response = self
            .http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Google userinfo request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalService(format!(
                "Google userinfo error: {status}"
            )));
        }

        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid Google userinfo: {e}")))?;

        Self::identity_from(info)
    }
}
