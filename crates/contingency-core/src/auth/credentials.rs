//! OAuth credential bundle and its validity rules.

use super::AuthError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A credential counts as expired this long before its recorded expiry,
/// so a request started just before expiry does not fail mid-flight.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Response from the token endpoint (code exchange and refresh)
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    /// Space separated granted scopes
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Access/refresh token pair as persisted in the token cache.
///
/// The client fields let a refresh happen without re-reading the
/// client secret file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credential {
    /// Build a credential from a token endpoint response.
    ///
    /// `previous` supplies the refresh token and scopes when the response
    /// omits them (refresh responses usually do).
    pub fn from_token_response(
        response: TokenResponse,
        previous: Option<&Credential>,
        requested_scopes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let access_token = match response.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                let error = response.error.as_deref().unwrap_or("missing access_token");
                let desc = response.error_description.as_deref().unwrap_or("");
                return Err(AuthError::TokenEndpoint {
                    status: 200,
                    body: format!("{} {}", error, desc).trim().to_string(),
                });
            }
        };

        let scopes = match response.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => previous
                .map(|p| p.scopes.clone())
                .unwrap_or_else(|| requested_scopes.to_vec()),
        };

        Ok(Self {
            access_token,
            refresh_token: response
                .refresh_token
                .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
            token_type: response.token_type.unwrap_or_else(default_token_type),
            expiry: response.expires_in.map(|secs| now + Duration::seconds(secs)),
            scopes,
            client_id: previous.and_then(|p| p.client_id.clone()),
            client_secret: previous.and_then(|p| p.client_secret.clone()),
            token_uri: previous.and_then(|p| p.token_uri.clone()),
        })
    }

    /// A credential without expiry never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry,
            None => false,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && !self.is_expired(now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Every requested scope was granted.
    pub fn covers(&self, scopes: &[String]) -> bool {
        scopes.iter().all(|s| self.scopes.contains(s))
    }
}
