use super::AuthError;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client identifiers from the cloud console download.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The console wraps the client under "installed" or "web".
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AuthError::ClientSecret(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
            .map_err(|e| AuthError::ClientSecret(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: ClientSecretFile = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let secret = file
            .installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" client".to_string())?;

        if secret.client_id.trim().is_empty() {
            return Err("client_id is empty".to_string());
        }
        Ok(secret)
    }
}
