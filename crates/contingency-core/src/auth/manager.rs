//! Credential lifecycle: cached → refreshed → interactive.

use super::cache::TokenCache;
use super::flow::OAuthAuthorizer;
use super::{AuthError, Credential};
use crate::config::AuthConfig;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Source of new credentials
pub trait Authorizer {
    /// Trade the refresh token of an expired credential for a new one
    fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError>;

    /// Obtain a credential from scratch (interactive consent)
    fn authorize(&self, scopes: &[String]) -> Result<Credential, AuthError>;
}

impl Authorizer for OAuthAuthorizer {
    fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        self.refresh_credential(credential)
    }

    fn authorize(&self, scopes: &[String]) -> Result<Credential, AuthError> {
        self.run_local_server(scopes)
    }
}

/// What to do with the cached credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialAction {
    UseCached,
    Refresh,
    Authorize,
}

/// Decide the next step for a (possibly absent) cached credential.
///
/// A credential granted for fewer scopes than requested cannot be
/// refreshed into more, so it goes back through consent.
pub fn plan(cached: Option<&Credential>, scopes: &[String], now: DateTime<Utc>) -> CredentialAction {
    match cached {
        Some(c) if c.covers(scopes) && c.is_valid(now) => CredentialAction::UseCached,
        Some(c) if c.covers(scopes) && c.is_expired(now) && c.can_refresh() => {
            CredentialAction::Refresh
        }
        _ => CredentialAction::Authorize,
    }
}

/// Single entry point for credentials, shared by every command.
pub struct CredentialManager<A = OAuthAuthorizer> {
    cache: TokenCache,
    scopes: Vec<String>,
    authorizer: A,
}

impl CredentialManager<OAuthAuthorizer> {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.token_cache_path.clone(),
            config.scopes.clone(),
            OAuthAuthorizer::new(config),
        )
    }

    /// Replace how the consent URL is shown to the user
    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn(&str, bool) + Send + Sync + 'static,
    {
        self.authorizer = self.authorizer.with_prompt(prompt);
        self
    }
}

impl<A: Authorizer> CredentialManager<A> {
    pub fn new(cache_path: PathBuf, scopes: Vec<String>, authorizer: A) -> Self {
        Self {
            cache: TokenCache::new(cache_path),
            scopes,
            authorizer,
        }
    }

    pub fn cache_path(&self) -> &Path {
        self.cache.path()
    }

    /// Return a usable credential, refreshing or re-authorizing as needed.
    ///
    /// The result is always written back to the cache before returning.
    /// Refresh and consent failures propagate; nothing is retried.
    pub fn get_credentials(&self) -> Result<Credential, AuthError> {
        let lease = self.cache.acquire()?;
        let cached = lease.load();

        let action = plan(cached.as_ref(), &self.scopes, Utc::now());
        tracing::debug!("Credential action: {:?}", action);

        let credential = match (action, cached) {
            (CredentialAction::UseCached, Some(credential)) => credential,
            (CredentialAction::Refresh, Some(credential)) => self.authorizer.refresh(&credential)?,
            _ => {
                tracing::info!("No usable cached credential, starting authorization");
                self.authorizer.authorize(&self.scopes)?
            }
        };

        lease.store(&credential)?;
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::cell::RefCell;
    use tempfile::TempDir;

    const SCOPE: &str = "https://www.googleapis.com/auth/drive";

    fn scopes() -> Vec<String> {
        vec![SCOPE.to_string()]
    }

    fn credential(token: &str, expiry: Option<DateTime<Utc>>, refresh: Option<&str>) -> Credential {
        Credential {
            access_token: token.to_string(),
            refresh_token: refresh.map(str::to_string),
            token_type: "Bearer".to_string(),
            expiry,
            scopes: scopes(),
            client_id: None,
            client_secret: None,
            token_uri: None,
        }
    }

    #[derive(Default)]
    struct FakeAuthorizer {
        calls: RefCell<Vec<&'static str>>,
        fail_refresh: bool,
    }

    impl Authorizer for FakeAuthorizer {
        fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
            self.calls.borrow_mut().push("refresh");
            if self.fail_refresh {
                return Err(AuthError::TokenEndpoint {
                    status: 400,
                    body: "invalid_grant".to_string(),
                });
            }
            Ok(Credential {
                access_token: "refreshed".to_string(),
                expiry: Some(Utc::now() + Duration::hours(1)),
                ..credential.clone()
            })
        }

        fn authorize(&self, scopes: &[String]) -> Result<Credential, AuthError> {
            self.calls.borrow_mut().push("authorize");
            let mut fresh = credential("fresh", Some(Utc::now() + Duration::hours(1)), Some("r"));
            fresh.scopes = scopes.to_vec();
            Ok(fresh)
        }
    }

    fn seed(path: &Path, credential: &Credential) {
        std::fs::write(path, serde_json::to_string(credential).expect("json")).expect("write");
    }

    #[test]
    fn test_plan() {
        let now = Utc::now();
        let later = Some(now + Duration::hours(1));
        let earlier = Some(now - Duration::hours(1));

        assert_eq!(plan(None, &scopes(), now), CredentialAction::Authorize);
        assert_eq!(
            plan(Some(&credential("t", later, None)), &scopes(), now),
            CredentialAction::UseCached
        );
        assert_eq!(
            plan(Some(&credential("t", earlier, Some("r"))), &scopes(), now),
            CredentialAction::Refresh
        );
        assert_eq!(
            plan(Some(&credential("t", earlier, None)), &scopes(), now),
            CredentialAction::Authorize
        );
        // Invalid but not expired: no refresh
        assert_eq!(
            plan(Some(&credential("", later, Some("r"))), &scopes(), now),
            CredentialAction::Authorize
        );

        let mut narrow = credential("t", later, Some("r"));
        narrow.scopes = vec!["https://www.googleapis.com/auth/drive.file".to_string()];
        assert_eq!(plan(Some(&narrow), &scopes(), now), CredentialAction::Authorize);
    }

    #[test]
    fn test_from_config_uses_configured_cache_and_scopes() {
        let config = AuthConfig {
            token_cache_path: PathBuf::from("/tmp/contingency/token.json"),
            scopes: vec!["https://www.googleapis.com/auth/drive.file".to_string()],
            ..AuthConfig::default()
        };
        let manager = CredentialManager::from_config(&config).with_prompt(|_, _| {});

        assert_eq!(manager.cache_path(), config.token_cache_path.as_path());
        assert_eq!(manager.scopes, config.scopes);
    }

    #[test]
    fn test_missing_cache_runs_flow_and_persists() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("token.json");
        let manager = CredentialManager::new(path.clone(), scopes(), FakeAuthorizer::default());

        let creds = manager.get_credentials()?;
        assert_eq!(creds.access_token, "fresh");
        assert_eq!(*manager.authorizer.calls.borrow(), vec!["authorize"]);

        let stored: Credential = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(stored, creds);
        Ok(())
    }

    #[test]
    fn test_expired_cache_is_refreshed() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("token.json");
        seed(&path, &credential("stale", Some(Utc::now() - Duration::hours(2)), Some("r")));

        let manager = CredentialManager::new(path.clone(), scopes(), FakeAuthorizer::default());
        let creds = manager.get_credentials()?;

        assert_eq!(creds.access_token, "refreshed");
        assert_eq!(creds.refresh_token.as_deref(), Some("r"));
        assert_eq!(*manager.authorizer.calls.borrow(), vec!["refresh"]);
        assert!(creds.is_valid(Utc::now()));
        Ok(())
    }

    #[test]
    fn test_valid_cache_is_reused() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("token.json");
        let cached = credential("cached", Some(Utc::now() + Duration::hours(1)), Some("r"));
        seed(&path, &cached);

        let manager = CredentialManager::new(path, scopes(), FakeAuthorizer::default());
        assert_eq!(manager.get_credentials()?, cached);
        assert!(manager.authorizer.calls.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn test_refresh_failure_propagates_and_keeps_cache() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("token.json");
        let stale = credential("stale", Some(Utc::now() - Duration::hours(2)), Some("r"));
        seed(&path, &stale);

        let authorizer = FakeAuthorizer {
            fail_refresh: true,
            ..Default::default()
        };
        let manager = CredentialManager::new(path.clone(), scopes(), authorizer);

        let err = manager.get_credentials().unwrap_err();
        assert!(matches!(err, AuthError::TokenEndpoint { status: 400, .. }));

        // Cache untouched, lock released
        let stored: Credential = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(stored, stale);
        assert!(!temp_dir.path().join("token.json.lock").exists());
        Ok(())
    }
}
