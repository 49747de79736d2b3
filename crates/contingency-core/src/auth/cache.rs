//! On-disk token cache with a lock file.
//!
//! The cache is only touched through a [`TokenCacheLease`]: acquire,
//! load, store, and the lock is released when the lease drops. Stores go
//! through a temp file + rename so a failed write never truncates the
//! previous credential.

use super::{AuthError, Credential};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A lock older than this is considered abandoned. Covers a full
/// interactive consent round trip.
const LOCK_TIMEOUT_SECS: u64 = 600;

/// Unique owner id for the lock file
fn get_owner_id() -> String {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let pid = std::process::id();
    format!("{}:{}", hostname, pid)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "token".into());
    name.push(suffix);
    path.with_file_name(name)
}

/// Token cache location
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        sibling(&self.path, ".lock")
    }

    /// Take the cache lock.
    ///
    /// Fails with [`AuthError::CacheLocked`] while another live owner holds it.
    pub fn acquire(&self) -> Result<TokenCacheLease, AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_path = self.lock_path();
        let owner = get_owner_id();
        let content = format!("{}:{}", unix_now(), owner);

        for _ in 0..2 {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    file.write_all(content.as_bytes())?;
                    tracing::debug!("Token cache lock acquired by {}", owner);
                    return Ok(TokenCacheLease {
                        path: self.path.clone(),
                        lock_path,
                        owner,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let existing = fs::read_to_string(&lock_path).unwrap_or_default();
                    if let Some(holder) = live_holder(&existing, &owner, unix_now()) {
                        return Err(AuthError::CacheLocked {
                            path: self.path.clone(),
                            owner: holder,
                        });
                    }
                    tracing::warn!("Taking over stale token cache lock ({})", existing.trim());
                    match fs::remove_file(&lock_path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AuthError::CacheLocked {
            path: self.path.clone(),
            owner: "unknown".to_string(),
        })
    }
}

/// Owner of a lock that is still in force, `None` if it may be taken over.
fn live_holder(content: &str, my_id: &str, now: u64) -> Option<String> {
    let (timestamp, owner) = content.trim().split_once(':')?;
    let lock_time = timestamp.parse::<u64>().ok()?;
    if owner == my_id || now.saturating_sub(lock_time) >= LOCK_TIMEOUT_SECS {
        return None;
    }
    Some(owner.to_string())
}

/// Whether lock file `content` names exactly `owner`.
fn owned_by(content: &str, owner: &str) -> bool {
    content
        .trim()
        .split_once(':')
        .is_some_and(|(_, holder)| holder == owner)
}

/// Exclusive access to the token cache for the duration of one run.
#[derive(Debug)]
pub struct TokenCacheLease {
    path: PathBuf,
    lock_path: PathBuf,
    owner: String,
}

impl TokenCacheLease {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached credential. A missing or unreadable cache yields `None`.
    pub fn load(&self) -> Option<Credential> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No token cache at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!("Cannot read token cache {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!("Ignoring corrupt token cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Persist the credential atomically.
    pub fn store(&self, credential: &Credential) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(credential)?;
        let tmp_path = sibling(&self.path, ".tmp");

        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp_path, &self.path)?;
        tracing::debug!("Token cache written to {}", self.path.display());
        Ok(())
    }
}

impl Drop for TokenCacheLease {
    fn drop(&mut self) {
        // Only remove a lock we still own; a stale takeover may have replaced it
        let still_ours = fs::read_to_string(&self.lock_path)
            .map(|c| owned_by(&c, &self.owner))
            .unwrap_or(false);
        if still_ours {
            let _ = fs::remove_file(&self.lock_path);
            tracing::debug!("Token cache lock released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Credential {
        Credential {
            access_token: "ya29.cached".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            token_type: "Bearer".to_string(),
            expiry: None,
            scopes: vec!["https://www.googleapis.com/auth/drive".to_string()],
            client_id: Some("client".to_string()),
            client_secret: None,
            token_uri: None,
        }
    }

    #[test]
    fn test_store_and_load() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let cache = TokenCache::new(temp_dir.path().join("tokens").join("token.json"));

        let lease = cache.acquire()?;
        assert!(lease.load().is_none());
        lease.store(&sample())?;
        assert_eq!(lease.load(), Some(sample()));
        assert!(!sibling(cache.path(), ".tmp").exists());
        Ok(())
    }

    #[test]
    fn test_lock_released_on_drop() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let cache = TokenCache::new(temp_dir.path().join("token.json"));

        {
            let _lease = cache.acquire()?;
            assert!(cache.lock_path().exists());
        }
        assert!(!cache.lock_path().exists());

        // Reacquire works after release
        let _lease = cache.acquire()?;
        Ok(())
    }

    #[test]
    fn test_foreign_live_lock_is_refused() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let cache = TokenCache::new(temp_dir.path().join("token.json"));
        fs::write(cache.lock_path(), format!("{}:otherhost:4242", unix_now()))?;

        let err = cache.acquire().unwrap_err();
        assert!(matches!(err, AuthError::CacheLocked { ref owner, .. } if owner == "otherhost:4242"));
        // The foreign lock is left alone
        assert!(cache.lock_path().exists());
        Ok(())
    }

    #[test]
    fn test_stale_lock_is_taken_over() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let cache = TokenCache::new(temp_dir.path().join("token.json"));
        let old = unix_now() - LOCK_TIMEOUT_SECS - 1;
        fs::write(cache.lock_path(), format!("{}:otherhost:4242", old))?;

        let lease = cache.acquire()?;
        lease.store(&sample())?;
        Ok(())
    }

    #[test]
    fn test_corrupt_cache_loads_as_none() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let cache = TokenCache::new(temp_dir.path().join("token.json"));
        fs::write(cache.path(), b"\x80\x04pickle")?;

        let lease = cache.acquire()?;
        assert!(lease.load().is_none());
        Ok(())
    }

    #[test]
    fn test_owned_by_matches_whole_owner() {
        assert!(owned_by("1700000000:host:12\n", "host:12"));
        assert!(!owned_by("1700000000:xhost:12", "host:12"));
        assert!(!owned_by("1700000000:host:112", "host:12"));
        assert!(!owned_by("host:12", "host:12"));
        assert!(!owned_by("", "host:12"));
    }

    #[test]
    fn test_lease_keeps_lock_taken_over_by_similar_owner() -> Result<(), AuthError> {
        let temp_dir = TempDir::new()?;
        let cache = TokenCache::new(temp_dir.path().join("token.json"));
        let lease = cache.acquire()?;

        // Another host whose name ends with ours took the lock over
        let other = format!("{}:x{}", unix_now(), lease.owner);
        fs::write(cache.lock_path(), &other)?;
        drop(lease);

        assert_eq!(fs::read_to_string(cache.lock_path())?, other);
        Ok(())
    }

    #[test]
    fn test_live_holder() {
        let now = 1_000_000;
        assert_eq!(
            live_holder("999990:host:1", "me:2", now),
            Some("host:1".to_string())
        );
        assert_eq!(live_holder("999990:me:2", "me:2", now), None);
        assert_eq!(live_holder("1:host:1", "me:2", now), None);
        assert_eq!(live_holder("garbage", "me:2", now), None);
    }
}
