//! Credential cache and its background refresher.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::MetadataClient;
use crate::credential::{load_credential, Credential};
use crate::environment::{ACCESS_KEY_ID_VAR, ACCESS_KEY_SECRET_VAR, SECURITY_TOKEN_VAR};
use crate::error::MetadataError;

/// Default delay between two refresh cycles.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest delay allowed between two refresh cycles.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Holds the last credential loaded by a successful refresh.
#[derive(Debug)]
pub(crate) struct CredentialCache {
    current: ArcSwapOption<Credential>,
    enabled: bool,
    propagate_env: bool,
}

impl CredentialCache {
    pub fn new(enabled: bool, propagate_env: bool) -> Self {
        Self {
            current: ArcSwapOption::empty(),
            enabled,
            propagate_env,
        }
    }

    /// Same cache with other flags, keeping the stored credential.
    pub fn reconfigure(&self, enabled: bool, propagate_env: bool) -> Self {
        Self {
            current: ArcSwapOption::new(self.current.load_full()),
            enabled,
            propagate_env,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn propagate_env(&self) -> bool {
        self.propagate_env
    }

    /// The cached credential, if caching is on and a refresh has succeeded.
    pub fn get(&self) -> Option<Arc<Credential>> {
        if !self.enabled {
            return None;
        }
        self.current
            .load_full()
            .filter(|credential| !credential.access_key_id.is_empty())
    }

    /// Replace the cached credential as a whole.
    ///
    /// With propagation on this writes the process environment, which is not
    /// synchronized with concurrent readers of it.
    pub fn store(&self, credential: Credential) {
        if self.propagate_env {
            env::set_var(ACCESS_KEY_ID_VAR, &credential.access_key_id);
            env::set_var(ACCESS_KEY_SECRET_VAR, &credential.access_key_secret);
            env::set_var(SECURITY_TOKEN_VAR, &credential.security_token);
        }
        self.current.store(Some(Arc::new(credential)));
    }

    /// Run one refresh cycle. A failed load leaves the cache untouched.
    ///
    /// Nothing is fetched while caching is disabled.
    pub async fn refresh(&self, client: &MetadataClient) -> Result<(), MetadataError> {
        if !self.enabled {
            return Err(MetadataError::CacheDisabled);
        }
        let credential = load_credential(client, "").await?;
        tracing::info!(
            access_key_id = %credential.access_key_id,
            expiration = ?credential.expiration,
            "ram credential refreshed"
        );
        self.store(credential);
        Ok(())
    }
}

/// Handle to the background credential refresher.
///
/// Dropping the handle leaves the refresher running until the runtime shuts
/// down; call [`shutdown`](RefreshHandle::shutdown) to stop it.
#[derive(Debug)]
pub struct RefreshHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// A handle with no task behind it.
    pub(crate) fn inert() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    /// Whether a refresher task is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the refresher and wait for it to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Some(task) = self.task {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "ram credential refresher panicked");
            }
        }
    }
}

/// Spawn the refresher: refresh right away, then every `interval`.
pub(crate) fn spawn_refresh(
    cache: Arc<CredentialCache>,
    client: MetadataClient,
    interval: Duration,
) -> RefreshHandle {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                result = cache.refresh(&client) => {
                    if let Err(err) = result {
                        tracing::warn!(error = %err, "refresh ram credential failed");
                    }
                }
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        tracing::debug!("ram credential refresher stopped");
    });

    RefreshHandle {
        shutdown,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::{parallel, serial};

    fn credential(id: &str) -> Credential {
        Credential {
            access_key_id: id.to_string(),
            access_key_secret: format!("{}-secret", id),
            security_token: format!("{}-token", id),
            expiration: None,
            last_updated: None,
            code: "Success".to_string(),
        }
    }

    #[test]
    #[parallel]
    fn test_empty_cache() {
        let cache = CredentialCache::new(true, false);
        assert!(cache.get().is_none());
    }

    #[test]
    #[parallel]
    fn test_store_and_get() {
        let cache = CredentialCache::new(true, false);
        cache.store(credential("first"));
        assert_eq!(cache.get().unwrap().access_key_id, "first");

        cache.store(credential("second"));
        let current = cache.get().unwrap();
        assert_eq!(current.access_key_id, "second");
        assert_eq!(current.access_key_secret, "second-secret");
    }

    #[test]
    #[parallel]
    fn test_disabled_cache_hides_value() {
        let cache = CredentialCache::new(false, false);
        cache.store(credential("first"));
        assert!(cache.get().is_none());
    }

    #[test]
    #[serial]
    fn test_store_propagates_env() {
        let cache = CredentialCache::new(true, true);
        cache.store(credential("env"));
        assert_eq!(env::var(ACCESS_KEY_ID_VAR).unwrap(), "env");
        assert_eq!(env::var(ACCESS_KEY_SECRET_VAR).unwrap(), "env-secret");
        assert_eq!(env::var(SECURITY_TOKEN_VAR).unwrap(), "env-token");
        env::remove_var(ACCESS_KEY_ID_VAR);
        env::remove_var(ACCESS_KEY_SECRET_VAR);
        env::remove_var(SECURITY_TOKEN_VAR);
    }

    #[test]
    #[serial]
    fn test_store_without_propagation() {
        env::remove_var(ACCESS_KEY_ID_VAR);
        let cache = CredentialCache::new(true, false);
        cache.store(credential("quiet"));
        assert!(env::var(ACCESS_KEY_ID_VAR).is_err());
    }

    #[test]
    #[parallel]
    fn test_reconfigure_keeps_credential() {
        let cache = CredentialCache::new(true, false);
        cache.store(credential("kept"));

        let cache = cache.reconfigure(true, true);
        assert!(cache.propagate_env());
        assert_eq!(cache.get().unwrap().access_key_id, "kept");

        let cache = cache.reconfigure(false, false);
        assert!(cache.get().is_none());
        let cache = cache.reconfigure(true, false);
        assert_eq!(cache.get().unwrap().access_key_id, "kept");
    }

    #[tokio::test]
    #[serial]
    async fn test_disabled_cache_does_not_refresh() {
        env::remove_var(ACCESS_KEY_ID_VAR);
        let cache = CredentialCache::new(false, true);
        // Nothing listens here; a request would fail with a transport error.
        let client = MetadataClient::with_base_url("http://127.0.0.1:1").unwrap();

        let result = cache.refresh(&client).await;
        assert!(matches!(result, Err(MetadataError::CacheDisabled)));
        assert!(env::var(ACCESS_KEY_ID_VAR).is_err());
    }

    #[tokio::test]
    #[parallel]
    async fn test_inert_handle() {
        let handle = RefreshHandle::inert();
        assert!(!handle.is_running());
        handle.shutdown().await;
    }

    #[tokio::test]
    #[parallel]
    async fn test_shutdown_interrupts_sleep() {
        let cache = Arc::new(CredentialCache::new(true, false));
        // Nothing listens here, every refresh fails fast.
        let client = MetadataClient::with_base_url("http://127.0.0.1:1").unwrap();
        let handle = spawn_refresh(cache.clone(), client, Duration::from_secs(3600));
        assert!(handle.is_running());

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("refresher did not stop");
        assert!(cache.get().is_none());
    }
}
