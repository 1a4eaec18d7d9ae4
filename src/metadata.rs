//! EcsMetadata struct and core implementation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::cache::{
    spawn_refresh, CredentialCache, RefreshHandle, DEFAULT_REFRESH_INTERVAL, MIN_REFRESH_INTERVAL,
};
use crate::client::MetadataClient;
use crate::credential::{load_credential, Credential};
use crate::environment::{default_role, Runtime};
use crate::error::MetadataError;

/// Layout of the `termination-time` item.
const TERMINATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Returned by [`EcsMetadata::termination_time`] when no release is scheduled.
pub fn termination_never() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Parse a `termination-time` value such as `2030-01-01T00:00:00Z`.
pub fn parse_termination_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, TERMINATION_TIME_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

/// Main interface to the ECS instance metadata service.
///
/// Owns the HTTP client and the RAM credential cache. Share it behind an
/// [`Arc`] when several tasks need credentials.
///
/// # Example
///
/// ```ignore
/// use ecs_metadata::{EcsMetadata, MetadataError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), MetadataError> {
///     let metadata = EcsMetadata::new()?.with_cache(true);
///     let refresher = metadata.start_refresh();
///
///     let credential = metadata.ram("").await?;
///     println!("{} in {}", credential.access_key_id, metadata.region().await);
///
///     refresher.shutdown().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct EcsMetadata {
    client: MetadataClient,
    cache: Arc<CredentialCache>,
    refresh_interval: Duration,
    detect_function_compute: bool,
}

impl EcsMetadata {
    /// Create an instance talking to `100.100.100.200` with a one second timeout.
    ///
    /// Caching and environment propagation start disabled.
    pub fn new() -> Result<Self, MetadataError> {
        Ok(Self::from_client(MetadataClient::with_default_timeout()?))
    }

    /// Create an instance with a custom base URL.
    ///
    /// This is primarily useful for testing with mock servers.
    pub fn with_base_url(base_url: &str) -> Result<Self, MetadataError> {
        Ok(Self::from_client(MetadataClient::with_base_url(base_url)?))
    }

    /// Create an instance on top of an existing client.
    pub fn from_client(client: MetadataClient) -> Self {
        Self {
            client,
            cache: Arc::new(CredentialCache::new(false, false)),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            detect_function_compute: true,
        }
    }

    /// Serve [`ram`](Self::ram) from the refreshed cache when it is populated.
    ///
    /// Configure this before [`start_refresh`](Self::start_refresh); a
    /// refresher started earlier keeps the previous settings. A credential
    /// already cached is kept.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = Arc::new(self.cache.reconfigure(enabled, self.propagates_env()));
        self
    }

    /// Export refreshed credentials as `ALIBABA_CLOUD_*` environment variables.
    ///
    /// # Thread safety
    ///
    /// Not `unsafe`, but each refresh calls [`std::env::set_var`] from a Tokio
    /// worker thread. On most Unix platforms that races with any other thread
    /// reading or writing the environment, including HTTP clients looking up
    /// proxy variables. Enable it only when nothing else touches the process
    /// environment while the refresher runs.
    ///
    /// Like [`with_cache`](Self::with_cache), this belongs to construction
    /// and keeps a credential already cached.
    pub fn with_env_propagation(mut self, enabled: bool) -> Self {
        self.cache = Arc::new(self.cache.reconfigure(self.cache.enabled(), enabled));
        self
    }

    /// Set the delay between two refresh cycles.
    ///
    /// Values below one second are raised to one second.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval.max(MIN_REFRESH_INTERVAL);
        self
    }

    /// Skip the refresher inside Function Compute (on by default).
    pub fn with_function_compute_detection(mut self, enabled: bool) -> Self {
        self.detect_function_compute = enabled;
        self
    }

    /// Get the underlying metadata client.
    pub fn client(&self) -> &MetadataClient {
        &self.client
    }

    /// Whether the credential cache is enabled.
    pub fn cache_enabled(&self) -> bool {
        self.cache.enabled()
    }

    fn propagates_env(&self) -> bool {
        self.cache.propagate_env()
    }

    async fn lookup(&self, path: &str) -> String {
        match self.client.fetch(path).await {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(path, error = %err, "metadata lookup failed");
                String::new()
            }
        }
    }

    /// Host name of the instance, empty if unavailable.
    pub async fn hostname(&self) -> String {
        self.lookup("hostname").await
    }

    /// Instance ID, empty if unavailable.
    pub async fn instance_id(&self) -> String {
        self.lookup("instance-id").await
    }

    /// Region of the instance, e.g. `cn-hangzhou`; empty if unavailable.
    pub async fn region(&self) -> String {
        self.lookup("region-id").await
    }

    /// Zone of the instance, e.g. `cn-hangzhou-b`; empty if unavailable.
    pub async fn zone(&self) -> String {
        self.lookup("zone-id").await
    }

    /// Scheduled release time of a preemptible instance.
    ///
    /// Returns [`termination_never`] when nothing is scheduled or the value
    /// cannot be read.
    pub async fn termination_time(&self) -> DateTime<Utc> {
        let value = match self.client.fetch("termination-time").await {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "termination time unavailable");
                return termination_never();
            }
        };
        parse_termination_time(&value).unwrap_or_else(|| {
            tracing::debug!(value = %value, "unparsable termination time");
            termination_never()
        })
    }

    /// Credentials of the RAM role `role`.
    ///
    /// With caching enabled and a refreshed credential available, that
    /// credential is returned without a request. Otherwise the credential is
    /// loaded right away; an empty `role` selects the role attached to the
    /// instance. Loading here never updates the cache.
    pub async fn ram(&self, role: &str) -> Result<Credential, MetadataError> {
        if let Some(cached) = self.cache.get() {
            return Ok(Credential::clone(&cached));
        }
        load_credential(&self.client, role).await
    }

    /// The cached credential, without touching the network.
    pub fn cached_credential(&self) -> Option<Credential> {
        self.cache.get().map(|cached| Credential::clone(&cached))
    }

    /// Credentials of the role named by `ECS_RAM_NAME`.
    pub async fn ram_for_default(&self) -> Result<Credential, MetadataError> {
        self.ram(&default_role()).await
    }

    /// Run a single refresh cycle now.
    ///
    /// On success the cache holds the new credential; on failure it is left
    /// unchanged. Fails with [`MetadataError::CacheDisabled`] without any
    /// request when caching is off.
    pub async fn refresh_now(&self) -> Result<(), MetadataError> {
        self.cache.refresh(&self.client).await
    }

    /// Start the background refresher.
    ///
    /// Must be called within a Tokio runtime. The returned handle is inert
    /// when caching is disabled, or when running inside Function Compute with
    /// detection enabled.
    pub fn start_refresh(&self) -> RefreshHandle {
        if !self.cache.enabled() {
            tracing::debug!("credential cache disabled, refresher not started");
            return RefreshHandle::inert();
        }
        if self.detect_function_compute {
            let runtime = Runtime::detect();
            if runtime == Runtime::FunctionCompute {
                tracing::info!(%runtime, "credentials are injected, refresher not started");
                return RefreshHandle::inert();
            }
        }
        spawn_refresh(
            Arc::clone(&self.cache),
            self.client.clone(),
            self.refresh_interval,
        )
    }
}
