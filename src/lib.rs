//! Rust client for the Alibaba Cloud ECS instance metadata service.
//!
//! This crate reads instance facts and temporary RAM role credentials from the
//! metadata service at `100.100.100.200`, and can keep the credential fresh
//! in the background.
//!
//! # Features
//!
//! - Host name, instance ID, region, zone and preemption termination time
//! - RAM role credentials with automatic role discovery
//! - Optional credential cache refreshed by a cancellable background task
//! - Optional export of refreshed credentials as `ALIBABA_CLOUD_*` variables
//! - ECS SDK client settings for the instance's own region
//!
//! # Example
//!
//! ```ignore
//! use ecs_metadata::{EcsMetadata, MetadataError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MetadataError> {
//!     let metadata = EcsMetadata::new()?
//!         .with_cache(true)
//!         .with_env_propagation(true);
//!     let refresher = metadata.start_refresh();
//!
//!     println!("running in {}", metadata.zone().await);
//!     let config = metadata.ecs_client_config_for_default().await?;
//!     println!("talking to {}", config.endpoint);
//!
//!     refresher.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Failure Behavior
//!
//! | Operation | On failure |
//! |-----------|------------|
//! | `hostname`, `instance_id`, `region`, `zone` | Empty string |
//! | `termination_time` | 9999-12-31T00:00:00Z |
//! | `ram`, `ecs_client_config` | `Err(MetadataError)` |
//! | Background refresh | Logged, cache kept |

mod cache;
mod client;
mod credential;
mod environment;
mod error;
mod metadata;
mod sdk;

pub use cache::{RefreshHandle, DEFAULT_REFRESH_INTERVAL, MIN_REFRESH_INTERVAL};
pub use client::{MetadataClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use credential::{load_credential, Credential};
pub use environment::Runtime;
pub use error::MetadataError;
pub use metadata::{parse_termination_time, termination_never, EcsMetadata};
pub use sdk::{ecs_vpc_endpoint, EcsClientConfig};
