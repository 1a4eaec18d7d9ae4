//! Connection settings for Alibaba Cloud SDK clients.

use crate::credential::Credential;
use crate::environment::default_role;
use crate::error::MetadataError;
use crate::metadata::EcsMetadata;

/// Everything an ECS API client needs to talk to the VPC endpoint of the
/// instance's own region with the instance's RAM role.
#[derive(Clone, PartialEq, Eq)]
pub struct EcsClientConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
    pub region_id: String,
    pub endpoint: String,
}

impl std::fmt::Debug for EcsClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcsClientConfig")
            .field("access_key_id", &self.access_key_id)
            .field("region_id", &self.region_id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// VPC endpoint of the ECS API in `region`.
pub fn ecs_vpc_endpoint(region: &str) -> String {
    format!("ecs-vpc.{}.aliyuncs.com", region)
}

impl EcsClientConfig {
    /// Combine a credential with the region the client should target.
    pub fn new(credential: Credential, region: &str) -> Self {
        Self {
            access_key_id: credential.access_key_id,
            access_key_secret: credential.access_key_secret,
            security_token: credential.security_token,
            region_id: region.to_string(),
            endpoint: ecs_vpc_endpoint(region),
        }
    }
}

impl EcsMetadata {
    /// Client settings for `role` (empty for the attached role).
    ///
    /// # Errors
    ///
    /// Fails when the credential cannot be loaded or the region is unknown.
    pub async fn ecs_client_config(&self, role: &str) -> Result<EcsClientConfig, MetadataError> {
        let credential = self.ram(role).await?;
        let region = self.region().await;
        if region.is_empty() {
            return Err(MetadataError::RegionUnavailable);
        }
        Ok(EcsClientConfig::new(credential, &region))
    }

    /// Client settings for the role named by `ECS_RAM_NAME`.
    pub async fn ecs_client_config_for_default(&self) -> Result<EcsClientConfig, MetadataError> {
        self.ecs_client_config(&default_role()).await
    }
}
