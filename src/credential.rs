//! RAM role credentials served by the metadata service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::MetadataClient;
use crate::error::MetadataError;

/// Directory of the RAM roles attached to the instance.
pub const CREDENTIALS_PATH: &str = "ram/security-credentials/";

/// Temporary credentials of a RAM role.
///
/// Values handed out by this crate always carry a non-empty
/// [`access_key_id`](Credential::access_key_id); failed loads are reported as
/// [`MetadataError`] instead.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Credential {
    #[serde(rename = "AccessKeyId", default)]
    pub access_key_id: String,
    #[serde(rename = "AccessKeySecret", default)]
    pub access_key_secret: String,
    #[serde(rename = "SecurityToken", default)]
    pub security_token: String,
    #[serde(rename = "Expiration", default)]
    pub expiration: Option<DateTime<Utc>>,
    #[serde(rename = "LastUpdated", default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Status reported by the metadata service, `Success` on success.
    #[serde(rename = "Code", default)]
    pub code: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("security_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .field("last_updated", &self.last_updated)
            .field("code", &self.code)
            .finish()
    }
}

impl Credential {
    /// Decode and validate a credential document.
    pub fn from_document(body: &str) -> Result<Self, MetadataError> {
        let credential: Credential = serde_json::from_str(body)?;
        if credential.access_key_id.is_empty() {
            let code = if credential.code.is_empty() {
                "empty access key id".to_string()
            } else {
                credential.code
            };
            return Err(MetadataError::Provider(code));
        }
        Ok(credential)
    }
}

/// Load the credentials of `role`.
///
/// An empty `role` is resolved through the role directory, which lists the
/// single role attached to the instance. The cache is not consulted.
pub async fn load_credential(
    client: &MetadataClient,
    role: &str,
) -> Result<Credential, MetadataError> {
    let role = if role.is_empty() {
        discover_role(client).await
    } else {
        role.to_string()
    };

    if role.is_empty() {
        return Err(MetadataError::RoleNameEmpty);
    }

    let body = client
        .fetch(&format!("{}{}", CREDENTIALS_PATH, role))
        .await?;
    Credential::from_document(&body)
}

async fn discover_role(client: &MetadataClient) -> String {
    match client.fetch(CREDENTIALS_PATH).await {
        Ok(body) => body.trim().to_string(),
        Err(err) => {
            tracing::debug!(error = %err, "ram role discovery failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serial_test::parallel;

    const DOCUMENT: &str = r#"{
        "AccessKeyId": "STS.NUxxxx",
        "AccessKeySecret": "secret",
        "Expiration": "2030-01-01T06:00:00Z",
        "SecurityToken": "CAIS-token",
        "LastUpdated": "2030-01-01T00:00:00Z",
        "Code": "Success"
    }"#;

    #[test]
    #[parallel]
    fn test_decode_document() {
        let credential = Credential::from_document(DOCUMENT).unwrap();
        assert_eq!(credential.access_key_id, "STS.NUxxxx");
        assert_eq!(credential.access_key_secret, "secret");
        assert_eq!(credential.security_token, "CAIS-token");
        assert_eq!(
            credential.expiration,
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 6, 0, 0).unwrap())
        );
        assert_eq!(
            credential.last_updated,
            Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(credential.code, "Success");
    }

    #[test]
    #[parallel]
    fn test_empty_access_key_reports_code() {
        let body = r#"{"AccessKeyId": "", "Code": "RoleNotAttached"}"#;
        let result = Credential::from_document(body);
        assert!(matches!(result, Err(MetadataError::Provider(code)) if code == "RoleNotAttached"));
    }

    #[test]
    #[parallel]
    fn test_missing_access_key_without_code() {
        let result = Credential::from_document("{}");
        assert!(
            matches!(result, Err(MetadataError::Provider(code)) if code == "empty access key id")
        );
    }

    #[test]
    #[parallel]
    fn test_malformed_document() {
        assert!(matches!(
            Credential::from_document("not json"),
            Err(MetadataError::Json(_))
        ));
        assert!(matches!(
            Credential::from_document(r#"{"AccessKeyId": "a", "Expiration": "soon"}"#),
            Err(MetadataError::Json(_))
        ));
    }

    #[test]
    #[parallel]
    fn test_debug_redacts_secrets() {
        let credential = Credential::from_document(DOCUMENT).unwrap();
        let debug = format!("{:?}", credential);
        assert!(debug.contains("STS.NUxxxx"));
        assert!(!debug.contains("secret\""));
        assert!(!debug.contains("CAIS-token"));
    }

    #[test]
    #[parallel]
    fn test_serialize_uses_document_names() {
        let credential = Credential::from_document(DOCUMENT).unwrap();
        let value = serde_json::to_value(&credential).unwrap();
        assert_eq!(value["AccessKeyId"], "STS.NUxxxx");
        assert_eq!(value["Code"], "Success");
    }
}
