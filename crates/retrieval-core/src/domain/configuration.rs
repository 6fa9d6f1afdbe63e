//! Retrieval configuration entity and protocol settings
//!
//! [`ProtocolSettings`] is a tagged union, not an inheritance hierarchy:
//! adapters pattern-match the variant rather than calling through a
//! shared base type. See [`super::errors::DomainError`] for the
//! construction-time validation each variant applies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::ids::{ClientId, ConfigurationId, ETag};
use super::patterns::{reject_token_in_authority, PatternString};

const MAX_BASE_URL_LEN: usize = 500;
const MAX_CREDENTIAL_FIELD_LEN: usize = 200;

/// Which protocol a configuration's settings variant speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ProtocolTag {
    Ftp,
    Https,
    AzureBlob,
}

impl std::str::FromStr for ProtocolTag {
    type Err = DomainError;

    /// Parses the `{:?}` rendering used in emitted events/commands
    /// (`"Ftp"`, `"Https"`, `"AzureBlob"`) back into a tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ftp" => Ok(Self::Ftp),
            "Https" => Ok(Self::Https),
            "AzureBlob" => Ok(Self::AzureBlob),
            other => Err(DomainError::InvalidId(format!("unknown protocol tag: {other}"))),
        }
    }
}

/// FTP authentication/transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    /// Opaque identifier resolved against the secret store at call time;
    /// the password itself is never stored.
    pub password_secret_id: String,
    pub use_tls: bool,
    pub passive_mode: bool,
    pub connection_timeout_secs: u32,
}

impl FtpSettings {
    pub fn new(
        server: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password_secret_id: impl Into<String>,
        use_tls: bool,
        passive_mode: bool,
        connection_timeout_secs: u32,
    ) -> Result<Self, DomainError> {
        let server = server.into();
        if server.is_empty() {
            return Err(DomainError::ValidationFailed("server must not be empty".into()));
        }
        Ok(Self {
            server,
            port,
            username: username.into(),
            password_secret_id: password_secret_id.into(),
            use_tls,
            passive_mode,
            connection_timeout_secs,
        })
    }
}

/// HTTPS auth mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum HttpsAuthType {
    None,
    UsernamePassword,
    BearerToken,
    ApiKey,
}

/// HTTPS endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpsSettings {
    pub base_url: String,
    pub auth_type: HttpsAuthType,
    pub username_or_key: Option<String>,
    pub secret_id: Option<String>,
    pub connection_timeout_secs: u32,
    pub follow_redirects: bool,
    pub max_redirects: u8,
}

impl HttpsSettings {
    pub fn new(
        base_url: impl Into<String>,
        auth_type: HttpsAuthType,
        username_or_key: Option<String>,
        secret_id: Option<String>,
        connection_timeout_secs: u32,
        follow_redirects: bool,
        max_redirects: u8,
    ) -> Result<Self, DomainError> {
        let base_url = base_url.into();
        if !base_url.starts_with("https://") {
            return Err(DomainError::InvalidBaseUrl(format!(
                "must start with https://: {base_url}"
            )));
        }
        if base_url.len() > MAX_BASE_URL_LEN {
            return Err(DomainError::FieldTooLong {
                field: "baseUrl".into(),
                max: MAX_BASE_URL_LEN,
                actual: base_url.len(),
            });
        }
        reject_token_in_authority(&base_url)?;

        if let Some(ref v) = username_or_key {
            if v.len() > MAX_CREDENTIAL_FIELD_LEN {
                return Err(DomainError::FieldTooLong {
                    field: "usernameOrKey".into(),
                    max: MAX_CREDENTIAL_FIELD_LEN,
                    actual: v.len(),
                });
            }
        }
        if let Some(ref v) = secret_id {
            if v.len() > MAX_CREDENTIAL_FIELD_LEN {
                return Err(DomainError::FieldTooLong {
                    field: "secretId".into(),
                    max: MAX_CREDENTIAL_FIELD_LEN,
                    actual: v.len(),
                });
            }
        }
        if max_redirects > 10 {
            return Err(DomainError::InvalidMaxRedirects(max_redirects));
        }

        Ok(Self {
            base_url,
            auth_type,
            username_or_key,
            secret_id,
            connection_timeout_secs,
            follow_redirects,
            max_redirects,
        })
    }
}

/// Azure Blob authentication mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum AzureBlobAuthType {
    ConnectionString,
    SasToken,
    ManagedIdentity,
    ServicePrincipal,
}

/// Azure Blob container settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureBlobSettings {
    pub storage_account: String,
    pub container: String,
    pub auth_type: AzureBlobAuthType,
    /// Opaque secret identifier, meaning dependent on `auth_type`:
    /// connection string, SAS token, or service-principal client secret.
    /// `None` for `ManagedIdentity`.
    pub secret_id: Option<String>,
    pub blob_prefix: Option<String>,
}

impl AzureBlobSettings {
    pub fn new(
        storage_account: impl Into<String>,
        container: impl Into<String>,
        auth_type: AzureBlobAuthType,
        secret_id: Option<String>,
        blob_prefix: Option<String>,
    ) -> Result<Self, DomainError> {
        let storage_account = storage_account.into();
        let container = container.into();
        if storage_account.is_empty() {
            return Err(DomainError::ValidationFailed(
                "storage account must not be empty".into(),
            ));
        }
        if container.is_empty() {
            return Err(DomainError::ValidationFailed("container must not be empty".into()));
        }
        if matches!(auth_type, AzureBlobAuthType::ManagedIdentity) && secret_id.is_some() {
            return Err(DomainError::ValidationFailed(
                "ManagedIdentity auth does not take a secret id".into(),
            ));
        }
        Ok(Self {
            storage_account,
            container,
            auth_type,
            secret_id,
            blob_prefix,
        })
    }
}

/// Protocol-specific connection settings, one variant per supported protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol")]
pub enum ProtocolSettings {
    Ftp(FtpSettings),
    Https(HttpsSettings),
    AzureBlob(AzureBlobSettings),
}

impl ProtocolSettings {
    #[must_use]
    pub fn tag(&self) -> ProtocolTag {
        match self {
            Self::Ftp(_) => ProtocolTag::Ftp,
            Self::Https(_) => ProtocolTag::Https,
            Self::AzureBlob(_) => ProtocolTag::AzureBlob,
        }
    }
}

/// Cron expression + timezone, validated eagerly at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub cron_expression: String,
    pub timezone: String,
    pub description: Option<String>,
}

impl Schedule {
    /// Validates the cron expression parses and the timezone resolves
    ///
    /// Parsing is delegated to the Schedule Evaluator in
    /// `retrieval-protocols`; this constructor only checks the shape an
    /// empty/malformed value would obviously fail, leaving the
    /// authoritative `cron`/`chrono-tz` validation to the evaluator so
    /// this crate doesn't depend on the cron grammar directly.
    pub fn new(
        cron_expression: impl Into<String>,
        timezone: impl Into<String>,
        description: Option<String>,
    ) -> Result<Self, DomainError> {
        let cron_expression = cron_expression.into();
        let timezone = timezone.into();
        if cron_expression.trim().is_empty() {
            return Err(DomainError::InvalidCron(cron_expression));
        }
        if timezone.trim().is_empty() {
            return Err(DomainError::InvalidTimezone(timezone));
        }
        Ok(Self {
            cron_expression,
            timezone,
            description,
        })
    }
}

/// A stored retrieval configuration: remote location, match pattern, schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfiguration {
    pub client_id: ClientId,
    pub configuration_id: ConfigurationId,
    pub name: String,
    pub description: Option<String>,
    pub protocol_settings: ProtocolSettings,
    pub file_path_pattern: PatternString,
    pub filename_pattern: PatternString,
    pub file_extension: Option<String>,
    pub schedule: Schedule,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub last_modified_at: DateTime<Utc>,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub next_scheduled_run: Option<DateTime<Utc>>,
    pub etag: ETag,
}

impl RetrievalConfiguration {
    /// Builds a brand-new configuration, stamping creation/modification
    /// audit fields and a fresh ETag. Callers past this constructor
    /// interact with an already-valid record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_id: ClientId,
        configuration_id: ConfigurationId,
        name: impl Into<String>,
        description: Option<String>,
        protocol_settings: ProtocolSettings,
        file_path_pattern: PatternString,
        filename_pattern: PatternString,
        file_extension: Option<String>,
        schedule: Schedule,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            client_id,
            configuration_id,
            name: name.into(),
            description,
            protocol_settings,
            file_path_pattern,
            filename_pattern,
            file_extension,
            schedule,
            is_active: true,
            created_at: now,
            created_by: created_by.into(),
            last_modified_at: now,
            last_executed_at: None,
            next_scheduled_run: None,
            etag: ETag::generate(),
        }
    }

    /// Flips `isActive` to false, stamping a fresh ETag. History is
    /// retained; this is never a physical delete.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.last_modified_at = now;
        self.etag = ETag::generate();
    }
}
