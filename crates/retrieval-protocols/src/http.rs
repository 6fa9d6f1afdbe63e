//! HTTPS protocol adapter
//!
//! Grounded on `lnxdrive-graph`'s `GraphClient`: a bearer/basic-auth
//! request builder over `reqwest`, `.context(...)`-chained errors at the
//! adapter boundary, classified into the three adapter error categories
//! at the edge where they're surfaced to the caller. Unlike
//! `GraphClient::execute_with_retry`, this adapter does not retry — the
//! File-Check Service owns the retry loop; this layer only classifies.
//!
//! The listing endpoint is expected to return a JSON array of
//! `{name, size, lastModified?}` objects at `{baseUrl}{expandedPath}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use retrieval_core::domain::{ErrorCategory, HttpsAuthType, HttpsSettings, ListedFile, ProtocolSettings};
use retrieval_core::ports::{AdapterError, ProtocolAdapter, SecretStore};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::matching::{extension_matches, filename_matches};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingEntry {
    name: String,
    size: u64,
    last_modified: Option<DateTime<Utc>>,
}

pub struct HttpsAdapter {
    client: Client,
    secret_store: Arc<dyn SecretStore>,
}

impl HttpsAdapter {
    #[must_use]
    pub fn new(secret_store: Arc<dyn SecretStore>) -> Self {
        Self {
            client: Client::new(),
            secret_store,
        }
    }

    fn settings<'a>(settings: &'a ProtocolSettings) -> Result<&'a HttpsSettings, AdapterError> {
        match settings {
            ProtocolSettings::Https(settings) => Ok(settings),
            _ => Err(AdapterError::new(
                ErrorCategory::ConfigurationError,
                "HttpsAdapter invoked with non-HTTPS settings",
            )),
        }
    }

    async fn authenticated_request(
        &self,
        settings: &HttpsSettings,
        method: reqwest::Method,
        url: &str,
    ) -> Result<reqwest::RequestBuilder, AdapterError> {
        let mut builder = self
            .client
            .request(method, url)
            .timeout(Duration::from_secs(u64::from(settings.connection_timeout_secs)));

        builder = match settings.auth_type {
            HttpsAuthType::None => builder,
            HttpsAuthType::UsernamePassword => {
                let password = self.resolve_secret(settings).await?;
                builder.basic_auth(settings.username_or_key.clone().unwrap_or_default(), Some(password))
            }
            HttpsAuthType::BearerToken => {
                let token = self.resolve_secret(settings).await?;
                builder.bearer_auth(token)
            }
            HttpsAuthType::ApiKey => {
                let key_value = self.resolve_secret(settings).await?;
                let header_name = settings.username_or_key.clone().unwrap_or_else(|| "X-API-Key".into());
                builder.header(header_name, key_value)
            }
        };

        Ok(builder)
    }

    async fn resolve_secret(&self, settings: &HttpsSettings) -> Result<String, AdapterError> {
        let identifier = settings.secret_id.as_deref().ok_or_else(|| {
            AdapterError::new(
                ErrorCategory::ConfigurationError,
                "auth type requires a secret id but none was configured",
            )
        })?;
        self.secret_store
            .resolve(identifier)
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::AuthenticationFailure, err.to_string()))
    }

    fn classify_transport_error(err: &reqwest::Error) -> ErrorCategory {
        if err.is_timeout() || err.is_connect() {
            ErrorCategory::ConnectionTimeout
        } else {
            ErrorCategory::ProtocolError
        }
    }
}

#[async_trait]
impl ProtocolAdapter for HttpsAdapter {
    async fn list(
        &self,
        settings: &ProtocolSettings,
        expanded_path: &str,
        expanded_filename: &str,
        extension: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ListedFile>, AdapterError> {
        let op = self.list_inner(settings, expanded_path, expanded_filename, extension);
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AdapterError::new(ErrorCategory::Cancelled, "https list cancelled")),
            result = op => result,
        }
    }

    async fn download(
        &self,
        settings: &ProtocolSettings,
        file_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AdapterError> {
        let op = self.download_inner(settings, file_url);
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AdapterError::new(ErrorCategory::Cancelled, "https download cancelled")),
            result = op => result,
        }
    }
}

impl HttpsAdapter {
    async fn list_inner(
        &self,
        settings: &ProtocolSettings,
        expanded_path: &str,
        expanded_filename: &str,
        extension: Option<&str>,
    ) -> Result<Vec<ListedFile>, AdapterError> {
        let https_settings = Self::settings(settings)?;
        let url = join_url(&https_settings.base_url, expanded_path);

        let builder = self
            .authenticated_request(https_settings, reqwest::Method::GET, &url)
            .await?;

        let redirect_policy = if https_settings.follow_redirects {
            reqwest::redirect::Policy::limited(https_settings.max_redirects as usize)
        } else {
            reqwest::redirect::Policy::none()
        };
        // `reqwest::Client` fixes its redirect policy at construction, so a
        // per-call override is applied via a scoped client sharing the
        // same connection settings rather than rebuilding `self.client`.
        let scoped_client = Client::builder()
            .redirect(redirect_policy)
            .timeout(Duration::from_secs(u64::from(https_settings.connection_timeout_secs)))
            .build()
            .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;
        let request = builder.build().map_err(|err| {
            AdapterError::new(ErrorCategory::ProtocolError, err.to_string())
        })?;

        let response = scoped_client.execute(request).await.map_err(|err| {
            AdapterError::new(Self::classify_transport_error(&err), err.to_string())
        })?;

        if response.status() == StatusCode::UNAUTHORIZED || response.status() == StatusCode::FORBIDDEN {
            return Err(AdapterError::new(
                ErrorCategory::AuthenticationFailure,
                format!("listing endpoint returned {}", response.status()),
            ));
        }
        if !response.status().is_success() {
            return Err(AdapterError::new(
                ErrorCategory::ProtocolError,
                format!("listing endpoint returned {}", response.status()),
            ));
        }

        let entries: Vec<ListingEntry> = response.json().await.map_err(|err| {
            AdapterError::new(ErrorCategory::ProtocolError, format!("invalid listing body: {err}"))
        })?;

        debug!(count = entries.len(), %url, "https listing fetched");

        let matched = entries
            .into_iter()
            .filter(|entry| filename_matches(expanded_filename, &entry.name))
            .filter(|entry| extension.map_or(true, |ext| extension_matches(ext, &entry.name)))
            .map(|entry| ListedFile {
                file_url: join_url(&https_settings.base_url, &format!("{expanded_path}/{}", entry.name)),
                filename: entry.name,
                size_bytes: entry.size,
                last_modified: entry.last_modified,
            })
            .collect();

        Ok(matched)
    }

    async fn download_inner(&self, settings: &ProtocolSettings, file_url: &str) -> Result<Vec<u8>, AdapterError> {
        let https_settings = Self::settings(settings)?;
        let builder = self
            .authenticated_request(https_settings, reqwest::Method::GET, file_url)
            .await?;

        let response = builder.send().await.map_err(|err| {
            AdapterError::new(Self::classify_transport_error(&err), err.to_string())
        })?;

        if !response.status().is_success() {
            return Err(AdapterError::new(
                ErrorCategory::ProtocolError,
                format!("download returned {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;

        if bytes.is_empty() {
            return Err(AdapterError::new(
                ErrorCategory::ProtocolError,
                "download yielded zero bytes",
            ));
        }

        Ok(bytes.to_vec())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
