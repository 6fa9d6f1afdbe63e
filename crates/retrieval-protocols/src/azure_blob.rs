//! Azure Blob protocol adapter
//!
//! Implemented as REST calls over `reqwest` rather than the full Azure
//! Storage SDK — shared-key/SAS/bearer auth are just header and query
//! construction, mirroring how `lnxdrive-graph` hand-rolls its Graph API
//! client over `reqwest` instead of a vendor SDK.
//!
//! List Blobs returns XML; rather than pull in a dependency-heavy XML
//! library for one small, fixed shape, the handful of fields used here
//! (`<Blob><Name>`, `<Properties><Content-Length>`,
//! `<Properties><Last-Modified>`) are extracted with a minimal scanner.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use retrieval_core::domain::{AzureBlobAuthType, AzureBlobSettings, ErrorCategory, ListedFile, ProtocolSettings};
use retrieval_core::ports::{AdapterError, ProtocolAdapter, SecretStore};
use sha2::Sha256;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::matching::{extension_matches, filename_matches};

const API_VERSION: &str = "2021-08-06";

pub struct AzureBlobAdapter {
    client: Client,
    secret_store: Arc<dyn SecretStore>,
}

impl AzureBlobAdapter {
    #[must_use]
    pub fn new(secret_store: Arc<dyn SecretStore>) -> Self {
        Self {
            client: Client::new(),
            secret_store,
        }
    }

    fn settings<'a>(settings: &'a ProtocolSettings) -> Result<&'a AzureBlobSettings, AdapterError> {
        match settings {
            ProtocolSettings::AzureBlob(settings) => Ok(settings),
            _ => Err(AdapterError::new(
                ErrorCategory::ConfigurationError,
                "AzureBlobAdapter invoked with non-AzureBlob settings",
            )),
        }
    }

    fn host(settings: &AzureBlobSettings) -> String {
        format!("{}.blob.core.windows.net", settings.storage_account)
    }

    /// Builds an authenticated request, applying whichever auth scheme
    /// the settings declare. Shared-key signs the request per the Azure
    /// Storage REST "Shared Key" authorization scheme; SAS appends the
    /// token as a query string; managed identity / service principal
    /// resolve a bearer token from the secret store (the token
    /// acquisition flow itself is the caller's responsibility — the
    /// secret store returns an already-valid token string).
    async fn authenticated_request(
        &self,
        settings: &AzureBlobSettings,
        method: reqwest::Method,
        path_and_query: &str,
    ) -> Result<reqwest::RequestBuilder, AdapterError> {
        let host = Self::host(settings);
        match settings.auth_type {
            AzureBlobAuthType::SasToken => {
                let sas = self.resolve_secret(settings).await?;
                let separator = if path_and_query.contains('?') { "&" } else { "?" };
                let url = format!("https://{host}{path_and_query}{separator}{sas}");
                Ok(self.client.request(method, url).header("x-ms-version", API_VERSION))
            }
            AzureBlobAuthType::ManagedIdentity | AzureBlobAuthType::ServicePrincipal => {
                let token = self.resolve_secret(settings).await?;
                let url = format!("https://{host}{path_and_query}");
                Ok(self
                    .client
                    .request(method, url)
                    .bearer_auth(token)
                    .header("x-ms-version", API_VERSION))
            }
            AzureBlobAuthType::ConnectionString => {
                let connection_string = self.resolve_secret(settings).await?;
                let (account_name, account_key) = parse_connection_string(&connection_string)
                    .ok_or_else(|| {
                        AdapterError::new(ErrorCategory::ConfigurationError, "malformed connection string")
                    })?;
                let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
                let signature = sign_shared_key(&account_name, &account_key, &method, &host, path_and_query, &date)
                    .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err))?;
                let url = format!("https://{host}{path_and_query}");
                Ok(self
                    .client
                    .request(method, url)
                    .header("x-ms-date", date)
                    .header("x-ms-version", API_VERSION)
                    .header("Authorization", format!("SharedKey {account_name}:{signature}")))
            }
        }
    }

    async fn resolve_secret(&self, settings: &AzureBlobSettings) -> Result<String, AdapterError> {
        let identifier = settings.secret_id.as_deref().ok_or_else(|| {
            AdapterError::new(ErrorCategory::ConfigurationError, "auth type requires a secret id")
        })?;
        self.secret_store
            .resolve(identifier)
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::AuthenticationFailure, err.to_string()))
    }
}

fn parse_connection_string(value: &str) -> Option<(String, String)> {
    let mut account_name = None;
    let mut account_key = None;
    for pair in value.split(';') {
        let mut parts = pair.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some("AccountName"), Some(v)) => account_name = Some(v.to_string()),
            (Some("AccountKey"), Some(v)) => account_key = Some(v.to_string()),
            _ => {}
        }
    }
    Some((account_name?, account_key?))
}

fn sign_shared_key(
    account_name: &str,
    account_key_b64: &str,
    method: &reqwest::Method,
    host: &str,
    path_and_query: &str,
    date: &str,
) -> Result<String, String> {
    let key = base64::engine::general_purpose::STANDARD
        .decode(account_key_b64)
        .map_err(|e| e.to_string())?;

    let canonicalized_resource = format!("/{account_name}{}", path_and_query.split('?').next().unwrap_or(""));
    let string_to_sign = format!(
        "{method}\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{date}\nx-ms-version:{API_VERSION}\n{canonicalized_resource}",
        method = method.as_str(),
    );
    let _ = host;

    let mut mac = Hmac::<Sha256>::new_from_slice(&key).map_err(|e| e.to_string())?;
    mac.update(string_to_sign.as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn extract_all<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut results = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        let after_open = &rest[start + open.len()..];
        if let Some(end) = after_open.find(&close) {
            results.push(&after_open[..end]);
            rest = &after_open[end + close.len()..];
        } else {
            break;
        }
    }
    results
}

fn parse_blob_listing(xml: &str) -> Vec<(String, u64, Option<DateTime<Utc>>)> {
    extract_all(xml, "Blob")
        .into_iter()
        .filter_map(|block| {
            let name = extract_all(block, "Name").first().map(|s| s.to_string())?;
            let size = extract_all(block, "Content-Length")
                .first()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);
            let last_modified = extract_all(block, "Last-Modified")
                .first()
                .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            Some((name, size, last_modified))
        })
        .collect()
}

#[async_trait]
impl ProtocolAdapter for AzureBlobAdapter {
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
            () = cancel.cancelled() => Err(AdapterError::new(ErrorCategory::Cancelled, "azure blob list cancelled")),
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
            () = cancel.cancelled() => Err(AdapterError::new(ErrorCategory::Cancelled, "azure blob download cancelled")),
            result = op => result,
        }
    }
}

impl AzureBlobAdapter {
    async fn list_inner(
        &self,
        settings: &ProtocolSettings,
        expanded_path: &str,
        expanded_filename: &str,
        extension: Option<&str>,
    ) -> Result<Vec<ListedFile>, AdapterError> {
        let blob_settings = Self::settings(settings)?;
        let prefix = match (&blob_settings.blob_prefix, expanded_path) {
            (Some(configured), "/") | (Some(configured), "") => configured.clone(),
            (Some(configured), other) => format!("{}/{}", configured.trim_end_matches('/'), other.trim_start_matches('/')),
            (None, other) => other.trim_start_matches('/').to_string(),
        };

        let path_and_query = format!(
            "/{}?restype=container&comp=list&prefix={}",
            blob_settings.container,
            urlencoding_encode(&prefix)
        );

        let builder = self
            .authenticated_request(blob_settings, reqwest::Method::GET, &path_and_query)
            .await?;
        let response = builder.send().await.map_err(|err| {
            let category = if err.is_timeout() || err.is_connect() {
                ErrorCategory::ConnectionTimeout
            } else {
                ErrorCategory::ProtocolError
            };
            AdapterError::new(category, err.to_string())
        })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED || response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(AdapterError::new(
                ErrorCategory::AuthenticationFailure,
                format!("list blobs returned {}", response.status()),
            ));
        }
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AdapterError::new(
                ErrorCategory::ProtocolError,
                "container not found",
            ));
        }
        if !response.status().is_success() {
            return Err(AdapterError::new(
                ErrorCategory::ProtocolError,
                format!("list blobs returned {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;

        let entries = parse_blob_listing(&body);
        debug!(count = entries.len(), "azure blob listing fetched");

        let matched = entries
            .into_iter()
            .filter(|(name, _, _)| {
                let file_name = name.rsplit('/').next().unwrap_or(name.as_str());
                filename_matches(expanded_filename, file_name)
                    && extension.map_or(true, |ext| extension_matches(ext, file_name))
            })
            .map(|(name, size, last_modified)| {
                let file_name = name.rsplit('/').next().unwrap_or(&name).to_string();
                ListedFile {
                    file_url: format!(
                        "https://{}/{}/{}",
                        Self::host(blob_settings),
                        blob_settings.container,
                        name
                    ),
                    filename: file_name,
                    size_bytes: size,
                    last_modified,
                }
            })
            .collect();

        Ok(matched)
    }

    async fn download_inner(&self, settings: &ProtocolSettings, file_url: &str) -> Result<Vec<u8>, AdapterError> {
        let blob_settings = Self::settings(settings)?;
        let blob_path = file_url
            .splitn(4, '/')
            .nth(3)
            .map(|rest| format!("/{rest}"))
            .ok_or_else(|| AdapterError::new(ErrorCategory::ProtocolError, format!("malformed blob url: {file_url}")))?;

        let builder = self
            .authenticated_request(blob_settings, reqwest::Method::GET, &blob_path)
            .await?;
        let response = builder.send().await.map_err(|err| {
            let category = if err.is_timeout() || err.is_connect() {
                ErrorCategory::ConnectionTimeout
            } else {
                ErrorCategory::ProtocolError
            };
            AdapterError::new(category, err.to_string())
        })?;

        if !response.status().is_success() {
            return Err(AdapterError::new(
                ErrorCategory::ProtocolError,
                format!("blob download returned {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;

        if bytes.is_empty() {
            return Err(AdapterError::new(ErrorCategory::ProtocolError, "download yielded zero bytes"));
        }
        Ok(bytes.to_vec())
    }
}

fn urlencoding_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
