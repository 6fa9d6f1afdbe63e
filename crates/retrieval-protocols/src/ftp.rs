//! FTP/FTPS protocol adapter
//!
//! Uses `suppaftp`'s async, tokio-backed stream types. Plain FTP and
//! FTPS (explicit TLS) share the same list/download shape; the settings'
//! `use_tls` flag picks which stream type connects.

use std::time::Duration;

use async_trait::async_trait;
use retrieval_core::domain::{ErrorCategory, FtpSettings, ListedFile, ProtocolSettings};
use retrieval_core::ports::{AdapterError, ProtocolAdapter, SecretStore};
use std::sync::Arc;
use suppaftp::{AsyncFtpStream, AsyncNativeTlsConnector, AsyncNativeTlsFtpStream, FtpError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::matching::{extension_matches, filename_matches};

pub struct FtpAdapter {
    secret_store: Arc<dyn SecretStore>,
}

impl FtpAdapter {
    #[must_use]
    pub fn new(secret_store: Arc<dyn SecretStore>) -> Self {
        Self { secret_store }
    }

    fn settings<'a>(settings: &'a ProtocolSettings) -> Result<&'a FtpSettings, AdapterError> {
        match settings {
            ProtocolSettings::Ftp(settings) => Ok(settings),
            _ => Err(AdapterError::new(
                ErrorCategory::ConfigurationError,
                "FtpAdapter invoked with non-FTP settings",
            )),
        }
    }

    async fn resolve_password(&self, settings: &FtpSettings) -> Result<String, AdapterError> {
        self.secret_store
            .resolve(&settings.password_secret_id)
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::AuthenticationFailure, err.to_string()))
    }

    fn classify_ftp_error(err: &FtpError) -> ErrorCategory {
        match err {
            FtpError::ConnectionError(_) => ErrorCategory::ConnectionTimeout,
            FtpError::SecureError(_) => ErrorCategory::AuthenticationFailure,
            _ => ErrorCategory::ProtocolError,
        }
    }

    async fn list_plain(
        &self,
        settings: &FtpSettings,
        expanded_path: &str,
        expanded_filename: &str,
        extension: Option<&str>,
    ) -> Result<Vec<ListedFile>, AdapterError> {
        let addr = format!("{}:{}", settings.server, settings.port);
        let mut stream = tokio::time::timeout(
            Duration::from_secs(u64::from(settings.connection_timeout_secs)),
            AsyncFtpStream::connect(&addr),
        )
        .await
        .map_err(|_| AdapterError::new(ErrorCategory::ConnectionTimeout, "connect timed out"))?
        .map_err(|err| AdapterError::new(Self::classify_ftp_error(&err), err.to_string()))?;

        let password = self.resolve_password(settings).await?;
        stream
            .login(&settings.username, &password)
            .await
            .map_err(|_| AdapterError::new(ErrorCategory::AuthenticationFailure, "login rejected"))?;

        if settings.passive_mode {
            stream.set_mode(suppaftp::Mode::Passive);
        } else {
            stream.set_mode(suppaftp::Mode::Active);
        }

        stream
            .cwd(expanded_path)
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;

        let names = stream
            .nlst(None)
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;

        let mut matched = Vec::new();
        for name in names {
            if !filename_matches(expanded_filename, &name) {
                continue;
            }
            if let Some(ext) = extension {
                if !extension_matches(ext, &name) {
                    continue;
                }
            }
            let size = stream.size(&name).await.unwrap_or(0) as u64;
            matched.push(ListedFile {
                file_url: format!("ftp://{}{}/{}", settings.server, expanded_path, name),
                filename: name,
                size_bytes: size,
                last_modified: None,
            });
        }

        let _ = stream.quit().await;
        debug!(count = matched.len(), "ftp listing complete");
        Ok(matched)
    }

    async fn list_tls(
        &self,
        settings: &FtpSettings,
        expanded_path: &str,
        expanded_filename: &str,
        extension: Option<&str>,
    ) -> Result<Vec<ListedFile>, AdapterError> {
        let addr = format!("{}:{}", settings.server, settings.port);
        let connector: AsyncNativeTlsConnector = native_tls_connector()
            .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;

        let mut stream = tokio::time::timeout(
            Duration::from_secs(u64::from(settings.connection_timeout_secs)),
            AsyncNativeTlsFtpStream::connect(&addr),
        )
        .await
        .map_err(|_| AdapterError::new(ErrorCategory::ConnectionTimeout, "connect timed out"))?
        .map_err(|err| AdapterError::new(Self::classify_ftp_error(&err), err.to_string()))?;

        let mut secure_stream = stream
            .into_secure(connector, &settings.server)
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::AuthenticationFailure, err.to_string()))?;

        let password = self.resolve_password(settings).await?;
        secure_stream
            .login(&settings.username, &password)
            .await
            .map_err(|_| AdapterError::new(ErrorCategory::AuthenticationFailure, "login rejected"))?;

        if settings.passive_mode {
            secure_stream.set_mode(suppaftp::Mode::Passive);
        } else {
            secure_stream.set_mode(suppaftp::Mode::Active);
        }

        secure_stream
            .cwd(expanded_path)
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;

        let names = secure_stream
            .nlst(None)
            .await
            .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;

        let mut matched = Vec::new();
        for name in names {
            if !filename_matches(expanded_filename, &name) {
                continue;
            }
            if let Some(ext) = extension {
                if !extension_matches(ext, &name) {
                    continue;
                }
            }
            let size = secure_stream.size(&name).await.unwrap_or(0) as u64;
            matched.push(ListedFile {
                file_url: format!("ftps://{}{}/{}", settings.server, expanded_path, name),
                filename: name,
                size_bytes: size,
                last_modified: None,
            });
        }

        let _ = secure_stream.quit().await;
        Ok(matched)
    }
}

fn native_tls_connector() -> Result<AsyncNativeTlsConnector, native_tls::Error> {
    native_tls::TlsConnector::new().map(AsyncNativeTlsConnector::from)
}

fn parse_ftp_url(file_url: &str) -> Option<(&str, &str)> {
    let without_scheme = file_url.splitn(2, "://").nth(1)?;
    let slash = without_scheme.find('/')?;
    Some((&without_scheme[..slash], &without_scheme[slash..]))
}

#[async_trait]
impl ProtocolAdapter for FtpAdapter {
    async fn list(
        &self,
        settings: &ProtocolSettings,
        expanded_path: &str,
        expanded_filename: &str,
        extension: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ListedFile>, AdapterError> {
        let ftp_settings = Self::settings(settings)?;
        let op = async {
            if ftp_settings.use_tls {
                self.list_tls(ftp_settings, expanded_path, expanded_filename, extension)
                    .await
            } else {
                self.list_plain(ftp_settings, expanded_path, expanded_filename, extension)
                    .await
            }
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AdapterError::new(ErrorCategory::Cancelled, "ftp list cancelled")),
            result = op => result,
        }
    }

    async fn download(
        &self,
        settings: &ProtocolSettings,
        file_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, AdapterError> {
        let ftp_settings = Self::settings(settings)?;
        let (_, remote_path) = parse_ftp_url(file_url).ok_or_else(|| {
            AdapterError::new(ErrorCategory::ProtocolError, format!("malformed file url: {file_url}"))
        })?;

        let op = async {
            let bytes = if ftp_settings.use_tls {
                let addr = format!("{}:{}", ftp_settings.server, ftp_settings.port);
                let connector = native_tls_connector()
                    .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;
                let stream = AsyncNativeTlsFtpStream::connect(&addr)
                    .await
                    .map_err(|err| AdapterError::new(Self::classify_ftp_error(&err), err.to_string()))?;
                let mut secure_stream = stream
                    .into_secure(connector, &ftp_settings.server)
                    .await
                    .map_err(|err| AdapterError::new(ErrorCategory::AuthenticationFailure, err.to_string()))?;
                let password = self.resolve_password(ftp_settings).await?;
                secure_stream
                    .login(&ftp_settings.username, &password)
                    .await
                    .map_err(|_| AdapterError::new(ErrorCategory::AuthenticationFailure, "login rejected"))?;
                let buffer = secure_stream
                    .retr_as_buffer(remote_path.trim_start_matches('/'))
                    .await
                    .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;
                let _ = secure_stream.quit().await;
                buffer.into_inner()
            } else {
                let addr = format!("{}:{}", ftp_settings.server, ftp_settings.port);
                let mut stream = AsyncFtpStream::connect(&addr)
                    .await
                    .map_err(|err| AdapterError::new(Self::classify_ftp_error(&err), err.to_string()))?;
                let password = self.resolve_password(ftp_settings).await?;
                stream
                    .login(&ftp_settings.username, &password)
                    .await
                    .map_err(|_| AdapterError::new(ErrorCategory::AuthenticationFailure, "login rejected"))?;
                let buffer = stream
                    .retr_as_buffer(remote_path.trim_start_matches('/'))
                    .await
                    .map_err(|err| AdapterError::new(ErrorCategory::ProtocolError, err.to_string()))?;
                let _ = stream.quit().await;
                buffer.into_inner()
            };

            if bytes.is_empty() {
                return Err(AdapterError::new(ErrorCategory::ProtocolError, "download yielded zero bytes"));
            }
            Ok(bytes)
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AdapterError::new(ErrorCategory::Cancelled, "ftp download cancelled")),
            result = op => result,
        }
    }
}
