//! Document loading over HTTP or from disk

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Largest document accepted, in bytes
pub const MAX_DOCUMENT_BYTES: usize = 8 * 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while loading a document
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("Server returned {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Transport failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Local file could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// File that was requested
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Body exceeded [`MAX_DOCUMENT_BYTES`]
    #[error("Document is larger than {limit} bytes")]
    TooLarge {
        /// Size limit in bytes
        limit: usize,
    },

    /// Load was abandoned
    #[error("Load cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether the error screen offers a retry
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Cancelled)
    }
}

/// Where a document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Url(String),
    File(PathBuf),
}

impl DocumentSource {
    /// Interpret a command line or config value
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            DocumentSource::Url(value.to_string())
        } else {
            DocumentSource::File(PathBuf::from(value))
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Url(url) => write!(f, "{url}"),
            DocumentSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// HTTP client used for document loads
pub fn http_client() -> Result<Client, FetchError> {
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Load the raw document text
///
/// Resolves to [`FetchError::Cancelled`] as soon as `cancel` fires, whatever
/// stage the load is in.
pub async fn fetch_document(
    client: &Client,
    source: &DocumentSource,
    cancel: CancellationToken,
) -> Result<String, FetchError> {
    tracing::info!(%source, "Loading document");

    let load = async {
        match source {
            DocumentSource::Url(url) => fetch_url(client, url, &cancel).await,
            DocumentSource::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|source| FetchError::Io { path: path.clone(), source }),
        }
    };

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = load => result,
    };

    match &result {
        Ok(text) => tracing::info!(%source, bytes = text.len(), "Document loaded"),
        Err(e) => tracing::warn!(%source, error = %e, "Document load failed"),
    }

    result
}

async fn fetch_url(
    client: &Client,
    url: &str,
    cancel: &CancellationToken,
) -> Result<String, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { status: status.as_u16(), url: url.to_string() });
    }

    let mut stream = response.bytes_stream();
    let mut body: Vec<u8> = Vec::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(FetchError::Cancelled);
            }

            chunk = stream.next() => {
                match chunk {
                    Some(Ok(bytes)) => {
                        if body.len() + bytes.len() > MAX_DOCUMENT_BYTES {
                            return Err(FetchError::TooLarge { limit: MAX_DOCUMENT_BYTES });
                        }
                        body.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => return Err(FetchError::Network(e)),
                    None => break,
                }
            }
        }
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}
