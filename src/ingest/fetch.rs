//! Dataset acquisition: download to a temporary file, with a local-file
//! fallback for when the portal is unreachable.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::{HttpConfig, SourceConfig};
use crate::logging::log_source_failure;
use crate::model::AirError;

/// A downloaded dataset. The temporary file is deleted on drop.
#[derive(Debug)]
pub struct Download {
    pub url: String,
    pub bytes: u64,
    file: NamedTempFile,
}

impl Download {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Where a source's bytes ended up coming from.
#[derive(Debug)]
pub enum Acquired {
    Downloaded(Download),
    /// Source configured with a `local_path` only.
    Local(PathBuf),
    /// The download failed and `local_path` was read instead.
    Fallback(PathBuf),
}

impl Acquired {
    pub fn path(&self) -> &Path {
        match self {
            Acquired::Downloaded(d) => d.path(),
            Acquired::Local(p) | Acquired::Fallback(p) => p,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Acquired::Fallback(_))
    }
}

impl fmt::Display for Acquired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Acquired::Downloaded(d) => write!(f, "{}", d.url),
            Acquired::Local(p) | Acquired::Fallback(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Blocking HTTP client configured from `[http]`.
pub fn build_client(http: &HttpConfig) -> Result<Client, AirError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .user_agent(http.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Temp-file suffix taken from the URL's extension, `.tmp` otherwise.
pub fn url_suffix(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext)
        }
        _ => ".tmp".to_string(),
    }
}

/// Streams `url` into a named temporary file.
pub fn download_to_temp(client: &Client, url: &str) -> Result<Download, AirError> {
    info!(url, "downloading");
    let mut response = client.get(url).send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(AirError::HttpError {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = tempfile::Builder::new()
        .prefix("airmon-")
        .suffix(&url_suffix(url))
        .tempfile()?;
    let bytes = response.copy_to(&mut file)?;
    file.flush()?;

    debug!(path = %file.path().display(), bytes, "saved temporary file");
    Ok(Download {
        url: url.to_string(),
        bytes,
        file,
    })
}

/// Obtains the bytes of one configured source.
///
/// The URL is tried first; on failure the `local_path` fallback is used if
/// it exists. A source with only a `local_path` is read directly.
pub fn acquire(client: &Client, source: &SourceConfig) -> Result<Acquired, AirError> {
    let local = source.local_path.as_ref().filter(|p| p.exists());

    let Some(url) = source.url.as_deref() else {
        return match local {
            Some(path) => Ok(Acquired::Local(path.clone())),
            None => Err(AirError::SourceUnavailable {
                name: source.name.clone(),
                reason: "local file not found".to_string(),
            }),
        };
    };

    match download_to_temp(client, url) {
        Ok(download) => Ok(Acquired::Downloaded(download)),
        Err(err) => match local {
            Some(path) => {
                log_source_failure(&source.name, "download", &err);
                warn!(dataset = %source.name, path = %path.display(), "using local fallback");
                Ok(Acquired::Fallback(path.clone()))
            }
            None => Err(err),
        },
    }
}
