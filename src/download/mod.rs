//! Document retrieval
//!
//! Downloads candidate documents into a per-municipality, per-profile
//! directory tree. Files already on disk are skipped, so a re-run only pulls
//! what is missing. Every downloaded body passes through a
//! [`FormValidator`] before it is written.

mod validator;

pub use validator::{FormValidator, StructuralPdfValidator};

use crate::url::filename_from_url;
use crate::profile::DocumentProfile;
use crate::{Result, ScoutError};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use url::Url;

/// What happened to one candidate document
#[derive(Debug)]
pub enum DownloadStatus {
    /// Fetched, validated, and written
    Downloaded { path: PathBuf, sha256: String },

    /// Already present on disk; not re-fetched
    SkippedExisting { path: PathBuf },
}

/// Downloads validated documents to disk
pub struct Downloader {
    client: Client,
    downloads_dir: PathBuf,
    politeness_delay: Duration,
    last_request: Option<Instant>,
}

impl Downloader {
    pub fn new(client: Client, downloads_dir: impl Into<PathBuf>, politeness_delay_ms: u64) -> Self {
        Downloader {
            client,
            downloads_dir: downloads_dir.into(),
            politeness_delay: Duration::from_millis(politeness_delay_ms),
            last_request: None,
        }
    }

    /// Downloads one document into `downloads_dir/<subdir>/`
    ///
    /// The filename comes from the URL's last path segment. An existing file
    /// that still passes the validator short-circuits without a request; a
    /// corrupt one is fetched again. The body must pass the validator before
    /// anything is written.
    pub async fn download(
        &mut self,
        url: &Url,
        subdir: &str,
        profile: &DocumentProfile,
        validator: &dyn FormValidator,
    ) -> Result<DownloadStatus> {
        let dir = self.downloads_dir.join(subdir);
        let filename = filename_from_url(url);
        let path = dir.join(&filename);

        if path.exists() {
            let existing = tokio::fs::read(&path).await?;
            match validator.validate(&existing, profile).await {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "document already on disk");
                    return Ok(DownloadStatus::SkippedExisting { path });
                }
                Err(reason) => {
                    tracing::warn!(
                        path = %path.display(),
                        reason,
                        "existing file failed validation, fetching again"
                    );
                }
            }
        }

        self.throttle().await;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ScoutError::from_request(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScoutError::from_request(url.as_str(), e))?;

        validator
            .validate(&bytes, profile)
            .await
            .map_err(|reason| ScoutError::InvalidDocument {
                path: path.display().to_string(),
                reason,
            })?;

        let sha256 = hex_digest(&bytes);

        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(
            url = %url,
            path = %path.display(),
            bytes = bytes.len(),
            "downloaded document"
        );

        Ok(DownloadStatus::Downloaded { path, sha256 })
    }

    async fn throttle(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.politeness_delay {
                tokio::time::sleep(self.politeness_delay - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Relative directory for one municipality/profile pair
pub fn download_subdir(municipality_key: &str, profile_key: &str) -> String {
    format!("{}/{}", municipality_key, profile_key)
}
