//! Document validation
//!
//! Validation sits behind a trait: the shipped implementation only checks
//! PDF structure, while a schema-aware service can be plugged in through the
//! same seam. A rejected document is never written to disk.

use crate::profile::DocumentProfile;
use async_trait::async_trait;

/// Validates a downloaded document body before it is written
#[async_trait]
pub trait FormValidator: Send + Sync {
    /// Returns Err with a human-readable reason when the body is rejected
    async fn validate(
        &self,
        bytes: &[u8],
        profile: &DocumentProfile,
    ) -> std::result::Result<(), String>;
}

/// Structural PDF checks: magic header, EOF trailer, minimum size
///
/// Catches the common failure modes of municipal sites: an HTML error page
/// served with status 200, and truncated transfers.
pub struct StructuralPdfValidator {
    min_size: usize,
}

impl StructuralPdfValidator {
    pub fn new() -> Self {
        StructuralPdfValidator { min_size: 1024 }
    }

    pub fn with_min_size(min_size: usize) -> Self {
        StructuralPdfValidator { min_size }
    }
}

impl Default for StructuralPdfValidator {
    fn default() -> Self {
        StructuralPdfValidator::new()
    }
}

#[async_trait]
impl FormValidator for StructuralPdfValidator {
    async fn validate(
        &self,
        bytes: &[u8],
        _profile: &DocumentProfile,
    ) -> std::result::Result<(), String> {
        if bytes.len() < self.min_size {
            return Err(format!(
                "file too small: {} bytes (minimum {})",
                bytes.len(),
                self.min_size
            ));
        }

        if !bytes.starts_with(b"%PDF-") {
            return Err("missing %PDF- header".to_string());
        }

        let tail_start = bytes.len().saturating_sub(2048);
        let tail = &bytes[tail_start..];
        if !tail.windows(5).any(|w| w == b"%%EOF") {
            return Err("missing %%EOF trailer".to_string());
        }

        Ok(())
    }
}
