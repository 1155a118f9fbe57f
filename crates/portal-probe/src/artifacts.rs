//! Screenshot artifacts written during a run.

use crate::driver::PortalDriver;
use crate::result::ProbeResult;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Writes screenshots into one directory, created on first use
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a screenshot named `name` would get right now
    #[must_use]
    pub fn screenshot_path(&self, name: &str) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        self.dir.join(format!("{}-{stamp}.png", sanitize(name)))
    }

    /// Write PNG bytes and return the file path
    pub async fn save_screenshot(&self, name: &str, png: &[u8]) -> ProbeResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.screenshot_path(name);
        tokio::fs::write(&path, png).await?;
        info!(path = %path.display(), bytes = png.len(), "saved screenshot");
        Ok(path)
    }

    /// Screenshot the current page.
    ///
    /// Failure to capture is logged and reported as `None`; a missing
    /// screenshot must never mask the failure that triggered it.
    pub async fn capture<D: PortalDriver + ?Sized>(&self, driver: &D, name: &str) -> Option<PathBuf> {
        let png = match driver.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                warn!(name, error = %e, "could not take screenshot");
                return None;
            }
        };
        match self.save_screenshot(name, &png).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(name, error = %e, "could not write screenshot");
                None
            }
        }
    }
}

/// File-name safe form of a step or journey name
fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "screenshot".to_string()
    } else {
        trimmed.to_string()
    }
}
