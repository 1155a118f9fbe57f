//! Page Object Model support.
//!
//! A page object bundles the locators and user-facing actions for one logical
//! screen. Every screen declares the route it lives at and a ready marker: an
//! element that only renders once the screen is usable. Opening a page means
//! navigating and then waiting for that marker.

use crate::driver::PortalDriver;
use crate::locator::Locator;
use crate::poll::{is_visible_within, require, Condition, PollOptions};
use crate::result::ProbeResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Trait for page objects representing a screen of a portal.
///
/// # Example
///
/// ```ignore
/// struct AuditLogPage {
///     table: DataTable,
/// }
///
/// impl PageObject for AuditLogPage {
///     fn name(&self) -> &str {
///         "audit log"
///     }
///
///     fn path(&self) -> &str {
///         "/audit-log"
///     }
///
///     fn ready_marker(&self) -> Locator {
///         self.table.root().clone()
///     }
/// }
/// ```
#[async_trait]
pub trait PageObject: Send + Sync {
    /// Page name for logging
    fn name(&self) -> &str;

    /// Route pattern (e.g. `/users`, `/reports/:id`)
    fn path(&self) -> &str;

    /// Element whose visibility means the page is ready
    fn ready_marker(&self) -> Locator;

    /// Absolute URL of this page under `base_url`
    fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }

    /// Route matcher for [`PageObject::path`]
    fn route(&self) -> UrlMatcher {
        UrlMatcher::new(self.path())
    }

    /// Navigate to the page and wait until it is ready.
    ///
    /// # Errors
    ///
    /// Navigation failures, or a timeout when the ready marker never shows.
    async fn open(
        &self,
        driver: &dyn PortalDriver,
        base_url: &str,
        options: &PollOptions,
    ) -> ProbeResult<()> {
        let url = self.url(base_url);
        debug!(page = self.name(), %url, "opening page");
        driver.navigate(&url).await?;
        self.wait_loaded(driver, options).await
    }

    /// Wait until the ready marker is visible.
    ///
    /// # Errors
    ///
    /// A timeout naming the ready marker.
    async fn wait_loaded(&self, driver: &dyn PortalDriver, options: &PollOptions) -> ProbeResult<()> {
        require(driver, &Condition::Visible(self.ready_marker()), options).await?;
        Ok(())
    }

    /// Whether the page becomes ready within `options`; never errors
    async fn is_loaded(&self, driver: &dyn PortalDriver, options: &PollOptions) -> bool {
        is_visible_within(driver, &self.ready_marker(), options).await
    }

    /// Whether the browser is currently on this page's route
    async fn is_current(&self, driver: &dyn PortalDriver) -> bool {
        match driver.current_url().await {
            Ok(url) => self.route().matches_url(&url),
            Err(_) => false,
        }
    }
}

/// URL pattern matcher for page objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
}

impl UrlMatcher {
    /// Create a new URL matcher from a pattern
    ///
    /// Patterns support:
    /// - Literal segments: `/login`
    /// - Wildcards: `/users/*`
    /// - Named parameters: `/users/:id`
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|s| {
                if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Check if a path matches the pattern
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = split_path(path).collect();
        parts.len() == self.segments.len()
            && self.segments.iter().zip(&parts).all(|(seg, part)| match seg {
                UrlSegment::Literal(lit) => lit == part,
                UrlSegment::Wildcard | UrlSegment::Parameter(_) => true,
            })
    }

    /// Check a full URL, ignoring scheme, host, query and fragment
    #[must_use]
    pub fn matches_url(&self, url: &str) -> bool {
        self.matches(path_of(url))
    }

    /// Extract parameters from a path
    #[must_use]
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        self.segments
            .iter()
            .zip(split_path(path))
            .filter_map(|(seg, value)| match seg {
                UrlSegment::Parameter(name) => Some((name.clone(), value.to_string())),
                _ => None,
            })
            .collect()
    }

    /// Get the original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Path component of an absolute or relative URL
fn path_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = if url.contains("://") {
        without_scheme
            .find('/')
            .map_or("/", |i| &without_scheme[i..])
    } else {
        without_scheme
    };
    path.split(['?', '#']).next().unwrap_or(path)
}
