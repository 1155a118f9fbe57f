//! Suite configuration.
//!
//! Portal URLs and credentials come from environment variables with literal
//! fallbacks, suitable for a development or staging target. UI timings that
//! were tuned by observation (toast lifetime, modal animation) live in
//! [`TimingConfig`] and can be overridden from a YAML file. A [`SuiteConfig`]
//! is built once at start-up and handed to each session; nothing here is
//! global.

use crate::driver::DriverConfig;
use crate::poll::PollOptions;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Admin portal base URL
pub const ENV_ADMIN_URL: &str = "ADMIN_PORTAL_URL";
/// Admin login email
pub const ENV_ADMIN_EMAIL: &str = "ADMIN_EMAIL";
/// Admin login password
pub const ENV_ADMIN_PASSWORD: &str = "ADMIN_PASSWORD";
/// Customer portal base URL
pub const ENV_CUSTOMER_URL: &str = "CUSTOMER_PORTAL_URL";
/// Customer login email
pub const ENV_CUSTOMER_EMAIL: &str = "CUSTOMER_EMAIL";
/// Customer login password
pub const ENV_CUSTOMER_PASSWORD: &str = "CUSTOMER_PASSWORD";
/// Screenshot directory
pub const ENV_ARTIFACTS_DIR: &str = "ARTIFACTS_DIR";
/// `false`/`0`/`no` shows the browser window
pub const ENV_HEADLESS: &str = "HEADLESS";

const DEFAULT_ADMIN_URL: &str = "http://localhost:3001";
const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_CUSTOMER_URL: &str = "http://localhost:3000";
const DEFAULT_CUSTOMER_EMAIL: &str = "customer@example.com";
const DEFAULT_CUSTOMER_PASSWORD: &str = "customer123";
const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

const MASK: &str = "********";

/// Login credentials; the password never appears in `Debug` or serialized output
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login email
    pub email: String,
    /// Login password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &MASK)
            .finish()
    }
}

impl Serialize for Credentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Credentials", 2)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("password", MASK)?;
        state.end()
    }
}

/// One portal under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortalConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Login credentials
    pub credentials: Credentials,
}

impl PortalConfig {
    /// Create a portal config, normalizing the base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            credentials,
        }
    }

    /// Absolute URL for an application path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

/// Waits tuned to the portals' UI behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Modal open/close animation
    pub modal: PollOptions,
    /// Toast appearance
    pub toast: PollOptions,
    /// Dropdown menu expansion
    pub dropdown: PollOptions,
    /// Table rows after a create
    pub table: PollOptions,
    /// Page transitions and login redirects
    pub navigation: PollOptions,
    /// Best-of-N candidate resolution
    pub resolve: PollOptions,
    /// Reads of an auto-dismissing toast
    pub toast_attempts: usize,
    /// Pause between toast reads in milliseconds
    pub toast_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            modal: PollOptions::new().with_timeout(5_000).with_interval(200),
            toast: PollOptions::new().with_timeout(3_000).with_interval(100).with_check_timeout(500),
            dropdown: PollOptions::new().with_timeout(2_000).with_interval(200).with_check_timeout(500),
            table: PollOptions::new().with_timeout(10_000).with_interval(500),
            navigation: PollOptions::patient(),
            resolve: PollOptions::new().with_timeout(3_000).with_interval(250).with_check_timeout(500),
            toast_attempts: 10,
            toast_interval_ms: 150,
        }
    }
}

impl TimingConfig {
    /// Pause between toast reads
    #[must_use]
    pub const fn toast_interval(&self) -> Duration {
        Duration::from_millis(self.toast_interval_ms)
    }

    /// Parse timings from YAML; omitted keys keep their defaults
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        let timings: Self = serde_yaml_ng::from_str(yaml)?;
        timings.validate()?;
        Ok(timings)
    }

    /// Load timings from a YAML file
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    fn validate(&self) -> ProbeResult<()> {
        if self.toast_attempts == 0 {
            return Err(ProbeError::config("toast_attempts must be at least 1"));
        }
        for (name, opts) in [
            ("modal", &self.modal),
            ("toast", &self.toast),
            ("dropdown", &self.dropdown),
            ("table", &self.table),
            ("navigation", &self.navigation),
            ("resolve", &self.resolve),
        ] {
            if opts.interval_ms == 0 {
                return Err(ProbeError::config(format!("{name}.interval_ms must be positive")));
            }
        }
        Ok(())
    }
}

/// Everything a session needs
#[derive(Debug, Clone, Serialize)]
pub struct SuiteConfig {
    /// Admin portal
    pub admin: PortalConfig,
    /// Customer portal
    pub customer: PortalConfig,
    /// Where screenshots are written
    pub artifacts_dir: PathBuf,
    /// UI timings
    pub timings: TimingConfig,
    /// Browser settings
    pub driver: DriverConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl SuiteConfig {
    /// Build from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; absent or blank values fall
    /// back to the literal defaults
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let headless = lookup(ENV_HEADLESS).map_or(true, |v| parse_flag(&v));
        let artifacts_dir = PathBuf::from(var(ENV_ARTIFACTS_DIR, DEFAULT_ARTIFACTS_DIR));

        Self {
            admin: PortalConfig::new(
                var(ENV_ADMIN_URL, DEFAULT_ADMIN_URL),
                Credentials::new(
                    var(ENV_ADMIN_EMAIL, DEFAULT_ADMIN_EMAIL),
                    var(ENV_ADMIN_PASSWORD, DEFAULT_ADMIN_PASSWORD),
                ),
            ),
            customer: PortalConfig::new(
                var(ENV_CUSTOMER_URL, DEFAULT_CUSTOMER_URL),
                Credentials::new(
                    var(ENV_CUSTOMER_EMAIL, DEFAULT_CUSTOMER_EMAIL),
                    var(ENV_CUSTOMER_PASSWORD, DEFAULT_CUSTOMER_PASSWORD),
                ),
            ),
            driver: DriverConfig::new()
                .headless(headless)
                .download_dir(artifacts_dir.join("downloads")),
            artifacts_dir,
            timings: TimingConfig::default(),
        }
    }

    /// Replace the timings
    #[must_use]
    pub fn with_timings(mut self, timings: TimingConfig) -> Self {
        self.timings = timings;
        self
    }

    /// Replace the browser settings
    #[must_use]
    pub fn with_driver(mut self, driver: DriverConfig) -> Self {
        self.driver = driver;
        self
    }

    /// Replace the artifacts directory; downloads follow it
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self.driver.download_dir = Some(self.artifacts_dir.join("downloads"));
        self
    }
}

/// Interpret a boolean-ish variable; unknown values keep the default `true`
fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    mod env_tests {
        use super::*;

        #[test]
        fn test_defaults_when_nothing_set() {
            let config = SuiteConfig::from_lookup(|_| None);
            assert_eq!(config.admin.base_url, "http://localhost:3001");
            assert_eq!(config.admin.credentials.email, "admin@example.com");
            assert_eq!(config.customer.base_url, "http://localhost:3000");
            assert_eq!(config.artifacts_dir, PathBuf::from("artifacts"));
            assert!(config.driver.headless);
            assert_eq!(
                config.driver.download_dir,
                Some(PathBuf::from("artifacts").join("downloads"))
            );
        }

        #[test]
        fn test_downloads_follow_artifacts_dir() {
            let config = SuiteConfig::from_lookup(|_| None).with_artifacts_dir("/tmp/run-7");
            assert_eq!(
                config.driver.download_dir,
                Some(PathBuf::from("/tmp/run-7/downloads"))
            );
        }

        #[test]
        fn test_overrides_are_applied() {
            let config = SuiteConfig::from_lookup(lookup_from(&[
                (ENV_ADMIN_URL, "https://admin.staging.test/"),
                (ENV_ADMIN_PASSWORD, "s3cret"),
                (ENV_CUSTOMER_EMAIL, "qa@customer.test"),
                (ENV_HEADLESS, "false"),
            ]));
            assert_eq!(config.admin.base_url, "https://admin.staging.test");
            assert_eq!(config.admin.credentials.password, "s3cret");
            assert_eq!(config.customer.credentials.email, "qa@customer.test");
            assert!(!config.driver.headless);
        }

        #[test]
        fn test_blank_value_falls_back() {
            let config = SuiteConfig::from_lookup(lookup_from(&[(ENV_CUSTOMER_URL, "  ")]));
            assert_eq!(config.customer.base_url, DEFAULT_CUSTOMER_URL);
        }

        #[test]
        fn test_parse_flag() {
            assert!(parse_flag("true"));
            assert!(parse_flag("1"));
            assert!(parse_flag("whatever"));
            assert!(!parse_flag("0"));
            assert!(!parse_flag(" Off "));
        }
    }

    mod masking_tests {
        use super::*;

        #[test]
        fn test_debug_masks_password() {
            let creds = Credentials::new("a@b.test", "hunter2");
            let text = format!("{creds:?}");
            assert!(text.contains("a@b.test"));
            assert!(!text.contains("hunter2"));
        }

        #[test]
        fn test_json_masks_password() {
            let config = SuiteConfig::from_lookup(lookup_from(&[(ENV_ADMIN_PASSWORD, "hunter2")]));
            let json = serde_json::to_string(&config).unwrap();
            assert!(!json.contains("hunter2"));
            assert!(json.contains(MASK));
        }
    }

    mod timing_tests {
        use super::*;

        #[test]
        fn test_toast_defaults() {
            let timings = TimingConfig::default();
            assert_eq!(timings.toast_attempts, 10);
            assert_eq!(timings.toast_interval(), Duration::from_millis(150));
        }

        #[test]
        fn test_partial_yaml_override() {
            let yaml = "toast_attempts: 20\nmodal:\n  timeout_ms: 8000\n";
            let timings = TimingConfig::from_yaml(yaml).unwrap();
            assert_eq!(timings.toast_attempts, 20);
            assert_eq!(timings.modal.timeout_ms, 8_000);
            assert_eq!(timings.modal.interval_ms, crate::poll::DEFAULT_INTERVAL_MS);
            assert_eq!(timings.table, TimingConfig::default().table);
        }

        #[test]
        fn test_zero_attempts_rejected() {
            let err = TimingConfig::from_yaml("toast_attempts: 0\n").unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("timings.yaml");
            std::fs::write(&path, "toast_interval_ms: 50\n").unwrap();
            let timings = TimingConfig::load(&path).unwrap();
            assert_eq!(timings.toast_interval_ms, 50);
        }

        #[test]
        fn test_portal_url_join() {
            let portal = PortalConfig::new("http://x.test/", Credentials::new("e", "p"));
            assert_eq!(portal.url("/users"), "http://x.test/users");
            assert_eq!(portal.url("login"), "http://x.test/login");
        }
    }
}
