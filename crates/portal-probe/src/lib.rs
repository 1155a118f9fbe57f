//! Portal Probe: page-object end-to-end checks for the admin and customer
//! portals.
//!
//! Every wait is a bounded poll and every flaky action is an escalation with
//! an observable post-condition, so a hung UI surfaces as a timeout naming
//! what was awaited instead of a stuck run.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  journeys      admin_login, admin_add_user, customer_reports  │
//! ├───────────────────────────────────────────────────────────────┤
//! │  pages         UsersPage, SchedulerPage, ReportsPage, ...     │
//! │  components    Modal, Toast, Dropdown, DataTable, Form        │
//! ├───────────────────────────────────────────────────────────────┤
//! │  poll          bounded condition polling                       │
//! │  fallback      action-then-verify escalation                   │
//! │  resolve       best-of-N locator resolution                    │
//! ├───────────────────────────────────────────────────────────────┤
//! │  driver        PortalDriver: ChromiumDriver | MockDriver       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use portal_probe::prelude::*;
//!
//! # async fn demo() -> ProbeResult<()> {
//! let driver = MockDriver::new();
//! let session = Session::new(driver, SuiteConfig::from_env(), "admin-login");
//! Journey::AdminLogin.run(&session).await?;
//! println!("{}", serde_json::to_string_pretty(&session.report())?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod artifacts;
#[cfg(feature = "browser")]
pub mod chromium;
pub mod components;
pub mod config;
pub mod driver;
pub mod fallback;
pub mod journeys;
pub mod locator;
pub mod page_object;
pub mod pages;
pub mod poll;
pub mod resolve;
pub mod result;
pub mod session;

pub use artifacts::ArtifactStore;
#[cfg(feature = "browser")]
pub use chromium::ChromiumDriver;
pub use config::{Credentials, PortalConfig, SuiteConfig, TimingConfig};
pub use driver::{BrowserEvent, ClickMode, Download, DriverConfig, MockDriver, PortalDriver};
pub use fallback::{Escalation, EscalationReport, Strategy};
pub use journeys::{execute, Journey};
pub use locator::{Locator, Selector};
pub use page_object::{PageObject, UrlMatcher};
pub use poll::{Condition, PollOptions, PollOutcome, Poller};
pub use resolve::{FirstMatch, Resolution};
pub use result::{AttemptFailure, ProbeError, ProbeResult};
pub use session::{JourneyReport, Session, StepOutcome, StepRecord};

/// Everything a journey author needs
pub mod prelude {
    pub use super::components::*;
    pub use super::config::*;
    pub use super::driver::*;
    pub use super::fallback::*;
    pub use super::journeys::Journey;
    pub use super::locator::*;
    pub use super::page_object::*;
    pub use super::pages::*;
    pub use super::poll::*;
    pub use super::resolve::*;
    pub use super::result::*;
    pub use super::session::*;
    #[cfg(feature = "browser")]
    pub use super::chromium::ChromiumDriver;
}
