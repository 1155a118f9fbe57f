//! Customer portal screens.
//!
//! Which buttons a customer sees depends on their plan, so several actions
//! here report absence as a value instead of failing.

use super::{nav_link, LoginForm};
use crate::components::{DataTable, Dropdown, Toast};
use crate::config::{Credentials, TimingConfig};
use crate::driver::{BrowserEvent, ClickMode, Download, PortalDriver};
use crate::fallback::Escalation;
use crate::locator::{Locator, Selector};
use crate::page_object::PageObject;
use crate::poll::{bounded, Condition, PollOptions, Poller};
use crate::resolve::{FirstMatch, Resolution};
use crate::result::{ProbeError, ProbeResult};
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Customer sign-in screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerLoginPage {
    form: LoginForm,
}

impl CustomerLoginPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign in and wait until the portal leaves the login form
    pub async fn login<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        credentials: &Credentials,
        timings: &TimingConfig,
    ) -> ProbeResult<()> {
        self.form.sign_in(driver, credentials, timings).await
    }

    /// Login error banner text, if shown
    pub async fn error_message<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        options: &PollOptions,
    ) -> Option<String> {
        self.form.error_message(driver, options).await
    }
}

impl PageObject for CustomerLoginPage {
    fn name(&self) -> &str {
        "customer login"
    }

    fn path(&self) -> &str {
        "/login"
    }

    fn ready_marker(&self) -> Locator {
        self.form.marker()
    }
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// Top-bar destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomerSection {
    /// Landing page
    Dashboard,
    /// Report builder
    Reports,
}

impl CustomerSection {
    /// Route
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::Reports => "/reports",
        }
    }

    /// Link label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Reports => "Reports",
        }
    }
}

impl fmt::Display for CustomerSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Dashboard buttons that only some plans show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanFeature {
    /// Recurring report delivery
    ScheduledReports,
    /// API key management
    ApiAccess,
    /// Multi-report export
    BulkExport,
}

impl PlanFeature {
    /// Every gated feature
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::ScheduledReports, Self::ApiAccess, Self::BulkExport]
    }

    /// Button label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ScheduledReports => "Scheduled Reports",
            Self::ApiAccess => "API Access",
            Self::BulkExport => "Bulk Export",
        }
    }

    /// `data-testid` suffix
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::ScheduledReports => "scheduled-reports",
            Self::ApiAccess => "api-access",
            Self::BulkExport => "bulk-export",
        }
    }

    fn candidates(self) -> FirstMatch {
        FirstMatch::new([
            Locator::from_selector(Selector::test_id(format!("feature-{}", self.slug()))),
            Locator::from_selector(Selector::role("button", self.label())),
        ])
    }
}

impl fmt::Display for PlanFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Landing page after sign-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDashboardPage {
    navbar: Locator,
}

impl Default for CustomerDashboardPage {
    fn default() -> Self {
        Self {
            navbar: Locator::new("nav.navbar").named("navbar"),
        }
    }
}

impl CustomerDashboardPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow a top-bar link, escalating until the URL changes
    pub async fn go_to<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        section: CustomerSection,
        timings: &TimingConfig,
    ) -> ProbeResult<()> {
        let link = nav_link("nav.navbar", section.path(), section.label())
            .with_options(timings.resolve)
            .require(driver)
            .await?;
        Escalation::click_until(&link, Condition::UrlContains(section.path().to_string()))
            .verify_with(timings.navigation)
            .run(driver)
            .await?;
        info!(%section, "navigated");
        Ok(())
    }

    /// Whether the plan shows the feature's button within `options`
    pub async fn has_feature<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        feature: PlanFeature,
        options: &PollOptions,
    ) -> bool {
        let found = feature
            .candidates()
            .with_options(*options)
            .resolve(driver)
            .await
            .found()
            .is_some();
        debug!(%feature, found, "plan feature check");
        found
    }

    /// Gated features visible on this account, checked concurrently
    pub async fn available_features<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        options: &PollOptions,
    ) -> Vec<PlanFeature> {
        let checks = PlanFeature::all().map(|feature| async move {
            self.has_feature(driver, feature, options)
                .await
                .then_some(feature)
        });
        join_all(checks).await.into_iter().flatten().collect()
    }
}

impl PageObject for CustomerDashboardPage {
    fn name(&self) -> &str {
        "customer dashboard"
    }

    fn path(&self) -> &str {
        CustomerSection::Dashboard.path()
    }

    fn ready_marker(&self) -> Locator {
        self.navbar.clone()
    }
}

// =============================================================================
// REPORTS
// =============================================================================

/// Result of choosing report columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "headers")]
pub enum HeaderSelection {
    /// The plan has no "Select Headers" button
    Unavailable,
    /// These headers were ticked
    Applied(Vec<String>),
}

/// How an export made itself known
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "via", content = "detail")]
pub enum ExportSignal {
    /// The browser started a file download
    Download(Download),
    /// The export opened in a new tab
    Popup(String),
    /// A toast mentioning the export or download
    Toast(String),
    /// The browser moved to a download URL
    Url(String),
}

/// Report builder with column picker and export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportsPage {
    table: DataTable,
    header_button: Vec<Locator>,
    header_menu: Locator,
    header_item_css: String,
    export_button: Vec<Locator>,
    toast: Toast,
}

impl Default for ReportsPage {
    fn default() -> Self {
        Self {
            table: DataTable::new("table.report-table"),
            header_button: vec![
                Locator::new("#select-headers-btn"),
                Locator::from_selector(Selector::test_id("select-headers")),
                Locator::new("button").with_text("Select Headers"),
            ],
            header_menu: Locator::new(".headers-dropdown .dropdown-menu.show").named("header menu"),
            header_item_css: ".headers-dropdown .dropdown-menu .dropdown-item".to_string(),
            export_button: vec![
                Locator::new("#export-btn"),
                Locator::from_selector(Selector::test_id("export-report")),
                Locator::new("button").with_text("Export"),
            ],
            toast: Toast::default(),
        }
    }
}

impl ReportsPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The report table
    #[must_use]
    pub const fn table(&self) -> &DataTable {
        &self.table
    }

    /// Tick the given column headers.
    ///
    /// The picker is plan-gated: when its button does not show up within
    /// `timings.dropdown` this returns [`HeaderSelection::Unavailable`].
    ///
    /// # Errors
    ///
    /// [`ProbeError::SessionClosed`] when the page goes away while looking
    /// for the picker, or a dropdown failure.
    pub async fn select_headers<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        headers: &[&str],
        timings: &TimingConfig,
    ) -> ProbeResult<HeaderSelection> {
        let resolution = FirstMatch::new(self.header_button.iter().cloned())
            .with_options(timings.dropdown)
            .resolve(driver)
            .await;
        let button = match resolution {
            Resolution::Found { locator, .. } => locator,
            Resolution::NotFound { .. } => {
                info!("header picker not offered");
                return Ok(HeaderSelection::Unavailable);
            }
            Resolution::SessionClosed { message } => {
                return Err(ProbeError::SessionClosed { message });
            }
        };
        Dropdown::new(button, self.header_menu.clone(), self.header_item_css.clone())
            .select_many(driver, headers, &timings.dropdown)
            .await?;
        Ok(HeaderSelection::Applied(
            headers.iter().map(ToString::to_string).collect(),
        ))
    }

    /// Click export and wait for evidence of a download.
    ///
    /// Evidence is checked in order: a browser download, a popup, a toast
    /// mentioning the export, then a move to a download URL.
    ///
    /// # Errors
    ///
    /// [`ProbeError::NotFound`] without an export button, or a timeout when
    /// none of those shows up within `timings.toast`.
    pub async fn export<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        timings: &TimingConfig,
    ) -> ProbeResult<ExportSignal> {
        let button = FirstMatch::new(self.export_button.iter().cloned())
            .with_options(timings.resolve)
            .require(driver)
            .await?;
        let before =
            bounded(timings.toast.check_timeout(), "current URL", driver.current_url()).await?;
        // Events raised before the click are not ours
        let stale = driver.take_events().await?;
        if !stale.is_empty() {
            debug!(count = stale.len(), "discarded earlier browser events");
        }
        driver.click(button.selector(), ClickMode::Normal).await?;

        let toast = self.toast.container();
        let before = before.as_str();
        let (signal, outcome) = Poller::new(timings.toast)
            .find(|| async move {
                for event in driver.take_events().await? {
                    match event {
                        BrowserEvent::Download(download) => {
                            return Ok::<_, ProbeError>(Some(ExportSignal::Download(download)));
                        }
                        BrowserEvent::Popup { url } => {
                            return Ok(Some(ExportSignal::Popup(url)));
                        }
                    }
                }
                if let Some(text) = driver.text_content(toast.selector()).await? {
                    if mentions_export(&text) {
                        return Ok(Some(ExportSignal::Toast(text)));
                    }
                }
                let url = driver.current_url().await?;
                Ok((url != before && mentions_export(&url)).then_some(ExportSignal::Url(url)))
            })
            .await;
        let signal = signal.ok_or_else(|| outcome.failure("export download, toast or download URL"))?;
        info!(?signal, "export started");
        Ok(signal)
    }
}

fn mentions_export(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("export") || lower.contains("download")
}

impl PageObject for ReportsPage {
    fn name(&self) -> &str {
        "reports"
    }

    fn path(&self) -> &str {
        CustomerSection::Reports.path()
    }

    fn ready_marker(&self) -> Locator {
        self.table.root().clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockEffect, MockElement, MockTrigger};
    use std::time::Duration;

    fn reports_screen() -> MockDriver {
        MockDriver::new()
            .at_url("http://customer.test/reports")
            .with_element(Selector::css("table.report-table"), MockElement::visible())
            .with_element(Selector::css("#export-btn"), MockElement::visible())
    }

    mod feature_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_available_features_skips_missing_buttons() {
            let driver = MockDriver::new()
                .with_element(Selector::test_id("feature-api-access"), MockElement::visible())
                .with_element(Selector::role("button", "Bulk Export"), MockElement::visible());
            let features = CustomerDashboardPage::new()
                .available_features(&driver, &PollOptions::quick())
                .await;
            assert_eq!(features, vec![PlanFeature::ApiAccess, PlanFeature::BulkExport]);
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_feature_is_bounded() {
            let driver = MockDriver::new();
            let started = tokio::time::Instant::now();
            let present = CustomerDashboardPage::new()
                .has_feature(&driver, PlanFeature::ScheduledReports, &PollOptions::quick())
                .await;
            assert!(!present);
            assert!(started.elapsed() <= Duration::from_millis(1_200));
        }
    }

    mod header_tests {
        use super::*;

        fn item(text: &str) -> Selector {
            Selector::CssWithText {
                css: ".headers-dropdown .dropdown-menu .dropdown-item".into(),
                text: text.into(),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_no_picker_means_unavailable() {
            let driver = reports_screen();
            let selection = ReportsPage::new()
                .select_headers(&driver, &["Name"], &TimingConfig::default())
                .await
                .unwrap();
            assert_eq!(selection, HeaderSelection::Unavailable);
            assert!(!driver.was_called("click:"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_headers_are_ticked_and_menu_closed() {
            let button = Selector::CssWithText {
                css: "button".into(),
                text: "Select Headers".into(),
            };
            let menu = Selector::css(".headers-dropdown .dropdown-menu.show");
            let driver = reports_screen()
                .with_element(button.clone(), MockElement::visible())
                .with_element(item("Name"), MockElement::visible())
                .with_element(item("Revenue"), MockElement::visible())
                .on(MockTrigger::AnyClick(button), MockEffect::Show(menu.clone()))
                .on(MockTrigger::Key("Escape".into()), MockEffect::Hide(menu.clone()));

            let selection = ReportsPage::new()
                .select_headers(&driver, &["Name", "Revenue"], &TimingConfig::default())
                .await
                .unwrap();
            assert_eq!(
                selection,
                HeaderSelection::Applied(vec!["Name".into(), "Revenue".into()])
            );
            assert_eq!(driver.call_count("click:normal:css `.headers-dropdown"), 2);
            assert!(!driver.element_visible(&menu));
        }
    }

    mod export_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_export_detected_by_toast() {
            let toast = Selector::css(".toast.show, .Toastify__toast, [role='alert']");
            let driver = reports_screen()
                .on(
                    MockTrigger::AnyClick(Selector::css("#export-btn")),
                    MockEffect::ShowAfter(toast.clone(), Duration::from_millis(400)),
                )
                .on(
                    MockTrigger::AnyClick(Selector::css("#export-btn")),
                    MockEffect::SetText(toast, "Report download started".into()),
                );
            let signal = ReportsPage::new()
                .export(&driver, &TimingConfig::default())
                .await
                .unwrap();
            assert_eq!(signal, ExportSignal::Toast("Report download started".into()));
        }

        #[tokio::test(start_paused = true)]
        async fn test_export_detected_by_url() {
            let driver = reports_screen().on(
                MockTrigger::AnyClick(Selector::css("#export-btn")),
                MockEffect::Navigate("http://customer.test/reports/export?format=csv".into()),
            );
            let signal = ReportsPage::new()
                .export(&driver, &TimingConfig::default())
                .await
                .unwrap();
            assert_eq!(
                signal,
                ExportSignal::Url("http://customer.test/reports/export?format=csv".into())
            );
        }

        #[tokio::test(start_paused = true)]
        async fn test_silent_export_times_out() {
            let driver = reports_screen();
            let err = ReportsPage::new()
                .export(&driver, &TimingConfig::default())
                .await
                .unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("download URL"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_download_event_wins_over_toast() {
            let toast = Selector::css(".toast.show, .Toastify__toast, [role='alert']");
            let download = Download::new("http://customer.test/files/report.csv", "report.csv");
            let driver = reports_screen()
                .with_element(toast.clone(), MockElement::visible())
                .on(
                    MockTrigger::AnyClick(Selector::css("#export-btn")),
                    MockEffect::SetText(toast, "Export queued".into()),
                )
                .on(
                    MockTrigger::AnyClick(Selector::css("#export-btn")),
                    MockEffect::Emit(BrowserEvent::Download(download.clone())),
                );
            let signal = ReportsPage::new()
                .export(&driver, &TimingConfig::default())
                .await
                .unwrap();
            assert_eq!(signal, ExportSignal::Download(download));
        }

        #[tokio::test(start_paused = true)]
        async fn test_export_detected_by_popup() {
            let driver = reports_screen().on(
                MockTrigger::AnyClick(Selector::css("#export-btn")),
                MockEffect::Emit(BrowserEvent::Popup {
                    url: "http://customer.test/reports/print".into(),
                }),
            );
            let signal = ReportsPage::new()
                .export(&driver, &TimingConfig::default())
                .await
                .unwrap();
            assert_eq!(signal, ExportSignal::Popup("http://customer.test/reports/print".into()));
        }

        #[tokio::test(start_paused = true)]
        async fn test_download_before_click_is_ignored() {
            let earlier = Selector::css("#download-invoice");
            let driver = reports_screen()
                .with_element(earlier.clone(), MockElement::visible())
                .on(
                    MockTrigger::AnyClick(earlier.clone()),
                    MockEffect::Emit(BrowserEvent::Download(Download::new(
                        "http://customer.test/files/invoice.pdf",
                        "invoice.pdf",
                    ))),
                );
            driver.click(&earlier, ClickMode::Normal).await.unwrap();

            let err = ReportsPage::new()
                .export(&driver, &TimingConfig::default())
                .await
                .unwrap_err();
            assert!(err.is_timeout(), "{err}");
        }

        #[tokio::test(start_paused = true)]
        async fn test_hung_url_read_before_click_times_out() {
            let driver = reports_screen();
            driver.stall("current_url");
            let timings = TimingConfig::default();
            let err = tokio::time::timeout(
                Duration::from_secs(600),
                ReportsPage::new().export(&driver, &timings),
            )
            .await
            .expect("export must not hang")
            .unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains("current URL"), "{err}");
            assert!(!driver.was_called("click:"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_closed_session_is_not_unavailable_picker() {
            let driver = reports_screen();
            driver.close().await.unwrap();
            let err = ReportsPage::new()
                .select_headers(&driver, &["Name"], &TimingConfig::default())
                .await
                .unwrap_err();
            assert!(err.is_session_closed(), "{err}");
        }
    }
}
