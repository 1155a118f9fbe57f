//! User journeys across both portals.
//!
//! Each journey is a sequence of [`Session::step`] calls. Records created
//! along the way carry the session's unique suffix so reruns against the same
//! portal never collide; nothing is torn down afterwards.

use crate::components::{AddOutcome, DataTable};
use crate::config::{SuiteConfig, TimingConfig};
use crate::driver::PortalDriver;
use crate::page_object::PageObject;
use crate::pages::{
    AdminDashboardPage, AdminLoginPage, AdminSection, CustomerDashboardPage, CustomerLoginPage,
    CustomerSection, FirewallServersPage, HeaderSelection, NewFirewallServer, NewSchedule,
    NewUser, PlanFeature, ReportsPage, SchedulerPage, UsersPage,
};
use crate::result::{ProbeError, ProbeResult};
use crate::session::{expect_true, JourneyReport, Session};
use std::fmt;
use std::str::FromStr;
use tracing::{error, info, warn};

/// Report columns the reports journey asks for
const REPORT_HEADERS: [&str; 2] = ["Name", "Date"];

// =============================================================================
// JOURNEY CATALOG
// =============================================================================

/// Every journey the suite knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Journey {
    /// Admin signs in and lands on the dashboard
    AdminLogin,
    /// Admin creates a user and sees it listed
    AdminAddUser,
    /// Admin registers a firewall server
    AdminAddFirewallServer,
    /// Admin creates a scheduled job
    AdminAddScheduler,
    /// Customer signs in and lands on the dashboard
    CustomerLogin,
    /// Customer builds and exports a report
    CustomerReports,
}

impl Journey {
    /// All journeys in suite order
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::AdminLogin,
            Self::AdminAddUser,
            Self::AdminAddFirewallServer,
            Self::AdminAddScheduler,
            Self::CustomerLogin,
            Self::CustomerReports,
        ]
    }

    /// Name used on the command line and in reports
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AdminLogin => "admin-login",
            Self::AdminAddUser => "admin-add-user",
            Self::AdminAddFirewallServer => "admin-add-firewall-server",
            Self::AdminAddScheduler => "admin-add-scheduler",
            Self::CustomerLogin => "customer-login",
            Self::CustomerReports => "customer-reports",
        }
    }

    /// One-line summary
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::AdminLogin => "sign in to the admin portal",
            Self::AdminAddUser => "create a user and find it in the user table",
            Self::AdminAddFirewallServer => "register a firewall server",
            Self::AdminAddScheduler => "create a scheduled job with a frequency",
            Self::CustomerLogin => "sign in to the customer portal",
            Self::CustomerReports => "pick report headers and export",
        }
    }

    /// Run the journey's steps in `session`
    pub async fn run<D: PortalDriver>(self, session: &Session<D>) -> ProbeResult<()> {
        match self {
            Self::AdminLogin => admin_login(session).await,
            Self::AdminAddUser => admin_add_user(session).await,
            Self::AdminAddFirewallServer => admin_add_firewall_server(session).await,
            Self::AdminAddScheduler => admin_add_scheduler(session).await,
            Self::CustomerLogin => customer_login(session).await,
            Self::CustomerReports => customer_reports(session).await,
        }
    }
}

impl fmt::Display for Journey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Journey {
    type Err = ProbeError;

    /// Accepts `admin-add-user` as well as `admin_add_user`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::all()
            .into_iter()
            .find(|j| j.name() == wanted)
            .ok_or_else(|| ProbeError::config(format!("unknown journey '{s}'")))
    }
}

/// Run one journey in a fresh session and close it afterwards.
///
/// The outcome lives in the returned report; a closed-browser error while
/// shutting down is logged, not reported.
pub async fn execute<D: PortalDriver>(journey: Journey, driver: D, config: SuiteConfig) -> JourneyReport {
    let session = Session::new(driver, config, journey.name());
    info!(%journey, run_id = %session.run_id(), "journey started");
    match journey.run(&session).await {
        Ok(()) => info!(%journey, "journey passed"),
        Err(e) => error!(%journey, error = %e, "journey failed"),
    }
    if let Err(e) = session.close().await {
        warn!(%journey, error = %e, "failed to close session");
    }
    session.report()
}

// =============================================================================
// ADMIN PORTAL
// =============================================================================

/// Open the admin login page, sign in, and wait for the dashboard
pub async fn admin_login<D: PortalDriver>(session: &Session<D>) -> ProbeResult<()> {
    let driver = session.driver();
    let config = session.config();
    let timings = &config.timings;
    let login = AdminLoginPage::new();
    let dashboard = AdminDashboardPage::new();

    session
        .step(
            "open admin login",
            login.open(driver, &config.admin.base_url, &timings.navigation),
        )
        .await?;
    session
        .step(
            "sign in",
            login.login(driver, &config.admin.credentials, timings),
        )
        .await?;
    session
        .step("dashboard loaded", async {
            dashboard.wait_loaded(driver, &timings.navigation).await?;
            expect_true("admin dashboard is the current page", dashboard.is_current(driver).await)
        })
        .await
}

/// Create a user and find it in the user table
pub async fn admin_add_user<D: PortalDriver>(session: &Session<D>) -> ProbeResult<()> {
    admin_login(session).await?;
    let driver = session.driver();
    let timings = &session.config().timings;
    let users = UsersPage::new();
    let suffix = session.unique_suffix();
    let user = NewUser {
        name: format!("Probe User {suffix}"),
        email: format!("probe.user.{suffix}@example.com"),
        role: "Viewer".to_string(),
        password: format!("Probe-{suffix}!"),
    };

    open_admin_section(session, AdminSection::Users, &users, timings).await?;
    let outcome = session
        .step("add user", users.add_user(driver, &user, timings))
        .await?;
    note_toast(session, &outcome);
    expect_row(session, users.table(), &user.email, timings).await
}

/// Register a firewall server and find it in the server table
pub async fn admin_add_firewall_server<D: PortalDriver>(session: &Session<D>) -> ProbeResult<()> {
    admin_login(session).await?;
    let driver = session.driver();
    let timings = &session.config().timings;
    let servers = FirewallServersPage::new();
    let suffix = session.unique_suffix();
    let id = session.run_id();
    let octets = id.as_bytes();
    let server = NewFirewallServer {
        name: format!("probe-fw-{suffix}"),
        ip_address: format!("10.{}.{}.{}", octets[0], octets[1], octets[2].max(1)),
        port: 443,
        description: format!("Created by portal-probe run {id}"),
    };

    open_admin_section(session, AdminSection::FirewallServers, &servers, timings).await?;
    let outcome = session
        .step("add firewall server", servers.add_server(driver, &server, timings))
        .await?;
    note_toast(session, &outcome);
    expect_row(session, servers.table(), &server.name, timings).await
}

/// Create a scheduled job and find it in the scheduler table
pub async fn admin_add_scheduler<D: PortalDriver>(session: &Session<D>) -> ProbeResult<()> {
    admin_login(session).await?;
    let driver = session.driver();
    let timings = &session.config().timings;
    let scheduler = SchedulerPage::new();
    let schedule = NewSchedule {
        name: format!("probe-job-{}", session.unique_suffix()),
        frequency: "Daily".to_string(),
        time: "02:30".to_string(),
    };

    open_admin_section(session, AdminSection::Scheduler, &scheduler, timings).await?;
    let outcome = session
        .step("add scheduler", scheduler.add_schedule(driver, &schedule, timings))
        .await?;
    note_toast(session, &outcome);
    expect_row(session, scheduler.table(), &schedule.name, timings).await
}

async fn open_admin_section<D: PortalDriver, P: PageObject>(
    session: &Session<D>,
    section: AdminSection,
    page: &P,
    timings: &TimingConfig,
) -> ProbeResult<()> {
    let driver = session.driver();
    session
        .step(&format!("open {}", page.name()), async {
            AdminDashboardPage::new().go_to(driver, section, timings).await?;
            page.wait_loaded(driver, &timings.table).await
        })
        .await
}

/// Record a missed toast as skipped; the table check confirms the save.
fn note_toast<D: PortalDriver>(session: &Session<D>, outcome: &AddOutcome) {
    if outcome.toast.is_none() {
        session.skip("read confirmation toast", "toast dismissed before it could be read");
    }
}

async fn expect_row<D: PortalDriver>(
    session: &Session<D>,
    table: &DataTable,
    text: &str,
    timings: &TimingConfig,
) -> ProbeResult<()> {
    let driver = session.driver();
    session
        .step("record listed", async {
            let probe = table.wait_for_row(driver, text, &timings.table).await;
            info!(text, row_count = probe.row_count, "table checked");
            expect_true(&format!("a table row containing '{text}'"), probe.visible)
        })
        .await
}

// =============================================================================
// CUSTOMER PORTAL
// =============================================================================

/// Open the customer login page, sign in, and wait for the dashboard
pub async fn customer_login<D: PortalDriver>(session: &Session<D>) -> ProbeResult<()> {
    let driver = session.driver();
    let config = session.config();
    let timings = &config.timings;
    let login = CustomerLoginPage::new();
    let dashboard = CustomerDashboardPage::new();

    session
        .step(
            "open customer login",
            login.open(driver, &config.customer.base_url, &timings.navigation),
        )
        .await?;
    session
        .step(
            "sign in",
            login.login(driver, &config.customer.credentials, timings),
        )
        .await?;
    session
        .step("dashboard loaded", async {
            dashboard.wait_loaded(driver, &timings.navigation).await?;
            expect_true(
                "customer dashboard is the current page",
                dashboard.is_current(driver).await,
            )
        })
        .await
}

/// Check plan features, pick report headers, and export
pub async fn customer_reports<D: PortalDriver>(session: &Session<D>) -> ProbeResult<()> {
    customer_login(session).await?;
    let driver = session.driver();
    let timings = &session.config().timings;
    let dashboard = CustomerDashboardPage::new();
    let reports = ReportsPage::new();

    let features = dashboard.available_features(driver, &timings.dropdown).await;
    info!(?features, "plan features on dashboard");
    for feature in PlanFeature::all() {
        if !features.contains(&feature) {
            session.skip(
                &format!("plan feature {}", feature.label()),
                "not offered on this plan",
            );
        }
    }

    session
        .step("open reports", async {
            dashboard
                .go_to(driver, CustomerSection::Reports, timings)
                .await?;
            reports.wait_loaded(driver, &timings.table).await
        })
        .await?;

    let selection = session
        .step(
            "select headers",
            reports.select_headers(driver, &REPORT_HEADERS, timings),
        )
        .await?;
    match selection {
        HeaderSelection::Unavailable => {
            session.skip("verify headers", "header picker not offered on this plan");
        }
        HeaderSelection::Applied(headers) => {
            session
                .step("verify headers", async {
                    let shown = reports.table().header_texts(driver).await?;
                    for header in &headers {
                        expect_true(
                            &format!("report column '{header}' is shown"),
                            shown.iter().any(|h| h == header),
                        )?;
                    }
                    Ok::<(), ProbeError>(())
                })
                .await?;
        }
    }

    let signal = session
        .step("export report", reports.export(driver, timings))
        .await?;
    info!(?signal, "export confirmed");
    Ok(())
}
