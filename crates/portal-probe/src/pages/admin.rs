//! Admin portal screens.

use super::{nav_link, LoginForm};
use crate::components::{AddDialog, AddOutcome, DataTable, Dropdown, Form, FormField, FormPayload, Modal};
use crate::config::{Credentials, TimingConfig};
use crate::driver::PortalDriver;
use crate::fallback::Escalation;
use crate::locator::{Locator, Selector};
use crate::page_object::PageObject;
use crate::poll::{require, Condition, PollOptions};
use crate::resolve::FirstMatch;
use crate::result::ProbeResult;
use serde::Serialize;
use std::fmt;
use tracing::info;

// =============================================================================
// LOGIN
// =============================================================================

/// Admin sign-in screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminLoginPage {
    form: LoginForm,
}

impl AdminLoginPage {
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

impl PageObject for AdminLoginPage {
    fn name(&self) -> &str {
        "admin login"
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

/// Sidebar destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminSection {
    /// Landing page
    Dashboard,
    /// User management
    Users,
    /// Firewall servers
    FirewallServers,
    /// Scheduled jobs
    Scheduler,
}

impl AdminSection {
    /// Route
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::Users => "/users",
            Self::FirewallServers => "/firewall-servers",
            Self::Scheduler => "/scheduler",
        }
    }

    /// Sidebar label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Users => "Users",
            Self::FirewallServers => "Firewall Servers",
            Self::Scheduler => "Scheduler",
        }
    }
}

impl fmt::Display for AdminSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Landing page after sign-in, with the sidebar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminDashboardPage {
    sidebar: Locator,
    user_menu: Dropdown,
}

impl Default for AdminDashboardPage {
    fn default() -> Self {
        Self {
            sidebar: Locator::new("nav.sidebar").named("sidebar"),
            user_menu: Dropdown::bootstrap(".user-menu"),
        }
    }
}

impl AdminDashboardPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow a sidebar link, escalating until the URL changes
    pub async fn go_to<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        section: AdminSection,
        timings: &TimingConfig,
    ) -> ProbeResult<()> {
        let link = nav_link("nav.sidebar", section.path(), section.label())
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

    /// Sign out through the user menu
    pub async fn logout<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        timings: &TimingConfig,
    ) -> ProbeResult<()> {
        self.user_menu.select(driver, "Logout", &timings.dropdown).await?;
        require(driver, &Condition::UrlContains("/login".into()), &timings.navigation)
            .await?;
        Ok(())
    }
}

impl PageObject for AdminDashboardPage {
    fn name(&self) -> &str {
        "admin dashboard"
    }

    fn path(&self) -> &str {
        AdminSection::Dashboard.path()
    }

    fn ready_marker(&self) -> Locator {
        self.sidebar.clone()
    }
}

// =============================================================================
// USERS
// =============================================================================

/// A user to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Role label as shown in the select
    pub role: String,
    /// Initial password
    #[serde(skip)]
    pub password: String,
}

impl NewUser {
    /// Form values for the add-user modal
    #[must_use]
    pub fn payload(&self) -> FormPayload {
        FormPayload::new()
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("password", &self.password)
    }
}

/// User management screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsersPage {
    table: DataTable,
    dialog: AddDialog,
    search: Vec<Locator>,
}

impl Default for UsersPage {
    fn default() -> Self {
        let form = Form::new()
            .with(FormField::text("name", "Full Name"))
            .with(FormField::text("email", "Email"))
            .with(FormField::select("role", "Role"))
            .with(FormField::text("password", "Password"));
        Self {
            table: DataTable::new("table.users-table"),
            dialog: AddDialog::new(
                vec![
                    Locator::new("#add-user-btn"),
                    Locator::from_selector(Selector::test_id("add-user")),
                    Locator::new("button").with_text("Add User"),
                ],
                Modal::bootstrap("Add User"),
                form,
                save_buttons(),
            ),
            search: vec![
                Locator::new("input[type='search']"),
                Locator::from_selector(Selector::placeholder("Search")),
            ],
        }
    }
}

impl UsersPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The user table
    #[must_use]
    pub const fn table(&self) -> &DataTable {
        &self.table
    }

    /// The add-user dialog
    #[must_use]
    pub const fn dialog(&self) -> &AddDialog {
        &self.dialog
    }

    /// Create a user through the modal
    pub async fn add_user<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        user: &NewUser,
        timings: &TimingConfig,
    ) -> ProbeResult<AddOutcome> {
        self.dialog.add(driver, &user.payload(), timings).await
    }

    /// Type into the table filter
    pub async fn search<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        term: &str,
        timings: &TimingConfig,
    ) -> ProbeResult<()> {
        let input = FirstMatch::new(self.search.iter().cloned())
            .with_options(timings.resolve)
            .require(driver)
            .await?;
        driver.fill(input.selector(), term).await
    }
}

impl PageObject for UsersPage {
    fn name(&self) -> &str {
        "users"
    }

    fn path(&self) -> &str {
        AdminSection::Users.path()
    }

    fn ready_marker(&self) -> Locator {
        self.table.root().clone()
    }
}

/// Save buttons shared by the admin modals
fn save_buttons() -> Vec<Locator> {
    vec![
        Locator::new(".modal.show button[type='submit']"),
        Locator::new(".modal.show .btn-primary"),
        Locator::from_selector(Selector::role("button", "Save")),
    ]
}

// =============================================================================
// FIREWALL SERVERS
// =============================================================================

/// A firewall server to register
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFirewallServer {
    /// Display name
    pub name: String,
    /// Management address
    pub ip_address: String,
    /// Management port
    pub port: u16,
    /// Free text
    pub description: String,
}

impl NewFirewallServer {
    /// Form values for the add-server modal
    #[must_use]
    pub fn payload(&self) -> FormPayload {
        FormPayload::new()
            .field("name", &self.name)
            .field("ip_address", &self.ip_address)
            .field("port", self.port.to_string())
            .field("description", &self.description)
    }
}

/// Firewall server inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallServersPage {
    table: DataTable,
    dialog: AddDialog,
}

impl Default for FirewallServersPage {
    fn default() -> Self {
        let form = Form::new()
            .with(FormField::text("name", "Server Name"))
            .with(FormField::text("ip_address", "IP Address"))
            .with(FormField::text("port", "Port"))
            .with(FormField::text("description", "Description"));
        Self {
            table: DataTable::new("table.servers-table"),
            dialog: AddDialog::new(
                vec![
                    Locator::new("#add-server-btn"),
                    Locator::from_selector(Selector::test_id("add-server")),
                    Locator::new("button").with_text("Add Server"),
                ],
                Modal::bootstrap("Add Server"),
                form,
                save_buttons(),
            ),
        }
    }
}

impl FirewallServersPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The server table
    #[must_use]
    pub const fn table(&self) -> &DataTable {
        &self.table
    }

    /// Register a server through the modal
    pub async fn add_server<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        server: &NewFirewallServer,
        timings: &TimingConfig,
    ) -> ProbeResult<AddOutcome> {
        self.dialog.add(driver, &server.payload(), timings).await
    }
}

impl PageObject for FirewallServersPage {
    fn name(&self) -> &str {
        "firewall servers"
    }

    fn path(&self) -> &str {
        AdminSection::FirewallServers.path()
    }

    fn ready_marker(&self) -> Locator {
        self.table.root().clone()
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

/// A scheduled job to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSchedule {
    /// Job name
    pub name: String,
    /// Frequency label (`Daily`, `Weekly`, ...)
    pub frequency: String,
    /// Start time, `HH:MM`
    pub time: String,
}

/// Scheduled jobs screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerPage {
    table: DataTable,
    dialog: AddDialog,
    frequency: Dropdown,
}

impl Default for SchedulerPage {
    fn default() -> Self {
        let form = Form::new()
            .with(FormField::text("name", "Scheduler Name"))
            .with(FormField::text("time", "Time"));
        Self {
            table: DataTable::new("table.scheduler-table"),
            dialog: AddDialog::new(
                vec![
                    Locator::new("#add-scheduler-btn"),
                    Locator::from_selector(Selector::test_id("add-scheduler")),
                    Locator::new("button").with_text("Add Scheduler"),
                ],
                Modal::bootstrap("Add Scheduler"),
                form,
                save_buttons(),
            ),
            frequency: Dropdown::bootstrap(".modal.show .frequency-dropdown"),
        }
    }
}

impl SchedulerPage {
    /// Create the page object
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The scheduler table
    #[must_use]
    pub const fn table(&self) -> &DataTable {
        &self.table
    }

    /// The frequency dropdown inside the modal
    #[must_use]
    pub const fn frequency(&self) -> &Dropdown {
        &self.frequency
    }

    /// Create a scheduled job; the frequency is picked from its dropdown
    /// before the rest of the form is filled
    pub async fn add_schedule<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        schedule: &NewSchedule,
        timings: &TimingConfig,
    ) -> ProbeResult<AddOutcome> {
        self.dialog.open(driver, timings).await?;
        self.frequency
            .select(driver, &schedule.frequency, &timings.dropdown)
            .await?;
        let payload = FormPayload::new()
            .field("name", &schedule.name)
            .field("time", &schedule.time);
        self.dialog.submit(driver, &payload, timings).await
    }
}

impl PageObject for SchedulerPage {
    fn name(&self) -> &str {
        "scheduler"
    }

    fn path(&self) -> &str {
        AdminSection::Scheduler.path()
    }

    fn ready_marker(&self) -> Locator {
        self.table.root().clone()
    }
}
