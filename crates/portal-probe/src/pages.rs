//! Page objects for the admin and customer portals.
//!
//! Locators are listed most structural first (ids, `name` attributes, test
//! ids) and text-based last, so a loose text match only wins when nothing
//! more specific is on the page.

pub mod admin;
pub mod customer;

use crate::config::{Credentials, TimingConfig};
use crate::driver::PortalDriver;
use crate::fallback::Escalation;
use crate::locator::{Locator, Selector};
use crate::poll::{is_visible_within, Condition, PollOptions};
use crate::resolve::FirstMatch;
use crate::result::ProbeResult;
use tracing::info;

pub use admin::{
    AdminDashboardPage, AdminLoginPage, AdminSection, FirewallServersPage, NewFirewallServer,
    NewSchedule, NewUser, SchedulerPage, UsersPage,
};
pub use customer::{
    CustomerDashboardPage, CustomerLoginPage, CustomerSection, ExportSignal, HeaderSelection,
    PlanFeature, ReportsPage,
};

/// Email/password sign-in form used by both portals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    email: Vec<Locator>,
    password: Vec<Locator>,
    submit: Vec<Locator>,
    error: Locator,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: vec![
                Locator::new("input[name='email']"),
                Locator::new("#email"),
                Locator::new("input[type='email']"),
                Locator::from_selector(Selector::placeholder("Email")),
            ],
            password: vec![
                Locator::new("input[name='password']"),
                Locator::new("#password"),
                Locator::new("input[type='password']"),
            ],
            submit: vec![
                Locator::new("form button[type='submit']"),
                Locator::from_selector(Selector::role("button", "Sign in")),
                Locator::from_selector(Selector::role("button", "Login")),
            ],
            error: Locator::new(".alert-danger, .login-error, [role='alert']").named("login error"),
        }
    }
}

impl LoginForm {
    /// Locator whose visibility means the form is on screen
    #[must_use]
    pub fn marker(&self) -> Locator {
        Locator::new("input[type='password']").named("password field")
    }

    /// Fill the credentials and submit.
    ///
    /// Succeeds once the password field is gone, i.e. the portal navigated
    /// away from the sign-in form.
    pub async fn sign_in<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        credentials: &Credentials,
        timings: &TimingConfig,
    ) -> ProbeResult<()> {
        let email = FirstMatch::new(self.email.iter().cloned())
            .with_options(timings.resolve)
            .require(driver)
            .await?;
        driver.fill(email.selector(), &credentials.email).await?;

        let password = FirstMatch::new(self.password.iter().cloned())
            .with_options(timings.resolve)
            .require(driver)
            .await?;
        driver.fill(password.selector(), &credentials.password).await?;

        let submit = FirstMatch::new(self.submit.iter().cloned())
            .with_options(timings.resolve)
            .require(driver)
            .await?;
        Escalation::click_until(&submit, Condition::Hidden(password))
            .check_before(false)
            .verify_with(timings.navigation)
            .run(driver)
            .await?;
        info!(email = %credentials.email, "signed in");
        Ok(())
    }

    /// Text of the error banner, if one shows up within `options`
    pub async fn error_message<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        options: &PollOptions,
    ) -> Option<String> {
        if !is_visible_within(driver, &self.error, options).await {
            return None;
        }
        driver.text_content(self.error.selector()).await.ok().flatten()
    }
}

/// Sidebar/top-bar link candidates for a route with a visible label
pub(crate) fn nav_link(container: &str, path: &str, label: &str) -> FirstMatch {
    FirstMatch::new([
        Locator::new(format!("{container} a[href='{path}']")),
        Locator::new(format!("{container} a")).with_text(label),
        Locator::from_selector(Selector::role("link", label)),
    ])
}
