//! Journeys against running portals in headless Chromium.
//!
//! Ignored by default. Point `ADMIN_PORTAL_URL` / `CUSTOMER_PORTAL_URL` at a
//! staging deployment and run with `--features browser -- --ignored`.

#![cfg(feature = "browser")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use portal_probe::{execute, ChromiumDriver, Journey, SuiteConfig};

async fn run_live(journey: Journey) {
    let config = SuiteConfig::from_env();
    let driver = ChromiumDriver::launch(config.driver.clone())
        .await
        .expect("chromium should launch");
    let report = execute(journey, driver, config).await;
    assert!(report.passed, "{}", serde_json::to_string_pretty(&report).unwrap());
}

#[tokio::test]
#[ignore = "needs a running admin portal and Chromium"]
async fn live_admin_login() {
    run_live(Journey::AdminLogin).await;
}

#[tokio::test]
#[ignore = "needs a running admin portal and Chromium"]
async fn live_admin_add_user() {
    run_live(Journey::AdminAddUser).await;
}

#[tokio::test]
#[ignore = "needs a running customer portal and Chromium"]
async fn live_customer_reports() {
    run_live(Journey::CustomerReports).await;
}
