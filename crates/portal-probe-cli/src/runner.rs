//! Journey selection and execution

use crate::commands::RunArgs;
use crate::error::{CliError, CliResult};
use portal_probe::{execute, Journey, JourneyReport, PortalDriver, ProbeResult, SuiteConfig};
use std::future::Future;
use tracing::{error, info};

/// Step recorded when a journey's browser never started
const LAUNCH_STEP: &str = "launch browser";

/// Journeys named on the command line, in order, without duplicates.
///
/// No names or `all` selects every journey.
pub fn select_journeys(names: &[String]) -> CliResult<Vec<Journey>> {
    if names.is_empty() || names.iter().any(|n| n.eq_ignore_ascii_case("all")) {
        return Ok(Journey::all().to_vec());
    }
    let mut selected = Vec::new();
    for name in names {
        let journey: Journey = name
            .parse()
            .map_err(|_| CliError::invalid_argument(format!(
                "unknown journey '{name}' (see `portal-probe journeys`)"
            )))?;
        if !selected.contains(&journey) {
            selected.push(journey);
        }
    }
    Ok(selected)
}

/// Apply `run` flags on top of the loaded configuration
#[must_use]
pub fn apply_run_args(suite: SuiteConfig, args: &RunArgs) -> SuiteConfig {
    let mut suite = suite;
    if args.headed {
        suite.driver = suite.driver.headless(false);
    }
    if let Some(ref dir) = args.artifacts {
        suite = suite.with_artifacts_dir(dir);
    }
    suite
}

/// Run each journey in its own browser, one after another
#[cfg(feature = "browser")]
pub async fn run_journeys(
    journeys: &[Journey],
    suite: &SuiteConfig,
    fail_fast: bool,
) -> CliResult<Vec<JourneyReport>> {
    Ok(run_with(journeys, suite, fail_fast, |suite: &SuiteConfig| {
        portal_probe::ChromiumDriver::launch(suite.driver.clone())
    })
    .await)
}

#[cfg(not(feature = "browser"))]
pub async fn run_journeys(
    _journeys: &[Journey],
    _suite: &SuiteConfig,
    _fail_fast: bool,
) -> CliResult<Vec<JourneyReport>> {
    Err(CliError::config(
        "built without the `browser` feature; rebuild with --features browser",
    ))
}

/// Run journeys sequentially, each on a fresh driver from `launch`.
///
/// A driver that cannot be launched fails that journey only; the
/// reports gathered so far are kept.
pub async fn run_with<D, F, Fut>(
    journeys: &[Journey],
    suite: &SuiteConfig,
    fail_fast: bool,
    launch: F,
) -> Vec<JourneyReport>
where
    D: PortalDriver,
    F: Fn(&SuiteConfig) -> Fut,
    Fut: Future<Output = ProbeResult<D>>,
{
    let mut reports = Vec::with_capacity(journeys.len());
    for &journey in journeys {
        let report = match launch(suite).await {
            Ok(driver) => execute(journey, driver, suite.clone()).await,
            Err(e) => {
                error!(%journey, error = %e, "browser launch failed");
                JourneyReport::not_started(journey.name(), LAUNCH_STEP, &e)
            }
        };
        let failed = !report.passed;
        reports.push(report);
        if failed && fail_fast {
            info!(%journey, "stopping after first failure");
            break;
        }
    }
    reports
}
