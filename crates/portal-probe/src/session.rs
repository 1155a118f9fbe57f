//! Test sessions and named steps.
//!
//! A [`Session`] owns one driver (one isolated browser context) plus the
//! configuration for the run. Journeys are written as a sequence of
//! [`Session::step`] calls; each step is timed, logged inside its own span and
//! recorded, so a failure report names the step that broke and carries a
//! screenshot of the page at that moment.

use crate::artifacts::ArtifactStore;
use crate::config::SuiteConfig;
use crate::driver::PortalDriver;
use crate::result::{ProbeError, ProbeResult};
use serde::Serialize;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Completed
    Passed,
    /// Optional affordance absent; step intentionally not run
    Skipped {
        /// Why it was skipped
        reason: String,
    },
    /// Failed with an error
    Failed {
        /// Rendered error
        error: String,
    },
}

/// One recorded step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    /// Step name
    pub name: String,
    /// Outcome
    #[serde(flatten)]
    pub outcome: StepOutcome,
    /// Duration in milliseconds
    pub elapsed_ms: u64,
    /// Screenshot taken on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

/// Summary of one journey run
#[derive(Debug, Clone, Serialize)]
pub struct JourneyReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Journey name
    pub journey: String,
    /// Steps in execution order
    pub steps: Vec<StepRecord>,
    /// No step failed
    pub passed: bool,
    /// Total duration in milliseconds
    pub elapsed_ms: u64,
}

impl JourneyReport {
    /// Report for a journey that failed before its first step ran
    #[must_use]
    pub fn not_started(journey: impl Into<String>, step: impl Into<String>, error: &ProbeError) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            journey: journey.into(),
            steps: vec![StepRecord {
                name: step.into(),
                outcome: StepOutcome::Failed {
                    error: error.to_string(),
                },
                elapsed_ms: 0,
                screenshot: None,
            }],
            passed: false,
            elapsed_ms: 0,
        }
    }

    /// The first failed step, if any
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps
            .iter()
            .find(|s| matches!(s.outcome, StepOutcome::Failed { .. }))
    }
}

/// One isolated test session
#[derive(Debug)]
pub struct Session<D: PortalDriver> {
    driver: D,
    config: SuiteConfig,
    artifacts: ArtifactStore,
    journey: String,
    run_id: Uuid,
    started: Instant,
    steps: Mutex<Vec<StepRecord>>,
}

impl<D: PortalDriver> Session<D> {
    /// Start a session for a journey
    pub fn new(driver: D, config: SuiteConfig, journey: impl Into<String>) -> Self {
        let artifacts = ArtifactStore::new(config.artifacts_dir.clone());
        Self {
            driver,
            config,
            artifacts,
            journey: journey.into(),
            run_id: Uuid::new_v4(),
            started: Instant::now(),
            steps: Mutex::new(Vec::new()),
        }
    }

    /// The driver
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Suite configuration
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Artifact store
    pub const fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Unique id of this run
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Short token for naming records created by this run
    pub fn unique_suffix(&self) -> String {
        self.run_id.simple().to_string()[..8].to_string()
    }

    fn records(&self) -> MutexGuard<'_, Vec<StepRecord>> {
        self.steps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Run a named step.
    ///
    /// Failures are wrapped in [`ProbeError::StepFailed`]. Unless the browser
    /// session itself is gone, a screenshot is saved for the failing step.
    pub async fn step<T, Fut>(&self, name: &str, fut: Fut) -> ProbeResult<T>
    where
        Fut: Future<Output = ProbeResult<T>>,
    {
        let span = info_span!("step", journey = %self.journey, step = name);
        async move {
            info!("step started");
            let started = Instant::now();
            let result = fut.await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(value) => {
                    info!(elapsed_ms, "step passed");
                    self.records().push(StepRecord {
                        name: name.to_string(),
                        outcome: StepOutcome::Passed,
                        elapsed_ms,
                        screenshot: None,
                    });
                    Ok(value)
                }
                Err(e) => {
                    let screenshot = if e.is_session_closed() {
                        error!(error = %e, "browser session closed during step");
                        None
                    } else {
                        error!(elapsed_ms, error = %e, "step failed");
                        self.artifacts
                            .capture(&self.driver, &format!("{}-{name}", self.journey))
                            .await
                    };
                    self.records().push(StepRecord {
                        name: name.to_string(),
                        outcome: StepOutcome::Failed {
                            error: e.to_string(),
                        },
                        elapsed_ms,
                        screenshot,
                    });
                    Err(e.in_step(name))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Record a step that was not run because an optional element is absent
    pub fn skip(&self, name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        info!(journey = %self.journey, step = name, %reason, "step skipped");
        self.records().push(StepRecord {
            name: name.to_string(),
            outcome: StepOutcome::Skipped { reason },
            elapsed_ms: 0,
            screenshot: None,
        });
    }

    /// Snapshot of the steps so far
    pub fn report(&self) -> JourneyReport {
        let steps = self.records().clone();
        let passed = !steps
            .iter()
            .any(|s| matches!(s.outcome, StepOutcome::Failed { .. }));
        JourneyReport {
            run_id: self.run_id,
            journey: self.journey.clone(),
            steps,
            passed,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    /// Close the browser; a session that is already gone is not an error
    pub async fn close(&self) -> ProbeResult<()> {
        match self.driver.close().await {
            Err(e) if e.is_session_closed() => {
                warn!(error = %e, "session already closed");
                Ok(())
            }
            other => other,
        }
    }
}

/// Require `actual == expected`
pub fn expect_eq<T>(what: &str, expected: T, actual: T) -> ProbeResult<()>
where
    T: PartialEq + Display + Debug,
{
    if expected == actual {
        Ok(())
    } else {
        Err(ProbeError::assertion(
            what,
            expected.to_string(),
            actual.to_string(),
        ))
    }
}

/// Require a condition to hold
pub fn expect_true(what: &str, condition: bool) -> ProbeResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ProbeError::assertion(what, "true", "false"))
    }
}

/// Require `haystack` to contain `needle`
pub fn expect_contains(what: &str, haystack: &str, needle: &str) -> ProbeResult<()> {
    if haystack.contains(needle) {
        Ok(())
    } else {
        Err(ProbeError::assertion(
            what,
            format!("text containing '{needle}'"),
            haystack,
        ))
    }
}
