//! Bounded condition polling.
//!
//! Transient UI states (modal open, toast shown, dropdown expanded, button
//! enabled) are detected by re-checking a predicate on a fixed interval until
//! it holds or the timeout runs out. The poller never raises for "condition
//! never became true": absence is an ordinary outcome. Each individual check
//! is itself time-boxed, and a check that errors counts as "not yet", except
//! for a closed browser session, which ends the loop at once.

use crate::driver::PortalDriver;
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default overall timeout (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (250ms)
pub const DEFAULT_INTERVAL_MS: u64 = 250;

/// Default ceiling for one predicate evaluation (1 second)
pub const DEFAULT_CHECK_TIMEOUT_MS: u64 = 1_000;

// =============================================================================
// POLL OPTIONS
// =============================================================================

/// Timing for one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollOptions {
    /// Overall timeout in milliseconds
    pub timeout_ms: u64,
    /// Pause between checks in milliseconds
    pub interval_ms: u64,
    /// Ceiling for a single check in milliseconds
    pub check_timeout_ms: u64,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::standard()
    }
}

impl PollOptions {
    /// Create new poll options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Short probe for optional affordances (1s, 200ms interval)
    #[must_use]
    pub const fn quick() -> Self {
        Self {
            timeout_ms: 1_000,
            interval_ms: 200,
            check_timeout_ms: 200,
        }
    }

    /// Everyday waits (5s, 250ms interval)
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
            check_timeout_ms: DEFAULT_CHECK_TIMEOUT_MS,
        }
    }

    /// Slow screens and navigation (15s, 500ms interval)
    #[must_use]
    pub const fn patient() -> Self {
        Self {
            timeout_ms: 15_000,
            interval_ms: 500,
            check_timeout_ms: 2_000,
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Set the per-check ceiling in milliseconds
    #[must_use]
    pub const fn with_check_timeout(mut self, check_timeout_ms: u64) -> Self {
        self.check_timeout_ms = check_timeout_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Get the per-check ceiling as Duration
    #[must_use]
    pub const fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    /// Number of checks that fit in the timeout, at least one
    #[must_use]
    pub fn max_attempts(&self) -> usize {
        if self.interval_ms == 0 {
            return usize::MAX;
        }
        (self.timeout_ms.div_ceil(self.interval_ms) as usize).max(1)
    }
}

// =============================================================================
// POLL OUTCOME
// =============================================================================

/// Result of a polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Whether the condition held before the timeout
    pub satisfied: bool,
    /// Number of checks performed
    pub attempts: usize,
    /// Time spent polling
    pub elapsed: Duration,
    /// Most recent check error, if any check failed
    pub last_error: Option<String>,
    /// Driver message when the browser session closed mid-poll
    pub session_closed: Option<String>,
}

impl PollOutcome {
    /// Turn an unsatisfied outcome into an error for a required wait
    pub fn into_result(self, waited_for: impl Into<String>) -> ProbeResult<Self> {
        if self.satisfied {
            Ok(self)
        } else {
            Err(self.failure(waited_for))
        }
    }

    /// Whether polling stopped because the session went away
    #[must_use]
    pub const fn is_session_closed(&self) -> bool {
        self.session_closed.is_some()
    }

    /// The error describing an unsatisfied outcome: [`ProbeError::SessionClosed`]
    /// when the session died, a [`ProbeError::Timeout`] otherwise
    #[must_use]
    pub fn failure(&self, waited_for: impl Into<String>) -> ProbeError {
        if let Some(ref message) = self.session_closed {
            return ProbeError::SessionClosed {
                message: message.clone(),
            };
        }
        let mut waited_for = waited_for.into();
        if let Some(ref err) = self.last_error {
            waited_for = format!("{waited_for} (last check error: {err})");
        }
        ProbeError::Timeout {
            ms: self.elapsed.as_millis() as u64,
            waited_for,
        }
    }
}

// =============================================================================
// POLLER
// =============================================================================

/// Runs a predicate on an interval until it holds or time runs out
#[derive(Debug, Clone, Copy, Default)]
pub struct Poller {
    options: PollOptions,
}

impl Poller {
    /// Create a poller with the given timing
    #[must_use]
    pub const fn new(options: PollOptions) -> Self {
        Self { options }
    }

    /// Timing in use
    #[must_use]
    pub const fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Poll until `check` returns `Ok(true)`.
    ///
    /// `Ok(false)`, an `Err` and a check that overruns its ceiling all count as
    /// "not yet". Returns early on success and never waits much past the
    /// configured timeout. A [`ProbeError::SessionClosed`] from the check stops
    /// the loop; the outcome then carries the driver message.
    pub async fn until<F, Fut>(&self, mut check: F) -> PollOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<bool>>,
    {
        let (_, outcome) = self
            .find(|| {
                let fut = check();
                async move { fut.await.map(|ok| ok.then_some(())) }
            })
            .await;
        outcome
    }

    /// Poll until `check` yields `Some(value)`, returning the first value seen.
    pub async fn find<T, F, Fut>(&self, mut check: F) -> (Option<T>, PollOutcome)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<Option<T>>>,
    {
        let start = Instant::now();
        let deadline = start + self.options.timeout();
        let max_attempts = self.options.max_attempts();
        let mut attempts = 0;
        let mut last_error = None;

        loop {
            attempts += 1;
            let budget = self
                .options
                .check_timeout()
                .min(deadline.saturating_duration_since(Instant::now()));

            match tokio::time::timeout(budget, check()).await {
                Ok(Ok(Some(value))) => {
                    return (
                        Some(value),
                        PollOutcome {
                            satisfied: true,
                            attempts,
                            elapsed: start.elapsed(),
                            last_error,
                            session_closed: None,
                        },
                    );
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) if e.is_session_closed() => {
                    warn!(attempt = attempts, error = %e, "session closed while polling");
                    return (
                        None,
                        PollOutcome {
                            satisfied: false,
                            attempts,
                            elapsed: start.elapsed(),
                            last_error: Some(e.to_string()),
                            session_closed: e.session_closed_message().map(ToString::to_string),
                        },
                    );
                }
                Ok(Err(e)) => {
                    debug!(attempt = attempts, error = %e, "check failed, treating as not yet");
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    debug!(attempt = attempts, budget_ms = budget.as_millis() as u64, "check overran its budget");
                    last_error = Some(format!("check exceeded {}ms", budget.as_millis()));
                }
            }

            let now = Instant::now();
            if attempts >= max_attempts || now >= deadline {
                break;
            }
            tokio::time::sleep(self.options.interval().min(deadline - now)).await;
        }

        (
            None,
            PollOutcome {
                satisfied: false,
                attempts,
                elapsed: start.elapsed(),
                last_error,
                session_closed: None,
            },
        )
    }
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// A page state that can be awaited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Some match is rendered
    Visible(Locator),
    /// No match is rendered
    Hidden(Locator),
    /// The first match is enabled
    Enabled(Locator),
    /// The first match's text contains the string
    TextContains(Locator, String),
    /// The current URL contains the string
    UrlContains(String),
    /// At least this many matches exist
    CountAtLeast(Locator, usize),
}

impl Condition {
    /// Evaluate once against the live page
    pub async fn check<D: PortalDriver + ?Sized>(&self, driver: &D) -> ProbeResult<bool> {
        match self {
            Self::Visible(loc) => driver.is_visible(loc.selector()).await,
            Self::Hidden(loc) => driver.is_visible(loc.selector()).await.map(|v| !v),
            Self::Enabled(loc) => driver.is_enabled(loc.selector()).await,
            Self::TextContains(loc, text) => Ok(driver
                .text_content(loc.selector())
                .await?
                .is_some_and(|t| t.contains(text.as_str()))),
            Self::UrlContains(part) => Ok(driver.current_url().await?.contains(part.as_str())),
            Self::CountAtLeast(loc, n) => Ok(driver.count(loc.selector()).await? >= *n),
        }
    }

    /// Human-readable description for logs and errors
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Visible(loc) => format!("{loc} to be visible"),
            Self::Hidden(loc) => format!("{loc} to be hidden"),
            Self::Enabled(loc) => format!("{loc} to be enabled"),
            Self::TextContains(loc, text) => format!("{loc} to contain '{text}'"),
            Self::UrlContains(part) => format!("URL to contain '{part}'"),
            Self::CountAtLeast(loc, n) => format!("at least {n} of {loc}"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Poll a condition against a driver
pub async fn wait_for<D: PortalDriver + ?Sized>(
    driver: &D,
    condition: &Condition,
    options: &PollOptions,
) -> PollOutcome {
    let outcome = Poller::new(*options).until(|| condition.check(driver)).await;
    debug!(
        condition = %condition,
        satisfied = outcome.satisfied,
        attempts = outcome.attempts,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "wait finished"
    );
    outcome
}

/// Poll a condition that must hold.
///
/// # Errors
///
/// [`ProbeError::SessionClosed`] when the browser went away, a timeout
/// naming the condition otherwise.
pub async fn require<D: PortalDriver + ?Sized>(
    driver: &D,
    condition: &Condition,
    options: &PollOptions,
) -> ProbeResult<PollOutcome> {
    wait_for(driver, condition, options)
        .await
        .into_result(condition.describe())
}

/// Run a single driver call under `limit`; an overrun becomes a timeout
/// error naming `what`
pub async fn bounded<T, Fut>(limit: Duration, what: &str, call: Fut) -> ProbeResult<T>
where
    Fut: Future<Output = ProbeResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout {
            ms: limit.as_millis() as u64,
            waited_for: what.to_string(),
        }),
    }
}

/// Whether the locator becomes visible within `options`; never errors
pub async fn is_visible_within<D: PortalDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
    options: &PollOptions,
) -> bool {
    wait_for(driver, &Condition::Visible(locator.clone()), options)
        .await
        .satisfied
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};
    use crate::locator::Selector;
    use std::cell::Cell;

    mod poll_options_tests {
        use super::*;

        #[test]
        fn test_defaults_are_standard() {
            let opts = PollOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_TIMEOUT_MS);
            assert_eq!(opts.interval_ms, DEFAULT_INTERVAL_MS);
            assert_eq!(opts.check_timeout_ms, DEFAULT_CHECK_TIMEOUT_MS);
        }

        #[test]
        fn test_builder_chain() {
            let opts = PollOptions::new()
                .with_timeout(2_000)
                .with_interval(300)
                .with_check_timeout(150);
            assert_eq!(opts.timeout(), Duration::from_millis(2_000));
            assert_eq!(opts.interval(), Duration::from_millis(300));
            assert_eq!(opts.check_timeout(), Duration::from_millis(150));
        }

        #[test]
        fn test_max_attempts() {
            assert_eq!(PollOptions::new().with_timeout(2_000).with_interval(300).max_attempts(), 7);
            assert_eq!(PollOptions::new().with_timeout(900).with_interval(300).max_attempts(), 3);
            assert_eq!(PollOptions::new().with_timeout(0).with_interval(300).max_attempts(), 1);
            assert_eq!(PollOptions::new().with_interval(0).max_attempts(), usize::MAX);
        }

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let opts: PollOptions = serde_yaml_ng::from_str("timeout_ms: 9000\n").unwrap();
            assert_eq!(opts.timeout_ms, 9_000);
            assert_eq!(opts.interval_ms, DEFAULT_INTERVAL_MS);
        }
    }

    mod poller_tests {
        use super::*;

        fn opts_2000_300() -> PollOptions {
            PollOptions::new()
                .with_timeout(2_000)
                .with_interval(300)
                .with_check_timeout(200)
        }

        #[tokio::test(start_paused = true)]
        async fn test_always_false_returns_false_near_timeout() {
            let calls = Cell::new(0);
            let outcome = Poller::new(opts_2000_300())
                .until(|| {
                    calls.set(calls.get() + 1);
                    async { Ok(false) }
                })
                .await;

            assert!(!outcome.satisfied);
            assert!((6..=7).contains(&calls.get()), "calls = {}", calls.get());
            assert_eq!(outcome.attempts, calls.get());
            assert!(outcome.elapsed >= Duration::from_millis(1_700));
            assert!(outcome.elapsed <= Duration::from_millis(2_300));
        }

        #[tokio::test(start_paused = true)]
        async fn test_true_on_third_call_exits_early() {
            let calls = Cell::new(0);
            let outcome = Poller::new(opts_2000_300())
                .until(|| {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move { Ok(n == 3) }
                })
                .await;

            assert!(outcome.satisfied);
            assert_eq!(calls.get(), 3);
            assert!(outcome.elapsed >= Duration::from_millis(600));
            assert!(outcome.elapsed <= Duration::from_millis(900));
        }

        #[tokio::test(start_paused = true)]
        async fn test_immediate_success_does_not_sleep() {
            let outcome = Poller::new(opts_2000_300()).until(|| async { Ok(true) }).await;
            assert!(outcome.satisfied);
            assert_eq!(outcome.attempts, 1);
            assert_eq!(outcome.elapsed, Duration::ZERO);
        }

        #[tokio::test(start_paused = true)]
        async fn test_check_errors_do_not_abort() {
            let calls = Cell::new(0);
            let outcome = Poller::new(opts_2000_300())
                .until(|| {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        match n {
                            2 => Err(ProbeError::driver("element detached")),
                            4 => Ok(true),
                            _ => Ok(false),
                        }
                    }
                })
                .await;

            assert!(outcome.satisfied);
            assert_eq!(outcome.attempts, 4);
            assert_eq!(outcome.last_error.as_deref(), Some("Driver error: element detached"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_hanging_check_is_bounded() {
            let outcome = Poller::new(opts_2000_300())
                .until(|| std::future::pending::<ProbeResult<bool>>())
                .await;

            assert!(!outcome.satisfied);
            assert!(outcome.elapsed <= Duration::from_millis(2_300));
            assert!(outcome.last_error.unwrap().contains("exceeded"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_slow_checks_still_respect_deadline() {
            let opts = PollOptions::new()
                .with_timeout(1_000)
                .with_interval(10)
                .with_check_timeout(5_000);
            let outcome = Poller::new(opts)
                .until(|| async {
                    tokio::time::sleep(Duration::from_millis(400)).await;
                    Ok(false)
                })
                .await;

            assert!(!outcome.satisfied);
            assert!(outcome.elapsed <= Duration::from_millis(1_010));
        }

        #[tokio::test(start_paused = true)]
        async fn test_closed_session_stops_polling() {
            let calls = Cell::new(0);
            let outcome = Poller::new(opts_2000_300())
                .until(|| {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move {
                        if n == 2 {
                            Err(ProbeError::classify_driver_message("Target closed"))
                        } else {
                            Ok(false)
                        }
                    }
                })
                .await;

            assert!(!outcome.satisfied);
            assert_eq!(calls.get(), 2);
            assert!(outcome.elapsed <= Duration::from_millis(300));
            assert_eq!(outcome.session_closed.as_deref(), Some("Target closed"));
            assert!(outcome.failure("anything").is_session_closed());
        }

        #[tokio::test(start_paused = true)]
        async fn test_find_returns_first_value() {
            let calls = Cell::new(0);
            let (value, outcome) = Poller::new(opts_2000_300())
                .find(|| {
                    calls.set(calls.get() + 1);
                    let n = calls.get();
                    async move { Ok((n >= 2).then(|| format!("value {n}"))) }
                })
                .await;
            assert_eq!(value.as_deref(), Some("value 2"));
            assert!(outcome.satisfied);
        }

        #[test]
        fn test_into_result() {
            let ok = PollOutcome {
                satisfied: true,
                attempts: 1,
                elapsed: Duration::ZERO,
                last_error: None,
                session_closed: None,
            };
            assert!(ok.into_result("x").is_ok());

            let missed = PollOutcome {
                satisfied: false,
                attempts: 5,
                elapsed: Duration::from_millis(1_000),
                last_error: Some("boom".into()),
                session_closed: None,
            };
            match missed.into_result("modal to open") {
                Err(ProbeError::Timeout { ms, waited_for }) => {
                    assert_eq!(ms, 1_000);
                    assert!(waited_for.contains("modal to open"));
                    assert!(waited_for.contains("boom"));
                }
                other => panic!("expected timeout, got {other:?}"),
            }
        }
    }

    mod condition_tests {
        use super::*;

        #[tokio::test]
        async fn test_visible_and_hidden() {
            let driver = MockDriver::new()
                .with_element(Selector::css(".modal"), MockElement::visible());
            let modal = Locator::new(".modal");
            assert!(Condition::Visible(modal.clone()).check(&driver).await.unwrap());
            assert!(!Condition::Hidden(modal).check(&driver).await.unwrap());
            assert!(Condition::Hidden(Locator::new(".gone")).check(&driver).await.unwrap());
        }

        #[tokio::test]
        async fn test_text_url_and_count() {
            let driver = MockDriver::new()
                .at_url("https://admin.test/users")
                .with_element(
                    Selector::css("tbody tr"),
                    MockElement::visible().with_texts(["alice", "bob"]),
                );
            let rows = Locator::new("tbody tr");
            assert!(Condition::TextContains(rows.clone(), "ali".into())
                .check(&driver)
                .await
                .unwrap());
            assert!(Condition::UrlContains("/users".into()).check(&driver).await.unwrap());
            assert!(Condition::CountAtLeast(rows.clone(), 2).check(&driver).await.unwrap());
            assert!(!Condition::CountAtLeast(rows, 3).check(&driver).await.unwrap());
        }

        #[test]
        fn test_describe() {
            let c = Condition::Visible(Locator::new(".toast").named("toast"));
            assert_eq!(c.to_string(), "toast (css `.toast`) to be visible");
        }

        #[tokio::test(start_paused = true)]
        async fn test_is_visible_within_never_errors() {
            let driver = MockDriver::new();
            driver.fail_next("is_visible", "Target closed");
            let seen = is_visible_within(&driver, &Locator::new(".x"), &PollOptions::quick()).await;
            assert!(!seen);
        }

        #[tokio::test(start_paused = true)]
        async fn test_require_times_out_with_description() {
            let driver = MockDriver::new();
            let err = require(
                &driver,
                &Condition::Visible(Locator::new(".never")),
                &PollOptions::quick(),
            )
            .await
            .unwrap_err();
            assert!(err.is_timeout());
            assert!(err.to_string().contains(".never"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_require_on_closed_driver_fails_fast() {
            let driver = MockDriver::new();
            driver.close().await.unwrap();
            let started = Instant::now();
            let err = require(
                &driver,
                &Condition::Visible(Locator::new(".modal.show")),
                &PollOptions::patient(),
            )
            .await
            .unwrap_err();

            assert!(err.is_session_closed(), "{err}");
            assert!(!err.is_timeout());
            assert!(started.elapsed() < Duration::from_millis(500));
        }

        #[tokio::test(start_paused = true)]
        async fn test_bounded_call_overrun_is_timeout() {
            let err = bounded(
                Duration::from_millis(200),
                "current URL",
                std::future::pending::<ProbeResult<String>>(),
            )
            .await
            .unwrap_err();
            assert_eq!(err.to_string(), "Timed out after 200ms waiting for current URL");
        }
    }
}
