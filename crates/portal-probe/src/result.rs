//! Result and error types for portal-probe.
//!
//! Helpers that answer "is X visible/present" never produce these errors; they
//! return plain booleans or small records. Errors are reserved for required
//! actions that could not be completed, failed assertions, and sessions that
//! died underneath a test.

use std::fmt;
use thiserror::Error;

/// Result type for portal-probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Driver error fragments that mean the page or browser context is gone.
const SESSION_CLOSED_MARKERS: &[&str] = &[
    "target closed",
    "page has been closed",
    "session closed",
    "browser has disconnected",
    "context was destroyed",
    "connection closed",
];

/// One failed attempt inside an escalation chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// Strategy name (e.g. `click`, `force-click`, `press Escape`)
    pub strategy: String,
    /// Why the strategy did not produce the expected state
    pub reason: String,
}

impl AttemptFailure {
    /// Create a new attempt failure
    #[must_use]
    pub fn new(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// Renders every attempt on its own line so the failing layer is visible.
fn render_attempts(attempts: &[AttemptFailure]) -> String {
    attempts
        .iter()
        .enumerate()
        .map(|(i, a)| format!("\n  {}. {a}", i + 1))
        .collect()
}

/// Errors that can occur in portal-probe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Low-level driver failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A required condition never became true
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of the awaited condition
        waited_for: String,
    },

    /// No candidate locator resolved to a visible element
    #[error("No element found; tried: {}", .tried.join(" | "))]
    NotFound {
        /// Candidate descriptions, in the order they were tried
        tried: Vec<String>,
    },

    /// Every fallback strategy for an action was exhausted
    #[error("Action '{action}' failed after {} attempt(s):{}", .attempts.len(), render_attempts(.attempts))]
    ActionFailed {
        /// The action being attempted
        action: String,
        /// Every attempt and its individual failure reason
        attempts: Vec<AttemptFailure>,
    },

    /// Observed application state did not match
    #[error("Assertion failed: {message} (expected {expected:?}, got {actual:?})")]
    AssertionFailed {
        /// What was being asserted
        message: String,
        /// Expected value
        expected: String,
        /// Actual value
        actual: String,
    },

    /// The page or browser context closed mid-test
    #[error("Browser session closed unexpectedly: {message}")]
    SessionClosed {
        /// Underlying driver message
        message: String,
    },

    /// A named step failed
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        /// Step name
        step: String,
        /// Underlying failure
        #[source]
        source: Box<ProbeError>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::AssertionFailed {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Turn a raw driver message into a domain error.
    ///
    /// Messages that indicate the page or context went away become
    /// [`ProbeError::SessionClosed`]; everything else is a plain driver error.
    #[must_use]
    pub fn classify_driver_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if SESSION_CLOSED_MARKERS.iter().any(|m| lower.contains(m)) {
            Self::SessionClosed { message }
        } else {
            Self::Driver { message }
        }
    }

    /// Wrap this error as the failure of a named step
    #[must_use]
    pub fn in_step(self, step: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a closed session
    #[must_use]
    pub fn is_session_closed(&self) -> bool {
        self.session_closed_message().is_some()
    }

    /// Driver message of a closed session, looking through step wrappers
    #[must_use]
    pub fn session_closed_message(&self) -> Option<&str> {
        match self {
            Self::SessionClosed { message } => Some(message),
            Self::StepFailed { source, .. } => source.session_closed_message(),
            _ => None,
        }
    }

    /// Whether this error (or the error it wraps) is a timeout
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::StepFailed { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
