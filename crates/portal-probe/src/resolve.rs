//! Best-of-N locator resolution.
//!
//! The portals render the same control with different markup depending on
//! the screen and release (an `id`, a `data-testid`, or only its label). A
//! [`FirstMatch`] holds the candidates in priority order and, on each polling
//! round, returns the first one that is visible. Lower-priority candidates are
//! only consulted when every higher one is absent.

use crate::driver::PortalDriver;
use crate::locator::Locator;
use crate::poll::{PollOptions, Poller};
use crate::result::{ProbeError, ProbeResult};
use tracing::debug;

/// Outcome of resolving a candidate list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A candidate matched a visible element
    Found {
        /// Position of the winning candidate
        index: usize,
        /// The winning candidate
        locator: Locator,
    },
    /// No candidate matched before the deadline
    NotFound {
        /// Every candidate description, in priority order
        tried: Vec<String>,
    },
    /// The browser session closed while candidates were being checked
    SessionClosed {
        /// Driver message
        message: String,
    },
}

impl Resolution {
    /// The winning locator, if any
    #[must_use]
    pub const fn found(&self) -> Option<&Locator> {
        match self {
            Self::Found { locator, .. } => Some(locator),
            Self::NotFound { .. } | Self::SessionClosed { .. } => None,
        }
    }

    /// Require a match.
    ///
    /// # Errors
    ///
    /// [`ProbeError::NotFound`] naming every candidate that was tried, or
    /// [`ProbeError::SessionClosed`].
    pub fn into_result(self) -> ProbeResult<Locator> {
        match self {
            Self::Found { locator, .. } => Ok(locator),
            Self::NotFound { tried } => Err(ProbeError::NotFound { tried }),
            Self::SessionClosed { message } => Err(ProbeError::SessionClosed { message }),
        }
    }
}

/// Ordered candidates for one logical element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstMatch {
    candidates: Vec<Locator>,
    options: PollOptions,
}

impl FirstMatch {
    /// Candidates in priority order
    #[must_use]
    pub fn new<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = Locator>,
    {
        Self {
            candidates: candidates.into_iter().collect(),
            options: PollOptions::quick(),
        }
    }

    /// Set the polling budget
    #[must_use]
    pub const fn with_options(mut self, options: PollOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a lower-priority candidate
    #[must_use]
    pub fn or(mut self, candidate: Locator) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Candidates in priority order
    #[must_use]
    pub fn candidates(&self) -> &[Locator] {
        &self.candidates
    }

    /// Find the highest-priority visible candidate.
    ///
    /// Each candidate check is bounded by the per-check timeout; a check that
    /// errors or overruns counts as "absent" for that round.
    pub async fn resolve<D: PortalDriver + ?Sized>(&self, driver: &D) -> Resolution {
        if self.candidates.is_empty() {
            return Resolution::NotFound { tried: Vec::new() };
        }

        let per_check = self.options.check_timeout();
        // One round probes every candidate, so it gets a budget per candidate
        let round = self.options.with_check_timeout(
            self.options
                .check_timeout_ms
                .saturating_mul(self.candidates.len() as u64),
        );

        let (hit, outcome) = Poller::new(round)
            .find(|| async move {
                for (index, candidate) in self.candidates.iter().enumerate() {
                    let probe = driver.is_visible(candidate.selector());
                    match tokio::time::timeout(per_check, probe).await {
                        Ok(Ok(true)) => return Ok(Some(index)),
                        Ok(Ok(false)) => {}
                        Ok(Err(e)) if e.is_session_closed() => return Err(e),
                        Ok(Err(e)) => debug!(candidate = %candidate, error = %e, "candidate check failed"),
                        Err(_) => debug!(candidate = %candidate, "candidate check overran"),
                    }
                }
                Ok::<_, ProbeError>(None)
            })
            .await;

        match hit {
            Some(index) => {
                debug!(
                    index,
                    locator = %self.candidates[index],
                    attempts = outcome.attempts,
                    "resolved candidate"
                );
                Resolution::Found {
                    index,
                    locator: self.candidates[index].clone(),
                }
            }
            None => match outcome.session_closed {
                Some(message) => Resolution::SessionClosed { message },
                None => Resolution::NotFound {
                    tried: self.candidates.iter().map(Locator::describe).collect(),
                },
            },
        }
    }

    /// Resolve and require a match.
    ///
    /// # Errors
    ///
    /// [`ProbeError::NotFound`] when no candidate became visible in time,
    /// [`ProbeError::SessionClosed`] when the browser went away.
    pub async fn require<D: PortalDriver + ?Sized>(&self, driver: &D) -> ProbeResult<Locator> {
        self.resolve(driver).await.into_result()
    }
}
