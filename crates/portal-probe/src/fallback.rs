//! Action-then-verify with escalating fallbacks.
//!
//! Some clicks cannot be confirmed synchronously: the button starts an
//! animation, an overlay swallows the pointer event, or the element is not
//! interactive yet. An [`Escalation`] performs an action, polls for the state
//! it should produce, and if that state never shows up tries the next, more
//! forceful strategy. Strategies must be safe to repeat against the same
//! element; the chain stops at the first one whose effect is observed.

use crate::driver::{ClickMode, PortalDriver};
use crate::locator::Locator;
use crate::poll::{bounded, wait_for, Condition, PollOptions};
use crate::result::{AttemptFailure, ProbeError, ProbeResult};
use std::fmt;
use tracing::{debug, info, warn};

/// One way of performing an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Real pointer click
    Click(Locator),
    /// Synthesized pointer events, skipping actionability
    ForceClick(Locator),
    /// `element.click()` from page script
    ScriptClick(Locator),
    /// Keyboard key on the focused element
    PressKey(String),
    /// Replace an input's value
    Fill(Locator, String),
}

impl Strategy {
    /// Short name for reports
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Click(_) => "click".into(),
            Self::ForceClick(_) => "force-click".into(),
            Self::ScriptClick(_) => "script-click".into(),
            Self::PressKey(key) => format!("press {key}"),
            Self::Fill(_, _) => "fill".into(),
        }
    }

    /// Perform the action once
    pub async fn perform<D: PortalDriver + ?Sized>(&self, driver: &D) -> ProbeResult<()> {
        match self {
            Self::Click(loc) => driver.click(loc.selector(), ClickMode::Normal).await,
            Self::ForceClick(loc) => driver.click(loc.selector(), ClickMode::Force).await,
            Self::ScriptClick(loc) => driver.click(loc.selector(), ClickMode::Script).await,
            Self::PressKey(key) => driver.press_key(key).await,
            Self::Fill(loc, value) => driver.fill(loc.selector(), value).await,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click(loc) | Self::ForceClick(loc) | Self::ScriptClick(loc) => {
                write!(f, "{} {loc}", self.name())
            }
            Self::PressKey(_) => f.write_str(&self.name()),
            Self::Fill(loc, _) => write!(f, "fill {loc}"),
        }
    }
}

/// How an escalation succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationReport {
    /// Strategy whose effect was observed; `None` when the state already held
    pub succeeded_with: Option<String>,
    /// Zero-based index of that strategy
    pub index: Option<usize>,
    /// Strategies tried before it, with their failure reasons
    pub failed: Vec<AttemptFailure>,
}

impl EscalationReport {
    /// Whether the expected state was already there before acting
    #[must_use]
    pub const fn was_already_satisfied(&self) -> bool {
        self.succeeded_with.is_none()
    }
}

/// An action with an expected post-condition and ordered fallbacks
#[derive(Debug, Clone)]
pub struct Escalation {
    action: String,
    strategies: Vec<Strategy>,
    expect: Condition,
    verify: PollOptions,
    check_before: bool,
}

impl Escalation {
    /// Create an escalation expecting `expect` after any strategy succeeds
    #[must_use]
    pub fn new(action: impl Into<String>, expect: Condition) -> Self {
        Self {
            action: action.into(),
            strategies: Vec::new(),
            expect,
            verify: PollOptions::quick(),
            check_before: true,
        }
    }

    /// Click, then force-click, then script-click until `expect` holds
    #[must_use]
    pub fn click_until(target: &Locator, expect: Condition) -> Self {
        Self::new(format!("click {target}"), expect)
            .then(Strategy::Click(target.clone()))
            .then(Strategy::ForceClick(target.clone()))
            .then(Strategy::ScriptClick(target.clone()))
    }

    /// Close button, forced close, then Escape until `expect` holds
    #[must_use]
    pub fn dismiss(close: &Locator, expect: Condition) -> Self {
        Self::new(format!("dismiss via {close}"), expect)
            .then(Strategy::Click(close.clone()))
            .then(Strategy::ForceClick(close.clone()))
            .then(Strategy::PressKey("Escape".into()))
    }

    /// Append a fallback strategy
    #[must_use]
    pub fn then(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Timing used to observe each strategy's effect
    #[must_use]
    pub const fn verify_with(mut self, options: PollOptions) -> Self {
        self.verify = options;
        self
    }

    /// Whether to skip acting when the expected state already holds
    #[must_use]
    pub const fn check_before(mut self, enabled: bool) -> Self {
        self.check_before = enabled;
        self
    }

    /// Configured strategies in order
    #[must_use]
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Run the chain.
    ///
    /// # Errors
    ///
    /// [`ProbeError::ActionFailed`] listing every strategy and its reason when
    /// none produced the expected state. A closed session aborts the chain
    /// immediately with [`ProbeError::SessionClosed`].
    pub async fn run<D: PortalDriver + ?Sized>(&self, driver: &D) -> ProbeResult<EscalationReport> {
        if self.check_before && self.already_holds(driver).await? {
            debug!(action = %self.action, "expected state already present, nothing to do");
            return Ok(EscalationReport {
                succeeded_with: None,
                index: None,
                failed: Vec::new(),
            });
        }

        let mut failed = Vec::new();
        for (index, strategy) in self.strategies.iter().enumerate() {
            debug!(action = %self.action, strategy = %strategy, "attempting");
            if let Err(e) = strategy.perform(driver).await {
                if e.is_session_closed() {
                    return Err(e);
                }
                warn!(action = %self.action, strategy = %strategy, error = %e, "strategy failed");
                failed.push(AttemptFailure::new(strategy.name(), e.to_string()));
                continue;
            }

            let outcome = wait_for(driver, &self.expect, &self.verify).await;
            if let Some(message) = outcome.session_closed {
                return Err(ProbeError::SessionClosed { message });
            }
            if outcome.satisfied {
                if index > 0 {
                    info!(action = %self.action, strategy = %strategy, "succeeded after fallback");
                }
                return Ok(EscalationReport {
                    succeeded_with: Some(strategy.name()),
                    index: Some(index),
                    failed,
                });
            }

            let observed = format!(
                "{} not observed within {}ms",
                self.expect.describe(),
                self.verify.timeout_ms
            );
            let reason = match outcome.last_error {
                Some(err) => format!("{observed} (last check error: {err})"),
                None => observed,
            };
            warn!(action = %self.action, strategy = %strategy, %reason, "no effect");
            failed.push(AttemptFailure::new(strategy.name(), reason));
        }

        Err(ProbeError::ActionFailed {
            action: self.action.clone(),
            attempts: failed,
        })
    }

    /// One bounded look at the expected state; only a closed session errors
    async fn already_holds<D: PortalDriver + ?Sized>(&self, driver: &D) -> ProbeResult<bool> {
        let what = self.expect.describe();
        match bounded(self.verify.check_timeout(), &what, self.expect.check(driver)).await {
            Ok(held) => Ok(held),
            Err(e) if e.is_session_closed() => Err(e),
            Err(e) => {
                debug!(action = %self.action, error = %e, "pre-check failed, acting anyway");
                Ok(false)
            }
        }
    }
}
