//! Modal overlays.

use crate::driver::PortalDriver;
use crate::fallback::{Escalation, EscalationReport};
use crate::locator::Locator;
use crate::poll::{is_visible_within, require, Condition, PollOptions};
use crate::result::ProbeResult;

/// An overlay panel that must be dismissed before the page underneath is usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modal {
    root: Locator,
    close: Locator,
}

impl Modal {
    /// Modal rendered at `root`, closed by `close`
    #[must_use]
    pub const fn new(root: Locator, close: Locator) -> Self {
        Self { root, close }
    }

    /// Bootstrap-style modal: `.modal.show` with a `.btn-close` button
    #[must_use]
    pub fn bootstrap(name: &str) -> Self {
        Self::new(
            Locator::new(".modal.show").named(format!("{name} modal")),
            Locator::new(".modal.show .btn-close").named(format!("{name} modal close button")),
        )
    }

    /// The modal container
    #[must_use]
    pub const fn root(&self) -> &Locator {
        &self.root
    }

    /// The close button
    #[must_use]
    pub const fn close_button(&self) -> &Locator {
        &self.close
    }

    /// Whether the modal is (or becomes) open within `options`
    pub async fn is_open<D: PortalDriver + ?Sized>(&self, driver: &D, options: &PollOptions) -> bool {
        is_visible_within(driver, &self.root, options).await
    }

    /// Wait for the modal to open
    pub async fn wait_open<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        options: &PollOptions,
    ) -> ProbeResult<()> {
        require(driver, &Condition::Visible(self.root.clone()), options).await?;
        Ok(())
    }

    /// Wait for the modal to close
    pub async fn wait_closed<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        options: &PollOptions,
    ) -> ProbeResult<()> {
        require(driver, &Condition::Hidden(self.root.clone()), options).await?;
        Ok(())
    }

    /// Click `trigger`, escalating until the modal is open
    pub async fn open_with<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        trigger: &Locator,
        options: &PollOptions,
    ) -> ProbeResult<EscalationReport> {
        Escalation::click_until(trigger, Condition::Visible(self.root.clone()))
            .verify_with(*options)
            .run(driver)
            .await
    }

    /// Close the modal: close button, forced close, then Escape.
    ///
    /// Does nothing when the modal is already closed.
    pub async fn dismiss<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        options: &PollOptions,
    ) -> ProbeResult<EscalationReport> {
        Escalation::dismiss(&self.close, Condition::Hidden(self.root.clone()))
            .verify_with(*options)
            .run(driver)
            .await
    }

    /// Click a submit button inside the modal, escalating until it closes
    pub async fn submit<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        button: &Locator,
        options: &PollOptions,
    ) -> ProbeResult<EscalationReport> {
        Escalation::click_until(button, Condition::Hidden(self.root.clone()))
            .verify_with(*options)
            .check_before(false)
            .run(driver)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{ClickMode, MockDriver, MockEffect, MockElement, MockTrigger};
    use crate::locator::Selector;
    use std::time::Duration;

    fn css(s: &str) -> Selector {
        Selector::css(s)
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_with_waits_for_animation() {
        let driver = MockDriver::new()
            .with_element(css("#add"), MockElement::visible())
            .on(
                MockTrigger::AnyClick(css("#add")),
                MockEffect::ShowAfter(css(".modal.show"), Duration::from_millis(350)),
            );
        let modal = Modal::bootstrap("Add User");
        let report = modal
            .open_with(&driver, &Locator::new("#add"), &PollOptions::quick())
            .await
            .unwrap();
        assert_eq!(report.index, Some(0));
        assert!(modal.is_open(&driver, &PollOptions::quick()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_when_closed_is_noop() {
        let driver = MockDriver::new();
        let report = Modal::bootstrap("x")
            .dismiss(&driver, &PollOptions::quick())
            .await
            .unwrap();
        assert!(report.was_already_satisfied());
        assert!(driver.history().iter().all(|c| c.starts_with("is_visible")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_uses_close_button() {
        let driver = MockDriver::new()
            .with_element(css(".modal.show"), MockElement::visible())
            .with_element(css(".modal.show .btn-close"), MockElement::visible())
            .on(
                MockTrigger::Click(css(".modal.show .btn-close"), ClickMode::Normal),
                MockEffect::Hide(css(".modal.show")),
            );
        let modal = Modal::bootstrap("x");
        modal.dismiss(&driver, &PollOptions::quick()).await.unwrap();
        modal.wait_closed(&driver, &PollOptions::quick()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_open_times_out() {
        let driver = MockDriver::new();
        let err = Modal::bootstrap("Add Server")
            .wait_open(&driver, &PollOptions::quick())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("Add Server modal"));
    }
}
