//! Auto-dismissing toast notifications.
//!
//! A toast is on screen for a second or two. Reading it is a race, so
//! [`Toast::capture`] makes a fixed number of quick reads instead of one long
//! wait, and gives up quietly when the banner was missed.

use crate::driver::PortalDriver;
use crate::locator::Locator;
use crate::poll::{bounded, PollOptions, Poller, DEFAULT_CHECK_TIMEOUT_MS};
use crate::result::{ProbeError, ProbeResult};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest a single toast read may take
const READ_TIMEOUT: Duration = Duration::from_millis(DEFAULT_CHECK_TIMEOUT_MS);

/// A transient notification banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    container: Locator,
}

impl Default for Toast {
    fn default() -> Self {
        Self::new(Locator::new(".toast.show, .Toastify__toast, [role='alert']").named("toast"))
    }
}

impl Toast {
    /// Toast rendered at `container`
    #[must_use]
    pub const fn new(container: Locator) -> Self {
        Self { container }
    }

    /// The toast container
    #[must_use]
    pub const fn container(&self) -> &Locator {
        &self.container
    }

    /// Read the toast text, trying up to `attempts` times `interval` apart.
    ///
    /// Returns `None` when no non-empty text was seen. Read errors and reads
    /// that hang count as a miss; a closed session ends the attempts early.
    pub async fn capture<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        attempts: usize,
        interval: Duration,
    ) -> Option<String> {
        for attempt in 1..=attempts.max(1) {
            let read = driver.text_content(self.container.selector());
            match bounded(READ_TIMEOUT, "toast text", read).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    debug!(attempt, %text, "captured toast");
                    return Some(text.trim().to_string());
                }
                Ok(_) => {}
                Err(e) if e.is_session_closed() => {
                    warn!(attempt, error = %e, "session closed while reading toast");
                    return None;
                }
                Err(e) => debug!(attempt, error = %e, "toast read failed"),
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }
        debug!(attempts, "toast not seen");
        None
    }

    /// Wait until a toast containing `expected` is shown and return its text.
    ///
    /// # Errors
    ///
    /// A timeout when no matching toast appears within `options`, or
    /// [`ProbeError::SessionClosed`] when the page goes away first.
    pub async fn wait_for_text<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        expected: &str,
        options: &PollOptions,
    ) -> ProbeResult<String> {
        let (text, outcome) = Poller::new(*options)
            .find(|| async move {
                let text = driver.text_content(self.container.selector()).await?;
                Ok::<_, ProbeError>(text.filter(|t| t.contains(expected)))
            })
            .await;
        text.ok_or_else(|| {
            outcome.failure(format!("{} containing '{expected}'", self.container))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{ClickMode, MockDriver, MockEffect, MockElement, MockTrigger};
    use crate::locator::Selector;

    fn toast() -> Toast {
        Toast::new(Locator::new(".toast"))
    }

    fn saving_page() -> MockDriver {
        MockDriver::new()
            .with_element(Selector::css("#save"), MockElement::visible())
            .on(
                MockTrigger::AnyClick(Selector::css("#save")),
                MockEffect::ShowFor(Selector::css(".toast"), Duration::from_millis(1_500)),
            )
            .on(
                MockTrigger::AnyClick(Selector::css("#save")),
                MockEffect::SetText(Selector::css(".toast"), "User created successfully".into()),
            )
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_reads_live_toast() {
        let driver = saving_page();
        driver.click(&Selector::css("#save"), ClickMode::Normal).await.unwrap();
        let text = toast().capture(&driver, 10, Duration::from_millis(150)).await;
        assert_eq!(text.as_deref(), Some("User created successfully"));
        assert_eq!(driver.call_count("text:"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_missed_toast_is_none() {
        let driver = saving_page();
        driver.click(&Selector::css("#save"), ClickMode::Normal).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let started = tokio::time::Instant::now();
        let text = toast().capture(&driver, 10, Duration::from_millis(150)).await;
        assert!(text.is_none());
        assert_eq!(driver.call_count("text:"), 10);
        assert_eq!(started.elapsed(), Duration::from_millis(1_350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_tolerates_read_errors() {
        let driver = saving_page();
        driver.click(&Selector::css("#save"), ClickMode::Normal).await.unwrap();
        driver.fail_next("text:", "element detached");
        let text = toast().capture(&driver, 3, Duration::from_millis(100)).await;
        assert!(text.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_text() {
        let driver = saving_page();
        driver.click(&Selector::css("#save"), ClickMode::Normal).await.unwrap();
        let text = toast()
            .wait_for_text(&driver, "created", &PollOptions::quick())
            .await
            .unwrap();
        assert!(text.contains("created"));

        let err = toast()
            .wait_for_text(&driver, "deleted", &PollOptions::quick())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_gives_up_on_hung_reads() {
        let driver = saving_page();
        driver.click(&Selector::css("#save"), ClickMode::Normal).await.unwrap();
        driver.stall("text:");

        let started = tokio::time::Instant::now();
        let text = tokio::time::timeout(
            Duration::from_secs(600),
            toast().capture(&driver, 3, Duration::from_millis(150)),
        )
        .await
        .expect("capture must not hang");
        assert!(text.is_none());
        assert_eq!(driver.call_count("text:"), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(3 * 1_000 + 2 * 150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_stops_when_session_closes() {
        let driver = saving_page();
        driver.close().await.unwrap();
        let text = toast().capture(&driver, 10, Duration::from_millis(150)).await;
        assert!(text.is_none());
        assert_eq!(driver.call_count("text:"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_text_on_closed_session() {
        let driver = saving_page();
        driver.close().await.unwrap();
        let err = toast()
            .wait_for_text(&driver, "created", &PollOptions::patient())
            .await
            .unwrap_err();
        assert!(err.is_session_closed(), "{err}");
        assert!(!err.is_timeout());
    }
}
