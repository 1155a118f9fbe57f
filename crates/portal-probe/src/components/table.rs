//! Data tables listing portal records.

use crate::driver::PortalDriver;
use crate::locator::{Locator, Selector};
use crate::poll::{bounded, PollOptions, Poller};
use crate::result::{ProbeError, ProbeResult};
use serde::Serialize;
use tracing::debug;

/// What a row search observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableProbe {
    /// A row containing the text was rendered
    pub visible: bool,
    /// Number of body rows at the last check
    pub row_count: usize,
}

/// A `<table>` with a header row and body rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTable {
    root: Locator,
    rows: Selector,
    headers: Selector,
}

impl DataTable {
    /// Table rendered at the CSS selector `root`
    #[must_use]
    pub fn new(root: &str) -> Self {
        Self {
            root: Locator::new(root).named("table"),
            rows: Selector::css(format!("{root} tbody tr")),
            headers: Selector::css(format!("{root} thead th")),
        }
    }

    /// The table element
    #[must_use]
    pub const fn root(&self) -> &Locator {
        &self.root
    }

    /// Number of body rows
    pub async fn row_count<D: PortalDriver + ?Sized>(&self, driver: &D) -> ProbeResult<usize> {
        driver.count(&self.rows).await
    }

    /// Text of every body row
    pub async fn rows<D: PortalDriver + ?Sized>(&self, driver: &D) -> ProbeResult<Vec<String>> {
        driver.all_texts(&self.rows).await
    }

    /// Column headers
    pub async fn header_texts<D: PortalDriver + ?Sized>(&self, driver: &D) -> ProbeResult<Vec<String>> {
        driver.all_texts(&self.headers).await
    }

    /// Whether some row contains `text` right now
    pub async fn contains_row<D: PortalDriver + ?Sized>(&self, driver: &D, text: &str) -> bool {
        self.rows(driver)
            .await
            .is_ok_and(|rows| rows.iter().any(|r| r.contains(text)))
    }

    /// Poll until a row containing `text` shows up.
    ///
    /// Never errors; a row that never appears is reported as
    /// `visible: false` together with the last row count seen.
    pub async fn wait_for_row<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        text: &str,
        options: &PollOptions,
    ) -> TableProbe {
        let (hit, outcome) = Poller::new(*options)
            .find(|| async move {
                let rows = self.rows(driver).await?;
                let count = rows.len();
                Ok::<_, ProbeError>(rows.iter().any(|r| r.contains(text)).then_some(count))
            })
            .await;

        let row_count = match hit {
            Some(count) => count,
            None if outcome.is_session_closed() => 0,
            None => bounded(options.check_timeout(), "row count", self.row_count(driver))
                .await
                .unwrap_or(0),
        };
        debug!(text, visible = hit.is_some(), row_count, attempts = outcome.attempts, "row search finished");
        TableProbe {
            visible: hit.is_some(),
            row_count,
        }
    }
}
