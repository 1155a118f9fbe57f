//! Custom dropdown menus.
//!
//! These are script-driven menus (toggle button plus a list of items), not
//! native `<select>` elements; native selects go through
//! [`PortalDriver::select_option`]. Menus expand with an animation and the
//! toggle sometimes ignores the first click, so opening escalates.

use crate::driver::{ClickMode, PortalDriver};
use crate::fallback::{Escalation, EscalationReport, Strategy};
use crate::locator::{Locator, Selector};
use crate::poll::{is_visible_within, require, Condition, PollOptions};
use crate::result::ProbeResult;
use tracing::debug;

/// A toggle button with an expandable menu of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropdown {
    trigger: Locator,
    menu: Locator,
    item_css: String,
}

impl Dropdown {
    /// Dropdown toggled by `trigger`, expanding `menu`, with items at `item_css`
    #[must_use]
    pub fn new(trigger: Locator, menu: Locator, item_css: impl Into<String>) -> Self {
        Self {
            trigger,
            menu,
            item_css: item_css.into(),
        }
    }

    /// Bootstrap markup inside `container` (a CSS selector)
    #[must_use]
    pub fn bootstrap(container: &str) -> Self {
        Self::new(
            Locator::new(format!("{container} .dropdown-toggle")),
            Locator::new(format!("{container} .dropdown-menu.show")),
            format!("{container} .dropdown-menu .dropdown-item"),
        )
    }

    /// The toggle button
    #[must_use]
    pub const fn trigger(&self) -> &Locator {
        &self.trigger
    }

    /// The expanded menu
    #[must_use]
    pub const fn menu(&self) -> &Locator {
        &self.menu
    }

    /// Locator for the item labelled `text`
    #[must_use]
    pub fn item(&self, text: &str) -> Locator {
        Locator::new(self.item_css.clone()).with_text(text)
    }

    /// Whether the menu is (or becomes) expanded within `options`
    pub async fn is_open<D: PortalDriver + ?Sized>(&self, driver: &D, options: &PollOptions) -> bool {
        is_visible_within(driver, &self.menu, options).await
    }

    /// Expand the menu, escalating the toggle click until it shows
    pub async fn open<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        options: &PollOptions,
    ) -> ProbeResult<EscalationReport> {
        Escalation::click_until(&self.trigger, Condition::Visible(self.menu.clone()))
            .verify_with(*options)
            .run(driver)
            .await
    }

    /// Collapse the menu: toggle again, then Escape. No-op when collapsed.
    pub async fn close<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        options: &PollOptions,
    ) -> ProbeResult<EscalationReport> {
        Escalation::new("close dropdown", Condition::Hidden(self.menu.clone()))
            .then(Strategy::Click(self.trigger.clone()))
            .then(Strategy::PressKey("Escape".into()))
            .verify_with(*options)
            .run(driver)
            .await
    }

    /// Item labels currently rendered
    pub async fn options<D: PortalDriver + ?Sized>(&self, driver: &D) -> ProbeResult<Vec<String>> {
        driver.all_texts(&Selector::css(self.item_css.clone())).await
    }

    /// Expand the menu and click the item labelled `text`
    pub async fn select<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        text: &str,
        options: &PollOptions,
    ) -> ProbeResult<()> {
        self.open(driver, options).await?;
        self.click_item(driver, text, options).await
    }

    /// Pick several items from a menu that stays open (checkbox lists), then
    /// collapse it
    pub async fn select_many<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        texts: &[&str],
        options: &PollOptions,
    ) -> ProbeResult<()> {
        for text in texts {
            // Some menus collapse after every pick
            self.open(driver, options).await?;
            self.click_item(driver, text, options).await?;
        }
        self.close(driver, options).await?;
        Ok(())
    }

    async fn click_item<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        text: &str,
        options: &PollOptions,
    ) -> ProbeResult<()> {
        let item = self.item(text);
        require(driver, &Condition::Visible(item.clone()), options).await?;
        debug!(item = %item, "selecting dropdown item");
        driver.click(item.selector(), ClickMode::Normal).await
    }
}
