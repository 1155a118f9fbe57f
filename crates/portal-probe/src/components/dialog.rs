//! The "Add record" flow shared by the admin screens: click an add button,
//! wait for the modal, fill its form, save, and catch the confirmation toast.

use crate::components::{Form, FormPayload, Modal, Toast};
use crate::config::TimingConfig;
use crate::driver::PortalDriver;
use crate::fallback::EscalationReport;
use crate::locator::Locator;
use crate::resolve::FirstMatch;
use crate::result::ProbeResult;
use serde::Serialize;
use tracing::info;

/// What happened when a record was submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    /// Strategy that closed the modal on save
    pub saved_with: Option<String>,
    /// Toast text, when it was caught before it dismissed itself
    pub toast: Option<String>,
}

/// Add button, modal form and save button for one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddDialog {
    add_button: Vec<Locator>,
    modal: Modal,
    form: Form,
    save_button: Vec<Locator>,
    toast: Toast,
}

impl AddDialog {
    /// Dialog opened by any of `add_button` (priority order) and saved by any
    /// of `save_button`
    #[must_use]
    pub fn new(add_button: Vec<Locator>, modal: Modal, form: Form, save_button: Vec<Locator>) -> Self {
        Self {
            add_button,
            modal,
            form,
            save_button,
            toast: Toast::default(),
        }
    }

    /// Use a different toast container
    #[must_use]
    pub fn with_toast(mut self, toast: Toast) -> Self {
        self.toast = toast;
        self
    }

    /// The modal
    #[must_use]
    pub const fn modal(&self) -> &Modal {
        &self.modal
    }

    /// The form inside the modal
    #[must_use]
    pub const fn form(&self) -> &Form {
        &self.form
    }

    /// Open the modal from the add button
    pub async fn open<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        timings: &TimingConfig,
    ) -> ProbeResult<EscalationReport> {
        let button = FirstMatch::new(self.add_button.iter().cloned())
            .with_options(timings.resolve)
            .require(driver)
            .await?;
        self.modal.open_with(driver, &button, &timings.modal).await
    }

    /// Fill the open modal's form and save it
    pub async fn submit<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        payload: &FormPayload,
        timings: &TimingConfig,
    ) -> ProbeResult<AddOutcome> {
        self.form.fill(driver, payload, &timings.resolve).await?;
        let save = FirstMatch::new(self.save_button.iter().cloned())
            .with_options(timings.resolve)
            .require(driver)
            .await?;
        let report = self.modal.submit(driver, &save, &timings.modal).await?;
        let toast = self
            .toast
            .capture(driver, timings.toast_attempts, timings.toast_interval())
            .await;
        info!(saved_with = ?report.succeeded_with, toast = ?toast, "record submitted");
        Ok(AddOutcome {
            saved_with: report.succeeded_with,
            toast,
        })
    }

    /// Open, fill and save in one go
    pub async fn add<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        payload: &FormPayload,
        timings: &TimingConfig,
    ) -> ProbeResult<AddOutcome> {
        self.open(driver, timings).await?;
        self.submit(driver, payload, timings).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::components::FormField;
    use crate::driver::{MockDriver, MockEffect, MockElement, MockTrigger};
    use crate::locator::Selector;
    use crate::result::ProbeError;
    use std::time::Duration;

    fn dialog() -> AddDialog {
        AddDialog::new(
            vec![Locator::new("#add-btn"), Locator::from_selector(Selector::role("button", "Add"))],
            Modal::bootstrap("Add"),
            Form::new().with(FormField::text("name", "Name")),
            vec![Locator::new(".modal.show button[type='submit']")],
        )
        .with_toast(Toast::new(Locator::new(".toast")))
    }

    fn page() -> MockDriver {
        MockDriver::new()
            .with_element(Selector::role("button", "Add"), MockElement::visible())
            .with_element(Selector::css(".modal.show button[type='submit']"), MockElement::visible())
            .with_element(Selector::css("#name"), MockElement::visible())
            .on(
                MockTrigger::AnyClick(Selector::role("button", "Add")),
                MockEffect::Show(Selector::css(".modal.show")),
            )
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_happy_path() {
        let save = Selector::css(".modal.show button[type='submit']");
        let driver = page()
            .on(MockTrigger::AnyClick(save.clone()), MockEffect::Hide(Selector::css(".modal.show")))
            .on(
                MockTrigger::AnyClick(save.clone()),
                MockEffect::ShowFor(Selector::css(".toast"), Duration::from_millis(1_200)),
            )
            .on(MockTrigger::AnyClick(save), MockEffect::SetText(Selector::css(".toast"), "Saved".into()));

        let outcome = dialog()
            .add(&driver, &FormPayload::new().field("name", "edge-01"), &TimingConfig::default())
            .await
            .unwrap();
        assert_eq!(outcome.saved_with.as_deref(), Some("click"));
        assert_eq!(outcome.toast.as_deref(), Some("Saved"));
        assert_eq!(driver.element_value(&Selector::css("#name")).as_deref(), Some("edge-01"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_save_reports_every_strategy() {
        let driver = page();
        let timings = TimingConfig::default();
        dialog().open(&driver, &timings).await.unwrap();
        let err = dialog()
            .submit(&driver, &FormPayload::new().field("name", ""), &timings)
            .await
            .unwrap_err();
        match err {
            ProbeError::ActionFailed { attempts, .. } => assert_eq!(attempts.len(), 3),
            other => panic!("expected ActionFailed, got {other:?}"),
        }
        assert!(driver.was_called("click:script"));
        assert!(!driver.was_called("click:normal:css `#add-btn`"));
    }
}
