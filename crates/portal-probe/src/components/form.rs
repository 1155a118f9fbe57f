//! Form filling.
//!
//! A [`Form`] knows each of its fields by a logical name and holds several
//! candidate locators per field (the `name` attribute, an id, the label, the
//! placeholder), resolved best-of-N at fill time. Test data is a
//! [`FormPayload`]: field name to value, filled in insertion order.

use crate::driver::PortalDriver;
use crate::locator::{Locator, Selector};
use crate::poll::PollOptions;
use crate::resolve::FirstMatch;
use crate::result::{ProbeError, ProbeResult};
use serde::Serialize;
use tracing::debug;

/// Ordered field values for one form submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormPayload {
    fields: Vec<(String, String)>,
}

impl FormPayload {
    /// Empty payload
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field value
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a field value in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Value for a field
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = Self::new();
        for (k, v) in iter {
            payload.insert(k, v);
        }
        payload
    }
}

/// How a field takes its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Text input or textarea
    Text,
    /// Native `<select>`, chosen by visible label
    Select,
}

/// One logical form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    name: String,
    kind: FieldKind,
    candidates: Vec<Locator>,
}

impl FormField {
    /// Text field found by `name`/`id` attribute, then by `label` and `placeholder`
    #[must_use]
    pub fn text(name: &str, label: &str) -> Self {
        Self::with_candidates(name, FieldKind::Text, standard_candidates(name, label, "input, textarea"))
    }

    /// Native select found the same way
    #[must_use]
    pub fn select(name: &str, label: &str) -> Self {
        Self::with_candidates(name, FieldKind::Select, standard_candidates(name, label, "select"))
    }

    /// Field with explicit candidates, highest priority first
    #[must_use]
    pub fn with_candidates(name: &str, kind: FieldKind, candidates: Vec<Locator>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            candidates,
        }
    }

    /// Logical name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field kind
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Candidate locators
    #[must_use]
    pub fn candidates(&self) -> &[Locator] {
        &self.candidates
    }
}

/// Structural selectors first, text-based ones last
fn standard_candidates(name: &str, label: &str, tags: &str) -> Vec<Locator> {
    let structural = tags
        .split(", ")
        .map(|tag| format!("{tag}[name='{name}']"))
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        Locator::new(structural),
        Locator::new(format!("#{name}")),
        Locator::from_selector(Selector::label(label)),
        Locator::from_selector(Selector::placeholder(label)),
    ]
}

/// A set of fields filled together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<FormField>,
}

impl Form {
    /// Empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    #[must_use]
    pub fn with(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field by logical name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fill every payload field, in payload order.
    ///
    /// # Errors
    ///
    /// A configuration error for a payload field the form does not declare,
    /// [`ProbeError::NotFound`] when no candidate for a field is visible, or
    /// the driver error from filling it.
    pub async fn fill<D: PortalDriver + ?Sized>(
        &self,
        driver: &D,
        payload: &FormPayload,
        options: &PollOptions,
    ) -> ProbeResult<()> {
        for (name, value) in payload.iter() {
            let field = self
                .field(name)
                .ok_or_else(|| ProbeError::config(format!("form has no field named '{name}'")))?;
            let target = FirstMatch::new(field.candidates.iter().cloned())
                .with_options(*options)
                .require(driver)
                .await?;
            debug!(field = name, locator = %target, "filling field");
            match field.kind {
                FieldKind::Text => driver.fill(target.selector(), value).await?,
                FieldKind::Select => driver.select_option(target.selector(), value).await?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockElement};

    fn user_form() -> Form {
        Form::new()
            .with(FormField::text("name", "Full Name"))
            .with(FormField::text("email", "Email"))
            .with(FormField::select("role", "Role"))
    }

    mod payload_tests {
        use super::*;

        #[test]
        fn test_insert_replaces_and_keeps_order() {
            let payload = FormPayload::new()
                .field("name", "Ada")
                .field("email", "ada@x.test")
                .field("name", "Ada L.");
            let fields: Vec<_> = payload.iter().collect();
            assert_eq!(fields, vec![("name", "Ada L."), ("email", "ada@x.test")]);
            assert_eq!(payload.get("email"), Some("ada@x.test"));
            assert_eq!(payload.len(), 2);
        }

        #[test]
        fn test_collect_from_pairs() {
            let payload: FormPayload = [("a", "1"), ("b", "2")].into_iter().collect();
            assert!(!payload.is_empty());
            assert_eq!(payload.get("b"), Some("2"));
        }
    }

    mod fill_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_fill_uses_best_candidate_per_field() {
            let driver = MockDriver::new()
                .with_element(
                    Selector::css("input[name='name'], textarea[name='name']"),
                    MockElement::visible(),
                )
                .with_element(Selector::label("Email"), MockElement::visible())
                .with_element(
                    Selector::css("#role"),
                    MockElement::visible().with_texts(["Admin", "Viewer"]),
                );

            let payload = FormPayload::new()
                .field("name", "Ada")
                .field("email", "ada@x.test")
                .field("role", "Viewer");
            user_form().fill(&driver, &payload, &PollOptions::quick()).await.unwrap();

            assert_eq!(
                driver
                    .element_value(&Selector::css("input[name='name'], textarea[name='name']"))
                    .as_deref(),
                Some("Ada")
            );
            assert_eq!(driver.element_value(&Selector::label("Email")).as_deref(), Some("ada@x.test"));
            assert_eq!(driver.element_value(&Selector::css("#role")).as_deref(), Some("Viewer"));

            let fills: Vec<String> = driver
                .history()
                .into_iter()
                .filter(|c| c.starts_with("fill:") || c.starts_with("select:"))
                .collect();
            assert_eq!(fills.len(), 3);
            assert!(fills[0].ends_with("=Ada"));
            assert!(fills[2].starts_with("select:"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_unknown_field_is_named() {
            let driver = MockDriver::new();
            let payload = FormPayload::new().field("nickname", "x");
            let err = user_form()
                .fill(&driver, &payload, &PollOptions::quick())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("'nickname'"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_field_lists_candidates() {
            let driver = MockDriver::new();
            let payload = FormPayload::new().field("email", "x");
            match user_form().fill(&driver, &payload, &PollOptions::quick()).await {
                Err(ProbeError::NotFound { tried }) => {
                    assert_eq!(tried.len(), 4);
                    assert_eq!(tried[2], "label 'Email'");
                }
                other => panic!("expected NotFound, got {other:?}"),
            }
        }
    }
}
