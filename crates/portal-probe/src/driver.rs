//! PortalDriver - abstract browser automation trait
//!
//! Everything above this module (pollers, escalation, page objects, journeys)
//! talks to the browser only through [`PortalDriver`]. Two implementations
//! ship with the crate:
//!
//! - `ChromiumDriver` (feature `browser`) drives Chromium over CDP.
//! - [`MockDriver`] is a scriptable in-memory page used by the unit and journey
//!   tests. It records every call so tests can verify call order.

use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// How forcefully a click is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickMode {
    /// Real pointer click at the element centre; overlays can intercept it
    Normal,
    /// Synthesized pointer events dispatched straight to the element
    Force,
    /// `element.click()` from page script
    Script,
}

impl ClickMode {
    /// Short name used in call logs and diagnostics
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Force => "force",
            Self::Script => "script",
        }
    }
}

impl fmt::Display for ClickMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser configuration for driver
#[derive(Debug, Clone, Serialize)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Timeout for navigation
    pub navigation_timeout: Duration,
    /// Executable path override
    pub executable_path: Option<String>,
    /// Disable the Chromium sandbox (containers)
    pub no_sandbox: bool,
    /// Where downloads are saved; the browser default when unset
    pub download_dir: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            navigation_timeout: Duration::from_secs(30),
            executable_path: None,
            no_sandbox: false,
            download_dir: None,
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Set the Chromium executable
    #[must_use]
    pub fn executable_path(mut self, path: impl Into<String>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Save downloads under `dir`
    #[must_use]
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Disable the sandbox
    #[must_use]
    pub const fn no_sandbox(mut self, no_sandbox: bool) -> Self {
        self.no_sandbox = no_sandbox;
        self
    }
}

// =============================================================================
// BROWSER EVENTS
// =============================================================================

/// A file download started by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
    /// URL the download came from
    pub url: String,
    /// Suggested filename
    pub suggested_filename: String,
}

impl Download {
    /// Create a download record
    #[must_use]
    pub fn new(url: impl Into<String>, suggested_filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            suggested_filename: suggested_filename.into(),
        }
    }
}

/// Browser-level event that never shows up in the DOM
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BrowserEvent {
    /// A file download began
    Download(Download),
    /// The page opened a new tab or popup window
    Popup {
        /// URL the new window was opened with
        url: String,
    },
}

/// Abstract driver trait for browser automation.
///
/// Query methods report "nothing matched" as `Ok(false)`, `Ok(0)` or
/// `Ok(None)`. `Err` means the driver itself failed (detached element, page
/// gone, script error); callers that only want a yes/no answer go through the
/// pollers, which fold those errors into "not yet".
#[async_trait]
pub trait PortalDriver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&self, url: &str) -> ProbeResult<()>;

    /// Get current URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Reload page
    async fn reload(&self) -> ProbeResult<()>;

    /// Whether any element matching the selector is rendered and on screen
    async fn is_visible(&self, selector: &Selector) -> ProbeResult<bool>;

    /// Whether the first match exists and is not disabled
    async fn is_enabled(&self, selector: &Selector) -> ProbeResult<bool>;

    /// Number of matching elements
    async fn count(&self, selector: &Selector) -> ProbeResult<usize>;

    /// Trimmed text of the first match
    async fn text_content(&self, selector: &Selector) -> ProbeResult<Option<String>>;

    /// Trimmed text of every match, in document order
    async fn all_texts(&self, selector: &Selector) -> ProbeResult<Vec<String>>;

    /// Current value of the first matching form control
    async fn input_value(&self, selector: &Selector) -> ProbeResult<Option<String>>;

    /// Click the first match
    async fn click(&self, selector: &Selector, mode: ClickMode) -> ProbeResult<()>;

    /// Replace the value of the first matching input
    async fn fill(&self, selector: &Selector, value: &str) -> ProbeResult<()>;

    /// Choose an option (by visible label) in the first matching `<select>`
    async fn select_option(&self, selector: &Selector, label: &str) -> ProbeResult<()>;

    /// Press a key on the focused element (e.g. `Escape`, `Enter`)
    async fn press_key(&self, key: &str) -> ProbeResult<()>;

    /// Execute JavaScript in page context
    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value>;

    /// Take a PNG screenshot of the viewport
    async fn screenshot(&self) -> ProbeResult<Vec<u8>>;

    /// Drain the downloads and popups raised since the previous call
    async fn take_events(&self) -> ProbeResult<Vec<BrowserEvent>>;

    /// Close the page
    async fn close(&self) -> ProbeResult<()>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Element state inside [`MockDriver`]
#[derive(Debug, Clone)]
pub struct MockElement {
    /// Rendered right now (unless a time window says otherwise)
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
    /// Text of each match; its length is the match count when non-empty
    pub texts: Vec<String>,
    /// Current form value
    pub value: String,
    /// Becomes visible at this instant
    pub visible_from: Option<Instant>,
    /// Stops being visible at this instant
    pub visible_until: Option<Instant>,
}

impl MockElement {
    /// A visible, enabled element
    #[must_use]
    pub const fn visible() -> Self {
        Self {
            visible: true,
            enabled: true,
            texts: Vec::new(),
            value: String::new(),
            visible_from: None,
            visible_until: None,
        }
    }

    /// An attached but hidden element
    #[must_use]
    pub fn hidden() -> Self {
        let mut el = Self::visible();
        el.visible = false;
        el
    }

    /// Set the text of a single match
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.texts = vec![text.into()];
        self
    }

    /// Set one text per match (table rows, option lists)
    #[must_use]
    pub fn with_texts<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.texts = texts.into_iter().map(Into::into).collect();
        self
    }

    /// Mark disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn visible_at(&self, now: Instant) -> bool {
        let started = self.visible_from.map_or(self.visible, |t| now >= t);
        let ended = self.visible_until.is_some_and(|t| now >= t);
        started && !ended
    }

    fn count(&self) -> usize {
        self.texts.len().max(1)
    }
}

/// What a [`MockDriver`] action is matched against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockTrigger {
    /// A click on the selector with exactly this mode
    Click(Selector, ClickMode),
    /// A click on the selector with any mode
    AnyClick(Selector),
    /// Filling the selector
    Fill(Selector),
    /// Selecting an option in the selector
    Select(Selector),
    /// Pressing a key
    Key(String),
}

/// State change applied when a trigger fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEffect {
    /// Make visible immediately
    Show(Selector),
    /// Make visible after a delay (animations)
    ShowAfter(Selector, Duration),
    /// Make visible for a limited time (auto-dismissing toasts)
    ShowFor(Selector, Duration),
    /// Hide immediately
    Hide(Selector),
    /// Replace the text of a single-match element (creating it if needed)
    SetText(Selector, String),
    /// Append a match with this text (a new table row)
    AppendText(Selector, String),
    /// Change the current URL
    Navigate(String),
    /// Raise a browser event (download started, popup opened)
    Emit(BrowserEvent),
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    elements: HashMap<Selector, MockElement>,
    rules: Vec<(MockTrigger, MockEffect)>,
    failures: VecDeque<(String, String)>,
    js_results: VecDeque<serde_json::Value>,
    screenshot: Option<Vec<u8>>,
    history: Vec<String>,
    events: Vec<BrowserEvent>,
    stalls: Vec<String>,
    closed: bool,
}

/// Scriptable in-memory driver for unit testing
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the assertions
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Place an element on the page
    #[must_use]
    pub fn with_element(self, selector: Selector, element: MockElement) -> Self {
        self.set_element(selector, element);
        self
    }

    /// Register an effect fired by a trigger
    #[must_use]
    pub fn on(self, trigger: MockTrigger, effect: MockEffect) -> Self {
        self.when(trigger, effect);
        self
    }

    /// Start at a URL
    #[must_use]
    pub fn at_url(self, url: impl Into<String>) -> Self {
        self.state().url = url.into();
        self
    }

    /// Set or replace an element
    pub fn set_element(&self, selector: Selector, element: MockElement) {
        let _ = self.state().elements.insert(selector, element);
    }

    /// Register an effect on a driver that is already in use
    pub fn when(&self, trigger: MockTrigger, effect: MockEffect) {
        self.state().rules.push((trigger, effect));
    }

    /// Remove an element from the page
    pub fn remove_element(&self, selector: &Selector) {
        let _ = self.state().elements.remove(selector);
    }

    /// Make the next call whose log entry starts with `prefix` fail
    pub fn fail_next(&self, prefix: impl Into<String>, message: impl Into<String>) {
        self.state()
            .failures
            .push_back((prefix.into(), message.into()));
    }

    /// Make every call whose log entry starts with `prefix` hang forever
    pub fn stall(&self, prefix: impl Into<String>) {
        self.state().stalls.push(prefix.into());
    }

    /// Queue a result for [`PortalDriver::evaluate`]
    pub fn push_js_result(&self, value: serde_json::Value) {
        self.state().js_results.push_back(value);
    }

    /// Set screenshot bytes
    pub fn set_screenshot(&self, png: Vec<u8>) {
        self.state().screenshot = Some(png);
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Check if a call with this prefix was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Count calls with this prefix
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Whether the selector is visible right now (test inspection)
    #[must_use]
    pub fn element_visible(&self, selector: &Selector) -> bool {
        let now = Instant::now();
        self.state()
            .elements
            .get(selector)
            .is_some_and(|e| e.visible_at(now))
    }

    /// Value currently held by a form field (test inspection)
    #[must_use]
    pub fn element_value(&self, selector: &Selector) -> Option<String> {
        self.state().elements.get(selector).map(|e| e.value.clone())
    }

    /// Log the call, then hang on a stalled prefix or surface an injected
    /// failure or a closed session.
    async fn record(&self, entry: String) -> ProbeResult<MutexGuard<'_, MockState>> {
        let stalled = {
            let mut state = self.state();
            let stalled = state.stalls.iter().any(|p| entry.starts_with(p.as_str()));
            if stalled {
                state.history.push(entry.clone());
            }
            stalled
        };
        if stalled {
            std::future::pending::<()>().await;
        }
        let mut state = self.state();
        state.history.push(entry.clone());
        if state.closed {
            return Err(ProbeError::classify_driver_message("Target closed"));
        }
        if let Some(pos) = state
            .failures
            .iter()
            .position(|(prefix, _)| entry.starts_with(prefix.as_str()))
        {
            if let Some((_, message)) = state.failures.remove(pos) {
                return Err(ProbeError::classify_driver_message(message));
            }
        }
        Ok(state)
    }

    fn fire(state: &mut MockState, matches: impl Fn(&MockTrigger) -> bool) {
        let now = Instant::now();
        let effects: Vec<MockEffect> = state
            .rules
            .iter()
            .filter(|(t, _)| matches(t))
            .map(|(_, e)| e.clone())
            .collect();
        for effect in effects {
            match effect {
                MockEffect::Show(sel) => {
                    let el = state.elements.entry(sel).or_insert_with(MockElement::hidden);
                    el.visible = true;
                    el.visible_from = None;
                    el.visible_until = None;
                }
                MockEffect::ShowAfter(sel, delay) => {
                    let el = state.elements.entry(sel).or_insert_with(MockElement::hidden);
                    el.visible_from = Some(now + delay);
                    el.visible_until = None;
                }
                MockEffect::ShowFor(sel, lifetime) => {
                    let el = state.elements.entry(sel).or_insert_with(MockElement::hidden);
                    el.visible = true;
                    el.visible_from = None;
                    el.visible_until = Some(now + lifetime);
                }
                MockEffect::Hide(sel) => {
                    if let Some(el) = state.elements.get_mut(&sel) {
                        el.visible = false;
                        el.visible_from = None;
                        el.visible_until = None;
                    }
                }
                MockEffect::SetText(sel, text) => {
                    let el = state.elements.entry(sel).or_insert_with(MockElement::visible);
                    el.texts = vec![text];
                }
                MockEffect::AppendText(sel, text) => {
                    let el = state.elements.entry(sel).or_insert_with(MockElement::visible);
                    el.texts.push(text);
                }
                MockEffect::Navigate(url) => state.url = url,
                MockEffect::Emit(event) => state.events.push(event),
            }
        }
    }

    fn element_mut<'a>(
        state: &'a mut MockState,
        selector: &Selector,
    ) -> ProbeResult<&'a mut MockElement> {
        state
            .elements
            .get_mut(selector)
            .ok_or_else(|| ProbeError::driver(format!("no element matches {selector}")))
    }
}

#[async_trait]
impl PortalDriver for MockDriver {
    async fn navigate(&self, url: &str) -> ProbeResult<()> {
        let mut state = self.record(format!("navigate:{url}")).await?;
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let state = self.record("current_url".to_string()).await?;
        Ok(state.url.clone())
    }

    async fn reload(&self) -> ProbeResult<()> {
        let _state = self.record("reload".to_string()).await?;
        Ok(())
    }

    async fn is_visible(&self, selector: &Selector) -> ProbeResult<bool> {
        let now = Instant::now();
        let state = self.record(format!("is_visible:{selector}")).await?;
        Ok(state
            .elements
            .get(selector)
            .is_some_and(|e| e.visible_at(now)))
    }

    async fn is_enabled(&self, selector: &Selector) -> ProbeResult<bool> {
        let state = self.record(format!("is_enabled:{selector}")).await?;
        Ok(state.elements.get(selector).is_some_and(|e| e.enabled))
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        let state = self.record(format!("count:{selector}")).await?;
        Ok(state.elements.get(selector).map_or(0, MockElement::count))
    }

    async fn text_content(&self, selector: &Selector) -> ProbeResult<Option<String>> {
        let now = Instant::now();
        let state = self.record(format!("text:{selector}")).await?;
        Ok(state
            .elements
            .get(selector)
            .filter(|e| {
                e.visible_at(now) || (e.visible_from.is_none() && e.visible_until.is_none())
            })
            .and_then(|e| e.texts.first().cloned()))
    }

    async fn all_texts(&self, selector: &Selector) -> ProbeResult<Vec<String>> {
        let state = self.record(format!("all_texts:{selector}")).await?;
        Ok(state
            .elements
            .get(selector)
            .map(|e| e.texts.clone())
            .unwrap_or_default())
    }

    async fn input_value(&self, selector: &Selector) -> ProbeResult<Option<String>> {
        let state = self.record(format!("input_value:{selector}")).await?;
        Ok(state.elements.get(selector).map(|e| e.value.clone()))
    }

    async fn click(&self, selector: &Selector, mode: ClickMode) -> ProbeResult<()> {
        let now = Instant::now();
        let mut state = self.record(format!("click:{mode}:{selector}")).await?;
        let el = Self::element_mut(&mut state, selector)?;
        if mode != ClickMode::Script && !el.visible_at(now) {
            return Err(ProbeError::driver(format!("{selector} is not visible")));
        }
        if !el.enabled {
            return Err(ProbeError::driver(format!("{selector} is disabled")));
        }
        Self::fire(&mut state, |t| match t {
            MockTrigger::Click(s, m) => s == selector && *m == mode,
            MockTrigger::AnyClick(s) => s == selector,
            _ => false,
        });
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> ProbeResult<()> {
        let mut state = self.record(format!("fill:{selector}={value}")).await?;
        let el = Self::element_mut(&mut state, selector)?;
        if !el.enabled {
            return Err(ProbeError::driver(format!("{selector} is disabled")));
        }
        el.value = value.to_string();
        Self::fire(&mut state, |t| matches!(t, MockTrigger::Fill(s) if s == selector));
        Ok(())
    }

    async fn select_option(&self, selector: &Selector, label: &str) -> ProbeResult<()> {
        let mut state = self.record(format!("select:{selector}={label}")).await?;
        let el = Self::element_mut(&mut state, selector)?;
        if !el.texts.is_empty() && !el.texts.iter().any(|t| t == label) {
            return Err(ProbeError::driver(format!(
                "{selector} has no option '{label}'"
            )));
        }
        el.value = label.to_string();
        Self::fire(&mut state, |t| matches!(t, MockTrigger::Select(s) if s == selector));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> ProbeResult<()> {
        let mut state = self.record(format!("press:{key}")).await?;
        Self::fire(&mut state, |t| matches!(t, MockTrigger::Key(k) if k == key));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value> {
        let mut state = self.record(format!("evaluate:{script}")).await?;
        Ok(state
            .js_results
            .pop_front()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        let state = self.record("screenshot".to_string()).await?;
        state
            .screenshot
            .clone()
            .ok_or_else(|| ProbeError::driver("No mock screenshot set"))
    }

    async fn take_events(&self) -> ProbeResult<Vec<BrowserEvent>> {
        let mut state = self.record("take_events".to_string()).await?;
        Ok(std::mem::take(&mut state.events))
    }

    async fn close(&self) -> ProbeResult<()> {
        let mut state = self.record("close".to_string()).await?;
        state.closed = true;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn css(s: &str) -> Selector {
        Selector::css(s)
    }

    mod driver_config_tests {
        use super::*;

        #[test]
        fn test_config_default() {
            let config = DriverConfig::default();
            assert!(config.headless);
            assert_eq!(config.viewport_width, 1920);
            assert_eq!(config.viewport_height, 1080);
            assert!(!config.no_sandbox);
        }

        #[test]
        fn test_config_builder() {
            let config = DriverConfig::new()
                .headless(false)
                .viewport(800, 600)
                .executable_path("/usr/bin/chromium")
                .download_dir("/tmp/downloads")
                .no_sandbox(true);

            assert!(!config.headless);
            assert_eq!(config.viewport_width, 800);
            assert_eq!(config.viewport_height, 600);
            assert_eq!(config.executable_path.as_deref(), Some("/usr/bin/chromium"));
            assert!(config.no_sandbox);
            assert_eq!(config.download_dir, Some(PathBuf::from("/tmp/downloads")));
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_navigate_records_history() {
            let driver = MockDriver::new();
            driver.navigate("https://admin.test/login").await.unwrap();
            assert_eq!(driver.current_url().await.unwrap(), "https://admin.test/login");
            assert!(driver.was_called("navigate:https://admin.test/login"));
        }

        #[tokio::test]
        async fn test_unknown_selector_is_absent_not_error() {
            let driver = MockDriver::new();
            assert!(!driver.is_visible(&css(".missing")).await.unwrap());
            assert_eq!(driver.count(&css(".missing")).await.unwrap(), 0);
            assert_eq!(driver.text_content(&css(".missing")).await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_click_fires_matching_mode_only() {
            let driver = MockDriver::new()
                .with_element(css("#open"), MockElement::visible())
                .with_element(css(".modal"), MockElement::hidden())
                .on(
                    MockTrigger::Click(css("#open"), ClickMode::Force),
                    MockEffect::Show(css(".modal")),
                );

            driver.click(&css("#open"), ClickMode::Normal).await.unwrap();
            assert!(!driver.is_visible(&css(".modal")).await.unwrap());

            driver.click(&css("#open"), ClickMode::Force).await.unwrap();
            assert!(driver.is_visible(&css(".modal")).await.unwrap());
        }

        #[tokio::test]
        async fn test_click_hidden_element_fails_unless_script() {
            let driver = MockDriver::new().with_element(css("#b"), MockElement::hidden());
            assert!(driver.click(&css("#b"), ClickMode::Normal).await.is_err());
            assert!(driver.click(&css("#b"), ClickMode::Script).await.is_ok());
        }

        #[tokio::test]
        async fn test_fail_next_is_consumed_once() {
            let driver = MockDriver::new().with_element(css("#x"), MockElement::visible());
            driver.fail_next("is_visible", "element detached");
            assert!(driver.is_visible(&css("#x")).await.is_err());
            assert!(driver.is_visible(&css("#x")).await.unwrap());
        }

        #[tokio::test]
        async fn test_closed_session_errors_are_classified() {
            let driver = MockDriver::new();
            driver.close().await.unwrap();
            let err = driver.current_url().await.unwrap_err();
            assert!(err.is_session_closed());
        }

        #[tokio::test(start_paused = true)]
        async fn test_show_for_expires() {
            let driver = MockDriver::new()
                .with_element(css("#save"), MockElement::visible())
                .on(
                    MockTrigger::AnyClick(css("#save")),
                    MockEffect::ShowFor(css(".toast"), Duration::from_millis(1500)),
                );
            driver.click(&css("#save"), ClickMode::Normal).await.unwrap();
            assert!(driver.is_visible(&css(".toast")).await.unwrap());
            tokio::time::sleep(Duration::from_millis(1600)).await;
            assert!(!driver.is_visible(&css(".toast")).await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_show_after_delays_visibility() {
            let driver = MockDriver::new()
                .with_element(css("#open"), MockElement::visible())
                .on(
                    MockTrigger::AnyClick(css("#open")),
                    MockEffect::ShowAfter(css(".modal"), Duration::from_millis(400)),
                );
            driver.click(&css("#open"), ClickMode::Normal).await.unwrap();
            assert!(!driver.is_visible(&css(".modal")).await.unwrap());
            tokio::time::sleep(Duration::from_millis(400)).await;
            assert!(driver.is_visible(&css(".modal")).await.unwrap());
        }

        #[tokio::test]
        async fn test_select_option_validates_label() {
            let driver = MockDriver::new().with_element(
                css("select#freq"),
                MockElement::visible().with_texts(["Daily", "Weekly"]),
            );
            driver.select_option(&css("select#freq"), "Weekly").await.unwrap();
            assert_eq!(
                driver.element_value(&css("select#freq")).as_deref(),
                Some("Weekly")
            );
            assert!(driver
                .select_option(&css("select#freq"), "Hourly")
                .await
                .is_err());
        }

        #[tokio::test]
        async fn test_append_text_grows_count() {
            let driver = MockDriver::new()
                .with_element(css("tbody tr"), MockElement::visible().with_texts(["a", "b"]))
                .with_element(css("#save"), MockElement::visible())
                .on(
                    MockTrigger::AnyClick(css("#save")),
                    MockEffect::AppendText(css("tbody tr"), "c".into()),
                );
            assert_eq!(driver.count(&css("tbody tr")).await.unwrap(), 2);
            driver.click(&css("#save"), ClickMode::Normal).await.unwrap();
            assert_eq!(driver.count(&css("tbody tr")).await.unwrap(), 3);
        }

        #[tokio::test]
        async fn test_emitted_events_are_drained_once() {
            let driver = MockDriver::new()
                .with_element(css("#export"), MockElement::visible())
                .on(
                    MockTrigger::AnyClick(css("#export")),
                    MockEffect::Emit(BrowserEvent::Download(Download::new(
                        "https://customer.test/files/report.csv",
                        "report.csv",
                    ))),
                );
            assert!(driver.take_events().await.unwrap().is_empty());
            driver.click(&css("#export"), ClickMode::Normal).await.unwrap();
            let events = driver.take_events().await.unwrap();
            assert_eq!(events.len(), 1);
            assert!(matches!(&events[0], BrowserEvent::Download(d) if d.suggested_filename == "report.csv"));
            assert!(driver.take_events().await.unwrap().is_empty());
        }

        #[tokio::test(start_paused = true)]
        async fn test_stalled_call_never_resolves() {
            let driver = MockDriver::new().with_element(css("#x"), MockElement::visible());
            driver.stall("is_visible");
            let result =
                tokio::time::timeout(Duration::from_secs(60), driver.is_visible(&css("#x"))).await;
            assert!(result.is_err());
            assert!(driver.was_called("is_visible:css `#x`"));
            assert_eq!(driver.count(&css("#x")).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_screenshot_requires_data() {
            let driver = MockDriver::new();
            assert!(driver.screenshot().await.is_err());
            driver.set_screenshot(vec![0x89, 0x50, 0x4E, 0x47]);
            assert_eq!(driver.screenshot().await.unwrap().len(), 4);
        }
    }
}
