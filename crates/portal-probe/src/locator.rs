//! Locator abstraction for element selection.
//!
//! A [`Locator`] is an opaque, lazily resolved reference to zero or more DOM
//! elements. Nothing is cached: every driver call re-evaluates the selector
//! against the live page, so a locator stays valid across re-renders.
//!
//! Selectors compile to JavaScript expressions that every driver can evaluate
//! the same way. [`Selector::to_all_query`] is the primitive; the single,
//! count and visibility queries are derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote a string as a JavaScript string literal.
pub(crate) fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// JS predicate deciding whether an element is rendered and on screen.
pub(crate) const JS_IS_VISIBLE: &str = "(el => { \
    if (!el || !el.isConnected) return false; \
    const s = window.getComputedStyle(el); \
    if (s.display === 'none' || s.visibility === 'hidden' || s.opacity === '0') return false; \
    const r = el.getBoundingClientRect(); \
    return r.width > 0 && r.height > 0; })";

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Innermost element whose text contains the value
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// Combined selector with text filter
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
    /// ARIA role with an accessible-name filter
    Role {
        /// Role name (`button`, `dialog`, `row`, ...)
        role: String,
        /// Substring of the accessible name; empty matches any
        name: String,
    },
    /// Input or textarea by placeholder text
    Placeholder(String),
    /// Form control associated with a `<label>` containing the text
    Label(String),
}

/// Tags that carry an implicit ARIA role.
fn implicit_role_selector(role: &str) -> Option<&'static str> {
    match role {
        "button" => Some("button, input[type=button], input[type=submit]"),
        "link" => Some("a[href]"),
        "textbox" => Some("input:not([type]), input[type=text], input[type=email], input[type=password], textarea"),
        "checkbox" => Some("input[type=checkbox]"),
        "combobox" => Some("select"),
        "dialog" => Some("dialog"),
        "row" => Some("tr"),
        "table" => Some("table"),
        "heading" => Some("h1, h2, h3, h4, h5, h6"),
        _ => None,
    }
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a role selector
    #[must_use]
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    /// Create a placeholder selector
    #[must_use]
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder(text.into())
    }

    /// Create a label selector
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::Label(text.into())
    }

    /// JavaScript expression evaluating to an array of every matching element
    #[must_use]
    pub fn to_all_query(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_str(s)),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()",
                js_str(s)
            ),
            Self::Text(t) => {
                let t = js_str(t);
                format!(
                    "Array.from(document.querySelectorAll('body *')).filter(el => \
                     el.textContent.includes({t}) && \
                     !Array.from(el.children).some(c => c.textContent.includes({t})))"
                )
            }
            Self::TestId(id) => format!(
                "Array.from(document.querySelectorAll('[data-testid=' + JSON.stringify({}) + ']'))",
                js_str(id)
            ),
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => el.textContent.includes({}))",
                js_str(css),
                js_str(text)
            ),
            Self::Role { role, name } => {
                let explicit = format!("[role={}]", js_str(role));
                let tags = implicit_role_selector(role)
                    .map_or(explicit.clone(), |t| format!("{explicit}, {t}"));
                format!(
                    "Array.from(document.querySelectorAll({})).filter(el => \
                     ((el.getAttribute('aria-label') || el.textContent || el.value || el.title || '')\
                     .trim()).includes({}))",
                    js_str(&tags),
                    js_str(name)
                )
            }
            Self::Placeholder(p) => format!(
                "Array.from(document.querySelectorAll('input[placeholder], textarea[placeholder]'))\
                 .filter(el => el.placeholder.includes({}))",
                js_str(p)
            ),
            Self::Label(l) => format!(
                "Array.from(document.querySelectorAll('label')).filter(l => l.textContent.includes({}))\
                 .map(l => l.control || (l.htmlFor && document.getElementById(l.htmlFor)) || \
                 l.querySelector('input, select, textarea')).filter(Boolean)",
                js_str(l)
            ),
        }
    }

    /// JavaScript expression evaluating to the first match or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("(({})[0] || null)", self.to_all_query())
    }

    /// JavaScript expression evaluating to the number of matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("({}).length", self.to_all_query())
    }

    /// JavaScript expression evaluating to whether any match is visible
    #[must_use]
    pub fn to_visible_query(&self) -> String {
        format!("({}).some({JS_IS_VISIBLE})", self.to_all_query())
    }

    /// Short human-readable rendering used in diagnostics
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Css(s) => format!("css `{s}`"),
            Self::XPath(s) => format!("xpath `{s}`"),
            Self::Text(t) => format!("text '{t}'"),
            Self::TestId(id) => format!("test-id '{id}'"),
            Self::CssWithText { css, text } => format!("css `{css}` with text '{text}'"),
            Self::Role { role, name } if name.is_empty() => format!("role {role}"),
            Self::Role { role, name } => format!("role {role} named '{name}'"),
            Self::Placeholder(p) => format!("placeholder '{p}'"),
            Self::Label(l) => format!("label '{l}'"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A lazily resolved reference to DOM elements plus a diagnostic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    selector: Selector,
    name: Option<String>,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub const fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            name: None,
        }
    }

    /// Attach a human-readable name shown in diagnostics
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Filter by text content.
    ///
    /// Only CSS locators can be narrowed; other selector kinds already carry
    /// their own text and are returned unchanged.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let selector = match self.selector {
            Selector::Css(css) => Selector::CssWithText {
                css,
                text: text.into(),
            },
            other => other,
        };
        Self {
            selector,
            name: self.name,
        }
    }

    /// The underlying selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Diagnostic name: the explicit name when set, otherwise the selector
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.name {
            Some(name) => format!("{name} ({})", self.selector.describe()),
            None => self.selector.describe(),
        }
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Self::from_selector(selector)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
