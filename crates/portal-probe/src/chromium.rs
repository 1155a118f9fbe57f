//! Chromium over CDP.
//!
//! Element lookups run as page script built from [`Selector`] queries, so the
//! same selector means the same thing here and in every diagnostic. Normal
//! clicks are real mouse events at the element centre and can be intercepted
//! by overlays; force and script clicks bypass hit testing. Downloads and
//! popups are collected from page events as they arrive and drained by
//! [`PortalDriver::take_events`].

use crate::driver::{BrowserEvent, ClickMode, Download, DriverConfig, PortalDriver};
use crate::locator::{js_str, Selector, JS_IS_VISIBLE};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::browser_protocol::browser::{
    EventDownloadWillBegin, SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, EventWindowOpen,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outcome strings returned by the action scripts
const OK: &str = "ok";
const MISSING: &str = "missing";
const DISABLED: &str = "disabled";
const NO_OPTION: &str = "no-option";

fn cdp_error(e: impl std::fmt::Display) -> ProbeError {
    ProbeError::classify_driver_message(e.to_string())
}

/// Where a normal click lands
#[derive(Debug, Deserialize)]
struct ClickTarget {
    x: f64,
    y: f64,
    visible: bool,
    disabled: bool,
}

/// A Chromium page driven through the DevTools protocol
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    listeners: Vec<JoinHandle<()>>,
    events: Arc<Mutex<Vec<BrowserEvent>>>,
    config: DriverConfig,
}

impl ChromiumDriver {
    /// Launch Chromium and open a blank page.
    ///
    /// # Errors
    ///
    /// A driver error when the browser cannot be started.
    pub async fn launch(config: DriverConfig) -> ProbeResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(config.navigation_timeout);

        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.executable_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| ProbeError::driver(format!("invalid browser config: {e}")))?;
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| ProbeError::driver(format!("failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ProbeError::driver(format!("failed to open page: {e}")))?;
        debug!(headless = config.headless, "browser launched");

        if let Some(ref dir) = config.download_dir {
            tokio::fs::create_dir_all(dir).await?;
            let params = SetDownloadBehaviorParams::builder()
                .behavior(SetDownloadBehaviorBehavior::Allow)
                .download_path(dir.display().to_string())
                .build()
                .map_err(ProbeError::driver)?;
            page.execute(params).await.map_err(cdp_error)?;
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let listeners = Self::listen(&page, &events).await?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            listeners,
            events,
            config,
        })
    }

    /// Forward download and popup events into the shared buffer
    async fn listen(
        page: &Page,
        events: &Arc<Mutex<Vec<BrowserEvent>>>,
    ) -> ProbeResult<Vec<JoinHandle<()>>> {
        let mut downloads = page
            .event_listener::<EventDownloadWillBegin>()
            .await
            .map_err(cdp_error)?;
        let mut popups = page
            .event_listener::<EventWindowOpen>()
            .await
            .map_err(cdp_error)?;

        let sink = Arc::clone(events);
        let download_task = tokio::spawn(async move {
            while let Some(event) = downloads.next().await {
                debug!(url = %event.url, file = %event.suggested_filename, "download started");
                sink.lock().await.push(BrowserEvent::Download(Download::new(
                    event.url.clone(),
                    event.suggested_filename.clone(),
                )));
            }
        });

        let sink = Arc::clone(events);
        let popup_task = tokio::spawn(async move {
            while let Some(event) = popups.next().await {
                debug!(url = %event.url, "popup opened");
                sink.lock().await.push(BrowserEvent::Popup {
                    url: event.url.clone(),
                });
            }
        });

        Ok(vec![download_task, popup_task])
    }

    /// Launch configuration
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Evaluate a script and decode its value; `undefined` decodes as `null`
    async fn eval<T: DeserializeOwned>(&self, script: &str) -> ProbeResult<T> {
        let result = self.page.evaluate(script).await.map_err(cdp_error)?;
        let value = result.value().cloned().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value)
            .map_err(|e| ProbeError::driver(format!("unexpected script result: {e}")))
    }

    /// Run an action script that reports one of the outcome strings
    async fn act(&self, selector: &Selector, body: &str) -> ProbeResult<()> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return '{MISSING}'; {body} }})()",
            selector.to_query()
        );
        let status: String = self.eval(&script).await?;
        match status.as_str() {
            OK => Ok(()),
            MISSING => Err(ProbeError::driver(format!("no element matches {selector}"))),
            DISABLED => Err(ProbeError::driver(format!("{selector} is disabled"))),
            NO_OPTION => Err(ProbeError::driver(format!("{selector} has no such option"))),
            other => Err(ProbeError::driver(format!("{selector}: {other}"))),
        }
    }

    async fn pointer_click(&self, selector: &Selector) -> ProbeResult<()> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return null; \
             el.scrollIntoView({{block: 'center', inline: 'center'}}); \
             const r = el.getBoundingClientRect(); \
             return {{ x: r.left + r.width / 2, y: r.top + r.height / 2, \
                       visible: {}(el), disabled: !!el.disabled }}; }})()",
            selector.to_query(),
            JS_IS_VISIBLE
        );
        let target: Option<ClickTarget> = self.eval(&script).await?;
        let target =
            target.ok_or_else(|| ProbeError::driver(format!("no element matches {selector}")))?;
        if !target.visible {
            return Err(ProbeError::driver(format!("{selector} is not visible")));
        }
        if target.disabled {
            return Err(ProbeError::driver(format!("{selector} is disabled")));
        }
        self.page
            .click(Point::new(target.x, target.y))
            .await
            .map_err(cdp_error)?;
        Ok(())
    }
}

/// Windows virtual key codes for the keys journeys press
fn virtual_key_code(key: &str) -> Option<i64> {
    match key {
        "Enter" => Some(13),
        "Escape" => Some(27),
        "Tab" => Some(9),
        "Backspace" => Some(8),
        "ArrowDown" => Some(40),
        "ArrowUp" => Some(38),
        _ => None,
    }
}

/// Script body that assigns a value through the native setter, so framework
/// listeners see the change
fn fill_body(value: &str) -> String {
    format!(
        "if (el.disabled) return '{DISABLED}'; el.focus(); \
         const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
         Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {}); \
         el.dispatchEvent(new Event('input', {{bubbles: true}})); \
         el.dispatchEvent(new Event('change', {{bubbles: true}})); \
         return '{OK}';",
        js_str(value)
    )
}

fn select_body(label: &str) -> String {
    let label = js_str(label);
    format!(
        "if (el.disabled) return '{DISABLED}'; \
         const opt = Array.from(el.options || []).find(o => o.text.trim() === {label} || o.label === {label}); \
         if (!opt) return '{NO_OPTION}'; \
         el.value = opt.value; \
         el.dispatchEvent(new Event('input', {{bubbles: true}})); \
         el.dispatchEvent(new Event('change', {{bubbles: true}})); \
         return '{OK}';"
    )
}

const FORCE_CLICK_BODY: &str = "if (el.disabled) return 'disabled'; \
    for (const t of ['pointerdown', 'mousedown', 'pointerup', 'mouseup', 'click']) \
    { el.dispatchEvent(new MouseEvent(t, {bubbles: true, cancelable: true, view: window})); } \
    return 'ok';";

const SCRIPT_CLICK_BODY: &str = "if (el.disabled) return 'disabled'; el.click(); return 'ok';";

#[async_trait]
impl PortalDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> ProbeResult<()> {
        let navigation = self.page.goto(url);
        match tokio::time::timeout(self.config.navigation_timeout, navigation).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => match cdp_error(&e) {
                closed @ ProbeError::SessionClosed { .. } => Err(closed),
                _ => Err(ProbeError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }),
            },
            Err(_) => Err(ProbeError::Navigation {
                url: url.to_string(),
                message: format!(
                    "no load event within {}ms",
                    self.config.navigation_timeout.as_millis()
                ),
            }),
        }
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let url = self.page.url().await.map_err(cdp_error)?;
        Ok(url.unwrap_or_default())
    }

    async fn reload(&self) -> ProbeResult<()> {
        self.page.reload().await.map_err(cdp_error)?;
        Ok(())
    }

    async fn is_visible(&self, selector: &Selector) -> ProbeResult<bool> {
        self.eval(&selector.to_visible_query()).await
    }

    async fn is_enabled(&self, selector: &Selector) -> ProbeResult<bool> {
        let script = format!(
            "(() => {{ const el = {}; return !!el && !el.disabled && el.getAttribute('aria-disabled') !== 'true'; }})()",
            selector.to_query()
        );
        self.eval(&script).await
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        self.eval(&selector.to_count_query()).await
    }

    async fn text_content(&self, selector: &Selector) -> ProbeResult<Option<String>> {
        let script = format!(
            "(() => {{ const el = {}; return el ? (el.innerText || el.textContent || '').trim() : null; }})()",
            selector.to_query()
        );
        self.eval(&script).await
    }

    async fn all_texts(&self, selector: &Selector) -> ProbeResult<Vec<String>> {
        let script = format!(
            "({}).map(el => (el.innerText || el.textContent || '').trim())",
            selector.to_all_query()
        );
        self.eval(&script).await
    }

    async fn input_value(&self, selector: &Selector) -> ProbeResult<Option<String>> {
        let script = format!(
            "(() => {{ const el = {}; return el ? String(el.value ?? '') : null; }})()",
            selector.to_query()
        );
        self.eval(&script).await
    }

    async fn click(&self, selector: &Selector, mode: ClickMode) -> ProbeResult<()> {
        debug!(%selector, %mode, "click");
        match mode {
            ClickMode::Normal => self.pointer_click(selector).await,
            ClickMode::Force => self.act(selector, FORCE_CLICK_BODY).await,
            ClickMode::Script => self.act(selector, SCRIPT_CLICK_BODY).await,
        }
    }

    async fn fill(&self, selector: &Selector, value: &str) -> ProbeResult<()> {
        self.act(selector, &fill_body(value)).await
    }

    async fn select_option(&self, selector: &Selector, label: &str) -> ProbeResult<()> {
        self.act(selector, &select_body(label)).await
    }

    async fn press_key(&self, key: &str) -> ProbeResult<()> {
        for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let mut builder = DispatchKeyEventParams::builder().r#type(kind).key(key).code(key);
            if let Some(code) = virtual_key_code(key) {
                builder = builder.windows_virtual_key_code(code);
            }
            let params = builder.build().map_err(ProbeError::driver)?;
            self.page.execute(params).await.map_err(cdp_error)?;
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value> {
        self.eval(script).await
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self.page.execute(params).await.map_err(cdp_error)?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| ProbeError::driver(format!("screenshot decode failed: {e}")))
    }

    async fn take_events(&self) -> ProbeResult<Vec<BrowserEvent>> {
        Ok(std::mem::take(&mut *self.events.lock().await))
    }

    async fn close(&self) -> ProbeResult<()> {
        for listener in &self.listeners {
            listener.abort();
        }
        if let Err(e) = self.page.clone().close().await {
            warn!(error = %e, "page close failed");
        }
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(cdp_error)?;
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "browser process did not exit cleanly");
        }
        self.handler.abort();
        Ok(())
    }
}
