//! CDP-backed implementation of the page capability trait.
//!
//! One [`BrowserSession`] owns the Chromium process and the handler task
//! draining its event stream; [`CdpPortalPage`] wraps a single page/tab.
//! Structural queries (visibility, field values, option lookup) run as
//! JavaScript envelopes returning `{status: ...}` objects; interaction
//! (clicks, keystrokes) goes through real CDP input events so the portal's
//! JSF widgets receive trusted events.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{PageError, PageResult};
use crate::port::PortalPage;

/// Browser session configuration, resolved once by the caller.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub headless: bool,
    pub window: (u32, u32),
    /// Explicit chrome/chromium binary; autodetected when `None`.
    pub chrome_executable: Option<PathBuf>,
    pub launch_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window: (1366, 900),
            chrome_executable: None,
            launch_timeout: Duration::from_secs(20),
        }
    }
}

/// One Chromium process plus the task draining its CDP event stream.
///
/// Created at batch start, torn down at batch end regardless of per-record
/// failures. Never shared across concurrent batch runs.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    /// Launch the browser. Failure here is fatal for the whole batch.
    pub async fn launch(cfg: &SessionConfig) -> PageResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(cfg.window.0, cfg.window.1)
            .launch_timeout(cfg.launch_timeout)
            .no_sandbox();

        if !cfg.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &cfg.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|err| PageError::LaunchFailed(format!("browser config error: {err}")))?;

        info!(
            headless = cfg.headless,
            executable = ?cfg.chrome_executable,
            "launching chromium"
        );

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| PageError::LaunchFailed(err.to_string()))?;

        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Open the single page this session drives.
    pub async fn open_page(&self, url: &str) -> PageResult<CdpPortalPage> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|err| PageError::Transport(format!("failed to open page: {err}")))?;
        Ok(CdpPortalPage { page })
    }

    /// Close the browser; errors are logged, not surfaced — teardown must not
    /// mask the batch outcome.
    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!(%err, "browser close returned error");
        }
        self.handler_task.abort();
        info!("browser session closed");
    }
}

/// A single portal page/tab driven over CDP.
pub struct CdpPortalPage {
    page: Page,
}

impl CdpPortalPage {
    async fn eval(&self, expression: String) -> PageResult<Value> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|err| PageError::Transport(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    fn literal(text: &str) -> PageResult<String> {
        serde_json::to_string(text)
            .map_err(|err| PageError::Internal(format!("invalid literal encoding: {err}")))
    }
}

#[async_trait]
impl PortalPage for CdpPortalPage {
    async fn navigate(&self, url: &str, deadline: Duration) -> PageResult<()> {
        debug!(url, "navigating");
        match tokio::time::timeout(deadline, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(PageError::Transport(err.to_string())),
            Err(_) => Err(PageError::NavTimeout(format!(
                "navigation to {} exceeded {}ms",
                url,
                deadline.as_millis()
            ))),
        }
    }

    async fn ready_state(&self) -> PageResult<String> {
        let value = self.eval("document.readyState".to_string()).await?;
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PageError::Internal("readyState is not a string".to_string()))
    }

    async fn visible_texts(&self, scope: &str) -> PageResult<Vec<String>> {
        let scope_literal = Self::literal(scope)?;
        let expression = format!(
            "(() => {{\n                const nodes = Array.from(document.querySelectorAll({scope}));\n                return nodes.map(n => (n.innerText || n.textContent || '').trim());\n            }})()",
            scope = scope_literal
        );

        let value = self.eval(expression).await?;
        match value {
            Value::Array(items) => Ok(items
                .into_iter()
                .map(|item| item.as_str().unwrap_or_default().to_string())
                .collect()),
            _ => Err(PageError::Internal(
                "text query did not return an array".to_string(),
            )),
        }
    }

    async fn is_interactable(&self, scope: &str, index: usize) -> PageResult<bool> {
        let scope_literal = Self::literal(scope)?;
        let expression = format!(
            "(() => {{\n                const nodes = document.querySelectorAll({scope});\n                if ({index} >= nodes.length) {{ return {{ status: 'missing' }}; }}\n                const el = nodes[{index}];\n                const target = el.closest('a, button, input, select') || el;\n                const style = window.getComputedStyle(el);\n                const rect = el.getBoundingClientRect();\n                const visible = style.visibility !== 'hidden' && style.display !== 'none' && (rect.width > 0 || rect.height > 0 || el.getClientRects().length > 0);\n                const disabled = !!target.disabled || target.getAttribute('aria-disabled') === 'true';\n                return {{ status: 'ok', interactable: visible && !disabled }};\n            }})()",
            scope = scope_literal,
            index = index
        );

        let value = self.eval(expression).await?;
        match value.get("status").and_then(|v| v.as_str()).unwrap_or("") {
            "ok" => Ok(value
                .get("interactable")
                .and_then(|v| v.as_bool())
                .unwrap_or(false)),
            "missing" => Err(PageError::TargetNotFound(format!(
                "no element #{index} for scope '{scope}'"
            ))),
            other => Err(PageError::Internal(format!(
                "unexpected interactability status: {other}"
            ))),
        }
    }

    async fn click_nth(&self, scope: &str, index: usize, _deadline: Duration) -> PageResult<()> {
        let elements = self
            .page
            .find_elements(scope)
            .await
            .map_err(|err| PageError::Transport(err.to_string()))?;

        let element = elements.get(index).ok_or_else(|| {
            PageError::TargetNotFound(format!(
                "scope '{}' has {} element(s), wanted #{index}",
                scope,
                elements.len()
            ))
        })?;

        if let Err(err) = element.scroll_into_view().await {
            debug!(%err, scope, index, "scroll_into_view failed, clicking anyway");
        }
        element
            .click()
            .await
            .map_err(|err| PageError::Transport(format!("click failed: {err}")))?;
        Ok(())
    }

    async fn clear_field(&self, locator: &str) -> PageResult<()> {
        let locator_literal = Self::literal(locator)?;
        let expression = format!(
            "(() => {{\n                const el = document.querySelector({locator});\n                if (!el) {{ return {{ status: 'missing' }}; }}\n                el.value = '';\n                el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n                el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n                return {{ status: 'ok' }};\n            }})()",
            locator = locator_literal
        );

        let value = self.eval(expression).await?;
        match value.get("status").and_then(|v| v.as_str()).unwrap_or("") {
            "ok" => Ok(()),
            "missing" => Err(PageError::TargetNotFound(format!(
                "no field matches '{locator}'"
            ))),
            other => Err(PageError::Internal(format!(
                "unexpected clear status: {other}"
            ))),
        }
    }

    async fn type_chars(
        &self,
        locator: &str,
        text: &str,
        per_key_delay: Duration,
    ) -> PageResult<()> {
        let element = self
            .page
            .find_element(locator)
            .await
            .map_err(|_| PageError::TargetNotFound(format!("no field matches '{locator}'")))?;

        element
            .click()
            .await
            .map_err(|err| PageError::Transport(format!("focus click failed: {err}")))?;

        // One key event per character; bulk assignment would bypass the mask
        // engine and be rejected on submit.
        for ch in text.chars() {
            element
                .press_key(&ch.to_string())
                .await
                .map_err(|err| PageError::Transport(format!("keystroke failed: {err}")))?;
            if !per_key_delay.is_zero() {
                tokio::time::sleep(per_key_delay).await;
            }
        }
        Ok(())
    }

    async fn field_value(&self, locator: &str) -> PageResult<String> {
        let locator_literal = Self::literal(locator)?;
        let expression = format!(
            "(() => {{\n                const el = document.querySelector({locator});\n                if (!el) {{ return {{ status: 'missing' }}; }}\n                return {{ status: 'ok', value: el.value ?? '' }};\n            }})()",
            locator = locator_literal
        );

        let value = self.eval(expression).await?;
        match value.get("status").and_then(|v| v.as_str()).unwrap_or("") {
            "ok" => Ok(value
                .get("value")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()),
            "missing" => Err(PageError::TargetNotFound(format!(
                "no field matches '{locator}'"
            ))),
            other => Err(PageError::Internal(format!(
                "unexpected value status: {other}"
            ))),
        }
    }

    async fn select_by_label(
        &self,
        locator: &str,
        label: &str,
        _deadline: Duration,
    ) -> PageResult<()> {
        let locator_literal = Self::literal(locator)?;
        let label_literal = Self::literal(label)?;
        let expression = format!(
            "(() => {{\n                const el = document.querySelector({locator});\n                if (!el) {{ return {{ status: 'missing' }}; }}\n                const options = Array.from(el.options || []);\n                const target = {label};\n                const idx = options.findIndex(opt => (opt.text || '').trim() === target.trim());\n                if (idx < 0) {{ return {{ status: 'not-found' }}; }}\n                el.selectedIndex = idx;\n                el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n                el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n                return {{ status: 'ok' }};\n            }})()",
            locator = locator_literal,
            label = label_literal
        );

        let value = self.eval(expression).await?;
        match value.get("status").and_then(|v| v.as_str()).unwrap_or("") {
            "ok" => Ok(()),
            "missing" => Err(PageError::TargetNotFound(format!(
                "no select matches '{locator}'"
            ))),
            "not-found" => Err(PageError::OptionNotFound(format!(
                "option '{label}' not present in '{locator}'"
            ))),
            other => Err(PageError::Internal(format!(
                "unexpected select status: {other}"
            ))),
        }
    }

    async fn screenshot(&self) -> PageResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|err| PageError::Transport(format!("screenshot failed: {err}")))
    }
}
