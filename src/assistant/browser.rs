//! Browser-backed assistant session.
//!
//! Drives the assistant's web UI over the DevTools protocol: launch Chrome
//! with masking flags, log in with typed credentials, then per prompt open a
//! fresh conversation, inject the prompt into the composer, wait for the
//! streaming indicator to clear, and scrape the final reply text.

use crate::assistant::rate_limit::RequestBudget;
use crate::assistant::stealth::{self, LAUNCH_ARGS, MASK_SCRIPT};
use crate::assistant::Assistant;
use crate::config::{Credentials, Settings};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// The chat composer. Its presence means the chat page is ready.
const COMPOSER_SELECTOR: &str = "textarea[placeholder*='Message']";

/// Present while the assistant is still streaming its reply.
const STREAMING_SELECTOR: &str = ".result-streaming";

/// Rendered reply blocks; the last one is the newest reply.
const REPLY_SELECTOR: &str = "div.markdown";

/// Opens the model dropdown.
const MODEL_SWITCHER_SELECTOR: &str = "button[aria-label*='Model']";

/// Option text of the assistant's most capable model. Vision variants are
/// excluded; they reject plain-text prompts.
const ADVANCED_MODEL_LABEL: &str = "GPT-4";

const LOGIN_FIELD_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);
const STREAM_START_TIMEOUT: Duration = Duration::from_secs(8);
const STREAM_FINISH_TIMEOUT: Duration = Duration::from_secs(90);
const RENDER_SETTLE: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(250);
const MODEL_MENU_TIMEOUT: Duration = Duration::from_secs(3);

/// A logged-in browser session against the assistant web UI.
pub struct BrowserAssistant {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    budget: RequestBudget,
    credentials: Credentials,
    base_url: String,
    logged_in: bool,
    prefer_advanced_model: bool,
}

impl BrowserAssistant {
    /// Launch a browser according to `settings`. Does not log in yet; login
    /// happens lazily on the first prompt.
    pub async fn launch(settings: &Settings) -> Result<Self> {
        let credentials = settings.credentials.clone().context(
            "no credentials configured (set LEADVET_EMAIL and LEADVET_PASSWORD)",
        )?;

        let mut builder = BrowserConfig::builder().args(LAUNCH_ARGS.to_vec());
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;

        // The handler stream must be pumped for the session to make progress.
        let handler_task = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;

        info!(headless = settings.headless, "browser session started");

        Ok(Self {
            browser,
            page,
            handler_task,
            budget: RequestBudget::hosted_defaults(),
            credentials,
            base_url: settings.assistant_url.trim_end_matches('/').to_string(),
            logged_in: false,
            prefer_advanced_model: settings.prefer_advanced_model,
        })
    }

    /// Log in with email and password. Typed with human pacing; the flow is
    /// email -> continue -> password -> submit -> chat page.
    async fn login(&mut self) -> Result<()> {
        if self.logged_in {
            return Ok(());
        }
        info!("logging in to assistant");

        let login_url = format!("{}/auth/login", self.base_url);
        self.page
            .goto(login_url.as_str())
            .await
            .context("failed to open login page")?;
        stealth::sleep_page_load_delay().await;
        self.apply_mask().await;

        // Some variants of the landing page need an explicit "Log in" click
        // before the email form appears.
        let _ = self.click_by_text("button", "Log in").await;
        stealth::sleep_action_delay().await;

        let email_input = self
            .wait_for_element("#username", LOGIN_FIELD_TIMEOUT)
            .await
            .context("email field did not appear")?;
        let email = self.credentials.email.clone();
        self.type_slowly(&email_input, &email).await?;

        if !self.click_by_text("button", "Continue").await? {
            // Single-page form: continue button may be the submit button.
            if let Ok(submit) = self.page.find_element("button[type='submit']").await {
                submit.click().await?;
            }
        }
        stealth::sleep_action_delay().await;

        let password_input = self
            .wait_for_element("#password", LOGIN_FIELD_TIMEOUT)
            .await
            .context("password field did not appear")?;
        let password = self.credentials.password.clone();
        self.type_slowly(&password_input, &password).await?;

        let submit = self
            .page
            .find_element("button[type='submit']")
            .await
            .context("login submit button not found")?;
        submit.click().await?;

        self.wait_for_element(COMPOSER_SELECTOR, LOGIN_TIMEOUT)
            .await
            .context("login did not reach the chat page")?;
        self.apply_mask().await;
        self.logged_in = true;
        info!("login successful");

        if self.prefer_advanced_model {
            self.try_select_advanced_model().await;
        }
        Ok(())
    }

    /// Open a fresh conversation and submit the prompt, returning the reply.
    async fn submit_prompt(&mut self, prompt: &str) -> Result<String> {
        // A fresh conversation keeps each judgment independent of earlier
        // leads in the session.
        self.page
            .goto(self.base_url.as_str())
            .await
            .context("failed to open chat page")?;
        stealth::sleep_page_load_delay().await;
        self.apply_mask().await;

        self.wait_for_element(COMPOSER_SELECTOR, LOGIN_FIELD_TIMEOUT)
            .await
            .context("composer not found")?;

        // Set the composer value in one step; typing a multi-line prompt
        // key-by-key would submit on every newline.
        let prompt_js = serde_json::to_string(prompt).context("prompt is not encodable")?;
        let fill = format!(
            r#"(() => {{
                const el = document.querySelector("{COMPOSER_SELECTOR}");
                if (!el) return false;
                el.focus();
                el.value = {prompt_js};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return true;
            }})()"#
        );
        let filled: bool = self.page.evaluate(fill).await?.into_value()?;
        if !filled {
            anyhow::bail!("composer disappeared before the prompt was entered");
        }
        stealth::sleep_action_delay().await;

        let composer = self.page.find_element(COMPOSER_SELECTOR).await?;
        composer.press_key("Enter").await?;
        debug!(chars = prompt.len(), "prompt submitted");

        // The streaming marker may already be gone for short replies, so its
        // appearance is best-effort.
        let _ = self
            .wait_for_present(STREAMING_SELECTOR, STREAM_START_TIMEOUT)
            .await;
        self.wait_for_absent(STREAMING_SELECTOR, STREAM_FINISH_TIMEOUT)
            .await
            .context("assistant reply did not finish streaming")?;
        tokio::time::sleep(RENDER_SETTLE).await;

        let scrape = format!(
            r#"(() => {{
                const nodes = document.querySelectorAll("{REPLY_SELECTOR}");
                if (!nodes.length) return "";
                return nodes[nodes.length - 1].innerText;
            }})()"#
        );
        let reply: String = self.page.evaluate(scrape).await?.into_value()?;
        info!(chars = reply.len(), "reply received");
        Ok(reply)
    }

    /// Evaluate the masking script on the current page; failures are logged,
    /// not fatal.
    async fn apply_mask(&self) {
        if let Err(e) = self.page.evaluate(MASK_SCRIPT).await {
            warn!("failed to apply mask script: {e}");
        }
    }

    /// Best-effort switch to the assistant's most capable model: open the
    /// model dropdown, then click the matching option. The menu never stays
    /// open over the composer; it is dismissed when no option was found.
    async fn try_select_advanced_model(&self) {
        let open = format!(
            r#"(() => {{
                const switcher = document.querySelector("{MODEL_SWITCHER_SELECTOR}");
                if (!switcher) return false;
                switcher.click();
                return true;
            }})()"#
        );
        if !self.eval_bool(&open).await {
            warn!("could not select model, using default");
            return;
        }
        stealth::sleep_action_delay().await;

        // The option list renders asynchronously after the dropdown opens.
        let select = model_option_script(ADVANCED_MODEL_LABEL);
        let deadline = Instant::now() + MODEL_MENU_TIMEOUT;
        loop {
            if self.eval_bool(&select).await {
                info!(model = ADVANCED_MODEL_LABEL, "model selected");
                return;
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        // Dismiss the dropdown so it does not cover the composer.
        if let Ok(body) = self.page.find_element("body").await {
            let _ = body.press_key("Escape").await;
        }
        warn!("could not select model, using default");
    }

    /// Evaluate a boolean-returning script; any failure counts as `false`.
    async fn eval_bool(&self, js: &str) -> bool {
        self.page
            .evaluate(js)
            .await
            .ok()
            .and_then(|r| r.into_value::<bool>().ok())
            .unwrap_or(false)
    }

    /// Click the first element of `tag` whose text contains `text`.
    async fn click_by_text(&self, tag: &str, text: &str) -> Result<bool> {
        let text_js = serde_json::to_string(text)?;
        let js = format!(
            r#"(() => {{
                const needle = {text_js};
                const els = [...document.querySelectorAll("{tag}")];
                const hit = els.find(el => el.textContent.includes(needle));
                if (hit) {{ hit.click(); return true; }}
                return false;
            }})()"#
        );
        let clicked: bool = self.page.evaluate(js).await?.into_value()?;
        Ok(clicked)
    }

    /// Poll until `selector` resolves, up to `timeout`.
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<Element> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(el) = self.page.find_element(selector).await {
                return Ok(el);
            }
            if Instant::now() >= deadline {
                anyhow::bail!("timed out waiting for element: {selector}");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll until `selector` resolves at least once, up to `timeout`.
    async fn wait_for_present(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.wait_for_element(selector, timeout).await.map(|_| ())
    }

    /// Poll until `selector` no longer resolves, up to `timeout`.
    async fn wait_for_absent(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_err() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                anyhow::bail!("timed out waiting for element to clear: {selector}");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Type into an element character by character with human pacing.
    async fn type_slowly(&self, element: &Element, text: &str) -> Result<()> {
        element.click().await?;
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            element.type_str(ch.encode_utf8(&mut buf)).await?;
            stealth::sleep_typing_delay().await;
        }
        Ok(())
    }
}

/// Script that clicks the first leaf element whose text starts with
/// `label`, skipping Vision variants. Returns whether an option was
/// clicked.
fn model_option_script(label: &str) -> String {
    let label_js = serde_json::to_string(label).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
            const wanted = {label_js};
            const items = [...document.querySelectorAll("div, li, button")];
            const hit = items.find(el =>
                el.childElementCount === 0 &&
                el.textContent.trim().startsWith(wanted) &&
                !el.textContent.includes("Vision"));
            if (hit) {{ hit.click(); return true; }}
            return false;
        }})()"#
    )
}

#[async_trait]
impl Assistant for BrowserAssistant {
    async fn ask(&mut self, prompt: &str) -> Result<String> {
        self.budget.acquire().await;
        self.login().await?;

        match self.submit_prompt(prompt).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                // The UI sheds session state under load; reload and force a
                // fresh login before the next prompt.
                warn!("prompt failed, resetting session: {e}");
                let _ = self.page.reload().await;
                self.logged_in = false;
                Err(e)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.browser.close().await.context("failed to close browser")?;
        self.handler_task.abort();
        info!("browser closed");
        Ok(())
    }
}
