//! Automation-signal masking and human-like pacing.
//!
//! The assistant's web UI refuses obviously automated sessions. The injected
//! script hides the webdriver flag and related giveaways; the delay helpers
//! keep the interaction cadence inside human ranges.

use rand::Rng;
use std::time::Duration;

/// Chrome launch flags that suppress automation banners and sandbox issues
/// in containers.
pub const LAUNCH_ARGS: [&str; 3] = [
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
];

/// JavaScript evaluated after every navigation to mask automation signals.
pub const MASK_SCRIPT: &str = r#"
(() => {
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true,
    });

    if (!window.chrome) {
        window.chrome = {};
    }
    if (!window.chrome.runtime) {
        window.chrome.runtime = {
            connect: function() {},
            sendMessage: function() {},
        };
    }

    Object.defineProperty(navigator, 'plugins', {
        get: () => [1, 2, 3, 4, 5],
        configurable: true,
    });

    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true,
    });
})();
"#;

/// Random delay in `[min_ms, max_ms]`.
pub fn random_delay(min_ms: u64, max_ms: u64) -> Duration {
    let ms = rand::thread_rng().gen_range(min_ms..=max_ms);
    Duration::from_millis(ms)
}

/// Delay between discrete UI actions (clicks, focus changes).
pub fn action_delay() -> Duration {
    random_delay(300, 1200)
}

/// Delay between typed characters during login.
pub fn typing_delay() -> Duration {
    random_delay(30, 120)
}

/// Settling time after a page navigation.
pub fn page_load_delay() -> Duration {
    random_delay(1500, 3500)
}

pub async fn sleep_action_delay() {
    tokio::time::sleep(action_delay()).await;
}

pub async fn sleep_typing_delay() {
    tokio::time::sleep(typing_delay()).await;
}

pub async fn sleep_page_load_delay() {
    tokio::time::sleep(page_load_delay()).await;
}
