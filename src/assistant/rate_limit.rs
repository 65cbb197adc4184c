//! Request budget for the assistant's usage caps.
//!
//! The hosted assistant allows a fixed number of prompts per rolling window;
//! exceeding it silently degrades the session. The budget blocks until a
//! prompt is allowed: it enforces a minimum gap between consecutive prompts
//! and waits out the window when the cap is reached.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// Prompts allowed per window on the hosted plan.
pub const DEFAULT_MAX_REQUESTS: u32 = 50;

/// Cap window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3 * 60 * 60);

/// Minimum gap between consecutive prompts.
pub const DEFAULT_MIN_GAP: Duration = Duration::from_secs(15);

/// Rolling-window request budget.
pub struct RequestBudget {
    max_requests: u32,
    window: Duration,
    min_gap: Duration,
    state: Mutex<BudgetState>,
}

struct BudgetState {
    count: u32,
    window_start: Instant,
    last_request: Option<Instant>,
}

impl RequestBudget {
    pub fn new(max_requests: u32, window: Duration, min_gap: Duration) -> Self {
        Self {
            max_requests,
            window,
            min_gap,
            state: Mutex::new(BudgetState {
                count: 0,
                window_start: Instant::now(),
                last_request: None,
            }),
        }
    }

    /// Budget matching the hosted assistant's published limits.
    pub fn hosted_defaults() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, DEFAULT_MIN_GAP)
    }

    /// Block until the next prompt is allowed, then record it.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        // Roll the window forward when it has fully elapsed.
        if now.duration_since(state.window_start) >= self.window {
            info!("request budget window reset");
            state.count = 0;
            state.window_start = now;
        }

        // Cap reached: wait out the remainder of the window.
        if state.count >= self.max_requests {
            let resume_at = state.window_start + self.window;
            let wait = resume_at.saturating_duration_since(now);
            warn!(
                wait_secs = wait.as_secs(),
                "request budget exhausted, waiting for window reset"
            );
            tokio::time::sleep_until(resume_at).await;
            state.count = 0;
            state.window_start = Instant::now();
        }

        // Enforce the minimum gap since the previous prompt.
        if let Some(last) = state.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_gap {
                tokio::time::sleep(self.min_gap - elapsed).await;
            }
        }

        state.count += 1;
        state.last_request = Some(Instant::now());
    }

    /// Prompts recorded in the current window.
    pub async fn used(&self) -> u32 {
        self.state.lock().await.count
    }
}
