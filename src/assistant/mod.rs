//! The assistant seam: anything that can answer a validation prompt.
//!
//! The pipeline only ever talks to `dyn Assistant`, so tests run against a
//! scripted in-memory implementation while production uses the
//! chromiumoxide-backed browser session.

pub mod browser;
pub mod rate_limit;
pub mod stealth;

use anyhow::Result;
use async_trait::async_trait;

pub use browser::BrowserAssistant;
pub use rate_limit::RequestBudget;

/// Something that accepts a validation prompt and returns the reply text.
#[async_trait]
pub trait Assistant: Send {
    /// Submit one prompt and return the assistant's full reply.
    async fn ask(&mut self, prompt: &str) -> Result<String>;

    /// Release any underlying resources (browser, session).
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
