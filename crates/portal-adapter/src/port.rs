//! The page capability trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::PageResult;

/// Minimal capability surface the navigation primitives require from a page.
///
/// Locators are CSS selectors and may match several controls; indexed
/// operations (`click_nth`, `is_interactable`) address one of them by DOM
/// order so the caller can disambiguate on visible text. Field operations
/// address the first match, which is sufficient for the portal's uniquely
/// identified form inputs.
#[async_trait]
pub trait PortalPage: Send + Sync {
    /// Navigate to `url`, failing with `NavTimeout` when the load exceeds `deadline`.
    async fn navigate(&self, url: &str, deadline: Duration) -> PageResult<()>;

    /// Current `document.readyState` ("loading", "interactive" or "complete").
    async fn ready_state(&self) -> PageResult<String>;

    /// Rendered text of every element matching `scope`, in DOM order.
    /// An empty vector means the scope matched nothing.
    async fn visible_texts(&self, scope: &str) -> PageResult<Vec<String>>;

    /// Whether the `index`-th element matching `scope` is visible and enabled.
    async fn is_interactable(&self, scope: &str, index: usize) -> PageResult<bool>;

    /// Click the `index`-th element matching `scope`.
    async fn click_nth(&self, scope: &str, index: usize, deadline: Duration) -> PageResult<()>;

    /// Empty the field's value and notify the page's input listeners.
    async fn clear_field(&self, locator: &str) -> PageResult<()>;

    /// Type `text` into the field one keystroke at a time, pausing
    /// `per_key_delay` between characters so mask engines process each one.
    async fn type_chars(&self, locator: &str, text: &str, per_key_delay: Duration)
        -> PageResult<()>;

    /// Current value of the field.
    async fn field_value(&self, locator: &str) -> PageResult<String>;

    /// Select the `<option>` whose visible text equals `label`.
    async fn select_by_label(&self, locator: &str, label: &str, deadline: Duration)
        -> PageResult<()>;

    /// Full-page PNG screenshot.
    async fn screenshot(&self) -> PageResult<Vec<u8>>;
}
