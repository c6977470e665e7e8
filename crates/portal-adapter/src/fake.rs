//! Scripted in-memory page for unit tests.
//!
//! Behaves like a loaded portal page: scopes expose visible texts, fields
//! accumulate keystrokes (optionally through a mask transform), selects hold
//! a fixed option list. Failures can be scripted per operation and occurrence
//! so multi-record scenarios can fail one record deterministically.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{PageError, PageResult};
use crate::port::PortalPage;

type Mask = Box<dyn Fn(&str) -> String + Send>;

#[derive(Default)]
struct FieldState {
    raw: String,
    value: String,
    mask: Option<Mask>,
}

#[derive(Default)]
struct FakeState {
    ready_state: String,
    texts: HashMap<String, Vec<String>>,
    fields: HashMap<String, FieldState>,
    selects: HashMap<String, Vec<String>>,
    selections: Vec<(String, String)>,
    clicks: Vec<(String, usize)>,
    navigations: Vec<String>,
    calls: usize,
    counters: HashMap<String, usize>,
    failures: HashMap<String, HashMap<usize, PageError>>,
    screenshot_fails: bool,
}

/// In-memory [`PortalPage`] implementation.
pub struct FakePage {
    state: Mutex<FakeState>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    pub fn new() -> Self {
        let mut state = FakeState::default();
        state.ready_state = "complete".to_string();
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn set_ready_state(&self, ready_state: &str) {
        self.state.lock().ready_state = ready_state.to_string();
    }

    /// Script the visible texts a scope selector resolves to.
    pub fn set_texts(&self, scope: &str, texts: &[&str]) {
        self.state
            .lock()
            .texts
            .insert(scope.to_string(), texts.iter().map(|t| t.to_string()).collect());
    }

    /// Attach a mask transform to a field: the stored value becomes
    /// `mask(all keystrokes so far)` after every `type_chars` call.
    pub fn set_field_mask(&self, locator: &str, mask: impl Fn(&str) -> String + Send + 'static) {
        let mut state = self.state.lock();
        let field = state.fields.entry(locator.to_string()).or_default();
        field.mask = Some(Box::new(mask));
    }

    /// Register a dropdown and its option labels.
    pub fn register_select(&self, locator: &str, options: &[&str]) {
        self.state.lock().selects.insert(
            locator.to_string(),
            options.iter().map(|o| o.to_string()).collect(),
        );
    }

    /// Make the `occurrence`-th call (1-based) of `op` on `locator` fail.
    /// Operation names match the trait methods ("navigate", "type_chars", ...);
    /// use an empty locator for page-wide operations.
    pub fn fail_at(&self, op: &str, locator: &str, occurrence: usize, error: PageError) {
        self.state
            .lock()
            .failures
            .entry(format!("{op}:{locator}"))
            .or_default()
            .insert(occurrence, error);
    }

    pub fn fail_screenshots(&self) {
        self.state.lock().screenshot_fails = true;
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<(String, usize)> {
        self.state.lock().clicks.clone()
    }

    pub fn selections(&self) -> Vec<(String, String)> {
        self.state.lock().selections.clone()
    }

    pub fn field_value_of(&self, locator: &str) -> String {
        self.state
            .lock()
            .fields
            .get(locator)
            .map(|f| f.value.clone())
            .unwrap_or_default()
    }

    /// Total page operations performed, across all trait methods.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls
    }

    /// Count one call and pop a scripted failure if this occurrence has one.
    fn enter(state: &mut FakeState, op: &str, locator: &str) -> PageResult<()> {
        state.calls += 1;
        let key = format!("{op}:{locator}");
        let seen = state.counters.entry(key.clone()).or_insert(0);
        *seen += 1;
        let occurrence = *seen;
        if let Some(per_occurrence) = state.failures.get_mut(&key) {
            if let Some(error) = per_occurrence.remove(&occurrence) {
                return Err(error);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PortalPage for FakePage {
    async fn navigate(&self, url: &str, _deadline: Duration) -> PageResult<()> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "navigate", "")?;
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn ready_state(&self) -> PageResult<String> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "ready_state", "")?;
        Ok(state.ready_state.clone())
    }

    async fn visible_texts(&self, scope: &str) -> PageResult<Vec<String>> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "visible_texts", scope)?;
        Ok(state.texts.get(scope).cloned().unwrap_or_default())
    }

    async fn is_interactable(&self, scope: &str, index: usize) -> PageResult<bool> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "is_interactable", scope)?;
        let count = state.texts.get(scope).map(|t| t.len()).unwrap_or(0);
        Ok(index < count)
    }

    async fn click_nth(&self, scope: &str, index: usize, _deadline: Duration) -> PageResult<()> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "click_nth", scope)?;
        state.clicks.push((scope.to_string(), index));
        Ok(())
    }

    async fn clear_field(&self, locator: &str) -> PageResult<()> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "clear_field", locator)?;
        let field = state.fields.entry(locator.to_string()).or_default();
        field.raw.clear();
        field.value.clear();
        Ok(())
    }

    async fn type_chars(
        &self,
        locator: &str,
        text: &str,
        _per_key_delay: Duration,
    ) -> PageResult<()> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "type_chars", locator)?;
        let field = state.fields.entry(locator.to_string()).or_default();
        field.raw.push_str(text);
        field.value = match &field.mask {
            Some(mask) => mask(&field.raw),
            None => field.raw.clone(),
        };
        Ok(())
    }

    async fn field_value(&self, locator: &str) -> PageResult<String> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "field_value", locator)?;
        Ok(state
            .fields
            .get(locator)
            .map(|f| f.value.clone())
            .unwrap_or_default())
    }

    async fn select_by_label(
        &self,
        locator: &str,
        label: &str,
        _deadline: Duration,
    ) -> PageResult<()> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "select_by_label", locator)?;
        let has_option = state
            .selects
            .get(locator)
            .map(|options| options.iter().any(|opt| opt.trim() == label.trim()));
        match has_option {
            None => Err(PageError::TargetNotFound(format!(
                "no select matches '{locator}'"
            ))),
            Some(false) => Err(PageError::OptionNotFound(format!(
                "option '{label}' not present in '{locator}'"
            ))),
            Some(true) => {
                state
                    .selections
                    .push((locator.to_string(), label.to_string()));
                Ok(())
            }
        }
    }

    async fn screenshot(&self) -> PageResult<Vec<u8>> {
        let mut state = self.state.lock();
        Self::enter(&mut state, "screenshot", "")?;
        if state.screenshot_fails {
            return Err(PageError::Transport("screenshot unavailable".to_string()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}
