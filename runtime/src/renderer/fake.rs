//! Scripted stand-in for a browser tab.
//!
//! Scripts are answered by the first rule whose needle occurs in the script
//! text. A rule can hold a sequence of answers; the last one repeats. An
//! answer can also move the page to a new URL, the way a click navigates.

use super::{NavigationResult, RenderContext, Renderer};
use crate::acquisition::storage_state::BrowserCookie;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct Rule {
    needle: String,
    /// Each answer with the URL the page moves to when it is given.
    answers: VecDeque<(Value, Option<String>)>,
}

#[derive(Default)]
struct State {
    url: String,
    rules: Vec<Rule>,
    scripts: Vec<String>,
    navigations: Vec<String>,
    keys: Vec<String>,
    fills: Vec<(String, String)>,
    fillable: Vec<String>,
    redirect: Option<String>,
    cookies: Vec<BrowserCookie>,
    content: String,
    /// Scripts still to fail before rules answer again.
    failing: usize,
    closed: bool,
}

/// Cloneable handle; clones share state so tests can inspect a context
/// after handing it to the code under test.
#[derive(Clone, Default)]
pub(crate) struct ScriptedContext {
    state: Arc<Mutex<State>>,
}

impl ScriptedContext {
    pub fn new(url: &str) -> Self {
        let ctx = Self::default();
        ctx.lock().url = url.to_string();
        ctx.lock().content = "<html><body></body></html>".to_string();
        ctx
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn on(&self, needle: &str, answer: Value) {
        self.on_seq(needle, vec![answer]);
    }

    pub fn on_seq(&self, needle: &str, answers: Vec<Value>) {
        self.on_steps(needle, answers.into_iter().map(|a| (a, None)).collect());
    }

    pub fn on_then_url(&self, needle: &str, answer: Value, url: &str) {
        self.on_steps(needle, vec![(answer, Some(url))]);
    }

    pub fn on_steps(&self, needle: &str, steps: Vec<(Value, Option<&str>)>) {
        self.lock().rules.push(Rule {
            needle: needle.to_string(),
            answers: steps
                .into_iter()
                .map(|(a, url)| (a, url.map(str::to_string)))
                .collect(),
        });
    }

    /// Every navigation lands on `url` instead of the requested one.
    pub fn redirect_to(&self, url: &str) {
        self.lock().redirect = Some(url.to_string());
    }

    /// The next `n` scripts fail the way they do while a page is navigating.
    pub fn fail_scripts(&self, n: usize) {
        self.lock().failing = n;
    }

    pub fn allow_fill(&self, selector: &str) {
        self.lock().fillable.push(selector.to_string());
    }

    pub fn set_cookie_jar(&self, cookies: Vec<BrowserCookie>) {
        self.lock().cookies = cookies;
    }

    pub fn scripts_matching(&self, needle: &str) -> Vec<String> {
        self.lock()
            .scripts
            .iter()
            .filter(|s| s.contains(needle))
            .cloned()
            .collect()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.lock().fills.clone()
    }

    pub fn jar(&self) -> Vec<BrowserCookie> {
        self.lock().cookies.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[async_trait]
impl RenderContext for ScriptedContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        let mut state = self.lock();
        state.navigations.push(url.to_string());
        state.url = state.redirect.clone().unwrap_or_else(|| url.to_string());
        Ok(NavigationResult {
            final_url: state.url.clone(),
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<Value> {
        let mut state = self.lock();
        state.scripts.push(script.to_string());
        if state.failing > 0 {
            state.failing -= 1;
            anyhow::bail!("Execution context was destroyed, most likely because of a navigation");
        }

        let step = state
            .rules
            .iter_mut()
            .find(|r| script.contains(&r.needle))
            .and_then(|rule| {
                if rule.answers.len() > 1 {
                    rule.answers.pop_front()
                } else {
                    rule.answers.front().cloned()
                }
            });
        let Some((answer, new_url)) = step else {
            return Ok(Value::Null);
        };
        if let Some(url) = new_url {
            state.url = url;
        }
        Ok(answer)
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.lock().url.clone())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.lock().content.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG".to_vec())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool> {
        let mut state = self.lock();
        if state.fillable.iter().any(|s| s == selector) {
            state.fills.push((selector.to_string(), value.to_string()));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.lock().keys.push(key.to_string());
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        Ok(self.lock().cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> Result<()> {
        self.lock().cookies.extend_from_slice(cookies);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}

/// Hands out pre-built scripted contexts in order.
#[derive(Default)]
pub(crate) struct ScriptedRenderer {
    queue: Mutex<VecDeque<ScriptedContext>>,
    pub shut_down: Mutex<bool>,
}

impl ScriptedRenderer {
    pub fn new(contexts: Vec<ScriptedContext>) -> Self {
        Self {
            queue: Mutex::new(contexts.into()),
            shut_down: Mutex::new(false),
        }
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let next = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted contexts left"))?;
        Ok(Box::new(next))
    }

    async fn shutdown(&self) -> Result<()> {
        *self.shut_down.lock().unwrap_or_else(|e| e.into_inner()) = true;
        Ok(())
    }
}
