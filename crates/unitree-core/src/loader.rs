//! ---
//! utr_section: "04-lifecycle-engine"
//! utr_subsection: "module"
//! utr_type: "source"
//! utr_scope: "code"
//! utr_description: "Unit lifecycle engine and collaborator seams."
//! utr_version: "v0.0.0-prealpha"
//! utr_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request options forwarded untouched to [`ResourceLoader::fetch_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// HTTP-style method, `GET` unless set.
    #[serde(default = "FetchOptions::default_method")]
    pub method: String,
    /// Request headers in insertion order.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Optional request body.
    #[serde(default)]
    pub body: Option<Value>,
}

impl FetchOptions {
    fn default_method() -> String {
        "GET".to_owned()
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Self::default_method(),
            headers: IndexMap::new(),
            body: None,
        }
    }
}

/// Collaborator that fetches styles, templates and remote data on behalf of units.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Load the stylesheets at `urls`.
    async fn load_css(&self, urls: &[String]) -> anyhow::Result<()>;

    /// Load a template's source text.
    async fn load_template(&self, url: &str) -> anyhow::Result<String>;

    /// Fetch a data payload.
    async fn fetch_data(&self, url: &str, options: FetchOptions) -> anyhow::Result<Value>;
}

/// Loader used when the host did not configure one. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredLoader;

#[async_trait]
impl ResourceLoader for UnconfiguredLoader {
    async fn load_css(&self, urls: &[String]) -> anyhow::Result<()> {
        Err(anyhow!(
            "no resource loader configured; cannot load styles {}",
            urls.join(", ")
        ))
    }

    async fn load_template(&self, url: &str) -> anyhow::Result<String> {
        Err(anyhow!("no resource loader configured; cannot load template {url}"))
    }

    async fn fetch_data(&self, url: &str, _options: FetchOptions) -> anyhow::Result<Value> {
        Err(anyhow!("no resource loader configured; cannot fetch {url}"))
    }
}

/// A call observed by [`InMemoryLoader`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderCall {
    /// `load_css` with the requested urls.
    Css(Vec<String>),
    /// `load_template` for a url.
    Template(String),
    /// `fetch_data` for a url.
    Data {
        /// Requested url.
        url: String,
        /// Options passed by the caller.
        options: FetchOptions,
    },
}

#[derive(Debug, Default)]
struct LoaderState {
    templates: HashMap<String, String>,
    payloads: HashMap<String, Value>,
    stylesheets: Vec<String>,
    calls: Vec<LoaderCall>,
}

/// In-process loader serving registered templates and payloads.
///
/// Every call is recorded so embedders and tests can inspect traffic.
/// Stylesheets always load; templates and payloads fail when unregistered.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    state: Arc<Mutex<LoaderState>>,
}

impl InMemoryLoader {
    /// Loader with nothing registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register template source for `url`.
    pub fn with_template(self, url: impl Into<String>, source: impl Into<String>) -> Self {
        self.state.lock().templates.insert(url.into(), source.into());
        self
    }

    /// Register a data payload for `url`.
    pub fn with_payload(self, url: impl Into<String>, payload: Value) -> Self {
        self.state.lock().payloads.insert(url.into(), payload);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<LoaderCall> {
        self.state.lock().calls.clone()
    }

    /// Stylesheet urls loaded so far, in order.
    pub fn stylesheets(&self) -> Vec<String> {
        self.state.lock().stylesheets.clone()
    }
}

#[async_trait]
impl ResourceLoader for InMemoryLoader {
    async fn load_css(&self, urls: &[String]) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.calls.push(LoaderCall::Css(urls.to_vec()));
        state.stylesheets.extend(urls.iter().cloned());
        Ok(())
    }

    async fn load_template(&self, url: &str) -> anyhow::Result<String> {
        let mut state = self.state.lock();
        state.calls.push(LoaderCall::Template(url.to_owned()));
        state
            .templates
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("template {url} not found"))
    }

    async fn fetch_data(&self, url: &str, options: FetchOptions) -> anyhow::Result<Value> {
        let mut state = self.state.lock();
        state.calls.push(LoaderCall::Data {
            url: url.to_owned(),
            options,
        });
        state
            .payloads
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no payload registered for {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn in_memory_loader_serves_and_records() {
        let loader = InMemoryLoader::new()
            .with_template("card.html", "<div>{{title}}</div>")
            .with_payload("/api/cards", json!([{"title": "a"}]));

        loader.load_css(&["card.css".to_owned()]).await.unwrap();
        let template = loader.load_template("card.html").await.unwrap();
        assert_eq!(template, "<div>{{title}}</div>");
        let data = loader
            .fetch_data("/api/cards", FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(data, json!([{"title": "a"}]));
        assert!(loader.load_template("missing.html").await.is_err());

        assert_eq!(loader.stylesheets(), vec!["card.css".to_owned()]);
        assert_eq!(loader.calls().len(), 4);
        assert_eq!(loader.calls()[0], LoaderCall::Css(vec!["card.css".into()]));
    }

    #[tokio::test]
    async fn unconfigured_loader_names_the_resource() {
        let err = UnconfiguredLoader
            .fetch_data("/api/x", FetchOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/api/x"));
    }

    #[test]
    fn fetch_options_default_to_get() {
        let options: FetchOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options, FetchOptions::default());
        assert_eq!(options.method, "GET");
    }
}
