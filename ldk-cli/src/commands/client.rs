//! Thin HTTP client for the fleet's management plane (spec §4.14). The CLI
//! never constructs an `Orchestrator` itself — it talks to one already
//! running, the same way a developer's own SDK talks to a service port.

use anyhow::{bail, Context, Result};
use serde_json::Value;

pub struct ManagementClient {
    base_url: String,
    http: reqwest::Client,
}

impl ManagementClient {
    pub fn new(base_url: &str) -> Self {
        ManagementClient { base_url: base_url.trim_end_matches('/').to_string(), http: reqwest::Client::new() }
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.http.get(&url).send().await.with_context(|| format!("GET {url}"))?;
        Self::into_json(resp).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.http.post(&url).json(body).send().await.with_context(|| format!("POST {url}"))?;
        Self::into_json(resp).await
    }

    async fn into_json(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        let body = resp.text().await.context("reading response body")?;
        if !status.is_success() {
            bail!("fleet returned {status}: {body}");
        }
        serde_json::from_str(&body).with_context(|| format!("parsing response body as JSON: {body}"))
    }
}
