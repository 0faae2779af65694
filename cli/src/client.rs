//! HTTP client for a running node.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use cipherscreen_core::api::types::ErrorResponse;
use cipherscreen_engine::EnginePublicInfo;
use cipherscreen_identity::Keypair;
use log::debug;
use reqwest::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;

const DEFAULT_NODE_URL: &str = "http://127.0.0.1:8080";

pub struct NodeClient {
    base_url: String,
    http: reqwest::Client,
}

impl NodeClient {
    /// Uses `CS_NODE_URL`, falling back to the local default.
    pub fn from_env() -> Self {
        let base_url = std::env::var("CS_NODE_URL").unwrap_or_else(|_| DEFAULT_NODE_URL.into());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;
        read_response(resp).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path} failed"))?;
        read_response(resp).await
    }

    /// Signs `payload` for `operation` with a fresh nonce and posts it.
    pub async fn signed<P: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &str,
        key: &Keypair,
        payload: &P,
    ) -> Result<T> {
        let nonce = next_nonce();
        debug!("Signing {} for {} with nonce {}", operation, path, nonce);
        let call = key.sign_call(operation, nonce, payload)?;
        self.post(path, &call).await
    }

    pub async fn committee(&self) -> Result<EnginePublicInfo> {
        self.get("/engine/committee").await
    }
}

/// Milliseconds since the epoch, so successive invocations keep increasing.
fn next_nonce() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

async fn read_response<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return resp.json().await.context("invalid response body");
    }

    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => bail!("{} ({}): {}", err.code, status, err.error),
        Err(_) => bail!("{}: {}", status, body),
    }
}
