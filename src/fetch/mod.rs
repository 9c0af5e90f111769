//! HTTP plumbing shared by the weather providers.

mod client;
mod basic;
pub mod auth;

pub use client::HttpClient;
pub use basic::BasicClient;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Issues a GET for `url` through `client` and decodes the body as JSON.
///
/// Non-2xx responses are turned into an error carrying the status and body.
pub async fn fetch_json<C, T>(client: &C, url: &str) -> Result<T>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse::<reqwest::Url>().with_context(|| format!("invalid url '{url}'"))?,
    );

    let resp = client.execute(req).await?;
    let status = resp.status();
    debug!(%status, "Provider responded");

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow::anyhow!("upstream returned status {}: {}", status, body));
    }

    resp.json::<T>()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to parse response: {}", e))
}
