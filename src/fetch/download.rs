// src/fetch/download.rs
use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

use super::source::DataSource;

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fetch the raw CSV body for `source`.
pub async fn fetch_dataset(client: &Client, source: &DataSource) -> Result<Vec<u8>> {
    let start = Instant::now();
    let bytes = match source {
        DataSource::Remote(url) => fetch_remote(client, url).await?,
        DataSource::Local(path) => fs::read(path)
            .await
            .with_context(|| format!("reading dataset {}", path.display()))?,
    };
    info!(source = %source, bytes = bytes.len(), elapsed = ?start.elapsed(), "dataset fetched");
    Ok(bytes)
}

async fn fetch_remote(client: &Client, url: &Url) -> Result<Vec<u8>> {
    let mut attempt = 0;

    // retry loop
    loop {
        attempt += 1;

        let resp = client.get(url.clone()).send().await;
        match resp {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(body) => return Ok(body.to_vec()),
                Err(e) if attempt < MAX_RETRIES => {
                    warn!(%url, attempt, error = %e, "reading body failed, retrying");
                    sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("reading body from {}", url));
                }
            },
            Ok(resp) if attempt < MAX_RETRIES => {
                warn!(%url, attempt, status = %resp.status(), "bad status, retrying");
                sleep(RETRY_DELAY).await;
            }
            Ok(resp) => return Err(anyhow!("HTTP error fetching {}: {}", url, resp.status())),
            Err(e) if attempt < MAX_RETRIES => {
                warn!(%url, attempt, error = %e, "request failed, retrying");
                sleep(RETRY_DELAY).await;
            }
            Err(e) => return Err(e).with_context(|| format!("GET {}", url)),
        }
    }
}
