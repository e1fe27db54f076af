use anyhow::{Context, Result};
use log::{debug, info, trace};

use crate::common::{Item, ItemsDocumentRef};

/// POST `{ "items": [...] }` to `{engine_url}/ingest/youtube`. Nothing is
/// sent for an empty list. Returns the number of items sent.
pub fn push(items: &[Item], engine_url: &str, token: &str) -> Result<usize> {
    if items.is_empty() {
        info!("No items to push");
        return Ok(0);
    }

    let url = format!("{}/ingest/youtube", engine_url.trim_end_matches('/'));
    let body = serde_json::to_string(&ItemsDocumentRef { items })?;
    debug!("POST {} items to {}", items.len(), &url);

    let resp = attohttpc::post(&url)
        .header("Content-Type", "application/json; charset=UTF-8")
        .bearer_auth(token)
        .text(body)
        .send()
        .with_context(|| format!("Request to {} failed", &url))?;

    let status = resp.status();
    let text = resp.text()?;
    trace!("Raw response: {}", &text);
    if !status.is_success() {
        anyhow::bail!("Error from {} - status {}: {}", &url, status, text.trim());
    }
    Ok(items.len())
}
