use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use log::{debug, info, trace, warn};
use regex::Regex;

use crate::common::{Item, Service};

lazy_static! {
    static ref VIEW_COUNT_RE: Regex = Regex::new(r#""viewCount":"(\d+)""#).unwrap();
}

/// View count embedded in a watch page's player data, if present
pub fn parse_view_count(html: &str) -> Option<u64> {
    VIEW_COUNT_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Snapshot item for one video. The `yt:` prefix keeps snapshot IDs apart
/// from channel and video item IDs.
pub fn snapshot(video_id: &str, view_count: u64, captured_at: &DateTime<Utc>) -> Item {
    Item {
        view_count: Some(view_count),
        captured_at: Some(captured_at.to_rfc3339()),
        ..Item::new(Service::Youtube, format!("yt:{}", video_id))
    }
}

/// Retrieve the watch page for `video_id`
pub fn fetch_watch_page(watch_base: &str, video_id: &str) -> Result<String> {
    debug!("Retrieving watch page for {}", video_id);
    let resp = attohttpc::get(watch_base)
        .param("v", video_id)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .with_context(|| format!("Request for watch page of {} failed", video_id))?;

    let status = resp.status();
    let text = resp.text()?;
    trace!("Raw watch page: {}", &text);
    if !status.is_success() {
        anyhow::bail!("Watch page for {} returned status {}", video_id, status);
    }
    Ok(text)
}

/// One snapshot per video whose page carries a view count. Videos without
/// one are skipped with a warning; a failed request aborts the run.
pub fn collect_views(watch_base: &str, video_ids: &[&str], captured_at: &DateTime<Utc>) -> Result<Vec<Item>> {
    let mut items = vec![];
    for id in video_ids {
        let html = fetch_watch_page(watch_base, id)?;
        match parse_view_count(&html) {
            Some(count) => {
                info!("{} has {} views", id, count);
                items.push(snapshot(id, count, captured_at));
            }
            None => warn!("No view count found for {}", id),
        }
    }
    Ok(items)
}
