//! Polling of per-channel Atom feeds
//!
//! Each `<entry>` becomes one video item. Entries are kept in the order the
//! feed lists them (newest first on the platform's feeds) and nothing is
//! capped or filtered by age.

use anyhow::Result;
use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::common::{Item, Service};
use crate::config::{FeedChannel, FeedErrorPolicy};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const YT_NS: &str = "http://www.youtube.com/xml/schemas/2015";

const USER_AGENT: &str = concat!("chanpull/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        source: attohttpc::Error,
    },

    #[error("Feed {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse feed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Document root is <{0}>, not an Atom <feed>")]
    NotAFeed(String),
}

/// One `<entry>` of a channel feed
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub video_id: String,
    pub title: String,
    pub url: Option<String>,
    pub published: Option<String>,
}

fn child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    ns: &str,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name && c.tag_name().namespace() == Some(ns))
}

fn child_text(node: roxmltree::Node, ns: &str, name: &str) -> Option<String> {
    child(node, ns, name)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// The entry's watch page: `rel="alternate"` link, else the first link with an href
fn entry_link(entry: roxmltree::Node) -> Option<String> {
    let links: Vec<roxmltree::Node> = entry
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "link" && c.tag_name().namespace() == Some(ATOM_NS))
        .filter(|c| c.attribute("href").is_some())
        .collect();

    links
        .iter()
        .find(|l| l.attribute("rel") == Some("alternate"))
        .or_else(|| links.first())
        .and_then(|l| l.attribute("href"))
        .map(|h| h.to_string())
}

/// Normalise a feed timestamp to RFC 3339 UTC, `None` if unparseable
fn normalize_date(value: &str) -> Option<String> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&chrono::Utc).to_rfc3339())
        .ok()
}

/// Parse an Atom document into its entries, in document order. Entries
/// without a video ID are skipped.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let doc = roxmltree::Document::parse(xml)?;
    let root = doc.root_element();
    if root.tag_name().name() != "feed" || root.tag_name().namespace() != Some(ATOM_NS) {
        return Err(FeedError::NotAFeed(root.tag_name().name().into()));
    }

    let mut entries = vec![];
    for (idx, entry) in root
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "entry" && c.tag_name().namespace() == Some(ATOM_NS))
        .enumerate()
    {
        let video_id = match child_text(entry, YT_NS, "videoId") {
            Some(id) => id,
            None => {
                warn!("Skipping feed entry {} with no video ID", idx);
                continue;
            }
        };

        let published = child_text(entry, ATOM_NS, "published").and_then(|p| {
            let norm = normalize_date(&p);
            if norm.is_none() {
                debug!("Unparseable publish date {:?} on {}", &p, &video_id);
            }
            norm
        });

        entries.push(FeedEntry {
            title: child_text(entry, ATOM_NS, "title").unwrap_or_default(),
            url: entry_link(entry),
            published,
            video_id,
        });
    }
    Ok(entries)
}

/// Retrieve the raw feed document. `channel_id`, when given, is appended to
/// the URL's query as `channel_id=...` (encoded by the client).
pub fn fetch_feed(url: &str, channel_id: Option<&str>) -> Result<String, FeedError> {
    debug!("Retrieving feed {} (channel {:?})", url, channel_id);
    let http_err = |source| FeedError::Http {
        url: url.into(),
        source,
    };

    let mut req = attohttpc::get(url)
        .header(attohttpc::header::USER_AGENT, USER_AGENT)
        .header(attohttpc::header::ACCEPT, "application/atom+xml");
    if let Some(id) = channel_id {
        req = req.param("channel_id", id);
    }
    let resp = req.send().map_err(http_err)?;

    if !resp.is_success() {
        return Err(FeedError::Status {
            url: url.into(),
            status: resp.status().as_u16(),
        });
    }

    let text = resp.text().map_err(http_err)?;
    trace!("Raw feed: {}", &text);
    Ok(text)
}

/// Video items for one channel, `channel` being the configured display name
pub fn channel_videos(chan: &FeedChannel) -> Result<Vec<Item>, FeedError> {
    let xml = fetch_feed(&chan.feed_url, chan.channel_id.as_deref())?;
    let entries = parse_feed(&xml)?;
    debug!("{} entries in feed for {}", entries.len(), &chan.name);

    Ok(entries
        .into_iter()
        .map(|e| Item {
            title: Some(e.title),
            channel: Some(chan.name.clone()),
            url: e.url,
            published_at: e.published,
            ..Item::new(Service::Youtube, e.video_id)
        })
        .collect())
}

/// Poll every channel in order and gather their entries. With
/// `FeedErrorPolicy::Abort` the first failing feed ends the run; with `Skip`
/// the channel is logged and left out.
pub fn collect_videos(channels: &[FeedChannel], policy: FeedErrorPolicy) -> Result<Vec<Item>> {
    let mut items = vec![];
    for chan in channels {
        info!("Polling feed for {}", &chan.name);
        match channel_videos(chan) {
            Ok(videos) => items.extend(videos),
            Err(e) => match policy {
                FeedErrorPolicy::Abort => {
                    return Err(anyhow::Error::new(e).context(format!("Feed for {} failed", &chan.name)))
                }
                FeedErrorPolicy::Skip => {
                    warn!("Skipping {}: {}", &chan.name, e);
                }
            },
        }
    }
    Ok(items)
}
