use std::collections::HashMap;

use anyhow::{Context, Result};
use log::{debug, trace, warn};

use crate::common::ChannelRecord;

/// The channels endpoint accepts at most this many ids per request
const MAX_IDS_PER_REQUEST: usize = 50;

#[derive(Serialize, Deserialize, Debug, Clone)]
struct YTSearchListResponse {
    #[serde(default)]
    items: Vec<YTSearchResult>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct YTSearchResult {
    snippet: YTSearchSnippet,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct YTSearchSnippet {
    channel_id: String,
    #[serde(default)]
    channel_title: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct YTChannelListResponse {
    #[serde(default)]
    items: Vec<YTChannel>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct YTChannel {
    id: String,
    statistics: YTChannelStatistics,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct YTChannelStatistics {
    // Sent as a string by the API
    subscriber_count: Option<String>,
    #[serde(default)]
    hidden_subscriber_count: bool,
}

/// Why a name did not resolve to a channel
#[derive(Debug, Clone, PartialEq)]
pub enum UnresolvedReason {
    NoMatch,
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::NoMatch => write!(f, "no matching channel"),
        }
    }
}

/// Outcome of looking up a single name
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { name: String, id: String },
    Unresolved { name: String, reason: UnresolvedReason },
}

/// Outcomes of a resolve run, in the order the names were given
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolveReport {
    pub outcomes: Vec<Resolution>,
}

impl ResolveReport {
    /// `(name, channel id)` for every name that resolved
    pub fn resolved(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            Resolution::Resolved { name, id } => Some((name.as_str(), id.as_str())),
            Resolution::Unresolved { .. } => None,
        })
    }

    pub fn unresolved(&self) -> impl Iterator<Item = (&str, &UnresolvedReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            Resolution::Unresolved { name, reason } => Some((name.as_str(), reason)),
            Resolution::Resolved { .. } => None,
        })
    }

    /// One line for the end of a run
    pub fn summary(&self) -> String {
        let missing: Vec<&str> = self.unresolved().map(|(name, _)| name).collect();
        let found = self.outcomes.len() - missing.len();
        if missing.is_empty() {
            format!("Resolved {} of {} names", found, self.outcomes.len())
        } else {
            format!(
                "Resolved {} of {} names (unresolved: {})",
                found,
                self.outcomes.len(),
                missing.join(", ")
            )
        }
    }

    /// Combine resolved names with subscriber counts into channel records.
    /// Channels without a known count get 0.
    pub fn to_records(&self, subscribers: &HashMap<String, u64>) -> Vec<ChannelRecord> {
        self.resolved()
            .map(|(name, id)| ChannelRecord {
                id: id.into(),
                name: name.into(),
                subscribers: subscribers.get(id).copied().unwrap_or(0),
            })
            .collect()
    }
}

/// GET `url` with query `params` and deserialise the JSON body. A non-success
/// status is an error.
fn request_data<T: serde::de::DeserializeOwned + std::fmt::Debug>(
    url: &str,
    params: &[(&str, &str)],
) -> Result<T> {
    // Keep the API key out of logs
    let logged: Vec<&(&str, &str)> = params.iter().filter(|p| p.0 != "key").collect();
    debug!("Retrieving URL {} {:?}", url, logged);

    let mut req = attohttpc::get(url);
    for &(k, v) in params {
        req = req.param(k, v);
    }
    let resp = req.send().with_context(|| format!("Request to {} failed", url))?;
    let status = resp.status();
    let text = resp.text()?;
    trace!("Raw response: {}", &text);
    if !status.is_success() {
        anyhow::bail!("Error from {} - status {}: {}", url, status, text.trim());
    }
    let data: T = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse response from {}", url))?;
    trace!("Raw deserialisation: {:?}", &data);
    Ok(data)
}

/// Client for the platform's search API
#[derive(Debug)]
pub struct SearchClient {
    base: String,
    api_key: Option<String>,
}

impl SearchClient {
    /// `base` is the API prefix, e.g `https://www.googleapis.com/youtube/v3`
    pub fn new(base: &str, api_key: Option<String>) -> SearchClient {
        SearchClient {
            base: base.trim_end_matches('/').into(),
            api_key,
        }
    }

    fn with_key<'a>(&'a self, mut params: Vec<(&'a str, &'a str)>) -> Vec<(&'a str, &'a str)> {
        if let Some(key) = &self.api_key {
            params.push(("key", key.as_str()));
        }
        params
    }

    /// Best guess channel ID for `name`: the single top channel result.
    /// `None` when the search finds nothing.
    pub fn find_channel_id(&self, name: &str) -> Result<Option<String>> {
        let url = format!("{}/search", self.base);
        let params = self.with_key(vec![
            ("part", "snippet"),
            ("q", name),
            ("type", "channel"),
            ("maxResults", "1"),
        ]);
        let d: YTSearchListResponse = request_data(&url, &params)?;

        Ok(d.items.into_iter().next().map(|i| {
            debug!("Top match for {:?} is {:?} ({:?})", name, i.snippet.channel_id, i.snippet.channel_title);
            i.snippet.channel_id
        }))
    }

    /// Look up every name in turn. Names with no match are reported as
    /// unresolved; a failed request aborts the run.
    pub fn resolve(&self, names: &[String]) -> Result<ResolveReport> {
        if self.api_key.is_none() {
            warn!("No search API key set, requests will likely be rejected");
        }

        let mut report = ResolveReport::default();
        for name in names {
            let outcome = match self.find_channel_id(name)? {
                Some(id) => {
                    debug!("{} -> {}", name, id);
                    Resolution::Resolved {
                        name: name.clone(),
                        id,
                    }
                }
                None => {
                    let reason = UnresolvedReason::NoMatch;
                    warn!("Could not find channel for {}: {}", name, reason);
                    Resolution::Unresolved {
                        name: name.clone(),
                        reason,
                    }
                }
            };
            report.outcomes.push(outcome);
        }
        Ok(report)
    }

    /// Subscriber counts keyed by channel ID. Hidden counts read as 0; IDs
    /// the API does not return are absent from the map.
    pub fn fetch_subscribers(&self, ids: &[&str]) -> Result<HashMap<String, u64>> {
        let url = format!("{}/channels", self.base);
        let mut counts = HashMap::new();

        for batch in ids.chunks(MAX_IDS_PER_REQUEST) {
            let joined = batch.join(",");
            let params = self.with_key(vec![("part", "statistics"), ("id", joined.as_str())]);
            let d: YTChannelListResponse = request_data(&url, &params)?;

            for chan in d.items {
                let stats = &chan.statistics;
                let count = if stats.hidden_subscriber_count {
                    0
                } else {
                    stats
                        .subscriber_count
                        .as_deref()
                        .map(|c| c.parse::<u64>())
                        .transpose()
                        .with_context(|| format!("Invalid subscriber count for {}", &chan.id))?
                        .unwrap_or(0)
                };
                counts.insert(chan.id, count);
            }
        }
        Ok(counts)
    }
}
