use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use crate::common::ChannelRecord;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Feed {0:?} needs either `url` or `channel_id`")]
    FeedSource(String),

    #[error("Unable to determine configuration directories")]
    NoConfigDir,
}

/// What to do when a single channel's feed cannot be fetched or parsed
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FeedErrorPolicy {
    /// Stop the whole run on the first failing feed
    Abort,
    /// Log a warning, drop the channel and carry on
    Skip,
}

impl Default for FeedErrorPolicy {
    fn default() -> Self {
        FeedErrorPolicy::Abort
    }
}

/// A channel to poll, as written in the config
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    pub name: String,
    pub url: Option<String>,
    pub channel_id: Option<String>,
}

/// A channel to poll. When `channel_id` is set it is added to `feed_url` as
/// the `channel_id` query parameter at request time.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedChannel {
    pub name: String,
    pub feed_url: String,
    pub channel_id: Option<String>,
}

impl FeedChannel {
    pub fn from_url(name: &str, url: &str) -> FeedChannel {
        FeedChannel {
            name: name.into(),
            feed_url: url.into(),
            channel_id: None,
        }
    }

    pub fn from_channel_id(name: &str, channel_id: &str, feed_base: &str) -> FeedChannel {
        FeedChannel {
            name: name.into(),
            feed_url: feed_base.into(),
            channel_id: Some(channel_id.into()),
        }
    }

    pub fn from_record(record: &ChannelRecord, feed_base: &str) -> FeedChannel {
        FeedChannel::from_channel_id(&record.name, &record.id, feed_base)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl EngineConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok()
    }
}

fn default_token_env() -> String {
    "INTERNAL_TOKEN".into()
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name of the environment variable holding the search API key
    pub api_key_env: String,
    pub search_base: String,
    pub feed_base: String,
    /// Watch page URL, the video ID goes in the `v` query parameter
    pub watch_base: String,
    pub channels_file: PathBuf,
    pub items_file: PathBuf,
    pub videos_file: PathBuf,
    pub views_file: PathBuf,
    pub on_feed_error: FeedErrorPolicy,
    pub artists: Vec<String>,
    pub feeds: Vec<FeedConfig>,
    pub engine: Option<EngineConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key_env: "YOUTUBE_API_KEY".into(),
            search_base: "https://www.googleapis.com/youtube/v3".into(),
            feed_base: "https://www.youtube.com/feeds/videos.xml".into(),
            watch_base: "https://www.youtube.com/watch".into(),
            channels_file: "youtube_channels.json".into(),
            items_file: "youtube_items.json".into(),
            videos_file: "youtube_videos.json".into(),
            views_file: "youtube_views.json".into(),
            on_feed_error: FeedErrorPolicy::default(),
            artists: vec![],
            feeds: vec![],
            engine: None,
        }
    }
}

impl Config {
    /// Location of the config file when none is given explicitly.
    /// `CHANPULL_CONFIG_DIR` overrides the platform config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(dir) = std::env::var("CHANPULL_CONFIG_DIR") {
            return Ok(PathBuf::from(dir).join("config.toml"));
        }
        let pd = ProjectDirs::from("org", "chanpull", "chanpull").ok_or(ConfigError::NoConfigDir)?;
        Ok(pd.config_dir().join("config.toml"))
    }

    /// Load config from `path`, or the default location. A missing file
    /// gives the default config.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Config::default_path()?,
        };

        if !path.exists() {
            info!("No config file at {:?}, using defaults", &path);
            return Ok(Config::default());
        }

        debug!("Loading config from {:?}", &path);
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Config::from_toml(&text).map_err(|source| ConfigError::Toml { path, source })
    }

    pub fn from_toml(text: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(text)
    }

    /// Search API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }

    /// Configured feeds, in order, with URLs resolved
    pub fn feed_channels(&self) -> Result<Vec<FeedChannel>, ConfigError> {
        self.feeds
            .iter()
            .map(|f| match (&f.url, &f.channel_id) {
                (Some(url), _) => Ok(FeedChannel::from_url(&f.name, url)),
                (None, Some(id)) => Ok(FeedChannel::from_channel_id(&f.name, id, &self.feed_base)),
                (None, None) => Err(ConfigError::FeedSource(f.name.clone())),
            })
            .collect()
    }
}
