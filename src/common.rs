/// Supported services
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Youtube,
}

/// Hand-maintained summary of a channel: the shape of each entry in the
/// channels file written by `resolve`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    pub subscribers: u64,
}

/// Normalized output record. One of a channel summary (`artist_name` +
/// `subscribers`), a single video entry (`title` + `channel` + `url`) or a
/// view count snapshot (`view_count` + `captured_at`), never mixed in the
/// same document.
///
/// Field order here is the field order on disk.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Item {
    pub source: Service,
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,
}

impl Item {
    /// Item carrying only the shared fields
    pub fn new(source: Service, external_id: impl Into<String>) -> Self {
        Item {
            source,
            external_id: external_id.into(),
            artist_name: None,
            subscribers: None,
            title: None,
            channel: None,
            url: None,
            published_at: None,
            view_count: None,
            captured_at: None,
        }
    }
}

/// Top level of every exported file and of the push body
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ItemsDocument {
    pub items: Vec<Item>,
}

/// Borrowed `ItemsDocument`, for writing without cloning the items
#[derive(Serialize, Debug, Clone, Copy)]
pub struct ItemsDocumentRef<'a> {
    pub items: &'a [Item],
}
