use crate::common::{ChannelRecord, Item, Service};

/// Channel summary items, one per record, in input order
pub fn normalize(records: &[ChannelRecord]) -> Vec<Item> {
    records
        .iter()
        .map(|r| Item {
            artist_name: Some(r.name.clone()),
            subscribers: Some(r.subscribers),
            ..Item::new(Service::Youtube, r.id.clone())
        })
        .collect()
}
