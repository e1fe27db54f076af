use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use thiserror::Error;

use crate::common::{ChannelRecord, Item, ItemsDocument, ItemsDocumentRef};

#[derive(Error, Debug)]
pub enum ChannelFileError {
    #[error("Failed to read channels file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channels file is not a list of {{id, name, subscribers}} records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Channel record {index} has an empty `{field}`")]
    EmptyField { index: usize, field: &'static str },
}

fn is_stdout(path: &Path) -> bool {
    path == Path::new("-")
}

/// Pretty-print `value` (2-space indent, non-ASCII kept as-is) to `path`,
/// replacing whatever was there. `-` writes to stdout.
fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    if is_stdout(path) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        serde_json::to_writer_pretty(&mut lock, value)?;
        writeln!(lock)?;
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }

    debug!("Writing {:?}", path);
    let mut f = std::fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    serde_json::to_writer_pretty(&mut f, value)?;
    writeln!(f)?;
    Ok(())
}

/// Write `{ "items": [...] }` to `path`, overwriting any existing file
pub fn export(items: &[Item], path: &Path) -> Result<()> {
    write_json(&ItemsDocumentRef { items }, path)
}

/// Read back a document written by `export`
pub fn load_items(path: &Path) -> Result<Vec<Item>> {
    let f = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let doc: ItemsDocument = serde_json::from_reader(std::io::BufReader::new(f))
        .with_context(|| format!("Failed to parse items document {:?}", path))?;
    Ok(doc.items)
}

/// Write the channels file that `normalize` reads
pub fn save_channels(records: &[ChannelRecord], path: &Path) -> Result<()> {
    write_json(&records, path)
}

/// Read and validate a channels file
pub fn load_channels(path: &Path) -> Result<Vec<ChannelRecord>, ChannelFileError> {
    let f = std::fs::File::open(path)?;
    let records: Vec<ChannelRecord> = serde_json::from_reader(std::io::BufReader::new(f))?;

    for (index, r) in records.iter().enumerate() {
        if r.id.trim().is_empty() {
            return Err(ChannelFileError::EmptyField { index, field: "id" });
        }
        if r.name.trim().is_empty() {
            return Err(ChannelFileError::EmptyField { index, field: "name" });
        }
    }
    Ok(records)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::Service;

    fn video(id: &str, title: &str) -> Item {
        Item {
            title: Some(title.into()),
            channel: Some("Sheebah Karungi".into()),
            url: Some(format!("https://www.youtube.com/watch?v={}", id)),
            ..Item::new(Service::Youtube, id)
        }
    }

    #[test]
    fn test_export_round_trip() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("out").join("items.json");

        let items = vec![
            Item {
                artist_name: Some("Sheebah Karungi".into()),
                subscribers: Some(1_020_000),
                ..Item::new(Service::Youtube, "UC-sheebah")
            },
            video("vid-1", "Nkwatako – Ékyo"),
        ];
        export(&items, &path)?;
        assert_eq!(load_items(&path)?, items);
        Ok(())
    }

    #[test]
    fn test_export_layout() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("items.json");

        export(&[video("vid-1", "Nnyimba – Ékyo")], &path)?;
        let text = std::fs::read_to_string(&path)?;
        assert_eq!(
            text,
            r#"{
  "items": [
    {
      "source": "youtube",
      "external_id": "vid-1",
      "title": "Nnyimba – Ékyo",
      "channel": "Sheebah Karungi",
      "url": "https://www.youtube.com/watch?v=vid-1"
    }
  ]
}
"#
        );
        Ok(())
    }

    #[test]
    fn test_export_empty() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("items.json");
        export(&[], &path)?;
        assert_eq!(std::fs::read_to_string(&path)?, "{\n  \"items\": []\n}\n");
        Ok(())
    }

    #[test]
    fn test_export_overwrites() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("items.json");

        export(&[video("first-1", "One"), video("first-2", "Two")], &path)?;
        export(&[video("second-1", "Three")], &path)?;

        let items = load_items(&path)?;
        assert_eq!(items, vec![video("second-1", "Three")]);
        Ok(())
    }

    #[test]
    fn test_channels_round_trip() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("channels.json");
        let records = vec![ChannelRecord {
            id: "UC-azawi".into(),
            name: "Azawi".into(),
            subscribers: 310_000,
        }];
        save_channels(&records, &path)?;
        assert_eq!(load_channels(&path)?, records);
        Ok(())
    }

    #[test]
    fn test_load_channels_validation() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("channels.json");

        std::fs::write(
            &path,
            r#"[{"id": "UC-1", "name": "Vinka", "subscribers": 5}, {"id": " ", "name": "Pallaso", "subscribers": 1}]"#,
        )?;
        match load_channels(&path) {
            Err(ChannelFileError::EmptyField { index, field }) => {
                assert_eq!(index, 1);
                assert_eq!(field, "id");
            }
            other => panic!("unexpected {:?}", other),
        }

        std::fs::write(&path, r#"[{"id": "UC-1", "name": "Vinka"}]"#)?;
        assert!(matches!(load_channels(&path), Err(ChannelFileError::Json(_))));

        assert!(matches!(
            load_channels(&tmp.path().join("missing.json")),
            Err(ChannelFileError::Io(_))
        ));
        Ok(())
    }
}
