use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;
use tsr_core::Item;

/// Read a corpus file: a JSON array of item objects
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Item>> {
    let path = path.as_ref();
    info!("Reading JSON file: {}", path.display());

    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let data: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;

    let items = parse_corpus(data).with_context(|| format!("Invalid corpus {}", path.display()))?;
    info!("Found {} items", items.len());
    Ok(items)
}

/// Convert an already parsed JSON document into items
pub fn parse_corpus(data: Value) -> Result<Vec<Item>> {
    let Value::Array(entries) = data else {
        bail!("expected a JSON array of items");
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| Item::from_json(entry).with_context(|| format!("item at index {}", i)))
        .collect()
}

/// File-name part of a corpus path, used as the dataset name in reports
pub fn dataset_name<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tsr_core::ItemId;

    #[test]
    fn test_load_corpus() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("drugs.json");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"[
                {{"id": 1, "name": "a", "description": "", "embedding": [1.0, 0.0], "treats": [2]}},
                {{"id": 2, "name": "b", "description": "", "embedding": [0.0, 1.0]}}
            ]"#
        )
        .unwrap();

        let items = load_corpus(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].related("treats"), &[ItemId::Integer(2)]);
        assert_eq!(dataset_name(&path), "drugs.json");
    }

    #[test]
    fn test_rejects_non_array() {
        let err = parse_corpus(serde_json::json!({"id": 1})).unwrap_err();
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_reports_bad_item_index() {
        let err = parse_corpus(serde_json::json!([
            {"id": 1, "embedding": [1.0]},
            {"id": 2}
        ]))
        .unwrap_err();
        assert!(format!("{:#}", err).contains("index 1"));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_corpus("/nonexistent/corpus.json").is_err());
    }
}
