use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::path::Path;
use tracing::info;

/// Append `records` to a CSV file.
///
/// Columns are the fields of the first record, in declaration order, minus
/// `ignore`. The header row is only written when the file is created.
pub fn append_records<P, T>(path: P, records: &[T], ignore: &[&str]) -> Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let path = path.as_ref();
    let rows = records
        .iter()
        .map(|record| -> Result<Map<String, Value>> {
            match serde_json::to_value(record)? {
                Value::Object(fields) => Ok(fields),
                _ => bail!("CSV records must serialize to objects"),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let Some(first) = rows.first() else {
        return Ok(());
    };
    let columns: Vec<&String> = first
        .keys()
        .filter(|key| !ignore.contains(&key.as_str()))
        .collect();

    let exists = path.is_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    if !exists {
        writer.write_record(&columns)?;
    }
    for row in &rows {
        writer.write_record(columns.iter().map(|&column| cell(row.get(column))))?;
    }
    writer.flush()?;

    info!("Appended {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
