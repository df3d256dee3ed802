//! JSON-lines book catalogue reader.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use domain_recommendations::Document;
use domain_recommendations::models::TITLE_KEY;
use eyre::{Result, WrapErr};
use serde_json::{Map, Value};
use tracing::warn;

/// Which catalogue fields hold the title and the embedded text
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub title_field: String,
    pub content_field: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            title_field: "title".to_string(),
            content_field: "description".to_string(),
        }
    }
}

/// Documents read from a catalogue plus the number of lines left out
#[derive(Debug, Default)]
pub struct Catalogue {
    pub documents: Vec<Document>,
    pub skipped: usize,
}

pub fn read_catalogue(path: &Path, fields: &FieldMapping) -> Result<Catalogue> {
    let file =
        File::open(path).wrap_err_with(|| format!("Cannot open catalogue {}", path.display()))?;

    let mut catalogue = Catalogue::default();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: Map<String, Value> = serde_json::from_str(&line)
            .wrap_err_with(|| format!("{}:{} is not a JSON object", path.display(), line_no + 1))?;

        match to_document(record, fields) {
            Some(document) => catalogue.documents.push(document),
            None => {
                warn!(line = line_no + 1, field = %fields.content_field, "Skipping record without content");
                catalogue.skipped += 1;
            }
        }
    }

    Ok(catalogue)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `None` when the content field is missing or blank.
fn to_document(mut record: Map<String, Value>, fields: &FieldMapping) -> Option<Document> {
    let content = record
        .remove(&fields.content_field)
        .as_ref()
        .and_then(scalar)
        .filter(|c| !c.trim().is_empty())?;

    let mut document = Document::new(content);

    if let Some(title) = record.remove(&fields.title_field).as_ref().and_then(scalar) {
        document = document.with_metadata(TITLE_KEY, title);
    }

    for (key, value) in &record {
        if key == TITLE_KEY {
            continue;
        }
        if let Some(s) = scalar(value) {
            document = document.with_metadata(key.clone(), s);
        }
    }

    Some(document)
}
