//! Best-effort files for the buckets and the blacklist.
//!
//! Records are written as `[`, one JSON object plus `,\n` per record, then
//! `]`. That is not strict JSON when records are present, so loading strips
//! the trailing comma before parsing.
use std::path::Path;

use tracing::{debug, warn};

use crate::blacklist::Blacklist;
use crate::error::Result;
use crate::record::NationRecord;

pub fn render_records(records: &[NationRecord]) -> Result<String> {
    let mut out = String::from("[");
    for record in records {
        out.push_str(&record.to_json()?);
        out.push_str(",\n");
    }
    out.push(']');
    Ok(out)
}

/// Write `records` to `path`; failures are logged and dropped
pub fn save_records(path: &Path, records: &[NationRecord]) {
    let written = render_records(records).and_then(|body| Ok(std::fs::write(path, body)?));
    match written {
        Ok(()) => debug!("Saved {} nations to {}", records.len(), path.display()),
        Err(e) => debug!("Could not save {}: {}", path.display(), e),
    }
}

/// Read records saved by [`save_records`], or a strict JSON array.
/// Anything unreadable yields no records.
pub fn load_records(path: &Path) -> Vec<NationRecord> {
    match read_records(path) {
        Ok(records) => records,
        Err(e) => {
            debug!("No nations loaded from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn read_records(path: &Path) -> Result<Vec<NationRecord>> {
    let body = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&strip_trailing_comma(&body))?)
}

fn strip_trailing_comma(body: &str) -> String {
    let trimmed = body.trim_end();
    match trimmed.strip_suffix(']') {
        Some(head) => {
            let head = head.trim_end();
            let head = head.strip_suffix(',').unwrap_or(head);
            format!("{}]", head)
        }
        None => trimmed.to_string(),
    }
}

/// Missing or malformed blacklist files mean no rules
pub fn load_blacklist(path: &Path) -> Blacklist {
    let loaded: Result<Blacklist> = std::fs::read_to_string(path)
        .map_err(Into::into)
        .and_then(|body| Ok(serde_json::from_str(&body)?));
    match loaded {
        Ok(blacklist) => blacklist,
        Err(e) => {
            warn!("No blacklist loaded from {}: {}", path.display(), e);
            Blacklist::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::{tempdir, NamedTempFile};

    use super::*;
    use crate::blacklist::is_blacklisted;

    #[test]
    fn saved_bytes_match_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved_nations");
        save_records(
            &path,
            &[
                NationRecord::new("Potato").with("region", "potato"),
                NationRecord::new("Potato2").with("region", "potato"),
            ],
        );
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[{\"name\":\"Potato\",\"region\":\"potato\"},\n{\"name\":\"Potato2\",\"region\":\"potato\"},\n]"
        );
    }

    #[test]
    fn empty_buckets_render_as_empty_array() {
        assert_eq!(render_records(&[]).unwrap(), "[]");
    }

    #[test]
    fn saved_records_load_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rented_nations");
        let records = vec![
            NationRecord::new("Potato").with("region", "the_field"),
            NationRecord::new("Tomato"),
        ];
        save_records(&path, &records);
        assert_eq!(load_records(&path), records);
    }

    #[test]
    fn strict_json_loads_too() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name": "Potato"}}, {{"name": "Tomato"}}]"#).unwrap();
        let names: Vec<String> = load_records(file.path())
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["Potato", "Tomato"]);
    }

    #[test]
    fn unreadable_files_load_empty() {
        let dir = tempdir().unwrap();
        assert!(load_records(&dir.path().join("missing")).is_empty());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_records(file.path()).is_empty());
    }

    #[test]
    fn save_into_missing_directory_is_ignored() {
        let dir = tempdir().unwrap();
        save_records(
            &dir.path().join("nope").join("saved_nations"),
            &[NationRecord::new("Potato")],
        );
    }

    #[test]
    fn blacklist_loads_rules() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"region": {{"exact": ["The Field"]}}}}"#).unwrap();
        let blacklist = load_blacklist(file.path());
        let record = NationRecord::new("Potato").with("region", "the field");
        assert!(is_blacklisted(&record, &blacklist));

        let dir = tempdir().unwrap();
        assert!(load_blacklist(&dir.path().join("blacklists")).is_empty());
    }
}
