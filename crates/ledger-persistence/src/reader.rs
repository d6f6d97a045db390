//! Raw fill input.
//!
//! Accepts either a JSON array of fills or JSON Lines (one fill per line).
//! A directory is read as an ordered sequence of pages, one per file, sorted
//! by file name, the way a paginated export lands on disk.

use std::fs;
use std::path::{Path, PathBuf};

use ledger_core::RawFill;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{PersistenceError, PersistenceResult};

/// One page of raw fills.
#[derive(Debug, Clone, Default)]
pub struct FillPage {
    pub source: PathBuf,
    pub fills: Vec<RawFill>,
    /// Entries that were not a decodable fill object.
    pub unreadable: u64,
}

/// Read a single file of fills.
pub fn read_fills(path: &Path) -> PersistenceResult<FillPage> {
    let content = fs::read_to_string(path)?;
    let mut page = FillPage {
        source: path.to_path_buf(),
        ..Default::default()
    };

    if content.trim_start().starts_with('[') {
        let entries: Vec<Value> = serde_json::from_str(&content)?;
        for entry in entries {
            match serde_json::from_value::<RawFill>(entry) {
                Ok(fill) => page.fills.push(fill),
                Err(e) => {
                    debug!(?e, "Unreadable fill entry");
                    page.unreadable += 1;
                }
            }
        }
    } else {
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RawFill>(line) {
                Ok(fill) => page.fills.push(fill),
                Err(e) => {
                    debug!(?e, line = line_no + 1, "Unreadable fill line");
                    page.unreadable += 1;
                }
            }
        }
    }

    if page.unreadable > 0 {
        warn!(
            path = %path.display(),
            unreadable = page.unreadable,
            "Skipped unreadable fill records"
        );
    }
    debug!(path = %path.display(), fills = page.fills.len(), "Read fill page");

    Ok(page)
}

/// Read a file, or every `.json`/`.jsonl` file in a directory in name order.
pub fn read_fill_pages(path: &Path) -> PersistenceResult<Vec<FillPage>> {
    if !path.exists() {
        return Err(PersistenceError::NotFound(path.display().to_string()));
    }

    if path.is_file() {
        return Ok(vec![read_fills(path)?]);
    }

    let mut files: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("json") | Some("jsonl")
                )
        })
        .collect();
    files.sort();

    info!(dir = %path.display(), pages = files.len(), "Reading fill pages");

    files.iter().map(|file| read_fills(file)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const FILL_A: &str = r#"{"symbol":"BTCUSDC","time":1,"side":"BUY","price":"100","qty":"1","orderId":1}"#;
    const FILL_B: &str = r#"{"symbol":"BTCUSDC","time":2,"side":"SELL","price":"101","qty":"1","orderId":2}"#;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_json_array() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "fills.json", &format!("[{FILL_A},{FILL_B},42]"));

        let page = read_fills(&path).unwrap();
        assert_eq!(page.fills.len(), 2);
        assert_eq!(page.unreadable, 1);
        assert_eq!(page.fills[0].symbol.as_deref(), Some("BTCUSDC"));
    }

    #[test]
    fn test_read_json_lines_skips_blank_and_counts_garbage() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "fills.jsonl",
            &format!("{FILL_A}\n\n{{not json\n{FILL_B}\n"),
        );

        let page = read_fills(&path).unwrap();
        assert_eq!(page.fills.len(), 2);
        assert_eq!(page.unreadable, 1);
    }

    #[test]
    fn test_read_directory_pages_in_name_order() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "page_002.jsonl", FILL_B);
        write_file(&dir, "page_001.jsonl", FILL_A);
        write_file(&dir, "notes.txt", "ignored");

        let pages = read_fill_pages(dir.path()).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].source.ends_with("page_001.jsonl"));
        assert!(pages[1].source.ends_with("page_002.jsonl"));
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let err = read_fill_pages(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }
}
