// src/persist.rs
// =============================================================================
// Saves crawl results as JSON.
//
// Format: one object, page URL -> array of link URLs
//   { "https://ex.test/": ["https://ex.test/a"], "https://ex.test/a": [] }
//
// The file is written once, at the end of a crawl, through a temporary file in
// the same directory that is then renamed over the target. Readers see either
// the old file or the complete new one, never a half-written one.
// =============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::CrawlError;

pub fn write_results(
    path: &Path,
    pages: &BTreeMap<String, Vec<String>>,
) -> Result<(), CrawlError> {
    let persist_err = |source: std::io::Error| CrawlError::Persist {
        path: path.display().to_string(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(persist_err)?;
    write_json(&mut file, pages, path)?;
    file.write_all(b"\n").map_err(persist_err)?;
    file.as_file().sync_all().map_err(persist_err)?;
    file.persist(path).map_err(|e| persist_err(e.error))?;

    Ok(())
}

// serde_json reports writer failures as its own error; those are I/O problems
// with the target, not with the data
fn write_json<W: Write>(
    writer: W,
    pages: &BTreeMap<String, Vec<String>>,
    path: &Path,
) -> Result<(), CrawlError> {
    serde_json::to_writer_pretty(writer, pages).map_err(|e| {
        if e.is_io() {
            CrawlError::Persist {
                path: path.display().to_string(),
                source: e.into(),
            }
        } else {
            CrawlError::Serialize(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_mapping_as_json_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        let mut pages = BTreeMap::new();
        pages.insert(
            "https://ex.test/".to_string(),
            vec!["https://ex.test/a".to_string()],
        );
        pages.insert("https://ex.test/a".to_string(), Vec::new());

        write_results(&path, &pages).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!({
                "https://ex.test/": ["https://ex.test/a"],
                "https://ex.test/a": [],
            })
        );
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(&path, "old contents").unwrap();

        write_results(&path, &BTreeMap::new()).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");
        // only the target is left behind, no temp files
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_a_persist_error() {
        let mut pages = BTreeMap::new();
        pages.insert("https://ex.test/".to_string(), Vec::new());

        let err = write_json(FullDisk, &pages, Path::new("results.json")).unwrap_err();
        match err {
            CrawlError::Persist { path, source } => {
                assert_eq!(path, "results.json");
                assert_eq!(source.kind(), std::io::ErrorKind::Other);
            }
            other => panic!("expected Persist, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("results.json");
        assert!(matches!(
            write_results(&path, &BTreeMap::new()),
            Err(CrawlError::Persist { .. })
        ));
    }
}
