//! Snapshot persistence for [`Document`].
//!
//! The engine never interprets storage; a store hands back the last saved
//! document verbatim, or `None` when nothing was saved yet.

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::log::debug;
use crate::model::Document;

pub trait SnapshotStore {
    fn load(&self) -> anyhow::Result<Option<Document>>;
    fn save(&self, document: &Document) -> anyhow::Result<()>;
}

/// One JSON file on disk. Writes go to a sibling temp file first and are
/// renamed into place, so a crash never leaves a half-written snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> anyhow::Result<Option<Document>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let document = Document::from_json(&contents)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(document))
    }

    fn save(&self, document: &Document) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        debug!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }
}

/// Keeps the serialized snapshot in memory. Round-trips through JSON like the
/// file store so tests see the same encoding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> anyhow::Result<Option<Document>> {
        match self.snapshot.borrow().as_deref() {
            Some(contents) => Ok(Some(Document::from_json(contents)?)),
            None => Ok(None),
        }
    }

    fn save(&self, document: &Document) -> anyhow::Result<()> {
        *self.snapshot.borrow_mut() = Some(document.to_json()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use crate::issues::StatusCategory;

    fn sample_document() -> Document {
        let mut doc = Document::new();
        let ticket = doc.add_virtual_ticket("Draft rollout plan", StatusCategory::ToDo);
        let config = CanvasConfig::default();
        let canvas = doc.canvas_mut("kr-1");
        let group = canvas
            .add_group("Launch", None, None, &config)
            .unwrap();
        canvas
            .add_card(
                crate::model::CardSource::Virtual { ticket_id: ticket },
                Some(group.as_str()),
                None,
                &config,
            )
            .unwrap();
        doc
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("canvas.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn file_store_round_trips_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("canvas.json");
        let store = JsonFileStore::new(&path);
        let doc = sample_document();
        store.save(&doc).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap(), Some(doc));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        let doc = sample_document();
        store.save(&doc).unwrap();
        assert_eq!(store.load().unwrap(), Some(doc));
    }
}
