use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{Table, TableStore};
use crate::error::{AppError, Result};

/// On-disk document shape: one JSON object holding every named table.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    tables: HashMap<String, Table>,
}

/// A `TableStore` backed by a single JSON document on disk.
///
/// Every read re-parses the file so edits made outside the process are picked
/// up on the next call; writes rewrite the whole document. The file mutex only
/// serializes this process's accesses, it does not protect against a second
/// process writing the same document.
pub struct JsonStore {
    path: PathBuf,
    file_lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Document> {
        let raw = fs::read_to_string(&self.path)?;
        sonic_rs::from_str(&raw).map_err(|e| {
            AppError::Internal(format!(
                "corrupt table document {}: {e}",
                self.path.display()
            ))
        })
    }

    fn save(&self, doc: &Document) -> Result<()> {
        let raw = sonic_rs::to_string(doc)
            .map_err(|e| AppError::Internal(format!("serialize table document: {e}")))?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl TableStore for JsonStore {
    fn read_table(&self, name: &str) -> Result<Table> {
        let _guard = self.file_lock.lock().expect("json store lock poisoned");
        let doc = self.load()?;
        let mut table = doc
            .tables
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::TableNotFound(name.to_string()))?;
        for header in &mut table.headers {
            *header = header.trim().to_string();
        }
        Ok(table)
    }

    fn write_row(&self, name: &str, row_index: usize, mut row: Vec<String>) -> Result<()> {
        let _guard = self.file_lock.lock().expect("json store lock poisoned");
        let mut doc = self.load()?;
        let table = doc
            .tables
            .get_mut(name)
            .ok_or_else(|| AppError::TableNotFound(name.to_string()))?;
        let width = table.headers.len();
        let slot = table.rows.get_mut(row_index).ok_or_else(|| {
            AppError::Internal(format!("row {row_index} out of range for \"{name}\""))
        })?;
        row.resize(width, String::new());
        *slot = row;
        self.save(&doc)
    }

    fn append_row(&self, name: &str, mut row: Vec<String>) -> Result<()> {
        let _guard = self.file_lock.lock().expect("json store lock poisoned");
        let mut doc = self.load()?;
        let table = doc
            .tables
            .get_mut(name)
            .ok_or_else(|| AppError::TableNotFound(name.to_string()))?;
        row.resize(table.headers.len().max(row.len()), String::new());
        table.rows.push(row);
        self.save(&doc)
    }
}
