use std::collections::HashMap;
use std::sync::RwLock;

use super::{Table, TableStore};
use crate::error::{AppError, Result};

/// An in-memory `TableStore` used by tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table, replacing any existing one with the same name.
    pub fn put_table(&self, name: &str, headers: Vec<&str>, rows: Vec<Vec<&str>>) {
        let table = Table {
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        };
        self.tables
            .write()
            .expect("memory store lock poisoned")
            .insert(name.to_string(), table);
    }
}

impl TableStore for MemoryStore {
    fn read_table(&self, name: &str) -> Result<Table> {
        self.tables
            .read()
            .expect("memory store lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::TableNotFound(name.to_string()))
    }

    fn write_row(&self, name: &str, row_index: usize, mut row: Vec<String>) -> Result<()> {
        let mut tables = self.tables.write().expect("memory store lock poisoned");
        let table = tables
            .get_mut(name)
            .ok_or_else(|| AppError::TableNotFound(name.to_string()))?;
        let width = table.headers.len();
        let slot = table.rows.get_mut(row_index).ok_or_else(|| {
            AppError::Internal(format!("row {row_index} out of range for \"{name}\""))
        })?;
        row.resize(width, String::new());
        *slot = row;
        Ok(())
    }

    fn append_row(&self, name: &str, mut row: Vec<String>) -> Result<()> {
        let mut tables = self.tables.write().expect("memory store lock poisoned");
        let table = tables
            .get_mut(name)
            .ok_or_else(|| AppError::TableNotFound(name.to_string()))?;
        row.resize(table.headers.len().max(row.len()), String::new());
        table.rows.push(row);
        Ok(())
    }
}
