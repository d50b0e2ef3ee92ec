pub mod jsonfile;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A named table read from the backing store: a header row plus data rows.
///
/// Cells are plain strings; timestamps are RFC 3339 and boolean flags are the
/// literal `TRUE`/`FALSE` the spreadsheet renders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Resolves a header name to its column index by exact match.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// The only I/O primitive the rest of the system uses against the backing
/// tabular store.
///
/// Reads re-read the backing store on every call; callers that need freshness
/// guarantees across a read-modify-write sequence hold the process write lock.
pub trait TableStore: Send + Sync {
    /// Reads a full table. Fails with `TableNotFound` when absent.
    fn read_table(&self, name: &str) -> Result<Table>;

    /// Overwrites a single data row (0-based, header row excluded).
    fn write_row(&self, name: &str, row_index: usize, row: Vec<String>) -> Result<()>;

    /// Appends a data row.
    fn append_row(&self, name: &str, row: Vec<String>) -> Result<()>;
}

/// Truthy when the cell holds boolean TRUE as the spreadsheet renders it.
pub fn is_true(cell: &str) -> bool {
    cell.trim().eq_ignore_ascii_case("true")
}
