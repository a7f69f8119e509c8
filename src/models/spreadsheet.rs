use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a remote spreadsheet, as returned on creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpreadsheetRef {
    pub id: String,
    pub url: Option<String>,
}

impl fmt::Display for SpreadsheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// What the service reports after overwriting a range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub updated_range: Option<String>,
    pub updated_cells: Option<i32>,
}
