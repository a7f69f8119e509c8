mod client;

pub use client::{AUTH_SCOPE, SheetsClient};

use crate::error::Result;
use crate::models::{SpreadsheetRef, ValueGrid, WriteSummary};
use async_trait::async_trait;

#[async_trait]
pub trait SpreadsheetOperations {
    /// Create a new spreadsheet. Calling this twice creates two spreadsheets.
    async fn create_spreadsheet(&self, title: &str) -> Result<SpreadsheetRef>;

    /// Overwrite `range` (e.g. `Sheet1!A1:C3`) with literal values
    async fn write_range(
        &self,
        spreadsheet: &SpreadsheetRef,
        range: &str,
        grid: &ValueGrid,
    ) -> Result<WriteSummary>;
}
