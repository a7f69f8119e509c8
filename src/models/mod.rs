pub mod grid;
pub mod spreadsheet;

pub use grid::{CellValue, ValueGrid};
pub use spreadsheet::{SpreadsheetRef, WriteSummary};
