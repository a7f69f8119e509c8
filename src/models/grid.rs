use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A single literal cell. Values are sent as-is; the service decides how to
/// render them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value.into())
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value.into())
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Bool(b) => Value::Bool(b),
            CellValue::Number(n) => Value::Number(n),
            CellValue::Text(s) => Value::String(s),
        }
    }
}

/// Row-major block of cells written into a range
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ValueGrid {
    rows: Vec<Vec<CellValue>>,
}

impl ValueGrid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// (rows, widest row)
    pub fn dimensions(&self) -> (usize, usize) {
        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (self.rows.len(), width)
    }

    /// Convert to the nested JSON arrays the Sheets API expects
    pub fn to_values(&self) -> Vec<Vec<Value>> {
        self.rows
            .iter()
            .map(|row| row.iter().cloned().map(Value::from).collect())
            .collect()
    }
}

impl From<Vec<Vec<CellValue>>> for ValueGrid {
    fn from(rows: Vec<Vec<CellValue>>) -> Self {
        Self::new(rows)
    }
}
