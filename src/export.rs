use crate::error::{AppError, Result};
use crate::models::{CellValue, SpreadsheetRef, ValueGrid, WriteSummary};
use crate::sheets::SpreadsheetOperations;
use tracing::{error, info, instrument};

pub const SAMPLE_TITLE: &str = "my new sheet";
pub const SAMPLE_RANGE: &str = "sheet1!a1:c3";

pub fn sample_grid() -> ValueGrid {
    let row = |cells: [CellValue; 3]| cells.to_vec();
    ValueGrid::new(vec![
        row(["name".into(), "age".into(), "city".into()]),
        row(["alice".into(), 30.into(), "new york".into()]),
        row(["bob".into(), 25.into(), "san francisco".into()]),
    ])
}

/// Result of an export whose spreadsheet was created
#[derive(Debug)]
pub enum ExportOutcome {
    Exported {
        spreadsheet: SpreadsheetRef,
        summary: WriteSummary,
    },
    WriteFailed {
        spreadsheet: SpreadsheetRef,
        error: AppError,
    },
}

pub struct Exporter<SC> {
    sheets_client: SC,
}

impl<SC> Exporter<SC>
where
    SC: SpreadsheetOperations + Sync,
{
    pub fn new(sheets_client: SC) -> Self {
        Self { sheets_client }
    }

    /// Create a spreadsheet titled `title` and write `grid` into `range`.
    ///
    /// Returns `Err` only when creation fails, in which case nothing is
    /// written. A failed write is reported through `ExportOutcome`.
    #[instrument(name = "Export", skip(self, grid))]
    pub async fn export(
        &self,
        title: &str,
        range: &str,
        grid: &ValueGrid,
    ) -> Result<ExportOutcome> {
        let spreadsheet = self
            .sheets_client
            .create_spreadsheet(title)
            .await
            .inspect_err(|e| error!(error = %e, "Spreadsheet creation failed"))?;

        info!(id = %spreadsheet, url = ?spreadsheet.url, "Created spreadsheet");

        match self
            .sheets_client
            .write_range(&spreadsheet, range, grid)
            .await
        {
            Ok(summary) => {
                info!(
                    updated_range = ?summary.updated_range,
                    updated_cells = ?summary.updated_cells,
                    "Wrote values"
                );
                Ok(ExportOutcome::Exported {
                    spreadsheet,
                    summary,
                })
            }
            Err(e) => {
                error!(error = %e, "Writing values failed");
                Ok(ExportOutcome::WriteFailed {
                    spreadsheet,
                    error: e,
                })
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::MockSheetsClient;
    use super::*;

    #[tokio::test]
    async fn test_sample_export() {
        let client = MockSheetsClient::default();
        let exporter = Exporter::new(client.clone());

        let outcome = exporter
            .export(SAMPLE_TITLE, SAMPLE_RANGE, &sample_grid())
            .await
            .unwrap();

        let ExportOutcome::Exported {
            spreadsheet,
            summary,
        } = outcome
        else {
            panic!("expected a successful export");
        };
        assert_eq!(summary.updated_cells, Some(9));

        let ranges = client.ranges.lock().unwrap();
        assert_eq!(
            ranges.get(&(spreadsheet.id.clone(), SAMPLE_RANGE.to_string())),
            Some(&sample_grid()),
            "sample grid should be written to the created spreadsheet"
        );
    }

    #[tokio::test]
    async fn test_create_failure_skips_write() {
        let client = MockSheetsClient {
            fail_create: true,
            ..Default::default()
        };
        let exporter = Exporter::new(client.clone());

        let err = exporter
            .export(SAMPLE_TITLE, SAMPLE_RANGE, &sample_grid())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Sheets(_)));
        assert_eq!(
            *client.write_calls.lock().unwrap(),
            0,
            "write must not be attempted without a spreadsheet"
        );
    }

    #[tokio::test]
    async fn test_write_failure_is_an_outcome() {
        let client = MockSheetsClient {
            fail_write: true,
            ..Default::default()
        };
        let exporter = Exporter::new(client.clone());

        let outcome = exporter
            .export(SAMPLE_TITLE, SAMPLE_RANGE, &sample_grid())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ExportOutcome::WriteFailed {
                error: AppError::Sheets(_),
                ..
            }
        ));
        assert_eq!(client.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_exports_create_distinct_spreadsheets() {
        let client = MockSheetsClient::default();
        let exporter = Exporter::new(client.clone());

        for _ in 0..2 {
            exporter
                .export(SAMPLE_TITLE, SAMPLE_RANGE, &sample_grid())
                .await
                .unwrap();
        }

        let created = client.created.lock().unwrap();
        assert_eq!(created.len(), 2);
        assert_ne!(created[0], created[1]);
    }

    #[test]
    fn test_sample_grid_shape() {
        let grid = sample_grid();
        assert_eq!(grid.dimensions(), (3, 3));
        assert_eq!(grid.to_values()[1][1], serde_json::json!(30));
    }

    #[tokio::test]
    async fn test_rewriting_a_range_keeps_last_grid() {
        let client = MockSheetsClient::default();
        let spreadsheet = client.create_spreadsheet(SAMPLE_TITLE).await.unwrap();
        let replacement = ValueGrid::new(vec![
            vec!["name".into(), "age".into(), "city".into()],
            vec!["carol".into(), 41.into(), "boston".into()],
        ]);

        client
            .write_range(&spreadsheet, SAMPLE_RANGE, &sample_grid())
            .await
            .unwrap();
        client
            .write_range(&spreadsheet, SAMPLE_RANGE, &replacement)
            .await
            .unwrap();

        let ranges = client.ranges.lock().unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(
            ranges.get(&(spreadsheet.id.clone(), SAMPLE_RANGE.to_string())),
            Some(&replacement),
            "the second write should replace the first"
        );
    }
}
