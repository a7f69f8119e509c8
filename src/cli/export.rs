use crate::auth::CredentialManager;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::export::{ExportOutcome, Exporter, SAMPLE_RANGE, SAMPLE_TITLE, sample_grid};
use crate::sheets::SheetsClient;
use tracing::info;

pub async fn execute() -> Result<()> {
    let config = Config::load()?;
    let manager = CredentialManager::from_config(&config.google)?;

    let credential = match manager.obtain().await {
        Ok(credential) => credential,
        Err(e) => {
            println!("{}", authorization_failure(&e));
            return Err(e);
        }
    };

    let exporter = Exporter::new(SheetsClient::new(&credential)?);
    let outcome = exporter
        .export(SAMPLE_TITLE, SAMPLE_RANGE, &sample_grid())
        .await;

    match &outcome {
        Ok(ExportOutcome::Exported {
            spreadsheet,
            summary,
        }) => info!(
            id = %spreadsheet,
            url = ?spreadsheet.url,
            updated_cells = ?summary.updated_cells,
            "Export completed"
        ),
        Ok(ExportOutcome::WriteFailed { spreadsheet, error }) => {
            info!(id = %spreadsheet, %error, "Spreadsheet left without data")
        }
        Err(_) => {}
    }

    let (line, fatal) = report(&outcome);
    println!("{}", line);

    match outcome {
        Err(e) if fatal => Err(e),
        _ => Ok(()),
    }
}

fn authorization_failure(error: &AppError) -> String {
    format!("authorization failed: {}", error)
}

/// Line printed for an export result, and whether the run exits non-zero.
/// A failed write is reported but does not fail the run.
fn report(outcome: &Result<ExportOutcome>) -> (&'static str, bool) {
    match outcome {
        Ok(ExportOutcome::Exported { .. }) => ("data exported successfully", false),
        Ok(ExportOutcome::WriteFailed { .. }) => ("failed to export data", false),
        Err(_) => ("failed to create spreadsheet", true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SpreadsheetRef, WriteSummary};

    fn spreadsheet() -> SpreadsheetRef {
        SpreadsheetRef {
            id: "abc123".to_string(),
            url: None,
        }
    }

    #[test]
    fn test_report_exported() {
        let outcome = Ok(ExportOutcome::Exported {
            spreadsheet: spreadsheet(),
            summary: WriteSummary::default(),
        });

        assert_eq!(report(&outcome), ("data exported successfully", false));
    }

    #[test]
    fn test_report_write_failure_is_not_fatal() {
        let outcome = Ok(ExportOutcome::WriteFailed {
            spreadsheet: spreadsheet(),
            error: AppError::Sheets("400 bad range".to_string()),
        });

        assert_eq!(report(&outcome), ("failed to export data", false));
    }

    #[test]
    fn test_report_create_failure_is_fatal() {
        let outcome = Err(AppError::Sheets("403 quota exceeded".to_string()));

        assert_eq!(report(&outcome), ("failed to create spreadsheet", true));
    }

    #[test]
    fn test_authorization_failure_line() {
        let error = AppError::Auth("Authorization was cancelled or denied: access_denied".to_string());

        let line = authorization_failure(&error);

        assert!(line.starts_with("authorization failed: "));
        assert!(line.contains("access_denied"));
    }
}
