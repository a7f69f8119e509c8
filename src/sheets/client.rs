use super::SpreadsheetOperations;
use crate::auth::Credential;
use crate::error::{AppError, Result};
use crate::models::{SpreadsheetRef, ValueGrid, WriteSummary};
use async_trait::async_trait;
use google_sheets4::api::{Scope, Sheets, Spreadsheet, SpreadsheetProperties, ValueRange};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use tracing::{debug, instrument};

// Read/write access to all of the user's spreadsheets
pub const AUTH_SCOPE: Scope = Scope::Spreadsheet;

// Values are stored exactly as given; strings starting with '=' stay text
const VALUE_INPUT_OPTION: &str = "RAW";
const CREATE_FIELDS: &str = "spreadsheetId,spreadsheetUrl";

pub struct SheetsClient {
    hub: Sheets<HttpsConnector<HttpConnector>>,
}

impl SheetsClient {
    /// Create a client that authorizes every request with `credential`
    pub fn new(credential: &Credential) -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| {
                AppError::Sheets(format!("Failed to load native root certificates: {}", e))
            })?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);

        // A plain access token satisfies the hub's token source
        let hub = Sheets::new(client, credential.access_token.clone());

        Ok(Self { hub })
    }
}

fn new_spreadsheet(title: &str) -> Spreadsheet {
    Spreadsheet {
        properties: Some(SpreadsheetProperties {
            title: Some(title.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn value_range(range: &str, grid: &ValueGrid) -> ValueRange {
    ValueRange {
        major_dimension: Some("ROWS".to_string()),
        range: Some(range.to_string()),
        values: Some(grid.to_values()),
    }
}

#[async_trait]
impl SpreadsheetOperations for SheetsClient {
    #[instrument(name = "Creating new spreadsheet", skip(self))]
    async fn create_spreadsheet(&self, title: &str) -> Result<SpreadsheetRef> {
        let (_, result) = self
            .hub
            .spreadsheets()
            .create(new_spreadsheet(title))
            .param("fields", CREATE_FIELDS)
            .add_scope(AUTH_SCOPE)
            .doit()
            .await
            .map_err(|e| AppError::Sheets(format!("Failed to create spreadsheet: {}", e)))?;

        let id = result
            .spreadsheet_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Sheets("Created spreadsheet has empty ID".to_string()))?;

        Ok(SpreadsheetRef {
            id,
            url: result.spreadsheet_url,
        })
    }

    #[instrument(
        name = "Writing range",
        skip(self, spreadsheet, grid),
        fields(spreadsheet_id = %spreadsheet)
    )]
    async fn write_range(
        &self,
        spreadsheet: &SpreadsheetRef,
        range: &str,
        grid: &ValueGrid,
    ) -> Result<WriteSummary> {
        let (rows, columns) = grid.dimensions();
        debug!(rows, columns, "Writing values");

        let (_, response) = self
            .hub
            .spreadsheets()
            .values_update(value_range(range, grid), &spreadsheet.id, range)
            .value_input_option(VALUE_INPUT_OPTION)
            .add_scope(AUTH_SCOPE)
            .doit()
            .await
            .map_err(|e| {
                AppError::Sheets(format!("Failed to write range '{}': {}", range, e))
            })?;

        Ok(WriteSummary {
            updated_range: response.updated_range,
            updated_cells: response.updated_cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_spreadsheet_sets_title_only() {
        let spreadsheet = new_spreadsheet("my new sheet");

        let properties = spreadsheet.properties.unwrap();
        assert_eq!(properties.title.as_deref(), Some("my new sheet"));
        assert!(properties.time_zone.is_none());
        assert!(spreadsheet.sheets.is_none());
    }

    #[test]
    fn test_value_range_is_row_major() {
        let grid = ValueGrid::new(vec![
            vec!["name".into(), "age".into()],
            vec!["alice".into(), 30.into()],
        ]);

        let range = value_range("sheet1!a1:b2", &grid);

        assert_eq!(range.major_dimension.as_deref(), Some("ROWS"));
        assert_eq!(range.range.as_deref(), Some("sheet1!a1:b2"));
        assert_eq!(
            range.values,
            Some(vec![
                vec![json!("name"), json!("age")],
                vec![json!("alice"), json!(30)],
            ])
        );
    }

    #[test]
    fn test_auth_scope_url() {
        assert_eq!(
            AUTH_SCOPE.as_ref(),
            "https://www.googleapis.com/auth/spreadsheets"
        );
    }
}
