//! Google Sheets v4 REST client implementing `SpreadsheetStore`

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use super::auth::AccessToken;
use super::retry::{RequestKind, RetryConfig, RetryPolicy};
use crate::error::ReconcileError;
use crate::sheets::table::Table;
use crate::sheets::value::CellValue;
use crate::sheets::{SheetSelector, SpreadsheetStore};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: i64,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: usize,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

/// Spreadsheet store backed by the Google Sheets REST API
#[derive(Debug, Clone)]
pub struct GoogleSheetsStore {
    http: Client,
    token: AccessToken,
    base_url: String,
    retry: RetryPolicy,
}

impl GoogleSheetsStore {
    pub fn new(token: AccessToken, retry: RetryConfig) -> Self {
        Self {
            http: Client::new(),
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::new(retry),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Confirm the token grants access to a spreadsheet before any work starts
    pub async fn probe(&self, spreadsheet_id: &str) -> Result<(), ReconcileError> {
        let url = format!("{}/{}?fields=spreadsheetId", self.base_url, spreadsheet_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.token.secret())
            .send()
            .await
            .map_err(|e| ReconcileError::Authentication {
                reason: format!("session probe failed: {}", e),
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ReconcileError::Authentication {
                    reason: format!(
                        "access to spreadsheet '{}' denied ({})",
                        spreadsheet_id,
                        response.status()
                    ),
                })
            }
            // Other statuses (404, 5xx) surface later with sheet context
            _ => Ok(()),
        }
    }

    /// Send a request, retrying throttling and transient failures allowed for `kind`
    async fn send(
        &self,
        what: &str,
        kind: RequestKind,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;

        loop {
            debug!("Sheets API: {} (attempt {}/{})", what, attempt, max_attempts);
            let result = build().bearer_auth(self.token.secret()).send().await;

            match result {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response)
                    if RetryPolicy::is_retryable_status(response.status(), kind)
                        && attempt < max_attempts =>
                {
                    warn!(
                        "Sheets API: {} returned {}, retrying",
                        what,
                        response.status()
                    );
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    bail!("{} failed with {}: {}", what, status, body.trim());
                }
                Err(e) if RetryPolicy::is_retryable_error(&e, kind) && attempt < max_attempts => {
                    warn!("Sheets API: {} transport error ({}), retrying", what, e);
                }
                Err(e) => return Err(anyhow!(e).context(format!("{} failed", what))),
            }

            tokio::time::sleep(self.retry.delay_for(attempt)).await;
            attempt += 1;
        }
    }

    async fn sheet_properties(&self, spreadsheet_id: &str) -> Result<Vec<SheetProperties>> {
        let url = format!(
            "{}/{}?fields=sheets.properties(sheetId,title,index,gridProperties.rowCount)",
            self.base_url, spreadsheet_id
        );
        let meta: SpreadsheetMeta = self
            .send("read spreadsheet metadata", RequestKind::Idempotent, || {
                self.http.get(&url)
            })
            .await?
            .json()
            .await
            .context("Failed to parse spreadsheet metadata")?;

        let mut sheets: Vec<SheetProperties> =
            meta.sheets.into_iter().map(|s| s.properties).collect();
        sheets.sort_by_key(|s| s.index);
        Ok(sheets)
    }

    async fn find_sheet(&self, spreadsheet_id: &str, selector: &SheetSelector) -> Result<SheetProperties> {
        let sheets = self.sheet_properties(spreadsheet_id).await?;
        let found = match selector {
            SheetSelector::First => sheets.into_iter().next(),
            SheetSelector::Named(name) => sheets.into_iter().find(|s| s.title == *name),
        };
        found.with_context(|| {
            format!(
                "Worksheet not found: {} (spreadsheet {})",
                selector, spreadsheet_id
            )
        })
    }

    async fn read_values(&self, spreadsheet_id: &str, title: &str) -> Result<Vec<Vec<CellValue>>> {
        let url = format!(
            "{}?valueRenderOption=UNFORMATTED_VALUE&majorDimension=ROWS",
            values_url(&self.base_url, spreadsheet_id, &quote_sheet_title(title))
        );
        let range: ValueRange = self
            .send(
                &format!("read values of '{}'", title),
                RequestKind::Idempotent,
                || self.http.get(&url),
            )
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse values of sheet '{}'", title))?;

        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(CellValue::from_json).collect())
            .collect())
    }

    async fn batch_update(&self, spreadsheet_id: &str, what: &str, requests: JsonValue) -> Result<()> {
        let url = format!("{}/{}:batchUpdate", self.base_url, spreadsheet_id);
        let body = json!({ "requests": requests });
        self.send(what, RequestKind::NonIdempotent, || {
            self.http.post(&url).json(&body)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SpreadsheetStore for GoogleSheetsStore {
    fn backend_name(&self) -> &'static str {
        "google"
    }

    async fn read_table(&self, spreadsheet_id: &str, sheet: &SheetSelector) -> Result<Table> {
        let title = match sheet {
            SheetSelector::Named(name) => name.clone(),
            SheetSelector::First => self.find_sheet(spreadsheet_id, sheet).await?.title,
        };
        let rows = self.read_values(spreadsheet_id, &title).await?;
        Ok(Table::from_grid(&rows))
    }

    async fn row_count(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<usize> {
        // The values API trims trailing blank rows, matching "populated rows"
        Ok(self.read_values(spreadsheet_id, sheet_name).await?.len())
    }

    async fn delete_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start: usize,
        end: usize,
    ) -> Result<()> {
        let sheet = self
            .find_sheet(spreadsheet_id, &SheetSelector::Named(sheet_name.to_string()))
            .await?;

        let grid_rows = sheet.grid_properties.row_count;
        if start > grid_rows {
            warn!(
                "Rows {}..{} lie beyond the {} rows of sheet '{}', nothing to delete",
                start, end, grid_rows, sheet_name
            );
            return Ok(());
        }

        let request = delete_dimension_request(sheet.sheet_id, start, end.min(grid_rows));
        self.batch_update(
            spreadsheet_id,
            &format!("delete rows {}..{} of '{}'", start, end, sheet_name),
            json!([request]),
        )
        .await
    }

    async fn write_rows(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        start_row: usize,
        rows: &[Vec<CellValue>],
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let sheet = self
            .find_sheet(spreadsheet_id, &SheetSelector::Named(sheet_name.to_string()))
            .await?;

        let needed = start_row + rows.len() - 1;
        let grid_rows = sheet.grid_properties.row_count;
        if needed > grid_rows {
            self.batch_update(
                spreadsheet_id,
                &format!("grow '{}' by {} rows", sheet_name, needed - grid_rows),
                json!([{
                    "appendDimension": {
                        "sheetId": sheet.sheet_id,
                        "dimension": "ROWS",
                        "length": needed - grid_rows,
                    }
                }]),
            )
            .await?;
        }

        let range = format!("{}!A{}", quote_sheet_title(sheet_name), start_row);
        let url = format!(
            "{}?valueInputOption=RAW",
            values_url(&self.base_url, spreadsheet_id, &range)
        );
        let values: Vec<Vec<JsonValue>> = rows
            .iter()
            .map(|row| row.iter().map(CellValue::to_json).collect())
            .collect();
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });

        self.send(
            &format!("write {} rows to '{}' at row {}", rows.len(), sheet_name, start_row),
            RequestKind::Idempotent,
            || self.http.put(&url).json(&body),
        )
        .await?;
        Ok(())
    }
}

/// Quote a sheet title for A1 notation (`Bob's` -> `'Bob''s'`)
pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn values_url(base_url: &str, spreadsheet_id: &str, a1_range: &str) -> String {
    format!(
        "{}/{}/values/{}",
        base_url,
        spreadsheet_id,
        urlencoding::encode(a1_range)
    )
}

/// `deleteDimension` request for rows `start..=end` (1-based, inclusive)
fn delete_dimension_request(sheet_id: i64, start: usize, end: usize) -> JsonValue {
    json!({
        "deleteDimension": {
            "range": {
                "sheetId": sheet_id,
                "dimension": "ROWS",
                "startIndex": start - 1,
                "endIndex": end,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        target: String,
        body: String,
    }

    impl Recorded {
        fn json(&self) -> JsonValue {
            serde_json::from_str(&self.body).unwrap()
        }
    }

    /// Local HTTP server answering each request from a closure over the request history
    struct MockSheets {
        base_url: String,
        requests: Arc<Mutex<Vec<Recorded>>>,
    }

    impl MockSheets {
        async fn start(
            respond: impl Fn(&Recorded, &[Recorded]) -> (u16, String) + Send + 'static,
        ) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&requests);

            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let Some(request) = read_request(&mut stream).await else {
                        continue;
                    };
                    let (status, body) = {
                        let mut log = log.lock().unwrap();
                        let reply = respond(&request, &log);
                        log.push(request);
                        reply
                    };
                    let response = format!(
                        "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });

            Self { base_url, requests }
        }

        fn store(&self) -> GoogleSheetsStore {
            let retry = RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                backoff_multiplier: 2.0,
                jitter: false,
            };
            GoogleSheetsStore::new(AccessToken::new("t"), retry).with_base_url(&self.base_url)
        }

        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }

        fn count(&self, method: &str, needle: &str) -> usize {
            self.requests()
                .iter()
                .filter(|r| r.method == method && r.target.contains(needle))
                .count()
        }
    }

    async fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let mut request_line = head.split_whitespace();
        Some(Recorded {
            method: request_line.next()?.to_string(),
            target: request_line.next()?.to_string(),
            body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
        })
    }

    fn metadata(row_count: usize) -> String {
        json!({
            "sheets": [
                {"properties": {"sheetId": 7, "title": "Alpha", "index": 0,
                                "gridProperties": {"rowCount": row_count}}}
            ]
        })
        .to_string()
    }

    fn prior(history: &[Recorded], method: &str, needle: &str) -> usize {
        history
            .iter()
            .filter(|r| r.method == method && r.target.contains(needle))
            .count()
    }

    #[tokio::test]
    async fn test_delete_not_repeated_after_server_error() {
        let mock = MockSheets::start(|request, _| match request.method.as_str() {
            "GET" => (200, metadata(20)),
            _ => (500, r#"{"error":{"code":500}}"#.to_string()),
        })
        .await;

        let result = mock.store().delete_rows("book", "Alpha", 5, 6).await;

        assert!(result.is_err());
        assert_eq!(mock.count("POST", ":batchUpdate"), 1);
    }

    #[tokio::test]
    async fn test_throttled_delete_is_retried() {
        let mock = MockSheets::start(|request, history| match request.method.as_str() {
            "GET" => (200, metadata(20)),
            _ if prior(history, "POST", ":batchUpdate") == 0 => (429, "{}".to_string()),
            _ => (200, "{}".to_string()),
        })
        .await;

        mock.store().delete_rows("book", "Alpha", 5, 6).await.unwrap();

        let posts: Vec<Recorded> = mock
            .requests()
            .into_iter()
            .filter(|r| r.method == "POST")
            .collect();
        assert_eq!(posts.len(), 2);
        let range = &posts[1].json()["requests"][0]["deleteDimension"]["range"];
        assert_eq!(range["sheetId"], 7);
        assert_eq!(range["startIndex"], 4);
        assert_eq!(range["endIndex"], 6);
    }

    #[tokio::test]
    async fn test_reads_retry_server_errors() {
        let mock = MockSheets::start(|_, history| {
            if prior(history, "GET", "/values/") == 0 {
                (503, "{}".to_string())
            } else {
                (200, json!({"values": [["REGIONS"], ["ALPHA 1"]]}).to_string())
            }
        })
        .await;

        let rows = mock.store().row_count("book", "Alpha").await.unwrap();

        assert_eq!(rows, 2);
        assert_eq!(mock.count("GET", "/values/"), 2);
    }

    #[tokio::test]
    async fn test_write_grows_grid_then_writes_values() {
        let mock = MockSheets::start(|request, _| match request.method.as_str() {
            "GET" => (200, metadata(5)),
            _ => (200, "{}".to_string()),
        })
        .await;

        let rows = vec![
            vec![CellValue::from("ALPHA 1"), CellValue::Int(1)],
            vec![CellValue::from("ALPHA 1"), CellValue::Int(2)],
            vec![CellValue::from("ALPHA 2"), CellValue::Int(3)],
        ];
        mock.store().write_rows("book", "Alpha", 5, &rows).await.unwrap();

        let requests = mock.requests();
        let methods: Vec<&str> = requests.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, vec!["GET", "POST", "PUT"]);

        let append = &requests[1].json()["requests"][0]["appendDimension"];
        assert_eq!(append["sheetId"], 7);
        assert_eq!(append["length"], 2);

        let put = &requests[2];
        assert!(put.target.contains("valueInputOption=RAW"));
        let body = put.json();
        assert_eq!(body["range"], "'Alpha'!A5");
        assert_eq!(body["values"][2][0], "ALPHA 2");
    }

    #[tokio::test]
    async fn test_probe_rejects_unauthorized_token() {
        let mock = MockSheets::start(|_, _| (401, "{}".to_string())).await;

        let err = mock.store().probe("book").await.unwrap_err();

        assert!(matches!(err, ReconcileError::Authentication { .. }));
        assert_eq!(mock.count("GET", "fields=spreadsheetId"), 1);
    }

    #[test]
    fn test_quote_sheet_title() {
        assert_eq!(quote_sheet_title("Alpha"), "'Alpha'");
        assert_eq!(quote_sheet_title("Bob's"), "'Bob''s'");
    }

    #[test]
    fn test_values_url_encodes_range() {
        let url = values_url(DEFAULT_BASE_URL, "abc", "'Akwa Ibom'!A5");
        assert_eq!(
            url,
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/%27Akwa%20Ibom%27%21A5"
        );
    }

    #[test]
    fn test_delete_request_is_half_open_zero_based() {
        let request = delete_dimension_request(7, 10, 12);
        let range = &request["deleteDimension"]["range"];
        assert_eq!(range["sheetId"], 7);
        assert_eq!(range["startIndex"], 9);
        assert_eq!(range["endIndex"], 12);
    }

    #[test]
    fn test_metadata_parsing() {
        let meta: SpreadsheetMeta = serde_json::from_value(json!({
            "sheets": [
                {"properties": {"sheetId": 3, "title": "Reference", "index": 1,
                                "gridProperties": {"rowCount": 40}}},
                {"properties": {"sheetId": 0, "title": "Alpha", "index": 0}}
            ]
        }))
        .unwrap();
        assert_eq!(meta.sheets.len(), 2);
        assert_eq!(meta.sheets[0].properties.grid_properties.row_count, 40);
        assert_eq!(meta.sheets[1].properties.grid_properties.row_count, 0);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let store = GoogleSheetsStore::new(AccessToken::new("t"), RetryConfig::disabled())
            .with_base_url("http://localhost:8080/");
        assert_eq!(store.base_url, "http://localhost:8080");
    }
}
