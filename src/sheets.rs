//! Comment loading from a Google Sheet through a service account.
//!
//! The service-account document is checked, handed to `gcp_auth` to mint one
//! read-only access token and then dropped with the call. Only the first
//! column of the requested range is kept.

use std::fmt;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use log::{debug, info};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::http;
use crate::models::CommentList;
use crate::security::redact;

pub const DEFAULT_RANGE: &str = "Sheet1!A:A";

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";
const TOKEN_SERVICE: &str = "Google OAuth";
const SHEETS_SERVICE: &str = "Google Sheets API";

/// A service-account key document that passed the local shape checks. The
/// raw document is kept for the token provider.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: String,
    #[serde(skip)]
    document: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &redact(&self.private_key))
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Parses the JSON key document. Anything unusable is an authentication
    /// failure, not an input error: the document exists but cannot sign in.
    pub fn from_json(document: &str) -> Result<Self> {
        let mut key: Self = serde_json::from_str(document).map_err(|err| {
            Error::authentication(format!("service account document is malformed: {err}"))
        })?;
        if key.client_email.trim().is_empty() {
            return Err(Error::authentication(
                "service account document has an empty client_email",
            ));
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(Error::authentication(
                "service account document has no PEM private_key",
            ));
        }
        key.document = document.to_string();
        Ok(key)
    }

    fn token_provider(&self) -> Result<CustomServiceAccount> {
        CustomServiceAccount::from_json(&self.document).map_err(|err| {
            Error::authentication(format!("service account key is unusable: {err}"))
        })
    }
}

/// Boundary to the spreadsheet service: returns the raw 2-D grid of a range.
pub trait SpreadsheetApi {
    fn fetch_values(
        &self,
        key: &ServiceAccountKey,
        sheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>>;
}

/// Reads comment rows from `range` of `sheet_id` using the given
/// service-account document.
pub fn load_comments(
    api: &impl SpreadsheetApi,
    credential_document: &str,
    sheet_id: &str,
    range: &str,
) -> Result<CommentList> {
    if credential_document.trim().is_empty() {
        return Err(Error::invalid_input("a service account document is required"));
    }
    let sheet_id = sheet_id.trim();
    if sheet_id.is_empty() {
        return Err(Error::invalid_input("a sheet id is required"));
    }
    let range = range.trim();
    let (worksheet, _) = split_range(range);
    if worksheet.trim().is_empty() {
        return Err(Error::invalid_input(format!(
            "sheet range {range:?} must name a worksheet, e.g. {DEFAULT_RANGE}"
        )));
    }

    let key = ServiceAccountKey::from_json(credential_document)?;
    info!(
        "loading comments from sheet {sheet_id} range {range:?} as {}",
        key.client_email
    );
    let rows = api.fetch_values(&key, sheet_id, range)?;
    let comments = CommentList::from_rows(rows);
    info!("loaded {} comment(s)", comments.len());
    Ok(comments)
}

/// Splits `Sheet1!A:A` into its worksheet title and cell range. A bare title
/// selects the whole worksheet.
pub fn split_range(range: &str) -> (&str, Option<&str>) {
    match range.split_once('!') {
        Some((sheet, cells)) => (sheet, Some(cells)),
        None => (range, None),
    }
}

/// `ureq`-backed client for the Sheets v4 values endpoint.
pub struct SheetsClient {
    agent: ureq::Agent,
    base_url: String,
}

impl Default for SheetsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl SheetsClient {
    pub fn new() -> Self {
        Self::with_base_url(SHEETS_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            agent: http::build_agent(),
            base_url: base_url.into(),
        }
    }

    /// Mints a read-only access token. `gcp_auth` is async, so the exchange
    /// runs on a throwaway current-thread runtime.
    fn access_token(&self, key: &ServiceAccountKey) -> Result<String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| Error::upstream(format!("{TOKEN_SERVICE}: runtime failed: {err}")))?;
        runtime.block_on(async {
            let provider = key.token_provider()?;
            let token = provider.token(&[READONLY_SCOPE]).await.map_err(|err| {
                Error::authentication(format!("{TOKEN_SERVICE} refused the service account: {err}"))
            })?;
            debug!("access token minted for {}", key.client_email);
            Ok(token.as_str().to_string())
        })
    }

    fn values_url(&self, sheet_id: &str, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| Error::invalid_input(format!("bad sheets endpoint: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::invalid_input("sheets endpoint cannot take a path"))?
            .push(sheet_id)
            .push("values")
            .push(range);
        Ok(url)
    }
}

impl SheetsClient {
    fn fetch_with_token(
        &self,
        token: &str,
        sheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(sheet_id, range)?;
        debug!("GET {url}");
        let response = self
            .agent
            .get(url.as_str())
            .query("majorDimension", "ROWS")
            .set("Authorization", &format!("Bearer {token}"))
            .call()
            .map_err(|err| http::from_ureq(SHEETS_SERVICE, err))?;
        let body: ValueRange = http::read_json(SHEETS_SERVICE, response)?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

impl SpreadsheetApi for SheetsClient {
    fn fetch_values(
        &self,
        key: &ServiceAccountKey,
        sheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>> {
        let token = self.access_token(key)?;
        self.fetch_with_token(&token, sheet_id, range)
    }
}

/// Formatted values arrive as strings; anything else is rendered as JSON text.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::cell::Cell;

    const TEST_PRIVATE_KEY: &str = include_str!("../testdata/service_account_key.pem");

    fn credential_json() -> String {
        serde_json::json!({
            "type": "service_account",
            "client_email": "loader@demo-project.iam.gserviceaccount.com",
            "private_key_id": "kid-1",
            "private_key": TEST_PRIVATE_KEY,
            "token_uri": "https://oauth2.googleapis.com/token",
        })
        .to_string()
    }

    struct FakeSheets {
        rows: Vec<Vec<String>>,
        calls: Cell<usize>,
    }

    impl FakeSheets {
        fn new(rows: &[&[&str]]) -> Self {
            Self {
                rows: rows
                    .iter()
                    .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                    .collect(),
                calls: Cell::new(0),
            }
        }
    }

    impl SpreadsheetApi for FakeSheets {
        fn fetch_values(
            &self,
            key: &ServiceAccountKey,
            _sheet_id: &str,
            _range: &str,
        ) -> Result<Vec<Vec<String>>> {
            assert_eq!(key.client_email, "loader@demo-project.iam.gserviceaccount.com");
            self.calls.set(self.calls.get() + 1);
            Ok(self.rows.clone())
        }
    }

    #[test]
    fn load_comments_keeps_first_column_trimmed() {
        let api = FakeSheets::new(&[
            &["  Great video! ", "extra"],
            &[],
            &["   "],
            &["Cảm ơn bạn"],
            &["", "second column only"],
        ]);
        let comments = load_comments(&api, &credential_json(), "sheet-1", DEFAULT_RANGE).unwrap();
        assert_eq!(comments.as_slice(), ["Great video!", "Cảm ơn bạn"]);
        assert_eq!(api.calls.get(), 1);
    }

    #[test]
    fn missing_inputs_fail_before_calling_the_service() {
        let api = FakeSheets::new(&[&["x"]]);
        let cases = [
            ("", "sheet", DEFAULT_RANGE),
            ("{}", "  ", DEFAULT_RANGE),
            ("{}", "sheet", ""),
            ("{}", "sheet", "!A:A"),
        ];
        for (doc, sheet, range) in cases {
            let err = load_comments(&api, doc, sheet, range).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
        assert_eq!(api.calls.get(), 0);
    }

    #[test]
    fn malformed_credential_is_authentication_error() {
        let api = FakeSheets::new(&[&["x"]]);
        for doc in [
            "not json",
            r#"{"client_email":"a@b"}"#,
            r#"{"client_email":"a@b","private_key":"nope"}"#,
        ] {
            let err = load_comments(&api, doc, "sheet", DEFAULT_RANGE).unwrap_err();
            assert!(matches!(err, Error::Authentication(_)), "{doc}");
        }
        assert_eq!(api.calls.get(), 0);
    }

    #[test]
    fn parsed_key_keeps_the_raw_document() {
        let doc = credential_json();
        let key = ServiceAccountKey::from_json(&doc).unwrap();
        assert_eq!(key.document, doc);
        assert_eq!(key.client_email, "loader@demo-project.iam.gserviceaccount.com");
    }

    #[test]
    fn debug_output_hides_private_key() {
        let key = ServiceAccountKey::from_json(&credential_json()).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("loader@demo-project"));
        assert!(!debug.contains("MII"));
    }

    #[test]
    fn range_is_one_encoded_path_segment() {
        let client = SheetsClient::new();
        let url = client.values_url("abc123", "Bình luận!A:A").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/B%C3%ACnh%20lu%E1%BA%ADn!A:A"
        );
    }

    #[test]
    fn split_range_defaults_to_whole_sheet() {
        assert_eq!(split_range("Sheet1!A:A"), ("Sheet1", Some("A:A")));
        assert_eq!(split_range("Comments"), ("Comments", None));
    }

    #[test]
    fn value_range_handles_missing_values_and_numbers() {
        let body: ValueRange = serde_json::from_str(r#"{"range":"Sheet1!A1:A3"}"#).unwrap();
        assert!(body.values.is_empty());
        let body: ValueRange =
            serde_json::from_str(r#"{"values":[["hi"],[42],[null]]}"#).unwrap();
        let cells: Vec<String> = body
            .values
            .into_iter()
            .flat_map(|row| row.into_iter().map(cell_text))
            .collect();
        assert_eq!(cells, ["hi", "42", ""]);
    }

    fn client_for(server: &mockito::ServerGuard) -> SheetsClient {
        SheetsClient::with_base_url(format!("{}/v4/spreadsheets", server.url()))
    }

    #[test]
    fn values_request_carries_bearer_token_and_row_major_query() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v4/spreadsheets/abc123/values/Sheet1!A:A")
            .match_query(Matcher::UrlEncoded("majorDimension".into(), "ROWS".into()))
            .match_header("authorization", "Bearer ya29.test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"range":"Sheet1!A1:B4","majorDimension":"ROWS","values":[["  First "],["","skip"],[],["Second","x"]]}"#)
            .create();

        let rows = client_for(&server)
            .fetch_with_token("ya29.test-token", "abc123", "Sheet1!A:A")
            .unwrap();
        mock.assert();
        assert_eq!(rows.len(), 4);
        assert_eq!(CommentList::from_rows(rows).as_slice(), ["First", "Second"]);
    }

    #[test]
    fn values_failures_map_to_error_kinds() {
        let cases = [
            (
                401,
                r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#,
                "authentication",
            ),
            (
                403,
                r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#,
                "authentication",
            ),
            (
                404,
                r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#,
                "not_found",
            ),
            (
                400,
                r#"{"error":{"code":400,"message":"Unable to parse range: Missing!A:A","status":"INVALID_ARGUMENT"}}"#,
                "not_found",
            ),
            (
                500,
                r#"{"error":{"code":500,"message":"Internal error encountered.","status":"INTERNAL"}}"#,
                "upstream",
            ),
        ];
        for (status, body, kind) in cases {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", Matcher::Any)
                .with_status(status)
                .with_header("content-type", "application/json")
                .with_body(body)
                .create();
            let err = client_for(&server)
                .fetch_with_token("tok", "abc123", DEFAULT_RANGE)
                .unwrap_err();
            assert_eq!(err.kind(), kind, "status {status}");
        }
    }

    #[test]
    fn unexpected_values_body_is_upstream() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create();
        let err = client_for(&server)
            .fetch_with_token("tok", "abc123", DEFAULT_RANGE)
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }
}
