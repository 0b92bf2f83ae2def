//! Store API client.
//!
//! The store backend is a plain PHP JSON API with no authentication. Requests
//! go through the [`RemoteStore`] trait so the screen controllers can run
//! against a scripted store in tests; [`StoreApi`] is the `reqwest`
//! implementation used by the binary. The typed endpoint functions at the
//! bottom of this file decode the raw JSON into `models` types.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::{
    ChartSeries, CreateTransactionRequest, DateRange, Granularity, ProductSearchResult,
    SummaryStats, TopProduct, TransactionRecord,
};

/// Default timeout for API requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const TRANSACTIONS_READ_PATH: &str = "/transaksi/read.php";
pub const TRANSACTIONS_CREATE_PATH: &str = "/transaksi/create.php";
pub const SUMMARY_PATH: &str = "/dashboard/summary.php";
pub const TOP_PRODUCTS_PATH: &str = "/laporan/top_products.php";
pub const SALES_CHART_PATH: &str = "/laporan/sales_chart.php";
pub const PRODUCT_SEARCH_PATH: &str = "/barang/read.php";

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the store API base URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> ApiError {
    let message = if err.is_connect() {
        format!("Cannot reach store API at {url}")
    } else if err.is_timeout() {
        format!("Connection to {url} timed out")
    } else if err.is_builder() {
        format!("Invalid store API URL: {url}")
    } else {
        format!("Network error communicating with {url}: {err}")
    };
    ApiError::Transport(message)
}

/// Pull the human-readable message out of an error body, if there is one.
pub(crate) fn error_message_from_body(body_text: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body_text).ok()?;
    json.get("message")
        .or_else(|| json.get("error"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a successful body; an empty body becomes `null`.
pub(crate) fn parse_success_body(body_text: &str) -> Result<Value, ApiError> {
    if body_text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body_text).map_err(|e| ApiError::Payload(e.to_string()))
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Raw JSON access to the store API.
pub trait RemoteStore: Send + Sync {
    /// `GET {base}{path}?{query}`.
    fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    /// `POST {base}{path}` with a JSON body.
    fn post_json(
        &self,
        path: &str,
        body: Value,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// `reqwest`-backed store client.
#[derive(Debug, Clone)]
pub struct StoreApi {
    client: Client,
    base_url: String,
}

impl StoreApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url);
        if base_url.is_empty() {
            return Err(ApiError::Transport(
                "Store API not configured: missing base URL".into(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_response(&self, resp: Response) -> Result<Value, ApiError> {
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = error_message_from_body(&body_text);
            warn!(
                status = status.as_u16(),
                message = message.as_deref().unwrap_or(""),
                "store API returned an error status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        parse_success_body(&body_text)
    }
}

impl RemoteStore for StoreApi {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, ?query, "GET");
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;
        self.read_response(resp).await
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "POST");
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;
        self.read_response(resp).await
    }
}

// ---------------------------------------------------------------------------
// Typed endpoints
// ---------------------------------------------------------------------------

/// Decode the `records` array of a list response. A body without `records`
/// is an empty list; individual rows that fail to decode are skipped.
pub(crate) fn records_from<T: DeserializeOwned>(
    body: Value,
    what: &str,
) -> Result<Vec<T>, ApiError> {
    let records = match body {
        Value::Object(mut obj) => obj.remove("records"),
        Value::Null => None,
        other => {
            return Err(ApiError::Payload(format!(
                "expected an object with records for {what}, got {other}"
            )))
        }
    };
    let rows = match records {
        Some(Value::Array(rows)) => rows,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(other) => {
            return Err(ApiError::Payload(format!(
                "{what} records is not an array: {other}"
            )))
        }
    };

    let mut out = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<T>(row) {
            Ok(record) => out.push(record),
            Err(e) => warn!(index, error = %e, what, "skipping undecodable record"),
        }
    }
    Ok(out)
}

pub async fn fetch_transactions<S: RemoteStore>(
    store: &S,
    range: &DateRange,
) -> Result<Vec<TransactionRecord>, ApiError> {
    let body = store
        .get_json(TRANSACTIONS_READ_PATH, &range.query_params())
        .await?;
    records_from(body, "transactions")
}

pub async fn fetch_summary<S: RemoteStore>(store: &S) -> Result<SummaryStats, ApiError> {
    let body = store.get_json(SUMMARY_PATH, &[]).await?;
    if !body.is_object() {
        return Err(ApiError::Payload(format!(
            "expected summary object, got {body}"
        )));
    }
    serde_json::from_value(body).map_err(|e| ApiError::Payload(e.to_string()))
}

pub async fn fetch_top_products<S: RemoteStore>(store: &S) -> Result<Vec<TopProduct>, ApiError> {
    let body = store.get_json(TOP_PRODUCTS_PATH, &[]).await?;
    records_from(body, "top products")
}

pub async fn fetch_sales_chart<S: RemoteStore>(
    store: &S,
    granularity: Granularity,
) -> Result<ChartSeries, ApiError> {
    let query = [("range", granularity.as_query().to_string())];
    let body = store.get_json(SALES_CHART_PATH, &query).await?;
    if body.get("labels").is_none() || body.get("datasets").is_none() {
        return Err(ApiError::Payload(
            "chart response is missing labels or datasets".into(),
        ));
    }
    serde_json::from_value(body).map_err(|e| ApiError::Payload(e.to_string()))
}

pub async fn search_products<S: RemoteStore>(
    store: &S,
    query: &str,
) -> Result<Vec<ProductSearchResult>, ApiError> {
    let params = [("s", query.to_string())];
    let body = store.get_json(PRODUCT_SEARCH_PATH, &params).await?;
    records_from(body, "products")
}

/// Submit a checkout. Returns the server's confirmation message, if any.
pub async fn create_transaction<S: RemoteStore>(
    store: &S,
    request: &CreateTransactionRequest,
) -> Result<Option<String>, ApiError> {
    let body = serde_json::to_value(request).map_err(|e| ApiError::Payload(e.to_string()))?;
    let resp = store.post_json(TRANSACTIONS_CREATE_PATH, body).await?;
    Ok(resp
        .get("message")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedStore;
    use serde_json::json;

    #[test]
    fn normalize_base_url_adds_scheme_and_strips_slashes() {
        assert_eq!(
            normalize_base_url("toko-agung.my.id/toko-agung-api/api/"),
            "https://toko-agung.my.id/toko-agung-api/api"
        );
        assert_eq!(
            normalize_base_url("localhost/toko-agung-api/api"),
            "http://localhost/toko-agung-api/api"
        );
        assert_eq!(normalize_base_url("  "), "");
    }

    #[test]
    fn error_message_from_body_reads_message_or_error() {
        assert_eq!(
            error_message_from_body(r#"{"message":"Stok tidak cukup"}"#).as_deref(),
            Some("Stok tidak cukup")
        );
        assert_eq!(
            error_message_from_body(r#"{"error":"bad range"}"#).as_deref(),
            Some("bad range")
        );
        assert_eq!(error_message_from_body("<html>500</html>"), None);
        assert_eq!(error_message_from_body(r#"{"message":""}"#), None);
    }

    #[test]
    fn parse_success_body_rejects_non_json() {
        assert_eq!(parse_success_body(""), Ok(Value::Null));
        assert!(matches!(
            parse_success_body("Warning: mysqli..."),
            Err(ApiError::Payload(_))
        ));
    }

    #[test]
    fn records_from_tolerates_missing_records_and_bad_rows() {
        let empty: Vec<TopProduct> =
            records_from(json!({"message": "no data"}), "top products").expect("empty list");
        assert!(empty.is_empty());

        let rows: Vec<TopProduct> = records_from(
            json!({"records": [
                {"name": "Gula", "category": "Sembako", "sold": "40", "revenue": 600000},
                {"name": "Broken", "sold": {"nested": true}}
            ]}),
            "top products",
        )
        .expect("rows decode");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].units_sold, 40);

        assert!(records_from::<TopProduct>(json!({"records": "nope"}), "x").is_err());
    }

    #[tokio::test]
    async fn fetch_transactions_sends_calendar_dates() {
        let store = ScriptedStore::new();
        store.respond(TRANSACTIONS_READ_PATH, Ok(json!({"records": []})));
        let range = DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2026, 9, 1).expect("date"),
            chrono::NaiveDate::from_ymd_opt(2026, 9, 30).expect("date"),
        )
        .expect("range");

        let records = fetch_transactions(&store, &range).await.expect("fetch");
        assert!(records.is_empty());
        assert_eq!(
            store.calls(),
            vec!["GET /transaksi/read.php?start_date=2026-09-01&end_date=2026-09-30".to_string()]
        );
    }

    #[tokio::test]
    async fn fetch_sales_chart_requires_labels_and_datasets() {
        let store = ScriptedStore::new();
        store.respond(SALES_CHART_PATH, Ok(json!({"labels": []})));
        let err = fetch_sales_chart(&store, Granularity::Monthly)
            .await
            .expect_err("incomplete chart");
        assert!(matches!(err, ApiError::Payload(_)));
        assert_eq!(
            store.calls(),
            vec!["GET /laporan/sales_chart.php?range=monthly".to_string()]
        );
    }

    #[tokio::test]
    async fn create_transaction_posts_checkout_body() {
        let store = ScriptedStore::new();
        store.respond(
            TRANSACTIONS_CREATE_PATH,
            Ok(json!({"message": "Transaksi berhasil dibuat."})),
        );
        let request = CreateTransactionRequest {
            items: vec![],
            total_price: 0.0,
            payment_method: "Tunai".into(),
        };
        let message = create_transaction(&store, &request).await.expect("create");
        assert_eq!(message.as_deref(), Some("Transaksi berhasil dibuat."));
        assert_eq!(
            store.posted_bodies(),
            vec![json!({"items": [], "totalHarga": 0.0, "metodePembayaran": "Tunai"})]
        );
    }
}
