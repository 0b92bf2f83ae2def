//! Wire and view types for the store API.
//!
//! The store API is a PHP backend with Indonesian field names and loose
//! typing: numbers sometimes arrive as strings, and a transaction's `items`
//! may be an array or a JSON-encoded string. Everything is normalised here,
//! at the decoding boundary, so the controllers only see one shape.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder shown when `items` is a string that does not parse as JSON.
pub const ITEMS_INVALID_FORMAT: &str = "Invalid item list format";
/// Placeholder shown when `items` is neither a list nor a JSON string of one.
pub const ITEMS_INVALID_DATA: &str = "Invalid item data";

/// Payment method tag sent with every checkout.
pub const PAYMENT_METHOD_CASH: &str = "Tunai";

// ---------------------------------------------------------------------------
// Lenient number decoding
// ---------------------------------------------------------------------------

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    value_to_f64(Value::deserialize(deserializer)?).map_err(de::Error::custom)
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .ok_or_else(|| de::Error::custom(format!("number out of range: {n}"))),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f.round() as i64))
                .map_err(|_| de::Error::custom(format!("expected integer, got {s:?}")))
        }
        Value::Null => Ok(0),
        other => Err(de::Error::custom(format!("expected integer, got {other}"))),
    }
}

fn lenient_f64_seq<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .into_iter()
            .map(|v| value_to_f64(v).map_err(de::Error::custom))
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(de::Error::custom(format!("expected array, got {other}"))),
    }
}

fn value_to_f64(value: Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number out of range: {n}")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("expected number, got {s:?}")),
        Value::Null => Ok(0.0),
        other => Err(format!("expected number, got {other}")),
    }
}

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Inclusive calendar-date range used by the sales report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, String> {
        if from > to {
            return Err(format!(
                "Start date {} is after end date {}",
                from.format("%Y-%m-%d"),
                to.format("%Y-%m-%d")
            ));
        }
        Ok(Self { from, to })
    }

    /// `[today - days, today]`.
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        Self {
            from: today - Duration::days(days),
            to: today,
        }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    /// Query parameters for `transaksi/read.php`.
    pub fn query_params(&self) -> [(&'static str, String); 2] {
        [
            ("start_date", self.from.format("%Y-%m-%d").to_string()),
            ("end_date", self.to.format("%Y-%m-%d").to_string()),
        ]
    }

    /// Label for the range picker, e.g. `Sep 19, 2026 - Oct 19, 2026`.
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.from.format("%b %d, %Y"),
            self.to.format("%b %d, %Y")
        )
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// One entry of a transaction's item list. Only the product name is used;
/// everything else the backend stores is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemRef {
    pub product_name: Option<String>,
    pub extra: Map<String, Value>,
}

impl ItemRef {
    fn from_value(value: Value) -> Self {
        let Value::Object(mut obj) = value else {
            return Self::default();
        };
        let name_value = obj.remove("nama_barang").or_else(|| obj.remove("name"));
        let product_name = match name_value {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Self {
            product_name,
            extra: obj,
        }
    }
}

/// A transaction's `items` field after normalisation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ItemList {
    Items(Vec<ItemRef>),
    /// A string that is not valid JSON.
    MalformedJson,
    /// Anything else: numbers, objects, missing field, JSON string holding a
    /// non-array.
    #[default]
    Unrecognized,
}

impl ItemList {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(parsed) => Self::from_parsed(parsed),
                Err(e) => {
                    tracing::debug!(error = %e, "transaction items string is not valid JSON");
                    ItemList::MalformedJson
                }
            },
            other => Self::from_parsed(other.clone()),
        }
    }

    fn from_parsed(value: Value) -> Self {
        match value {
            Value::Array(entries) => {
                ItemList::Items(entries.into_iter().map(ItemRef::from_value).collect())
            }
            _ => ItemList::Unrecognized,
        }
    }

    /// Product names joined with `", "`, or the matching placeholder.
    pub fn display_names(&self) -> String {
        match self {
            ItemList::Items(items) => items
                .iter()
                .map(|item| item.product_name.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(", "),
            ItemList::MalformedJson => ITEMS_INVALID_FORMAT.to_string(),
            ItemList::Unrecognized => ITEMS_INVALID_DATA.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for ItemList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(ItemList::from_value(&value))
    }
}

/// Render the item names of a raw `items` value.
pub fn format_item_names(items: &Value) -> String {
    ItemList::from_value(items).display_names()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionRecord {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(rename = "no_faktur", default)]
    pub invoice_number: String,
    #[serde(rename = "tanggal", default)]
    pub timestamp: String,
    #[serde(default)]
    pub items: ItemList,
    #[serde(rename = "total_item", default, deserialize_with = "lenient_i64")]
    pub item_count: i64,
    #[serde(rename = "total_harga", default, deserialize_with = "lenient_f64")]
    pub total_price: f64,
    #[serde(rename = "metode_pembayaran", default)]
    pub payment_method: String,
}

// ---------------------------------------------------------------------------
// Products and cart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductSearchResult {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(rename = "nama_barang", default)]
    pub name: String,
    #[serde(rename = "harga", default, deserialize_with = "lenient_f64")]
    pub unit_price: f64,
    #[serde(rename = "stok", default, deserialize_with = "lenient_i64")]
    pub stock_level: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    #[serde(rename = "id")]
    pub product_id: i64,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: f64,
    pub quantity: u32,
    #[serde(rename = "total")]
    pub line_total: f64,
}

impl CartLine {
    pub fn for_product(product: &ProductSearchResult) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.unit_price,
            quantity: 1,
            line_total: product.unit_price,
        }
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.line_total = self.unit_price * f64::from(quantity);
    }
}

/// Body of `POST /transaksi/create.php`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTransactionRequest {
    pub items: Vec<CartLine>,
    #[serde(rename = "totalHarga")]
    pub total_price: f64,
    #[serde(rename = "metodePembayaran")]
    pub payment_method: String,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SummaryStats {
    #[serde(rename = "total_produk", default, deserialize_with = "lenient_i64")]
    pub product_count: i64,
    #[serde(rename = "transaksi_hari_ini", default, deserialize_with = "lenient_i64")]
    pub today_transaction_count: i64,
    #[serde(rename = "omset_hari_ini", default, deserialize_with = "lenient_f64")]
    pub today_revenue: f64,
    #[serde(
        rename = "omset_percentage_change",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub revenue_percent_change: f64,
    #[serde(rename = "omset_bulan_ini", default, deserialize_with = "lenient_f64")]
    pub month_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartDataset {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(
        rename = "data",
        alias = "values",
        default,
        deserialize_with = "lenient_f64_seq"
    )]
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

impl ChartSeries {
    /// A series with no dataset cannot be drawn.
    pub fn is_renderable(&self) -> bool {
        !self.datasets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "sold", default, deserialize_with = "lenient_i64")]
    pub units_sold: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub revenue: f64,
}

/// Aggregation bucket of the sales chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Weekly,
    Monthly,
}

impl Granularity {
    pub fn as_query(&self) -> &'static str {
        match self {
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Granularity::Weekly => "Sales over the last 7 days",
            Granularity::Monthly => "Sales over the last 12 months",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(Granularity::Weekly),
            "monthly" | "month" => Ok(Granularity::Monthly),
            other => Err(format!(
                "unknown chart range {other:?} (expected weekly or monthly)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
    }

    #[test]
    fn format_item_names_handles_all_shapes() {
        assert_eq!(
            format_item_names(&json!([{"nama_barang": "A"}, {"nama_barang": "B"}])),
            "A, B"
        );
        assert_eq!(
            format_item_names(&json!("[{\"nama_barang\":\"A\"}]")),
            "A"
        );
        assert_eq!(format_item_names(&json!("not json")), ITEMS_INVALID_FORMAT);
        assert_eq!(format_item_names(&json!(42)), ITEMS_INVALID_DATA);
    }

    #[test]
    fn format_item_names_edge_shapes() {
        // JSON string holding a non-array is data, not format, trouble.
        assert_eq!(format_item_names(&json!("{\"a\":1}")), ITEMS_INVALID_DATA);
        assert_eq!(format_item_names(&json!(null)), ITEMS_INVALID_DATA);
        assert_eq!(format_item_names(&json!([])), "");
        // Rows posted by the checkout screen use `name`.
        assert_eq!(
            format_item_names(&json!([{"id": 1, "name": "Gula"}, {"qty": 2}])),
            "Gula, "
        );
    }

    #[test]
    fn transaction_record_decodes_string_numbers_and_string_items() {
        let record: TransactionRecord = serde_json::from_value(json!({
            "id": "17",
            "no_faktur": "INV-0017",
            "tanggal": "2026-10-01 09:15:00",
            "items": "[{\"nama_barang\":\"Beras 5kg\",\"jumlah\":1}]",
            "total_item": "1",
            "total_harga": "65000.00",
            "metode_pembayaran": "Tunai"
        }))
        .expect("record should decode");

        assert_eq!(record.id, 17);
        assert_eq!(record.item_count, 1);
        assert_eq!(record.total_price, 65000.0);
        match &record.items {
            ItemList::Items(items) => {
                assert_eq!(items[0].product_name.as_deref(), Some("Beras 5kg"));
                assert_eq!(items[0].extra.get("jumlah"), Some(&json!(1)));
            }
            other => panic!("unexpected items: {other:?}"),
        }
    }

    #[test]
    fn transaction_record_without_items_is_unrecognized() {
        let record: TransactionRecord =
            serde_json::from_value(json!({"id": 1, "total_harga": 1000}))
                .expect("record should decode");
        assert_eq!(record.items, ItemList::Unrecognized);
        assert_eq!(record.items.display_names(), ITEMS_INVALID_DATA);
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let err = DateRange::new(date("2026-10-02"), date("2026-10-01"))
            .expect_err("inverted range should fail");
        assert!(err.contains("after end date"));
        assert!(DateRange::new(date("2026-10-01"), date("2026-10-01")).is_ok());
    }

    #[test]
    fn date_range_query_params_use_calendar_dates() {
        let range = DateRange::new(date("2026-01-05"), date("2026-02-28")).expect("valid range");
        let params = range.query_params();
        assert_eq!(params[0], ("start_date", "2026-01-05".to_string()));
        assert_eq!(params[1], ("end_date", "2026-02-28".to_string()));
    }

    #[test]
    fn last_days_spans_thirty_days() {
        let range = DateRange::last_days(date("2026-10-19"), 30);
        assert_eq!(range.from(), date("2026-09-19"));
        assert_eq!(range.to(), date("2026-10-19"));
        assert_eq!(range.label(), "Sep 19, 2026 - Oct 19, 2026");
    }

    #[test]
    fn cart_line_serializes_to_checkout_shape() {
        let product = ProductSearchResult {
            id: 3,
            name: "Minyak 1L".into(),
            unit_price: 18000.0,
            stock_level: 10,
        };
        let mut line = CartLine::for_product(&product);
        line.set_quantity(2);
        assert_eq!(
            serde_json::to_value(&line).expect("serialize line"),
            json!({"id": 3, "name": "Minyak 1L", "price": 18000.0, "quantity": 2, "total": 36000.0})
        );
    }

    #[test]
    fn summary_nulls_decode_as_zero() {
        let summary: SummaryStats = serde_json::from_value(json!({
            "total_produk": 12,
            "transaksi_hari_ini": null,
            "omset_hari_ini": "150000",
            "omset_percentage_change": -2.5
        }))
        .expect("summary should decode");
        assert_eq!(summary.product_count, 12);
        assert_eq!(summary.today_transaction_count, 0);
        assert_eq!(summary.today_revenue, 150000.0);
        assert_eq!(summary.revenue_percent_change, -2.5);
        assert_eq!(summary.month_revenue, 0.0);
    }

    #[test]
    fn chart_series_reads_data_key() {
        let series: ChartSeries = serde_json::from_value(json!({
            "labels": ["Mon", "Tue"],
            "datasets": [{"label": "Pendapatan", "data": [1000, "2500"]}]
        }))
        .expect("chart should decode");
        assert!(series.is_renderable());
        assert_eq!(series.datasets[0].values, vec![1000.0, 2500.0]);
    }

    #[test]
    fn granularity_parses_and_formats() {
        assert_eq!("Monthly".parse::<Granularity>(), Ok(Granularity::Monthly));
        assert_eq!(Granularity::Weekly.to_string(), "weekly");
        assert!("daily".parse::<Granularity>().is_err());
    }
}
