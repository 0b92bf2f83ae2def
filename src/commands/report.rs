use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use super::fit;
use crate::api::RemoteStore;
use crate::format::{format_rupiah, format_timestamp};
use crate::models::DateRange;
use crate::report::{ReportController, ReportSnapshot, ReportStatus, DEFAULT_RANGE_DAYS};

/// Load the report for the requested range and render it. A missing `--to`
/// means today; a missing `--from` means 30 days before `--to`.
pub async fn run<S: RemoteStore>(
    store: Arc<S>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> anyhow::Result<String> {
    let today = Local::now().date_naive();
    let report = ReportController::new(store, today);

    if from.is_none() && to.is_none() {
        report.refresh().await;
    } else {
        let to = to.unwrap_or(today);
        let from = from.unwrap_or_else(|| DateRange::last_days(to, DEFAULT_RANGE_DAYS).from());
        report
            .select_range(Some(from), Some(to))
            .await
            .map_err(anyhow::Error::msg)?;
    }

    Ok(render_report(&report.snapshot()))
}

pub fn render_report(snap: &ReportSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Sales Report  {}", snap.range.label());
    let _ = writeln!(out, "Total transactions: {}", snap.total_transactions());
    let _ = writeln!(out, "Total sales:        {}", format_rupiah(snap.total_sales()));
    out.push('\n');

    let _ = writeln!(
        out,
        "{} {} {} {:>5} {:>16}",
        fit("Invoice", 14),
        fit("Date", 24),
        fit("Items", 36),
        "Qty",
        "Total"
    );

    match snap.status() {
        ReportStatus::Loading => out.push_str("Loading data...\n"),
        ReportStatus::Failed(message) => {
            let _ = writeln!(out, "Error: {message}");
        }
        ReportStatus::Empty => out.push_str("No transactions in this date range.\n"),
        ReportStatus::Loaded => {
            for record in &snap.records {
                let _ = writeln!(
                    out,
                    "{} {} {} {:>5} {:>16}",
                    fit(&record.invoice_number, 14),
                    fit(&format_timestamp(&record.timestamp), 24),
                    fit(&record.items.display_names(), 36),
                    record.item_count,
                    format_rupiah(record.total_price)
                );
            }
        }
    }
    out
}
