use std::fmt::Write as _;
use std::sync::Arc;

use super::fit;
use crate::api::RemoteStore;
use crate::dashboard::{DashboardController, DashboardSnapshot, CHART_PLACEHOLDER, NO_TOP_PRODUCTS};
use crate::format::{format_number_id, format_rupiah};
use crate::models::Granularity;

pub async fn run<S: RemoteStore>(store: Arc<S>, range: Granularity) -> String {
    let dashboard = DashboardController::with_granularity(store, range);
    dashboard.load().await;
    render_dashboard(&dashboard.snapshot())
}

pub fn render_dashboard(snap: &DashboardSnapshot) -> String {
    let summary = snap.summary_or_default();
    let mut out = String::new();

    out.push_str("Dashboard\n");
    if snap.loading {
        out.push_str("Loading data...\n");
    }
    let _ = writeln!(out, "Products:              {}", format_number_id(summary.product_count as f64));
    let _ = writeln!(out, "Transactions today:    {}", summary.today_transaction_count);
    let _ = writeln!(
        out,
        "Revenue today:         {}  ({})",
        format_rupiah(summary.today_revenue),
        snap.revenue_change_label()
    );
    let _ = writeln!(out, "Revenue this month:    {}", format_rupiah(summary.month_revenue));
    out.push('\n');

    let _ = writeln!(out, "{}", snap.granularity.title());
    match snap.renderable_chart() {
        Some(chart) => {
            for (i, label) in chart.labels.iter().enumerate() {
                let cells: Vec<String> = chart
                    .datasets
                    .iter()
                    .map(|set| format_rupiah(set.values.get(i).copied().unwrap_or(0.0)))
                    .collect();
                let _ = writeln!(out, "  {} {}", fit(label, 12), cells.join("  "));
            }
        }
        None => {
            let _ = writeln!(out, "  {CHART_PLACEHOLDER}");
        }
    }
    out.push('\n');

    out.push_str("Top products\n");
    if snap.top_products.is_empty() {
        let _ = writeln!(out, "  {NO_TOP_PRODUCTS}");
    } else {
        let _ = writeln!(
            out,
            "  {} {} {:>6} {:>16}",
            fit("Product", 28),
            fit("Category", 16),
            "Sold",
            "Revenue"
        );
        for product in &snap.top_products {
            let _ = writeln!(
                out,
                "  {} {} {:>6} {:>16}",
                fit(&product.name, 28),
                fit(&product.category, 16),
                product.units_sold,
                format_rupiah(product.revenue)
            );
        }
    }
    out
}
