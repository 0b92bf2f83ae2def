//! Summary dashboard state: today's figures, the sales chart and the
//! top-product ranking. The three fetches are independent; a failure in one
//! is logged and leaves only its own slot at the empty default.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::api::{self, RemoteStore};
use crate::models::{ChartSeries, Granularity, SummaryStats, TopProduct};
use crate::sequence::RequestSequence;

pub const CHART_PLACEHOLDER: &str = "Loading chart data...";
pub const NO_TOP_PRODUCTS: &str = "No sales data yet.";

/// `+N% from yesterday`, `N% from yesterday` or `same as yesterday`.
pub fn percent_change_label(change: f64) -> String {
    if change > 0.0 {
        format!("+{change}% from yesterday")
    } else if change < 0.0 {
        format!("{change}% from yesterday")
    } else {
        "same as yesterday".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardSnapshot {
    /// True until the summary/top-products wave has completed.
    pub loading: bool,
    pub summary: Option<SummaryStats>,
    pub top_products: Vec<TopProduct>,
    pub granularity: Granularity,
    pub chart: Option<ChartSeries>,
}

impl DashboardSnapshot {
    /// Summary figures with missing data shown as zero.
    pub fn summary_or_default(&self) -> SummaryStats {
        self.summary.clone().unwrap_or_default()
    }

    /// The label under today's revenue; `...` until a summary has arrived.
    pub fn revenue_change_label(&self) -> String {
        match &self.summary {
            Some(s) => percent_change_label(s.revenue_percent_change),
            None => "...".to_string(),
        }
    }

    /// The chart to draw, if there is one worth drawing.
    pub fn renderable_chart(&self) -> Option<&ChartSeries> {
        self.chart.as_ref().filter(|c| c.is_renderable())
    }
}

pub struct DashboardController<S: RemoteStore> {
    store: Arc<S>,
    state: Mutex<DashboardSnapshot>,
    chart_sequence: RequestSequence,
}

impl<S: RemoteStore> DashboardController<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_granularity(store, Granularity::default())
    }

    /// Start on `granularity` instead of the weekly default.
    pub fn with_granularity(store: Arc<S>, granularity: Granularity) -> Self {
        Self {
            store,
            state: Mutex::new(DashboardSnapshot {
                loading: true,
                granularity,
                ..DashboardSnapshot::default()
            }),
            chart_sequence: RequestSequence::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DashboardSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.lock_state().clone()
    }

    /// Mount: fetch summary, top products and the chart for the current
    /// granularity concurrently.
    pub async fn load(&self) {
        let (token, granularity) = {
            let state = self.lock_state();
            (self.chart_sequence.next(), state.granularity)
        };
        tokio::join!(
            async {
                tokio::join!(self.load_summary(), self.load_top_products());
                self.lock_state().loading = false;
            },
            self.load_chart(token, granularity),
        );
    }

    async fn load_summary(&self) {
        match api::fetch_summary(self.store.as_ref()).await {
            Ok(summary) => {
                debug!(?summary, "dashboard summary loaded");
                self.lock_state().summary = Some(summary);
            }
            Err(e) => warn!(error = %e, "failed to fetch dashboard summary"),
        }
    }

    async fn load_top_products(&self) {
        match api::fetch_top_products(self.store.as_ref()).await {
            Ok(products) => {
                debug!(count = products.len(), "top products loaded");
                self.lock_state().top_products = products;
            }
            Err(e) => warn!(error = %e, "failed to fetch top products"),
        }
    }

    /// Switch the chart between weekly and monthly. Switching discards the
    /// current series and refetches; re-selecting the current value does
    /// nothing.
    pub async fn select_granularity(&self, granularity: Granularity) {
        let token = {
            let mut state = self.lock_state();
            if state.granularity == granularity {
                return;
            }
            state.granularity = granularity;
            state.chart = None;
            self.chart_sequence.next()
        };
        info!(range = %granularity, "chart range changed");
        self.load_chart(token, granularity).await;
    }

    /// `token` must have been taken under the state lock together with
    /// `granularity`.
    async fn load_chart(&self, token: u64, granularity: Granularity) {
        let result = api::fetch_sales_chart(self.store.as_ref(), granularity).await;

        let mut state = self.lock_state();
        if !self.chart_sequence.is_current(token) {
            debug!(token, range = %granularity, "dropping stale chart response");
            return;
        }
        match result {
            Ok(series) => state.chart = Some(series),
            Err(e) => warn!(error = %e, range = %granularity, "failed to fetch sales chart"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{SALES_CHART_PATH, SUMMARY_PATH, TOP_PRODUCTS_PATH};
    use crate::error::ApiError;
    use crate::testing::ScriptedStore;
    use serde_json::json;
    use std::time::Duration;

    fn chart(label: &str, values: &[f64]) -> serde_json::Value {
        json!({"labels": [label], "datasets": [{"label": "Pendapatan", "data": values}]})
    }

    #[test]
    fn percent_change_label_branches() {
        assert_eq!(percent_change_label(5.0), "+5% from yesterday");
        assert_eq!(percent_change_label(-3.0), "-3% from yesterday");
        assert_eq!(percent_change_label(0.0), "same as yesterday");
        assert_eq!(percent_change_label(12.5), "+12.5% from yesterday");
    }

    #[tokio::test]
    async fn load_fills_all_three_slots() {
        let store = Arc::new(ScriptedStore::new());
        store.respond(
            SUMMARY_PATH,
            Ok(json!({
                "total_produk": 120,
                "transaksi_hari_ini": 8,
                "omset_hari_ini": 450000,
                "omset_percentage_change": 5
            })),
        );
        store.respond(
            TOP_PRODUCTS_PATH,
            Ok(json!({"records": [{"name": "Gula", "category": "Sembako", "sold": 40, "revenue": 600000}]})),
        );
        store.respond(SALES_CHART_PATH, Ok(chart("Mon", &[1000.0])));

        let dashboard = DashboardController::new(store.clone());
        dashboard.load().await;

        let snap = dashboard.snapshot();
        assert!(!snap.loading);
        assert_eq!(snap.summary_or_default().product_count, 120);
        assert_eq!(snap.revenue_change_label(), "+5% from yesterday");
        assert_eq!(snap.top_products.len(), 1);
        assert!(snap.renderable_chart().is_some());
        assert!(store
            .calls()
            .contains(&"GET /laporan/sales_chart.php?range=weekly".to_string()));
    }

    #[tokio::test]
    async fn one_failure_does_not_clear_the_others() {
        let store = Arc::new(ScriptedStore::new());
        store.respond(
            SUMMARY_PATH,
            Err(ApiError::Transport("Connection timed out".into())),
        );
        store.respond(
            TOP_PRODUCTS_PATH,
            Ok(json!({"records": [{"name": "Kopi", "category": "Minuman", "sold": 3, "revenue": 4500}]})),
        );
        store.respond(
            SALES_CHART_PATH,
            Err(ApiError::Status {
                status: 500,
                message: None,
            }),
        );

        let dashboard = DashboardController::new(store);
        dashboard.load().await;

        let snap = dashboard.snapshot();
        assert!(snap.summary.is_none());
        assert_eq!(snap.summary_or_default().today_revenue, 0.0);
        assert_eq!(snap.revenue_change_label(), "...");
        assert_eq!(snap.top_products[0].name, "Kopi");
        assert!(snap.renderable_chart().is_none());
        assert!(!snap.loading);
    }

    #[tokio::test]
    async fn switching_granularity_refetches_and_reselecting_is_a_noop() {
        let store = Arc::new(ScriptedStore::new());
        store.respond(SALES_CHART_PATH, Ok(chart("Mon", &[1.0])));
        store.respond(SALES_CHART_PATH, Ok(chart("Jan", &[2.0])));
        let dashboard = DashboardController::new(store.clone());

        dashboard.select_granularity(Granularity::Weekly).await;
        assert!(store.calls().is_empty());

        dashboard.select_granularity(Granularity::Monthly).await;
        let snap = dashboard.snapshot();
        assert_eq!(snap.granularity, Granularity::Monthly);
        assert_eq!(
            snap.chart.as_ref().map(|c| c.labels.clone()),
            Some(vec!["Mon".to_string()])
        );
        assert_eq!(
            store.calls(),
            vec!["GET /laporan/sales_chart.php?range=monthly".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_switch_leaves_placeholder_not_old_series() {
        let store = Arc::new(ScriptedStore::new());
        store.respond(SALES_CHART_PATH, Ok(chart("Mon", &[1.0])));
        store.respond(SALES_CHART_PATH, Ok(json!({"message": "no data"})));
        let dashboard = DashboardController::new(store);
        dashboard.load().await;
        assert!(dashboard.snapshot().renderable_chart().is_some());

        dashboard.select_granularity(Granularity::Monthly).await;
        assert!(dashboard.snapshot().chart.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_switch_keeps_latest_series() {
        let store = Arc::new(ScriptedStore::new());
        store.respond_after(
            SALES_CHART_PATH,
            Duration::from_millis(400),
            Ok(chart("monthly", &[1.0])),
        );
        store.respond_after(
            SALES_CHART_PATH,
            Duration::from_millis(50),
            Ok(chart("weekly", &[2.0])),
        );
        let dashboard = DashboardController::new(store);

        tokio::join!(dashboard.select_granularity(Granularity::Monthly), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dashboard.select_granularity(Granularity::Weekly).await;
        });

        let snap = dashboard.snapshot();
        assert_eq!(snap.granularity, Granularity::Weekly);
        assert_eq!(
            snap.chart.map(|c| c.labels),
            Some(vec!["weekly".to_string()])
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn chart_parked_behind_range_switch_is_dropped() {
        let store = Arc::new(ScriptedStore::new());
        store.respond_after(
            SALES_CHART_PATH,
            Duration::from_millis(20),
            Ok(chart("weekly", &[1.0])),
        );
        let dashboard = Arc::new(DashboardController::new(store.clone()));
        let task = tokio::spawn({
            let dashboard = dashboard.clone();
            async move { dashboard.load().await }
        });
        while !store
            .calls()
            .iter()
            .any(|c| c.starts_with("GET /laporan/sales_chart.php"))
        {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        {
            // A switch to monthly lands while the weekly series waits.
            let mut state = dashboard.lock_state();
            std::thread::sleep(Duration::from_millis(80));
            dashboard.chart_sequence.next();
            state.granularity = Granularity::Monthly;
            state.chart = None;
        }
        task.await.expect("load task");

        let snap = dashboard.snapshot();
        assert_eq!(snap.granularity, Granularity::Monthly);
        assert!(snap.chart.is_none(), "stale chart: {:?}", snap.chart);
    }
}
