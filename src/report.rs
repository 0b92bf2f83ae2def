//! Sales report screen state.
//!
//! Holds the selected date range and the transactions the store returned for
//! it. Every settled range selection refetches; the response replaces the list
//! wholesale. Totals are derived from the list each time they are asked for.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::api::{self, RemoteStore};
use crate::models::{DateRange, TransactionRecord};
use crate::sequence::RequestSequence;

/// Days covered by the initial range, ending today.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

const REPORT_FETCH_FAILED: &str = "Failed to load the sales report.";

/// What the transaction table should show.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportStatus {
    Loading,
    Loaded,
    /// The fetch succeeded with no rows.
    Empty,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSnapshot {
    pub range: DateRange,
    pub records: Vec<TransactionRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

impl ReportSnapshot {
    pub fn total_transactions(&self) -> usize {
        self.records.len()
    }

    pub fn total_sales(&self) -> f64 {
        self.records.iter().map(|r| r.total_price).sum()
    }

    pub fn status(&self) -> ReportStatus {
        if self.loading {
            ReportStatus::Loading
        } else if let Some(message) = &self.error {
            ReportStatus::Failed(message.clone())
        } else if self.records.is_empty() {
            ReportStatus::Empty
        } else {
            ReportStatus::Loaded
        }
    }
}

pub struct ReportController<S: RemoteStore> {
    store: Arc<S>,
    state: Mutex<ReportSnapshot>,
    sequence: RequestSequence,
}

impl<S: RemoteStore> ReportController<S> {
    /// `today` comes from the caller's local clock. The controller starts in
    /// the loading state; call [`refresh`](Self::refresh) to mount it.
    pub fn new(store: Arc<S>, today: NaiveDate) -> Self {
        Self {
            store,
            state: Mutex::new(ReportSnapshot {
                range: DateRange::last_days(today, DEFAULT_RANGE_DAYS),
                records: Vec::new(),
                loading: true,
                error: None,
            }),
            sequence: RequestSequence::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ReportSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> ReportSnapshot {
        self.lock_state().clone()
    }

    pub fn range(&self) -> DateRange {
        self.lock_state().range
    }

    /// Apply a calendar selection. A half-finished selection (one endpoint
    /// missing) is ignored and returns `Ok(false)`; an inverted one is
    /// rejected without fetching.
    pub async fn select_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<bool, String> {
        let (Some(from), Some(to)) = (from, to) else {
            debug!("report range selection incomplete, not fetching");
            return Ok(false);
        };
        let range = DateRange::new(from, to)?;
        self.fetch(Some(range)).await;
        Ok(true)
    }

    /// Fetch transactions for the current range.
    pub async fn refresh(&self) {
        self.fetch(None).await;
    }

    async fn fetch(&self, new_range: Option<DateRange>) {
        let (token, range) = {
            let mut state = self.lock_state();
            if let Some(range) = new_range {
                state.range = range;
            }
            state.loading = true;
            (self.sequence.next(), state.range)
        };

        let result = api::fetch_transactions(self.store.as_ref(), &range).await;

        let mut state = self.lock_state();
        if !self.sequence.is_current(token) {
            debug!(token, "dropping stale report response");
            return;
        }
        match result {
            Ok(records) => {
                info!(
                    from = %range.from(),
                    to = %range.to(),
                    count = records.len(),
                    "report loaded"
                );
                state.records = records;
                state.error = None;
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch report");
                state.records.clear();
                state.error = Some(e.user_message(REPORT_FETCH_FAILED));
            }
        }
        state.loading = false;
    }
}
