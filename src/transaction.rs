//! Sales entry screen: debounced product search, the cart, and checkout.
//!
//! The [`Cart`] is a plain value type with the line-item rules. The
//! [`TransactionController`] owns a cart plus the search and notice state and
//! runs the timers: a 300 ms debounce before each product lookup and a 5 s
//! auto-dismiss for checkout notices. Both timers are tasks spawned on the
//! current Tokio runtime, aborted when superseded and cancelled when the
//! controller is dropped.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{self, RemoteStore};
use crate::models::{CartLine, CreateTransactionRequest, ProductSearchResult, PAYMENT_METHOD_CASH};
use crate::sequence::RequestSequence;

/// Quiet period after the last keystroke before a lookup is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
/// How long a checkout notice stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);
/// Queries shorter than this never reach the network.
pub const MIN_QUERY_CHARS: usize = 2;

const SAVE_SUCCEEDED: &str = "Transaction saved successfully!";
const SAVE_FAILED: &str = "Failed to save the transaction.";
const SAVE_CONNECTION_FAILED: &str = "A connection error occurred.";

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

/// Ordered cart lines, at most one per product.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Add one unit of `product`: bumps the existing line or appends a new one.
    pub fn add(&mut self, product: &ProductSearchResult) {
        let existing = self
            .lines
            .iter()
            .find(|line| line.product_id == product.id)
            .map(|line| line.quantity);
        match existing {
            Some(quantity) => {
                self.update_quantity(product.id, quantity.saturating_add(1));
            }
            None => self.lines.push(CartLine::for_product(product)),
        }
    }

    /// Set a line's quantity. Quantities below 1 are ignored; returns whether
    /// a line changed.
    pub fn update_quantity(&mut self, product_id: i64, quantity: u32) -> bool {
        if quantity < 1 {
            return false;
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.set_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Drop a line whatever its quantity. Unknown ids are a no-op.
    pub fn remove(&mut self, product_id: i64) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(|l| l.line_total).sum()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn to_request(&self) -> CreateTransactionRequest {
        CreateTransactionRequest {
            items: self.lines.clone(),
            total_price: self.total(),
            payment_method: PAYMENT_METHOD_CASH.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Result of a `save_transaction` call.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    Saved(String),
    Failed(String),
    /// Nothing to submit.
    EmptyCart,
    /// A submission is already running; this one was not sent.
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionSnapshot {
    pub query: String,
    pub results: Vec<ProductSearchResult>,
    pub show_results: bool,
    pub cart: Cart,
    pub submitting: bool,
    pub notice: Option<Notice>,
}

impl TransactionSnapshot {
    pub fn total(&self) -> f64 {
        self.cart.total()
    }

    /// The save button is live only with something in the cart and no
    /// submission running.
    pub fn can_submit(&self) -> bool {
        !self.cart.is_empty() && !self.submitting
    }
}

#[derive(Debug, Default)]
struct TransactionState {
    view: TransactionSnapshot,
    notice_generation: u64,
}

pub struct TransactionController<S: RemoteStore + 'static> {
    store: Arc<S>,
    state: Arc<Mutex<TransactionState>>,
    search_sequence: Arc<RequestSequence>,
    pending_search: Mutex<Option<JoinHandle<()>>>,
    dismiss_timer: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
    debounce: Duration,
    notice_ttl: Duration,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl<S: RemoteStore + 'static> TransactionController<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_timings(store, SEARCH_DEBOUNCE, NOTICE_TTL)
    }

    pub fn with_timings(store: Arc<S>, debounce: Duration, notice_ttl: Duration) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(TransactionState::default())),
            search_sequence: Arc::new(RequestSequence::new()),
            pending_search: Mutex::new(None),
            dismiss_timer: Mutex::new(None),
            shutdown: CancellationToken::new(),
            debounce,
            notice_ttl,
        }
    }

    pub fn snapshot(&self) -> TransactionSnapshot {
        lock(&self.state).view.clone()
    }

    // -- Search -------------------------------------------------------------

    /// Update the search box. Must be called from within a Tokio runtime.
    pub fn set_query(&self, text: &str) {
        self.cancel_pending_search();
        // The token moves in the same critical section as the query so a
        // lookup in flight sees either the old state or the new one.
        let token = {
            let mut state = lock(&self.state);
            state.view.query = text.to_string();
            state.view.show_results = !text.is_empty();
            let token = self.search_sequence.next();
            if text.chars().count() < MIN_QUERY_CHARS {
                state.view.results.clear();
                return;
            }
            token
        };

        let store = self.store.clone();
        let state = self.state.clone();
        let sequence = self.search_sequence.clone();
        let shutdown = self.shutdown.clone();
        let debounce = self.debounce;
        let query = text.to_string();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }
            let result = tokio::select! {
                _ = shutdown.cancelled() => return,
                r = api::search_products(store.as_ref(), &query) => r,
            };
            let mut state = lock(&state);
            if !sequence.is_current(token) {
                debug!(token, "dropping stale product search response");
                return;
            }
            match result {
                Ok(products) => {
                    debug!(query = %query, count = products.len(), "product search completed");
                    state.view.results = products;
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "product search failed");
                    state.view.results.clear();
                }
            }
        });
        *lock(&self.pending_search) = Some(handle);
    }

    /// Wait until the pending lookup (if any) has finished or been superseded.
    pub async fn settle_search(&self) {
        let handle = lock(&self.pending_search).take();
        if let Some(handle) = handle {
            // A cancelled task is fine; its results were never wanted.
            let _ = handle.await;
        }
    }

    pub fn close_results(&self) {
        lock(&self.state).view.show_results = false;
    }

    fn cancel_pending_search(&self) {
        if let Some(handle) = lock(&self.pending_search).take() {
            handle.abort();
        }
    }

    // -- Cart ---------------------------------------------------------------

    /// Put one unit of `product` in the cart, then clear and close the search.
    pub fn add_to_cart(&self, product: &ProductSearchResult) {
        self.cancel_pending_search();
        let mut state = lock(&self.state);
        self.search_sequence.invalidate();
        state.view.cart.add(product);
        state.view.query.clear();
        state.view.results.clear();
        state.view.show_results = false;
        debug!(product_id = product.id, "added to cart");
    }

    pub fn update_quantity(&self, product_id: i64, quantity: u32) -> bool {
        lock(&self.state)
            .view
            .cart
            .update_quantity(product_id, quantity)
    }

    pub fn remove_from_cart(&self, product_id: i64) -> bool {
        lock(&self.state).view.cart.remove(product_id)
    }

    pub fn reset_cart(&self) {
        lock(&self.state).view.cart.clear();
    }

    pub fn total(&self) -> f64 {
        lock(&self.state).view.cart.total()
    }

    // -- Checkout -----------------------------------------------------------

    /// Submit the whole cart as one transaction. On success the cart is
    /// emptied; on failure it is kept for another attempt. Either way a notice
    /// is shown and scheduled for dismissal.
    pub async fn save_transaction(&self) -> CheckoutOutcome {
        let request = {
            let mut state = lock(&self.state);
            if state.view.submitting {
                return CheckoutOutcome::InFlight;
            }
            if state.view.cart.is_empty() {
                return CheckoutOutcome::EmptyCart;
            }
            state.view.submitting = true;
            state.view.notice = None;
            state.view.cart.to_request()
        };

        info!(
            lines = request.items.len(),
            total = request.total_price,
            "submitting transaction"
        );
        let result = api::create_transaction(self.store.as_ref(), &request).await;

        let (outcome, generation) = {
            let mut state = lock(&self.state);
            let outcome = match result {
                Ok(message) => {
                    let text = message.unwrap_or_else(|| SAVE_SUCCEEDED.to_string());
                    state.view.cart.clear();
                    state.view.notice = Some(Notice {
                        kind: NoticeKind::Success,
                        text: text.clone(),
                    });
                    info!(message = %text, "transaction saved");
                    CheckoutOutcome::Saved(text)
                }
                Err(e) => {
                    let text = if e.is_transport() {
                        SAVE_CONNECTION_FAILED.to_string()
                    } else {
                        e.user_message(SAVE_FAILED)
                    };
                    warn!(error = %e, "transaction save failed");
                    state.view.notice = Some(Notice {
                        kind: NoticeKind::Error,
                        text: text.clone(),
                    });
                    CheckoutOutcome::Failed(text)
                }
            };
            state.view.submitting = false;
            // Bumped with the notice itself; an older timer waking now no
            // longer matches.
            state.notice_generation += 1;
            (outcome, state.notice_generation)
        };

        self.schedule_notice_dismiss(generation);
        outcome
    }

    /// Clear the notice of `generation` after `notice_ttl`, replacing any
    /// earlier timer.
    fn schedule_notice_dismiss(&self, generation: u64) {
        let state = self.state.clone();
        let shutdown = self.shutdown.clone();
        let ttl = self.notice_ttl;
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(ttl) => {
                    let mut state = lock(&state);
                    if state.notice_generation == generation {
                        state.view.notice = None;
                    }
                }
            }
        });

        if let Some(previous) = lock(&self.dismiss_timer).replace(handle) {
            previous.abort();
        }
    }
}

impl<S: RemoteStore + 'static> Drop for TransactionController<S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.cancel_pending_search();
        if let Some(timer) = lock(&self.dismiss_timer).take() {
            timer.abort();
        }
    }
}
