//! Latest-request-wins bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request counter. Each fetch takes a token from [`next`]; when
/// the response arrives it is applied only if [`is_current`] still holds, so
/// a slow stale response can never overwrite a fresher one.
///
/// [`next`]: RequestSequence::next
/// [`is_current`]: RequestSequence::is_current
#[derive(Debug, Default)]
pub struct RequestSequence(AtomicU64);

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.0.load(Ordering::SeqCst) == token
    }

    /// Make every outstanding token stale.
    pub fn invalidate(&self) {
        self.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_latest_token_is_current() {
        let seq = RequestSequence::new();
        let first = seq.next();
        let second = seq.next();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));

        seq.invalidate();
        assert!(!seq.is_current(second));
    }
}
