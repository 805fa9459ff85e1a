//! One-shot cancellation flag shared between the sweep and the logger.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set-once, read-many cancellation signal.
///
/// Clones share the flag. Nothing blocks on it; the logger polls it once
/// per tick.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns true only for the call that performed
    /// the false→true transition.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_happens_once() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        assert!(token.cancel());
        assert!(!other.cancel());
        assert!(other.is_cancelled());
    }
}
