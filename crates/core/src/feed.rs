//! Single-owner slot for fetched data that keeps stale data on failure.

use crate::{
    classify::{classify, Classification},
    error::FetchError,
};

/// Latest successfully fetched value plus the last classified failure.
#[derive(Debug, Clone)]
pub struct FeedCell<T> {
    value: Option<T>,
    last_error: Option<Classification>,
}

impl<T> Default for FeedCell<T> {
    fn default() -> Self {
        Self {
            value: None,
            last_error: None,
        }
    }
}

impl<T> FeedCell<T> {
    /// Empty cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, possibly stale.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Whether any value has ever been loaded.
    pub fn is_loaded(&self) -> bool {
        self.value.is_some()
    }

    /// Failure recorded by the most recent [`apply`](Self::apply), if any.
    pub fn last_error(&self) -> Option<&Classification> {
        self.last_error.as_ref()
    }

    /// Store a fetch result.
    ///
    /// Success replaces the value. Failure leaves the previous value in place
    /// and returns the classification so the caller can show it. Cancellation
    /// is logged but neither recorded nor returned.
    pub fn apply(
        &mut self,
        result: Result<T, FetchError>,
        context: &str,
        default_message: &str,
    ) -> Option<Classification> {
        match result {
            Ok(value) => {
                self.value = Some(value);
                self.last_error = None;
                None
            }
            Err(err) => {
                let classification = classify(&err, default_message);
                classification.log(context);
                if !classification.is_user_facing() {
                    return None;
                }
                self.last_error = Some(classification.clone());
                Some(classification)
            }
        }
    }

    /// Drop the value, e.g. after signing out.
    pub fn clear(&mut self) {
        self.value = None;
        self.last_error = None;
    }
}
