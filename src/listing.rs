//! Listings with per-item failures.

use crate::error::GovError;
use serde::Serialize;

/// One item a listing could not produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexFailure {
    pub item_id: String,
    pub reason: String,
}

impl IndexFailure {
    pub fn new(item_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            reason: reason.into(),
        }
    }
}

impl From<IndexFailure> for GovError {
    fn from(failure: IndexFailure) -> Self {
        GovError::IndexPartialFailure {
            item_id: failure.item_id,
            reason: failure.reason,
        }
    }
}

/// Items that were indexed, plus the ones that were omitted and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub failures: Vec<IndexFailure>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> Listing<T> {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
