//! Batch ingestion options and outcomes.

use index::MediaRecord;
use serde::{Deserialize, Serialize};

use crate::TwinError;

/// How [`MediaTwin::add_batch`](crate::MediaTwin::add_batch) walks its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Inputs fingerprinted concurrently per chunk.
    pub chunk_size: usize,
    /// Collect failures and keep going instead of aborting on the first one.
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            continue_on_error: false,
        }
    }
}

impl BatchOptions {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn validate(&self) -> Result<(), TwinError> {
        if self.chunk_size == 0 {
            return Err(TwinError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// One input that failed during a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the input in the batch.
    pub index: usize,
    /// Caller id, when the input carried one.
    pub id: Option<String>,
    pub error: TwinError,
}

/// Outcome of a batch that ran to completion.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Records added, in input order.
    pub added: Vec<MediaRecord>,
    /// Failures collected with `continue_on_error`.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.added.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
