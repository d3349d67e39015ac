// sfpd-align/src/options.rs

use std::time::Duration;

use crate::constants::{
    INITIAL_PARTITION_COUNT_GUESS, MAX_DEVICE_INDEX, MAX_FILE_OPEN_ATTEMPTS,
    MAX_PARTITION_COUNT_GUESS, OPEN_RETRY_DELAY, PIXEL_ALIGNMENT_DATA_FILE_PATH,
};
use crate::retry::RetryPolicy;

/// Bounds used while scanning disks and reading the record.
///
/// `Default` gives the production values from [`crate::constants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Disks `0..=max_device_index` are scanned.
    pub max_device_index: u32,
    pub max_open_attempts: u32,
    pub open_retry_delay: Duration,
    pub initial_partition_guess: usize,
    pub max_partition_guess: usize,
    /// Record location relative to the volume root.
    pub item_path: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            max_device_index: MAX_DEVICE_INDEX,
            max_open_attempts: MAX_FILE_OPEN_ATTEMPTS,
            open_retry_delay: OPEN_RETRY_DELAY,
            initial_partition_guess: INITIAL_PARTITION_COUNT_GUESS,
            max_partition_guess: MAX_PARTITION_COUNT_GUESS,
            item_path: PIXEL_ALIGNMENT_DATA_FILE_PATH.to_string(),
        }
    }
}

impl ScanOptions {
    pub fn open_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_open_attempts, self.open_retry_delay)
    }
}
