use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use crate::{ARCHIVE_BASE_URL, FIRST_BOOK_ID, LAST_BOOK_ID, POOL_SIZE, RUN_TIMEOUT};

/// Everything a run needs. The binary only ever uses `FetchConfig::default()`.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub ids: RangeInclusive<u32>,
    /// Max number of books downloading at once. 0 is treated as 1.
    pub pool_size: usize,
    /// Upper bound on the whole run, after which outstanding downloads are cancelled.
    pub run_timeout: Duration,
    /// Scheme and host of the archive, without a trailing slash.
    pub base_url: String,
    pub target_dir: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            ids: FIRST_BOOK_ID..=LAST_BOOK_ID,
            pool_size: POOL_SIZE,
            run_timeout: RUN_TIMEOUT,
            base_url: ARCHIVE_BASE_URL.to_string(),
            target_dir: PathBuf::from("."),
        }
    }
}

impl FetchConfig {
    pub(crate) fn permits(&self) -> usize {
        self.pool_size.max(1)
    }
}
