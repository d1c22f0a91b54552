//! Daily post quota
//!
//! Counts successful posts per calendar day in a small text file
//! (`"<count>,<YYYY-MM-DD>"`). A count recorded for an earlier day is treated
//! as zero. The file is replaced atomically on every increment.
//!
//! The file is not locked: two runs racing on the same file can both see
//! room under the limit.

use chrono::NaiveDate;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};
use crate::types::DailyQuota;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted daily counter with a fixed limit
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    path: PathBuf,
    daily_limit: u32,
}

impl QuotaTracker {
    /// Create a tracker backed by `path`, allowing `daily_limit` posts per day
    pub fn new(path: impl Into<PathBuf>, daily_limit: u32) -> Self {
        Self {
            path: path.into(),
            daily_limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Load the quota for `today`
    ///
    /// Returns a fresh quota when no file exists or the file belongs to an
    /// earlier day. Nothing is written back until [`record_post`] is called.
    ///
    /// [`record_post`]: QuotaTracker::record_post
    pub fn load(&self, today: NaiveDate) -> Result<DailyQuota> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(DailyQuota::fresh(today));
            }
            Err(e) => return Err(StorageError::IoError(e).into()),
        };

        let stored = self.parse(&content)?;
        if stored.date != today {
            tracing::debug!(
                "Quota from {} reset for {} (was {})",
                stored.date,
                today,
                stored.count
            );
            return Ok(DailyQuota::fresh(today));
        }

        Ok(stored)
    }

    /// Check whether another post fits under the daily limit
    pub fn can_post(&self, quota: &DailyQuota) -> bool {
        quota.count < self.daily_limit
    }

    /// Record one successful post and persist the new quota
    ///
    /// If `quota` belongs to an earlier day, counting restarts at 1.
    pub fn record_post(&self, quota: &DailyQuota, today: NaiveDate) -> Result<DailyQuota> {
        let base = if quota.date == today { quota.count } else { 0 };
        let updated = DailyQuota {
            count: base + 1,
            date: today,
        };

        self.persist(&updated)?;
        Ok(updated)
    }

    fn parse(&self, content: &str) -> Result<DailyQuota> {
        let corrupt = |reason: String| StorageError::CorruptQuota {
            path: self.path.display().to_string(),
            reason,
        };

        let (count, date) = content
            .trim()
            .split_once(',')
            .ok_or_else(|| corrupt("expected '<count>,<date>'".to_string()))?;

        let count = count
            .trim()
            .parse::<u32>()
            .map_err(|e| corrupt(format!("invalid count '{}': {}", count, e)))?;
        let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
            .map_err(|e| corrupt(format!("invalid date '{}': {}", date, e)))?;

        Ok(DailyQuota { count, date })
    }

    /// Write to a sibling temp file, sync it, then rename over the target
    fn persist(&self, quota: &DailyQuota) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StorageError::IoError)?;
            }
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp_path).map_err(StorageError::IoError)?;
        file.write_all(quota.to_string().as_bytes())
            .map_err(StorageError::IoError)?;
        file.sync_all().map_err(StorageError::IoError)?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(StorageError::IoError)?;

        tracing::debug!("Persisted quota {} to {}", quota, self.path.display());
        Ok(())
    }
}
