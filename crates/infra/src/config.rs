//! Ledger configuration, read from the process environment.

use anyhow::{Context, anyhow};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

pub const BUSINESS_UTC_OFFSET_VAR: &str = "GEMLEDGER_BUSINESS_UTC_OFFSET_MINUTES";
pub const MAX_CONFLICT_RETRIES_VAR: &str = "GEMLEDGER_MAX_CONFLICT_RETRIES";
pub const DEFAULT_CANCEL_REASON_VAR: &str = "GEMLEDGER_DEFAULT_CANCEL_REASON";
pub const MAX_PAGE_SIZE_VAR: &str = "GEMLEDGER_MAX_PAGE_SIZE";

/// India Standard Time, UTC+05:30.
const DEFAULT_OFFSET_MINUTES: i32 = 330;
const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;
const DEFAULT_CANCEL_REASON: &str = "Undone by admin";
const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Offset that decides which calendar day a sale belongs to (sale refs).
    pub business_utc_offset: FixedOffset,
    /// Extra attempts for a lot write that lost an optimistic-concurrency race.
    pub max_conflict_retries: u32,
    pub default_cancel_reason: String,
    pub max_page_size: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            business_utc_offset: FixedOffset::east_opt(DEFAULT_OFFSET_MINUTES * 60)
                .unwrap_or_else(|| Utc.fix()),
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            default_cancel_reason: DEFAULT_CANCEL_REASON.to_string(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl LedgerConfig {
    /// Read configuration from `GEMLEDGER_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LedgerConfig::from_env`] with an injectable lookup (tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let business_utc_offset = match lookup(BUSINESS_UTC_OFFSET_VAR) {
            Some(raw) => {
                let minutes: i32 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{BUSINESS_UTC_OFFSET_VAR} must be an integer number of minutes"))?;
                offset_from_minutes(minutes).context(BUSINESS_UTC_OFFSET_VAR)?
            }
            None => {
                tracing::debug!(var = BUSINESS_UTC_OFFSET_VAR, "unset, using default UTC+05:30");
                defaults.business_utc_offset
            }
        };

        let max_conflict_retries = match lookup(MAX_CONFLICT_RETRIES_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_CONFLICT_RETRIES_VAR} must be a non-negative integer"))?,
            None => defaults.max_conflict_retries,
        };

        let default_cancel_reason = match lookup(DEFAULT_CANCEL_REASON_VAR) {
            Some(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
            Some(_) => {
                return Err(anyhow!("{DEFAULT_CANCEL_REASON_VAR} cannot be blank"));
            }
            None => defaults.default_cancel_reason,
        };

        let max_page_size = match lookup(MAX_PAGE_SIZE_VAR) {
            Some(raw) => {
                let size: u32 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{MAX_PAGE_SIZE_VAR} must be a positive integer"))?;
                if size == 0 {
                    return Err(anyhow!("{MAX_PAGE_SIZE_VAR} must be at least 1"));
                }
                size
            }
            None => defaults.max_page_size,
        };

        Ok(Self {
            business_utc_offset,
            max_conflict_retries,
            default_cancel_reason,
            max_page_size,
        })
    }

    /// Calendar day of `at` in the business time zone.
    pub fn business_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.business_utc_offset).date_naive()
    }
}

fn offset_from_minutes(minutes: i32) -> anyhow::Result<FixedOffset> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| anyhow!("UTC offset of {minutes} minutes is out of range"))
}
