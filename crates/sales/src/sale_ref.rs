//! Human-readable sale references: `SALE-YYYYMMDD-NNNN`.

use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use gemledger_core::DomainError;

const PREFIX: &str = "SALE-";
const DATE_FORMAT: &str = "%Y%m%d";

/// Tenant-scoped sale reference.
///
/// The sequence is a per-tenant, per-business-day counter starting at 1,
/// zero-padded to four digits (it widens past 9999 rather than wrapping).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SaleRef {
    value: String,
    date: NaiveDate,
    sequence: u64,
}

impl SaleRef {
    pub fn new(date: NaiveDate, sequence: u64) -> Result<Self, DomainError> {
        if sequence == 0 {
            return Err(DomainError::validation("sale sequence starts at 1"));
        }
        Ok(Self {
            value: format!("{PREFIX}{}-{sequence:04}", date.format(DATE_FORMAT)),
            date,
            sequence,
        })
    }

    /// Counter name for a business day; the counter store scopes it per tenant.
    pub fn counter_key(date: NaiveDate) -> String {
        format!("saleRef-{}", date.format(DATE_FORMAT))
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl FromStr for SaleRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::invalid_id(format!("SaleRef: {s}"));

        let rest = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        let (date_part, seq_part) = rest.split_once('-').ok_or_else(invalid)?;
        if date_part.len() != 8 || seq_part.len() < 4 || !seq_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|_| invalid())?;
        let sequence: u64 = seq_part.parse().map_err(|_| invalid())?;

        let parsed = Self::new(date, sequence).map_err(|_| invalid())?;
        if parsed.value != s {
            // e.g. "SALE-20260101-00001": digits parse but the padding is not canonical.
            return Err(invalid());
        }
        Ok(parsed)
    }
}

impl TryFrom<String> for SaleRef {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SaleRef> for String {
    fn from(value: SaleRef) -> Self {
        value.value
    }
}

impl core::fmt::Display for SaleRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.value)
    }
}
