//! Common utilities and helper functions

pub mod retry;

use chrono::{Local, NaiveDate};

/// Reference date for "future" workload: the given day or today
pub fn reference_date(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Local::now().date_naive())
}
