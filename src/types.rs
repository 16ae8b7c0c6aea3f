use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One raw row lifted out of the source CSV, before any normalization.
///
/// `cells` holds the tracked party columns in catalog order, paired with the
/// raw text found in each (absent columns are `None`).
#[derive(Debug, Clone)]
pub struct RawPollRow {
    pub agency: String,
    pub raw_date: String,
    pub cells: Vec<(String, Option<String>)>,
}

/// A single `(agency, date, party)` observation.
///
/// `percentage` is `None` when the source cell was empty or unparseable:
/// the survey asked about the party but reported nothing usable. The store
/// persists these as SQL `NULL`; aggregation drops them from the output maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportFact {
    pub agency: String,
    pub date: NaiveDate,
    pub party_name: String,
    pub percentage: Option<f64>,
}

/// Normalized per-(agency, date) record mapping party display names to
/// support percentages. Parties without a reported value are absent from the
/// map, never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportEntry {
    pub agency: String,
    pub date: NaiveDate,
    pub support: BTreeMap<String, f64>,
}

/// Chart-oriented projection of a [`SupportEntry`]: the per-party values are
/// flattened to top-level fields so each party becomes its own series, and
/// `agency` rides along so tooltips can disambiguate overlapping points from
/// different agencies on the same date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub agency: String,
    #[serde(flatten)]
    pub support: BTreeMap<String, f64>,
}

impl From<&SupportEntry> for ChartPoint {
    fn from(entry: &SupportEntry) -> Self {
        Self {
            date: entry.date,
            agency: entry.agency.clone(),
            support: entry.support.clone(),
        }
    }
}

/// Result of a complete normalizer run.
#[derive(Debug, Serialize)]
pub struct RunStats {
    pub total_rows: usize,
    pub emitted_entries: usize,
    pub skipped_rows: usize,
    pub errors: Vec<String>,
}
