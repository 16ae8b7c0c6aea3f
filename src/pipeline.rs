use crate::constants::{AGENCY_COLUMN, DATE_COLUMN, PARTY_COLUMNS};
use crate::error::{PollError, Result};
use crate::parser::{canonical_party_name, normalize_survey_date, resolve_percentage};
use crate::types::{ChartPoint, RawPollRow, RunStats, SupportEntry, SupportFact};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// The two ordered projections consumers need: `table` is the canonical
/// listing (date descending, agency ascending), `chart` the chronological
/// flattening for time-series rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPolls {
    pub table: Vec<SupportEntry>,
    pub chart: Vec<ChartPoint>,
}

pub struct Pipeline;

impl Pipeline {
    /// Reads the source CSV into raw rows, resolving the tracked columns by
    /// canonicalized header name so quoted newlines in headers cannot split
    /// a party into two keys.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read_rows(path: impl AsRef<Path>) -> Result<Vec<RawPollRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;

        let headers = reader.headers()?.clone();
        let canonical_headers: Vec<String> =
            headers.iter().map(canonical_party_name).collect();
        let find_column = |name: &str| {
            let wanted = canonical_party_name(name);
            canonical_headers.iter().position(|h| *h == wanted)
        };

        let agency_idx = find_column(AGENCY_COLUMN)
            .ok_or_else(|| PollError::MissingField(AGENCY_COLUMN.to_string()))?;
        let date_idx = find_column(DATE_COLUMN)
            .ok_or_else(|| PollError::MissingField(DATE_COLUMN.to_string()))?;

        // Party columns absent from this file are carried as None cells so
        // downstream stays positional over the full catalog.
        let party_indices: Vec<Option<usize>> = PARTY_COLUMNS
            .iter()
            .map(|party| find_column(party.csv_name))
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let cells = PARTY_COLUMNS
                .iter()
                .zip(&party_indices)
                .map(|(party, idx)| {
                    let cell = idx
                        .and_then(|i| record.get(i))
                        .map(|s| s.to_string());
                    (party.display_name.to_string(), cell)
                })
                .collect();
            rows.push(RawPollRow {
                agency: record.get(agency_idx).unwrap_or_default().to_string(),
                raw_date: record.get(date_idx).unwrap_or_default().to_string(),
                cells,
            });
        }

        debug!("Read {} raw rows", rows.len());
        Ok(rows)
    }

    /// Normalizes raw rows into support facts. Rows with a missing agency,
    /// missing date or unparseable date are skipped and logged; they never
    /// abort the run.
    pub fn normalize_rows(rows: &[RawPollRow]) -> (Vec<SupportFact>, RunStats) {
        let mut facts = Vec::new();
        let mut stats = RunStats {
            total_rows: rows.len(),
            emitted_entries: 0,
            skipped_rows: 0,
            errors: Vec::new(),
        };

        for row in rows {
            if row.agency.trim().is_empty() || row.raw_date.trim().is_empty() {
                warn!(
                    agency = %row.agency,
                    raw_date = %row.raw_date,
                    "Skipping row with missing agency or date"
                );
                stats.skipped_rows += 1;
                stats
                    .errors
                    .push(format!("missing agency or date (agency: \"{}\", date: \"{}\")", row.agency, row.raw_date));
                continue;
            }

            let date = match normalize_survey_date(&row.raw_date) {
                Ok(date) => date,
                Err(e) => {
                    warn!(agency = %row.agency, raw_date = %row.raw_date, "Skipping row: {}", e);
                    stats.skipped_rows += 1;
                    stats.errors.push(format!("{} (agency: \"{}\")", e, row.agency));
                    continue;
                }
            };

            for (party_name, cell) in &row.cells {
                facts.push(SupportFact {
                    agency: row.agency.clone(),
                    date,
                    party_name: party_name.clone(),
                    percentage: resolve_percentage(party_name, cell.as_deref()),
                });
            }
        }

        (facts, stats)
    }

    /// Merges facts into one entry per `(agency, date)` key and produces
    /// both ordered projections. Later facts overwrite earlier ones for the
    /// same party under the same key; facts without a value never touch the
    /// support map (the party is omitted, not zeroed).
    pub fn aggregate_facts(facts: &[SupportFact]) -> NormalizedPolls {
        let mut keyed: HashMap<(String, NaiveDate), SupportEntry> = HashMap::new();

        for fact in facts {
            let entry = keyed
                .entry((fact.agency.clone(), fact.date))
                .or_insert_with(|| SupportEntry {
                    agency: fact.agency.clone(),
                    date: fact.date,
                    support: Default::default(),
                });
            if let Some(value) = fact.percentage {
                entry
                    .support
                    .insert(canonical_party_name(&fact.party_name), value);
            }
        }

        let mut table: Vec<SupportEntry> = keyed.into_values().collect();
        table.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.agency.cmp(&b.agency)));

        let mut chart: Vec<ChartPoint> = table.iter().map(ChartPoint::from).collect();
        chart.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.agency.cmp(&b.agency)));

        NormalizedPolls { table, chart }
    }

    /// Runs the full CSV path: read, normalize, aggregate. Returns the facts
    /// (for seeding the store), the ordered projections and the run stats.
    #[instrument(skip_all)]
    pub fn run_from_csv(
        path: impl AsRef<Path>,
    ) -> Result<(Vec<SupportFact>, NormalizedPolls, RunStats)> {
        let rows = Self::read_rows(path)?;
        let (facts, mut stats) = Self::normalize_rows(&rows);
        let polls = Self::aggregate_facts(&facts);
        stats.emitted_entries = polls.table.len();
        info!(
            "Normalized {} rows into {} entries ({} skipped)",
            stats.total_rows, stats.emitted_entries, stats.skipped_rows
        );
        Ok((facts, polls, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fact(agency: &str, d: NaiveDate, party: &str, pct: Option<f64>) -> SupportFact {
        SupportFact {
            agency: agency.to_string(),
            date: d,
            party_name: party.to_string(),
            percentage: pct,
        }
    }

    fn row(agency: &str, raw_date: &str, cells: &[(&str, &str)]) -> RawPollRow {
        RawPollRow {
            agency: agency.to_string(),
            raw_date: raw_date.to_string(),
            cells: cells
                .iter()
                .map(|(p, v)| (p.to_string(), Some(v.to_string())))
                .collect(),
        }
    }

    #[test]
    fn rows_sharing_a_key_merge_to_the_union() {
        let d = date(2025, 5, 18);
        let facts = vec![
            fact("리얼미터", d, "더불어민주당", Some(45.5)),
            fact("리얼미터", d, "국민의힘", Some(36.3)),
        ];
        let polls = Pipeline::aggregate_facts(&facts);
        assert_eq!(polls.table.len(), 1);
        let entry = &polls.table[0];
        assert_eq!(entry.support["더불어민주당"], 45.5);
        assert_eq!(entry.support["국민의힘"], 36.3);
    }

    #[test]
    fn later_facts_overwrite_earlier_ones_for_the_same_party() {
        let d = date(2025, 5, 18);
        let facts = vec![
            fact("리얼미터", d, "더불어민주당", Some(45.5)),
            fact("리얼미터", d, "더불어민주당", Some(46.1)),
        ];
        let polls = Pipeline::aggregate_facts(&facts);
        assert_eq!(polls.table[0].support["더불어민주당"], 46.1);
    }

    #[test]
    fn null_facts_create_the_entry_but_not_the_party_key() {
        let d = date(2025, 5, 18);
        let facts = vec![fact("리얼미터", d, "진보당", None)];
        let polls = Pipeline::aggregate_facts(&facts);
        assert_eq!(polls.table.len(), 1);
        assert!(polls.table[0].support.is_empty());
    }

    #[test]
    fn table_is_date_descending_and_chart_ascending() {
        let facts = vec![
            fact("리얼미터", date(2025, 5, 15), "국민의힘", Some(36.0)),
            fact("리얼미터", date(2025, 5, 22), "국민의힘", Some(37.0)),
        ];
        let polls = Pipeline::aggregate_facts(&facts);
        assert_eq!(polls.table[0].date, date(2025, 5, 22));
        assert_eq!(polls.table[1].date, date(2025, 5, 15));
        assert_eq!(polls.chart[0].date, date(2025, 5, 15));
        assert_eq!(polls.chart[1].date, date(2025, 5, 22));
    }

    #[test]
    fn agency_breaks_date_ties_ascending_in_both_orders() {
        let d = date(2025, 5, 18);
        let facts = vec![
            fact("한국갤럽", d, "국민의힘", Some(35.0)),
            fact("리얼미터", d, "국민의힘", Some(36.0)),
        ];
        let polls = Pipeline::aggregate_facts(&facts);
        assert_eq!(polls.table[0].agency, "리얼미터");
        assert_eq!(polls.chart[0].agency, "리얼미터");
    }

    #[test]
    fn bad_date_rows_are_skipped_without_blocking_good_ones() {
        let rows = vec![
            row("리얼미터", "25.05", &[("국민의힘", "36.3")]),
            row("한국갤럽", "25.05.16.~18.", &[("국민의힘", "35.0")]),
        ];
        let (facts, stats) = Pipeline::normalize_rows(&rows);
        assert_eq!(stats.skipped_rows, 1);
        assert_eq!(stats.errors.len(), 1);
        assert!(facts.iter().all(|f| f.agency == "한국갤럽"));
        assert_eq!(facts[0].date, date(2025, 5, 18));
    }

    #[test]
    fn missing_agency_rows_are_skipped() {
        let rows = vec![row("", "25.05.16.", &[("국민의힘", "36.3")])];
        let (facts, stats) = Pipeline::normalize_rows(&rows);
        assert!(facts.is_empty());
        assert_eq!(stats.skipped_rows, 1);
    }

    #[test]
    fn empty_and_garbage_cells_become_null_facts() {
        let d_rows = vec![RawPollRow {
            agency: "리얼미터".to_string(),
            raw_date: "25.05.16.".to_string(),
            cells: vec![
                ("국민의힘".to_string(), Some("48.1%".to_string())),
                ("진보당".to_string(), Some("".to_string())),
                ("기타정당".to_string(), Some("abc".to_string())),
                ("개혁신당".to_string(), None),
            ],
        }];
        let (facts, _) = Pipeline::normalize_rows(&d_rows);
        assert_eq!(facts.len(), 4);
        assert_eq!(facts[0].percentage, Some(48.1));
        assert_eq!(facts[1].percentage, None);
        assert_eq!(facts[2].percentage, None);
        assert_eq!(facts[3].percentage, None);
    }
}
