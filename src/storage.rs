use crate::error::{PollError, Result};
use crate::types::SupportFact;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Storage seam for the persisted support-fact store.
///
/// Seeding replaces the whole store; a later fact for the same
/// `(agency, date, party)` wins, matching the in-memory merge rule.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Replaces the store contents with the given facts. Returns the number
    /// of facts written.
    async fn replace_all_facts(&self, facts: &[SupportFact]) -> Result<usize>;

    /// Returns every persisted fact, ordered date descending then agency.
    async fn fetch_all_facts(&self) -> Result<Vec<SupportFact>>;
}

/// In-memory storage implementation for development/testing.
pub struct InMemoryStorage {
    facts: Mutex<Vec<SupportFact>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            facts: Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn replace_all_facts(&self, facts: &[SupportFact]) -> Result<usize> {
        let mut kept: Vec<SupportFact> = Vec::new();
        let mut index: HashMap<(String, NaiveDate, String), usize> = HashMap::new();
        for fact in facts {
            let key = (fact.agency.clone(), fact.date, fact.party_name.clone());
            match index.get(&key) {
                Some(&i) => kept[i] = fact.clone(),
                None => {
                    index.insert(key, kept.len());
                    kept.push(fact.clone());
                }
            }
        }
        let written = facts.len();
        debug!(
            "Replaced in-memory store with {} facts ({} written)",
            kept.len(),
            written
        );
        *self.facts.lock().unwrap() = kept;
        Ok(written)
    }

    async fn fetch_all_facts(&self) -> Result<Vec<SupportFact>> {
        let mut facts = self.facts.lock().unwrap().clone();
        facts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.agency.cmp(&b.agency)));
        Ok(facts)
    }
}

/// SQLite-backed storage over the two-table survey/support-fact schema.
///
/// The connection is owned by this handle for the scope of the run; there is
/// no process-global database state.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (creating if needed) the store at `path` and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening support-fact store at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!(
            "../migrations/001_create_surveys_and_support_facts.sql"
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn replace_all_facts(&self, facts: &[SupportFact]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM support_facts", [])?;
        tx.execute("DELETE FROM surveys", [])?;

        let mut kept = 0usize;
        {
            let mut insert_survey = tx.prepare(
                "INSERT INTO surveys (agency, survey_date) VALUES (?1, ?2)
                 ON CONFLICT(agency, survey_date) DO NOTHING",
            )?;
            let mut select_survey =
                tx.prepare("SELECT id FROM surveys WHERE agency = ?1 AND survey_date = ?2")?;
            // INSERT OR REPLACE keeps the last fact per (survey, party).
            let mut insert_fact = tx.prepare(
                "INSERT OR REPLACE INTO support_facts (survey_id, party_name, percentage)
                 VALUES (?1, ?2, ?3)",
            )?;

            for fact in facts {
                let date = fact.date.to_string();
                insert_survey.execute(params![fact.agency, date])?;
                let survey_id: i64 =
                    select_survey.query_row(params![fact.agency, date], |row| row.get(0))?;
                insert_fact.execute(params![survey_id, fact.party_name, fact.percentage])?;
                kept += 1;
            }
        }
        tx.commit()?;
        debug!("Seeded {} facts into the store", kept);
        Ok(kept)
    }

    async fn fetch_all_facts(&self) -> Result<Vec<SupportFact>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT s.agency, s.survey_date, f.party_name, f.percentage
             FROM surveys s
             JOIN support_facts f ON f.survey_id = s.id
             ORDER BY s.survey_date DESC, s.agency ASC, f.rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<f64>>(3)?,
            ))
        })?;

        let mut facts = Vec::new();
        for row in rows {
            let (agency, date_text, party_name, percentage) = row?;
            let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|e| {
                PollError::DateParse {
                    raw: date_text.clone(),
                    reason: format!("stored survey_date is not ISO-8601: {e}"),
                }
            })?;
            facts.push(SupportFact {
                agency,
                date,
                party_name,
                percentage,
            });
        }
        Ok(facts)
    }
}
