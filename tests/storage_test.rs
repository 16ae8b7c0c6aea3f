use anyhow::Result;
use chrono::NaiveDate;
use polltrack::pipeline::Pipeline;
use polltrack::storage::{InMemoryStorage, SqliteStorage, Storage};
use polltrack::types::SupportFact;
use tempfile::tempdir;

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

fn sample_facts() -> Vec<SupportFact> {
    vec![
        fact("리얼미터", date(2025, 5, 16), "더불어민주당", Some(45.5)),
        fact("리얼미터", date(2025, 5, 16), "국민의힘", Some(36.3)),
        // Asked but not reported: persisted as NULL, absent from output maps.
        fact("리얼미터", date(2025, 5, 16), "진보당", None),
        fact("한국갤럽", date(2025, 5, 15), "더불어민주당", Some(44.0)),
    ]
}

#[tokio::test]
async fn seed_then_fetch_reproduces_the_csv_aggregation() -> Result<()> {
    let temp_dir = tempdir()?;
    let storage = SqliteStorage::open(temp_dir.path().join("polltrack.db"))?;

    let facts = sample_facts();
    let written = storage.replace_all_facts(&facts).await?;
    assert_eq!(written, facts.len());

    let fetched = storage.fetch_all_facts().await?;
    assert_eq!(fetched.len(), facts.len());

    // The NULL fact survives the store round trip...
    let null_fact = fetched
        .iter()
        .find(|f| f.party_name == "진보당")
        .expect("null fact should be persisted");
    assert_eq!(null_fact.percentage, None);

    // ...but both variants aggregate to the same output, with the party
    // omitted from the support map.
    let direct = Pipeline::aggregate_facts(&facts);
    let via_store = Pipeline::aggregate_facts(&fetched);
    assert_eq!(direct, via_store);
    assert_eq!(direct.table[0].agency, "리얼미터");
    assert!(!direct.table[0].support.contains_key("진보당"));
    Ok(())
}

#[tokio::test]
async fn fetch_orders_date_descending_then_agency() -> Result<()> {
    let temp_dir = tempdir()?;
    let storage = SqliteStorage::open(temp_dir.path().join("polltrack.db"))?;
    storage.replace_all_facts(&sample_facts()).await?;

    let fetched = storage.fetch_all_facts().await?;
    assert_eq!(fetched.first().unwrap().date, date(2025, 5, 16));
    assert_eq!(fetched.last().unwrap().date, date(2025, 5, 15));
    Ok(())
}

#[tokio::test]
async fn reseeding_replaces_prior_contents() -> Result<()> {
    let temp_dir = tempdir()?;
    let storage = SqliteStorage::open(temp_dir.path().join("polltrack.db"))?;

    storage.replace_all_facts(&sample_facts()).await?;
    let only = vec![fact("엠브레인", date(2025, 6, 1), "국민의힘", Some(34.0))];
    storage.replace_all_facts(&only).await?;

    let fetched = storage.fetch_all_facts().await?;
    assert_eq!(fetched, only);
    Ok(())
}

#[tokio::test]
async fn later_facts_win_for_the_same_key_in_the_store() -> Result<()> {
    let temp_dir = tempdir()?;
    let storage = SqliteStorage::open(temp_dir.path().join("polltrack.db"))?;

    let d = date(2025, 5, 16);
    let facts = vec![
        fact("리얼미터", d, "국민의힘", Some(36.3)),
        fact("리얼미터", d, "국민의힘", Some(37.0)),
    ];
    storage.replace_all_facts(&facts).await?;

    let fetched = storage.fetch_all_facts().await?;
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].percentage, Some(37.0));
    Ok(())
}

#[tokio::test]
async fn in_memory_storage_matches_sqlite_semantics() -> Result<()> {
    let temp_dir = tempdir()?;
    let sqlite = SqliteStorage::open(temp_dir.path().join("polltrack.db"))?;
    let memory = InMemoryStorage::new();

    let d = date(2025, 5, 16);
    let facts = vec![
        fact("리얼미터", d, "국민의힘", Some(36.3)),
        fact("리얼미터", d, "국민의힘", None),
        fact("한국갤럽", date(2025, 5, 15), "국민의힘", Some(35.0)),
    ];
    sqlite.replace_all_facts(&facts).await?;
    memory.replace_all_facts(&facts).await?;

    let from_sqlite = sqlite.fetch_all_facts().await?;
    let from_memory = memory.fetch_all_facts().await?;
    assert_eq!(from_sqlite, from_memory);

    // The later NULL replaced the earlier value in both stores.
    assert_eq!(from_sqlite[0].percentage, None);
    Ok(())
}
