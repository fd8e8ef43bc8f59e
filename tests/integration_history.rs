use nback::history::{export_csv, HistoryStore, HistoryTable, SqliteHistoryStore, MAX_HISTORY_SIZE};
use nback::scoring::ScoreRecord;
use tempfile::tempdir;

/// Integration tests for score persistence across store instances
/// and the CSV export written by `nback --export-csv`.

fn record(table: &mut HistoryTable, n_back: usize, visual: u8, audio: u8) {
    table.record_score(n_back, ScoreRecord::new(visual), ScoreRecord::new(audio));
}

#[test]
fn history_survives_reopening_the_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("history.db");

    {
        let mut store = SqliteHistoryStore::open(&path).unwrap();
        let mut table = store.load().unwrap();
        record(&mut table, 2, 85, 90);
        record(&mut table, 2, 95, 70);
        record(&mut table, 5, 40, 45);
        store.save(&table).unwrap();
    }

    let store = SqliteHistoryStore::open(&path).unwrap();
    let table = store.load().unwrap();

    let two = table.level(2).unwrap();
    assert_eq!(two.visual, vec![ScoreRecord::new(85), ScoreRecord::new(95)]);
    assert_eq!(two.audio, vec![ScoreRecord::new(90), ScoreRecord::new(70)]);
    assert_eq!(table.level(5).unwrap().len(), 1);
    assert!(table.level(3).unwrap().is_empty());
}

#[test]
fn sixteenth_session_evicts_the_oldest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("history.db");

    let mut store = SqliteHistoryStore::open(&path).unwrap();
    let mut table = store.load().unwrap();
    for i in 0..=MAX_HISTORY_SIZE as u8 {
        record(&mut table, 3, i, 100 - i);
        store.save(&table).unwrap();
    }
    drop(store);

    let table = SqliteHistoryStore::open(&path).unwrap().load().unwrap();
    let three = table.level(3).unwrap();
    assert_eq!(three.len(), MAX_HISTORY_SIZE);
    assert_eq!(three.visual.first(), Some(&ScoreRecord::new(1)));
    assert_eq!(three.audio.first(), Some(&ScoreRecord::new(99)));
    assert_eq!(
        three.visual.last(),
        Some(&ScoreRecord::new(MAX_HISTORY_SIZE as u8))
    );
}

#[test]
fn csv_export_lists_every_session() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("scores.csv");

    let mut table = HistoryTable::default();
    record(&mut table, 2, 85, 90);
    record(&mut table, 2, 100, 75);
    record(&mut table, 4, 60, 65);

    export_csv(&table, std::fs::File::create(&csv_path).unwrap()).unwrap();

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["n_back", "session", "visual", "audio"]
    );

    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    assert_eq!(
        rows,
        vec![
            vec!["2", "1", "85", "90"],
            vec!["2", "2", "100", "75"],
            vec!["4", "1", "60", "65"],
        ]
    );
}
