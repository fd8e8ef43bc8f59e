use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::N_BACK_RANGE;
use crate::error::Result;
use crate::scoring::ScoreRecord;

/// Most recent scores kept per level and modality
pub const MAX_HISTORY_SIZE: usize = 15;

/// Chronological scores for one n-back level. Both vectors are index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelHistory {
    pub visual: Vec<ScoreRecord>,
    pub audio: Vec<ScoreRecord>,
}

impl LevelHistory {
    pub fn len(&self) -> usize {
        self.visual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visual.is_empty() && self.audio.is_empty()
    }

    pub fn visual_mean(&self) -> Option<f64> {
        mean_percent(&self.visual)
    }

    pub fn audio_mean(&self) -> Option<f64> {
        mean_percent(&self.audio)
    }
}

fn mean_percent(scores: &[ScoreRecord]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: u32 = scores.iter().map(|s| s.percent() as u32).sum();
    Some(sum as f64 / scores.len() as f64)
}

/// Bounded score history for every level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTable {
    levels: BTreeMap<usize, LevelHistory>,
    max_size: usize,
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::with_max_size(MAX_HISTORY_SIZE)
    }
}

impl HistoryTable {
    /// Empty table with an entry for each selectable level
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            levels: N_BACK_RANGE
                .map(|n| (n, LevelHistory::default()))
                .collect(),
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn level(&self, n_back: usize) -> Option<&LevelHistory> {
        self.levels.get(&n_back)
    }

    pub fn levels(&self) -> impl Iterator<Item = (usize, &LevelHistory)> {
        self.levels.iter().map(|(n, h)| (*n, h))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.values().all(LevelHistory::is_empty)
    }

    /// Appends one session's scores. When either side overflows, both are cut back
    /// to the most recent `max_size` entries so they stay aligned.
    pub fn record_score(&mut self, n_back: usize, visual: ScoreRecord, audio: ScoreRecord) {
        let max_size = self.max_size;
        let entry = self.levels.entry(n_back).or_default();
        entry.visual.push(visual);
        entry.audio.push(audio);

        if entry.visual.len() > max_size || entry.audio.len() > max_size {
            trim_front(&mut entry.visual, max_size);
            trim_front(&mut entry.audio, max_size);
        }
    }
}

fn trim_front(scores: &mut Vec<ScoreRecord>, max_size: usize) {
    let excess = scores.len().saturating_sub(max_size);
    scores.drain(..excess);
}

/// Persistence collaborator for the history table
pub trait HistoryStore {
    /// Returns an empty table when nothing has been stored yet
    fn load(&self) -> Result<HistoryTable>;
    fn save(&mut self, history: &HistoryTable) -> Result<()>;
}

/// Keeps the table in process memory only
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    table: Option<HistoryTable>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: HistoryTable) -> Self {
        Self { table: Some(table) }
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<HistoryTable> {
        Ok(self.table.clone().unwrap_or_default())
    }

    fn save(&mut self, history: &HistoryTable) -> Result<()> {
        self.table = Some(history.clone());
        Ok(())
    }
}

/// SQLite-backed store. One row per recorded session and level.
#[derive(Debug)]
pub struct SqliteHistoryStore {
    conn: Connection,
    max_size: usize,
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `path`, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open the database at the default state location
    pub fn open_default() -> Result<Self> {
        let path = crate::app_dirs::AppDirs::db_path()
            .unwrap_or_else(|| PathBuf::from("nback_history.db"));
        Self::open(path)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS level_scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                n_back INTEGER NOT NULL,
                position INTEGER NOT NULL,
                visual INTEGER NOT NULL,
                audio INTEGER NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_level_scores_level ON level_scores(n_back, position)",
            [],
        )?;

        Ok(SqliteHistoryStore {
            conn,
            max_size: MAX_HISTORY_SIZE,
        })
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn load(&self) -> Result<HistoryTable> {
        let mut stmt = self.conn.prepare(
            "SELECT n_back, visual, audio FROM level_scores ORDER BY n_back, position",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut table = HistoryTable::with_max_size(self.max_size);
        for row in rows {
            let (n_back, visual, audio) = row?;
            table.record_score(
                n_back.max(0) as usize,
                ScoreRecord::new(visual.clamp(0, 100) as u8),
                ScoreRecord::new(audio.clamp(0, 100) as u8),
            );
        }

        Ok(table)
    }

    fn save(&mut self, history: &HistoryTable) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM level_scores", [])?;

        for (n_back, level) in history.levels() {
            for (position, (visual, audio)) in level.visual.iter().zip(&level.audio).enumerate() {
                tx.execute(
                    "INSERT INTO level_scores (n_back, position, visual, audio) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        n_back as i64,
                        position as i64,
                        visual.percent(),
                        audio.percent()
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct CsvRow {
    n_back: usize,
    session: usize,
    visual: u8,
    audio: u8,
}

/// Write one CSV row per recorded session, oldest first within each level
pub fn export_csv<W: Write>(history: &HistoryTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for (n_back, level) in history.levels() {
        for (session, (visual, audio)) in level.visual.iter().zip(&level.audio).enumerate() {
            wtr.serialize(CsvRow {
                n_back,
                session: session + 1,
                visual: visual.percent(),
                audio: audio.percent(),
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(p: u8) -> ScoreRecord {
        ScoreRecord::new(p)
    }

    #[test]
    fn test_default_table_has_every_level() {
        let table = HistoryTable::default();
        let levels: Vec<usize> = table.levels().map(|(n, _)| n).collect();
        assert_eq!(levels, (2..=10).collect::<Vec<_>>());
        assert!(table.is_empty());
        assert_eq!(table.max_size(), MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_record_appends_in_order() {
        let mut table = HistoryTable::default();
        table.record_score(3, s(50), s(60));
        table.record_score(3, s(70), s(80));

        let level = table.level(3).unwrap();
        assert_eq!(level.visual, vec![s(50), s(70)]);
        assert_eq!(level.audio, vec![s(60), s(80)]);
        assert!(table.level(2).unwrap().is_empty());
        assert!(!table.is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut table = HistoryTable::default();
        let total = MAX_HISTORY_SIZE + 7;
        for i in 0..total {
            table.record_score(2, s(i as u8), s((i + 50) as u8));
        }

        let level = table.level(2).unwrap();
        assert_eq!(level.visual.len(), MAX_HISTORY_SIZE);
        assert_eq!(level.audio.len(), MAX_HISTORY_SIZE);
        let expected: Vec<ScoreRecord> = (7..total).map(|i| s(i as u8)).collect();
        assert_eq!(level.visual, expected);
        assert_eq!(level.audio[0], s(57));
    }

    #[test]
    fn test_trim_keeps_modalities_aligned() {
        let mut table = HistoryTable::with_max_size(3);
        table.levels.insert(
            4,
            LevelHistory {
                visual: vec![s(1), s(2), s(3)],
                audio: vec![s(10), s(20)],
            },
        );
        table.record_score(4, s(4), s(30));

        let level = table.level(4).unwrap();
        assert_eq!(level.visual, vec![s(2), s(3), s(4)]);
        assert_eq!(level.audio, vec![s(10), s(20), s(30)]);
    }

    #[test]
    fn test_level_means() {
        let mut table = HistoryTable::default();
        table.record_score(5, s(40), s(90));
        table.record_score(5, s(60), s(70));
        let level = table.level(5).unwrap();
        assert_eq!(level.visual_mean(), Some(50.0));
        assert_eq!(level.audio_mean(), Some(80.0));
        assert_eq!(table.level(6).unwrap().visual_mean(), None);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryHistoryStore::new();
        assert_eq!(store.load().unwrap(), HistoryTable::default());

        let mut table = HistoryTable::default();
        table.record_score(2, s(85), s(90));
        store.save(&table).unwrap();
        assert_eq!(store.load().unwrap(), table);
    }

    #[test]
    fn test_sqlite_store_roundtrip() {
        let mut store = SqliteHistoryStore::open_in_memory().unwrap();
        assert!(store.load().unwrap().is_empty());

        let mut table = HistoryTable::default();
        table.record_score(2, s(85), s(90));
        table.record_score(2, s(95), s(75));
        table.record_score(7, s(40), s(45));
        store.save(&table).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_sqlite_save_replaces_previous_contents() {
        let mut store = SqliteHistoryStore::open_in_memory().unwrap();
        let mut table = HistoryTable::default();
        for i in 0..(MAX_HISTORY_SIZE + 3) {
            table.record_score(3, s(i as u8), s(i as u8));
            store.save(&table).unwrap();
        }

        let loaded = store.load().unwrap();
        assert_eq!(loaded.level(3).unwrap().len(), MAX_HISTORY_SIZE);
        assert_eq!(loaded.level(3).unwrap().visual[0], s(3));
    }

    #[test]
    fn test_export_csv() {
        let mut table = HistoryTable::default();
        table.record_score(2, s(85), s(90));
        table.record_score(4, s(55), s(60));

        let mut out = Vec::new();
        export_csv(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "n_back,session,visual,audio\n2,1,85,90\n4,1,55,60\n"
        );
    }
}
