use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::stimulus::{default_audio_keys, AudioKey, Grid};

pub const N_BACK_RANGE: RangeInclusive<usize> = 2..=10;
pub const ATTEMPT_COUNT_RANGE: RangeInclusive<usize> = 20..=40;

pub const DEFAULT_N_BACK: usize = 2;
pub const DEFAULT_ATTEMPT_COUNT: usize = 20;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 4000;
/// Grace period before the next stimulus during which a missed window is auto-filled
pub const DEFAULT_AUTO_FILL_LEAD_MS: u64 = 200;
pub const DEFAULT_REPEAT_PROBABILITY: f64 = 0.20;

/// Parameters of one session. Fixed from arm time until the session ends.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelConfig {
    pub n_back: usize,
    pub attempt_count: usize,
    pub repeat_probability: f64,
    pub tick_interval_ms: u64,
    pub auto_fill_lead_ms: u64,
    pub grid: Grid,
    pub audio_keys: Vec<AudioKey>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            n_back: DEFAULT_N_BACK,
            attempt_count: DEFAULT_ATTEMPT_COUNT,
            repeat_probability: DEFAULT_REPEAT_PROBABILITY,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            auto_fill_lead_ms: DEFAULT_AUTO_FILL_LEAD_MS,
            grid: Grid::default(),
            audio_keys: default_audio_keys(),
        }
    }
}

impl LevelConfig {
    /// Number of stimuli shown per session: the scored attempts plus the unscoreable lead-in
    pub fn sequence_len(&self) -> usize {
        self.attempt_count + self.n_back
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Offset from a tick to its auto-fill deadline
    pub fn auto_fill_delay(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.saturating_sub(self.auto_fill_lead_ms))
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_back < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "n-back must be at least 2, got {}",
                self.n_back
            )));
        }
        if self.attempt_count < self.n_back {
            return Err(EngineError::InvalidConfig(format!(
                "attempt count {} is smaller than n-back {}",
                self.attempt_count, self.n_back
            )));
        }
        if !(0.0..1.0).contains(&self.repeat_probability) {
            return Err(EngineError::InvalidConfig(format!(
                "repeat probability must be in [0, 1), got {}",
                self.repeat_probability
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "tick interval must be positive".to_string(),
            ));
        }
        if self.auto_fill_lead_ms >= self.tick_interval_ms {
            return Err(EngineError::InvalidConfig(format!(
                "auto-fill lead {}ms must be shorter than the tick interval {}ms",
                self.auto_fill_lead_ms, self.tick_interval_ms
            )));
        }
        if self.grid.size < 3 || self.grid.size % 2 == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "grid size must be odd and at least 3, got {}",
                self.grid.size
            )));
        }
        if self.audio_keys.is_empty() {
            return Err(EngineError::InvalidConfig(
                "audio key set is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// User-facing settings, persisted between runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    n_back: usize,
    attempt_count: usize,
    immediate_feedback: bool,
    tick_interval_ms: u64,
    auto_fill_lead_ms: u64,
    repeat_probability: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            n_back: DEFAULT_N_BACK,
            attempt_count: DEFAULT_ATTEMPT_COUNT,
            immediate_feedback: true,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            auto_fill_lead_ms: DEFAULT_AUTO_FILL_LEAD_MS,
            repeat_probability: DEFAULT_REPEAT_PROBABILITY,
        }
    }
}

impl Config {
    pub fn n_back(&self) -> usize {
        self.n_back
    }

    /// Returns false and leaves the value untouched when outside 2..=10
    pub fn set_n_back(&mut self, n_back: usize) -> bool {
        if !N_BACK_RANGE.contains(&n_back) {
            return false;
        }
        self.n_back = n_back;
        true
    }

    pub fn attempt_count(&self) -> usize {
        self.attempt_count
    }

    /// Returns false and leaves the value untouched when outside 20..=40
    pub fn set_attempt_count(&mut self, attempt_count: usize) -> bool {
        if !ATTEMPT_COUNT_RANGE.contains(&attempt_count) {
            return false;
        }
        self.attempt_count = attempt_count;
        true
    }

    pub fn immediate_feedback(&self) -> bool {
        self.immediate_feedback
    }

    pub fn set_immediate_feedback(&mut self, enabled: bool) {
        self.immediate_feedback = enabled;
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Returns false and leaves the value untouched unless it exceeds the auto-fill lead
    pub fn set_tick_interval_ms(&mut self, ms: u64) -> bool {
        if ms == 0 || ms <= self.auto_fill_lead_ms {
            return false;
        }
        self.tick_interval_ms = ms;
        true
    }

    pub fn auto_fill_lead_ms(&self) -> u64 {
        self.auto_fill_lead_ms
    }

    /// Returns false and leaves the value untouched unless it is shorter than the tick interval
    pub fn set_auto_fill_lead_ms(&mut self, ms: u64) -> bool {
        if ms >= self.tick_interval_ms {
            return false;
        }
        self.auto_fill_lead_ms = ms;
        true
    }

    pub fn repeat_probability(&self) -> f64 {
        self.repeat_probability
    }

    /// Returns false and leaves the value untouched when outside [0, 1)
    pub fn set_repeat_probability(&mut self, p: f64) -> bool {
        if !(0.0..1.0).contains(&p) {
            return false;
        }
        self.repeat_probability = p;
        true
    }

    /// Snapshot of the level parameters for the next session
    pub fn level(&self) -> LevelConfig {
        LevelConfig {
            n_back: self.n_back,
            attempt_count: self.attempt_count,
            repeat_probability: self.repeat_probability,
            tick_interval_ms: self.tick_interval_ms,
            auto_fill_lead_ms: self.auto_fill_lead_ms,
            ..LevelConfig::default()
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "nback") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("nback_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable config"),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let mut cfg = Config::default();
        assert!(cfg.set_n_back(4));
        assert!(cfg.set_attempt_count(30));
        cfg.set_immediate_feedback(false);
        assert!(cfg.set_tick_interval_ms(2500));
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn timing_setters_reject_inconsistent_values() {
        let mut cfg = Config::default();
        assert!(!cfg.set_auto_fill_lead_ms(4000));
        assert!(!cfg.set_tick_interval_ms(200));
        assert!(!cfg.set_tick_interval_ms(0));
        assert_eq!(cfg.tick_interval_ms(), DEFAULT_TICK_INTERVAL_MS);
        assert_eq!(cfg.auto_fill_lead_ms(), DEFAULT_AUTO_FILL_LEAD_MS);

        assert!(cfg.set_auto_fill_lead_ms(1));
        assert!(cfg.set_tick_interval_ms(5));
        assert!(!cfg.set_auto_fill_lead_ms(5));

        assert!(!cfg.set_repeat_probability(1.0));
        assert!(!cfg.set_repeat_probability(-0.1));
        assert!(!cfg.set_repeat_probability(f64::NAN));
        assert_eq!(cfg.repeat_probability(), DEFAULT_REPEAT_PROBABILITY);
        assert!(cfg.set_repeat_probability(0.0));

        assert!(cfg.level().validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "n_back": 5 }"#).unwrap();
        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.n_back(), 5);
        assert_eq!(loaded.attempt_count(), DEFAULT_ATTEMPT_COUNT);
        assert!(loaded.immediate_feedback());
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn setters_reject_out_of_range_values() {
        let mut cfg = Config::default();
        assert!(!cfg.set_n_back(1));
        assert!(!cfg.set_n_back(11));
        assert_eq!(cfg.n_back(), DEFAULT_N_BACK);
        assert!(cfg.set_n_back(10));
        assert_eq!(cfg.n_back(), 10);

        assert!(!cfg.set_attempt_count(19));
        assert!(!cfg.set_attempt_count(41));
        assert!(cfg.set_attempt_count(40));
        assert_eq!(cfg.attempt_count(), 40);
    }

    #[test]
    fn level_snapshot_carries_settings() {
        let mut cfg = Config::default();
        cfg.set_n_back(3);
        cfg.set_attempt_count(25);
        let level = cfg.level();
        assert_eq!(level.n_back, 3);
        assert_eq!(level.attempt_count, 25);
        assert_eq!(level.sequence_len(), 28);
        assert_eq!(level.auto_fill_delay(), Duration::from_millis(3800));
        assert!(level.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unscoreable_levels() {
        let level = LevelConfig {
            n_back: 1,
            ..LevelConfig::default()
        };
        assert_matches!(level.validate(), Err(EngineError::InvalidConfig(_)));

        let level = LevelConfig {
            n_back: 5,
            attempt_count: 4,
            ..LevelConfig::default()
        };
        assert_matches!(level.validate(), Err(EngineError::InvalidConfig(_)));
    }

    #[test]
    fn validate_rejects_bad_timing_and_alphabets() {
        let level = LevelConfig {
            auto_fill_lead_ms: 4000,
            ..LevelConfig::default()
        };
        assert_matches!(level.validate(), Err(EngineError::InvalidConfig(_)));

        let level = LevelConfig {
            repeat_probability: 1.0,
            ..LevelConfig::default()
        };
        assert_matches!(level.validate(), Err(EngineError::InvalidConfig(_)));

        let level = LevelConfig {
            grid: Grid::new(4),
            ..LevelConfig::default()
        };
        assert_matches!(level.validate(), Err(EngineError::InvalidConfig(_)));

        let level = LevelConfig {
            audio_keys: vec![],
            ..LevelConfig::default()
        };
        assert_matches!(level.validate(), Err(EngineError::InvalidConfig(_)));
    }
}
