//! Persist records and generated daily challenges to disk (XDG config or ~/.config/grainfall).

use chrono::{DateTime, Utc};
use grainfall::challenge::{ChallengeCache, ChallengeRecord, RunResult};
use grainfall::DailyChallenge;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const RECORDS_FILE: &str = "records.json";
const CHALLENGES_FILE: &str = "challenges.json";

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Config dir / grainfall.
pub fn config_dir() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("grainfall")
}

fn read_json<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> Result<T, RecordsError> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RecordsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

/// Best endless score plus one record per daily challenge key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBook {
    #[serde(default)]
    pub best_endless: u64,
    #[serde(default)]
    pub daily: BTreeMap<String, ChallengeRecord>,
}

#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    book: RecordBook,
}

impl RecordStore {
    /// Load from `dir`; a missing or unreadable file starts an empty book.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(RECORDS_FILE);
        let book = read_json(&path).unwrap_or_else(|e| {
            log::warn!("ignoring records at {}: {e}", path.display());
            RecordBook::default()
        });
        Self { path, book }
    }

    pub fn book(&self) -> &RecordBook {
        &self.book
    }

    pub fn daily(&self, key: &str) -> Option<&ChallengeRecord> {
        self.book.daily.get(key)
    }

    pub fn save(&self) -> Result<(), RecordsError> {
        write_json(&self.path, &self.book)
    }

    /// Returns true for a new best.
    pub fn submit_endless(&mut self, score: u64) -> bool {
        if score > self.book.best_endless {
            self.book.best_endless = score;
            return true;
        }
        false
    }

    pub fn start_daily(&mut self, key: &str) {
        self.book
            .daily
            .entry(key.to_string())
            .or_default()
            .record_attempt();
    }

    pub fn complete_daily(&mut self, key: &str, run: RunResult, at: DateTime<Utc>) -> bool {
        self.book
            .daily
            .entry(key.to_string())
            .or_default()
            .record_completion(run, at)
    }
}

/// Daily descriptors kept in one JSON map keyed like `2025-01-04#1`.
#[derive(Debug)]
pub struct FileChallengeCache {
    path: PathBuf,
}

impl FileChallengeCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(CHALLENGES_FILE),
        }
    }

    fn entries(&self) -> BTreeMap<String, DailyChallenge> {
        read_json(&self.path).unwrap_or_else(|e| {
            log::warn!("ignoring challenge cache at {}: {e}", self.path.display());
            BTreeMap::new()
        })
    }

    fn write(&self, entries: &BTreeMap<String, DailyChallenge>) {
        if let Err(e) = write_json(&self.path, entries) {
            log::warn!("could not write challenge cache {}: {e}", self.path.display());
        }
    }
}

impl ChallengeCache for FileChallengeCache {
    fn load(&self, key: &str) -> Option<DailyChallenge> {
        self.entries().remove(key)
    }

    fn store(&mut self, key: &str, challenge: &DailyChallenge) {
        let mut entries = self.entries();
        entries.insert(key.to_string(), challenge.clone());
        self.write(&entries);
    }

    fn remove(&mut self, key: &str) {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.write(&entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grainfall::{BoardConfig, ChallengeManager, Tier};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("grainfall-test-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_records_round_trip_through_disk() {
        let dir = scratch_dir("records");
        let mut store = RecordStore::open(&dir);
        assert!(store.submit_endless(120));
        assert!(!store.submit_endless(80));
        store.start_daily("2025-01-04#1");
        let run = RunResult {
            time_secs: 50,
            steps: 5,
            score: 90,
            stars: 3,
        };
        assert!(store.complete_daily("2025-01-04#1", run, Utc::now()));
        store.save().unwrap();

        let reopened = RecordStore::open(&dir);
        assert_eq!(reopened.book(), store.book());
        let rec = reopened.daily("2025-01-04#1").unwrap();
        assert_eq!(rec.attempts, 1);
        assert_eq!(rec.best_stars, 3);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_records_start_empty() {
        let dir = scratch_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(RECORDS_FILE), b"{ not json").unwrap();
        assert_eq!(RecordStore::open(&dir).book(), &RecordBook::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_cache_serves_manager() {
        let dir = scratch_dir("cache");
        let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        let first = {
            let mut m =
                ChallengeManager::new(FileChallengeCache::new(&dir), BoardConfig::default());
            m.challenge_for(date, Tier::Normal)
        };
        let cache = FileChallengeCache::new(&dir);
        assert_eq!(cache.load("2025-01-04#2").as_ref(), Some(&first));

        let mut m = ChallengeManager::new(cache, BoardConfig::default());
        m.invalidate(date, Tier::Normal);
        assert!(FileChallengeCache::new(&dir).load("2025-01-04#2").is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
