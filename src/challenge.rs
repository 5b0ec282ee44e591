//! Daily challenges: a per-date, per-tier descriptor kept stable through an injected cache,
//! plus the player's record for each one.

use crate::color::PixelColor;
use crate::grid::BoardConfig;
use crate::level::{DailyChallenge, LevelGenerator, Tier, seed_for_date};
use crate::piece::PieceSource;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage for generated descriptors, owned by whoever hosts the core.
pub trait ChallengeCache {
    fn load(&self, key: &str) -> Option<DailyChallenge>;
    fn store(&mut self, key: &str, challenge: &DailyChallenge);
    fn remove(&mut self, key: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryChallengeCache {
    entries: HashMap<String, DailyChallenge>,
}

impl MemoryChallengeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ChallengeCache for MemoryChallengeCache {
    fn load(&self, key: &str) -> Option<DailyChallenge> {
        self.entries.get(key).cloned()
    }

    fn store(&mut self, key: &str, challenge: &DailyChallenge) {
        self.entries.insert(key.to_string(), challenge.clone());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// `YYYY-MM-DD#tier`
pub fn cache_key(date: NaiveDate, tier: Tier) -> String {
    format!("{}#{}", date.format("%Y-%m-%d"), tier.number())
}

pub struct ChallengeManager<C: ChallengeCache> {
    cache: C,
    generator: LevelGenerator,
}

impl<C: ChallengeCache> ChallengeManager<C> {
    pub fn new(cache: C, board: BoardConfig) -> Self {
        Self {
            cache,
            generator: LevelGenerator::new(board),
        }
    }

    /// The descriptor for `date`/`tier`. A cached copy is reused only if its checksum still
    /// matches its layout and it was generated for the same board.
    pub fn challenge_for(&mut self, date: NaiveDate, tier: Tier) -> DailyChallenge {
        let key = cache_key(date, tier);
        if let Some(cached) = self.cache.load(&key) {
            if cached.verify() && cached.board == self.generator.board() && cached.tier == tier {
                return cached;
            }
            log::warn!("cached challenge {key} failed verification; regenerating");
        }

        let date_str = date.format("%Y-%m-%d").to_string();
        let challenge = self.generator.generate(seed_for_date(date), &date_str, tier);
        self.cache.store(&key, &challenge);
        challenge
    }

    pub fn invalidate(&mut self, date: NaiveDate, tier: Tier) {
        self.cache.remove(&cache_key(date, tier));
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn into_cache(self) -> C {
        self.cache
    }
}

/// The deterministic piece sequence that goes with a challenge.
pub fn piece_source_for(challenge: &DailyChallenge) -> PieceSource {
    let colors: &[PixelColor] = &challenge.available_colors;
    PieceSource::seeded(challenge.seed, colors)
}

/// Best results for one date and tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub best_time_secs: Option<u64>,
    pub fewest_steps: Option<u32>,
    pub best_score: u64,
    pub best_stars: u8,
    pub attempts: u32,
    pub completed: bool,
    pub last_completed: Option<DateTime<Utc>>,
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub time_secs: u64,
    pub steps: u32,
    pub score: u64,
    pub stars: u8,
}

impl ChallengeRecord {
    pub fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    /// Merge a completed run; each field keeps its best independently.
    /// Returns true if anything improved.
    pub fn record_completion(&mut self, run: RunResult, at: DateTime<Utc>) -> bool {
        let mut improved = !self.completed;
        self.completed = true;
        self.last_completed = Some(at);

        if self.best_time_secs.is_none_or(|t| run.time_secs < t) {
            self.best_time_secs = Some(run.time_secs);
            improved = true;
        }
        if self.fewest_steps.is_none_or(|s| run.steps < s) {
            self.fewest_steps = Some(run.steps);
            improved = true;
        }
        if run.score > self.best_score {
            self.best_score = run.score;
            improved = true;
        }
        if run.stars > self.best_stars {
            self.best_stars = run.stars;
            improved = true;
        }
        improved
    }
}
