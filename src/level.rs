//! Daily-challenge level generation.
//!
//! Given a seed and a tier, the generator deterministically builds a layered starting layout:
//! a target colour split into two piles hugging the side walls, then one barrier layer per
//! further colour stacked above it. Everything here draws only from [`SeededRandom`], so two
//! clients with the same seed, tier and board produce identical layouts and checksums.

use crate::color::PixelColor;
use crate::grid::BoardConfig;
use crate::random::SeededRandom;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Floor for the daily step budget.
pub const MIN_STEPS: u32 = 10;

/// Probability each barrier candidate cell is actually filled.
const BARRIER_FILL: f64 = 0.9;

/// Daily challenge difficulty tier (1..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Easy,
    Normal,
    Hard,
}

impl Tier {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Normal, Self::Hard];

    pub const fn number(self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Normal => 2,
            Self::Hard => 3,
        }
    }

    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Easy),
            2 => Some(Self::Normal),
            3 => Some(Self::Hard),
            _ => None,
        }
    }

    /// Colours in the layout: 2 / 3 / 4.
    pub const fn color_count(self) -> usize {
        self.number() as usize + 1
    }

    /// Multiple of the estimated piece count granted as the step budget.
    pub const fn step_multiplier(self) -> f64 {
        match self {
            Self::Easy => 3.0,
            Self::Normal => 2.5,
            Self::Hard => 2.0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }
}

/// Time (seconds) and step ceilings for 3 and 2 stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarThresholds {
    pub three_star_secs: u64,
    pub three_star_steps: u32,
    pub two_star_secs: u64,
    pub two_star_steps: u32,
}

impl StarThresholds {
    pub const fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Easy => Self {
                three_star_secs: 60,
                three_star_steps: 6,
                two_star_secs: 120,
                two_star_steps: 10,
            },
            Tier::Normal => Self {
                three_star_secs: 90,
                three_star_steps: 10,
                two_star_secs: 180,
                two_star_steps: 15,
            },
            Tier::Hard => Self {
                three_star_secs: 120,
                three_star_steps: 14,
                two_star_secs: 240,
                two_star_steps: 20,
            },
        }
    }

    /// Stars for a completed run; finishing at all is worth one.
    pub fn rate(&self, secs: u64, steps: u32) -> u8 {
        if secs <= self.three_star_secs && steps <= self.three_star_steps {
            3
        } else if secs <= self.two_star_secs && steps <= self.two_star_steps {
            2
        } else {
            1
        }
    }
}

/// One pre-seeded unit of a generated layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPixel {
    pub x: i32,
    pub y: i32,
    pub color: PixelColor,
}

/// Everything a client needs to play (and verify) one day's challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChallenge {
    pub date: String,
    pub seed: i64,
    pub tier: Tier,
    pub board: BoardConfig,
    pub checksum: String,
    pub initial_layout: Vec<LayoutPixel>,
    pub max_steps: u32,
    pub available_colors: Vec<PixelColor>,
}

impl DailyChallenge {
    pub fn stars(&self) -> StarThresholds {
        StarThresholds::for_tier(self.tier)
    }

    /// Recompute the checksum over the stored layout and compare.
    pub fn verify(&self) -> bool {
        layout_checksum(&self.initial_layout) == self.checksum
    }
}

/// Seed for a calendar date: the digits of YYYYMMDD as a number.
pub fn seed_for_date(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Rolling 32-bit hash over (x, y, colour index) of every pixel, as 8 hex digits.
pub fn layout_checksum(layout: &[LayoutPixel]) -> String {
    let hash = layout.iter().fold(0u32, |h, p| {
        let h = h.wrapping_mul(31).wrapping_add(p.x as u32);
        let h = h.wrapping_mul(31).wrapping_add(p.y as u32);
        h.wrapping_mul(31).wrapping_add(u32::from(p.color.index()))
    });
    format!("{hash:08x}")
}

/// Step budget: a tier multiple of the pieces needed to cover the layout's coarse cells.
pub fn step_budget(pixel_count: usize, ratio: usize, tier: Tier) -> u32 {
    let per_cell = (ratio * ratio).max(1);
    let coarse = pixel_count.div_ceil(per_cell);
    let pieces = coarse.div_ceil(4);
    let steps = (pieces as f64 * tier.step_multiplier()).ceil() as u32;
    steps.max(MIN_STEPS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelGenerator {
    board: BoardConfig,
}

impl LevelGenerator {
    pub fn new(board: BoardConfig) -> Self {
        Self { board }
    }

    pub fn board(&self) -> BoardConfig {
        self.board
    }

    pub fn generate(&self, seed: i64, date: &str, tier: Tier) -> DailyChallenge {
        let mut rng = SeededRandom::new(seed);
        let w = self.board.pixel_width() as i64;
        let h = self.board.pixel_height() as i64;
        let r = self.board.ratio as i64;

        let mut colors = rng.shuffle(&PixelColor::STANDARD);
        colors.truncate(tier.color_count());

        // Per-column stacks, floor first.
        let mut columns: Vec<Vec<PixelColor>> = vec![Vec::new(); w as usize];

        let half = w / 2;
        let left_w = span(&mut rng, r, r * 3 / 2).min(half.saturating_sub(1).max(1));
        let left_h = span(&mut rng, r, r * 2);
        let right_w = span(&mut rng, r, r * 3 / 2).min(half.saturating_sub(1).max(1));
        let right_h = span(&mut rng, r, r * 2);
        let target = colors[0];
        for x in 0..left_w {
            push_n(&mut columns[x as usize], target, left_h, h);
        }
        for x in (w - right_w)..w {
            push_n(&mut columns[x as usize], target, right_h, h);
        }

        for &color in colors.iter().skip(1) {
            let thickness = span(&mut rng, (r / 2).max(1), (r * 7 / 10).max(1));
            let gap = 2 * thickness + 2 + span(&mut rng, 0, 2);
            let left_gap = span(&mut rng, left_w + 2, half - gap - 1);
            let right_gap = span(&mut rng, half + 1, w - right_w - 2 - gap);
            for x in 0..w {
                let in_gap = (left_gap..left_gap + gap).contains(&x)
                    || (right_gap..right_gap + gap).contains(&x);
                if in_gap {
                    continue;
                }
                let column = &mut columns[x as usize];
                for _ in 0..thickness {
                    if rng.boolean(BARRIER_FILL) && (column.len() as i64) < h {
                        column.push(color);
                    }
                }
            }
        }

        let mut initial_layout: Vec<LayoutPixel> = columns
            .iter()
            .enumerate()
            .flat_map(|(x, column)| {
                column.iter().enumerate().map(move |(k, &color)| LayoutPixel {
                    x: x as i32,
                    y: (h - 1) as i32 - k as i32,
                    color,
                })
            })
            .collect();
        initial_layout.sort_by_key(|p| (p.y, p.x));

        let checksum = layout_checksum(&initial_layout);
        let max_steps = step_budget(initial_layout.len(), self.board.ratio, tier);
        log::debug!(
            "generated {} tier {} layout: {} pixels, {} colours, {} steps, checksum {}",
            date,
            tier.number(),
            initial_layout.len(),
            colors.len(),
            max_steps,
            checksum
        );

        DailyChallenge {
            date: date.to_string(),
            seed,
            tier,
            board: self.board,
            checksum,
            initial_layout,
            max_steps,
            available_colors: colors,
        }
    }
}

/// `next_int(lo, hi)`, or `lo` without consuming a draw when the range is empty.
fn span(rng: &mut SeededRandom, lo: i64, hi: i64) -> i64 {
    if hi < lo { lo } else { rng.next_int(lo, hi) }
}

fn push_n(column: &mut Vec<PixelColor>, color: PixelColor, n: i64, cap: i64) {
    let room = (cap - column.len() as i64).max(0);
    column.extend(std::iter::repeat_n(color, n.clamp(0, room) as usize));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn generator() -> LevelGenerator {
        LevelGenerator::new(BoardConfig::default())
    }

    #[test]
    fn test_seed_for_date() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        assert_eq!(seed_for_date(d), 20_250_104);
        assert_eq!(parse_date("2025-01-04"), Some(d));
        assert_eq!(parse_date("2025-13-04"), None);
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = generator().generate(20_250_104, "2025-01-04", Tier::Easy);
        let b = generator().generate(20_250_104, "2025-01-04", Tier::Easy);
        assert_eq!(a.initial_layout, b.initial_layout);
        assert_eq!(a.checksum, b.checksum);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generator().generate(20_250_104, "2025-01-04", Tier::Normal);
        let b = generator().generate(20_250_105, "2025-01-05", Tier::Normal);
        assert_ne!(a.checksum, b.checksum);
    }

    #[test]
    fn test_colour_count_per_tier() {
        for tier in Tier::ALL {
            let c = generator().generate(7, "x", tier);
            assert_eq!(c.available_colors.len(), tier.color_count());
            let distinct: HashSet<_> = c.available_colors.iter().collect();
            assert_eq!(distinct.len(), tier.color_count());
            let used: HashSet<_> = c.initial_layout.iter().map(|p| p.color).collect();
            assert!(used.iter().all(|col| c.available_colors.contains(col)));
        }
    }

    #[test]
    fn test_layout_in_bounds_and_unique() {
        let board = BoardConfig::default();
        let c = generator().generate(20_250_104, "2025-01-04", Tier::Hard);
        let mut seen = HashSet::new();
        for p in &c.initial_layout {
            assert!(p.x >= 0 && (p.x as usize) < board.pixel_width());
            assert!(p.y >= 0 && (p.y as usize) < board.pixel_height());
            assert!(seen.insert((p.x, p.y)));
        }
    }

    #[test]
    fn test_target_piles_touch_opposite_walls_without_joining() {
        let board = BoardConfig::default();
        let c = generator().generate(20_250_104, "2025-01-04", Tier::Easy);
        let target = c.available_colors[0];
        let bottom = board.pixel_height() as i32 - 1;
        let floor: Vec<i32> = c
            .initial_layout
            .iter()
            .filter(|p| p.y == bottom && p.color == target)
            .map(|p| p.x)
            .collect();
        assert!(floor.contains(&0));
        assert!(floor.contains(&(board.pixel_width() as i32 - 1)));
        assert!(floor.len() < board.pixel_width());
    }

    #[test]
    fn test_barrier_sits_above_target_in_every_column() {
        let c = generator().generate(99, "x", Tier::Normal);
        let target = c.available_colors[0];
        for p in c.initial_layout.iter().filter(|p| p.color == target) {
            // Nothing of the target colour rests on top of another colour.
            let below = c
                .initial_layout
                .iter()
                .find(|q| q.x == p.x && q.y == p.y + 1);
            if let Some(q) = below {
                assert_eq!(q.color, target);
            }
        }
    }

    #[test]
    fn test_checksum_format_and_verify() {
        let mut c = generator().generate(1234, "x", Tier::Easy);
        assert_eq!(c.checksum.len(), 8);
        assert!(c.checksum.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert!(c.verify());
        c.initial_layout.pop();
        assert!(!c.verify());
    }

    #[test]
    fn test_checksum_known_value() {
        let layout = [LayoutPixel {
            x: 1,
            y: 2,
            color: PixelColor::Yellow,
        }];
        // ((1 * 31) + 2) * 31 + 1 = 1024
        assert_eq!(layout_checksum(&layout), "00000400");
        assert_eq!(layout_checksum(&[]), "00000000");
    }

    #[test]
    fn test_step_budget() {
        assert_eq!(step_budget(0, 10, Tier::Easy), MIN_STEPS);
        // 2000 pixels -> 20 cells -> 5 pieces
        assert_eq!(step_budget(2000, 10, Tier::Easy), 15);
        assert_eq!(step_budget(2000, 10, Tier::Normal), 13);
        assert_eq!(step_budget(2000, 10, Tier::Hard), 10);
        assert_eq!(step_budget(8000, 10, Tier::Hard), 40);
    }

    #[test]
    fn test_star_rating() {
        let t = StarThresholds::for_tier(Tier::Easy);
        assert_eq!(t.rate(30, 5), 3);
        assert_eq!(t.rate(61, 5), 2);
        assert_eq!(t.rate(100, 10), 2);
        assert_eq!(t.rate(100, 11), 1);
    }
}
