//! Falling-block puzzle core where every placed block breaks into sand.
//!
//! Pieces are placed on a coarse logical grid, rasterized into `ratio × ratio` fine units
//! per cell, and those units fall individually. Any same-colour region reaching from the
//! left wall to the right wall is removed, which can set off chains.

pub mod challenge;
pub mod color;
pub mod elimination;
pub mod grid;
pub mod level;
pub mod physics;
pub mod piece;
pub mod preview;
pub mod random;
pub mod scoring;
pub mod session;

pub use challenge::{
    ChallengeCache, ChallengeManager, ChallengeRecord, MemoryChallengeCache, RunResult,
};
pub use color::PixelColor;
pub use grid::{BoardConfig, Grid, GroupId, Pixel, PixelId};
pub use level::{DailyChallenge, LevelGenerator, StarThresholds, Tier};
pub use piece::{Piece, PieceSource, TetrominoKind};
pub use random::SeededRandom;
pub use session::{GameOverReason, Mode, Phase, PlaceError, Session, SessionConfig, SessionEvent};
