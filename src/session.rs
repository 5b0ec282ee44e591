//! One game, as an explicit state machine over the core systems.
//!
//! The host calls [`Session::place`] for player input and [`Session::tick`] once per frame
//! (or several times per frame to speed the sand up); everything observable comes back
//! through accessors and the queued [`SessionEvent`]s.

use crate::challenge::piece_source_for;
use crate::color::PixelColor;
use crate::elimination::EliminationSystem;
use crate::grid::{BoardConfig, Grid, GroupId, Pixel};
use crate::level::DailyChallenge;
use crate::physics::PhysicsManager;
use crate::piece::{Piece, PieceSource};
use crate::preview::{DEFAULT_SLOT_COUNT, PreviewSlots};
use crate::scoring::ScoringSystem;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// Unseeded pieces, play until nothing fits.
    Endless { high_color: bool },
    /// A fixed layout to clear within a step budget.
    Daily(Box<DailyChallenge>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub board: BoardConfig,
    pub mode: Mode,
    pub preview_slots: usize,
}

impl SessionConfig {
    pub fn endless(board: BoardConfig, high_color: bool) -> Self {
        Self {
            board,
            mode: Mode::Endless { high_color },
            preview_slots: DEFAULT_SLOT_COUNT,
        }
    }

    /// The board always comes from the challenge so the layout lines up.
    pub fn daily(challenge: DailyChallenge) -> Self {
        Self {
            board: challenge.board,
            mode: Mode::Daily(Box::new(challenge)),
            preview_slots: DEFAULT_SLOT_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Units are falling or an elimination chain is in progress.
    Settling,
    /// Everything is at rest; waiting for a placement.
    Idle,
    GameOver(GameOverReason),
    /// Daily layout fully cleared.
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    NoSpace,
    OutOfSteps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Placed {
        slot: usize,
        piece: Piece,
        lx: i32,
        ly: i32,
    },
    Eliminated {
        cells: usize,
        score: u64,
        chain: u32,
        positions: Vec<(i32, i32)>,
    },
    ChainEnded {
        chain: u32,
    },
    GameOver(GameOverReason),
    ChallengeComplete {
        steps: u32,
        score: u64,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaceError {
    #[error("the game is over")]
    Finished,
    #[error("no steps left")]
    OutOfSteps,
    #[error("slot {0} is empty")]
    EmptySlot(usize),
    #[error("piece does not fit at ({lx}, {ly})")]
    Blocked { lx: i32, ly: i32 },
}

#[derive(Debug)]
pub struct Session {
    mode: Mode,
    grid: Grid,
    physics: PhysicsManager,
    elimination: EliminationSystem,
    scoring: ScoringSystem,
    previews: PreviewSlots,
    phase: Phase,
    steps: u32,
    next_group: u32,
    /// Set after the first elimination of a chain, cleared when a check finds nothing.
    in_chain: bool,
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_physics(config, PhysicsManager::new())
    }

    /// Same as [`Session::new`] with a caller-supplied physics engine (e.g. seeded).
    pub fn with_physics(config: SessionConfig, physics: PhysicsManager) -> Self {
        let source = piece_source(&config.mode);
        let mut session = Self {
            grid: Grid::new(config.board),
            physics,
            elimination: EliminationSystem::new(),
            scoring: ScoringSystem::new(),
            previews: PreviewSlots::new(source, config.preview_slots),
            phase: Phase::Settling,
            steps: 0,
            next_group: 1,
            in_chain: false,
            events: Vec::new(),
            mode: config.mode,
        };
        session.load_layout();
        session
    }

    /// Start over on the same board and mode. A daily replays its layout and piece sequence.
    pub fn restart(&mut self) {
        self.grid.clear();
        self.physics.reset();
        self.elimination = EliminationSystem::new();
        self.scoring = ScoringSystem::new();
        self.previews = PreviewSlots::new(piece_source(&self.mode), self.previews.len());
        self.phase = Phase::Settling;
        self.steps = 0;
        self.next_group = 1;
        self.in_chain = false;
        self.events.clear();
        self.load_layout();
    }

    fn load_layout(&mut self) {
        let Mode::Daily(challenge) = &self.mode else {
            return;
        };
        for p in &challenge.initial_layout {
            if let Some(id) = self
                .grid
                .set_pixel(p.x, p.y, Some(Pixel::new(p.color, GroupId::LAYOUT)))
            {
                self.physics.add(&mut self.grid, id);
            }
        }
        log::debug!(
            "loaded daily layout {} ({} units)",
            challenge.date,
            self.grid.pixel_count()
        );
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn challenge(&self) -> Option<&DailyChallenge> {
        match &self.mode {
            Mode::Daily(c) => Some(c),
            Mode::Endless { .. } => None,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::GameOver(_) | Phase::Complete)
    }

    pub fn score(&self) -> u64 {
        self.scoring.total()
    }

    pub fn chain_level(&self) -> u32 {
        self.scoring.chain_level()
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn max_steps(&self) -> Option<u32> {
        self.challenge().map(|c| c.max_steps)
    }

    pub fn steps_left(&self) -> Option<u32> {
        self.max_steps().map(|m| m.saturating_sub(self.steps))
    }

    pub fn active_units(&self) -> usize {
        self.physics.active_count()
    }

    /// Layout units still on the board (always 0 in endless mode).
    pub fn layout_remaining(&self) -> usize {
        self.grid
            .pixels()
            .filter(|(_, p)| p.group.is_layout())
            .count()
    }

    pub fn previews(&self) -> &PreviewSlots {
        &self.previews
    }

    pub fn previews_mut(&mut self) -> &mut PreviewSlots {
        &mut self.previews
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// All four cells of `piece` at (lx, ly) are in range and fully empty.
    pub fn can_place(&self, piece: &Piece, lx: i32, ly: i32) -> bool {
        piece
            .cells_at(lx, ly)
            .iter()
            .all(|&(x, y)| self.grid.is_logical_cell_empty(x, y))
    }

    /// Some rotation of `piece` fits somewhere on the board.
    pub fn fits_anywhere(&self, piece: &Piece) -> bool {
        let (lw, lh) = self.grid.logical_dims();
        piece.all_rotations().any(|rotated| {
            (0..lh as i32).any(|ly| (0..lw as i32).any(|lx| self.can_place(&rotated, lx, ly)))
        })
    }

    /// Rasterize the piece in `slot` at logical (lx, ly). On failure the slot is unchanged.
    pub fn place(&mut self, slot: usize, lx: i32, ly: i32) -> Result<(), PlaceError> {
        if self.is_finished() {
            return Err(PlaceError::Finished);
        }
        if self.steps_left() == Some(0) {
            return Err(PlaceError::OutOfSteps);
        }
        let piece = self
            .previews
            .take_slot(slot)
            .ok_or(PlaceError::EmptySlot(slot))?;
        if !self.can_place(&piece, lx, ly) {
            self.previews.set_slot(slot, Some(piece));
            return Err(PlaceError::Blocked { lx, ly });
        }

        let group = GroupId(self.next_group);
        self.next_group += 1;
        let r = self.grid.ratio() as i32;
        for (cx, cy) in piece.cells_at(lx, ly) {
            let (x0, y0) = self.grid.logical_to_pixel(cx, cy);
            for y in y0..y0 + r {
                for x in x0..x0 + r {
                    let pixel = Pixel::new(piece.color, group);
                    if let Some(id) = self.grid.set_pixel(x, y, Some(pixel)) {
                        self.physics.add(&mut self.grid, id);
                    }
                }
            }
        }

        self.previews.refill_slot_after_place(slot);
        self.steps += 1;
        self.phase = Phase::Settling;
        self.events.push(SessionEvent::Placed { slot, piece, lx, ly });
        Ok(())
    }

    /// Advance one step. Returns the phase afterwards.
    pub fn tick(&mut self) -> Phase {
        if self.phase != Phase::Settling {
            return self.phase;
        }
        self.physics.update(&mut self.grid);
        if !self.physics.all_stable() {
            return self.phase;
        }

        if self.elimination.check_elimination(&self.grid).is_empty() {
            self.end_chain();
            self.phase = Phase::Idle;
            self.evaluate_end();
            return self.phase;
        }

        let positions: Vec<(i32, i32)> = self
            .elimination
            .clusters()
            .iter()
            .flat_map(|c| c.pixels.iter())
            .filter_map(|&id| self.grid.pixel(id).map(|p| (p.x, p.y)))
            .collect();
        let cells = self.elimination.eliminate_all(&mut self.grid);
        let score = self.scoring.add_elimination_score(cells, self.in_chain);
        self.in_chain = true;
        let chain = self.scoring.chain_level();
        log::debug!("eliminated {cells} units for {score} (chain {chain})");
        self.events.push(SessionEvent::Eliminated {
            cells,
            score,
            chain,
            positions,
        });
        self.physics.recheck_stability(&mut self.grid);
        self.phase
    }

    fn end_chain(&mut self) {
        if self.in_chain {
            let chain = self.scoring.chain_level();
            self.events.push(SessionEvent::ChainEnded { chain });
        }
        self.in_chain = false;
        self.scoring.reset_chain();
    }

    fn evaluate_end(&mut self) {
        if matches!(self.mode, Mode::Daily(_)) && self.layout_remaining() == 0 {
            self.phase = Phase::Complete;
            self.events.push(SessionEvent::ChallengeComplete {
                steps: self.steps,
                score: self.score(),
            });
            return;
        }
        let reason = if self.steps_left() == Some(0) {
            Some(GameOverReason::OutOfSteps)
        } else if !self.previews.has_any_placeable_block(|p| self.fits_anywhere(p)) {
            Some(GameOverReason::NoSpace)
        } else {
            None
        };
        if let Some(reason) = reason {
            log::debug!("game over: {reason:?} after {} steps", self.steps);
            self.phase = Phase::GameOver(reason);
            self.events.push(SessionEvent::GameOver(reason));
        }
    }

    /// Run until the board is at rest or `limit` steps pass.
    pub fn settle(&mut self, limit: usize) -> Phase {
        for _ in 0..limit {
            if self.tick() != Phase::Settling {
                break;
            }
        }
        self.phase
    }
}

fn piece_source(mode: &Mode) -> PieceSource {
    match mode {
        Mode::Endless { high_color } => PieceSource::random(PixelColor::palette(*high_color)),
        Mode::Daily(challenge) => piece_source_for(challenge),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LayoutPixel, Tier, layout_checksum};
    use crate::piece::TetrominoKind;

    fn small(w: usize, h: usize) -> BoardConfig {
        BoardConfig {
            logical_width: w,
            logical_height: h,
            ratio: 1,
        }
    }

    fn daily(board: BoardConfig, layout: Vec<LayoutPixel>, max_steps: u32) -> SessionConfig {
        SessionConfig::daily(DailyChallenge {
            date: "2025-01-04".into(),
            seed: 20_250_104,
            tier: Tier::Easy,
            board,
            checksum: layout_checksum(&layout),
            initial_layout: layout,
            max_steps,
            available_colors: vec![PixelColor::Red],
        })
    }

    fn red(x: i32, y: i32) -> LayoutPixel {
        LayoutPixel {
            x,
            y,
            color: PixelColor::Red,
        }
    }

    fn session(config: SessionConfig) -> Session {
        Session::with_physics(config, PhysicsManager::with_seed(1))
    }

    #[test]
    fn test_placed_piece_settles_to_four_full_blocks() {
        let mut s = session(SessionConfig::endless(BoardConfig::default(), false));
        assert_eq!(s.settle(10), Phase::Idle);
        s.previews_mut()
            .set_slot(0, Some(Piece::new(TetrominoKind::O, PixelColor::Blue)));
        s.place(0, 4, 2).unwrap();
        assert_eq!(s.grid().pixel_count(), 400);
        assert_eq!(s.settle(5000), Phase::Idle);
        assert_eq!(s.grid().pixel_count(), 4 * 10 * 10);
        assert_eq!(s.steps(), 1);
        assert!(s.grid().pixels().all(|(_, p)| p.stable && p.group == GroupId(1)));
    }

    #[test]
    fn test_blocked_placement_restores_slot() {
        let mut s = session(SessionConfig::endless(small(4, 6), false));
        let o = Piece::new(TetrominoKind::O, PixelColor::Green);
        s.previews_mut().set_slot(0, Some(o));
        s.previews_mut().set_slot(1, Some(o));
        s.place(0, 0, 4).unwrap();
        assert_eq!(s.place(1, 1, 4), Err(PlaceError::Blocked { lx: 1, ly: 4 }));
        assert_eq!(s.previews().get_slot(1), Some(&o));
        assert_eq!(s.place(1, 3, 0), Err(PlaceError::Blocked { lx: 3, ly: 0 }));
        assert_eq!(s.steps(), 1);
    }

    #[test]
    fn test_full_row_is_eliminated_and_scored() {
        let mut s = session(SessionConfig::endless(small(4, 6), false));
        s.settle(10);
        s.drain_events();
        s.previews_mut()
            .set_slot(0, Some(Piece::new(TetrominoKind::I, PixelColor::Yellow)));
        s.place(0, 0, 5).unwrap();
        assert_eq!(s.settle(100), Phase::Idle);
        assert_eq!(s.grid().pixel_count(), 0);
        assert_eq!(s.score(), 20);
        assert_eq!(s.chain_level(), 0);

        let events = s.drain_events();
        assert!(matches!(events[0], SessionEvent::Placed { slot: 0, .. }));
        match &events[1] {
            SessionEvent::Eliminated {
                cells,
                score,
                chain,
                positions,
            } => {
                assert_eq!((*cells, *score, *chain), (4, 20, 1));
                assert_eq!(positions.len(), 4);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[2], SessionEvent::ChainEnded { chain: 1 });
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_falling_span_scores_second_chain_link() {
        let at = |x, y, color| LayoutPixel { x, y, color };
        let mut layout: Vec<LayoutPixel> = (0..4).map(|x| at(x, 3, PixelColor::Yellow)).collect();
        // The yellow plug joins the floor row; once both go, the reds close the gap.
        layout.push(at(1, 2, PixelColor::Yellow));
        layout.extend([0, 2, 3].map(|x| at(x, 2, PixelColor::Red)));
        layout.push(at(1, 1, PixelColor::Red));
        let mut s = session(daily(small(4, 4), layout, 10));

        assert_eq!(s.settle(100), Phase::Complete);
        assert_eq!(s.grid().pixel_count(), 0);
        assert_eq!(s.score(), 22 + 40);

        let links: Vec<(usize, u64, u32)> = s
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Eliminated {
                    cells, score, chain, ..
                } => Some((cells, score, chain)),
                SessionEvent::ChainEnded { chain } => Some((0, 0, chain)),
                _ => None,
            })
            .collect();
        assert_eq!(links, vec![(5, 22, 1), (4, 40, 2), (0, 0, 2)]);
    }

    #[test]
    fn test_restart_replays_daily_from_scratch() {
        let mut s = session(daily(small(4, 6), vec![red(3, 5)], 5));
        let first: Vec<Option<Piece>> = s.previews().iter().map(|p| p.copied()).collect();
        assert_eq!(s.settle(10), Phase::Idle);
        s.previews_mut()
            .set_slot(0, Some(Piece::new(TetrominoKind::O, PixelColor::Blue)));
        s.place(0, 0, 4).unwrap();
        s.settle(100);
        assert_eq!(s.grid().pixel_count(), 5);

        s.restart();
        assert_eq!(s.phase(), Phase::Settling);
        assert_eq!(s.steps(), 0);
        assert_eq!(s.score(), 0);
        assert_eq!(s.grid().pixel_count(), 1);
        assert_eq!(s.active_units(), 1);
        assert!(s.drain_events().is_empty());
        let again: Vec<Option<Piece>> = s.previews().iter().map(|p| p.copied()).collect();
        assert_eq!(again, first);
        assert_eq!(s.settle(10), Phase::Idle);
        assert_eq!(s.layout_remaining(), 1);
    }

    #[test]
    fn test_no_space_is_game_over() {
        let mut s = session(SessionConfig::endless(small(3, 1), false));
        assert_eq!(s.settle(10), Phase::GameOver(GameOverReason::NoSpace));
        assert_eq!(
            s.drain_events(),
            vec![SessionEvent::GameOver(GameOverReason::NoSpace)]
        );
        assert_eq!(s.place(0, 0, 0), Err(PlaceError::Finished));
    }

    #[test]
    fn test_daily_step_budget_runs_out() {
        let mut s = session(daily(small(4, 6), vec![red(3, 5)], 1));
        assert_eq!(s.settle(10), Phase::Idle);
        assert_eq!(s.layout_remaining(), 1);
        s.previews_mut()
            .set_slot(0, Some(Piece::new(TetrominoKind::O, PixelColor::Blue)));
        s.place(0, 0, 4).unwrap();
        assert_eq!(s.steps_left(), Some(0));
        assert_eq!(s.place(1, 0, 0), Err(PlaceError::OutOfSteps));
        assert_eq!(s.settle(100), Phase::GameOver(GameOverReason::OutOfSteps));
    }

    #[test]
    fn test_daily_completes_when_layout_cleared() {
        let mut s = session(daily(small(4, 6), vec![red(0, 5), red(1, 5)], 10));
        assert_eq!(s.settle(10), Phase::Idle);
        s.previews_mut()
            .set_slot(0, Some(Piece::new(TetrominoKind::I, PixelColor::Red)));
        s.place(0, 0, 4).unwrap();
        assert_eq!(s.settle(100), Phase::Complete);
        assert_eq!(s.layout_remaining(), 0);
        assert_eq!(s.score(), 24);
        let events = s.drain_events();
        assert_eq!(
            events.last(),
            Some(&SessionEvent::ChallengeComplete { steps: 1, score: 24 })
        );
    }

    #[test]
    fn test_daily_pieces_follow_challenge_colours() {
        let s = session(daily(small(4, 6), vec![red(3, 5)], 5));
        assert!(s.previews().iter().flatten().all(|p| p.color == PixelColor::Red));
        assert_eq!(s.max_steps(), Some(5));
    }

    #[test]
    fn test_generated_daily_layout_settles_without_moving() {
        let challenge = crate::level::LevelGenerator::default().generate(
            20_250_104,
            "2025-01-04",
            Tier::Normal,
        );
        let before = challenge.initial_layout.len();
        let mut s = session(SessionConfig::daily(challenge));
        assert_ne!(s.settle(1000), Phase::Settling);
        assert_eq!(s.grid().pixel_count(), before);
        assert_eq!(s.layout_remaining(), before);
    }
}
