//! Tetromino shape tables, the 7-bag randomizer and the piece source feeding the preview slots.

use crate::color::PixelColor;
use crate::random::SeededRandom;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::VecDeque;

/// Coarse-grid cell offsets (dx, dy) of one rotation state; y grows downward.
pub type Cells = [(i8, i8); 4];

/// Tetromino kinds (I, O, T, S, Z, J, L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TetrominoKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

const I_ROTATIONS: [Cells; 2] = [
    [(0, 0), (1, 0), (2, 0), (3, 0)],
    [(0, 0), (0, 1), (0, 2), (0, 3)],
];
const O_ROTATIONS: [Cells; 1] = [[(0, 0), (1, 0), (0, 1), (1, 1)]];
const T_ROTATIONS: [Cells; 4] = [
    [(0, 0), (1, 0), (2, 0), (1, 1)],
    [(1, 0), (0, 1), (1, 1), (1, 2)],
    [(1, 0), (0, 1), (1, 1), (2, 1)],
    [(0, 0), (0, 1), (1, 1), (0, 2)],
];
const S_ROTATIONS: [Cells; 2] = [
    [(1, 0), (2, 0), (0, 1), (1, 1)],
    [(0, 0), (0, 1), (1, 1), (1, 2)],
];
const Z_ROTATIONS: [Cells; 2] = [
    [(0, 0), (1, 0), (1, 1), (2, 1)],
    [(1, 0), (0, 1), (1, 1), (0, 2)],
];
const J_ROTATIONS: [Cells; 4] = [
    [(0, 0), (0, 1), (1, 1), (2, 1)],
    [(0, 0), (1, 0), (0, 1), (0, 2)],
    [(0, 0), (1, 0), (2, 0), (2, 1)],
    [(1, 0), (1, 1), (0, 2), (1, 2)],
];
const L_ROTATIONS: [Cells; 4] = [
    [(2, 0), (0, 1), (1, 1), (2, 1)],
    [(0, 0), (0, 1), (0, 2), (1, 2)],
    [(0, 0), (1, 0), (2, 0), (0, 1)],
    [(0, 0), (1, 0), (1, 1), (1, 2)],
];

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::T, Self::S, Self::Z, Self::J, Self::L];

    /// Every rotation state of this shape (1, 2 or 4 of them).
    pub fn rotations(self) -> &'static [Cells] {
        match self {
            Self::I => &I_ROTATIONS,
            Self::O => &O_ROTATIONS,
            Self::T => &T_ROTATIONS,
            Self::S => &S_ROTATIONS,
            Self::Z => &Z_ROTATIONS,
            Self::J => &J_ROTATIONS,
            Self::L => &L_ROTATIONS,
        }
    }

    pub fn rotation_count(self) -> u8 {
        self.rotations().len() as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I => "I",
            Self::O => "O",
            Self::T => "T",
            Self::S => "S",
            Self::Z => "Z",
            Self::J => "J",
            Self::L => "L",
        }
    }
}

/// A drawn piece waiting in a preview slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub kind: TetrominoKind,
    pub color: PixelColor,
    pub rotation: u8,
}

impl Piece {
    pub fn new(kind: TetrominoKind, color: PixelColor) -> Self {
        Self {
            kind,
            color,
            rotation: 0,
        }
    }

    /// Offsets of the current rotation.
    pub fn cells(&self) -> &'static Cells {
        let rotations = self.kind.rotations();
        &rotations[self.rotation as usize % rotations.len()]
    }

    /// Absolute logical cells when the piece's origin sits at (lx, ly).
    pub fn cells_at(&self, lx: i32, ly: i32) -> [(i32, i32); 4] {
        (*self.cells()).map(|(dx, dy)| (lx + i32::from(dx), ly + i32::from(dy)))
    }

    /// Bounding box size (width, height) in logical cells.
    pub fn extent(&self) -> (i32, i32) {
        let cells = self.cells();
        let w = cells.iter().map(|c| c.0).max().unwrap_or(0) + 1;
        let h = cells.iter().map(|c| c.1).max().unwrap_or(0) + 1;
        (i32::from(w), i32::from(h))
    }

    pub fn rotate_cw(&mut self) {
        self.rotation = (self.rotation + 1) % self.kind.rotation_count();
    }

    pub fn rotate_ccw(&mut self) {
        let n = self.kind.rotation_count();
        self.rotation = (self.rotation + n - 1) % n;
    }

    /// The same piece in each of its rotation states.
    pub fn all_rotations(&self) -> impl Iterator<Item = Self> {
        let base = *self;
        (0..base.kind.rotation_count()).map(move |rotation| Self { rotation, ..base })
    }
}

/// Randomness the bag and colour draw need; implemented by the unseeded and seeded generators.
pub trait DrawSource {
    fn shuffle_shapes(&mut self, shapes: &mut [TetrominoKind]);
    fn pick_color(&mut self, colors: &[PixelColor]) -> Option<PixelColor>;
}

impl DrawSource for StdRng {
    fn shuffle_shapes(&mut self, shapes: &mut [TetrominoKind]) {
        shapes.shuffle(self);
    }

    fn pick_color(&mut self, colors: &[PixelColor]) -> Option<PixelColor> {
        colors.choose(self).copied()
    }
}

impl DrawSource for SeededRandom {
    fn shuffle_shapes(&mut self, shapes: &mut [TetrominoKind]) {
        self.shuffle_in_place(shapes);
    }

    fn pick_color(&mut self, colors: &[PixelColor]) -> Option<PixelColor> {
        self.choice(colors).ok().copied()
    }
}

/// 7-bag: every shape once per bag, fresh shuffle when the bag runs out.
#[derive(Debug, Clone, Default)]
pub struct Bag {
    queue: VecDeque<TetrominoKind>,
}

impl Bag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw<S: DrawSource + ?Sized>(&mut self, source: &mut S) -> TetrominoKind {
        if self.queue.is_empty() {
            self.refill(source);
        }
        self.queue.pop_front().unwrap_or(TetrominoKind::I)
    }

    /// Shapes left before the next reshuffle.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn refill<S: DrawSource + ?Sized>(&mut self, source: &mut S) {
        let mut all = TetrominoKind::ALL;
        source.shuffle_shapes(&mut all);
        self.queue.extend(all);
    }
}

/// Unseeded (varies every run) or seeded (daily challenge) randomness.
#[derive(Debug, Clone)]
pub enum SourceRng {
    Random(StdRng),
    Seeded(SeededRandom),
}

impl DrawSource for SourceRng {
    fn shuffle_shapes(&mut self, shapes: &mut [TetrominoKind]) {
        match self {
            Self::Random(rng) => rng.shuffle_shapes(shapes),
            Self::Seeded(rng) => rng.shuffle_shapes(shapes),
        }
    }

    fn pick_color(&mut self, colors: &[PixelColor]) -> Option<PixelColor> {
        match self {
            Self::Random(rng) => rng.pick_color(colors),
            Self::Seeded(rng) => rng.pick_color(colors),
        }
    }
}

/// Shapes from a bag, colours drawn independently from an allowed list.
#[derive(Debug, Clone)]
pub struct PieceSource {
    rng: SourceRng,
    bag: Bag,
    colors: Vec<PixelColor>,
}

impl PieceSource {
    /// Unseeded source over a fixed palette.
    pub fn random(colors: &[PixelColor]) -> Self {
        Self::with_rng(SourceRng::Random(StdRng::from_os_rng()), colors)
    }

    /// Deterministic source: same seed and colours, same piece sequence.
    /// Each piece consumes the shape draw first, then the colour draw.
    pub fn seeded(seed: i64, colors: &[PixelColor]) -> Self {
        Self::with_rng(SourceRng::Seeded(SeededRandom::new(seed)), colors)
    }

    fn with_rng(rng: SourceRng, colors: &[PixelColor]) -> Self {
        let colors = if colors.is_empty() {
            PixelColor::STANDARD.to_vec()
        } else {
            colors.to_vec()
        };
        Self {
            rng,
            bag: Bag::new(),
            colors,
        }
    }

    pub fn colors(&self) -> &[PixelColor] {
        &self.colors
    }

    pub fn is_seeded(&self) -> bool {
        matches!(self.rng, SourceRng::Seeded(_))
    }

    pub fn next_piece(&mut self) -> Piece {
        let kind = self.bag.draw(&mut self.rng);
        let color = self
            .rng
            .pick_color(&self.colors)
            .unwrap_or(PixelColor::STANDARD[0]);
        Piece::new(kind, color)
    }
}
