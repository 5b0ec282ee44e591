//! Per-pixel three-direction gravity.
//!
//! Units fall straight down, else diagonally (left/right order picked per unit at random),
//! else they settle. Only the active (unstable) set is visited each step, processed from the
//! bottom row up so lower units vacate before upper units try to move into their cells.
//!
//! The diagonal tie-break uses ordinary OS-seeded randomness even in daily challenges: fall
//! paths vary between runs while the layout, piece sequence and colours stay deterministic.

use crate::grid::{Grid, PixelId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Downward neighbours tested by stability recheck: down, down-left, down-right.
const SUPPORT_OFFSETS: [(i32, i32); 3] = [(0, 1), (-1, 1), (1, 1)];

#[derive(Debug, Clone)]
pub struct PhysicsManager {
    active: Vec<PixelId>,
    rng: StdRng,
    /// Scratch buffer reused by `update` to avoid per-step allocation.
    order: Vec<(i32, PixelId)>,
}

impl Default for PhysicsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsManager {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Reproducible tie-breaks; only for tests and tooling.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            active: Vec::new(),
            rng,
            order: Vec::new(),
        }
    }

    /// Number of units still unsettled.
    #[inline]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn all_stable(&self) -> bool {
        self.active.is_empty()
    }

    /// Start simulating a freshly written unit.
    pub fn add(&mut self, grid: &mut Grid, id: PixelId) {
        if let Some(p) = grid.pixel_mut(id) {
            p.stable = false;
            p.updated_this_frame = false;
            self.active.push(id);
        }
    }

    /// Reactivate a settled unit; no-op if it is already unstable or gone.
    pub fn mark_as_unstable(&mut self, grid: &mut Grid, id: PixelId) {
        if let Some(p) = grid.pixel_mut(id) {
            if p.stable {
                p.stable = false;
                self.active.push(id);
            }
        }
    }

    /// Forget every active unit. `Session::restart` calls this right after `Grid::clear`.
    pub fn reset(&mut self) {
        self.active.clear();
    }

    /// One discrete step. Returns how many units moved.
    pub fn update(&mut self, grid: &mut Grid) -> usize {
        if self.active.is_empty() {
            return 0;
        }

        // Eliminated units leave stale handles behind; drop them here.
        self.active.retain(|id| grid.contains(*id));

        self.order.clear();
        for &id in &self.active {
            if let Some(p) = grid.pixel_mut(id) {
                p.updated_this_frame = false;
                self.order.push((p.y, id));
            }
        }
        // Shuffle first so the stable sort leaves same-row units in random order.
        self.order.shuffle(&mut self.rng);
        self.order.sort_by(|a, b| b.0.cmp(&a.0));

        let mut moved = 0;
        for i in 0..self.order.len() {
            let id = self.order[i].1;
            let Some((x, y)) = grid
                .pixel(id)
                .filter(|p| !p.stable && !p.updated_this_frame)
                .map(|p| (p.x, p.y))
            else {
                continue;
            };

            if self.try_fall(grid, id, x, y) {
                moved += 1;
                if let Some(p) = grid.pixel_mut(id) {
                    p.updated_this_frame = true;
                }
            } else if let Some(p) = grid.pixel_mut(id) {
                p.stable = true;
            }
        }

        self.active
            .retain(|id| grid.pixel(*id).is_some_and(|p| !p.stable));
        moved
    }

    fn try_fall(&mut self, grid: &mut Grid, id: PixelId, x: i32, y: i32) -> bool {
        if grid.is_empty_at(x, y + 1) {
            return grid.move_pixel(id, x, y + 1);
        }
        let sides = if self.rng.random_bool(0.5) {
            [-1, 1]
        } else {
            [1, -1]
        };
        sides.into_iter().any(|dx| {
            grid.is_empty_at(x + dx, y + 1) && grid.move_pixel(id, x + dx, y + 1)
        })
    }

    /// Single incremental pass after a bulk deletion: reactivate every stable unit whose
    /// down, down-left or down-right neighbour is empty or itself unstable. Scans from the
    /// bottom row up so reactivations propagate upward within the same pass.
    /// Returns how many units were reactivated.
    pub fn recheck_stability(&mut self, grid: &mut Grid) -> usize {
        let (w, h) = grid.pixel_dims();
        let mut woken = 0;
        for y in (0..h as i32).rev() {
            for x in 0..w as i32 {
                let Some(id) = grid.get_pixel(x, y) else {
                    continue;
                };
                if !grid.pixel(id).is_some_and(|p| p.stable) {
                    continue;
                }
                if lacks_support(grid, x, y) {
                    self.mark_as_unstable(grid, id);
                    woken += 1;
                }
            }
        }
        woken
    }
}

/// True if any downward neighbour is in-bounds and either empty or about to vacate.
/// The floor and side walls count as support.
fn lacks_support(grid: &Grid, x: i32, y: i32) -> bool {
    SUPPORT_OFFSETS.iter().any(|&(dx, dy)| {
        let (nx, ny) = (x + dx, y + dy);
        if !grid.is_valid_pixel_position(nx, ny) {
            return false;
        }
        match grid.get_pixel(nx, ny).and_then(|n| grid.pixel(n)) {
            None => true,
            Some(n) => !n.stable,
        }
    })
}
