//! Same-colour connectivity: find 4-connected clusters and remove those spanning the board
//! from the left wall to the right wall.

use crate::color::PixelColor;
use crate::grid::{Grid, PixelId};
use std::collections::VecDeque;

const NEIGHBOURS_4: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// A maximal same-colour 4-connected region found during one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub color: PixelColor,
    pub pixels: Vec<PixelId>,
    pub touches_left: bool,
    pub touches_right: bool,
}

impl Cluster {
    #[inline]
    pub fn is_eliminable(&self) -> bool {
        self.touches_left && self.touches_right
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct EliminationSystem {
    clusters: Vec<Cluster>,
    visited: Vec<bool>,
}

impl EliminationSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the whole grid (row-major) and keep only the clusters touching both walls.
    pub fn check_elimination(&mut self, grid: &Grid) -> &[Cluster] {
        let (w, h) = grid.pixel_dims();
        self.clusters.clear();
        self.visited.clear();
        self.visited.resize(w * h, false);

        let mut queue = VecDeque::new();
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let offset = y as usize * w + x as usize;
                if self.visited[offset] {
                    continue;
                }
                let Some(color) = grid.color_at(x, y) else {
                    continue;
                };
                let cluster = flood_fill(grid, &mut self.visited, &mut queue, x, y, color);
                if cluster.is_eliminable() {
                    self.clusters.push(cluster);
                }
            }
        }
        log::debug!("elimination check: {} spanning cluster(s)", self.clusters.len());
        &self.clusters
    }

    /// Clusters retained from the last check.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Total units across all retained clusters.
    pub fn pending_cells(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    /// Clear each unit whose cell still holds it. Does not touch physics; call
    /// `PhysicsManager::recheck_stability` afterwards. Returns how many units were removed.
    pub fn eliminate_pixels(&mut self, grid: &mut Grid, pixels: &[PixelId]) -> usize {
        let mut removed = 0;
        for &id in pixels {
            let Some((x, y)) = grid.pixel(id).map(|p| (p.x, p.y)) else {
                log::warn!("eliminate: unit {id:?} no longer exists; skipping");
                continue;
            };
            if grid.get_pixel(x, y) != Some(id) {
                log::warn!("eliminate: cell ({x}, {y}) no longer holds {id:?}; skipping");
                continue;
            }
            if grid.remove_pixel(id).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Remove one retained cluster by index.
    pub fn eliminate_cluster(&mut self, grid: &mut Grid, index: usize) -> usize {
        if index >= self.clusters.len() {
            log::warn!("eliminate: no cluster at index {index}");
            return 0;
        }
        let cluster = self.clusters.swap_remove(index);
        self.eliminate_pixels(grid, &cluster.pixels)
    }

    /// Remove every retained cluster in one pass (one chain link).
    pub fn eliminate_all(&mut self, grid: &mut Grid) -> usize {
        let clusters = std::mem::take(&mut self.clusters);
        clusters
            .iter()
            .map(|c| self.eliminate_pixels(grid, &c.pixels))
            .sum()
    }
}

fn flood_fill(
    grid: &Grid,
    visited: &mut [bool],
    queue: &mut VecDeque<(i32, i32)>,
    sx: i32,
    sy: i32,
    color: PixelColor,
) -> Cluster {
    let (w, _) = grid.pixel_dims();
    let last_col = w as i32 - 1;
    let mut cluster = Cluster {
        color,
        pixels: Vec::new(),
        touches_left: false,
        touches_right: false,
    };

    queue.clear();
    visited[sy as usize * w + sx as usize] = true;
    queue.push_back((sx, sy));

    while let Some((x, y)) = queue.pop_front() {
        if let Some(id) = grid.get_pixel(x, y) {
            cluster.pixels.push(id);
        }
        cluster.touches_left |= x == 0;
        cluster.touches_right |= x == last_col;

        for (dx, dy) in NEIGHBOURS_4 {
            let (nx, ny) = (x + dx, y + dy);
            if !grid.is_valid_pixel_position(nx, ny) {
                continue;
            }
            let offset = ny as usize * w + nx as usize;
            if visited[offset] || grid.color_at(nx, ny) != Some(color) {
                continue;
            }
            visited[offset] = true;
            queue.push_back((nx, ny));
        }
    }
    cluster
}
