//! Dual-resolution board: a fine pixel grid owning every unit, plus the coarse logical view
//! used for piece placement.
//!
//! Units live in an arena addressed by [`PixelId`]. Grid cells and the physics active set
//! both store handles, so a moved or deleted unit can never leave a dangling reference:
//! a handle to a freed slot simply resolves to `None`.

use crate::color::PixelColor;
use serde::{Deserialize, Serialize};

/// Fine cells per logical cell along each axis.
pub const DEFAULT_RATIO: usize = 10;

/// Placement event that created a unit. [`GroupId::LAYOUT`] marks pre-seeded layout units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

impl GroupId {
    pub const LAYOUT: Self = Self(0);

    pub const fn is_layout(self) -> bool {
        self.0 == Self::LAYOUT.0
    }
}

/// Stable handle into the unit arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelId {
    index: u32,
    generation: u32,
}

/// One simulated coloured unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
    pub color: PixelColor,
    pub stable: bool,
    pub group: GroupId,
    /// Only meaningful inside a single physics step.
    pub updated_this_frame: bool,
}

impl Pixel {
    /// A fresh, unstable unit. Position is assigned when it is written into a grid.
    pub fn new(color: PixelColor, group: GroupId) -> Self {
        Self {
            x: 0,
            y: 0,
            color,
            stable: false,
            group,
            updated_this_frame: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    pixel: Option<Pixel>,
}

/// Board dimensions in logical cells plus the fine/logical ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub logical_width: usize,
    pub logical_height: usize,
    pub ratio: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            logical_width: 10,
            logical_height: 18,
            ratio: DEFAULT_RATIO,
        }
    }
}

impl BoardConfig {
    pub const fn pixel_width(&self) -> usize {
        self.logical_width * self.ratio
    }

    pub const fn pixel_height(&self) -> usize {
        self.logical_height * self.ratio
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    config: BoardConfig,
    width: usize,
    height: usize,
    /// cells[y * width + x]; y = 0 is the top row.
    cells: Vec<Option<PixelId>>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
    /// Dominant-colour view, rebuilt lazily after any mutation.
    logical: Option<Vec<Option<PixelColor>>>,
}

impl Grid {
    pub fn new(config: BoardConfig) -> Self {
        let (width, height) = (config.pixel_width(), config.pixel_height());
        Self {
            config,
            width,
            height,
            cells: vec![None; width * height],
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            logical: None,
        }
    }

    #[inline]
    pub fn config(&self) -> BoardConfig {
        self.config
    }

    #[inline]
    pub fn ratio(&self) -> usize {
        self.config.ratio
    }

    /// Fine grid dimensions (width, height).
    #[inline]
    pub fn pixel_dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Logical grid dimensions (width, height).
    #[inline]
    pub fn logical_dims(&self) -> (usize, usize) {
        (self.config.logical_width, self.config.logical_height)
    }

    #[inline]
    pub fn is_valid_pixel_position(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    pub fn is_valid_logical_position(&self, lx: i32, ly: i32) -> bool {
        lx >= 0
            && ly >= 0
            && (lx as usize) < self.config.logical_width
            && (ly as usize) < self.config.logical_height
    }

    /// Top-left fine cell of a logical cell.
    #[inline]
    pub fn logical_to_pixel(&self, lx: i32, ly: i32) -> (i32, i32) {
        let r = self.config.ratio as i32;
        (lx * r, ly * r)
    }

    #[inline]
    pub fn pixel_to_logical(&self, x: i32, y: i32) -> (i32, i32) {
        let r = self.config.ratio as i32;
        (x.div_euclid(r), y.div_euclid(r))
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        self.is_valid_pixel_position(x, y)
            .then(|| y as usize * self.width + x as usize)
    }

    /// Handle of the unit at (x, y); out-of-range reads are empty.
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<PixelId> {
        self.offset(x, y).and_then(|i| self.cells[i])
    }

    #[inline]
    pub fn is_empty_at(&self, x: i32, y: i32) -> bool {
        self.is_valid_pixel_position(x, y) && self.get_pixel(x, y).is_none()
    }

    /// Write a new unit at (x, y) or clear the cell. Any previous occupant is freed.
    /// Out-of-range writes are no-ops. Returns the handle of the written unit.
    pub fn set_pixel(&mut self, x: i32, y: i32, pixel: Option<Pixel>) -> Option<PixelId> {
        let offset = self.offset(x, y)?;
        if let Some(old) = self.cells[offset].take() {
            self.free_slot(old);
        }
        self.logical = None;
        let mut pixel = pixel?;
        pixel.x = x;
        pixel.y = y;
        let id = self.alloc(pixel);
        self.cells[offset] = Some(id);
        Some(id)
    }

    pub fn pixel(&self, id: PixelId) -> Option<&Pixel> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.pixel.as_ref())
    }

    pub fn pixel_mut(&mut self, id: PixelId) -> Option<&mut Pixel> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.pixel.as_mut())
    }

    pub fn contains(&self, id: PixelId) -> bool {
        self.pixel(id).is_some()
    }

    /// Transfer a unit to an empty in-range cell. Returns false (and changes nothing) otherwise.
    pub fn move_pixel(&mut self, id: PixelId, x: i32, y: i32) -> bool {
        let Some(to) = self.offset(x, y) else {
            return false;
        };
        if self.cells[to].is_some() {
            return false;
        }
        let Some((ox, oy)) = self.pixel(id).map(|p| (p.x, p.y)) else {
            return false;
        };
        if let Some(from) = self.offset(ox, oy) {
            if self.cells[from] == Some(id) {
                self.cells[from] = None;
            }
        }
        self.cells[to] = Some(id);
        if let Some(p) = self.pixel_mut(id) {
            p.x = x;
            p.y = y;
        }
        self.logical = None;
        true
    }

    /// Remove a unit if the grid cell it records still holds it.
    pub fn remove_pixel(&mut self, id: PixelId) -> Option<Pixel> {
        let (x, y) = self.pixel(id).map(|p| (p.x, p.y))?;
        let offset = self.offset(x, y)?;
        if self.cells[offset] != Some(id) {
            return None;
        }
        self.cells[offset] = None;
        self.logical = None;
        self.free_slot(id)
    }

    fn alloc(&mut self, pixel: Pixel) -> PixelId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.pixel = Some(pixel);
            return PixelId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            pixel: Some(pixel),
        });
        PixelId {
            index,
            generation: 0,
        }
    }

    fn free_slot(&mut self, id: PixelId) -> Option<Pixel> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let pixel = slot.pixel.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(pixel)
    }

    /// Number of occupied fine cells.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.len
    }

    /// Every live unit with its handle, in arena order.
    pub fn pixels(&self) -> impl Iterator<Item = (PixelId, &Pixel)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.pixel.as_ref().map(|p| {
                (
                    PixelId {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    p,
                )
            })
        })
    }

    /// Handles of every occupied cell.
    pub fn all_pixels(&self) -> Vec<PixelId> {
        self.pixels().map(|(id, _)| id).collect()
    }

    /// Colour at (x, y), if occupied.
    #[inline]
    pub fn color_at(&self, x: i32, y: i32) -> Option<PixelColor> {
        self.get_pixel(x, y)
            .and_then(|id| self.pixel(id))
            .map(|p| p.color)
    }

    /// Strict placement test: true only if the whole ratio×ratio block is empty.
    pub fn is_logical_cell_empty(&self, lx: i32, ly: i32) -> bool {
        if !self.is_valid_logical_position(lx, ly) {
            return false;
        }
        let (x0, y0) = self.logical_to_pixel(lx, ly);
        let r = self.config.ratio as i32;
        (y0..y0 + r).all(|y| (x0..x0 + r).all(|x| self.get_pixel(x, y).is_none()))
    }

    /// Recompute (if stale) and return the dominant-colour logical view, row-major.
    /// Display only: placement legality goes through [`Grid::is_logical_cell_empty`].
    pub fn build_logical_grid(&mut self) -> &[Option<PixelColor>] {
        if self.logical.is_none() {
            let (lw, lh) = self.logical_dims();
            let mut view = Vec::with_capacity(lw * lh);
            for ly in 0..lh as i32 {
                for lx in 0..lw as i32 {
                    view.push(self.sample_block(lx, ly));
                }
            }
            self.logical = Some(view);
        }
        self.logical.as_deref().unwrap_or(&[])
    }

    /// Dominant colour of one logical cell; ties go to the lower colour index.
    pub fn sample_block(&self, lx: i32, ly: i32) -> Option<PixelColor> {
        let mut counts = [0u32; PixelColor::COUNT];
        let (x0, y0) = self.logical_to_pixel(lx, ly);
        let r = self.config.ratio as i32;
        for y in y0..y0 + r {
            for x in x0..x0 + r {
                if let Some(c) = self.color_at(x, y) {
                    counts[c.index() as usize] += 1;
                }
            }
        }
        let (best, &n) = counts
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|&(_, n)| *n)?;
        if n == 0 {
            return None;
        }
        PixelColor::from_index(best as u8)
    }

    /// Free every unit. Slots are kept so handles from before the clear stay dead.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.pixel.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.cells.fill(None);
        self.len = 0;
        self.logical = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Grid {
        Grid::new(BoardConfig {
            logical_width: 3,
            logical_height: 2,
            ratio: 4,
        })
    }

    fn sand(c: PixelColor) -> Option<Pixel> {
        Some(Pixel::new(c, GroupId(1)))
    }

    #[test]
    fn test_dims() {
        let g = small();
        assert_eq!(g.pixel_dims(), (12, 8));
        assert_eq!(g.logical_dims(), (3, 2));
    }

    #[test]
    fn test_out_of_bounds_read_and_write() {
        let mut g = small();
        assert_eq!(g.get_pixel(-1, 0), None);
        assert_eq!(g.get_pixel(12, 0), None);
        assert_eq!(g.set_pixel(0, 8, sand(PixelColor::Red)), None);
        assert_eq!(g.set_pixel(-3, -3, sand(PixelColor::Red)), None);
        assert_eq!(g.pixel_count(), 0);
    }

    #[test]
    fn test_set_records_position() {
        let mut g = small();
        let id = g.set_pixel(5, 6, sand(PixelColor::Blue)).unwrap();
        let p = g.pixel(id).unwrap();
        assert_eq!((p.x, p.y), (5, 6));
        assert_eq!(g.get_pixel(5, 6), Some(id));
    }

    #[test]
    fn test_overwrite_frees_previous_unit() {
        let mut g = small();
        let a = g.set_pixel(1, 1, sand(PixelColor::Red)).unwrap();
        let b = g.set_pixel(1, 1, sand(PixelColor::Green)).unwrap();
        assert!(!g.contains(a));
        assert!(g.contains(b));
        assert_eq!(g.pixel_count(), 1);
    }

    #[test]
    fn test_stale_handle_after_reuse() {
        let mut g = small();
        let a = g.set_pixel(0, 0, sand(PixelColor::Red)).unwrap();
        g.set_pixel(0, 0, None);
        let b = g.set_pixel(2, 2, sand(PixelColor::Red)).unwrap();
        assert_ne!(a, b);
        assert!(g.pixel(a).is_none());
        assert!(g.pixel(b).is_some());
    }

    #[test]
    fn test_move_transfers_unit() {
        let mut g = small();
        let id = g.set_pixel(3, 3, sand(PixelColor::Yellow)).unwrap();
        assert!(g.move_pixel(id, 3, 4));
        assert_eq!(g.get_pixel(3, 3), None);
        assert_eq!(g.get_pixel(3, 4), Some(id));
        let p = g.pixel(id).unwrap();
        assert_eq!((p.x, p.y), (3, 4));
    }

    #[test]
    fn test_move_into_occupied_or_out_of_range_fails() {
        let mut g = small();
        let a = g.set_pixel(0, 0, sand(PixelColor::Red)).unwrap();
        g.set_pixel(0, 1, sand(PixelColor::Red));
        assert!(!g.move_pixel(a, 0, 1));
        assert!(!g.move_pixel(a, -1, 0));
        assert_eq!(g.get_pixel(0, 0), Some(a));
    }

    #[test]
    fn test_coordinate_conversion() {
        let g = small();
        assert_eq!(g.logical_to_pixel(2, 1), (8, 4));
        assert_eq!(g.pixel_to_logical(11, 7), (2, 1));
        assert_eq!(g.pixel_to_logical(4, 3), (1, 0));
    }

    #[test]
    fn test_logical_emptiness_is_strict() {
        let mut g = small();
        assert!(g.is_logical_cell_empty(1, 1));
        g.set_pixel(7, 7, sand(PixelColor::Red));
        assert!(!g.is_logical_cell_empty(1, 1));
        assert!(g.is_logical_cell_empty(0, 1));
        assert!(!g.is_logical_cell_empty(3, 0));
    }

    #[test]
    fn test_logical_view_dominant_colour() {
        let mut g = small();
        g.set_pixel(0, 0, sand(PixelColor::Red));
        g.set_pixel(1, 0, sand(PixelColor::Blue));
        g.set_pixel(2, 0, sand(PixelColor::Blue));
        // Tie between green (0) and yellow (1) goes to green.
        g.set_pixel(4, 0, sand(PixelColor::Yellow));
        g.set_pixel(5, 0, sand(PixelColor::Green));
        let view = g.build_logical_grid().to_vec();
        assert_eq!(view[0], Some(PixelColor::Blue));
        assert_eq!(view[1], Some(PixelColor::Green));
        assert_eq!(view[2], None);
    }

    #[test]
    fn test_logical_view_refreshes_after_mutation() {
        let mut g = small();
        let id = g.set_pixel(0, 0, sand(PixelColor::Red)).unwrap();
        assert_eq!(g.build_logical_grid()[0], Some(PixelColor::Red));
        g.remove_pixel(id);
        assert_eq!(g.build_logical_grid()[0], None);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut g = small();
        for x in 0..12 {
            g.set_pixel(x, 7, sand(PixelColor::Cyan));
        }
        assert_eq!(g.pixel_count(), 12);
        g.clear();
        assert_eq!(g.pixel_count(), 0);
        assert_eq!(g.all_pixels(), Vec::new());
        assert_eq!(g.get_pixel(0, 7), None);
    }

    #[test]
    fn test_handles_from_before_clear_stay_dead() {
        let mut g = small();
        let old = g.set_pixel(0, 0, sand(PixelColor::Red)).unwrap();
        g.clear();
        let new = g.set_pixel(3, 3, sand(PixelColor::Blue)).unwrap();
        assert_ne!(old, new);
        assert!(g.pixel(old).is_none());
        assert!(!g.contains(old));
        assert_eq!(g.pixel(new).map(|p| (p.x, p.y, p.color)), Some((3, 3, PixelColor::Blue)));
        assert_eq!(g.pixel_count(), 1);
    }
}
