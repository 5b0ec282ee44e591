//! The next-piece slots the player picks from.

use crate::piece::{Piece, PieceSource};

pub const DEFAULT_SLOT_COUNT: usize = 3;

#[derive(Debug, Clone)]
pub struct PreviewSlots {
    slots: Vec<Option<Piece>>,
    source: PieceSource,
}

impl PreviewSlots {
    /// Fill `count` slots from `source`, in slot order.
    pub fn new(mut source: PieceSource, count: usize) -> Self {
        let slots = (0..count).map(|_| Some(source.next_piece())).collect();
        Self { slots, source }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get_slot(&self, index: usize) -> Option<&Piece> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_slot_mut(&mut self, index: usize) -> Option<&mut Piece> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Put a piece back (e.g. after a failed placement) or empty the slot.
    pub fn set_slot(&mut self, index: usize, piece: Option<Piece>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = piece;
        }
    }

    /// Take the piece out, leaving the slot empty.
    pub fn take_slot(&mut self, index: usize) -> Option<Piece> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Draw a fresh piece into `index` after a successful placement.
    pub fn refill_slot_after_place(&mut self, index: usize) {
        if index < self.slots.len() {
            self.slots[index] = Some(self.source.next_piece());
        }
    }

    /// True iff some occupied slot holds a piece the predicate accepts.
    pub fn has_any_placeable_block<F>(&self, mut can_place: F) -> bool
    where
        F: FnMut(&Piece) -> bool,
    {
        self.slots.iter().flatten().any(|p| can_place(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&Piece>> + '_ {
        self.slots.iter().map(Option::as_ref)
    }

    pub fn source(&self) -> &PieceSource {
        &self.source
    }
}
