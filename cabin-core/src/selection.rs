use std::collections::BTreeSet;

use crate::seat::{SeatPosition, SeatStatus};
use crate::seat_map::SeatMap;
use crate::CoreResult;

/// Outcome of a selection toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
    /// The seat is an aisle or storage block; nothing changed.
    NotSelectable(SeatStatus),
}

/// Seats staged for the next bulk book/free.
#[derive(Debug, Default, Clone)]
pub struct SelectionBuffer {
    selected: BTreeSet<SeatPosition>,
}

impl SelectionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, map: &SeatMap, pos: SeatPosition) -> CoreResult<Toggle> {
        let seat = map.seat_at(pos)?;
        if !seat.status.is_selectable() {
            return Ok(Toggle::NotSelectable(seat.status.clone()));
        }

        if self.selected.remove(&seat.position) {
            Ok(Toggle::Removed)
        } else {
            self.selected.insert(seat.position);
            Ok(Toggle::Added)
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, pos: SeatPosition) -> bool {
        self.selected.contains(&pos)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = SeatPosition> + '_ {
        self.selected.iter().copied()
    }
}
