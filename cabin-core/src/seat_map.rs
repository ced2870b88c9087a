use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::reference::BookingRef;
use crate::seat::{FareClass, Seat, SeatPosition, SeatStatus};
use crate::{CoreError, CoreResult};

/// Fixed cabin topology. Columns are 1-based throughout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CabinLayout {
    pub row_labels: String,
    pub columns: u16,
    #[serde(default)]
    pub aisle_rows: String,
    #[serde(default)]
    pub storage_columns: Vec<u16>,
    /// Seats in columns strictly below this limit are First class.
    #[serde(default)]
    pub first_class_column_limit: u16,
}

impl Default for CabinLayout {
    fn default() -> Self {
        Self {
            row_labels: "ABCDEFG".to_string(),
            columns: 80,
            aisle_rows: "D".to_string(),
            storage_columns: vec![14, 15, 16, 29, 30, 31, 44, 45, 46, 59, 60, 61, 74, 75, 76],
            first_class_column_limit: 14,
        }
    }
}

impl CabinLayout {
    pub fn rows(&self) -> Vec<char> {
        self.row_labels
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    fn aisles(&self) -> Vec<char> {
        self.aisle_rows
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    pub fn validate(&self) -> CoreResult<()> {
        let rows = self.rows();
        if rows.is_empty() {
            return Err(CoreError::InvalidLayout("no rows configured".to_string()));
        }
        if self.columns == 0 {
            return Err(CoreError::InvalidLayout("no columns configured".to_string()));
        }
        for (i, row) in rows.iter().enumerate() {
            if !row.is_ascii_alphabetic() {
                return Err(CoreError::InvalidLayout(format!("row label '{}' is not a letter", row)));
            }
            if rows[..i].contains(row) {
                return Err(CoreError::InvalidLayout(format!("duplicate row label '{}'", row)));
            }
        }
        if let Some(aisle) = self.aisles().into_iter().find(|a| !rows.contains(a)) {
            return Err(CoreError::InvalidLayout(format!("aisle row '{}' is not a cabin row", aisle)));
        }
        if let Some(col) = self
            .storage_columns
            .iter()
            .find(|c| **c == 0 || **c > self.columns)
        {
            return Err(CoreError::InvalidLayout(format!(
                "storage column {} outside 1..={}",
                col, self.columns
            )));
        }
        Ok(())
    }
}

/// Seat counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    pub free: usize,
    pub reserved: usize,
    pub aisle: usize,
    pub storage: usize,
}

/// The cabin grid. Pure state; all mutations come from the booking service.
#[derive(Debug, Clone)]
pub struct SeatMap {
    layout: CabinLayout,
    rows: Vec<char>,
    seats: Vec<Seat>,
}

impl SeatMap {
    /// Build the grid: everything Free/Economy, then aisles, then storage
    /// (aisle rows excluded), then First class on the remaining passenger seats.
    pub fn initialize(layout: CabinLayout) -> CoreResult<Self> {
        layout.validate()?;

        let rows = layout.rows();
        let mut seats = Vec::with_capacity(rows.len() * layout.columns as usize);
        for row in &rows {
            for column in 1..=layout.columns {
                seats.push(Seat {
                    position: SeatPosition::new(*row, column),
                    status: SeatStatus::Free,
                    fare_class: FareClass::Economy,
                });
            }
        }

        let aisles = layout.aisles();
        for seat in seats.iter_mut() {
            if aisles.contains(&seat.position.row) {
                seat.status = SeatStatus::Aisle;
            }
        }

        for seat in seats.iter_mut() {
            if !aisles.contains(&seat.position.row)
                && layout.storage_columns.contains(&seat.position.column)
            {
                seat.status = SeatStatus::Storage;
            }
        }

        for seat in seats.iter_mut() {
            if seat.status.is_selectable() && seat.position.column < layout.first_class_column_limit {
                seat.fare_class = FareClass::First;
            }
        }

        Ok(Self {
            layout,
            rows,
            seats,
        })
    }

    pub fn layout(&self) -> &CabinLayout {
        &self.layout
    }

    pub fn row_labels(&self) -> &[char] {
        &self.rows
    }

    pub fn columns(&self) -> u16 {
        self.layout.columns
    }

    fn index_of(&self, pos: SeatPosition) -> CoreResult<usize> {
        let row = self
            .rows
            .iter()
            .position(|r| *r == pos.row.to_ascii_uppercase())
            .ok_or_else(|| CoreError::OutOfRange(pos.label()))?;
        if pos.column == 0 || pos.column > self.layout.columns {
            return Err(CoreError::OutOfRange(pos.label()));
        }
        Ok(row * self.layout.columns as usize + (pos.column as usize - 1))
    }

    pub fn contains(&self, pos: SeatPosition) -> bool {
        self.index_of(pos).is_ok()
    }

    pub fn seat_at(&self, pos: SeatPosition) -> CoreResult<&Seat> {
        let idx = self.index_of(pos)?;
        Ok(&self.seats[idx])
    }

    /// Unconditional write; callers validate the transition.
    pub fn set_status(&mut self, pos: SeatPosition, status: SeatStatus) -> CoreResult<()> {
        let idx = self.index_of(pos)?;
        self.seats[idx].status = status;
        Ok(())
    }

    pub fn label(&self, pos: SeatPosition) -> CoreResult<String> {
        self.index_of(pos)?;
        Ok(pos.label())
    }

    /// Replay a persisted reservation. The stored fare class wins over the
    /// position-derived one. Returns `false` when the seat is not a passenger
    /// seat and the record was ignored.
    pub fn restore(
        &mut self,
        pos: SeatPosition,
        reference: BookingRef,
        fare_class: FareClass,
    ) -> CoreResult<bool> {
        let idx = self.index_of(pos)?;
        let seat = &mut self.seats[idx];

        if !seat.status.is_selectable() {
            warn!(
                "Ignoring stored booking {} for seat {}: seat is {}",
                reference,
                pos,
                seat.status.name()
            );
            return Ok(false);
        }
        if let SeatStatus::Reserved(existing) = &seat.status {
            if *existing != reference {
                warn!(
                    "Seat {} stored under both {} and {}; keeping {}",
                    pos, existing, reference, reference
                );
            }
        }
        if seat.fare_class != fare_class {
            warn!(
                "Seat {} stored as {} but layout says {}; using stored value",
                pos, fare_class, seat.fare_class
            );
            seat.fare_class = fare_class;
        }

        seat.status = SeatStatus::Reserved(reference);
        Ok(true)
    }

    /// Seats in row-major order.
    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter()
    }

    pub fn occupancy(&self) -> Occupancy {
        let mut counts = Occupancy::default();
        for seat in &self.seats {
            match seat.status {
                SeatStatus::Free => counts.free += 1,
                SeatStatus::Reserved(_) => counts.reserved += 1,
                SeatStatus::Aisle => counts.aisle += 1,
                SeatStatus::Storage => counts.storage += 1,
            }
        }
        counts
    }
}
