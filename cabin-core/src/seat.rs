use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::reference::BookingRef;
use crate::CoreError;

/// A seat coordinate: row letter plus 1-based column, e.g. `B5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatPosition {
    pub row: char,
    pub column: u16,
}

impl SeatPosition {
    pub fn new(row: char, column: u16) -> Self {
        Self {
            row: row.to_ascii_uppercase(),
            column,
        }
    }

    /// Human-readable seat name used in every user-facing message.
    pub fn label(&self) -> String {
        format!("{}{}", self.row, self.column)
    }
}

impl fmt::Display for SeatPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.column)
    }
}

impl FromStr for SeatPosition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let row = chars
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .ok_or_else(|| CoreError::InvalidLabel(s.to_string()))?;
        let column = chars
            .as_str()
            .parse::<u16>()
            .map_err(|_| CoreError::InvalidLabel(s.to_string()))?;

        Ok(Self::new(row, column))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FareClass {
    Economy,
    First,
}

impl FareClass {
    /// Value persisted in `booked_seats.seat_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FareClass::Economy => "economy",
            FareClass::First => "first",
        }
    }
}

impl fmt::Display for FareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FareClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "economy" => Ok(FareClass::Economy),
            "first" => Ok(FareClass::First),
            other => Err(CoreError::InvalidLabel(format!("unknown fare class '{}'", other))),
        }
    }
}

/// Seat state. `Aisle` and `Storage` are fixed by topology and never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatStatus {
    Free,
    Reserved(BookingRef),
    Aisle,
    Storage,
}

impl SeatStatus {
    /// Single-character status code used in exports.
    pub fn code(&self) -> char {
        match self {
            SeatStatus::Free => 'F',
            SeatStatus::Reserved(_) => 'R',
            SeatStatus::Aisle => 'X',
            SeatStatus::Storage => 'S',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeatStatus::Free => "Free",
            SeatStatus::Reserved(_) => "Reserved",
            SeatStatus::Aisle => "Aisle",
            SeatStatus::Storage => "Storage",
        }
    }

    /// Only passenger seats can be staged for book/free.
    pub fn is_selectable(&self) -> bool {
        matches!(self, SeatStatus::Free | SeatStatus::Reserved(_))
    }

    pub fn reference(&self) -> Option<&BookingRef> {
        match self {
            SeatStatus::Reserved(reference) => Some(reference),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub position: SeatPosition,
    pub status: SeatStatus,
    pub fare_class: FareClass,
}

impl Seat {
    pub fn label(&self) -> String {
        self.position.label()
    }
}
