use cabin_core::{BookingRef, FareClass, Seat};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionMessage {
    pub seat: String,
    pub selected: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingMessage {
    /// `None` when no selected seat was still free.
    pub reference: Option<BookingRef>,
    pub booked: Vec<String>,
    pub skipped: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeMessage {
    pub freed: Vec<String>,
    pub skipped: Vec<String>,
    /// Bookings whose last seat was freed and whose record was deleted.
    pub closed_bookings: Vec<BookingRef>,
    pub message: String,
}

/// One row of the seat export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatRecord {
    pub label: String,
    pub row: char,
    pub column: u16,
    pub status: char,
    pub fare_class: FareClass,
    pub reference: String,
}

impl From<&Seat> for SeatRecord {
    fn from(seat: &Seat) -> Self {
        Self {
            label: seat.label(),
            row: seat.position.row,
            column: seat.position.column,
            status: seat.status.code(),
            fare_class: seat.fare_class,
            reference: seat
                .status
                .reference()
                .map(|r| r.to_string())
                .unwrap_or_default(),
        }
    }
}
