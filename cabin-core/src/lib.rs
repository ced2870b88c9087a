pub mod seat;
pub mod seat_map;
pub mod selection;
pub mod reference;
pub mod passenger;
pub mod repository;

pub use seat::{FareClass, Seat, SeatPosition, SeatStatus};
pub use seat_map::{CabinLayout, Occupancy, SeatMap};
pub use selection::{SelectionBuffer, Toggle};
pub use reference::{BookingRef, ReferenceGenerator, ReferenceRegistry};
pub use passenger::{BookingRecord, Passenger};
pub use repository::{BookingStore, SeatLink, StoreError, StoreResult, StoreTransaction};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Seat position out of range: {0}")]
    OutOfRange(String),
    #[error("Invalid seat label: {0}")]
    InvalidLabel(String),
    #[error("Invalid cabin layout: {0}")]
    InvalidLayout(String),
    #[error("Reference space exhausted after {attempts} attempts ({registered} references registered)")]
    ReferenceSpaceExhausted {
        attempts: u32,
        registered: usize,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
