use async_trait::async_trait;

use crate::passenger::{BookingRecord, Passenger};
use crate::reference::BookingRef;
use crate::seat::{FareClass, SeatPosition};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Booking reference already exists: {0}")]
    DuplicateReference(BookingRef),
    #[error("Storage backend failure: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StoreError::Backend(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A `booked_seats` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatLink {
    pub reference: BookingRef,
    pub position: SeatPosition,
    pub fare_class: FareClass,
}

/// Durable booking storage.
///
/// Writes only happen inside a [`StoreTransaction`]; a unit dropped without
/// `commit` leaves durable state untouched.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    async fn find_booking(&self, reference: &BookingRef) -> StoreResult<Option<BookingRecord>>;

    async fn count_seats_for(&self, reference: &BookingRef) -> StoreResult<usize>;

    /// Every seat link, used once at startup to rebuild in-memory state.
    async fn load_all(&self) -> StoreResult<Vec<SeatLink>>;
}

/// One atomic unit of writes against a [`BookingStore`].
#[async_trait]
pub trait StoreTransaction: Send {
    async fn create_booking(
        &mut self,
        reference: &BookingRef,
        passenger: &Passenger,
    ) -> StoreResult<()>;

    async fn attach_seat(
        &mut self,
        reference: &BookingRef,
        position: SeatPosition,
        fare_class: FareClass,
    ) -> StoreResult<()>;

    async fn detach_seat(&mut self, reference: &BookingRef, position: SeatPosition) -> StoreResult<()>;

    /// Remaining links for `reference`, including this unit's own writes.
    async fn count_seats_for(&mut self, reference: &BookingRef) -> StoreResult<usize>;

    /// Only valid once `count_seats_for` reports zero.
    async fn delete_booking(&mut self, reference: &BookingRef) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
