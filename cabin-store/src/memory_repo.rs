use async_trait::async_trait;
use cabin_core::repository::{BookingStore, SeatLink, StoreError, StoreResult, StoreTransaction};
use cabin_core::{BookingRecord, BookingRef, FareClass, Passenger, SeatPosition};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone)]
struct MemoryState {
    bookings: HashMap<BookingRef, Passenger>,
    // Insertion order stands in for the autoincrement id
    seats: Vec<SeatLink>,
}

/// In-memory [`BookingStore`] with the same atomic-unit contract as SQLite.
///
/// A transaction works on a private copy of the state and swaps it in on
/// commit. `fail_next_commit` makes the next commit fail without applying.
#[derive(Default)]
pub struct InMemoryBookingStore {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub async fn booking_count(&self) -> usize {
        self.state.lock().await.bookings.len()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let staged = self.state.lock().await.clone();
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            fail_next_commit: Arc::clone(&self.fail_next_commit),
            staged,
        }))
    }

    async fn find_booking(&self, reference: &BookingRef) -> StoreResult<Option<BookingRecord>> {
        let state = self.state.lock().await;
        Ok(state.bookings.get(reference).map(|passenger| BookingRecord {
            reference: reference.clone(),
            passenger: passenger.clone(),
        }))
    }

    async fn count_seats_for(&self, reference: &BookingRef) -> StoreResult<usize> {
        let state = self.state.lock().await;
        Ok(state.seats.iter().filter(|l| &l.reference == reference).count())
    }

    async fn load_all(&self) -> StoreResult<Vec<SeatLink>> {
        Ok(self.state.lock().await.seats.clone())
    }
}

struct MemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
    staged: MemoryState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn create_booking(
        &mut self,
        reference: &BookingRef,
        passenger: &Passenger,
    ) -> StoreResult<()> {
        if self.staged.bookings.contains_key(reference) {
            return Err(StoreError::DuplicateReference(reference.clone()));
        }
        self.staged.bookings.insert(reference.clone(), passenger.clone());
        Ok(())
    }

    async fn attach_seat(
        &mut self,
        reference: &BookingRef,
        position: SeatPosition,
        fare_class: FareClass,
    ) -> StoreResult<()> {
        if !self.staged.bookings.contains_key(reference) {
            return Err(StoreError::backend(format!(
                "foreign key violation: booking {} does not exist",
                reference
            )));
        }
        self.staged.seats.push(SeatLink {
            reference: reference.clone(),
            position,
            fare_class,
        });
        Ok(())
    }

    async fn detach_seat(&mut self, reference: &BookingRef, position: SeatPosition) -> StoreResult<()> {
        self.staged
            .seats
            .retain(|l| !(&l.reference == reference && l.position == position));
        Ok(())
    }

    async fn count_seats_for(&mut self, reference: &BookingRef) -> StoreResult<usize> {
        Ok(self.staged.seats.iter().filter(|l| &l.reference == reference).count())
    }

    async fn delete_booking(&mut self, reference: &BookingRef) -> StoreResult<()> {
        if self.staged.seats.iter().any(|l| &l.reference == reference) {
            return Err(StoreError::backend(format!(
                "foreign key violation: booking {} still has seats",
                reference
            )));
        }
        self.staged.bookings.remove(reference);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::backend("injected commit failure"));
        }
        let MemoryTransaction { state, staged, .. } = *self;
        *state.lock().await = staged;
        Ok(())
    }
}
