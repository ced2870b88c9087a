use cabin_core::repository::{BookingStore, StoreResult};
use cabin_core::{
    BookingRef, CabinLayout, FareClass, Occupancy, Passenger, ReferenceGenerator,
    ReferenceRegistry, SeatMap, SeatPosition, SeatStatus, SelectionBuffer, Toggle,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{BookingError, BookingResult};
use crate::messages::{BookingMessage, FreeMessage, SeatRecord, SelectionMessage};

/// Orchestrates seat state, the selection buffer, reference issuing and the
/// durable store.
///
/// In-memory state is only touched after the store has committed, so a failed
/// operation leaves seats, references and the selection exactly as they were.
pub struct BookingService {
    seats: SeatMap,
    selection: SelectionBuffer,
    generator: ReferenceGenerator,
    registry: ReferenceRegistry,
    store: Arc<dyn BookingStore>,
}

impl BookingService {
    pub async fn new(layout: CabinLayout, store: Arc<dyn BookingStore>) -> BookingResult<Self> {
        Self::with_generator(layout, store, ReferenceGenerator::new()).await
    }

    /// Build the seat map and replay every stored booking before returning.
    pub async fn with_generator(
        layout: CabinLayout,
        store: Arc<dyn BookingStore>,
        generator: ReferenceGenerator,
    ) -> BookingResult<Self> {
        let seats = SeatMap::initialize(layout)?;
        let mut service = Self {
            seats,
            selection: SelectionBuffer::new(),
            generator,
            registry: ReferenceRegistry::new(),
            store,
        };
        service.replay().await?;
        Ok(service)
    }

    async fn replay(&mut self) -> BookingResult<()> {
        let links = self.store.load_all().await?;
        let mut restored = 0;

        for link in links {
            // Known references block reuse even if their seats are skipped
            self.registry.register(link.reference.clone());
            match self.seats.restore(link.position, link.reference.clone(), link.fare_class) {
                Ok(true) => restored += 1,
                Ok(false) => {}
                Err(err) => warn!(
                    "Skipping stored seat {} for booking {}: {}",
                    link.position, link.reference, err
                ),
            }
        }

        info!(
            "Restored {} reserved seats across {} bookings",
            restored,
            self.registry.len()
        );
        Ok(())
    }

    pub fn select_toggle(&mut self, pos: SeatPosition) -> BookingResult<SelectionMessage> {
        let label = self.seats.label(pos)?;

        match self.selection.toggle(&self.seats, pos)? {
            Toggle::Added => {
                debug!("Selected seat {}", label);
                Ok(SelectionMessage {
                    message: format!("Seat {} selected", label),
                    seat: label,
                    selected: true,
                })
            }
            Toggle::Removed => {
                debug!("Deselected seat {}", label);
                Ok(SelectionMessage {
                    message: format!("Seat {} deselected", label),
                    seat: label,
                    selected: false,
                })
            }
            Toggle::NotSelectable(status) => Err(BookingError::NotSelectable {
                label,
                status: status.name(),
            }),
        }
    }

    /// Book every selected seat that is still free under one new reference.
    pub async fn book_selected(&mut self, passenger: &Passenger) -> BookingResult<BookingMessage> {
        // 1. Validate
        if self.selection.is_empty() {
            return Err(BookingError::NoSeatsSelected);
        }
        let missing = passenger.missing_fields();
        if !missing.is_empty() {
            return Err(BookingError::MissingPassengerInfo(missing));
        }
        let passenger = passenger.normalized();

        // 2. Keep seats that are still free
        let mut to_book: Vec<(SeatPosition, FareClass)> = Vec::new();
        let mut skipped = Vec::new();
        for pos in self.selection.positions() {
            let seat = self.seats.seat_at(pos)?;
            if seat.status == SeatStatus::Free {
                to_book.push((pos, seat.fare_class));
            } else {
                skipped.push(pos.label());
            }
        }

        if to_book.is_empty() {
            warn!("Booking skipped: none of {} selected seats is free", skipped.len());
            self.selection.clear();
            return Ok(BookingMessage {
                reference: None,
                booked: Vec::new(),
                message: format!("No free seats selected; skipped {}", skipped.join(", ")),
                skipped,
            });
        }

        // 3. One reference for the whole group
        let reference = self.generator.next(&mut self.registry)?;

        // 4. Persist header and seat links atomically
        if let Err(err) = self.persist_booking(&reference, &passenger, &to_book).await {
            self.registry.release(&reference);
            error!("Failed to persist booking {}: {}", reference, err);
            return Err(err.into());
        }

        // 5. Apply to memory only after commit
        let mut booked = Vec::with_capacity(to_book.len());
        for (pos, _) in &to_book {
            self.seats.set_status(*pos, SeatStatus::Reserved(reference.clone()))?;
            booked.push(pos.label());
        }
        self.selection.clear();

        info!(
            "Booking {} confirmed for {}: {}",
            reference,
            passenger.full_name(),
            booked.join(", ")
        );

        Ok(BookingMessage {
            message: format!("Booked {} under reference {}", booked.join(", "), reference),
            reference: Some(reference),
            booked,
            skipped,
        })
    }

    async fn persist_booking(
        &self,
        reference: &BookingRef,
        passenger: &Passenger,
        seats: &[(SeatPosition, FareClass)],
    ) -> StoreResult<()> {
        let mut tx = self.store.begin().await?;
        tx.create_booking(reference, passenger).await?;
        for (pos, fare_class) in seats {
            tx.attach_seat(reference, *pos, *fare_class).await?;
        }
        tx.commit().await
    }

    /// Free every selected seat that is reserved, deleting bookings that lose
    /// their last seat in the same unit.
    pub async fn free_selected(&mut self) -> BookingResult<FreeMessage> {
        if self.selection.is_empty() {
            return Err(BookingError::NoSeatsSelected);
        }

        let mut to_free: Vec<(SeatPosition, BookingRef)> = Vec::new();
        let mut skipped = Vec::new();
        for pos in self.selection.positions() {
            match &self.seats.seat_at(pos)?.status {
                SeatStatus::Reserved(reference) => to_free.push((pos, reference.clone())),
                _ => skipped.push(pos.label()),
            }
        }

        if to_free.is_empty() {
            warn!("Free skipped: none of {} selected seats is reserved", skipped.len());
            self.selection.clear();
            return Ok(FreeMessage {
                freed: Vec::new(),
                closed_bookings: Vec::new(),
                message: format!("No reserved seats selected; skipped {}", skipped.join(", ")),
                skipped,
            });
        }

        let closed = match self.persist_release(&to_free).await {
            Ok(closed) => closed,
            Err(err) => {
                error!("Failed to free {} seats: {}", to_free.len(), err);
                return Err(err.into());
            }
        };

        let mut freed = Vec::with_capacity(to_free.len());
        for (pos, _) in &to_free {
            self.seats.set_status(*pos, SeatStatus::Free)?;
            freed.push(pos.label());
        }
        for reference in &closed {
            self.registry.release(reference);
            info!("Booking {} closed: no seats remain", reference);
        }
        self.selection.clear();

        info!("Freed seats {}", freed.join(", "));

        Ok(FreeMessage {
            message: format!("Freed {}", freed.join(", ")),
            freed,
            skipped,
            closed_bookings: closed,
        })
    }

    async fn persist_release(
        &self,
        seats: &[(SeatPosition, BookingRef)],
    ) -> StoreResult<Vec<BookingRef>> {
        let mut tx = self.store.begin().await?;
        for (pos, reference) in seats {
            tx.detach_seat(reference, *pos).await?;
        }

        let touched: BTreeSet<&BookingRef> = seats.iter().map(|(_, r)| r).collect();
        let mut closed = Vec::new();
        for reference in touched {
            if tx.count_seats_for(reference).await? == 0 {
                tx.delete_booking(reference).await?;
                closed.push(reference.clone());
            }
        }

        tx.commit().await?;
        Ok(closed)
    }

    pub async fn status_of(&self, pos: SeatPosition) -> String {
        let seat = match self.seats.seat_at(pos) {
            Ok(seat) => seat,
            Err(_) => return "Invalid seat position".to_string(),
        };
        let label = seat.label();

        let reference = match &seat.status {
            SeatStatus::Reserved(reference) => reference,
            status => return format!("Seat {} is {}", label, status.name()),
        };

        match self.store.find_booking(reference).await {
            Ok(Some(record)) => format!(
                "Seat {} is Reserved (booking {}, {}, passport {})",
                label,
                reference,
                record.passenger.full_name(),
                record.passenger.passport
            ),
            Ok(None) => {
                warn!("Seat {} references unknown booking {}", label, reference);
                format!("Seat {} is Reserved (booking {})", label, reference)
            }
            Err(err) => {
                warn!("Could not resolve booking {} for seat {}: {}", reference, label, err);
                format!("Seat {} is Reserved (booking {})", label, reference)
            }
        }
    }

    /// One record per seat in row-major order.
    pub fn export_dataset(&self) -> Vec<SeatRecord> {
        self.seats.seats().map(SeatRecord::from).collect()
    }

    pub fn selection(&self) -> Vec<String> {
        self.selection.positions().map(|p| p.label()).collect()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn occupancy(&self) -> Occupancy {
        self.seats.occupancy()
    }

    pub fn seat_map(&self) -> &SeatMap {
        &self.seats
    }

    pub fn reference_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_reference_registered(&self, reference: &BookingRef) -> bool {
        self.registry.contains(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cabin_core::repository::{SeatLink, StoreError, StoreTransaction};
    use cabin_core::BookingRecord;
    use cabin_store::InMemoryBookingStore;

    fn pos(label: &str) -> SeatPosition {
        label.parse().unwrap()
    }

    fn passenger() -> Passenger {
        Passenger::new("X1234567", "Ada", "Lovelace")
    }

    async fn service_with(store: Arc<InMemoryBookingStore>) -> BookingService {
        BookingService::new(CabinLayout::default(), store).await.unwrap()
    }

    async fn book(service: &mut BookingService, labels: &[&str]) -> BookingRef {
        for label in labels {
            service.select_toggle(pos(label)).unwrap();
        }
        service.book_selected(&passenger()).await.unwrap().reference.unwrap()
    }

    #[tokio::test]
    async fn test_aisle_and_storage_not_selectable() {
        let mut service = service_with(Arc::new(InMemoryBookingStore::new())).await;
        service.select_toggle(pos("A1")).unwrap();

        for label in ["D1", "D40", "A14", "G76", "C30"] {
            let err = service.select_toggle(pos(label)).unwrap_err();
            assert!(matches!(err, BookingError::NotSelectable { .. }), "{}", label);
        }
        assert_eq!(service.selection(), vec!["A1"]);
    }

    #[tokio::test]
    async fn test_toggle_twice_is_noop() {
        let mut service = service_with(Arc::new(InMemoryBookingStore::new())).await;

        let first = service.select_toggle(pos("B7")).unwrap();
        assert!(first.selected);
        let second = service.select_toggle(pos("B7")).unwrap();
        assert!(!second.selected);
        assert!(service.selection().is_empty());
        assert_eq!(service.status_of(pos("B7")).await, "Seat B7 is Free");
    }

    #[tokio::test]
    async fn test_out_of_range_toggle() {
        let mut service = service_with(Arc::new(InMemoryBookingStore::new())).await;
        assert!(matches!(
            service.select_toggle(pos("H1")),
            Err(BookingError::OutOfRange(_))
        ));
        assert_eq!(service.status_of(pos("A81")).await, "Invalid seat position");
    }

    #[tokio::test]
    async fn test_group_booking_shares_one_reference() {
        let store = Arc::new(InMemoryBookingStore::new());
        let mut service = service_with(store.clone()).await;

        service.select_toggle(pos("A1")).unwrap();
        service.select_toggle(pos("A2")).unwrap();
        let message = service.book_selected(&passenger()).await.unwrap();

        let reference = message.reference.clone().unwrap();
        assert_eq!(message.booked, vec!["A1", "A2"]);
        assert!(service.selection().is_empty());
        assert_eq!(store.booking_count().await, 1);
        assert_eq!(store.count_seats_for(&reference).await.unwrap(), 2);

        for label in ["A1", "A2"] {
            let status = service.status_of(pos(label)).await;
            assert!(status.contains(reference.as_str()), "{}", status);
            assert!(status.contains("Ada Lovelace"));
        }
    }

    #[tokio::test]
    async fn test_freeing_last_seat_deletes_booking() {
        let store = Arc::new(InMemoryBookingStore::new());
        let mut service = service_with(store.clone()).await;
        let reference = book(&mut service, &["A1", "A2"]).await;

        service.select_toggle(pos("A1")).unwrap();
        let freed = service.free_selected().await.unwrap();
        assert_eq!(freed.freed, vec!["A1"]);
        assert!(freed.closed_bookings.is_empty());
        assert!(store.find_booking(&reference).await.unwrap().is_some());
        assert_eq!(store.count_seats_for(&reference).await.unwrap(), 1);
        assert!(service.is_reference_registered(&reference));

        service.select_toggle(pos("A2")).unwrap();
        let freed = service.free_selected().await.unwrap();
        assert_eq!(freed.closed_bookings, vec![reference.clone()]);
        assert!(store.find_booking(&reference).await.unwrap().is_none());
        assert!(!service.is_reference_registered(&reference));

        assert_eq!(service.status_of(pos("A1")).await, "Seat A1 is Free");
        assert_eq!(service.status_of(pos("A2")).await, "Seat A2 is Free");
    }

    #[tokio::test]
    async fn test_free_across_bookings() {
        let store = Arc::new(InMemoryBookingStore::new());
        let mut service = service_with(store.clone()).await;
        let solo = book(&mut service, &["A1"]).await;
        let pair = book(&mut service, &["B1", "B2"]).await;
        assert_ne!(solo, pair);

        service.select_toggle(pos("A1")).unwrap();
        service.select_toggle(pos("B1")).unwrap();
        service.select_toggle(pos("C1")).unwrap();
        let freed = service.free_selected().await.unwrap();

        assert_eq!(freed.freed, vec!["A1", "B1"]);
        assert_eq!(freed.skipped, vec!["C1"]);
        assert_eq!(freed.closed_bookings, vec![solo]);
        assert_eq!(store.count_seats_for(&pair).await.unwrap(), 1);
        assert_eq!(store.booking_count().await, 1);
    }

    #[tokio::test]
    async fn test_booking_skips_seats_no_longer_free() {
        let mut service = service_with(Arc::new(InMemoryBookingStore::new())).await;
        let first = book(&mut service, &["A1"]).await;

        service.select_toggle(pos("A1")).unwrap();
        service.select_toggle(pos("A2")).unwrap();
        let message = service.book_selected(&passenger()).await.unwrap();

        assert_eq!(message.booked, vec!["A2"]);
        assert_eq!(message.skipped, vec!["A1"]);
        assert_ne!(message.reference, Some(first.clone()));
        let a1 = service.seat_map().seat_at(pos("A1")).unwrap();
        assert_eq!(a1.status, SeatStatus::Reserved(first));
    }

    #[tokio::test]
    async fn test_booking_only_reserved_seats_is_noop() {
        let store = Arc::new(InMemoryBookingStore::new());
        let mut service = service_with(store.clone()).await;
        book(&mut service, &["E5"]).await;

        service.select_toggle(pos("E5")).unwrap();
        let message = service.book_selected(&passenger()).await.unwrap();
        assert!(message.reference.is_none());
        assert!(message.booked.is_empty());
        assert!(service.selection().is_empty());
        assert_eq!(store.booking_count().await, 1);
        assert_eq!(service.reference_count(), 1);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let mut service = service_with(Arc::new(InMemoryBookingStore::new())).await;

        assert!(matches!(
            service.book_selected(&passenger()).await,
            Err(BookingError::NoSeatsSelected)
        ));
        assert!(matches!(
            service.free_selected().await,
            Err(BookingError::NoSeatsSelected)
        ));

        service.select_toggle(pos("F3")).unwrap();
        let err = service
            .book_selected(&Passenger::new("", "Ada", " "))
            .await
            .unwrap_err();
        match err {
            BookingError::MissingPassengerInfo(fields) => {
                assert_eq!(fields, vec!["passport", "last_name"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Validation failures keep the selection
        assert_eq!(service.selection(), vec!["F3"]);
    }

    #[tokio::test]
    async fn test_commit_failure_during_booking() {
        let store = Arc::new(InMemoryBookingStore::new());
        let mut service = service_with(store.clone()).await;
        service.select_toggle(pos("B5")).unwrap();

        store.fail_next_commit();
        let err = service.book_selected(&passenger()).await.unwrap_err();
        assert!(matches!(err, BookingError::PersistenceFailure(_)));

        assert_eq!(service.seat_map().seat_at(pos("B5")).unwrap().status, SeatStatus::Free);
        assert_eq!(service.reference_count(), 0);
        assert_eq!(service.selection(), vec!["B5"]);
        assert_eq!(store.booking_count().await, 0);

        // Retry with the kept selection succeeds
        let message = service.book_selected(&passenger()).await.unwrap();
        assert_eq!(message.booked, vec!["B5"]);
        assert_eq!(service.reference_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_during_free() {
        let store = Arc::new(InMemoryBookingStore::new());
        let mut service = service_with(store.clone()).await;
        let reference = book(&mut service, &["C3"]).await;

        service.select_toggle(pos("C3")).unwrap();
        store.fail_next_commit();
        assert!(matches!(
            service.free_selected().await,
            Err(BookingError::PersistenceFailure(_))
        ));

        let seat = service.seat_map().seat_at(pos("C3")).unwrap();
        assert_eq!(seat.status, SeatStatus::Reserved(reference.clone()));
        assert!(service.is_reference_registered(&reference));
        assert_eq!(service.selection(), vec!["C3"]);
        assert_eq!(store.count_seats_for(&reference).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_restart_replays_store() {
        let store = Arc::new(InMemoryBookingStore::new());
        let reference = {
            let mut service = service_with(store.clone()).await;
            book(&mut service, &["B5"]).await
        };

        let service = service_with(store).await;
        let seat = service.seat_map().seat_at(pos("B5")).unwrap();
        assert_eq!(seat.status, SeatStatus::Reserved(reference.clone()));
        assert!(service.is_reference_registered(&reference));

        let status = service.status_of(pos("B5")).await;
        assert!(status.contains("Ada Lovelace"));
        assert!(status.contains("X1234567"));
    }

    #[tokio::test]
    async fn test_exhausted_generator_surfaces_error() {
        let generator = ReferenceGenerator::with_alphabet("Q", 1);
        let store = Arc::new(InMemoryBookingStore::new());
        let mut service = BookingService::with_generator(CabinLayout::default(), store, generator)
            .await
            .unwrap();

        let only = book(&mut service, &["A1"]).await;
        assert_eq!(only.as_str(), "Q");

        service.select_toggle(pos("A2")).unwrap();
        let err = service.book_selected(&passenger()).await.unwrap_err();
        assert!(matches!(err, BookingError::ReferenceSpaceExhausted(_)));
        assert_eq!(service.seat_map().seat_at(pos("A2")).unwrap().status, SeatStatus::Free);
        assert_eq!(service.selection(), vec!["A2"]);
    }

    #[tokio::test]
    async fn test_export_dataset() {
        let mut service = service_with(Arc::new(InMemoryBookingStore::new())).await;
        let reference = book(&mut service, &["A1"]).await;

        let records = service.export_dataset();
        assert_eq!(records.len(), 7 * 80);

        let a1 = &records[0];
        assert_eq!(a1.label, "A1");
        assert_eq!(a1.row, 'A');
        assert_eq!(a1.column, 1);
        assert_eq!(a1.status, 'R');
        assert_eq!(a1.fare_class, FareClass::First);
        assert_eq!(a1.reference, reference.to_string());

        let a2 = &records[1];
        assert_eq!(a2.status, 'F');
        assert!(a2.reference.is_empty());

        let d1 = records.iter().find(|r| r.label == "D1").unwrap();
        assert_eq!(d1.status, 'X');
        let a14 = records.iter().find(|r| r.label == "A14").unwrap();
        assert_eq!(a14.status, 'S');
        assert_eq!(a14.fare_class, FareClass::Economy);
    }

    /// Store whose seat links point at a booking header it cannot find.
    struct DivergentStore;

    #[async_trait]
    impl BookingStore for DivergentStore {
        async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
            Err(StoreError::backend("read-only"))
        }

        async fn find_booking(&self, _reference: &BookingRef) -> StoreResult<Option<BookingRecord>> {
            Ok(None)
        }

        async fn count_seats_for(&self, _reference: &BookingRef) -> StoreResult<usize> {
            Ok(1)
        }

        async fn load_all(&self) -> StoreResult<Vec<SeatLink>> {
            Ok(vec![SeatLink {
                reference: BookingRef::new("GHOST001"),
                position: SeatPosition::new('G', 20),
                fare_class: FareClass::Economy,
            }])
        }
    }

    #[tokio::test]
    async fn test_status_of_unresolved_reference() {
        let mut service = BookingService::new(CabinLayout::default(), Arc::new(DivergentStore))
            .await
            .unwrap();

        assert_eq!(
            service.status_of(pos("G20")).await,
            "Seat G20 is Reserved (booking GHOST001)"
        );

        // A store that cannot open a unit reports a persistence failure
        service.select_toggle(pos("G21")).unwrap();
        let err = service.book_selected(&passenger()).await.unwrap_err();
        assert!(matches!(err, BookingError::PersistenceFailure(_)));
        assert_eq!(service.reference_count(), 1);
    }
}
