use async_trait::async_trait;
use cabin_core::repository::{BookingStore, SeatLink, StoreError, StoreResult, StoreTransaction};
use cabin_core::{BookingRecord, BookingRef, FareClass, Passenger, SeatPosition};
use sqlx::{Sqlite, SqlitePool};
use tracing::warn;

pub struct SqliteBookingStore {
    pool: SqlitePool,
}

impl SqliteBookingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    reference: String,
    passport: String,
    first_name: String,
    last_name: String,
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: i64,
    reference: String,
    seat_row: String,
    seat_column: i64,
    seat_type: String,
}

impl SeatRow {
    fn into_link(self) -> Option<SeatLink> {
        let row = self.seat_row.chars().next()?;
        let column = u16::try_from(self.seat_column).ok()?;
        let fare_class = self.seat_type.parse::<FareClass>().ok()?;
        Some(SeatLink {
            reference: BookingRef::new(self.reference),
            position: SeatPosition::new(row, column),
            fare_class,
        })
    }
}

fn map_insert_error(err: sqlx::Error, reference: &BookingRef) -> StoreError {
    let duplicate = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if duplicate {
        StoreError::DuplicateReference(reference.clone())
    } else {
        StoreError::backend(err)
    }
}

#[async_trait]
impl BookingStore for SqliteBookingStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(StoreError::backend)?;
        Ok(Box::new(SqliteTransaction { tx }))
    }

    async fn find_booking(&self, reference: &BookingRef) -> StoreResult<Option<BookingRecord>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT reference, passport, first_name, last_name FROM bookings WHERE reference = ?",
        )
        .bind(reference.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(row.map(|row| BookingRecord {
            reference: BookingRef::new(row.reference),
            passenger: Passenger::new(row.passport, row.first_name, row.last_name),
        }))
    }

    async fn count_seats_for(&self, reference: &BookingRef) -> StoreResult<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM booked_seats WHERE reference = ?")
            .bind(reference.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(count.max(0) as usize)
    }

    async fn load_all(&self) -> StoreResult<Vec<SeatLink>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, reference, seat_row, seat_column, seat_type FROM booked_seats ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        let mut links = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match row.into_link() {
                Some(link) => links.push(link),
                None => warn!("Skipping malformed booked_seats row {}", id),
            }
        }
        Ok(links)
    }
}

pub struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn create_booking(
        &mut self,
        reference: &BookingRef,
        passenger: &Passenger,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (reference, passport, first_name, last_name)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(reference.as_str())
        .bind(passenger.passport.as_str())
        .bind(passenger.first_name.as_str())
        .bind(passenger.last_name.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_insert_error(e, reference))?;

        Ok(())
    }

    async fn attach_seat(
        &mut self,
        reference: &BookingRef,
        position: SeatPosition,
        fare_class: FareClass,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO booked_seats (reference, seat_row, seat_column, seat_type)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(reference.as_str())
        .bind(position.row.to_string())
        .bind(i64::from(position.column))
        .bind(fare_class.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        Ok(())
    }

    async fn detach_seat(&mut self, reference: &BookingRef, position: SeatPosition) -> StoreResult<()> {
        let result = sqlx::query(
            "DELETE FROM booked_seats WHERE reference = ? AND seat_row = ? AND seat_column = ?",
        )
        .bind(reference.as_str())
        .bind(position.row.to_string())
        .bind(i64::from(position.column))
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            warn!("No stored link for seat {} under booking {}", position, reference);
        }
        Ok(())
    }

    async fn count_seats_for(&mut self, reference: &BookingRef) -> StoreResult<usize> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM booked_seats WHERE reference = ?")
            .bind(reference.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;
        Ok(count.max(0) as usize)
    }

    async fn delete_booking(&mut self, reference: &BookingRef) -> StoreResult<()> {
        sqlx::query("DELETE FROM bookings WHERE reference = ?")
            .bind(reference.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(StoreError::backend)
    }
}
