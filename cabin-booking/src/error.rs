use cabin_core::{BookingRef, CoreError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid seat position: {0}")]
    OutOfRange(String),

    #[error("Seat {} is {} and cannot be selected", .label, article(.status))]
    NotSelectable {
        label: String,
        status: &'static str,
    },

    #[error("No seats selected")]
    NoSeatsSelected,

    #[error("Missing passenger information: {}", .0.join(", "))]
    MissingPassengerInfo(Vec<&'static str>),

    #[error("Duplicate booking reference: {0}")]
    DuplicateReference(BookingRef),

    #[error("{0}")]
    ReferenceSpaceExhausted(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Invalid cabin layout: {0}")]
    InvalidLayout(String),
}

fn article(status: &str) -> String {
    match status {
        "Aisle" => "an aisle".to_string(),
        "Storage" => "a storage area".to_string(),
        other => other.to_lowercase(),
    }
}

impl BookingError {
    /// Validation failures the user can correct and retry.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BookingError::OutOfRange(_)
                | BookingError::NotSelectable { .. }
                | BookingError::NoSeatsSelected
                | BookingError::MissingPassengerInfo(_)
        )
    }
}

impl From<CoreError> for BookingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OutOfRange(label) | CoreError::InvalidLabel(label) => {
                BookingError::OutOfRange(label)
            }
            CoreError::InvalidLayout(msg) => BookingError::InvalidLayout(msg),
            exhausted @ CoreError::ReferenceSpaceExhausted { .. } => {
                BookingError::ReferenceSpaceExhausted(exhausted.to_string())
            }
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateReference(reference) => BookingError::DuplicateReference(reference),
            StoreError::Backend(inner) => BookingError::PersistenceFailure(inner.to_string()),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
