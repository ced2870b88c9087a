pub mod error;
pub mod messages;
pub mod service;

pub use error::{BookingError, BookingResult};
pub use messages::{BookingMessage, FreeMessage, SeatRecord, SelectionMessage};
pub use service::BookingService;
