use std::sync::Arc;
use cabin_booking::BookingService;
use tokio::sync::Mutex;

/// One booking session; the mutex serialises every request through it.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Mutex<BookingService>>,
}

impl AppState {
    pub fn new(service: BookingService) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
        }
    }
}
