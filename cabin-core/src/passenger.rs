use serde::{Deserialize, Serialize};

use crate::reference::BookingRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub passport: String,
    pub first_name: String,
    pub last_name: String,
}

impl Passenger {
    pub fn new(
        passport: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            passport: passport.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Names of the fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.passport.trim().is_empty() {
            missing.push("passport");
        }
        if self.first_name.trim().is_empty() {
            missing.push("first_name");
        }
        if self.last_name.trim().is_empty() {
            missing.push("last_name");
        }
        missing
    }

    /// Copy with surrounding whitespace removed, as persisted.
    pub fn normalized(&self) -> Self {
        Self::new(
            self.passport.trim(),
            self.first_name.trim(),
            self.last_name.trim(),
        )
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A `bookings` header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub reference: BookingRef,
    pub passenger: Passenger,
}
