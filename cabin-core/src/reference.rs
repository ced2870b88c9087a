use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::{CoreError, CoreResult};

pub const REFERENCE_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const REFERENCE_LENGTH: usize = 8;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100_000;

/// Booking reference shared by every seat booked in one operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingRef(String);

impl BookingRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// References currently in use, persisted or in-memory.
#[derive(Debug, Default, Clone)]
pub struct ReferenceRegistry {
    issued: HashSet<BookingRef>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the reference was already known.
    pub fn register(&mut self, reference: BookingRef) -> bool {
        self.issued.insert(reference)
    }

    pub fn release(&mut self, reference: &BookingRef) -> bool {
        self.issued.remove(reference)
    }

    pub fn contains(&self, reference: &BookingRef) -> bool {
        self.issued.contains(reference)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

/// Random, fixed-length reference generator with a bounded retry loop.
#[derive(Debug, Clone)]
pub struct ReferenceGenerator {
    alphabet: Vec<char>,
    length: usize,
    max_attempts: u32,
}

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self::with_alphabet(REFERENCE_ALPHABET, REFERENCE_LENGTH)
    }

    pub fn with_alphabet(alphabet: &str, length: usize) -> Self {
        let mut chars: Vec<char> = Vec::new();
        for c in alphabet.chars() {
            if !chars.contains(&c) {
                chars.push(c);
            }
        }

        Self {
            alphabet: chars,
            length,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Number of distinct references, `None` when it overflows `u64`.
    pub fn space_size(&self) -> Option<u64> {
        let length = u32::try_from(self.length).ok()?;
        (self.alphabet.len() as u64).checked_pow(length)
    }

    pub fn next(&self, registry: &mut ReferenceRegistry) -> CoreResult<BookingRef> {
        self.next_with_rng(registry, &mut rand::thread_rng())
    }

    /// Sample until a reference absent from `registry` is found, then register it.
    pub fn next_with_rng<R: Rng + ?Sized>(
        &self,
        registry: &mut ReferenceRegistry,
        rng: &mut R,
    ) -> CoreResult<BookingRef> {
        if let Some(size) = self.space_size() {
            if registry.len() as u64 >= size {
                return Err(CoreError::ReferenceSpaceExhausted {
                    attempts: 0,
                    registered: registry.len(),
                });
            }
        }

        for _ in 0..self.max_attempts {
            let candidate = BookingRef::new(self.sample(rng));
            if !registry.contains(&candidate) {
                registry.register(candidate.clone());
                return Ok(candidate);
            }
        }

        tracing::warn!(
            "Reference generation gave up after {} attempts with {} references registered",
            self.max_attempts,
            registry.len()
        );
        Err(CoreError::ReferenceSpaceExhausted {
            attempts: self.max_attempts,
            registered: registry.len(),
        })
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        (0..self.length)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
            .collect()
    }
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_reference_shape() {
        let generator = ReferenceGenerator::new();
        let mut registry = ReferenceRegistry::new();

        let reference = generator.next(&mut registry).unwrap();
        assert_eq!(reference.as_str().len(), 8);
        assert!(reference
            .as_str()
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert!(registry.contains(&reference));
    }

    #[test]
    fn test_tiny_alphabet_never_duplicates() {
        // 2 letters, length 2: exactly 4 references exist
        let generator = ReferenceGenerator::with_alphabet("AB", 2);
        let mut registry = ReferenceRegistry::new();
        registry.register(BookingRef::new("AA"));
        registry.register(BookingRef::new("AB"));
        registry.register(BookingRef::new("BA"));

        let mut rng = StdRng::seed_from_u64(7);
        let last = generator.next_with_rng(&mut registry, &mut rng).unwrap();
        assert_eq!(last.as_str(), "BB");
        assert_eq!(registry.len(), 4);

        let exhausted = generator.next_with_rng(&mut registry, &mut rng);
        assert!(matches!(
            exhausted,
            Err(CoreError::ReferenceSpaceExhausted { registered: 4, .. })
        ));
    }

    #[test]
    fn test_repeated_generation_is_unique() {
        let generator = ReferenceGenerator::with_alphabet("XYZ", 2);
        let mut registry = ReferenceRegistry::new();
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen = HashSet::new();
        for _ in 0..9 {
            let reference = generator.next_with_rng(&mut registry, &mut rng).unwrap();
            assert!(seen.insert(reference));
        }
        assert!(generator.next_with_rng(&mut registry, &mut rng).is_err());
    }

    #[test]
    fn test_retry_cap_is_honoured() {
        // Space of 2, one taken; a single attempt may miss but must not spin.
        let generator = ReferenceGenerator::with_alphabet("AB", 1).with_max_attempts(1);
        let mut registry = ReferenceRegistry::new();
        registry.register(BookingRef::new("A"));

        let mut rng = StdRng::seed_from_u64(1);
        match generator.next_with_rng(&mut registry, &mut rng) {
            Ok(reference) => assert_eq!(reference.as_str(), "B"),
            Err(err) => assert!(matches!(err, CoreError::ReferenceSpaceExhausted { attempts: 1, .. })),
        }
    }

    #[test]
    fn test_release_shrinks_registry() {
        let mut registry = ReferenceRegistry::new();
        let reference = BookingRef::new("QWERTY12");
        assert!(registry.register(reference.clone()));
        assert!(!registry.register(reference.clone()));
        assert!(registry.release(&reference));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_space_size_overflow() {
        assert_eq!(ReferenceGenerator::new().space_size(), Some(36u64.pow(8)));
        assert_eq!(ReferenceGenerator::with_alphabet(REFERENCE_ALPHABET, 40).space_size(), None);
    }
}
