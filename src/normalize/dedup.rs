use crate::ScrapeError;
use std::collections::HashSet;

/// Tracks which listing identifiers have already been emitted
///
/// Owned by a single aggregator per run, so no locking is needed.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    skipped: u64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims an identifier for emission
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - First time this identifier is seen; emit the record
    /// * `Ok(false)` - Already emitted; drop the record
    /// * `Err(ScrapeError::InvalidListing)` - Identifier is empty
    pub fn admit(&mut self, id: &str) -> Result<bool, ScrapeError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ScrapeError::InvalidListing(
                "listing identifier is empty".to_string(),
            ));
        }

        if self.seen.insert(id.to_string()) {
            Ok(true)
        } else {
            self.skipped += 1;
            Ok(false)
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id.trim())
    }

    /// Number of unique identifiers admitted
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Number of duplicates dropped
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
