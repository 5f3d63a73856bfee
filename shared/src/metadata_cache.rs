use std::collections::HashMap;

use tracing::{debug, warn};

use crate::capabilities::{MetadataRecord, MetadataResult};

#[derive(Debug)]
enum Slot {
    Pending,
    Ready(MetadataRecord),
}

/// What a caller should do about one address.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    Ready(MetadataRecord),
    /// Someone already asked the shell; wait for that answer.
    InFlight,
    /// The slot is now pending and the caller must ask the shell.
    Fetch,
    Unavailable,
}

/// Session-lifetime memo of metadata lookups, keyed by image address.
///
/// At most one extractor request is outstanding per address: the first
/// [`lookup`](Self::lookup) returns [`Lookup::Fetch`] and marks the slot
/// pending, later ones see [`Lookup::InFlight`] until [`settle`](Self::settle)
/// lands the answer. Failures are evicted so a later lookup retries;
/// successes stay.
#[derive(Debug, Default)]
pub struct MetadataCache {
    available: bool,
    entries: HashMap<String, Slot>,
}

impl MetadataCache {
    pub fn new(available: bool) -> Self {
        if !available {
            warn!("metadata extractor unavailable; lookups will short-circuit");
        }
        Self {
            available,
            entries: HashMap::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn lookup(&mut self, address: &str) -> Lookup {
        if !self.available {
            return Lookup::Unavailable;
        }
        match self.entries.get(address) {
            Some(Slot::Ready(record)) => Lookup::Ready(record.clone()),
            Some(Slot::Pending) => Lookup::InFlight,
            None => {
                debug!(address, "extracting metadata");
                self.entries.insert(address.to_string(), Slot::Pending);
                Lookup::Fetch
            }
        }
    }

    /// Lands the shell's answer for `address`.
    pub fn settle(&mut self, address: &str, result: &MetadataResult) {
        match result {
            Ok(record) => {
                self.entries
                    .insert(address.to_string(), Slot::Ready(record.clone()));
            }
            Err(e) => {
                debug!(address, error = %e, "metadata lookup failed; evicting");
                self.entries.remove(address);
            }
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    pub fn is_pending(&self, address: &str) -> bool {
        matches!(self.entries.get(address), Some(Slot::Pending))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
