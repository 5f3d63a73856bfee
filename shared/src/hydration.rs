//! Background tag hydration for one load.
//!
//! Every image's metadata is looked up through the cache; tags are applied
//! to the gallery in one go once the last lookup has settled. An image whose
//! lookup fails simply stays untagged. A newer load replaces the whole
//! hydration, so answers meant for an older one find nothing pending here.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::capabilities::MetadataResult;
use crate::metadata_cache::{Lookup, MetadataCache};
use crate::model::TagRecord;
use crate::normalize::extract_tags;

#[derive(Debug, Default)]
pub struct Hydration {
    tags: HashMap<String, Vec<TagRecord>>,
    pending: HashSet<String>,
    failed: usize,
}

impl Hydration {
    /// Returns the hydration plus the addresses the shell must be asked for.
    /// Addresses already memoized are tagged straight away; ones somebody else
    /// is fetching are waited on without a second request.
    pub fn start(
        addresses: impl IntoIterator<Item = String>,
        cache: &mut MetadataCache,
    ) -> (Self, Vec<String>) {
        let mut hydration = Self::default();
        let mut to_fetch = Vec::new();

        for address in addresses {
            if hydration.tags.contains_key(&address) || hydration.pending.contains(&address) {
                continue;
            }
            match cache.lookup(&address) {
                Lookup::Ready(record) => {
                    hydration.tags.insert(address, extract_tags(&record));
                }
                Lookup::Fetch => {
                    hydration.pending.insert(address.clone());
                    to_fetch.push(address);
                }
                Lookup::InFlight => {
                    hydration.pending.insert(address);
                }
                Lookup::Unavailable => hydration.failed += 1,
            }
        }

        debug!(pending = hydration.pending.len(), fetch = to_fetch.len(), "hydration started");
        (hydration, to_fetch)
    }

    /// Lands one answer. Returns whether it was for this hydration.
    pub fn settle(&mut self, address: &str, result: &MetadataResult) -> bool {
        if !self.pending.remove(address) {
            return false;
        }
        match result {
            Ok(record) => {
                self.tags.insert(address.to_string(), extract_tags(record));
            }
            Err(e) => {
                debug!(address, error = %e, "no tags for image");
                self.failed += 1;
            }
        }
        if self.is_complete() {
            info!(tagged = self.tags.len(), failed = self.failed, "hydration finished");
        }
        true
    }

    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Tags per image address, for every lookup that succeeded.
    pub fn into_tags(self) -> HashMap<String, Vec<TagRecord>> {
        self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{MetadataError, MetadataRecord, MetadataValue};

    fn addresses(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    fn keywords(text: &str) -> MetadataResult {
        Ok(MetadataRecord::new().with("Keywords", MetadataValue::text(text)))
    }

    #[test]
    fn failed_images_stay_untagged() {
        let mut cache = MetadataCache::new(true);
        let (mut hydration, to_fetch) =
            Hydration::start(addresses(&["images/a.jpg", "images/broken.jpg"]), &mut cache);
        assert_eq!(to_fetch, addresses(&["images/a.jpg", "images/broken.jpg"]));

        assert!(hydration.settle("images/a.jpg", &keywords("Sea; Sky")));
        assert!(!hydration.is_complete());
        let failure = Err(MetadataError::lookup_failed("images/broken.jpg", "truncated file"));
        assert!(hydration.settle("images/broken.jpg", &failure));

        assert!(hydration.is_complete());
        assert_eq!(hydration.failed(), 1);
        let tags = hydration.into_tags();
        assert_eq!(tags["images/a.jpg"].len(), 2);
        assert!(!tags.contains_key("images/broken.jpg"));
    }

    #[test]
    fn memoized_and_in_flight_lookups_are_not_requested_again() {
        let mut cache = MetadataCache::new(true);
        cache.lookup("images/a.jpg");
        cache.settle("images/a.jpg", &keywords("Sea"));
        cache.lookup("images/b.jpg");

        let (hydration, to_fetch) = Hydration::start(
            addresses(&["images/a.jpg", "images/b.jpg", "images/c.jpg", "images/c.jpg"]),
            &mut cache,
        );
        assert_eq!(to_fetch, addresses(&["images/c.jpg"]));
        assert_eq!(hydration.pending_len(), 2);
    }

    #[test]
    fn answers_for_unknown_addresses_are_ignored() {
        let mut cache = MetadataCache::new(true);
        let (mut hydration, _) = Hydration::start(addresses(&["images/a.jpg"]), &mut cache);
        assert!(!hydration.settle("images/old.jpg", &keywords("Sea")));
        assert_eq!(hydration.pending_len(), 1);
    }

    #[test]
    fn fully_memoized_collection_is_complete_at_once() {
        let mut cache = MetadataCache::new(true);
        cache.lookup("images/a.jpg");
        cache.settle("images/a.jpg", &keywords("Sea"));
        let (hydration, to_fetch) = Hydration::start(addresses(&["images/a.jpg"]), &mut cache);
        assert!(to_fetch.is_empty());
        assert!(hydration.is_complete());
    }
}
