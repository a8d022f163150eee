use crate::db::SeenStore;
use crate::domain::listing::SeenListing;
use crate::errors::{CycleError, ParseErrorKind};
use crate::notify::Notifier;
use crate::scraper::{ListingParser, PageSource};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

/// Outcome of one fetch → parse → dedup → notify pass.
#[derive(Debug, Default)]
pub struct CycleResult {
    /// Listings parsed from the page.
    pub checked: usize,
    /// Listings recorded for the first time this cycle, in page order.
    pub new: Vec<SeenListing>,
    /// How many of `new` could not be delivered. They stay recorded.
    pub notify_failures: usize,
    pub error: Option<CycleError>,
}

impl CycleResult {
    fn failed(err: impl Into<CycleError>) -> Self {
        Self {
            error: Some(err.into()),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct DiscoveryCycle<S, N> {
    source: S,
    parser: ListingParser,
    store: SeenStore,
    notifier: N,
    notify_to: String,
}

impl<S: PageSource, N: Notifier> DiscoveryCycle<S, N> {
    pub fn new(
        source: S,
        parser: ListingParser,
        store: SeenStore,
        notifier: N,
        notify_to: impl Into<String>,
    ) -> Self {
        Self {
            source,
            parser,
            store,
            notifier,
            notify_to: notify_to.into(),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn run(&self, url: &str) -> CycleResult {
        self.run_at(url, Utc::now())
    }

    /// Run one cycle, stamping new listings with `now`. Never panics on upstream
    /// trouble: every failure ends up in `CycleResult::error`.
    pub fn run_at(&self, url: &str, now: DateTime<Utc>) -> CycleResult {
        info!("🔎 checking for new listings");

        let html = match self.source.fetch(url) {
            Ok(html) => html,
            Err(e) => {
                warn!("fetch failed, skipping this cycle: {e}");
                return CycleResult::failed(e);
            }
        };

        let listings = match self.parser.parse(&html) {
            Ok(listings) => listings,
            Err(e) => {
                match e.kind {
                    ParseErrorKind::EmptyResult => info!("no listings on page: {e}"),
                    ParseErrorKind::StructureChanged => warn!("page layout not recognised: {e}"),
                }
                return CycleResult::failed(e);
            }
        };

        let mut result = CycleResult {
            checked: listings.len(),
            ..CycleResult::default()
        };

        // Check and insert one at a time so a listing repeated on the same page
        // is only recorded once.
        for listing in listings {
            match self.store.contains(&listing.id) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    error!("store lookup failed for {}: {e}", listing.id);
                    result.error = Some(e.into());
                    return result;
                }
            }

            match self.store.insert(&listing, now) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    error!("store insert failed for {}: {e}", listing.id);
                    result.error = Some(e.into());
                    return result;
                }
            }

            let seen = SeenListing {
                listing,
                first_seen_at: now,
            };

            if let Err(e) = self.notifier.notify(&seen, &self.notify_to) {
                error!("❌ notification for {} failed, not retrying: {e}", seen.id());
                result.notify_failures += 1;
            }

            result.new.push(seen);
        }

        if result.new.is_empty() {
            info!("no new listings ({} checked)", result.checked);
        } else {
            info!("🏠 {} new listing(s) out of {} checked", result.new.len(), result.checked);
        }

        result
    }
}
