mod brevo;
mod email;

pub use brevo::BrevoMailer;
pub use email::{listing_email, subject_for};

use crate::domain::listing::SeenListing;
use crate::errors::NotifyError;
use tracing::info;

/// Delivers one new listing to a destination. Fire-and-forget from the cycle's
/// point of view: a failure is reported, never retried.
pub trait Notifier {
    fn notify(&self, listing: &SeenListing, to: &str) -> Result<(), NotifyError>;
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn notify(&self, listing: &SeenListing, to: &str) -> Result<(), NotifyError> {
        (**self).notify(listing, to)
    }
}

/// Used when no mail transport is configured. Writes the listing to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, seen: &SeenListing, to: &str) -> Result<(), NotifyError> {
        let l = &seen.listing;
        info!(
            to,
            id = %l.id,
            price = %seen.price_display(),
            url = %l.detail_url,
            "🏠 new listing: {}",
            l.title
        );
        Ok(())
    }
}
