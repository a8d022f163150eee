// src/domain/listing.rs

use chrono::{DateTime, Utc};
use std::fmt;

/// Deduplication key. Either `"<host>:<site id>"` or `"<host>:<path>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingId(String);

impl ListingId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One card from one fetch of the search page.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    /// Whole currency units. `None` when the card had no digits in its price text.
    pub price: Option<i64>,
    pub address: String,
    pub image_url: Option<String>,
    pub detail_url: String,

    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub sqft: Option<String>,
}

/// A listing as recorded in the seen store.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenListing {
    pub listing: Listing,
    pub first_seen_at: DateTime<Utc>,
}

impl SeenListing {
    pub fn id(&self) -> &ListingId {
        &self.listing.id
    }

    pub fn price_display(&self) -> String {
        match self.listing.price {
            Some(p) => format!("${}", group_thousands(p)),
            None => "Price unavailable".to_string(),
        }
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
