// src/tests/utils.rs

use crate::db::SeenStore;
use crate::domain::listing::{ListingId, SeenListing};
use crate::errors::{FetchError, NotifyError};
use crate::notify::Notifier;
use crate::scraper::{ListingParser, PageSource};
use chrono::{DateTime, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use url::Url;

pub const SEARCH_URL: &str = "https://streeteasy.com/for-rent/nyc/price:-3500%7Cbeds:1";

/// Unique sqlite path in the temp dir
pub fn temp_db_path(prefix: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "{prefix}_{}.sqlite",
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

pub fn memory_store() -> SeenStore {
    SeenStore::new(crate::db::Database::in_memory().expect("in-memory db"))
}

pub fn parser() -> ListingParser {
    ListingParser::streeteasy(Url::parse(SEARCH_URL).unwrap()).expect("default selectors compile")
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
}

/// One StreetEasy-style result card.
pub fn card(href: &str, title: &str, price: &str) -> String {
    format!(
        r#"
        <li data-testid="listing-card">
          <a class="ImageContainer-module__listingLink___sYIL9" href="{href}">
            <img class="CardImage-module__cardImage__cirIn" alt="{title} image 1 of 12" src="/photos/{title}.jpg">
          </a>
          <div class="PriceInfo-module__priceInfo">
            <span data-testid="price">{price}</span>
          </div>
          <div class="BedsBathsSqft-module__bedsBathsSqft___QFOK-">
            <span class="BedsBathsSqft-module__text___lnveO">2 beds</span>
            <span class="BedsBathsSqft-module__text___lnveO">1 bath</span>
            <span class="BedsBathsSqft-module__text___lnveO">750 ft²</span>
          </div>
          <p class="description">Sunny corner unit</p>
        </li>
        "#
    )
}

/// Card for `/rental/<id>` with a street title.
pub fn rental(id: u32, price: &str) -> String {
    card(&format!("/rental/{id}?featured=1"), &format!("{id} East 13th Street #1D"), price)
}

pub fn results_page(cards: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html>
        <html><head><title>Rentals</title></head>
        <body>
          <main>
            <ul data-testid="search-results">{}</ul>
          </main>
        </body></html>"#,
        cards.join("\n")
    )
}

pub fn no_results_page() -> String {
    r#"<html><body>
        <ul data-testid="search-results"></ul>
        <div data-testid="no-results">No listings match your search.</div>
    </body></html>"#
        .to_string()
}

pub fn captcha_page() -> String {
    r#"<html><body><div id="px-captcha">Press &amp; Hold to confirm you are a human</div></body></html>"#
        .to_string()
}

/// Hands out canned responses in order and keeps repeating the last one.
pub struct StubSource {
    responses: RefCell<VecDeque<Result<String, FetchError>>>,
    calls: Cell<usize>,
    stop_after: Option<(usize, Arc<AtomicBool>)>,
}

impl StubSource {
    pub fn new(responses: Vec<Result<String, FetchError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: Cell::new(0),
            stop_after: None,
        }
    }

    pub fn page(html: String) -> Self {
        Self::new(vec![Ok(html)])
    }

    /// Set `flag` once `calls` fetches have been served.
    pub fn stopping_after(mut self, calls: usize, flag: Arc<AtomicBool>) -> Self {
        self.stop_after = Some((calls, flag));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl PageSource for StubSource {
    fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        self.calls.set(self.calls.get() + 1);

        if let Some((n, flag)) = &self.stop_after {
            if self.calls.get() >= *n {
                flag.store(true, Ordering::SeqCst);
            }
        }

        let mut queue = self.responses.borrow_mut();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().expect("stub has no responses")
        }
    }
}

/// Records every delivery; optionally fails all of them.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<(ListingId, String)>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn ids(&self) -> Vec<ListingId> {
        self.sent.borrow().iter().map(|(id, _)| id.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, listing: &SeenListing, to: &str) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push((listing.id().clone(), to.to_string()));
        if self.fail {
            return Err(NotifyError::RequestFailed("smtp unreachable".into()));
        }
        Ok(())
    }
}

/// Remembers the level of every event it sees.
#[derive(Clone, Default)]
pub struct LevelCapture(Arc<Mutex<Vec<Level>>>);

impl LevelCapture {
    pub fn levels(&self) -> Vec<Level> {
        self.0.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for LevelCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.0.lock().unwrap().push(*event.metadata().level());
    }
}

/// Run `f` with a subscriber that records event levels on this thread.
pub fn capture_levels<T>(f: impl FnOnce() -> T) -> (T, Vec<Level>) {
    let capture = LevelCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, capture.levels())
}

/// Loopback HTTP server answering one connection per canned raw response, in
/// order. Joining the handle yields the raw requests it received.
pub fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = std::thread::spawn(move || {
        let mut heads = Vec::new();
        for response in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                if let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&raw[..end]).into_owned();
                    let body_len = header(&head, "content-length")
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if raw.len() >= end + 4 + body_len {
                        break;
                    }
                }
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            heads.push(String::from_utf8_lossy(&raw).into_owned());
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        }
        heads
    });

    (base, handle)
}

/// A complete response that closes the connection afterwards.
pub fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Value of `name` in a raw request head, matched case-insensitively.
pub fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}
