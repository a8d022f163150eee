// fetcher.rs
use crate::errors::{ConfigError, FetchError};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, DNT,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Rotated through when the site answers 403/429.
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Anything that can hand back the raw search page.
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Bounded exponential backoff.
///
/// Attempt `n` (1-based) that fails waits `base_delay * 2^(n-1)`, capped at
/// `max_delay`, plus up to `jitter` of random slack. No wait follows the last attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            jitter: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before the attempt that follows failed attempt `attempt`, without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    /// Run `op` until it succeeds or attempts run out. `sleep` performs the waits.
    pub fn run<T, Op, S>(&self, mut op: Op, mut sleep: S) -> Result<T, FetchError>
    where
        Op: FnMut(u32) -> Result<T, FetchError>,
        S: FnMut(Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=max_attempts {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("⚠️ attempt {attempt}/{max_attempts} failed: {e}");
                    last_err = Some(e);

                    if attempt < max_attempts {
                        let wait = self.delay_for(attempt) + self.jitter();
                        info!("waiting {:.1}s before retry", wait.as_secs_f64());
                        sleep(wait);
                    }
                }
            }
        }

        let mut err = last_err.unwrap_or_else(|| FetchError::network("retry loop made no attempts"));
        err.attempts = max_attempts;
        Err(err)
    }
}

pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, policy: RetryPolicy) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, policy })
    }

    fn try_fetch(&self, url: &str, user_agent: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .map_err(|e| FetchError::network(e.to_string()))?;

        // Classify on the status line alone. A block page may well come with a
        // body that cannot be read.
        let status = resp.status();
        if !status.is_success() {
            let snippet: String = resp.text().unwrap_or_default().chars().take(200).collect();
            return Err(FetchError::from_status(
                status.as_u16(),
                format!("HTTP {status}: {snippet}"),
            ));
        }

        resp.text().map_err(|e| FetchError::network(e.to_string()))
    }
}

impl PageSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut agent = 0usize;

        self.policy.run(
            |attempt| {
                let start = Instant::now();
                debug!("fetching {url} (attempt {attempt})");

                match self.try_fetch(url, USER_AGENTS[agent % USER_AGENTS.len()]) {
                    Ok(html) => {
                        info!("✅ fetched {} bytes in {:?}", html.len(), start.elapsed());
                        Ok(html)
                    }
                    Err(e) => {
                        if e.is_rate_limited() {
                            agent += 1;
                        }
                        Err(e)
                    }
                }
            },
            std::thread::sleep,
        )
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}
