use crate::config::Config;
use crate::cycle::DiscoveryCycle;
use crate::db::SeenStore;
use crate::notify::{BrevoMailer, LogNotifier, Notifier};
use crate::scheduler::Poller;
use crate::scraper::{HttpFetcher, ListingParser, RetryPolicy};
use anyhow::Context;
use std::fs::OpenOptions;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod cycle;
mod db;
mod domain;
mod errors;
mod notify;
mod scheduler;
mod scraper;

#[cfg(test)]
mod tests;

fn main() -> anyhow::Result<()> {
    // 1️⃣ Configuration; bail before any cycle runs if it is unusable
    let config = Config::from_env().context("invalid configuration")?;

    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,apartment_watch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    info!("watching {}", config.search_url);
    if let Some(path) = &config.log_file {
        info!("logging to {}", path.display());
    }

    // 2️⃣ Seen-listing store
    let store = SeenStore::open(&config.db_path).context("failed to open listing store")?;
    info!("{} listing(s) already known", store.len()?);
    if let Some(latest) = store.all()?.last() {
        info!(
            "most recent: {} ({}), first seen {}",
            latest.id(),
            latest.price_display(),
            latest.first_seen_at
        );
    }

    // 3️⃣ Fetcher and parser
    let policy = RetryPolicy::default().with_attempts(config.fetch_max_attempts);
    let fetcher = HttpFetcher::new(config.fetch_timeout, policy)?;
    let parser = ListingParser::streeteasy(config.search_url.clone())?;

    // 4️⃣ Notification transport
    let notifier: Box<dyn Notifier> = match &config.brevo {
        Some(b) => {
            info!("sending notifications to {} via Brevo", config.notify_to);
            let mailer = BrevoMailer::new(
                b.api_key.clone(),
                b.sender_email.clone(),
                b.sender_name.clone(),
            )
            .context("failed to set up Brevo client")?;
            Box::new(mailer)
        }
        None => {
            warn!("BREVO_API_KEY/SENDER_EMAIL not set, new listings will only be logged");
            Box::new(LogNotifier)
        }
    };

    let cycle = DiscoveryCycle::new(fetcher, parser, store, notifier, config.notify_to.clone());

    // 5️⃣ Poll until Ctrl+C
    let mut poller = Poller::new(config.poll_interval);
    let stop = poller.stop_handle();
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl+C handler")?;

    let url = config.search_url.to_string();
    poller.run(|| cycle.run(&url));

    info!("Apartment watch stopped by user");
    Ok(())
}
