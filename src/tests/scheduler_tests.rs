use super::utils::{
    capture_levels, captcha_page, memory_store, parser, rental, results_page, RecordingNotifier,
    StubSource, SEARCH_URL,
};
use crate::cycle::{CycleResult, DiscoveryCycle};
use crate::domain::listing::ListingId;
use crate::errors::FetchError;
use crate::scheduler::{PollReport, PollState, Poller};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::Level;

#[test]
fn rate_limited_cycle_does_not_stop_polling() {
    let mut poller = Poller::new(Duration::ZERO);

    let source = StubSource::new(vec![
        Ok(results_page(&[rental(1, "$1,000"), rental(2, "$1,100")])),
        Ok(results_page(&[rental(1, "$1,000"), rental(2, "$1,100"), rental(3, "$1,200")])),
        Err(FetchError::from_status(429, "slow down")),
        Ok(results_page(&[rental(3, "$1,200"), rental(4, "$1,300")])),
        Ok(results_page(&[rental(5, "$1,400")])),
    ])
    .stopping_after(5, poller.stop_handle());

    let cycle = DiscoveryCycle::new(
        source,
        parser(),
        memory_store(),
        RecordingNotifier::default(),
        "me@example.com",
    );

    let report = poller.run(|| cycle.run(SEARCH_URL));

    assert_eq!(
        report,
        PollReport {
            cycles: 5,
            failed_cycles: 1,
            notified: 5,
            notify_failures: 0,
        }
    );
    assert_eq!(poller.state(), PollState::Stopped);

    let sent: HashSet<ListingId> = cycle.notifier().ids().into_iter().collect();
    let expected: HashSet<ListingId> = (1..=5)
        .map(|n| ListingId::new(format!("streeteasy.com:{n}")))
        .collect();
    assert_eq!(sent, expected);
}

#[test]
fn first_cycle_runs_without_waiting() {
    let mut poller = Poller::new(Duration::from_secs(3600));
    let stop = poller.stop_handle();
    assert_eq!(poller.state(), PollState::Idle);

    let started = Instant::now();
    let report = poller.run(|| {
        stop.store(true, Ordering::SeqCst);
        CycleResult::default()
    });

    assert_eq!(report.cycles, 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn stop_interrupts_the_sleep() {
    let mut poller = Poller::new(Duration::from_secs(3600));
    let stop = poller.stop_handle();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::SeqCst);
    });

    let started = Instant::now();
    let report = poller.run(CycleResult::default);
    stopper.join().unwrap();

    assert_eq!(report.cycles, 1);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(poller.state(), PollState::Stopped);
}

#[test]
fn stop_before_start_runs_nothing() {
    let mut poller = Poller::new(Duration::ZERO);
    poller.stop_handle().store(true, Ordering::SeqCst);

    let report = poller.run(|| panic!("no cycle should run"));
    assert_eq!(report, PollReport::default());
}

#[test]
fn undelivered_notifications_are_totalled() {
    let mut poller = Poller::new(Duration::ZERO);
    let source = StubSource::new(vec![
        Ok(results_page(&[rental(1, "$1,000"), rental(2, "$1,100")])),
        Ok(results_page(&[rental(3, "$1,200")])),
    ])
    .stopping_after(2, poller.stop_handle());

    let cycle = DiscoveryCycle::new(
        source,
        parser(),
        memory_store(),
        RecordingNotifier::failing(),
        "me@example.com",
    );

    let report = poller.run(|| cycle.run(SEARCH_URL));
    assert_eq!(report.notified, 3);
    assert_eq!(report.notify_failures, 3);
    assert_eq!(report.failed_cycles, 0);
}

#[test]
fn empty_results_page_is_not_logged_as_a_warning() {
    let mut poller = Poller::new(Duration::ZERO);
    let source = StubSource::page(results_page(&[])).stopping_after(2, poller.stop_handle());
    let cycle = DiscoveryCycle::new(
        source,
        parser(),
        memory_store(),
        RecordingNotifier::default(),
        "me@example.com",
    );

    let (report, levels) = capture_levels(|| poller.run(|| cycle.run(SEARCH_URL)));

    assert_eq!(report.failed_cycles, 2);
    assert!(levels.contains(&Level::INFO), "nothing captured: {levels:?}");
    assert!(
        levels.iter().all(|l| *l > Level::WARN),
        "empty page escalated: {levels:?}"
    );
}

#[test]
fn layout_change_is_warned_once_per_cycle() {
    let mut poller = Poller::new(Duration::ZERO);
    let source = StubSource::page(captcha_page()).stopping_after(1, poller.stop_handle());
    let cycle = DiscoveryCycle::new(
        source,
        parser(),
        memory_store(),
        RecordingNotifier::default(),
        "me@example.com",
    );

    let (report, levels) = capture_levels(|| poller.run(|| cycle.run(SEARCH_URL)));

    assert_eq!(report.failed_cycles, 1);
    let warnings = levels.iter().filter(|l| **l == Level::WARN).count();
    assert_eq!(warnings, 1, "{levels:?}");
}

#[test]
fn unrepresentable_interval_waits_until_stopped() {
    let mut poller = Poller::new(Duration::from_secs(u64::MAX));
    let stop = poller.stop_handle();

    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::SeqCst);
    });

    let started = Instant::now();
    let report = poller.run(CycleResult::default);
    stopper.join().unwrap();

    assert_eq!(report.cycles, 1);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(poller.state(), PollState::Stopped);
}
