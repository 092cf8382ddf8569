use std::time::Duration;

use typer_core::{report, Eta, ProgressSample, ProgressTracker};

#[test]
fn zero_elapsed_time_reports_unknown_eta() {
    let start = ProgressSample::new(0, Duration::ZERO);
    let now = ProgressSample::new(10, Duration::ZERO);
    let progress = report(start, now, 0, 100);

    assert_eq!(progress.instant_rate, None);
    assert_eq!(progress.cumulative_rate, None);
    assert_eq!(progress.eta, Eta::Unknown);
}

#[test]
fn zero_progress_reports_unknown_eta() {
    let start = ProgressSample::new(30, Duration::ZERO);
    let now = ProgressSample::new(30, Duration::from_secs(5));
    let progress = report(start, now, 30, 100);

    assert_eq!(progress.cumulative_rate, Some(0.0));
    assert_eq!(progress.eta, Eta::Unknown);
}

#[test]
fn eta_uses_cumulative_rate_of_this_run_only() {
    // Resumed at 50: 20 chars in 4 seconds is 5 chars/sec, 30 left.
    let previous = ProgressSample::new(60, Duration::from_secs(2));
    let current = ProgressSample::new(70, Duration::from_secs(4));
    let progress = report(previous, current, 50, 100);

    assert_eq!(progress.cumulative_rate, Some(5.0));
    assert_eq!(progress.instant_rate, Some(5.0));
    assert_eq!(progress.eta, Eta::Known(Duration::from_secs(6)));
    assert!((progress.percent - 70.0).abs() < 1e-9);
}

#[test]
fn samples_going_backwards_never_yield_negative_values() {
    let previous = ProgressSample::new(40, Duration::from_secs(9));
    let current = ProgressSample::new(20, Duration::from_secs(3));
    let progress = report(previous, current, 0, 100);

    assert_eq!(progress.instant_rate, None);
    assert!(progress.cumulative_rate.unwrap() >= 0.0);
}

#[test]
fn finished_run_has_zero_eta_and_full_percent() {
    let progress = report(
        ProgressSample::new(0, Duration::ZERO),
        ProgressSample::new(12, Duration::ZERO),
        0,
        12,
    );
    assert_eq!(progress.eta, Eta::Known(Duration::ZERO));
    assert!((progress.percent - 100.0).abs() < 1e-9);
}

#[test]
fn tracker_remembers_previous_sample() {
    let mut tracker = ProgressTracker::new(0, 20);
    let first = tracker.observe(10, Duration::from_secs(1));
    let second = tracker.observe(12, Duration::from_secs(2));

    assert_eq!(first.instant_rate, Some(10.0));
    assert_eq!(second.instant_rate, Some(2.0));
    assert_eq!(second.cumulative_rate, Some(6.0));
}

#[test]
fn report_renders_operator_line() {
    let progress = report(
        ProgressSample::new(0, Duration::ZERO),
        ProgressSample::new(9, Duration::from_secs(3)),
        0,
        20,
    );
    assert_eq!(
        progress.to_string(),
        "Progress: 45.0% (9/20 chars) | Speed: 3.0 chars/sec | ETA: 0m 3s"
    );

    let unknown = report(
        ProgressSample::new(0, Duration::ZERO),
        ProgressSample::new(0, Duration::ZERO),
        0,
        20,
    );
    assert_eq!(
        unknown.to_string(),
        "Progress: 0.0% (0/20 chars) | Speed: n/a | ETA: unknown"
    );
}
