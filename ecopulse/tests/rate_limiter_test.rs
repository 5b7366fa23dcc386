use ecopulse::rate_limiter::DEFAULT_MIN_INTERVAL;
use ecopulse::{MockClock, PulseError, RateLimiter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn limiter() -> (RateLimiter<MockClock>, MockClock) {
    let clock = MockClock::new(Instant::now());
    (RateLimiter::with_clock(DEFAULT_MIN_INTERVAL, clock.clone()), clock)
}

#[test]
fn test_first_request_always_passes() {
    let (limiter, _clock) = limiter();
    assert_eq!(limiter.time_remaining(), 0, "nothing to wait for before the first request");
    assert!(limiter.can_request(), "fresh limiter must accept the first request");

    assert!(RateLimiter::new().can_request());
}

#[test]
fn test_second_request_inside_interval_is_rejected() {
    let (limiter, clock) = limiter();
    assert!(limiter.can_request());

    clock.advance_millis(4999);
    assert!(!limiter.can_request(), "4999ms is inside the 5000ms interval");

    clock.advance_millis(1);
    assert!(limiter.can_request(), "exactly 5000ms later the gate opens");
    assert!(!limiter.can_request(), "and closes again immediately");
}

#[test]
fn test_rejection_does_not_move_the_window() {
    let (limiter, clock) = limiter();
    assert!(limiter.can_request());

    for _ in 0..4 {
        clock.advance_millis(1000);
        assert!(!limiter.can_request());
    }

    clock.advance_millis(1000);
    assert!(limiter.can_request(), "rejected calls must not reset the last request time");
}

#[test]
fn test_time_remaining_counts_down_in_whole_seconds() {
    let (limiter, clock) = limiter();
    assert!(limiter.can_request());
    assert!(!limiter.can_request());
    assert_eq!(limiter.time_remaining(), 5);

    let expected = [(1, 5), (999, 4), (1000, 3), (1999, 2), (1, 1), (999, 1), (1, 0)];
    let mut previous = limiter.time_remaining();
    for (advance, remaining) in expected {
        clock.advance_millis(advance);
        let now = limiter.time_remaining();
        assert_eq!(now, remaining, "after advancing {}ms", advance);
        assert!(now <= previous, "time remaining must not increase");
        previous = now;
    }

    clock.advance(Duration::from_secs(60));
    assert_eq!(limiter.time_remaining(), 0, "never negative");
}

#[test]
fn test_time_remaining_does_not_mutate() {
    let (limiter, clock) = limiter();
    assert!(limiter.can_request());
    clock.advance_millis(2500);

    for _ in 0..10 {
        assert_eq!(limiter.time_remaining(), 3);
    }
    clock.advance_millis(2500);
    assert!(limiter.can_request());
}

#[test]
fn test_check_reports_seconds_to_wait() {
    let (limiter, clock) = limiter();
    assert!(limiter.check().is_ok());

    clock.advance_millis(1200);
    match limiter.check() {
        Err(PulseError::RateLimited { seconds }) => assert_eq!(seconds, 4),
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[test]
fn test_concurrent_callers_get_a_single_pass() {
    let (limiter, _clock) = limiter();
    let limiter = Arc::new(limiter);
    let passes = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let limiter = limiter.clone();
            let passes = passes.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    if limiter.can_request() {
                        passes.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(passes.load(Ordering::SeqCst), 1, "time is frozen, so only one request may pass");
}
