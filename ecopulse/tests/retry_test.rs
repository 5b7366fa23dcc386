use ecopulse::{types::*, with_retry, RetryPolicy};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Run `with_retry` against an operation that fails `failures` times with
/// `status` before succeeding, recording when each attempt started.
async fn run_scripted(
    policy: RetryPolicy,
    failures: usize,
    status: Option<u16>,
) -> (Result<String>, Vec<Instant>) {
    let attempts = Arc::new(Mutex::new(Vec::new()));

    let result = with_retry(&policy, || {
        let attempts = attempts.clone();
        async move {
            let attempt = {
                let mut attempts = attempts.lock().unwrap();
                attempts.push(Instant::now());
                attempts.len()
            };

            if attempt > failures {
                return Ok(format!("ok on attempt {}", attempt));
            }
            match status {
                Some(status) => Err(PulseError::Status {
                    status,
                    body: format!("attempt {}", attempt),
                }),
                None => Err(PulseError::General(format!("attempt {}", attempt))),
            }
        }
    })
    .await;

    let attempts = attempts.lock().unwrap().clone();
    (result, attempts)
}

fn gaps(attempts: &[Instant]) -> Vec<Duration> {
    attempts.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

// Paused-clock timers fire on millisecond ticks, so allow one tick of slack.
fn assert_waited(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "waited {:?}, expected {:?}",
        actual,
        expected
    );
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

#[tokio::test(start_paused = true)]
async fn test_success_makes_a_single_attempt() -> Result<()> {
    init_tracing();

    let start = Instant::now();
    let (result, attempts) = run_scripted(RetryPolicy::default(), 0, None).await;

    assert_eq!(result?, "ok on attempt 1");
    assert_eq!(attempts.len(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO, "a successful call must not wait");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_connection_failures_back_off_exponentially() -> Result<()> {
    init_tracing();

    let start = Instant::now();
    let (result, attempts) = run_scripted(RetryPolicy::default(), usize::MAX, None).await;
    info!("Made {} attempts in {:?}", attempts.len(), start.elapsed());

    assert_eq!(attempts.len(), 4, "one attempt plus three retries");
    let expected = [1000, 2000, 4000].map(Duration::from_millis);
    let gaps = gaps(&attempts);
    assert_eq!(gaps.len(), expected.len());
    for (gap, expected) in gaps.into_iter().zip(expected) {
        assert_waited(gap, expected);
    }
    assert_waited(start.elapsed(), Duration::from_millis(7000));

    match result {
        Err(PulseError::General(message)) => assert_eq!(message, "attempt 4", "the last error is returned as is"),
        other => panic!("expected the operation's own error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_are_retried() -> Result<()> {
    init_tracing();

    let (result, attempts) = run_scripted(RetryPolicy::default(), usize::MAX, Some(503)).await;

    assert_eq!(attempts.len(), 4);
    match result {
        Err(PulseError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "attempt 4");
        }
        other => panic!("expected a 503 status error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_recovery_after_transient_failures() -> Result<()> {
    init_tracing();

    let start = Instant::now();
    let (result, attempts) = run_scripted(RetryPolicy::default(), 2, Some(500)).await;

    assert_eq!(result?, "ok on attempt 3");
    assert_eq!(attempts.len(), 3);
    assert_waited(start.elapsed(), Duration::from_millis(3000));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_fail_immediately() -> Result<()> {
    init_tracing();

    for status in [400, 401, 404, 429, 499] {
        let start = Instant::now();
        let (result, attempts) = run_scripted(RetryPolicy::default(), usize::MAX, Some(status)).await;

        assert_eq!(attempts.len(), 1, "status {} must not be retried", status);
        assert_eq!(start.elapsed(), Duration::ZERO, "status {} must not wait", status);
        match result {
            Err(PulseError::Status { status: got, .. }) => assert_eq!(got, status),
            other => panic!("expected status {}, got {:?}", status, other),
        }
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_custom_policy_bounds_attempts() -> Result<()> {
    init_tracing();

    let policy = RetryPolicy::new(1, Duration::from_millis(250));
    let start = Instant::now();
    let (result, attempts) = run_scripted(policy, usize::MAX, None).await;

    assert!(result.is_err());
    assert_eq!(attempts.len(), 2);
    assert_waited(start.elapsed(), Duration::from_millis(250));

    let start = Instant::now();
    let (result, attempts) = run_scripted(RetryPolicy::none(), usize::MAX, Some(502)).await;
    assert!(result.is_err());
    assert_eq!(attempts.len(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_backoff_does_not_block_other_tasks() -> Result<()> {
    init_tracing();

    let ticker = tokio::spawn(async {
        let mut ticks = 0;
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            ticks += 1;
        }
        ticks
    });

    let (result, _) = run_scripted(RetryPolicy::default(), 1, None).await;
    assert!(result.is_ok());

    let ticks = ticker.await.map_err(|e| PulseError::General(e.to_string()))?;
    assert_eq!(ticks, 5);
    Ok(())
}
