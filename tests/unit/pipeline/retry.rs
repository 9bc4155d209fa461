use std::cell::Cell;

use super::*;

#[test]
fn delay_grows_linearly() {
    let p = RetryPolicy::new(3, Duration::from_millis(1000));
    assert_eq!(p.delay_after(1), Duration::from_millis(1000));
    assert_eq!(p.delay_after(2), Duration::from_millis(2000));
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts, 1);
}

#[test]
fn policy_follows_config() {
    let mut c = PipelineConfig::default();
    assert_eq!(RetryPolicy::from_config(&c).attempts, 3);
    c.enable_fallbacks = false;
    assert_eq!(RetryPolicy::from_config(&c).attempts, 1);
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_third_attempt_after_backoff() {
    let calls = Cell::new(0);
    let started = tokio::time::Instant::now();
    let p = RetryPolicy::new(3, Duration::from_millis(1000));
    let out = with_retry(&p, "compose", |attempt| {
        calls.set(calls.get() + 1);
        async move {
            if attempt < 3 {
                Err(StillmotionError::composition("flaky"))
            } else {
                Ok(attempt)
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(out, 3);
    assert_eq!(calls.get(), 3);
    assert!(started.elapsed() >= Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_last_attempt() {
    let p = RetryPolicy::new(2, Duration::from_millis(10));
    let err = with_retry(&p, "render", |_| async {
        Err::<(), _>(StillmotionError::composition("always"))
    })
    .await
    .unwrap_err();
    assert_eq!(err.attempts, 2);
    assert!(err.error.to_string().contains("always"));
}

#[tokio::test(start_paused = true)]
async fn validation_errors_are_not_retried() {
    let calls = Cell::new(0);
    let started = tokio::time::Instant::now();
    let p = RetryPolicy::new(3, Duration::from_millis(1000));
    let err = with_retry(&p, "direct", |_| {
        calls.set(calls.get() + 1);
        async { Err::<(), _>(StillmotionError::validation("bad timeline")) }
    })
    .await
    .unwrap_err();
    assert_eq!(calls.get(), 1);
    assert_eq!(err.attempts, 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}
