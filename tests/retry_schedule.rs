use newsdb::bootstrap::{Attempt, retry_until_ready};
use newsdb::{DatabaseConfig, NewsDbError, RetryPolicy};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn ready_on_fourth_attempt_sleeps_three_six_nine() {
    let start = Instant::now();
    let mut seen = Vec::new();

    let result = retry_until_ready(RetryPolicy::default(), |n| {
        seen.push((n, start.elapsed().as_secs()));
        async move {
            if n == 4 {
                Attempt::Ready(n)
            } else {
                Attempt::NotYetAvailable("connection refused".to_string())
            }
        }
    })
    .await;

    assert_eq!(result.expect("ready"), 4);
    assert_eq!(seen, vec![(1, 0), (2, 3), (3, 9), (4, 18)]);
    assert_eq!(start.elapsed().as_secs(), 18);
}

#[tokio::test(start_paused = true)]
async fn ready_on_attempt_k_makes_exactly_k_attempts() {
    for k in 1..=10u32 {
        let start = Instant::now();
        let mut attempts = 0;

        let result = retry_until_ready(RetryPolicy::default(), |n| {
            attempts += 1;
            async move {
                if n == k {
                    Attempt::Ready(())
                } else {
                    Attempt::NotYetAvailable("starting up".to_string())
                }
            }
        })
        .await;

        assert!(result.is_ok(), "k = {k}");
        assert_eq!(attempts, k);
        // 3 + 6 + ... + 3(k-1)
        let expected: u64 = (1..k as u64).map(|i| 3 * i).sum();
        assert_eq!(start.elapsed().as_secs(), expected, "k = {k}");
    }
}

#[tokio::test(start_paused = true)]
async fn never_reachable_gives_up_after_ten_attempts() {
    let start = Instant::now();
    let mut attempts = 0u32;

    let result: Result<(), _> = retry_until_ready(RetryPolicy::default(), |_| {
        attempts += 1;
        async { Attempt::NotYetAvailable("database news does not exist yet".to_string()) }
    })
    .await;

    assert_eq!(attempts, 10);
    assert_eq!(start.elapsed().as_secs(), 135);
    match result {
        Err(NewsDbError::Unreachable { attempts, reason }) => {
            assert_eq!(attempts, 10);
            assert!(reason.contains("does not exist"));
        }
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn fatal_attempt_stops_without_further_sleeps() {
    let start = Instant::now();
    let mut attempts = 0u32;

    let result: Result<(), _> = retry_until_ready(RetryPolicy::default(), |n| {
        attempts += 1;
        async move {
            if n == 2 {
                Attempt::Fatal(NewsDbError::Database(sqlx::Error::Protocol(
                    "password authentication failed".to_string(),
                )))
            } else {
                Attempt::NotYetAvailable("connection refused".to_string())
            }
        }
    })
    .await;

    assert_eq!(attempts, 2);
    assert_eq!(start.elapsed().as_secs(), 3);
    assert!(matches!(result, Err(NewsDbError::Database(_))));
}

#[tokio::test(start_paused = true)]
async fn custom_policy_scales_waits() {
    let start = Instant::now();
    let policy = RetryPolicy {
        max_attempts: 3,
        wait_increment: std::time::Duration::from_secs(5),
    };

    let result: Result<(), _> = retry_until_ready(policy, |_| async {
        Attempt::NotYetAvailable("down".to_string())
    })
    .await;

    assert!(matches!(
        result,
        Err(NewsDbError::Unreachable { attempts: 3, .. })
    ));
    assert_eq!(start.elapsed().as_secs(), 15);
}

#[tokio::test(start_paused = true)]
async fn refused_connection_is_retried_then_unreachable() {
    let cfg = DatabaseConfig {
        user: "scraper".to_string(),
        password: "hunter2".to_string(),
        host: "127.0.0.1".to_string(),
        port: 1,
        name: "news".to_string(),
        max_attempts: 2,
        wait_increment: 3,
        echo: false,
    };
    let start = Instant::now();

    let result = newsdb::connect(&cfg).await;

    match result {
        Err(NewsDbError::Unreachable { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected Unreachable, got {other:?}"),
    }
    assert_eq!(start.elapsed().as_secs(), 3);
}
