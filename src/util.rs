use crate::config::RetryPolicy;
use crate::errors::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Asia::Kolkata;
use log::debug;
use std::future::Future;

// 价格类字段统一保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse a scraped numeric string such as `"₹1,234.50"`, `"-0.75%"` or `"12.3 "`.
///
/// Everything except digits, `.` and `-` is dropped before parsing.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 运行时间戳，用于输出文件命名（印度标准时间）
pub fn run_stamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&Kolkata).format("%Y%m%d_%H%M%S").to_string()
}

/// Try candidates in order and return the first one that produces a value.
pub async fn first_success<I, F, Fut, T>(candidates: I, mut attempt: F) -> Option<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for candidate in candidates {
        if let Some(value) = attempt(candidate).await {
            return Some(value);
        }
    }
    None
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// policy's attempt budget is spent. Sleeps with exponential backoff between
/// attempts.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                debug!("{} failed (attempt {}/{}): {}; retrying in {:?}",
                       label, attempt, policy.max_attempts, e, delay);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ScraperError;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(11.111111), 11.11);
        assert_eq!(round2(-4.567), -4.57);
        assert_eq!(round2(10.0), 10.0);
    }

    #[test]
    fn parse_number_cleans_decorations() {
        assert_eq!(parse_number("₹1,234.50"), Some(1234.5));
        assert_eq!(parse_number("-0.75%"), Some(-0.75));
        assert_eq!(parse_number(" 12 "), Some(12.0));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("1.2.3"), None);
    }

    #[test]
    fn run_stamp_uses_india_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        assert_eq!(run_stamp(now), "20240302_013000");
    }

    #[tokio::test]
    async fn first_success_stops_at_first_hit() {
        let calls = AtomicU32::new(0);
        let found = first_success([1, 2, 3, 4], |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { if n >= 2 { Some(n * 10) } else { None } }
        })
        .await;
        assert_eq!(found, Some(20));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<()> = retry_with_backoff(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ScraperError::HttpStatus { status: 502, url: "u".to_string() }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_does_not_repeat_payload_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result: Result<()> = retry_with_backoff(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ScraperError::PayloadError("no meta".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_returns_late_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let result = retry_with_backoff(&policy, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ScraperError::HttpStatus { status: 503, url: "u".to_string() })
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
    }
}
