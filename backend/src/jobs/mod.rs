//! Scheduled background jobs
//!
//! The daily sales report fires once a day at the configured local time and
//! the low-stock alert at the top of every hour. Both also run on demand via
//! the cron trigger endpoint. A failing run is logged and never stops its
//! loop.

pub mod daily_report;
pub mod stock_alert;

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use config::ConfigError;
use std::time::Duration;

use crate::AppState;

pub use daily_report::DailyReportOutcome;
pub use stock_alert::StockAlertOutcome;

const FALLBACK_SLEEP: Duration = Duration::from_secs(60);

/// Start both job loops on the runtime
pub fn spawn_scheduler(state: AppState) -> Result<(), ConfigError> {
    let report_time = state.config.schedule.report_time()?;
    let tz = state.tz;

    let daily_state = state.clone();
    tokio::spawn(async move {
        tracing::info!("Daily report scheduled at {} ({})", report_time, tz);
        loop {
            let sleep_for = duration_until_next(Utc::now(), report_time, tz);
            tracing::debug!("Next daily report in {}s", sleep_for.as_secs());
            tokio::time::sleep(sleep_for).await;
            run_daily_report(&daily_state).await;
        }
    });

    tokio::spawn(async move {
        tracing::info!("Low-stock check scheduled hourly");
        loop {
            tokio::time::sleep(duration_until_next_hour(Utc::now(), tz)).await;
            run_stock_alert(&state).await;
        }
    });

    Ok(())
}

/// Run the daily report, logging instead of propagating failures
pub async fn run_daily_report(state: &AppState) -> Option<DailyReportOutcome> {
    match daily_report::run(state).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::error!("Daily report job failed: {}", e);
            None
        }
    }
}

/// Run the low-stock check, logging instead of propagating failures
pub async fn run_stock_alert(state: &AppState) -> Option<StockAlertOutcome> {
    match stock_alert::run(state).await {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::error!("Low-stock job failed: {}", e);
            None
        }
    }
}

/// Time from `now` until the next `at` wall-clock time in `tz`
///
/// A trigger time skipped by a DST jump moves one minute later; anything
/// still unresolvable sleeps for a minute and retries.
pub fn duration_until_next(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> Duration {
    let local_now = now.with_timezone(&tz);
    let today = local_now.date_naive();
    let target_date = if local_now.time() >= at {
        today + ChronoDuration::days(1)
    } else {
        today
    };

    let target = target_date
        .and_time(at)
        .and_local_timezone(tz)
        .earliest()
        .or_else(|| {
            (target_date.and_time(at) + ChronoDuration::minutes(1))
                .and_local_timezone(tz)
                .latest()
        });

    match target {
        Some(target) => target
            .signed_duration_since(local_now)
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(FALLBACK_SLEEP),
        None => {
            tracing::error!("Cannot resolve local trigger time {}, retrying in a minute", at);
            FALLBACK_SLEEP
        }
    }
}

/// Time from `now` until minute 0 of the next local hour in `tz`
pub fn duration_until_next_hour(now: DateTime<Utc>, tz: Tz) -> Duration {
    let local_now = now.with_timezone(&tz);
    let into_hour = u64::from(local_now.minute()) * 60 + u64::from(local_now.second());
    Duration::from_secs(3600 - into_hour)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_next_report_later_today() {
        let tz: Tz = "Asia/Jakarta".parse().unwrap();
        // 09:00 UTC is 16:00 in Jakarta
        let wait = duration_until_next(utc(2024, 3, 1, 9, 0), NaiveTime::from_hms_opt(17, 0, 0).unwrap(), tz);
        assert_eq!(wait, Duration::from_secs(3600));
    }

    #[test]
    fn test_next_report_rolls_to_tomorrow() {
        let tz: Tz = "Asia/Jakarta".parse().unwrap();
        // exactly 17:00 local has already fired
        let wait = duration_until_next(utc(2024, 3, 1, 10, 0), NaiveTime::from_hms_opt(17, 0, 0).unwrap(), tz);
        assert_eq!(wait, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_skipped_local_time_moves_forward() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        // 02:30 does not exist on 2024-03-31 in Berlin
        let wait = duration_until_next(
            utc(2024, 3, 30, 23, 0),
            NaiveTime::from_hms_opt(2, 30, 0).unwrap(),
            tz,
        );
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(3 * 3600));
    }

    #[test]
    fn test_next_hour() {
        let tz: Tz = "Asia/Jakarta".parse().unwrap();
        assert_eq!(duration_until_next_hour(utc(2024, 3, 1, 9, 45), tz), Duration::from_secs(900));
        assert_eq!(duration_until_next_hour(utc(2024, 3, 1, 9, 0), tz), Duration::from_secs(3600));
    }

    #[test]
    fn test_next_hour_follows_local_clock() {
        let tz: Tz = "Asia/Kolkata".parse().unwrap();
        // 09:00 UTC is 14:30 in Kolkata, next local top of hour is 15:00
        assert_eq!(duration_until_next_hour(utc(2024, 3, 1, 9, 0), tz), Duration::from_secs(1800));
        // 09:30 UTC is 15:00 local
        assert_eq!(duration_until_next_hour(utc(2024, 3, 1, 9, 30), tz), Duration::from_secs(3600));
    }
}
