//! Externally triggered job runs
//!
//! `GET /cron/trigger` runs the daily report and low-stock check right away
//! for deployments that schedule from outside the process.

use axum::{extract::State, Json};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};
use crate::jobs::{self, DailyReportOutcome, StockAlertOutcome};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronResponse {
    pub message: String,
    /// `None` when the job failed; details are in the log
    pub daily_report: Option<DailyReportOutcome>,
    pub stock_alert: Option<StockAlertOutcome>,
}

/// Compare secrets through their digests so timing does not depend on the
/// matching prefix length
fn secret_matches(given: &str, expected: &str) -> bool {
    Sha256::digest(given.as_bytes()) == Sha256::digest(expected.as_bytes())
}

pub async fn trigger_jobs(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> AppResult<Json<CronResponse>> {
    let expected = state
        .config
        .schedule
        .cron_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Unauthorized("cron trigger is not configured".to_string()))?;

    let authorized = auth
        .map(|TypedHeader(header)| secret_matches(header.token(), expected))
        .unwrap_or(false);
    if !authorized {
        tracing::warn!("Rejected cron trigger with a missing or wrong secret");
        return Err(AppError::Unauthorized("invalid cron secret".to_string()));
    }

    tracing::info!("Running scheduled jobs on demand");
    let (daily_report, stock_alert) =
        tokio::join!(jobs::run_daily_report(&state), jobs::run_stock_alert(&state));

    Ok(Json(CronResponse {
        message: "Cron jobs triggered successfully".to_string(),
        daily_report,
        stock_alert,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_matches() {
        assert!(secret_matches("s3cret", "s3cret"));
        assert!(!secret_matches("s3cret ", "s3cret"));
        assert!(!secret_matches("", "s3cret"));
    }
}
