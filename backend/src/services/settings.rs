//! Global settings, stored as a single lazily created row

use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use shared::models::{Settings, SettingsUpdate};

const UPDATE_SETTINGS: &str = r#"
    UPDATE settings
    SET low_stock_threshold = COALESCE($1, low_stock_threshold),
        attendance_distance_tolerance = COALESCE($2, attendance_distance_tolerance),
        updated_at = NOW()
    WHERE id = 1
    RETURNING low_stock_threshold, attendance_distance_tolerance
"#;

#[derive(Clone)]
pub struct SettingsService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct SettingsRow {
    low_stock_threshold: i64,
    attendance_distance_tolerance: f64,
}

impl From<SettingsRow> for Settings {
    fn from(row: SettingsRow) -> Self {
        Settings {
            low_stock_threshold: row.low_stock_threshold,
            attendance_distance_tolerance: row.attendance_distance_tolerance,
        }
    }
}

impl SettingsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Read the settings, creating the default row on first access
    pub async fn get(&self) -> AppResult<Settings> {
        sqlx::query("INSERT INTO settings (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
            .execute(&self.db)
            .await?;

        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT low_stock_threshold, attendance_distance_tolerance FROM settings WHERE id = 1",
        )
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Apply a partial update and return the stored result
    ///
    /// Unset fields keep their stored value inside the same statement, so
    /// concurrent partial updates to different fields both land.
    pub async fn update(&self, update: SettingsUpdate) -> AppResult<Settings> {
        update
            .validate()
            .map_err(|msg| AppError::ValidationError(msg.to_string()))?;

        sqlx::query("INSERT INTO settings (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
            .execute(&self.db)
            .await?;

        let row = sqlx::query_as::<_, SettingsRow>(UPDATE_SETTINGS)
            .bind(update.low_stock_threshold)
            .bind(update.attendance_distance_tolerance)
            .fetch_one(&self.db)
            .await?;

        tracing::info!(
            low_stock_threshold = row.low_stock_threshold,
            attendance_distance_tolerance = row.attendance_distance_tolerance,
            "Settings updated"
        );

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_keeps_unset_columns_in_place() {
        assert!(UPDATE_SETTINGS.contains("COALESCE($1, low_stock_threshold)"));
        assert!(UPDATE_SETTINGS.contains("COALESCE($2, attendance_distance_tolerance)"));
        assert!(!UPDATE_SETTINGS.contains("SELECT"));
    }
}
