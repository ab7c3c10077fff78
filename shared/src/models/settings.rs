//! Process-wide settings

use serde::{Deserialize, Serialize};

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 50;
pub const DEFAULT_ATTENDANCE_DISTANCE_TOLERANCE: f64 = 200.0;

/// Global tunables, stored as a single row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Units; products with less outstanding stock raise an alert
    pub low_stock_threshold: i64,
    /// Meters allowed between the salesperson and the customer
    pub attendance_distance_tolerance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            attendance_distance_tolerance: DEFAULT_ATTENDANCE_DISTANCE_TOLERANCE,
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub low_stock_threshold: Option<i64>,
    pub attendance_distance_tolerance: Option<f64>,
}

impl SettingsUpdate {
    /// Reject negative or non-finite values
    pub fn validate(&self) -> Result<(), &'static str> {
        if matches!(self.low_stock_threshold, Some(threshold) if threshold < 0) {
            return Err("lowStockThreshold cannot be negative");
        }
        if matches!(self.attendance_distance_tolerance, Some(t) if !t.is_finite() || t < 0.0) {
            return Err("attendanceDistanceTolerance must be a non-negative number");
        }
        Ok(())
    }
}

impl Settings {
    /// Apply a partial update, rejecting negative values
    pub fn apply(&self, update: &SettingsUpdate) -> Result<Settings, &'static str> {
        update.validate()?;
        Ok(Settings {
            low_stock_threshold: update.low_stock_threshold.unwrap_or(self.low_stock_threshold),
            attendance_distance_tolerance: update
                .attendance_distance_tolerance
                .unwrap_or(self.attendance_distance_tolerance),
        })
    }
}
