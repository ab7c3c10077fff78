//! HTTP request handlers

pub mod auth;
pub mod cron;
pub mod customer;
pub mod dashboard;
pub mod health;
pub mod notification;
pub mod product;
pub mod report;
pub mod settings;
pub mod user;
pub mod visit;

pub use auth::*;
pub use cron::*;
pub use customer::*;
pub use dashboard::*;
pub use health::*;
pub use notification::*;
pub use product::*;
pub use report::*;
pub use settings::*;
pub use user::*;
pub use visit::*;

use serde::{Deserialize, Serialize};
use shared::types::{DateRange, Pagination};

use crate::error::AppResult;
use crate::time::parse_optional_date;

/// `page`, `limit` and `search` query parameters shared by list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::from_query(self.page, self.limit)
    }
}

/// Optional `startDate` / `endDate` query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RangeQuery {
    pub fn range(&self) -> AppResult<DateRange> {
        Ok(DateRange::new(
            parse_optional_date("startDate", self.start_date.as_deref())?,
            parse_optional_date("endDate", self.end_date.as_deref())?,
        ))
    }
}

/// Plain confirmation body, e.g. after a delete
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
