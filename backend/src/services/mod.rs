//! Business logic services for the sales tracker

pub mod auth;
pub mod customer;
pub mod dashboard;
pub mod notification;
pub mod product;
pub mod report;
pub mod settings;
pub mod upload;
pub mod user;
pub mod visit;

pub use auth::AuthService;
pub use customer::CustomerService;
pub use dashboard::DashboardService;
pub use notification::NotificationService;
pub use product::ProductService;
pub use report::ReportService;
pub use settings::SettingsService;
pub use upload::UploadService;
pub use user::UserService;
pub use visit::VisitService;

use crate::error::AppError;

/// Map a unique-constraint violation to `DuplicateEntry`, passing other errors through
pub(crate) fn map_unique_violation(err: sqlx::Error, field: &str) -> AppError {
    let is_unique = err
        .as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == "23505");
    if is_unique {
        AppError::DuplicateEntry(field.to_string())
    } else {
        AppError::DatabaseError(err)
    }
}

/// `%term%` pattern for case-insensitive search, with LIKE wildcards escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" toko "), "%toko%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
