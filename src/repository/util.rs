//! Repository utilities.

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error};

/// Simple error info wrapper for database errors.
#[derive(Debug)]
pub struct DbErrorInfo(pub String);

impl DatabaseErrorInformation for DbErrorInfo {
    fn message(&self) -> &str {
        &self.0
    }
    fn details(&self) -> Option<&str> {
        None
    }
    fn hint(&self) -> Option<&str> {
        None
    }
    fn table_name(&self) -> Option<&str> {
        None
    }
    fn column_name(&self) -> Option<&str> {
        None
    }
    fn constraint_name(&self) -> Option<&str> {
        None
    }
    fn statement_position(&self) -> Option<i32> {
        None
    }
}

/// Convert any displayable error to a diesel error with proper message.
pub fn to_diesel_error(e: impl std::fmt::Display) -> Error {
    Error::DatabaseError(DatabaseErrorKind::Unknown, Box::new(DbErrorInfo(e.to_string())))
}

/// True for UNIQUE / PRIMARY KEY constraint failures.
pub fn is_unique_violation(e: &Error) -> bool {
    matches!(e, Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
}

/// Format a calendar day the way it is stored in `*_date` columns.
pub fn day_to_text(day: chrono::NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_error_keeps_message() {
        let err = to_diesel_error("disk I/O error");
        assert!(err.to_string().contains("disk I/O error"));
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn test_day_to_text() {
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(day_to_text(day), "2024-01-03");
    }
}
