//! Result alias and logging combinators.
//!
//! Host operations whose failure must not abort the caller (status
//! reporting, best-effort cleanup) go through [`ResultExt`] so the error is
//! still recorded in the log.

use std::fmt::Display;

use crate::error::Error;

/// The standard Result type for host operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for Results whose error is logged rather than returned.
pub trait ResultExt<T> {
    /// Convert a Result to an Option, logging the error if present.
    fn into_option_logged(self) -> Option<T>;
}

impl<T, E: Display> ResultExt<T> for std::result::Result<T, E> {
    fn into_option_logged(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(error = %e, "Operation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_into_option_ok() {
        let result: Result<i32> = Ok(42);
        assert_eq!(result.into_option_logged(), Some(42));
    }

    #[test]
    fn test_result_into_option_err() {
        let result: Result<i32> = Err(Error::invalid_record("test"));
        assert_eq!(result.into_option_logged(), None);
    }
}
