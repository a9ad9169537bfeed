//! Custom assertion macros and utilities
//!
//! Provides assertion macros with more descriptive failure output for queue
//! and job-board checks.

/// Assert that a result is ok and return the value
///
/// This macro unwraps a Result, providing a better error message
/// if the result is an error.
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert the optimistic and confirmed status of a job on the board
macro_rules! assert_job_status {
    ($manager:expr, $job:expr, local: $local:expr, confirmed: $confirmed:expr) => {{
        let view = $manager
            .job(&courier_sync::shared::JobId::from($job))
            .unwrap_or_else(|| panic!("job {} is not on the board", $job));
        assert_eq!(view.job.status, $local, "local status of {}", $job);
        assert_eq!(view.confirmed_status, $confirmed, "confirmed status of {}", $job);
        view
    }};
}

/// Assert that a string contains a substring
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        assert!(
            $haystack.contains($needle),
            "Expected '{}' to contain '{}'",
            $haystack,
            $needle
        );
    };
}
