use rusqlite::ErrorCode;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Repeat a failure at full level once every this many consecutive misses.
const REPEAT_EVERY: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollFailure {
    /// SQLITE_BUSY / SQLITE_LOCKED: the game is writing, try next tick.
    DatabaseBusy,
    Database,
    StateFile,
    Internal,
}

impl PollFailure {
    pub fn classify(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(sql_err) = cause.downcast_ref::<rusqlite::Error>() {
                return match sql_err.sqlite_error_code() {
                    Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                        PollFailure::DatabaseBusy
                    }
                    _ => PollFailure::Database,
                };
            }
            if cause.downcast_ref::<std::io::Error>().is_some() {
                return PollFailure::StateFile;
            }
        }
        PollFailure::Internal
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PollFailure::DatabaseBusy => "database busy",
            PollFailure::Database => "database error",
            PollFailure::StateFile => "state file error",
            PollFailure::Internal => "internal error",
        }
    }
}

/// Every failed iteration is skipped and retried on the next tick; this only
/// decides how loudly to report it so a stuck database does not flood the log.
#[derive(Debug, Default)]
pub struct RetryPolicy {
    consecutive_failures: u32,
    last_failure: Option<PollFailure>,
}

impl RetryPolicy {
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            log_info!(
                "time poll recovered after {} failed iteration(s)",
                self.consecutive_failures
            );
        }
        self.consecutive_failures = 0;
        self.last_failure = None;
    }

    /// Records a failure and returns its class.
    pub fn record_failure(&mut self, err: &anyhow::Error) -> PollFailure {
        let failure = PollFailure::classify(err);
        let repeated = self.last_failure == Some(failure);

        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(failure);

        if repeated && self.consecutive_failures % REPEAT_EVERY != 0 {
            log_debug!("time poll skipped ({}): {err:#}", failure.as_str());
            return failure;
        }

        match failure {
            PollFailure::DatabaseBusy => log_warn!(
                "time poll skipped, save database locked ({} in a row)",
                self.consecutive_failures
            ),
            _ => log_error!(
                "time poll failed ({}, {} in a row): {err:#}",
                failure.as_str(),
                self.consecutive_failures
            ),
        }
        failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use rusqlite::ffi;

    fn sqlite_error(code: i32) -> anyhow::Error {
        let err: Result<(), rusqlite::Error> =
            Err(rusqlite::Error::SqliteFailure(ffi::Error::new(code), None));
        err.context("failed to look up active player entity").unwrap_err()
    }

    #[test]
    fn classifies_locked_database_as_busy() {
        assert_eq!(
            PollFailure::classify(&sqlite_error(ffi::SQLITE_BUSY)),
            PollFailure::DatabaseBusy
        );
        assert_eq!(
            PollFailure::classify(&sqlite_error(ffi::SQLITE_LOCKED)),
            PollFailure::DatabaseBusy
        );
        assert_eq!(
            PollFailure::classify(&sqlite_error(ffi::SQLITE_CORRUPT)),
            PollFailure::Database
        );
    }

    #[test]
    fn classifies_io_and_other_errors() {
        let io: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ));
        let io = io.context("failed to write state file").unwrap_err();
        assert_eq!(PollFailure::classify(&io), PollFailure::StateFile);

        let other = anyhow::anyhow!("database thread terminated unexpectedly");
        assert_eq!(PollFailure::classify(&other), PollFailure::Internal);
    }

    #[test]
    fn counts_streaks_and_resets_on_success() {
        let mut policy = RetryPolicy::default();
        let err = sqlite_error(ffi::SQLITE_BUSY);

        policy.record_failure(&err);
        policy.record_failure(&err);
        assert_eq!(policy.consecutive_failures(), 2);

        policy.record_success();
        assert_eq!(policy.consecutive_failures(), 0);
    }
}
