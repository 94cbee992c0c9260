//! The single result type returned by command handling.
//!
//! Every failure of a load → decide → append unit of work is one variant of
//! [`CommandError`], so callers can map outcomes without inspecting strings:
//! rejections to a client error, [`CommandError::NotFound`] to not-found,
//! [`CommandError::ConcurrencyConflict`] to precondition-failed, and
//! [`CommandError::Inconsistency`] to an internal fault that must be looked at.

use crate::event::EventError;
use crate::event_store::EventStoreError;
use crate::projection::ProjectionError;
use crate::stream::{StreamId, Version};
use thiserror::Error;

/// Failure of a command, generic over the aggregate's rejection type `R`.
#[derive(Error, Debug)]
pub enum CommandError<R>
where
    R: std::error::Error + 'static,
{
    /// The aggregate rejected the command. Never retried.
    #[error("Command rejected: {0}")]
    Validation(#[source] R),

    /// The command targets a stream that has no events.
    #[error("Stream not found: {0}")]
    NotFound(StreamId),

    /// The stream moved past the version the command was decided against.
    #[error("Concurrency conflict on {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// Stream the append targeted.
        stream_id: StreamId,
        /// Version the command was decided against.
        expected: Version,
        /// Version the stream was actually at.
        actual: Version,
    },

    /// Stored history or a read model contradicts what the code expects.
    #[error("Inconsistent state: {0}")]
    Inconsistency(String),

    /// The event store failed.
    #[error("Event store error: {0}")]
    Store(#[source] EventStoreError),

    /// A projection failed after the events were appended.
    #[error("Projection error: {0}")]
    Projection(#[source] ProjectionError),
}

/// Result alias for command handling.
pub type CommandResult<T, R> = Result<T, CommandError<R>>;

impl<R> CommandError<R>
where
    R: std::error::Error + 'static,
{
    /// Whether this is a version conflict (maps to precondition-failed).
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }

    /// Whether the target stream did not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the aggregate rejected the command.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether reloading and deciding again may succeed.
    ///
    /// Only conflicts qualify; a rejection or a corrupted history will fail
    /// the same way on every attempt.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// The aggregate's rejection, if that is what this error is.
    #[must_use]
    pub const fn rejection(&self) -> Option<&R> {
        match self {
            Self::Validation(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl<R> From<EventStoreError> for CommandError<R>
where
    R: std::error::Error + 'static,
{
    fn from(error: EventStoreError) -> Self {
        match error {
            EventStoreError::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            } => Self::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            },
            other => Self::Store(other),
        }
    }
}

impl<R> From<EventError> for CommandError<R>
where
    R: std::error::Error + 'static,
{
    fn from(error: EventError) -> Self {
        Self::Inconsistency(error.to_string())
    }
}

impl<R> From<ProjectionError> for CommandError<R>
where
    R: std::error::Error + 'static,
{
    fn from(error: ProjectionError) -> Self {
        if error.is_inconsistency() {
            Self::Inconsistency(error.to_string())
        } else {
            Self::Projection(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error, PartialEq)]
    #[error("cart is closed")]
    struct Closed;

    #[test]
    fn store_conflicts_become_command_conflicts() {
        let error: CommandError<Closed> = EventStoreError::ConcurrencyConflict {
            stream_id: StreamId::new("cart-1"),
            expected: Version::new(1),
            actual: Version::new(2),
        }
        .into();

        assert!(error.is_conflict());
        assert!(error.is_retryable());
        assert!(!error.is_not_found());
        assert!(format!("{error}").contains("expected version 1, found 2"));
    }

    #[test]
    fn other_store_failures_are_propagated_unchanged() {
        let error: CommandError<Closed> = EventStoreError::DatabaseError("down".into()).into();
        assert!(matches!(
            error,
            CommandError::Store(EventStoreError::DatabaseError(ref msg)) if msg == "down"
        ));
        assert!(!error.is_retryable());
    }

    #[test]
    fn undecodable_history_is_an_inconsistency() {
        let error: CommandError<Closed> = EventError::UnknownEventType("Mystery.v1".into()).into();
        assert!(matches!(error, CommandError::Inconsistency(ref reason) if reason.contains("Mystery.v1")));
    }

    #[test]
    fn missing_read_model_is_an_inconsistency() {
        let error: CommandError<Closed> = ProjectionError::MissingReadModel {
            projection: "details".into(),
            key: "cart-1".into(),
        }
        .into();
        assert!(matches!(error, CommandError::Inconsistency(_)));

        let error: CommandError<Closed> = ProjectionError::Contradiction("row holds 1 unit".into()).into();
        assert!(matches!(error, CommandError::Inconsistency(ref reason) if reason.contains("row holds 1 unit")));

        let error: CommandError<Closed> = ProjectionError::Storage("io".into()).into();
        assert!(matches!(error, CommandError::Projection(_)));
    }

    #[test]
    fn validation_exposes_the_rejection_as_source() {
        let error = CommandError::Validation(Closed);

        assert!(error.is_validation());
        assert_eq!(error.rejection(), Some(&Closed));
        assert_eq!(
            error.source().map(ToString::to_string),
            Some("cart is closed".to_string())
        );
    }
}
