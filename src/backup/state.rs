//! Backup pipeline state machine
//!
//! ```text
//! Idle -> Scanning -> Encoding -> Framing -> Scanning ... -> Compressing -> Flushing -> Done
//! ```
//!
//! Every active state may move to `Failed`. `Done` and `Failed` are
//! terminal. Framing can fail because frame writes reach the sink through
//! the compressor.

use std::fmt;

use crate::error::{DbError, DbResult};
use crate::observability::Logger;

/// States of one backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    /// Not started
    Idle,
    /// Pulling the next record from the scan
    Scanning,
    /// Encoding the current record
    Encoding,
    /// Appending the encoded record as a frame
    Framing,
    /// Writing the compressor trailer
    Compressing,
    /// Flushing the sink
    Flushing,
    /// Archive complete
    Done,
    /// Run aborted
    Failed,
}

impl BackupState {
    /// Returns the state name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupState::Idle => "IDLE",
            BackupState::Scanning => "SCANNING",
            BackupState::Encoding => "ENCODING",
            BackupState::Framing => "FRAMING",
            BackupState::Compressing => "COMPRESSING",
            BackupState::Flushing => "FLUSHING",
            BackupState::Done => "DONE",
            BackupState::Failed => "FAILED",
        }
    }

    /// Returns true for `Done` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, BackupState::Done | BackupState::Failed)
    }

    /// Returns whether `next` may follow this state
    pub fn can_transition_to(&self, next: BackupState) -> bool {
        use BackupState::*;

        matches!(
            (self, next),
            (Idle, Scanning)
                | (Scanning, Encoding)
                | (Encoding, Framing)
                | (Framing, Scanning)
                | (Scanning, Compressing)
                | (Compressing, Flushing)
                | (Flushing, Done)
                | (Scanning, Failed)
                | (Encoding, Failed)
                | (Framing, Failed)
                | (Compressing, Failed)
                | (Flushing, Failed)
        )
    }
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks and logs the state of one backup run
#[derive(Debug)]
pub struct BackupStateMachine {
    state: BackupState,
    transitions: u64,
}

impl BackupStateMachine {
    /// Starts in `Idle`
    pub fn new() -> Self {
        Self {
            state: BackupState::Idle,
            transitions: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> BackupState {
        self.state
    }

    /// Number of transitions taken
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Moves to `next`, rejecting transitions the pipeline never takes.
    pub fn transition(&mut self, next: BackupState) -> DbResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(DbError::InvalidState(format!(
                "backup cannot move from {} to {}",
                self.state, next
            )));
        }

        Logger::trace(
            "BACKUP_STATE",
            &[("from", self.state.as_str()), ("to", next.as_str())],
        );
        self.state = next;
        self.transitions += 1;
        Ok(())
    }

    /// Moves to `Failed` from any active state. No-op when already terminal
    /// or still idle.
    pub fn fail(&mut self) {
        if self.state.can_transition_to(BackupState::Failed) {
            Logger::trace(
                "BACKUP_STATE",
                &[("from", self.state.as_str()), ("to", BackupState::Failed.as_str())],
            );
            self.state = BackupState::Failed;
            self.transitions += 1;
        }
    }
}

impl Default for BackupStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut machine = BackupStateMachine::new();
        for next in [
            BackupState::Scanning,
            BackupState::Encoding,
            BackupState::Framing,
            BackupState::Scanning,
            BackupState::Compressing,
            BackupState::Flushing,
            BackupState::Done,
        ] {
            machine.transition(next).unwrap();
        }
        assert_eq!(machine.state(), BackupState::Done);
        assert_eq!(machine.transitions(), 7);
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn test_empty_store_skips_encoding() {
        let mut machine = BackupStateMachine::new();
        machine.transition(BackupState::Scanning).unwrap();
        machine.transition(BackupState::Compressing).unwrap();
        machine.transition(BackupState::Flushing).unwrap();
        machine.transition(BackupState::Done).unwrap();
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut machine = BackupStateMachine::new();
        let err = machine.transition(BackupState::Done).unwrap_err();
        assert_eq!(err.code(), "DEPOT_INVALID_STATE");

        machine.transition(BackupState::Scanning).unwrap();
        assert!(machine.transition(BackupState::Framing).is_err());
        assert_eq!(machine.state(), BackupState::Scanning);
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut machine = BackupStateMachine::new();
        machine.fail();
        assert_eq!(machine.state(), BackupState::Idle);

        machine.transition(BackupState::Scanning).unwrap();
        machine.transition(BackupState::Encoding).unwrap();
        machine.fail();
        assert_eq!(machine.state(), BackupState::Failed);
        assert!(machine.transition(BackupState::Scanning).is_err());

        machine.fail();
        assert_eq!(machine.transitions(), 3);
    }

    #[test]
    fn test_done_cannot_fail() {
        assert!(!BackupState::Done.can_transition_to(BackupState::Failed));
        assert!(!BackupState::Idle.can_transition_to(BackupState::Failed));
    }
}
