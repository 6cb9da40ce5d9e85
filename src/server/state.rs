//! Worker protocol state machine
//!
//! The broker's reaction to a worker command depends only on the command,
//! whether the sender is already in the worker table, and whether its
//! address is in the reserved namespace:
//!
//! | Command    | Known worker | Unknown worker                 |
//! |------------|--------------|--------------------------------|
//! | READY      | Reject       | Reject if reserved, else Register |
//! | REPLY      | RouteReply   | Reject                         |
//! | HEARTBEAT  | Refresh      | Reject                         |
//! | DISCONNECT | Remove       | Remove                         |
//! | REQUEST    | Ignore       | Ignore                         |

use crate::protocol::Command;

/// Whether the sender is in the worker table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Not seen before, or deleted since
    Unknown,
    /// Registered via READY
    Known,
}

/// What the broker does with a worker message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerAction {
    /// Bind to the named service and mark idle
    Register,
    /// Forward the reply to its client and mark idle
    RouteReply,
    /// Extend the worker's expiry
    Refresh,
    /// Protocol violation: delete and send DISCONNECT
    Reject,
    /// Delete without answering
    Remove,
    /// Log and drop the message
    Ignore,
}

/// Look up the action for a worker command
pub fn transition(state: WorkerState, command: Command, reserved_address: bool) -> WorkerAction {
    use WorkerAction::*;
    use WorkerState::*;

    match (command, state) {
        (Command::Ready, Known) => Reject,
        (Command::Ready, Unknown) if reserved_address => Reject,
        (Command::Ready, Unknown) => Register,
        (Command::Reply, Known) => RouteReply,
        (Command::Reply, Unknown) => Reject,
        (Command::Heartbeat, Known) => Refresh,
        (Command::Heartbeat, Unknown) => Reject,
        (Command::Disconnect, _) => Remove,
        (Command::Request, _) => Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready() {
        assert_eq!(transition(WorkerState::Unknown, Command::Ready, false), WorkerAction::Register);
        assert_eq!(transition(WorkerState::Unknown, Command::Ready, true), WorkerAction::Reject);
        assert_eq!(transition(WorkerState::Known, Command::Ready, false), WorkerAction::Reject);
    }

    #[test]
    fn test_reply_and_heartbeat_require_registration() {
        assert_eq!(transition(WorkerState::Known, Command::Reply, false), WorkerAction::RouteReply);
        assert_eq!(transition(WorkerState::Unknown, Command::Reply, false), WorkerAction::Reject);
        assert_eq!(transition(WorkerState::Known, Command::Heartbeat, false), WorkerAction::Refresh);
        assert_eq!(transition(WorkerState::Unknown, Command::Heartbeat, false), WorkerAction::Reject);
    }

    #[test]
    fn test_disconnect_never_answered() {
        for state in [WorkerState::Known, WorkerState::Unknown] {
            assert_eq!(transition(state, Command::Disconnect, false), WorkerAction::Remove);
        }
    }

    #[test]
    fn test_request_from_worker_ignored() {
        assert_eq!(transition(WorkerState::Known, Command::Request, false), WorkerAction::Ignore);
    }
}
