//! Decoded controller messages.
//!
//! A [`ParsedMessage`] is what observers receive: one line from the
//! controller after it has been matched against the protocol vocabulary.

use std::fmt;

use crate::types::{CommandKind, EventKind, Motor, MotorStatus, QueryKind};

/// A line received from the controller, decoded.
///
/// The controller echoes commands and queries it accepts (`#` prefix) and
/// reports motion asynchronously as events (`!` prefix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    /// Echo of a query. Queries carry no value.
    Query { motor: Motor, query: QueryKind },

    /// Echo of a command, with the preset number for RECALL/STORE.
    Command {
        motor: Motor,
        command: CommandKind,
        argument: Option<u32>,
    },

    /// Unsolicited event. `value` is the raw text between `=` and `;`.
    Event {
        motor: Motor,
        event: EventKind,
        value: String,
    },
}

impl ParsedMessage {
    /// The motor this message addresses.
    pub fn motor(&self) -> Motor {
        match self {
            ParsedMessage::Query { motor, .. }
            | ParsedMessage::Command { motor, .. }
            | ParsedMessage::Event { motor, .. } => *motor,
        }
    }

    /// Typed status value for `STATUS` events.
    ///
    /// Returns `None` for every other message, and for status events whose
    /// value is not one of the known [`MotorStatus`] values.
    pub fn status(&self) -> Option<MotorStatus> {
        match self {
            ParsedMessage::Event {
                event: EventKind::Status,
                value,
                ..
            } => value.parse().ok(),
            _ => None,
        }
    }

    /// Whether this is an event (as opposed to an echo).
    pub fn is_event(&self) -> bool {
        matches!(self, ParsedMessage::Event { .. })
    }
}

impl fmt::Display for ParsedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedMessage::Query { motor, query } => write!(f, "query {motor} {query}"),
            ParsedMessage::Command {
                motor,
                command,
                argument: Some(n),
            } => write!(f, "command {motor} {command} {n}"),
            ParsedMessage::Command {
                motor,
                command,
                argument: None,
            } => write!(f, "command {motor} {command}"),
            ParsedMessage::Event {
                motor,
                event,
                value,
            } => write!(f, "event {motor} {event}={value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_on_status_event() {
        let msg = ParsedMessage::Event {
            motor: Motor::A,
            event: EventKind::Status,
            value: "RETRACTING".into(),
        };
        assert_eq!(msg.status(), Some(MotorStatus::Retracting));
        assert_eq!(msg.motor(), Motor::A);
        assert!(msg.is_event());
    }

    #[test]
    fn status_is_none_for_position_event() {
        let msg = ParsedMessage::Event {
            motor: Motor::B,
            event: EventKind::Position,
            value: "HOME".into(),
        };
        assert_eq!(msg.status(), None);
    }

    #[test]
    fn status_is_none_for_unknown_value() {
        let msg = ParsedMessage::Event {
            motor: Motor::All,
            event: EventKind::Status,
            value: "WOBBLING".into(),
        };
        assert_eq!(msg.status(), None);
    }

    #[test]
    fn display() {
        let recall = ParsedMessage::Command {
            motor: Motor::All,
            command: CommandKind::Recall,
            argument: Some(3),
        };
        assert_eq!(recall.to_string(), "command ALL RECALL 3");

        let query = ParsedMessage::Query {
            motor: Motor::C,
            query: QueryKind::Position,
        };
        assert_eq!(query.to_string(), "query C POSITION");
        assert!(!query.is_event());
    }
}
