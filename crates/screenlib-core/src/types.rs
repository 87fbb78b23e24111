//! Core types used throughout screenlib.
//!
//! These types name the fixed vocabulary of the screen controller protocol
//! (motor addresses, command and event keywords, status values) and the
//! client-side session data (connection state, credentials).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Error returned when a string cannot be parsed into one of the protocol
/// enums in this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTypeError {
    kind: &'static str,
    value: String,
}

impl ParseTypeError {
    fn new(kind: &'static str, value: &str) -> Self {
        ParseTypeError {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ParseTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseTypeError {}

// ---------------------------------------------------------------------------
// Motors
// ---------------------------------------------------------------------------

/// A motor address on the controller.
///
/// The controller drives up to four independently addressable motors
/// (masking panels, screen drop) plus a broadcast alias that addresses all
/// of them at once. Each address is a fixed dotted string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motor {
    /// Broadcast alias, `1.1.0.MOTOR`.
    All,
    /// Motor A, `1.1.1.MOTOR`.
    A,
    /// Motor B, `1.1.2.MOTOR`.
    B,
    /// Motor C, `1.1.3.MOTOR`.
    C,
    /// Motor D, `1.1.4.MOTOR`.
    D,
}

impl Motor {
    /// Every motor address, in the order the decoder tries them.
    pub const ALL: [Motor; 5] = [Motor::All, Motor::A, Motor::B, Motor::C, Motor::D];

    /// The address string used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Motor::All => "1.1.0.MOTOR",
            Motor::A => "1.1.1.MOTOR",
            Motor::B => "1.1.2.MOTOR",
            Motor::C => "1.1.3.MOTOR",
            Motor::D => "1.1.4.MOTOR",
        }
    }

    /// Look up a motor by its wire address.
    pub fn from_code(code: &str) -> Option<Motor> {
        Motor::ALL.into_iter().find(|m| m.code() == code)
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Motor::All => "ALL",
            Motor::A => "A",
            Motor::B => "B",
            Motor::C => "C",
            Motor::D => "D",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Motor {
    type Err = ParseTypeError;

    /// Accepts the short names (`all`, `a`..`d`, case-insensitive) or the
    /// wire address (`1.1.2.MOTOR`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ALL" => Ok(Motor::All),
            "A" => Ok(Motor::A),
            "B" => Ok(Motor::B),
            "C" => Ok(Motor::C),
            "D" => Ok(Motor::D),
            other => Motor::from_code(other).ok_or_else(|| ParseTypeError::new("motor", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands, queries, events
// ---------------------------------------------------------------------------

/// A motor command keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Retract toward the home position.
    Up,
    /// Extend toward the end position.
    Down,
    /// Stop any motion.
    Stop,
    /// Fully retract.
    Retract,
    /// Move to a stored preset. Requires a preset number.
    Recall,
    /// Store the current position as a preset. Requires a preset number.
    Store,
}

impl CommandKind {
    /// Commands that carry no argument.
    pub const NO_ARGUMENT: [CommandKind; 4] = [
        CommandKind::Up,
        CommandKind::Down,
        CommandKind::Stop,
        CommandKind::Retract,
    ];

    /// Commands that carry a preset number after a comma.
    pub const WITH_ARGUMENT: [CommandKind; 2] = [CommandKind::Recall, CommandKind::Store];

    /// The keyword used on the wire.
    pub fn keyword(&self) -> &'static str {
        match self {
            CommandKind::Up => "UP",
            CommandKind::Down => "DOWN",
            CommandKind::Stop => "STOP",
            CommandKind::Retract => "RETRACT",
            CommandKind::Recall => "RECALL",
            CommandKind::Store => "STORE",
        }
    }

    /// Whether the command carries a preset number.
    pub fn takes_argument(&self) -> bool {
        matches!(self, CommandKind::Recall | CommandKind::Store)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for CommandKind {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UP" => Ok(CommandKind::Up),
            "DOWN" => Ok(CommandKind::Down),
            "STOP" => Ok(CommandKind::Stop),
            "RETRACT" => Ok(CommandKind::Retract),
            "RECALL" => Ok(CommandKind::Recall),
            "STORE" => Ok(CommandKind::Store),
            _ => Err(ParseTypeError::new("command", s)),
        }
    }
}

/// A query keyword. The controller only answers position queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Current motor position.
    Position,
}

impl QueryKind {
    /// The keyword used on the wire.
    pub fn keyword(&self) -> &'static str {
        match self {
            QueryKind::Position => "POSITION",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// An unsolicited event keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Motion status change; value is a [`MotorStatus`].
    Status,
    /// Position report.
    Position,
}

impl EventKind {
    /// Event keywords in the order the decoder tries them.
    pub const ALL: [EventKind; 2] = [EventKind::Status, EventKind::Position];

    /// The keyword used on the wire.
    pub fn keyword(&self) -> &'static str {
        match self {
            EventKind::Status => "STATUS",
            EventKind::Position => "POSITION",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Value carried by a `STATUS` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorStatus {
    /// Not moving.
    Stop,
    /// Moving toward home.
    Retracting,
    /// Moving toward the end stop.
    Extending,
    /// At the home position.
    Home,
    /// At the end position.
    End,
}

impl fmt::Display for MotorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MotorStatus::Stop => "STOP",
            MotorStatus::Retracting => "RETRACTING",
            MotorStatus::Extending => "EXTENDING",
            MotorStatus::Home => "HOME",
            MotorStatus::End => "END",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MotorStatus {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "STOP" => Ok(MotorStatus::Stop),
            "RETRACTING" => Ok(MotorStatus::Retracting),
            "EXTENDING" => Ok(MotorStatus::Extending),
            "HOME" => Ok(MotorStatus::Home),
            "END" => Ok(MotorStatus::End),
            _ => Err(ParseTypeError::new("motor status", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Session types
// ---------------------------------------------------------------------------

/// Lifecycle state of the client's connection to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No connection; the supervisor will retry after its interval.
    #[default]
    Disconnected,
    /// Stream open, login prompts in progress.
    Authenticating,
    /// Logged in; listener and dispatcher are running.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Connected => "connected",
        };
        write!(f, "{s}")
    }
}

/// Connection parameters for one controller.
///
/// Immutable once built; the client holds it for its whole lifetime and
/// reuses it for every reconnection attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    host: String,
    port: u16,
    username: String,
    password: String,
    reconnect_interval: Duration,
}

impl Credentials {
    /// Bundle connection parameters.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        reconnect_interval: Duration,
    ) -> Self {
        Credentials {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            reconnect_interval,
        }
    }

    /// Controller host name or IP address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Controller TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Login name sent at the username prompt.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password sent at the password prompt.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Fixed delay between reconnection attempts.
    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    /// `host:port` form of the endpoint.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("reconnect_interval", &self.reconnect_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motor_codes_are_distinct() {
        let codes: Vec<&str> = Motor::ALL.iter().map(|m| m.code()).collect();
        assert_eq!(
            codes,
            [
                "1.1.0.MOTOR",
                "1.1.1.MOTOR",
                "1.1.2.MOTOR",
                "1.1.3.MOTOR",
                "1.1.4.MOTOR"
            ]
        );
    }

    #[test]
    fn motor_from_str_short_and_wire_forms() {
        assert_eq!("all".parse::<Motor>().unwrap(), Motor::All);
        assert_eq!("B".parse::<Motor>().unwrap(), Motor::B);
        assert_eq!("1.1.4.MOTOR".parse::<Motor>().unwrap(), Motor::D);
        assert_eq!("1.1.4.motor".parse::<Motor>().unwrap(), Motor::D);
        let err = "E".parse::<Motor>().unwrap_err();
        assert_eq!(err.to_string(), "unknown motor: E");
    }

    #[test]
    fn motor_from_code_rejects_unknown() {
        assert_eq!(Motor::from_code("1.1.1.MOTOR"), Some(Motor::A));
        assert_eq!(Motor::from_code("1.1.9.MOTOR"), None);
    }

    #[test]
    fn command_kind_arguments() {
        for kind in CommandKind::NO_ARGUMENT {
            assert!(!kind.takes_argument(), "{kind} should not take an argument");
        }
        for kind in CommandKind::WITH_ARGUMENT {
            assert!(kind.takes_argument(), "{kind} should take an argument");
        }
    }

    #[test]
    fn command_kind_from_str() {
        assert_eq!("recall".parse::<CommandKind>().unwrap(), CommandKind::Recall);
        assert_eq!("RETRACT".parse::<CommandKind>().unwrap(), CommandKind::Retract);
        assert!("JUMP".parse::<CommandKind>().is_err());
    }

    #[test]
    fn motor_status_from_str_is_exact() {
        assert_eq!("HOME".parse::<MotorStatus>().unwrap(), MotorStatus::Home);
        assert_eq!(
            "EXTENDING".parse::<MotorStatus>().unwrap(),
            MotorStatus::Extending
        );
        assert!("home".parse::<MotorStatus>().is_err());
    }

    #[test]
    fn connection_state_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Authenticating.to_string(), "authenticating");
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials::new("10.0.0.5", 23, "admin", "hunter2", Duration::from_secs(60));
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(creds.addr(), "10.0.0.5:23");
    }
}
