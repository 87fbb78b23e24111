//! Encode and decode screen controller messages.
//!
//! Outgoing commands are `#<motor>=<CMD>[,<n>];` and queries are
//! `#<motor>.<QUERY>=?;`. Incoming lines are either echoes of those (`#`
//! prefix) or events, `!<motor>.<EVENT>=<value>;`. Line terminators (`\r\n`)
//! are handled by the transport layer, not here.

use screenlib_core::{CommandKind, Error, EventKind, Motor, ParsedMessage, QueryKind, Result};

/// Prefix of commands and queries (and their echoes).
pub const PREFIX_COMMAND: char = '#';

/// Prefix of unsolicited events.
pub const PREFIX_EVENT: char = '!';

/// Terminator of every message body.
pub const POSTFIX: char = ';';

/// Build a command string.
///
/// The argument is appended after a comma only when provided; callers pass
/// a preset number for [`CommandKind::Recall`] and [`CommandKind::Store`].
///
/// # Examples
///
/// ```
/// use screenlib_core::{CommandKind, Motor};
/// use screenlib_protocol::codec::build_command;
///
/// assert_eq!(build_command(Motor::A, CommandKind::Up, None), "#1.1.1.MOTOR=UP;");
/// assert_eq!(build_command(Motor::All, CommandKind::Recall, Some(2)), "#1.1.0.MOTOR=RECALL,2;");
/// ```
pub fn build_command(motor: Motor, command: CommandKind, argument: Option<u32>) -> String {
    match argument {
        Some(n) => format!(
            "{PREFIX_COMMAND}{}={},{n}{POSTFIX}",
            motor.code(),
            command.keyword()
        ),
        None => format!(
            "{PREFIX_COMMAND}{}={}{POSTFIX}",
            motor.code(),
            command.keyword()
        ),
    }
}

/// Build a query string.
///
/// # Examples
///
/// ```
/// use screenlib_core::{Motor, QueryKind};
/// use screenlib_protocol::codec::build_query;
///
/// assert_eq!(build_query(Motor::B, QueryKind::Position), "#1.1.2.MOTOR.POSITION=?;");
/// ```
pub fn build_query(motor: Motor, query: QueryKind) -> String {
    format!(
        "{PREFIX_COMMAND}{}.{}=?{POSTFIX}",
        motor.code(),
        query.keyword()
    )
}

/// Decode one line received from the controller.
///
/// `line` should already have its `\r\n` removed and surrounding whitespace
/// trimmed. Returns:
///
/// - `Ok(Some(msg))` for a recognised command echo, query echo, or event;
/// - `Ok(None)` for lines that do not start with `#`/`!` followed by a known
///   motor address (banners, prompts, noise);
/// - `Err(Error::Protocol)` for lines addressed to a known motor whose body
///   cannot be decoded.
pub fn parse_message(line: &str) -> Result<Option<ParsedMessage>> {
    let mut chars = line.chars();
    let prefix = match chars.next() {
        Some(c @ (PREFIX_COMMAND | PREFIX_EVENT)) => c,
        _ => return Ok(None),
    };
    let rest = chars.as_str();

    let Some(motor) = Motor::ALL.into_iter().find(|m| rest.starts_with(m.code())) else {
        return Ok(None);
    };
    let body = &rest[motor.code().len()..];

    let msg = if prefix == PREFIX_EVENT {
        parse_event(motor, body, line)?
    } else if body.starts_with(".POSITION") {
        ParsedMessage::Query {
            motor,
            query: QueryKind::Position,
        }
    } else {
        parse_command(motor, body, line)?
    };
    Ok(Some(msg))
}

/// Decode the part of a command echo after the motor address, e.g.
/// `=RECALL,3;`.
fn parse_command(motor: Motor, body: &str, line: &str) -> Result<ParsedMessage> {
    let Some(body) = body.strip_prefix('=') else {
        return Err(Error::Protocol(format!("malformed command: {line}")));
    };
    let body = body.strip_suffix(POSTFIX).unwrap_or(body);
    // The controller may annotate echoes, e.g. `RECALL,3(PRESET 3)`.
    let body = body.split('(').next().unwrap_or(body);

    let (keyword, argument) = match body.split_once(',') {
        Some((keyword, arg)) => (keyword, Some(arg.trim())),
        None => (body, None),
    };

    let command = CommandKind::NO_ARGUMENT
        .into_iter()
        .chain(CommandKind::WITH_ARGUMENT)
        .find(|c| c.keyword() == keyword)
        .ok_or_else(|| Error::Protocol(format!("unknown command keyword `{keyword}`: {line}")))?;

    let argument = match (command.takes_argument(), argument) {
        (true, Some(arg)) => Some(arg.parse::<u32>().map_err(|_| {
            Error::Protocol(format!("invalid preset number `{arg}`: {line}"))
        })?),
        (true, None) => {
            return Err(Error::Protocol(format!(
                "{command} without preset number: {line}"
            )));
        }
        (false, Some(_)) => {
            return Err(Error::Protocol(format!(
                "{command} does not take an argument: {line}"
            )));
        }
        (false, None) => None,
    };

    Ok(ParsedMessage::Command {
        motor,
        command,
        argument,
    })
}

/// Decode the part of an event after the motor address, e.g.
/// `.STATUS=HOME;`.
fn parse_event(motor: Motor, body: &str, line: &str) -> Result<ParsedMessage> {
    let event = body
        .strip_prefix('.')
        .and_then(|b| {
            EventKind::ALL
                .into_iter()
                .find(|e| b.starts_with(e.keyword()))
        })
        .ok_or_else(|| Error::Protocol(format!("unknown event: {line}")))?;

    let Some((_, value)) = body.split_once('=') else {
        return Err(Error::Protocol(format!("event without value: {line}")));
    };
    let value = value.strip_suffix(POSTFIX).unwrap_or(value);

    Ok(ParsedMessage::Event {
        motor,
        event,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenlib_core::MotorStatus;

    // -----------------------------------------------------------------------
    // build
    // -----------------------------------------------------------------------

    #[test]
    fn build_command_without_argument() {
        assert_eq!(
            build_command(Motor::D, CommandKind::Stop, None),
            "#1.1.4.MOTOR=STOP;"
        );
        assert_eq!(
            build_command(Motor::All, CommandKind::Retract, None),
            "#1.1.0.MOTOR=RETRACT;"
        );
    }

    #[test]
    fn build_command_with_argument() {
        assert_eq!(
            build_command(Motor::All, CommandKind::Store, Some(4)),
            "#1.1.0.MOTOR=STORE,4;"
        );
    }

    #[test]
    fn build_query_position() {
        assert_eq!(
            build_query(Motor::A, QueryKind::Position),
            "#1.1.1.MOTOR.POSITION=?;"
        );
    }

    // -----------------------------------------------------------------------
    // parse: echoes
    // -----------------------------------------------------------------------

    #[test]
    fn commands_round_trip() {
        for motor in Motor::ALL {
            for command in CommandKind::NO_ARGUMENT {
                let line = build_command(motor, command, None);
                assert_eq!(
                    parse_message(&line).unwrap(),
                    Some(ParsedMessage::Command {
                        motor,
                        command,
                        argument: None
                    }),
                    "{line}"
                );
            }
            for command in CommandKind::WITH_ARGUMENT {
                let line = build_command(motor, command, Some(7));
                assert_eq!(
                    parse_message(&line).unwrap(),
                    Some(ParsedMessage::Command {
                        motor,
                        command,
                        argument: Some(7)
                    }),
                    "{line}"
                );
            }
        }
    }

    #[test]
    fn query_round_trip() {
        let line = build_query(Motor::C, QueryKind::Position);
        assert_eq!(
            parse_message(&line).unwrap(),
            Some(ParsedMessage::Query {
                motor: Motor::C,
                query: QueryKind::Position
            })
        );
    }

    #[test]
    fn parse_command_without_terminator() {
        assert_eq!(
            parse_message("#1.1.2.MOTOR=DOWN").unwrap(),
            Some(ParsedMessage::Command {
                motor: Motor::B,
                command: CommandKind::Down,
                argument: None
            })
        );
    }

    #[test]
    fn parse_annotated_recall_echo() {
        assert_eq!(
            parse_message("#1.1.0.MOTOR=RECALL,2(PRESET 2);").unwrap(),
            Some(ParsedMessage::Command {
                motor: Motor::All,
                command: CommandKind::Recall,
                argument: Some(2)
            })
        );
    }

    // -----------------------------------------------------------------------
    // parse: events
    // -----------------------------------------------------------------------

    #[test]
    fn parse_status_event() {
        let msg = parse_message("!1.1.1.MOTOR.STATUS=HOME;").unwrap().unwrap();
        assert_eq!(
            msg,
            ParsedMessage::Event {
                motor: Motor::A,
                event: EventKind::Status,
                value: "HOME".into()
            }
        );
        assert_eq!(msg.status(), Some(MotorStatus::Home));
    }

    #[test]
    fn parse_position_event() {
        assert_eq!(
            parse_message("!1.1.0.MOTOR.POSITION=1234;").unwrap(),
            Some(ParsedMessage::Event {
                motor: Motor::All,
                event: EventKind::Position,
                value: "1234".into()
            })
        );
    }

    #[test]
    fn parse_event_without_terminator() {
        assert_eq!(
            parse_message("!1.1.3.MOTOR.STATUS=EXTENDING").unwrap(),
            Some(ParsedMessage::Event {
                motor: Motor::C,
                event: EventKind::Status,
                value: "EXTENDING".into()
            })
        );
    }

    // -----------------------------------------------------------------------
    // parse: ignored and malformed lines
    // -----------------------------------------------------------------------

    #[test]
    fn unrecognised_lines_are_none() {
        for line in [
            "",
            "Connected:",
            "Welcome to the CVM",
            "HELLO",
            "#",
            "#2.1.1.MOTOR=UP;",
            "!1.1.9.MOTOR.STATUS=HOME;",
            "?1.1.1.MOTOR=UP;",
        ] {
            assert_eq!(parse_message(line).unwrap(), None, "{line:?}");
        }
    }

    #[test]
    fn unknown_command_keyword_is_error() {
        let err = parse_message("#1.1.1.MOTOR=JUMP;").unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(err.to_string().contains("JUMP"));
    }

    #[test]
    fn missing_preset_is_error() {
        assert!(matches!(
            parse_message("#1.1.0.MOTOR=RECALL;"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            parse_message("#1.1.0.MOTOR=STORE,x;"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn unknown_event_is_error() {
        assert!(matches!(
            parse_message("!1.1.1.MOTOR.SPEED=3;"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            parse_message("!1.1.1.MOTOR.STATUS;"),
            Err(Error::Protocol(_))
        ));
    }
}
