//! Text protocol codec for the screen controller.
//!
//! The controller speaks semicolon-terminated ASCII messages addressed to
//! dotted motor identifiers. See [`codec`] for the message forms.

pub mod codec;

pub use codec::{build_command, build_query, parse_message};
