//! Transport implementations for screenlib.
//!
//! - [`TcpTransport`]: the controller's telnet-style TCP command port,
//!   implementing [`Transport`](screenlib_core::Transport)
//! - [`LineReader`] / [`LineWriter`]: delimiter framing over the read and
//!   write halves any transport hands back
//! - [`TelnetStream`]: refuses telnet options and strips negotiation from
//!   the byte stream
//!
//! # Example
//!
//! ```no_run
//! use screenlib_core::transport::Transport;
//! use screenlib_transport::{LineReader, LineWriter, TcpTransport};
//!
//! # async fn example() -> screenlib_core::Result<()> {
//! let streams = TcpTransport::new("192.168.1.60:23").open().await?;
//! let mut reader = LineReader::new(streams.reader);
//! let mut writer = LineWriter::new(streams.writer);
//!
//! writer.write_line("#1.1.0.MOTOR=STOP;").await?;
//! let line = reader.read_line().await?;
//! # Ok(())
//! # }
//! ```

pub mod lines;
pub mod tcp;
pub mod telnet;

pub use lines::{CRLF, LineReader, LineWriter, map_io_error};
pub use tcp::TcpTransport;
pub use telnet::{TelnetDecoder, TelnetStream};
