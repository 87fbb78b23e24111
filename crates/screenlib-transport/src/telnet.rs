//! Telnet option negotiation filter.
//!
//! Controllers listen on a telnet port and may open with option negotiation
//! (`IAC WILL ECHO`, `IAC WILL SUPPRESS-GO-AHEAD`, ...) before the first
//! prompt. screenlib wants a plain byte stream, so it refuses every option:
//!
//! - `IAC WILL <opt>` is answered with `IAC DONT <opt>`
//! - `IAC DO <opt>` is answered with `IAC WONT <opt>`
//! - `IAC WONT` / `IAC DONT` need no answer
//! - `IAC SB ... IAC SE` subnegotiation is dropped
//! - `IAC IAC` is a literal `0xFF` data byte
//! - any other `IAC <cmd>` (NOP, GA, ...) is dropped
//!
//! [`TelnetDecoder`] is the pure byte-level state machine. [`TelnetStream`]
//! wraps a socket with it: reads come back with negotiation removed, and the
//! refusals are written back on the same socket.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Interpret As Command.
pub const IAC: u8 = 0xFF;
pub const DONT: u8 = 0xFE;
pub const DO: u8 = 0xFD;
pub const WONT: u8 = 0xFC;
pub const WILL: u8 = 0xFB;
/// Subnegotiation begin.
pub const SB: u8 = 0xFA;
/// Subnegotiation end.
pub const SE: u8 = 0xF0;

/// Largest chunk pulled from the socket per read.
const READ_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Iac,
    Option(u8),
    Sub,
    SubIac,
}

/// Strips telnet commands from a byte stream and produces refusals.
///
/// State carries across calls, so a command split over two reads is handled.
#[derive(Debug, Clone)]
pub struct TelnetDecoder {
    state: State,
}

impl TelnetDecoder {
    pub fn new() -> Self {
        Self { state: State::Data }
    }

    /// Decode `input`, appending data bytes to `data` and any negotiation
    /// answers to `replies`.
    ///
    /// Never writes more bytes to `data` than `input` holds.
    pub fn decode(&mut self, input: &[u8], data: &mut impl BufMut, replies: &mut impl BufMut) {
        for &b in input {
            self.state = match (self.state, b) {
                (State::Data, IAC) => State::Iac,
                (State::Data, _) => {
                    data.put_u8(b);
                    State::Data
                }

                (State::Iac, IAC) => {
                    data.put_u8(IAC);
                    State::Data
                }
                (State::Iac, WILL | WONT | DO | DONT) => State::Option(b),
                (State::Iac, SB) => State::Sub,
                (State::Iac, cmd) => {
                    tracing::trace!(command = cmd, "Dropping telnet command");
                    State::Data
                }

                (State::Option(verb), option) => {
                    tracing::debug!(verb = verb, option = option, "Telnet negotiation");
                    match verb {
                        WILL => replies.put_slice(&[IAC, DONT, option]),
                        DO => replies.put_slice(&[IAC, WONT, option]),
                        _ => {}
                    }
                    State::Data
                }

                (State::Sub, IAC) => State::SubIac,
                (State::Sub, _) => State::Sub,
                (State::SubIac, SE) => State::Data,
                (State::SubIac, _) => State::Sub,
            };
        }
    }
}

impl Default for TelnetDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A socket with telnet negotiation filtered out of the read side.
///
/// Refusals are written back opportunistically while reading and always
/// before any caller data, so they reach the controller ahead of the login
/// name. Written data is passed through unchanged; screenlib only sends
/// ASCII, which never contains `IAC`.
#[derive(Debug)]
pub struct TelnetStream<S> {
    inner: S,
    decoder: TelnetDecoder,
    replies: BytesMut,
}

impl<S> TelnetStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: TelnetDecoder::new(),
            replies: BytesMut::new(),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncWrite + Unpin> TelnetStream<S> {
    /// Write out pending negotiation answers.
    fn poll_send_replies(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.replies.is_empty() {
            return Poll::Ready(Ok(()));
        }
        while !self.replies.is_empty() {
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.replies))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.replies.advance(n);
        }
        Pin::new(&mut self.inner).poll_flush(cx)
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncRead for TelnetStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if let Poll::Ready(Err(e)) = this.poll_send_replies(cx) {
                return Poll::Ready(Err(e));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let len = buf.remaining().min(READ_CHUNK);
            let mut raw = ReadBuf::new(&mut chunk[..len]);
            ready!(Pin::new(&mut this.inner).poll_read(cx, &mut raw))?;
            if raw.filled().is_empty() {
                return Poll::Ready(Ok(()));
            }

            let before = buf.filled().len();
            let mut data = BytesMut::with_capacity(raw.filled().len());
            this.decoder.decode(raw.filled(), &mut data, &mut this.replies);
            buf.put_slice(&data);

            if let Poll::Ready(Err(e)) = this.poll_send_replies(cx) {
                return Poll::Ready(Err(e));
            }
            // A chunk made only of negotiation is not EOF; read again.
            if buf.filled().len() > before {
                return Poll::Ready(Ok(()));
            }
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for TelnetStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_send_replies(cx))?;
        Pin::new(&mut this.inner).poll_write(cx, data)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_send_replies(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_send_replies(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::{LineReader, LineWriter};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const ECHO: u8 = 0x01;
    const SUPPRESS_GO_AHEAD: u8 = 0x03;
    const TERMINAL_TYPE: u8 = 0x18;

    fn decode(decoder: &mut TelnetDecoder, input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = Vec::new();
        let mut replies = Vec::new();
        decoder.decode(input, &mut data, &mut replies);
        (data, replies)
    }

    // -----------------------------------------------------------------------
    // Decoder
    // -----------------------------------------------------------------------

    #[test]
    fn plain_data_passes_through() {
        let mut decoder = TelnetDecoder::new();
        let (data, replies) = decode(&mut decoder, b"\r\nUser:");
        assert_eq!(data, b"\r\nUser:");
        assert!(replies.is_empty());
    }

    #[test]
    fn will_is_refused_with_dont() {
        let mut decoder = TelnetDecoder::new();
        let (data, replies) = decode(
            &mut decoder,
            &[IAC, WILL, ECHO, IAC, WILL, SUPPRESS_GO_AHEAD, b'U', b':'],
        );
        assert_eq!(data, b"U:");
        assert_eq!(replies, [IAC, DONT, ECHO, IAC, DONT, SUPPRESS_GO_AHEAD]);
    }

    #[test]
    fn do_is_refused_with_wont() {
        let mut decoder = TelnetDecoder::new();
        let (data, replies) = decode(&mut decoder, &[IAC, DO, TERMINAL_TYPE]);
        assert!(data.is_empty());
        assert_eq!(replies, [IAC, WONT, TERMINAL_TYPE]);
    }

    #[test]
    fn wont_and_dont_need_no_answer() {
        let mut decoder = TelnetDecoder::new();
        let (data, replies) = decode(&mut decoder, &[IAC, WONT, ECHO, IAC, DONT, ECHO, b'x']);
        assert_eq!(data, b"x");
        assert!(replies.is_empty());
    }

    #[test]
    fn subnegotiation_is_dropped() {
        let mut decoder = TelnetDecoder::new();
        let input = [IAC, SB, TERMINAL_TYPE, 1, IAC, IAC, IAC, SE, b'o', b'k'];
        let (data, replies) = decode(&mut decoder, &input);
        assert_eq!(data, b"ok");
        assert!(replies.is_empty());
    }

    #[test]
    fn escaped_iac_is_data() {
        let mut decoder = TelnetDecoder::new();
        let (data, _) = decode(&mut decoder, &[b'a', IAC, IAC, b'b']);
        assert_eq!(data, [b'a', IAC, b'b']);
    }

    #[test]
    fn other_commands_are_dropped() {
        let mut decoder = TelnetDecoder::new();
        // NOP, GA
        let (data, replies) = decode(&mut decoder, &[IAC, 0xF1, b'a', IAC, 0xF9, b'b']);
        assert_eq!(data, b"ab");
        assert!(replies.is_empty());
    }

    #[test]
    fn command_split_across_reads() {
        let mut decoder = TelnetDecoder::new();
        let (data, replies) = decode(&mut decoder, &[b'a', IAC]);
        assert_eq!(data, b"a");
        assert!(replies.is_empty());

        let (data, replies) = decode(&mut decoder, &[WILL]);
        assert!(data.is_empty());
        assert!(replies.is_empty());

        let (data, replies) = decode(&mut decoder, &[ECHO, b'b']);
        assert_eq!(data, b"b");
        assert_eq!(replies, [IAC, DONT, ECHO]);
    }

    // -----------------------------------------------------------------------
    // Stream
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn stream_strips_negotiation_and_answers_it() {
        let (client, mut device) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(TelnetStream::new(client));
        let mut reader = LineReader::new(reader);
        let mut writer = LineWriter::new(writer);

        device
            .write_all(&[IAC, WILL, ECHO, IAC, WILL, SUPPRESS_GO_AHEAD])
            .await
            .unwrap();
        device.write_all(b"User:").await.unwrap();

        let prompt = reader.read_until(b":").await.unwrap();
        assert_eq!(&prompt[..], b"User");

        writer.write_line("admin").await.unwrap();

        let mut expected = vec![IAC, DONT, ECHO, IAC, DONT, SUPPRESS_GO_AHEAD];
        expected.extend_from_slice(b"admin\r\n");
        let mut got = vec![0u8; expected.len()];
        device.read_exact(&mut got).await.unwrap();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn negotiation_only_chunk_is_not_eof() {
        let (client, mut device) = tokio::io::duplex(1024);
        let mut stream = TelnetStream::new(client);

        device.write_all(&[IAC, DO, ECHO]).await.unwrap();
        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 16];
            let n = stream.read(&mut buf).await.unwrap();
            buf[..n].to_vec()
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        device.write_all(b"hi").await.unwrap();
        assert_eq!(reader.await.unwrap(), b"hi");

        let mut reply = [0u8; 3];
        device.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply, [IAC, WONT, ECHO]);
    }

    #[tokio::test]
    async fn eof_passes_through() {
        let (client, device) = tokio::io::duplex(64);
        let mut stream = TelnetStream::new(client);
        drop(device);

        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
    }
}
