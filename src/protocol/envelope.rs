//! Wire envelope parsing and encoding.
//!
//! Every message in either direction starts with a text control line:
//!
//! ```text
//! ackCount ":" sendCredits ":" channelId ":" payload
//! ```
//!
//! All three counters are base-10 unsigned integers. Outbound binary
//! messages carry [`BINARY_MARKER`] in place of the inline payload and are
//! followed by the raw body in the same transport frame.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;

use crate::error::{Error, Result};
use crate::identifiers::ChannelId;

// ============================================================================
// Constants
// ============================================================================

/// Placeholder written instead of the payload of a binary message.
pub const BINARY_MARKER: &str = "$$binary$$";

/// Field delimiter of the envelope header.
const DELIMITER: u8 = b':';

// ============================================================================
// Payload
// ============================================================================

/// Outbound message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Text payload, inlined after the header.
    Text(String),
    /// Binary payload, sent after a header ending in [`BINARY_MARKER`].
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(body) => body.len(),
        }
    }

    /// Returns `true` if the payload has no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(body: Vec<u8>) -> Self {
        Self::Binary(body)
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// Decoded view of one inbound message.
///
/// Borrows the payload from the message buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// Number of our frames the peer has processed.
    pub ack_count: u64,
    /// Number of sends the peer believes it may still make.
    pub send_credits: u64,
    /// Target channel.
    pub channel: ChannelId,
    /// Everything after the third delimiter.
    pub payload: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Parses a complete message.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedHeader`] if a counter is missing, non-numeric,
    ///   or not followed by `:`
    pub fn parse(message: &'a [u8]) -> Result<Self> {
        Self::parse_declared(message, message.len())
    }

    /// Parses a buffer whose meaningful length is reported separately.
    ///
    /// The header may be scanned past `declared_len`, but a header that
    /// ends beyond it means the message was cut short.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedHeader`] if a counter is missing, non-numeric,
    ///   or not followed by `:`
    /// - [`Error::TruncatedMessage`] if the header is longer than
    ///   `declared_len`, or `declared_len` exceeds the buffer
    pub fn parse_declared(buffer: &'a [u8], declared_len: usize) -> Result<Self> {
        if declared_len > buffer.len() {
            return Err(Error::truncated(declared_len, buffer.len()));
        }

        let (ack_count, rest) = take_counter(buffer, "number of acknowledged operations")?;
        let (send_credits, rest) = take_counter(rest, "send credits counter")?;
        let (channel, rest) = take_counter(rest, "channel number")?;

        let header_len = buffer.len() - rest.len();
        if header_len > declared_len {
            return Err(Error::truncated(header_len, declared_len));
        }

        let channel = u32::try_from(channel)
            .map(ChannelId::new)
            .map_err(|_| Error::malformed_header("channel number"))?;

        Ok(Self {
            ack_count,
            send_credits,
            channel,
            payload: &buffer[header_len..declared_len],
        })
    }

    /// Returns `true` if the payload starts with [`BINARY_MARKER`].
    #[inline]
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.payload.starts_with(BINARY_MARKER.as_bytes())
    }

    /// Returns the message body with any binary marker stripped.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &'a [u8] {
        self.payload
            .strip_prefix(BINARY_MARKER.as_bytes())
            .unwrap_or(self.payload)
    }

    /// Returns the payload as text, replacing invalid UTF-8.
    #[inline]
    #[must_use]
    pub fn text(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.payload)
    }
}

/// Splits one `<digits>:` counter off the front of `input`.
fn take_counter<'a>(input: &'a [u8], field: &'static str) -> Result<(u64, &'a [u8])> {
    let digits = input.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || input.get(digits) != Some(&DELIMITER) {
        return Err(Error::malformed_header(field));
    }

    let value = std::str::from_utf8(&input[..digits])
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| Error::malformed_header(field))?;

    Ok((value, &input[digits + 1..]))
}

// ============================================================================
// Frame
// ============================================================================

/// Encoded outbound message, ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Header and text payload in one string.
    Text(String),
    /// Header ending in [`BINARY_MARKER`], then the raw body.
    Binary {
        /// Text control line.
        header: String,
        /// Raw body bytes.
        body: Vec<u8>,
    },
}

impl Frame {
    /// Builds the envelope for `payload`, taking ownership of its body.
    #[must_use]
    pub fn encode(ack_count: u64, send_credits: u64, channel: ChannelId, payload: Payload) -> Self {
        let mut header = String::with_capacity(payload.len() + 32);
        header.push_str(&ack_count.to_string());
        header.push(':');
        header.push_str(&send_credits.to_string());
        header.push(':');
        header.push_str(&channel.to_string());
        header.push(':');

        match payload {
            Payload::Text(text) => {
                header.push_str(&text);
                Self::Text(header)
            }
            Payload::Binary(body) => {
                header.push_str(BINARY_MARKER);
                Self::Binary { header, body }
            }
        }
    }

    /// Returns the frame as one contiguous byte buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.as_bytes().to_vec(),
            Self::Binary { header, body } => {
                let mut buf = Vec::with_capacity(header.len() + body.len());
                buf.extend_from_slice(header.as_bytes());
                buf.extend_from_slice(body);
                buf
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
