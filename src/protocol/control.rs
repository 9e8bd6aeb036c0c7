//! Control channel vocabulary.
//!
//! Channel 0 carries the readiness handshake, panel activation,
//! keep-alives and close requests. The two lifecycle notifications
//! ([`CONN_READY`], [`CONN_CLOSED`]) never travel over the wire; they are
//! delivered to the window data callback in place of application data.

// ============================================================================
// Constants
// ============================================================================

/// Prefix of the client readiness message; the key follows it.
pub const READY_PREFIX: &str = "READY=";

/// Prefix of the server request to start a panel; the panel name follows it.
pub const SHOW_PANEL_PREFIX: &str = "SHOWPANEL:";

/// Client reply once the requested panel is running.
pub const PANEL_READY: &str = "PANEL_READY";

/// Credit grant sent when the peer is running out of credits.
pub const KEEPALIVE: &str = "KEEPALIVE";

/// Server request asking the client to close.
pub const CLOSE: &str = "CLOSE";

/// Callback notification: connection finished its handshake.
pub const CONN_READY: &str = "CONN_READY";

/// Callback notification: connection is gone.
pub const CONN_CLOSED: &str = "CONN_CLOSED";

// ============================================================================
// ControlMessage
// ============================================================================

/// Inbound message on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage<'a> {
    /// `READY=<key>`; the key may be empty.
    Ready {
        /// Authorization key presented by the client, `None` if it is not
        /// valid UTF-8 and so cannot match a registered key.
        key: Option<&'a str>,
    },
    /// Anything else; ignored by the window.
    Other(&'a [u8]),
}

impl<'a> ControlMessage<'a> {
    /// Classifies a control channel payload.
    #[must_use]
    pub fn parse(payload: &'a [u8]) -> Self {
        match payload.strip_prefix(READY_PREFIX.as_bytes()) {
            Some(key) => Self::Ready {
                key: std::str::from_utf8(key).ok(),
            },
            None => Self::Other(payload),
        }
    }
}

/// Builds the `SHOWPANEL:<name>` request.
#[inline]
#[must_use]
pub fn show_panel(name: &str) -> String {
    format!("{SHOW_PANEL_PREFIX}{name}")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ready() {
        assert_eq!(
            ControlMessage::parse(b"READY=abc"),
            ControlMessage::Ready { key: Some("abc") }
        );
        assert_eq!(
            ControlMessage::parse(b"READY="),
            ControlMessage::Ready { key: Some("") }
        );
    }

    #[test]
    fn test_parse_other() {
        assert_eq!(
            ControlMessage::parse(b"KEEPALIVE"),
            ControlMessage::Other(b"KEEPALIVE")
        );
        assert_eq!(
            ControlMessage::parse(b"xREADY=abc"),
            ControlMessage::Other(b"xREADY=abc")
        );
    }

    #[test]
    fn test_ready_with_invalid_utf8_key() {
        let payload = [b"READY=".as_slice(), [0xff, 0xfe].as_slice()].concat();
        assert_eq!(
            ControlMessage::parse(&payload),
            ControlMessage::Ready { key: None }
        );
    }

    #[test]
    fn test_show_panel() {
        assert_eq!(show_panel("FitPanel"), "SHOWPANEL:FitPanel");
    }
}
