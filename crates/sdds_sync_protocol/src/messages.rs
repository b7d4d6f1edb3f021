//! Protocol messages for sync.

use crate::error::{ProtocolError, ProtocolResult};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

// Hard-coded patterns, exercised by the tests below.
static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"^([a-zA-Z])\s(\d+)\s?(.*)$") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern"),
    });
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"^(\d+)\s+(.+)$") {
    Ok(re) => re,
    Err(_) => unreachable!("static regex pattern"),
});
static ERROR_RE: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"^\s*(\d+)\s*(.*)$") {
    Ok(re) => re,
    Err(_) => unreachable!("static regex pattern"),
});

/// Error codes reported by the device in `E` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The port field could not be parsed.
    PortUnparsable,
    /// The link path does not resolve.
    InvalidPath,
    /// The link path resolves to something that is not a struct.
    NotAStruct,
    /// The link path resolves to an unset struct.
    NullStruct,
    /// The port is not in use on the device.
    InvalidPort,
    /// The command is unknown to the device.
    InvalidCommand,
    /// The device serves no more subscribers.
    SubscriberLimit,
    /// Any code this client does not know.
    Other(u32),
}

impl ErrorCode {
    /// Maps a numeric code.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => ErrorCode::PortUnparsable,
            2 => ErrorCode::InvalidPath,
            3 => ErrorCode::NotAStruct,
            4 => ErrorCode::NullStruct,
            5 => ErrorCode::InvalidPort,
            6 => ErrorCode::InvalidCommand,
            100 => ErrorCode::SubscriberLimit,
            other => ErrorCode::Other(other),
        }
    }

    /// Returns the numeric code.
    pub fn code(self) -> u32 {
        match self {
            ErrorCode::PortUnparsable => 1,
            ErrorCode::InvalidPath => 2,
            ErrorCode::NotAStruct => 3,
            ErrorCode::NullStruct => 4,
            ErrorCode::InvalidPort => 5,
            ErrorCode::InvalidCommand => 6,
            ErrorCode::SubscriberLimit => 100,
            ErrorCode::Other(code) => code,
        }
    }

    /// Returns true if the error ends the session.
    pub fn is_fatal(self) -> bool {
        self == ErrorCode::SubscriberLimit
    }
}

/// A line received from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `t <port> <document>`: full schema document.
    Schema {
        /// Port field, unused.
        port: u32,
        /// Raw schema JSON.
        document: String,
    },
    /// `l <port> <first> <values>`: values for the struct linked on `port`.
    Link {
        /// Subscription port.
        port: u32,
        /// Index of the first child the values apply to.
        first: usize,
        /// Values in child order.
        values: Vec<Value>,
    },
    /// `u <port>`: unlink acknowledged.
    Unlink {
        /// Subscription port.
        port: u32,
    },
    /// `E <port> <code> <message>`: protocol error.
    Error {
        /// Port the error refers to.
        port: u32,
        /// Error code.
        code: ErrorCode,
        /// Free text from the device.
        message: String,
    },
    /// `B <port>`: heartbeat, no payload.
    Heartbeat {
        /// Port field, unused.
        port: u32,
    },
}

impl InboundMessage {
    /// Parses one protocol line. A trailing line break is ignored.
    pub fn parse(line: &str) -> ProtocolResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let caps = LINE_RE
            .captures(line)
            .ok_or_else(|| ProtocolError::Malformed(line.to_string()))?;
        let cmd = caps[1].chars().next().unwrap_or_default();
        let port: u32 = caps[2]
            .parse()
            .map_err(|_| ProtocolError::InvalidPort(caps[2].to_string()))?;
        let rest = &caps[3];

        match cmd {
            't' => Ok(InboundMessage::Schema {
                port,
                document: rest.to_string(),
            }),
            'l' => {
                let bad_payload = || ProtocolError::InvalidLinkPayload {
                    port,
                    payload: rest.to_string(),
                };
                let link = LINK_RE.captures(rest).ok_or_else(bad_payload)?;
                let first = link[1].parse().map_err(|_| bad_payload())?;
                let values = serde_json::from_str(&link[2])
                    .map_err(|source| ProtocolError::InvalidValues { port, source })?;
                Ok(InboundMessage::Link {
                    port,
                    first,
                    values,
                })
            }
            'u' => Ok(InboundMessage::Unlink { port }),
            'E' => {
                let err = ERROR_RE
                    .captures(rest)
                    .ok_or_else(|| ProtocolError::InvalidErrorPayload(rest.to_string()))?;
                let code = err[1]
                    .parse()
                    .map_err(|_| ProtocolError::InvalidErrorPayload(rest.to_string()))?;
                Ok(InboundMessage::Error {
                    port,
                    code: ErrorCode::from_code(code),
                    message: err[2].to_string(),
                })
            }
            'B' => Ok(InboundMessage::Heartbeat { port }),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }

    /// Returns the port field.
    pub fn port(&self) -> u32 {
        match self {
            InboundMessage::Schema { port, .. }
            | InboundMessage::Link { port, .. }
            | InboundMessage::Unlink { port }
            | InboundMessage::Error { port, .. }
            | InboundMessage::Heartbeat { port } => *port,
        }
    }
}

/// A line sent to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// `T`: request the full schema.
    RequestSchema,
    /// `L <port> <path>`: subscribe `port` to the struct at `path`.
    Link {
        /// Subscription port.
        port: u32,
        /// Dotted struct path.
        path: String,
    },
    /// `U <port>`: unsubscribe `port`.
    Unlink {
        /// Subscription port.
        port: u32,
    },
    /// `<path>=<value>`: local edit of a leaf.
    Edit {
        /// Dotted leaf path.
        path: String,
        /// Wire form of the value.
        value: String,
    },
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundMessage::RequestSchema => f.write_str("T"),
            OutboundMessage::Link { port, path } => write!(f, "L {port} {path}"),
            OutboundMessage::Unlink { port } => write!(f, "U {port}"),
            OutboundMessage::Edit { path, value } => write!(f, "{path}={value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_link_values() {
        let msg = InboundMessage::parse(r#"l 3 2 [1,"on",7.5]"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Link {
                port: 3,
                first: 2,
                values: vec![json!(1), json!("on"), json!(7.5)],
            }
        );
        assert_eq!(msg.port(), 3);
    }

    #[test]
    fn parse_schema_keeps_document() {
        let msg = InboundMessage::parse("t 0 [[1,0,\"x\",3]]\r\n").unwrap();
        assert_eq!(
            msg,
            InboundMessage::Schema {
                port: 0,
                document: "[[1,0,\"x\",3]]".into(),
            }
        );
    }

    #[test]
    fn parse_unlink_and_heartbeat() {
        assert_eq!(
            InboundMessage::parse("u 4").unwrap(),
            InboundMessage::Unlink { port: 4 }
        );
        assert_eq!(
            InboundMessage::parse("B 0").unwrap(),
            InboundMessage::Heartbeat { port: 0 }
        );
    }

    #[test]
    fn parse_error_codes() {
        let msg = InboundMessage::parse("E 2 100 max clients").unwrap();
        let InboundMessage::Error {
            port,
            code,
            message,
        } = msg
        else {
            panic!("expected error message");
        };
        assert_eq!(port, 2);
        assert_eq!(code, ErrorCode::SubscriberLimit);
        assert!(code.is_fatal());
        assert_eq!(message, "max clients");

        let msg = InboundMessage::parse("E 1 5").unwrap();
        assert!(matches!(
            msg,
            InboundMessage::Error {
                code: ErrorCode::InvalidPort,
                ..
            }
        ));
        assert_eq!(ErrorCode::from_code(42), ErrorCode::Other(42));
        assert_eq!(ErrorCode::Other(42).code(), 42);
        assert!(!ErrorCode::InvalidPath.is_fatal());
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(
            InboundMessage::parse("hello"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            InboundMessage::parse("x 1 foo"),
            Err(ProtocolError::UnknownCommand('x'))
        ));
        assert!(matches!(
            InboundMessage::parse("l 1 [1,2]"),
            Err(ProtocolError::InvalidLinkPayload { port: 1, .. })
        ));
        assert!(matches!(
            InboundMessage::parse("l 6 0 [1,"),
            Err(ProtocolError::InvalidValues { port: 6, .. })
        ));
        assert!(matches!(
            InboundMessage::parse("l 99999999999 0 [1]"),
            Err(ProtocolError::InvalidPort(_))
        ));
        assert!(matches!(
            InboundMessage::parse("E 1 oops"),
            Err(ProtocolError::InvalidErrorPayload(_))
        ));
    }

    #[test]
    fn outbound_encoding() {
        assert_eq!(OutboundMessage::RequestSchema.to_string(), "T");
        assert_eq!(
            OutboundMessage::Link {
                port: 2,
                path: "sub.inner".into()
            }
            .to_string(),
            "L 2 sub.inner"
        );
        assert_eq!(OutboundMessage::Unlink { port: 7 }.to_string(), "U 7");
        assert_eq!(
            OutboundMessage::Edit {
                path: "sub.x".into(),
                value: "3".into()
            }
            .to_string(),
            "sub.x=3"
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_never_panics(line in "\\PC{0,40}") {
                let _ = InboundMessage::parse(&line);
            }

            #[test]
            fn link_lines_parse(port in 0u32..10_000, first in 0usize..64, values in prop::collection::vec(any::<i32>(), 1..8)) {
                let line = format!("l {port} {first} {}", serde_json::to_string(&values).unwrap_or_default());
                let msg = InboundMessage::parse(&line).unwrap();
                let expected: Vec<Value> = values.iter().map(|v| json!(v)).collect();
                prop_assert_eq!(msg, InboundMessage::Link { port, first, values: expected });
            }
        }
    }
}
